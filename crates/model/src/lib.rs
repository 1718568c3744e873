pub mod core;
pub mod error;
pub mod field;
pub mod schema;

pub use crate::core::{order::SortOrder, value::Value};
pub use error::FieldError;
pub use field::{Field, FieldKind, timestamp::TimeZoneSpec};
pub use schema::{Record, Schema};
