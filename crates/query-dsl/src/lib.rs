pub mod body;
pub mod clause;
pub mod error;
pub mod registry;
pub mod scope;
pub mod version;

pub use body::ClauseBody;
pub use clause::{
    Clause, ClauseKind, Occur,
    aggs::{Aggs, BucketOrder, MetricKind, bucket_name},
    boolean::{BoolQuery, MinimumShouldMatch},
    highlight::Highlight,
    range::{RangeBound, RangeQuery},
    request::SearchRequest,
    sort::SortField,
    term::{Term, Terms},
    text::MatchQuery,
};
pub use error::DslError;
pub use registry::{ClauseArgs, ClauseConstructor, ClauseRegistry, ClauseSpec};
pub use scope::TimeScope;
pub use version::{FieldGate, Version};
