pub mod order;
pub mod value;
