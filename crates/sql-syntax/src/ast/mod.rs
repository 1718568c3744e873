pub mod builder;
pub mod expr;
pub mod operator;
