pub mod observability;
pub mod persistence;
