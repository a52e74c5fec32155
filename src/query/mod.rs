pub mod predicate;
pub mod matcher;
