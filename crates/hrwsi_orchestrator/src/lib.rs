pub mod queries;
pub mod worker;
