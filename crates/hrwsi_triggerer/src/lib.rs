pub mod listener;
pub mod nrt;
pub mod queries;
pub mod rules;
