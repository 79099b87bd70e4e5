pub mod databases;
pub mod queries;
