//! Row types and DTOs for the template-store tables.

pub mod query_template;
