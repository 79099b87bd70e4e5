//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that accept
//! `&PgPool` as the first argument.

pub mod query_template_repo;

pub use query_template_repo::QueryTemplateRepo;
