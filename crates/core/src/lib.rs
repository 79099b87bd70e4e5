//! Pure domain logic for saved query templates.
//!
//! Nothing in this crate performs I/O: placeholder extraction, parameter
//! validation, materialization, positional bind compilation and target
//! database resolution are all plain functions, shared by the repository and
//! HTTP layers.

pub mod bind;
pub mod error;
pub mod extract;
pub mod materialize;
pub mod parameters;
pub mod routing;
pub mod types;
pub mod validation;
