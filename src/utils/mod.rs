//! Identifier generation and input validation helpers.
//!
//! - [`snowflake`] - Time-ordered 64-bit id generator
//! - [`node_registry`] - One shared generator per node id
//! - [`code_generator`] - Base-62 short codes and custom alias rules
//! - [`url_validator`] - Validation gate for URLs to shorten

pub mod code_generator;
pub mod node_registry;
pub mod snowflake;
pub mod url_validator;
