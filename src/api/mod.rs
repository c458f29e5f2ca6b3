//! REST API layer.
//!
//! Translates HTTP requests into service calls and formats the responses.
//!
//! - [`dto`] - Request/response bodies
//! - [`handlers`] - Request handlers
//! - [`middleware`] - Request tracing
//! - [`routes`] - `/api` route table

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod routes;
