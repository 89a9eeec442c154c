//! HTTP API: server wiring, request context, routing and response mapping.

pub mod app;
pub mod context;
pub mod middleware;
