//! HTTP-facing helpers shared by the route handlers.

pub mod common;
