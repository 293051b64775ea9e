//! REST API surface: routing, auth middleware, request/response types

pub mod auth;
pub mod brokers;
pub mod server;
pub mod types;
pub mod user_brokers;

pub use server::{build_router, serve};
