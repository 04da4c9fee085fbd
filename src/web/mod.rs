//! HTTP gateway module
//!
//! Translates JSON/REST requests into calls on the store service and
//! renders the outcome as HTTP status codes and JSON bodies.

mod handlers;
mod server;

pub use handlers::{failure_response, AppState, Operation};
pub use server::{router, serve};
