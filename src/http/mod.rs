//! HTTP host assembly and serving.

pub mod server;

pub use server::{host_routes, AppState, WebHost};
