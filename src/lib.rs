//! E-commerce front-end hosts.
//!
//! One binary serving three host flavors: the server-rendered web client,
//! the single-page-application host and the webhook client. They share one
//! startup path (configuration snapshot, client registry, health checks,
//! telemetry) and differ only in their route tables, their pipeline stage
//! list and the scopes they request at sign-in.
//!
//! # Architecture
//! ```text
//! main.rs
//!     → config   (defaults → file → env overlay → validation)
//!     → telemetry (tracing subscriber, optional span export)
//!     → WebHost  (session store, client registry, health registry)
//!         → pipeline::compose (the ordered middleware stack)
//!             → http::host_routes (per-host endpoints)
//! ```

pub mod auth;
pub mod clients;
pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod pipeline;
pub mod session;
pub mod telemetry;
pub mod webhook;

pub use config::{AppConfig, HostKind};
pub use http::WebHost;
pub use lifecycle::Shutdown;
