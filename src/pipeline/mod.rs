//! Request pipeline.
//!
//! # Data Flow
//! ```text
//! request
//!     → request id / tracing
//!     → metrics
//!     → error surface (catch-panic just inside)
//!     → path-base rewrite        (when configured)
//!     → client-routing fallback  (SPA host only)
//!     → static assets
//!     → session
//!     → bypass-auth              (load-test flag only)
//!     → cookie policy
//!     → routing → authentication → authorization → endpoint
//! ```
//!
//! Order is fixed; [`composer::plan`] is the single source of truth for it.

pub mod bypass_auth;
pub mod composer;
pub mod cookie_policy;
pub mod error_surface;
pub mod path_base;
pub mod spa_fallback;

pub use composer::{compose, plan, Stage};
