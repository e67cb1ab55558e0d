//! Authentication subsystem.
//!
//! Two cooperating schemes: the session cookie is the carrier scheme that
//! recognizes an established session, and OpenID Connect is the challenge
//! scheme invoked when a protected route is hit without one. Scope sets,
//! client identifiers and response types are host-specific data configured
//! in [`oidc`]; the request-time decisions live in [`middleware`].

pub mod middleware;
pub mod oidc;

pub use middleware::{authenticate, authorize, protected_routes, AuthStage, CurrentUser};
pub use oidc::OidcOptions;
