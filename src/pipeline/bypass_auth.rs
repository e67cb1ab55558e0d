//! Bypass-auth stage, the documented load-test escape hatch.
//!
//! Installed only when the load-test flag is set. Marks the request so every
//! downstream authentication decision short-circuits to "authenticated";
//! headless load generators can then exercise protected routes without an
//! interactive sign-in round-trip.

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

/// Marker planted in request extensions; the authentication stage treats its
/// presence as a fully authenticated caller.
#[derive(Clone, Copy, Debug)]
pub struct BypassedAuth;

pub async fn bypass_authentication(mut req: Request, next: Next) -> Response {
    req.extensions_mut().insert(BypassedAuth);
    next.run(req).await
}
