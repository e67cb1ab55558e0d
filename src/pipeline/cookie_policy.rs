//! Cookie-compliance stage.
//!
//! The hosts sit behind a reverse proxy over plain HTTP, where browsers
//! refuse `SameSite=None` cookies and treat unmarked ones inconsistently.
//! This stage enforces a minimum policy of `SameSite=Lax` on every response
//! cookie: unmarked cookies gain the attribute, `None` is upgraded to `Lax`,
//! and `Strict` is left alone.

use axum::extract::Request;
use axum::http::header::{HeaderValue, SET_COOKIE};
use axum::middleware::Next;
use axum::response::Response;

pub async fn enforce_same_site(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;

    let originals: Vec<HeaderValue> = response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .cloned()
        .collect();
    if originals.is_empty() {
        return response;
    }

    let mut changed = false;
    let rewritten: Vec<HeaderValue> = originals
        .iter()
        .map(|value| match apply_minimum_lax(value) {
            Some(updated) => {
                changed = true;
                updated
            }
            None => value.clone(),
        })
        .collect();

    if changed {
        let headers = response.headers_mut();
        headers.remove(SET_COOKIE);
        for value in rewritten {
            headers.append(SET_COOKIE, value);
        }
    }

    response
}

/// Returns the rewritten cookie when it violates the minimum policy,
/// `None` when the cookie is already compliant (or is not valid UTF-8).
fn apply_minimum_lax(value: &HeaderValue) -> Option<HeaderValue> {
    let cookie = value.to_str().ok()?;
    let lower = cookie.to_ascii_lowercase();

    match lower.find("samesite=") {
        None => HeaderValue::from_str(&format!("{cookie}; SameSite=Lax")).ok(),
        Some(idx) => {
            let start = idx + "samesite=".len();
            let end = lower[start..]
                .find(';')
                .map(|offset| start + offset)
                .unwrap_or(lower.len());
            if lower[start..end].trim() == "none" {
                let rewritten = format!("{}Lax{}", &cookie[..start], &cookie[end..]);
                HeaderValue::from_str(&rewritten).ok()
            } else {
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewrite(cookie: &str) -> Option<String> {
        apply_minimum_lax(&HeaderValue::from_str(cookie).unwrap())
            .map(|v| v.to_str().unwrap().to_string())
    }

    #[test]
    fn unmarked_cookie_gains_lax() {
        assert_eq!(
            rewrite("session=abc; Path=/; HttpOnly").as_deref(),
            Some("session=abc; Path=/; HttpOnly; SameSite=Lax")
        );
    }

    #[test]
    fn none_is_upgraded_to_lax() {
        assert_eq!(
            rewrite("session=abc; SameSite=None; Secure").as_deref(),
            Some("session=abc; SameSite=Lax; Secure")
        );
    }

    #[test]
    fn lax_and_strict_are_untouched() {
        assert_eq!(rewrite("session=abc; SameSite=Lax"), None);
        assert_eq!(rewrite("session=abc; SameSite=Strict"), None);
    }

    #[test]
    fn attribute_match_is_case_insensitive() {
        assert_eq!(
            rewrite("session=abc; samesite=NONE").as_deref(),
            Some("session=abc; samesite=Lax")
        );
    }
}
