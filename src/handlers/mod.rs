pub mod pages;
pub mod submit;

use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

// ── Flash messages ─────────────────────────────────────────────────────────
//
// One-shot messages carried across a redirect in short-lived cookies, read
// and cleared by the next page render.

/// Set a flash cookie and redirect to the given path.
pub(crate) fn set_flash_and_redirect(
    jar: CookieJar,
    success: Option<&str>,
    error: Option<&str>,
    destination: &str,
) -> Response {
    let mut jar = jar;

    if let Some(msg) = success {
        jar = jar.add(flash_cookie("flash_success", msg));
    }
    if let Some(msg) = error {
        jar = jar.add(flash_cookie("flash_error", msg));
    }

    (jar, Redirect::to(destination)).into_response()
}

/// Read both flash cookies and queue their removal. Returns the jar (with
/// removal cookies added) plus whatever messages were present.
pub(crate) fn take_flash(jar: CookieJar) -> (CookieJar, Option<String>, Option<String>) {
    let success = jar.get("flash_success").map(|c| c.value().to_owned());
    let error = jar.get("flash_error").map(|c| c.value().to_owned());

    let clear_success = Cookie::build(("flash_success", ""))
        .path("/")
        .max_age(time::Duration::seconds(0))
        .build();
    let clear_error = Cookie::build(("flash_error", ""))
        .path("/")
        .max_age(time::Duration::seconds(0))
        .build();

    (
        jar.remove(clear_success).remove(clear_error),
        success,
        error,
    )
}

fn flash_cookie(name: &'static str, msg: &str) -> Cookie<'static> {
    Cookie::build((name, msg.to_owned()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(30))
        .build()
}
