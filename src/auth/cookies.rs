use std::time::Duration;

use axum_extra::extract::cookie::{Cookie, SameSite};
use time::{Duration as TimeDuration, OffsetDateTime};

pub const SESSION_COOKIE: &str = "token";

pub fn session_cookie(
    token: String,
    ttl: Duration,
    secure: bool,
    same_site: Option<SameSite>,
) -> Cookie<'static> {
    let mut builder = Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .secure(secure)
        .path("/")
        .max_age(TimeDuration::seconds(ttl.as_secs() as i64));
    if let Some(same_site) = same_site {
        builder = builder.same_site(same_site);
    }
    builder.build()
}

/// Empty value with an epoch expiry; the browser drops it immediately.
pub fn cleared_session_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .http_only(true)
        .secure(secure)
        .path("/")
        .expires(OffsetDateTime::UNIX_EPOCH)
        .build()
}
