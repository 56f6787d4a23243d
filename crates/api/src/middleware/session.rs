use advisory_site_core::auth::session::SessionClaims;
use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::error::ApiError;
use crate::state::AppState;

/// Cookie carrying the operator's access token.
pub const SESSION_COOKIE: &str = "advisory_session";

/// A signed-in operator, taken from the session cookie.
///
/// Add this as a handler parameter to require a session. Requests without a
/// valid one are redirected to the login page.
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub claims: SessionClaims,
}

impl AdminSession {
    /// Name recorded against writes.
    pub fn actor(&self) -> &str {
        self.claims.actor()
    }
}

impl FromRequestParts<AppState> for AdminSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_string())
            .ok_or(ApiError::Unauthorized)?;

        let claims = state
            .sessions()
            .verify(&token)
            .map_err(|_| ApiError::Unauthorized)?;
        Ok(AdminSession { claims })
    }
}

/// Http-only cookie scoped to the admin routes.
pub fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/admin")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

/// Cookie value that clears the session.
pub fn cleared_session_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, "")).path("/admin").build()
}
