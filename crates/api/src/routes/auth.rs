//! Operator sign-in and sign-out.

use advisory_site_core::auth::AuthError;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use crate::error::{ApiResult, LOGIN_PATH};
use crate::middleware::session::{cleared_session_cookie, session_cookie};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(LOGIN_PATH, get(login_page).post(login))
        .route("/admin/logout", post(logout))
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

async fn login_page(State(state): State<AppState>) -> ApiResult<Html<String>> {
    Ok(Html(state.pages().render_login("", None)?))
}

fn login_failure(state: &AppState, status: StatusCode, email: &str, message: &str) -> ApiResult<Response> {
    let html = state.pages().render_login(email, Some(message))?;
    Ok((status, Html(html)).into_response())
}

async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> ApiResult<Response> {
    let email = form.email.trim();
    if email.is_empty() || form.password.is_empty() {
        return login_failure(
            &state,
            StatusCode::UNPROCESSABLE_ENTITY,
            email,
            "Email and password are required",
        );
    }

    match state.auth().sign_in(email, &form.password).await {
        Ok(session) => {
            tracing::info!(email, "operator signed in");
            let jar = jar.add(session_cookie(
                session.access_token,
                state.config().secure_cookies,
            ));
            Ok((jar, Redirect::to("/admin")).into_response())
        }
        Err(AuthError::InvalidCredentials) => {
            tracing::info!(email, "rejected sign-in");
            login_failure(&state, StatusCode::UNAUTHORIZED, email, "Invalid email or password")
        }
        Err(err) => {
            tracing::warn!(error = %err, "sign-in failed");
            login_failure(
                &state,
                StatusCode::BAD_GATEWAY,
                email,
                "Sign-in is unavailable right now. Please try again.",
            )
        }
    }
}

async fn logout(jar: CookieJar) -> impl IntoResponse {
    (jar.remove(cleared_session_cookie()), Redirect::to(LOGIN_PATH))
}
