use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;

use super::{AuthError, AuthSession, Authenticator};
use crate::config::StoreConfig;

/// `Authenticator` over the hosted backend's password grant.
#[derive(Debug, Clone)]
pub struct HttpAuthenticator {
    client: Client,
    token_url: String,
    anon_key: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    user: Option<TokenUser>,
}

#[derive(Debug, Deserialize)]
struct TokenUser {
    email: Option<String>,
}

impl HttpAuthenticator {
    pub fn new(client: Client, config: &StoreConfig) -> Self {
        Self {
            client,
            token_url: format!("{}/auth/v1/token?grant_type=password", config.endpoint),
            anon_key: config.anon_key.clone(),
        }
    }
}

#[async_trait]
impl Authenticator for HttpAuthenticator {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let response = self
            .client
            .post(&self.token_url)
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| AuthError::Service(e.to_string()))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
                return Err(AuthError::InvalidCredentials)
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                return Err(AuthError::Service(format!("{status}: {body}")));
            }
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Service(format!("malformed token response: {e}")))?;
        Ok(AuthSession {
            access_token: token.access_token,
            expires_in: token.expires_in,
            email: token.user.and_then(|u| u.email),
        })
    }
}
