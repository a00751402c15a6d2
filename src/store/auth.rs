use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::FirebaseConfig;

use super::StoreError;

/// Anonymous Firebase session shared by every backend request
pub struct AnonymousAuth {
    client: Client,
    api_key: String,
    identity_base: String,
    token_base: String,
    session: Mutex<Option<Session>>,
}

#[derive(Debug, Clone)]
struct Session {
    id_token: String,
    refresh_token: String,
    user_id: String,
    expires_at: DateTime<Utc>,
}

impl Session {
    /// Tokens are renewed a minute before they actually expire
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(60) < self.expires_at
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignUpResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
    local_id: String,
}

#[derive(Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
    user_id: String,
}

impl AnonymousAuth {
    pub fn new(client: Client, config: &FirebaseConfig, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            identity_base: config.identity_base.clone(),
            token_base: config.token_base.clone(),
            session: Mutex::new(None),
        }
    }

    /// Return a valid id token, signing in or refreshing as needed
    pub async fn ensure_session(&self) -> Result<String, StoreError> {
        let mut session = self.session.lock().await;
        let now = Utc::now();

        if let Some(current) = session.as_ref() {
            if current.is_fresh(now) {
                return Ok(current.id_token.clone());
            }
            debug!("Session for {} expiring, refreshing", current.user_id);
            let refresh_token = current.refresh_token.clone();
            match self.refresh(&refresh_token).await {
                Ok(renewed) => {
                    let token = renewed.id_token.clone();
                    *session = Some(renewed);
                    return Ok(token);
                }
                Err(e) => warn!("Token refresh failed, signing in again: {}", e),
            }
        }

        let created = self.sign_up().await?;
        info!("🔑 Anonymous session started ({})", created.user_id);
        let token = created.id_token.clone();
        *session = Some(created);
        Ok(token)
    }

    async fn sign_up(&self) -> Result<Session, StoreError> {
        let url = format!("{}/accounts:signUp", self.identity_base);
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&json!({ "returnSecureToken": true }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Auth(format!("sign-up returned {}: {}", status, body)));
        }

        let body: SignUpResponse = response.json().await?;
        Ok(Session {
            expires_at: expiry(&body.expires_in)?,
            id_token: body.id_token,
            refresh_token: body.refresh_token,
            user_id: body.local_id,
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, StoreError> {
        let url = format!("{}/token", self.token_base);
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .form(&[("grant_type", "refresh_token"), ("refresh_token", refresh_token)])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Auth(format!("refresh returned {}: {}", status, body)));
        }

        let body: RefreshResponse = response.json().await?;
        Ok(Session {
            expires_at: expiry(&body.expires_in)?,
            id_token: body.id_token,
            refresh_token: body.refresh_token,
            user_id: body.user_id,
        })
    }
}

fn expiry(expires_in: &str) -> Result<DateTime<Utc>, StoreError> {
    let secs = expires_in
        .trim()
        .parse::<i64>()
        .map_err(|_| StoreError::Auth(format!("bad expiresIn '{}'", expires_in)))?;
    Ok(Utc::now() + Duration::seconds(secs))
}
