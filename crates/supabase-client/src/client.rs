//! Supabase HTTP client.

use crate::error::SupabaseError;
use crate::types::*;
use reqwest::{Client, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Supabase client for a single project.
///
/// Holds the service key as a `SecretString` so it never shows up in
/// logs or debug output. Built once per process and shared.
#[derive(Clone)]
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    service_key: SecretString,
}

impl SupabaseClient {
    /// Create a new client.
    ///
    /// With `timeout` set to `None` the HTTP client's defaults apply.
    pub fn new(
        base_url: impl Into<String>,
        service_key: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, SupabaseError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        let base_url: String = base_url.into();

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: SecretString::new(service_key.into()),
        })
    }

    /// Project base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check if the auth service answers its health endpoint.
    pub async fn health_check(&self) -> bool {
        self.client
            .get(format!("{}/auth/v1/health", self.base_url))
            .header("apikey", self.service_key.expose_secret())
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    /// Create a new auth user with email and password.
    #[instrument(skip(self, password))]
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<User, SupabaseError> {
        let response = self
            .service_request(
                self.client
                    .post(format!("{}/auth/v1/signup", self.base_url)),
            )
            .json(&PasswordCredentials { email, password })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(auth_error(response).await);
        }

        let body: SignUpResponse = decode(response).await?;
        let user = body.into_user();
        debug!(user_id = %user.id, "Auth user created");
        Ok(user)
    }

    /// Sign in with email and password, returning a session.
    #[instrument(skip(self, password))]
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, SupabaseError> {
        let response = self
            .service_request(
                self.client
                    .post(format!("{}/auth/v1/token", self.base_url))
                    .query(&[("grant_type", "password")]),
            )
            .json(&PasswordCredentials { email, password })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(auth_error(response).await);
        }

        decode(response).await
    }

    /// Resolve a user access token to the user it was issued for.
    #[instrument(skip(self, access_token))]
    pub async fn get_user(&self, access_token: &str) -> Result<User, SupabaseError> {
        let response = self
            .client
            .get(format!("{}/auth/v1/user", self.base_url))
            .header("apikey", self.service_key.expose_secret())
            .bearer_auth(access_token)
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                debug!("Access token rejected");
                Err(SupabaseError::InvalidToken)
            }
            status if status.is_success() => decode(response).await,
            _ => Err(auth_error(response).await),
        }
    }

    /// Select rows from a table.
    #[instrument(skip(self, filters), fields(filter_count = filters.len()))]
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        columns: &str,
        filters: &[Filter],
    ) -> Result<Vec<T>, SupabaseError> {
        let mut query = vec![("select".to_string(), columns.to_string())];
        query.extend(filters.iter().map(Filter::to_query));

        let response = self
            .service_request(self.client.get(self.table_url(table)).query(&query))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(postgrest_error(response).await);
        }

        decode(response).await
    }

    /// Insert rows into a table.
    #[instrument(skip(self, rows))]
    pub async fn insert<T: Serialize>(&self, table: &str, rows: &[T]) -> Result<(), SupabaseError> {
        let response = self
            .service_request(self.client.post(self.table_url(table)))
            .header("Prefer", "return=minimal")
            .json(rows)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(postgrest_error(response).await);
        }

        debug!(table, rows = rows.len(), "Rows inserted");
        Ok(())
    }

    /// Update the rows matching `filters`, returning the rows as updated.
    ///
    /// An empty result means no row matched, which callers use to detect
    /// a failed conditional update.
    #[instrument(skip(self, patch, filters), fields(filter_count = filters.len()))]
    pub async fn update<P: Serialize, T: DeserializeOwned>(
        &self,
        table: &str,
        patch: &P,
        filters: &[Filter],
    ) -> Result<Vec<T>, SupabaseError> {
        let query: Vec<(String, String)> = filters.iter().map(Filter::to_query).collect();

        let response = self
            .service_request(self.client.patch(self.table_url(table)).query(&query))
            .header("Prefer", "return=representation")
            .json(patch)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(postgrest_error(response).await);
        }

        decode(response).await
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// Attach the service key both as `apikey` and as bearer credential.
    fn service_request(&self, builder: RequestBuilder) -> RequestBuilder {
        let key = self.service_key.expose_secret();
        builder.header("apikey", key).bearer_auth(key)
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, SupabaseError> {
    let body = response.text().await?;
    debug!("Response body: {}", truncate(&body, 200));
    serde_json::from_str(&body).map_err(SupabaseError::from)
}

async fn auth_error(response: reqwest::Response) -> SupabaseError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<AuthErrorBody>(&text)
        .ok()
        .and_then(AuthErrorBody::into_message)
        .unwrap_or_else(|| fallback_message(status, &text));

    warn!(status = %status, message = %message, "Auth request failed");

    SupabaseError::Auth {
        status: status.as_u16(),
        message,
    }
}

async fn postgrest_error(response: reqwest::Response) -> SupabaseError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let body = serde_json::from_str::<PostgrestErrorBody>(&text).unwrap_or_default();

    warn!(
        status = %status,
        code = ?body.code,
        details = ?body.details,
        hint = ?body.hint,
        "PostgREST request failed"
    );

    SupabaseError::Postgrest {
        status: status.as_u16(),
        code: body.code,
        message: body
            .message
            .unwrap_or_else(|| fallback_message(status, &text)),
    }
}

fn fallback_message(status: StatusCode, text: &str) -> String {
    if text.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string()
    } else {
        text.to_string()
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation_trims_trailing_slash() {
        let client = SupabaseClient::new("https://demo.supabase.co/", "key", None).unwrap();
        assert_eq!(client.base_url(), "https://demo.supabase.co");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("abc", 10), "abc");
    }

    #[test]
    fn test_fallback_message() {
        assert_eq!(fallback_message(StatusCode::BAD_REQUEST, ""), "Bad Request");
        assert_eq!(fallback_message(StatusCode::BAD_REQUEST, "oops"), "oops");
    }
}
