//! Token acquisition from a Keystone v2 style identity endpoint.
//!
//! The identity endpoint takes tenant-scoped password credentials and answers with an access
//! document; the only field consumed is `access.token.id`. Tokens are not cached: every storage
//! operation calls [`Authenticator::authenticate`] again.
//!
//! ```text
//! POST {auth_url}/tokens
//! {"auth": {"tenantId": "...", "passwordCredentials": {"username": "...", "password": "..."}}}
//!
//! 200 OK
//! {"access": {"token": {"id": "...", "expires": "..."}, ...}}
//! ```

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use crate::errors::AuthError;
use crate::types::{AuthToken, Credentials};

/// A trait for exchanging credentials for a token.
/// In practice this is [`KeystoneAuthenticator`], talking to the identity endpoint over http with
/// `reqwest`. [`StaticAuthenticator`] hands out a fixed token.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, credentials: &Credentials) -> Result<AuthToken, AuthError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AccessRequest<'a> {
    auth: AuthBody<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthBody<'a> {
    tenant_id: &'a str,
    password_credentials: PasswordCredentials<'a>,
}

#[derive(Serialize)]
struct PasswordCredentials<'a> {
    username: &'a str,
    password: &'a str,
}

impl<'a> From<&'a Credentials> for AccessRequest<'a> {
    fn from(credentials: &'a Credentials) -> Self {
        Self {
            auth: AuthBody {
                tenant_id: &credentials.tenant_id,
                password_credentials: PasswordCredentials {
                    username: &credentials.username,
                    password: &credentials.password,
                },
            },
        }
    }
}

#[derive(Deserialize)]
struct AccessResponse {
    access: Access,
}

#[derive(Deserialize)]
struct Access {
    token: Token,
}

#[derive(Deserialize)]
struct Token {
    id: String,
    #[serde(default)]
    expires: Option<String>,
}

/// Makes sure a url has a trailing slash.
///
/// Joining '/v2.0' and 'tokens' gives '/tokens', but '/v2.0/' and 'tokens' gives
/// '/v2.0/tokens'. Call this before calling .join
pub(crate) fn ensure_slash(url: &Url) -> Url {
    if url.path().ends_with('/') {
        url.clone()
    } else {
        let mut new_url = url.clone();
        let mut path = new_url.path().to_string();
        path.push('/');
        new_url.set_path(&path);
        new_url
    }
}

/// The concrete implementation of `Authenticator`.
pub struct KeystoneAuthenticator {
    client: Client,
    tokens_url: Url,
    request_timeout: Duration,
}

impl KeystoneAuthenticator {
    pub fn new(client: Client, auth_url: &Url, request_timeout: Duration) -> Result<Self, url::ParseError> {
        let tokens_url = ensure_slash(auth_url).join("tokens")?;
        Ok(Self {
            client,
            tokens_url,
            request_timeout,
        })
    }

    pub fn tokens_url(&self) -> &Url {
        &self.tokens_url
    }
}

#[async_trait]
impl Authenticator for KeystoneAuthenticator {
    #[instrument(skip(self), err)]
    async fn authenticate(&self, credentials: &Credentials) -> Result<AuthToken, AuthError> {
        let response = self
            .client
            .post(self.tokens_url.clone())
            .json(&AccessRequest::from(credentials))
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(AuthError::Request)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Failed to obtain token from identity endpoint");
            tracing::error!("Url was: {}", self.tokens_url);
            return Err(AuthError::Status { status, body });
        }

        // The body carries the token itself, so only its size goes to the logs
        let body_text = response.text().await.map_err(AuthError::Request)?;
        debug!("Identity response body: {} bytes", body_text.len());

        match serde_json::from_str::<AccessResponse>(&body_text) {
            Ok(parsed) => {
                let token = parsed.access.token;
                debug!(expires = ?token.expires, "Obtained token");
                Ok(AuthToken::new(token.id, token.expires))
            }
            Err(e) => {
                tracing::error!("Failed to parse identity response as JSON. Error: {}", e);
                Err(AuthError::MalformedResponse(e))
            }
        }
    }
}

/// A static implementation of `Authenticator` that returns a predefined token.
/// Used where the token is obtained out of band, e.g. a pre-issued service token.
pub struct StaticAuthenticator {
    token: AuthToken,
}

impl StaticAuthenticator {
    pub fn new(token: AuthToken) -> Self {
        Self { token }
    }
}

#[async_trait]
impl Authenticator for StaticAuthenticator {
    async fn authenticate(&self, _credentials: &Credentials) -> Result<AuthToken, AuthError> {
        debug!("Returning static token");
        Ok(self.token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::install_crypto_provider;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn authenticator(server: &MockServer) -> KeystoneAuthenticator {
        install_crypto_provider();
        let auth_url: Url = format!("{}/v2.0", server.uri()).parse().unwrap();
        KeystoneAuthenticator::new(Client::new(), &auth_url, Duration::from_secs(5)).unwrap()
    }

    fn credentials() -> Credentials {
        Credentials::new("tenant-1", "market@example.com", "s3cret")
    }

    #[test]
    fn test_ensure_slash() {
        let url: Url = "https://identity.example.com/v2.0".parse().unwrap();
        assert_eq!(ensure_slash(&url).join("tokens").unwrap().as_str(), "https://identity.example.com/v2.0/tokens");

        let url: Url = "https://identity.example.com/v2.0/".parse().unwrap();
        assert_eq!(ensure_slash(&url).join("tokens").unwrap().as_str(), "https://identity.example.com/v2.0/tokens");
    }

    #[test]
    fn test_request_wire_format() {
        let credentials = credentials();
        let value = serde_json::to_value(AccessRequest::from(&credentials)).unwrap();
        assert_eq!(
            value,
            json!({
                "auth": {
                    "tenantId": "tenant-1",
                    "passwordCredentials": {
                        "username": "market@example.com",
                        "password": "s3cret"
                    }
                }
            })
        );
    }

    #[test_log::test(tokio::test)]
    async fn test_authenticate_returns_token_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2.0/tokens"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({
                "auth": {
                    "tenantId": "tenant-1",
                    "passwordCredentials": {"username": "market@example.com", "password": "s3cret"}
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access": {
                    "token": {
                        "id": "token-abc",
                        "expires": "2026-10-17T12:00:00Z",
                        "tenant": {"id": "tenant-1", "name": "market"}
                    },
                    "serviceCatalog": [],
                    "user": {"id": "u1", "name": "market@example.com"}
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let token = authenticator(&server).authenticate(&credentials()).await.unwrap();
        assert_eq!(token.id(), "token-abc");
        assert_eq!(token.expires(), Some("2026-10-17T12:00:00Z"));
    }

    #[tokio::test]
    async fn test_authenticate_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2.0/tokens"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid credentials"))
            .mount(&server)
            .await;

        let err = authenticator(&server).authenticate(&credentials()).await.unwrap_err();
        match err {
            AuthError::Status { status, body } => {
                assert_eq!(status.as_u16(), 401);
                assert_eq!(body, "invalid credentials");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_authenticate_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": {"user": {}}})))
            .mount(&server)
            .await;

        let err = authenticator(&server).authenticate(&credentials()).await.unwrap_err();
        assert!(matches!(err, AuthError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_authenticate_network_error() {
        install_crypto_provider();
        // Point to a port that's not listening
        let auth_url: Url = "http://127.0.0.1:1/v2.0".parse().unwrap();
        let authenticator = KeystoneAuthenticator::new(Client::new(), &auth_url, Duration::from_secs(5)).unwrap();

        let err = authenticator.authenticate(&credentials()).await.unwrap_err();
        assert!(matches!(err, AuthError::Request(_)));
    }

    #[tokio::test]
    async fn test_static_authenticator() {
        let authenticator = StaticAuthenticator::new(AuthToken::new("fixed", None));
        let token = authenticator.authenticate(&credentials()).await.unwrap();
        assert_eq!(token.id(), "fixed");
    }
}
