//! OAuth2 authorization-code client for the configured identity provider.

use std::time::Duration;

use anyhow::{Context, Result};
use circles_core::{
  Error,
  gate::{AccessToken, IdentityProvider, ProviderIdentity},
};
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::OAuthConfig;

/// Talks to the provider's token and user-info endpoints.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct OAuthClient {
  client:        Client,
  config:        OAuthConfig,
  authorize_url: Url,
  redirect_uri:  String,
}

#[derive(Deserialize)]
struct TokenResponse {
  access_token: String,
}

fn unavailable(endpoint: &str, e: reqwest::Error) -> Error {
  tracing::warn!(endpoint, error = %e, "identity provider request failed");
  Error::ProviderUnavailable(format!("{endpoint}: {e}"))
}

impl OAuthClient {
  /// `base_url` is this server's public origin; the provider redirects back
  /// to `{base_url}/login/authorized`.
  pub fn new(config: OAuthConfig, base_url: &str) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .context("failed to build HTTP client")?;
    let authorize_url = Url::parse(&config.authorize_url)
      .with_context(|| format!("invalid authorize_url {:?}", config.authorize_url))?;
    let redirect_uri = format!("{}/login/authorized", base_url.trim_end_matches('/'));
    Ok(Self { client, config, authorize_url, redirect_uri })
  }
}

impl IdentityProvider for OAuthClient {
  fn authorize_url(&self, state: &str) -> String {
    let mut url = self.authorize_url.clone();
    url
      .query_pairs_mut()
      .append_pair("response_type", "code")
      .append_pair("client_id", &self.config.client_id)
      .append_pair("redirect_uri", &self.redirect_uri)
      .append_pair("scope", &self.config.scope)
      .append_pair("state", state);
    url.into()
  }

  async fn exchange_code<'a>(&'a self, code: &'a str) -> circles_core::Result<AccessToken> {
    let resp = self
      .client
      .post(&self.config.token_url)
      .form(&[
        ("grant_type", "authorization_code"),
        ("code", code),
        ("client_id", self.config.client_id.as_str()),
        ("client_secret", self.config.client_secret.as_str()),
        ("redirect_uri", self.redirect_uri.as_str()),
      ])
      .send()
      .await
      .and_then(|r| r.error_for_status())
      .map_err(|e| unavailable("token", e))?;

    let token: TokenResponse = resp.json().await.map_err(|e| unavailable("token", e))?;
    Ok(AccessToken(token.access_token))
  }

  async fn user_info<'a>(
    &'a self,
    token: &'a AccessToken,
  ) -> circles_core::Result<ProviderIdentity> {
    self
      .client
      .get(&self.config.userinfo_url)
      .bearer_auth(&token.0)
      .send()
      .await
      .and_then(|r| r.error_for_status())
      .map_err(|e| unavailable("userinfo", e))?
      .json::<ProviderIdentity>()
      .await
      .map_err(|e| unavailable("userinfo", e))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    Router,
    http::StatusCode,
    routing::{get, post},
  };
  use tokio::net::TcpListener;

  fn client() -> OAuthClient {
    let config = OAuthConfig {
      client_id:     "circles-client".into(),
      client_secret: "shh".into(),
      ..OAuthConfig::default()
    };
    OAuthClient::new(config, "http://localhost:8080/").unwrap()
  }

  #[test]
  fn authorize_url_carries_client_and_state() {
    let c = client();
    let url = Url::parse(&c.authorize_url("/circles/abc")).unwrap();
    assert_eq!(url.host_str(), Some("accounts.google.com"));

    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    let get = |k: &str| {
      pairs.iter().find(|(key, _)| key == k).map(|(_, v)| v.as_str())
    };
    assert_eq!(get("response_type"), Some("code"));
    assert_eq!(get("client_id"), Some("circles-client"));
    assert_eq!(get("redirect_uri"), Some("http://localhost:8080/login/authorized"));
    assert_eq!(get("scope"), Some("https://www.googleapis.com/auth/userinfo.email"));
    assert_eq!(get("state"), Some("/circles/abc"));
    assert!(get("client_secret").is_none());
  }

  #[test]
  fn invalid_authorize_url_is_rejected() {
    let config = OAuthConfig { authorize_url: "not a url".into(), ..OAuthConfig::default() };
    assert!(OAuthClient::new(config, "http://localhost").is_err());
  }

  // ── Provider failures ───────────────────────────────────────────────────────

  /// Client whose token and user-info endpoints live at `origin`.
  fn client_at(origin: &str) -> OAuthClient {
    let config = OAuthConfig {
      client_id:     "circles-client".into(),
      client_secret: "shh".into(),
      token_url:     format!("{origin}/token"),
      userinfo_url:  format!("{origin}/userinfo"),
      timeout_secs:  1,
      ..OAuthConfig::default()
    };
    OAuthClient::new(config, "http://localhost:8080").unwrap()
  }

  /// Serve a provider whose every endpoint fails with `status`.
  async fn failing_provider(status: StatusCode) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new()
      .route("/token", post(move || async move { status }))
      .route("/userinfo", get(move || async move { status }));
    tokio::spawn(async move { axum::serve(listener, app).await });
    format!("http://{addr}")
  }

  #[tokio::test]
  async fn token_endpoint_error_status_is_unavailable() {
    let origin = failing_provider(StatusCode::INTERNAL_SERVER_ERROR).await;
    let err = client_at(&origin).exchange_code("abc").await.unwrap_err();
    assert!(matches!(err, Error::ProviderUnavailable(_)), "{err}");
  }

  #[tokio::test]
  async fn userinfo_error_status_is_unavailable() {
    let origin = failing_provider(StatusCode::UNAUTHORIZED).await;
    let token = AccessToken("expired".into());
    let err = client_at(&origin).user_info(&token).await.unwrap_err();
    assert!(matches!(err, Error::ProviderUnavailable(_)), "{err}");
  }

  #[tokio::test]
  async fn unreachable_provider_is_unavailable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client_at(&format!("http://{addr}"))
      .exchange_code("abc")
      .await
      .unwrap_err();
    assert!(matches!(err, Error::ProviderUnavailable(_)), "{err}");
  }
}
