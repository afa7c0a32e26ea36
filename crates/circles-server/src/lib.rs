//! HTTP front end for Circles.
//!
//! Adds the OAuth2 login flow (`/login`, `/login/authorized`, `/logout`) in
//! front of the JSON API from `circles-api`, and holds the runtime
//! configuration the binary deserialises from `config.toml`.

pub mod oauth;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  extract::{Query, State},
  http::{HeaderMap, header},
  response::Redirect,
  routing::get,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use circles_api::{ApiError, SESSION_COOKIE, session::session_token};
use circles_core::{
  gate::{IdentityGate, IdentityProvider, ProviderResponse},
  store::BoardStore,
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:            String,
  pub port:            u16,
  /// Public origin, e.g. `https://circles.example.com`.
  pub base_url:        String,
  pub store_path:      PathBuf,
  /// JSON file of the form `{"allowed": ["alice@example.com"]}`.
  pub allow_list_path: PathBuf,
  /// Set the `Secure` attribute on the session cookie.
  #[serde(default)]
  pub cookie_secure:   bool,
  pub oauth:           OAuthConfig,
}

/// Identity provider settings. Endpoints default to Google's.
#[derive(Debug, Deserialize, Clone)]
pub struct OAuthConfig {
  pub client_id:     String,
  pub client_secret: String,
  #[serde(default = "default_authorize_url")]
  pub authorize_url: String,
  #[serde(default = "default_token_url")]
  pub token_url:     String,
  #[serde(default = "default_userinfo_url")]
  pub userinfo_url:  String,
  #[serde(default = "default_scope")]
  pub scope:         String,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs:  u64,
}

fn default_authorize_url() -> String { "https://accounts.google.com/o/oauth2/auth".into() }
fn default_token_url() -> String { "https://accounts.google.com/o/oauth2/token".into() }
fn default_userinfo_url() -> String { "https://www.googleapis.com/oauth2/v1/userinfo".into() }
fn default_scope() -> String { "https://www.googleapis.com/auth/userinfo.email".into() }
fn default_timeout_secs() -> u64 { 10 }

impl Default for OAuthConfig {
  fn default() -> Self {
    Self {
      client_id:     String::new(),
      client_secret: String::new(),
      authorize_url: default_authorize_url(),
      token_url:     default_token_url(),
      userinfo_url:  default_userinfo_url(),
      scope:         default_scope(),
      timeout_secs:  default_timeout_secs(),
    }
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through the login handlers.
pub struct AppState<P, S> {
  pub store:  Arc<S>,
  pub gate:   Arc<IdentityGate<P, S>>,
  pub config: Arc<ServerConfig>,
}

impl<P, S> Clone for AppState<P, S> {
  fn clone(&self) -> Self {
    Self {
      store:  self.store.clone(),
      gate:   self.gate.clone(),
      config: self.config.clone(),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application router: login flow plus the JSON API.
pub fn router<P, S>(state: AppState<P, S>) -> Router
where
  P: IdentityProvider + 'static,
  S: BoardStore + 'static,
{
  let api = circles_api::api_router(state.store.clone());

  Router::new()
    .route("/",                 get(|| async { Redirect::to("/circles") }))
    .route("/login",            get(login::<P, S>))
    .route("/login/authorized", get(authorized::<P, S>))
    .route("/logout",           get(logout::<P, S>))
    .with_state(state)
    .merge(api)
    .layer(TraceLayer::new_for_http())
}

// ─── Login flow ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginParams {
  pub next: Option<String>,
}

/// The path part of `url` if it points back at this server.
fn same_origin_path<'a>(url: &'a str, base_url: &str) -> Option<&'a str> {
  url
    .strip_prefix(base_url.trim_end_matches('/'))
    .filter(|path| path.starts_with('/'))
}

/// `GET /login[?next=/path]` — 303 to the provider. Without `next`, a
/// same-origin `Referer` becomes the return target.
async fn login<P, S>(
  State(app): State<AppState<P, S>>,
  Query(params): Query<LoginParams>,
  headers: HeaderMap,
) -> Redirect
where
  P: IdentityProvider + 'static,
  S: BoardStore + 'static,
{
  let referer = headers
    .get(header::REFERER)
    .and_then(|v| v.to_str().ok())
    .and_then(|r| same_origin_path(r, &app.config.base_url));
  let target = params.next.as_deref().or(referer);
  Redirect::to(&app.gate.begin_login(target))
}

/// Query string the provider appends to the callback URL.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
  pub code:              Option<String>,
  pub state:             Option<String>,
  pub error:             Option<String>,
  pub error_reason:      Option<String>,
  pub error_description: Option<String>,
}

impl From<CallbackParams> for ProviderResponse {
  fn from(p: CallbackParams) -> Self {
    match p.code {
      Some(code) => ProviderResponse::Authorized { code, state: p.state },
      None => ProviderResponse::Denied {
        reason:      p
          .error_reason
          .or(p.error)
          .unwrap_or_else(|| "missing_code".to_owned()),
        description: p.error_description.unwrap_or_default(),
      },
    }
  }
}

/// `GET /login/authorized` — sets the session cookie and 303s to the
/// return target, or `/`.
async fn authorized<P, S>(
  State(app): State<AppState<P, S>>,
  jar: CookieJar,
  Query(params): Query<CallbackParams>,
) -> Result<(CookieJar, Redirect), ApiError>
where
  P: IdentityProvider + 'static,
  S: BoardStore + 'static,
{
  let login = app.gate.complete_login(params.into()).await?;
  let cookie = Cookie::build((SESSION_COOKIE, login.session.token))
    .http_only(true)
    .same_site(SameSite::Lax)
    .path("/")
    .secure(app.config.cookie_secure);
  let to = login.return_to.unwrap_or_else(|| "/".to_owned());
  Ok((jar.add(cookie), Redirect::to(&to)))
}

/// `GET /logout` — ends the session (if any) and clears the cookie.
async fn logout<P, S>(
  State(app): State<AppState<P, S>>,
  jar: CookieJar,
) -> (CookieJar, Redirect)
where
  P: IdentityProvider + 'static,
  S: BoardStore + 'static,
{
  app.gate.logout(session_token(&jar)).await;
  (jar.remove(Cookie::build(SESSION_COOKIE).path("/")), Redirect::to("/"))
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::Response,
  };
  use circles_core::{
    gate::{AccessToken, AllowList, ProviderIdentity},
    user::NewUser,
  };
  use circles_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  use crate::oauth::OAuthClient;

  /// Provider that authorizes any code as one fixed identity.
  struct ScriptedProvider {
    identity: ProviderIdentity,
  }

  impl ScriptedProvider {
    fn new(email: &str, name: &str) -> Self {
      Self {
        identity: ProviderIdentity {
          id:    format!("g-{name}"),
          email: email.into(),
          name:  name.into(),
        },
      }
    }
  }

  impl IdentityProvider for ScriptedProvider {
    fn authorize_url(&self, state: &str) -> String {
      format!("https://provider.test/auth?state={state}")
    }

    async fn exchange_code<'a>(&'a self, code: &'a str) -> circles_core::Result<AccessToken> {
      Ok(AccessToken(format!("token-for-{code}")))
    }

    async fn user_info<'a>(
      &'a self,
      _token: &'a AccessToken,
    ) -> circles_core::Result<ProviderIdentity> {
      Ok(self.identity.clone())
    }
  }

  fn config() -> ServerConfig {
    ServerConfig {
      host:            "127.0.0.1".to_string(),
      port:            8080,
      base_url:        "http://localhost:8080".to_string(),
      store_path:      PathBuf::from(":memory:"),
      allow_list_path: PathBuf::from("allowed.json"),
      cookie_secure:   false,
      oauth:           OAuthConfig {
        client_id:     "circles-client".to_string(),
        client_secret: "shh".to_string(),
        ..OAuthConfig::default()
      },
    }
  }

  async fn state_with<P: IdentityProvider>(provider: P) -> AppState<P, SqliteStore> {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let allow = Arc::new(AllowList::new(["alice@example.com"]));

    AppState {
      gate:   Arc::new(IdentityGate::new(provider, store.clone(), allow)),
      store,
      config: Arc::new(config()),
    }
  }

  async fn make_state() -> AppState<OAuthClient, SqliteStore> {
    let cfg = config();
    state_with(OAuthClient::new(cfg.oauth, &cfg.base_url).unwrap()).await
  }

  async fn get<P: IdentityProvider + 'static>(
    state:   AppState<P, SqliteStore>,
    uri:     &str,
    headers: Vec<(header::HeaderName, &str)>,
  ) -> Response {
    let mut builder = Request::builder().method("GET").uri(uri);
    for (k, v) in headers {
      builder = builder.header(k, v);
    }
    router(state).oneshot(builder.body(Body::empty()).unwrap()).await.unwrap()
  }

  async fn json_body(resp: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  fn location(resp: &Response) -> &str {
    resp.headers().get(header::LOCATION).unwrap().to_str().unwrap()
  }

  // ── Login ───────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn login_redirects_to_provider_with_next_as_state() {
    let state = make_state().await;
    let resp = get(state, "/login?next=/circles", vec![]).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let loc = location(&resp);
    assert!(loc.starts_with("https://accounts.google.com/o/oauth2/auth?"), "{loc}");
    assert!(loc.contains("client_id=circles-client"), "{loc}");
    assert!(loc.contains("state=%2Fcircles"), "{loc}");
  }

  #[tokio::test]
  async fn login_falls_back_to_same_origin_referer() {
    let state = make_state().await;
    let resp = get(
      state.clone(),
      "/login",
      vec![(header::REFERER, "http://localhost:8080/circles/abc")],
    )
    .await;
    assert!(location(&resp).contains("state=%2Fcircles%2Fabc"));

    let resp = get(state, "/login", vec![(header::REFERER, "https://evil.test/x")]).await;
    let loc = location(&resp);
    assert!(loc.ends_with("state="), "{loc}");
  }

  #[tokio::test]
  async fn denied_callback_reports_reason_verbatim() {
    let state = make_state().await;
    let resp = get(
      state,
      "/login/authorized?error=access_denied&error_reason=user_denied&error_description=nope",
      vec![],
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert!(resp.headers().get(header::SET_COOKIE).is_none());

    let body = json_body(resp).await;
    assert_eq!(body["error"], "Access denied: reason=user_denied error=nope");
  }

  #[tokio::test]
  async fn authorized_callback_sets_session_cookie_and_redirects() {
    let state = state_with(ScriptedProvider::new("alice@example.com", "alice")).await;
    let resp = get(
      state.clone(),
      "/login/authorized?code=abc&state=%2Fcircles",
      vec![],
    )
    .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/circles");

    let set = resp.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(set.starts_with(&format!("{SESSION_COOKIE}=")), "{set}");
    assert!(set.contains("HttpOnly"), "{set}");
    assert!(set.contains("SameSite=Lax"), "{set}");
    assert!(set.contains("Path=/"), "{set}");
    assert!(!set.contains("Secure"), "{set}");

    // The issued cookie authenticates API requests.
    let pair = set.split(';').next().unwrap().to_owned();
    let resp = get(state, "/me", vec![(header::COOKIE, pair.as_str())]).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["email"], "alice@example.com");
  }

  #[tokio::test]
  async fn authorized_callback_without_local_state_lands_on_root() {
    let state = state_with(ScriptedProvider::new("alice@example.com", "alice")).await;

    let resp = get(state.clone(), "/login/authorized?code=abc", vec![]).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/");

    let resp = get(
      state,
      "/login/authorized?code=abc&state=https%3A%2F%2Fevil.test%2F",
      vec![],
    )
    .await;
    assert_eq!(location(&resp), "/");
  }

  #[tokio::test]
  async fn unlisted_first_login_is_forbidden_without_cookie() {
    let state = state_with(ScriptedProvider::new("mallory@example.com", "mallory")).await;
    let resp = get(state.clone(), "/login/authorized?code=abc", vec![]).await;

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert!(resp.headers().get(header::SET_COOKIE).is_none());
    let body = json_body(resp).await;
    assert!(body["error"].as_str().unwrap().contains("mallory@example.com"));

    assert!(
      state
        .store
        .find_user_by_provider_id("g-mallory")
        .await
        .unwrap()
        .is_none()
    );
  }

  #[test]
  fn callback_without_code_or_error_is_denied() {
    match ProviderResponse::from(CallbackParams::default()) {
      ProviderResponse::Denied { reason, description } => {
        assert_eq!(reason, "missing_code");
        assert_eq!(description, "");
      }
      other => panic!("expected denial, got {other:?}"),
    }
  }

  // ── Logout ──────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn logout_ends_session_and_clears_cookie() {
    let state = make_state().await;
    let user = state
      .store
      .add_user(NewUser {
        provider_id: "g-alice".into(),
        email:       "alice@example.com".into(),
        name:        "alice".into(),
      })
      .await
      .unwrap()
      .unwrap();
    let session = state.store.open_session(user.user_id).await.unwrap();
    let cookie = format!("{SESSION_COOKIE}={}", session.token);

    let resp = get(state.clone(), "/me", vec![(header::COOKIE, cookie.as_str())]).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = get(state.clone(), "/logout", vec![(header::COOKIE, cookie.as_str())]).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/");
    let set = resp.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(set.starts_with(&format!("{SESSION_COOKIE}=")), "{set}");
    assert!(set.contains("Max-Age=0"), "{set}");

    let resp = get(state, "/me", vec![(header::COOKIE, cookie.as_str())]).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn logout_without_session_still_redirects() {
    let state = make_state().await;
    let resp = get(state, "/logout", vec![]).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/");
  }
}
