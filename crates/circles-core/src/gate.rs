//! [`IdentityGate`] — OAuth2 login, the allow-list, and session checks.
//!
//! The allow-list is consulted only the first time a provider identity is
//! seen. Once a user row exists it is trusted on every later login, so
//! removing an email from the list does not revoke an existing account.

use std::{collections::HashSet, future::Future, sync::Arc};

use serde::Deserialize;
use tracing::{info, warn};

use crate::{
  Error, Result,
  store::BoardStore,
  user::{NewUser, Session, User},
};

// ─── Provider ────────────────────────────────────────────────────────────────

/// Bearer token returned by the provider's token endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken(pub String);

/// The subset of the provider's user-info response the board needs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProviderIdentity {
  /// Google's v1 endpoint calls this `id`; OpenID Connect calls it `sub`.
  #[serde(alias = "sub")]
  pub id:    String,
  pub email: String,
  pub name:  String,
}

/// An OAuth2 authorization-code identity provider.
///
/// Implementations must bound every network call with a timeout and report
/// failures as [`Error::ProviderUnavailable`].
pub trait IdentityProvider: Send + Sync {
  /// The authorization URL to send the browser to, carrying `state` through
  /// the round trip untouched.
  fn authorize_url(&self, state: &str) -> String;

  /// Exchange an authorization code for an access token.
  fn exchange_code<'a>(
    &'a self,
    code: &'a str,
  ) -> impl Future<Output = Result<AccessToken>> + Send + 'a;

  /// Fetch the identity behind an access token.
  fn user_info<'a>(
    &'a self,
    token: &'a AccessToken,
  ) -> impl Future<Output = Result<ProviderIdentity>> + Send + 'a;
}

/// What the provider sent back to the callback URL.
#[derive(Debug, Clone)]
pub enum ProviderResponse {
  Authorized { code: String, state: Option<String> },
  Denied { reason: String, description: String },
}

// ─── Allow-list ──────────────────────────────────────────────────────────────

/// Emails permitted to create an account. Loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
  emails: HashSet<String>,
}

#[derive(Deserialize)]
struct AllowListFile {
  allowed: Vec<String>,
}

impl AllowList {
  pub fn new<I, T>(emails: I) -> Self
  where
    I: IntoIterator<Item = T>,
    T: Into<String>,
  {
    Self { emails: emails.into_iter().map(Into::into).collect() }
  }

  /// Parse the `{"allowed": ["…", …]}` file format.
  pub fn from_json(json: &str) -> serde_json::Result<Self> {
    let file: AllowListFile = serde_json::from_str(json)?;
    Ok(Self::new(file.allowed))
  }

  pub fn contains(&self, email: &str) -> bool { self.emails.contains(email) }

  pub fn len(&self) -> usize { self.emails.len() }

  pub fn is_empty(&self) -> bool { self.emails.is_empty() }
}

// ─── Gate ────────────────────────────────────────────────────────────────────

/// A completed login.
#[derive(Debug, Clone)]
pub struct Login {
  pub user:      User,
  pub session:   Session,
  /// Where to send the browser next, if the flow carried a local path.
  pub return_to: Option<String>,
}

/// Only same-origin absolute paths are honoured as return targets.
fn local_path(target: &str) -> bool {
  target.starts_with('/') && !target.starts_with("//") && !target.starts_with("/\\")
}

pub struct IdentityGate<P, S> {
  provider:   P,
  store:      Arc<S>,
  allow_list: Arc<AllowList>,
}

impl<P, S> IdentityGate<P, S>
where
  P: IdentityProvider,
  S: BoardStore,
{
  pub fn new(provider: P, store: Arc<S>, allow_list: Arc<AllowList>) -> Self {
    Self { provider, store, allow_list }
  }

  pub fn provider(&self) -> &P { &self.provider }

  /// The provider URL that starts a login. `return_target` comes back as the
  /// OAuth `state` so the user lands where they started.
  pub fn begin_login(&self, return_target: Option<&str>) -> String {
    self.provider.authorize_url(return_target.unwrap_or_default())
  }

  /// Finish the authorization-code flow and open a session.
  pub async fn complete_login(&self, response: ProviderResponse) -> Result<Login> {
    let (code, state) = match response {
      ProviderResponse::Authorized { code, state } => (code, state),
      ProviderResponse::Denied { reason, description } => {
        warn!(%reason, %description, "provider denied authorization");
        return Err(Error::AuthDenied { reason, description });
      }
    };

    let token = self.provider.exchange_code(&code).await?;
    let identity = self.provider.user_info(&token).await?;

    let user = match self.find_user(&identity.id).await? {
      Some(user) => user,
      None => self.enroll(identity).await?,
    };

    let session = self
      .store
      .open_session(user.user_id)
      .await
      .map_err(Error::storage)?;

    info!(user_id = %user.user_id, "user signed in");
    Ok(Login {
      user,
      session,
      return_to: state.filter(|s| local_path(s)),
    })
  }

  /// Create the account for a first-time identity, if its email is allowed.
  async fn enroll(&self, identity: ProviderIdentity) -> Result<User> {
    if !self.allow_list.contains(&identity.email) {
      warn!(email = %identity.email, "sign-in refused: email not on allow-list");
      return Err(Error::NotAllowed(identity.email));
    }

    let name = identity.name.clone();
    let inserted = self
      .store
      .add_user(NewUser {
        provider_id: identity.id.clone(),
        email:       identity.email,
        name:        identity.name,
      })
      .await
      .map_err(Error::storage)?;

    if let Some(user) = inserted {
      info!(user_id = %user.user_id, "new user enrolled");
      return Ok(user);
    }

    // A racing login may have enrolled the same identity first.
    self
      .find_user(&identity.id)
      .await?
      .ok_or(Error::NameTaken(name))
  }

  async fn find_user(&self, provider_id: &str) -> Result<Option<User>> {
    self
      .store
      .find_user_by_provider_id(provider_id)
      .await
      .map_err(Error::storage)
  }

  /// End the session behind `token`. Never fails: a storage error is logged
  /// and the caller still clears the client's cookie.
  pub async fn logout(&self, token: Option<&str>) {
    let Some(token) = token else { return };
    if let Err(e) = self.store.close_session(token).await {
      warn!(error = %e, "failed to close session on logout");
    }
  }

  /// Resolve the signed-in user, or [`Error::Unauthenticated`].
  pub async fn current_user(&self, token: Option<&str>) -> Result<User> {
    current_user(self.store.as_ref(), token).await
  }
}

/// Session lookup shared by the gate and request extractors that only hold
/// a store.
pub async fn current_user<S: BoardStore>(store: &S, token: Option<&str>) -> Result<User> {
  let Some(token) = token else {
    return Err(Error::Unauthenticated);
  };
  store
    .session_user(token)
    .await
    .map_err(Error::storage)?
    .ok_or(Error::Unauthenticated)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn allow_list_parses_file_format() {
    let list = AllowList::from_json(r#"{"allowed": ["a@example.com", "b@example.com"]}"#)
      .unwrap();
    assert_eq!(list.len(), 2);
    assert!(list.contains("a@example.com"));
    assert!(!list.contains("c@example.com"));
  }

  #[test]
  fn allow_list_rejects_missing_key() {
    assert!(AllowList::from_json(r#"{"emails": []}"#).is_err());
  }

  #[test]
  fn only_local_paths_are_return_targets() {
    assert!(local_path("/circles/1"));
    assert!(!local_path("//evil.example.com"));
    assert!(!local_path("/\\evil.example.com"));
    assert!(!local_path("https://evil.example.com/"));
    assert!(!local_path(""));
  }

  #[test]
  fn recoverable_errors_are_classified() {
    assert!(Error::DuplicateTopic("books".into()).is_recoverable());
    assert!(Error::EmptyEdit.is_recoverable());
    assert!(!Error::Unauthenticated.is_recoverable());
    assert!(!Error::ProviderUnavailable("timeout".into()).is_recoverable());
  }
}
