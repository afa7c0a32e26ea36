//! Session-cookie extractor.

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::CookieJar;
use circles_core::{board::Board, gate, store::BoardStore, user::User};

use crate::error::ApiError;

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "circles_session";

/// The signed-in user. Present in a handler means the request carried a
/// live session; otherwise the request is rejected with 401.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// The session token from the request's cookies, if any.
pub fn session_token(jar: &CookieJar) -> Option<&str> {
  jar.get(SESSION_COOKIE).map(|c| c.value())
}

impl<S> FromRequestParts<Board<S>> for CurrentUser
where
  S: BoardStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    board: &Board<S>,
  ) -> Result<Self, Self::Rejection> {
    let jar = CookieJar::from_headers(&parts.headers);
    let user = gate::current_user(board.store().as_ref(), session_token(&jar)).await?;
    Ok(CurrentUser(user))
  }
}
