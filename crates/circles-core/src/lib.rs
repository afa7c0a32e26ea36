//! Core types and trait definitions for the Circles discussion board.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends implement [`store::BoardStore`]; identity providers
//! implement [`gate::IdentityProvider`]. The rules of the board live in
//! [`board::Board`] and [`gate::IdentityGate`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod board;
pub mod circle;
pub mod error;
pub mod gate;
pub mod post;
pub mod store;
pub mod user;

pub use error::{Error, Result};
