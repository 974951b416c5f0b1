//! Client for the note-taking service's open platform
//!
//! Covers the handful of calls the tracker needs: app and tenant tokens, the OAuth
//! code exchange, and table/record operations on one multi-dimensional table app.

pub mod client;

pub use client::{
    AppCredentials, OpenPlatformClient, TableApi, TableError, UserToken, DEFAULT_BASE_URL,
};
