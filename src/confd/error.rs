//! Domain error taxonomy and the `chain_err` context helper.
//!
//! The git subsystem unwinds through several layers (libgit2 -> our
//! component -> the orchestrator) and each layer wants to attach a short
//! human-readable breadcrumb without losing the original cause. `ConfdResult`
//! is backed by `anyhow::Error` for the "this failed, here's why" case, with
//! a small set of well-known variants callers can match on to decide an
//! HTTP status.

use std::fmt;

use thiserror::Error;

pub type ConfdResult<T> = anyhow::Result<T>;

/// Attach a lazily-built context message to any error convertible into
/// `anyhow::Error`.
pub trait ConfdResultExt<T> {
    fn chain_err<F, D>(self, f: F) -> anyhow::Result<T>
    where
        F: FnOnce() -> D,
        D: fmt::Display + Send + Sync + 'static;
}

impl<T, E> ConfdResultExt<T> for Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn chain_err<F, D>(self, f: F) -> anyhow::Result<T>
    where
        F: FnOnce() -> D,
        D: fmt::Display + Send + Sync + 'static,
    {
        self.map_err(|e| {
            let err = e.into();
            let context = f();
            tracing::trace!(%err, %context, "error");
            err.context(context)
        })
    }
}

/// Errors the orchestrator and the encryption service raise that the HTTP
/// layer needs to translate into a specific status code and body.
#[derive(Debug, Error)]
pub enum ConfdError {
    #[error("no such label: {0}")]
    NoSuchLabel(String),

    #[error("no such repository: {0}")]
    NoSuchRepository(String),

    #[error("cannot load environment")]
    CannotLoadEnvironment(#[source] anyhow::Error),

    #[error("no key was installed for encryption service")]
    KeyNotInstalled,

    #[error("no public key available")]
    KeyNotAvailable,

    #[error("the encryption algorithm is not strong enough")]
    EncryptionTooWeak,

    #[error("text not encrypted with this key")]
    InvalidCipher,

    #[error("server-side decryption is not supported")]
    DecryptionNotSupported,

    #[error("key data not in correct format (PEM or jks keystore)")]
    KeyFormat,
}

impl ConfdError {
    /// `{status, description}` pair used by the HTTP JSON error body.
    pub fn status_and_description(&self) -> (&'static str, String) {
        match self {
            ConfdError::NoSuchLabel(label) => ("NOT_FOUND", format!("No such label: {label}")),
            ConfdError::NoSuchRepository(uri) => {
                ("NOT_FOUND", format!("No such repository: {uri}"))
            }
            ConfdError::CannotLoadEnvironment(cause) => {
                ("BAD_REQUEST", format!("Cannot load environment: {cause}"))
            }
            ConfdError::KeyNotInstalled => (
                "NO_KEY",
                "No key was installed for encryption service".to_string(),
            ),
            ConfdError::KeyNotAvailable => ("NOT_FOUND", "No public key available".to_string()),
            ConfdError::EncryptionTooWeak => (
                "INVALID",
                "The encryption algorithm is not strong enough".to_string(),
            ),
            ConfdError::InvalidCipher => {
                ("INVALID", "Text not encrypted with this key".to_string())
            }
            ConfdError::DecryptionNotSupported => (
                "BAD_REQUEST",
                "Server-side decryption is not supported".to_string(),
            ),
            ConfdError::KeyFormat => (
                "BAD_REQUEST",
                "Key data not in correct format (PEM or jks keystore)".to_string(),
            ),
        }
    }

    /// Inspect a git2 error and map it onto the domain error that best
    /// describes it: a missing ref is a label problem, not a
    /// transport one.
    pub fn from_git(err: git2::Error, label: &str, uri: &str) -> ConfdError {
        use git2::ErrorCode::*;
        match err.code() {
            NotFound | UnbornBranch => ConfdError::NoSuchLabel(label.to_string()),
            _ => match err.class() {
                git2::ErrorClass::Net | git2::ErrorClass::Ssh | git2::ErrorClass::Http => {
                    ConfdError::NoSuchRepository(uri.to_string())
                }
                _ => ConfdError::NoSuchRepository(uri.to_string()),
            },
        }
    }
}
