//! A git-backed, versioned configuration server.
//!
//! The `git` module holds the repository lifecycle (clone, fetch, branch
//! switching, the per-repository refresh state machine); `environment`
//! turns a checked-out working copy into an ordered list of property
//! sources; `encryption` implements the `/encrypt` and `/decrypt`
//! endpoints; `http` wires both onto an axum router.

pub mod config;
pub mod encryption;
pub mod environment;
pub mod error;
pub mod git;
pub mod http;
pub mod util;

pub use config::{RepositoryConfig, ServerConfig};
pub use error::{ConfdError, ConfdResult, ConfdResultExt};
