//! Builds an authentication context from a repository URI plus the
//! explicit credentials in `RepositoryConfig`: try the most specific
//! source first, fall back, never loop forever.

use std::path::PathBuf;

use git2::{Cred, CredentialType, RemoteCallbacks};
use url::Url;

use crate::config::RepositoryConfig;

/// Resolved authentication material for one fetch/clone attempt.
#[derive(Clone, Debug, Default)]
pub struct Credentials {
    username: Option<String>,
    password: Option<String>,
    passphrase: Option<String>,
    skip_ssl_validation: bool,
}

pub struct CredentialsProvider;

impl CredentialsProvider {
    /// Inspect the URI and the explicit config fields and build a
    /// `Credentials`. An explicit `(username, password)` pair always wins
    /// over whatever is embedded in the URI; a host-only URI with no
    /// explicit pair yields anonymous credentials.
    pub fn resolve(uri: &str, config: &RepositoryConfig) -> Credentials {
        let embedded = Url::parse(uri).ok().and_then(|url| {
            let user = url.username();
            if user.is_empty() {
                None
            } else {
                Some((user.to_string(), url.password().map(str::to_string)))
            }
        });

        let (username, password) = match (&config.username, &config.password) {
            (Some(u), p) => (Some(u.clone()), p.clone()),
            (None, _) => match embedded {
                Some((u, p)) => (Some(u), p),
                None => (None, None),
            },
        };

        Credentials {
            username,
            password,
            passphrase: config.passphrase.clone(),
            skip_ssl_validation: config.skip_ssl_validation,
        }
    }

    /// Wire this `Credentials` into a set of `RemoteCallbacks` for a
    /// fetch or clone. No retries here; a failure is surfaced by
    /// libgit2 as-is.
    pub fn configure<'a>(creds: &'a Credentials, callbacks: &mut RemoteCallbacks<'a>) {
        callbacks.credentials(move |_url, username_from_url, allowed| {
            let username = creds
                .username
                .as_deref()
                .or(username_from_url)
                .unwrap_or("git");

            if allowed.contains(CredentialType::USER_PASS_PLAINTEXT) {
                if let Some(password) = &creds.password {
                    return Cred::userpass_plaintext(username, password);
                }
            }

            if allowed.contains(CredentialType::SSH_KEY) {
                if let Some(passphrase) = &creds.passphrase {
                    if let Some(key) = default_ssh_key_path() {
                        return Cred::ssh_key(username, None, &key, Some(passphrase));
                    }
                }
                return Cred::ssh_key_from_agent(username);
            }

            if allowed.contains(CredentialType::USERNAME) {
                return Cred::username(username);
            }

            if allowed.contains(CredentialType::DEFAULT) {
                return Cred::default();
            }

            Cred::default()
        });

        if creds.skip_ssl_validation {
            callbacks.certificate_check(|_cert, _host| {
                Ok(git2::CertificateCheckStatus::CertificateOk)
            });
        }
    }
}

fn default_ssh_key_path() -> Option<PathBuf> {
    let home = dirs_home()?;
    let key = home.join(".ssh").join("id_rsa");
    key.exists().then_some(key)
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> RepositoryConfig {
        RepositoryConfig {
            uri: String::new(),
            basedir: PathBuf::from("/tmp"),
            working_directory: None,
            default_label: "main".into(),
            try_master_fallback: true,
            timeout_seconds: 5,
            refresh_rate_seconds: -1,
            clone_on_start: true,
            force_pull: false,
            delete_untracked_branches: false,
            skip_ssl_validation: false,
            clone_submodules: false,
            username: None,
            password: None,
            passphrase: None,
        }
    }

    #[test]
    fn explicit_pair_wins_over_embedded() {
        let mut config = base_config();
        config.username = Some("explicit".into());
        config.password = Some("secret".into());
        let creds =
            CredentialsProvider::resolve("https://embedded:pw@example.invalid/repo.git", &config);
        assert_eq!(creds.username.as_deref(), Some("explicit"));
        assert_eq!(creds.password.as_deref(), Some("secret"));
    }

    #[test]
    fn embedded_used_when_no_explicit_pair() {
        let config = base_config();
        let creds =
            CredentialsProvider::resolve("https://embedded:pw@example.invalid/repo.git", &config);
        assert_eq!(creds.username.as_deref(), Some("embedded"));
        assert_eq!(creds.password.as_deref(), Some("pw"));
    }

    #[test]
    fn host_only_uri_is_anonymous() {
        let config = base_config();
        let creds = CredentialsProvider::resolve("https://example.invalid/repo.git", &config);
        assert!(creds.username.is_none());
        assert!(creds.password.is_none());
    }
}
