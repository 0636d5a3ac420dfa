//! `confd-server`: reads a config file, clones/opens the configured
//! repositories, and serves the HTTP API.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use confd::config::ServerConfig;
use confd::encryption::EncryptionService;
use confd::git::{GitEnvironmentRepository, RepoContext};
use confd::http::{self, AppState};

#[derive(Parser, Debug)]
#[command(name = "confd-server", about = "Git-backed configuration server")]
struct Args {
    /// Path to a TOML config file describing the bind address and
    /// backing repositories.
    #[arg(long, default_value = "confd.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = ServerConfig::load(&args.config)?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(config.log_filter.clone()))
        .init();

    let mut repositories = HashMap::new();
    for (name, repo_config) in &config.repositories {
        let ctx = RepoContext::new(name.clone(), Arc::new(repo_config.clone()));
        repositories.insert(name.clone(), GitEnvironmentRepository::new(ctx));
    }

    let encryption = Arc::new(EncryptionService::new());
    if let Some(key) = &config.encrypt_key {
        encryption.install_key(key)?;
    }

    let state = Arc::new(AppState::new(repositories, encryption));
    http::serve(config.bind_addr, state).await
}
