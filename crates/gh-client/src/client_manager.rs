//! Authenticated GitHub client accessor
//!
//! Resolves a token for the configured host and lazily builds a single
//! octocrab-backed client that is handed out to callers.

use crate::client::{ClientProvider, GitHubClient};
use crate::{OctocrabClient, DEFAULT_HOST};
use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use octocrab::Octocrab;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;

/// Finds a personal access token for a host
#[derive(Debug, Clone)]
pub struct TokenResolver {
    /// `GITHUB_TOKEN` or `GH_TOKEN`, read once at construction
    default_token: Option<String>,
}

impl Default for TokenResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenResolver {
    pub fn new() -> Self {
        let default_token = std::env::var("GITHUB_TOKEN")
            .or_else(|_| std::env::var("GH_TOKEN"))
            .ok();

        Self { default_token }
    }

    /// Environment variable consulted first for the given host
    pub fn env_key(host: &str) -> String {
        format!(
            "GITHUB_TOKEN_{}",
            host.replace(['.', '-'], "_").to_uppercase()
        )
    }

    /// Token for `host` (None = github.com)
    ///
    /// Looks at [`TokenResolver::env_key`] first, then asks the `gh` CLI,
    /// and on github.com finally falls back to the generic token.
    pub async fn get_token(&self, host: Option<&str>) -> Result<String> {
        let host = host.unwrap_or(DEFAULT_HOST);

        let env_key = Self::env_key(host);
        if let Ok(token) = std::env::var(&env_key) {
            debug!("{}: token from {}", host, env_key);
            return Ok(token);
        }

        debug!("{}: asking gh CLI for a token", host);
        let output = tokio::process::Command::new("gh")
            .args(["auth", "token", "--hostname", host])
            .output()
            .await;

        match output {
            Ok(output) if output.status.success() => {
                let token = String::from_utf8(output.stdout)
                    .context("gh auth token printed non UTF-8 output")?
                    .trim()
                    .to_string();
                if !token.is_empty() {
                    debug!("{}: token from gh CLI", host);
                    return Ok(token);
                }
            }
            Ok(_) => debug!("gh auth token returned no token for {}", host),
            Err(e) => debug!("Could not run gh CLI: {}", e),
        }

        if host == DEFAULT_HOST {
            if let Some(ref token) = self.default_token {
                debug!("{}: token from GITHUB_TOKEN/GH_TOKEN", host);
                return Ok(token.clone());
            }
        }

        anyhow::bail!(
            "no GitHub token for {}: export {} or run `gh auth login --hostname {}`",
            host,
            env_key,
            host
        )
    }
}

/// Builds and hands out the authenticated client for one host
///
/// The client is created on first use and shared afterwards.
///
/// # Example
///
/// ```rust,ignore
/// use gh_client::{ClientManager, ClientProvider};
/// use tokio_util::sync::CancellationToken;
///
/// let manager = ClientManager::new(None);
/// let client = manager.client(&CancellationToken::new()).await?;
/// ```
pub struct ClientManager {
    host: Option<String>,
    tokens: TokenResolver,
    client: OnceCell<Arc<OctocrabClient>>,
}

impl ClientManager {
    /// Create a manager for the given host (None = github.com)
    pub fn new(host: Option<String>) -> Self {
        Self {
            host,
            tokens: TokenResolver::new(),
            client: OnceCell::new(),
        }
    }

    /// Whether the client has already been built
    pub fn has_client(&self) -> bool {
        self.client.initialized()
    }

    /// Host this manager authenticates against
    pub fn host(&self) -> &str {
        self.host.as_deref().unwrap_or(DEFAULT_HOST)
    }

    /// Create a new client for the configured host
    async fn create_client(&self) -> Result<Arc<OctocrabClient>> {
        let host = self.host.as_deref();
        info!("Creating GitHub client for host: {}", self.host());

        let token = self.tokens.get_token(host).await?;
        let mut builder = Octocrab::builder().personal_token(token);

        let base_url = match host {
            Some(h) if h != DEFAULT_HOST => {
                let uri = format!("https://{}/api/v3", h);
                builder = builder.base_uri(&uri).context("Failed to set base URI")?;
                uri
            }
            _ => "https://api.github.com".to_string(),
        };

        let octocrab = builder.build().context("Failed to build Octocrab client")?;
        let client = OctocrabClient::with_base_url(Arc::new(octocrab), base_url);
        debug!("GitHub client ready for {}", client.base_url());
        Ok(Arc::new(client))
    }
}

#[async_trait]
impl ClientProvider for ClientManager {
    async fn client(&self, cancel: &CancellationToken) -> Result<Arc<dyn GitHubClient>> {
        if cancel.is_cancelled() {
            anyhow::bail!("client request cancelled");
        }

        let client = tokio::select! {
            _ = cancel.cancelled() => anyhow::bail!("client request cancelled"),
            client = self.client.get_or_try_init(|| self.create_client()) => client?,
        };

        Ok(Arc::clone(client) as Arc<dyn GitHubClient>)
    }
}
