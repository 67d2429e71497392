//! Spotify OAuth (authorization-code flow) with an on-disk token cache
//!
//! Information Hiding:
//! - Token cache file format hidden behind `SpotifyAuth::access_token`
//! - Refresh happens transparently shortly before expiry
//! - Interactive authorization only runs when no usable cached token exists

use crate::config::{CatalogConfig, Credentials};
use crate::core::errors::{RecommendError, RecommendResult};
use crate::utils;
use anyhow::{Context, Result};
use chrono::Utc;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;

pub const SCOPES: &str =
    "user-library-read playlist-modify-public playlist-read-private playlist-read-collaborative";

/// Refresh this many seconds before the token actually expires.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Cached token, field-compatible with the spotipy cache file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub expires_at: i64,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl TokenInfo {
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at - now < EXPIRY_MARGIN_SECS
    }

    fn stamped(mut self, now: i64) -> Self {
        self.expires_at = now + self.expires_in;
        self
    }
}

struct OAuthClient {
    http: Client,
    accounts_base: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl OAuthClient {
    async fn request_token(&self, form: &[(&str, &str)]) -> RecommendResult<TokenInfo> {
        let url = format!("{}/api/token", self.accounts_base.trim_end_matches('/'));
        let response = self
            .http
            .post(&url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RecommendError::Transport(format!(
                "token endpoint returned {}: {}",
                status, body
            )));
        }

        let token = response.json::<TokenInfo>().await?;
        Ok(token.stamped(Utc::now().timestamp()))
    }

    async fn exchange_code(&self, code: &str) -> RecommendResult<TokenInfo> {
        self.request_token(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
        ])
        .await
    }

    async fn refresh(&self, refresh_token: &str) -> RecommendResult<TokenInfo> {
        let mut token = self
            .request_token(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .await?;
        // Spotify may omit the refresh token on refresh; keep the old one.
        if token.refresh_token.is_none() {
            token.refresh_token = Some(refresh_token.to_string());
        }
        Ok(token)
    }

    fn authorize_url(&self) -> Result<Url> {
        Url::parse_with_params(
            &format!("{}/authorize", self.accounts_base.trim_end_matches('/')),
            &[
                ("client_id", self.client_id.as_str()),
                ("response_type", "code"),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("scope", SCOPES),
            ],
        )
        .context("Failed to build Spotify authorize URL")
    }
}

/// Supplies a valid bearer token to the Spotify catalog.
pub struct SpotifyAuth {
    token: Mutex<TokenInfo>,
    oauth: Option<OAuthClient>,
    cache_path: Option<PathBuf>,
}

impl SpotifyAuth {
    /// A fixed token that is never refreshed nor persisted.
    pub fn fixed(access_token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(TokenInfo {
                access_token: access_token.into(),
                token_type: default_token_type(),
                expires_in: 0,
                refresh_token: None,
                scope: SCOPES.to_string(),
                expires_at: i64::MAX,
            }),
            oauth: None,
            cache_path: None,
        }
    }

    /// Load the cached token, refreshing it or running the interactive flow as needed.
    pub async fn authorize(
        http: Client,
        credentials: &Credentials,
        settings: &CatalogConfig,
    ) -> Result<Self> {
        let oauth = OAuthClient {
            http,
            accounts_base: settings.accounts_base.clone(),
            client_id: credentials.spotify_client_id.clone(),
            client_secret: credentials.spotify_client_secret.clone(),
            redirect_uri: credentials.spotify_redirect_uri.clone(),
        };
        let cache_path = PathBuf::from(&settings.token_cache_path);
        let now = Utc::now().timestamp();

        let token = match load_cached_token(&cache_path).await {
            Some(token) if !token.is_expired(now) => {
                tracing::debug!("[SpotifyAuth] Using cached token from {:?}", cache_path);
                token
            }
            Some(TokenInfo {
                refresh_token: Some(refresh_token),
                ..
            }) => {
                tracing::info!("[SpotifyAuth] Cached token expired, refreshing");
                let token = oauth
                    .refresh(&refresh_token)
                    .await
                    .context("Failed to refresh Spotify token")?;
                save_token(&cache_path, &token).await?;
                token
            }
            _ => {
                let token = run_interactive_flow(&oauth).await?;
                save_token(&cache_path, &token).await?;
                token
            }
        };

        Ok(Self {
            token: Mutex::new(token),
            oauth: Some(oauth),
            cache_path: Some(cache_path),
        })
    }

    pub async fn access_token(&self) -> RecommendResult<String> {
        let mut token = self.token.lock().await;
        let now = Utc::now().timestamp();

        if token.is_expired(now) {
            let (Some(oauth), Some(refresh_token)) = (&self.oauth, token.refresh_token.clone())
            else {
                return Err(RecommendError::transport(
                    "Spotify token expired and cannot be refreshed",
                ));
            };

            tracing::info!("[SpotifyAuth] Refreshing access token");
            let refreshed = oauth.refresh(&refresh_token).await?;
            if let Some(path) = &self.cache_path {
                if let Err(e) = save_token(path, &refreshed).await {
                    tracing::warn!("[SpotifyAuth] Could not persist refreshed token: {}", e);
                }
            }
            *token = refreshed;
        }

        Ok(token.access_token.clone())
    }
}

async fn run_interactive_flow(oauth: &OAuthClient) -> Result<TokenInfo> {
    let url = oauth.authorize_url()?;

    utils::print_header("Spotify Authorization");
    utils::print_info("Open this URL in your browser and approve access:");
    println!("{}\n", url);
    utils::print_prompt("Paste the URL you were redirected to: ");

    let mut reader = BufReader::new(io::stdin());
    let mut input = String::new();
    reader
        .read_line(&mut input)
        .await
        .context("Failed to read redirect URL from stdin")?;

    let code = extract_code(input.trim())?;
    let token = oauth
        .exchange_code(&code)
        .await
        .context("Failed to exchange authorization code")?;

    utils::print_success("Successfully authenticated with Spotify.");
    Ok(token)
}

/// Pull the `code` query parameter out of the redirect URL.
pub fn extract_code(redirected: &str) -> Result<String> {
    let url = Url::parse(redirected).context("Redirect URL is not a valid URL")?;

    if let Some((_, error)) = url.query_pairs().find(|(k, _)| k == "error") {
        return Err(anyhow::anyhow!("Spotify authorization denied: {}", error));
    }

    url.query_pairs()
        .find(|(k, _)| k == "code")
        .map(|(_, v)| v.into_owned())
        .ok_or_else(|| anyhow::anyhow!("Redirect URL has no 'code' parameter"))
}

pub async fn load_cached_token(path: &Path) -> Option<TokenInfo> {
    let json = tokio::fs::read_to_string(path).await.ok()?;
    match serde_json::from_str(&json) {
        Ok(token) => Some(token),
        Err(e) => {
            tracing::warn!("[SpotifyAuth] Ignoring unreadable token cache {:?}: {}", path, e);
            None
        }
    }
}

pub async fn save_token(path: &Path, token: &TokenInfo) -> Result<()> {
    let json = serde_json::to_string(token).context("Failed to serialize token")?;
    tokio::fs::write(path, json)
        .await
        .context(format!("Failed to write token cache: {:?}", path))?;
    restrict_to_owner(path).await?;
    tracing::debug!("[SpotifyAuth] Saved token cache to {:?}", path);
    Ok(())
}

/// The cache holds a refresh token, so only the owner may read it.
#[cfg(unix)]
async fn restrict_to_owner(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .await
        .context(format!("Failed to restrict token cache permissions: {:?}", path))
}

#[cfg(not(unix))]
async fn restrict_to_owner(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn token(expires_at: i64, refresh: Option<&str>) -> TokenInfo {
        TokenInfo {
            access_token: "access".to_string(),
            token_type: "Bearer".to_string(),
            expires_in: 3600,
            refresh_token: refresh.map(str::to_string),
            scope: SCOPES.to_string(),
            expires_at,
        }
    }

    #[test]
    fn test_expiry_margin() {
        assert!(token(1_000, None).is_expired(1_000));
        assert!(token(1_030, None).is_expired(1_000));
        assert!(!token(1_061, None).is_expired(1_000));
    }

    #[test]
    fn test_extract_code() {
        let code = extract_code("http://127.0.0.1:8888/callback?code=abc123&state=xyz").unwrap();
        assert_eq!(code, "abc123");

        assert!(extract_code("http://127.0.0.1:8888/callback?error=access_denied").is_err());
        assert!(extract_code("http://127.0.0.1:8888/callback").is_err());
        assert!(extract_code("not a url").is_err());
    }

    #[tokio::test]
    async fn test_token_cache_round_trip() {
        let dir = tempdir().unwrap();
        let cache = dir.path().join(".spotify_cache");
        let original = token(42, Some("refresh"));

        save_token(&cache, &original).await.unwrap();
        let loaded = load_cached_token(&cache).await.unwrap();

        assert_eq!(loaded, original);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_token_cache_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let cache = dir.path().join(".spotify_cache");
        std::fs::write(&cache, "stale").unwrap();
        std::fs::set_permissions(&cache, std::fs::Permissions::from_mode(0o644)).unwrap();

        save_token(&cache, &token(42, Some("refresh"))).await.unwrap();

        let mode = std::fs::metadata(&cache).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn test_corrupt_cache_is_ignored() {
        let dir = tempdir().unwrap();
        let cache = dir.path().join(".spotify_cache");
        std::fs::write(&cache, "{not json").unwrap();

        assert!(load_cached_token(&cache).await.is_none());
    }

    #[tokio::test]
    async fn test_fixed_token_never_refreshes() {
        let auth = SpotifyAuth::fixed("static-token");
        assert_eq!(auth.access_token().await.unwrap(), "static-token");
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed_and_persisted() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "fresh",
                "token_type": "Bearer",
                "expires_in": 3600,
                "scope": SCOPES
            })))
            .mount(&mock_server)
            .await;

        let dir = tempdir().unwrap();
        let cache = dir.path().join(".spotify_cache");
        let auth = SpotifyAuth {
            token: Mutex::new(token(0, Some("old-refresh"))),
            oauth: Some(OAuthClient {
                http: Client::new(),
                accounts_base: mock_server.uri(),
                client_id: "id".to_string(),
                client_secret: "secret".to_string(),
                redirect_uri: "http://127.0.0.1:8888/callback".to_string(),
            }),
            cache_path: Some(cache.clone()),
        };

        assert_eq!(auth.access_token().await.unwrap(), "fresh");

        let persisted = load_cached_token(&cache).await.unwrap();
        assert_eq!(persisted.access_token, "fresh");
        assert_eq!(persisted.refresh_token.as_deref(), Some("old-refresh"));
        assert!(persisted.expires_at > Utc::now().timestamp());
    }
}
