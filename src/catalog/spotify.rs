//! Spotify Web API Catalog
//!
//! Information Hiding:
//! - REST paths, paging cursors and JSON shapes hidden behind the `Catalog` trait
//! - Write batching (100 items per request) handled internally
//! - Courtesy delays between paged reads and write batches
//!
//! # API Reference
//! - Saved tracks: GET /me/tracks (50 per page)
//! - Playlists: GET /me/playlists, POST /users/{id}/playlists
//! - Playlist items: GET/PUT/POST /playlists/{id}/tracks (100 per request)
//! - Search: GET /search?type=track&limit=1

use super::auth::SpotifyAuth;
use super::{Catalog, CatalogTrack, Playlist, TrackRef, UserProfile};
use crate::config::{CatalogConfig, PacingConfig};
use crate::core::errors::{RecommendError, RecommendResult};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tokio::time::sleep;

const LIKED_PAGE_SIZE: usize = 50;
const PLAYLIST_PAGE_SIZE: usize = 50;
const PLAYLIST_ITEMS_PAGE_SIZE: usize = 100;

/// Maximum number of items per playlist write request.
pub const WRITE_BATCH_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
struct Page<T> {
    items: Vec<T>,
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SavedItem {
    track: Option<ApiTrack>,
}

#[derive(Debug, Deserialize)]
struct ApiTrack {
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    artists: Vec<ApiArtist>,
}

#[derive(Debug, Deserialize)]
struct ApiArtist {
    name: String,
}

impl ApiTrack {
    fn primary_artist(&self) -> Option<&str> {
        self.artists.first().map(|a| a.name.as_str())
    }

    fn to_track_ref(&self) -> Option<TrackRef> {
        let name = self.name.as_deref().filter(|n| !n.is_empty())?;
        let artist = self.primary_artist()?;
        Some(TrackRef::new(name, artist))
    }

    fn to_catalog_track(&self) -> Option<CatalogTrack> {
        let track = self.to_track_ref()?;
        Some(CatalogTrack {
            id: self.uri.clone()?,
            title: track.title,
            artist: track.artist,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ApiPlaylist {
    id: String,
    name: String,
    owner: ApiOwner,
    #[serde(default)]
    external_urls: ExternalUrls,
}

#[derive(Debug, Deserialize)]
struct ApiOwner {
    id: String,
}

#[derive(Debug, Default, Deserialize)]
struct ExternalUrls {
    spotify: Option<String>,
}

impl From<ApiPlaylist> for Playlist {
    fn from(p: ApiPlaylist) -> Self {
        Self {
            id: p.id,
            name: p.name,
            owner_id: p.owner.id,
            url: p.external_urls.spotify,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    id: String,
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: Page<ApiTrack>,
}

pub struct SpotifyCatalog {
    http: Client,
    auth: SpotifyAuth,
    api_base: String,
    page_delay: Duration,
    batch_delay: Duration,
}

impl SpotifyCatalog {
    pub fn new(
        http: Client,
        auth: SpotifyAuth,
        settings: &CatalogConfig,
        pacing: &PacingConfig,
    ) -> Self {
        Self {
            http,
            auth,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            page_delay: pacing.catalog_delay(),
            batch_delay: pacing.batch_delay(),
        }
    }

    /// HTTP client with the configured catalog timeout.
    pub fn http_client(settings: &CatalogConfig) -> RecommendResult<Client> {
        Ok(Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?)
    }

    async fn request(&self, method: Method, url: &str) -> RecommendResult<RequestBuilder> {
        let token = self.auth.access_token().await?;
        Ok(self.http.request(method, url).bearer_auth(token))
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> RecommendResult<T> {
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RecommendError::Transport(format!(
                "Spotify API returned {}: {}",
                status, body
            )));
        }
        Ok(response.json::<T>().await?)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> RecommendResult<T> {
        let builder = self.request(Method::GET, url).await?.query(query);
        self.send(builder).await
    }

    /// Follow `next` cursors until exhausted, collecting every item.
    ///
    /// Only a failure of the first page is an error. A later failure stops paging
    /// and keeps what was already read.
    async fn collect_pages<T: DeserializeOwned>(
        &self,
        first_url: String,
        query: Vec<(&str, String)>,
    ) -> RecommendResult<Vec<T>> {
        let mut items = Vec::new();
        let mut page: Page<T> = self.get(&first_url, &query).await?;

        loop {
            items.append(&mut page.items);
            let Some(next) = page.next.take() else {
                break;
            };
            sleep(self.page_delay).await;
            page = match self.get(&next, &[]).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::warn!(
                        "[SpotifyCatalog] Stopped paging {} after {} items: {}",
                        first_url,
                        items.len(),
                        e
                    );
                    break;
                }
            };
        }

        Ok(items)
    }

    async fn write_tracks(
        &self,
        method: Method,
        playlist_id: &str,
        uris: &[String],
    ) -> RecommendResult<()> {
        let url = format!("{}/playlists/{}/tracks", self.api_base, playlist_id);
        let builder = self
            .request(method, &url)
            .await?
            .json(&json!({ "uris": uris }));
        let _: serde_json::Value = self.send(builder).await?;
        Ok(())
    }
}

#[async_trait]
impl Catalog for SpotifyCatalog {
    async fn current_user(&self) -> RecommendResult<UserProfile> {
        let user: ApiUser = self.get(&format!("{}/me", self.api_base), &[]).await?;
        Ok(UserProfile {
            id: user.id,
            display_name: user.display_name,
        })
    }

    async fn list_liked_tracks(&self) -> RecommendResult<Vec<TrackRef>> {
        tracing::info!("[SpotifyCatalog] Fetching all liked songs");
        let items: Vec<SavedItem> = self
            .collect_pages(
                format!("{}/me/tracks", self.api_base),
                vec![("limit", LIKED_PAGE_SIZE.to_string())],
            )
            .await?;

        let liked: Vec<TrackRef> = items
            .iter()
            .filter_map(|item| item.track.as_ref()?.to_track_ref())
            .collect();
        tracing::info!("[SpotifyCatalog] Total liked songs fetched: {}", liked.len());
        Ok(liked)
    }

    async fn find_playlist_by_name(
        &self,
        name: &str,
        owner_id: &str,
    ) -> RecommendResult<Option<Playlist>> {
        let playlists: Vec<ApiPlaylist> = self
            .collect_pages(
                format!("{}/me/playlists", self.api_base),
                vec![("limit", PLAYLIST_PAGE_SIZE.to_string())],
            )
            .await?;

        Ok(playlists
            .into_iter()
            .find(|p| p.name == name && p.owner.id == owner_id)
            .map(Playlist::from))
    }

    async fn create_playlist(
        &self,
        owner_id: &str,
        name: &str,
        public: bool,
    ) -> RecommendResult<Playlist> {
        let url = format!("{}/users/{}/playlists", self.api_base, owner_id);
        let builder = self
            .request(Method::POST, &url)
            .await?
            .json(&json!({ "name": name, "public": public }));
        let playlist: ApiPlaylist = self.send(builder).await?;
        Ok(playlist.into())
    }

    async fn list_playlist_tracks(&self, playlist_id: &str) -> RecommendResult<Vec<TrackRef>> {
        tracing::info!(
            "[SpotifyCatalog] Fetching tracks from playlist ID: {}",
            playlist_id
        );
        let items: Vec<SavedItem> = self
            .collect_pages(
                format!("{}/playlists/{}/tracks", self.api_base, playlist_id),
                vec![
                    ("limit", PLAYLIST_ITEMS_PAGE_SIZE.to_string()),
                    ("fields", "items(track(name,artists(name))),next".to_string()),
                ],
            )
            .await?;

        Ok(items
            .iter()
            .filter_map(|item| item.track.as_ref()?.to_track_ref())
            .collect())
    }

    async fn search_best_match(
        &self,
        title: &str,
        artist: &str,
    ) -> RecommendResult<Option<CatalogTrack>> {
        let query = format!("track:{} artist:{}", title, artist);
        let response: SearchResponse = self
            .get(
                &format!("{}/search", self.api_base),
                &[
                    ("q", query),
                    ("type", "track".to_string()),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;

        Ok(response
            .tracks
            .items
            .first()
            .and_then(ApiTrack::to_catalog_track))
    }

    async fn replace_playlist_tracks(
        &self,
        playlist_id: &str,
        ids: &[String],
    ) -> RecommendResult<()> {
        if ids.len() <= WRITE_BATCH_SIZE {
            return self.write_tracks(Method::PUT, playlist_id, ids).await;
        }

        // Clear first, then append in batches.
        self.write_tracks(Method::PUT, playlist_id, &[]).await?;
        self.append_playlist_tracks(playlist_id, ids).await
    }

    async fn append_playlist_tracks(
        &self,
        playlist_id: &str,
        ids: &[String],
    ) -> RecommendResult<()> {
        for (i, batch) in ids.chunks(WRITE_BATCH_SIZE).enumerate() {
            if i > 0 {
                sleep(self.batch_delay).await;
            }
            self.write_tracks(Method::POST, playlist_id, batch).await?;
        }
        Ok(())
    }
}
