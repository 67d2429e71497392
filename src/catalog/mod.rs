//! Music Catalog Abstraction
//!
//! Information Hiding:
//! - Provider protocol (REST paths, paging, auth) hidden behind the `Catalog` trait
//! - Allows swapping Spotify for an in-memory catalog without touching the collection loop
//! - Provider-imposed batch limits are handled inside each implementation

use crate::core::errors::RecommendResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod auth;
pub mod memory;
pub mod spotify;

/// A song as read from the user's library or a playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRef {
    pub title: String,
    pub artist: String,
}

impl TrackRef {
    pub fn new(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
        }
    }
}

impl fmt::Display for TrackRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" by {}", self.title, self.artist)
    }
}

/// A catalog entry with canonical metadata. `id` is opaque to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogTrack {
    pub id: String,
    pub title: String,
    pub artist: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: String,
    pub display_name: Option<String>,
}

impl UserProfile {
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.id)
    }
}

/// Catalog operations needed by a recommendation run.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Profile of the authenticated user
    async fn current_user(&self) -> RecommendResult<UserProfile>;

    /// Every liked (saved) track, across all pages
    async fn list_liked_tracks(&self) -> RecommendResult<Vec<TrackRef>>;

    /// Playlist with exactly this name owned by `owner_id`
    async fn find_playlist_by_name(
        &self,
        name: &str,
        owner_id: &str,
    ) -> RecommendResult<Option<Playlist>>;

    async fn create_playlist(
        &self,
        owner_id: &str,
        name: &str,
        public: bool,
    ) -> RecommendResult<Playlist>;

    /// Every track in a playlist, across all pages
    async fn list_playlist_tracks(&self, playlist_id: &str) -> RecommendResult<Vec<TrackRef>>;

    /// Single best match for a title/artist search
    async fn search_best_match(
        &self,
        title: &str,
        artist: &str,
    ) -> RecommendResult<Option<CatalogTrack>>;

    /// Replace the playlist contents with `ids`, in order
    async fn replace_playlist_tracks(&self, playlist_id: &str, ids: &[String])
        -> RecommendResult<()>;

    /// Append `ids` to the end of the playlist
    async fn append_playlist_tracks(&self, playlist_id: &str, ids: &[String])
        -> RecommendResult<()>;
}

/// Find a playlist by name, creating a public one when absent.
pub async fn get_or_create_playlist(
    catalog: &dyn Catalog,
    owner_id: &str,
    name: &str,
) -> RecommendResult<Playlist> {
    if let Some(playlist) = catalog.find_playlist_by_name(name, owner_id).await? {
        tracing::info!(
            "[Catalog] Found existing playlist: '{}' (ID: {})",
            name,
            playlist.id
        );
        return Ok(playlist);
    }

    tracing::info!("[Catalog] Playlist '{}' not found. Creating it...", name);
    let playlist = catalog.create_playlist(owner_id, name, true).await?;
    tracing::info!(
        "[Catalog] Created playlist: '{}' (ID: {})",
        name,
        playlist.id
    );
    Ok(playlist)
}
