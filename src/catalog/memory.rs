//! In-Memory Catalog
//!
//! Information Hiding:
//! - Library, playlists and searchable tracks kept in plain vectors behind a RwLock
//! - Search matches title and artist case-insensitively
//! - Suitable for testing and offline runs; data is lost when the process ends

use super::{Catalog, CatalogTrack, Playlist, TrackRef, UserProfile};
use crate::core::errors::{RecommendError, RecommendResult};
use async_trait::async_trait;
use std::collections::HashSet;
use tokio::sync::RwLock;

#[derive(Default)]
struct CatalogState {
    liked: Vec<TrackRef>,
    tracks: Vec<CatalogTrack>,
    playlists: Vec<StoredPlaylist>,
    failing_searches: HashSet<String>,
    failing_writes: HashSet<String>,
    search_calls: usize,
    next_playlist_id: usize,
}

struct StoredPlaylist {
    playlist: Playlist,
    track_ids: Vec<String>,
}

pub struct InMemoryCatalog {
    user_id: String,
    state: RwLock<CatalogState>,
}

impl InMemoryCatalog {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            state: RwLock::new(CatalogState::default()),
        }
    }

    pub fn with_liked(mut self, liked: impl IntoIterator<Item = TrackRef>) -> Self {
        self.state.get_mut().liked.extend(liked);
        self
    }

    /// Make a track findable through `search_best_match`.
    pub fn with_track(mut self, track: CatalogTrack) -> Self {
        self.state.get_mut().tracks.push(track);
        self
    }

    pub fn with_tracks(mut self, tracks: impl IntoIterator<Item = CatalogTrack>) -> Self {
        self.state.get_mut().tracks.extend(tracks);
        self
    }

    /// Add a playlist owned by this user holding the given (searchable) tracks.
    pub fn with_playlist(mut self, name: &str, tracks: &[CatalogTrack]) -> Self {
        {
            let user_id = self.user_id.clone();
            let state = self.state.get_mut();
            let id = Self::allocate_id(state);
            for track in tracks {
                if !state.tracks.iter().any(|t| t.id == track.id) {
                    state.tracks.push(track.clone());
                }
            }
            state.playlists.push(StoredPlaylist {
                playlist: Playlist {
                    id,
                    name: name.to_string(),
                    owner_id: user_id,
                    url: None,
                },
                track_ids: tracks.iter().map(|t| t.id.clone()).collect(),
            });
        }
        self
    }

    /// Searches for this title fail with a transport error.
    pub fn fail_search_for(mut self, title: &str) -> Self {
        self.state.get_mut().failing_searches.insert(title.to_lowercase());
        self
    }

    /// Writes to the playlist with this name fail with a transport error.
    pub fn fail_writes_to(mut self, playlist_name: &str) -> Self {
        self.state.get_mut().failing_writes.insert(playlist_name.to_string());
        self
    }

    pub async fn search_calls(&self) -> usize {
        self.state.read().await.search_calls
    }

    pub async fn playlist_count(&self) -> usize {
        self.state.read().await.playlists.len()
    }

    /// Track ids currently in the named playlist, if it exists.
    pub async fn playlist_track_ids(&self, name: &str) -> Option<Vec<String>> {
        self.state
            .read()
            .await
            .playlists
            .iter()
            .find(|p| p.playlist.name == name)
            .map(|p| p.track_ids.clone())
    }

    fn allocate_id(state: &mut CatalogState) -> String {
        state.next_playlist_id += 1;
        format!("playlist-{}", state.next_playlist_id)
    }

    fn writable_playlist<'a>(
        state: &'a mut CatalogState,
        playlist_id: &str,
    ) -> RecommendResult<&'a mut StoredPlaylist> {
        let failing = state.failing_writes.clone();
        let stored = state
            .playlists
            .iter_mut()
            .find(|p| p.playlist.id == playlist_id)
            .ok_or_else(|| {
                RecommendError::Transport(format!("playlist {} not found", playlist_id))
            })?;
        if failing.contains(&stored.playlist.name) {
            return Err(RecommendError::Transport(format!(
                "write to '{}' rejected",
                stored.playlist.name
            )));
        }
        Ok(stored)
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn current_user(&self) -> RecommendResult<UserProfile> {
        Ok(UserProfile {
            id: self.user_id.clone(),
            display_name: None,
        })
    }

    async fn list_liked_tracks(&self) -> RecommendResult<Vec<TrackRef>> {
        Ok(self.state.read().await.liked.clone())
    }

    async fn find_playlist_by_name(
        &self,
        name: &str,
        owner_id: &str,
    ) -> RecommendResult<Option<Playlist>> {
        Ok(self
            .state
            .read()
            .await
            .playlists
            .iter()
            .find(|p| p.playlist.name == name && p.playlist.owner_id == owner_id)
            .map(|p| p.playlist.clone()))
    }

    async fn create_playlist(
        &self,
        owner_id: &str,
        name: &str,
        _public: bool,
    ) -> RecommendResult<Playlist> {
        let mut state = self.state.write().await;
        let playlist = Playlist {
            id: Self::allocate_id(&mut state),
            name: name.to_string(),
            owner_id: owner_id.to_string(),
            url: None,
        };
        state.playlists.push(StoredPlaylist {
            playlist: playlist.clone(),
            track_ids: Vec::new(),
        });
        Ok(playlist)
    }

    async fn list_playlist_tracks(&self, playlist_id: &str) -> RecommendResult<Vec<TrackRef>> {
        let state = self.state.read().await;
        let stored = state
            .playlists
            .iter()
            .find(|p| p.playlist.id == playlist_id)
            .ok_or_else(|| {
                RecommendError::Transport(format!("playlist {} not found", playlist_id))
            })?;

        Ok(stored
            .track_ids
            .iter()
            .filter_map(|id| state.tracks.iter().find(|t| &t.id == id))
            .map(|t| TrackRef::new(t.title.clone(), t.artist.clone()))
            .collect())
    }

    async fn search_best_match(
        &self,
        title: &str,
        artist: &str,
    ) -> RecommendResult<Option<CatalogTrack>> {
        let mut state = self.state.write().await;
        state.search_calls += 1;

        if state.failing_searches.contains(&title.to_lowercase()) {
            return Err(RecommendError::Transport(format!(
                "search for '{}' failed",
                title
            )));
        }

        Ok(state
            .tracks
            .iter()
            .find(|t| {
                t.title.to_lowercase() == title.trim().to_lowercase()
                    && t.artist.to_lowercase() == artist.trim().to_lowercase()
            })
            .cloned())
    }

    async fn replace_playlist_tracks(
        &self,
        playlist_id: &str,
        ids: &[String],
    ) -> RecommendResult<()> {
        let mut state = self.state.write().await;
        let stored = Self::writable_playlist(&mut state, playlist_id)?;
        stored.track_ids = ids.to_vec();
        Ok(())
    }

    async fn append_playlist_tracks(
        &self,
        playlist_id: &str,
        ids: &[String],
    ) -> RecommendResult<()> {
        let mut state = self.state.write().await;
        let stored = Self::writable_playlist(&mut state, playlist_id)?;
        stored.track_ids.extend_from_slice(ids);
        Ok(())
    }
}
