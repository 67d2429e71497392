use super::model::{key_set, SongKey};
use crate::catalog::{get_or_create_playlist, Catalog, Playlist, TrackRef};
use crate::config::RecommendConfig;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

/// Inputs gathered once before the collection loop starts. Read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct SeedData {
    pub liked: Vec<TrackRef>,
    pub liked_set: HashSet<SongKey>,
    pub history_set: HashSet<SongKey>,
    /// The all-time recommendations playlist, when it could be found or created.
    pub all_time_playlist: Option<Playlist>,
}

/// Read the liked library and the all-time recommendations history.
///
/// Catalog failures degrade to empty inputs: no liked songs makes the run a no-op,
/// and a missing history playlist means nothing is excluded as already recommended.
pub async fn load_seed(
    catalog: &dyn Catalog,
    owner_id: &str,
    settings: &RecommendConfig,
) -> SeedData {
    let liked = catalog.list_liked_tracks().await.unwrap_or_else(|e| {
        tracing::error!("[Seed] Error fetching liked songs: {}", e);
        Vec::new()
    });
    let liked_set = key_set(&liked);
    tracing::info!(
        "[Seed] {} unique liked songs for de-duplication",
        liked_set.len()
    );

    let all_time_playlist =
        match get_or_create_playlist(catalog, owner_id, &settings.all_time_playlist_name).await {
            Ok(playlist) => Some(playlist),
            Err(e) => {
                tracing::error!(
                    "[Seed] Could not find or create '{}': {}",
                    settings.all_time_playlist_name,
                    e
                );
                None
            }
        };

    let history = match &all_time_playlist {
        Some(playlist) => catalog
            .list_playlist_tracks(&playlist.id)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("[Seed] Error fetching recommendation history: {}", e);
                Vec::new()
            }),
        None => Vec::new(),
    };
    let history_set = key_set(&history);
    tracing::info!(
        "[Seed] {} unique songs in '{}' history",
        history_set.len(),
        settings.all_time_playlist_name
    );

    SeedData {
        liked,
        liked_set,
        history_set,
        all_time_playlist,
    }
}

/// Uniform sample without replacement, at most `max` songs.
pub fn sample_seed<R: Rng + ?Sized>(liked: &[TrackRef], max: usize, rng: &mut R) -> Vec<TrackRef> {
    liked.choose_multiple(rng, max).cloned().collect()
}
