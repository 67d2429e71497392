use super::model::VerifiedCandidate;
use crate::catalog::{get_or_create_playlist, Catalog, Playlist};
use crate::config::RecommendConfig;
use crate::core::errors::RecommendResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Written { playlist: Playlist, count: usize },
    Skipped(String),
    Failed(String),
}

impl WriteOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, Self::Written { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicationReport {
    pub latest: WriteOutcome,
    pub all_time: WriteOutcome,
}

/// Replace the latest-recommendations playlist and append to the all-time one.
///
/// The two writes are independent: a failure of the first never prevents the second.
pub async fn publish(
    catalog: &dyn Catalog,
    owner_id: &str,
    settings: &RecommendConfig,
    collected: &[VerifiedCandidate],
    all_time_playlist: Option<&Playlist>,
) -> PublicationReport {
    let ids: Vec<String> = collected.iter().map(|c| c.catalog_id.clone()).collect();

    tracing::info!(
        "[Publisher] Replacing items of '{}' with {} songs",
        settings.latest_playlist_name,
        ids.len()
    );
    let latest = match replace_latest(catalog, owner_id, &settings.latest_playlist_name, &ids).await
    {
        Ok(playlist) => WriteOutcome::Written {
            playlist,
            count: ids.len(),
        },
        Err(e) => {
            tracing::error!(
                "[Publisher] Updating '{}' failed: {}",
                settings.latest_playlist_name,
                e
            );
            WriteOutcome::Failed(e.to_string())
        }
    };

    let all_time = match all_time_playlist {
        None => {
            tracing::warn!(
                "[Publisher] '{}' is unavailable; not appending",
                settings.all_time_playlist_name
            );
            WriteOutcome::Skipped(format!(
                "could not find or create '{}'",
                settings.all_time_playlist_name
            ))
        }
        Some(playlist) => {
            tracing::info!(
                "[Publisher] Appending {} songs to '{}'",
                ids.len(),
                playlist.name
            );
            match catalog.append_playlist_tracks(&playlist.id, &ids).await {
                Ok(()) => WriteOutcome::Written {
                    playlist: playlist.clone(),
                    count: ids.len(),
                },
                Err(e) => {
                    tracing::error!("[Publisher] Appending to '{}' failed: {}", playlist.name, e);
                    WriteOutcome::Failed(e.to_string())
                }
            }
        }
    };

    PublicationReport { latest, all_time }
}

async fn replace_latest(
    catalog: &dyn Catalog,
    owner_id: &str,
    name: &str,
    ids: &[String],
) -> RecommendResult<Playlist> {
    let playlist = get_or_create_playlist(catalog, owner_id, name).await?;
    catalog.replace_playlist_tracks(&playlist.id, ids).await?;
    Ok(playlist)
}
