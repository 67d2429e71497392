use super::collector::{CollectionOutcome, Collector};
use super::publish::{publish, PublicationReport};
use super::seed::{load_seed, sample_seed};
use crate::catalog::{Catalog, UserProfile};
use crate::config::Settings;
use crate::core::errors::{RecommendError, RecommendResult};
use crate::core::llm::SuggestionEngine;
use rand::Rng;

#[derive(Debug)]
pub enum RunOutcome {
    /// The library is empty, so there is nothing to seed the engine with.
    NoLikedSongs,
    /// The loop finished without a single admissible song. Nothing is written.
    NothingCollected(CollectionOutcome),
    /// Collection finished but publication was skipped on request.
    DryRun(CollectionOutcome),
    Published {
        collection: CollectionOutcome,
        publication: PublicationReport,
    },
}

/// One full session: seed, collect, publish.
pub async fn run_session<R: Rng + ?Sized>(
    catalog: &dyn Catalog,
    engine: &dyn SuggestionEngine,
    settings: &Settings,
    user: &UserProfile,
    rng: &mut R,
    dry_run: bool,
) -> RecommendResult<RunOutcome> {
    settings
        .validate()
        .map_err(|e| RecommendError::Config(e.to_string()))?;

    let seed = load_seed(catalog, &user.id, &settings.recommend).await;
    if seed.liked.is_empty() {
        tracing::warn!("[Session] No liked songs found");
        return Ok(RunOutcome::NoLikedSongs);
    }

    let prompt_seed = sample_seed(&seed.liked, settings.recommend.max_seed_songs, rng);
    tracing::info!(
        "[Session] Seeding the engine with {} of {} liked songs",
        prompt_seed.len(),
        seed.liked.len()
    );

    let collection = Collector::new(catalog, engine, settings)
        .collect(&prompt_seed, &seed.liked_set, &seed.history_set)
        .await?;

    if collection.collected.is_empty() {
        return Ok(RunOutcome::NothingCollected(collection));
    }
    if dry_run {
        return Ok(RunOutcome::DryRun(collection));
    }

    let publication = publish(
        catalog,
        &user.id,
        &settings.recommend,
        &collection.collected,
        seed.all_time_playlist.as_ref(),
    )
    .await;

    Ok(RunOutcome::Published {
        collection,
        publication,
    })
}
