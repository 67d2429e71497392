use super::model::{Candidate, VerifiedCandidate};
use crate::catalog::Catalog;
use std::time::Duration;
use tokio::time::sleep;

/// Resolve each candidate to its best catalog match, in order.
///
/// Unmatched candidates are dropped; a failed search counts as "no match" for that
/// candidate only. `delay` is slept after every search call.
pub async fn verify_candidates(
    catalog: &dyn Catalog,
    candidates: &[Candidate],
    delay: Duration,
) -> Vec<VerifiedCandidate> {
    tracing::info!(
        "[Verifier] Verifying {} suggested songs against the catalog",
        candidates.len()
    );
    let mut verified = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        let result = catalog
            .search_best_match(&candidate.title, &candidate.artist)
            .await;
        if !delay.is_zero() {
            sleep(delay).await;
        }

        match result {
            Ok(Some(track)) => {
                tracing::info!(
                    "[Verifier] Found: \"{}\" by {}",
                    track.title,
                    track.artist
                );
                verified.push(VerifiedCandidate::from(track));
            }
            Ok(None) => {
                tracing::info!("[Verifier] Not found: {}", candidate);
            }
            Err(e) => {
                tracing::warn!("[Verifier] Error searching for {}: {}", candidate, e);
            }
        }
    }

    tracing::info!(
        "[Verifier] Verified {} of {} songs as available",
        verified.len(),
        candidates.len()
    );
    verified
}
