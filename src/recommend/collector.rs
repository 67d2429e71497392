//! Dedup & Collection Loop
//!
//! Drives the conversation with the suggestion engine until enough verified, novel
//! songs are collected or the attempt budget runs out.
//!
//! States: `Requesting -> Verifying -> Filtering -> Deciding -> (Requesting | Done)`.
//! A failed or empty request goes straight to `Deciding`.
//!
//! Novelty filter, applied to canonical catalog metadata:
//! - not in the liked library
//! - not in the all-time recommendations history
//! - not already collected this session (same catalog id or same song key)

use super::conversation::{follow_up_prompt, initial_prompt, Conversation};
use super::model::{Candidate, FilterEvent, RejectReason, SongKey, VerifiedCandidate};
use super::suggestion::request_suggestions;
use super::verify::verify_candidates;
use crate::catalog::{Catalog, TrackRef};
use crate::config::Settings;
use crate::core::errors::RecommendResult;
use crate::core::llm::SuggestionEngine;
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::sleep;

/// Insertion-ordered, capped set of admitted songs.
#[derive(Debug)]
pub struct Accumulator {
    target: usize,
    items: Vec<VerifiedCandidate>,
    keys: HashSet<SongKey>,
    ids: HashSet<String>,
}

impl Accumulator {
    pub fn new(target: usize) -> Self {
        Self {
            target,
            items: Vec::with_capacity(target),
            keys: HashSet::new(),
            ids: HashSet::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.target
    }

    /// Admit the candidate or return every reason it was rejected.
    pub fn offer(
        &mut self,
        candidate: &VerifiedCandidate,
        liked: &HashSet<SongKey>,
        history: &HashSet<SongKey>,
    ) -> Result<(), Vec<RejectReason>> {
        let key = candidate.key();
        let mut reasons = Vec::new();

        if liked.contains(&key) {
            reasons.push(RejectReason::Liked);
        }
        if history.contains(&key) {
            reasons.push(RejectReason::AlreadyRecommended);
        }
        if self.ids.contains(&candidate.catalog_id) || self.keys.contains(&key) {
            reasons.push(RejectReason::AlreadyCollected);
        }

        if !reasons.is_empty() {
            return Err(reasons);
        }

        self.ids.insert(candidate.catalog_id.clone());
        self.keys.insert(key);
        self.items.push(candidate.clone());
        Ok(())
    }

    pub fn into_items(mut self) -> Vec<VerifiedCandidate> {
        self.items.truncate(self.target);
        self.items
    }
}

/// Everything the loop produced. Only `collected` is handed to publication.
#[derive(Debug)]
pub struct CollectionOutcome {
    pub collected: Vec<VerifiedCandidate>,
    pub conversation: Conversation,
    pub session_suggestions: Vec<Candidate>,
    pub events: Vec<FilterEvent>,
    pub attempts_used: usize,
    pub failed_attempts: usize,
    pub target: usize,
}

impl CollectionOutcome {
    pub fn rejections(&self, reason: RejectReason) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, FilterEvent::Rejected { reasons, .. } if reasons.contains(&reason)))
            .count()
    }
}

enum LoopState {
    Requesting,
    Verifying(Vec<Candidate>),
    Filtering(Vec<VerifiedCandidate>),
    Deciding { productive: bool },
    Done,
}

pub struct Collector<'a> {
    catalog: &'a dyn Catalog,
    engine: &'a dyn SuggestionEngine,
    target: usize,
    max_attempts: usize,
    catalog_delay: Duration,
    attempt_pause: Duration,
    failure_backoff: Duration,
}

impl<'a> Collector<'a> {
    pub fn new(
        catalog: &'a dyn Catalog,
        engine: &'a dyn SuggestionEngine,
        settings: &Settings,
    ) -> Self {
        Self {
            catalog,
            engine,
            target: settings.recommend.target_new_songs,
            max_attempts: settings.recommend.max_attempts,
            catalog_delay: settings.pacing.catalog_delay(),
            attempt_pause: settings.pacing.attempt_pause(),
            failure_backoff: settings.pacing.failure_backoff(),
        }
    }

    /// Run the loop. Only a protocol violation is returned as an error.
    pub async fn collect(
        &self,
        seed: &[TrackRef],
        liked: &HashSet<SongKey>,
        history: &HashSet<SongKey>,
    ) -> RecommendResult<CollectionOutcome> {
        let mut conversation = Conversation::new();
        conversation.push_user(initial_prompt(seed, self.target));

        let mut accumulator = Accumulator::new(self.target);
        let mut session_suggestions: Vec<Candidate> = Vec::new();
        let mut events = Vec::new();
        let mut attempt = 1;
        let mut failed_attempts = 0;
        let mut state = LoopState::Requesting;

        loop {
            state = match state {
                LoopState::Requesting => {
                    tracing::info!(
                        "[Collector] --- Request attempt {}/{} ---",
                        attempt,
                        self.max_attempts
                    );
                    if attempt > 1 {
                        conversation.push_user(follow_up_prompt(&session_suggestions, self.target));
                    }

                    match request_suggestions(self.engine, &conversation).await {
                        Err(e) if e.is_fatal() => {
                            tracing::error!("[Collector] {}", e);
                            return Err(e);
                        }
                        Err(e) => {
                            tracing::warn!("[Collector] No response this attempt: {}", e);
                            failed_attempts += 1;
                            LoopState::Deciding { productive: false }
                        }
                        Ok(reply) => {
                            conversation.push_assistant(reply.raw);
                            let candidates = reply.content.into_candidates();
                            if candidates.is_empty() {
                                tracing::warn!(
                                    "[Collector] Engine returned no valid recommendations this attempt"
                                );
                                failed_attempts += 1;
                                LoopState::Deciding { productive: false }
                            } else {
                                session_suggestions.extend(candidates.iter().cloned());
                                LoopState::Verifying(candidates)
                            }
                        }
                    }
                }

                LoopState::Verifying(candidates) => {
                    tracing::info!(
                        "[Collector] Engine suggested {} songs. Verifying and filtering...",
                        candidates.len()
                    );
                    let verified =
                        verify_candidates(self.catalog, &candidates, self.catalog_delay).await;
                    LoopState::Filtering(verified)
                }

                LoopState::Filtering(verified) => {
                    let added = self.filter_batch(
                        attempt,
                        &verified,
                        &mut accumulator,
                        liked,
                        history,
                        &mut events,
                    );
                    tracing::info!(
                        "[Collector] Added {} new songs this turn. Total collected: {}/{}",
                        added,
                        accumulator.len(),
                        self.target
                    );
                    LoopState::Deciding { productive: true }
                }

                LoopState::Deciding { productive } => {
                    if accumulator.is_full() {
                        tracing::info!("[Collector] Target number of new songs reached");
                        LoopState::Done
                    } else if attempt >= self.max_attempts {
                        tracing::warn!(
                            "[Collector] Attempts exhausted with {}/{} songs collected",
                            accumulator.len(),
                            self.target
                        );
                        LoopState::Done
                    } else {
                        let delay = if productive {
                            self.attempt_pause
                        } else {
                            self.failure_backoff
                        };
                        if !delay.is_zero() {
                            sleep(delay).await;
                        }
                        attempt += 1;
                        LoopState::Requesting
                    }
                }

                LoopState::Done => break,
            };
        }

        let collected = accumulator.into_items();
        if collected.is_empty() {
            tracing::warn!("[Collector] No new, verifiable songs were collected");
        }

        Ok(CollectionOutcome {
            collected,
            conversation,
            session_suggestions,
            events,
            attempts_used: attempt,
            failed_attempts,
            target: self.target,
        })
    }

    fn filter_batch(
        &self,
        attempt: usize,
        verified: &[VerifiedCandidate],
        accumulator: &mut Accumulator,
        liked: &HashSet<SongKey>,
        history: &HashSet<SongKey>,
        events: &mut Vec<FilterEvent>,
    ) -> usize {
        let mut added = 0;

        for (i, candidate) in verified.iter().enumerate() {
            if accumulator.is_full() {
                tracing::debug!(
                    "[Collector] Target reached; discarding {} remaining songs from this batch",
                    verified.len() - i
                );
                break;
            }

            match accumulator.offer(candidate, liked, history) {
                Ok(()) => {
                    added += 1;
                    tracing::info!("[Collector] ++ Collected {}", candidate);
                    events.push(FilterEvent::Admitted {
                        attempt,
                        candidate: candidate.clone(),
                    });
                }
                Err(reasons) => {
                    let reason_text = reasons
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(", ");
                    tracing::info!("[Collector] -- Skipped {} (reason: {})", candidate, reason_text);
                    events.push(FilterEvent::Rejected {
                        attempt,
                        candidate: candidate.clone(),
                        reasons,
                    });
                }
            }
        }

        added
    }
}
