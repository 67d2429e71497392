//! Recommendation pipeline
//!
//! Information Hiding:
//! - Prompt wording and reply parsing hidden from the loop
//! - Novelty filtering and the accumulator cap live only in the collector
//! - Publication semantics (replace vs. append) hidden behind `publish`

pub mod collector;
pub mod conversation;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod publish;
pub mod seed;
pub mod suggestion;
pub mod verify;

pub use collector::{Accumulator, CollectionOutcome, Collector};
pub use conversation::Conversation;
pub use model::{Candidate, FilterEvent, RejectReason, SongKey, VerifiedCandidate};
pub use pipeline::{run_session, RunOutcome};
pub use publish::{PublicationReport, WriteOutcome};
