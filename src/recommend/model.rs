use crate::catalog::{CatalogTrack, TrackRef};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Normalized (title, artist) identity used only for set membership.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SongKey {
    title: String,
    artist: String,
}

impl SongKey {
    pub fn new(title: &str, artist: &str) -> Self {
        Self {
            title: title.trim().to_lowercase(),
            artist: artist.trim().to_lowercase(),
        }
    }

    /// `None` when either part is blank after trimming.
    pub fn non_empty(title: &str, artist: &str) -> Option<Self> {
        let key = Self::new(title, artist);
        (!key.title.is_empty() && !key.artist.is_empty()).then_some(key)
    }
}

/// Build a key set from library or playlist reads, skipping blank entries.
pub fn key_set<'a>(tracks: impl IntoIterator<Item = &'a TrackRef>) -> HashSet<SongKey> {
    tracks
        .into_iter()
        .filter_map(|t| SongKey::non_empty(&t.title, &t.artist))
        .collect()
}

/// A raw suggestion exactly as the engine phrased it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(rename = "track")]
    pub title: String,
    pub artist: String,
}

impl Candidate {
    pub fn new(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
        }
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" by {}", self.title, self.artist)
    }
}

/// A suggestion confirmed by the catalog, carrying canonical metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedCandidate {
    pub catalog_id: String,
    pub title: String,
    pub artist: String,
}

impl VerifiedCandidate {
    pub fn key(&self) -> SongKey {
        SongKey::new(&self.title, &self.artist)
    }
}

impl From<CatalogTrack> for VerifiedCandidate {
    fn from(track: CatalogTrack) -> Self {
        Self {
            catalog_id: track.id,
            title: track.title,
            artist: track.artist,
        }
    }
}

impl fmt::Display for VerifiedCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" by {}", self.title, self.artist)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    Liked,
    AlreadyRecommended,
    AlreadyCollected,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Liked => "is liked",
            Self::AlreadyRecommended => "in all-time recommendations history",
            Self::AlreadyCollected => "already collected this session",
        };
        f.write_str(text)
    }
}

/// Observable outcome of filtering one verified candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterEvent {
    Admitted {
        attempt: usize,
        candidate: VerifiedCandidate,
    },
    Rejected {
        attempt: usize,
        candidate: VerifiedCandidate,
        reasons: Vec<RejectReason>,
    },
}
