//! Integration tests for a full recommendation session
//!
//! These tests run the whole pipeline against an in-memory catalog and a scripted
//! suggestion engine, so no API keys or network access are required.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;
use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;
use tunesmith::catalog::memory::InMemoryCatalog;
use tunesmith::catalog::{Catalog, CatalogTrack, TrackRef};
use tunesmith::recommend::conversation::NONE_SUGGESTED_PLACEHOLDER;
use tunesmith::recommend::{CollectionOutcome, RejectReason, SongKey, WriteOutcome};
use tunesmith::{
    run_session, ChatMessage, PacingConfig, RecommendError, RecommendResult, Role, RunOutcome,
    Settings, SuggestionEngine,
};

/// Replays canned replies in order and records every conversation it was sent.
struct ScriptedEngine {
    replies: Mutex<VecDeque<RecommendResult<String>>>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedEngine {
    fn new(replies: Vec<RecommendResult<String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn request(&self, index: usize) -> Vec<ChatMessage> {
        self.requests.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl SuggestionEngine for ScriptedEngine {
    async fn complete(&self, messages: &[ChatMessage]) -> RecommendResult<String> {
        self.requests.lock().unwrap().push(messages.to_vec());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(RecommendError::transport("script exhausted")))
    }
}

fn track(i: usize) -> CatalogTrack {
    CatalogTrack {
        id: format!("spotify:track:{}", i),
        title: format!("Song {}", i),
        artist: format!("Artist {}", i),
    }
}

fn tracks(range: std::ops::Range<usize>) -> Vec<CatalogTrack> {
    range.map(track).collect()
}

/// Engine reply suggesting songs `range`, phrased the way the catalog knows them.
fn reply(range: std::ops::Range<usize>) -> RecommendResult<String> {
    let entries: Vec<_> = range
        .map(|i| json!({"track": format!("Song {}", i), "artist": format!("Artist {}", i)}))
        .collect();
    Ok(serde_json::Value::Array(entries).to_string())
}

fn settings(target: usize, max_attempts: usize) -> Settings {
    let mut settings = Settings::default();
    settings.recommend.target_new_songs = target;
    settings.recommend.max_attempts = max_attempts;
    settings.pacing = PacingConfig::none();
    settings
}

fn base_catalog() -> InMemoryCatalog {
    InMemoryCatalog::new("me")
        .with_liked(vec![TrackRef::new("song a", "artist x")])
        .with_tracks(tracks(0..100))
}

async fn run(
    catalog: &InMemoryCatalog,
    engine: &ScriptedEngine,
    settings: &Settings,
    dry_run: bool,
) -> RunOutcome {
    let user = catalog.current_user().await.unwrap();
    let mut rng = StdRng::seed_from_u64(42);
    run_session(catalog, engine, settings, &user, &mut rng, dry_run)
        .await
        .unwrap()
}

fn published(outcome: RunOutcome) -> CollectionOutcome {
    match outcome {
        RunOutcome::Published { collection, .. } => collection,
        other => panic!("expected a published run, got {:?}", other),
    }
}

fn assert_unique(collection: &CollectionOutcome) {
    let keys: HashSet<SongKey> = collection.collected.iter().map(|c| c.key()).collect();
    let ids: HashSet<&str> = collection
        .collected
        .iter()
        .map(|c| c.catalog_id.as_str())
        .collect();
    assert_eq!(keys.len(), collection.collected.len());
    assert_eq!(ids.len(), collection.collected.len());
}

#[tokio::test]
async fn test_full_batch_on_first_attempt_stops_immediately() {
    let catalog = base_catalog();
    let engine = ScriptedEngine::new(vec![reply(0..20)]);
    let settings = settings(20, 10);

    let collection = published(run(&catalog, &engine, &settings, false).await);

    assert_eq!(collection.collected.len(), 20);
    assert_eq!(engine.calls(), 1);
    assert_eq!(collection.attempts_used, 1);
    assert_eq!(collection.conversation.len(), 2);
    assert_unique(&collection);

    let first_request = engine.request(0);
    assert_eq!(first_request.len(), 1);
    assert_eq!(first_request[0].role, Role::User);
    assert!(first_request[0].content.contains("- \"song a\" by artist x"));
}

#[tokio::test]
async fn test_history_songs_excluded_and_follow_up_lists_raw_suggestions() {
    let settings = settings(20, 10);
    let catalog = base_catalog().with_playlist(
        &settings.recommend.all_time_playlist_name,
        &tracks(0..5),
    );
    let engine = ScriptedEngine::new(vec![reply(0..20), reply(20..40)]);

    let collection = published(run(&catalog, &engine, &settings, false).await);

    let after_first: Vec<_> = collection
        .collected
        .iter()
        .take_while(|c| c.catalog_id != "spotify:track:20")
        .collect();
    assert_eq!(after_first.len(), 15);
    assert_eq!(collection.rejections(RejectReason::AlreadyRecommended), 5);
    assert_eq!(engine.calls(), 2);

    let follow_up = engine.request(1);
    let last = follow_up.last().unwrap();
    assert_eq!(last.role, Role::User);
    for i in 0..20 {
        assert!(
            last.content
                .contains(&format!("- \"Song {}\" by Artist {}", i, i)),
            "follow-up is missing raw suggestion {}",
            i
        );
    }

    assert_eq!(collection.collected.len(), 20);
    let history: HashSet<SongKey> = tracks(0..5)
        .iter()
        .map(|t| SongKey::new(&t.title, &t.artist))
        .collect();
    assert!(collection.collected.iter().all(|c| !history.contains(&c.key())));
}

#[tokio::test]
async fn test_unparseable_reply_is_recorded_and_retried() {
    let catalog = base_catalog();
    let prose = "Sure! You might enjoy some classic rock, like Queen.";
    let engine = ScriptedEngine::new(vec![Ok(prose.to_string()), reply(0..20)]);
    let settings = settings(20, 10);

    let collection = published(run(&catalog, &engine, &settings, false).await);

    assert_eq!(collection.attempts_used, 2);
    assert_eq!(collection.failed_attempts, 1);
    assert_eq!(collection.conversation.len(), 4);
    let messages = collection.conversation.messages();
    assert_eq!(messages[1].role, Role::Assistant);
    assert_eq!(messages[1].content, prose);

    let follow_up = engine.request(1);
    assert_eq!(follow_up.len(), 3);
    assert!(follow_up[2].content.contains(NONE_SUGGESTED_PLACEHOLDER));
    assert_eq!(collection.collected.len(), 20);
}

#[tokio::test]
async fn test_exhausted_attempts_still_publish_partial_result() {
    let settings = settings(20, 3);
    let catalog = base_catalog();
    let engine = ScriptedEngine::new(vec![reply(0..4), reply(4..8), reply(8..12)]);

    let outcome = run(&catalog, &engine, &settings, false).await;

    let RunOutcome::Published {
        collection,
        publication,
    } = outcome
    else {
        panic!("expected a published run");
    };
    assert_eq!(collection.collected.len(), 12);
    assert_eq!(collection.attempts_used, 3);
    assert_eq!(engine.calls(), 3);
    assert!(matches!(publication.latest, WriteOutcome::Written { count: 12, .. }));
    assert!(matches!(publication.all_time, WriteOutcome::Written { count: 12, .. }));

    let expected: Vec<String> = (0..12).map(|i| format!("spotify:track:{}", i)).collect();
    assert_eq!(
        catalog
            .playlist_track_ids(&settings.recommend.latest_playlist_name)
            .await
            .unwrap(),
        expected
    );
    assert_eq!(
        catalog
            .playlist_track_ids(&settings.recommend.all_time_playlist_name)
            .await
            .unwrap(),
        expected
    );
}

#[tokio::test]
async fn test_transport_failure_adds_no_assistant_turn() {
    let catalog = base_catalog();
    let engine = ScriptedEngine::new(vec![
        Err(RecommendError::transport("connection reset")),
        reply(0..5),
    ]);
    let settings = settings(5, 10);

    let collection = published(run(&catalog, &engine, &settings, false).await);

    let roles: Vec<Role> = collection
        .conversation
        .messages()
        .iter()
        .map(|m| m.role)
        .collect();
    assert_eq!(roles, vec![Role::User, Role::User, Role::Assistant]);
    assert_eq!(collection.collected.len(), 5);
}

#[tokio::test]
async fn test_liked_and_repeated_songs_are_never_collected() {
    let catalog = base_catalog().with_track(CatalogTrack {
        id: "spotify:track:liked".to_string(),
        title: "Song A".to_string(),
        artist: "Artist X".to_string(),
    });
    let liked_reply = Ok(json!([
        {"track": "Song A", "artist": "Artist X"},
        {"track": "Song 1", "artist": "Artist 1"},
        {"track": "Song 2", "artist": "Artist 2"}
    ])
    .to_string());
    let repeat_reply = Ok(json!({"songs": [
        {"track": "song 1", "artist": "artist 1"},
        {"track": "Song 3", "artist": "Artist 3"}
    ]})
    .to_string());
    let engine = ScriptedEngine::new(vec![liked_reply, repeat_reply]);
    let settings = settings(3, 2);

    let collection = published(run(&catalog, &engine, &settings, false).await);

    let ids: Vec<_> = collection
        .collected
        .iter()
        .map(|c| c.catalog_id.as_str())
        .collect();
    assert_eq!(ids, vec!["spotify:track:1", "spotify:track:2", "spotify:track:3"]);
    assert_eq!(collection.rejections(RejectReason::Liked), 1);
    assert_eq!(collection.rejections(RejectReason::AlreadyCollected), 1);
    // Raw suggestions are echoed back without deduplication.
    assert_eq!(collection.session_suggestions.len(), 5);
}

#[tokio::test]
async fn test_surplus_candidates_are_discarded_once_full() {
    let catalog = base_catalog();
    let engine = ScriptedEngine::new(vec![reply(0..30)]);
    let settings = settings(20, 10);

    let collection = published(run(&catalog, &engine, &settings, false).await);

    assert_eq!(collection.collected.len(), 20);
    assert_eq!(collection.events.len(), 20);
    assert_eq!(collection.collected.last().unwrap().catalog_id, "spotify:track:19");
}

#[tokio::test]
async fn test_unverifiable_suggestions_are_dropped() {
    let catalog = base_catalog();
    let engine = ScriptedEngine::new(vec![Ok(json!([
        {"track": "Imaginary", "artist": "Nobody"},
        {"track": "Song 7", "artist": "Artist 7"}
    ])
    .to_string())]);
    let settings = settings(5, 1);

    let collection = published(run(&catalog, &engine, &settings, false).await);

    assert_eq!(collection.collected.len(), 1);
    assert_eq!(collection.collected[0].title, "Song 7");
    assert_eq!(catalog.search_calls().await, 2);
}

#[tokio::test]
async fn test_nothing_collected_writes_nothing() {
    let settings = settings(20, 2);
    let catalog = base_catalog();
    let engine = ScriptedEngine::new(vec![Ok("[]".to_string()), Ok("no idea".to_string())]);

    let outcome = run(&catalog, &engine, &settings, false).await;

    let RunOutcome::NothingCollected(collection) = outcome else {
        panic!("expected an empty run");
    };
    assert_eq!(collection.attempts_used, 2);
    assert!(catalog
        .playlist_track_ids(&settings.recommend.latest_playlist_name)
        .await
        .is_none());
}

#[tokio::test]
async fn test_dry_run_leaves_playlists_alone() {
    let settings = settings(5, 1);
    let catalog = base_catalog();
    let engine = ScriptedEngine::new(vec![reply(0..5)]);

    let outcome = run(&catalog, &engine, &settings, true).await;

    let RunOutcome::DryRun(collection) = outcome else {
        panic!("expected a dry run");
    };
    assert_eq!(collection.collected.len(), 5);
    assert!(catalog
        .playlist_track_ids(&settings.recommend.latest_playlist_name)
        .await
        .is_none());
    assert_eq!(
        catalog
            .playlist_track_ids(&settings.recommend.all_time_playlist_name)
            .await
            .unwrap(),
        Vec::<String>::new()
    );
}

#[tokio::test]
async fn test_empty_library_never_contacts_engine() {
    let catalog = InMemoryCatalog::new("me").with_tracks(tracks(0..5));
    let engine = ScriptedEngine::new(vec![reply(0..5)]);
    let settings = settings(5, 3);

    let outcome = run(&catalog, &engine, &settings, false).await;

    assert!(matches!(outcome, RunOutcome::NoLikedSongs));
    assert_eq!(engine.calls(), 0);
}

#[tokio::test]
async fn test_conversation_grows_two_turns_per_answered_attempt() {
    let catalog = base_catalog();
    let engine = ScriptedEngine::new(vec![reply(0..2), reply(2..4), reply(4..6)]);
    let settings = settings(50, 3);

    let collection = published(run(&catalog, &engine, &settings, false).await);

    assert_eq!(collection.conversation.len(), 6);
    assert_eq!(collection.collected.len(), 6);
}

#[tokio::test]
async fn test_invalid_settings_rejected_before_any_request() {
    let catalog = base_catalog();
    let engine = ScriptedEngine::new(vec![reply(0..5)]);
    let settings = settings(0, 3);
    let user = catalog.current_user().await.unwrap();
    let mut rng = StdRng::seed_from_u64(42);

    let err = run_session(&catalog, &engine, &settings, &user, &mut rng, false)
        .await
        .unwrap_err();

    assert!(matches!(err, RecommendError::Config(ref m) if m.contains("target_new_songs")));
    assert_eq!(engine.calls(), 0);
    assert_eq!(catalog.playlist_count().await, 0);
}
