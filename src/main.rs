use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing_subscriber::EnvFilter;
use tunesmith::catalog::auth::SpotifyAuth;
use tunesmith::catalog::spotify::SpotifyCatalog;
use tunesmith::catalog::Catalog;
use tunesmith::cli::{Cli, Commands, RunArgs};
use tunesmith::recommend::{CollectionOutcome, RejectReason, WriteOutcome};
use tunesmith::{run_session, utils, Credentials, LLMClient, RunOutcome, Settings};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let settings = Settings::new().context("Failed to load configuration")?;
    init_tracing(&settings.logging.level);

    let credentials = match Settings::credentials() {
        Ok(credentials) => credentials,
        Err(e) => {
            utils::print_error(&format!("Error: {}", e));
            std::process::exit(1);
        }
    };

    match Commands::or_default(cli.command) {
        Commands::Auth => handle_auth(&settings, &credentials).await,
        Commands::Run(args) => handle_run(settings, &credentials, args).await,
    }
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn connect_catalog(settings: &Settings, credentials: &Credentials) -> Result<SpotifyCatalog> {
    let http = SpotifyCatalog::http_client(&settings.catalog)?;
    let auth = SpotifyAuth::authorize(http.clone(), credentials, &settings.catalog).await?;
    Ok(SpotifyCatalog::new(
        http,
        auth,
        &settings.catalog,
        &settings.pacing,
    ))
}

async fn handle_auth(settings: &Settings, credentials: &Credentials) -> Result<()> {
    let catalog = connect_catalog(settings, credentials).await?;
    let user = catalog
        .current_user()
        .await
        .context("Failed to fetch Spotify profile")?;
    utils::print_success(&format!(
        "Token cached at {}. Logged in as: {}",
        settings.catalog.token_cache_path,
        user.label()
    ));
    Ok(())
}

async fn handle_run(mut settings: Settings, credentials: &Credentials, args: RunArgs) -> Result<()> {
    if let Some(target) = args.target {
        settings.recommend.target_new_songs = target;
    }
    if let Some(max_attempts) = args.max_attempts {
        settings.recommend.max_attempts = max_attempts;
    }
    if let Some(seed_size) = args.seed_size {
        settings.recommend.max_seed_songs = seed_size;
    }
    settings.validate()?;

    let catalog = connect_catalog(&settings, credentials).await?;
    let user = catalog
        .current_user()
        .await
        .context("Failed to fetch Spotify profile")?;
    utils::print_success(&format!("Logged in as: {}", user.label()));

    let engine = LLMClient::new(credentials.openrouter_api_key.clone(), settings.llm.clone())?;
    let mut rng = StdRng::from_entropy();

    let outcome = run_session(&catalog, &engine, &settings, &user, &mut rng, args.dry_run).await?;

    match outcome {
        RunOutcome::NoLikedSongs => {
            utils::print_warning("No liked songs found. Nothing to recommend from.");
        }
        RunOutcome::NothingCollected(collection) => {
            print_summary(&collection);
            utils::print_warning(
                "No new, verifiable songs were collected after all attempts. Playlists left unchanged.",
            );
        }
        RunOutcome::DryRun(collection) => {
            print_summary(&collection);
            utils::print_info("Dry run: playlists were not modified.");
        }
        RunOutcome::Published {
            collection,
            publication,
        } => {
            print_summary(&collection);
            print_write("Latest", &settings.recommend.latest_playlist_name, &publication.latest);
            print_write(
                "All-time",
                &settings.recommend.all_time_playlist_name,
                &publication.all_time,
            );
        }
    }

    Ok(())
}

fn print_summary(collection: &CollectionOutcome) {
    utils::print_header("Recommendation Run");
    utils::print_info(&format!(
        "Attempts used: {} ({} without usable suggestions)",
        collection.attempts_used, collection.failed_attempts
    ));
    utils::print_info(&format!(
        "Conversation turns: {}, raw suggestions: {}",
        collection.conversation.len(),
        collection.session_suggestions.len()
    ));
    utils::print_info(&format!(
        "Skipped: {} liked, {} previously recommended, {} duplicates",
        collection.rejections(RejectReason::Liked),
        collection.rejections(RejectReason::AlreadyRecommended),
        collection.rejections(RejectReason::AlreadyCollected)
    ));
    utils::print_success(&format!(
        "Collected {}/{} new songs:",
        collection.collected.len(),
        collection.target
    ));
    utils::print_song_list(&collection.collected);
}

fn print_write(label: &str, name: &str, outcome: &WriteOutcome) {
    match outcome {
        WriteOutcome::Written { playlist, count } => {
            let url = playlist
                .url
                .as_deref()
                .map(|u| format!(" URL: {}", u))
                .unwrap_or_default();
            utils::print_success(&format!("{}: wrote {} songs to '{}'.{}", label, count, name, url));
        }
        WriteOutcome::Skipped(reason) => {
            utils::print_warning(&format!("{}: skipped '{}' ({})", label, name, reason));
        }
        WriteOutcome::Failed(reason) => {
            utils::print_error(&format!("{}: failed to update '{}': {}", label, name, reason));
        }
    }
}
