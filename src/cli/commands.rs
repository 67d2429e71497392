use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tunesmith")]
#[command(author, version, about = "New music recommendations from your liked songs", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Collect new recommendations and publish them to the playlists (default)
    Run(RunArgs),

    /// Authorize with Spotify and cache the token, without running
    Auth,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Number of new songs to collect (overrides recommend.target_new_songs)
    #[arg(short, long)]
    pub target: Option<usize>,

    /// Maximum engine requests (overrides recommend.max_attempts)
    #[arg(short = 'a', long)]
    pub max_attempts: Option<usize>,

    /// Maximum liked songs included in the seed prompt
    #[arg(short, long)]
    pub seed_size: Option<usize>,

    /// Collect and print, but do not write playlists
    #[arg(long)]
    pub dry_run: bool,
}

impl Commands {
    pub fn or_default(command: Option<Self>) -> Self {
        command.unwrap_or_else(|| Commands::Run(RunArgs::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_means_run() {
        let cli = Cli::try_parse_from(["tunesmith"]).unwrap();
        assert!(matches!(
            Commands::or_default(cli.command),
            Commands::Run(RunArgs { dry_run: false, .. })
        ));
    }

    #[test]
    fn test_run_overrides() {
        let cli = Cli::try_parse_from([
            "tunesmith", "run", "--target", "5", "-a", "3", "--seed-size", "50", "--dry-run",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Run(args)) => {
                assert_eq!(args.target, Some(5));
                assert_eq!(args.max_attempts, Some(3));
                assert_eq!(args.seed_size, Some(50));
                assert!(args.dry_run);
            }
            _ => panic!("expected run subcommand"),
        }
    }
}
