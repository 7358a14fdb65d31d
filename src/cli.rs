//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use bundler_core::{DEFAULT_CONCURRENCY, Profile};

/// Bundle a quiz question group into a local game-client asset tree.
///
/// Fetches the group identified by CODE, resolves its publisher logo, writes
/// the profile's manifest and downloads every referenced image. The run
/// report is printed to stdout as JSON.
#[derive(Parser, Debug)]
#[command(name = "quiz-bundler")]
#[command(author, version, about)]
pub struct Args {
    /// Group share code
    pub code: String,

    /// Target client layout
    #[arg(short, long, value_enum)]
    pub profile: ProfileArg,

    /// Root directory for the bundle (default: bundles/<profile>/<code>)
    #[arg(short, long)]
    pub output_root: Option<PathBuf>,

    /// Content API base URL
    #[arg(long)]
    pub api_base_url: Option<String>,

    /// Base URL that relative asset paths are joined onto (default: API base)
    #[arg(long)]
    pub asset_base_url: Option<String>,

    /// Local mirror of the logo storage bucket, used to date candidate logos
    #[arg(long)]
    pub logo_storage_dir: Option<PathBuf>,

    /// Maximum concurrent downloads (1-16)
    #[arg(short = 'c', long, default_value_t = DEFAULT_CONCURRENCY as u8, value_parser = clap::value_parser!(u8).range(1..=16))]
    pub concurrency: u8,

    /// Config file (default: $XDG_CONFIG_HOME/quiz-bundler/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Disable the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Disable colored log output
    #[arg(long)]
    pub no_color: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

/// Command-line spelling of [`Profile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProfileArg {
    /// Game-engine client (Questions/QuestionsData.json, Images/, Logo/)
    Engine,
    /// Browser client (questions/question.json, questions/images/)
    Web,
}

impl From<ProfileArg> for Profile {
    fn from(value: ProfileArg) -> Self {
        match value {
            ProfileArg::Engine => Profile::EngineClient,
            ProfileArg::Web => Profile::WebClient,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_minimal_args_parse() {
        let args = Args::try_parse_from(["quiz-bundler", "ABC123", "--profile", "web"]).unwrap();
        assert_eq!(args.code, "ABC123");
        assert_eq!(args.profile, ProfileArg::Web);
        assert_eq!(usize::from(args.concurrency), DEFAULT_CONCURRENCY);
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        assert!(args.output_root.is_none());
    }

    #[test]
    fn test_cli_profile_is_required() {
        let result = Args::try_parse_from(["quiz-bundler", "ABC123"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::MissingRequiredArgument
        );
    }

    #[test]
    fn test_cli_rejects_unknown_profile() {
        let result = Args::try_parse_from(["quiz-bundler", "ABC123", "--profile", "desktop"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_concurrency_range() {
        assert!(Args::try_parse_from(["quiz-bundler", "X", "-p", "engine", "-c", "0"]).is_err());
        assert!(Args::try_parse_from(["quiz-bundler", "X", "-p", "engine", "-c", "17"]).is_err());
        let args = Args::try_parse_from(["quiz-bundler", "X", "-p", "engine", "-c", "16"]).unwrap();
        assert_eq!(args.concurrency, 16);
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["quiz-bundler", "X", "-p", "web", "-vv"]).unwrap();
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_cli_verbose_conflicts_with_quiet() {
        assert!(Args::try_parse_from(["quiz-bundler", "X", "-p", "web", "-v", "-q"]).is_err());
    }

    #[test]
    fn test_profile_arg_maps_to_profile() {
        assert_eq!(Profile::from(ProfileArg::Engine), Profile::EngineClient);
        assert_eq!(Profile::from(ProfileArg::Web), Profile::WebClient);
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let err = Args::try_parse_from(["quiz-bundler", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }
}
