//! Merges command-line flags, the config file and built-in defaults.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, bail};
use clap::{ArgMatches, CommandFactory, FromArgMatches, parser::ValueSource};
use bundler_core::{BundlerConfig, Profile};

use crate::app_config::{FileConfig, VerbositySetting};
use crate::cli::Args;

/// Output roots without an explicit setting land under this directory.
const DEFAULT_BUNDLES_DIR: &str = "bundles";

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct CliValueSources {
    pub(crate) concurrency: bool,
    pub(crate) verbose: bool,
    pub(crate) quiet: bool,
}

pub(crate) fn parse_cli_with_sources() -> (Args, CliValueSources) {
    let command = Args::command();
    let matches = command.get_matches();
    let args = Args::from_arg_matches(&matches).unwrap_or_else(|err| err.exit());
    let sources = sources_from_matches(&matches);
    (args, sources)
}

fn sources_from_matches(matches: &ArgMatches) -> CliValueSources {
    CliValueSources {
        concurrency: is_commandline_value(matches, "concurrency"),
        verbose: is_commandline_value(matches, "verbose"),
        quiet: is_commandline_value(matches, "quiet"),
    }
}

fn is_commandline_value(matches: &ArgMatches, id: &str) -> bool {
    matches.value_source(id) == Some(ValueSource::CommandLine)
}

/// Everything the runtime needs after merging.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedSettings {
    pub(crate) config: BundlerConfig,
    pub(crate) profile: Profile,
    pub(crate) output_root: PathBuf,
    pub(crate) verbose: u8,
    pub(crate) quiet: bool,
}

/// Applies `file_config` under `args` and builds the library configuration.
///
/// Command-line values win over the file, the file wins over defaults.
pub(crate) fn resolve_settings(
    mut args: Args,
    cli_sources: &CliValueSources,
    file_config: Option<&FileConfig>,
) -> Result<ResolvedSettings> {
    let file = file_config.cloned().unwrap_or_default();

    if !cli_sources.concurrency
        && let Some(concurrency) = file.concurrency
    {
        args.concurrency = concurrency;
    }
    if !cli_sources.verbose
        && !cli_sources.quiet
        && let Some(verbosity) = file.verbosity
    {
        apply_config_verbosity(&mut args, verbosity);
    }

    let Some(api_base_url) = args.api_base_url.take().or(file.api_base_url) else {
        bail!(
            "No content API configured. Pass --api-base-url or set `api_base_url` in the config file"
        );
    };

    if !(1..=16).contains(&args.concurrency) {
        bail!(
            "Invalid effective concurrency value: {}. Expected range: 1..=16",
            args.concurrency
        );
    }

    let profile = Profile::from(args.profile);
    let mut config = BundlerConfig::new(api_base_url);
    config.asset_base_url = args.asset_base_url.take().or(file.asset_base_url);
    config.logo_storage_dir = args.logo_storage_dir.take().or(file.logo_storage_dir);
    config.concurrency = usize::from(args.concurrency);
    if let Some(secs) = file.group_timeout_secs {
        config.group_timeout = Duration::from_secs(secs);
    }
    if let Some(secs) = file.directory_timeout_secs {
        config.directory_timeout = Duration::from_secs(secs);
    }
    if let Some(secs) = file.download_timeout_secs {
        config.download_timeout = Duration::from_secs(secs);
    }

    let output_root = args
        .output_root
        .take()
        .or(file.output_root)
        .unwrap_or_else(|| default_output_root(profile, &args.code));

    Ok(ResolvedSettings {
        config,
        profile,
        output_root,
        verbose: args.verbose,
        quiet: args.quiet,
    })
}

/// `bundles/<profile>/<code>`, with the code percent-encoded so distinct codes
/// never share a directory.
fn default_output_root(profile: Profile, code: &str) -> PathBuf {
    let safe = urlencoding::encode(code.trim());
    PathBuf::from(DEFAULT_BUNDLES_DIR)
        .join(profile.as_str())
        .join(&*safe)
}

fn apply_config_verbosity(args: &mut Args, verbosity: VerbositySetting) {
    match verbosity {
        VerbositySetting::Default => {
            args.quiet = false;
            args.verbose = 0;
        }
        VerbositySetting::Verbose => {
            args.quiet = false;
            args.verbose = 1;
        }
        VerbositySetting::Quiet => {
            args.quiet = true;
            args.verbose = 0;
        }
        VerbositySetting::Debug => {
            args.quiet = false;
            args.verbose = 2;
        }
    }
}

pub(crate) fn resolve_default_log_level(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

pub(crate) fn should_force_cli_log_level(cli_sources: &CliValueSources) -> bool {
    cli_sources.verbose || cli_sources.quiet
}
