use std::collections::BTreeMap;
use std::io::{self, IsTerminal, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use bundler_core::{
    BundleOrchestrator, BundleReport, BundleRequest, DownloadObserver, FailureCategory,
    FailureEntry,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::ProcessExit;
use crate::app::{config_runtime, exit_handler, progress_manager, terminal};
use crate::app_config;

pub(crate) async fn run_bundler() -> Result<ProcessExit> {
    let (args, cli_sources) = config_runtime::parse_cli_with_sources();

    let no_color = terminal::is_no_color_requested(args.no_color);
    let no_progress = args.no_progress;
    let code = args.code.clone();

    let loaded = app_config::load_file_config_from(args.config.as_deref())?;
    let settings = config_runtime::resolve_settings(args, &cli_sources, loaded.config.as_ref())?;

    let default_level = config_runtime::resolve_default_log_level(settings.verbose, settings.quiet);
    let force_cli_log_level = config_runtime::should_force_cli_log_level(&cli_sources);
    terminal::init_tracing(default_level, force_cli_log_level, no_color);

    if let Some(path) = loaded.path.as_deref() {
        debug!(path = %path.display(), loaded = loaded.config.is_some(), "config file");
    }
    info!(
        code = %code,
        profile = %settings.profile,
        output_root = %settings.output_root.display(),
        "quiz-bundler starting"
    );

    let cancel = CancellationToken::new();
    let cancel_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; finishing in-flight downloads");
            cancel_signal.cancel();
        }
    });

    let show_progress = terminal::should_show_progress(
        io::stderr().is_terminal(),
        settings.quiet,
        no_progress,
        terminal::is_dumb_terminal(),
    );
    let progress = progress_manager::create_progress_reporter(show_progress);
    let observer = progress
        .clone()
        .map(|reporter| reporter as Arc<dyn DownloadObserver>);

    let orchestrator = match BundleOrchestrator::from_config(&settings.config, observer) {
        Ok(orchestrator) => orchestrator,
        Err(bundle_error) => {
            error!(error = %bundle_error, "bundler setup failed");
            return Ok(exit_handler::exit_for_bundle_error(&bundle_error));
        }
    };

    let request = BundleRequest::new(code, settings.profile, settings.output_root);
    let outcome = orchestrator.run(&request, &cancel).await;
    if let Some(reporter) = &progress {
        reporter.finish();
    }

    match outcome {
        Ok(report) => {
            log_failure_summary(&report);
            print_report(&report)?;
            Ok(ProcessExit::Success)
        }
        Err(bundle_error) => {
            error!(error = %bundle_error, "bundle failed");
            let mut source = std::error::Error::source(&bundle_error);
            while let Some(cause) = source {
                debug!(cause = %cause, "caused by");
                source = cause.source();
            }
            Ok(exit_handler::exit_for_bundle_error(&bundle_error))
        }
    }
}

fn print_report(report: &BundleReport) -> Result<()> {
    let json = report
        .to_json_pretty()
        .context("Failed to encode bundle report")?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{json}").context("Failed to write bundle report")?;
    Ok(())
}

/// Failures grouped by category, in category order.
fn group_failures(failures: &[FailureEntry]) -> BTreeMap<FailureCategory, Vec<&FailureEntry>> {
    let mut groups: BTreeMap<FailureCategory, Vec<&FailureEntry>> = BTreeMap::new();
    for failure in failures {
        groups.entry(failure.category).or_default().push(failure);
    }
    groups
}

fn log_failure_summary(report: &BundleReport) {
    info!(
        questions = report.question_count,
        images = %format!("{}/{}", report.images_succeeded, report.images_attempted),
        logo = if report.logo_succeeded { "saved" } else { "missing" },
        manifest = %report.manifest_path.display(),
        "bundle written"
    );
    for warning in &report.warnings {
        warn!(%warning, "bundle warning");
    }
    for (category, entries) in group_failures(&report.failures) {
        warn!(
            "{} {} ({} failed)",
            category.icon(),
            category.label(),
            entries.len()
        );
        for entry in entries {
            warn!(asset = %entry.task.label(), url = %entry.task.url, "  {}", entry.reason);
        }
    }
}
