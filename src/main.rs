//! CLI entry point for the quiz bundler.

use std::process::ExitCode;

mod app;
mod app_config;
mod cli;

/// Process outcome, one exit code per failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcessExit {
    /// Bundle written; the report may still list failed downloads.
    Success,
    /// Configuration or internal error.
    Failure,
    InvalidRequest,
    /// The group record could not be fetched.
    FetchFailed,
    /// The output tree could not be written.
    OutputFailed,
    /// Interrupted by Ctrl-C.
    Cancelled,
}

impl ProcessExit {
    pub(crate) fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
            Self::InvalidRequest => 2,
            Self::FetchFailed => 3,
            Self::OutputFailed => 4,
            Self::Cancelled => 130,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match app::runtime::run_bundler().await {
        Ok(exit) => ExitCode::from(exit.code()),
        Err(error) => {
            eprintln!("Error: {error:#}");
            ExitCode::from(ProcessExit::Failure.code())
        }
    }
}
