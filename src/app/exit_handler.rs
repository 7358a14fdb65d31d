//! Exit code logic for the bundler process.
//!
//! Single responsibility: map a failed run to the process exit outcome.

use bundler_core::BundleError;

use crate::ProcessExit;

/// Determines the process exit outcome for a run that ended without a report.
pub(crate) fn exit_for_bundle_error(error: &BundleError) -> ProcessExit {
    match error {
        BundleError::InvalidRequest { .. } => ProcessExit::InvalidRequest,
        BundleError::FatalFetch { .. } => ProcessExit::FetchFailed,
        BundleError::Output { .. } | BundleError::Manifest(_) => ProcessExit::OutputFailed,
        BundleError::Cancelled { .. } => ProcessExit::Cancelled,
        BundleError::Setup { .. } => ProcessExit::Failure,
    }
}
