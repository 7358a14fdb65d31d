//! Asset downloads: streaming files to disk with bounded parallelism.
//!
//! # Features
//!
//! - Streaming downloads (memory-efficient for large images)
//! - Fixed destination per task, parent directories created on demand
//! - Per-transfer timeout, no retries
//! - Structured error types with full context
//! - Partial files removed on failure
//!
//! # Example
//!
//! ```no_run
//! use bundler_core::download::HttpClient;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new()?;
//! let bytes = client
//!     .download_to_path("https://cdn.example.com/logo.png", Path::new("./out/logo.png"))
//!     .await?;
//! println!("Downloaded {bytes} bytes");
//! # Ok(())
//! # }
//! ```

mod client;
mod engine;
mod error;
mod task;

pub use client::HttpClient;
pub use engine::{AssetDownloader, DEFAULT_CONCURRENCY, DownloadObserver, EngineError};
pub use error::DownloadError;
pub use task::{AssetRole, DownloadTask, TaskResult};
