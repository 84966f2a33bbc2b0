#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![warn(clippy::all)]

//! ## Usage
//! ```rust,no_run
//! use repodiagram::harvest::{GitHubHarvester, HarvestOptions};
//!
//! async fn example() -> repodiagram::Result<()> {
//!     let harvester = GitHubHarvester::new()?;
//!     let document = harvester
//!         .harvest("https://github.com/pallets/flask", "main", &HarvestOptions::default())
//!         .await?;
//!     println!("{}", document);
//!     Ok(())
//! }
//! ```

/// Environment and file based configuration
pub mod config;
/// Error types shared by every module
pub mod error;
/// Repository listing and file harvesting
pub mod harvest;
/// Text generation and inference endpoint clients
pub mod llm;
/// Logging setup
pub mod logging;
/// Harvest, explain and diagram orchestration
pub mod pipeline;
/// Prompt templates
pub mod prompts;
/// HTTP service
pub mod server;

pub use config::{Config, Settings};
pub use error::{Result, ServiceError};
pub use harvest::{GitHubHarvester, HarvestDocument, HarvestOptions, RepositoryReference};
pub use pipeline::{Analysis, DiagramPipeline};
