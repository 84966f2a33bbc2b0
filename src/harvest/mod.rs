//! # Repository content harvester
//!
//! Lists a GitHub repository with one recursive Git Trees API call, keeps the
//! blobs whose extension is allowed, fetches each one from the raw content
//! host and renders a text document grouped by folder.
//!
//! Only an unparseable URL or a failed listing call aborts a harvest. Every
//! per-file problem is recorded inline in the document.

/// Harvest document and per-file outcomes
pub mod document;
/// Repository URL parsing
pub mod reference;
/// Git Trees API response types
pub mod tree;

use crate::error::{Result, ServiceError};
use log::{debug, info, warn};
use reqwest::{Client, RequestBuilder};
use std::collections::HashSet;
use std::time::Duration;

pub use document::{FetchedFile, FileContent, HarvestDocument, SkipReason};
pub use reference::RepositoryReference;
pub use tree::{EntryKind, TreeEntry, TreeResponse};

/// Public GitHub REST API
pub const GITHUB_API_BASE: &str = "https://api.github.com";
/// Public raw content host
pub const GITHUB_RAW_BASE: &str = "https://raw.githubusercontent.com";

/// Extensions harvested when the caller does not pass its own set
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    ".py", ".js", ".ts", ".java", ".cpp", ".c", ".h", ".html", ".css", ".go", ".rb", ".php",
];

/// Default byte threshold above which a file body is not read
pub const DEFAULT_MAX_FILE_SIZE: u64 = 200_000;

const FILE_TIMEOUT_SECS: u64 = 10;
const USER_AGENT: &str = concat!("repodiagram/", env!("CARGO_PKG_VERSION"));

/// Per-call harvest settings
#[derive(Debug, Clone)]
pub struct HarvestOptions {
    /// Allowed extensions with leading dot, compared case-insensitively
    pub include_extensions: Option<HashSet<String>>,
    /// Sent as a bearer token on every request when present
    pub auth_token: Option<String>,
    /// Files declaring a larger content length are skipped
    pub max_file_size: u64,
    /// Timeout applied to each raw content request
    pub file_timeout: Duration,
}

impl Default for HarvestOptions {
    fn default() -> Self {
        Self {
            include_extensions: None,
            auth_token: None,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            file_timeout: Duration::from_secs(FILE_TIMEOUT_SECS),
        }
    }
}

impl HarvestOptions {
    /// Lower-cased allow-set, falling back to [`DEFAULT_EXTENSIONS`]
    pub fn allowed_extensions(&self) -> HashSet<String> {
        match &self.include_extensions {
            Some(exts) => exts.iter().map(|e| normalize_extension(e)).collect(),
            None => DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }
}

/// Lower-cases an extension and adds the leading dot when missing
pub fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{}", ext)
    }
}

/// Harvests repository contents from GitHub
#[derive(Debug, Clone)]
pub struct GitHubHarvester {
    client: Client,
    api_base: String,
    raw_base: String,
}

impl GitHubHarvester {
    /// Creates a harvester talking to the public GitHub hosts
    pub fn new() -> Result<Self> {
        Self::with_base_urls(GITHUB_API_BASE, GITHUB_RAW_BASE)
    }

    /// Creates a harvester against custom API and raw content hosts
    pub fn with_base_urls(api_base: impl Into<String>, raw_base: impl Into<String>) -> Result<Self> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            raw_base: raw_base.into().trim_end_matches('/').to_string(),
        })
    }

    /// Parses `url` and harvests `branch` of the repository it names
    pub async fn harvest(&self, url: &str, branch: &str, options: &HarvestOptions) -> Result<HarvestDocument> {
        let reference = RepositoryReference::parse(url, branch)?;
        self.harvest_reference(&reference, options).await
    }

    /// Harvests an already parsed repository reference
    pub async fn harvest_reference(
        &self,
        reference: &RepositoryReference,
        options: &HarvestOptions,
    ) -> Result<HarvestDocument> {
        info!("Harvesting {}", reference);

        let listing = self.fetch_tree(reference, options).await?;
        let allowed = options.allowed_extensions();

        let mut files = Vec::new();
        for entry in listing.tree.iter().filter(|e| e.is_wanted(&allowed)) {
            let content = self.fetch_file(reference, entry, options).await;
            files.push(FetchedFile {
                path: entry.path.clone(),
                folder: entry.folder().to_string(),
                filename: entry.filename().to_string(),
                content,
            });
        }

        info!(
            "Harvested {} of {} tree entries from {}",
            files.len(),
            listing.tree.len(),
            reference
        );
        Ok(HarvestDocument::new(files))
    }

    fn build_request(&self, url: &str, options: &HarvestOptions) -> RequestBuilder {
        let mut req = self.client.get(url);

        if let Some(token) = &options.auth_token {
            req = req.bearer_auth(token);
        }

        req
    }

    async fn fetch_tree(&self, reference: &RepositoryReference, options: &HarvestOptions) -> Result<TreeResponse> {
        let url = format!(
            "{}/repos/{}/{}/git/trees/{}?recursive=1",
            self.api_base, reference.owner, reference.name, reference.branch
        );

        let response = self
            .build_request(&url, options)
            .header("Accept", "application/vnd.github.v3+json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::TreeFetch {
                status: status.as_u16(),
                body,
            });
        }

        let listing: TreeResponse = response.json().await?;
        if listing.truncated {
            warn!(
                "Tree listing for {} was truncated; results may be incomplete",
                reference
            );
        }

        Ok(listing)
    }

    async fn fetch_file(
        &self,
        reference: &RepositoryReference,
        entry: &TreeEntry,
        options: &HarvestOptions,
    ) -> FileContent {
        match self.try_fetch_file(reference, entry, options).await {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to fetch {}: {}", entry.path, e);
                FileContent::Skipped(SkipReason::FetchError(e.to_string()))
            }
        }
    }

    async fn try_fetch_file(
        &self,
        reference: &RepositoryReference,
        entry: &TreeEntry,
        options: &HarvestOptions,
    ) -> std::result::Result<FileContent, reqwest::Error> {
        let url = format!(
            "{}/{}/{}/{}/{}",
            self.raw_base, reference.owner, reference.name, reference.branch, entry.path
        );

        let response = self
            .build_request(&url, options)
            .timeout(options.file_timeout)
            .send()
            .await?
            .error_for_status()?;

        let size = response.content_length().unwrap_or(0);
        if size > options.max_file_size {
            debug!("Skipping {} ({} bytes)", entry.path, size);
            return Ok(FileContent::Skipped(SkipReason::SizeExceeded {
                size,
                limit: options.max_file_size,
            }));
        }

        let text = response.text().await?;
        Ok(FileContent::Excerpt(document::indent_excerpt(&text)))
    }
}
