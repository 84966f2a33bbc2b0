use crate::error::{Result, ServiceError};
use std::fmt;
use url::Url;

/// Owner, name and branch of a GitHub repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryReference {
    /// Account or organization owning the repository
    pub owner: String,
    /// Repository name without any `.git` suffix
    pub name: String,
    /// Branch to read
    pub branch: String,
}

impl RepositoryReference {
    /// Splits a repository URL into owner and name.
    ///
    /// The owner and name are the last two non-empty path segments, so
    /// `https://github.com/rust-lang/rust.git` and
    /// `https://github.com/rust-lang/rust/` both resolve to `rust-lang/rust`.
    /// URLs without a scheme are read as `https://`.
    pub fn parse(url: &str, branch: &str) -> Result<Self> {
        let trimmed = url.trim();
        let parsed = Url::parse(trimmed)
            .or_else(|_| Url::parse(&format!("https://{}", trimmed)))
            .map_err(|_| ServiceError::MalformedUrl(url.to_string()))?;

        let segments: Vec<&str> = parsed
            .path_segments()
            .map(|segments| segments.filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        let (owner, name) = match segments.as_slice() {
            [.., owner, name] => (*owner, *name),
            _ => return Err(ServiceError::MalformedUrl(url.to_string())),
        };

        let name = name.strip_suffix(".git").unwrap_or(name);
        if name.is_empty() {
            return Err(ServiceError::MalformedUrl(url.to_string()));
        }

        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
            branch: branch.to_string(),
        })
    }

    /// Returns the same repository on a different branch
    pub fn with_branch(&self, branch: &str) -> Self {
        Self {
            branch: branch.to_string(),
            ..self.clone()
        }
    }
}

impl fmt::Display for RepositoryReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.owner, self.name, self.branch)
    }
}
