use serde::Deserialize;
use std::collections::HashSet;

/// Response from GitHub's Git Trees API.
/// `GET /repos/{owner}/{repo}/git/trees/{branch}?recursive=1`
#[derive(Debug, Deserialize)]
pub struct TreeResponse {
    /// Entries in listing order
    #[serde(default)]
    pub tree: Vec<TreeEntry>,
    /// Set by GitHub when the listing exceeded its size limit
    #[serde(default)]
    pub truncated: bool,
}

/// A single entry in the tree.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct TreeEntry {
    /// Path relative to the repository root
    pub path: String,
    /// Kind of object the entry points at
    #[serde(rename = "type", default)]
    pub kind: EntryKind,
}

/// Object kinds reported by the tree listing
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// A regular file
    Blob,
    /// A directory
    Tree,
    /// Submodules and anything else
    #[default]
    #[serde(other)]
    Other,
}

impl TreeEntry {
    /// Folder part of the path, empty for files at the repository root
    pub fn folder(&self) -> &str {
        self.path.rsplit_once('/').map(|(folder, _)| folder).unwrap_or("")
    }

    /// File name part of the path
    pub fn filename(&self) -> &str {
        self.path.rsplit_once('/').map(|(_, name)| name).unwrap_or(&self.path)
    }

    /// Lower-cased extension including the leading dot.
    ///
    /// Dotfiles such as `.bashrc` have no extension.
    pub fn extension(&self) -> Option<String> {
        let name = self.filename().trim_start_matches('.');
        name.rfind('.')
            .map(|idx| name[idx..].to_lowercase())
    }

    /// Whether the entry is a blob whose extension is in `allowed`
    pub fn is_wanted(&self, allowed: &HashSet<String>) -> bool {
        self.kind == EntryKind::Blob
            && self
                .extension()
                .is_some_and(|ext| allowed.contains(&ext))
    }
}
