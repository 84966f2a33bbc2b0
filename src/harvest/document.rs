use std::fmt;

/// Left margin written in front of every excerpt and notice line
pub const INDENT: &str = "     ";

/// Number of characters kept from each file's indented text
pub const EXCERPT_CHARS: usize = 50;

/// Why a file's body is missing from the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The declared content length exceeded the configured threshold
    SizeExceeded {
        /// Declared size in bytes
        size: u64,
        /// Configured threshold in bytes
        limit: u64,
    },
    /// Fetching or reading the body failed
    FetchError(String),
}

/// Outcome of fetching one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    /// Indented and truncated body text
    Excerpt(String),
    /// No body was stored
    Skipped(SkipReason),
}

/// One retained blob and what was fetched for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedFile {
    /// Full path inside the repository
    pub path: String,
    /// Folder part of the path, empty at the root
    pub folder: String,
    /// File name part of the path
    pub filename: String,
    /// Excerpt or skip notice
    pub content: FileContent,
}

impl FetchedFile {
    /// The line recorded under the file name
    pub fn content_line(&self) -> String {
        match &self.content {
            FileContent::Excerpt(text) => text.clone(),
            FileContent::Skipped(SkipReason::SizeExceeded { size, limit }) => format!(
                "{}[Skipped {}: size {} bytes > {}]",
                INDENT, self.filename, size, limit
            ),
            FileContent::Skipped(SkipReason::FetchError(error)) => format!(
                "{}[Error fetching raw {}: {}]",
                INDENT, self.filename, error
            ),
        }
    }
}

/// Text rendering of a harvest, grouped by folder in listing order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestDocument {
    files: Vec<FetchedFile>,
}

impl HarvestDocument {
    /// Builds a document from files in listing order
    pub fn new(files: Vec<FetchedFile>) -> Self {
        Self { files }
    }

    /// Files in listing order
    pub fn files(&self) -> &[FetchedFile] {
        &self.files
    }

    /// Whether no file survived filtering
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Renders the document lines.
    ///
    /// A folder header is written whenever the folder differs from the
    /// previous file's folder, so a folder that shows up again after another
    /// one gets a second header.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        let mut current_folder: Option<&str> = None;

        for file in &self.files {
            if current_folder != Some(file.folder.as_str()) {
                let label = if file.folder.is_empty() { "Root Folder" } else { file.folder.as_str() };
                lines.push(format!("Folder: {}:", label));
                current_folder = Some(file.folder.as_str());
            }
            lines.push(format!("---> {}", file.filename));
            lines.push(file.content_line());
            lines.push(String::new());
        }

        lines
    }
}

impl fmt::Display for HarvestDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lines().join("\n"))
    }
}

/// Indents every line of `text`, joins them with newlines and keeps the
/// first [`EXCERPT_CHARS`] characters of the result.
///
/// The cut is applied after indentation, so it can land in the middle of a line.
pub fn indent_excerpt(text: &str) -> String {
    let indented = split_lines(text)
        .into_iter()
        .map(|line| format!("{}{}", INDENT, line))
        .collect::<Vec<_>>()
        .join("\n");
    truncate_chars(&indented, EXCERPT_CHARS)
}

fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\x0b' | '\x0c' | '\x1c' | '\x1d' | '\x1e' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

/// Splits `text` on every Unicode line boundary.
///
/// `\r\n` counts as one break and a trailing break does not produce an
/// empty final line.
pub fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        if !is_line_break(c) {
            continue;
        }
        lines.push(&text[start..idx]);
        start = idx + c.len_utf8();
        if c == '\r' {
            if let Some(&(next, '\n')) = chars.peek() {
                chars.next();
                start = next + 1;
            }
        }
    }

    if start < text.len() {
        lines.push(&text[start..]);
    }
    lines
}

/// Keeps at most `max` characters of `text`
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
