//! Traversal configuration.

use std::collections::BTreeSet;

/// Format identifiers the traversal recognizes in
/// [`TraverserOptions::formats`].
///
/// Recognition is about the option vocabulary, not about what the built-in
/// decoder backend can actually decode; requesting a recognized format the
/// backend cannot serve faults at descent time.
pub const STANDARD_FORMATS: &[&str] = &[
    "7zip", "ar", "cab", "cpio", "empty", "iso9660", "lha", "rar", "tar", "warc", "xar", "zip",
];

/// Returns `true` when `name` is one of the recognized format identifiers.
pub fn is_recognized_format(name: &str) -> bool {
    STANDARD_FORMATS.contains(&name)
}

/// Configuration snapshot for a traversal.
///
/// The snapshot is captured when a [`Traverser`](crate::Traverser) is
/// constructed and travels with every entry copy, so detached entries reopen
/// their hierarchies under the same configuration.
///
/// # Example
///
/// ```
/// use archive_r::TraverserOptions;
///
/// let options = TraverserOptions::new()
///     .passphrase("secret")
///     .format("tar")
///     .metadata_key("size")
///     .metadata_key("mtime")
///     .descend_archives(true);
///
/// assert_eq!(options.formats, ["tar"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraverserOptions {
    /// Passphrases tried in order for encrypted archives.
    pub passphrases: Vec<String>,
    /// Archive formats to accept; empty means any supported format.
    pub formats: Vec<String>,
    /// Allow-list of metadata keys to capture; empty captures none.
    pub metadata_keys: BTreeSet<String>,
    /// Whether archives are descended into (and directories recursed) by
    /// default. Per-entry overrides still apply.
    pub descend_archives: bool,
}

impl Default for TraverserOptions {
    fn default() -> Self {
        Self {
            passphrases: Vec::new(),
            formats: Vec::new(),
            metadata_keys: BTreeSet::new(),
            descend_archives: true,
        }
    }
}

impl TraverserOptions {
    /// Creates the default configuration: any format, no metadata capture,
    /// descent enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a passphrase to try for encrypted archives.
    pub fn passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrases.push(passphrase.into());
        self
    }

    /// Restricts traversal to the given archive format.
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.formats.push(format.into());
        self
    }

    /// Adds a metadata key to the capture allow-list.
    pub fn metadata_key(mut self, key: impl Into<String>) -> Self {
        self.metadata_keys.insert(key.into());
        self
    }

    /// Sets the default descent behavior.
    pub fn descend_archives(mut self, descend: bool) -> Self {
        self.descend_archives = descend;
        self
    }

    /// Returns `true` when `format` is accepted by this configuration: the
    /// list is empty or contains the identifier.
    pub fn accepts_format(&self, format: &str) -> bool {
        self.formats.is_empty() || self.formats.iter().any(|f| f == format)
    }
}
