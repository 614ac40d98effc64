//! Authoritative text buffer and the binding a surface is attached to

use ropey::Rope;
use std::path::{Path, PathBuf};

/// In-memory text buffer backed by a file on disk
#[derive(Debug, Clone)]
pub struct Document {
    /// Path to the file on disk
    pub path: PathBuf,
    buffer: Rope,
    /// Incremented on every change to the buffer
    revision: u64,
    /// Revision that was last written to (or read from) disk
    saved_revision: u64,
}

impl Document {
    /// Create a document with initial text that matches what is on disk
    pub fn with_text(path: impl Into<PathBuf>, text: &str) -> Self {
        Self {
            path: path.into(),
            buffer: Rope::from(text),
            revision: 0,
            saved_revision: 0,
        }
    }

    /// Load a document from a file path
    pub fn from_file(path: PathBuf) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(&path)?;
        Ok(Self::with_text(path, &content))
    }

    pub fn text(&self) -> String {
        self.buffer.to_string()
    }

    pub fn line_count(&self) -> usize {
        self.buffer.len_lines()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_dirty(&self) -> bool {
        self.revision != self.saved_revision
    }

    /// Replace the entire buffer. Returns false (and keeps the revision) when
    /// the text is already identical.
    pub fn replace_all(&mut self, text: &str) -> bool {
        if self.buffer == text {
            return false;
        }
        let len = self.buffer.len_chars();
        self.buffer.remove(0..len);
        self.buffer.insert(0, text);
        self.revision += 1;
        true
    }

    /// Write the buffer to disk and mark it clean
    pub fn save(&mut self) -> Result<(), std::io::Error> {
        std::fs::write(&self.path, self.buffer.to_string())?;
        self.saved_revision = self.revision;
        tracing::info!("Saved {}", self.path.display());
        Ok(())
    }

    /// Re-read the file from disk. Returns whether the buffer changed.
    pub fn reload(&mut self) -> Result<bool, std::io::Error> {
        let content = std::fs::read_to_string(&self.path)?;
        let changed = self.replace_all(&content);
        self.saved_revision = self.revision;
        Ok(changed)
    }
}

/// What a surface session is bound to
#[derive(Debug, Clone)]
pub enum Binding {
    /// A buffer the host owns and reports changes for
    Buffer(Document),
    /// Only a file reference; reads and writes go straight to disk
    RawFile(PathBuf),
}

impl Binding {
    pub fn path(&self) -> &Path {
        match self {
            Self::Buffer(doc) => &doc.path,
            Self::RawFile(path) => path,
        }
    }

    /// Current text of the bound target
    pub fn text(&self) -> Result<String, std::io::Error> {
        match self {
            Self::Buffer(doc) => Ok(doc.text()),
            Self::RawFile(path) => std::fs::read_to_string(path),
        }
    }

    pub fn document(&self) -> Option<&Document> {
        match self {
            Self::Buffer(doc) => Some(doc),
            Self::RawFile(_) => None,
        }
    }

    pub fn document_mut(&mut self) -> Option<&mut Document> {
        match self {
            Self::Buffer(doc) => Some(doc),
            Self::RawFile(_) => None,
        }
    }

    /// Raw file references are never dirty; they are written through
    pub fn is_dirty(&self) -> bool {
        self.document().is_some_and(Document::is_dirty)
    }

    /// True if both bindings refer to the same file
    pub fn same_target(&self, other: &Binding) -> bool {
        self.path() == other.path()
    }
}

/// Get the filename from a path for display in titles and messages
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_replace_all_bumps_revision() {
        let mut doc = Document::with_text("/tmp/a.md", "one\ntwo");
        assert_eq!(doc.line_count(), 2);
        assert!(doc.replace_all("three"));
        assert_eq!(doc.text(), "three");
        assert_eq!(doc.revision(), 1);
        assert!(doc.is_dirty());
    }

    #[test]
    fn test_replace_with_same_text_is_noop() {
        let mut doc = Document::with_text("/tmp/a.md", "same");
        assert!(!doc.replace_all("same"));
        assert_eq!(doc.revision(), 0);
        assert!(!doc.is_dirty());
    }

    #[test]
    fn test_save_clears_dirty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("note.md");
        std::fs::write(&path, "old").unwrap();

        let mut doc = Document::from_file(path.clone()).unwrap();
        doc.replace_all("new");
        doc.save().unwrap();

        assert!(!doc.is_dirty());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
    }

    #[test]
    fn test_reload_picks_up_disk_changes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("note.md");
        std::fs::write(&path, "v1").unwrap();

        let mut doc = Document::from_file(path.clone()).unwrap();
        std::fs::write(&path, "v2").unwrap();

        assert!(doc.reload().unwrap());
        assert_eq!(doc.text(), "v2");
        assert!(!doc.is_dirty());
        assert!(!doc.reload().unwrap());
    }

    #[test]
    fn test_raw_binding_reads_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("raw.md");
        std::fs::write(&path, "raw text").unwrap();

        let binding = Binding::RawFile(path);
        assert_eq!(binding.text().unwrap(), "raw text");
        assert!(!binding.is_dirty());
        assert!(binding.document().is_none());
    }
}
