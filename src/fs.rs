//! File-system collaborator supplying document contents.
//!
//! The engine never reads files directly: the embedding editor owns file
//! access, so document text comes through this trait. The OS-backed default
//! keeps the common case zero-setup while tests and embedders substitute
//! their own provider.

use std::io;
use std::path::Path;

/// Source of document text for `textDocument/didOpen`.
pub trait FileProvider {
    /// Full contents of the file at `path`.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;
}

/// Default provider backed by the real file system.
#[derive(Debug, Default)]
pub struct OsFileSystem;

impl FileProvider for OsFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}
