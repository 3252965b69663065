//! `file://` URI construction for document references.

use std::path::{Path, PathBuf};

use url::Url;

/// Convert a file path to a `file:///` URI with proper percent-encoding.
///
/// Relative paths are resolved against the current directory first. The
/// `url` crate handles encoding of spaces, non-ASCII characters, and other
/// reserved characters; a manual fallback covers the edge cases it rejects.
pub fn path_to_file_uri(path: &str) -> String {
    let abs_path = if Path::new(path).is_absolute() {
        PathBuf::from(path)
    } else {
        std::env::current_dir()
            .map(|p| p.join(path))
            .unwrap_or_else(|_| PathBuf::from(path))
    };

    match Url::from_file_path(&abs_path) {
        Ok(url) => url.to_string(),
        Err(_) => {
            // Manual percent-encoding for the characters that matter most.
            let path_str = abs_path.to_string_lossy();
            let encoded = path_str
                .replace('%', "%25") // must be first
                .replace(' ', "%20")
                .replace('#', "%23")
                .replace('?', "%3F")
                .replace('[', "%5B")
                .replace(']', "%5D");

            if cfg!(windows) {
                format!("file:///{}", encoded.replace('\\', "/"))
            } else {
                format!("file://{}", encoded)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_path() {
        let uri = path_to_file_uri("/home/user/lib.rs");
        assert!(uri.starts_with("file://"));
        assert!(uri.ends_with("lib.rs"));
    }

    #[test]
    fn test_relative_path_resolved() {
        let uri = path_to_file_uri("lib.rs");
        assert!(uri.starts_with("file://"));
        assert!(uri.ends_with("lib.rs"));
        assert!(uri.len() > "file://lib.rs".len(), "must be absolute");
    }

    #[test]
    fn test_spaces_percent_encoded() {
        let uri = path_to_file_uri("/home/user/my project/main.rs");
        assert!(!uri.contains(' '));
        assert!(uri.contains("%20"));
    }

    #[test]
    fn test_reserved_characters_encoded() {
        let uri = path_to_file_uri("/home/user/file#1.rs");
        assert!(uri.contains("%23"), "hash must be encoded: {}", uri);

        let uri = path_to_file_uri("/home/user/what?.rs");
        assert!(uri.contains("%3F"), "question mark must be encoded: {}", uri);
    }

    #[test]
    fn test_path_separators_preserved() {
        let uri = path_to_file_uri("/home/user/subdir/file.rs");
        assert!(uri.contains("/home/user/subdir/file.rs"));
    }
}
