//! File I/O primitives with consistent error handling.

use crate::error::{Error, Result};
use std::fs;
use std::path::Path;

/// Read file contents with standardized error handling.
pub fn read_file(path: &Path, operation: &str) -> Result<String> {
    fs::read_to_string(path)
        .map_err(|e| Error::internal_io(e.to_string(), Some(operation.to_string())))
}

/// Write content to file with standardized error handling.
pub fn write_file(path: &Path, content: &str, operation: &str) -> Result<()> {
    fs::write(path, content)
        .map_err(|e| Error::internal_io(e.to_string(), Some(operation.to_string())))
}

/// Create a directory (and parents) if it does not already exist.
pub fn ensure_dir(dir: &Path, operation: &str) -> Result<()> {
    fs::create_dir_all(dir)
        .map_err(|e| Error::internal_io(e.to_string(), Some(operation.to_string())))
}

/// Delete a file, treating "already gone" as success.
pub fn remove_file_if_exists(path: &Path, operation: &str) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::internal_io(e.to_string(), Some(operation.to_string()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn read_file_succeeds_for_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "test content").unwrap();

        let content = read_file(&path, "test read").unwrap();
        assert_eq!(content, "test content");
    }

    #[test]
    fn read_file_returns_error_for_missing_file() {
        let result = read_file(Path::new("/nonexistent/path.txt"), "test read");
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().code.as_str(), "internal.io_error");
    }

    #[test]
    fn ensure_dir_creates_nested_directories() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        ensure_dir(&nested, "test mkdir").unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn remove_file_if_exists_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gone.txt");
        fs::write(&path, "x").unwrap();

        remove_file_if_exists(&path, "test rm").unwrap();
        assert!(!path.exists());
        remove_file_if_exists(&path, "test rm").unwrap();
    }
}
