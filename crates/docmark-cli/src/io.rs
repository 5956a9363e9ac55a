use relative_path::RelativePathBuf;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid document path {0}: {1}")]
    InvalidPath(PathBuf, relative_path::FromPathError),
}

/// Where a document named on the command line lives. Relative names are
/// taken from `content_dir` when one is configured.
pub fn resolve(path: &Path, content_dir: Option<&Path>) -> Result<PathBuf, IoError> {
    match content_dir {
        Some(root) if path.is_relative() => {
            let relative = RelativePathBuf::from_path(path)
                .map_err(|e| IoError::InvalidPath(path.to_path_buf(), e))?;
            Ok(relative.to_path(root))
        }
        _ => Ok(path.to_path_buf()),
    }
}

/// Read a document and return its markup
pub fn read_file(path: &Path) -> Result<String, IoError> {
    if !path.exists() {
        return Err(IoError::NotFound(path.to_path_buf()));
    }
    fs::read_to_string(path).map_err(IoError::Io)
}

/// Write markup to a document
pub fn write_file(path: &Path, content: &str) -> Result<(), IoError> {
    // Create parent directories if they don't exist
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(IoError::Io)?;
    }

    fs::write(path, content).map_err(IoError::Io)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_against_content_dir() {
        let root = Path::new("/srv/docs");

        assert_eq!(
            resolve(Path::new("guide/intro.md"), Some(root)).unwrap(),
            PathBuf::from("/srv/docs/guide/intro.md")
        );
        assert_eq!(
            resolve(Path::new("/abs/file.md"), Some(root)).unwrap(),
            PathBuf::from("/abs/file.md")
        );
        assert_eq!(
            resolve(Path::new("file.md"), None).unwrap(),
            PathBuf::from("file.md")
        );
    }

    #[test]
    fn test_read_file() {
        let temp_dir = TempDir::new().unwrap();
        let test_file = temp_dir.path().join("test.md");
        fs::write(&test_file, "# Test\n\nContent").unwrap();

        let content = read_file(&test_file).unwrap();
        assert_eq!(content, "# Test\n\nContent");
    }

    #[test]
    fn test_read_nonexistent_file() {
        let temp_dir = TempDir::new().unwrap();

        let result = read_file(&temp_dir.path().join("nonexistent.md"));
        assert!(matches!(result, Err(IoError::NotFound(_))));
    }

    #[test]
    fn test_write_file_in_subdirectory() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("folder/subfolder/new_file.md");

        write_file(&path, "# Nested\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "# Nested\n");
    }
}
