//! Directory walking and object-name/path mapping

use crate::error::{Error, Result};
use std::path::{Component, Path, PathBuf};

/// A regular file found under a root
pub(crate) struct WalkedFile {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
}

/// Walk `root` on a blocking task, returning regular non-hidden files
pub(crate) async fn walk_files(root: &Path) -> Result<Vec<WalkedFile>> {
    let metadata = tokio::fs::metadata(root)
        .await
        .map_err(|e| Error::io(format!("reading {}", root.display()), e))?;
    if !metadata.is_dir() {
        return Err(Error::config(format!("{} is not a directory", root.display())));
    }

    let root = root.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let mut results = Vec::new();

        // Hidden entries are filtered below on the relative path; jwalk's own
        // check would also look at the root's name.
        for entry in jwalk::WalkDir::new(&root)
            .skip_hidden(false)
            .follow_links(false)
            .parallelism(jwalk::Parallelism::RayonNewPool(num_cpus::get()))
        {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!(error = %e, "Error walking directory");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let Ok(relative) = path.strip_prefix(&root) else {
                continue;
            };
            if is_hidden(relative) {
                continue;
            }
            let size = match entry.metadata() {
                Ok(m) => m.len(),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable file");
                    continue;
                }
            };

            results.push(WalkedFile {
                name: object_name(relative),
                path: path.clone(),
                size,
            });
        }

        results
    })
    .await
    .map_err(|e| Error::io("spawn_blocking", std::io::Error::other(e.to_string())))
}

fn is_hidden(relative: &Path) -> bool {
    relative
        .components()
        .any(|c| c.as_os_str().to_string_lossy().starts_with('.'))
}

/// Join path components with '/' regardless of platform
pub(crate) fn object_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Map an object name to a path under a root, rejecting names that escape it
pub(crate) fn relative_path(name: &str) -> Result<PathBuf> {
    let invalid = |reason: &str| Error::InvalidUri {
        uri: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("empty object name"));
    }

    let mut path = PathBuf::new();
    for part in name.split('/') {
        if part.is_empty() {
            return Err(invalid("empty path segment"));
        }
        let mut components = Path::new(part).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => path.push(part),
            _ => return Err(invalid("object name escapes the target directory")),
        }
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_relative_path() {
        assert_eq!(
            relative_path("DCIM/Camera/a.jpg").unwrap(),
            PathBuf::from("DCIM").join("Camera").join("a.jpg")
        );
        assert!(relative_path("").is_err());
        assert!(relative_path("/etc/passwd").is_err());
        assert!(relative_path("a/../../b").is_err());
        assert!(relative_path("./a").is_err());
        assert!(relative_path("a//b").is_err());
    }

    #[test]
    fn test_object_name() {
        let relative = PathBuf::from("DCIM").join("a.jpg");
        assert_eq!(object_name(&relative), "DCIM/a.jpg");
    }

    #[tokio::test]
    async fn test_walk_skips_hidden_and_dirs() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("a/.cache")).unwrap();
        std::fs::write(tmp.path().join("a/x.txt"), b"xx").unwrap();
        std::fs::write(tmp.path().join("a/.cache/y.txt"), b"y").unwrap();
        std::fs::write(tmp.path().join(".z.partial"), b"z").unwrap();

        let files = walk_files(tmp.path()).await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "a/x.txt");
        assert_eq!(files[0].size, 2);
    }
}
