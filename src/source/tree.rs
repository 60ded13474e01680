//! Document tree source: every regular file under a root

use super::{guess_content_type, item_from};
use crate::walk::walk_files;
use crate::error::Result;
use crate::types::ContentItem;
use std::path::PathBuf;

/// Document tree source
#[derive(Debug, Clone)]
pub struct DocumentTreeSource {
    root: PathBuf,
}

impl DocumentTreeSource {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// List all files under the root
    pub async fn list(&self) -> Result<Vec<ContentItem>> {
        let files = walk_files(&self.root).await?;

        Ok(files
            .into_iter()
            .map(|file| {
                let mime = guess_content_type(&file.path);
                item_from(file, &mime)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_lists_all_files() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("Documents/2024")).unwrap();
        fs::write(tmp.path().join("Documents/2024/report.pdf"), b"%PDF").unwrap();
        fs::write(tmp.path().join("Documents/raw.bin"), b"\x00\x01").unwrap();

        let source = DocumentTreeSource::new(tmp.path().to_path_buf());
        let mut items = source.list().await.unwrap();
        items.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "Documents/2024/report.pdf");
        assert_eq!(items[0].content_type, "application/pdf");
        assert_eq!(items[0].size, 4);
        assert_eq!(items[1].name, "Documents/raw.bin");
        assert_eq!(items[1].content_type, "application/octet-stream");
    }
}
