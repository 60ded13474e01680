//! Media library source: images and videos under a root

use super::{guess_content_type, item_from};
use crate::walk::walk_files;
use crate::error::Result;
use crate::types::ContentItem;
use std::path::PathBuf;

/// Media library source, listing image and video files only
#[derive(Debug, Clone)]
pub struct MediaStoreSource {
    root: PathBuf,
}

impl MediaStoreSource {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// List media items under the root
    pub async fn list(&self) -> Result<Vec<ContentItem>> {
        let files = walk_files(&self.root).await?;

        let items = files
            .into_iter()
            .filter_map(|file| {
                let mime = guess_content_type(&file.path);
                if is_media(&mime) {
                    Some(item_from(file, &mime))
                } else {
                    tracing::trace!(name = %file.name, mime = %mime, "Skipping non-media file");
                    None
                }
            })
            .collect();

        Ok(items)
    }
}

fn is_media(mime: &mime_guess::Mime) -> bool {
    let top = mime.type_();
    top == mime_guess::mime::IMAGE || top == mime_guess::mime::VIDEO
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_lists_only_media() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("DCIM")).unwrap();
        fs::write(tmp.path().join("DCIM/a.jpg"), b"jpeg").unwrap();
        fs::write(tmp.path().join("DCIM/b.mp4"), b"video").unwrap();
        fs::write(tmp.path().join("DCIM/notes.txt"), b"text").unwrap();

        let source = MediaStoreSource::new(tmp.path().to_path_buf());
        let mut items = source.list().await.unwrap();
        items.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "DCIM/a.jpg");
        assert_eq!(items[0].content_type, "image/jpeg");
        assert_eq!(items[1].name, "DCIM/b.mp4");
        assert_eq!(items[1].content_type, "video/mp4");
    }
}
