//! Sync engine and orchestration

pub mod diff;
pub mod execute;

pub use diff::{compute, compute_restore, Diff, RestorePlan};
pub use execute::{run_to_end, ProgressStream, SyncExecutor};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::progress::ProgressTracker;
use crate::retry::{with_retry, RetryConfig};
use crate::source::{ContentSource, SourceKind};
use crate::storage::ObjectStore;
use crate::types::{SyncDirection, SyncStats, TransferProgress};
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// The main backup engine
///
/// Lists both sides, computes the diff and drives the executor, applying
/// the configured retry policy around the whole sequence.
pub struct BackupEngine {
    /// Configuration
    config: Config,
    /// Local content source
    source: ContentSource,
    /// Destination bucket
    store: ObjectStore,
    /// Stops the running transfer between items
    cancel: CancellationToken,
}

impl BackupEngine {
    /// Create a new engine
    pub fn new(config: Config, source: ContentSource, store: ObjectStore) -> Self {
        Self {
            config,
            source,
            store,
            cancel: CancellationToken::new(),
        }
    }

    /// Resolve source and store from configuration
    pub async fn from_config(mut config: Config) -> Result<Self> {
        config.validate()?;
        config.bucket.apply_env();
        let source = ContentSource::new(config.source.kind, config.source.root.clone());
        let store = ObjectStore::from_config(&config.bucket).await?;
        Ok(Self::new(config, source, store))
    }

    /// Token that cancels the current run between items
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn store(&self) -> &ObjectStore {
        &self.store
    }

    /// List both sides and compute the upload diff
    pub async fn plan(&self) -> Result<Diff> {
        tracing::info!(source = self.source.name(), "Scanning local content...");
        let locals = self.source.list(&self.config.source.collections).await?;

        tracing::info!(bucket = self.store.bucket(), "Listing bucket...");
        let remotes = self.store.list().await?;

        tracing::info!(
            local_items = locals.len(),
            remote_objects = remotes.len(),
            "Scan complete"
        );

        Ok(compute(locals, remotes))
    }

    /// Run a backup, re-running from scratch on retryable failures
    pub async fn sync(&self) -> Result<SyncStats> {
        let retry = RetryConfig::from(&self.config);
        with_retry(&retry, || self.sync_once()).await
    }

    async fn sync_once(&self) -> Result<SyncStats> {
        let start = std::time::Instant::now();
        let diff = self.plan().await?;

        let mut stats = SyncStats {
            local_items: diff.locals.len() as u64,
            remote_objects: diff.remotes.len() as u64,
            items_skipped: diff.skipped() as u64,
            bytes_total: diff.total_bytes,
            ..Default::default()
        };

        if self.config.dry_run {
            crate::progress::print_plan(&diff);
            stats.duration_secs = start.elapsed().as_secs_f64();
            return Ok(stats);
        }

        let executor = self.executor();
        let total_items = diff.to_transfer.len() as u64;
        let last = self
            .drain(SyncDirection::Upload, executor.run(diff), total_items, stats.bytes_total)
            .await?;

        stats.items_transferred = last.items_transferred;
        stats.bytes_transferred = last.bytes_transferred;
        stats.duration_secs = start.elapsed().as_secs_f64();

        tracing::info!(
            items = stats.items_transferred,
            bytes = stats.bytes_transferred,
            skipped = stats.items_skipped,
            duration_secs = stats.duration_secs,
            "Backup complete"
        );
        Ok(stats)
    }

    /// Download objects missing from `dest` (or of differing size)
    pub async fn restore(&self, dest: &Path) -> Result<SyncStats> {
        let start = std::time::Instant::now();

        tokio::fs::create_dir_all(dest)
            .await
            .map_err(|e| Error::io("creating restore target", e))?;

        let remotes = self.store.list().await?;
        let target = ContentSource::new(SourceKind::Document, dest.to_path_buf());
        let locals = target.list(&[]).await?;
        let plan = compute_restore(remotes, locals);

        let mut stats = SyncStats {
            local_items: plan.locals.len() as u64,
            remote_objects: plan.remotes.len() as u64,
            items_skipped: plan.skipped() as u64,
            bytes_total: plan.total_bytes,
            ..Default::default()
        };

        if self.config.dry_run {
            crate::progress::print_restore_plan(&plan);
            stats.duration_secs = start.elapsed().as_secs_f64();
            return Ok(stats);
        }

        let total_items = plan.to_fetch.len() as u64;
        let stream = self.executor().restore(plan, dest.to_path_buf());
        let last = self
            .drain(SyncDirection::Download, stream, total_items, stats.bytes_total)
            .await?;

        stats.items_transferred = last.items_transferred;
        stats.bytes_transferred = last.bytes_transferred;
        stats.duration_secs = start.elapsed().as_secs_f64();

        tracing::info!(
            items = stats.items_transferred,
            bytes = stats.bytes_transferred,
            dest = %dest.display(),
            "Restore complete"
        );
        Ok(stats)
    }

    fn executor(&self) -> SyncExecutor {
        SyncExecutor::new(self.source.clone(), self.store.clone())
            .with_jobs(self.config.effective_jobs())
            .with_cancellation(self.cancel.clone())
    }

    async fn drain(
        &self,
        direction: SyncDirection,
        stream: ProgressStream,
        total_items: u64,
        total_bytes: u64,
    ) -> Result<TransferProgress> {
        // Bars only exist while a transfer is draining
        let mut progress = ProgressTracker::new(self.config.progress);
        progress.start(total_items, total_bytes);

        let result = run_to_end(stream, |snapshot| {
            tracing::debug!(
                ?direction,
                items = snapshot.items_transferred,
                bytes = snapshot.bytes_transferred,
                percentage = snapshot.percentage,
                "Progress"
            );
            progress.update(snapshot);
        })
        .await;

        match &result {
            Ok(_) => progress.finish(),
            Err(_) => progress.abandon(),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn engine(source: &TempDir, bucket: &TempDir, dry_run: bool) -> BackupEngine {
        let mut config = Config::default();
        config.dry_run = dry_run;
        config.progress = true;
        BackupEngine::new(
            config,
            ContentSource::new(SourceKind::Document, source.path().to_path_buf()),
            ObjectStore::local(bucket.path().to_path_buf(), "bucket".to_string()),
        )
    }

    #[tokio::test]
    async fn test_plan_and_dry_run_leave_store_untouched() {
        let source = TempDir::new().unwrap();
        let bucket = TempDir::new().unwrap();
        fs::write(source.path().join("a.jpg"), b"abc").unwrap();

        let engine = engine(&source, &bucket, true);
        engine.store().create_bucket("bucket").await.unwrap();

        let diff = engine.plan().await.unwrap();
        assert_eq!(diff.to_transfer.len(), 1);

        let stats = engine.sync().await.unwrap();
        assert_eq!(stats.items_transferred, 0);
        assert_eq!(stats.bytes_total, 3);
        assert!(engine.store().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_repeated_syncs_with_progress_enabled() {
        let source = TempDir::new().unwrap();
        let bucket = TempDir::new().unwrap();
        fs::write(source.path().join("a.jpg"), b"abc").unwrap();

        let engine = engine(&source, &bucket, false);
        engine.store().create_bucket("bucket").await.unwrap();

        let first = engine.sync().await.unwrap();
        assert_eq!(first.items_transferred, 1);

        fs::write(source.path().join("b.jpg"), b"defg").unwrap();
        let second = engine.sync().await.unwrap();
        assert_eq!(second.items_transferred, 1);
        assert_eq!(second.bytes_transferred, 4);
        assert_eq!(second.items_skipped, 1);
    }
}
