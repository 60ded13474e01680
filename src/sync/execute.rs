//! Transfer execution
//!
//! Items are transferred in plan order and a [`TransferProgress`] snapshot is
//! yielded after each one completes. The first failure ends the stream; the
//! cancellation token is checked before each item starts.

use super::diff::{Diff, RestorePlan};
use crate::error::{Error, Result};
use crate::source::ContentSource;
use crate::storage::{local::write_file, ObjectStore};
use crate::types::{ContentItem, RemoteObject, TransferProgress};
use crate::walk::relative_path;
use futures::future::{self, Future};
use futures::stream::{self, Stream, StreamExt};
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Lazy sequence of progress snapshots, ending after the last item or the first error
pub type ProgressStream = Pin<Box<dyn Stream<Item = Result<TransferProgress>> + Send>>;

/// Drives uploads and downloads between a content source and an object store
#[derive(Clone)]
pub struct SyncExecutor {
    source: ContentSource,
    store: ObjectStore,
    jobs: usize,
    cancel: CancellationToken,
}

impl SyncExecutor {
    /// Create a sequential executor
    pub fn new(source: ContentSource, store: ObjectStore) -> Self {
        Self {
            source,
            store,
            jobs: 1,
            cancel: CancellationToken::new(),
        }
    }

    /// Allow up to `jobs` items in flight (0 is treated as 1)
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Use an externally owned cancellation token
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that stops runs of this executor between items
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Upload every item in `diff.to_transfer`
    pub fn run(&self, diff: Diff) -> ProgressStream {
        let source = self.source.clone();
        let store = self.store.clone();

        tracing::info!(
            items = diff.to_transfer.len(),
            bytes = diff.total_bytes,
            store = store.name(),
            bucket = store.bucket(),
            "Starting upload"
        );

        drive(
            diff.to_transfer,
            diff.total_bytes,
            self.jobs,
            self.cancel.clone(),
            move |item| upload_item(source.clone(), store.clone(), item),
        )
    }

    /// Download every object in `plan.to_fetch` into `dest_root`
    pub fn restore(&self, plan: RestorePlan, dest_root: PathBuf) -> ProgressStream {
        let store = self.store.clone();
        let dest_root = Arc::new(dest_root);

        tracing::info!(
            objects = plan.to_fetch.len(),
            bytes = plan.total_bytes,
            dest = %dest_root.display(),
            "Starting restore"
        );

        drive(
            plan.to_fetch,
            plan.total_bytes,
            self.jobs,
            self.cancel.clone(),
            move |object| download_object(store.clone(), dest_root.clone(), object),
        )
    }
}

/// Drain a progress stream, returning the last snapshot or the first error
pub async fn run_to_end<F>(mut stream: ProgressStream, mut on_progress: F) -> Result<TransferProgress>
where
    F: FnMut(&TransferProgress),
{
    let mut last = TransferProgress::default();
    while let Some(progress) = stream.next().await {
        last = progress?;
        on_progress(&last);
    }
    Ok(last)
}

fn drive<T, F, Fut>(
    items: Vec<T>,
    total_bytes: u64,
    jobs: usize,
    cancel: CancellationToken,
    transfer: F,
) -> ProgressStream
where
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + 'static,
    Fut: Future<Output = Result<u64>> + Send + 'static,
{
    if items.is_empty() {
        return Box::pin(stream::once(future::ready(Ok(TransferProgress::default()))));
    }

    let counter = ProgressCounter::new(items.len() as u64, total_bytes);

    // `buffered` starts at most `jobs` transfers and yields them in input
    // order, so snapshots stay cumulative even with several items in flight.
    let transfers = stream::iter(items)
        .map(move |item| {
            let cancel = cancel.clone();
            let transfer = transfer(item);
            async move {
                if cancel.is_cancelled() {
                    tracing::info!("Run cancelled");
                    return Err(Error::Cancelled);
                }
                transfer.await
            }
        })
        .buffered(jobs.max(1));

    let state = RunState {
        transfers: Box::pin(transfers),
        counter,
        halted: false,
    };

    // The halted check must come before pulling again: pulling would start
    // the next transfer.
    let progress = stream::unfold(state, |mut state| async move {
        if state.halted {
            return None;
        }
        let next = match state.transfers.next().await? {
            Ok(bytes) => Ok(state.counter.record(bytes)),
            Err(e) => {
                state.halted = true;
                Err(e)
            }
        };
        Some((next, state))
    });

    Box::pin(progress)
}

async fn upload_item(source: ContentSource, store: ObjectStore, item: ContentItem) -> Result<u64> {
    let result = async {
        let stream = source.open(&item.handle).await?;
        store.put(&item.name, stream, item.size).await
    }
    .await;

    match result {
        Ok(bytes) => {
            tracing::debug!(name = %item.name, size = bytes, content_type = %item.content_type, "Uploaded");
            Ok(bytes)
        }
        Err(e) => {
            tracing::error!(name = %item.name, error = %e, "Upload failed");
            Err(Error::transfer(item.name, e))
        }
    }
}

async fn download_object(
    store: ObjectStore,
    dest_root: Arc<PathBuf>,
    object: RemoteObject,
) -> Result<u64> {
    let result = async {
        let path = dest_root.join(relative_path(&object.name)?);
        let stream = store.get(&object.name).await?;
        write_file(&path, &object.name, stream, object.size).await
    }
    .await;

    match result {
        Ok(bytes) => {
            tracing::debug!(name = %object.name, size = bytes, "Downloaded");
            Ok(bytes)
        }
        Err(e) => {
            tracing::error!(name = %object.name, error = %e, "Download failed");
            Err(Error::transfer(object.name, e))
        }
    }
}

struct RunState {
    transfers: Pin<Box<dyn Stream<Item = Result<u64>> + Send>>,
    counter: ProgressCounter,
    halted: bool,
}

/// Running counters owned by a single run
struct ProgressCounter {
    total_items: u64,
    total_bytes: u64,
    items: u64,
    bytes: u64,
}

impl ProgressCounter {
    fn new(total_items: u64, total_bytes: u64) -> Self {
        Self {
            total_items,
            total_bytes,
            items: 0,
            bytes: 0,
        }
    }

    fn record(&mut self, bytes: u64) -> TransferProgress {
        self.items += 1;
        self.bytes += bytes;

        let percentage = if self.items >= self.total_items {
            1.0
        } else if self.total_bytes > 0 {
            (self.bytes as f64 / self.total_bytes as f64).min(1.0)
        } else {
            self.items as f64 / self.total_items as f64
        };

        TransferProgress {
            items_transferred: self.items,
            bytes_transferred: self.bytes,
            percentage,
        }
    }
}
