use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{
    error::AppResult,
    models::{Movie, MovieId},
    services::catalog::CatalogProvider,
};

/// Queue length below which a pop triggers replenishment
pub const LOW_WATER_MARK: usize = 5;
/// Queue length `ensure_stocked` fills up to
pub const TARGET_SIZE: usize = 10;
/// Random batches fetched per `ensure_stocked` call before giving up on the target
const MAX_BATCHES_PER_STOCK: usize = 3;

#[derive(Debug, Clone, Copy)]
pub struct BufferConfig {
    pub low_water_mark: usize,
    pub target_size: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            low_water_mark: LOW_WATER_MARK,
            target_size: TARGET_SIZE,
        }
    }
}

/// What the card stack should show for the buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BufferStatus {
    Ready,
    Loading,
    Empty,
    /// Last replenishment failed; the message backs the retry prompt
    Failed(String),
}

struct BufferInner {
    queue: VecDeque<Movie>,
    loading: bool,
    error: Option<String>,
    closed: bool,
}

/// Prefetching queue of candidate movies
///
/// The front of the queue is the visible top card. Identifiers are unique
/// within the queue and at most one catalog fetch runs at a time. Clones share
/// the same queue.
#[derive(Clone)]
pub struct CardBuffer {
    catalog: Arc<dyn CatalogProvider>,
    inner: Arc<Mutex<BufferInner>>,
    config: BufferConfig,
}

/// Clears the loading flag even when the fetch future is dropped mid-flight
struct LoadingGuard<'a> {
    inner: &'a Mutex<BufferInner>,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .loading = false;
    }
}

impl CardBuffer {
    pub fn new(catalog: Arc<dyn CatalogProvider>) -> Self {
        Self::with_config(catalog, BufferConfig::default())
    }

    pub fn with_config(catalog: Arc<dyn CatalogProvider>, config: BufferConfig) -> Self {
        Self {
            catalog,
            inner: Arc::new(Mutex::new(BufferInner {
                queue: VecDeque::new(),
                loading: false,
                error: None,
                closed: false,
            })),
            config,
        }
    }

    fn state(&self) -> MutexGuard<'_, BufferInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Tops the queue up to the target size
    ///
    /// Returns how many movies were appended. A call made while another fetch
    /// is in flight, or while the queue is already full, appends nothing. On
    /// failure the queue is untouched and the error is kept for `status`.
    pub async fn ensure_stocked(&self) -> AppResult<usize> {
        {
            let mut state = self.state();
            if state.closed || state.loading || state.queue.len() >= self.config.target_size {
                return Ok(0);
            }
            state.loading = true;
            state.error = None;
        }
        let _guard = LoadingGuard { inner: &self.inner };

        let mut appended = 0;
        for _ in 0..MAX_BATCHES_PER_STOCK {
            let batch = match self.catalog.fetch_random_batch().await {
                Ok(batch) => batch,
                Err(e) => {
                    tracing::warn!(error = %e, "Card buffer replenishment failed");
                    let mut state = self.state();
                    if !state.closed {
                        state.error = Some(e.to_string());
                    }
                    return Err(e);
                }
            };

            let mut state = self.state();
            if state.closed {
                tracing::debug!(dropped = batch.len(), "Buffer closed, ignoring late batch");
                return Ok(appended);
            }

            let added = merge_unique(&mut state.queue, batch);
            appended += added;

            tracing::debug!(
                added = added,
                queued = state.queue.len(),
                provider = self.catalog.name(),
                "Card buffer merged batch"
            );

            if added == 0 || state.queue.len() >= self.config.target_size {
                break;
            }
        }

        Ok(appended)
    }

    /// Removes and returns the top card
    ///
    /// When the remaining queue drops below the low-water mark a replenishment
    /// is spawned in the background; the pop itself never waits for it.
    pub fn pop_front(&self) -> Option<Movie> {
        let (movie, remaining) = {
            let mut state = self.state();
            let movie = state.queue.pop_front();
            (movie, state.queue.len())
        };

        if remaining < self.config.low_water_mark {
            self.restock_in_background();
        }

        movie
    }

    /// Fire-and-forget `ensure_stocked`; a no-op outside a Tokio runtime
    pub fn restock_in_background(&self) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No runtime available for background restock");
            return;
        };

        let buffer = self.clone();
        handle.spawn(async move {
            if let Err(e) = buffer.ensure_stocked().await {
                tracing::debug!(error = %e, "Background restock failed");
            }
        });
    }

    /// Clears a failed state and tries again
    pub async fn retry(&self) -> AppResult<usize> {
        self.state().error = None;
        self.ensure_stocked().await
    }

    /// Marks the consumer as torn down; fetches completing afterwards are ignored
    pub fn close(&self) {
        self.state().closed = true;
    }

    /// Clones of the first `n` queued movies
    pub fn peek(&self, n: usize) -> Vec<Movie> {
        self.state().queue.iter().take(n).cloned().collect()
    }

    pub fn front(&self) -> Option<Movie> {
        self.state().queue.front().cloned()
    }

    pub fn ids(&self) -> Vec<MovieId> {
        self.state().queue.iter().map(|m| m.id).collect()
    }

    pub fn len(&self) -> usize {
        self.state().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().queue.is_empty()
    }

    pub fn is_loading(&self) -> bool {
        self.state().loading
    }

    pub fn error(&self) -> Option<String> {
        self.state().error.clone()
    }

    pub fn status(&self) -> BufferStatus {
        let state = self.state();
        if let Some(error) = &state.error {
            BufferStatus::Failed(error.clone())
        } else if !state.queue.is_empty() {
            BufferStatus::Ready
        } else if state.loading {
            BufferStatus::Loading
        } else {
            BufferStatus::Empty
        }
    }
}

/// Appends movies whose id is not already queued, keeping arrival order
fn merge_unique(queue: &mut VecDeque<Movie>, batch: Vec<Movie>) -> usize {
    let mut seen: HashSet<MovieId> = queue.iter().map(|m| m.id).collect();
    let before = queue.len();
    for movie in batch {
        if seen.insert(movie.id) {
            queue.push_back(movie);
        }
    }
    queue.len() - before
}
