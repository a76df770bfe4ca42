use crate::core::Result;
use tokio::task::JoinHandle;

/// Handles for a batch of independently dispatched writes.
///
/// Dropping the dispatch detaches the writes; they keep running on the
/// runtime. Call [`BatchDispatch::join`] to observe each outcome instead.
#[must_use = "drop the dispatch explicitly to run the writes fire-and-forget"]
pub struct BatchDispatch<R> {
    handles: Vec<JoinHandle<Result<R>>>,
}

impl<R> BatchDispatch<R> {
    pub(crate) fn new(handles: Vec<JoinHandle<Result<R>>>) -> Self {
        Self { handles }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Waits for every write and returns their outcomes in dispatch order.
    pub async fn join(self) -> Vec<Result<R>> {
        let mut outcomes = Vec::with_capacity(self.handles.len());
        for handle in self.handles {
            outcomes.push(handle.await.unwrap_or_else(|err| Err(err.into())));
        }
        outcomes
    }
}
