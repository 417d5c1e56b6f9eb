//! Prompt ledger: the single owner of the rotation pointer.
//!
//! The pointer is loaded once at startup into a [`RotationState`] and every
//! read or write goes through [`PromptLedger::advance`] and
//! [`PromptLedger::peek_last`]. `advance` hands out the prompt at the pointer
//! and moves past it, so the prompt a reply is answering is always the one
//! *behind* the pointer.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::StoreError;
use crate::prompts::list::PromptList;
use crate::prompts::store::RotationStore;

/// In-memory view of the persisted pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RotationState {
    /// Index of the next prompt to hand out, always `< N`.
    pub index: usize,
    /// Whether any prompt has been handed out under this pointer.
    pub sent: bool,
}

impl RotationState {
    /// Interpret a stored pointer. Missing, corrupt, negative and
    /// out-of-range values all restart the rotation at 0.
    pub fn from_stored(stored: Result<Option<i64>, StoreError>, len: usize) -> Self {
        match stored {
            Ok(Some(index)) if index >= 0 && (index as usize) < len => Self {
                index: index as usize,
                sent: true,
            },
            Ok(Some(index)) => {
                warn!(index, len, "Stored rotation pointer out of range, resetting to 0");
                Self::default()
            }
            Ok(None) => Self::default(),
            Err(e) => {
                warn!(error = %e, "Rotation pointer unreadable, resetting to 0");
                Self::default()
            }
        }
    }
}

/// Rotation over a fixed prompt list with a persisted pointer.
pub struct PromptLedger {
    prompts: PromptList,
    store: Arc<dyn RotationStore>,
    state: Mutex<RotationState>,
}

impl PromptLedger {
    /// Load the pointer from `store`. Never fails: unusable state means 0.
    pub async fn load(prompts: PromptList, store: Arc<dyn RotationStore>) -> Self {
        let state = RotationState::from_stored(store.load().await, prompts.len());
        info!(
            pointer = state.index,
            prompts = prompts.len(),
            "Prompt ledger loaded"
        );
        Self {
            prompts,
            store,
            state: Mutex::new(state),
        }
    }

    /// Hand out the prompt at the pointer and advance past it.
    ///
    /// Returns the pre-advance prompt. The in-memory pointer always moves;
    /// a failure to persist it is logged, not returned.
    pub async fn advance(&self) -> String {
        let mut state = self.state.lock().await;
        let prompt = self.prompts.get(state.index).to_string();
        let next = (state.index + 1) % self.prompts.len();
        *state = RotationState {
            index: next,
            sent: true,
        };

        // Persist while still holding the lock so saves land in order.
        if let Err(e) = self.store.save(next).await {
            warn!(error = %e, pointer = next, "Failed to persist rotation pointer");
        }
        prompt
    }

    /// The prompt most recently handed out by [`advance`](Self::advance).
    ///
    /// Falls back to the first prompt when nothing has been sent yet.
    pub async fn peek_last(&self) -> String {
        let state = *self.state.lock().await;
        if !state.sent {
            return self.prompts.get(0).to_string();
        }
        let len = self.prompts.len();
        self.prompts.get((state.index + len - 1) % len).to_string()
    }

    /// Current pointer (index of the next prompt to send).
    pub async fn pointer(&self) -> usize {
        self.state.lock().await.index
    }

    pub fn prompts(&self) -> &PromptList {
        &self.prompts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompts::store::{FileRotationStore, MemoryRotationStore};

    fn abc() -> PromptList {
        PromptList::new(vec!["A".into(), "B".into(), "C".into()]).unwrap()
    }

    async fn fresh(prompts: PromptList) -> (PromptLedger, Arc<MemoryRotationStore>) {
        let store = Arc::new(MemoryRotationStore::new());
        let ledger = PromptLedger::load(prompts, store.clone()).await;
        (ledger, store)
    }

    #[tokio::test]
    async fn advance_then_reply_resolves_to_last_sent() {
        let (ledger, _) = fresh(abc()).await;

        assert_eq!(ledger.advance().await, "A");
        assert_eq!(ledger.pointer().await, 1);
        assert_eq!(ledger.advance().await, "B");
        assert_eq!(ledger.pointer().await, 2);

        assert_eq!(ledger.peek_last().await, "B");
    }

    #[tokio::test]
    async fn peek_last_matches_every_advance() {
        for n in 1..=5 {
            let prompts =
                PromptList::new((0..n).map(|i| format!("prompt-{i}")).collect()).unwrap();
            let (ledger, _) = fresh(prompts).await;
            for _ in 0..(3 * n) {
                let sent = ledger.advance().await;
                assert_eq!(ledger.peek_last().await, sent, "n = {n}");
            }
        }
    }

    #[tokio::test]
    async fn full_cycle_returns_list_in_order() {
        let prompts = abc();
        let (ledger, _) = fresh(prompts.clone()).await;
        let start = ledger.pointer().await;

        let mut sent = Vec::new();
        for _ in 0..prompts.len() {
            sent.push(ledger.advance().await);
        }

        assert_eq!(sent, prompts.iter().collect::<Vec<_>>());
        assert_eq!(ledger.pointer().await, start);
    }

    #[tokio::test]
    async fn single_prompt_list() {
        let prompts = PromptList::new(vec!["Only".into()]).unwrap();
        let (ledger, _) = fresh(prompts).await;
        assert_eq!(ledger.advance().await, "Only");
        assert_eq!(ledger.pointer().await, 0);
        assert_eq!(ledger.peek_last().await, "Only");
    }

    #[tokio::test]
    async fn peek_last_before_any_send_is_first_prompt() {
        let (ledger, _) = fresh(abc()).await;
        assert_eq!(ledger.peek_last().await, "A");
        assert_eq!(ledger.pointer().await, 0);
    }

    #[tokio::test]
    async fn peek_last_does_not_mutate() {
        let (ledger, store) = fresh(abc()).await;
        ledger.advance().await;
        let raw = store.raw().await;
        for _ in 0..3 {
            assert_eq!(ledger.peek_last().await, "A");
        }
        assert_eq!(ledger.pointer().await, 1);
        assert_eq!(store.raw().await, raw);
    }

    #[tokio::test]
    async fn advance_persists_pointer() {
        let (ledger, store) = fresh(abc()).await;
        ledger.advance().await;
        ledger.advance().await;
        assert_eq!(store.raw().await.as_deref(), Some(r#"{"index":2}"#));
    }

    #[tokio::test]
    async fn invalid_stored_data_starts_from_first_prompt() {
        let store = Arc::new(MemoryRotationStore::with_raw(r#"{"index": "two"}"#));
        let ledger = PromptLedger::load(abc(), store).await;
        assert_eq!(ledger.advance().await, "A");
    }

    #[tokio::test]
    async fn out_of_range_pointer_resets() {
        let store = Arc::new(MemoryRotationStore::with_raw(r#"{"index": 42}"#));
        let ledger = PromptLedger::load(abc(), store).await;
        assert_eq!(ledger.pointer().await, 0);
        assert_eq!(ledger.advance().await, "A");
    }

    #[tokio::test]
    async fn negative_pointer_resets() {
        let store = Arc::new(MemoryRotationStore::with_raw(r#"{"index": -1}"#));
        let ledger = PromptLedger::load(abc(), store).await;
        assert_eq!(ledger.advance().await, "A");
    }

    #[tokio::test]
    async fn persisted_pointer_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompt_state.json");

        let first = PromptLedger::load(abc(), Arc::new(FileRotationStore::new(&path))).await;
        assert_eq!(first.advance().await, "A");
        assert_eq!(first.advance().await, "B");
        drop(first);

        let second = PromptLedger::load(abc(), Arc::new(FileRotationStore::new(&path))).await;
        assert_eq!(second.peek_last().await, "B");
        assert_eq!(second.advance().await, "C");
        assert_eq!(second.advance().await, "A");
    }

    #[tokio::test]
    async fn wrapped_pointer_zero_resolves_to_last_prompt() {
        let store = Arc::new(MemoryRotationStore::with_raw(r#"{"index": 0}"#));
        let ledger = PromptLedger::load(abc(), store).await;
        assert_eq!(ledger.peek_last().await, "C");
    }

    #[tokio::test]
    async fn save_failure_does_not_fail_advance() {
        let store = Arc::new(MemoryRotationStore::failing());
        let ledger = PromptLedger::load(abc(), store).await;
        assert_eq!(ledger.advance().await, "A");
        assert_eq!(ledger.advance().await, "B");
        assert_eq!(ledger.peek_last().await, "B");
    }

    #[tokio::test]
    async fn concurrent_advances_hand_out_distinct_prompts() {
        let ledger = Arc::new(fresh(abc()).await.0);
        let mut handles = Vec::new();
        for _ in 0..3 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move { ledger.advance().await }));
        }
        let mut sent = Vec::new();
        for h in handles {
            sent.push(h.await.unwrap());
        }
        sent.sort();
        assert_eq!(sent, vec!["A", "B", "C"]);
    }
}
