//! Contextual text-selection state machine
//!
//! One [`SelectionStore`] per process holds the current [`SelectionState`].
//! Every mutation goes through the named transitions below and replaces the
//! whole value on a `watch` channel:
//!
//! ```text
//!                 set_selection + show_query_affordance
//!   Empty ───────────────────────────────────────────▶ AffordanceVisible
//!     ▲                                                      │
//!     │ clear_selection                        open_chat(seed)│
//!     │                                                      ▼
//!     └──────────────── close_chat + clear ─────────────  ChatOpen
//! ```
//!
//! `chat_open` and `query_affordance_visible` are never both true: opening the
//! chat hides the affordance, and showing the affordance is refused while the
//! chat is open.

use std::sync::Arc;
use tokio::sync::watch;

pub mod debounce;
pub mod tracker;

pub use debounce::Coalescer;
pub use tracker::{InteractionTarget, RegionId, SelectionEvent, SelectionTracker};

/// Shared selection / query / chat state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    pub selected_text: String,
    /// Context sent with follow-up questions about the selection
    pub full_context: String,
    pub query_affordance_visible: bool,
    pub chat_open: bool,
    /// First question of the chat, asked from the query affordance
    pub seed_question: String,
}

impl SelectionState {
    pub fn has_selection(&self) -> bool {
        !self.selected_text.is_empty()
    }
}

/// Presentation-layer hook for side effects outside the state value
///
/// The live highlight belongs to whoever renders the text; clearing the
/// selection asks it to drop that highlight.
pub trait SelectionHost: Send + Sync {
    fn drop_highlight(&self);
}

/// Host with nothing to clear
#[cfg(test)]
#[derive(Debug, Default)]
pub struct NoHighlight;

#[cfg(test)]
impl SelectionHost for NoHighlight {
    fn drop_highlight(&self) {}
}

pub struct SelectionStore {
    state: watch::Sender<SelectionState>,
    host: Arc<dyn SelectionHost>,
}

impl SelectionStore {
    pub fn new(host: Arc<dyn SelectionHost>) -> Self {
        let (state, _) = watch::channel(SelectionState::default());
        Self { state, host }
    }

    #[cfg(test)]
    pub fn subscribe(&self) -> watch::Receiver<SelectionState> {
        self.state.subscribe()
    }

    /// Latest state (cloned)
    pub fn snapshot(&self) -> SelectionState {
        self.state.borrow().clone()
    }

    /// Compute the next whole value from the current one and publish it
    fn transition(&self, name: &'static str, next: impl FnOnce(&SelectionState) -> SelectionState) {
        self.state.send_if_modified(|current| {
            let replacement = next(current);
            if replacement == *current {
                return false;
            }
            tracing::debug!(
                transition = name,
                affordance = replacement.query_affordance_visible,
                chat = replacement.chat_open,
                chars = replacement.selected_text.len(),
                "Selection state changed"
            );
            *current = replacement;
            true
        });
    }

    /// Record selection and context; visibility unchanged
    pub fn set_selection(&self, text: impl Into<String>, context: impl Into<String>) {
        let (text, context) = (text.into(), context.into());
        self.transition("set_selection", |s| SelectionState {
            selected_text: text,
            full_context: context,
            ..s.clone()
        });
    }

    /// Show the inline query affordance
    ///
    /// No-op when already visible or while the chat is open.
    pub fn show_query_affordance(&self) {
        self.transition("show_query_affordance", |s| SelectionState {
            query_affordance_visible: !s.chat_open,
            ..s.clone()
        });
    }

    pub fn hide_query_affordance(&self) {
        self.transition("hide_query_affordance", |s| SelectionState {
            query_affordance_visible: false,
            ..s.clone()
        });
    }

    /// Open the chat with its seed question, closing the affordance
    pub fn open_chat(&self, seed_question: impl Into<String>) {
        let seed_question = seed_question.into();
        self.transition("open_chat", |s| SelectionState {
            chat_open: true,
            query_affordance_visible: false,
            seed_question,
            ..s.clone()
        });
    }

    pub fn close_chat(&self) {
        self.transition("close_chat", |s| SelectionState {
            chat_open: false,
            seed_question: String::new(),
            ..s.clone()
        });
    }

    /// Reset everything and drop the live highlight
    pub fn clear_selection(&self) {
        self.transition("clear_selection", |_| SelectionState::default());
        self.host.drop_highlight();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingHost(AtomicUsize);

    impl SelectionHost for CountingHost {
        fn drop_highlight(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn store() -> (SelectionStore, Arc<CountingHost>) {
        let host = Arc::new(CountingHost::default());
        (SelectionStore::new(host.clone()), host)
    }

    fn assert_exclusive(state: &SelectionState) {
        assert!(!(state.chat_open && state.query_affordance_visible));
    }

    #[test]
    fn test_set_selection_does_not_change_visibility() {
        let (store, _) = store();
        store.set_selection("RSI 70", "4H Analysis: ...");
        let state = store.snapshot();
        assert_eq!(state.selected_text, "RSI 70");
        assert!(!state.query_affordance_visible);
        assert!(!state.chat_open);
    }

    #[test]
    fn test_open_chat_closes_affordance() {
        let (store, _) = store();
        store.set_selection("stop at 41k", "ctx");
        store.show_query_affordance();
        assert!(store.snapshot().query_affordance_visible);

        store.open_chat("Why 41k?");
        let state = store.snapshot();
        assert!(state.chat_open);
        assert!(!state.query_affordance_visible);
        assert_eq!(state.seed_question, "Why 41k?");
        assert_eq!(state.selected_text, "stop at 41k");
    }

    #[test]
    fn test_affordance_refused_while_chat_open() {
        let (store, _) = store();
        store.open_chat("seed");
        store.show_query_affordance();
        assert_exclusive(&store.snapshot());
        assert!(!store.snapshot().query_affordance_visible);
    }

    #[test]
    fn test_close_chat_clears_seed_only() {
        let (store, _) = store();
        store.set_selection("text", "ctx");
        store.open_chat("seed");
        store.close_chat();
        let state = store.snapshot();
        assert!(!state.chat_open);
        assert!(state.seed_question.is_empty());
        assert_eq!(state.selected_text, "text");
    }

    #[test]
    fn test_clear_selection_is_idempotent() {
        let (store, host) = store();
        store.set_selection("text", "ctx");
        store.show_query_affordance();

        store.clear_selection();
        let once = store.snapshot();
        store.clear_selection();
        let twice = store.snapshot();

        assert_eq!(once, SelectionState::default());
        assert_eq!(once, twice);
        assert_eq!(host.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_exclusion_holds_across_sequences() {
        let (store, _) = store();
        let ops: [fn(&SelectionStore); 6] = [
            |s| s.set_selection("a", "b"),
            |s| s.show_query_affordance(),
            |s| s.open_chat("q"),
            |s| s.hide_query_affordance(),
            |s| s.close_chat(),
            |s| s.clear_selection(),
        ];
        // Every ordered pair and triple of transitions
        for a in &ops {
            for b in &ops {
                for c in &ops {
                    store.clear_selection();
                    a(&store);
                    assert_exclusive(&store.snapshot());
                    b(&store);
                    assert_exclusive(&store.snapshot());
                    c(&store);
                    assert_exclusive(&store.snapshot());
                }
            }
        }
    }

    #[test]
    fn test_observers_see_whole_values() {
        let (store, _) = store();
        let mut rx = store.subscribe();
        store.set_selection("x", "ctx");
        store.show_query_affordance();
        assert!(rx.has_changed().unwrap());
        let seen = rx.borrow_and_update().clone();
        assert_eq!(seen.selected_text, "x");
        assert!(seen.query_affordance_visible);
    }
}
