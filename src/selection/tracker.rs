//! Selection tracker
//!
//! Observes raw selection-change notifications, coalesces them, and turns the
//! settled result into [`SelectionStore`] transitions.
//!
//! A selection is *live* while it originates in a registered region and its
//! trimmed text is non-empty:
//!
//! | settled selection            | effect                                       |
//! |------------------------------|----------------------------------------------|
//! | live, text changed           | `set_selection` then `show_query_affordance` |
//! | live, same text              | nothing                                      |
//! | not live                     | `hide_query_affordance` + `clear_selection`  |
//! | not live, chat open          | nothing                                      |
//! | not live, click on affordance or chat | nothing                             |

use super::{Coalescer, SelectionStore};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Identifier of a selectable region, assigned by the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionId(pub usize);

/// What the user interacted with when the selection changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionTarget {
    /// Rendered analysis output
    #[default]
    Content,
    /// The inline query affordance itself
    QueryAffordance,
    /// The chat surface
    ChatSurface,
    /// Anything else (sidebar, empty space)
    Elsewhere,
}

/// One raw selection-change notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionEvent {
    /// Region the selection starts in, if any
    pub region: Option<RegionId>,
    pub text: String,
    pub target: InteractionTarget,
}

impl SelectionEvent {
    #[cfg(test)]
    pub fn in_region(region: RegionId, text: impl Into<String>) -> Self {
        Self {
            region: Some(region),
            text: text.into(),
            target: InteractionTarget::Content,
        }
    }

    /// Selection collapsed by an interaction with `target`
    pub fn cleared(target: InteractionTarget) -> Self {
        Self {
            region: None,
            text: String::new(),
            target,
        }
    }
}

pub struct SelectionTracker {
    regions: HashMap<RegionId, String>,
    pending: Coalescer<SelectionEvent>,
}

impl SelectionTracker {
    pub fn new(window: Duration) -> Self {
        Self {
            regions: HashMap::new(),
            pending: Coalescer::new(window),
        }
    }

    /// Make a region eligible to originate queries
    pub fn register_region(&mut self, id: RegionId, full_context: impl Into<String>) {
        self.regions.insert(id, full_context.into());
    }

    /// Forget every region (content re-rendered)
    pub fn clear_regions(&mut self) {
        self.regions.clear();
    }

    #[cfg(test)]
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Queue a raw notification; only the latest one in a burst is evaluated
    pub fn on_selection_change(&mut self, event: SelectionEvent, now: Instant) {
        self.pending.push(event, now);
    }

    /// When the queued notification settles
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.deadline()
    }

    /// Evaluate the settled notification, if due
    ///
    /// Returns true when an event was evaluated.
    pub fn poll(&mut self, now: Instant, store: &SelectionStore) -> bool {
        match self.pending.poll(now) {
            Some(event) => {
                self.evaluate(event, store);
                true
            }
            None => false,
        }
    }

    /// Drop any queued notification without evaluating it
    pub fn cancel(&mut self) {
        self.pending.cancel();
    }

    /// Context for a live selection, `None` when not live
    fn live_context(&self, event: &SelectionEvent) -> Option<&str> {
        if event.text.trim().is_empty() {
            return None;
        }
        let region = event.region?;
        self.regions.get(&region).map(String::as_str)
    }

    fn evaluate(&self, event: SelectionEvent, store: &SelectionStore) {
        let state = store.snapshot();

        if let Some(context) = self.live_context(&event) {
            let text = event.text.trim();
            if text != state.selected_text {
                store.set_selection(text, context);
                store.show_query_affordance();
            }
            return;
        }

        let protected = state.chat_open
            || matches!(
                event.target,
                InteractionTarget::QueryAffordance | InteractionTarget::ChatSurface
            );
        if protected {
            tracing::debug!(target_kind = ?event.target, "Selection lost, state kept");
            return;
        }

        store.hide_query_affordance();
        store.clear_selection();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::{NoHighlight, SelectionState};
    use std::sync::Arc;

    const WINDOW: Duration = Duration::from_millis(100);

    fn setup() -> (SelectionTracker, SelectionStore, Instant) {
        let mut tracker = SelectionTracker::new(WINDOW);
        tracker.register_region(RegionId(1), "4H Analysis: trend up");
        tracker.register_region(RegionId(2), "full report");
        (tracker, SelectionStore::new(Arc::new(NoHighlight)), Instant::now())
    }

    fn settle(tracker: &mut SelectionTracker, store: &SelectionStore, now: Instant) -> bool {
        tracker.poll(now + WINDOW, store)
    }

    #[test]
    fn test_live_selection_shows_affordance() {
        let (mut tracker, store, now) = setup();
        tracker.on_selection_change(SelectionEvent::in_region(RegionId(1), "  trend up \n"), now);
        assert!(settle(&mut tracker, &store, now));

        let state = store.snapshot();
        assert_eq!(state.selected_text, "trend up");
        assert_eq!(state.full_context, "4H Analysis: trend up");
        assert!(state.query_affordance_visible);
    }

    #[test]
    fn test_drag_burst_evaluated_once() {
        let (mut tracker, store, now) = setup();
        let mut rx = store.subscribe();

        for (i, text) in ["t", "tr", "tre", "trend"].iter().enumerate() {
            let at = now + Duration::from_millis(20 * i as u64);
            tracker.on_selection_change(SelectionEvent::in_region(RegionId(1), *text), at);
            assert!(!tracker.poll(at, &store));
        }
        assert!(!rx.has_changed().unwrap());

        let last = now + Duration::from_millis(60);
        assert!(tracker.poll(last + WINDOW, &store));
        assert_eq!(rx.borrow_and_update().selected_text, "trend");
    }

    #[test]
    fn test_unregistered_region_is_not_live() {
        let (mut tracker, store, now) = setup();
        store.set_selection("old", "ctx");
        store.show_query_affordance();

        tracker.on_selection_change(SelectionEvent::in_region(RegionId(9), "sidebar text"), now);
        settle(&mut tracker, &store, now);

        assert_eq!(store.snapshot(), SelectionState::default());
    }

    #[test]
    fn test_empty_selection_clears() {
        let (mut tracker, store, now) = setup();
        tracker.on_selection_change(SelectionEvent::in_region(RegionId(2), "entry"), now);
        settle(&mut tracker, &store, now);

        let later = now + WINDOW * 2;
        tracker.on_selection_change(SelectionEvent::in_region(RegionId(2), "   "), later);
        settle(&mut tracker, &store, later);

        assert_eq!(store.snapshot(), SelectionState::default());
    }

    #[test]
    fn test_selection_loss_keeps_open_chat() {
        let (mut tracker, store, now) = setup();
        tracker.on_selection_change(SelectionEvent::in_region(RegionId(1), "trend"), now);
        settle(&mut tracker, &store, now);
        store.open_chat("why?");

        let later = now + WINDOW * 2;
        tracker.on_selection_change(SelectionEvent::cleared(InteractionTarget::Content), later);
        settle(&mut tracker, &store, later);

        let state = store.snapshot();
        assert!(state.chat_open);
        assert_eq!(state.selected_text, "trend");
    }

    #[test]
    fn test_click_on_affordance_keeps_selection() {
        let (mut tracker, store, now) = setup();
        tracker.on_selection_change(SelectionEvent::in_region(RegionId(1), "trend"), now);
        settle(&mut tracker, &store, now);

        let later = now + WINDOW * 2;
        tracker.on_selection_change(
            SelectionEvent::cleared(InteractionTarget::QueryAffordance),
            later,
        );
        settle(&mut tracker, &store, later);

        let state = store.snapshot();
        assert!(state.query_affordance_visible);
        assert_eq!(state.selected_text, "trend");
    }

    #[test]
    fn test_same_text_is_not_reapplied() {
        let (mut tracker, store, now) = setup();
        tracker.on_selection_change(SelectionEvent::in_region(RegionId(1), "trend"), now);
        settle(&mut tracker, &store, now);
        store.hide_query_affordance();

        let later = now + WINDOW * 2;
        tracker.on_selection_change(SelectionEvent::in_region(RegionId(1), "trend"), later);
        settle(&mut tracker, &store, later);

        assert!(!store.snapshot().query_affordance_visible);
    }
}
