//! Follow-up chat sessions
//!
//! A [`ChatSession`] lives exactly as long as the chat surface is open. Turns
//! are append-only and ordered by creation; only one question may be in
//! flight, so replies can never arrive out of order within a session.
//!
//! The presentation layer does not hold the session across the network call.
//! It calls [`ChatSession::begin`], sends the returned [`ChatRequest`] from a
//! spawned task, and hands the reply back through [`ChatDesk::deliver`], which
//! drops replies addressed to a session that has since been closed.

use crate::selection::SelectionState;
use crate::vision::{VisionError, VisionProvider};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Prefix of the assistant turn recorded for a failed request
pub const FAILURE_PREFIX: &str = "Sorry, I encountered an error: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatTurn {
    pub id: u64,
    pub role: Role,
    pub text: String,
    pub created_at: DateTime<Utc>,
    /// Selected text the question was about (seed question only)
    pub selected_text: Option<String>,
}

/// Identity of one chat-surface opening
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SessionId(pub u64);

/// Everything needed to issue one context-aware call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub session: SessionId,
    pub question: String,
    pub selected_text: String,
    pub full_context: String,
}

impl ChatRequest {
    pub async fn send(&self, provider: &dyn VisionProvider) -> Result<String, VisionError> {
        tracing::debug!(
            session = self.session.0,
            question_chars = self.question.len(),
            context_chars = self.full_context.len(),
            "Sending chat question"
        );
        provider
            .analyze_with_context(&self.question, &self.selected_text, &self.full_context)
            .await
    }
}

#[derive(Debug, Clone)]
pub struct ChatSession {
    id: SessionId,
    turns: Vec<ChatTurn>,
    waiting: bool,
    next_turn: u64,
}

impl ChatSession {
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            turns: Vec::new(),
            waiting: false,
            next_turn: 0,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    /// A question is in flight; submitting is disabled
    pub fn is_waiting(&self) -> bool {
        self.waiting
    }

    fn push(&mut self, role: Role, text: String, selected_text: Option<String>) {
        self.next_turn += 1;
        self.turns.push(ChatTurn {
            id: self.next_turn,
            role,
            text,
            created_at: Utc::now(),
            selected_text,
        });
    }

    /// Append the user turn and build the request
    ///
    /// Returns `None` for blank questions or while another question is in
    /// flight. The selected-text snapshot is attached to the seed question
    /// only; every request carries the current selection and context.
    pub fn begin(
        &mut self,
        question: &str,
        is_seed: bool,
        selection: &SelectionState,
    ) -> Option<ChatRequest> {
        if question.trim().is_empty() || self.waiting {
            return None;
        }

        let snapshot =
            (is_seed && selection.has_selection()).then(|| selection.selected_text.clone());
        self.push(Role::User, question.to_string(), snapshot);
        self.waiting = true;

        Some(ChatRequest {
            session: self.id,
            question: question.trim().to_string(),
            selected_text: selection.selected_text.clone(),
            full_context: selection.full_context.clone(),
        })
    }

    /// Append the assistant turn for the outstanding question
    ///
    /// Failures become a visible notice instead of being dropped.
    pub fn resolve(&mut self, reply: Result<String, VisionError>) {
        let text = match reply {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(session = self.id.0, error = %e, "Chat question failed");
                format!("{}{}", FAILURE_PREFIX, e)
            }
        };
        self.push(Role::Assistant, text, None);
        self.waiting = false;
    }

    /// Ask and wait for the answer in one step
    ///
    /// Returns false when the question was not accepted. The TUI splits this
    /// into `begin` and `ChatDesk::deliver` so the session is not borrowed
    /// while the request is in flight.
    #[cfg(test)]
    pub async fn ask(
        &mut self,
        provider: &dyn VisionProvider,
        question: &str,
        is_seed: bool,
        selection: &SelectionState,
    ) -> bool {
        let Some(request) = self.begin(question, is_seed, selection) else {
            return false;
        };
        let reply = request.send(provider).await;
        self.resolve(reply);
        true
    }
}

/// Owner of the (at most one) live chat session
#[derive(Debug, Default)]
pub struct ChatDesk {
    current: Option<ChatSession>,
    opened: u64,
}

impl ChatDesk {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new, empty session (or return the live one)
    pub fn open(&mut self) -> SessionId {
        if let Some(session) = &self.current {
            return session.id();
        }
        self.opened += 1;
        let id = SessionId(self.opened);
        tracing::debug!(session = id.0, "Chat session opened");
        self.current = Some(ChatSession::new(id));
        id
    }

    /// Destroy the live session and its log
    pub fn close(&mut self) {
        if let Some(session) = self.current.take() {
            tracing::debug!(
                session = session.id().0,
                turns = session.turns().len(),
                "Chat session closed"
            );
        }
    }

    pub fn session(&self) -> Option<&ChatSession> {
        self.current.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut ChatSession> {
        self.current.as_mut()
    }

    /// Hand a reply to its session
    ///
    /// Replies for a destroyed session are ignored; returns whether the reply
    /// was recorded.
    pub fn deliver(&mut self, session: SessionId, reply: Result<String, VisionError>) -> bool {
        match self.current.as_mut() {
            Some(live) if live.id() == session && live.is_waiting() => {
                live.resolve(reply);
                true
            }
            _ => {
                tracing::debug!(session = session.0, "Ignoring reply for closed chat session");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ChartImage;
    use crate::selection::{NoHighlight, SelectionStore};
    use futures::future::BoxFuture;
    use std::sync::{Arc, Mutex};

    /// Records context calls and answers from a script
    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<(String, String, String)>>,
        fail: bool,
    }

    impl VisionProvider for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        fn analyze<'a>(
            &'a self,
            _image: &'a ChartImage,
            _prompt: &'a str,
        ) -> BoxFuture<'a, Result<String, VisionError>> {
            Box::pin(async { Err(VisionError::EmptyResponse) })
        }

        fn analyze_with_context<'a>(
            &'a self,
            question: &'a str,
            selected_text: &'a str,
            full_context: &'a str,
        ) -> BoxFuture<'a, Result<String, VisionError>> {
            Box::pin(async move {
                self.calls.lock().unwrap().push((
                    question.to_string(),
                    selected_text.to_string(),
                    full_context.to_string(),
                ));
                if self.fail {
                    Err(VisionError::Api {
                        status: 503,
                        message: "overloaded".to_string(),
                    })
                } else {
                    Ok(format!("answer to {}", question))
                }
            })
        }

        fn complete_text<'a>(
            &'a self,
            _prompt: &'a str,
        ) -> BoxFuture<'a, Result<String, VisionError>> {
            Box::pin(async { Err(VisionError::EmptyResponse) })
        }
    }

    fn selection() -> SelectionState {
        SelectionState {
            selected_text: "stop at 41k".to_string(),
            full_context: "4H Analysis: long bias".to_string(),
            ..SelectionState::default()
        }
    }

    #[tokio::test]
    async fn test_seed_turn_carries_snapshot() {
        let provider = Recorder::default();
        let mut session = ChatSession::new(SessionId(1));

        assert!(session.ask(&provider, "Why 41k?", true, &selection()).await);
        assert!(session.ask(&provider, "And the target?", false, &selection()).await);

        let turns = session.turns();
        assert_eq!(turns.len(), 4);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[0].selected_text.as_deref(), Some("stop at 41k"));
        assert_eq!(turns[1].role, Role::Assistant);
        assert_eq!(turns[1].text, "answer to Why 41k?");
        assert_eq!(turns[2].selected_text, None);

        let calls = provider.calls.lock().unwrap();
        assert_eq!(calls[1].1, "stop at 41k");
        assert_eq!(calls[1].2, "4H Analysis: long bias");
    }

    #[test]
    fn test_seed_without_selection_has_no_snapshot() {
        let mut session = ChatSession::new(SessionId(1));
        let request = session.begin("Overall bias?", true, &SelectionState::default());
        assert!(request.is_some());
        assert_eq!(session.turns()[0].selected_text, None);
    }

    #[tokio::test]
    async fn test_failure_becomes_assistant_turn() {
        let provider = Recorder {
            fail: true,
            ..Recorder::default()
        };
        let mut session = ChatSession::new(SessionId(1));
        session.ask(&provider, "Why?", true, &selection()).await;

        let last = session.turns().last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(
            last.text,
            "Sorry, I encountered an error: API error (503): overloaded"
        );
        assert!(!session.is_waiting());
    }

    #[test]
    fn test_one_question_in_flight() {
        let mut session = ChatSession::new(SessionId(1));
        assert!(session.begin("first", true, &selection()).is_some());
        assert!(session.begin("second", false, &selection()).is_none());
        assert!(session.begin("   ", false, &selection()).is_none());
        assert_eq!(session.turns().len(), 1);

        session.resolve(Ok("done".to_string()));
        assert!(session.begin("second", false, &selection()).is_some());
    }

    #[test]
    fn test_late_reply_after_close_is_ignored() {
        let mut desk = ChatDesk::new();
        let first = desk.open();
        let request = desk
            .session_mut()
            .unwrap()
            .begin("Why?", true, &selection())
            .unwrap();
        assert_eq!(request.session, first);

        desk.close();
        let second = desk.open();
        assert_ne!(first, second);

        assert!(!desk.deliver(first, Ok("stale".to_string())));
        assert!(desk.session().unwrap().turns().is_empty());
    }

    #[tokio::test]
    async fn test_selection_to_chat_scenario() {
        let store = SelectionStore::new(Arc::new(NoHighlight));
        let provider = Recorder::default();
        let mut desk = ChatDesk::new();

        store.set_selection("RSI divergence", "1H Analysis: RSI divergence at highs");
        store.show_query_affordance();
        assert!(store.snapshot().query_affordance_visible);

        store.open_chat("Is it bearish?");
        let state = store.snapshot();
        assert!(state.chat_open && !state.query_affordance_visible);

        let id = desk.open();
        let request = desk
            .session_mut()
            .unwrap()
            .begin(&state.seed_question, true, &state)
            .unwrap();
        let reply = request.send(&provider).await;
        assert!(desk.deliver(id, reply));

        let session = desk.session_mut().unwrap();
        session.ask(&provider, "Timeframe?", false, &state).await;

        let turns = session.turns();
        assert_eq!(turns[0].selected_text.as_deref(), Some("RSI divergence"));
        assert_eq!(turns[2].selected_text, None);
        assert_eq!(turns.len(), 4);
    }
}
