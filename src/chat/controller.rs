//! Chat session controller.
//!
//! Session lifecycle: `uninitialized -> active` on [`ChatController::establish_session`],
//! `active -> discarded` on the next establish or on [`ChatController::teardown`].
//! Each establish mints a new [`SessionId`]; ids never repeat, so a fragment
//! tagged with an old id can never land in a newer transcript, no matter how
//! many times the context changed in between.

use std::sync::{Arc, Mutex, MutexGuard};

use futures_util::StreamExt;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::ai::{AiGateway, GatewayError, GatewayErrorKind, TutorChat, TUTOR_FALLBACK, TUTOR_TIMEOUT};
use crate::errors::AppError;
use crate::models::{ChatContext, ChatMessage, SessionSnapshot};

pub type SessionId = u64;

const EVENT_CAPACITY: usize = 256;

/// Progress of an in-flight turn, published for live consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TurnEvent {
    #[serde(rename_all = "camelCase")]
    Fragment { session_id: SessionId, text: String },
    /// Final assistant text; may be empty when the backend sent nothing.
    #[serde(rename_all = "camelCase")]
    Completed { session_id: SessionId, text: String },
    /// Fallback text that replaced the assistant entry.
    #[serde(rename_all = "camelCase")]
    Failed { session_id: SessionId, text: String },
    /// The session was replaced or torn down before the turn finished.
    #[serde(rename_all = "camelCase")]
    Cancelled { session_id: SessionId },
}

impl TurnEvent {
    pub fn session_id(&self) -> SessionId {
        match self {
            TurnEvent::Fragment { session_id, .. }
            | TurnEvent::Completed { session_id, .. }
            | TurnEvent::Failed { session_id, .. }
            | TurnEvent::Cancelled { session_id } => *session_id,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, TurnEvent::Fragment { .. })
    }
}

struct ActiveSession {
    id: SessionId,
    chat: Arc<TutorChat>,
    transcript: Vec<ChatMessage>,
    in_flight: Option<CancellationToken>,
    /// Transcript index of the assistant entry the in-flight turn writes to.
    reply: Option<usize>,
}

impl ActiveSession {
    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id,
            context: self.chat.context().clone(),
            transcript: self.transcript.clone(),
            in_flight: self.in_flight.is_some(),
        }
    }
}

#[derive(Default)]
struct ControllerState {
    session: Option<ActiveSession>,
    last_id: SessionId,
}

impl ControllerState {
    /// The active session, only if it is still the one with `id`.
    fn session_mut(&mut self, id: SessionId) -> Option<&mut ActiveSession> {
        self.session.as_mut().filter(|s| s.id == id)
    }
}

enum TurnOutcome {
    Completed,
    Failed(GatewayError),
    /// The session was replaced or torn down mid-turn.
    Orphaned,
}

/// How a turn fetches its answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnMode {
    /// Fragments are merged into the assistant entry as they arrive.
    Streamed,
    /// One request for the complete reply.
    Whole,
}

/// Owns one student's tutoring conversation.
pub struct ChatController {
    gateway: AiGateway,
    state: Mutex<ControllerState>,
    events: broadcast::Sender<TurnEvent>,
}

/// Opening line of every new transcript.
pub fn greeting(subject: &str) -> String {
    format!(
        "Let's talk about {}! What are you curious about today? 😊",
        subject
    )
}

impl ChatController {
    pub fn new(gateway: AiGateway) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            gateway,
            state: Mutex::new(ControllerState::default()),
            events,
        }
    }

    // The lock is never held across an await, so a poisoned guard still
    // protects a consistent state.
    fn state(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TurnEvent> {
        self.events.subscribe()
    }

    /// Replace any existing session with a fresh one for `context`.
    ///
    /// A send still running for the previous session is cancelled; anything it
    /// produces afterwards is dropped.
    pub fn establish_session(&self, context: ChatContext) -> SessionSnapshot {
        let chat = Arc::new(self.gateway.tutor(context));
        let mut state = self.state();

        if let Some(old) = state.session.take() {
            discard(old);
        }

        state.last_id += 1;
        let session = ActiveSession {
            id: state.last_id,
            transcript: vec![ChatMessage::assistant(greeting(&chat.context().subject))],
            chat,
            in_flight: None,
            reply: None,
        };
        let snapshot = session.snapshot();
        tracing::debug!(
            "Chat session {} established for Grade {} {}",
            session.id,
            snapshot.context.grade_level,
            snapshot.context.subject
        );
        state.session = Some(session);
        snapshot
    }

    /// Discard the active session, if any.
    pub fn teardown(&self) -> bool {
        match self.state().session.take() {
            Some(old) => {
                discard(old);
                true
            }
            None => false,
        }
    }

    pub fn snapshot(&self) -> Option<SessionSnapshot> {
        self.state().session.as_ref().map(ActiveSession::snapshot)
    }

    pub fn active_session_id(&self) -> Option<SessionId> {
        self.state().session.as_ref().map(|s| s.id)
    }

    /// Ask one question and merge the streamed answer into the transcript.
    ///
    /// Rejects blank text, a stale `session_id`, and a second send while one
    /// is in flight. All other outcomes are reported through the transcript.
    pub async fn send_turn(
        self: &Arc<Self>,
        session_id: SessionId,
        text: &str,
    ) -> Result<(), AppError> {
        self.begin_turn(session_id, text)?.run().await;
        Ok(())
    }

    /// Claim the in-flight slot and record the user entry without waiting for
    /// the answer. The turn proceeds once [`PendingTurn::run`] is awaited.
    pub fn begin_turn(
        self: &Arc<Self>,
        session_id: SessionId,
        text: &str,
    ) -> Result<PendingTurn, AppError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::Validation("Message cannot be empty".to_string()));
        }

        let mut state = self.state();
        let session = state.session_mut(session_id).ok_or_else(|| {
            AppError::NotFound(format!("Chat session {} is not active", session_id))
        })?;
        if session.in_flight.is_some() {
            return Err(AppError::Conflict(
                "Mwalimu AI is still answering the previous question".to_string(),
            ));
        }

        // Earlier exchanges only: the greeting is ours, not the model's.
        let history: Vec<ChatMessage> = session
            .transcript
            .iter()
            .skip(1)
            .filter(|entry| !entry.text.is_empty())
            .cloned()
            .collect();

        let token = CancellationToken::new();
        session.in_flight = Some(token.clone());
        session.reply = None;
        session.transcript.push(ChatMessage::user(text));

        Ok(PendingTurn {
            controller: Arc::clone(self),
            session_id,
            chat: Arc::clone(&session.chat),
            history,
            text: text.to_string(),
            token,
            armed: true,
        })
    }

    /// Append the assistant entry for the running turn and return its index.
    fn open_reply(&self, session_id: SessionId, text: &str) -> Option<usize> {
        let mut state = self.state();
        let session = state.session_mut(session_id)?;
        session.transcript.push(ChatMessage::assistant(text));
        let index = session.transcript.len() - 1;
        session.reply = Some(index);
        Some(index)
    }

    async fn run_turn(&self, turn: &PendingTurn, mode: TurnMode) -> TurnOutcome {
        let PendingTurn {
            session_id,
            chat,
            history,
            text,
            token,
            ..
        } = turn;
        let session_id = *session_id;

        if mode == TurnMode::Whole {
            let reply = tokio::select! {
                _ = token.cancelled() => return TurnOutcome::Orphaned,
                reply = chat.send(history, text) => reply,
            };
            return match reply {
                Ok(reply) => match self.open_reply(session_id, &reply) {
                    Some(_) => TurnOutcome::Completed,
                    None => TurnOutcome::Orphaned,
                },
                Err(error) => TurnOutcome::Failed(error),
            };
        }

        let opened = tokio::select! {
            _ = token.cancelled() => return TurnOutcome::Orphaned,
            opened = chat.send_stream(history, text) => opened,
        };
        let mut stream = match opened {
            Ok(stream) => stream,
            Err(error) => return TurnOutcome::Failed(error),
        };

        let Some(index) = self.open_reply(session_id, "") else {
            return TurnOutcome::Orphaned;
        };

        loop {
            let next = tokio::select! {
                _ = token.cancelled() => return TurnOutcome::Orphaned,
                next = stream.next() => next,
            };
            let fragment = match next {
                None => return TurnOutcome::Completed,
                Some(Ok(fragment)) => fragment,
                Some(Err(error)) => return TurnOutcome::Failed(error),
            };

            {
                let mut state = self.state();
                let Some(session) = state.session_mut(session_id) else {
                    tracing::debug!("Dropping fragment for discarded session {}", session_id);
                    return TurnOutcome::Orphaned;
                };
                session.transcript[index].text.push_str(&fragment);
            }
            let _ = self.events.send(TurnEvent::Fragment {
                session_id,
                text: fragment,
            });
        }
    }

    fn finish_turn(&self, session_id: SessionId, outcome: TurnOutcome) {
        let event = self.settle(session_id, outcome).unwrap_or_else(|| {
            tracing::debug!("Turn for discarded session {} finished and was ignored", session_id);
            TurnEvent::Cancelled { session_id }
        });
        let _ = self.events.send(event);
    }

    /// Release the in-flight slot and write the turn's final text.
    ///
    /// A failure replaces whatever the assistant entry holds with the fallback
    /// text, or appends the fallback when no entry was opened.
    fn settle(&self, session_id: SessionId, outcome: TurnOutcome) -> Option<TurnEvent> {
        if matches!(outcome, TurnOutcome::Orphaned) {
            return None;
        }
        let mut state = self.state();
        let session = state.session_mut(session_id)?;
        session.in_flight = None;
        let reply = session.reply.take();

        match outcome {
            TurnOutcome::Completed => {
                let text = reply
                    .map(|i| session.transcript[i].text.clone())
                    .unwrap_or_default();
                if text.is_empty() {
                    tracing::warn!("AI backend returned no fragments for session {}", session_id);
                }
                Some(TurnEvent::Completed { session_id, text })
            }
            TurnOutcome::Failed(error) => {
                tracing::warn!("Chat turn for session {} failed: {}", session_id, error);
                let fallback = match error.kind {
                    GatewayErrorKind::Timeout => TUTOR_TIMEOUT,
                    _ => TUTOR_FALLBACK,
                };
                match reply {
                    Some(i) => session.transcript[i].text = fallback.to_string(),
                    None => session.transcript.push(ChatMessage::assistant(fallback)),
                }
                Some(TurnEvent::Failed {
                    session_id,
                    text: fallback.to_string(),
                })
            }
            TurnOutcome::Orphaned => None,
        }
    }
}

fn discard(session: ActiveSession) {
    if let Some(token) = session.in_flight {
        tracing::debug!("Cancelling in-flight send of discarded session {}", session.id);
        token.cancel();
    }
}

/// A claimed turn. Dropping it before it runs to completion frees the
/// in-flight slot, cancels the request and settles the turn as failed.
pub struct PendingTurn {
    controller: Arc<ChatController>,
    session_id: SessionId,
    chat: Arc<TutorChat>,
    history: Vec<ChatMessage>,
    text: String,
    token: CancellationToken,
    armed: bool,
}

impl PendingTurn {
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Stream the answer into the transcript.
    pub async fn run(self) {
        self.run_as(TurnMode::Streamed).await
    }

    pub async fn run_as(mut self, mode: TurnMode) {
        let controller = Arc::clone(&self.controller);
        let outcome = controller.run_turn(&self, mode).await;
        self.armed = false;
        controller.finish_turn(self.session_id, outcome);
    }
}

impl Drop for PendingTurn {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        tracing::warn!("Send for session {} was abandoned mid-turn", self.session_id);
        self.token.cancel();
        let abandoned = GatewayError::transport("Send was abandoned before the answer arrived");
        let event = self
            .controller
            .settle(self.session_id, TurnOutcome::Failed(abandoned))
            .unwrap_or(TurnEvent::Cancelled {
                session_id: self.session_id,
            });
        let _ = self.controller.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::fake::{ScriptedBackend, Step};
    use crate::models::{ChatRole, ResourceLevel};
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn controller(steps: Vec<Step>) -> Arc<ChatController> {
        let gateway = AiGateway::new(Arc::new(ScriptedBackend::new(steps)), Duration::from_secs(30));
        Arc::new(ChatController::new(gateway))
    }

    fn context(subject: &str) -> ChatContext {
        ChatContext::new(4, subject, ResourceLevel::Low, None).unwrap()
    }

    #[tokio::test]
    async fn test_establish_resets_to_greeting() {
        let ctl = controller(vec![Step::text("Hi")]);
        assert!(ctl.snapshot().is_none());

        let first = ctl.establish_session(context("Maths"));
        assert_eq!(first.transcript, vec![ChatMessage::assistant(greeting("Maths"))]);

        ctl.send_turn(first.session_id, "What is 2+2?").await.unwrap();
        let second = ctl.establish_session(context("Science"));
        assert!(second.session_id > first.session_id);
        assert_eq!(second.transcript.len(), 1);
        assert!(second.transcript[0].text.contains("Science"));
    }

    #[tokio::test]
    async fn test_fragments_merge_into_one_entry() {
        let ctl = controller(vec![Step::text("How "), Step::text("many "), Step::text("legs?")]);
        let session = ctl.establish_session(context("Science"));

        ctl.send_turn(session.session_id, "  spiders  ").await.unwrap();

        let snap = ctl.snapshot().unwrap();
        assert_eq!(snap.transcript.len(), 3);
        assert_eq!(snap.transcript[1], ChatMessage::user("spiders"));
        assert_eq!(snap.transcript[2], ChatMessage::assistant("How many legs?"));
        assert!(!snap.in_flight);
    }

    #[tokio::test]
    async fn test_blank_and_stale_sends_rejected() {
        let ctl = controller(vec![Step::text("ok")]);
        let first = ctl.establish_session(context("Maths"));

        let err = ctl.send_turn(first.session_id, "   ").await.unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");

        ctl.establish_session(context("English"));
        let err = ctl.send_turn(first.session_id, "hello").await.unwrap_err();
        assert_eq!(err.error_code(), "NOT_FOUND");
        assert_eq!(ctl.snapshot().unwrap().transcript.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_context_switch_hides_old_stream() {
        let ctl = controller(vec![
            Step::delay(Duration::from_millis(50)),
            Step::Echo,
            Step::delay(Duration::from_millis(50)),
            Step::Echo,
        ]);
        let old_id = ctl.establish_session(context("Maths")).session_id;

        let sender = Arc::clone(&ctl);
        let old_turn = tokio::spawn(async move { sender.send_turn(old_id, "OLD-QUESTION").await });

        tokio::time::sleep(Duration::from_millis(75)).await;
        let new = ctl.establish_session(context("Science"));
        ctl.send_turn(new.session_id, "new-question").await.unwrap();
        old_turn.await.unwrap().unwrap();

        let snap = ctl.snapshot().unwrap();
        assert_eq!(snap.session_id, new.session_id);
        assert!(snap.transcript.iter().all(|m| !m.text.contains("OLD-QUESTION")));
        assert_eq!(
            snap.transcript.last().unwrap().text,
            "new-questionnew-question"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_switch_does_not_resurrect() {
        let steps = vec![Step::delay(Duration::from_millis(100)), Step::Echo];
        let backend = ScriptedBackend::new(steps);
        let live = backend.live_streams();
        let gateway = AiGateway::new(Arc::new(backend), Duration::from_secs(30));
        let ctl = Arc::new(ChatController::new(gateway));

        let first_id = ctl.establish_session(context("Maths")).session_id;
        let sender = Arc::clone(&ctl);
        let turn = tokio::spawn(async move { sender.send_turn(first_id, "STALE").await });
        tokio::time::sleep(Duration::from_millis(10)).await;

        ctl.establish_session(context("Science"));
        ctl.establish_session(context("Maths"));
        turn.await.unwrap().unwrap();

        let snap = ctl.snapshot().unwrap();
        assert_eq!(snap.transcript.len(), 1);
        assert_eq!(live.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_send_rejected_while_in_flight() {
        let ctl = controller(vec![Step::delay(Duration::from_millis(100)), Step::Echo]);
        let id = ctl.establish_session(context("Maths")).session_id;

        let sender = Arc::clone(&ctl);
        let first = tokio::spawn(async move { sender.send_turn(id, "one").await });
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(ctl.snapshot().unwrap().in_flight);
        let err = ctl.send_turn(id, "two").await.unwrap_err();
        assert_eq!(err.error_code(), "CONFLICT");

        first.await.unwrap().unwrap();
        let roles: Vec<ChatRole> = ctl
            .snapshot()
            .unwrap()
            .transcript
            .iter()
            .map(|m| m.role)
            .collect();
        assert_eq!(
            roles,
            vec![ChatRole::Assistant, ChatRole::User, ChatRole::Assistant]
        );
        assert_eq!(ctl.snapshot().unwrap().transcript[2].text, "one");
    }

    #[tokio::test]
    async fn test_stream_failure_replaces_partial_text() {
        let ctl = controller(vec![
            Step::text("partial answer"),
            Step::Fail(GatewayError::upstream("500")),
        ]);
        let session = ctl.establish_session(context("Maths"));
        let mut events = ctl.subscribe();

        ctl.send_turn(session.session_id, "why?").await.unwrap();

        let snap = ctl.snapshot().unwrap();
        assert_eq!(snap.transcript.len(), 3);
        assert_eq!(snap.transcript[2].text, TUTOR_FALLBACK);

        assert_eq!(
            events.recv().await.unwrap(),
            TurnEvent::Fragment {
                session_id: session.session_id,
                text: "partial answer".to_string()
            }
        );
        assert_eq!(
            events.recv().await.unwrap(),
            TurnEvent::Failed {
                session_id: session.session_id,
                text: TUTOR_FALLBACK.to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_open_failure_appends_fallback() {
        let ctl = controller(vec![Step::Fail(GatewayError::transport("refused"))]);
        let session = ctl.establish_session(context("Maths"));

        ctl.send_turn(session.session_id, "hello").await.unwrap();

        let snap = ctl.snapshot().unwrap();
        assert_eq!(snap.transcript.last().unwrap().text, TUTOR_FALLBACK);
        assert_eq!(snap.transcript.len(), 3);
    }

    #[tokio::test]
    async fn test_zero_fragments_leaves_empty_entry() {
        let ctl = controller(vec![]);
        let session = ctl.establish_session(context("Maths"));

        ctl.send_turn(session.session_id, "anyone?").await.unwrap();

        let snap = ctl.snapshot().unwrap();
        assert_eq!(snap.transcript.last().unwrap(), &ChatMessage::assistant(""));
        assert!(!snap.in_flight);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_surfaces_timeout_message() {
        let ctl = controller(vec![
            Step::text("thinking"),
            Step::delay(Duration::from_secs(600)),
        ]);
        let session = ctl.establish_session(context("Maths"));

        let started = tokio::time::Instant::now();
        ctl.send_turn(session.session_id, "slow?").await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(31));

        let snap = ctl.snapshot().unwrap();
        assert_eq!(snap.transcript.last().unwrap().text, TUTOR_TIMEOUT);
        assert_ne!(TUTOR_TIMEOUT, TUTOR_FALLBACK);
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_cancels_in_flight() {
        let ctl = controller(vec![Step::delay(Duration::from_secs(5)), Step::Echo]);
        let id = ctl.establish_session(context("Maths")).session_id;

        let mut events = ctl.subscribe();
        let sender = Arc::clone(&ctl);
        let turn = tokio::spawn(async move { sender.send_turn(id, "hi").await });
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(ctl.teardown());
        turn.await.unwrap().unwrap();
        assert!(ctl.snapshot().is_none());
        assert_eq!(
            events.recv().await.unwrap(),
            TurnEvent::Cancelled { session_id: id }
        );
        assert!(!ctl.teardown());
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_send_frees_slot() {
        let ctl = controller(vec![
            Step::text("Half an "),
            Step::delay(Duration::from_secs(5)),
            Step::Echo,
        ]);
        let id = ctl.establish_session(context("Maths")).session_id;
        let mut events = ctl.subscribe();

        let sender = Arc::clone(&ctl);
        let turn = tokio::spawn(async move { sender.send_turn(id, "hi").await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        turn.abort();
        let _ = turn.await;

        let snap = ctl.snapshot().unwrap();
        assert!(!snap.in_flight);
        assert_eq!(snap.transcript.len(), 3);
        assert_eq!(snap.transcript[2], ChatMessage::assistant(TUTOR_FALLBACK));
        assert_eq!(
            events.recv().await.unwrap(),
            TurnEvent::Fragment {
                session_id: id,
                text: "Half an ".to_string()
            }
        );
        assert_eq!(
            events.recv().await.unwrap(),
            TurnEvent::Failed {
                session_id: id,
                text: TUTOR_FALLBACK.to_string()
            }
        );

        ctl.send_turn(id, "again").await.unwrap();
        assert_eq!(
            ctl.snapshot().unwrap().transcript.last().unwrap().text,
            "Half an again"
        );
    }

    #[tokio::test]
    async fn test_unstarted_turn_dropped_appends_fallback() {
        let ctl = controller(vec![Step::text("never sent")]);
        let id = ctl.establish_session(context("Maths")).session_id;

        drop(ctl.begin_turn(id, "hello").unwrap());

        let snap = ctl.snapshot().unwrap();
        assert!(!snap.in_flight);
        assert_eq!(
            snap.transcript[1..].to_vec(),
            vec![ChatMessage::user("hello"), ChatMessage::assistant(TUTOR_FALLBACK)]
        );
    }

    #[tokio::test]
    async fn test_history_skips_greeting_and_empty_replies() {
        let ctl = controller(vec![]);
        let id = ctl.establish_session(context("Maths")).session_id;

        let first = ctl.begin_turn(id, "anyone?").unwrap();
        assert!(first.history.is_empty());
        first.run().await;

        let second = ctl.begin_turn(id, "hello?").unwrap();
        assert_eq!(second.history, vec![ChatMessage::user("anyone?")]);
        second.run().await;
    }

    #[tokio::test]
    async fn test_whole_turn_records_complete_reply() {
        let ctl = controller(vec![Step::text("Eight "), Step::text("legs")]);
        let id = ctl.establish_session(context("Science")).session_id;
        let mut events = ctl.subscribe();

        ctl.begin_turn(id, "spiders").unwrap().run_as(TurnMode::Whole).await;

        let snap = ctl.snapshot().unwrap();
        assert_eq!(snap.transcript.last().unwrap(), &ChatMessage::assistant("Eight legs"));
        assert!(!snap.in_flight);
        assert_eq!(
            events.recv().await.unwrap(),
            TurnEvent::Completed {
                session_id: id,
                text: "Eight legs".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_whole_turn_failure_appends_fallback() {
        let ctl = controller(vec![
            Step::text("partial"),
            Step::Fail(GatewayError::upstream("500")),
        ]);
        let id = ctl.establish_session(context("Science")).session_id;

        ctl.begin_turn(id, "why?").unwrap().run_as(TurnMode::Whole).await;

        let snap = ctl.snapshot().unwrap();
        assert_eq!(snap.transcript.len(), 3);
        assert_eq!(snap.transcript[2], ChatMessage::assistant(TUTOR_FALLBACK));
    }
}
