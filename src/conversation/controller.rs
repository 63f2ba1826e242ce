use crate::conversation::store::{ MessageStore, Snapshot };
use crate::engine::ResponseDispatcher;
use crate::history::HistoryStore;
use crate::models::chat::{ Message, Sender };
use crate::remote::{ RemoteError, RemoteReply, RemoteResponder };
use log::{ debug, error, info, warn };
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

pub const GREETING: &str = "Hello! I'm your chat assistant. How can I help you today?";
pub const DEFAULT_SESSION_ID: &str = "default";
pub const DEFAULT_THINKING_FLOOR: Duration = Duration::from_millis(800);
pub const DEFAULT_FAILURE_PAUSE: Duration = Duration::from_millis(600);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Sending,
    /// Held only while an error reply is being recorded.
    Error,
}

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub session_id: String,
    /// Minimum time between accepting input and appending the reply.
    pub thinking_floor: Duration,
    /// Minimum wait before a fallback or error reply, however long the
    /// failed remote call took.
    pub failure_pause: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            session_id: DEFAULT_SESSION_ID.to_string(),
            thinking_floor: DEFAULT_THINKING_FLOOR,
            failure_pause: DEFAULT_FAILURE_PAUSE,
        }
    }
}

enum ReplyOutcome {
    Remote(RemoteReply),
    Local(String),
    Fallback(String),
    Failed(String),
}

/// Owns one conversation for one session and serializes every mutation
/// through `&mut self`. Failures never escape: they become no-ops or
/// assistant-authored error messages.
pub struct ConversationController {
    session_id: String,
    store: MessageStore,
    dispatcher: ResponseDispatcher,
    remote: Option<Arc<dyn RemoteResponder>>,
    history: Arc<dyn HistoryStore>,
    state: ControllerState,
    thinking_floor: Duration,
    failure_pause: Duration,
}

impl ConversationController {
    /// Restores the session from `history`, or seeds a fresh greeting when
    /// nothing usable is stored.
    pub async fn open(
        config: ControllerConfig,
        dispatcher: ResponseDispatcher,
        remote: Option<Arc<dyn RemoteResponder>>,
        history: Arc<dyn HistoryStore>
    ) -> Self {
        let clock = dispatcher.clock();
        let restored = match history.load(&config.session_id).await {
            Ok(Some(json)) => {
                match Snapshot::from_json(&json).and_then(|s| MessageStore::restore(s, clock.clone())) {
                    Ok(store) => {
                        info!(
                            "Restored {} messages for session '{}'",
                            store.len(),
                            config.session_id
                        );
                        Some(store)
                    }
                    Err(e) => {
                        warn!("Discarding stored history for '{}': {}", config.session_id, e);
                        None
                    }
                }
            }
            Ok(None) => None,
            Err(e) => {
                warn!("History load failed for '{}': {}", config.session_id, e);
                None
            }
        };

        let needs_seed = restored.is_none();
        let mut controller = Self {
            session_id: config.session_id,
            store: restored.unwrap_or_else(|| MessageStore::new(clock)),
            dispatcher,
            remote,
            history,
            state: ControllerState::Idle,
            thinking_floor: config.thinking_floor,
            failure_pause: config.failure_pause,
        };
        if needs_seed {
            controller.store.append(Sender::Assistant, GREETING);
            controller.persist().await;
        }
        controller
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == ControllerState::Idle
    }

    pub fn messages(&self) -> &[Message] {
        self.store.messages()
    }

    pub fn last_user_index(&self) -> Option<usize> {
        self.store.last_user_index()
    }

    /// Appends the user's message and the reply to it. Whitespace-only
    /// input is ignored and returns `None`.
    pub async fn submit(&mut self, text: &str) -> Option<Message> {
        let text = text.trim();
        if text.is_empty() {
            debug!("Ignoring empty submission");
            return None;
        }
        let started = Instant::now();
        self.store.append(Sender::User, text);
        self.persist().await;
        Some(self.reply_and_append(text, started).await)
    }

    /// Rewrites the most recent user message, drops the reply that followed
    /// it and asks for a new one. Older messages are never editable.
    pub async fn edit_last_user_message(&mut self, new_text: &str) -> Option<Message> {
        let new_text = new_text.trim();
        if new_text.is_empty() {
            debug!("Ignoring empty edit");
            return None;
        }
        let index = self.store.last_user_index()?;
        let started = Instant::now();
        if let Err(e) = self.store.replace_user_text_at(index, new_text) {
            error!("Edit of message {} failed: {}", index, e);
            return None;
        }
        if let Some(stale) = self.store.drop_following_assistant_if_present(index) {
            debug!("Dropped stale reply {}", stale.id);
        }
        self.persist().await;
        Some(self.reply_and_append(new_text, started).await)
    }

    /// Clears the conversation and its stored snapshot, then re-seeds the
    /// greeting. Confirmation is the caller's job.
    pub async fn reset(&mut self) {
        self.store.clear();
        if let Err(e) = self.history.remove(&self.session_id).await {
            warn!("Failed to clear stored history for '{}': {}", self.session_id, e);
        }
        self.store.append(Sender::Assistant, GREETING);
        self.persist().await;
        info!("Conversation '{}' reset", self.session_id);
    }

    async fn reply_and_append(&mut self, input: &str, started: Instant) -> Message {
        self.state = ControllerState::Sending;
        let outcome = self.request_reply(input).await;

        let wait = match outcome {
            ReplyOutcome::Remote(_) | ReplyOutcome::Local(_) =>
                self.thinking_floor.saturating_sub(started.elapsed()),
            ReplyOutcome::Fallback(_) | ReplyOutcome::Failed(_) =>
                self.thinking_floor.saturating_sub(started.elapsed()).max(self.failure_pause),
        };
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }

        let message = match outcome {
            ReplyOutcome::Remote(reply) => {
                match reply.timestamp {
                    Some(ts) => self.store.append_at(Sender::Assistant, reply.text, ts),
                    None => self.store.append(Sender::Assistant, reply.text),
                }
            }
            ReplyOutcome::Local(text) | ReplyOutcome::Fallback(text) => {
                self.store.append(Sender::Assistant, text)
            }
            ReplyOutcome::Failed(text) => {
                self.state = ControllerState::Error;
                self.store.append(Sender::Assistant, text)
            }
        };
        self.persist().await;
        self.state = ControllerState::Idle;
        message
    }

    async fn request_reply(&self, input: &str) -> ReplyOutcome {
        let remote = match &self.remote {
            Some(remote) => remote,
            None => {
                return ReplyOutcome::Local(self.dispatcher.dispatch(input));
            }
        };
        match remote.respond(input).await {
            Ok(reply) => ReplyOutcome::Remote(reply),
            Err(RemoteError::Transport(reason)) => {
                warn!("Remote responder unreachable ({}), answering locally", reason);
                ReplyOutcome::Fallback(self.dispatcher.dispatch(input))
            }
            Err(e) => {
                error!("Remote responder error: {}", e);
                ReplyOutcome::Failed(format!("Error: {}", e))
            }
        }
    }

    async fn persist(&self) {
        let json = match self.store.snapshot().to_json() {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize conversation '{}': {}", self.session_id, e);
                return;
            }
        };
        if let Err(e) = self.history.save(&self.session_id, &json).await {
            warn!("History write failed for '{}': {}", self.session_id, e);
        }
    }
}
