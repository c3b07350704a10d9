//! Client-side chat session.
//!
//! `ChatSession` owns the local message list of one conversation and runs the
//! send pipeline: create the conversation on first use, append the user turn
//! optimistically, persist it, open the chat function's event stream and grow a
//! trailing assistant message fragment by fragment. Failures are reported through
//! the session's `Notifier`; whatever was already shown stays in place.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use axum::body::Bytes;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use url::Url;

use crate::conversations::ConversationStore;
use crate::error::ChatError;
use crate::models::{ChatRequest, ConversationMessage, ErrorBody, Role};
use crate::notify::{Notice, Notifier};
use crate::sse::{SseDecoder, SseEvent};

pub const DEFAULT_CONVERSATION_TITLE: &str = "New conversation";
pub const CHAT_FUNCTION_PATH: &str = "functions/ai-chat";

pub type ByteStream = BoxStream<'static, Result<Bytes, ChatError>>;

/// Called with the full message list after every local change.
pub type MessageObserver = Box<dyn Fn(&[ConversationMessage]) + Send + Sync>;

// ============================================================================
// Chat Backend
// ============================================================================

#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Start a completion; resolves once the response headers are in.
    async fn open_stream(&self, request: &ChatRequest) -> Result<ByteStream, ChatError>;
}

/// Calls the chat function of a starlab server.
#[derive(Clone)]
pub struct HttpChatBackend {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpChatBackend {
    pub fn new(base: &Url) -> Result<Self, ChatError> {
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint: base.join(CHAT_FUNCTION_PATH)?,
        })
    }
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    async fn open_stream(&self, request: &ChatRequest) -> Result<ByteStream, ChatError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|b| b.error)
                .unwrap_or(text);
            return Err(ChatError::from_status(status.as_u16(), message));
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(ChatError::from))
            .boxed())
    }
}

// ============================================================================
// Session
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendPhase {
    Idle,
    AwaitingConversation,
    SendingUserMessage,
    StreamingAssistant,
    /// The last send failed. The next send starts over from here.
    Error,
}

#[derive(Debug)]
pub enum SendOutcome {
    /// Blank input; nothing happened.
    Skipped,
    /// Another send is still running; nothing happened.
    Busy,
    Sent,
    Failed(ChatError),
}

struct SessionState {
    messages: Vec<ConversationMessage>,
    conversation_id: Option<String>,
    phase: SendPhase,
}

/// Clears the in-flight flag when a send ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct ChatSession {
    owner_id: Option<String>,
    store: Arc<dyn ConversationStore>,
    backend: Arc<dyn ChatBackend>,
    notifier: Arc<dyn Notifier>,
    state: Mutex<SessionState>,
    in_flight: AtomicBool,
    observer: Option<MessageObserver>,
}

impl ChatSession {
    /// `owner_id` is the authenticated user; without one, conversations cannot
    /// be created (an existing one can still be loaded and continued).
    pub fn new(
        owner_id: Option<String>,
        store: Arc<dyn ConversationStore>,
        backend: Arc<dyn ChatBackend>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            owner_id,
            store,
            backend,
            notifier,
            state: Mutex::new(SessionState {
                messages: Vec::new(),
                conversation_id: None,
                phase: SendPhase::Idle,
            }),
            in_flight: AtomicBool::new(false),
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: MessageObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn messages(&self) -> Vec<ConversationMessage> {
        self.state().messages.clone()
    }

    pub fn conversation_id(&self) -> Option<String> {
        self.state().conversation_id.clone()
    }

    pub fn phase(&self) -> SendPhase {
        self.state().phase
    }

    pub fn is_sending(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    fn set_phase(&self, phase: SendPhase) {
        self.state().phase = phase;
    }

    fn emit(&self) {
        if let Some(observer) = &self.observer {
            let messages = self.messages();
            observer(&messages);
        }
    }

    /// Forget the active conversation and start from an empty list.
    pub fn reset(&self) {
        {
            let mut state = self.state();
            state.messages.clear();
            state.conversation_id = None;
            state.phase = SendPhase::Idle;
        }
        self.emit();
    }

    // ------------------------------------------------------------------------
    // Conversations
    // ------------------------------------------------------------------------

    async fn open_conversation(&self, title: &str) -> Result<String, ChatError> {
        let owner = self.owner_id.as_deref().ok_or(ChatError::Unauthenticated)?;
        let id = self.store.create_conversation(owner, title).await?;
        {
            let mut state = self.state();
            state.conversation_id = Some(id.clone());
            state.messages.clear();
        }
        self.emit();
        Ok(id)
    }

    /// Create a conversation and make it the active one.
    pub async fn create_conversation(&self, title: &str) -> Option<String> {
        match self.open_conversation(title).await {
            Ok(id) => Some(id),
            Err(err) => {
                tracing::warn!(error = %err, "could not create conversation");
                self.notifier
                    .notify(Notice::error("Error creating conversation", err.to_string()));
                None
            }
        }
    }

    /// Replace local state with a stored conversation. On failure the current
    /// state is kept.
    pub async fn load_conversation(&self, conversation_id: &str) -> bool {
        match self.store.list_messages(conversation_id).await {
            Ok(messages) => {
                {
                    let mut state = self.state();
                    state.messages = messages;
                    state.conversation_id = Some(conversation_id.to_string());
                    state.phase = SendPhase::Idle;
                }
                self.emit();
                true
            }
            Err(err) => {
                tracing::warn!(error = %err, conversation = %conversation_id, "could not load conversation");
                self.notifier
                    .notify(Notice::error("Error loading conversation", err.to_string()));
                false
            }
        }
    }

    // ------------------------------------------------------------------------
    // Sending
    // ------------------------------------------------------------------------

    pub async fn send_message(&self, text: &str) -> SendOutcome {
        if text.trim().is_empty() {
            return SendOutcome::Skipped;
        }
        let Some(_in_flight) = InFlight::acquire(&self.in_flight) else {
            return SendOutcome::Busy;
        };

        match self.run_send(text).await {
            Ok(()) => {
                self.set_phase(SendPhase::Idle);
                SendOutcome::Sent
            }
            Err(err) => {
                self.set_phase(SendPhase::Error);
                tracing::warn!(error = %err, status = ?err.status(), "chat send failed");
                self.notifier.notify(failure_notice(&err));
                SendOutcome::Failed(err)
            }
        }
    }

    async fn run_send(&self, text: &str) -> Result<(), ChatError> {
        let conversation_id = match self.conversation_id() {
            Some(id) => id,
            None => {
                self.set_phase(SendPhase::AwaitingConversation);
                self.open_conversation(DEFAULT_CONVERSATION_TITLE).await?
            }
        };

        self.set_phase(SendPhase::SendingUserMessage);
        let history = {
            let mut state = self.state();
            state.messages.push(ConversationMessage::user(text));
            state.messages.clone()
        };
        self.emit();

        if let Err(err) = self
            .store
            .append_message(&conversation_id, Role::User, text)
            .await
        {
            tracing::warn!(error = %err, "failed to persist user message");
        }

        let request = ChatRequest {
            messages: history,
            conversation_id: Some(conversation_id.clone()),
        };
        let mut stream = self.backend.open_stream(&request).await?;
        self.set_phase(SendPhase::StreamingAssistant);

        let mut decoder = SseDecoder::new();
        let mut reply = String::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            for event in decoder.push(&chunk) {
                self.apply(event, &mut reply);
            }
            if decoder.is_done() {
                break;
            }
        }
        for event in decoder.finish() {
            self.apply(event, &mut reply);
        }

        if !reply.is_empty() {
            if let Err(err) = self
                .store
                .append_message(&conversation_id, Role::Assistant, &reply)
                .await
            {
                tracing::warn!(error = %err, "failed to persist assistant message");
            }
        }
        Ok(())
    }

    fn apply(&self, event: SseEvent, reply: &mut String) {
        let SseEvent::Fragment(fragment) = event else {
            return;
        };
        reply.push_str(&fragment);
        {
            let mut state = self.state();
            match state.messages.last_mut() {
                Some(last) if last.role == Role::Assistant => last.content = reply.clone(),
                _ => state.messages.push(ConversationMessage::assistant(reply.clone())),
            }
        }
        self.emit();
    }
}

fn failure_notice(err: &ChatError) -> Notice {
    match err {
        ChatError::RateLimited(message) => Notice::error("Rate limit exceeded", message.clone()),
        ChatError::PaymentRequired(message) => {
            Notice::error("Insufficient credits", message.clone())
        }
        other => Notice::error("Error", other.to_string()),
    }
}
