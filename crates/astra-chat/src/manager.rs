// SPDX-FileCopyrightText: 2026 Astra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The chat session manager.
//!
//! Owns the session list and the active session's message log, and keeps
//! their invariants intact while assistant replies stream in. Every
//! mutation is persisted under the owning user's `chats-` key and announced
//! on a revision channel so a frontend can re-render.
//!
//! Streaming updates race with session switches. Each send captures a
//! generation number; switching sessions (or starting another send) bumps
//! it, and every post-await mutation re-checks the number first. A stale
//! stream therefore stops touching state the moment the user moves on.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::StreamExt;
use tokio::sync::{Mutex, watch};
use tracing::{debug, warn};

use astra_core::{
    AstraError, Attachment, AttachmentData, ChatGateway, ChatId, ChatSession, ChatTurn, Citation,
    KeyValueStore, Message, MessageContent, MessageId, MessageRole, TurnRole, UserId, keys,
};

use crate::parse;
use crate::title;

/// Title given to citations whose source did not report one.
const UNTITLED_SOURCE: &str = "Untitled Source";

/// Per-send options.
#[derive(Debug, Default)]
pub struct SendOptions {
    /// Inline attachment; its raw bytes go to the gateway, only the
    /// name/mime descriptor is kept in the message log.
    pub attachment: Option<AttachmentData>,
    /// Overrides the session's search flag for this send only.
    pub use_search: Option<bool>,
}

struct ManagerState {
    sessions: Vec<ChatSession>,
    active: ChatId,
}

impl ManagerState {
    fn session_mut(&mut self, id: &ChatId) -> Option<&mut ChatSession> {
        self.sessions.iter_mut().find(|session| &session.id == id)
    }

    fn active_session_mut(&mut self) -> &mut ChatSession {
        let active = self.active.clone();
        // The session list is never empty and `active` always names a member.
        self.sessions
            .iter_mut()
            .find(|session| session.id == active)
            .unwrap_or_else(|| unreachable!("active session always exists"))
    }

    fn message_mut(&mut self, chat: &ChatId, message: &MessageId) -> Option<&mut Message> {
        self.session_mut(chat)?
            .messages
            .iter_mut()
            .find(|m| &m.id == message)
    }
}

/// Multi-session chat orchestrator.
///
/// The manager never surfaces gateway failures to its caller: a failed
/// assistant turn becomes an inline error message in the conversation.
/// Storage failures do propagate, except mid-stream where they are logged
/// so the stream can keep rendering.
pub struct ChatManager {
    gateway: Arc<dyn ChatGateway>,
    store: Arc<dyn KeyValueStore>,
    user_id: UserId,
    state: Mutex<ManagerState>,
    generation: AtomicU64,
    revision_tx: watch::Sender<u64>,
}

impl ChatManager {
    /// Loads the user's sessions from the store, creating a first session
    /// if none exist yet.
    pub async fn new(
        gateway: Arc<dyn ChatGateway>,
        store: Arc<dyn KeyValueStore>,
        user_id: UserId,
    ) -> Result<Self, AstraError> {
        let mut sessions: Vec<ChatSession> = match store.get(&keys::chats(&user_id)).await? {
            Some(json) => serde_json::from_str(&json)
                .map_err(|e| AstraError::Storage { source: Box::new(e) })?,
            None => Vec::new(),
        };
        let fresh = sessions.is_empty();
        if fresh {
            sessions.push(ChatSession::new());
        }
        let active = sessions[0].id.clone();

        let (revision_tx, _) = watch::channel(0u64);
        let manager = Self {
            gateway,
            store,
            user_id,
            state: Mutex::new(ManagerState { sessions, active }),
            generation: AtomicU64::new(0),
            revision_tx,
        };
        if fresh {
            let state = manager.state.lock().await;
            manager.persist(&state).await?;
        }
        Ok(manager)
    }

    /// Revision channel; the value increments on every observable mutation.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision_tx.subscribe()
    }

    /// Snapshot of all sessions in insertion order (newest first).
    pub async fn sessions(&self) -> Vec<ChatSession> {
        self.state.lock().await.sessions.clone()
    }

    /// Snapshot of all sessions in display order: pinned first, otherwise
    /// stable.
    pub async fn sorted_sessions(&self) -> Vec<ChatSession> {
        let mut sessions = self.sessions().await;
        sessions.sort_by_key(|session| !session.pinned);
        sessions
    }

    pub async fn active_id(&self) -> ChatId {
        self.state.lock().await.active.clone()
    }

    /// Snapshot of the active session.
    pub async fn active_session(&self) -> ChatSession {
        let state = self.state.lock().await;
        let active = state.active.clone();
        state
            .sessions
            .iter()
            .find(|session| session.id == active)
            .cloned()
            .unwrap_or_else(|| unreachable!("active session always exists"))
    }

    /// Creates a fresh session, makes it active, and abandons any stream
    /// that was running for the previous one.
    pub async fn create_session(&self) -> Result<ChatId, AstraError> {
        let mut state = self.state.lock().await;
        let session = ChatSession::new();
        let id = session.id.clone();
        state.sessions.insert(0, session);
        state.active = id.clone();
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.persist(&state).await?;
        self.notify();
        Ok(id)
    }

    /// Switches the active session. An in-flight stream for the previous
    /// session keeps running but can no longer mutate state.
    pub async fn select_session(&self, id: &ChatId) -> Result<(), AstraError> {
        let mut state = self.state.lock().await;
        if state.active == *id {
            return Ok(());
        }
        if state.session_mut(id).is_none() {
            return Err(AstraError::Unknown(format!("no such session: {id}")));
        }
        state.active = id.clone();
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.notify();
        Ok(())
    }

    /// Sends a user message in the active session and streams the reply.
    ///
    /// A blank text with no attachment is ignored. Gateway failures become
    /// an inline error message and are not returned.
    pub async fn send_message(&self, text: &str, options: SendOptions) -> Result<(), AstraError> {
        let text = text.trim();
        if text.is_empty() && options.attachment.is_none() {
            debug!("ignoring empty send");
            return Ok(());
        }
        let my_generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let chat_id;
        let placeholder_id;
        let turns: Vec<ChatTurn>;
        let personality;
        let use_search;
        let first_exchange;
        {
            let mut state = self.state.lock().await;
            {
                let session = state.active_session_mut();
                chat_id = session.id.clone();
                first_exchange = session.messages.is_empty();
                personality = session.personality;
                use_search = options.use_search.unwrap_or(session.use_search);

                let descriptor = options.attachment.as_ref().map(|a| Attachment {
                    name: a.name.clone(),
                    mime_type: a.mime_type.clone(),
                });
                session.messages.push(Message::user_text(text, descriptor));

                // Model context: completed text-bearing user/assistant turns
                // only. Structured payloads and inline errors stay out.
                turns = session
                    .messages
                    .iter()
                    .filter(|m| !m.streaming)
                    .filter_map(|m| {
                        let role = match m.role {
                            MessageRole::User => TurnRole::User,
                            MessageRole::Assistant => TurnRole::Assistant,
                            _ => return None,
                        };
                        m.content
                            .as_text()
                            .filter(|t| !t.is_empty())
                            .map(|t| ChatTurn {
                                role,
                                text: t.to_string(),
                            })
                    })
                    .collect();

                let placeholder = Message::assistant_placeholder();
                placeholder_id = placeholder.id.clone();
                session.messages.push(placeholder);
            }
            self.persist(&state).await?;
            self.notify();
        }

        let stream = self
            .gateway
            .stream_chat(turns, personality, use_search, options.attachment)
            .await;
        let mut stream = match stream {
            Ok(stream) => stream,
            Err(error) => {
                self.fail_placeholder(my_generation, &chat_id, &placeholder_id, &error)
                    .await;
                return Ok(());
            }
        };

        let mut accumulated = String::new();
        let mut citations: Option<Vec<Citation>> = None;
        while let Some(event) = stream.next().await {
            match event {
                Ok(event) => {
                    if let Some(set) = event.citations {
                        citations = Some(set);
                    }
                    let Some(chunk) = event.text else { continue };
                    accumulated.push_str(&chunk);

                    let mut state = self.state.lock().await;
                    if self.generation.load(Ordering::SeqCst) != my_generation {
                        debug!(%chat_id, "abandoning stale chat stream");
                        return Ok(());
                    }
                    if let Some(message) = state.message_mut(&chat_id, &placeholder_id) {
                        message.content = MessageContent::Text {
                            text: accumulated.clone(),
                        };
                    }
                    // The stream keeps rendering even if an incremental
                    // write fails; the final persist reports properly.
                    if let Err(error) = self.persist(&state).await {
                        warn!(error = %error, "failed to persist streamed chunk");
                    }
                    self.notify();
                }
                Err(error) => {
                    self.fail_placeholder(my_generation, &chat_id, &placeholder_id, &error)
                        .await;
                    return Ok(());
                }
            }
        }

        // Zero chunks is a valid (empty) final reply, not an error.
        let parsed = parse::extract_suggestions(&accumulated);
        let citations = citations
            .map(normalize_citations)
            .filter(|set| !set.is_empty());

        let mut state = self.state.lock().await;
        if self.generation.load(Ordering::SeqCst) != my_generation {
            debug!(%chat_id, "abandoning stale chat stream at completion");
            return Ok(());
        }
        if let Some(message) = state.message_mut(&chat_id, &placeholder_id) {
            message.content = MessageContent::Text {
                text: parsed.text.clone(),
            };
            message.streaming = false;
            message.suggestions = (!parsed.suggestions.is_empty()).then_some(parsed.suggestions);
            message.citations = citations;
        }
        if first_exchange {
            if let Some(session) = state.session_mut(&chat_id) {
                if session.title == ChatSession::DEFAULT_TITLE {
                    session.title = title::summarize_title(text);
                }
            }
        }
        self.persist(&state).await?;
        self.notify();
        Ok(())
    }

    /// Appends a pre-built structured message (generated image, edited
    /// image, recipe, story) to the active session.
    pub async fn add_structured_message(&self, content: MessageContent) -> Result<(), AstraError> {
        let mut state = self.state.lock().await;
        state
            .active_session_mut()
            .messages
            .push(Message::structured(content));
        self.persist(&state).await?;
        self.notify();
        Ok(())
    }

    /// Records a generated image in the active session.
    pub async fn add_image(&self, image_url: String, prompt: String) -> Result<(), AstraError> {
        self.add_structured_message(MessageContent::Image { image_url, prompt })
            .await
    }

    /// Records an edited image in the active session.
    pub async fn add_edited_image(
        &self,
        edited_image_url: String,
        description: String,
    ) -> Result<(), AstraError> {
        self.add_structured_message(MessageContent::EditedImage {
            edited_image_url,
            description,
        })
        .await
    }

    /// Deletes a session and its draft. The application is never left
    /// without an active session: the most recent remaining one is
    /// selected, or a fresh one is created.
    pub async fn delete_session(&self, id: &ChatId) -> Result<(), AstraError> {
        self.store.remove(&keys::draft(id)).await?;

        let mut state = self.state.lock().await;
        let was_active = state.active == *id;
        state.sessions.retain(|session| &session.id != id);
        if state.sessions.is_empty() {
            state.sessions.push(ChatSession::new());
        }
        if was_active {
            state.active = state.sessions[0].id.clone();
            self.generation.fetch_add(1, Ordering::SeqCst);
        }
        self.persist(&state).await?;
        self.notify();
        Ok(())
    }

    /// Removes every session and draft, then starts over with one fresh
    /// session.
    pub async fn clear_all_sessions(&self) -> Result<(), AstraError> {
        self.store.remove_prefix(keys::DRAFT_PREFIX).await?;

        let mut state = self.state.lock().await;
        state.sessions = vec![ChatSession::new()];
        state.active = state.sessions[0].id.clone();
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.persist(&state).await?;
        self.notify();
        Ok(())
    }

    pub async fn rename_session(&self, id: &ChatId, new_title: &str) -> Result<(), AstraError> {
        let mut state = self.state.lock().await;
        let Some(session) = state.session_mut(id) else {
            return Err(AstraError::Unknown(format!("no such session: {id}")));
        };
        session.title = new_title.to_string();
        self.persist(&state).await?;
        self.notify();
        Ok(())
    }

    pub async fn set_personality(
        &self,
        id: &ChatId,
        personality: astra_core::Personality,
    ) -> Result<(), AstraError> {
        let mut state = self.state.lock().await;
        let Some(session) = state.session_mut(id) else {
            return Err(AstraError::Unknown(format!("no such session: {id}")));
        };
        session.personality = personality;
        self.persist(&state).await?;
        self.notify();
        Ok(())
    }

    pub async fn set_use_search(&self, id: &ChatId, use_search: bool) -> Result<(), AstraError> {
        let mut state = self.state.lock().await;
        let Some(session) = state.session_mut(id) else {
            return Err(AstraError::Unknown(format!("no such session: {id}")));
        };
        session.use_search = use_search;
        self.persist(&state).await?;
        self.notify();
        Ok(())
    }

    pub async fn toggle_pin(&self, id: &ChatId) -> Result<(), AstraError> {
        let mut state = self.state.lock().await;
        let Some(session) = state.session_mut(id) else {
            return Err(AstraError::Unknown(format!("no such session: {id}")));
        };
        session.pinned = !session.pinned;
        self.persist(&state).await?;
        self.notify();
        Ok(())
    }

    /// Stores the composer draft for a session; a blank draft clears it.
    pub async fn save_draft(&self, id: &ChatId, text: &str) -> Result<(), AstraError> {
        if text.is_empty() {
            self.store.remove(&keys::draft(id)).await
        } else {
            self.store.put(&keys::draft(id), text).await
        }
    }

    pub async fn load_draft(&self, id: &ChatId) -> Result<Option<String>, AstraError> {
        self.store.get(&keys::draft(id)).await
    }

    /// Replaces a failed placeholder with an inline error message carrying
    /// the human-readable description.
    async fn fail_placeholder(
        &self,
        my_generation: u64,
        chat_id: &ChatId,
        placeholder_id: &MessageId,
        error: &AstraError,
    ) {
        warn!(error = %error, %chat_id, "chat stream failed");
        let mut state = self.state.lock().await;
        if self.generation.load(Ordering::SeqCst) != my_generation {
            return;
        }
        if let Some(message) = state.message_mut(chat_id, placeholder_id) {
            *message = Message::error(error.user_message());
        }
        if let Err(error) = self.persist(&state).await {
            warn!(error = %error, "failed to persist error message");
        }
        self.notify();
    }

    async fn persist(&self, state: &ManagerState) -> Result<(), AstraError> {
        let json = serde_json::to_string(&state.sessions)
            .map_err(|e| AstraError::Storage { source: Box::new(e) })?;
        self.store.put(&keys::chats(&self.user_id), &json).await
    }

    fn notify(&self) {
        self.revision_tx.send_modify(|revision| *revision += 1);
    }
}

/// Drops citations without a URI and fills in a fallback title.
fn normalize_citations(citations: Vec<Citation>) -> Vec<Citation> {
    citations
        .into_iter()
        .filter(|citation| !citation.uri.is_empty())
        .map(|citation| Citation {
            title: if citation.title.is_empty() {
                UNTITLED_SOURCE.to_string()
            } else {
                citation.title
            },
            uri: citation.uri,
        })
        .collect()
}
