//! In-memory portal backend.
//!
//! [`SimBackend`] plays the roles the portal server plays in production: chat
//! REST surface, key service, file host and real-time hub. Each signed-in user
//! gets a [`SimSession`] (REST + key service bound to their identity) and a
//! [`SimHub`] (their hub connection).
//!
//! Hub traffic crosses the backend as JSON, so the wire encoding of
//! invocations and events is exercised on every message.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use quill_client::{Hub, HubFrame, TransportError};
use quill_core::{ApiError, ChatApi, FileUpload, KeyService};
use quill_crypto::KeyPair;
use quill_proto::{ChatMessage, HubEvent, HubInvocation, Identity, KeyBundle, UploadedFile, User};
use tokio::sync::mpsc;

/// What a hub connection receives.
#[derive(Debug)]
enum Delivery {
    /// Serialized [`HubEvent`].
    Json(String),
    /// Connection lifecycle signal.
    Signal(HubFrame),
}

#[derive(Default)]
struct BackendState {
    users: Vec<User>,
    messages: Vec<ChatMessage>,
    bundles: HashMap<Identity, KeyBundle>,
    connections: HashMap<Identity, Vec<mpsc::UnboundedSender<Delivery>>>,
    next_timestamp: u64,
    next_upload: u64,
    offline: bool,
    refuse_connections: bool,
}

impl BackendState {
    fn user_mut(&mut self, identity: &Identity) -> Option<&mut User> {
        self.users.iter_mut().find(|u| &u.identity() == identity)
    }

    fn timestamp(&mut self) -> String {
        self.next_timestamp += 1;
        format!("2024-05-01T10:00:00.{:06}", self.next_timestamp)
    }

    /// Deliver to every open connection of `identity`, pruning closed ones.
    fn push(&mut self, identity: &Identity, delivery: impl Fn() -> Delivery) {
        if let Some(senders) = self.connections.get_mut(identity) {
            senders.retain(|sender| sender.send(delivery()).is_ok());
        }
    }

    fn push_event(&mut self, identities: &[&Identity], event: &HubEvent) {
        let json = match event.to_json() {
            Ok(json) => json,
            Err(err) => {
                tracing::error!(error = %err, "failed to encode hub event");
                return;
            },
        };

        let mut notified: Vec<&Identity> = Vec::new();
        for identity in identities {
            if notified.contains(identity) {
                continue;
            }
            notified.push(identity);
            self.push(identity, || Delivery::Json(json.clone()));
        }
    }

    fn invoke(&mut self, invocation: HubInvocation) {
        match invocation {
            HubInvocation::SendMessage(sender, receiver, content) => {
                let message = ChatMessage {
                    sender,
                    receiver,
                    content,
                    timestamp: self.timestamp(),
                    is_read: false,
                };
                let event = HubEvent::receive(&message);
                self.messages.push(message.clone());
                self.push_event(&[&message.sender, &message.receiver], &event);
            },
            HubInvocation::MarkAsRead(reader, author) => {
                for message in &mut self.messages {
                    if message.sender == author && message.receiver == reader {
                        message.is_read = true;
                    }
                }
                let event = HubEvent::MessagesRead(reader.clone(), author.clone());
                self.push_event(&[&reader, &author], &event);
            },
        }
    }
}

/// Shared in-memory backend.
#[derive(Clone, Default)]
pub struct SimBackend {
    state: Arc<Mutex<BackendState>>,
}

impl SimBackend {
    /// Empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BackendState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a user in the directory. Returns their identity.
    pub fn add_user(&self, username: &str) -> Identity {
        let mut state = self.lock();
        let id = state.users.len() as u64 + 1;
        state.users.push(User {
            id,
            username: username.to_string(),
            role: "Admin".to_string(),
            full_name: None,
            public_key: None,
        });
        Identity::new(username)
    }

    /// Store `key_pair` in the key service and publish its public half, as a
    /// previous session of `identity` would have.
    pub fn enroll(&self, identity: &Identity, key_pair: &KeyPair) {
        let exported = key_pair.export();
        store_bundle(
            &mut self.lock(),
            identity,
            KeyBundle::new(exported.public_key, exported.private_key),
        );
    }

    /// REST and key service bound to `identity`.
    pub fn session(&self, identity: &Identity) -> SimSession {
        SimSession { identity: identity.clone(), backend: self.clone() }
    }

    /// A new hub connection for `identity`. Not connected yet.
    pub fn hub(&self, identity: &Identity) -> SimHub {
        SimHub { identity: identity.clone(), backend: self.clone(), inbox: None }
    }

    /// Every stored message, all conversations.
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.lock().messages.clone()
    }

    /// Stored messages between `a` and `b`.
    pub fn conversation(&self, a: &Identity, b: &Identity) -> Vec<ChatMessage> {
        self.lock().messages.iter().filter(|m| m.is_between(a, b)).cloned().collect()
    }

    /// Add a message to history without notifying anyone.
    pub fn insert_message(&self, message: ChatMessage) {
        self.lock().messages.push(message);
    }

    /// Push an already stored message to both parties again.
    pub fn redeliver(&self, message: &ChatMessage) {
        let event = HubEvent::receive(message);
        self.lock().push_event(&[&message.sender, &message.receiver], &event);
    }

    /// Send a lifecycle signal to every connection of `identity`.
    pub fn signal(&self, identity: &Identity, frame: HubFrame) {
        self.lock().push(identity, || Delivery::Signal(frame.clone()));
    }

    /// Published key of `identity`.
    pub fn published_key(&self, identity: &Identity) -> Option<String> {
        let mut state = self.lock();
        state.user_mut(identity).and_then(|u| u.public_key.clone())
    }

    /// Stored key bundle of `identity`.
    pub fn key_bundle(&self, identity: &Identity) -> KeyBundle {
        self.lock().bundles.get(identity).cloned().unwrap_or_default()
    }

    /// Make every REST and key service call fail.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Make hub connects fail.
    pub fn refuse_connections(&self, refuse: bool) {
        self.lock().refuse_connections = refuse;
    }
}

fn store_bundle(state: &mut BackendState, identity: &Identity, bundle: KeyBundle) {
    if let Some(user) = state.user_mut(identity) {
        user.public_key = bundle.public_key.clone();
    }
    state.bundles.insert(identity.clone(), bundle);
}

/// Backend collaborator bound to one user.
#[derive(Clone)]
pub struct SimSession {
    identity: Identity,
    backend: SimBackend,
}

impl SimSession {
    fn online(&self) -> Result<MutexGuard<'_, BackendState>, ApiError> {
        let state = self.backend.lock();
        if state.offline {
            return Err(ApiError::Unreachable("backend offline".into()));
        }
        Ok(state)
    }
}

impl ChatApi for SimSession {
    async fn chat_history(&self) -> Result<Vec<ChatMessage>, ApiError> {
        let state = self.online()?;
        Ok(state
            .messages
            .iter()
            .filter(|m| m.sender == self.identity || m.receiver == self.identity)
            .cloned()
            .collect())
    }

    async fn users(&self) -> Result<Vec<User>, ApiError> {
        Ok(self.online()?.users.clone())
    }

    async fn upload_file(&self, file: FileUpload) -> Result<UploadedFile, ApiError> {
        let mut state = self.online()?;
        if file.bytes.is_empty() {
            return Err(ApiError::Rejected { status: 400, message: "empty file".into() });
        }
        state.next_upload += 1;
        Ok(UploadedFile { url: format!("/uploads/{}-{}", state.next_upload, file.name) })
    }

    async fn delete_conversation(&self, peer: &Identity) -> Result<(), ApiError> {
        let mut state = self.online()?;
        state.messages.retain(|m| !m.is_between(&self.identity, peer));
        Ok(())
    }

    async fn clear_history(&self) -> Result<(), ApiError> {
        let mut state = self.online()?;
        state.messages.retain(|m| m.sender != self.identity && m.receiver != self.identity);
        Ok(())
    }
}

impl KeyService for SimSession {
    async fn fetch_key_bundle(&self) -> Result<KeyBundle, ApiError> {
        let state = self.online()?;
        Ok(state.bundles.get(&self.identity).cloned().unwrap_or_default())
    }

    async fn push_key_bundle(&self, bundle: KeyBundle) -> Result<(), ApiError> {
        let mut state = self.online()?;
        store_bundle(&mut state, &self.identity, bundle);
        Ok(())
    }
}

/// One user's hub connection.
pub struct SimHub {
    identity: Identity,
    backend: SimBackend,
    inbox: Option<mpsc::UnboundedReceiver<Delivery>>,
}

impl Hub for SimHub {
    async fn connect(&mut self) -> Result<(), TransportError> {
        let (sender, inbox) = mpsc::unbounded_channel();
        {
            let mut state = self.backend.lock();
            if state.refuse_connections {
                return Err(TransportError::Connection("connection refused".into()));
            }
            state.connections.entry(self.identity.clone()).or_default().push(sender);
        }
        self.inbox = Some(inbox);
        Ok(())
    }

    async fn invoke(&mut self, invocation: HubInvocation) -> Result<(), TransportError> {
        if self.inbox.is_none() {
            return Err(TransportError::Closed);
        }

        let json = invocation.to_json().map_err(|e| TransportError::Connection(e.to_string()))?;
        let invocation =
            HubInvocation::from_json(&json).map_err(|e| TransportError::Connection(e.to_string()))?;
        self.backend.lock().invoke(invocation);
        Ok(())
    }

    async fn next_frame(&mut self) -> Option<HubFrame> {
        loop {
            let delivery = self.inbox.as_mut()?.recv().await?;
            match delivery {
                Delivery::Signal(frame) => return Some(frame),
                Delivery::Json(json) => match HubEvent::from_json(&json) {
                    Ok(event) => return Some(HubFrame::Event(event)),
                    Err(err) => tracing::warn!(error = %err, "dropping malformed hub event"),
                },
            }
        }
    }

    async fn close(&mut self) {
        self.inbox = None;
    }
}
