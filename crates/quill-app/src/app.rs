//! Conversation state machine.
//!
//! [`App`] owns everything the chat UI shows: the peer directory with unread
//! badges, the loaded history, decrypted bodies, the composer's pending reply
//! and attachment, and the latest notice. It performs no I/O. It consumes
//! [`AppEvent`]s and produces [`AppAction`]s for the runtime to execute, so the
//! same code runs against the real backend and the in-memory harness.
//!
//! # Invariants
//!
//! - A message appears at most once, keyed by (timestamp, sender)
//! - A peer's unread count covers only messages from that peer to us, and is
//!   zero while their conversation is open
//! - The current user never appears in the peer list

use std::collections::{HashMap, HashSet};

use quill_client::ConnectionState;
use quill_core::{FileUpload, KeySource};
use quill_proto::{ChatMessage, Identity, MessageId, User};

use crate::{
    AppAction, AppEvent, Attachment, ChatConfig, ChatError, DisplayMessage, MessageBody, Notice,
    Peer, Quote, QuoteTarget, ScrollTarget, UserCommand,
    compose::{compose_body, locate_quote, resolve_asset_urls},
};

/// Shown when a message goes to a peer without a published key.
pub const PLAINTEXT_NOTICE: &str = "This user has not set up E2EE yet. Sending in plaintext.";

/// Shown when a quote points outside the loaded history.
pub const QUOTE_NOT_VISIBLE_NOTICE: &str = "Original message not visible in current view.";

/// Chat state machine.
#[derive(Debug, Clone)]
pub struct App {
    identity: Identity,
    asset_base: String,
    /// Peer to open after the first load. Taken once used.
    open_with: Option<Identity>,
    connection: ConnectionState,
    key_source: Option<KeySource>,
    loaded: bool,
    peers: Vec<Peer>,
    /// History plus pushed messages, in arrival order.
    messages: Vec<ChatMessage>,
    seen: HashSet<MessageId>,
    /// Bodies requested for decryption. Absent means not requested yet.
    bodies: HashMap<MessageId, MessageBody>,
    active_peer: Option<Identity>,
    reply: Option<Quote>,
    attachment: Option<Attachment>,
    uploading: bool,
    notice: Option<Notice>,
}

impl App {
    /// Create the state machine for a session.
    pub fn new(config: &ChatConfig) -> Self {
        Self {
            identity: config.identity.clone(),
            asset_base: config.asset_base.clone(),
            open_with: config.open_with.clone(),
            connection: ConnectionState::Disconnected,
            key_source: None,
            loaded: false,
            peers: Vec::new(),
            messages: Vec::new(),
            seen: HashSet::new(),
            bodies: HashMap::new(),
            active_peer: None,
            reply: None,
            attachment: None,
            uploading: false,
            notice: None,
        }
    }

    /// Process an event and return actions.
    pub fn handle(&mut self, event: AppEvent) -> Vec<AppAction> {
        match event {
            AppEvent::Command(command) => self.command(command),
            AppEvent::HistoryLoaded { messages, users } => self.load(messages, users),
            AppEvent::LoadFailed { error } => {
                tracing::warn!(error = %error, "history load failed");
                self.notice = Some(Notice::error("Failed to load conversations."));
                vec![AppAction::Render]
            },
            AppEvent::KeysResolved { source } => {
                self.key_source = Some(source);
                match source {
                    KeySource::LocalFallback => {
                        self.notice = Some(Notice::info(
                            "Key service unavailable. Using keys stored on this device.",
                        ));
                    },
                    KeySource::Ephemeral => {
                        self.notice = Some(Notice::error(
                            "Encryption keys unavailable. Earlier messages may not be readable.",
                        ));
                    },
                    KeySource::Remote | KeySource::LocalSynced | KeySource::Generated => {},
                }
                vec![AppAction::Render]
            },
            AppEvent::TransportStateChanged(state) => {
                self.connection = state;
                vec![AppAction::Render]
            },
            AppEvent::MessageReceived(message) => self.receive(message),
            AppEvent::ReadReceipt { reader, author } => self.read_receipt(&reader, &author),
            AppEvent::Decrypted { id, result } => {
                let body = match result {
                    Ok(text) => MessageBody::Text(text),
                    Err(err) => {
                        tracing::debug!(timestamp = %id.timestamp, error = %err, "unreadable");
                        MessageBody::Unreadable
                    },
                };
                self.bodies.insert(id, body);
                vec![AppAction::Render]
            },
            AppEvent::FileUploaded(attachment) => {
                self.uploading = false;
                self.attachment = Some(attachment);
                vec![AppAction::Render]
            },
            AppEvent::MessageSent => {
                self.reply = None;
                self.attachment = None;
                vec![AppAction::Render]
            },
            AppEvent::PlaintextFallback => {
                self.notice = Some(Notice::info(PLAINTEXT_NOTICE));
                vec![AppAction::Render]
            },
            AppEvent::Failed(error) => self.fail(&error),
            AppEvent::ConversationDeleted { peer } => {
                if self.active_peer.as_ref() == Some(&peer) {
                    self.reply = None;
                }
                self.notice = Some(Notice::success("Conversation deleted."));
                vec![AppAction::FetchHistory, AppAction::Render]
            },
            AppEvent::HistoryCleared => {
                self.reply = None;
                self.notice = Some(Notice::success("Chat history cleared."));
                vec![AppAction::FetchHistory, AppAction::Render]
            },
        }
    }

    fn command(&mut self, command: UserCommand) -> Vec<AppAction> {
        match command {
            UserCommand::SelectPeer(peer) => self.select_peer(&peer),
            UserCommand::Send(text) => self.send(&text),
            UserCommand::StartReply(id) => self.start_reply(&id),
            UserCommand::CancelReply => self.cancel_reply(),
            UserCommand::Attach(file) => self.attach(file),
            UserCommand::RemoveAttachment => self.remove_attachment(),
            UserCommand::JumpToQuote(reply_id) => self.jump_to_quote(&reply_id),
            UserCommand::DeleteConversation(peer) => self.delete_conversation(peer),
            UserCommand::ClearHistory => self.clear_history(),
            UserCommand::Quit => self.quit(),
        }
    }

    /// Request the initial load.
    pub fn load_history(&self) -> Vec<AppAction> {
        vec![AppAction::FetchHistory]
    }

    /// Open the conversation with `peer`.
    ///
    /// Marks the peer's messages as read and scrolls to the latest one.
    /// Unknown peers are ignored.
    pub fn select_peer(&mut self, peer: &Identity) -> Vec<AppAction> {
        if !self.peers.iter().any(|p| &p.identity() == peer) {
            tracing::debug!(%peer, "select ignored, peer not in directory");
            return vec![];
        }

        if self.active_peer.as_ref() != Some(peer) {
            self.reply = None;
        }
        self.active_peer = Some(peer.clone());
        self.mark_conversation_read(peer);

        let mut actions =
            vec![AppAction::MarkAsRead { reader: self.identity.clone(), author: peer.clone() }];
        actions.extend(self.request_decryption());
        actions.push(AppAction::Scroll(ScrollTarget::Latest));
        actions.push(AppAction::Render);
        actions
    }

    /// Send `text` with the pending reply and attachment to the active peer.
    ///
    /// No-op without an active peer, or with neither text nor attachment.
    pub fn send(&mut self, text: &str) -> Vec<AppAction> {
        let Some(peer) = self.active_peer_entry() else {
            return vec![];
        };
        let Some(body) = compose_body(text, self.attachment.as_ref(), self.reply.as_ref()) else {
            return vec![];
        };

        vec![AppAction::SendMessage { peer: peer.user.clone(), body }, AppAction::Render]
    }

    /// Reply to message `id` of the active conversation.
    pub fn start_reply(&mut self, id: &MessageId) -> Vec<AppAction> {
        let Some(message) = self.conversation_messages().find(|m| &m.id() == id).cloned() else {
            return vec![];
        };

        let body = self.body(id);
        self.reply = Some(Quote::of(&message, body.display(), &self.asset_base));
        vec![AppAction::Render]
    }

    /// Drop the pending reply.
    pub fn cancel_reply(&mut self) -> Vec<AppAction> {
        self.reply = None;
        vec![AppAction::Render]
    }

    /// Upload `file` as the attachment of the next message.
    pub fn attach(&mut self, file: FileUpload) -> Vec<AppAction> {
        if self.active_peer.is_none() {
            return vec![];
        }

        self.uploading = true;
        vec![AppAction::UploadFile(file), AppAction::Render]
    }

    /// Drop the pending attachment.
    pub fn remove_attachment(&mut self) -> Vec<AppAction> {
        self.attachment = None;
        vec![AppAction::Render]
    }

    /// Scroll to the message a quote block points at.
    pub fn jump_to_quote(&mut self, reply_id: &str) -> Vec<AppAction> {
        match locate_quote(self.conversation_messages(), reply_id) {
            QuoteTarget::Visible(id) => vec![AppAction::Scroll(ScrollTarget::Message(id))],
            QuoteTarget::NotVisible => {
                self.notice = Some(Notice::info(QUOTE_NOT_VISIBLE_NOTICE));
                vec![AppAction::Render]
            },
        }
    }

    /// Delete the conversation with `peer`, then reload.
    pub fn delete_conversation(&self, peer: Identity) -> Vec<AppAction> {
        vec![AppAction::DeleteConversation { peer }, AppAction::Render]
    }

    /// Delete all history, then reload.
    pub fn clear_history(&self) -> Vec<AppAction> {
        vec![AppAction::ClearHistory, AppAction::Render]
    }

    /// Quit the application.
    pub fn quit(&self) -> Vec<AppAction> {
        vec![AppAction::Quit]
    }

    fn load(&mut self, messages: Vec<ChatMessage>, users: Vec<User>) -> Vec<AppAction> {
        self.peers = users
            .into_iter()
            .filter(|user| user.identity() != self.identity)
            .map(|user| Peer { user, unread: 0 })
            .collect();

        self.messages.clear();
        self.seen.clear();
        for message in messages {
            if self.seen.insert(message.id()) {
                self.messages.push(message);
            }
        }
        self.bodies.retain(|id, _| self.seen.contains(id));

        if let Some(active) = &self.active_peer
            && !self.peers.iter().any(|p| &p.identity() == active)
        {
            self.active_peer = None;
            self.reply = None;
        }

        for peer in &mut self.peers {
            let identity = peer.identity();
            if self.active_peer.as_ref() == Some(&identity) {
                continue;
            }
            peer.unread = self
                .messages
                .iter()
                .filter(|m| m.sender == identity && m.receiver == self.identity && !m.is_read)
                .count();
        }

        tracing::info!(
            messages = self.messages.len(),
            peers = self.peers.len(),
            "history loaded"
        );

        let first_load = !self.loaded;
        self.loaded = true;

        if first_load && let Some(peer) = self.open_with.take() {
            let actions = self.select_peer(&peer);
            if !actions.is_empty() {
                return actions;
            }
        }

        let mut actions = match self.active_peer.clone() {
            Some(active) => {
                self.mark_conversation_read(&active);
                self.request_decryption()
            },
            None => Vec::new(),
        };
        actions.push(AppAction::Render);
        actions
    }

    fn receive(&mut self, mut message: ChatMessage) -> Vec<AppAction> {
        let id = message.id();
        if !self.seen.insert(id.clone()) {
            tracing::debug!(timestamp = %id.timestamp, sender = %id.sender, "duplicate message");
            return vec![];
        }

        let mut actions = Vec::new();
        let in_view =
            self.active_peer.as_ref().is_some_and(|peer| message.is_between(&self.identity, peer));

        if message.receiver == self.identity && message.sender != self.identity {
            if in_view {
                message.is_read = true;
                actions.push(AppAction::MarkAsRead {
                    reader: self.identity.clone(),
                    author: message.sender.clone(),
                });
            } else if let Some(peer) = self.peer_mut(&message.sender) {
                peer.unread += 1;
            }
        }

        if in_view {
            self.bodies.insert(id, MessageBody::Pending);
            actions.push(AppAction::Decrypt(vec![message.clone()]));
            actions.push(AppAction::Scroll(ScrollTarget::Latest));
        }

        self.messages.push(message);
        actions.push(AppAction::Render);
        actions
    }

    fn read_receipt(&mut self, reader: &Identity, author: &Identity) -> Vec<AppAction> {
        for message in &mut self.messages {
            if &message.sender == author && &message.receiver == reader {
                message.is_read = true;
            }
        }
        if reader == &self.identity
            && let Some(peer) = self.peer_mut(author)
        {
            peer.unread = 0;
        }
        vec![AppAction::Render]
    }

    fn fail(&mut self, error: &ChatError) -> Vec<AppAction> {
        tracing::warn!(error = %error, "action failed");
        if matches!(error, ChatError::Upload(_)) {
            self.uploading = false;
        }
        self.notice = Some(error.notice());
        vec![AppAction::Render]
    }

    /// Mark everything `peer` sent us as read locally and clear the badge.
    fn mark_conversation_read(&mut self, peer: &Identity) {
        for message in &mut self.messages {
            if &message.sender == peer && message.receiver == self.identity {
                message.is_read = true;
            }
        }
        if let Some(entry) = self.peer_mut(peer) {
            entry.unread = 0;
        }
    }

    /// Queue decryption of active conversation bodies not requested yet.
    fn request_decryption(&mut self) -> Vec<AppAction> {
        let Some(peer) = &self.active_peer else {
            return vec![];
        };

        let pending: Vec<ChatMessage> = self
            .messages
            .iter()
            .filter(|m| m.is_between(&self.identity, peer) && !self.bodies.contains_key(&m.id()))
            .cloned()
            .collect();
        if pending.is_empty() {
            return vec![];
        }

        for message in &pending {
            self.bodies.insert(message.id(), MessageBody::Pending);
        }
        vec![AppAction::Decrypt(pending)]
    }

    fn conversation_messages(&self) -> impl Iterator<Item = &ChatMessage> + Clone {
        let me = &self.identity;
        let peer = self.active_peer.as_ref();
        self.messages.iter().filter(move |m| peer.is_some_and(|peer| m.is_between(me, peer)))
    }

    fn peer_mut(&mut self, identity: &Identity) -> Option<&mut Peer> {
        self.peers.iter_mut().find(|p| &p.identity() == identity)
    }

    fn active_peer_entry(&self) -> Option<&Peer> {
        let active = self.active_peer.as_ref()?;
        self.peers.iter().find(|p| &p.identity() == active)
    }

    fn body(&self, id: &MessageId) -> MessageBody {
        self.bodies.get(id).cloned().unwrap_or(MessageBody::Pending)
    }

    /// Signed-in user.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Transport state, for the connection indicator.
    pub fn connection_state(&self) -> ConnectionState {
        self.connection
    }

    /// How the session keys were obtained. `None` until resolved.
    pub fn key_source(&self) -> Option<KeySource> {
        self.key_source
    }

    /// True once history has loaded at least once.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Directory without the current user.
    pub fn peers(&self) -> &[Peer] {
        &self.peers
    }

    /// Unread count for `peer`. Zero for unknown peers.
    pub fn unread(&self, peer: &Identity) -> usize {
        self.peers.iter().find(|p| &p.identity() == peer).map_or(0, |p| p.unread)
    }

    /// Open conversation's peer.
    pub fn active_peer(&self) -> Option<&Peer> {
        self.active_peer_entry()
    }

    /// Every loaded message, all conversations, in arrival order.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Messages of the open conversation in arrival order, with bodies.
    pub fn conversation(&self) -> Vec<DisplayMessage> {
        self.conversation_messages()
            .map(|message| DisplayMessage {
                id: message.id(),
                body: self.body(&message.id()),
                outgoing: message.sender == self.identity,
                message: message.clone(),
            })
            .collect()
    }

    /// Body of `message` as HTML, with site-relative URLs made absolute.
    pub fn body_html(&self, message: &DisplayMessage) -> String {
        resolve_asset_urls(message.body.display(), &self.asset_base)
    }

    /// Pending reply.
    pub fn reply(&self) -> Option<&Quote> {
        self.reply.as_ref()
    }

    /// Pending attachment.
    pub fn attachment(&self) -> Option<&Attachment> {
        self.attachment.as_ref()
    }

    /// True while an upload is in flight.
    pub fn is_uploading(&self) -> bool {
        self.uploading
    }

    /// Latest notice. `None` if nothing to show.
    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Dismiss the current notice.
    pub fn clear_notice(&mut self) {
        self.notice = None;
    }
}
