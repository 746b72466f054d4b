//! Generic runtime for application orchestration.
//!
//! The Runtime drives the chat session, coordinating between:
//! - [`App`]: conversation state machine
//! - [`TransportClient`]: real-time hub connection
//! - [`ChatApi`] / [`KeyManager`]: backend collaborators
//! - [`Driver`]: UI surface
//!
//! Decryption runs on the blocking pool; results come back over a bounded
//! channel and are applied in the event loop like any other event.

use std::sync::Arc;

use quill_client::{Hub, TransportClient};
use quill_core::{
    ChatApi, DecryptionCache, Environment, FileUpload, KeyManager, KeyService, LocalKeyStore,
    MessageDecoder, encode_for_send,
};
use quill_crypto::PublicKey;
use quill_proto::{ChatMessage, Identity, User};
use tokio::sync::mpsc;

use crate::{App, AppAction, AppEvent, Attachment, ChatConfig, ChatError, Driver};

/// Keys and channels fixed for one run.
struct Session {
    identity: Identity,
    public_key: PublicKey,
    decoder: Arc<MessageDecoder>,
    decrypted: mpsc::Sender<AppEvent>,
}

/// Generic runtime that orchestrates App, transport, backend and Driver.
///
/// # Type Parameters
///
/// - `D`: UI driver
/// - `H`: real-time hub
/// - `A`: chat REST collaborator
/// - `K`, `L`: remote and local key storage
/// - `E`: environment for cryptographic randomness
pub struct Runtime<D, H, A, K, L, E> {
    driver: D,
    app: App,
    transport: TransportClient<H>,
    api: A,
    keys: KeyManager<K, L, E>,
    env: E,
    cache: DecryptionCache,
    config: ChatConfig,
}

impl<D, H, A, K, L, E> Runtime<D, H, A, K, L, E>
where
    D: Driver,
    H: Hub,
    A: ChatApi,
    K: KeyService,
    L: LocalKeyStore,
    E: Environment,
{
    /// Create a runtime for `config.identity`.
    pub fn new(
        config: ChatConfig,
        driver: D,
        hub: H,
        api: A,
        keys: KeyManager<K, L, E>,
        env: E,
    ) -> Self {
        Self {
            driver,
            app: App::new(&config),
            transport: TransportClient::new(hub),
            api,
            keys,
            env,
            cache: DecryptionCache::new(),
            config,
        }
    }

    /// Run the session until the user quits or the driver goes away.
    ///
    /// 1. Resolves the session key pair (once)
    /// 2. Starts the transport and loads history and directory
    /// 3. Multiplexes user commands, transport events and decrypted bodies
    /// 4. Stops the transport on the way out
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails. Transport and backend failures
    /// are reported to the user and do not end the session.
    pub async fn run(mut self) -> Result<(), D::Error> {
        self.driver.render(&self.app)?;

        let capacity = self.config.decrypt_channel_capacity.max(1);
        let (decrypted, mut decrypted_rx) = mpsc::channel(capacity);
        let session = self.resolve_keys(decrypted).await?;

        let result = self.event_loop(&session, &mut decrypted_rx).await;
        self.transport.stop().await;
        result
    }

    async fn event_loop(
        &mut self,
        session: &Session,
        decrypted_rx: &mut mpsc::Receiver<AppEvent>,
    ) -> Result<(), D::Error> {
        if let Err(err) = self.transport.start().await {
            let actions = self.app.handle(AppEvent::Failed(err.into()));
            if self.process_actions(session, actions).await? {
                return Ok(());
            }
        }

        let actions = self.app.load_history();
        if self.process_actions(session, actions).await? {
            return Ok(());
        }

        let mut transport_open = true;
        loop {
            let event = tokio::select! {
                command = self.driver.next_command() => match command? {
                    Some(command) => AppEvent::Command(command),
                    None => {
                        tracing::debug!("driver closed");
                        return Ok(());
                    },
                },
                event = self.transport.next_event(), if transport_open => match event {
                    Some(event) => AppEvent::from(event),
                    None => {
                        tracing::info!("transport closed");
                        transport_open = false;
                        continue;
                    },
                },
                Some(event) = decrypted_rx.recv() => event,
            };

            let actions = self.app.handle(event);
            if self.process_actions(session, actions).await? {
                return Ok(());
            }
        }
    }

    /// Process actions returned by the App.
    ///
    /// Returns `true` if should quit.
    async fn process_actions(
        &mut self,
        session: &Session,
        initial_actions: Vec<AppAction>,
    ) -> Result<bool, D::Error> {
        let mut pending_actions = initial_actions;

        while !pending_actions.is_empty() {
            let actions = std::mem::take(&mut pending_actions);

            for action in actions {
                let events = match action {
                    AppAction::Render => {
                        self.driver.render(&self.app)?;
                        Vec::new()
                    },
                    AppAction::Quit => return Ok(true),
                    AppAction::Scroll(target) => {
                        self.driver.scroll_to(&target)?;
                        Vec::new()
                    },
                    AppAction::Decrypt(messages) => {
                        self.dispatch_decryption(session, messages);
                        Vec::new()
                    },
                    AppAction::MarkAsRead { reader, author } => {
                        self.transport.mark_as_read(&reader, &author).await;
                        Vec::new()
                    },
                    AppAction::FetchHistory => vec![self.fetch_history().await],
                    AppAction::UploadFile(file) => vec![self.upload(file).await],
                    AppAction::SendMessage { peer, body } => self.send(session, &peer, &body).await,
                    AppAction::DeleteConversation { peer } => {
                        match self.api.delete_conversation(&peer).await {
                            Ok(()) => vec![AppEvent::ConversationDeleted { peer }],
                            Err(err) => vec![AppEvent::Failed(err.into())],
                        }
                    },
                    AppAction::ClearHistory => match self.api.clear_history().await {
                        Ok(()) => vec![AppEvent::HistoryCleared],
                        Err(err) => vec![AppEvent::Failed(err.into())],
                    },
                };

                for event in events {
                    pending_actions.extend(self.app.handle(event));
                }
            }
        }
        Ok(false)
    }

    async fn resolve_keys(
        &mut self,
        decrypted: mpsc::Sender<AppEvent>,
    ) -> Result<Session, D::Error> {
        let resolved = self.keys.resolve().await;
        let actions = self.app.handle(AppEvent::KeysResolved { source: resolved.source });
        if actions.contains(&AppAction::Render) {
            self.driver.render(&self.app)?;
        }

        let identity = self.config.identity.clone();
        let key_pair = resolved.key_pair;
        Ok(Session {
            public_key: *key_pair.public_key(),
            decoder: Arc::new(MessageDecoder::new(
                identity.clone(),
                key_pair.private_key().clone(),
            )),
            identity,
            decrypted,
        })
    }

    async fn fetch_history(&self) -> AppEvent {
        match tokio::try_join!(self.api.chat_history(), self.api.users()) {
            Ok((messages, users)) => AppEvent::HistoryLoaded { messages, users },
            Err(err) => AppEvent::LoadFailed { error: err.into() },
        }
    }

    async fn upload(&self, file: FileUpload) -> AppEvent {
        match self.api.upload_file(file.clone()).await {
            Ok(uploaded) => AppEvent::FileUploaded(Attachment::new(&file, uploaded)),
            Err(err) => AppEvent::Failed(ChatError::Upload(err)),
        }
    }

    /// Encode for the peer (or fall back to plaintext) and hand to the hub.
    async fn send(&mut self, session: &Session, peer: &User, body: &str) -> Vec<AppEvent> {
        let outgoing =
            match encode_for_send(body, &session.identity, &session.public_key, peer, &self.env) {
                Ok(outgoing) => outgoing,
                Err(err) => return vec![AppEvent::Failed(err.into())],
            };

        let mut events = Vec::new();
        if !outgoing.encrypted {
            events.push(AppEvent::PlaintextFallback);
        }

        match self.transport.send(&session.identity, &peer.identity(), outgoing.content).await {
            Ok(()) => events.push(AppEvent::MessageSent),
            Err(err) => events.push(AppEvent::Failed(err.into())),
        }
        events
    }

    /// Decrypt `messages` on the blocking pool, memoized by the cache.
    fn dispatch_decryption(&self, session: &Session, messages: Vec<ChatMessage>) {
        let cache = self.cache.clone();
        let decoder = Arc::clone(&session.decoder);
        let decrypted = session.decrypted.clone();

        tokio::task::spawn_blocking(move || {
            for message in messages {
                let result = cache.get_or_decrypt(&message, decoder.as_ref());
                let event = AppEvent::Decrypted { id: message.id(), result };
                if decrypted.blocking_send(event).is_err() {
                    tracing::debug!("event loop gone, dropping decrypted bodies");
                    return;
                }
            }
        });
    }
}
