//! Owner of the thread collection of the current identity.
//!
//! Every mutation goes through the `watch` channel as a whole new
//! [`ChatState`]. An identity epoch is bumped whenever the identity id
//! changes; work started under an older epoch never publishes.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};

use chrono::Utc;
use hrdc_persist::{ConversationStore, NewMessage, NewThread};
use hrdc_responder::{Responder, ResponderError, ResponderRequest};
use hrdc_types::{derive_title, Identity, Message, Thread, DEFAULT_THREAD_TITLE};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::SyncConfig;
use crate::error::{ChatError, Result};
use crate::state::{ChatState, SendPhase};

/// Text of the synthetic message appended after a failed exchange
pub const APOLOGY_MESSAGE: &str =
    "I apologize, but I encountered an issue processing your request. Please try again.";

/// A load that must only publish while `epoch` is current
struct LoadTicket {
    identity: Identity,
    epoch: u64,
}

/// Holds `sending` high until dropped, then returns the phase to `Idle`
struct SendingGuard<'a> {
    state: &'a watch::Sender<ChatState>,
}

impl<'a> SendingGuard<'a> {
    fn new(state: &'a watch::Sender<ChatState>) -> Self {
        state.send_modify(|s| s.sending = true);
        Self { state }
    }
}

impl Drop for SendingGuard<'_> {
    fn drop(&mut self) {
        self.state.send_modify(|s| {
            s.sending = false;
            s.phase = SendPhase::Idle;
        });
        tracing::debug!(phase = SendPhase::Idle.as_str(), "Send pipeline");
    }
}

pub struct ConversationSynchronizer {
    store: Arc<dyn ConversationStore>,
    responder: Arc<dyn Responder>,
    config: SyncConfig,
    state: watch::Sender<ChatState>,
    identity: RwLock<Option<Identity>>,
    epoch: AtomicU64,
}

impl ConversationSynchronizer {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        responder: Arc<dyn Responder>,
        config: SyncConfig,
    ) -> Self {
        let (state, _) = watch::channel(ChatState::default());
        Self {
            store,
            responder,
            config,
            state,
            identity: RwLock::new(None),
            epoch: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ChatState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> ChatState {
        self.state.borrow().clone()
    }

    pub fn threads(&self) -> Arc<Vec<Thread>> {
        self.state.borrow().threads.clone()
    }

    pub fn current_thread(&self) -> Option<Thread> {
        self.state.borrow().current_thread().cloned()
    }

    pub fn is_sending(&self) -> bool {
        self.state.borrow().sending
    }

    pub fn identity(&self) -> Option<Identity> {
        self.identity
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Follow an identity stream in a background task
    ///
    /// `project` extracts the identity from each published value. Loads run
    /// in their own tasks so a newer identity is applied without waiting for
    /// an older load to settle.
    pub fn bind<T, F>(self: &Arc<Self>, mut source: watch::Receiver<T>, project: F) -> JoinHandle<()>
    where
        T: Send + Sync + 'static,
        F: Fn(&T) -> Option<Identity> + Send + 'static,
    {
        let synchronizer: Weak<Self> = Arc::downgrade(self);

        tokio::spawn(async move {
            loop {
                let identity = project(&*source.borrow_and_update());
                let Some(this) = synchronizer.upgrade() else {
                    break;
                };
                if let Some(ticket) = this.apply_identity(identity) {
                    let loader = Arc::clone(&this);
                    tokio::spawn(async move { loader.load_with(ticket).await });
                }
                drop(this);

                if source.changed().await.is_err() {
                    break;
                }
            }
            tracing::debug!("Identity binding stopped");
        })
    }

    /// Switch to `identity`, loading its threads when the id changed
    pub async fn set_identity(&self, identity: Option<Identity>) {
        if let Some(ticket) = self.apply_identity(identity) {
            self.load_with(ticket).await;
        }
    }

    /// Reload the threads of the current identity
    pub async fn load(&self) {
        let Some(identity) = self.identity() else {
            self.reset();
            return;
        };
        let epoch = self.epoch.load(Ordering::SeqCst);
        self.load_with(LoadTicket { identity, epoch }).await;
    }

    fn apply_identity(&self, identity: Option<Identity>) -> Option<LoadTicket> {
        let mut current = self
            .identity
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let same_id = match (current.as_ref(), identity.as_ref()) {
            (Some(a), Some(b)) => a.id == b.id,
            (None, None) => true,
            _ => false,
        };
        *current = identity.clone();
        drop(current);

        if same_id {
            return None;
        }

        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.reset();
        match identity {
            Some(identity) => {
                tracing::debug!(user_id = %identity.id, epoch, "Identity changed, loading threads");
                Some(LoadTicket { identity, epoch })
            }
            None => {
                tracing::debug!(epoch, "Identity cleared");
                None
            }
        }
    }

    async fn load_with(&self, ticket: LoadTicket) {
        let user_id = ticket.identity.id.as_str();
        let result = self
            .with_timeout("list_threads", self.store.list_threads(user_id))
            .await;

        if self.epoch.load(Ordering::SeqCst) != ticket.epoch {
            tracing::debug!(user_id, "Discarding load for a stale identity");
            return;
        }

        let threads: Vec<Thread> = match result {
            Ok(records) => records.into_iter().map(Thread::from).collect(),
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Failed to load threads");
                Vec::new()
            }
        };
        tracing::info!(user_id, count = threads.len(), "Threads loaded");

        self.update(ticket.epoch, |state| {
            if let Some(id) = &state.current_thread_id {
                if !threads.iter().any(|t| &t.id == id) {
                    state.current_thread_id = None;
                }
            }
            state.threads = Arc::new(threads);
        });
    }

    fn reset(&self) {
        self.state.send_modify(|state| {
            state.threads = Arc::new(Vec::new());
            state.current_thread_id = None;
        });
    }

    /// Apply `f` only while `epoch` is still current
    fn update<F>(&self, epoch: u64, f: F) -> bool
    where
        F: FnOnce(&mut ChatState),
    {
        self.state.send_if_modified(|state| {
            if self.epoch.load(Ordering::SeqCst) != epoch {
                return false;
            }
            f(state);
            true
        })
    }

    async fn with_timeout<T, F>(&self, operation: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = hrdc_persist::Result<T>>,
    {
        let after = self.config.store_timeout();
        match tokio::time::timeout(after, fut).await {
            Ok(result) => result.map_err(ChatError::from),
            Err(_) => Err(ChatError::Timeout { operation, after }),
        }
    }

    /// Create a thread, put it first and select it
    pub async fn create_thread(&self, title: Option<&str>) -> Result<Thread> {
        let identity = self.identity().ok_or(ChatError::NotAuthenticated)?;
        let epoch = self.epoch.load(Ordering::SeqCst);
        let title = title.unwrap_or(DEFAULT_THREAD_TITLE);

        let record = self
            .with_timeout("insert_thread", self.store.insert_thread(NewThread::new(&identity.id, title)))
            .await?;
        let thread = Thread::from(record);
        tracing::info!(thread_id = %thread.id, user_id = %identity.id, "Thread created");

        self.update(epoch, |state| {
            let mut threads = Vec::with_capacity(state.threads.len() + 1);
            threads.push(thread.clone());
            threads.extend(state.threads.iter().cloned());
            state.threads = Arc::new(threads);
            state.current_thread_id = Some(thread.id.clone());
        });
        Ok(thread)
    }

    /// Run one user turn and return the reply message
    ///
    /// When the exchange fails after the user message was stored, an apology
    /// message flagged `is_error` is stored and appended instead, and the
    /// original error is returned.
    pub async fn send_message(&self, text: &str, thread_id: Option<&str>) -> Result<Message> {
        let identity = self.identity().ok_or(ChatError::NotAuthenticated)?;
        let epoch = self.epoch.load(Ordering::SeqCst);
        let _sending = SendingGuard::new(&self.state);

        let thread = self.resolve_thread(thread_id).await?;
        let thread_id = thread.id.as_str();
        self.enter_phase(thread_id, SendPhase::ThreadResolved);

        let user_record = self
            .with_timeout("insert_message", self.store.insert_message(NewMessage::user(thread_id, text)))
            .await?;
        self.enter_phase(thread_id, SendPhase::UserMessagePersisted);

        let title = if thread.messages.is_empty() {
            let title = derive_title(text);
            self.with_timeout(
                "update_thread_title",
                self.store.update_thread_title(thread_id, &title, Utc::now()),
            )
            .await?;
            Some(title)
        } else {
            None
        };
        self.enter_phase(thread_id, SendPhase::TitleReconciled);

        self.append_message(epoch, thread_id, Message::from(user_record), title);
        self.enter_phase(thread_id, SendPhase::AwaitingResponder);

        let request = ResponderRequest::new(text, &identity, thread_id);
        match self.exchange(thread_id, request).await {
            Ok(reply) => {
                self.enter_phase(thread_id, SendPhase::ResponderSettled { success: true });
                self.append_message(epoch, thread_id, reply.clone(), None);
                Ok(reply)
            }
            Err(e) => {
                self.enter_phase(thread_id, SendPhase::ResponderSettled { success: false });
                tracing::warn!(thread_id, error = %e, "Exchange failed, appending apology");
                let apology = NewMessage::ai_error(thread_id, APOLOGY_MESSAGE);
                match self.with_timeout("insert_message", self.store.insert_message(apology)).await {
                    Ok(record) => self.append_message(epoch, thread_id, Message::from(record), None),
                    Err(persist_error) => {
                        tracing::error!(thread_id, error = %persist_error, "Failed to store apology message");
                    }
                }
                Err(e)
            }
        }
    }

    fn enter_phase(&self, thread_id: &str, phase: SendPhase) {
        tracing::debug!(thread_id, phase = phase.as_str(), "Send pipeline");
        self.state.send_modify(|s| s.phase = phase);
    }

    /// Responder call plus storage of its reply
    async fn exchange(&self, thread_id: &str, request: ResponderRequest) -> Result<Message> {
        let after = self.config.responder_timeout();
        let reply = match tokio::time::timeout(after, self.responder.respond(request)).await {
            Ok(reply) => reply?,
            Err(_) => return Err(ResponderError::Timeout(after).into()),
        };
        let record = self
            .with_timeout("insert_message", self.store.insert_message(NewMessage::ai(thread_id, reply)))
            .await?;
        Ok(Message::from(record))
    }

    /// Explicit thread if known, else the current one, else a new thread
    async fn resolve_thread(&self, thread_id: Option<&str>) -> Result<Thread> {
        let resolved = {
            let state = self.state.borrow();
            thread_id
                .and_then(|id| state.thread(id))
                .or_else(|| state.current_thread())
                .cloned()
        };
        match resolved {
            Some(thread) => Ok(thread),
            None => self.create_thread(None).await,
        }
    }

    fn append_message(&self, epoch: u64, thread_id: &str, message: Message, title: Option<String>) {
        let updated_at = Utc::now();
        self.update(epoch, |state| {
            let threads = state
                .threads
                .iter()
                .map(|thread| {
                    if thread.id != thread_id {
                        return thread.clone();
                    }
                    let mut updated = thread.with_message(message.clone(), updated_at);
                    if let Some(title) = &title {
                        updated.title = title.clone();
                    }
                    updated
                })
                .collect();
            state.threads = Arc::new(threads);
        });
    }

    /// Delete a thread and its messages
    pub async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        let epoch = self.epoch.load(Ordering::SeqCst);
        self.with_timeout("delete_thread", self.store.delete_thread(thread_id))
            .await?;
        tracing::info!(thread_id, "Thread deleted");

        self.update(epoch, |state| {
            let threads = state
                .threads
                .iter()
                .filter(|t| t.id != thread_id)
                .cloned()
                .collect();
            state.threads = Arc::new(threads);
            if state.current_thread_id.as_deref() == Some(thread_id) {
                state.current_thread_id = None;
            }
        });
        Ok(())
    }

    /// Point the selection at `thread_id`, or at nothing if it is unknown
    pub fn select_thread(&self, thread_id: &str) -> bool {
        let mut found = false;
        self.state.send_if_modified(|state| {
            found = state.thread(thread_id).is_some();
            let next = found.then(|| thread_id.to_string());
            if state.current_thread_id == next {
                return false;
            }
            state.current_thread_id = next;
            true
        });
        found
    }

    /// Delete every thread of the identity, then empty local state regardless
    pub async fn clear_all(&self) -> Result<()> {
        let identity = self.identity().ok_or(ChatError::NotAuthenticated)?;
        let result = self
            .with_timeout("delete_threads_for_user", self.store.delete_threads_for_user(&identity.id))
            .await;
        if let Err(e) = &result {
            tracing::warn!(user_id = %identity.id, error = %e, "Failed to delete threads remotely");
        }
        self.reset();
        result
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use hrdc_persist::MemoryStore;
    use hrdc_responder::ScriptedResponder;
    use hrdc_types::AuthUser;

    fn synchronizer() -> ConversationSynchronizer {
        ConversationSynchronizer::new(
            Arc::new(MemoryStore::new()),
            Arc::new(ScriptedResponder::new()),
            SyncConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_same_id_does_not_bump_epoch() {
        let sync = synchronizer();
        let mut identity = Identity::minimal(&AuthUser::new("u-1", "a@example.com"));

        sync.set_identity(Some(identity.clone())).await;
        let epoch = sync.epoch.load(Ordering::SeqCst);

        identity.first_name = "Ada".to_string();
        sync.set_identity(Some(identity)).await;

        assert_eq!(sync.epoch.load(Ordering::SeqCst), epoch);
        assert_eq!(sync.identity().unwrap().first_name, "Ada");
    }

    #[tokio::test]
    async fn test_operations_require_identity() {
        let sync = synchronizer();
        assert!(matches!(
            sync.create_thread(None).await,
            Err(ChatError::NotAuthenticated)
        ));
        assert!(matches!(
            sync.send_message("hi", None).await,
            Err(ChatError::NotAuthenticated)
        ));
        assert!(!sync.is_sending());
    }

    #[test]
    fn test_phase_names() {
        assert_eq!(SendPhase::ResponderSettled { success: false }.as_str(), "responder_failed");
        assert_eq!(SendPhase::Idle.as_str(), "idle");
    }
}
