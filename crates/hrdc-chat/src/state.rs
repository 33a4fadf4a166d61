use std::sync::Arc;

use hrdc_types::Thread;

/// Snapshot published after every change
///
/// `threads` is replaced whole on each mutation, so a receiver never sees a
/// half-applied update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatState {
    pub threads: Arc<Vec<Thread>>,
    pub current_thread_id: Option<String>,
    /// True for the whole duration of a send
    pub sending: bool,
    /// Step reached by the send in flight, `Idle` between sends
    pub phase: SendPhase,
}

impl ChatState {
    pub fn thread(&self, thread_id: &str) -> Option<&Thread> {
        self.threads.iter().find(|t| t.id == thread_id)
    }

    pub fn current_thread(&self) -> Option<&Thread> {
        self.current_thread_id
            .as_deref()
            .and_then(|id| self.thread(id))
    }
}

/// Steps of one send, in order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SendPhase {
    #[default]
    Idle,
    ThreadResolved,
    UserMessagePersisted,
    TitleReconciled,
    AwaitingResponder,
    ResponderSettled { success: bool },
}

impl SendPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SendPhase::Idle => "idle",
            SendPhase::ThreadResolved => "thread_resolved",
            SendPhase::UserMessagePersisted => "user_message_persisted",
            SendPhase::TitleReconciled => "title_reconciled",
            SendPhase::AwaitingResponder => "awaiting_responder",
            SendPhase::ResponderSettled { success: true } => "responder_succeeded",
            SendPhase::ResponderSettled { success: false } => "responder_failed",
        }
    }
}
