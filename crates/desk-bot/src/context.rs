//! Per-user menu context actor.
//!
//! Records which messages belong to a pending wallet menu so the follow-up
//! selection knows what to clean up. The map is owned by a single task;
//! the dispatcher talks to it through a cloneable [`ContextStoreHandle`].
//!
//! - `insert` is last-write-wins and hands back the context it replaced
//! - `take` reads and removes in one step, so a context is consumed once

use desk_chat::{ChatId, MessageId};
use std::collections::HashMap;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

/// Messages of one pending menu flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InteractionContext {
    pub chat_id: ChatId,
    /// The user's command message.
    pub command_message_id: MessageId,
    /// The menu the bot sent in reply.
    pub menu_message_id: MessageId,
}

impl InteractionContext {
    pub fn message_ids(&self) -> [MessageId; 2] {
        [self.command_message_id, self.menu_message_id]
    }
}

/// Messages for the context store actor.
#[derive(Debug)]
pub enum ContextMsg {
    Insert {
        user_id: i64,
        context: InteractionContext,
        reply: oneshot::Sender<Option<InteractionContext>>,
    },
    Take {
        user_id: i64,
        reply: oneshot::Sender<Option<InteractionContext>>,
    },
    Len {
        reply: oneshot::Sender<usize>,
    },
    Shutdown,
}

/// Actor task owning the context map.
pub struct ContextStoreTask {
    rx: mpsc::Receiver<ContextMsg>,
    contexts: HashMap<i64, InteractionContext>,
}

impl ContextStoreTask {
    /// Process messages until `Shutdown` or every handle is dropped.
    pub async fn run(mut self) {
        debug!("ContextStoreTask started");

        while let Some(msg) = self.rx.recv().await {
            match msg {
                ContextMsg::Shutdown => {
                    debug!("ContextStoreTask shutting down");
                    break;
                }
                msg => self.handle_message(msg),
            }
        }

        debug!(pending = self.contexts.len(), "ContextStoreTask terminated");
    }

    fn handle_message(&mut self, msg: ContextMsg) {
        match msg {
            ContextMsg::Insert {
                user_id,
                context,
                reply,
            } => {
                let replaced = self.contexts.insert(user_id, context);
                trace!(user_id, replaced = replaced.is_some(), "Context stored");
                let _ = reply.send(replaced);
            }
            ContextMsg::Take { user_id, reply } => {
                let taken = self.contexts.remove(&user_id);
                trace!(user_id, found = taken.is_some(), "Context taken");
                let _ = reply.send(taken);
            }
            ContextMsg::Len { reply } => {
                let _ = reply.send(self.contexts.len());
            }
            ContextMsg::Shutdown => {}
        }
    }
}

/// Handle to the context store actor.
#[derive(Clone)]
pub struct ContextStoreHandle {
    tx: mpsc::Sender<ContextMsg>,
}

impl ContextStoreHandle {
    /// Store `context` for `user_id`, returning the one it replaced.
    pub async fn insert(
        &self,
        user_id: i64,
        context: InteractionContext,
    ) -> Option<InteractionContext> {
        let (reply, rx) = oneshot::channel();
        let msg = ContextMsg::Insert {
            user_id,
            context,
            reply,
        };
        self.request(msg, rx).await.flatten()
    }

    /// Remove and return the context of `user_id`.
    pub async fn take(&self, user_id: i64) -> Option<InteractionContext> {
        let (reply, rx) = oneshot::channel();
        self.request(ContextMsg::Take { user_id, reply }, rx)
            .await
            .flatten()
    }

    /// Number of pending contexts.
    pub async fn len(&self) -> usize {
        let (reply, rx) = oneshot::channel();
        self.request(ContextMsg::Len { reply }, rx)
            .await
            .unwrap_or(0)
    }

    pub async fn shutdown(&self) {
        let _ = self.tx.send(ContextMsg::Shutdown).await;
    }

    async fn request<T>(&self, msg: ContextMsg, rx: oneshot::Receiver<T>) -> Option<T> {
        if self.tx.send(msg).await.is_err() {
            warn!("Context store is not running");
            return None;
        }
        rx.await.ok()
    }
}

/// Spawn the context store actor.
///
/// Returns a handle for interaction and a join handle for the task.
#[must_use]
pub fn spawn_context_store(capacity: usize) -> (ContextStoreHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let task = ContextStoreTask {
        rx,
        contexts: HashMap::new(),
    };
    let join_handle = tokio::spawn(task.run());
    (ContextStoreHandle { tx }, join_handle)
}
