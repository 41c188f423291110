//! Push-style change notification for open views.
//!
//! Writers publish a [`Topic`] on the [`ChangeHub`] after every mutation.
//! Readers hold a [`Subscription`], which re-runs its query whenever its
//! topic fires and hands over the fresh snapshot. Dropping the subscription
//! stops the background task.

use std::future::Future;

use tokio::{sync::{broadcast, mpsc}, task::JoinHandle};
use tracing::debug;

use crate::AppResult;

const HUB_CAPACITY: usize = 256;
const SNAPSHOT_BUFFER: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Topic {
    Listings,
    Conversation(String),
    Inbox(String),
}

#[derive(Clone)]
pub struct ChangeHub {
    tx: broadcast::Sender<Topic>,
}

impl Default for ChangeHub {
    fn default() -> Self {
        Self::new(HUB_CAPACITY)
    }
}

impl ChangeHub {
    pub fn new(capacity: usize) -> Self {
        Self { tx: broadcast::channel(capacity).0 }
    }

    pub fn publish(&self, topic: Topic) {
        // no receivers is fine
        let _ = self.tx.send(topic);
    }

    pub fn subscribe<T, F, Fut>(&self, topic: Topic, query: F) -> Subscription<T>
    where
        T: Send + 'static,
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = AppResult<T>> + Send + 'static,
    {
        let mut changes = self.tx.subscribe();
        let (snapshots, rx) = mpsc::channel(SNAPSHOT_BUFFER);

        let task = tokio::spawn(async move {
            if snapshots.send(query().await).await.is_err() {
                return;
            }

            loop {
                match changes.recv().await {
                    Ok(changed) if changed == topic => {}
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!("{topic:?} subscriber lagged by {skipped}, refreshing");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }

                if snapshots.send(query().await).await.is_err() {
                    break;
                }
            }
        });

        Subscription { rx, task }
    }
}

pub struct Subscription<T> {
    rx: mpsc::Receiver<AppResult<T>>,
    task: JoinHandle<()>,
}

impl<T> Subscription<T> {
    /// The next snapshot. The first call yields the current state.
    pub async fn next(&mut self) -> Option<AppResult<T>> {
        self.rx.recv().await
    }

    pub fn unsubscribe(self) {}
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}
