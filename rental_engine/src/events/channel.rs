//! Simple stateless pub-sub event handler
//!
//! This module provides a simple hook system that allows other components to subscribe to rental engine events and
//! react to them. Handlers are stateless: they receive the event and nothing else. They can be async.
//!
//! Events are published *after* the transaction that produced them has committed, so a hook never observes a change
//! that is later rolled back.
use std::{future::Future, pin::Pin, sync::Arc};

use log::*;
use tokio::{sync::mpsc, task::JoinSet};

pub type Handler<E> = Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

pub struct EventHandler<E: Send + Sync + 'static> {
    listener: mpsc::Receiver<E>,
    sender: mpsc::Sender<E>,
    handler: Handler<E>,
}

impl<E: Send + Sync + 'static> EventHandler<E> {
    pub fn new(buffer_size: usize, handler: Handler<E>) -> Self {
        let (sender, receiver) = mpsc::channel(buffer_size.max(1));
        Self { listener: receiver, sender, handler }
    }

    pub fn subscribe(&self) -> EventProducer<E> {
        EventProducer::new(self.sender.clone())
    }

    /// Runs the handler until every producer has been dropped, then waits for in-flight hooks to finish.
    pub async fn start_handler(mut self) {
        debug!("📬️ Starting event handler");
        // Only the subscribers keep the channel open from here on
        drop(self.sender);
        let mut jobs = JoinSet::new();
        while let Some(ev) = self.listener.recv().await {
            trace!("📬️ Handling event");
            let handler = Arc::clone(&self.handler);
            jobs.spawn(async move { (handler)(ev).await });
            // Reap finished hooks so the set does not grow without bound on a long-lived channel
            while let Some(res) = jobs.try_join_next() {
                log_join_result(res);
            }
        }
        if !jobs.is_empty() {
            debug!("📬️ Waiting for {} hooks to complete", jobs.len());
        }
        while let Some(res) = jobs.join_next().await {
            log_join_result(res);
        }
        debug!("📬️ Event handler has shut down");
    }
}

fn log_join_result(res: Result<(), tokio::task::JoinError>) {
    match res {
        Ok(()) => trace!("📬️ Event handled"),
        Err(e) => warn!("📬️ An event hook failed to complete: {e}"),
    }
}

#[derive(Clone)]
pub struct EventProducer<E: Send + Sync> {
    sender: mpsc::Sender<E>,
}

impl<E: Send + Sync> EventProducer<E> {
    pub fn new(sender: mpsc::Sender<E>) -> Self {
        Self { sender }
    }

    pub async fn publish_event(&self, event: E) {
        if let Err(e) = self.sender.send(event).await {
            error!("📬️ Failed to send event: {e}");
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicI64, Ordering};

    use super::*;
    use crate::db_types::Money;

    #[tokio::test]
    async fn every_published_event_reaches_the_handler() {
        let _ = env_logger::try_init();
        let total = Arc::new(AtomicI64::new(0));
        let t2 = total.clone();
        let handler = Arc::new(move |amount: Money| {
            let total = total.clone();
            Box::pin(async move {
                tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
                total.fetch_add(amount.value(), Ordering::SeqCst);
            }) as Pin<Box<dyn Future<Output = ()> + Send>>
        });
        let event_handler = EventHandler::new(1, handler);
        let credits = event_handler.subscribe();
        let debits = event_handler.subscribe();
        tokio::spawn(async move {
            for i in 1..=5 {
                credits.publish_event(Money::from(i * 1000)).await;
            }
        });
        tokio::spawn(async move {
            for i in 1..=4 {
                debits.publish_event(Money::from(-i * 500)).await;
            }
        });

        event_handler.start_handler().await;
        assert_eq!(t2.load(Ordering::SeqCst), 15_000 - 5_000);
    }
}
