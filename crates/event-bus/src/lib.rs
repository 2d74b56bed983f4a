//! In-memory event bus used to fan session lifecycle events out to
//! any number of independent subscribers.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;

use webscout_core_types::ScoutError;

/// Trait implemented by payload types that can be carried on the bus.
pub trait Event: Clone + Send + Sync + std::fmt::Debug + 'static {}

impl<T> Event for T where T: Clone + Send + Sync + std::fmt::Debug + 'static {}

#[async_trait]
pub trait EventBus<E>: Send + Sync
where
    E: Event,
{
    async fn publish(&self, event: E) -> Result<(), ScoutError>;
    fn subscribe(&self) -> broadcast::Receiver<E>;
}

/// Broadcast-backed bus. Subscribers attach and detach freely without
/// affecting each other or the publisher; a publish with no subscribers
/// is not an error.
pub struct InMemoryBus<E>
where
    E: Event,
{
    sender: broadcast::Sender<E>,
}

impl<E> InMemoryBus<E>
where
    E: Event,
{
    pub fn new(capacity: usize) -> Arc<Self> {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Arc::new(Self { sender })
    }
}

#[async_trait]
impl<E> EventBus<E> for InMemoryBus<E>
where
    E: Event,
{
    async fn publish(&self, event: E) -> Result<(), ScoutError> {
        // A send error only means nobody is listening right now.
        let _ = self.sender.send(event);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<E> {
        self.sender.subscribe()
    }
}
