use hardy_core::ChangeEvent;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

/// Process-wide fan-out of row-change notifications.
#[derive(Clone, Debug)]
pub struct ChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, event: ChangeEvent) {
        match self.tx.send(event) {
            Ok(receivers) => debug!("change event delivered to {receivers} subscriber(s)"),
            Err(_) => debug!("change event dropped, no subscribers"),
        }
    }

    pub fn subscribe(&self) -> ChangeSubscription {
        ChangeSubscription { rx: self.tx.subscribe() }
    }
}

pub struct ChangeSubscription {
    rx: broadcast::Receiver<ChangeEvent>,
}

impl ChangeSubscription {
    /// Waits for the next event. Falling behind yields one resync event
    /// instead of the missed ones; `None` once the feed is gone.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        match self.rx.recv().await {
            Ok(event) => Some(event),
            Err(RecvError::Lagged(missed)) => {
                warn!("change subscriber lagged, {missed} event(s) skipped");
                Some(ChangeEvent::resync())
            }
            Err(RecvError::Closed) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use hardy_core::ChangeKind;

    use super::*;

    fn insert(id: &str) -> ChangeEvent {
        ChangeEvent::new("news", ChangeKind::Insert, Some(id.to_string()))
    }

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let feed = ChangeFeed::new(8);
        let mut a = feed.subscribe();
        let mut b = feed.subscribe();
        feed.publish(insert("1"));

        assert_eq!(a.next().await, Some(insert("1")));
        assert_eq!(b.next().await, Some(insert("1")));
    }

    #[tokio::test]
    async fn lagging_subscriber_gets_resync() {
        let feed = ChangeFeed::new(2);
        let mut sub = feed.subscribe();
        for id in ["1", "2", "3", "4"] {
            feed.publish(insert(id));
        }

        assert_eq!(sub.next().await.map(|e| e.kind), Some(ChangeKind::Resync));
        assert_eq!(sub.next().await, Some(insert("3")));
        assert_eq!(sub.next().await, Some(insert("4")));
    }

    #[tokio::test]
    async fn closed_feed_ends_subscription() {
        let feed = ChangeFeed::new(2);
        let mut sub = feed.subscribe();
        drop(feed);
        assert_eq!(sub.next().await, None);
    }

    #[test]
    fn publish_without_subscribers_is_harmless() {
        ChangeFeed::new(1).publish(insert("x"));
    }
}
