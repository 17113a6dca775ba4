//! Subject-keyed broadcast channels.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

const DEFAULT_CAPACITY: usize = 256;
const INBOX_PREFIX: &str = "_INBOX.";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EventBusError {
    #[error("event bus is closed")]
    Closed,

    #[error("no responders for subject `{0}`")]
    NoResponders(String),

    #[error("request on `{subject}` timed out after {timeout:?}")]
    Timeout { subject: String, timeout: Duration },

    #[error("message on `{0}` has no reply subject")]
    NoReplySubject(String),
}

/// A published message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub subject: String,
    /// Where `respond` sends its answer, set by `request`.
    pub reply: Option<String>,
    pub payload: Bytes,
}

struct Inner {
    subjects: DashMap<String, broadcast::Sender<Message>>,
    capacity: usize,
    closed: AtomicBool,
}

/// Handle to the bus. Clones share the same subjects.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Inner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// `capacity` bounds how far a subscriber may fall behind per subject.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                subjects: DashMap::new(),
                capacity: capacity.max(1),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Publish `payload` on `subject`. Returns how many subscribers got it.
    pub fn publish(&self, subject: &str, payload: impl Into<Bytes>) -> Result<usize, EventBusError> {
        self.send(Message {
            subject: subject.to_string(),
            reply: None,
            payload: payload.into(),
        })
    }

    pub fn subscribe(&self, subject: &str) -> Result<Subscription, EventBusError> {
        self.ensure_open()?;
        let rx = self
            .inner
            .subjects
            .entry(subject.to_string())
            .or_insert_with(|| broadcast::channel(self.inner.capacity).0)
            .subscribe();
        tracing::debug!(subject, "Subscribed");
        Ok(Subscription {
            subject: subject.to_string(),
            rx,
        })
    }

    /// Publish and wait for the first reply.
    pub async fn request(
        &self,
        subject: &str,
        payload: impl Into<Bytes>,
        timeout: Duration,
    ) -> Result<Message, EventBusError> {
        let inbox = format!("{INBOX_PREFIX}{}", Uuid::new_v4().simple());
        let mut replies = self.subscribe(&inbox)?;

        let delivered = self.send(Message {
            subject: subject.to_string(),
            reply: Some(inbox.clone()),
            payload: payload.into(),
        });
        let result = match delivered {
            Ok(0) => Err(EventBusError::NoResponders(subject.to_string())),
            Ok(_) => match tokio::time::timeout(timeout, replies.next()).await {
                Ok(Some(reply)) => Ok(reply),
                Ok(None) => Err(EventBusError::Closed),
                Err(_) => Err(EventBusError::Timeout {
                    subject: subject.to_string(),
                    timeout,
                }),
            },
            Err(e) => Err(e),
        };

        drop(replies);
        self.inner
            .subjects
            .remove_if(&inbox, |_, tx| tx.receiver_count() == 0);
        result
    }

    /// Answer a message received through `request`.
    pub fn respond(&self, message: &Message, payload: impl Into<Bytes>) -> Result<usize, EventBusError> {
        let reply = message
            .reply
            .as_deref()
            .ok_or_else(|| EventBusError::NoReplySubject(message.subject.clone()))?;
        self.publish(reply, payload)
    }

    /// Drop every subject. Subscriptions end and further calls fail.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.subjects.clear();
        tracing::info!("Event bus closed");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Subjects that currently have a channel.
    pub fn subject_count(&self) -> usize {
        self.inner.subjects.len()
    }

    fn send(&self, message: Message) -> Result<usize, EventBusError> {
        self.ensure_open()?;
        let subject = message.subject.clone();

        let delivered = match self.inner.subjects.get(&subject) {
            Some(tx) => tx.send(message).unwrap_or(0),
            None => 0,
        };
        if delivered == 0 {
            // Every subscriber went away; forget the channel.
            self.inner
                .subjects
                .remove_if(&subject, |_, tx| tx.receiver_count() == 0);
        }
        tracing::trace!(subject = %subject, delivered, "Published");
        Ok(delivered)
    }

    fn ensure_open(&self) -> Result<(), EventBusError> {
        if self.is_closed() {
            Err(EventBusError::Closed)
        } else {
            Ok(())
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Messages arriving on one subject.
pub struct Subscription {
    subject: String,
    rx: broadcast::Receiver<Message>,
}

impl Subscription {
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// The next message, or `None` once the bus is closed.
    pub async fn next(&mut self) -> Option<Message> {
        loop {
            match self.rx.recv().await {
                Ok(message) => return Some(message),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(subject = %self.subject, skipped, "Subscriber lagged; messages dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_every_subscriber() {
        let bus = EventBus::new();
        let mut a = bus.subscribe("orders.created").unwrap();
        let mut b = bus.subscribe("orders.created").unwrap();
        let mut other = bus.subscribe("orders.deleted").unwrap();

        assert_eq!(bus.publish("orders.created", "42").unwrap(), 2);

        assert_eq!(a.next().await.unwrap().payload, Bytes::from("42"));
        assert_eq!(b.next().await.unwrap().subject, "orders.created");
        bus.close();
        assert!(other.next().await.is_none());
    }

    #[test]
    fn test_publish_without_subscribers_is_dropped() {
        let bus = EventBus::new();
        assert_eq!(bus.publish("nobody", "hello").unwrap(), 0);

        let sub = bus.subscribe("gone").unwrap();
        drop(sub);
        assert_eq!(bus.publish("gone", "hello").unwrap(), 0);
        assert_eq!(bus.subject_count(), 0);
    }

    #[tokio::test]
    async fn test_request_reply() {
        let bus = EventBus::new();
        let mut service = bus.subscribe("math.double").unwrap();

        let responder = bus.clone();
        tokio::spawn(async move {
            while let Some(msg) = service.next().await {
                let n: u32 = std::str::from_utf8(&msg.payload).unwrap().parse().unwrap();
                responder.respond(&msg, (n * 2).to_string()).unwrap();
            }
        });

        let reply = bus.request("math.double", "21", Duration::from_secs(1)).await.unwrap();
        assert_eq!(reply.payload, Bytes::from("42"));
        // Only the responder's subject is left; the inbox was removed.
        assert_eq!(bus.subject_count(), 1);
    }

    #[tokio::test]
    async fn test_request_without_responders() {
        let bus = EventBus::new();
        let err = bus.request("void", "?", Duration::from_millis(50)).await.unwrap_err();
        assert_eq!(err, EventBusError::NoResponders("void".into()));
    }

    #[tokio::test]
    async fn test_request_times_out() {
        let bus = EventBus::new();
        let _silent = bus.subscribe("silent").unwrap();
        let err = bus.request("silent", "?", Duration::from_millis(20)).await.unwrap_err();
        assert!(matches!(err, EventBusError::Timeout { .. }));
    }

    #[test]
    fn test_respond_needs_reply_subject() {
        let bus = EventBus::new();
        let message = Message {
            subject: "plain".into(),
            reply: None,
            payload: Bytes::new(),
        };
        assert!(matches!(bus.respond(&message, "x"), Err(EventBusError::NoReplySubject(_))));
    }

    #[test]
    fn test_closed_bus_rejects_calls() {
        let bus = EventBus::new();
        bus.close();
        assert!(bus.is_closed());
        assert_eq!(bus.publish("a", "b"), Err(EventBusError::Closed));
        assert!(matches!(bus.subscribe("a"), Err(EventBusError::Closed)));
    }

    #[tokio::test]
    async fn test_lagging_subscriber_skips_ahead() {
        let bus = EventBus::with_capacity(2);
        let mut sub = bus.subscribe("fast").unwrap();
        for i in 0..5 {
            bus.publish("fast", i.to_string()).unwrap();
        }
        // Oldest messages were overwritten; the receiver resumes at the oldest kept.
        assert_eq!(sub.next().await.unwrap().payload, Bytes::from("3"));
        assert_eq!(sub.next().await.unwrap().payload, Bytes::from("4"));
    }
}
