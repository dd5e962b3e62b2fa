//! Trait abstraction for the broker connection to enable testing

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// Message received on a subscribed topic.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Bytes,
}

/// Connect parameters passed through to the broker.
#[derive(Debug, Clone, Copy)]
pub struct Credentials<'a> {
    pub client_id: &'a str,
    pub user: &'a str,
    pub password: &'a str,
}

/// Broker connection operations used by the publish scheduler
#[async_trait]
pub trait Transport: Send {
    /// Open a new session, replacing any previous one.
    async fn connect(&mut self, credentials: &Credentials<'_>) -> Result<()>;

    fn is_connected(&self) -> bool;

    async fn subscribe(&mut self, topic: &str) -> Result<()>;

    /// Fire-and-forget publish.
    async fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> Result<()>;

    /// Next message received on a subscribed topic, if any.
    fn poll_message(&mut self) -> Option<InboundMessage>;
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use crate::error::TrackerError;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Recording broker connection for testing
    #[derive(Clone, Default)]
    pub struct MockTransport {
        pub connected: Arc<Mutex<bool>>,
        pub connect_attempts: Arc<Mutex<Vec<String>>>,
        /// Number of upcoming connect calls that fail
        pub failing_connects: Arc<Mutex<u32>>,
        pub subscriptions: Arc<Mutex<Vec<String>>>,
        pub published: Arc<Mutex<Vec<(String, String, bool)>>>,
        pub publish_error: Arc<Mutex<bool>>,
        pub inbound: Arc<Mutex<VecDeque<InboundMessage>>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Transport whose connect always fails
        pub fn unreachable() -> Self {
            let transport = Self::new();
            transport.fail_connects(u32::MAX);
            transport
        }

        pub fn fail_connects(&self, count: u32) {
            *self.failing_connects.lock().unwrap() = count;
        }

        pub fn set_publish_error(&self, fail: bool) {
            *self.publish_error.lock().unwrap() = fail;
        }

        pub fn drop_connection(&self) {
            *self.connected.lock().unwrap() = false;
        }

        pub fn push_inbound(&self, topic: &str, payload: &[u8]) {
            self.inbound.lock().unwrap().push_back(InboundMessage {
                topic: topic.to_string(),
                payload: Bytes::copy_from_slice(payload),
            });
        }

        pub fn connect_count(&self) -> usize {
            self.connect_attempts.lock().unwrap().len()
        }

        pub fn get_published(&self) -> Vec<(String, String, bool)> {
            self.published.lock().unwrap().clone()
        }

        pub fn published_topics(&self) -> Vec<String> {
            self.get_published().into_iter().map(|(topic, _, _)| topic).collect()
        }

        /// Last value published on `topic`
        pub fn value_of(&self, topic: &str) -> Option<String> {
            self.get_published()
                .into_iter()
                .rev()
                .find(|(t, _, _)| t == topic)
                .map(|(_, value, _)| value)
        }

        pub fn get_subscriptions(&self) -> Vec<String> {
            self.subscriptions.lock().unwrap().clone()
        }

        pub fn clear_published(&self) {
            self.published.lock().unwrap().clear();
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn connect(&mut self, credentials: &Credentials<'_>) -> Result<()> {
            self.connect_attempts.lock().unwrap().push(credentials.client_id.to_string());

            let mut failing = self.failing_connects.lock().unwrap();
            if *failing > 0 {
                if *failing != u32::MAX {
                    *failing -= 1;
                }
                return Err(TrackerError::Connection("Mock connection refused".to_string()));
            }

            *self.connected.lock().unwrap() = true;
            Ok(())
        }

        fn is_connected(&self) -> bool {
            *self.connected.lock().unwrap()
        }

        async fn subscribe(&mut self, topic: &str) -> Result<()> {
            self.subscriptions.lock().unwrap().push(topic.to_string());
            Ok(())
        }

        async fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> Result<()> {
            self.published
                .lock()
                .unwrap()
                .push((topic.to_string(), payload.to_string(), retain));
            if *self.publish_error.lock().unwrap() {
                return Err(TrackerError::Connection("Mock publish error".to_string()));
            }
            Ok(())
        }

        fn poll_message(&mut self) -> Option<InboundMessage> {
            self.inbound.lock().unwrap().pop_front()
        }
    }
}
