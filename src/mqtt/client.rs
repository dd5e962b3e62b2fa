//! # rumqttc Transport
//!
//! [`Transport`] implementation over an MQTT 3.1.1 session.
//!
//! The rumqttc event loop runs in a driver task spawned per session. It
//! forwards inbound publishes through a bounded channel and clears the
//! connected flag when the session ends. Reconnecting is left to the
//! publish scheduler.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::transport::{Credentials, InboundMessage, Transport};
use crate::config::BrokerConfig;
use crate::error::{Result, TrackerError};

/// Outgoing request queue size of the rumqttc client
const REQUEST_CAPACITY: usize = 64;

/// Inbound messages buffered between two scheduler ticks
const INBOUND_CAPACITY: usize = 32;

/// Live broker session
struct Session {
    client: AsyncClient,
    inbound: mpsc::Receiver<InboundMessage>,
    driver: JoinHandle<()>,
}

/// MQTT broker connection
pub struct MqttTransport {
    host: String,
    port: u16,
    keep_alive: Duration,
    connect_timeout: Duration,
    connected: Arc<AtomicBool>,
    session: Option<Session>,
}

impl std::fmt::Debug for MqttTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MqttTransport")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

impl MqttTransport {
    #[must_use]
    pub fn new(host: &str, port: u16, keep_alive: Duration, connect_timeout: Duration) -> Self {
        Self {
            host: host.to_string(),
            port,
            keep_alive,
            connect_timeout,
            connected: Arc::new(AtomicBool::new(false)),
            session: None,
        }
    }

    #[must_use]
    pub fn from_config(config: &BrokerConfig) -> Self {
        Self::new(
            &config.host,
            config.port,
            Duration::from_secs(config.keep_alive_s),
            Duration::from_millis(config.connect_timeout_ms),
        )
    }

    fn close_session(&mut self) {
        if let Some(session) = self.session.take() {
            session.driver.abort();
        }
        self.connected.store(false, Ordering::SeqCst);
    }

    /// Client handle of the live session.
    fn client(&self) -> Result<AsyncClient> {
        match &self.session {
            Some(session) if self.is_connected() => Ok(session.client.clone()),
            _ => Err(TrackerError::Connection("not connected".to_string())),
        }
    }
}

impl Drop for MqttTransport {
    fn drop(&mut self) {
        self.close_session();
    }
}

/// Polls the event loop until the broker acknowledges the connection.
async fn handshake(eventloop: &mut EventLoop) -> Result<()> {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                debug!("CONNACK received: {:?}", ack.code);
                return Ok(());
            }
            Ok(_) => continue,
            Err(e) => return Err(TrackerError::Connection(e.to_string())),
        }
    }
}

/// Drives the session until it fails.
async fn drive(mut eventloop: EventLoop, inbound: mpsc::Sender<InboundMessage>, connected: Arc<AtomicBool>) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                let message = InboundMessage {
                    topic: publish.topic,
                    payload: publish.payload,
                };
                if inbound.try_send(message).is_err() {
                    warn!("Inbound queue full, dropping message");
                }
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                info!("Broker closed the MQTT session");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("MQTT connection lost: {}", e);
                break;
            }
        }
    }
    connected.store(false, Ordering::SeqCst);
}

#[async_trait]
impl Transport for MqttTransport {
    async fn connect(&mut self, credentials: &Credentials<'_>) -> Result<()> {
        self.close_session();

        let mut options = MqttOptions::new(credentials.client_id, &self.host, self.port);
        options.set_keep_alive(self.keep_alive);
        options.set_clean_session(true);
        if !credentials.user.is_empty() {
            options.set_credentials(credentials.user, credentials.password);
        }

        let (client, mut eventloop) = AsyncClient::new(options, REQUEST_CAPACITY);
        match timeout(self.connect_timeout, handshake(&mut eventloop)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(TrackerError::Connection(format!(
                    "no CONNACK from {}:{} within {:?}",
                    self.host, self.port, self.connect_timeout
                )))
            }
        }

        let (tx, rx) = mpsc::channel(INBOUND_CAPACITY);
        self.connected.store(true, Ordering::SeqCst);
        let driver = tokio::spawn(drive(eventloop, tx, Arc::clone(&self.connected)));
        self.session = Some(Session { client, inbound: rx, driver });

        info!("Connected to MQTT broker {}:{}", self.host, self.port);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn subscribe(&mut self, topic: &str) -> Result<()> {
        self.client()?.subscribe(topic, QoS::AtMostOnce).await?;
        Ok(())
    }

    async fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> Result<()> {
        self.client()?
            .publish(topic, QoS::AtMostOnce, retain, payload.as_bytes().to_vec())
            .await?;
        Ok(())
    }

    fn poll_message(&mut self) -> Option<InboundMessage> {
        self.session.as_mut()?.inbound.try_recv().ok()
    }
}
