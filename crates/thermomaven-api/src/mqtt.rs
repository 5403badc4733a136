// MQTT push transport.
//
// Connects to the AWS IoT broker with the provisioned mutual-TLS
// identity and publishes decoded push envelopes through a
// [`tokio::sync::watch`] channel: consumers see the latest envelope,
// and intermediate ones may be skipped under load. rumqttc's event
// loop handles reconnection internally; subscriptions are replayed on
// every ConnAck so a reconnect restores the full topic set.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS, TlsConfiguration, Transport};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::certs::MqttCredentials;
use crate::error::Error;
use crate::push::{self, PushEnvelope};

const KEEP_ALIVE: Duration = Duration::from_secs(30);
const RECONNECT_PAUSE: Duration = Duration::from_secs(5);

/// Handle to the running push connection.
///
/// Cheaply cloneable; all clones share the connection. Drop all clones
/// and cancel the token (or call [`shutdown`](Self::shutdown)) to tear
/// down the background task.
#[derive(Clone)]
pub struct PushTransport {
    client: AsyncClient,
    envelope_tx: watch::Sender<Option<Arc<PushEnvelope>>>,
    connected: Arc<AtomicBool>,
    subscribed: Arc<Mutex<HashSet<String>>>,
    cancel: CancellationToken,
}

impl PushTransport {
    /// Open the TLS connection and spawn the event loop.
    ///
    /// Returns immediately; the first ConnAck arrives asynchronously.
    /// The account-level topics from provisioning are subscribed on
    /// every (re)connect.
    pub fn connect(credentials: &MqttCredentials, cancel: CancellationToken) -> Result<Self, Error> {
        let mut options = MqttOptions::new(
            credentials.client_id.clone(),
            credentials.broker_host.clone(),
            credentials.broker_port,
        );
        options.set_keep_alive(KEEP_ALIVE);
        options.set_transport(Transport::Tls(TlsConfiguration::SimpleNative {
            ca: credentials.ca.clone(),
            client_auth: Some((credentials.pkcs12_der.clone(), credentials.password.clone())),
        }));

        let (client, mut event_loop) = AsyncClient::new(options, 10);
        let (envelope_tx, _) = watch::channel(None);

        let connected = Arc::new(AtomicBool::new(false));
        let subscribed = Arc::new(Mutex::new(
            credentials.sub_topics.iter().cloned().collect::<HashSet<_>>(),
        ));

        let transport = Self {
            client: client.clone(),
            envelope_tx: envelope_tx.clone(),
            connected: connected.clone(),
            subscribed: subscribed.clone(),
            cancel: cancel.clone(),
        };

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    event = event_loop.poll() => match event {
                        Ok(Event::Incoming(Packet::ConnAck(_))) => {
                            info!("push transport connected");
                            connected.store(true, Ordering::SeqCst);
                            let topics: Vec<String> = match subscribed.lock() {
                                Ok(guard) => guard.iter().cloned().collect(),
                                Err(_) => Vec::new(),
                            };
                            for topic in topics {
                                if let Err(e) = client.subscribe(&topic, QoS::AtLeastOnce).await {
                                    warn!(topic, error = %e, "subscribe failed");
                                }
                            }
                        }
                        Ok(Event::Incoming(Packet::Publish(publish))) => {
                            match push::decode(&publish.topic, &publish.payload) {
                                Some(envelope) => {
                                    trace!(topic = %envelope.topic, cmd_type = %envelope.cmd_type, "push envelope");
                                    let _ = envelope_tx.send(Some(Arc::new(envelope)));
                                }
                                None => {
                                    debug!(topic = %publish.topic, "undecodable push frame dropped");
                                }
                            }
                        }
                        Ok(_) => {}
                        Err(e) => {
                            connected.store(false, Ordering::SeqCst);
                            warn!(error = %e, "push event loop error, reconnecting");
                            tokio::select! {
                                biased;
                                _ = cancel.cancelled() => break,
                                _ = tokio::time::sleep(RECONNECT_PAUSE) => {}
                            }
                        }
                    }
                }
            }
            info!("push event loop exiting");
        });

        Ok(transport)
    }

    /// Get a receiver for the latest decoded envelope. Last-write-wins:
    /// a slow consumer sees only the newest envelope, never a backlog.
    pub fn envelopes(&self) -> watch::Receiver<Option<Arc<PushEnvelope>>> {
        self.envelope_tx.subscribe()
    }

    /// Subscribe an additional topic (per-device telemetry topics
    /// learned from the device roster). Idempotent; the topic is also
    /// replayed after a reconnect.
    pub async fn subscribe_topic(&self, topic: &str) -> Result<(), Error> {
        let already = match self.subscribed.lock() {
            Ok(mut guard) => !guard.insert(topic.to_owned()),
            Err(_) => false,
        };
        if already {
            return Ok(());
        }
        debug!(topic, "subscribing");
        self.client
            .subscribe(topic, QoS::AtLeastOnce)
            .await
            .map_err(|e| Error::Mqtt(e.to_string()))
    }

    /// Publish a control envelope at QoS 1.
    pub async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), Error> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }
        debug!(topic, bytes = payload.len(), "publishing");
        self.client
            .publish(topic, QoS::AtLeastOnce, false, payload)
            .await
            .map_err(|e| Error::Mqtt(e.to_string()))
    }

    /// Whether the broker connection is currently up.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Signal the event loop to shut down.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}
