// ── Coordinator ──
//
// Full lifecycle management for one cloud account session. Handles
// authentication, MQTT provisioning, background refresh, and drives
// the reconcile engine, publishing rosters through a watch channel.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use thermomaven_api::certs;
use thermomaven_api::client::ApiClient;
use thermomaven_api::push::PushEnvelope;
use thermomaven_api::sign::Signer;
use thermomaven_api::transport::TransportConfig;
use thermomaven_api::PushTransport;

use crate::config::AccountConfig;
use crate::error::CoreError;
use crate::model::DeviceRecord;
use crate::reconcile::{ReconcileEngine, SyncState};
use crate::store::IdentityCache;

// ── ConnectionState ──────────────────────────────────────────────────

/// Connection state observable by consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    /// REST session up and push channel started.
    Connected,
    Failed,
}

// ── Coordinator ──────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<CoordinatorInner>`. Owns the REST
/// client, the push transport, and the reconcile engine; publishes the
/// merged roster through a watch channel.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    config: AccountConfig,
    api: ApiClient,
    engine: Mutex<ReconcileEngine>,
    rest_cache: Mutex<Option<RestCache>>,
    push: Mutex<Option<PushTransport>>,
    user_info: Mutex<Option<serde_json::Map<String, serde_json::Value>>>,
    devices: watch::Sender<Arc<Vec<DeviceRecord>>>,
    connection_state: watch::Sender<ConnectionState>,
    sync_state: watch::Sender<SyncState>,
    // Held across a full reconcile cycle; refresh ticks that find it
    // taken are skipped instead of queued.
    cycle_lock: Mutex<()>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

struct RestCache {
    fetched_at: Instant,
    devices: Vec<DeviceRecord>,
}

/// Point-in-time view of the account, as returned by
/// [`Coordinator::refresh`].
#[derive(Debug, Clone)]
pub struct DeviceSnapshot {
    pub devices: Arc<Vec<DeviceRecord>>,
    pub user_info: Option<serde_json::Map<String, serde_json::Value>>,
}

impl Coordinator {
    /// Create a new Coordinator from configuration. Does NOT connect --
    /// call [`connect()`](Self::connect) to authenticate and start
    /// background tasks.
    pub fn new(config: AccountConfig) -> Result<Self, CoreError> {
        let signer = Signer::new(&config.app_id, &config.app_key, &config.region);
        let api = ApiClient::new(&config.base_url, signer, &TransportConfig::default())?;

        let engine = ReconcileEngine::new(
            IdentityCache::with_capacity(config.identity_cache_capacity),
            config.max_auto_sync_attempts,
        );

        let (devices, _) = watch::channel(Arc::new(Vec::new()));
        let (connection_state, _) = watch::channel(ConnectionState::Disconnected);
        let (sync_state, _) = watch::channel(SyncState::AwaitingInitialPush);

        Ok(Self {
            inner: Arc::new(CoordinatorInner {
                config,
                api,
                engine: Mutex::new(engine),
                rest_cache: Mutex::new(None),
                push: Mutex::new(None),
                user_info: Mutex::new(None),
                devices,
                connection_state,
                sync_state,
                cycle_lock: Mutex::new(()),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        })
    }

    pub fn config(&self) -> &AccountConfig {
        &self.inner.config
    }

    // ── Connection lifecycle ─────────────────────────────────────────

    /// Connect: authenticate, load the initial roster, provision the
    /// push channel, and spawn background tasks.
    ///
    /// Waits up to `initial_push_timeout` for the first push envelope
    /// so the returned roster has telemetry; continues REST-only if
    /// nothing arrives in time.
    pub async fn connect(&self) -> Result<(), CoreError> {
        let _ = self
            .inner
            .connection_state
            .send(ConnectionState::Connecting);

        let config = &self.inner.config;
        if let Err(e) = self.inner.api.login(&config.email, &config.password).await {
            let _ = self.inner.connection_state.send(ConnectionState::Failed);
            return Err(e.into());
        }

        match self.inner.api.fetch_user_info().await {
            Ok(info) => *self.inner.user_info.lock().await = Some(info),
            Err(e) => warn!(error = %e, "user info fetch failed (non-fatal)"),
        }

        // Initial REST-only roster so consumers see devices even if
        // the push channel never comes up.
        self.run_cycle(None).await;

        match self.start_push_channel().await {
            Ok(transport) => {
                let mut receiver = transport.envelopes();
                *self.inner.push.lock().await = Some(transport);
                let coordinator = self.clone();
                let handle = tokio::spawn(async move {
                    envelope_task(coordinator, &mut receiver).await;
                });
                self.inner.task_handles.lock().await.push(handle);
            }
            Err(e) => {
                warn!(error = %e, "push channel unavailable, continuing REST-only");
            }
        }

        if config.refresh_interval > Duration::ZERO {
            let coordinator = self.clone();
            let cancel = self.inner.cancel.clone();
            let interval = config.refresh_interval;
            let handle = tokio::spawn(async move {
                refresh_task(coordinator, interval, cancel).await;
            });
            self.inner.task_handles.lock().await.push(handle);
        }

        let _ = self.inner.connection_state.send(ConnectionState::Connected);
        info!("connected");

        self.wait_for_initial_push(config.initial_push_timeout).await;
        Ok(())
    }

    /// Disconnect: cancel background tasks and drop the session.
    pub async fn disconnect(&self) {
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }

        if let Some(transport) = self.inner.push.lock().await.take() {
            transport.shutdown();
        }
        self.inner.api.logout().await;

        let _ = self
            .inner
            .connection_state
            .send(ConnectionState::Disconnected);
        debug!("disconnected");
    }

    async fn start_push_channel(&self) -> Result<PushTransport, CoreError> {
        let bootstrap = self.inner.api.apply_mqtt_certificate().await?;
        let credentials = certs::provision(&bootstrap, &TransportConfig::default()).await?;
        let transport = PushTransport::connect(&credentials, self.inner.cancel.child_token())?;
        Ok(transport)
    }

    /// Bounded wait for the reconcile engine to see its first push
    /// envelope. Elapsing is not an error.
    async fn wait_for_initial_push(&self, timeout: Duration) {
        let mut sync_rx = self.inner.sync_state.subscribe();
        if *sync_rx.borrow() == SyncState::Ready {
            return;
        }
        let waited = tokio::time::timeout(timeout, async {
            while sync_rx.changed().await.is_ok() {
                if *sync_rx.borrow() == SyncState::Ready {
                    break;
                }
            }
        })
        .await;
        if waited.is_err() {
            warn!(
                timeout_secs = timeout.as_secs(),
                "no push envelope before timeout, roster is REST-only for now"
            );
        }
    }

    // ── Reconcile cycle ──────────────────────────────────────────────

    /// Run one reconcile cycle and publish the result.
    ///
    /// A cycle already in flight makes this a no-op for pure refresh
    /// ticks; envelope-triggered cycles always wait their turn so no
    /// push data is lost.
    pub(crate) async fn run_cycle(&self, envelope: Option<&PushEnvelope>) {
        let _guard = self.inner.cycle_lock.lock().await;

        let mut force_rest = false;
        loop {
            let rest = self.rest_roster(force_rest).await;
            let previous = self.inner.devices.borrow().clone();
            let push_connected = self.push_connected().await;

            let mut engine = self.inner.engine.lock().await;
            let envelope = if force_rest { None } else { envelope };
            let out = engine.run_cycle(rest, envelope, &previous, push_connected);
            let _ = self.inner.sync_state.send(engine.sync_state());
            drop(engine);

            let _ = self.inner.devices.send(Arc::new(out.devices));

            if !out.sync_requested {
                break;
            }
            // The engine wants the server asked again; bypass the REST
            // throttle once. Bounded by the engine's attempt cap.
            warn!("roster sync requested, refetching from cloud");
            force_rest = true;
        }
    }

    /// Refresh and return a point-in-time snapshot. Served from the
    /// REST cache when fresh; the account profile is refetched on the
    /// same cadence as the roster.
    pub async fn refresh(&self) -> DeviceSnapshot {
        self.run_cycle(None).await;
        DeviceSnapshot {
            devices: self.devices_snapshot(),
            user_info: self.user_info().await,
        }
    }

    /// Force a fresh roster fetch, bypassing the REST throttle, and
    /// publish the reconciled result. Also re-arms the auto-sync
    /// escalation counter.
    pub async fn request_refresh(&self) {
        *self.inner.rest_cache.lock().await = None;
        self.inner.engine.lock().await.reset_auto_sync();
        self.run_cycle(None).await;
    }

    /// Periodic refresh entry point; skips the cycle if one is running.
    async fn refresh_tick(&self) {
        if self.inner.cycle_lock.try_lock().is_err() {
            debug!("refresh tick skipped, cycle in flight");
            return;
        }
        self.run_cycle(None).await;
    }

    /// The REST roster, served from cache unless stale or forced.
    /// Fetch failures degrade to the cached roster (or empty) so a
    /// cloud blip never stalls push processing.
    async fn rest_roster(&self, force: bool) -> Vec<DeviceRecord> {
        let mut cache = self.inner.rest_cache.lock().await;

        if !force {
            if let Some(cached) = cache.as_ref() {
                if cached.fetched_at.elapsed() < self.inner.config.rest_poll_interval {
                    return cached.devices.clone();
                }
            }
        }

        match self.inner.api.fetch_devices().await {
            Ok(raw) => {
                let devices: Vec<DeviceRecord> =
                    raw.into_iter().map(DeviceRecord::from).collect();
                *cache = Some(RestCache {
                    fetched_at: Instant::now(),
                    devices: devices.clone(),
                });
                // Profile rides the same cadence as the roster.
                match self.inner.api.fetch_user_info().await {
                    Ok(info) => *self.inner.user_info.lock().await = Some(info),
                    Err(e) => debug!(error = %e, "user info refresh failed"),
                }
                devices
            }
            Err(e) => {
                warn!(error = %e, "device list fetch failed, using cached roster");
                cache.as_ref().map(|c| c.devices.clone()).unwrap_or_default()
            }
        }
    }

    // ── State observation ────────────────────────────────────────────

    /// Current roster snapshot.
    pub fn devices_snapshot(&self) -> Arc<Vec<DeviceRecord>> {
        self.inner.devices.borrow().clone()
    }

    /// Subscribe to roster updates.
    pub fn subscribe_devices(&self) -> watch::Receiver<Arc<Vec<DeviceRecord>>> {
        self.inner.devices.subscribe()
    }

    /// Subscribe to connection state changes.
    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection_state.subscribe()
    }

    /// Subscribe to sync state changes.
    pub fn sync_state(&self) -> watch::Receiver<SyncState> {
        self.inner.sync_state.subscribe()
    }

    /// Account profile fetched at connect time, if available.
    pub async fn user_info(&self) -> Option<serde_json::Map<String, serde_json::Value>> {
        self.inner.user_info.lock().await.clone()
    }

    /// Whether the push channel is currently up.
    pub async fn push_connected(&self) -> bool {
        match self.inner.push.lock().await.as_ref() {
            Some(transport) => transport.is_connected(),
            None => false,
        }
    }

    pub(crate) async fn push_transport(&self) -> Option<PushTransport> {
        self.inner.push.lock().await.clone()
    }

    /// Find a device by id in the current roster.
    pub fn device_by_id(&self, id: &str) -> Option<DeviceRecord> {
        self.inner
            .devices
            .borrow()
            .iter()
            .find(|d| d.id_key() == id)
            .cloned()
    }
}

// ── Background tasks ─────────────────────────────────────────────────

/// Feed the latest push envelope into reconcile cycles, subscribing
/// any per-device topics a roster rebuild reveals. The watch channel
/// makes this last-write-wins: envelopes arriving while a cycle runs
/// collapse to the newest one.
async fn envelope_task(
    coordinator: Coordinator,
    receiver: &mut watch::Receiver<Option<Arc<PushEnvelope>>>,
) {
    let cancel = coordinator.inner.cancel.clone();
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            changed = receiver.changed() => {
                if changed.is_err() {
                    break;
                }
                let latest = receiver.borrow_and_update().clone();
                if let Some(envelope) = latest {
                    coordinator.run_cycle(Some(&envelope)).await;
                    coordinator.subscribe_device_topics().await;
                }
            }
        }
    }
    debug!("envelope task exiting");
}

impl Coordinator {
    /// Subscribe the push transport to every per-device telemetry topic
    /// the current roster names. Idempotent at the transport layer.
    async fn subscribe_device_topics(&self) {
        let Some(transport) = self.push_transport().await else {
            return;
        };
        let topics: Vec<String> = self
            .inner
            .devices
            .borrow()
            .iter()
            .flat_map(|d| d.sub_topics.iter().cloned())
            .collect();
        for topic in topics {
            if let Err(e) = transport.subscribe_topic(&topic).await {
                warn!(topic, error = %e, "device topic subscribe failed");
            }
        }
    }
}

/// Periodically refresh the roster from REST.
async fn refresh_task(coordinator: Coordinator, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => coordinator.refresh_tick().await,
        }
    }
}
