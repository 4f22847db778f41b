//! Device simulation engine for the showbridge node.
//!
//! Stands in for a missing physical mixing device: it holds a current value
//! for every simulated remote object, answers polls with those values,
//! absorbs writes from peer protocols (keeping the coupled x/y/xy position
//! objects coherent), cross-forwards writes between the node's two protocol
//! roles and advances oscillating simulation values at a fixed cadence.

pub mod object;
pub mod snapshot;
pub mod store;
pub mod ticker;

use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;

use self::{
    object::{Address, ProtocolId, RemoteObjectId, RemoteObjectMessage, Value},
    snapshot::{ListenerHub, SimulationListener},
    store::ValueStore,
    ticker::TickDriver,
};

/// The object handling mode this engine implements; configurations carrying
/// any other mode are rejected.
pub const DEVICE_SIMULATION_MODE: &str = "DS100_DeviceSimulation";

/// The upstream node the engine talks to.
///
/// The node partitions its protocol endpoints into two roles and
/// cross-forwards between them; the engine only ever addresses peers through
/// this interface.
pub trait NodeRouter: Send + Sync {
    /// Delivers a message to one protocol endpoint. Returns whether the
    /// protocol accepted it.
    fn send_to(
        &self,
        protocol: ProtocolId,
        id: RemoteObjectId,
        message: &RemoteObjectMessage,
    ) -> bool;

    fn protocols_a(&self) -> Vec<ProtocolId>;

    fn protocols_b(&self) -> Vec<ProtocolId>;
}

#[derive(Debug, Clone)]
pub struct SimulationOptions {
    /// Number of simulated channels.
    pub channel_count: u16,
    /// Number of simulated coordinate mapping areas.
    pub mapping_count: u16,
    /// Cadence of the value generator; zero disables ticking entirely.
    pub refresh_interval: Duration,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            channel_count: 64,
            mapping_count: 1,
            refresh_interval: Duration::from_millis(50),
        }
    }
}

/// The in-memory mixer simulation.
pub struct DeviceSimulation {
    router: Arc<dyn NodeRouter>,
    store: Arc<Mutex<ValueStore>>,
    hub: Arc<ListenerHub>,
    ticker: Mutex<Option<TickDriver>>,
    refresh_interval: Mutex<Duration>,
}

impl DeviceSimulation {
    /// Creates the engine and populates the current-value store for the
    /// configured channel/mapping grid. Ticking starts with [`Self::start`].
    pub fn new(router: Arc<dyn NodeRouter>, options: SimulationOptions) -> Self {
        Self {
            router,
            store: Arc::new(Mutex::new(ValueStore::new(
                options.channel_count,
                options.mapping_count,
            ))),
            hub: Arc::new(ListenerHub::default()),
            ticker: Mutex::new(None),
            refresh_interval: Mutex::new(options.refresh_interval),
        }
    }

    /// Spawns the tick worker, unless the refresh interval is zero or the
    /// worker is already running. Must be called within a tokio runtime.
    pub fn start(&self) {
        let interval = *self.refresh_interval.lock();
        if interval.is_zero() {
            return;
        }

        let mut slot = self.ticker.lock();
        if slot.is_some() {
            return;
        }

        let store = self.store.clone();
        let hub = self.hub.clone();
        *slot = Some(TickDriver::start(interval, interval, move || {
            let snapshot = {
                let mut store = store.lock();
                store.tick_update();
                (!hub.is_empty()).then(|| store.build_snapshot())
            };

            if let Some(snapshot) = snapshot {
                hub.publish(snapshot);
            }
        }));
    }

    /// Stops the tick worker. Idempotent; the store keeps its values.
    pub async fn stop(&self) {
        let driver = self.ticker.lock().take();
        if let Some(driver) = driver {
            driver.stop().await;
        }
    }

    /// Applies a new configuration: the tick worker is stopped, the store is
    /// rebuilt from scratch for the new grid and ticking resumes (if the new
    /// interval is non-zero).
    pub async fn reconfigure(&self, options: SimulationOptions) {
        self.stop().await;

        self.store
            .lock()
            .reinit(options.channel_count, options.mapping_count);
        *self.refresh_interval.lock() = options.refresh_interval;

        self.start();
    }

    /// Inbound path from the node: answers polls from the store towards the
    /// source protocol only, commits writes (with coupled-field propagation)
    /// and cross-forwards them to the opposite protocol role.
    pub fn on_received_from_protocol(
        &self,
        protocol: ProtocolId,
        id: RemoteObjectId,
        message: &RemoteObjectMessage,
    ) -> bool {
        if Self::is_data_request_poll(id, message) {
            return self.reply_to_data_request(protocol, id, message.address);
        }

        // the write must be visible to concurrent polls before any peer
        // learns about it
        self.store.lock().set_value(id, message);
        self.notify_listeners();

        let protocols_a = self.router.protocols_a();
        if protocols_a.contains(&protocol) {
            let mut sent = true;
            for peer in self.router.protocols_b() {
                sent = self.router.send_to(peer, id, message) && sent;
            }

            return sent;
        }

        if self.router.protocols_b().contains(&protocol) {
            let mut sent = true;
            for peer in protocols_a {
                sent = self.router.send_to(peer, id, message) && sent;
            }

            return sent;
        }

        false
    }

    pub fn add_listener(&self, listener: Arc<dyn SimulationListener>) {
        self.hub.add(listener);
    }

    pub fn remove_listener(&self, listener: &Arc<dyn SimulationListener>) {
        self.hub.remove(listener);
    }

    /// A message for a pollable object that carries no payload requests the
    /// currently held value instead of writing one.
    fn is_data_request_poll(id: RemoteObjectId, message: &RemoteObjectMessage) -> bool {
        id.is_pollable() && message.value.is_none()
    }

    /// Answers a poll towards the source protocol. A ping is answered with a
    /// pong; anything else replies with the stored value. Polls for unknown
    /// `(id, address)` entries are dropped.
    fn reply_to_data_request(
        &self,
        protocol: ProtocolId,
        id: RemoteObjectId,
        address: Address,
    ) -> bool {
        let (reply_id, reply_value) = {
            let store = self.store.lock();
            let Some(value) = store.get(id, address) else {
                return false;
            };

            match id {
                RemoteObjectId::HeartbeatPing => (RemoteObjectId::HeartbeatPong, Value::None),
                RemoteObjectId::HeartbeatPong | RemoteObjectId::Invalid => return false,
                _ => (id, value.clone()),
            }
        };

        self.router.send_to(
            protocol,
            reply_id,
            &RemoteObjectMessage::new(address, reply_value),
        )
    }

    fn notify_listeners(&self) {
        if self.hub.is_empty() {
            return;
        }

        let snapshot = self.store.lock().build_snapshot();
        self.hub.publish(snapshot);
    }

    /// Read access for integration tests and diagnostics.
    pub fn current_value(&self, id: RemoteObjectId, address: Address) -> Option<Value> {
        self.store.lock().get(id, address).cloned()
    }

    pub fn is_ticking(&self) -> bool {
        self.ticker.lock().is_some()
    }
}
