//! Snapshot delivery to simulation observers.
//!
//! Every state change produces a numeric snapshot of the whole store. A
//! listener never runs on the tick or receive path: each one is decoupled
//! through a watch channel drained by its own pump task, so a slow listener
//! only coalesces to the most recent undelivered snapshot instead of
//! stalling the simulation.

use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::RwLock;
use tokio::sync::watch;

use crate::object::{Address, RemoteObjectId};

/// A numeric view of the whole simulation state, `address -> id -> floats`.
/// Ints are widened to floats; strings and empty values do not appear.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationSnapshot {
    values: AHashMap<Address, AHashMap<RemoteObjectId, Vec<f32>>>,
}

impl SimulationSnapshot {
    pub fn get(&self, address: Address, id: RemoteObjectId) -> Option<&[f32]> {
        self.values.get(&address)?.get(&id).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(
        &self,
    ) -> impl Iterator<Item = (&Address, &AHashMap<RemoteObjectId, Vec<f32>>)> {
        self.values.iter()
    }

    pub(crate) fn insert(&mut self, address: Address, id: RemoteObjectId, values: Vec<f32>) {
        self.values.entry(address).or_default().insert(id, values);
    }
}

/// Observer of simulation state changes.
pub trait SimulationListener: Send + Sync {
    /// Called with every produced snapshot, on the listener's pump task.
    fn simulation_updated(&self, snapshot: &SimulationSnapshot);
}

struct Subscriber {
    listener: Arc<dyn SimulationListener>,
    sender: watch::Sender<SimulationSnapshot>,
}

/// Fan-out of snapshots to registered listeners.
#[derive(Default)]
pub(crate) struct ListenerHub {
    subscribers: RwLock<Vec<Subscriber>>,
}

impl ListenerHub {
    pub fn add(&self, listener: Arc<dyn SimulationListener>) {
        let (sender, mut receiver) = watch::channel(SimulationSnapshot::default());

        {
            let listener = listener.clone();
            tokio::spawn(async move {
                // ends once the hub drops the sender side
                while receiver.changed().await.is_ok() {
                    let snapshot = receiver.borrow_and_update().clone();
                    listener.simulation_updated(&snapshot);
                }
            });
        }

        self.subscribers.write().push(Subscriber { listener, sender });
    }

    pub fn remove(&self, listener: &Arc<dyn SimulationListener>) {
        self.subscribers
            .write()
            .retain(|subscriber| !Arc::ptr_eq(&subscriber.listener, listener));
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.read().is_empty()
    }

    pub fn publish(&self, snapshot: SimulationSnapshot) {
        let subscribers = self.subscribers.read();

        if let Some((last, rest)) = subscribers.split_last() {
            for subscriber in rest {
                subscriber.sender.send_replace(snapshot.clone());
            }

            last.sender.send_replace(snapshot);
        }
    }
}
