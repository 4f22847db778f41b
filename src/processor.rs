//! RTTrPM protocol processor.
//!
//! Adapts raw tracking messages to the semantic remote-object messages the
//! bridge node routes: a trackable opens a `(channel, mapping)` scope for
//! the sub-modules that follow it, a tracked point position inside that
//! scope becomes a source position pair. The protocol is receive-only, the
//! processor never initiates writes towards the tracker.

use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use ahash::AHashSet;
use anyhow::Result;
use parking_lot::RwLock;

use codec::{RttrpmMessage, modules::PacketModule};
use engine::object::{
    Address, ProtocolId, RemoteObjectId, RemoteObjectMessage, UNADDRESSED_VALUE, Value,
};

use crate::{
    receiver::{PacketListener, RttrpmReceiver},
    statistics::Statistics,
};

/// Upstream consumer of the semantic messages a protocol processor
/// produces; implemented by the bridge node.
pub trait MessageListener: Send + Sync {
    fn on_protocol_message_received(
        &self,
        protocol: ProtocolId,
        id: RemoteObjectId,
        message: RemoteObjectMessage,
    );
}

pub struct RttrpmProcessorOptions {
    /// The protocol id this processor registers under at the node.
    pub protocol_id: ProtocolId,
    /// The local port the tracking system sends to.
    pub port: u16,
    /// Mapping area stamped into every produced address. The sentinel
    /// ([`UNADDRESSED_VALUE`]) marks tracker coordinates as absolute and
    /// selects the absolute position object.
    pub mapping_area: i32,
    /// Accept traffic from this sender only; `None` accepts any sender.
    pub expected_sender: Option<IpAddr>,
}

pub struct RttrpmProtocolProcessor {
    core: Arc<ProcessorCore>,
    receiver: RttrpmReceiver,
}

impl RttrpmProtocolProcessor {
    pub fn new(
        options: RttrpmProcessorOptions,
        statistics: Statistics,
        listener: Arc<dyn MessageListener>,
    ) -> Self {
        let core = Arc::new(ProcessorCore {
            protocol_id: options.protocol_id,
            mapping_area: options.mapping_area,
            expected_sender: options.expected_sender,
            muted: RwLock::new(AHashSet::new()),
            listener,
        });

        let receiver = RttrpmReceiver::new(options.port, statistics);
        // the processor sits on the low-latency path
        receiver.add_realtime_listener(core.clone());

        Self { core, receiver }
    }

    pub async fn start(&self) -> Result<()> {
        self.receiver.start().await
    }

    pub async fn stop(&self) {
        self.receiver.stop().await;
    }

    /// The bound socket address while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.receiver.local_addr()
    }

    /// The protocol is receive-only; outgoing messages are refused.
    pub fn send_remote_object_message(
        &self,
        _id: RemoteObjectId,
        _message: &RemoteObjectMessage,
    ) -> bool {
        false
    }

    /// Mutes or unmutes one remote object instance. Messages for muted
    /// objects are dropped before they reach the node.
    pub fn set_object_muted(&self, id: RemoteObjectId, address: Address, muted: bool) {
        let mut set = self.core.muted.write();
        if muted {
            set.insert((id, address));
        } else {
            set.remove(&(id, address));
        }
    }

    pub fn is_object_muted(&self, id: RemoteObjectId, address: Address) -> bool {
        self.core.is_object_muted(id, address)
    }
}

struct ProcessorCore {
    protocol_id: ProtocolId,
    mapping_area: i32,
    expected_sender: Option<IpAddr>,
    muted: RwLock<AHashSet<(RemoteObjectId, Address)>>,
    listener: Arc<dyn MessageListener>,
}

impl ProcessorCore {
    fn is_object_muted(&self, id: RemoteObjectId, address: Address) -> bool {
        self.muted.read().contains(&(id, address))
    }
}

impl PacketListener for ProcessorCore {
    fn packet_received(&self, message: &RttrpmMessage, source: SocketAddr) {
        if message.header.packet_size() == 0 {
            return;
        }

        if let Some(expected) = self.expected_sender {
            if source.ip() != expected {
                log::debug!(
                    "ignoring unexpected rttrpm message, sender={} expected={}",
                    source.ip(),
                    expected
                );

                return;
            }
        }

        let mut address = Address::UNADDRESSED;

        for module in &message.modules {
            match module {
                // a trackable establishes the addressing for the sub-modules
                // that follow, up to the next trackable or end of packet
                PacketModule::Trackable(trackable) => {
                    let channel = trackable.name.trim().parse().unwrap_or(0);
                    address = Address::new(channel, self.mapping_area);
                }
                PacketModule::TrackedPointPosition(point) => {
                    let id = if self.mapping_area == UNADDRESSED_VALUE {
                        RemoteObjectId::PositioningPositionXy
                    } else {
                        RemoteObjectId::CoordMappingPositionXy
                    };

                    if self.is_object_muted(id, address) {
                        continue;
                    }

                    self.listener.on_protocol_message_received(
                        self.protocol_id,
                        id,
                        RemoteObjectMessage::new(
                            address,
                            Value::Float(vec![point.x as f32, point.y as f32]),
                        ),
                    );
                }
                // the remaining kinds are decoded for completeness but have
                // no remote-object counterpart on the mixer side
                _ => {}
            }
        }
    }
}
