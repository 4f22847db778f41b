//! Minimal bridge node wiring.
//!
//! The full processing node with its per-protocol front-ends is outside this
//! binary; what remains here is the part the simulation engine needs to see:
//! a registry partitioning protocol ids into the two forwarding roles, and
//! the inbound path from protocol processors into the engine. Outbound
//! traffic towards peers without an in-process front-end is surfaced in the
//! log instead.

use std::sync::Arc;

use engine::{
    DeviceSimulation, NodeRouter,
    object::{ProtocolId, RemoteObjectId, RemoteObjectMessage},
};

use crate::processor::MessageListener;

/// Protocol role registry and outbound edge of the node.
pub struct BridgeRouter {
    role_a: Vec<ProtocolId>,
    role_b: Vec<ProtocolId>,
}

impl BridgeRouter {
    pub fn new(role_a: Vec<ProtocolId>, role_b: Vec<ProtocolId>) -> Self {
        Self { role_a, role_b }
    }
}

impl NodeRouter for BridgeRouter {
    fn send_to(
        &self,
        protocol: ProtocolId,
        id: RemoteObjectId,
        message: &RemoteObjectMessage,
    ) -> bool {
        log::info!(
            "outgoing message, protocol={} id={:?} channel={} mapping={} value={:?}",
            protocol,
            id,
            message.address.channel,
            message.address.mapping,
            message.value
        );

        true
    }

    fn protocols_a(&self) -> Vec<ProtocolId> {
        self.role_a.clone()
    }

    fn protocols_b(&self) -> Vec<ProtocolId> {
        self.role_b.clone()
    }
}

/// Inbound edge of the node: delivers protocol traffic to the simulation.
pub struct BridgeNode {
    simulation: Arc<DeviceSimulation>,
}

impl BridgeNode {
    pub fn new(simulation: Arc<DeviceSimulation>) -> Self {
        Self { simulation }
    }
}

impl MessageListener for BridgeNode {
    fn on_protocol_message_received(
        &self,
        protocol: ProtocolId,
        id: RemoteObjectId,
        message: RemoteObjectMessage,
    ) {
        self.simulation
            .on_received_from_protocol(protocol, id, &message);
    }
}
