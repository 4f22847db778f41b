pub mod config;
pub mod node;
pub mod processor;
pub mod receiver;
pub mod statistics;

use std::sync::Arc;

use engine::{DeviceSimulation, object::ProtocolId};

use self::{
    config::Config,
    node::{BridgeNode, BridgeRouter},
    processor::{RttrpmProcessorOptions, RttrpmProtocolProcessor},
    statistics::Statistics,
};

/// The protocol id the RTTrPM front-end registers under. Peer front-ends
/// (the type-B side) live outside this binary.
pub const RTTRPM_PROTOCOL_ID: ProtocolId = 1;

/// Wires the simulation engine and the configured protocol front-end
/// together and keeps them running; opened as a function so integration
/// tests can start the bridge without going through `main`.
pub async fn startup(config: Arc<Config>) -> anyhow::Result<()> {
    let statistics = Statistics::default();
    let router = Arc::new(BridgeRouter::new(vec![RTTRPM_PROTOCOL_ID], Vec::new()));
    let simulation = Arc::new(DeviceSimulation::new(
        router,
        config.simulation.options(),
    ));

    simulation.start();

    let Some(rttrpm) = &config.rttrpm else {
        log::warn!(
            "No rttrpm endpoint is configured, the simulation is ticking with nothing to bridge :-)"
        );

        std::future::pending::<()>().await;
        return Ok(());
    };

    let node = Arc::new(BridgeNode::new(simulation.clone()));
    let processor = RttrpmProtocolProcessor::new(
        RttrpmProcessorOptions {
            protocol_id: RTTRPM_PROTOCOL_ID,
            port: rttrpm.port,
            mapping_area: rttrpm.mapping_area,
            expected_sender: rttrpm.expected_sender_ip,
        },
        statistics,
        node,
    );

    processor.start().await?;

    // the bridge is non-blocking once running, keep the process alive
    std::future::pending::<()>().await;

    Ok(())
}
