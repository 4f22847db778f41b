//! ## Real-Time Tracking Protocol (RTTrPM) decoding
//!
//! RTTrPM is the motion flavour of the Real-Time Tracking Protocol: a UDP
//! datagram carries a fixed preamble followed by a sequence of trackable
//! modules, each of which owns a run of typed sub-modules (positions,
//! orientations, accelerations, zone collisions). Producers are free to pick
//! the byte order for integer and floating point fields independently; the
//! two signature words at the start of the preamble declare the choice.
//!
//! Decoding is receive-only and total: a datagram with an unrecognised
//! signature decodes to an empty message, unknown sub-module types are
//! skipped over by their declared size, and a truncated packet yields the
//! modules decoded up to the truncation point.

pub mod header;
pub mod modules;

mod util;

use self::{
    header::PacketHeader,
    modules::{
        CentroidAccelAndVeloModule, CentroidPositionModule, ModuleMeta, ModuleType,
        OrientationEulerModule, OrientationQuaternionModule, PacketModule, TrackableModule,
        TrackedPointAccelAndVeloModule, TrackedPointPositionModule, ZoneCollisionDetectionModule,
    },
};

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    UnexpectedEnd,
    UnexpectedModuleType(u8),
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Byte order of a wire field, signalled per packet by the header
/// signatures. The decoder never assumes host order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ByteOrder {
    #[default]
    Big,
    Little,
}

/// A fully decoded RTTrPM datagram: the preamble plus the flattened module
/// sequence, trackables first, each followed by its sub-modules.
#[derive(Debug, Clone, Default)]
pub struct RttrpmMessage {
    pub header: PacketHeader,
    pub modules: Vec<PacketModule>,
}

/// Decodes one datagram.
///
/// An unrecognised signature yields a header with packet size zero and no
/// modules; callers treat such messages as no-ops.
///
/// # Test
///
/// ```
/// use showbridge_codec::modules::PacketModule;
///
/// // big-endian ints and floats, one trackable "7" with a single
/// // tracked point position sub-module
/// let buffer = [
///     0x41, 0x54, 0x43, 0x34, 0x00, 0x02, 0x00, 0x00, 0x00, 0x01, 0x00,
///     0x00, 0x40, 0x00, 0x00, 0x00, 0x00, 0x01, // header
///     0x01, 0x00, 0x0a, 0x01, 0x37, 0x00, 0x00, 0x00, 0x01, 0x01, // trackable
///     0x06, 0x00, 0x1e, 0x00, 0x00, // tracked point meta, latency
///     0x3f, 0xd0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // x = 0.25
///     0x3f, 0xe8, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // y = 0.75
///     0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // z = 0.0
///     0x00, // point index
/// ];
///
/// let message = showbridge_codec::decode(&buffer);
///
/// assert_eq!(message.header.module_count(), 1);
/// assert_eq!(message.modules.len(), 2);
///
/// let PacketModule::Trackable(trackable) = &message.modules[0] else {
///     panic!("expected a trackable");
/// };
/// assert_eq!(trackable.name, "7");
/// assert_eq!(trackable.sub_module_count, 1);
///
/// let PacketModule::TrackedPointPosition(point) = &message.modules[1] else {
///     panic!("expected a tracked point position");
/// };
/// assert_eq!(point.x, 0.25);
/// assert_eq!(point.y, 0.75);
/// ```
pub fn decode(bytes: &[u8]) -> RttrpmMessage {
    let mut pos = 0;
    let header = PacketHeader::decode(bytes, &mut pos);
    let mut modules = Vec::new();

    if header.packet_size() == 0 {
        return RttrpmMessage { header, modules };
    }

    'packet: for _ in 0..header.module_count() {
        let Ok(trackable) = TrackableModule::decode(bytes, &mut pos, &header) else {
            break;
        };

        let sub_module_count = trackable.sub_module_count;
        modules.push(PacketModule::Trackable(trackable));

        for _ in 0..sub_module_count {
            let Ok(meta) = ModuleMeta::peek(bytes, pos, header.int_order()) else {
                break 'packet;
            };

            let decoded = match ModuleType::try_from(meta.module_type) {
                Ok(ModuleType::CentroidPosition) => {
                    CentroidPositionModule::decode(bytes, &mut pos, &header)
                        .map(PacketModule::CentroidPosition)
                }
                Ok(ModuleType::TrackedPointPosition) => {
                    TrackedPointPositionModule::decode(bytes, &mut pos, &header)
                        .map(PacketModule::TrackedPointPosition)
                }
                Ok(ModuleType::OrientationQuaternion) => {
                    OrientationQuaternionModule::decode(bytes, &mut pos, &header)
                        .map(PacketModule::OrientationQuaternion)
                }
                Ok(ModuleType::OrientationEuler) => {
                    OrientationEulerModule::decode(bytes, &mut pos, &header)
                        .map(PacketModule::OrientationEuler)
                }
                Ok(ModuleType::CentroidAccelAndVelo) => {
                    CentroidAccelAndVeloModule::decode(bytes, &mut pos, &header)
                        .map(PacketModule::CentroidAccelAndVelo)
                }
                Ok(ModuleType::TrackedPointAccelAndVelo) => {
                    TrackedPointAccelAndVeloModule::decode(bytes, &mut pos, &header)
                        .map(PacketModule::TrackedPointAccelAndVelo)
                }
                Ok(ModuleType::ZoneCollisionDetection) => {
                    ZoneCollisionDetectionModule::decode(bytes, &mut pos, &header)
                        .map(PacketModule::ZoneCollisionDetection)
                }
                // a trackable in a sub-module run or a type this decoder
                // does not know: skip it by its declared size
                Ok(ModuleType::Trackable | ModuleType::TrackableWithTimestamp) | Err(_) => {
                    if (meta.size as usize) < ModuleMeta::SIZE {
                        break 'packet;
                    }

                    pos += meta.size as usize;
                    continue;
                }
            };

            match decoded {
                Ok(module) => modules.push(module),
                Err(_) => break 'packet,
            }
        }
    }

    RttrpmMessage { header, modules }
}
