//! Typed packet modules.
//!
//! Every module starts with the same metadata: a 1-byte type tag and a
//! 2-byte size covering the whole module. Trackables additionally carry a
//! name, a sequence number, an optional timestamp and the number of
//! sub-modules that belong to them; the remaining kinds are plain data
//! records. All decoders are pure `(bytes, cursor) -> (module, cursor')`
//! functions.

use num_enum::TryFromPrimitive;

use crate::{ByteOrder, Error, header::PacketHeader, util};

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum ModuleType {
    Trackable = 0x01,
    CentroidPosition = 0x02,
    OrientationQuaternion = 0x03,
    OrientationEuler = 0x04,
    TrackedPointPosition = 0x06,
    CentroidAccelAndVelo = 0x20,
    TrackedPointAccelAndVelo = 0x21,
    ZoneCollisionDetection = 0x22,
    TrackableWithTimestamp = 0x51,
}

/// The metadata every module starts with. Unknown module types are skipped
/// by peeking this and advancing the cursor by `size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleMeta {
    pub module_type: u8,
    pub size: u16,
}

impl ModuleMeta {
    /// Wire size of the metadata itself.
    pub const SIZE: usize = 3;

    /// Reads the metadata at `pos` without advancing the cursor.
    pub fn peek(bytes: &[u8], pos: usize, order: ByteOrder) -> Result<Self, Error> {
        let mut peek_pos = pos;
        let module_type = util::read_u8(bytes, &mut peek_pos)?;
        let size = util::read_u16(bytes, &mut peek_pos, order)?;

        Ok(Self { module_type, size })
    }

    fn consume(bytes: &[u8], pos: &mut usize, header: &PacketHeader) -> Result<Self, Error> {
        let module_type = util::read_u8(bytes, pos)?;
        let size = util::read_u16(bytes, pos, header.int_order())?;

        Ok(Self { module_type, size })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PacketModule {
    Trackable(TrackableModule),
    CentroidPosition(CentroidPositionModule),
    TrackedPointPosition(TrackedPointPositionModule),
    OrientationQuaternion(OrientationQuaternionModule),
    OrientationEuler(OrientationEulerModule),
    CentroidAccelAndVelo(CentroidAccelAndVeloModule),
    TrackedPointAccelAndVelo(TrackedPointAccelAndVeloModule),
    ZoneCollisionDetection(ZoneCollisionDetectionModule),
    Invalid,
}

/// A named rigid body reported by the tracking system. Opens a scope: the
/// sub-modules that follow, up to the next trackable or the end of the
/// packet, belong to it.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackableModule {
    pub name: String,
    pub seq_number: u32,
    /// Only present for the timestamped trackable variant.
    pub timestamp: Option<u32>,
    pub sub_module_count: u8,
}

impl TrackableModule {
    pub fn decode(bytes: &[u8], pos: &mut usize, header: &PacketHeader) -> Result<Self, Error> {
        let meta = ModuleMeta::consume(bytes, pos, header)?;

        let with_timestamp = match ModuleType::try_from(meta.module_type) {
            Ok(ModuleType::Trackable) => false,
            Ok(ModuleType::TrackableWithTimestamp) => true,
            _ => return Err(Error::UnexpectedModuleType(meta.module_type)),
        };

        let name_len = util::read_u8(bytes, pos)?;
        let name = util::read_name(bytes, pos, name_len as usize)?;
        let seq_number = util::read_u32(bytes, pos, header.int_order())?;
        let timestamp = if with_timestamp {
            Some(util::read_u32(bytes, pos, header.int_order())?)
        } else {
            None
        };
        let sub_module_count = util::read_u8(bytes, pos)?;

        Ok(Self {
            name,
            seq_number,
            timestamp,
            sub_module_count,
        })
    }
}

/// Position of a trackable's centroid.
#[derive(Debug, Clone, PartialEq)]
pub struct CentroidPositionModule {
    pub latency: u16,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl CentroidPositionModule {
    pub fn decode(bytes: &[u8], pos: &mut usize, header: &PacketHeader) -> Result<Self, Error> {
        ModuleMeta::consume(bytes, pos, header)?;

        Ok(Self {
            latency: util::read_u16(bytes, pos, header.int_order())?,
            x: util::read_f64(bytes, pos, header.float_order())?,
            y: util::read_f64(bytes, pos, header.float_order())?,
            z: util::read_f64(bytes, pos, header.float_order())?,
        })
    }
}

/// Position of a single tracked point (LED) of a trackable.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedPointPositionModule {
    pub latency: u16,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub index: u8,
}

impl TrackedPointPositionModule {
    pub fn decode(bytes: &[u8], pos: &mut usize, header: &PacketHeader) -> Result<Self, Error> {
        ModuleMeta::consume(bytes, pos, header)?;

        Ok(Self {
            latency: util::read_u16(bytes, pos, header.int_order())?,
            x: util::read_f64(bytes, pos, header.float_order())?,
            y: util::read_f64(bytes, pos, header.float_order())?,
            z: util::read_f64(bytes, pos, header.float_order())?,
            index: util::read_u8(bytes, pos)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrientationQuaternionModule {
    pub latency: u16,
    pub qx: f64,
    pub qy: f64,
    pub qz: f64,
    pub qw: f64,
}

impl OrientationQuaternionModule {
    pub fn decode(bytes: &[u8], pos: &mut usize, header: &PacketHeader) -> Result<Self, Error> {
        ModuleMeta::consume(bytes, pos, header)?;

        Ok(Self {
            latency: util::read_u16(bytes, pos, header.int_order())?,
            qx: util::read_f64(bytes, pos, header.float_order())?,
            qy: util::read_f64(bytes, pos, header.float_order())?,
            qz: util::read_f64(bytes, pos, header.float_order())?,
            qw: util::read_f64(bytes, pos, header.float_order())?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrientationEulerModule {
    pub latency: u16,
    /// Rotation order the three angles apply in.
    pub order: u16,
    pub r1: f64,
    pub r2: f64,
    pub r3: f64,
}

impl OrientationEulerModule {
    pub fn decode(bytes: &[u8], pos: &mut usize, header: &PacketHeader) -> Result<Self, Error> {
        ModuleMeta::consume(bytes, pos, header)?;

        Ok(Self {
            latency: util::read_u16(bytes, pos, header.int_order())?,
            order: util::read_u16(bytes, pos, header.int_order())?,
            r1: util::read_f64(bytes, pos, header.float_order())?,
            r2: util::read_f64(bytes, pos, header.float_order())?,
            r3: util::read_f64(bytes, pos, header.float_order())?,
        })
    }
}

/// Acceleration and velocity of a trackable's centroid.
#[derive(Debug, Clone, PartialEq)]
pub struct CentroidAccelAndVeloModule {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub accel_x: f32,
    pub accel_y: f32,
    pub accel_z: f32,
    pub velo_x: f32,
    pub velo_y: f32,
    pub velo_z: f32,
}

impl CentroidAccelAndVeloModule {
    pub fn decode(bytes: &[u8], pos: &mut usize, header: &PacketHeader) -> Result<Self, Error> {
        ModuleMeta::consume(bytes, pos, header)?;

        Ok(Self {
            x: util::read_f64(bytes, pos, header.float_order())?,
            y: util::read_f64(bytes, pos, header.float_order())?,
            z: util::read_f64(bytes, pos, header.float_order())?,
            accel_x: util::read_f32(bytes, pos, header.float_order())?,
            accel_y: util::read_f32(bytes, pos, header.float_order())?,
            accel_z: util::read_f32(bytes, pos, header.float_order())?,
            velo_x: util::read_f32(bytes, pos, header.float_order())?,
            velo_y: util::read_f32(bytes, pos, header.float_order())?,
            velo_z: util::read_f32(bytes, pos, header.float_order())?,
        })
    }
}

/// Acceleration and velocity of a single tracked point.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedPointAccelAndVeloModule {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub accel_x: f32,
    pub accel_y: f32,
    pub accel_z: f32,
    pub velo_x: f32,
    pub velo_y: f32,
    pub velo_z: f32,
    pub index: u8,
}

impl TrackedPointAccelAndVeloModule {
    pub fn decode(bytes: &[u8], pos: &mut usize, header: &PacketHeader) -> Result<Self, Error> {
        ModuleMeta::consume(bytes, pos, header)?;

        Ok(Self {
            x: util::read_f64(bytes, pos, header.float_order())?,
            y: util::read_f64(bytes, pos, header.float_order())?,
            z: util::read_f64(bytes, pos, header.float_order())?,
            accel_x: util::read_f32(bytes, pos, header.float_order())?,
            accel_y: util::read_f32(bytes, pos, header.float_order())?,
            accel_z: util::read_f32(bytes, pos, header.float_order())?,
            velo_x: util::read_f32(bytes, pos, header.float_order())?,
            velo_y: util::read_f32(bytes, pos, header.float_order())?,
            velo_z: util::read_f32(bytes, pos, header.float_order())?,
            index: util::read_u8(bytes, pos)?,
        })
    }
}

/// One zone a trackable currently collides with.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneModule {
    pub name: String,
}

/// Zone collision report: a count followed by that many nested zone records,
/// each a length-prefixed name.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneCollisionDetectionModule {
    pub zones: Vec<ZoneModule>,
}

impl ZoneCollisionDetectionModule {
    pub fn decode(bytes: &[u8], pos: &mut usize, header: &PacketHeader) -> Result<Self, Error> {
        ModuleMeta::consume(bytes, pos, header)?;

        let zone_count = util::read_u8(bytes, pos)?;
        let mut zones = Vec::with_capacity(zone_count as usize);
        for _ in 0..zone_count {
            let name_len = util::read_u8(bytes, pos)?;
            zones.push(ZoneModule {
                name: util::read_name(bytes, pos, name_len as usize)?,
            });
        }

        Ok(Self { zones })
    }
}
