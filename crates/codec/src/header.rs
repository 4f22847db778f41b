//! The fixed 18-byte packet preamble.

use crate::{ByteOrder, util};

/// "AT" / "TA": integer fields are big / little endian.
pub const INT_SIGNATURE_BIG_ENDIAN: u16 = 0x4154;
pub const INT_SIGNATURE_LITTLE_ENDIAN: u16 = 0x5441;

/// "C4" / "4C": floating point fields are big / little endian.
pub const FLOAT_SIGNATURE_BIG_ENDIAN: u16 = 0x4334;
pub const FLOAT_SIGNATURE_LITTLE_ENDIAN: u16 = 0x3443;

pub const PACKET_HEADER_SIZE: usize = 18;
pub const PACKET_HEADER_VERSION: u16 = 0x0002;

pub const FORMAT_RAW: u8 = 0x00;
pub const FORMAT_PROTOBUF: u8 = 0x01;
pub const FORMAT_THRIFT: u8 = 0x02;

/// Decoded packet preamble.
///
/// Two signature words, a version, a packet id, a format tag, the total
/// packet size, a free-form user context and the number of trackable modules
/// that follow. The signatures double as the byte order declaration for the
/// rest of the packet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PacketHeader {
    int_order: ByteOrder,
    float_order: ByteOrder,
    version: u16,
    packet_id: u32,
    format: u8,
    packet_size: u16,
    context: u32,
    module_count: u8,
}

impl PacketHeader {
    /// Decodes the preamble, advancing `pos` past the bytes consumed.
    ///
    /// An unrecognised signature pair stops after the signature words and
    /// leaves the packet size at zero, which marks the whole packet as
    /// empty for the caller.
    ///
    /// # Test
    ///
    /// ```
    /// use showbridge_codec::{ByteOrder, header::PacketHeader};
    ///
    /// // little-endian ints, big-endian floats
    /// let buffer = [
    ///     0x54, 0x41, 0x43, 0x34, 0x02, 0x00, 0x2a, 0x00, 0x00, 0x00, 0x00,
    ///     0x40, 0x00, 0x07, 0x00, 0x00, 0x00, 0x03,
    /// ];
    ///
    /// let mut pos = 0;
    /// let header = PacketHeader::decode(&buffer, &mut pos);
    ///
    /// assert_eq!(pos, 18);
    /// assert_eq!(header.int_order(), ByteOrder::Little);
    /// assert_eq!(header.float_order(), ByteOrder::Big);
    /// assert_eq!(header.version(), 0x0002);
    /// assert_eq!(header.packet_id(), 42);
    /// assert_eq!(header.packet_size(), 64);
    /// assert_eq!(header.context(), 7);
    /// assert_eq!(header.module_count(), 3);
    /// ```
    pub fn decode(bytes: &[u8], pos: &mut usize) -> Self {
        let mut header = Self::default();

        // the signature words are read in wire order before any byte order
        // is known
        let Ok(int_signature) = util::read_u16(bytes, pos, ByteOrder::Big) else {
            return header;
        };
        let Ok(float_signature) = util::read_u16(bytes, pos, ByteOrder::Big) else {
            return header;
        };

        header.int_order = match int_signature {
            INT_SIGNATURE_BIG_ENDIAN => ByteOrder::Big,
            INT_SIGNATURE_LITTLE_ENDIAN => ByteOrder::Little,
            _ => return header,
        };

        header.float_order = match float_signature {
            FLOAT_SIGNATURE_BIG_ENDIAN => ByteOrder::Big,
            FLOAT_SIGNATURE_LITTLE_ENDIAN => ByteOrder::Little,
            _ => return header,
        };

        let order = header.int_order;
        let decoded: Result<(), crate::Error> = (|| {
            header.version = util::read_u16(bytes, pos, order)?;
            header.packet_id = util::read_u32(bytes, pos, order)?;
            header.format = util::read_u8(bytes, pos)?;
            header.packet_size = util::read_u16(bytes, pos, order)?;
            header.context = util::read_u32(bytes, pos, order)?;
            header.module_count = util::read_u8(bytes, pos)?;

            Ok(())
        })();

        if decoded.is_err() {
            // truncated preamble, report the packet as empty
            return Self::default();
        }

        header
    }

    pub fn int_order(&self) -> ByteOrder {
        self.int_order
    }

    pub fn float_order(&self) -> ByteOrder {
        self.float_order
    }

    pub fn version(&self) -> u16 {
        self.version
    }

    pub fn packet_id(&self) -> u32 {
        self.packet_id
    }

    pub fn format(&self) -> u8 {
        self.format
    }

    /// Total packet size in bytes including the preamble. Zero marks an
    /// unrecognised or truncated packet.
    pub fn packet_size(&self) -> u16 {
        self.packet_size
    }

    pub fn context(&self) -> u32 {
        self.context
    }

    pub fn module_count(&self) -> u8 {
        self.module_count
    }
}
