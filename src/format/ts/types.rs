use bytes::{BufMut, BytesMut};

/// PID reserved for null packets
pub const PID_NULL: u16 = 0x1fff;

/// First byte of every TS packet
pub const SYNC_BYTE: u8 = 0x47;
/// Size of a TS packet in bytes
pub const TS_PACKET_SIZE: usize = 188;
/// Size of the fixed TS packet header
pub const TS_HEADER_SIZE: usize = 4;

/// TS packets carried by one UDP datagram (TS over IP).
pub const PACKETS_PER_DATAGRAM: usize = 7;
/// Payload of one TS-over-UDP datagram
pub const DATAGRAM_SIZE: usize = TS_PACKET_SIZE * PACKETS_PER_DATAGRAM;

/// Receive buffer for a single datagram, one Ethernet MTU.
pub const MAX_DATAGRAM_SIZE: usize = 1500;

/// The 4-byte TS packet header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TSHeader {
    /// Always 0x47
    pub sync_byte: u8,
    /// Transport error indicator
    pub transport_error: bool,
    /// Payload unit start indicator
    pub payload_unit_start: bool,
    /// Transport priority
    pub transport_priority: bool,
    /// 13-bit packet identifier
    pub pid: u16,
    /// Transport scrambling control
    pub scrambling_control: u8,
    /// Adaptation field present
    pub adaptation_field_exists: bool,
    /// Payload present
    pub contains_payload: bool,
    /// 4-bit continuity counter
    pub continuity_counter: u8,
}

impl Default for TSHeader {
    fn default() -> Self {
        Self {
            sync_byte: SYNC_BYTE,
            transport_error: false,
            payload_unit_start: false,
            transport_priority: false,
            pid: 0,
            scrambling_control: 0,
            adaptation_field_exists: false,
            contains_payload: true,
            continuity_counter: 0,
        }
    }
}

impl TSHeader {
    /// Header of the null packet used as filler: payload only, CC 15.
    pub fn null() -> Self {
        Self {
            pid: PID_NULL,
            continuity_counter: 0x0f,
            ..Default::default()
        }
    }

    /// Appends the encoded header to `buf`.
    pub fn write_to(&self, buf: &mut BytesMut) {
        buf.put_u8(self.sync_byte);

        let mut b1 = 0u8;
        if self.transport_error {
            b1 |= 0x80;
        }
        if self.payload_unit_start {
            b1 |= 0x40;
        }
        if self.transport_priority {
            b1 |= 0x20;
        }
        b1 |= ((self.pid >> 8) & 0x1f) as u8;
        buf.put_u8(b1);

        buf.put_u8((self.pid & 0xff) as u8);

        let mut b3 = self.scrambling_control << 6;
        if self.adaptation_field_exists {
            b3 |= 0x20;
        }
        if self.contains_payload {
            b3 |= 0x10;
        }
        b3 |= self.continuity_counter & 0x0f;
        buf.put_u8(b3);
    }
}
