//! MAVLink v2 frame parsing, encoding, and checksum.
//!
//! Wire format:
//! ```text
//! FD LEN INCOMPAT COMPAT SEQ SYSID COMPID MSGID[3] PAYLOAD... CK_LO CK_HI [SIGNATURE]
//! ```
//!
//! The checksum is X.25 CRC-16 seeded with 0xFFFF, accumulated over the
//! bytes from LEN through the end of PAYLOAD plus the per-message CRC_EXTRA
//! byte. Outbound payloads have trailing zero bytes truncated (to a minimum
//! of one byte); inbound payloads are therefore zero-extended before field
//! reads (see [`crate::codec::padded`]).

use crate::error::{Result, WireError};

/// v2 magic marker.
pub const MAGIC: u8 = 0xFD;
/// Header length including the magic byte.
pub const HEADER_LEN: usize = 10;
/// Checksum length.
pub const CHECKSUM_LEN: usize = 2;
/// Signature trailer length when `IFLAG_SIGNED` is set.
pub const SIGNATURE_LEN: usize = 13;
/// Incompatibility flag: frame carries a signature trailer.
pub const IFLAG_SIGNED: u8 = 0x01;

const MIN_FRAME_LEN: usize = HEADER_LEN + CHECKSUM_LEN;

/// A parsed frame with header fields and (possibly truncated) payload.
#[derive(Debug, Clone)]
pub struct MavFrame {
    pub incompat_flags: u8,
    pub compat_flags: u8,
    pub seq: u8,
    pub system_id: u8,
    pub component_id: u8,
    pub msg_id: u32,
    /// Payload exactly as on the wire (after v2 truncation).
    pub payload: Vec<u8>,
    /// Received checksum (filled by `parse`; computed by `encode`).
    pub checksum: u16,
}

impl MavFrame {
    /// Build an outbound frame with clear flag bytes.
    pub fn new(seq: u8, system_id: u8, component_id: u8, msg_id: u32, payload: Vec<u8>) -> Self {
        Self {
            incompat_flags: 0,
            compat_flags: 0,
            seq,
            system_id,
            component_id,
            msg_id,
            payload,
            checksum: 0,
        }
    }

    /// Parse a single complete wire frame.
    ///
    /// Validates structure and flags but not the checksum — callers verify
    /// with [`MavFrame::verify`] once the message's CRC_EXTRA is known.
    /// Signed frames are accepted; the signature content is ignored.
    pub fn parse(wire: &[u8]) -> Result<Self> {
        if wire.len() < MIN_FRAME_LEN {
            return Err(WireError::FrameTooShort { len: wire.len(), min: MIN_FRAME_LEN });
        }
        if wire[0] != MAGIC {
            return Err(WireError::MissingMagic { got: wire[0] });
        }

        let len = wire[1] as usize;
        let incompat_flags = wire[2];
        if incompat_flags & !IFLAG_SIGNED != 0 {
            return Err(WireError::UnsupportedIncompatFlags { flags: incompat_flags });
        }
        let trailer = if incompat_flags & IFLAG_SIGNED != 0 { SIGNATURE_LEN } else { 0 };

        let total = HEADER_LEN + len + CHECKSUM_LEN + trailer;
        if wire.len() < total {
            return Err(WireError::FrameTooShort { len: wire.len(), min: total });
        }

        let msg_id = (wire[7] as u32) | ((wire[8] as u32) << 8) | ((wire[9] as u32) << 16);
        let ck_off = HEADER_LEN + len;
        let checksum = u16::from_le_bytes([wire[ck_off], wire[ck_off + 1]]);

        Ok(Self {
            incompat_flags,
            compat_flags: wire[3],
            seq: wire[4],
            system_id: wire[5],
            component_id: wire[6],
            msg_id,
            payload: wire[HEADER_LEN..ck_off].to_vec(),
            checksum,
        })
    }

    /// Check the received checksum against the frame contents.
    pub fn verify(&self, crc_extra: u8) -> Result<()> {
        let computed = self.compute_crc(&self.payload, crc_extra);
        if computed != self.checksum {
            return Err(WireError::ChecksumMismatch {
                expected: self.checksum,
                computed,
            });
        }
        Ok(())
    }

    /// Encode this frame into a complete wire frame.
    ///
    /// Trailing zero payload bytes are truncated per v2 rules (minimum one
    /// byte remains for non-empty payloads).
    pub fn encode(&self, crc_extra: u8) -> Vec<u8> {
        let trimmed = trim_payload(&self.payload);
        let mut wire = Vec::with_capacity(HEADER_LEN + trimmed.len() + CHECKSUM_LEN);
        wire.push(MAGIC);
        wire.push(trimmed.len() as u8);
        wire.push(0); // incompat_flags: never signed on encode
        wire.push(self.compat_flags);
        wire.push(self.seq);
        wire.push(self.system_id);
        wire.push(self.component_id);
        wire.push((self.msg_id & 0xFF) as u8);
        wire.push(((self.msg_id >> 8) & 0xFF) as u8);
        wire.push(((self.msg_id >> 16) & 0xFF) as u8);
        wire.extend_from_slice(trimmed);

        let crc = {
            let mut crc = CRC_INIT;
            for &b in &wire[1..] {
                crc = crc_accumulate(crc, b);
            }
            crc_accumulate(crc, crc_extra)
        };
        wire.extend_from_slice(&crc.to_le_bytes());
        wire
    }

    fn compute_crc(&self, payload: &[u8], crc_extra: u8) -> u16 {
        let mut crc = CRC_INIT;
        crc = crc_accumulate(crc, payload.len() as u8);
        crc = crc_accumulate(crc, self.incompat_flags);
        crc = crc_accumulate(crc, self.compat_flags);
        crc = crc_accumulate(crc, self.seq);
        crc = crc_accumulate(crc, self.system_id);
        crc = crc_accumulate(crc, self.component_id);
        crc = crc_accumulate(crc, (self.msg_id & 0xFF) as u8);
        crc = crc_accumulate(crc, ((self.msg_id >> 8) & 0xFF) as u8);
        crc = crc_accumulate(crc, ((self.msg_id >> 16) & 0xFF) as u8);
        for &b in payload {
            crc = crc_accumulate(crc, b);
        }
        crc_accumulate(crc, crc_extra)
    }
}

/// Truncate trailing zero bytes, keeping at least one byte of a non-empty
/// payload.
fn trim_payload(payload: &[u8]) -> &[u8] {
    if payload.is_empty() {
        return payload;
    }
    let end = payload.iter().rposition(|&b| b != 0).map_or(1, |p| p + 1);
    &payload[..end]
}

const CRC_INIT: u16 = 0xFFFF;

/// X.25 CRC-16 accumulate step.
fn crc_accumulate(crc: u16, byte: u8) -> u16 {
    let tmp = byte ^ (crc & 0xFF) as u8;
    let tmp = tmp ^ (tmp << 4);
    (crc >> 8) ^ ((tmp as u16) << 8) ^ ((tmp as u16) << 3) ^ ((tmp as u16) >> 4)
}

/// Splits a byte stream into individual frames. Buffers partial data across
/// calls, so it can be fed serial reads or coalesced UDP datagrams.
pub struct FrameSplitter {
    buf: Vec<u8>,
}

impl FrameSplitter {
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(512),
        }
    }

    /// Feed new data and extract any complete frames.
    ///
    /// Returns a vector of raw wire frames (each starting with the 0xFD
    /// magic). Partial frames are buffered for the next call; garbage ahead
    /// of the magic is discarded.
    pub fn feed(&mut self, data: &[u8]) -> Vec<Vec<u8>> {
        self.buf.extend_from_slice(data);
        let mut frames = Vec::new();

        loop {
            // Find magic marker
            let start = match self.buf.iter().position(|&b| b == MAGIC) {
                Some(pos) => pos,
                None => {
                    self.buf.clear();
                    break;
                }
            };

            // Discard any bytes before the marker
            if start > 0 {
                self.buf.drain(..start);
            }

            if self.buf.len() < MIN_FRAME_LEN {
                break; // incomplete header
            }

            let len = self.buf[1] as usize;
            let trailer = if self.buf[2] & IFLAG_SIGNED != 0 { SIGNATURE_LEN } else { 0 };
            let total = HEADER_LEN + len + CHECKSUM_LEN + trailer;
            if self.buf.len() < total {
                break; // incomplete frame
            }

            let frame: Vec<u8> = self.buf[..total].to_vec();
            self.buf.drain(..total);
            frames.push(frame);
        }

        frames
    }
}

impl Default for FrameSplitter {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
