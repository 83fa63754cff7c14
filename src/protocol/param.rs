//! Parameter protocol messages (PARAM_* and PARAM_EXT_*).
//!
//! Classic PARAM carries every value as an IEEE-754 float (cast
//! convention). PARAM_EXT carries native little-endian bytes (strings
//! verbatim) in a 128-byte field. Param-id fields are NUL-terminated only
//! when strictly shorter than 16 bytes.

use crate::codec;
use crate::error::Result;

/// Maximum parameter name length on the wire.
pub const PARAM_ID_LEN: usize = 16;
/// Fixed size of the PARAM_EXT value field.
pub const PARAM_EXT_VALUE_LEN: usize = 128;

// PARAM_ACK values (PARAM_EXT_ACK.param_result)
pub const PARAM_ACK_ACCEPTED: u8 = 0;
pub const PARAM_ACK_VALUE_UNSUPPORTED: u8 = 1;
pub const PARAM_ACK_FAILED: u8 = 2;
pub const PARAM_ACK_IN_PROGRESS: u8 = 3;

/// MAV_PARAM_TYPE / MAV_PARAM_EXT_TYPE values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ParamWireType {
    Uint8 = 1,
    Int8 = 2,
    Uint16 = 3,
    Int16 = 4,
    Uint32 = 5,
    Int32 = 6,
    Uint64 = 7,
    Int64 = 8,
    Real32 = 9,
    Real64 = 10,
    /// PARAM_EXT only.
    Custom = 11,
}

impl ParamWireType {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Uint8),
            2 => Some(Self::Int8),
            3 => Some(Self::Uint16),
            4 => Some(Self::Int16),
            5 => Some(Self::Uint32),
            6 => Some(Self::Int32),
            7 => Some(Self::Uint64),
            8 => Some(Self::Int64),
            9 => Some(Self::Real32),
            10 => Some(Self::Real64),
            11 => Some(Self::Custom),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// True for the integer kinds (not float/double/custom).
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            Self::Uint8
                | Self::Int8
                | Self::Uint16
                | Self::Int16
                | Self::Uint32
                | Self::Int32
                | Self::Uint64
                | Self::Int64
        )
    }
}

/// PARAM_REQUEST_READ (20): read one parameter by name or index.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamRequestRead {
    pub target_system: u8,
    pub target_component: u8,
    pub param_id: String,
    /// -1 to look up by name.
    pub param_index: i16,
}

impl ParamRequestRead {
    pub const MSG_ID: u32 = 20;
    pub const CRC_EXTRA: u8 = 214;
    pub const WIRE_LEN: usize = 20;

    pub fn decode(payload: &[u8]) -> Result<Self> {
        let p = codec::padded(payload, Self::WIRE_LEN);
        Ok(Self {
            param_index: codec::read_i16(&p, 0)?,
            target_system: p[2],
            target_component: p[3],
            param_id: codec::read_fixed_str(&p, 4, PARAM_ID_LEN)?,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::WIRE_LEN);
        codec::write_i16(&mut buf, self.param_index);
        buf.push(self.target_system);
        buf.push(self.target_component);
        codec::write_fixed_str(&mut buf, &self.param_id, PARAM_ID_LEN);
        buf
    }
}

/// PARAM_REQUEST_LIST (21): request all parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamRequestList {
    pub target_system: u8,
    pub target_component: u8,
}

impl ParamRequestList {
    pub const MSG_ID: u32 = 21;
    pub const CRC_EXTRA: u8 = 159;
    pub const WIRE_LEN: usize = 2;

    pub fn decode(payload: &[u8]) -> Result<Self> {
        let p = codec::padded(payload, Self::WIRE_LEN);
        Ok(Self {
            target_system: p[0],
            target_component: p[1],
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        vec![self.target_system, self.target_component]
    }
}

/// PARAM_VALUE (22): one parameter, emitted on read, list walk, or set.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamValueMsg {
    pub param_id: String,
    /// Value cast through f32 per the classic convention.
    pub param_value: f32,
    pub param_type: ParamWireType,
    pub param_count: u16,
    pub param_index: u16,
}

impl ParamValueMsg {
    pub const MSG_ID: u32 = 22;
    pub const CRC_EXTRA: u8 = 220;
    pub const WIRE_LEN: usize = 25;

    pub fn decode(payload: &[u8]) -> Result<Self> {
        let p = codec::padded(payload, Self::WIRE_LEN);
        Ok(Self {
            param_value: codec::read_f32(&p, 0)?,
            param_count: codec::read_u16(&p, 4)?,
            param_index: codec::read_u16(&p, 6)?,
            param_id: codec::read_fixed_str(&p, 8, PARAM_ID_LEN)?,
            param_type: ParamWireType::from_byte(p[24]).unwrap_or(ParamWireType::Real32),
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::WIRE_LEN);
        codec::write_f32(&mut buf, self.param_value);
        codec::write_u16(&mut buf, self.param_count);
        codec::write_u16(&mut buf, self.param_index);
        codec::write_fixed_str(&mut buf, &self.param_id, PARAM_ID_LEN);
        buf.push(self.param_type.as_byte());
        buf
    }
}

/// PARAM_SET (23): write one parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSet {
    pub target_system: u8,
    pub target_component: u8,
    pub param_id: String,
    pub param_value: f32,
    pub param_type: ParamWireType,
}

impl ParamSet {
    pub const MSG_ID: u32 = 23;
    pub const CRC_EXTRA: u8 = 168;
    pub const WIRE_LEN: usize = 23;

    pub fn decode(payload: &[u8]) -> Result<Self> {
        let p = codec::padded(payload, Self::WIRE_LEN);
        Ok(Self {
            param_value: codec::read_f32(&p, 0)?,
            target_system: p[4],
            target_component: p[5],
            param_id: codec::read_fixed_str(&p, 6, PARAM_ID_LEN)?,
            param_type: ParamWireType::from_byte(p[22]).unwrap_or(ParamWireType::Real32),
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::WIRE_LEN);
        codec::write_f32(&mut buf, self.param_value);
        buf.push(self.target_system);
        buf.push(self.target_component);
        codec::write_fixed_str(&mut buf, &self.param_id, PARAM_ID_LEN);
        buf.push(self.param_type.as_byte());
        buf
    }
}

/// PARAM_EXT_REQUEST_READ (320).
#[derive(Debug, Clone, PartialEq)]
pub struct ParamExtRequestRead {
    pub target_system: u8,
    pub target_component: u8,
    pub param_id: String,
    pub param_index: i16,
}

impl ParamExtRequestRead {
    pub const MSG_ID: u32 = 320;
    pub const CRC_EXTRA: u8 = 243;
    pub const WIRE_LEN: usize = 20;

    pub fn decode(payload: &[u8]) -> Result<Self> {
        let p = codec::padded(payload, Self::WIRE_LEN);
        Ok(Self {
            param_index: codec::read_i16(&p, 0)?,
            target_system: p[2],
            target_component: p[3],
            param_id: codec::read_fixed_str(&p, 4, PARAM_ID_LEN)?,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::WIRE_LEN);
        codec::write_i16(&mut buf, self.param_index);
        buf.push(self.target_system);
        buf.push(self.target_component);
        codec::write_fixed_str(&mut buf, &self.param_id, PARAM_ID_LEN);
        buf
    }
}

/// PARAM_EXT_REQUEST_LIST (321).
#[derive(Debug, Clone, PartialEq)]
pub struct ParamExtRequestList {
    pub target_system: u8,
    pub target_component: u8,
}

impl ParamExtRequestList {
    pub const MSG_ID: u32 = 321;
    pub const CRC_EXTRA: u8 = 88;
    pub const WIRE_LEN: usize = 2;

    pub fn decode(payload: &[u8]) -> Result<Self> {
        let p = codec::padded(payload, Self::WIRE_LEN);
        Ok(Self {
            target_system: p[0],
            target_component: p[1],
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        vec![self.target_system, self.target_component]
    }
}

/// PARAM_EXT_VALUE (322): one parameter with native value bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamExtValue {
    pub param_id: String,
    /// Native little-endian value bytes (string bytes for custom values),
    /// at most [`PARAM_EXT_VALUE_LEN`].
    pub param_value: Vec<u8>,
    pub param_type: ParamWireType,
    pub param_count: u16,
    pub param_index: u16,
}

impl ParamExtValue {
    pub const MSG_ID: u32 = 322;
    pub const CRC_EXTRA: u8 = 243;
    pub const WIRE_LEN: usize = 149;

    pub fn decode(payload: &[u8]) -> Result<Self> {
        let p = codec::padded(payload, Self::WIRE_LEN);
        Ok(Self {
            param_count: codec::read_u16(&p, 0)?,
            param_index: codec::read_u16(&p, 2)?,
            param_id: codec::read_fixed_str(&p, 4, PARAM_ID_LEN)?,
            param_value: p[20..20 + PARAM_EXT_VALUE_LEN].to_vec(),
            param_type: ParamWireType::from_byte(p[148]).unwrap_or(ParamWireType::Custom),
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::WIRE_LEN);
        codec::write_u16(&mut buf, self.param_count);
        codec::write_u16(&mut buf, self.param_index);
        codec::write_fixed_str(&mut buf, &self.param_id, PARAM_ID_LEN);
        write_value_bytes(&mut buf, &self.param_value);
        buf.push(self.param_type.as_byte());
        buf
    }
}

/// PARAM_EXT_SET (323): write one parameter with native value bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamExtSet {
    pub target_system: u8,
    pub target_component: u8,
    pub param_id: String,
    pub param_value: Vec<u8>,
    pub param_type: ParamWireType,
}

impl ParamExtSet {
    pub const MSG_ID: u32 = 323;
    pub const CRC_EXTRA: u8 = 78;
    pub const WIRE_LEN: usize = 147;

    pub fn decode(payload: &[u8]) -> Result<Self> {
        let p = codec::padded(payload, Self::WIRE_LEN);
        Ok(Self {
            target_system: p[0],
            target_component: p[1],
            param_id: codec::read_fixed_str(&p, 2, PARAM_ID_LEN)?,
            param_value: p[18..18 + PARAM_EXT_VALUE_LEN].to_vec(),
            param_type: ParamWireType::from_byte(p[146]).unwrap_or(ParamWireType::Custom),
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::WIRE_LEN);
        buf.push(self.target_system);
        buf.push(self.target_component);
        codec::write_fixed_str(&mut buf, &self.param_id, PARAM_ID_LEN);
        write_value_bytes(&mut buf, &self.param_value);
        buf.push(self.param_type.as_byte());
        buf
    }
}

/// PARAM_EXT_ACK (324): response to PARAM_EXT_SET.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamExtAck {
    pub param_id: String,
    pub param_value: Vec<u8>,
    /// PARAM_ACK_* value.
    pub param_result: u8,
}

impl ParamExtAck {
    pub const MSG_ID: u32 = 324;
    pub const CRC_EXTRA: u8 = 132;
    pub const WIRE_LEN: usize = 145;

    pub fn decode(payload: &[u8]) -> Result<Self> {
        let p = codec::padded(payload, Self::WIRE_LEN);
        Ok(Self {
            param_id: codec::read_fixed_str(&p, 0, PARAM_ID_LEN)?,
            param_value: p[16..16 + PARAM_EXT_VALUE_LEN].to_vec(),
            param_result: p[144],
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::WIRE_LEN);
        codec::write_fixed_str(&mut buf, &self.param_id, PARAM_ID_LEN);
        write_value_bytes(&mut buf, &self.param_value);
        buf.push(self.param_result);
        buf
    }
}

/// Write value bytes into the fixed 128-byte ext field, zero-padded and
/// truncated at the field boundary.
fn write_value_bytes(buf: &mut Vec<u8>, value: &[u8]) {
    let n = value.len().min(PARAM_EXT_VALUE_LEN);
    buf.extend_from_slice(&value[..n]);
    buf.resize(buf.len() + (PARAM_EXT_VALUE_LEN - n), 0);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
