//! Command protocol messages (COMMAND_LONG / COMMAND_ACK).

use crate::codec;
use crate::error::Result;

// ---------------------------------------------------------------------------
// MAV_CMD ids handled by the camera server
// ---------------------------------------------------------------------------

pub const CMD_REQUEST_CAMERA_INFORMATION: u16 = 521;
pub const CMD_REQUEST_CAMERA_SETTINGS: u16 = 522;
pub const CMD_REQUEST_STORAGE_INFORMATION: u16 = 525;
pub const CMD_STORAGE_FORMAT: u16 = 526;
pub const CMD_REQUEST_CAMERA_CAPTURE_STATUS: u16 = 527;
pub const CMD_RESET_CAMERA_SETTINGS: u16 = 529;
pub const CMD_SET_CAMERA_MODE: u16 = 530;
pub const CMD_SET_CAMERA_ZOOM: u16 = 531;
pub const CMD_SET_CAMERA_FOCUS: u16 = 532;
pub const CMD_SET_STORAGE_USAGE: u16 = 533;
pub const CMD_IMAGE_START_CAPTURE: u16 = 2000;
pub const CMD_IMAGE_STOP_CAPTURE: u16 = 2001;
pub const CMD_REQUEST_CAMERA_IMAGE_CAPTURE: u16 = 2002;
pub const CMD_VIDEO_START_CAPTURE: u16 = 2500;
pub const CMD_VIDEO_STOP_CAPTURE: u16 = 2501;
pub const CMD_VIDEO_START_STREAMING: u16 = 2502;
pub const CMD_VIDEO_STOP_STREAMING: u16 = 2503;
pub const CMD_REQUEST_VIDEO_STREAM_INFORMATION: u16 = 2504;
pub const CMD_REQUEST_VIDEO_STREAM_STATUS: u16 = 2505;

/// COMMAND_ACK result codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MavResult {
    Accepted = 0,
    TemporarilyRejected = 1,
    Denied = 2,
    Unsupported = 3,
    Failed = 4,
    InProgress = 5,
}

impl MavResult {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(Self::Accepted),
            1 => Some(Self::TemporarilyRejected),
            2 => Some(Self::Denied),
            3 => Some(Self::Unsupported),
            4 => Some(Self::Failed),
            5 => Some(Self::InProgress),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

/// COMMAND_LONG (76): a command with seven float parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandLong {
    pub target_system: u8,
    pub target_component: u8,
    pub command: u16,
    pub confirmation: u8,
    pub param1: f32,
    pub param2: f32,
    pub param3: f32,
    pub param4: f32,
    pub param5: f32,
    pub param6: f32,
    pub param7: f32,
}

impl CommandLong {
    pub const MSG_ID: u32 = 76;
    pub const CRC_EXTRA: u8 = 152;
    pub const WIRE_LEN: usize = 33;

    pub fn decode(payload: &[u8]) -> Result<Self> {
        let p = codec::padded(payload, Self::WIRE_LEN);
        Ok(Self {
            param1: codec::read_f32(&p, 0)?,
            param2: codec::read_f32(&p, 4)?,
            param3: codec::read_f32(&p, 8)?,
            param4: codec::read_f32(&p, 12)?,
            param5: codec::read_f32(&p, 16)?,
            param6: codec::read_f32(&p, 20)?,
            param7: codec::read_f32(&p, 24)?,
            command: codec::read_u16(&p, 28)?,
            target_system: p[30],
            target_component: p[31],
            confirmation: p[32],
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::WIRE_LEN);
        codec::write_f32(&mut buf, self.param1);
        codec::write_f32(&mut buf, self.param2);
        codec::write_f32(&mut buf, self.param3);
        codec::write_f32(&mut buf, self.param4);
        codec::write_f32(&mut buf, self.param5);
        codec::write_f32(&mut buf, self.param6);
        codec::write_f32(&mut buf, self.param7);
        codec::write_u16(&mut buf, self.command);
        buf.push(self.target_system);
        buf.push(self.target_component);
        buf.push(self.confirmation);
        buf
    }
}

/// COMMAND_ACK (77): result report for a received command.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandAck {
    pub command: u16,
    pub result: MavResult,
    /// Completion percentage for `InProgress` results; 0 otherwise.
    pub progress: u8,
    pub result_param2: i32,
    pub target_system: u8,
    pub target_component: u8,
}

impl CommandAck {
    pub const MSG_ID: u32 = 77;
    pub const CRC_EXTRA: u8 = 143;
    pub const WIRE_LEN: usize = 10;

    pub fn decode(payload: &[u8]) -> Result<Self> {
        let p = codec::padded(payload, Self::WIRE_LEN);
        Ok(Self {
            command: codec::read_u16(&p, 0)?,
            result: MavResult::from_byte(p[2]).unwrap_or(MavResult::Failed),
            progress: p[3],
            result_param2: codec::read_i32(&p, 4)?,
            target_system: p[8],
            target_component: p[9],
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::WIRE_LEN);
        codec::write_u16(&mut buf, self.command);
        buf.push(self.result.as_byte());
        buf.push(self.progress);
        codec::write_i32(&mut buf, self.result_param2);
        buf.push(self.target_system);
        buf.push(self.target_component);
        buf
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_long_round_trip() {
        let original = CommandLong {
            target_system: 1,
            target_component: 100,
            command: CMD_IMAGE_START_CAPTURE,
            confirmation: 0,
            param1: 0.0,
            param2: 0.5,
            param3: 3.0,
            param4: 10.0,
            param5: 0.0,
            param6: 0.0,
            param7: 0.0,
        };
        let decoded = CommandLong::decode(&original.encode()).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn command_long_field_offsets() {
        let cmd = CommandLong {
            target_system: 0xAA,
            target_component: 0xBB,
            command: 521,
            confirmation: 2,
            param1: 1.0,
            param2: 0.0,
            param3: 0.0,
            param4: 0.0,
            param5: 0.0,
            param6: 0.0,
            param7: 0.0,
        };
        let buf = cmd.encode();
        assert_eq!(buf.len(), CommandLong::WIRE_LEN);
        assert_eq!(u16::from_le_bytes([buf[28], buf[29]]), 521);
        assert_eq!(buf[30], 0xAA);
        assert_eq!(buf[31], 0xBB);
        assert_eq!(buf[32], 2);
    }

    #[test]
    fn command_long_decode_truncated() {
        // v2 truncation: a command with all-zero tail decodes the same
        let cmd = CommandLong::decode(&[0u8; 1]).unwrap();
        assert_eq!(cmd.command, 0);
        assert_eq!(cmd.param1, 0.0);
    }

    #[test]
    fn command_ack_round_trip() {
        let original = CommandAck {
            command: CMD_SET_CAMERA_MODE,
            result: MavResult::TemporarilyRejected,
            progress: 0,
            result_param2: 0,
            target_system: 245,
            target_component: 190,
        };
        let decoded = CommandAck::decode(&original.encode()).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn mav_result_bytes() {
        assert_eq!(MavResult::Accepted.as_byte(), 0);
        assert_eq!(MavResult::Unsupported.as_byte(), 3);
        assert_eq!(MavResult::from_byte(1), Some(MavResult::TemporarilyRejected));
        assert_eq!(MavResult::from_byte(9), None);
    }
}
