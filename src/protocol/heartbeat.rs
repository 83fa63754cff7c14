//! HEARTBEAT message.

use crate::codec;
use crate::error::Result;

// MAV_TYPE / MAV_AUTOPILOT / MAV_STATE values used by a camera component.
pub const MAV_TYPE_CAMERA: u8 = 30;
pub const MAV_AUTOPILOT_INVALID: u8 = 8;
pub const MAV_STATE_ACTIVE: u8 = 4;

/// HEARTBEAT (0): component presence announcement, nominally at 1 Hz.
#[derive(Debug, Clone, PartialEq)]
pub struct Heartbeat {
    pub custom_mode: u32,
    pub mav_type: u8,
    pub autopilot: u8,
    pub base_mode: u8,
    pub system_status: u8,
    pub mavlink_version: u8,
}

impl Heartbeat {
    pub const MSG_ID: u32 = 0;
    pub const CRC_EXTRA: u8 = 50;
    pub const WIRE_LEN: usize = 9;

    /// A camera component heartbeat.
    pub fn camera() -> Self {
        Self {
            custom_mode: 0,
            mav_type: MAV_TYPE_CAMERA,
            autopilot: MAV_AUTOPILOT_INVALID,
            base_mode: 0,
            system_status: MAV_STATE_ACTIVE,
            mavlink_version: 3,
        }
    }

    pub fn decode(payload: &[u8]) -> Result<Self> {
        let p = codec::padded(payload, Self::WIRE_LEN);
        Ok(Self {
            custom_mode: codec::read_u32(&p, 0)?,
            mav_type: p[4],
            autopilot: p[5],
            base_mode: p[6],
            system_status: p[7],
            mavlink_version: p[8],
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::WIRE_LEN);
        codec::write_u32(&mut buf, self.custom_mode);
        buf.push(self.mav_type);
        buf.push(self.autopilot);
        buf.push(self.base_mode);
        buf.push(self.system_status);
        buf.push(self.mavlink_version);
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let original = Heartbeat::camera();
        assert_eq!(Heartbeat::decode(&original.encode()).unwrap(), original);
    }

    #[test]
    fn camera_identity() {
        let hb = Heartbeat::camera();
        assert_eq!(hb.mav_type, MAV_TYPE_CAMERA);
        assert_eq!(hb.autopilot, MAV_AUTOPILOT_INVALID);
    }
}
