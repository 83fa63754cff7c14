//! Message types and decode/encode dispatch.
//!
//! - [`Inbound`] — messages a GCS sends to the camera component
//! - [`Outbound`] — messages the camera component sends to the GCS
//!
//! HEARTBEAT appears in both enums (every MAVLink peer emits it). Each
//! message struct carries its `MSG_ID`, `CRC_EXTRA`, and full `WIRE_LEN`;
//! [`crc_extra`] is the lookup used to verify inbound frames.

pub mod camera;
pub mod command;
pub mod heartbeat;
pub mod param;

use crate::error::Result;
use crate::frame::MavFrame;

use camera::{
    CameraCaptureStatus, CameraImageCaptured, CameraInformation, CameraSettings,
    StorageInformation, VideoStreamInformation,
};
use command::{CommandAck, CommandLong};
use heartbeat::Heartbeat;
use param::{
    ParamExtAck, ParamExtRequestList, ParamExtRequestRead, ParamExtSet, ParamExtValue,
    ParamRequestList, ParamRequestRead, ParamSet, ParamValueMsg,
};

/// CRC_EXTRA for a message id, or `None` for ids outside the dialect.
pub fn crc_extra(msg_id: u32) -> Option<u8> {
    match msg_id {
        Heartbeat::MSG_ID => Some(Heartbeat::CRC_EXTRA),
        ParamRequestRead::MSG_ID => Some(ParamRequestRead::CRC_EXTRA),
        ParamRequestList::MSG_ID => Some(ParamRequestList::CRC_EXTRA),
        ParamValueMsg::MSG_ID => Some(ParamValueMsg::CRC_EXTRA),
        ParamSet::MSG_ID => Some(ParamSet::CRC_EXTRA),
        CommandLong::MSG_ID => Some(CommandLong::CRC_EXTRA),
        CommandAck::MSG_ID => Some(CommandAck::CRC_EXTRA),
        CameraInformation::MSG_ID => Some(CameraInformation::CRC_EXTRA),
        CameraSettings::MSG_ID => Some(CameraSettings::CRC_EXTRA),
        StorageInformation::MSG_ID => Some(StorageInformation::CRC_EXTRA),
        CameraCaptureStatus::MSG_ID => Some(CameraCaptureStatus::CRC_EXTRA),
        CameraImageCaptured::MSG_ID => Some(CameraImageCaptured::CRC_EXTRA),
        VideoStreamInformation::MSG_ID => Some(VideoStreamInformation::CRC_EXTRA),
        ParamExtRequestRead::MSG_ID => Some(ParamExtRequestRead::CRC_EXTRA),
        ParamExtRequestList::MSG_ID => Some(ParamExtRequestList::CRC_EXTRA),
        ParamExtValue::MSG_ID => Some(ParamExtValue::CRC_EXTRA),
        ParamExtSet::MSG_ID => Some(ParamExtSet::CRC_EXTRA),
        ParamExtAck::MSG_ID => Some(ParamExtAck::CRC_EXTRA),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Inbound — messages a GCS sends to us
// ---------------------------------------------------------------------------

/// A message received from the GCS side.
#[derive(Debug, Clone)]
pub enum Inbound {
    Heartbeat(Heartbeat),
    CommandLong(CommandLong),
    ParamRequestRead(ParamRequestRead),
    ParamRequestList(ParamRequestList),
    ParamSet(ParamSet),
    ParamExtRequestRead(ParamExtRequestRead),
    ParamExtRequestList(ParamExtRequestList),
    ParamExtSet(ParamExtSet),

    // -- Forward compat --
    Unknown { msg_id: u32, payload: Vec<u8> },
}

impl Inbound {
    /// Decode a verified frame into a typed message.
    pub fn decode(frame: &MavFrame) -> Result<Self> {
        let p = &frame.payload;
        match frame.msg_id {
            Heartbeat::MSG_ID => Ok(Inbound::Heartbeat(Heartbeat::decode(p)?)),
            CommandLong::MSG_ID => Ok(Inbound::CommandLong(CommandLong::decode(p)?)),
            ParamRequestRead::MSG_ID => {
                Ok(Inbound::ParamRequestRead(ParamRequestRead::decode(p)?))
            }
            ParamRequestList::MSG_ID => {
                Ok(Inbound::ParamRequestList(ParamRequestList::decode(p)?))
            }
            ParamSet::MSG_ID => Ok(Inbound::ParamSet(ParamSet::decode(p)?)),
            ParamExtRequestRead::MSG_ID => {
                Ok(Inbound::ParamExtRequestRead(ParamExtRequestRead::decode(p)?))
            }
            ParamExtRequestList::MSG_ID => {
                Ok(Inbound::ParamExtRequestList(ParamExtRequestList::decode(p)?))
            }
            ParamExtSet::MSG_ID => Ok(Inbound::ParamExtSet(ParamExtSet::decode(p)?)),
            _ => Ok(Inbound::Unknown {
                msg_id: frame.msg_id,
                payload: p.to_vec(),
            }),
        }
    }

    /// The wire message id of this message.
    pub fn msg_id(&self) -> u32 {
        match self {
            Inbound::Heartbeat(_) => Heartbeat::MSG_ID,
            Inbound::CommandLong(_) => CommandLong::MSG_ID,
            Inbound::ParamRequestRead(_) => ParamRequestRead::MSG_ID,
            Inbound::ParamRequestList(_) => ParamRequestList::MSG_ID,
            Inbound::ParamSet(_) => ParamSet::MSG_ID,
            Inbound::ParamExtRequestRead(_) => ParamExtRequestRead::MSG_ID,
            Inbound::ParamExtRequestList(_) => ParamExtRequestList::MSG_ID,
            Inbound::ParamExtSet(_) => ParamExtSet::MSG_ID,
            Inbound::Unknown { msg_id, .. } => *msg_id,
        }
    }
}

// ---------------------------------------------------------------------------
// Outbound — messages we send to the GCS
// ---------------------------------------------------------------------------

/// A message the camera component emits.
#[derive(Debug, Clone)]
pub enum Outbound {
    Heartbeat(Heartbeat),
    CommandAck(CommandAck),
    CameraInformation(CameraInformation),
    CameraSettings(CameraSettings),
    StorageInformation(StorageInformation),
    CameraCaptureStatus(CameraCaptureStatus),
    CameraImageCaptured(CameraImageCaptured),
    VideoStreamInformation(VideoStreamInformation),
    ParamValue(ParamValueMsg),
    ParamExtValue(ParamExtValue),
    ParamExtAck(ParamExtAck),
}

impl Outbound {
    /// Encode into `(msg_id, crc_extra, payload)` ready for framing.
    pub fn encode(&self) -> (u32, u8, Vec<u8>) {
        match self {
            Outbound::Heartbeat(m) => (Heartbeat::MSG_ID, Heartbeat::CRC_EXTRA, m.encode()),
            Outbound::CommandAck(m) => (CommandAck::MSG_ID, CommandAck::CRC_EXTRA, m.encode()),
            Outbound::CameraInformation(m) => {
                (CameraInformation::MSG_ID, CameraInformation::CRC_EXTRA, m.encode())
            }
            Outbound::CameraSettings(m) => {
                (CameraSettings::MSG_ID, CameraSettings::CRC_EXTRA, m.encode())
            }
            Outbound::StorageInformation(m) => {
                (StorageInformation::MSG_ID, StorageInformation::CRC_EXTRA, m.encode())
            }
            Outbound::CameraCaptureStatus(m) => {
                (CameraCaptureStatus::MSG_ID, CameraCaptureStatus::CRC_EXTRA, m.encode())
            }
            Outbound::CameraImageCaptured(m) => {
                (CameraImageCaptured::MSG_ID, CameraImageCaptured::CRC_EXTRA, m.encode())
            }
            Outbound::VideoStreamInformation(m) => (
                VideoStreamInformation::MSG_ID,
                VideoStreamInformation::CRC_EXTRA,
                m.encode(),
            ),
            Outbound::ParamValue(m) => (ParamValueMsg::MSG_ID, ParamValueMsg::CRC_EXTRA, m.encode()),
            Outbound::ParamExtValue(m) => {
                (ParamExtValue::MSG_ID, ParamExtValue::CRC_EXTRA, m.encode())
            }
            Outbound::ParamExtAck(m) => (ParamExtAck::MSG_ID, ParamExtAck::CRC_EXTRA, m.encode()),
        }
    }

    /// The wire message id of this message.
    pub fn msg_id(&self) -> u32 {
        self.encode().0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_command_long_frame() {
        let cmd = CommandLong {
            target_system: 1,
            target_component: 100,
            command: command::CMD_IMAGE_STOP_CAPTURE,
            confirmation: 0,
            param1: 0.0,
            param2: 0.0,
            param3: 0.0,
            param4: 0.0,
            param5: 0.0,
            param6: 0.0,
            param7: 0.0,
        };
        let frame = MavFrame::new(0, 245, 190, CommandLong::MSG_ID, cmd.encode());
        let wire = frame.encode(CommandLong::CRC_EXTRA);

        let parsed = MavFrame::parse(&wire).unwrap();
        parsed.verify(crc_extra(parsed.msg_id).unwrap()).unwrap();
        match Inbound::decode(&parsed).unwrap() {
            Inbound::CommandLong(decoded) => assert_eq!(decoded, cmd),
            other => panic!("expected CommandLong, got {other:?}"),
        }
    }

    #[test]
    fn decode_unknown_msg_id() {
        let frame = MavFrame::new(0, 1, 1, 4242, vec![1, 2, 3]);
        match Inbound::decode(&frame).unwrap() {
            Inbound::Unknown { msg_id, payload } => {
                assert_eq!(msg_id, 4242);
                assert_eq!(payload, vec![1, 2, 3]);
            }
            other => panic!("expected Unknown, got {other:?}"),
        }
    }

    #[test]
    fn crc_extra_covers_dialect() {
        for id in [0u32, 20, 21, 22, 23, 76, 77, 259, 260, 261, 262, 263, 269, 320, 321, 322, 323, 324] {
            assert!(crc_extra(id).is_some(), "missing crc_extra for {id}");
        }
        assert_eq!(crc_extra(4242), None);
    }

    #[test]
    fn outbound_encode_ids_match() {
        let ack = Outbound::CommandAck(CommandAck {
            command: 521,
            result: command::MavResult::Accepted,
            progress: 0,
            result_param2: 0,
            target_system: 245,
            target_component: 190,
        });
        let (id, extra, payload) = ack.encode();
        assert_eq!(id, CommandAck::MSG_ID);
        assert_eq!(extra, CommandAck::CRC_EXTRA);
        assert_eq!(payload.len(), CommandAck::WIRE_LEN);
    }
}
