//! Camera dialect messages (camera component → GCS).
//!
//! Field offsets follow MAVLink wire order: descending element size,
//! declaration order within a size class, extension fields appended last.

use crate::codec;
use crate::error::Result;

// ---------------------------------------------------------------------------
// Wire enum values
// ---------------------------------------------------------------------------

// CAMERA_MODE
pub const CAMERA_MODE_IMAGE: u8 = 0;
pub const CAMERA_MODE_VIDEO: u8 = 1;

// CAMERA_CAP_FLAGS
pub const CAP_FLAG_CAPTURE_VIDEO: u32 = 1;
pub const CAP_FLAG_CAPTURE_IMAGE: u32 = 2;
pub const CAP_FLAG_HAS_VIDEO_STREAM: u32 = 256;

// CAMERA_CAPTURE_STATUS.image_status bits
pub const IMAGE_STATUS_IN_PROGRESS: u8 = 1 << 0;
pub const IMAGE_STATUS_INTERVAL_SET: u8 = 1 << 1;

// STORAGE_STATUS
pub const STORAGE_STATUS_EMPTY: u8 = 0;
pub const STORAGE_STATUS_UNFORMATTED: u8 = 1;
pub const STORAGE_STATUS_READY: u8 = 2;
pub const STORAGE_STATUS_NOT_SUPPORTED: u8 = 3;

// STORAGE_TYPE
pub const STORAGE_TYPE_UNKNOWN: u8 = 0;
pub const STORAGE_TYPE_USB_STICK: u8 = 1;
pub const STORAGE_TYPE_SD: u8 = 2;
pub const STORAGE_TYPE_MICROSD: u8 = 3;
pub const STORAGE_TYPE_HD: u8 = 7;
pub const STORAGE_TYPE_OTHER: u8 = 254;

// VIDEO_STREAM_STATUS_FLAGS
pub const VIDEO_STREAM_STATUS_FLAGS_RUNNING: u16 = 1;
pub const VIDEO_STREAM_STATUS_FLAGS_THERMAL: u16 = 2;

// VIDEO_STREAM_TYPE
pub const VIDEO_STREAM_TYPE_RTSP: u8 = 0;

// ---------------------------------------------------------------------------
// Firmware version quad
// ---------------------------------------------------------------------------

/// Parse a `"major.minor.patch.dev"` version string into the packed wire
/// encoding `dev<<24 | patch<<16 | minor<<8 | major`.
///
/// Trailing components may be omitted (`"1.0.0"` is valid) and default to
/// zero. The empty string means "no version" and packs to 0. Returns `None`
/// for anything else that does not parse as up to four `u8` fields.
pub fn parse_version(version: &str) -> Option<u32> {
    if version.is_empty() {
        return Some(0);
    }

    let mut quad = [0u8; 4];
    let mut parts = 0;
    for part in version.split('.') {
        if parts == 4 {
            return None;
        }
        quad[parts] = part.parse().ok()?;
        parts += 1;
    }

    let [major, minor, patch, dev] = quad.map(u32::from);
    Some(dev << 24 | patch << 16 | minor << 8 | major)
}

// ---------------------------------------------------------------------------
// CAMERA_INFORMATION
// ---------------------------------------------------------------------------

/// CAMERA_INFORMATION (259): static camera description.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraInformation {
    pub time_boot_ms: u32,
    pub vendor_name: String,
    pub model_name: String,
    /// Packed version quad (see [`parse_version`]).
    pub firmware_version: u32,
    pub focal_length_mm: f32,
    pub sensor_size_h_mm: f32,
    pub sensor_size_v_mm: f32,
    pub resolution_h_px: u16,
    pub resolution_v_px: u16,
    pub lens_id: u8,
    /// CAMERA_CAP_FLAGS bitmask.
    pub flags: u32,
    pub definition_version: u16,
    pub definition_uri: String,
}

impl CameraInformation {
    pub const MSG_ID: u32 = 259;
    pub const CRC_EXTRA: u8 = 92;
    pub const WIRE_LEN: usize = 235;

    pub fn decode(payload: &[u8]) -> Result<Self> {
        let p = codec::padded(payload, Self::WIRE_LEN);
        Ok(Self {
            time_boot_ms: codec::read_u32(&p, 0)?,
            firmware_version: codec::read_u32(&p, 4)?,
            focal_length_mm: codec::read_f32(&p, 8)?,
            sensor_size_h_mm: codec::read_f32(&p, 12)?,
            sensor_size_v_mm: codec::read_f32(&p, 16)?,
            flags: codec::read_u32(&p, 20)?,
            resolution_h_px: codec::read_u16(&p, 24)?,
            resolution_v_px: codec::read_u16(&p, 26)?,
            definition_version: codec::read_u16(&p, 28)?,
            vendor_name: codec::read_fixed_str(&p, 30, 32)?,
            model_name: codec::read_fixed_str(&p, 62, 32)?,
            lens_id: p[94],
            definition_uri: codec::read_fixed_str(&p, 95, 140)?,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::WIRE_LEN);
        codec::write_u32(&mut buf, self.time_boot_ms);
        codec::write_u32(&mut buf, self.firmware_version);
        codec::write_f32(&mut buf, self.focal_length_mm);
        codec::write_f32(&mut buf, self.sensor_size_h_mm);
        codec::write_f32(&mut buf, self.sensor_size_v_mm);
        codec::write_u32(&mut buf, self.flags);
        codec::write_u16(&mut buf, self.resolution_h_px);
        codec::write_u16(&mut buf, self.resolution_v_px);
        codec::write_u16(&mut buf, self.definition_version);
        codec::write_fixed_str(&mut buf, &self.vendor_name, 32);
        codec::write_fixed_str(&mut buf, &self.model_name, 32);
        buf.push(self.lens_id);
        codec::write_fixed_str(&mut buf, &self.definition_uri, 140);
        buf
    }
}

// ---------------------------------------------------------------------------
// CAMERA_SETTINGS
// ---------------------------------------------------------------------------

/// CAMERA_SETTINGS (260): current mode and zoom/focus levels.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraSettings {
    pub time_boot_ms: u32,
    pub mode_id: u8,
    pub zoom_level: f32,
    pub focus_level: f32,
}

impl CameraSettings {
    pub const MSG_ID: u32 = 260;
    pub const CRC_EXTRA: u8 = 146;
    pub const WIRE_LEN: usize = 13;

    pub fn decode(payload: &[u8]) -> Result<Self> {
        let p = codec::padded(payload, Self::WIRE_LEN);
        Ok(Self {
            time_boot_ms: codec::read_u32(&p, 0)?,
            mode_id: p[4],
            zoom_level: codec::read_f32(&p, 5)?,
            focus_level: codec::read_f32(&p, 9)?,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::WIRE_LEN);
        codec::write_u32(&mut buf, self.time_boot_ms);
        buf.push(self.mode_id);
        codec::write_f32(&mut buf, self.zoom_level);
        codec::write_f32(&mut buf, self.focus_level);
        buf
    }
}

// ---------------------------------------------------------------------------
// STORAGE_INFORMATION
// ---------------------------------------------------------------------------

/// STORAGE_INFORMATION (261): capacity and status of one storage device.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageInformation {
    pub time_boot_ms: u32,
    pub storage_id: u8,
    pub storage_count: u8,
    /// STORAGE_STATUS value.
    pub status: u8,
    pub total_capacity_mib: f32,
    pub used_capacity_mib: f32,
    pub available_capacity_mib: f32,
    pub read_speed: f32,
    pub write_speed: f32,
    /// STORAGE_TYPE value.
    pub storage_type: u8,
    pub name: String,
    pub storage_usage: u8,
}

impl StorageInformation {
    pub const MSG_ID: u32 = 261;
    pub const CRC_EXTRA: u8 = 179;
    pub const WIRE_LEN: usize = 61;

    pub fn decode(payload: &[u8]) -> Result<Self> {
        let p = codec::padded(payload, Self::WIRE_LEN);
        Ok(Self {
            time_boot_ms: codec::read_u32(&p, 0)?,
            total_capacity_mib: codec::read_f32(&p, 4)?,
            used_capacity_mib: codec::read_f32(&p, 8)?,
            available_capacity_mib: codec::read_f32(&p, 12)?,
            read_speed: codec::read_f32(&p, 16)?,
            write_speed: codec::read_f32(&p, 20)?,
            storage_id: p[24],
            storage_count: p[25],
            status: p[26],
            storage_type: p[27],
            name: codec::read_fixed_str(&p, 28, 32)?,
            storage_usage: p[60],
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::WIRE_LEN);
        codec::write_u32(&mut buf, self.time_boot_ms);
        codec::write_f32(&mut buf, self.total_capacity_mib);
        codec::write_f32(&mut buf, self.used_capacity_mib);
        codec::write_f32(&mut buf, self.available_capacity_mib);
        codec::write_f32(&mut buf, self.read_speed);
        codec::write_f32(&mut buf, self.write_speed);
        buf.push(self.storage_id);
        buf.push(self.storage_count);
        buf.push(self.status);
        buf.push(self.storage_type);
        codec::write_fixed_str(&mut buf, &self.name, 32);
        buf.push(self.storage_usage);
        buf
    }
}

// ---------------------------------------------------------------------------
// CAMERA_CAPTURE_STATUS
// ---------------------------------------------------------------------------

/// CAMERA_CAPTURE_STATUS (262): image/video capture state snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraCaptureStatus {
    pub time_boot_ms: u32,
    /// IMAGE_STATUS_* bitfield.
    pub image_status: u8,
    /// 0 = idle, 1 = recording.
    pub video_status: u8,
    pub image_interval_s: f32,
    pub recording_time_ms: u32,
    pub available_capacity_mib: f32,
    pub image_count: i32,
}

impl CameraCaptureStatus {
    pub const MSG_ID: u32 = 262;
    pub const CRC_EXTRA: u8 = 12;
    pub const WIRE_LEN: usize = 22;

    pub fn decode(payload: &[u8]) -> Result<Self> {
        let p = codec::padded(payload, Self::WIRE_LEN);
        Ok(Self {
            time_boot_ms: codec::read_u32(&p, 0)?,
            image_interval_s: codec::read_f32(&p, 4)?,
            recording_time_ms: codec::read_u32(&p, 8)?,
            available_capacity_mib: codec::read_f32(&p, 12)?,
            image_status: p[16],
            video_status: p[17],
            image_count: codec::read_i32(&p, 18)?,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::WIRE_LEN);
        codec::write_u32(&mut buf, self.time_boot_ms);
        codec::write_f32(&mut buf, self.image_interval_s);
        codec::write_u32(&mut buf, self.recording_time_ms);
        codec::write_f32(&mut buf, self.available_capacity_mib);
        buf.push(self.image_status);
        buf.push(self.video_status);
        codec::write_i32(&mut buf, self.image_count);
        buf
    }
}

// ---------------------------------------------------------------------------
// CAMERA_IMAGE_CAPTURED
// ---------------------------------------------------------------------------

/// CAMERA_IMAGE_CAPTURED (263): capture event with position and attitude.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraImageCaptured {
    pub time_boot_ms: u32,
    pub time_utc_us: u64,
    /// Deprecated, always 0.
    pub camera_id: u8,
    /// Latitude, degrees * 1e7.
    pub lat: i32,
    /// Longitude, degrees * 1e7.
    pub lon: i32,
    /// Altitude MSL, millimeters.
    pub alt_mm: i32,
    /// Altitude above ground, millimeters.
    pub relative_alt_mm: i32,
    /// Attitude quaternion [w, x, y, z].
    pub q: [f32; 4],
    pub image_index: i32,
    /// 1 on success, 0 on failure.
    pub capture_result: i8,
    pub file_url: String,
}

impl CameraImageCaptured {
    pub const MSG_ID: u32 = 263;
    pub const CRC_EXTRA: u8 = 133;
    pub const WIRE_LEN: usize = 255;
    /// Fixed wire size of the file_url field.
    pub const FILE_URL_LEN: usize = 205;

    pub fn decode(payload: &[u8]) -> Result<Self> {
        let p = codec::padded(payload, Self::WIRE_LEN);
        Ok(Self {
            time_utc_us: codec::read_u64(&p, 0)?,
            time_boot_ms: codec::read_u32(&p, 8)?,
            lat: codec::read_i32(&p, 12)?,
            lon: codec::read_i32(&p, 16)?,
            alt_mm: codec::read_i32(&p, 20)?,
            relative_alt_mm: codec::read_i32(&p, 24)?,
            q: [
                codec::read_f32(&p, 28)?,
                codec::read_f32(&p, 32)?,
                codec::read_f32(&p, 36)?,
                codec::read_f32(&p, 40)?,
            ],
            image_index: codec::read_i32(&p, 44)?,
            camera_id: p[48],
            capture_result: p[49] as i8,
            file_url: codec::read_fixed_str(&p, 50, Self::FILE_URL_LEN)?,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::WIRE_LEN);
        codec::write_u64(&mut buf, self.time_utc_us);
        codec::write_u32(&mut buf, self.time_boot_ms);
        codec::write_i32(&mut buf, self.lat);
        codec::write_i32(&mut buf, self.lon);
        codec::write_i32(&mut buf, self.alt_mm);
        codec::write_i32(&mut buf, self.relative_alt_mm);
        for q in self.q {
            codec::write_f32(&mut buf, q);
        }
        codec::write_i32(&mut buf, self.image_index);
        buf.push(self.camera_id);
        buf.push(self.capture_result as u8);
        codec::write_fixed_str(&mut buf, &self.file_url, Self::FILE_URL_LEN);
        buf
    }
}

// ---------------------------------------------------------------------------
// VIDEO_STREAM_INFORMATION
// ---------------------------------------------------------------------------

/// VIDEO_STREAM_INFORMATION (269): one configured video stream.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoStreamInformation {
    pub stream_id: u8,
    /// Number of streams available.
    pub count: u8,
    /// VIDEO_STREAM_TYPE value.
    pub stream_type: u8,
    /// VIDEO_STREAM_STATUS_FLAGS bitmask.
    pub flags: u16,
    pub framerate_hz: f32,
    pub resolution_h_px: u16,
    pub resolution_v_px: u16,
    pub bitrate_b_s: u32,
    pub rotation_deg: u16,
    pub hfov_deg: u16,
    pub name: String,
    pub uri: String,
}

impl VideoStreamInformation {
    pub const MSG_ID: u32 = 269;
    pub const CRC_EXTRA: u8 = 109;
    pub const WIRE_LEN: usize = 213;

    pub fn decode(payload: &[u8]) -> Result<Self> {
        let p = codec::padded(payload, Self::WIRE_LEN);
        Ok(Self {
            framerate_hz: codec::read_f32(&p, 0)?,
            bitrate_b_s: codec::read_u32(&p, 4)?,
            flags: codec::read_u16(&p, 8)?,
            resolution_h_px: codec::read_u16(&p, 10)?,
            resolution_v_px: codec::read_u16(&p, 12)?,
            rotation_deg: codec::read_u16(&p, 14)?,
            hfov_deg: codec::read_u16(&p, 16)?,
            stream_id: p[18],
            count: p[19],
            stream_type: p[20],
            name: codec::read_fixed_str(&p, 21, 32)?,
            uri: codec::read_fixed_str(&p, 53, 160)?,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::WIRE_LEN);
        codec::write_f32(&mut buf, self.framerate_hz);
        codec::write_u32(&mut buf, self.bitrate_b_s);
        codec::write_u16(&mut buf, self.flags);
        codec::write_u16(&mut buf, self.resolution_h_px);
        codec::write_u16(&mut buf, self.resolution_v_px);
        codec::write_u16(&mut buf, self.rotation_deg);
        codec::write_u16(&mut buf, self.hfov_deg);
        buf.push(self.stream_id);
        buf.push(self.count);
        buf.push(self.stream_type);
        codec::write_fixed_str(&mut buf, &self.name, 32);
        codec::write_fixed_str(&mut buf, &self.uri, 160);
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
    fn version_packs_dotted_quad() {
        assert_eq!(parse_version("1.2.3.4"), Some(0x0403_0201));
        assert_eq!(parse_version("255.255.255.255"), Some(0xFFFF_FFFF));
    }

    #[test]
    fn version_short_forms() {
        assert_eq!(parse_version("1.0.0"), Some(0x0000_0001));
        assert_eq!(parse_version("2.1"), Some(0x0000_0102));
    }

    #[test]
    fn version_empty_is_zero() {
        assert_eq!(parse_version(""), Some(0));
    }

    #[test]
    fn version_malformed() {
        assert_eq!(parse_version("abc"), None);
        assert_eq!(parse_version("1.2.3.4.5"), None);
        assert_eq!(parse_version("256.0.0.0"), None);
        assert_eq!(parse_version("1..2"), None);
    }

    #[test]
    fn version_round_trips_through_information() {
        let packed = parse_version("1.2.3.4").unwrap();
        let msg = CameraInformation {
            time_boot_ms: 0,
            vendor_name: "MAVSDK".into(),
            model_name: "X".into(),
            firmware_version: packed,
            focal_length_mm: 3.0,
            sensor_size_h_mm: 3.68,
            sensor_size_v_mm: 2.76,
            resolution_h_px: 3280,
            resolution_v_px: 2464,
            lens_id: 0,
            flags: 0,
            definition_version: 1,
            definition_uri: "mftp://camera.xml".into(),
        };
        let decoded = CameraInformation::decode(&msg.encode()).unwrap();
        assert_eq!(decoded.firmware_version, packed);
        assert_eq!(decoded, msg);
    }

    #[test]
    fn information_field_offsets() {
        let msg = CameraInformation {
            time_boot_ms: 0x11223344,
            vendor_name: "V".into(),
            model_name: "M".into(),
            firmware_version: 0x04030201,
            focal_length_mm: 0.0,
            sensor_size_h_mm: 0.0,
            sensor_size_v_mm: 0.0,
            resolution_h_px: 0,
            resolution_v_px: 0,
            lens_id: 9,
            flags: 0,
            definition_version: 0,
            definition_uri: String::new(),
        };
        let buf = msg.encode();
        assert_eq!(buf.len(), CameraInformation::WIRE_LEN);
        assert_eq!(&buf[4..8], &[0x01, 0x02, 0x03, 0x04]);
        assert_eq!(buf[30], b'V');
        assert_eq!(buf[62], b'M');
        assert_eq!(buf[94], 9);
    }

    #[test]
    fn settings_round_trip() {
        let msg = CameraSettings {
            time_boot_ms: 1234,
            mode_id: CAMERA_MODE_IMAGE,
            zoom_level: 0.0,
            focus_level: 0.0,
        };
        assert_eq!(CameraSettings::decode(&msg.encode()).unwrap(), msg);
    }

    #[test]
    fn storage_information_round_trip() {
        let msg = StorageInformation {
            time_boot_ms: 99,
            storage_id: 1,
            storage_count: 1,
            status: STORAGE_STATUS_READY,
            total_capacity_mib: 4194304.0,
            used_capacity_mib: 100.0,
            available_capacity_mib: 4194204.0,
            read_speed: 80.0,
            write_speed: 40.0,
            storage_type: STORAGE_TYPE_MICROSD,
            name: String::new(),
            storage_usage: 0,
        };
        assert_eq!(StorageInformation::decode(&msg.encode()).unwrap(), msg);
    }

    #[test]
    fn capture_status_round_trip() {
        let msg = CameraCaptureStatus {
            time_boot_ms: 555,
            image_status: IMAGE_STATUS_IN_PROGRESS | IMAGE_STATUS_INTERVAL_SET,
            video_status: 1,
            image_interval_s: 0.5,
            recording_time_ms: 1500,
            available_capacity_mib: 1024.0,
            image_count: 42,
        };
        assert_eq!(CameraCaptureStatus::decode(&msg.encode()).unwrap(), msg);
    }

    #[test]
    fn image_captured_scaling_example() {
        // 47.3977° / 8.5456° at 500 m, identity attitude
        let msg = CameraImageCaptured {
            time_boot_ms: 1,
            time_utc_us: 1_700_000_000_000_000,
            camera_id: 0,
            lat: 473_977_000,
            lon: 85_456_000,
            alt_mm: 500_000,
            relative_alt_mm: 0,
            q: [1.0, 0.0, 0.0, 0.0],
            image_index: 1,
            capture_result: 1,
            file_url: String::new(),
        };
        let decoded = CameraImageCaptured::decode(&msg.encode()).unwrap();
        assert_eq!(decoded.lat, 473_977_000);
        assert_eq!(decoded.lon, 85_456_000);
        assert_eq!(decoded.alt_mm, 500_000);
        assert_eq!(decoded.q, [1.0, 0.0, 0.0, 0.0]);
        assert_eq!(decoded.image_index, 1);
        assert_eq!(decoded.capture_result, 1);
    }

    #[test]
    fn image_captured_file_url_field_is_205_bytes() {
        let msg = CameraImageCaptured {
            time_boot_ms: 0,
            time_utc_us: 0,
            camera_id: 0,
            lat: 0,
            lon: 0,
            alt_mm: 0,
            relative_alt_mm: 0,
            q: [1.0, 0.0, 0.0, 0.0],
            image_index: 0,
            capture_result: 1,
            file_url: "mftp://photos/1.jpg".into(),
        };
        let buf = msg.encode();
        assert_eq!(buf.len(), CameraImageCaptured::WIRE_LEN);
        assert_eq!(&buf[50..50 + 19], b"mftp://photos/1.jpg");
        assert!(buf[50 + 19..].iter().all(|&b| b == 0));
    }

    #[test]
    fn video_stream_information_round_trip() {
        let msg = VideoStreamInformation {
            stream_id: 1,
            count: 2,
            stream_type: VIDEO_STREAM_TYPE_RTSP,
            flags: VIDEO_STREAM_STATUS_FLAGS_RUNNING,
            framerate_hz: 30.0,
            resolution_h_px: 1920,
            resolution_v_px: 1080,
            bitrate_b_s: 4_000_000,
            rotation_deg: 0,
            hfov_deg: 90,
            name: String::new(),
            uri: "rtsp://192.168.0.10/live".into(),
        };
        assert_eq!(VideoStreamInformation::decode(&msg.encode()).unwrap(), msg);
    }
}
