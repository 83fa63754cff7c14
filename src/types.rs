//! Domain data model for the camera server.
//!
//! These types are what the embedding application works with; they cross
//! into wire enums and messages only at the protocol boundary.

/// Static camera description, set once to activate the camera.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Information {
    /// At most 32 bytes.
    pub vendor_name: String,
    /// At most 32 bytes.
    pub model_name: String,
    /// Dotted quad `"major.minor.patch.dev"`, each 0-255. Empty means
    /// "no version".
    pub firmware_version: String,
    pub focal_length_mm: f32,
    pub horizontal_sensor_size_mm: f32,
    pub vertical_sensor_size_mm: f32,
    pub horizontal_resolution_px: u16,
    pub vertical_resolution_px: u16,
    pub lens_id: u8,
    pub definition_file_version: u32,
    /// At most 140 bytes; `mftp://` or `ftp://` scheme.
    pub definition_file_uri: String,
}

/// Global position of a capture.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Position {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub absolute_altitude_m: f32,
    pub relative_altitude_m: f32,
}

/// Attitude quaternion (Hamilton convention, w first).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Quaternion {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Quaternion {
    /// The identity rotation.
    pub fn identity() -> Self {
        Self { w: 1.0, x: 0.0, y: 0.0, z: 0.0 }
    }
}

/// Result of a single photo capture, passed to
/// [`CameraServer::respond_take_photo`](crate::CameraServer::respond_take_photo).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CaptureInfo {
    pub position: Position,
    pub attitude_quaternion: Quaternion,
    /// Capture wall-clock time, microseconds since epoch.
    pub time_utc_us: u64,
    pub is_success: bool,
    /// Capture sequence number, or [`CaptureInfo::INTERVAL_INDEX`] for
    /// captures synthesised by the interval engine (those do not advance
    /// the image counter).
    pub index: i32,
    /// At most 205 bytes.
    pub file_url: String,
}

impl CaptureInfo {
    /// Sentinel index for interval-engine captures.
    pub const INTERVAL_INDEX: i32 = i32::MIN;
}

/// Application feedback on a take-photo request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum TakePhotoFeedback {
    Unknown,
    Ok,
    Busy,
    Failed,
}

/// Camera operating mode (server domain).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Mode {
    Unknown,
    Photo,
    Video,
}

/// Storage medium status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum StorageStatus {
    NotAvailable,
    Unformatted,
    Formatted,
    NotSupported,
}

/// Storage medium kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum StorageType {
    Unknown,
    UsbStick,
    Sd,
    Microsd,
    Hd,
    Other,
}

/// Storage report, passed to
/// [`CameraServer::respond_storage_information`](crate::CameraServer::respond_storage_information).
///
/// `used + available <= total` is expected but reported as-is.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct StorageInformation {
    pub total_storage_mib: f32,
    pub used_storage_mib: f32,
    pub available_storage_mib: f32,
    pub read_speed_mib_s: f32,
    pub write_speed_mib_s: f32,
    pub storage_status: StorageStatus,
    pub storage_type: StorageType,
}

/// Image capture activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ImageStatus {
    Idle,
    CaptureInProgress,
    IntervalIdle,
    IntervalInProgress,
}

/// Video capture activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum VideoStatus {
    Idle,
    CaptureInProgress,
}

/// Capture state snapshot, passed to
/// [`CameraServer::respond_capture_status`](crate::CameraServer::respond_capture_status).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CaptureStatus {
    pub image_status: ImageStatus,
    pub video_status: VideoStatus,
    pub recording_time_s: f32,
    pub available_capacity_mib: f32,
    /// Monotonic non-decreasing except on explicit reset.
    pub image_count: i32,
}

/// Video stream activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum VideoStreamStatus {
    NotRunning,
    InProgress,
}

/// Spectrum a video stream captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum VideoStreamSpectrum {
    VisibleLight,
    Infrared,
}

/// Static properties of one video stream.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct VideoStreamSettings {
    pub frame_rate_hz: f32,
    pub horizontal_resolution_pix: u16,
    pub vertical_resolution_pix: u16,
    pub bit_rate_b_s: u32,
    pub rotation_deg: u16,
    pub horizontal_fov_deg: u16,
    pub uri: String,
}

/// One configured video stream.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct VideoStreamInfo {
    pub stream_id: u8,
    pub settings: VideoStreamSettings,
    pub status: VideoStreamStatus,
    pub spectrum: VideoStreamSpectrum,
}
