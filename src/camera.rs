//! Camera server plugin.
//!
//! Registers handlers for the camera-protocol command family with a
//! [`ServerComponent`], classifies inbound COMMAND_LONGs into
//! [`CameraCommand`] and dispatches on the tag, runs the image-capture
//! interval engine, and emits the response/event messages.
//!
//! Capability flags are derived from subscriptions: subscribing to
//! take-photo is what makes the camera report `CAPTURE_IMAGE`, and so on.
//! For every request that produces both an ACK and data, the ACK is sent
//! first.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, warn};

use crate::callback_list::{CallbackList, Handle};
use crate::component::{CommandRequest, OwnerToken, ServerComponent};
use crate::error::CameraError;
use crate::protocol::Outbound;
use crate::protocol::camera as wire;
use crate::protocol::command::{self, CommandAck, CommandLong, MavResult};
use crate::scheduler::TimerHandle;
use crate::types::{
    CaptureInfo, CaptureStatus, ImageStatus, Information, Mode, StorageInformation, StorageStatus,
    StorageType, TakePhotoFeedback, VideoStatus, VideoStreamInfo, VideoStreamSpectrum,
    VideoStreamStatus,
};

const HANDLED_COMMANDS: [u16; 19] = [
    command::CMD_REQUEST_CAMERA_INFORMATION,
    command::CMD_REQUEST_CAMERA_SETTINGS,
    command::CMD_REQUEST_STORAGE_INFORMATION,
    command::CMD_STORAGE_FORMAT,
    command::CMD_REQUEST_CAMERA_CAPTURE_STATUS,
    command::CMD_RESET_CAMERA_SETTINGS,
    command::CMD_SET_CAMERA_MODE,
    command::CMD_SET_CAMERA_ZOOM,
    command::CMD_SET_CAMERA_FOCUS,
    command::CMD_SET_STORAGE_USAGE,
    command::CMD_IMAGE_START_CAPTURE,
    command::CMD_IMAGE_STOP_CAPTURE,
    command::CMD_REQUEST_CAMERA_IMAGE_CAPTURE,
    command::CMD_VIDEO_START_CAPTURE,
    command::CMD_VIDEO_STOP_CAPTURE,
    command::CMD_VIDEO_START_STREAMING,
    command::CMD_VIDEO_STOP_STREAMING,
    command::CMD_REQUEST_VIDEO_STREAM_INFORMATION,
    command::CMD_REQUEST_VIDEO_STREAM_STATUS,
];

/// An inbound camera command, classified out of COMMAND_LONG params.
#[derive(Debug, Clone, PartialEq)]
enum CameraCommand {
    RequestInformation { capabilities: bool },
    RequestSettings { settings: bool },
    RequestStorageInformation { storage_id: u8, information: bool },
    FormatStorage { storage_id: u8 },
    RequestCaptureStatus { capture_status: bool },
    ResetSettings,
    SetMode { mode_id: u8 },
    SetZoom,
    SetFocus,
    SetStorageUsage,
    StartCapture { interval_s: f32, total: i32, seq: i32 },
    StopCapture,
    RequestImageCapture,
    StartVideo { stream_id: i32 },
    StopVideo { stream_id: i32 },
    StartVideoStreaming { stream_id: i32 },
    StopVideoStreaming { stream_id: i32 },
    RequestVideoStreamInformation,
    RequestVideoStreamStatus,
}

impl CameraCommand {
    fn classify(cmd: &CommandLong) -> Option<Self> {
        match cmd.command {
            command::CMD_REQUEST_CAMERA_INFORMATION => Some(Self::RequestInformation {
                capabilities: cmd.param1 != 0.0,
            }),
            command::CMD_REQUEST_CAMERA_SETTINGS => Some(Self::RequestSettings {
                settings: cmd.param1 != 0.0,
            }),
            command::CMD_REQUEST_STORAGE_INFORMATION => Some(Self::RequestStorageInformation {
                storage_id: cmd.param1 as u8,
                information: cmd.param2 != 0.0,
            }),
            command::CMD_STORAGE_FORMAT => Some(Self::FormatStorage {
                storage_id: cmd.param1 as u8,
            }),
            command::CMD_REQUEST_CAMERA_CAPTURE_STATUS => Some(Self::RequestCaptureStatus {
                capture_status: cmd.param1 != 0.0,
            }),
            command::CMD_RESET_CAMERA_SETTINGS => Some(Self::ResetSettings),
            command::CMD_SET_CAMERA_MODE => Some(Self::SetMode {
                mode_id: cmd.param2 as u8,
            }),
            command::CMD_SET_CAMERA_ZOOM => Some(Self::SetZoom),
            command::CMD_SET_CAMERA_FOCUS => Some(Self::SetFocus),
            command::CMD_SET_STORAGE_USAGE => Some(Self::SetStorageUsage),
            command::CMD_IMAGE_START_CAPTURE => Some(Self::StartCapture {
                interval_s: cmd.param2,
                total: cmd.param3 as i32,
                seq: cmd.param4 as i32,
            }),
            command::CMD_IMAGE_STOP_CAPTURE => Some(Self::StopCapture),
            command::CMD_REQUEST_CAMERA_IMAGE_CAPTURE => Some(Self::RequestImageCapture),
            command::CMD_VIDEO_START_CAPTURE => Some(Self::StartVideo {
                stream_id: cmd.param1 as i32,
            }),
            command::CMD_VIDEO_STOP_CAPTURE => Some(Self::StopVideo {
                stream_id: cmd.param1 as i32,
            }),
            command::CMD_VIDEO_START_STREAMING => Some(Self::StartVideoStreaming {
                stream_id: cmd.param1 as i32,
            }),
            command::CMD_VIDEO_STOP_STREAMING => Some(Self::StopVideoStreaming {
                stream_id: cmd.param1 as i32,
            }),
            command::CMD_REQUEST_VIDEO_STREAM_INFORMATION => {
                Some(Self::RequestVideoStreamInformation)
            }
            command::CMD_REQUEST_VIDEO_STREAM_STATUS => Some(Self::RequestVideoStreamStatus),
            _ => None,
        }
    }
}

#[derive(Default)]
struct IntervalState {
    timer: Option<TimerHandle>,
    interval_s: f32,
}

struct IntervalCounters {
    remaining: i32,
    emitted: i32,
}

#[derive(Default)]
struct State {
    information: Option<Information>,
    /// Packed version quad, parsed once in `set_information`.
    firmware_version: u32,
    video_stream_infos: Option<Vec<VideoStreamInfo>>,
    image_capture_count: i32,
    last_storage_id: u8,
    interval: IntervalState,
    last_take_photo_command: Option<CommandLong>,
}

struct Inner {
    component: Arc<ServerComponent>,
    state: Mutex<State>,
    take_photo_cbs: CallbackList<i32>,
    start_video_cbs: CallbackList<i32>,
    stop_video_cbs: CallbackList<i32>,
    start_video_streaming_cbs: CallbackList<i32>,
    stop_video_streaming_cbs: CallbackList<i32>,
    set_mode_cbs: CallbackList<Mode>,
    storage_information_cbs: CallbackList<i32>,
    format_storage_cbs: CallbackList<i32>,
    capture_status_cbs: CallbackList<i32>,
    reset_settings_cbs: CallbackList<i32>,
}

/// The camera server plugin.
///
/// Construction registers the command handlers; drop cancels any active
/// capture interval and unregisters them.
pub struct CameraServer {
    inner: Arc<Inner>,
    owner: OwnerToken,
}

impl CameraServer {
    pub fn new(component: &Arc<ServerComponent>) -> Self {
        let inner = Arc::new(Inner {
            component: Arc::clone(component),
            state: Mutex::new(State::default()),
            take_photo_cbs: CallbackList::new(),
            start_video_cbs: CallbackList::new(),
            stop_video_cbs: CallbackList::new(),
            start_video_streaming_cbs: CallbackList::new(),
            stop_video_streaming_cbs: CallbackList::new(),
            set_mode_cbs: CallbackList::new(),
            storage_information_cbs: CallbackList::new(),
            format_storage_cbs: CallbackList::new(),
            capture_status_cbs: CallbackList::new(),
            reset_settings_cbs: CallbackList::new(),
        });

        let owner = component.alloc_owner();
        for &cmd in &HANDLED_COMMANDS {
            let handler_inner = Arc::clone(&inner);
            component.register_command_handler(owner, cmd, move |request| {
                handler_inner.handle_command(request)
            });
        }

        Self { inner, owner }
    }

    /// Set the static camera description. Until this succeeds, information
    /// requests are answered `TEMPORARILY_REJECTED`.
    pub fn set_information(&self, information: Information) -> Result<(), CameraError> {
        let Some(firmware_version) = wire::parse_version(&information.firmware_version) else {
            debug!(
                "incorrectly formatted firmware version string: {}",
                information.firmware_version
            );
            return Err(CameraError::WrongArgument);
        };
        if information.vendor_name.len() > 32
            || information.model_name.len() > 32
            || information.definition_file_uri.len() > 140
        {
            return Err(CameraError::WrongArgument);
        }

        let mut state = self.inner.state.lock().unwrap();
        state.firmware_version = firmware_version;
        state.information = Some(information);
        Ok(())
    }

    /// Configure the video streams reported by
    /// `REQUEST_VIDEO_STREAM_INFORMATION`.
    pub fn set_video_stream_info(
        &self,
        video_stream_infos: Vec<VideoStreamInfo>,
    ) -> Result<(), CameraError> {
        let mut state = self.inner.state.lock().unwrap();
        state.video_stream_infos = Some(video_stream_infos);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Subscriptions
    // -----------------------------------------------------------------------

    /// Subscribe to take-photo requests. The argument is the capture
    /// sequence number to report back via [`CameraServer::respond_take_photo`].
    pub fn subscribe_take_photo(&self, f: impl FnMut(i32) + Send + 'static) -> Handle {
        self.inner.take_photo_cbs.subscribe(f)
    }

    pub fn unsubscribe_take_photo(&self, handle: Handle) {
        self.inner.take_photo_cbs.unsubscribe(handle);
    }

    /// Subscribe to start-video requests (argument: stream id).
    pub fn subscribe_start_video(&self, f: impl FnMut(i32) + Send + 'static) -> Handle {
        self.inner.start_video_cbs.subscribe(f)
    }

    pub fn unsubscribe_start_video(&self, handle: Handle) {
        self.inner.start_video_cbs.unsubscribe(handle);
    }

    /// Subscribe to stop-video requests (argument: stream id).
    pub fn subscribe_stop_video(&self, f: impl FnMut(i32) + Send + 'static) -> Handle {
        self.inner.stop_video_cbs.subscribe(f)
    }

    pub fn unsubscribe_stop_video(&self, handle: Handle) {
        self.inner.stop_video_cbs.unsubscribe(handle);
    }

    /// Subscribe to start-video-streaming requests (argument: stream id).
    pub fn subscribe_start_video_streaming(&self, f: impl FnMut(i32) + Send + 'static) -> Handle {
        self.inner.start_video_streaming_cbs.subscribe(f)
    }

    pub fn unsubscribe_start_video_streaming(&self, handle: Handle) {
        self.inner.start_video_streaming_cbs.unsubscribe(handle);
    }

    /// Subscribe to stop-video-streaming requests (argument: stream id).
    pub fn subscribe_stop_video_streaming(&self, f: impl FnMut(i32) + Send + 'static) -> Handle {
        self.inner.stop_video_streaming_cbs.subscribe(f)
    }

    pub fn unsubscribe_stop_video_streaming(&self, handle: Handle) {
        self.inner.stop_video_streaming_cbs.unsubscribe(handle);
    }

    /// Subscribe to set-mode requests.
    pub fn subscribe_set_mode(&self, f: impl FnMut(Mode) + Send + 'static) -> Handle {
        self.inner.set_mode_cbs.subscribe(f)
    }

    pub fn unsubscribe_set_mode(&self, handle: Handle) {
        self.inner.set_mode_cbs.unsubscribe(handle);
    }

    /// Subscribe to storage-information requests (argument: storage id).
    /// The subscriber answers via [`CameraServer::respond_storage_information`].
    pub fn subscribe_storage_information(&self, f: impl FnMut(i32) + Send + 'static) -> Handle {
        self.inner.storage_information_cbs.subscribe(f)
    }

    pub fn unsubscribe_storage_information(&self, handle: Handle) {
        self.inner.storage_information_cbs.unsubscribe(handle);
    }

    /// Subscribe to format-storage requests (argument: storage id).
    pub fn subscribe_format_storage(&self, f: impl FnMut(i32) + Send + 'static) -> Handle {
        self.inner.format_storage_cbs.subscribe(f)
    }

    pub fn unsubscribe_format_storage(&self, handle: Handle) {
        self.inner.format_storage_cbs.unsubscribe(handle);
    }

    /// Subscribe to capture-status requests. The subscriber answers via
    /// [`CameraServer::respond_capture_status`].
    pub fn subscribe_capture_status(&self, f: impl FnMut(i32) + Send + 'static) -> Handle {
        self.inner.capture_status_cbs.subscribe(f)
    }

    pub fn unsubscribe_capture_status(&self, handle: Handle) {
        self.inner.capture_status_cbs.unsubscribe(handle);
    }

    /// Subscribe to reset-settings requests.
    pub fn subscribe_reset_settings(&self, f: impl FnMut(i32) + Send + 'static) -> Handle {
        self.inner.reset_settings_cbs.subscribe(f)
    }

    pub fn unsubscribe_reset_settings(&self, handle: Handle) {
        self.inner.reset_settings_cbs.unsubscribe(handle);
    }

    // -----------------------------------------------------------------------
    // Responses
    // -----------------------------------------------------------------------

    /// Report a finished (or failed) photo capture and emit
    /// `CAMERA_IMAGE_CAPTURED`.
    pub fn respond_take_photo(
        &self,
        feedback: TakePhotoFeedback,
        capture_info: CaptureInfo,
    ) -> Result<(), CameraError> {
        debug!("take photo feedback: {feedback:?}");

        // An index of INTERVAL_INDEX marks a capture synthesised by the
        // interval engine; those do not advance the counter.
        if capture_info.index != CaptureInfo::INTERVAL_INDEX {
            let mut state = self.inner.state.lock().unwrap();
            // The first capture since construction is accepted at any index.
            if state.image_capture_count != 0
                && capture_info.index != state.image_capture_count + 1
            {
                warn!(
                    "unexpected image index, expecting {} but was {}",
                    state.image_capture_count + 1,
                    capture_info.index
                );
            }
            state.image_capture_count = capture_info.index;
        }

        let msg = wire::CameraImageCaptured {
            time_boot_ms: self.inner.component.elapsed_ms(),
            time_utc_us: capture_info.time_utc_us,
            camera_id: 0,
            lat: (capture_info.position.latitude_deg * 1e7) as i32,
            lon: (capture_info.position.longitude_deg * 1e7) as i32,
            alt_mm: (capture_info.position.absolute_altitude_m * 1e3) as i32,
            relative_alt_mm: (capture_info.position.relative_altitude_m * 1e3) as i32,
            q: [
                capture_info.attitude_quaternion.w,
                capture_info.attitude_quaternion.x,
                capture_info.attitude_quaternion.y,
                capture_info.attitude_quaternion.z,
            ],
            image_index: capture_info.index,
            capture_result: i8::from(capture_info.is_success),
            file_url: capture_info.file_url,
        };
        self.inner
            .component
            .send_message(&Outbound::CameraImageCaptured(msg));
        debug!("sent camera image captured msg");
        Ok(())
    }

    /// Answer a storage-information request (from inside the subscriber, or
    /// later from any thread).
    pub fn respond_storage_information(
        &self,
        storage_information: StorageInformation,
    ) -> Result<(), CameraError> {
        let status = match storage_information.storage_status {
            StorageStatus::NotAvailable => wire::STORAGE_STATUS_NOT_SUPPORTED,
            StorageStatus::Unformatted => wire::STORAGE_STATUS_UNFORMATTED,
            StorageStatus::Formatted => wire::STORAGE_STATUS_READY,
            StorageStatus::NotSupported => wire::STORAGE_STATUS_NOT_SUPPORTED,
        };
        let storage_type = match storage_information.storage_type {
            StorageType::UsbStick => wire::STORAGE_TYPE_USB_STICK,
            StorageType::Sd => wire::STORAGE_TYPE_SD,
            StorageType::Microsd => wire::STORAGE_TYPE_MICROSD,
            StorageType::Hd => wire::STORAGE_TYPE_HD,
            StorageType::Other => wire::STORAGE_TYPE_OTHER,
            StorageType::Unknown => wire::STORAGE_TYPE_UNKNOWN,
        };
        let storage_id = self.inner.state.lock().unwrap().last_storage_id;

        let msg = wire::StorageInformation {
            time_boot_ms: self.inner.component.elapsed_ms(),
            storage_id,
            storage_count: 1,
            status,
            total_capacity_mib: storage_information.total_storage_mib,
            used_capacity_mib: storage_information.used_storage_mib,
            available_capacity_mib: storage_information.available_storage_mib,
            read_speed: storage_information.read_speed_mib_s,
            write_speed: storage_information.write_speed_mib_s,
            storage_type,
            name: String::new(),
            storage_usage: 0,
        };
        self.inner
            .component
            .send_message(&Outbound::StorageInformation(msg));
        debug!("sent storage information");
        Ok(())
    }

    /// Answer a capture-status request.
    pub fn respond_capture_status(
        &self,
        capture_status: CaptureStatus,
    ) -> Result<(), CameraError> {
        let (interval_set, interval_s, image_count) = {
            let state = self.inner.state.lock().unwrap();
            (
                state.interval.timer.is_some(),
                state.interval.interval_s,
                state.image_capture_count,
            )
        };

        let mut image_status = 0u8;
        if matches!(
            capture_status.image_status,
            ImageStatus::CaptureInProgress | ImageStatus::IntervalInProgress
        ) {
            image_status |= wire::IMAGE_STATUS_IN_PROGRESS;
        }
        if matches!(
            capture_status.image_status,
            ImageStatus::IntervalIdle | ImageStatus::IntervalInProgress
        ) || interval_set
        {
            image_status |= wire::IMAGE_STATUS_INTERVAL_SET;
        }

        let video_status = match capture_status.video_status {
            VideoStatus::Idle => 0,
            VideoStatus::CaptureInProgress => 1,
        };

        let msg = wire::CameraCaptureStatus {
            time_boot_ms: self.inner.component.elapsed_ms(),
            image_status,
            video_status,
            image_interval_s: interval_s,
            recording_time_ms: (f64::from(capture_status.recording_time_s) * 1e3) as u32,
            available_capacity_mib: capture_status.available_capacity_mib,
            image_count,
        };
        self.inner
            .component
            .send_message(&Outbound::CameraCaptureStatus(msg));
        debug!("sent capture status");
        Ok(())
    }
}

impl Drop for CameraServer {
    fn drop(&mut self) {
        self.inner.stop_image_capture_interval();
        self.inner.component.unregister_owner(self.owner);
    }
}

impl Inner {
    fn handle_command(self: &Arc<Self>, request: &CommandRequest) -> Option<CommandAck> {
        let Some(cmd) = CameraCommand::classify(&request.command) else {
            return Some(self.ack(request, MavResult::Unsupported));
        };

        match cmd {
            CameraCommand::RequestInformation { capabilities } => {
                self.process_information_request(request, capabilities)
            }
            CameraCommand::RequestSettings { settings } => {
                self.process_settings_request(request, settings)
            }
            CameraCommand::RequestStorageInformation {
                storage_id,
                information,
            } => self.process_storage_information_request(request, storage_id, information),
            CameraCommand::FormatStorage { storage_id } => {
                if self.format_storage_cbs.is_empty() {
                    debug!("storage format requested with no format storage subscriber");
                    return Some(self.ack(request, MavResult::Unsupported));
                }
                self.format_storage_cbs.invoke(i32::from(storage_id));
                Some(self.ack(request, MavResult::Accepted))
            }
            CameraCommand::RequestCaptureStatus { capture_status } => {
                self.process_capture_status_request(request, capture_status)
            }
            CameraCommand::ResetSettings => {
                if self.reset_settings_cbs.is_empty() {
                    debug!("reset camera settings requested with no reset settings subscriber");
                    return Some(self.ack(request, MavResult::Unsupported));
                }
                self.reset_settings_cbs.invoke(0);
                Some(self.ack(request, MavResult::Accepted))
            }
            CameraCommand::SetMode { mode_id } => self.process_set_mode(request, mode_id),
            CameraCommand::SetZoom => {
                debug!("unsupported set camera zoom request");
                Some(self.ack(request, MavResult::Unsupported))
            }
            CameraCommand::SetFocus => {
                debug!("unsupported set camera focus request");
                Some(self.ack(request, MavResult::Unsupported))
            }
            CameraCommand::SetStorageUsage => {
                debug!("unsupported set storage usage request");
                Some(self.ack(request, MavResult::Unsupported))
            }
            CameraCommand::StartCapture {
                interval_s,
                total,
                seq,
            } => self.process_image_start_capture(request, interval_s, total, seq),
            CameraCommand::StopCapture => {
                debug!("received image stop capture request");
                self.stop_image_capture_interval();
                Some(self.ack(request, MavResult::Accepted))
            }
            CameraCommand::RequestImageCapture => {
                // No cache of historical captures to replay from.
                debug!("unsupported image capture request");
                Some(self.ack(request, MavResult::Unsupported))
            }
            CameraCommand::StartVideo { stream_id } => {
                if self.start_video_cbs.is_empty() {
                    debug!("video start capture requested with no start video subscriber");
                    return Some(self.ack(request, MavResult::Unsupported));
                }
                self.start_video_cbs.invoke(stream_id);
                Some(self.ack(request, MavResult::Accepted))
            }
            CameraCommand::StopVideo { stream_id } => {
                if self.stop_video_cbs.is_empty() {
                    debug!("video stop capture requested with no stop video subscriber");
                    return Some(self.ack(request, MavResult::Unsupported));
                }
                self.stop_video_cbs.invoke(stream_id);
                Some(self.ack(request, MavResult::Accepted))
            }
            CameraCommand::StartVideoStreaming { stream_id } => {
                if self.start_video_streaming_cbs.is_empty() {
                    debug!("video start streaming requested with no subscriber");
                    return Some(self.ack(request, MavResult::Unsupported));
                }
                self.start_video_streaming_cbs.invoke(stream_id);
                Some(self.ack(request, MavResult::Accepted))
            }
            CameraCommand::StopVideoStreaming { stream_id } => {
                if self.stop_video_streaming_cbs.is_empty() {
                    debug!("video stop streaming requested with no subscriber");
                    return Some(self.ack(request, MavResult::Unsupported));
                }
                self.stop_video_streaming_cbs.invoke(stream_id);
                Some(self.ack(request, MavResult::Accepted))
            }
            CameraCommand::RequestVideoStreamInformation => {
                self.process_video_stream_information_request(request)
            }
            CameraCommand::RequestVideoStreamStatus => {
                debug!("unsupported video stream status request");
                Some(self.ack(request, MavResult::Unsupported))
            }
        }
    }

    fn ack(&self, request: &CommandRequest, result: MavResult) -> CommandAck {
        self.component.make_command_ack(request, result)
    }

    fn process_information_request(
        &self,
        request: &CommandRequest,
        capabilities: bool,
    ) -> Option<CommandAck> {
        if !capabilities {
            debug!("early info return");
            return Some(self.ack(request, MavResult::Accepted));
        }

        let (information, firmware_version) = {
            let state = self.state.lock().unwrap();
            match &state.information {
                Some(info) => (info.clone(), state.firmware_version),
                None => return Some(self.ack(request, MavResult::TemporarilyRejected)),
            }
        };

        // The ack must reach the wire before the information message.
        self.component
            .send_message(&Outbound::CommandAck(self.ack(request, MavResult::Accepted)));

        let mut flags = 0u32;
        if !self.take_photo_cbs.is_empty() {
            flags |= wire::CAP_FLAG_CAPTURE_IMAGE;
        }
        if !self.start_video_cbs.is_empty() {
            flags |= wire::CAP_FLAG_CAPTURE_VIDEO;
        }
        if !self.start_video_streaming_cbs.is_empty() {
            flags |= wire::CAP_FLAG_HAS_VIDEO_STREAM;
        }

        let msg = wire::CameraInformation {
            time_boot_ms: self.component.elapsed_ms(),
            vendor_name: information.vendor_name,
            model_name: information.model_name,
            firmware_version,
            focal_length_mm: information.focal_length_mm,
            sensor_size_h_mm: information.horizontal_sensor_size_mm,
            sensor_size_v_mm: information.vertical_sensor_size_mm,
            resolution_h_px: information.horizontal_resolution_px,
            resolution_v_px: information.vertical_resolution_px,
            lens_id: information.lens_id,
            flags,
            definition_version: information.definition_file_version as u16,
            definition_uri: information.definition_file_uri,
        };
        self.component
            .send_message(&Outbound::CameraInformation(msg));
        debug!("sent info msg");

        None // ack was already sent
    }

    fn process_settings_request(
        &self,
        request: &CommandRequest,
        settings: bool,
    ) -> Option<CommandAck> {
        if !settings {
            debug!("early settings return");
            return Some(self.ack(request, MavResult::Accepted));
        }

        self.component
            .send_message(&Outbound::CommandAck(self.ack(request, MavResult::Accepted)));

        // Mode/zoom/focus reporting is not wired through; placeholders.
        let msg = wire::CameraSettings {
            time_boot_ms: self.component.elapsed_ms(),
            mode_id: wire::CAMERA_MODE_IMAGE,
            zoom_level: 0.0,
            focus_level: 0.0,
        };
        self.component.send_message(&Outbound::CameraSettings(msg));
        debug!("sent settings msg");

        None
    }

    fn process_storage_information_request(
        &self,
        request: &CommandRequest,
        storage_id: u8,
        information: bool,
    ) -> Option<CommandAck> {
        if !information {
            debug!("early storage return");
            return Some(self.ack(request, MavResult::Accepted));
        }

        if self.storage_information_cbs.is_empty() {
            debug!("storage information requested with no storage information subscriber");
            return Some(self.ack(request, MavResult::Unsupported));
        }

        self.component
            .send_message(&Outbound::CommandAck(self.ack(request, MavResult::Accepted)));

        self.state.lock().unwrap().last_storage_id = storage_id;
        self.storage_information_cbs.invoke(i32::from(storage_id));

        None // the subscriber answers via respond_storage_information
    }

    fn process_capture_status_request(
        &self,
        request: &CommandRequest,
        capture_status: bool,
    ) -> Option<CommandAck> {
        if !capture_status {
            return Some(self.ack(request, MavResult::Accepted));
        }

        if self.capture_status_cbs.is_empty() {
            debug!("capture status requested with no capture status subscriber");
            return Some(self.ack(request, MavResult::Unsupported));
        }

        self.component
            .send_message(&Outbound::CommandAck(self.ack(request, MavResult::Accepted)));

        self.capture_status_cbs.invoke(0);

        None // the subscriber answers via respond_capture_status
    }

    fn process_set_mode(&self, request: &CommandRequest, mode_id: u8) -> Option<CommandAck> {
        if self.set_mode_cbs.is_empty() {
            debug!("set mode requested with no set mode subscriber");
            return Some(self.ack(request, MavResult::Unsupported));
        }

        let mode = match mode_id {
            wire::CAMERA_MODE_IMAGE => Mode::Photo,
            wire::CAMERA_MODE_VIDEO => Mode::Video,
            _ => Mode::Unknown,
        };
        if mode == Mode::Unknown {
            return Some(self.ack(request, MavResult::Unsupported));
        }

        self.set_mode_cbs.invoke(mode);
        Some(self.ack(request, MavResult::Accepted))
    }

    fn process_image_start_capture(
        self: &Arc<Self>,
        request: &CommandRequest,
        interval_s: f32,
        total: i32,
        seq: i32,
    ) -> Option<CommandAck> {
        debug!(
            "received image start capture request - interval: {interval_s} total: {total} index: {seq}"
        );

        self.stop_image_capture_interval();

        if self.take_photo_cbs.is_empty() {
            debug!("image capture requested with no take photo subscriber");
            return Some(self.ack(request, MavResult::Unsupported));
        }

        // single image capture
        if total == 1 {
            {
                let mut state = self.state.lock().unwrap();
                if seq < state.image_capture_count {
                    debug!(
                        "already-captured single image request, seq {seq}, count {}",
                        state.image_capture_count
                    );
                    // Already captured this one; just ack it again.
                    return Some(self.ack(request, MavResult::Accepted));
                }

                // A command-protocol retransmit of the request currently in
                // flight must not trigger a second capture.
                if state
                    .last_take_photo_command
                    .as_ref()
                    .is_some_and(|last| same_request(last, &request.command))
                {
                    debug!("retransmitted take photo request, seq {seq}");
                    return Some(self.ack(request, MavResult::Accepted));
                }

                state.last_take_photo_command = Some(request.command.clone());
            }

            // The ack must reach the wire before CAMERA_IMAGE_CAPTURED.
            self.component
                .send_message(&Outbound::CommandAck(self.ack(request, MavResult::Accepted)));

            self.take_photo_cbs.invoke(seq);

            return None;
        }

        // The first interval capture fires during start; the ack must be on
        // the wire before anything the subscriber emits for it.
        self.component
            .send_message(&Outbound::CommandAck(self.ack(request, MavResult::Accepted)));

        self.start_image_capture_interval(interval_s, total, seq);

        None
    }

    fn process_video_stream_information_request(
        &self,
        request: &CommandRequest,
    ) -> Option<CommandAck> {
        let streams = {
            let state = self.state.lock().unwrap();
            match &state.video_stream_infos {
                Some(streams) => streams.clone(),
                None => return Some(self.ack(request, MavResult::TemporarilyRejected)),
            }
        };

        let count = streams.len() as u8;
        for stream in &streams {
            let mut flags = 0u16;
            if stream.status == VideoStreamStatus::InProgress {
                flags |= wire::VIDEO_STREAM_STATUS_FLAGS_RUNNING;
            }
            if stream.spectrum == VideoStreamSpectrum::Infrared {
                flags |= wire::VIDEO_STREAM_STATUS_FLAGS_THERMAL;
            }

            let msg = wire::VideoStreamInformation {
                stream_id: stream.stream_id,
                count,
                stream_type: wire::VIDEO_STREAM_TYPE_RTSP,
                flags,
                framerate_hz: stream.settings.frame_rate_hz,
                resolution_h_px: stream.settings.horizontal_resolution_pix,
                resolution_v_px: stream.settings.vertical_resolution_pix,
                bitrate_b_s: stream.settings.bit_rate_b_s,
                rotation_deg: stream.settings.rotation_deg,
                hfov_deg: stream.settings.horizontal_fov_deg,
                name: String::new(),
                uri: stream.settings.uri.clone(),
            };
            self.component
                .send_message(&Outbound::VideoStreamInformation(msg));
        }

        Some(self.ack(request, MavResult::Accepted))
    }

    /// Start capturing images with the given interval.
    ///
    /// `count == 0` means capture until stopped; `base_index` seeds the
    /// sequence numbers passed to the take-photo subscribers. The first
    /// capture fires immediately; the timer paces the rest.
    fn start_image_capture_interval(self: &Arc<Self>, interval_s: f32, count: i32, base_index: i32) {
        let remaining = if count == 0 { i32::MAX } else { count };
        let counters = Arc::new(Mutex::new(IntervalCounters {
            remaining,
            emitted: 0,
        }));

        let weak = Arc::downgrade(self);
        let tick_counters = Arc::clone(&counters);
        let handle = self.component.scheduler().add_call_every(
            interval_duration(interval_s),
            move || {
                if let Some(inner) = weak.upgrade() {
                    inner.interval_tick(&tick_counters, base_index);
                }
            },
        );

        {
            let mut state = self.state.lock().unwrap();
            state.interval = IntervalState {
                timer: Some(handle),
                interval_s,
            };
        }

        self.interval_tick(&counters, base_index);
    }

    fn interval_tick(&self, counters: &Mutex<IntervalCounters>, base_index: i32) {
        debug!("capture image timer triggered");

        let (fire, remaining) = {
            let mut c = counters.lock().unwrap();
            if self.take_photo_cbs.is_empty() {
                (None, c.remaining)
            } else {
                let seq = base_index + c.emitted;
                c.emitted += 1;
                c.remaining -= 1;
                (Some(seq), c.remaining)
            }
        };

        if let Some(seq) = fire {
            self.take_photo_cbs.invoke(seq);
        }

        if remaining == 0 {
            self.stop_image_capture_interval();
        }
    }

    /// Stop any pending image capture interval timer.
    fn stop_image_capture_interval(&self) {
        let timer = {
            let mut state = self.state.lock().unwrap();
            state.interval.interval_s = 0.0;
            state.interval.timer.take()
        };
        if let Some(handle) = timer {
            self.component.scheduler().remove(handle);
        }
    }
}

/// True when `b` is a retransmission of `a`: same command and parameters.
/// The confirmation field increments on each retransmit and is ignored.
fn same_request(a: &CommandLong, b: &CommandLong) -> bool {
    a.command == b.command
        && a.param1 == b.param1
        && a.param2 == b.param2
        && a.param3 == b.param3
        && a.param4 == b.param4
        && a.param5 == b.param5
        && a.param6 == b.param6
        && a.param7 == b.param7
}

/// GCS-supplied intervals are not validated upstream; treat non-finite or
/// negative values as "as fast as the scheduler runs".
fn interval_duration(interval_s: f32) -> Duration {
    if interval_s.is_finite() && interval_s > 0.0 {
        Duration::from_secs_f32(interval_s)
    } else {
        Duration::ZERO
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::testing::{command_frame, plain_command, test_component};
    use crate::types::{Position, Quaternion, VideoStreamSettings};
    use std::time::Instant;

    fn example_information() -> Information {
        Information {
            vendor_name: "MAVSDK".into(),
            model_name: "X".into(),
            firmware_version: "1.2.3.4".into(),
            focal_length_mm: 3.0,
            horizontal_sensor_size_mm: 3.68,
            vertical_sensor_size_mm: 2.76,
            horizontal_resolution_px: 3280,
            vertical_resolution_px: 2464,
            lens_id: 0,
            definition_file_version: 1,
            definition_file_uri: "mftp://camera.xml".into(),
        }
    }

    fn information_request(param1: f32) -> CommandLong {
        let mut cmd = plain_command(command::CMD_REQUEST_CAMERA_INFORMATION);
        cmd.param1 = param1;
        cmd
    }

    fn start_capture_command(interval_s: f32, total: i32, seq: i32) -> CommandLong {
        let mut cmd = plain_command(command::CMD_IMAGE_START_CAPTURE);
        cmd.param2 = interval_s;
        cmd.param3 = total as f32;
        cmd.param4 = seq as f32;
        cmd
    }

    fn ack_result(msg: &Outbound) -> MavResult {
        match msg {
            Outbound::CommandAck(ack) => ack.result,
            other => panic!("expected ack, got {other:?}"),
        }
    }

    #[test]
    fn information_rejected_until_set() {
        let (component, sent) = test_component();
        let server = CameraServer::new(&component);

        component.process_bytes(&command_frame(&information_request(1.0)));
        assert_eq!(ack_result(&sent.lock().unwrap()[0]), MavResult::TemporarilyRejected);
        sent.lock().unwrap().clear();

        server.set_information(example_information()).unwrap();
        component.process_bytes(&command_frame(&information_request(1.0)));

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 2, "ack then information");
        assert_eq!(ack_result(&sent[0]), MavResult::Accepted);
        match &sent[1] {
            Outbound::CameraInformation(info) => {
                assert_eq!(info.firmware_version, 0x0403_0201);
                assert_eq!(info.flags, 0);
                assert_eq!(info.vendor_name, "MAVSDK");
            }
            other => panic!("expected camera information, got {other:?}"),
        }
    }

    #[test]
    fn information_capability_request_only_acks() {
        let (component, sent) = test_component();
        let _server = CameraServer::new(&component);

        component.process_bytes(&command_frame(&information_request(0.0)));
        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(ack_result(&sent[0]), MavResult::Accepted);
    }

    #[test]
    fn capability_flags_follow_subscriptions() {
        let (component, sent) = test_component();
        let server = CameraServer::new(&component);
        server.set_information(example_information()).unwrap();
        server.subscribe_take_photo(|_| {});

        component.process_bytes(&command_frame(&information_request(1.0)));
        let sent = sent.lock().unwrap();
        match &sent[1] {
            Outbound::CameraInformation(info) => {
                assert_eq!(info.flags, wire::CAP_FLAG_CAPTURE_IMAGE);
            }
            other => panic!("expected camera information, got {other:?}"),
        }
    }

    #[test]
    fn malformed_firmware_version_rejected() {
        let (component, _sent) = test_component();
        let server = CameraServer::new(&component);
        let mut info = example_information();
        info.firmware_version = "not-a-version".into();
        assert_eq!(server.set_information(info), Err(CameraError::WrongArgument));
    }

    #[test]
    fn over_long_vendor_rejected() {
        let (component, _sent) = test_component();
        let server = CameraServer::new(&component);
        let mut info = example_information();
        info.vendor_name = "X".repeat(33);
        assert_eq!(server.set_information(info), Err(CameraError::WrongArgument));
    }

    #[test]
    fn settings_request_acks_then_responds() {
        let (component, sent) = test_component();
        let _server = CameraServer::new(&component);

        let mut cmd = plain_command(command::CMD_REQUEST_CAMERA_SETTINGS);
        cmd.param1 = 1.0;
        component.process_bytes(&command_frame(&cmd));

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(ack_result(&sent[0]), MavResult::Accepted);
        match &sent[1] {
            Outbound::CameraSettings(settings) => {
                assert_eq!(settings.mode_id, wire::CAMERA_MODE_IMAGE);
                assert_eq!(settings.zoom_level, 0.0);
            }
            other => panic!("expected settings, got {other:?}"),
        }
    }

    #[test]
    fn single_shot_capture_flow() {
        let (component, sent) = test_component();
        let server = Arc::new(CameraServer::new(&component));

        let responder = Arc::clone(&server);
        server.subscribe_take_photo(move |index| {
            responder
                .respond_take_photo(
                    TakePhotoFeedback::Ok,
                    CaptureInfo {
                        position: Position {
                            latitude_deg: 47.3977,
                            longitude_deg: 8.5456,
                            absolute_altitude_m: 500.0,
                            relative_altitude_m: 0.0,
                        },
                        attitude_quaternion: Quaternion::identity(),
                        time_utc_us: 1_700_000_000_000_000,
                        is_success: true,
                        index,
                        file_url: String::new(),
                    },
                )
                .unwrap();
        });

        component.process_bytes(&command_frame(&start_capture_command(0.0, 1, 1)));

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 2, "ack then image captured");
        assert_eq!(ack_result(&sent[0]), MavResult::Accepted);
        match &sent[1] {
            Outbound::CameraImageCaptured(msg) => {
                assert_eq!(msg.lat, 473_977_000);
                assert_eq!(msg.lon, 85_456_000);
                assert_eq!(msg.alt_mm, 500_000);
                assert_eq!(msg.q, [1.0, 0.0, 0.0, 0.0]);
                assert_eq!(msg.image_index, 1);
                assert_eq!(msg.capture_result, 1);
                assert_eq!(msg.time_utc_us, 1_700_000_000_000_000);
            }
            other => panic!("expected image captured, got {other:?}"),
        }
    }

    #[test]
    fn already_captured_seq_is_acked_without_capture() {
        let (component, sent) = test_component();
        let server = Arc::new(CameraServer::new(&component));

        let responder = Arc::clone(&server);
        let captures = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&captures);
        server.subscribe_take_photo(move |index| {
            seen.lock().unwrap().push(index);
            responder
                .respond_take_photo(
                    TakePhotoFeedback::Ok,
                    CaptureInfo {
                        position: Position::default(),
                        attitude_quaternion: Quaternion::identity(),
                        time_utc_us: 0,
                        is_success: true,
                        index,
                        file_url: String::new(),
                    },
                )
                .unwrap();
        });

        component.process_bytes(&command_frame(&start_capture_command(0.0, 1, 2)));
        sent.lock().unwrap().clear();

        // seq 1 < image_capture_count 2: idempotent re-ack, no capture
        component.process_bytes(&command_frame(&start_capture_command(0.0, 1, 1)));

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(ack_result(&sent[0]), MavResult::Accepted);
        assert_eq!(*captures.lock().unwrap(), vec![2]);
    }

    #[test]
    fn retransmitted_request_does_not_double_capture() {
        let (component, sent) = test_component();
        let server = CameraServer::new(&component);

        // Subscriber that never responds, as if the capture were slow.
        let captures = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&captures);
        server.subscribe_take_photo(move |index| {
            seen.lock().unwrap().push(index);
        });

        let mut cmd = start_capture_command(0.0, 1, 1);
        component.process_bytes(&command_frame(&cmd));
        cmd.confirmation = 1; // command-protocol retransmit
        component.process_bytes(&command_frame(&cmd));

        assert_eq!(*captures.lock().unwrap(), vec![1]);
        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(ack_result(&sent[0]), MavResult::Accepted);
        assert_eq!(ack_result(&sent[1]), MavResult::Accepted);
    }

    #[test]
    fn capture_without_subscriber_unsupported() {
        let (component, sent) = test_component();
        let _server = CameraServer::new(&component);

        component.process_bytes(&command_frame(&start_capture_command(0.0, 1, 1)));
        assert_eq!(ack_result(&sent.lock().unwrap()[0]), MavResult::Unsupported);
    }

    #[test]
    fn interval_capture_emits_sequenced_callbacks() {
        let (component, sent) = test_component();
        let server = CameraServer::new(&component);

        let captures = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&captures);
        server.subscribe_take_photo(move |index| {
            seen.lock().unwrap().push(index);
        });

        component.process_bytes(&command_frame(&start_capture_command(0.5, 3, 10)));
        assert_eq!(ack_result(&sent.lock().unwrap()[0]), MavResult::Accepted);
        // first capture fires on start
        assert_eq!(*captures.lock().unwrap(), vec![10]);

        let t0 = Instant::now();
        for ms in (100..=1600).step_by(100) {
            component.scheduler().run_at(t0 + Duration::from_millis(ms));
        }

        assert_eq!(*captures.lock().unwrap(), vec![10, 11, 12]);

        // interval is idle now; more time adds nothing
        for ms in (1700..=3000).step_by(100) {
            component.scheduler().run_at(t0 + Duration::from_millis(ms));
        }
        assert_eq!(*captures.lock().unwrap(), vec![10, 11, 12]);
    }

    #[test]
    fn stop_capture_cancels_interval() {
        let (component, sent) = test_component();
        let server = CameraServer::new(&component);

        let captures = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&captures);
        server.subscribe_take_photo(move |index| {
            seen.lock().unwrap().push(index);
        });

        component.process_bytes(&command_frame(&start_capture_command(0.5, 3, 10)));
        let t0 = Instant::now();
        // captures at start (10) and 0.5s (11), then stop at 0.7s
        for ms in (100..=700).step_by(100) {
            component.scheduler().run_at(t0 + Duration::from_millis(ms));
        }
        component.process_bytes(&command_frame(&plain_command(command::CMD_IMAGE_STOP_CAPTURE)));
        for ms in (800..=3000).step_by(100) {
            component.scheduler().run_at(t0 + Duration::from_millis(ms));
        }

        assert_eq!(*captures.lock().unwrap(), vec![10, 11]);
        let sent = sent.lock().unwrap();
        assert_eq!(ack_result(&sent[sent.len() - 1]), MavResult::Accepted);
    }

    #[test]
    fn repeat_forever_runs_until_stopped() {
        let (component, _sent) = test_component();
        let server = CameraServer::new(&component);

        let captures = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&captures);
        server.subscribe_take_photo(move |index| {
            seen.lock().unwrap().push(index);
        });

        component.process_bytes(&command_frame(&start_capture_command(0.5, 0, 0)));
        let t0 = Instant::now();
        for ms in (100..=2600).step_by(100) {
            component.scheduler().run_at(t0 + Duration::from_millis(ms));
        }
        // start plus five timed ticks
        assert_eq!(*captures.lock().unwrap(), vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn new_interval_replaces_active_one() {
        let (component, _sent) = test_component();
        let server = CameraServer::new(&component);

        let captures = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&captures);
        server.subscribe_take_photo(move |index| {
            seen.lock().unwrap().push(index);
        });

        component.process_bytes(&command_frame(&start_capture_command(0.5, 10, 100)));
        let t0 = Instant::now();
        component.scheduler().run_at(t0 + Duration::from_millis(600));

        component.process_bytes(&command_frame(&start_capture_command(0.5, 2, 200)));
        for ms in (700..=2600).step_by(100) {
            component.scheduler().run_at(t0 + Duration::from_millis(ms));
        }

        assert_eq!(*captures.lock().unwrap(), vec![100, 101, 200, 201]);
    }

    #[test]
    fn set_mode_maps_wire_enum() {
        let (component, sent) = test_component();
        let server = CameraServer::new(&component);

        let modes = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&modes);
        server.subscribe_set_mode(move |mode| {
            seen.lock().unwrap().push(mode);
        });

        let mut cmd = plain_command(command::CMD_SET_CAMERA_MODE);
        cmd.param2 = f32::from(wire::CAMERA_MODE_VIDEO);
        component.process_bytes(&command_frame(&cmd));

        assert_eq!(*modes.lock().unwrap(), vec![Mode::Video]);
        assert_eq!(ack_result(&sent.lock().unwrap()[0]), MavResult::Accepted);
    }

    #[test]
    fn set_mode_unknown_value_unsupported() {
        let (component, sent) = test_component();
        let server = CameraServer::new(&component);
        server.subscribe_set_mode(|_| {});

        let mut cmd = plain_command(command::CMD_SET_CAMERA_MODE);
        cmd.param2 = 9.0;
        component.process_bytes(&command_frame(&cmd));
        assert_eq!(ack_result(&sent.lock().unwrap()[0]), MavResult::Unsupported);
    }

    #[test]
    fn set_mode_without_subscriber_unsupported() {
        let (component, sent) = test_component();
        let _server = CameraServer::new(&component);

        let mut cmd = plain_command(command::CMD_SET_CAMERA_MODE);
        cmd.param2 = f32::from(wire::CAMERA_MODE_VIDEO);
        component.process_bytes(&command_frame(&cmd));
        assert_eq!(ack_result(&sent.lock().unwrap()[0]), MavResult::Unsupported);
    }

    #[test]
    fn storage_information_flow() {
        let (component, sent) = test_component();
        let server = Arc::new(CameraServer::new(&component));

        let responder = Arc::clone(&server);
        server.subscribe_storage_information(move |_storage_id| {
            responder
                .respond_storage_information(StorageInformation {
                    total_storage_mib: 4096.0,
                    used_storage_mib: 100.0,
                    available_storage_mib: 3996.0,
                    read_speed_mib_s: 80.0,
                    write_speed_mib_s: 40.0,
                    storage_status: StorageStatus::Formatted,
                    storage_type: StorageType::Microsd,
                })
                .unwrap();
        });

        let mut cmd = plain_command(command::CMD_REQUEST_STORAGE_INFORMATION);
        cmd.param1 = 3.0; // storage id
        cmd.param2 = 1.0;
        component.process_bytes(&command_frame(&cmd));

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(ack_result(&sent[0]), MavResult::Accepted);
        match &sent[1] {
            Outbound::StorageInformation(info) => {
                assert_eq!(info.storage_id, 3);
                assert_eq!(info.storage_count, 1);
                assert_eq!(info.status, wire::STORAGE_STATUS_READY);
                assert_eq!(info.storage_type, wire::STORAGE_TYPE_MICROSD);
                assert_eq!(info.storage_usage, 0);
            }
            other => panic!("expected storage information, got {other:?}"),
        }
    }

    #[test]
    fn storage_information_without_subscriber_unsupported() {
        let (component, sent) = test_component();
        let _server = CameraServer::new(&component);

        let mut cmd = plain_command(command::CMD_REQUEST_STORAGE_INFORMATION);
        cmd.param2 = 1.0;
        component.process_bytes(&command_frame(&cmd));
        assert_eq!(ack_result(&sent.lock().unwrap()[0]), MavResult::Unsupported);
    }

    #[test]
    fn capture_status_reports_interval_bits() {
        let (component, sent) = test_component();
        let server = Arc::new(CameraServer::new(&component));
        server.subscribe_take_photo(|_| {});

        let responder = Arc::clone(&server);
        server.subscribe_capture_status(move |_| {
            responder
                .respond_capture_status(CaptureStatus {
                    image_status: ImageStatus::Idle,
                    video_status: VideoStatus::CaptureInProgress,
                    recording_time_s: 1.5,
                    available_capacity_mib: 1024.0,
                    image_count: 0,
                })
                .unwrap();
        });

        // an active interval forces the INTERVAL_SET bit
        component.process_bytes(&command_frame(&start_capture_command(0.5, 5, 0)));
        sent.lock().unwrap().clear();

        let mut cmd = plain_command(command::CMD_REQUEST_CAMERA_CAPTURE_STATUS);
        cmd.param1 = 1.0;
        component.process_bytes(&command_frame(&cmd));

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(ack_result(&sent[0]), MavResult::Accepted);
        match &sent[1] {
            Outbound::CameraCaptureStatus(status) => {
                assert_eq!(status.image_status, wire::IMAGE_STATUS_INTERVAL_SET);
                assert_eq!(status.video_status, 1);
                assert_eq!(status.recording_time_ms, 1500);
                assert_eq!(status.image_interval_s, 0.5);
            }
            other => panic!("expected capture status, got {other:?}"),
        }
    }

    #[test]
    fn video_stream_information_flow() {
        let (component, sent) = test_component();
        let server = CameraServer::new(&component);

        component.process_bytes(&command_frame(&plain_command(
            command::CMD_REQUEST_VIDEO_STREAM_INFORMATION,
        )));
        assert_eq!(
            ack_result(&sent.lock().unwrap()[0]),
            MavResult::TemporarilyRejected
        );
        sent.lock().unwrap().clear();

        server
            .set_video_stream_info(vec![
                VideoStreamInfo {
                    stream_id: 1,
                    settings: VideoStreamSettings {
                        frame_rate_hz: 30.0,
                        horizontal_resolution_pix: 1920,
                        vertical_resolution_pix: 1080,
                        bit_rate_b_s: 4_000_000,
                        rotation_deg: 0,
                        horizontal_fov_deg: 90,
                        uri: "rtsp://192.168.0.10/live".into(),
                    },
                    status: VideoStreamStatus::InProgress,
                    spectrum: VideoStreamSpectrum::VisibleLight,
                },
                VideoStreamInfo {
                    stream_id: 2,
                    settings: VideoStreamSettings::default(),
                    status: VideoStreamStatus::NotRunning,
                    spectrum: VideoStreamSpectrum::Infrared,
                },
            ])
            .unwrap();

        component.process_bytes(&command_frame(&plain_command(
            command::CMD_REQUEST_VIDEO_STREAM_INFORMATION,
        )));

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 3, "one message per stream, then the ack");
        match (&sent[0], &sent[1], &sent[2]) {
            (
                Outbound::VideoStreamInformation(first),
                Outbound::VideoStreamInformation(second),
                Outbound::CommandAck(ack),
            ) => {
                assert_eq!(first.stream_id, 1);
                assert_eq!(first.count, 2);
                assert_eq!(first.flags, wire::VIDEO_STREAM_STATUS_FLAGS_RUNNING);
                assert_eq!(second.stream_id, 2);
                assert_eq!(second.flags, wire::VIDEO_STREAM_STATUS_FLAGS_THERMAL);
                assert_eq!(ack.result, MavResult::Accepted);
            }
            other => panic!("unexpected message sequence {other:?}"),
        }
    }

    #[test]
    fn video_capture_requires_subscriber() {
        let (component, sent) = test_component();
        let server = CameraServer::new(&component);

        let mut cmd = plain_command(command::CMD_VIDEO_START_CAPTURE);
        cmd.param1 = 1.0;
        component.process_bytes(&command_frame(&cmd));
        assert_eq!(ack_result(&sent.lock().unwrap()[0]), MavResult::Unsupported);
        sent.lock().unwrap().clear();

        let streams = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&streams);
        server.subscribe_start_video(move |stream_id| {
            seen.lock().unwrap().push(stream_id);
        });
        component.process_bytes(&command_frame(&cmd));

        assert_eq!(*streams.lock().unwrap(), vec![1]);
        assert_eq!(ack_result(&sent.lock().unwrap()[0]), MavResult::Accepted);
    }

    #[test]
    fn zoom_and_focus_always_unsupported() {
        let (component, sent) = test_component();
        let _server = CameraServer::new(&component);

        for cmd in [
            command::CMD_SET_CAMERA_ZOOM,
            command::CMD_SET_CAMERA_FOCUS,
            command::CMD_SET_STORAGE_USAGE,
            command::CMD_REQUEST_CAMERA_IMAGE_CAPTURE,
            command::CMD_REQUEST_VIDEO_STREAM_STATUS,
        ] {
            component.process_bytes(&command_frame(&plain_command(cmd)));
        }

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 5);
        for msg in sent.iter() {
            assert_eq!(ack_result(msg), MavResult::Unsupported);
        }
    }

    #[test]
    fn interval_capture_index_does_not_advance_counter() {
        let (component, sent) = test_component();
        let server = CameraServer::new(&component);
        server.subscribe_take_photo(|_| {});

        server
            .respond_take_photo(
                TakePhotoFeedback::Ok,
                CaptureInfo {
                    position: Position::default(),
                    attitude_quaternion: Quaternion::identity(),
                    time_utc_us: 0,
                    is_success: true,
                    index: CaptureInfo::INTERVAL_INDEX,
                    file_url: String::new(),
                },
            )
            .unwrap();

        // a single-shot request with seq 0 still goes through: counter is 0
        component.process_bytes(&command_frame(&start_capture_command(0.0, 1, 0)));
        let sent = sent.lock().unwrap();
        match &sent[0] {
            Outbound::CameraImageCaptured(msg) => {
                assert_eq!(msg.image_index, CaptureInfo::INTERVAL_INDEX);
            }
            other => panic!("expected image captured, got {other:?}"),
        }
        assert_eq!(ack_result(&sent[1]), MavResult::Accepted);
    }

    #[test]
    fn drop_cancels_interval_and_handlers() {
        let (component, sent) = test_component();
        let server = CameraServer::new(&component);

        let captures = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&captures);
        server.subscribe_take_photo(move |index| {
            seen.lock().unwrap().push(index);
        });
        component.process_bytes(&command_frame(&start_capture_command(0.5, 0, 0)));
        // the start capture fired; drop must cancel everything after it
        assert_eq!(*captures.lock().unwrap(), vec![0]);

        drop(server);

        let t0 = Instant::now();
        for ms in (100..=1600).step_by(100) {
            component.scheduler().run_at(t0 + Duration::from_millis(ms));
        }
        assert_eq!(*captures.lock().unwrap(), vec![0]);

        sent.lock().unwrap().clear();
        component.process_bytes(&command_frame(&information_request(1.0)));
        // handlers are gone; the component answers unsupported itself
        assert_eq!(ack_result(&sent.lock().unwrap()[0]), MavResult::Unsupported);
    }
}
