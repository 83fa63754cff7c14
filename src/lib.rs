pub mod callback_list;
pub mod camera;
pub mod codec;
pub mod component;
pub mod error;
pub mod frame;
pub mod param;
pub mod protocol;
pub mod scheduler;
pub mod types;

pub use callback_list::{CallbackList, Handle};
pub use camera::CameraServer;
pub use component::{CommandRequest, DEFAULT_CAMERA_PORT, MAV_COMP_ID_CAMERA, ServerComponent};
pub use error::{CameraError, ParamError, WireError};
pub use frame::{FrameSplitter, MavFrame};
pub use param::{
    AllParams, CustomParam, FloatParam, IntParam, ParamServer, ParamType, ParamValue, TypedValue,
};
pub use protocol::{Inbound, Outbound};
pub use scheduler::{Scheduler, TimerHandle};
pub use types::{
    CaptureInfo, CaptureStatus, ImageStatus, Information, Mode, Position, Quaternion,
    StorageInformation, StorageStatus, StorageType, TakePhotoFeedback, VideoStatus,
    VideoStreamInfo, VideoStreamSettings, VideoStreamSpectrum, VideoStreamStatus,
};
