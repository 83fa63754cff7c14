//! Shared server-component plumbing.
//!
//! A [`ServerComponent`] owns the MAVLink identity (system/component id),
//! outbound frame sequencing, the boot clock, the scheduler, and the
//! handler registries that plugins attach to. The external transport
//! adapter feeds received bytes into [`ServerComponent::process_bytes`] and
//! supplies the sink that outbound frames are written to; both plugins and
//! the transport may run on different threads, so every send goes through
//! one mutex — which is also what makes the ACK-before-data ordering hold.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use log::debug;

use crate::frame::{FrameSplitter, MavFrame};
use crate::protocol::command::{CommandAck, CommandLong, MavResult};
use crate::protocol::heartbeat::Heartbeat;
use crate::protocol::{self, Inbound, Outbound};
use crate::scheduler::{BootClock, Scheduler, TimerHandle};

/// Conventional MAVLink component id for a camera (MAV_COMP_ID_CAMERA).
pub const MAV_COMP_ID_CAMERA: u8 = 100;
/// Default UDP port a camera server listens on.
pub const DEFAULT_CAMERA_PORT: u16 = 14030;

/// Broadcast component id.
const MAV_COMP_ID_ALL: u8 = 0;

/// An inbound COMMAND_LONG together with its origin addressing, so acks can
/// be targeted back at the requester.
#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub origin_system_id: u8,
    pub origin_component_id: u8,
    pub command: CommandLong,
}

type CommandHandler = Box<dyn FnMut(&CommandRequest) -> Option<CommandAck> + Send>;
type MessageHandler = Box<dyn FnMut(&Inbound) + Send>;

/// Registration owner token, used to unregister a plugin's handlers in one
/// call when it is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct OwnerToken(u64);

struct CommandSlot {
    owner: OwnerToken,
    command: u16,
    /// Taken out while the handler runs so the lock can be released.
    handler: Option<CommandHandler>,
}

struct MessageSlot {
    owner: OwnerToken,
    msg_id: u32,
    handler: Option<MessageHandler>,
}

struct OutboundLink {
    seq: u8,
    sink: Box<dyn FnMut(&[u8]) + Send>,
}

/// The shared plumbing camera and parameter plugins register against.
pub struct ServerComponent {
    system_id: u8,
    component_id: u8,
    clock: BootClock,
    scheduler: Scheduler,
    outbound: Mutex<OutboundLink>,
    splitter: Mutex<FrameSplitter>,
    command_handlers: Mutex<Vec<CommandSlot>>,
    message_handlers: Mutex<Vec<MessageSlot>>,
    next_owner: AtomicU64,
}

impl ServerComponent {
    /// Create a component with the given identity. `sink` receives every
    /// encoded outbound frame; the transport owns delivery from there.
    pub fn new(
        system_id: u8,
        component_id: u8,
        sink: impl FnMut(&[u8]) + Send + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            system_id,
            component_id,
            clock: BootClock::new(),
            scheduler: Scheduler::new(),
            outbound: Mutex::new(OutboundLink {
                seq: 0,
                sink: Box::new(sink),
            }),
            splitter: Mutex::new(FrameSplitter::new()),
            command_handlers: Mutex::new(Vec::new()),
            message_handlers: Mutex::new(Vec::new()),
            next_owner: AtomicU64::new(1),
        })
    }

    pub fn system_id(&self) -> u8 {
        self.system_id
    }

    pub fn component_id(&self) -> u8 {
        self.component_id
    }

    /// Milliseconds since this component was constructed.
    pub fn elapsed_ms(&self) -> u32 {
        self.clock.elapsed_ms()
    }

    /// The timer service. The host drives it with
    /// [`Scheduler::run_once`](crate::scheduler::Scheduler::run_once) at its
    /// message boundary.
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Start emitting a 1 Hz camera HEARTBEAT via the scheduler.
    pub fn start_heartbeat(self: &Arc<Self>) -> TimerHandle {
        let weak: Weak<Self> = Arc::downgrade(self);
        self.scheduler.add_call_every(Duration::from_secs(1), move || {
            if let Some(component) = weak.upgrade() {
                component.send_message(&Outbound::Heartbeat(Heartbeat::camera()));
            }
        })
    }

    // -----------------------------------------------------------------------
    // Outbound
    // -----------------------------------------------------------------------

    /// Frame and emit a message. Sends are serialised under one mutex, so
    /// two messages sent back-to-back from one thread reach the wire in
    /// call order.
    pub fn send_message(&self, msg: &Outbound) {
        let (msg_id, crc_extra, payload) = msg.encode();
        let mut out = self.outbound.lock().unwrap();
        let frame = MavFrame::new(out.seq, self.system_id, self.component_id, msg_id, payload);
        out.seq = out.seq.wrapping_add(1);
        let wire = frame.encode(crc_extra);
        (out.sink)(&wire);
    }

    /// Build a COMMAND_ACK answering `request`.
    pub fn make_command_ack(&self, request: &CommandRequest, result: MavResult) -> CommandAck {
        CommandAck {
            command: request.command.command,
            result,
            progress: 0,
            result_param2: 0,
            target_system: request.origin_system_id,
            target_component: request.origin_component_id,
        }
    }

    // -----------------------------------------------------------------------
    // Inbound
    // -----------------------------------------------------------------------

    /// Feed received wire bytes. Complete frames are parsed, verified, and
    /// dispatched; wire-level errors are dropped with a debug log.
    pub fn process_bytes(&self, data: &[u8]) {
        let wires = self.splitter.lock().unwrap().feed(data);
        for wire in wires {
            let frame = match MavFrame::parse(&wire) {
                Ok(frame) => frame,
                Err(e) => {
                    debug!("dropping malformed frame: {e}");
                    continue;
                }
            };
            let Some(crc_extra) = protocol::crc_extra(frame.msg_id) else {
                debug!("dropping frame with unknown msg id {}", frame.msg_id);
                continue;
            };
            if let Err(e) = frame.verify(crc_extra) {
                debug!("dropping frame: {e}");
                continue;
            }
            self.process_frame(&frame);
        }
    }

    /// Dispatch one verified frame.
    pub fn process_frame(&self, frame: &MavFrame) {
        let msg = match Inbound::decode(frame) {
            Ok(msg) => msg,
            Err(e) => {
                debug!("dropping undecodable msg {}: {e}", frame.msg_id);
                return;
            }
        };

        match msg {
            Inbound::CommandLong(command) => {
                let request = CommandRequest {
                    origin_system_id: frame.system_id,
                    origin_component_id: frame.component_id,
                    command,
                };
                self.dispatch_command(&request);
            }
            other => self.dispatch_message(&other),
        }
    }

    /// Whether a targeted message addresses this component (or broadcast).
    pub(crate) fn accepts_target(&self, target_system: u8, target_component: u8) -> bool {
        (target_system == 0 || target_system == self.system_id)
            && (target_component == MAV_COMP_ID_ALL || target_component == self.component_id)
    }

    fn dispatch_command(&self, request: &CommandRequest) {
        let cmd = &request.command;
        if !self.accepts_target(cmd.target_system, cmd.target_component) {
            return;
        }

        // Take the handler out so user callbacks run without the registry
        // lock held.
        let taken = {
            let mut slots = self.command_handlers.lock().unwrap();
            slots
                .iter_mut()
                .find(|s| s.command == cmd.command)
                .and_then(|s| s.handler.take().map(|h| (s.owner, h)))
        };

        let Some((owner, mut handler)) = taken else {
            // Only answer commands addressed to this component directly.
            if cmd.target_component == self.component_id {
                debug!("no handler for command {}", cmd.command);
                self.send_message(&Outbound::CommandAck(
                    self.make_command_ack(request, MavResult::Unsupported),
                ));
            }
            return;
        };

        let ack = handler(request);

        {
            let mut slots = self.command_handlers.lock().unwrap();
            if let Some(slot) = slots
                .iter_mut()
                .find(|s| s.owner == owner && s.command == cmd.command)
            {
                slot.handler = Some(handler);
            }
        }

        if let Some(ack) = ack {
            self.send_message(&Outbound::CommandAck(ack));
        }
    }

    fn dispatch_message(&self, msg: &Inbound) {
        let msg_id = msg.msg_id();
        let slots_to_run: Vec<OwnerToken> = {
            let slots = self.message_handlers.lock().unwrap();
            slots
                .iter()
                .filter(|s| s.msg_id == msg_id)
                .map(|s| s.owner)
                .collect()
        };

        for owner in slots_to_run {
            let taken = {
                let mut slots = self.message_handlers.lock().unwrap();
                slots
                    .iter_mut()
                    .find(|s| s.owner == owner && s.msg_id == msg_id)
                    .and_then(|s| s.handler.take())
            };
            let Some(mut handler) = taken else { continue };

            handler(msg);

            let mut slots = self.message_handlers.lock().unwrap();
            if let Some(slot) = slots
                .iter_mut()
                .find(|s| s.owner == owner && s.msg_id == msg_id)
            {
                slot.handler = Some(handler);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Plugin registration
    // -----------------------------------------------------------------------

    pub(crate) fn alloc_owner(&self) -> OwnerToken {
        OwnerToken(self.next_owner.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn register_command_handler(
        &self,
        owner: OwnerToken,
        command: u16,
        handler: impl FnMut(&CommandRequest) -> Option<CommandAck> + Send + 'static,
    ) {
        let mut slots = self.command_handlers.lock().unwrap();
        slots.push(CommandSlot {
            owner,
            command,
            handler: Some(Box::new(handler)),
        });
    }

    pub(crate) fn register_message_handler(
        &self,
        owner: OwnerToken,
        msg_id: u32,
        handler: impl FnMut(&Inbound) + Send + 'static,
    ) {
        let mut slots = self.message_handlers.lock().unwrap();
        slots.push(MessageSlot {
            owner,
            msg_id,
            handler: Some(Box::new(handler)),
        });
    }

    /// Drop every handler registered under `owner`.
    pub(crate) fn unregister_owner(&self, owner: OwnerToken) {
        self.command_handlers
            .lock()
            .unwrap()
            .retain(|s| s.owner != owner);
        self.message_handlers
            .lock()
            .unwrap()
            .retain(|s| s.owner != owner);
    }
}

// ---------------------------------------------------------------------------
// Test support
// ---------------------------------------------------------------------------

/// Helpers shared by this module's tests and the plugin test modules:
/// a component whose sink decodes everything it emits, plus GCS-side frame
/// builders.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// A component (sysid 1, compid 100) whose outbound frames are decoded
    /// and collected for inspection.
    pub(crate) fn test_component() -> (Arc<ServerComponent>, Arc<Mutex<Vec<Outbound>>>) {
        let sent: Arc<Mutex<Vec<Outbound>>> = Arc::new(Mutex::new(Vec::new()));
        let sink_sent = Arc::clone(&sent);
        let component = ServerComponent::new(1, MAV_COMP_ID_CAMERA, move |wire| {
            let frame = MavFrame::parse(wire).unwrap();
            frame
                .verify(protocol::crc_extra(frame.msg_id).unwrap())
                .unwrap();
            sink_sent.lock().unwrap().push(decode_outbound(&frame));
        });
        (component, sent)
    }

    /// Decode an outbound frame back into its message for assertions.
    pub(crate) fn decode_outbound(frame: &MavFrame) -> Outbound {
        use crate::protocol::camera::*;
        use crate::protocol::param::*;
        let p = &frame.payload;
        match frame.msg_id {
            Heartbeat::MSG_ID => Outbound::Heartbeat(Heartbeat::decode(p).unwrap()),
            CommandAck::MSG_ID => Outbound::CommandAck(CommandAck::decode(p).unwrap()),
            CameraInformation::MSG_ID => {
                Outbound::CameraInformation(CameraInformation::decode(p).unwrap())
            }
            CameraSettings::MSG_ID => Outbound::CameraSettings(CameraSettings::decode(p).unwrap()),
            StorageInformation::MSG_ID => {
                Outbound::StorageInformation(StorageInformation::decode(p).unwrap())
            }
            CameraCaptureStatus::MSG_ID => {
                Outbound::CameraCaptureStatus(CameraCaptureStatus::decode(p).unwrap())
            }
            CameraImageCaptured::MSG_ID => {
                Outbound::CameraImageCaptured(CameraImageCaptured::decode(p).unwrap())
            }
            VideoStreamInformation::MSG_ID => {
                Outbound::VideoStreamInformation(VideoStreamInformation::decode(p).unwrap())
            }
            ParamValueMsg::MSG_ID => Outbound::ParamValue(ParamValueMsg::decode(p).unwrap()),
            ParamExtValue::MSG_ID => Outbound::ParamExtValue(ParamExtValue::decode(p).unwrap()),
            ParamExtAck::MSG_ID => Outbound::ParamExtAck(ParamExtAck::decode(p).unwrap()),
            other => panic!("unexpected outbound msg id {other}"),
        }
    }

    /// Frame a command as a GCS (sysid 245, compid 190) would send it.
    pub(crate) fn command_frame(cmd: &CommandLong) -> Vec<u8> {
        MavFrame::new(0, 245, 190, CommandLong::MSG_ID, cmd.encode())
            .encode(CommandLong::CRC_EXTRA)
    }

    /// Frame any GCS-side message.
    pub(crate) fn gcs_frame(msg_id: u32, crc_extra: u8, payload: Vec<u8>) -> Vec<u8> {
        MavFrame::new(0, 245, 190, msg_id, payload).encode(crc_extra)
    }

    pub(crate) fn plain_command(command: u16) -> CommandLong {
        CommandLong {
            target_system: 1,
            target_component: MAV_COMP_ID_CAMERA,
            command,
            confirmation: 0,
            param1: 0.0,
            param2: 0.0,
            param3: 0.0,
            param4: 0.0,
            param5: 0.0,
            param6: 0.0,
            param7: 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::protocol::command::CMD_SET_CAMERA_ZOOM;

    #[test]
    fn registered_handler_ack_is_sent() {
        let (component, sent) = test_component();
        let owner = component.alloc_owner();
        let ack_component = Arc::clone(&component);
        component.register_command_handler(owner, 521, move |req| {
            Some(ack_component.make_command_ack(req, MavResult::Accepted))
        });

        component.process_bytes(&command_frame(&plain_command(521)));

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        match &sent[0] {
            Outbound::CommandAck(ack) => {
                assert_eq!(ack.command, 521);
                assert_eq!(ack.result, MavResult::Accepted);
                assert_eq!(ack.target_system, 245);
                assert_eq!(ack.target_component, 190);
            }
            other => panic!("expected ack, got {other:?}"),
        }
    }

    #[test]
    fn unhandled_command_gets_unsupported() {
        let (component, sent) = test_component();
        component.process_bytes(&command_frame(&plain_command(CMD_SET_CAMERA_ZOOM)));

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        match &sent[0] {
            Outbound::CommandAck(ack) => assert_eq!(ack.result, MavResult::Unsupported),
            other => panic!("expected ack, got {other:?}"),
        }
    }

    #[test]
    fn command_for_other_component_ignored() {
        let (component, sent) = test_component();
        let mut cmd = plain_command(521);
        cmd.target_component = 42;
        component.process_bytes(&command_frame(&cmd));
        assert!(sent.lock().unwrap().is_empty());
    }

    #[test]
    fn corrupt_frame_silently_dropped() {
        let (component, sent) = test_component();
        let mut wire = command_frame(&plain_command(521));
        let last = wire.len() - 1;
        wire[last] ^= 0xFF;
        component.process_bytes(&wire);
        assert!(sent.lock().unwrap().is_empty());
    }

    #[test]
    fn unregister_owner_removes_handlers() {
        let (component, sent) = test_component();
        let owner = component.alloc_owner();
        let ack_component = Arc::clone(&component);
        component.register_command_handler(owner, 521, move |req| {
            Some(ack_component.make_command_ack(req, MavResult::Accepted))
        });
        component.unregister_owner(owner);

        component.process_bytes(&command_frame(&plain_command(521)));
        let sent = sent.lock().unwrap();
        // falls through to the built-in unsupported ack
        assert_eq!(sent.len(), 1);
        match &sent[0] {
            Outbound::CommandAck(ack) => assert_eq!(ack.result, MavResult::Unsupported),
            other => panic!("expected ack, got {other:?}"),
        }
    }

    #[test]
    fn outbound_seq_increments() {
        let sent: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));
        let sink_sent = Arc::clone(&sent);
        let component = ServerComponent::new(1, MAV_COMP_ID_CAMERA, move |wire| {
            sink_sent
                .lock()
                .unwrap()
                .push(MavFrame::parse(wire).unwrap().seq);
        });
        for _ in 0..3 {
            component.send_message(&Outbound::Heartbeat(Heartbeat::camera()));
        }
        assert_eq!(*sent.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn heartbeat_timer_emits() {
        let (component, sent) = test_component();
        component.start_heartbeat();
        let t0 = std::time::Instant::now();
        component
            .scheduler()
            .run_at(t0 + Duration::from_millis(1100));

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(matches!(sent[0], Outbound::Heartbeat(_)));
    }
}
