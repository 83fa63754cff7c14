//! Parameter server plugin.
//!
//! Keeps a typed, insertion-ordered store of named parameters (names at
//! most 16 bytes, type fixed at first provide), notifies per-parameter
//! change subscribers after successful remote sets, and serves the store
//! over both parameter protocols: classic PARAM for numeric values (cast
//! through IEEE-754 float) and PARAM_EXT for everything, with native
//! little-endian value bytes.

use std::sync::{Arc, Mutex};

use log::debug;

use crate::callback_list::Handle;
use crate::component::{OwnerToken, ServerComponent};
use crate::error::ParamError;
use crate::protocol::param::{
    PARAM_ACK_ACCEPTED, PARAM_ACK_FAILED, PARAM_ACK_VALUE_UNSUPPORTED, ParamExtAck,
    ParamExtRequestList, ParamExtRequestRead, ParamExtSet, ParamExtValue, ParamRequestList,
    ParamRequestRead, ParamSet, ParamValueMsg, ParamWireType,
};
use crate::protocol::{Inbound, Outbound};

/// Maximum parameter name length.
pub const MAX_PARAM_NAME_LEN: usize = 16;
/// Maximum custom parameter value length.
pub const MAX_PARAM_VALUE_LEN: usize = 128;

/// Declared type of a provided or subscribed parameter. The numeric tags
/// mirror the camera definition file's `type="..."` attribute values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ParamType {
    Uint8,
    Int8,
    Uint16,
    Int16,
    Uint32,
    Int32,
    Uint64,
    Int64,
    Float,
    Double,
    String,
    Custom,
}

/// A stored parameter value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ParamValue {
    Int(i32),
    Float(f32),
    /// Parsed from a string with an explicit numeric type tag.
    Typed(TypedValue),
    /// Opaque string, at most 128 bytes.
    Custom(String),
}

/// Native payload of a [`ParamValue::Typed`] parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum TypedValue {
    Uint8(u8),
    Int8(i8),
    Uint16(u16),
    Int16(i16),
    Uint32(u32),
    Int32(i32),
    Uint64(u64),
    Int64(i64),
    Float(f32),
    Double(f64),
}

impl TypedValue {
    fn parse(tag: ParamType, raw: &str) -> Option<Self> {
        match tag {
            ParamType::Uint8 => raw.parse().ok().map(Self::Uint8),
            ParamType::Int8 => raw.parse().ok().map(Self::Int8),
            ParamType::Uint16 => raw.parse().ok().map(Self::Uint16),
            ParamType::Int16 => raw.parse().ok().map(Self::Int16),
            ParamType::Uint32 => raw.parse().ok().map(Self::Uint32),
            ParamType::Int32 => raw.parse().ok().map(Self::Int32),
            ParamType::Uint64 => raw.parse().ok().map(Self::Uint64),
            ParamType::Int64 => raw.parse().ok().map(Self::Int64),
            ParamType::Float => raw.parse().ok().map(Self::Float),
            ParamType::Double => raw.parse().ok().map(Self::Double),
            ParamType::String | ParamType::Custom => None,
        }
    }

    fn wire_type(self) -> ParamWireType {
        match self {
            Self::Uint8(_) => ParamWireType::Uint8,
            Self::Int8(_) => ParamWireType::Int8,
            Self::Uint16(_) => ParamWireType::Uint16,
            Self::Int16(_) => ParamWireType::Int16,
            Self::Uint32(_) => ParamWireType::Uint32,
            Self::Int32(_) => ParamWireType::Int32,
            Self::Uint64(_) => ParamWireType::Uint64,
            Self::Int64(_) => ParamWireType::Int64,
            Self::Float(_) => ParamWireType::Real32,
            Self::Double(_) => ParamWireType::Real64,
        }
    }

    fn as_f32(self) -> f32 {
        match self {
            Self::Uint8(v) => f32::from(v),
            Self::Int8(v) => f32::from(v),
            Self::Uint16(v) => f32::from(v),
            Self::Int16(v) => f32::from(v),
            Self::Uint32(v) => v as f32,
            Self::Int32(v) => v as f32,
            Self::Uint64(v) => v as f32,
            Self::Int64(v) => v as f32,
            Self::Float(v) => v,
            Self::Double(v) => v as f32,
        }
    }

    fn set_from_f32(&mut self, v: f32) {
        match self {
            Self::Uint8(x) => *x = v as u8,
            Self::Int8(x) => *x = v as i8,
            Self::Uint16(x) => *x = v as u16,
            Self::Int16(x) => *x = v as i16,
            Self::Uint32(x) => *x = v as u32,
            Self::Int32(x) => *x = v as i32,
            Self::Uint64(x) => *x = v as u64,
            Self::Int64(x) => *x = v as i64,
            Self::Float(x) => *x = v,
            Self::Double(x) => *x = f64::from(v),
        }
    }

    fn ext_bytes(self) -> Vec<u8> {
        match self {
            Self::Uint8(v) => v.to_le_bytes().to_vec(),
            Self::Int8(v) => v.to_le_bytes().to_vec(),
            Self::Uint16(v) => v.to_le_bytes().to_vec(),
            Self::Int16(v) => v.to_le_bytes().to_vec(),
            Self::Uint32(v) => v.to_le_bytes().to_vec(),
            Self::Int32(v) => v.to_le_bytes().to_vec(),
            Self::Uint64(v) => v.to_le_bytes().to_vec(),
            Self::Int64(v) => v.to_le_bytes().to_vec(),
            Self::Float(v) => v.to_le_bytes().to_vec(),
            Self::Double(v) => v.to_le_bytes().to_vec(),
        }
    }

    fn set_from_ext_bytes(&mut self, bytes: &[u8]) -> bool {
        fn read<const N: usize>(bytes: &[u8]) -> Option<[u8; N]> {
            bytes.get(..N)?.try_into().ok()
        }
        match self {
            Self::Uint8(x) => match read(bytes) {
                Some(b) => {
                    *x = u8::from_le_bytes(b);
                    true
                }
                None => false,
            },
            Self::Int8(x) => match read(bytes) {
                Some(b) => {
                    *x = i8::from_le_bytes(b);
                    true
                }
                None => false,
            },
            Self::Uint16(x) => match read(bytes) {
                Some(b) => {
                    *x = u16::from_le_bytes(b);
                    true
                }
                None => false,
            },
            Self::Int16(x) => match read(bytes) {
                Some(b) => {
                    *x = i16::from_le_bytes(b);
                    true
                }
                None => false,
            },
            Self::Uint32(x) => match read(bytes) {
                Some(b) => {
                    *x = u32::from_le_bytes(b);
                    true
                }
                None => false,
            },
            Self::Int32(x) => match read(bytes) {
                Some(b) => {
                    *x = i32::from_le_bytes(b);
                    true
                }
                None => false,
            },
            Self::Uint64(x) => match read(bytes) {
                Some(b) => {
                    *x = u64::from_le_bytes(b);
                    true
                }
                None => false,
            },
            Self::Int64(x) => match read(bytes) {
                Some(b) => {
                    *x = i64::from_le_bytes(b);
                    true
                }
                None => false,
            },
            Self::Float(x) => match read(bytes) {
                Some(b) => {
                    *x = f32::from_le_bytes(b);
                    true
                }
                None => false,
            },
            Self::Double(x) => match read(bytes) {
                Some(b) => {
                    *x = f64::from_le_bytes(b);
                    true
                }
                None => false,
            },
        }
    }

    fn render(self) -> String {
        match self {
            Self::Uint8(v) => v.to_string(),
            Self::Int8(v) => v.to_string(),
            Self::Uint16(v) => v.to_string(),
            Self::Int16(v) => v.to_string(),
            Self::Uint32(v) => v.to_string(),
            Self::Int32(v) => v.to_string(),
            Self::Uint64(v) => v.to_string(),
            Self::Int64(v) => v.to_string(),
            Self::Float(v) => format!("{v:.6}"),
            Self::Double(v) => format!("{v:.6}"),
        }
    }
}

impl ParamValue {
    fn wire_type(&self) -> ParamWireType {
        match self {
            Self::Int(_) => ParamWireType::Int32,
            Self::Float(_) => ParamWireType::Real32,
            Self::Typed(t) => t.wire_type(),
            Self::Custom(_) => ParamWireType::Custom,
        }
    }

    /// True for values served by the classic PARAM protocol.
    fn is_numeric(&self) -> bool {
        !matches!(self, Self::Custom(_))
    }

    fn as_wire_f32(&self) -> f32 {
        match self {
            Self::Int(v) => *v as f32,
            Self::Float(v) => *v,
            Self::Typed(t) => t.as_f32(),
            Self::Custom(_) => 0.0,
        }
    }

    fn ext_bytes(&self) -> Vec<u8> {
        match self {
            Self::Int(v) => v.to_le_bytes().to_vec(),
            Self::Float(v) => v.to_le_bytes().to_vec(),
            Self::Typed(t) => t.ext_bytes(),
            Self::Custom(s) => s.as_bytes().to_vec(),
        }
    }

    /// Canonical string rendering used for change notifications.
    fn render(&self) -> String {
        match self {
            Self::Int(v) => v.to_string(),
            Self::Float(v) => format!("{v:.6}"),
            Self::Typed(t) => t.render(),
            Self::Custom(s) => s.clone(),
        }
    }

    /// Rewrite from a classic PARAM_SET. The wire type must match the
    /// advertised type exactly.
    fn set_from_wire_f32(&mut self, wire_type: ParamWireType, v: f32) -> bool {
        if wire_type != self.wire_type() {
            return false;
        }
        match self {
            Self::Int(x) => *x = v as i32,
            Self::Float(x) => *x = v,
            Self::Typed(t) => t.set_from_f32(v),
            Self::Custom(_) => return false,
        }
        true
    }

    /// Rewrite from a PARAM_EXT_SET value field.
    fn set_from_ext_bytes(&mut self, wire_type: ParamWireType, bytes: &[u8]) -> bool {
        if wire_type != self.wire_type() {
            return false;
        }
        match self {
            Self::Int(x) => match bytes.get(..4).and_then(|b| <[u8; 4]>::try_from(b).ok()) {
                Some(b) => {
                    *x = i32::from_le_bytes(b);
                    true
                }
                None => false,
            },
            Self::Float(x) => match bytes.get(..4).and_then(|b| <[u8; 4]>::try_from(b).ok()) {
                Some(b) => {
                    *x = f32::from_le_bytes(b);
                    true
                }
                None => false,
            },
            Self::Typed(t) => t.set_from_ext_bytes(bytes),
            Self::Custom(s) => {
                let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |p| p + 1);
                *s = String::from_utf8_lossy(&bytes[..end]).into_owned();
                true
            }
        }
    }
}

/// An integer parameter, as listed by [`ParamServer::retrieve_all_params`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct IntParam {
    pub name: String,
    pub value: i32,
}

/// A float parameter.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FloatParam {
    pub name: String,
    pub value: f32,
}

/// A custom (opaque string) parameter.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CustomParam {
    pub name: String,
    pub value: String,
}

/// Every parameter currently provided, bucketed by type.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AllParams {
    pub int_params: Vec<IntParam>,
    pub float_params: Vec<FloatParam>,
    pub custom_params: Vec<CustomParam>,
}

struct Entry {
    name: String,
    value: ParamValue,
}

struct ChangedSub {
    handle: Handle,
    name: String,
    declared: ParamType,
    /// Taken out while the callback runs so the lock can be released.
    cb: Option<Box<dyn FnMut(&str) + Send>>,
}

struct Inner {
    component: Arc<ServerComponent>,
    store: Mutex<Vec<Entry>>,
    changed_subs: Mutex<Vec<ChangedSub>>,
}

/// The parameter server plugin.
///
/// Construction registers the PARAM / PARAM_EXT message handlers; drop
/// unregisters them.
pub struct ParamServer {
    inner: Arc<Inner>,
    owner: OwnerToken,
}

impl ParamServer {
    pub fn new(component: &Arc<ServerComponent>) -> Self {
        let inner = Arc::new(Inner {
            component: Arc::clone(component),
            store: Mutex::new(Vec::new()),
            changed_subs: Mutex::new(Vec::new()),
        });

        let owner = component.alloc_owner();

        let h = Arc::clone(&inner);
        component.register_message_handler(owner, ParamRequestRead::MSG_ID, move |msg| {
            if let Inbound::ParamRequestRead(req) = msg {
                h.handle_request_read(req);
            }
        });
        let h = Arc::clone(&inner);
        component.register_message_handler(owner, ParamRequestList::MSG_ID, move |msg| {
            if let Inbound::ParamRequestList(req) = msg {
                h.handle_request_list(req);
            }
        });
        let h = Arc::clone(&inner);
        component.register_message_handler(owner, ParamSet::MSG_ID, move |msg| {
            if let Inbound::ParamSet(set) = msg {
                h.handle_set(set);
            }
        });
        let h = Arc::clone(&inner);
        component.register_message_handler(owner, ParamExtRequestRead::MSG_ID, move |msg| {
            if let Inbound::ParamExtRequestRead(req) = msg {
                h.handle_ext_request_read(req);
            }
        });
        let h = Arc::clone(&inner);
        component.register_message_handler(owner, ParamExtRequestList::MSG_ID, move |msg| {
            if let Inbound::ParamExtRequestList(req) = msg {
                h.handle_ext_request_list(req);
            }
        });
        let h = Arc::clone(&inner);
        component.register_message_handler(owner, ParamExtSet::MSG_ID, move |msg| {
            if let Inbound::ParamExtSet(set) = msg {
                h.handle_ext_set(set);
            }
        });

        Self { inner, owner }
    }

    // -----------------------------------------------------------------------
    // Provide / retrieve
    // -----------------------------------------------------------------------

    /// Provide (or update) an integer parameter.
    pub fn provide_param_int(&self, name: &str, value: i32) -> Result<(), ParamError> {
        self.inner.provide(name, ParamValue::Int(value))
    }

    /// Provide (or update) a float parameter.
    pub fn provide_param_float(&self, name: &str, value: f32) -> Result<(), ParamError> {
        self.inner.provide(name, ParamValue::Float(value))
    }

    /// Provide (or update) a parameter from its string form.
    ///
    /// With a numeric `value_type` the string is parsed to the native value
    /// and the parameter is stored typed; `String`/`Custom` store the raw
    /// string.
    pub fn provide_param_custom(
        &self,
        name: &str,
        value: &str,
        value_type: ParamType,
    ) -> Result<(), ParamError> {
        if value.len() > MAX_PARAM_VALUE_LEN {
            return Err(ParamError::ParamValueTooLong);
        }
        let value = match value_type {
            ParamType::String | ParamType::Custom => ParamValue::Custom(value.to_string()),
            numeric => ParamValue::Typed(
                TypedValue::parse(numeric, value).ok_or(ParamError::WrongArgument)?,
            ),
        };
        self.inner.provide(name, value)
    }

    /// Look up an integer parameter.
    pub fn retrieve_param_int(&self, name: &str) -> Result<i32, ParamError> {
        let store = self.inner.store.lock().unwrap();
        match store.iter().find(|e| e.name == name).map(|e| &e.value) {
            Some(ParamValue::Int(v)) => Ok(*v),
            Some(ParamValue::Typed(TypedValue::Int32(v))) => Ok(*v),
            _ => Err(ParamError::NotFound),
        }
    }

    /// Look up a float parameter.
    pub fn retrieve_param_float(&self, name: &str) -> Result<f32, ParamError> {
        let store = self.inner.store.lock().unwrap();
        match store.iter().find(|e| e.name == name).map(|e| &e.value) {
            Some(ParamValue::Float(v)) => Ok(*v),
            Some(ParamValue::Typed(TypedValue::Float(v))) => Ok(*v),
            _ => Err(ParamError::NotFound),
        }
    }

    /// Look up a custom parameter.
    pub fn retrieve_param_custom(&self, name: &str) -> Result<String, ParamError> {
        let store = self.inner.store.lock().unwrap();
        match store.iter().find(|e| e.name == name).map(|e| &e.value) {
            Some(ParamValue::Custom(v)) => Ok(v.clone()),
            _ => Err(ParamError::NotFound),
        }
    }

    /// Every provided parameter, bucketed by type.
    pub fn retrieve_all_params(&self) -> AllParams {
        let store = self.inner.store.lock().unwrap();
        let mut all = AllParams::default();
        for entry in store.iter() {
            match &entry.value {
                ParamValue::Int(v) | ParamValue::Typed(TypedValue::Int32(v)) => {
                    all.int_params.push(IntParam {
                        name: entry.name.clone(),
                        value: *v,
                    });
                }
                ParamValue::Float(v) | ParamValue::Typed(TypedValue::Float(v)) => {
                    all.float_params.push(FloatParam {
                        name: entry.name.clone(),
                        value: *v,
                    });
                }
                ParamValue::Custom(v) => {
                    all.custom_params.push(CustomParam {
                        name: entry.name.clone(),
                        value: v.clone(),
                    });
                }
                ParamValue::Typed(_) => {}
            }
        }
        all
    }

    // -----------------------------------------------------------------------
    // Change subscriptions
    // -----------------------------------------------------------------------

    /// Subscribe to remote changes of one parameter. The callback receives
    /// the canonical string rendering of the new value and only fires when
    /// the stored parameter matches `value_type`'s class (integer, real, or
    /// string).
    pub fn subscribe_param_changed(
        &self,
        name: &str,
        value_type: ParamType,
        f: impl FnMut(&str) + Send + 'static,
    ) -> Handle {
        let handle = Handle::next();
        let mut subs = self.inner.changed_subs.lock().unwrap();
        subs.push(ChangedSub {
            handle,
            name: name.to_string(),
            declared: value_type,
            cb: Some(Box::new(f)),
        });
        handle
    }

    /// Remove a change subscription. Returns false for unknown handles.
    pub fn unsubscribe_param_changed(&self, handle: Handle) -> bool {
        let mut subs = self.inner.changed_subs.lock().unwrap();
        match subs.iter().position(|s| s.handle == handle) {
            Some(pos) => {
                subs.remove(pos);
                true
            }
            None => false,
        }
    }
}

impl Drop for ParamServer {
    fn drop(&mut self) {
        self.inner.component.unregister_owner(self.owner);
    }
}

impl Inner {
    fn provide(&self, name: &str, value: ParamValue) -> Result<(), ParamError> {
        if name.len() > MAX_PARAM_NAME_LEN {
            return Err(ParamError::ParamNameTooLong);
        }
        let mut store = self.store.lock().unwrap();
        match store.iter_mut().find(|e| e.name == name) {
            Some(entry) => {
                if entry.value.wire_type() != value.wire_type() {
                    return Err(ParamError::WrongType);
                }
                entry.value = value;
            }
            None => store.push(Entry {
                name: name.to_string(),
                value,
            }),
        }
        Ok(())
    }

    /// Snapshot of the numeric (classic-PARAM) view:
    /// `(name, wire_type, float value)` per entry.
    fn numeric_snapshot(&self) -> Vec<(String, ParamWireType, f32)> {
        let store = self.store.lock().unwrap();
        store
            .iter()
            .filter(|e| e.value.is_numeric())
            .map(|e| (e.name.clone(), e.value.wire_type(), e.value.as_wire_f32()))
            .collect()
    }

    /// Snapshot of the PARAM_EXT view: `(name, wire_type, value bytes)`.
    fn ext_snapshot(&self) -> Vec<(String, ParamWireType, Vec<u8>)> {
        let store = self.store.lock().unwrap();
        store
            .iter()
            .map(|e| (e.name.clone(), e.value.wire_type(), e.value.ext_bytes()))
            .collect()
    }

    fn send_param_value(&self, name: &str, wire_type: ParamWireType, value: f32, index: u16, count: u16) {
        self.component.send_message(&Outbound::ParamValue(ParamValueMsg {
            param_id: name.to_string(),
            param_value: value,
            param_type: wire_type,
            param_count: count,
            param_index: index,
        }));
    }

    fn handle_request_read(&self, req: &ParamRequestRead) {
        if !self.component.accepts_target(req.target_system, req.target_component) {
            return;
        }

        let view = self.numeric_snapshot();
        let count = view.len() as u16;

        let found = if req.param_index >= 0 {
            view.get(req.param_index as usize)
                .map(|entry| (req.param_index as u16, entry.clone()))
        } else {
            view.iter()
                .enumerate()
                .find(|(_, (name, _, _))| *name == req.param_id)
                .map(|(i, entry)| (i as u16, entry.clone()))
        };

        match found {
            Some((index, (name, wire_type, value))) => {
                self.send_param_value(&name, wire_type, value, index, count);
            }
            None => debug!("param read for unknown parameter {:?}", req.param_id),
        }
    }

    fn handle_request_list(&self, req: &ParamRequestList) {
        if !self.component.accepts_target(req.target_system, req.target_component) {
            return;
        }

        let view = self.numeric_snapshot();
        let count = view.len() as u16;
        for (index, (name, wire_type, value)) in view.into_iter().enumerate() {
            self.send_param_value(&name, wire_type, value, index as u16, count);
        }
    }

    fn handle_set(&self, set: &ParamSet) {
        if !self.component.accepts_target(set.target_system, set.target_component) {
            return;
        }

        let updated = {
            let mut store = self.store.lock().unwrap();
            let Some(entry) = store.iter_mut().find(|e| e.name == set.param_id) else {
                debug!("param set for unknown parameter {:?}", set.param_id);
                return;
            };
            if !entry.value.set_from_wire_f32(set.param_type, set.param_value) {
                debug!(
                    "param set type mismatch for {:?}: got {:?}, have {:?}",
                    set.param_id,
                    set.param_type,
                    entry.value.wire_type()
                );
                return;
            }
            entry.value.clone()
        };

        // The new PARAM_VALUE is broadcast before subscribers observe the
        // change.
        let view = self.numeric_snapshot();
        let count = view.len() as u16;
        if let Some((index, (name, wire_type, value))) = view
            .iter()
            .enumerate()
            .find(|(_, (name, _, _))| *name == set.param_id)
            .map(|(i, entry)| (i as u16, entry.clone()))
        {
            self.send_param_value(&name, wire_type, value, index, count);
        }

        self.notify_changed(&set.param_id, &updated);
    }

    fn send_ext_value(&self, name: &str, wire_type: ParamWireType, value: Vec<u8>, index: u16, count: u16) {
        self.component.send_message(&Outbound::ParamExtValue(ParamExtValue {
            param_id: name.to_string(),
            param_value: value,
            param_type: wire_type,
            param_count: count,
            param_index: index,
        }));
    }

    fn handle_ext_request_read(&self, req: &ParamExtRequestRead) {
        if !self.component.accepts_target(req.target_system, req.target_component) {
            return;
        }

        let view = self.ext_snapshot();
        let count = view.len() as u16;

        let found = if req.param_index >= 0 {
            view.into_iter()
                .nth(req.param_index as usize)
                .map(|entry| (req.param_index as u16, entry))
        } else {
            view.into_iter()
                .enumerate()
                .find(|(_, (name, _, _))| *name == req.param_id)
                .map(|(i, entry)| (i as u16, entry))
        };

        match found {
            Some((index, (name, wire_type, value))) => {
                self.send_ext_value(&name, wire_type, value, index, count);
            }
            None => debug!("param ext read for unknown parameter {:?}", req.param_id),
        }
    }

    fn handle_ext_request_list(&self, req: &ParamExtRequestList) {
        if !self.component.accepts_target(req.target_system, req.target_component) {
            return;
        }

        let view = self.ext_snapshot();
        let count = view.len() as u16;
        for (index, (name, wire_type, value)) in view.into_iter().enumerate() {
            self.send_ext_value(&name, wire_type, value, index as u16, count);
        }
    }

    fn handle_ext_set(&self, set: &ParamExtSet) {
        if !self.component.accepts_target(set.target_system, set.target_component) {
            return;
        }

        let ack = |result: u8, value: Vec<u8>| {
            self.component.send_message(&Outbound::ParamExtAck(ParamExtAck {
                param_id: set.param_id.clone(),
                param_value: value,
                param_result: result,
            }));
        };

        let updated = {
            let mut store = self.store.lock().unwrap();
            let Some(entry) = store.iter_mut().find(|e| e.name == set.param_id) else {
                debug!("param ext set for unknown parameter {:?}", set.param_id);
                ack(PARAM_ACK_FAILED, set.param_value.clone());
                return;
            };
            if !entry.value.set_from_ext_bytes(set.param_type, &set.param_value) {
                debug!(
                    "param ext set type mismatch for {:?}: got {:?}, have {:?}",
                    set.param_id,
                    set.param_type,
                    entry.value.wire_type()
                );
                ack(PARAM_ACK_VALUE_UNSUPPORTED, set.param_value.clone());
                return;
            }
            entry.value.clone()
        };

        ack(PARAM_ACK_ACCEPTED, updated.ext_bytes());

        self.notify_changed(&set.param_id, &updated);
    }

    /// Fire change subscribers for `name` whose declared type matches the
    /// stored value's class.
    fn notify_changed(&self, name: &str, value: &ParamValue) {
        let rendered = value.render();

        let handles: Vec<Handle> = {
            let subs = self.changed_subs.lock().unwrap();
            subs.iter()
                .filter(|s| s.name == name && declared_matches(s.declared, value))
                .map(|s| s.handle)
                .collect()
        };

        for handle in handles {
            let mut cb = {
                let mut subs = self.changed_subs.lock().unwrap();
                match subs.iter_mut().find(|s| s.handle == handle) {
                    Some(sub) => match sub.cb.take() {
                        Some(cb) => cb,
                        None => continue,
                    },
                    None => continue,
                }
            };

            cb(&rendered);

            let mut subs = self.changed_subs.lock().unwrap();
            if let Some(sub) = subs.iter_mut().find(|s| s.handle == handle) {
                sub.cb = Some(cb);
            }
        }
    }
}

fn declared_matches(declared: ParamType, value: &ParamValue) -> bool {
    let integer = matches!(
        value,
        ParamValue::Int(_)
            | ParamValue::Typed(
                TypedValue::Uint8(_)
                    | TypedValue::Int8(_)
                    | TypedValue::Uint16(_)
                    | TypedValue::Int16(_)
                    | TypedValue::Uint32(_)
                    | TypedValue::Int32(_)
                    | TypedValue::Uint64(_)
                    | TypedValue::Int64(_)
            )
    );
    let real = matches!(
        value,
        ParamValue::Float(_) | ParamValue::Typed(TypedValue::Float(_) | TypedValue::Double(_))
    );
    match declared {
        ParamType::Uint8
        | ParamType::Int8
        | ParamType::Uint16
        | ParamType::Int16
        | ParamType::Uint32
        | ParamType::Int32
        | ParamType::Uint64
        | ParamType::Int64 => integer,
        ParamType::Float | ParamType::Double => real,
        ParamType::String | ParamType::Custom => matches!(value, ParamValue::Custom(_)),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
