//! Wire types exchanged between a hosting form and its sandboxed secured-field frames.
//!
//! Every frame talks to the host through one tagged message shape,
//! `{kind, fieldType, payload}`. The host answers with [`HostMessage`]s.
//!
//! # Main Types
//!
//! - [`FieldType`] - Which secured input a frame hosts
//! - [`EventKind`] - The fixed set of events a frame can report
//! - [`FrameMessage`] / [`Message`] - Inbound messages, with a forward-compatible catch-all
//! - [`HostMessage`] - Outbound messages posted to one or all frames
//! - [`ConfigFailure`] - Rejection record for a config handshake

pub mod field;
pub mod message;

pub use field::{DATA_ENCRYPTED_FIELD_ATTR, FieldType, ParseFieldTypeError};
pub use message::{
	CONFIG_TIMEOUT_REASON, ConfigFailure, ConfiguredSignal, EventKind, FieldClick, FrameMessage,
	GENUINE_TOUCH_OVERRIDE_KEY, HostMessage, LoadedSignal, Message,
};
