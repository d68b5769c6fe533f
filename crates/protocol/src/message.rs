//! Inbound frame messages, outbound host messages and the signals built from them.
//!
//! Frames post `{kind, fieldType, payload}`. The payload is opaque at this layer:
//! encryption and validation results are relayed untouched to the owning form.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::field::FieldType;

/// Failure reason carried by a config handshake that timed out.
pub const CONFIG_TIMEOUT_REASON: &str = "sf took too long to config";

/// Payload key a frame may set on `touchstart` to override the host's touch capability.
pub const GENUINE_TOUCH_OVERRIDE_KEY: &str = "hasGenuineTouchEvents";

/// Event kinds a secured-field frame can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
	/// Frame content finished loading.
	Load,
	/// Frame reported its configuration (ends the config handshake).
	Config,
	/// Input gained or lost focus.
	Focus,
	/// Enough digits were typed to detect a value (e.g. a card BIN).
	ValueDetected,
	/// Shift+Tab pressed inside the frame.
	ShiftTab,
	/// Encryption finished, successfully or not.
	EncryptionResult,
	/// Validation state changed.
	ValidationResult,
	/// Browser autofill populated the field.
	AutofillDetected,
	/// Touch started inside the frame.
	Touchstart,
}

impl EventKind {
	/// Every event kind, in declaration order.
	pub const ALL: [EventKind; 9] = [
		EventKind::Load,
		EventKind::Config,
		EventKind::Focus,
		EventKind::ValueDetected,
		EventKind::ShiftTab,
		EventKind::EncryptionResult,
		EventKind::ValidationResult,
		EventKind::AutofillDetected,
		EventKind::Touchstart,
	];

	/// Returns the wire name.
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Load => "load",
			Self::Config => "config",
			Self::Focus => "focus",
			Self::ValueDetected => "valueDetected",
			Self::ShiftTab => "shiftTab",
			Self::EncryptionResult => "encryptionResult",
			Self::ValidationResult => "validationResult",
			Self::AutofillDetected => "autofillDetected",
			Self::Touchstart => "touchstart",
		}
	}
}

impl std::fmt::Display for EventKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A message posted by a secured-field frame to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameMessage {
	/// What happened inside the frame.
	pub kind: EventKind,
	/// Which field's frame sent it (routing key).
	#[serde(alias = "fieldIdentifier")]
	pub field_type: FieldType,
	/// Event-specific data, relayed untouched.
	#[serde(default)]
	pub payload: Value,
}

impl FrameMessage {
	/// Creates a message for `field_type` with the given payload.
	pub fn new(kind: EventKind, field_type: FieldType, payload: Value) -> Self {
		Self {
			kind,
			field_type,
			payload,
		}
	}
}

/// Inbound message as parsed off the channel.
///
/// Anything that is not a well-formed [`FrameMessage`] with a known kind and field
/// lands in [`Message::Unknown`] so newer frames never break older hosts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
	/// Known event for a known field.
	Frame(FrameMessage),
	/// Unrecognized message (forward-compatible catch-all).
	Unknown(Value),
}

impl From<FrameMessage> for Message {
	fn from(message: FrameMessage) -> Self {
		Message::Frame(message)
	}
}

/// Synthetic click marker broadcast to every frame after a genuine touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldClick {
	pub field_type: FieldType,
	pub field_click: bool,
}

/// A message posted by the host to one or all frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HostMessage {
	/// `{fieldType, fieldClick: true}`
	FieldClick(FieldClick),
	/// Arbitrary structured message chosen by the owning form.
	Custom(Value),
}

impl HostMessage {
	/// Builds the click marker for a touch that started in `field_type`.
	pub fn field_click(field_type: FieldType) -> Self {
		HostMessage::FieldClick(FieldClick {
			field_type,
			field_click: true,
		})
	}
}

/// Aggregate signal fired once every expected frame has loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadedSignal {
	pub iframes_loaded: bool,
}

impl LoadedSignal {
	pub fn loaded() -> Self {
		Self {
			iframes_loaded: true,
		}
	}
}

/// Aggregate signal fired once every expected frame has reported its config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfiguredSignal {
	pub iframes_configured: bool,
}

impl ConfiguredSignal {
	pub fn configured() -> Self {
		Self {
			iframes_configured: true,
		}
	}
}

/// Rejection record for a config handshake: `{type, failReason}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFailure {
	#[serde(rename = "type")]
	pub field_type: FieldType,
	pub fail_reason: String,
}

impl ConfigFailure {
	/// The failure reported when a frame never sends its config.
	pub fn timed_out(field_type: FieldType) -> Self {
		Self {
			field_type,
			fail_reason: CONFIG_TIMEOUT_REASON.to_string(),
		}
	}
}
