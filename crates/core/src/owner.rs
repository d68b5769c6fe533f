//! Callback contract between a field set and the form that owns it.

use csf_protocol::{ConfiguredSignal, FieldType, LoadedSignal};
use serde_json::Value;

/// Receives everything the secured-field frames report.
///
/// Every method defaults to a no-op, so an owner implements only what it needs.
/// Payloads arrive exactly as the frame sent them. Methods are called from
/// inside message dispatch with no field-set lock held.
pub trait FieldSetOwner: Send + Sync {
	/// Every expected frame has loaded. Called once per field set.
	fn on_ready(&self, _signal: LoadedSignal) {}

	/// Every expected frame has reported its config. Called once per field set.
	fn on_all_configured(&self, _signal: ConfiguredSignal) {}

	fn on_config_feedback(&self, _payload: Value) {}

	fn on_focus(&self, _payload: Value) {}

	/// Enough input was typed to detect a value, e.g. a card BIN.
	fn on_value_detected(&self, _payload: Value) {}

	/// Shift+Tab pressed inside the frame for `field_type`.
	fn on_shift_tab(&self, _field_type: FieldType) {}

	fn on_encryption_result(&self, _payload: Value) {}

	fn on_validation_result(&self, _payload: Value) {}

	fn on_autofill_detected(&self, _payload: Value) {}

	/// A genuine touch started inside a frame.
	///
	/// Lets the owner work around platforms that swallow focus moves between frames.
	fn on_touchstart_platform_quirk(&self, _payload: Value) {}
}

/// Owner that ignores every callback.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopOwner;

impl FieldSetOwner for NoopOwner {}
