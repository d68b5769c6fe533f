//! Field set owner that reports every callback as a replay event.

use csf::{ConfiguredSignal, FieldSetOwner, FieldType, LoadedSignal};
use serde_json::Value;

use crate::output::{ReplayEvent, Reporter};

pub struct ReportingOwner {
	reporter: Reporter,
}

impl ReportingOwner {
	pub fn new(reporter: Reporter) -> Self {
		Self { reporter }
	}
}

impl FieldSetOwner for ReportingOwner {
	fn on_ready(&self, signal: LoadedSignal) {
		self.reporter.emit(&ReplayEvent::Ready {
			iframes_loaded: signal.iframes_loaded,
		});
	}

	fn on_all_configured(&self, signal: ConfiguredSignal) {
		self.reporter.emit(&ReplayEvent::AllConfigured {
			iframes_configured: signal.iframes_configured,
		});
	}

	fn on_config_feedback(&self, payload: Value) {
		self.reporter.emit(&ReplayEvent::ConfigFeedback { payload });
	}

	fn on_focus(&self, payload: Value) {
		self.reporter.emit(&ReplayEvent::Focus { payload });
	}

	fn on_value_detected(&self, payload: Value) {
		self.reporter.emit(&ReplayEvent::ValueDetected { payload });
	}

	fn on_shift_tab(&self, field_type: FieldType) {
		self.reporter.emit(&ReplayEvent::ShiftTab { field_type });
	}

	fn on_encryption_result(&self, payload: Value) {
		self.reporter.emit(&ReplayEvent::EncryptionResult { payload });
	}

	fn on_validation_result(&self, payload: Value) {
		self.reporter.emit(&ReplayEvent::ValidationResult { payload });
	}

	fn on_autofill_detected(&self, payload: Value) {
		self.reporter.emit(&ReplayEvent::AutofillDetected { payload });
	}

	fn on_touchstart_platform_quirk(&self, payload: Value) {
		self.reporter.emit(&ReplayEvent::TouchstartQuirk { payload });
	}
}
