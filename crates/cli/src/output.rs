//! Replay output: one event per line, as colored text or JSON.
//!
//! JSON events are tagged by `event`:
//!
//! ```json
//! {"event":"ready","iframesLoaded":true}
//! {"event":"framePost","fieldType":"encryptedPin","message":{"fieldType":"encryptedPin","fieldClick":true}}
//! {"event":"handshakeRejected","fieldType":"encryptedPin","reason":"...","failure":{...}}
//! ```

use std::io::{self, Write};

use colored::Colorize;
use csf::{ConfigFailure, FieldType};
use serde::Serialize;
use serde_json::Value;

use crate::error::CliError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text
	#[default]
	Text,
	/// Newline-delimited JSON
	Json,
}

/// Everything a replay reports, in the order it happened.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ReplayEvent {
	FieldSetUp {
		field_type: FieldType,
	},
	SetupFailed {
		field: String,
		error: String,
	},
	Ready {
		iframes_loaded: bool,
	},
	AllConfigured {
		iframes_configured: bool,
	},
	ConfigFeedback {
		payload: Value,
	},
	Focus {
		payload: Value,
	},
	ValueDetected {
		payload: Value,
	},
	ShiftTab {
		field_type: FieldType,
	},
	EncryptionResult {
		payload: Value,
	},
	ValidationResult {
		payload: Value,
	},
	AutofillDetected {
		payload: Value,
	},
	TouchstartQuirk {
		payload: Value,
	},
	FramePost {
		field_type: FieldType,
		message: Value,
	},
	HandshakeResolved {
		field_type: FieldType,
		payload: Value,
	},
	HandshakeRejected {
		field_type: FieldType,
		reason: String,
		#[serde(skip_serializing_if = "Option::is_none")]
		failure: Option<ConfigFailure>,
	},
	DispatchError {
		step: usize,
		error: String,
	},
	Destroyed,
	Summary {
		loaded: usize,
		expected: usize,
		configured: Vec<FieldType>,
		destroyed: bool,
	},
}

impl ReplayEvent {
	fn render_text(&self) -> String {
		match self {
			Self::FieldSetUp { field_type } => format!("{} {field_type}", "setup".cyan()),
			Self::SetupFailed { field, error } => format!("{} {field}: {error}", "setup failed".red().bold()),
			Self::Ready { .. } => format!("{} all frames loaded", "ready".green().bold()),
			Self::AllConfigured { .. } => format!("{} all frames configured", "configured".green().bold()),
			Self::ConfigFeedback { payload } => format!("{} {payload}", "config".blue()),
			Self::Focus { payload } => format!("{} {payload}", "focus".blue()),
			Self::ValueDetected { payload } => format!("{} {payload}", "value detected".blue()),
			Self::ShiftTab { field_type } => format!("{} {field_type}", "shift-tab".blue()),
			Self::EncryptionResult { payload } => format!("{} {payload}", "encryption".blue()),
			Self::ValidationResult { payload } => format!("{} {payload}", "validation".blue()),
			Self::AutofillDetected { payload } => format!("{} {payload}", "autofill".blue()),
			Self::TouchstartQuirk { payload } => format!("{} {payload}", "touchstart".blue()),
			Self::FramePost { field_type, message } => format!("{} {field_type} <- {message}", "post".dimmed()),
			Self::HandshakeResolved { field_type, payload } => {
				format!("{} {field_type} {payload}", "handshake resolved".green())
			}
			Self::HandshakeRejected { field_type, reason, .. } => {
				format!("{} {field_type}: {reason}", "handshake rejected".yellow())
			}
			Self::DispatchError { step, error } => format!("{} step {step}: {error}", "dispatch error".red()),
			Self::Destroyed => format!("{} secured fields removed", "destroyed".yellow().bold()),
			Self::Summary {
				loaded,
				expected,
				configured,
				destroyed,
			} => {
				let configured: Vec<_> = configured.iter().map(FieldType::as_str).collect();
				format!(
					"{} loaded {loaded}/{expected}, configured [{}], destroyed {destroyed}",
					"summary".bold(),
					configured.join(", ")
				)
			}
		}
	}
}

/// Prints replay events in the selected format.
#[derive(Debug, Clone, Copy)]
pub struct Reporter {
	format: OutputFormat,
}

impl Reporter {
	pub fn new(format: OutputFormat) -> Self {
		Self { format }
	}

	/// Writes `event` to stdout. Write failures (a closed pipe, say) are logged
	/// and the event is dropped.
	pub fn emit(&self, event: &ReplayEvent) {
		if let Err(e) = self.write_event(&mut io::stdout().lock(), event) {
			tracing::debug!("Failed to write replay event: {}", e);
		}
	}

	fn write_event<W: Write>(&self, out: &mut W, event: &ReplayEvent) -> io::Result<()> {
		match self.format {
			OutputFormat::Text => writeln!(out, "{}", event.render_text()),
			OutputFormat::Json => {
				let json = serde_json::to_string(event).map_err(io::Error::other)?;
				writeln!(out, "{json}")
			}
		}
	}
}

/// Prints an error to stderr for humans.
pub fn print_error_stderr(error: &CliError) {
	eprintln!("Error [{}]: {}", error.code(), error);
}
