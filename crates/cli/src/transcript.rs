//! Replay transcripts: a field set config, the fields to mount, and timed frame messages.
//!
//! ```json
//! {
//!   "config": { "expectedFrames": 2, "configTimeoutMs": 500 },
//!   "fields": ["encryptedCardNumber", "encryptedSecurityCode"],
//!   "steps": [
//!     { "message": { "kind": "load", "fieldType": "encryptedCardNumber" } },
//!     { "afterMs": 20, "message": { "kind": "config", "fieldType": "encryptedCardNumber", "payload": {} } },
//!     { "afterMs": 1000, "destroy": true }
//!   ]
//! }
//! ```

use std::path::Path;
use std::time::Duration;

use csf::FieldSetConfig;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{CliError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transcript {
	#[serde(default)]
	pub config: FieldSetConfig,
	/// Values of each anchor's `data-cse` attribute, mounted in order.
	pub fields: Vec<String>,
	#[serde(default)]
	pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
	/// Delay before this step, relative to the previous one.
	#[serde(default)]
	pub after_ms: u64,
	/// Inbound frame message to dispatch.
	#[serde(default)]
	pub message: Option<Value>,
	/// Tear the field set down after dispatching.
	#[serde(default)]
	pub destroy: bool,
}

impl Step {
	pub fn delay(&self) -> Duration {
		Duration::from_millis(self.after_ms)
	}
}

impl Transcript {
	pub fn load(path: &Path) -> Result<Self> {
		let raw = std::fs::read_to_string(path).map_err(|source| CliError::ReadTranscript {
			path: path.to_path_buf(),
			source,
		})?;
		let transcript: Transcript = serde_json::from_str(&raw).map_err(|source| CliError::ParseTranscript {
			path: path.to_path_buf(),
			source,
		})?;
		transcript.validate()?;
		Ok(transcript)
	}

	fn validate(&self) -> Result<()> {
		match self.steps.iter().position(|step| step.message.is_none() && !step.destroy) {
			Some(step) => Err(CliError::EmptyStep { step }),
			None => Ok(()),
		}
	}
}
