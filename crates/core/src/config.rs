//! Field set configuration.

use std::time::Duration;

use csf_runtime::Result;
use serde::{Deserialize, Serialize};

/// How long a frame has to report its config before the handshake fails.
pub const SF_CONFIG_TIMEOUT: Duration = Duration::from_millis(15_000);

/// Frames a card form mounts by default: number, expiry date, security code.
pub const DEFAULT_EXPECTED_FRAMES: usize = 3;

/// Settings for one field set.
///
/// Deserializes from camelCase JSON; missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldSetConfig {
	/// Config handshake timeout in milliseconds.
	pub config_timeout_ms: u64,
	/// Frames expected to report `load` before the set is ready.
	pub expected_frames: usize,
	/// Whether the host platform delivers genuine touch events.
	pub has_genuine_touch_events: bool,
}

impl Default for FieldSetConfig {
	fn default() -> Self {
		Self {
			config_timeout_ms: SF_CONFIG_TIMEOUT.as_millis() as u64,
			expected_frames: DEFAULT_EXPECTED_FRAMES,
			has_genuine_touch_events: false,
		}
	}
}

impl FieldSetConfig {
	pub fn new() -> Self {
		Self::default()
	}

	/// Parses a config from JSON text.
	pub fn from_json(raw: &str) -> Result<Self> {
		Ok(serde_json::from_str(raw)?)
	}

	pub fn with_config_timeout(mut self, timeout: Duration) -> Self {
		self.config_timeout_ms = timeout.as_millis() as u64;
		self
	}

	pub fn with_expected_frames(mut self, expected_frames: usize) -> Self {
		self.expected_frames = expected_frames;
		self
	}

	pub fn with_genuine_touch_events(mut self, enabled: bool) -> Self {
		self.has_genuine_touch_events = enabled;
		self
	}

	pub fn config_timeout(&self) -> Duration {
		Duration::from_millis(self.config_timeout_ms)
	}
}
