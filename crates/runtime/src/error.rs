//! Error types for the secured-field runtime.

use csf_protocol::{ConfigFailure, FieldType};
use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while orchestrating secured-field frames.
#[derive(Debug, Error)]
pub enum Error {
	/// More frames reported `load` than the field set expects.
	///
	/// Fatal: the field set is torn down before this error is returned.
	#[error(
		"One or more securedFields has just loaded new content. This should never happen. \
		 securedFields have been removed. iframe load count={observed}. Expected count:{expected}"
	)]
	ProtocolViolation { observed: usize, expected: usize },

	/// Frame did not report its config before the handshake timer elapsed.
	#[error("Config handshake failed for {}: {}", .0.field_type, .0.fail_reason)]
	ConfigTimeout(ConfigFailure),

	/// Field set was torn down before the frame reported its config.
	#[error("Secured field {0} was destroyed before it reported its config")]
	Destroyed(FieldType),

	/// Field set was already torn down.
	#[error("Secured fields have been destroyed")]
	FieldSetDestroyed,

	/// Anchor node does not carry the routing attribute.
	#[error("Anchor is missing the '{0}' attribute")]
	MissingFieldAttribute(&'static str),

	/// Anchor names a field type this layer does not know.
	#[error("Unknown secured field type: {0}")]
	UnknownFieldType(String),

	/// Frame factory could not create the sandboxed frame.
	#[error("Failed to create frame for {field_type}: {reason}")]
	FrameCreation { field_type: FieldType, reason: String },

	/// Frame was detached and can no longer receive messages.
	#[error("Frame for {0} is detached")]
	FrameDetached(FieldType),

	/// No frame is registered for the field.
	#[error("No frame registered for {0}")]
	FrameNotFound(FieldType),

	/// Config handshake timers need a tokio runtime and none is running.
	#[error("Secured fields must be set up from within a tokio runtime")]
	NoRuntime,

	/// JSON serialization/deserialization error.
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

impl Error {
	/// Returns true if the field set cannot continue after this error.
	pub fn is_fatal(&self) -> bool {
		matches!(self, Error::ProtocolViolation { .. } | Error::FieldSetDestroyed)
	}

	/// Returns true if this is a config handshake timeout.
	pub fn is_timeout(&self) -> bool {
		matches!(self, Error::ConfigTimeout(_))
	}

	/// Returns the `{type, failReason}` record if this is a config handshake timeout.
	pub fn config_failure(&self) -> Option<&ConfigFailure> {
		match self {
			Error::ConfigTimeout(failure) => Some(failure),
			_ => None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn protocol_violation_message_embeds_counts() {
		let err = Error::ProtocolViolation {
			observed: 3,
			expected: 2,
		};
		let msg = err.to_string();
		assert!(msg.contains("iframe load count=3"));
		assert!(msg.contains("Expected count:2"));
		assert!(err.is_fatal());
		assert!(msg.contains("This should never happen. securedFields have been removed."));
	}

	#[test]
	fn config_timeout_exposes_failure() {
		let err = Error::ConfigTimeout(ConfigFailure::timed_out(FieldType::EncryptedSecurityCode));
		assert!(err.is_timeout());
		assert!(!err.is_fatal());
		assert_eq!(
			err.config_failure().map(|f| f.fail_reason.as_str()),
			Some("sf took too long to config")
		);
		assert_eq!(
			err.to_string(),
			"Config handshake failed for encryptedSecurityCode: sf took too long to config"
		);
	}
}
