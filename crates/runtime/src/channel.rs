//! Channel - typed messaging proxy for a single secured-field frame.

use std::sync::Arc;

use csf_protocol::FieldType;
use serde::Serialize;

use crate::error::Result;
use crate::transport::FrameChannel;

/// Channel sends structured messages into one frame on behalf of its controller.
#[derive(Clone)]
pub struct Channel {
	field_type: FieldType,
	frame: Arc<dyn FrameChannel>,
}

impl Channel {
	/// Creates a new Channel for the given field's frame.
	pub fn new(field_type: FieldType, frame: Arc<dyn FrameChannel>) -> Self {
		Self { field_type, frame }
	}

	/// Serializes `message` and posts it into the frame.
	pub fn send<P: Serialize>(&self, message: &P) -> Result<()> {
		let value = serde_json::to_value(message)?;
		tracing::debug!(field = %self.field_type, "Posting message to frame: {}", value);
		self.frame.post_message(value)
	}

	/// Detaches the underlying frame.
	pub fn detach(&self) {
		self.frame.detach();
	}

	pub fn is_detached(&self) -> bool {
		self.frame.is_detached()
	}

	/// Returns the field this channel represents.
	pub fn field_type(&self) -> FieldType {
		self.field_type
	}
}
