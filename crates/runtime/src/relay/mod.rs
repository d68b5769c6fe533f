//! Message relay: routes inbound frame messages to the owning controller.
//!
//! Routing is by the `fieldType` carried on each message. Messages for fields
//! with no controller, kinds with no handler, and anything that does not parse
//! as a [`FrameMessage`] are logged and dropped. Only handler errors reach the
//! caller.

use std::sync::Arc;

use csf_protocol::{FieldType, FrameMessage, Message};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::registry::FrameRegistry;

/// Routes frame messages through a [`FrameRegistry`].
#[derive(Clone)]
pub struct MessageRelay {
	registry: Arc<FrameRegistry>,
}

impl MessageRelay {
	pub fn new(registry: Arc<FrameRegistry>) -> Self {
		Self { registry }
	}

	pub fn registry(&self) -> &Arc<FrameRegistry> {
		&self.registry
	}

	/// Delivers one parsed message to the handler registered for its field and kind.
	pub fn dispatch(&self, message: Message) -> Result<()> {
		match message {
			Message::Frame(FrameMessage {
				kind,
				field_type,
				payload,
			}) => match self.registry.get(field_type) {
				Some(controller) => {
					tracing::trace!(field = %field_type, %kind, "Dispatching frame message");
					controller.dispatch(kind, payload)
				}
				None => {
					tracing::debug!(field = %field_type, %kind, "Message for unregistered field (ignored)");
					Ok(())
				}
			},
			Message::Unknown(value) => {
				tracing::debug!(
					"Unknown message type (forward-compatible, ignored): {}",
					serde_json::to_string(&value).unwrap_or_else(|_| "<serialization failed>".to_string())
				);
				Ok(())
			}
		}
	}

	/// Parses `value` and dispatches it.
	pub fn dispatch_value(&self, value: Value) -> Result<()> {
		self.dispatch(serde_json::from_value(value)?)
	}

	/// Parses raw JSON text and dispatches it.
	pub fn dispatch_str(&self, raw: &str) -> Result<()> {
		self.dispatch(serde_json::from_str(raw)?)
	}

	/// Posts `message` into every attached frame.
	///
	/// Every frame is attempted even if one fails; the first failure is returned.
	/// On success, returns how many frames received the message.
	pub fn broadcast<P: Serialize>(&self, message: &P) -> Result<usize> {
		let value = serde_json::to_value(message)?;
		let mut delivered = 0;
		let mut first_error = None;

		for controller in self.registry.controllers() {
			if controller.is_detached() {
				continue;
			}
			match controller.post_message(&value) {
				Ok(()) => delivered += 1,
				Err(e) => {
					tracing::warn!(field = %controller.field_type(), "Broadcast failed: {}", e);
					first_error.get_or_insert(e);
				}
			}
		}

		match first_error {
			Some(e) => Err(e),
			None => Ok(delivered),
		}
	}

	/// Posts `message` into the frame for `field_type` only.
	pub fn post_to<P: Serialize>(&self, field_type: FieldType, message: &P) -> Result<()> {
		let controller = self.registry.get(field_type).ok_or(Error::FrameNotFound(field_type))?;
		controller.post_message(message)
	}

	/// Dispatches every message received on `rx` until the channel closes.
	///
	/// Non-fatal handler errors are logged and the loop continues. A fatal error
	/// stops the loop and is returned.
	pub async fn run(&self, mut rx: mpsc::UnboundedReceiver<Value>) -> Result<()> {
		while let Some(value) = rx.recv().await {
			match self.dispatch_value(value) {
				Ok(()) => {}
				Err(e) if e.is_fatal() => {
					tracing::error!("Fatal error dispatching message: {}", e);
					return Err(e);
				}
				Err(e) => tracing::error!("Error dispatching message: {}", e),
			}
		}
		tracing::debug!("Message channel closed");
		Ok(())
	}
}
