//! Frame transport: how the host reaches a sandboxed frame.
//!
//! A real embedding posts to a cross-origin frame; this layer only needs the two
//! traits below. [`QueuedFrame`] is an in-process implementation backed by a tokio
//! unbounded channel, used by the replay driver and by tests.

use std::sync::Arc;

use csf_protocol::FieldType;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::{Error, Result};

/// Outbound half of a sandboxed frame.
pub trait FrameChannel: Send + Sync {
	/// Posts a structured message into the frame.
	fn post_message(&self, message: Value) -> Result<()>;

	/// Detaches the frame. Further posts fail with [`Error::FrameDetached`].
	///
	/// Must be idempotent.
	fn detach(&self);

	/// Returns true once [`detach`](Self::detach) has run.
	fn is_detached(&self) -> bool;
}

/// Creates the sandboxed frame for a field on first encounter.
///
/// Decouples the field set from whatever actually builds frames, the same way
/// the registry never knows how a frame is hosted.
pub trait FrameFactory: Send + Sync {
	fn create_frame(&self, field_type: FieldType) -> Result<Arc<dyn FrameChannel>>;
}

/// In-process frame: posted messages are queued on an unbounded channel.
pub struct QueuedFrame {
	field_type: FieldType,
	tx: Mutex<Option<mpsc::UnboundedSender<Value>>>,
}

impl QueuedFrame {
	/// Creates a frame and the receiver that observes everything posted to it.
	///
	/// The receiver yields `None` once the frame is detached and drained.
	pub fn new(field_type: FieldType) -> (Self, mpsc::UnboundedReceiver<Value>) {
		let (tx, rx) = mpsc::unbounded_channel();
		(
			Self {
				field_type,
				tx: Mutex::new(Some(tx)),
			},
			rx,
		)
	}

	pub fn field_type(&self) -> FieldType {
		self.field_type
	}
}

impl FrameChannel for QueuedFrame {
	fn post_message(&self, message: Value) -> Result<()> {
		let guard = self.tx.lock();
		let tx = guard.as_ref().ok_or(Error::FrameDetached(self.field_type))?;
		tx.send(message).map_err(|_| Error::FrameDetached(self.field_type))
	}

	fn detach(&self) {
		if self.tx.lock().take().is_some() {
			tracing::debug!(field = %self.field_type, "Frame detached");
		}
	}

	fn is_detached(&self) -> bool {
		self.tx.lock().is_none()
	}
}

/// Factory producing [`QueuedFrame`]s and keeping their receivers for collection.
#[derive(Default)]
pub struct QueuedFrameFactory {
	receivers: DashMap<FieldType, mpsc::UnboundedReceiver<Value>>,
	frames: DashMap<FieldType, Arc<QueuedFrame>>,
}

impl QueuedFrameFactory {
	pub fn new() -> Self {
		Self::default()
	}

	/// Takes the receiver for a created frame, leaving nothing behind.
	pub fn take_receiver(&self, field_type: FieldType) -> Option<mpsc::UnboundedReceiver<Value>> {
		self.receivers.remove(&field_type).map(|(_, rx)| rx)
	}

	/// Drains every message currently queued for `field_type` without waiting.
	pub fn drain_posted(&self, field_type: FieldType) -> Vec<Value> {
		let mut posted = Vec::new();
		if let Some(mut rx) = self.receivers.get_mut(&field_type) {
			while let Ok(message) = rx.try_recv() {
				posted.push(message);
			}
		}
		posted
	}

	/// Returns the frame created for `field_type`, if any.
	pub fn frame(&self, field_type: FieldType) -> Option<Arc<QueuedFrame>> {
		self.frames.get(&field_type).map(|f| Arc::clone(f.value()))
	}

	/// Number of frames created so far.
	pub fn created(&self) -> usize {
		self.frames.len()
	}
}

impl FrameFactory for QueuedFrameFactory {
	fn create_frame(&self, field_type: FieldType) -> Result<Arc<dyn FrameChannel>> {
		let (frame, rx) = QueuedFrame::new(field_type);
		let frame = Arc::new(frame);
		self.receivers.insert(field_type, rx);
		self.frames.insert(field_type, Arc::clone(&frame));
		tracing::debug!(field = %field_type, "Created queued frame");
		Ok(frame)
	}
}
