//! FrameController - host-side handle for one secured-field frame.
//!
//! A controller owns the [`Channel`] to its frame and one handler slot per
//! [`EventKind`]. Registering a handler replaces whatever the slot held; there
//! is never more than one subscriber per kind.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use csf_protocol::{EventKind, FieldType};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;

use crate::channel::Channel;
use crate::error::Result;
use crate::transport::FrameChannel;

/// Handler invoked with the payload of a dispatched event.
pub type HandlerFn = Arc<dyn Fn(Value) -> Result<()> + Send + Sync>;

/// One optional handler per event kind.
#[derive(Clone, Default)]
pub struct EventHandlers {
	load: Option<HandlerFn>,
	config: Option<HandlerFn>,
	focus: Option<HandlerFn>,
	value_detected: Option<HandlerFn>,
	shift_tab: Option<HandlerFn>,
	encryption_result: Option<HandlerFn>,
	validation_result: Option<HandlerFn>,
	autofill_detected: Option<HandlerFn>,
	touchstart: Option<HandlerFn>,
}

impl EventHandlers {
	/// Returns the handler registered for `kind`, if any.
	pub fn get(&self, kind: EventKind) -> Option<&HandlerFn> {
		match kind {
			EventKind::Load => self.load.as_ref(),
			EventKind::Config => self.config.as_ref(),
			EventKind::Focus => self.focus.as_ref(),
			EventKind::ValueDetected => self.value_detected.as_ref(),
			EventKind::ShiftTab => self.shift_tab.as_ref(),
			EventKind::EncryptionResult => self.encryption_result.as_ref(),
			EventKind::ValidationResult => self.validation_result.as_ref(),
			EventKind::AutofillDetected => self.autofill_detected.as_ref(),
			EventKind::Touchstart => self.touchstart.as_ref(),
		}
	}

	fn slot_mut(&mut self, kind: EventKind) -> &mut Option<HandlerFn> {
		match kind {
			EventKind::Load => &mut self.load,
			EventKind::Config => &mut self.config,
			EventKind::Focus => &mut self.focus,
			EventKind::ValueDetected => &mut self.value_detected,
			EventKind::ShiftTab => &mut self.shift_tab,
			EventKind::EncryptionResult => &mut self.encryption_result,
			EventKind::ValidationResult => &mut self.validation_result,
			EventKind::AutofillDetected => &mut self.autofill_detected,
			EventKind::Touchstart => &mut self.touchstart,
		}
	}

	/// Stores `handler` for `kind`, returning the handler it replaced.
	pub fn set(&mut self, kind: EventKind, handler: HandlerFn) -> Option<HandlerFn> {
		self.slot_mut(kind).replace(handler)
	}

	/// Empties every slot.
	pub fn clear(&mut self) {
		*self = Self::default();
	}

	/// Number of occupied slots.
	pub fn registered(&self) -> usize {
		EventKind::ALL.iter().filter(|kind| self.get(**kind).is_some()).count()
	}
}

impl fmt::Debug for EventHandlers {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let registered: Vec<_> = EventKind::ALL
			.iter()
			.filter(|kind| self.get(**kind).is_some())
			.map(EventKind::as_str)
			.collect();
		f.debug_struct("EventHandlers").field("registered", &registered).finish()
	}
}

/// Lifecycle of a single secured field.
///
/// ```text
/// Unloaded -> Loaded -> Configured
///     |          \---> TimedOut
///     \--------------> Configured | TimedOut
/// any --------------> Error
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldState {
	/// Frame created, nothing heard yet.
	Unloaded,
	/// Frame reported `load`.
	Loaded,
	/// Frame reported its config (terminal success).
	Configured,
	/// Config handshake timer fired first (terminal failure).
	TimedOut,
	/// Frame broke the load protocol (terminal).
	Error,
}

impl FieldState {
	fn can_transition_to(self, next: FieldState) -> bool {
		use FieldState::*;
		matches!(
			(self, next),
			(Unloaded, Loaded) | (Unloaded | Loaded, Configured) | (Unloaded | Loaded, TimedOut) | (_, Error)
		)
	}
}

/// Host-side controller for one sandboxed frame.
pub struct FrameController {
	field_type: FieldType,
	channel: Channel,
	handlers: Mutex<EventHandlers>,
	state: Mutex<FieldState>,
	detached: AtomicBool,
}

impl FrameController {
	/// Creates a controller for `field_type` wrapping its frame.
	pub fn new(field_type: FieldType, frame: Arc<dyn FrameChannel>) -> Self {
		Self {
			field_type,
			channel: Channel::new(field_type, frame),
			handlers: Mutex::new(EventHandlers::default()),
			state: Mutex::new(FieldState::Unloaded),
			detached: AtomicBool::new(false),
		}
	}

	pub fn field_type(&self) -> FieldType {
		self.field_type
	}

	/// Returns the channel to this controller's frame.
	pub fn channel(&self) -> &Channel {
		&self.channel
	}

	/// Registers `handler` for `kind`, replacing any previous handler.
	pub fn on<F>(&self, kind: EventKind, handler: F) -> &Self
	where
		F: Fn(Value) -> Result<()> + Send + Sync + 'static,
	{
		if self.handlers.lock().set(kind, Arc::new(handler)).is_some() {
			tracing::debug!(field = %self.field_type, %kind, "Replaced existing handler");
		}
		self
	}

	pub fn on_load<F>(&self, handler: F) -> &Self
	where
		F: Fn(Value) -> Result<()> + Send + Sync + 'static,
	{
		self.on(EventKind::Load, handler)
	}

	pub fn on_config<F>(&self, handler: F) -> &Self
	where
		F: Fn(Value) -> Result<()> + Send + Sync + 'static,
	{
		self.on(EventKind::Config, handler)
	}

	pub fn on_focus<F>(&self, handler: F) -> &Self
	where
		F: Fn(Value) -> Result<()> + Send + Sync + 'static,
	{
		self.on(EventKind::Focus, handler)
	}

	pub fn on_value_detected<F>(&self, handler: F) -> &Self
	where
		F: Fn(Value) -> Result<()> + Send + Sync + 'static,
	{
		self.on(EventKind::ValueDetected, handler)
	}

	pub fn on_shift_tab<F>(&self, handler: F) -> &Self
	where
		F: Fn(Value) -> Result<()> + Send + Sync + 'static,
	{
		self.on(EventKind::ShiftTab, handler)
	}

	pub fn on_encryption_result<F>(&self, handler: F) -> &Self
	where
		F: Fn(Value) -> Result<()> + Send + Sync + 'static,
	{
		self.on(EventKind::EncryptionResult, handler)
	}

	pub fn on_validation_result<F>(&self, handler: F) -> &Self
	where
		F: Fn(Value) -> Result<()> + Send + Sync + 'static,
	{
		self.on(EventKind::ValidationResult, handler)
	}

	pub fn on_autofill_detected<F>(&self, handler: F) -> &Self
	where
		F: Fn(Value) -> Result<()> + Send + Sync + 'static,
	{
		self.on(EventKind::AutofillDetected, handler)
	}

	pub fn on_touchstart<F>(&self, handler: F) -> &Self
	where
		F: Fn(Value) -> Result<()> + Send + Sync + 'static,
	{
		self.on(EventKind::Touchstart, handler)
	}

	/// Returns true if a handler is registered for `kind`.
	pub fn has_handler(&self, kind: EventKind) -> bool {
		self.handlers.lock().get(kind).is_some()
	}

	/// Invokes the handler for `kind` with `payload`.
	///
	/// An empty slot or a detached controller is a no-op. The handler runs with no
	/// lock held, so it may detach this controller (or the whole set) itself.
	pub fn dispatch(&self, kind: EventKind, payload: Value) -> Result<()> {
		if self.is_detached() {
			tracing::debug!(field = %self.field_type, %kind, "Event for detached frame (ignored)");
			return Ok(());
		}

		let handler = self.handlers.lock().get(kind).cloned();
		match handler {
			Some(handler) => handler(payload),
			None => {
				tracing::debug!(field = %self.field_type, %kind, "No handler registered (ignored)");
				Ok(())
			}
		}
	}

	/// Posts a message into this controller's frame.
	pub fn post_message<P: Serialize>(&self, message: &P) -> Result<()> {
		self.channel.send(message)
	}

	/// Returns the current lifecycle state.
	pub fn state(&self) -> FieldState {
		*self.state.lock()
	}

	/// Moves to `next` if the lifecycle allows it; returns whether it did.
	pub fn transition(&self, next: FieldState) -> bool {
		let mut state = self.state.lock();
		if *state == next {
			return true;
		}
		if !state.can_transition_to(next) {
			tracing::warn!(
				field = %self.field_type,
				from = ?*state,
				to = ?next,
				"Ignoring invalid field state transition"
			);
			return false;
		}
		*state = next;
		true
	}

	/// Clears every handler slot and detaches the frame. Idempotent.
	pub fn detach(&self) {
		if self.detached.swap(true, Ordering::SeqCst) {
			return;
		}
		self.handlers.lock().clear();
		self.channel.detach();
	}

	pub fn is_detached(&self) -> bool {
		self.detached.load(Ordering::SeqCst)
	}
}

impl fmt::Debug for FrameController {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FrameController")
			.field("field_type", &self.field_type)
			.field("state", &self.state())
			.field("handlers", &*self.handlers.lock())
			.field("detached", &self.is_detached())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::AtomicUsize;

	use serde_json::json;

	use super::*;
	use crate::transport::QueuedFrame;

	fn controller(field_type: FieldType) -> (FrameController, tokio::sync::mpsc::UnboundedReceiver<Value>) {
		let (frame, rx) = QueuedFrame::new(field_type);
		(FrameController::new(field_type, Arc::new(frame)), rx)
	}

	#[test]
	fn registration_chains_and_fills_slots() {
		let (controller, _rx) = controller(FieldType::EncryptedCardNumber);

		controller
			.on_load(|_| Ok(()))
			.on_config(|_| Ok(()))
			.on_focus(|_| Ok(()))
			.on_touchstart(|_| Ok(()));

		assert!(controller.has_handler(EventKind::Load));
		assert!(controller.has_handler(EventKind::Touchstart));
		assert!(!controller.has_handler(EventKind::ShiftTab));
		assert_eq!(controller.handlers.lock().registered(), 4);
	}

	#[test]
	fn reregistration_overwrites_instead_of_fanning_out() {
		let (controller, _rx) = controller(FieldType::EncryptedCardNumber);
		let first = Arc::new(AtomicUsize::new(0));
		let second = Arc::new(AtomicUsize::new(0));

		let f = Arc::clone(&first);
		controller.on_focus(move |_| {
			f.fetch_add(1, Ordering::SeqCst);
			Ok(())
		});
		let s = Arc::clone(&second);
		controller.on_focus(move |_| {
			s.fetch_add(1, Ordering::SeqCst);
			Ok(())
		});

		controller.dispatch(EventKind::Focus, json!({"focus": true})).unwrap();

		assert_eq!(first.load(Ordering::SeqCst), 0);
		assert_eq!(second.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn dispatch_passes_payload_untouched() {
		let (controller, _rx) = controller(FieldType::EncryptedExpiryDate);
		let seen = Arc::new(Mutex::new(None));

		let s = Arc::clone(&seen);
		controller.on_encryption_result(move |payload| {
			*s.lock() = Some(payload);
			Ok(())
		});

		let payload = json!({"encryptedFieldName": "encryptedExpiryDate", "blob": "adyenjs_0_1_25$abc"});
		controller.dispatch(EventKind::EncryptionResult, payload.clone()).unwrap();

		assert_eq!(seen.lock().clone(), Some(payload));
	}

	#[test]
	fn empty_slot_is_noop() {
		let (controller, _rx) = controller(FieldType::EncryptedPin);
		assert!(controller.dispatch(EventKind::AutofillDetected, json!({})).is_ok());
	}

	#[tokio::test]
	async fn detach_clears_slots_and_frame() {
		let (controller, mut rx) = controller(FieldType::EncryptedSecurityCode);
		let calls = Arc::new(AtomicUsize::new(0));
		let c = Arc::clone(&calls);
		controller.on_focus(move |_| {
			c.fetch_add(1, Ordering::SeqCst);
			Ok(())
		});

		controller.detach();
		controller.detach();
		controller.dispatch(EventKind::Focus, json!({})).unwrap();

		assert!(controller.is_detached());
		assert!(!controller.has_handler(EventKind::Focus));
		assert_eq!(calls.load(Ordering::SeqCst), 0);
		assert!(controller.post_message(&json!({"ping": true})).is_err());
		assert!(rx.recv().await.is_none());
	}

	#[test]
	fn lifecycle_transitions() {
		let (controller, _rx) = controller(FieldType::EncryptedCardNumber);
		assert_eq!(controller.state(), FieldState::Unloaded);

		assert!(controller.transition(FieldState::Loaded));
		assert!(controller.transition(FieldState::Configured));
		assert!(!controller.transition(FieldState::TimedOut));
		assert!(!controller.transition(FieldState::Loaded));
		assert_eq!(controller.state(), FieldState::Configured);

		assert!(controller.transition(FieldState::Error));
		assert_eq!(controller.state(), FieldState::Error);
	}

	#[test]
	fn timed_out_is_terminal() {
		let (controller, _rx) = controller(FieldType::EncryptedExpiryMonth);
		assert!(controller.transition(FieldState::TimedOut));
		assert!(!controller.transition(FieldState::Configured));
		assert_eq!(controller.state(), FieldState::TimedOut);
	}
}
