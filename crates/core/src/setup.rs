//! Field setup: wiring a frame's events into the field set.

use std::sync::{Arc, Weak};
use std::sync::atomic::Ordering;

use csf_protocol::{ConfiguredSignal, FieldType, GENUINE_TOUCH_OVERRIDE_KEY, HostMessage, LoadedSignal};
use csf_runtime::{
	ConfigHandshake, Error, FieldState, FrameController, HandshakeSettler, LoadProgress, Result, config_handshake,
};
use serde_json::Value;

use crate::anchor::{FieldAnchor, resolve_field_type};
use crate::field_set::{FieldSet, FieldSetInner};
use crate::owner::FieldSetOwner;
use crate::teardown::TeardownGuard;

impl FieldSet {
	/// Sets up the secured field mounted on `anchor`.
	///
	/// Creates the field's frame on first encounter, registers a handler for every
	/// event kind and starts the config handshake timer. The returned future
	/// resolves with the frame's config payload, or rejects with
	/// [`Error::ConfigTimeout`] if none arrives in time.
	///
	/// Setting up a field that already has a controller reuses it: every handler
	/// slot is overwritten and a fresh handshake starts. An earlier handshake for
	/// the same field keeps running and will time out unless the set is destroyed.
	///
	/// # Errors
	///
	/// - [`Error::FieldSetDestroyed`] if the set was torn down
	/// - [`Error::MissingFieldAttribute`] / [`Error::UnknownFieldType`] for a bad anchor
	/// - [`Error::FrameCreation`] if the frame factory fails
	/// - [`Error::NoRuntime`] outside a tokio runtime; the set is left untouched
	pub fn setup_secured_field<A: FieldAnchor + ?Sized>(&self, anchor: &A) -> Result<ConfigHandshake> {
		let inner = &self.inner;
		if inner.is_destroyed() {
			return Err(Error::FieldSetDestroyed);
		}

		let field_type = resolve_field_type(anchor)?;

		let timed_out = Arc::downgrade(inner);
		let (settler, handshake) = config_handshake(field_type, inner.config.config_timeout(), move || {
			if let Some(controller) = timed_out.upgrade().and_then(|inner| inner.registry.get(field_type)) {
				controller.transition(FieldState::TimedOut);
			}
		})?;

		let factory = Arc::clone(&inner.factory);
		let controller = inner
			.registry
			.get_or_create(field_type, || factory.create_frame(field_type))
			.inspect_err(|_| {
				settler.reject(Error::Destroyed(field_type));
			})?;

		if field_type.is_separate_date_field() && inner.registry.register_separate_date_field() {
			tracing::debug!(
				field = %field_type,
				expected = inner.registry.load_state().num_iframes,
				"Separate expiry date fields; expecting one extra frame"
			);
		}

		{
			let mut handshakes = inner.handshakes.lock();
			handshakes.retain(|pending| !pending.is_settled());
			handshakes.push(settler.clone());
		}

		wire_handlers(&controller, Arc::downgrade(inner), settler);

		tracing::debug!(field = %field_type, "Secured field set up");
		Ok(handshake)
	}
}

fn wire_handlers(controller: &FrameController, weak: Weak<FieldSetInner>, settler: HandshakeSettler) {
	let field_type = controller.field_type();

	let on_load = Weak::clone(&weak);
	let on_config = Weak::clone(&weak);
	let on_touchstart = Weak::clone(&weak);

	controller
		.on_load(move |_| match on_load.upgrade() {
			Some(inner) => inner.handle_load(field_type),
			None => Ok(()),
		})
		.on_config(move |payload| {
			if let Some(inner) = on_config.upgrade() {
				inner.handle_config(field_type, &settler, payload);
			}
			Ok(())
		})
		.on_focus(forward(&weak, |owner, payload| owner.on_focus(payload)))
		.on_value_detected(forward(&weak, |owner, payload| owner.on_value_detected(payload)))
		.on_shift_tab(forward(&weak, move |owner, _| owner.on_shift_tab(field_type)))
		.on_encryption_result(forward(&weak, |owner, payload| owner.on_encryption_result(payload)))
		.on_validation_result(forward(&weak, |owner, payload| owner.on_validation_result(payload)))
		.on_autofill_detected(forward(&weak, |owner, payload| owner.on_autofill_detected(payload)))
		.on_touchstart(move |payload| match on_touchstart.upgrade() {
			Some(inner) => inner.handle_touchstart(field_type, payload),
			None => Ok(()),
		});
}

/// Handler that hands the payload straight to the owner.
fn forward<F>(weak: &Weak<FieldSetInner>, deliver: F) -> impl Fn(Value) -> Result<()> + Send + Sync + 'static
where
	F: Fn(&dyn FieldSetOwner, Value) + Send + Sync + 'static,
{
	let weak = Weak::clone(weak);
	move |payload| {
		if let Some(inner) = weak.upgrade() {
			deliver(inner.owner.as_ref(), payload);
		}
		Ok(())
	}
}

impl FieldSetInner {
	fn handle_load(&self, field_type: FieldType) -> Result<()> {
		let controller = self.registry.get(field_type);
		if let Some(controller) = &controller {
			if controller.state() == FieldState::Unloaded {
				controller.transition(FieldState::Loaded);
			}
		}

		let guard = TeardownGuard::arm(self);
		match self.registry.record_load() {
			LoadProgress::Pending { loaded, expected } => {
				guard.disarm();
				tracing::debug!(field = %field_type, loaded, expected, "Frame loaded");
				Ok(())
			}
			LoadProgress::Ready { expected } => {
				guard.disarm();
				tracing::info!(expected, "All secured field frames loaded");
				self.owner.on_ready(LoadedSignal::loaded());
				Ok(())
			}
			LoadProgress::Exceeded { observed, expected } => {
				if let Some(controller) = &controller {
					controller.transition(FieldState::Error);
				}
				tracing::error!(
					field = %field_type,
					observed,
					expected,
					"Frame loaded new content after the set was ready; destroying secured fields"
				);
				drop(guard);
				Err(Error::ProtocolViolation { observed, expected })
			}
		}
	}

	fn handle_config(&self, field_type: FieldType, settler: &HandshakeSettler, payload: Value) {
		self.owner.on_config_feedback(payload.clone());

		if !settler.resolve(payload) {
			tracing::warn!(field = %field_type, "Config arrived after the handshake settled (ignored)");
			return;
		}
		if let Some(controller) = self.registry.get(field_type) {
			controller.transition(FieldState::Configured);
		}
		self.record_configured(field_type);
	}

	fn record_configured(&self, field_type: FieldType) {
		let expected = self.registry.load_state().num_iframes;
		let all_configured = {
			let mut progress = self.configured.lock();
			progress.fields.insert(field_type);
			if !progress.all_configured && progress.fields.len() >= expected {
				progress.all_configured = true;
				true
			} else {
				false
			}
		};

		tracing::debug!(field = %field_type, "Frame configured");
		if all_configured {
			tracing::info!(expected, "All secured field frames configured");
			self.owner.on_all_configured(ConfiguredSignal::configured());
		}
	}

	fn handle_touchstart(&self, field_type: FieldType, mut payload: Value) -> Result<()> {
		let override_flag = payload
			.as_object_mut()
			.and_then(|fields| fields.remove(GENUINE_TOUCH_OVERRIDE_KEY));
		let genuine = match override_flag {
			Some(Value::Bool(flag)) => flag,
			_ => self.genuine_touch.load(Ordering::SeqCst),
		};

		if !genuine {
			tracing::debug!(field = %field_type, "Touchstart without genuine touch events (ignored)");
			return Ok(());
		}

		self.owner.on_touchstart_platform_quirk(payload);
		let delivered = self.relay.broadcast(&HostMessage::field_click(field_type))?;
		tracing::debug!(field = %field_type, delivered, "Broadcast field click");
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use csf_runtime::QueuedFrameFactory;
	use serde_json::json;

	use super::*;
	use crate::anchor::Anchor;
	use crate::config::FieldSetConfig;
	use crate::owner::NoopOwner;

	fn field_set() -> FieldSet {
		FieldSet::new(
			FieldSetConfig::default(),
			Arc::new(QueuedFrameFactory::new()),
			Arc::new(NoopOwner),
		)
	}

	#[tokio::test(start_paused = true)]
	async fn settled_handshakes_are_not_retained() {
		let set = field_set();
		let anchor = Anchor::for_field(FieldType::EncryptedCardNumber);

		for round in 0..200 {
			let handshake = set.setup_secured_field(&anchor).unwrap();
			set.dispatch_value(json!({
				"kind": "config",
				"fieldType": "encryptedCardNumber",
				"payload": {"round": round}
			}))
			.unwrap();
			assert_eq!(handshake.await.unwrap(), json!({"round": round}));
		}

		assert_eq!(set.inner.handshakes.lock().len(), 1);
		assert_eq!(set.field_types(), vec![FieldType::EncryptedCardNumber]);
	}

	#[tokio::test(start_paused = true)]
	async fn pending_handshakes_are_kept_for_teardown() {
		let set = field_set();
		let first = set
			.setup_secured_field(&Anchor::for_field(FieldType::EncryptedCardNumber))
			.unwrap();
		let second = set
			.setup_secured_field(&Anchor::for_field(FieldType::EncryptedSecurityCode))
			.unwrap();
		assert_eq!(set.inner.handshakes.lock().len(), 2);

		set.destroy_secured_fields();

		assert!(matches!(first.await, Err(Error::Destroyed(FieldType::EncryptedCardNumber))));
		assert!(matches!(second.await, Err(Error::Destroyed(FieldType::EncryptedSecurityCode))));
	}

	#[test]
	fn setup_outside_a_runtime_fails_without_touching_the_set() {
		let set = field_set();

		let err = set
			.setup_secured_field(&Anchor::for_field(FieldType::EncryptedExpiryMonth))
			.unwrap_err();

		assert!(matches!(err, Error::NoRuntime));
		assert!(set.field_types().is_empty());
		assert_eq!(set.state().load.num_iframes, 3);
		assert!(!set.is_destroyed());
	}
}
