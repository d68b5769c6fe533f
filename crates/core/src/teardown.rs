//! Field set teardown.

use std::sync::atomic::Ordering;

use csf_runtime::Error;

use crate::field_set::{ConfigProgress, FieldSet, FieldSetInner};

impl FieldSet {
	/// Tears the field set down.
	///
	/// Rejects every unsettled config handshake with [`Error::Destroyed`] (which
	/// cancels its timer), detaches every frame and resets the load counters. Later
	/// messages are ignored and later setups fail with [`Error::FieldSetDestroyed`].
	/// Calling it again has no effect.
	pub fn destroy_secured_fields(&self) {
		self.inner.destroy();
	}
}

impl FieldSetInner {
	pub(crate) fn destroy(&self) {
		if self.destroyed.swap(true, Ordering::SeqCst) {
			tracing::debug!("Secured fields already destroyed");
			return;
		}

		let pending = std::mem::take(&mut *self.handshakes.lock());
		let mut rejected = 0;
		for settler in &pending {
			if settler.reject(Error::Destroyed(settler.field_type())) {
				rejected += 1;
			}
		}

		let controllers = self.registry.drain();
		for controller in &controllers {
			controller.detach();
		}
		*self.configured.lock() = ConfigProgress::default();

		tracing::info!(frames = controllers.len(), rejected, "Secured fields destroyed");
	}
}

/// Tears the set down when dropped, unless disarmed first.
///
/// Armed around a fallible check so teardown has run by the time its error
/// reaches the caller.
pub(crate) struct TeardownGuard<'a> {
	inner: &'a FieldSetInner,
	completed: bool,
}

impl<'a> TeardownGuard<'a> {
	pub(crate) fn arm(inner: &'a FieldSetInner) -> Self {
		Self {
			inner,
			completed: false,
		}
	}

	pub(crate) fn disarm(mut self) {
		self.completed = true;
	}
}

impl Drop for TeardownGuard<'_> {
	fn drop(&mut self) {
		if self.completed {
			return;
		}
		self.inner.destroy();
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use csf_protocol::FieldType;
	use csf_runtime::QueuedFrameFactory;

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
	async fn dropped_guard_tears_down() {
		let set = field_set();
		let _handshake = set
			.setup_secured_field(&Anchor::for_field(FieldType::EncryptedCardNumber))
			.unwrap();

		drop(TeardownGuard::arm(&set.inner));

		assert!(set.is_destroyed());
		assert!(set.field_types().is_empty());
	}

	#[tokio::test(start_paused = true)]
	async fn disarmed_guard_leaves_set_alone() {
		let set = field_set();
		let _handshake = set
			.setup_secured_field(&Anchor::for_field(FieldType::EncryptedCardNumber))
			.unwrap();

		TeardownGuard::arm(&set.inner).disarm();

		assert!(!set.is_destroyed());
		assert_eq!(set.field_types(), vec![FieldType::EncryptedCardNumber]);
	}

	#[tokio::test(start_paused = true)]
	async fn destroy_rejects_pending_handshakes() {
		let set = field_set();
		let handshake = set
			.setup_secured_field(&Anchor::for_field(FieldType::EncryptedSecurityCode))
			.unwrap();

		set.destroy_secured_fields();

		assert!(matches!(handshake.await, Err(Error::Destroyed(FieldType::EncryptedSecurityCode))));
	}
}
