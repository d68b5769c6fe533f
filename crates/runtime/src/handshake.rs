//! Config handshake: a timed, two-outcome wait for a frame's `config` message.
//!
//! [`config_handshake`] returns a [`HandshakeSettler`] (kept by whoever sees the
//! `config` message or tears the set down) and a [`ConfigHandshake`] future (handed
//! to the caller). Both sides share one slot holding the oneshot sender and the
//! abort handle of the timer task. Whoever takes the sender first settles the
//! handshake; the other side finds the slot empty and does nothing.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use csf_protocol::{ConfigFailure, FieldType};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;

use crate::error::{Error, Result};

type Outcome = Result<Value>;

struct Slot {
	tx: Option<oneshot::Sender<Outcome>>,
	timer: Option<AbortHandle>,
}

/// Settling side of a config handshake. Cheap to clone.
#[derive(Clone)]
pub struct HandshakeSettler {
	field_type: FieldType,
	slot: Arc<Mutex<Slot>>,
}

impl HandshakeSettler {
	pub fn field_type(&self) -> FieldType {
		self.field_type
	}

	/// Resolves with the frame's config payload and cancels the timer.
	///
	/// Returns `false` if the handshake was already settled.
	pub fn resolve(&self, payload: Value) -> bool {
		self.settle(Ok(payload))
	}

	/// Rejects with `error` and cancels the timer.
	///
	/// Returns `false` if the handshake was already settled.
	pub fn reject(&self, error: Error) -> bool {
		self.settle(Err(error))
	}

	/// Returns true once either outcome has been delivered.
	pub fn is_settled(&self) -> bool {
		self.slot.lock().tx.is_none()
	}

	fn settle(&self, outcome: Outcome) -> bool {
		let (tx, timer) = {
			let mut slot = self.slot.lock();
			(slot.tx.take(), slot.timer.take())
		};
		let Some(tx) = tx else {
			return false;
		};
		if let Some(timer) = timer {
			timer.abort();
		}
		// Caller may have dropped the future; settling still counts.
		let _ = tx.send(outcome);
		true
	}
}

impl std::fmt::Debug for HandshakeSettler {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("HandshakeSettler")
			.field("field_type", &self.field_type)
			.field("settled", &self.is_settled())
			.finish()
	}
}

/// Future resolving with a frame's config payload.
///
/// Rejects with [`Error::ConfigTimeout`] when the timer wins, or
/// [`Error::Destroyed`] when the field set is torn down first.
#[must_use = "a config handshake does nothing unless awaited"]
#[derive(Debug)]
pub struct ConfigHandshake {
	field_type: FieldType,
	rx: oneshot::Receiver<Outcome>,
}

impl ConfigHandshake {
	pub fn field_type(&self) -> FieldType {
		self.field_type
	}
}

impl Future for ConfigHandshake {
	type Output = Result<Value>;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		let field_type = self.field_type;
		match Pin::new(&mut self.rx).poll(cx) {
			Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
			Poll::Ready(Err(_)) => Poll::Ready(Err(Error::Destroyed(field_type))),
			Poll::Pending => Poll::Pending,
		}
	}
}

/// Starts a config handshake for `field_type` with a `timeout` timer.
///
/// `on_timeout` runs once, only if the timer settles the handshake.
///
/// # Errors
///
/// [`Error::NoRuntime`] when called outside a tokio runtime, since the timer
/// task has nowhere to run.
pub fn config_handshake<F>(
	field_type: FieldType,
	timeout: Duration,
	on_timeout: F,
) -> Result<(HandshakeSettler, ConfigHandshake)>
where
	F: FnOnce() + Send + 'static,
{
	let runtime = Handle::try_current().map_err(|_| Error::NoRuntime)?;
	let (tx, rx) = oneshot::channel();
	let slot = Arc::new(Mutex::new(Slot {
		tx: Some(tx),
		timer: None,
	}));

	let weak = Arc::downgrade(&slot);
	let timer = runtime.spawn(async move {
		tokio::time::sleep(timeout).await;

		let Some(slot) = weak.upgrade() else {
			return;
		};
		let tx = {
			let mut slot = slot.lock();
			slot.timer = None;
			slot.tx.take()
		};
		if let Some(tx) = tx {
			tracing::warn!(
				field = %field_type,
				timeout_ms = timeout.as_millis() as u64,
				"Config handshake timed out"
			);
			on_timeout();
			let _ = tx.send(Err(Error::ConfigTimeout(ConfigFailure::timed_out(field_type))));
		}
	});
	slot.lock().timer = Some(timer.abort_handle());

	Ok((HandshakeSettler { field_type, slot }, ConfigHandshake { field_type, rx }))
}
