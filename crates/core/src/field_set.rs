//! [`FieldSet`]: the secured fields mounted by one form.
//!
//! Setup lives in `setup.rs`, teardown in `teardown.rs`; both extend
//! [`FieldSet`] and its shared inner state.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use csf_protocol::{FieldType, Message};
use csf_runtime::{
	FieldState, FrameController, FrameFactory, FrameRegistry, HandshakeSettler, LoadState, MessageRelay, Result,
};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::config::FieldSetConfig;
use crate::owner::FieldSetOwner;

/// Snapshot of a field set, for diagnostics and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSetState {
	pub load: LoadState,
	/// Lifecycle state of every registered field, ordered by field type.
	pub fields: Vec<(FieldType, FieldState)>,
	/// Fields whose config handshake resolved.
	pub configured: Vec<FieldType>,
	pub iframes_configured: bool,
	pub has_genuine_touch_events: bool,
	pub destroyed: bool,
}

#[derive(Debug, Default)]
pub(crate) struct ConfigProgress {
	pub(crate) fields: BTreeSet<FieldType>,
	pub(crate) all_configured: bool,
}

pub(crate) struct FieldSetInner {
	pub(crate) config: FieldSetConfig,
	pub(crate) registry: Arc<FrameRegistry>,
	pub(crate) relay: MessageRelay,
	pub(crate) factory: Arc<dyn FrameFactory>,
	pub(crate) owner: Arc<dyn FieldSetOwner>,
	/// Handshakes started by setup. Settled ones are pruned on the next setup.
	pub(crate) handshakes: Mutex<Vec<HandshakeSettler>>,
	pub(crate) configured: Mutex<ConfigProgress>,
	pub(crate) genuine_touch: AtomicBool,
	pub(crate) destroyed: AtomicBool,
}

impl FieldSetInner {
	pub(crate) fn is_destroyed(&self) -> bool {
		self.destroyed.load(Ordering::SeqCst)
	}
}

/// The secured fields mounted by one form.
///
/// Cheap to clone; clones share state. Frame handlers hold only a weak
/// reference, so dropping every clone releases the set.
#[derive(Clone)]
pub struct FieldSet {
	pub(crate) inner: Arc<FieldSetInner>,
}

impl FieldSet {
	/// Creates an empty field set.
	///
	/// `factory` builds a frame the first time a field is set up; `owner`
	/// receives everything the frames report.
	pub fn new(config: FieldSetConfig, factory: Arc<dyn FrameFactory>, owner: Arc<dyn FieldSetOwner>) -> Self {
		let registry = Arc::new(FrameRegistry::new(config.expected_frames));
		let relay = MessageRelay::new(Arc::clone(&registry));
		let genuine_touch = AtomicBool::new(config.has_genuine_touch_events);

		tracing::debug!(
			expected = config.expected_frames,
			timeout_ms = config.config_timeout_ms,
			"Mounted field set"
		);

		Self {
			inner: Arc::new(FieldSetInner {
				config,
				registry,
				relay,
				factory,
				owner,
				handshakes: Mutex::new(Vec::new()),
				configured: Mutex::new(ConfigProgress::default()),
				genuine_touch,
				destroyed: AtomicBool::new(false),
			}),
		}
	}

	pub fn config(&self) -> &FieldSetConfig {
		&self.inner.config
	}

	/// Returns the controller for `field_type`, if it has been set up.
	pub fn controller(&self, field_type: FieldType) -> Option<Arc<FrameController>> {
		self.inner.registry.get(field_type)
	}

	/// Field types set up so far, ordered.
	pub fn field_types(&self) -> Vec<FieldType> {
		self.inner.registry.field_types()
	}

	pub fn relay(&self) -> &MessageRelay {
		&self.inner.relay
	}

	/// Routes one inbound frame message. A no-op once the set is destroyed.
	pub fn dispatch(&self, message: Message) -> Result<()> {
		if self.is_destroyed() {
			tracing::debug!("Message after teardown (ignored)");
			return Ok(());
		}
		self.inner.relay.dispatch(message)
	}

	pub fn dispatch_value(&self, value: Value) -> Result<()> {
		self.dispatch(serde_json::from_value(value)?)
	}

	pub fn dispatch_str(&self, raw: &str) -> Result<()> {
		self.dispatch(serde_json::from_str(raw)?)
	}

	/// Processes inbound messages until `rx` closes or a fatal error occurs.
	pub async fn run(&self, rx: mpsc::UnboundedReceiver<Value>) -> Result<()> {
		self.inner.relay.run(rx).await
	}

	/// Posts `message` into every frame of the set.
	pub fn broadcast<P: Serialize>(&self, message: &P) -> Result<usize> {
		self.inner.relay.broadcast(message)
	}

	/// Posts `message` into the frame for `field_type`.
	pub fn post_to_frame<P: Serialize>(&self, field_type: FieldType, message: &P) -> Result<()> {
		self.inner.relay.post_to(field_type, message)
	}

	/// Cached platform touch capability, used when a `touchstart` carries no override.
	pub fn has_genuine_touch_events(&self) -> bool {
		self.inner.genuine_touch.load(Ordering::SeqCst)
	}

	pub fn set_genuine_touch_events(&self, enabled: bool) {
		self.inner.genuine_touch.store(enabled, Ordering::SeqCst);
	}

	pub fn is_destroyed(&self) -> bool {
		self.inner.is_destroyed()
	}

	/// Takes a snapshot of counters and per-field states.
	pub fn state(&self) -> FieldSetState {
		let inner = &self.inner;
		let fields = inner
			.registry
			.controllers()
			.iter()
			.map(|c| (c.field_type(), c.state()))
			.collect();
		let (configured, iframes_configured) = {
			let progress = inner.configured.lock();
			(progress.fields.iter().copied().collect(), progress.all_configured)
		};

		FieldSetState {
			load: inner.registry.load_state(),
			fields,
			configured,
			iframes_configured,
			has_genuine_touch_events: self.has_genuine_touch_events(),
			destroyed: self.is_destroyed(),
		}
	}
}

impl fmt::Debug for FieldSet {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FieldSet")
			.field("config", &self.inner.config)
			.field("fields", &self.field_types())
			.field("destroyed", &self.is_destroyed())
			.finish()
	}
}
