//! csf - orchestration of sandboxed secured payment-field frames
//!
//! A checkout form renders each sensitive input (card number, expiry, security
//! code) inside its own sandboxed frame so raw values never reach the hosting
//! page. This crate coordinates those frames from the host side:
//!
//! - [`FieldSet::setup_secured_field`] creates a field's frame, wires its events to
//!   a [`FieldSetOwner`] and returns a [`ConfigHandshake`] that resolves once the
//!   frame reports its config
//! - the field set counts `load` events and signals the owner once every
//!   expected frame is ready; a frame that loads again afterwards tears the set down
//! - [`FieldSet::destroy_secured_fields`] releases every frame and rejects
//!   outstanding handshakes
//!
//! # Example
//!
//! ```ignore
//! let factory = Arc::new(QueuedFrameFactory::new());
//! let fields = FieldSet::new(FieldSetConfig::default(), factory, Arc::new(NoopOwner));
//!
//! let config = fields.setup_secured_field(&Anchor::for_field(FieldType::EncryptedCardNumber))?;
//! fields.dispatch_value(json!({"kind": "config", "fieldType": "encryptedCardNumber", "payload": {}}))?;
//! let payload = config.await?;
//! ```

mod anchor;
mod config;
mod field_set;
mod owner;
mod setup;
mod teardown;

pub use anchor::{Anchor, FieldAnchor, resolve_field_type};
pub use config::{DEFAULT_EXPECTED_FRAMES, FieldSetConfig, SF_CONFIG_TIMEOUT};
pub use csf_protocol::{
	CONFIG_TIMEOUT_REASON, ConfigFailure, ConfiguredSignal, DATA_ENCRYPTED_FIELD_ATTR, EventKind, FieldType,
	FrameMessage, HostMessage, LoadedSignal, Message,
};
pub use csf_runtime::{
	ConfigHandshake, Error, FieldState, FrameChannel, FrameController, FrameFactory, LoadState, QueuedFrame,
	QueuedFrameFactory, Result,
};
pub use field_set::{FieldSet, FieldSetState};
pub use owner::{FieldSetOwner, NoopOwner};
