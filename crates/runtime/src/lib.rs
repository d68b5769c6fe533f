//! Secured-field runtime - frame controllers, registry, config handshake and relay
//!
//! This crate holds the host-side machinery for a set of sandboxed payment-field
//! frames:
//!
//! - **Controllers**: one [`FrameController`] per field, with a single handler slot per event kind
//! - **Registry**: [`FrameRegistry`] mapping field types to controllers, plus the aggregate load barrier
//! - **Handshake**: [`ConfigHandshake`], a timed wait for a frame's `config` message
//! - **Relay**: [`MessageRelay`] routing inbound messages and broadcasting outbound ones
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │   csf-rs    │  Field set setup and teardown
//! └──────┬──────┘
//!        │ implements FrameFactory
//! ┌──────▼──────┐
//! │ csf-runtime │  This crate
//! │  ┌────────┐ │
//! │  │ Relay  │ │  fieldType routing
//! │  └────────┘ │
//! │  ┌────────┐ │
//! │  │Registry│ │  Controllers + load counters
//! │  └────────┘ │
//! │  ┌────────┐ │
//! │  │ Frames │ │  FrameChannel transport
//! │  └────────┘ │
//! └─────────────┘
//! ```

pub mod channel;
pub mod controller;
pub mod error;
pub mod handshake;
pub mod registry;
pub mod relay;
pub mod transport;

pub use channel::Channel;
pub use controller::{EventHandlers, FieldState, FrameController, HandlerFn};
pub use error::{Error, Result};
pub use handshake::{ConfigHandshake, HandshakeSettler, config_handshake};
pub use registry::{FrameRegistry, LoadProgress, LoadState};
pub use relay::MessageRelay;
pub use transport::{FrameChannel, FrameFactory, QueuedFrame, QueuedFrameFactory};
