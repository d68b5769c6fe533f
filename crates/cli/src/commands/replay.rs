use std::sync::Arc;

use csf::{Anchor, ConfigHandshake, DATA_ENCRYPTED_FIELD_ATTR, FieldSet, FieldSetConfig, FieldType, QueuedFrameFactory};
use futures::FutureExt;
use serde_json::Value;

use crate::cli::ReplayArgs;
use crate::error::{CliError, Result};
use crate::output::{ReplayEvent, Reporter};
use crate::owner::ReportingOwner;
use crate::transcript::{Step, Transcript};

pub async fn execute(args: ReplayArgs, reporter: Reporter) -> Result<()> {
	let transcript = Transcript::load(&args.file)?;
	let config = apply_overrides(transcript.config.clone(), &args);
	tracing::info!(
		file = %args.file.display(),
		fields = transcript.fields.len(),
		steps = transcript.steps.len(),
		"Replaying transcript"
	);

	let frames = Arc::new(QueuedFrameFactory::new());
	let fields = FieldSet::new(config, frames.clone(), Arc::new(ReportingOwner::new(reporter)));

	let mut replay = Replay {
		fields: &fields,
		frames: &frames,
		reporter,
		pending: Vec::new(),
	};
	replay.mount(&transcript.fields);
	let outcome = replay.play(&transcript.steps).await;
	replay.unmount();
	outcome
}

fn apply_overrides(mut config: FieldSetConfig, args: &ReplayArgs) -> FieldSetConfig {
	if let Some(timeout_ms) = args.config_timeout_ms {
		config.config_timeout_ms = timeout_ms;
	}
	if let Some(expected) = args.expected_frames {
		config = config.with_expected_frames(expected);
	}
	if args.genuine_touch {
		config = config.with_genuine_touch_events(true);
	}
	config
}

struct Replay<'a> {
	fields: &'a FieldSet,
	frames: &'a QueuedFrameFactory,
	reporter: Reporter,
	/// Handshakes not yet settled, in setup order.
	pending: Vec<ConfigHandshake>,
}

impl Replay<'_> {
	fn mount(&mut self, names: &[String]) {
		for name in names {
			let anchor = Anchor::new().with_attribute(DATA_ENCRYPTED_FIELD_ATTR, name.as_str());
			match self.fields.setup_secured_field(&anchor) {
				Ok(handshake) => {
					self.reporter.emit(&ReplayEvent::FieldSetUp {
						field_type: handshake.field_type(),
					});
					self.pending.push(handshake);
				}
				Err(e) => self.reporter.emit(&ReplayEvent::SetupFailed {
					field: name.clone(),
					error: e.to_string(),
				}),
			}
		}
	}

	async fn play(&mut self, steps: &[Step]) -> Result<()> {
		for (index, step) in steps.iter().enumerate() {
			if !step.delay().is_zero() {
				tokio::time::sleep(step.delay()).await;
				self.settle();
			}

			if let Some(message) = &step.message {
				if let Err(e) = self.fields.dispatch_value(message.clone()) {
					if e.is_fatal() {
						self.reporter.emit(&ReplayEvent::Destroyed);
						self.flush_posts();
						self.settle();
						return Err(CliError::Fatal { step: index, source: e });
					}
					tracing::warn!(step = index, "Dispatch failed: {}", e);
					self.reporter.emit(&ReplayEvent::DispatchError {
						step: index,
						error: e.to_string(),
					});
				}
			}

			if step.destroy {
				self.fields.destroy_secured_fields();
				self.reporter.emit(&ReplayEvent::Destroyed);
			}

			self.flush_posts();
			self.settle();
		}
		Ok(())
	}

	/// Reports the final state, then tears down whatever is still mounted.
	fn unmount(&mut self) {
		let state = self.fields.state();
		self.reporter.emit(&ReplayEvent::Summary {
			loaded: state.load.iframe_count,
			expected: state.load.num_iframes,
			configured: state.configured,
			destroyed: state.destroyed,
		});

		if !self.fields.is_destroyed() {
			self.fields.destroy_secured_fields();
			self.settle();
		}
	}

	/// Reports every handshake that has settled since the last call.
	fn settle(&mut self) {
		let reporter = self.reporter;
		self.pending.retain_mut(|handshake| {
			let field_type = handshake.field_type();
			match handshake.now_or_never() {
				Some(outcome) => {
					report_outcome(reporter, field_type, outcome);
					false
				}
				None => true,
			}
		});
	}

	/// Reports every message the host posted into a frame.
	fn flush_posts(&self) {
		for field_type in FieldType::ALL {
			for message in self.frames.drain_posted(field_type) {
				self.reporter.emit(&ReplayEvent::FramePost { field_type, message });
			}
		}
	}
}

fn report_outcome(reporter: Reporter, field_type: FieldType, outcome: csf::Result<Value>) {
	let event = match outcome {
		Ok(payload) => ReplayEvent::HandshakeResolved { field_type, payload },
		Err(e) => ReplayEvent::HandshakeRejected {
			field_type,
			reason: e.to_string(),
			failure: e.config_failure().cloned(),
		},
	};
	reporter.emit(&event);
}
