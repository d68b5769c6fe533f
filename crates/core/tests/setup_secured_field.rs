use std::sync::Arc;
use std::time::Duration;

use csf::{
	Anchor, ConfigFailure, ConfiguredSignal, DATA_ENCRYPTED_FIELD_ATTR, Error, FieldSet, FieldSetConfig, FieldSetOwner,
	FieldState, FieldType, FrameChannel, LoadedSignal, QueuedFrameFactory,
};
use parking_lot::Mutex;
use serde_json::{Value, json};

#[derive(Debug, Clone, PartialEq)]
enum Call {
	Ready(LoadedSignal),
	AllConfigured(ConfiguredSignal),
	ConfigFeedback(Value),
	Focus(Value),
	ValueDetected(Value),
	ShiftTab(FieldType),
	Encryption(Value),
	Validation(Value),
	Autofill(Value),
	Touchstart(Value),
}

#[derive(Default)]
struct RecordingOwner {
	calls: Mutex<Vec<Call>>,
}

impl RecordingOwner {
	fn calls(&self) -> Vec<Call> {
		self.calls.lock().clone()
	}

	fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
		self.calls.lock().iter().filter(|call| matches(call)).count()
	}

	fn record(&self, call: Call) {
		self.calls.lock().push(call);
	}
}

impl FieldSetOwner for RecordingOwner {
	fn on_ready(&self, signal: LoadedSignal) {
		self.record(Call::Ready(signal));
	}

	fn on_all_configured(&self, signal: ConfiguredSignal) {
		self.record(Call::AllConfigured(signal));
	}

	fn on_config_feedback(&self, payload: Value) {
		self.record(Call::ConfigFeedback(payload));
	}

	fn on_focus(&self, payload: Value) {
		self.record(Call::Focus(payload));
	}

	fn on_value_detected(&self, payload: Value) {
		self.record(Call::ValueDetected(payload));
	}

	fn on_shift_tab(&self, field_type: FieldType) {
		self.record(Call::ShiftTab(field_type));
	}

	fn on_encryption_result(&self, payload: Value) {
		self.record(Call::Encryption(payload));
	}

	fn on_validation_result(&self, payload: Value) {
		self.record(Call::Validation(payload));
	}

	fn on_autofill_detected(&self, payload: Value) {
		self.record(Call::Autofill(payload));
	}

	fn on_touchstart_platform_quirk(&self, payload: Value) {
		self.record(Call::Touchstart(payload));
	}
}

struct Harness {
	fields: FieldSet,
	owner: Arc<RecordingOwner>,
	frames: Arc<QueuedFrameFactory>,
}

impl Harness {
	fn new(config: FieldSetConfig) -> Self {
		let owner = Arc::new(RecordingOwner::default());
		let frames = Arc::new(QueuedFrameFactory::new());
		let fields = FieldSet::new(config, frames.clone(), owner.clone());
		Self { fields, owner, frames }
	}

	fn expecting(frames: usize) -> Self {
		Self::new(FieldSetConfig::default().with_expected_frames(frames))
	}

	fn send(&self, kind: &str, field_type: FieldType, payload: Value) -> csf::Result<()> {
		self.fields
			.dispatch_value(json!({"kind": kind, "fieldType": field_type, "payload": payload}))
	}
}

fn anchor(field_type: FieldType) -> Anchor {
	Anchor::for_field(field_type)
}

#[tokio::test(start_paused = true)]
async fn ready_fires_once_when_every_frame_has_loaded() {
	let h = Harness::expecting(2);
	let _card = h.fields.setup_secured_field(&anchor(FieldType::EncryptedCardNumber)).unwrap();
	let _cvc = h.fields.setup_secured_field(&anchor(FieldType::EncryptedSecurityCode)).unwrap();

	h.send("load", FieldType::EncryptedCardNumber, json!({})).unwrap();
	assert_eq!(h.fields.state().load.iframe_count, 1);
	assert!(h.owner.calls().is_empty());

	h.send("load", FieldType::EncryptedSecurityCode, json!({})).unwrap();
	let state = h.fields.state();
	assert_eq!(state.load.iframe_count, 2);
	assert!(state.load.iframes_loaded);
	assert_eq!(h.owner.calls(), vec![Call::Ready(LoadedSignal { iframes_loaded: true })]);
	assert_eq!(
		h.fields.controller(FieldType::EncryptedCardNumber).unwrap().state(),
		FieldState::Loaded
	);
}

#[tokio::test(start_paused = true)]
async fn extra_load_is_a_protocol_violation_and_tears_down() {
	let h = Harness::expecting(2);
	let card = h.fields.setup_secured_field(&anchor(FieldType::EncryptedCardNumber)).unwrap();
	let _cvc = h.fields.setup_secured_field(&anchor(FieldType::EncryptedSecurityCode)).unwrap();

	h.send("load", FieldType::EncryptedCardNumber, json!({})).unwrap();
	h.send("load", FieldType::EncryptedSecurityCode, json!({})).unwrap();
	let err = h.send("load", FieldType::EncryptedCardNumber, json!({})).unwrap_err();

	assert!(matches!(err, Error::ProtocolViolation { observed: 3, expected: 2 }));
	assert!(err.is_fatal());
	let message = err.to_string();
	assert!(message.contains("iframe load count=3"));
	assert!(message.contains("Expected count:2"));

	assert!(h.fields.is_destroyed());
	assert!(h.fields.field_types().is_empty());
	assert!(h.frames.frame(FieldType::EncryptedCardNumber).unwrap().is_detached());
	assert!(h.frames.frame(FieldType::EncryptedSecurityCode).unwrap().is_detached());
	assert_eq!(h.fields.state().load.iframe_count, 0);
	assert_eq!(h.owner.count(|c| matches!(c, Call::Ready(_))), 1);
	assert!(matches!(card.await, Err(Error::Destroyed(FieldType::EncryptedCardNumber))));
}

#[tokio::test(start_paused = true)]
async fn separate_date_fields_expect_one_extra_frame() {
	let h = Harness::expecting(3);
	let fields = [
		FieldType::EncryptedCardNumber,
		FieldType::EncryptedExpiryMonth,
		FieldType::EncryptedExpiryYear,
		FieldType::EncryptedSecurityCode,
	];
	let _handshakes: Vec<_> = fields
		.iter()
		.map(|f| h.fields.setup_secured_field(&anchor(*f)).unwrap())
		.collect();

	let load = h.fields.state().load;
	assert!(load.has_separate_date_fields);
	assert_eq!(load.num_iframes, 4);
	assert_eq!(load.original_num_iframes, 3);

	for field in &fields[..3] {
		h.send("load", *field, json!({})).unwrap();
	}
	assert!(h.owner.calls().is_empty());

	h.send("load", FieldType::EncryptedSecurityCode, json!({})).unwrap();
	assert_eq!(h.owner.calls(), vec![Call::Ready(LoadedSignal::loaded())]);
}

#[tokio::test(start_paused = true)]
async fn config_resolves_with_exact_payload_and_timer_never_fires() {
	let h = Harness::expecting(1);
	let handshake = h.fields.setup_secured_field(&anchor(FieldType::EncryptedCardNumber)).unwrap();

	h.send("config", FieldType::EncryptedCardNumber, json!({"foo": "bar"})).unwrap();

	assert_eq!(handshake.await.unwrap(), json!({"foo": "bar"}));
	tokio::time::sleep(Duration::from_secs(60)).await;

	assert_eq!(
		h.fields.controller(FieldType::EncryptedCardNumber).unwrap().state(),
		FieldState::Configured
	);
	assert_eq!(
		h.owner.calls(),
		vec![
			Call::ConfigFeedback(json!({"foo": "bar"})),
			Call::AllConfigured(ConfiguredSignal { iframes_configured: true }),
		]
	);
}

#[tokio::test(start_paused = true)]
async fn missing_config_rejects_after_timeout() {
	let h = Harness::expecting(1);
	let start = tokio::time::Instant::now();
	let handshake = h.fields.setup_secured_field(&anchor(FieldType::EncryptedCardNumber)).unwrap();

	let err = handshake.await.unwrap_err();

	assert!(start.elapsed() >= Duration::from_millis(15_000));
	assert_eq!(
		err.config_failure(),
		Some(&ConfigFailure {
			field_type: FieldType::EncryptedCardNumber,
			fail_reason: "sf took too long to config".into(),
		})
	);
	assert_eq!(
		h.fields.controller(FieldType::EncryptedCardNumber).unwrap().state(),
		FieldState::TimedOut
	);

	// Late config still reaches the owner but changes nothing else.
	h.send("config", FieldType::EncryptedCardNumber, json!({"late": true})).unwrap();
	assert_eq!(h.owner.calls(), vec![Call::ConfigFeedback(json!({"late": true}))]);
	assert_eq!(
		h.fields.controller(FieldType::EncryptedCardNumber).unwrap().state(),
		FieldState::TimedOut
	);
}

#[tokio::test(start_paused = true)]
async fn configured_timeout_is_honored() {
	let config = FieldSetConfig::default()
		.with_expected_frames(1)
		.with_config_timeout(Duration::from_millis(200));
	let h = Harness::new(config);
	let start = tokio::time::Instant::now();

	let err = h
		.fields
		.setup_secured_field(&anchor(FieldType::EncryptedPin))
		.unwrap()
		.await
		.unwrap_err();

	assert!(err.is_timeout());
	assert!(start.elapsed() < Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn all_configured_fires_once() {
	let h = Harness::expecting(2);
	let card = h.fields.setup_secured_field(&anchor(FieldType::EncryptedCardNumber)).unwrap();
	let cvc = h.fields.setup_secured_field(&anchor(FieldType::EncryptedSecurityCode)).unwrap();

	h.send("config", FieldType::EncryptedCardNumber, json!({})).unwrap();
	assert_eq!(h.owner.count(|c| matches!(c, Call::AllConfigured(_))), 0);
	h.send("config", FieldType::EncryptedSecurityCode, json!({})).unwrap();
	h.send("config", FieldType::EncryptedSecurityCode, json!({})).unwrap();

	card.await.unwrap();
	cvc.await.unwrap();
	assert_eq!(h.owner.count(|c| matches!(c, Call::AllConfigured(_))), 1);
	let state = h.fields.state();
	assert!(state.iframes_configured);
	assert_eq!(
		state.configured,
		vec![FieldType::EncryptedCardNumber, FieldType::EncryptedSecurityCode]
	);
}

#[tokio::test(start_paused = true)]
async fn runtime_events_are_forwarded_untouched() {
	let h = Harness::expecting(1);
	let _handshake = h.fields.setup_secured_field(&anchor(FieldType::EncryptedCardNumber)).unwrap();
	let card = FieldType::EncryptedCardNumber;

	h.send("focus", card, json!({"fieldType": "encryptedCardNumber", "focus": true})).unwrap();
	h.send("valueDetected", card, json!({"binValue": "411111"})).unwrap();
	h.send("encryptionResult", card, json!({"blob": "adyenjs_0_1_25$abc"})).unwrap();
	h.send("validationResult", card, json!({"error": "error.va.sf-cc-num.02"})).unwrap();
	h.send("autofillDetected", card, json!({"name": "cc-name", "value": "J. Smith"})).unwrap();

	assert_eq!(
		h.owner.calls(),
		vec![
			Call::Focus(json!({"fieldType": "encryptedCardNumber", "focus": true})),
			Call::ValueDetected(json!({"binValue": "411111"})),
			Call::Encryption(json!({"blob": "adyenjs_0_1_25$abc"})),
			Call::Validation(json!({"error": "error.va.sf-cc-num.02"})),
			Call::Autofill(json!({"name": "cc-name", "value": "J. Smith"})),
		]
	);
}

#[tokio::test(start_paused = true)]
async fn shift_tab_forwards_only_the_field() {
	let h = Harness::expecting(1);
	let _handshake = h.fields.setup_secured_field(&anchor(FieldType::EncryptedSecurityCode)).unwrap();

	h.send("shiftTab", FieldType::EncryptedSecurityCode, json!({"fieldType": "encryptedSecurityCode", "extra": 1}))
		.unwrap();

	assert_eq!(h.owner.calls(), vec![Call::ShiftTab(FieldType::EncryptedSecurityCode)]);
}

#[tokio::test(start_paused = true)]
async fn touchstart_is_ignored_without_genuine_touch_events() {
	let h = Harness::expecting(2);
	let _card = h.fields.setup_secured_field(&anchor(FieldType::EncryptedCardNumber)).unwrap();
	let _cvc = h.fields.setup_secured_field(&anchor(FieldType::EncryptedSecurityCode)).unwrap();

	h.send("touchstart", FieldType::EncryptedCardNumber, json!({"fieldType": "encryptedCardNumber"}))
		.unwrap();

	assert!(h.owner.calls().is_empty());
	assert!(h.frames.drain_posted(FieldType::EncryptedCardNumber).is_empty());
	assert!(h.frames.drain_posted(FieldType::EncryptedSecurityCode).is_empty());
}

#[tokio::test(start_paused = true)]
async fn touchstart_relays_and_broadcasts_with_genuine_touch_events() {
	let h = Harness::new(FieldSetConfig::default().with_expected_frames(2).with_genuine_touch_events(true));
	let _card = h.fields.setup_secured_field(&anchor(FieldType::EncryptedCardNumber)).unwrap();
	let _cvc = h.fields.setup_secured_field(&anchor(FieldType::EncryptedSecurityCode)).unwrap();

	h.send("touchstart", FieldType::EncryptedCardNumber, json!({"fieldType": "encryptedCardNumber"}))
		.unwrap();

	assert_eq!(
		h.owner.calls(),
		vec![Call::Touchstart(json!({"fieldType": "encryptedCardNumber"}))]
	);
	let click = json!({"fieldType": "encryptedCardNumber", "fieldClick": true});
	assert_eq!(h.frames.drain_posted(FieldType::EncryptedCardNumber), vec![click.clone()]);
	assert_eq!(h.frames.drain_posted(FieldType::EncryptedSecurityCode), vec![click]);
}

#[tokio::test(start_paused = true)]
async fn touchstart_override_wins_over_cached_flag() {
	let h = Harness::expecting(1);
	let _card = h.fields.setup_secured_field(&anchor(FieldType::EncryptedCardNumber)).unwrap();

	h.send(
		"touchstart",
		FieldType::EncryptedCardNumber,
		json!({"fieldType": "encryptedCardNumber", "hasGenuineTouchEvents": true}),
	)
	.unwrap();
	assert_eq!(
		h.owner.calls(),
		vec![Call::Touchstart(json!({"fieldType": "encryptedCardNumber"}))]
	);

	h.fields.set_genuine_touch_events(true);
	h.send(
		"touchstart",
		FieldType::EncryptedCardNumber,
		json!({"fieldType": "encryptedCardNumber", "hasGenuineTouchEvents": false}),
	)
	.unwrap();
	assert_eq!(h.owner.calls().len(), 1);
	assert_eq!(h.frames.drain_posted(FieldType::EncryptedCardNumber).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn unknown_messages_are_ignored() {
	let h = Harness::expecting(1);
	let _card = h.fields.setup_secured_field(&anchor(FieldType::EncryptedCardNumber)).unwrap();

	h.fields.dispatch_value(json!({"kind": "brandChanged", "fieldType": "encryptedCardNumber"})).unwrap();
	h.fields.dispatch_value(json!({"kind": "focus", "fieldType": "encryptedBankAccountNumber"})).unwrap();
	h.fields.dispatch_value(json!("hello")).unwrap();

	assert!(h.owner.calls().is_empty());
	assert_eq!(h.fields.state().load.iframe_count, 0);
}

#[tokio::test(start_paused = true)]
async fn setup_twice_reuses_controller_and_overwrites_handlers() {
	let h = Harness::expecting(1);
	let first = h.fields.setup_secured_field(&anchor(FieldType::EncryptedCardNumber)).unwrap();
	let controller = h.fields.controller(FieldType::EncryptedCardNumber).unwrap();
	let second = h.fields.setup_secured_field(&anchor(FieldType::EncryptedCardNumber)).unwrap();

	assert!(Arc::ptr_eq(&controller, &h.fields.controller(FieldType::EncryptedCardNumber).unwrap()));
	assert_eq!(h.frames.created(), 1);

	h.send("config", FieldType::EncryptedCardNumber, json!({"n": 2})).unwrap();

	assert_eq!(second.await.unwrap(), json!({"n": 2}));
	assert!(first.await.unwrap_err().is_timeout());
	assert_eq!(h.owner.count(|c| matches!(c, Call::ConfigFeedback(_))), 1);
}

#[tokio::test(start_paused = true)]
async fn teardown_is_idempotent_and_final() {
	let h = Harness::expecting(2);
	let card = h.fields.setup_secured_field(&anchor(FieldType::EncryptedCardNumber)).unwrap();
	let cvc = h.fields.setup_secured_field(&anchor(FieldType::EncryptedSecurityCode)).unwrap();
	h.send("config", FieldType::EncryptedSecurityCode, json!({"ok": true})).unwrap();
	let controller = h.fields.controller(FieldType::EncryptedCardNumber).unwrap();

	h.fields.destroy_secured_fields();
	let after_first = h.fields.state();
	h.fields.destroy_secured_fields();

	assert_eq!(h.fields.state(), after_first);
	assert!(after_first.destroyed);
	assert!(after_first.fields.is_empty());
	assert!(controller.is_detached());
	assert!(matches!(card.await, Err(Error::Destroyed(FieldType::EncryptedCardNumber))));
	assert_eq!(cvc.await.unwrap(), json!({"ok": true}));

	h.send("focus", FieldType::EncryptedCardNumber, json!({})).unwrap();
	assert_eq!(h.owner.count(|c| matches!(c, Call::Focus(_))), 0);
	assert!(matches!(
		h.fields.setup_secured_field(&anchor(FieldType::EncryptedCardNumber)),
		Err(Error::FieldSetDestroyed)
	));
}

#[tokio::test(start_paused = true)]
async fn bad_anchors_are_rejected_synchronously() {
	let h = Harness::expecting(1);

	assert!(matches!(
		h.fields.setup_secured_field(&Anchor::new()),
		Err(Error::MissingFieldAttribute(_))
	));
	assert!(matches!(
		h.fields
			.setup_secured_field(&Anchor::new().with_attribute(DATA_ENCRYPTED_FIELD_ATTR, "encryptedShoeSize")),
		Err(Error::UnknownFieldType(_))
	));
	assert_eq!(h.frames.created(), 0);
}

#[tokio::test(start_paused = true)]
async fn run_loop_stops_on_protocol_violation() {
	let h = Harness::expecting(1);
	let _card = h.fields.setup_secured_field(&anchor(FieldType::EncryptedCardNumber)).unwrap();
	let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

	for kind in ["load", "focus", "load", "focus"] {
		tx.send(json!({"kind": kind, "fieldType": "encryptedCardNumber", "payload": {}}))
			.unwrap();
	}
	drop(tx);

	let result = h.fields.run(rx).await;

	assert!(matches!(result, Err(Error::ProtocolViolation { observed: 2, expected: 1 })));
	assert_eq!(
		h.owner.calls(),
		vec![Call::Ready(LoadedSignal::loaded()), Call::Focus(json!({}))]
	);
	assert!(h.fields.is_destroyed());
}

#[test]
fn setup_outside_a_runtime_is_a_typed_error() {
	let h = Harness::expecting(2);

	let err = h.fields.setup_secured_field(&anchor(FieldType::EncryptedCardNumber)).unwrap_err();

	assert!(matches!(err, Error::NoRuntime));
	assert_eq!(h.frames.created(), 0);
	assert!(h.fields.field_types().is_empty());
}
