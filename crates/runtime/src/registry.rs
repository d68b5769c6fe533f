//! Frame registry for one field set, with the aggregate load barrier.
//!
//! Controllers live in a [`DashMap`] keyed by [`FieldType`], so there is exactly
//! one controller per declared field. The load counters sit behind one mutex:
//! every `load` event is counted against the expected total, which itself may
//! grow by one when the expiry date is split into month and year frames.

use std::sync::Arc;

use csf_protocol::FieldType;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;

use crate::controller::FrameController;
use crate::error::Result;
use crate::transport::FrameChannel;

/// Snapshot of the aggregate load counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadState {
	/// Loads observed so far.
	pub iframe_count: usize,
	/// Loads expected before the set is ready.
	pub num_iframes: usize,
	/// Expected total as declared at mount.
	pub original_num_iframes: usize,
	/// Whether a month/year field has bumped `num_iframes`.
	pub has_separate_date_fields: bool,
	/// Whether the ready barrier has fired.
	pub iframes_loaded: bool,
}

impl LoadState {
	fn new(expected: usize) -> Self {
		Self {
			iframe_count: 0,
			num_iframes: expected,
			original_num_iframes: expected,
			has_separate_date_fields: false,
			iframes_loaded: false,
		}
	}
}

/// Outcome of counting one `load` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadProgress {
	/// Still waiting on more frames.
	Pending { loaded: usize, expected: usize },
	/// This load completed the set. Returned exactly once per set.
	Ready { expected: usize },
	/// More loads than frames: protocol violation.
	Exceeded { observed: usize, expected: usize },
}

/// Maps field types to controllers for one field set.
pub struct FrameRegistry {
	controllers: DashMap<FieldType, Arc<FrameController>>,
	loads: Mutex<LoadState>,
}

impl FrameRegistry {
	/// Creates an empty registry expecting `expected_frames` loads.
	pub fn new(expected_frames: usize) -> Self {
		Self {
			controllers: DashMap::new(),
			loads: Mutex::new(LoadState::new(expected_frames)),
		}
	}

	/// Returns the controller for `field_type`, creating it (and its frame) on first use.
	///
	/// `create` only runs when no controller exists yet.
	pub fn get_or_create<F>(&self, field_type: FieldType, create: F) -> Result<Arc<FrameController>>
	where
		F: FnOnce() -> Result<Arc<dyn FrameChannel>>,
	{
		match self.controllers.entry(field_type) {
			Entry::Occupied(entry) => Ok(Arc::clone(entry.get())),
			Entry::Vacant(entry) => {
				let frame = create()?;
				let controller = Arc::new(FrameController::new(field_type, frame));
				entry.insert(Arc::clone(&controller));
				tracing::debug!(field = %field_type, "Registered frame controller");
				Ok(controller)
			}
		}
	}

	/// Synchronous lookup.
	pub fn get(&self, field_type: FieldType) -> Option<Arc<FrameController>> {
		self.controllers.get(&field_type).map(|r| Arc::clone(r.value()))
	}

	pub fn contains(&self, field_type: FieldType) -> bool {
		self.controllers.contains_key(&field_type)
	}

	/// Snapshot of every controller, ordered by field type.
	pub fn controllers(&self) -> Vec<Arc<FrameController>> {
		let mut all: Vec<_> = self.controllers.iter().map(|r| Arc::clone(r.value())).collect();
		all.sort_by_key(|c| c.field_type());
		all
	}

	/// Registered field types, ordered.
	pub fn field_types(&self) -> Vec<FieldType> {
		let mut fields: Vec<_> = self.controllers.iter().map(|r| *r.key()).collect();
		fields.sort();
		fields
	}

	pub fn len(&self) -> usize {
		self.controllers.len()
	}

	pub fn is_empty(&self) -> bool {
		self.controllers.is_empty()
	}

	/// Records that the set uses split month/year expiry frames.
	///
	/// The first call raises the expected frame count by one and returns `true`;
	/// later calls change nothing.
	pub fn register_separate_date_field(&self) -> bool {
		let mut loads = self.loads.lock();
		if loads.has_separate_date_fields {
			return false;
		}
		loads.has_separate_date_fields = true;
		loads.num_iframes += 1;
		true
	}

	/// Counts one `load` event against the expected total.
	pub fn record_load(&self) -> LoadProgress {
		let mut loads = self.loads.lock();
		loads.iframe_count += 1;

		let (observed, expected) = (loads.iframe_count, loads.num_iframes);
		if observed > expected {
			return LoadProgress::Exceeded { observed, expected };
		}
		if observed == expected && !loads.iframes_loaded {
			loads.iframes_loaded = true;
			return LoadProgress::Ready { expected };
		}
		LoadProgress::Pending {
			loaded: observed,
			expected,
		}
	}

	/// Snapshot of the load counters.
	pub fn load_state(&self) -> LoadState {
		*self.loads.lock()
	}

	/// Removes every controller and resets the counters to their mount values.
	///
	/// Returns the removed controllers so the caller can detach them.
	pub fn drain(&self) -> Vec<Arc<FrameController>> {
		let drained = self.controllers();
		self.controllers.clear();

		let mut loads = self.loads.lock();
		let original = loads.original_num_iframes;
		*loads = LoadState::new(original);
		drained
	}
}
