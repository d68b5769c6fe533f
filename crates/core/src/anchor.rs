//! Host anchors: the markup nodes a secured field is mounted on.

use std::collections::BTreeMap;

use csf_protocol::{DATA_ENCRYPTED_FIELD_ATTR, FieldType, ParseFieldTypeError};
use csf_runtime::{Error, Result};

/// A host node that can be asked for its attributes.
///
/// Implemented by whatever stands in for the DOM. The field set only ever
/// reads [`DATA_ENCRYPTED_FIELD_ATTR`].
pub trait FieldAnchor {
	fn attribute(&self, name: &str) -> Option<String>;
}

/// In-memory anchor holding a flat attribute map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Anchor {
	attributes: BTreeMap<String, String>,
}

impl Anchor {
	pub fn new() -> Self {
		Self::default()
	}

	/// Anchor carrying the routing attribute for `field_type`.
	pub fn for_field(field_type: FieldType) -> Self {
		Self::new().with_attribute(DATA_ENCRYPTED_FIELD_ATTR, field_type.as_str())
	}

	pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.attributes.insert(name.into(), value.into());
		self
	}
}

impl FieldAnchor for Anchor {
	fn attribute(&self, name: &str) -> Option<String> {
		self.attributes.get(name).cloned()
	}
}

/// Reads the field identifier off `anchor`.
pub fn resolve_field_type<A: FieldAnchor + ?Sized>(anchor: &A) -> Result<FieldType> {
	let raw = anchor
		.attribute(DATA_ENCRYPTED_FIELD_ATTR)
		.ok_or(Error::MissingFieldAttribute(DATA_ENCRYPTED_FIELD_ATTR))?;
	raw.parse()
		.map_err(|ParseFieldTypeError(name)| Error::UnknownFieldType(name))
}
