//! Secured field identifiers and the markup attribute that binds them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Attribute on a host anchor node naming the secured field it hosts.
pub const DATA_ENCRYPTED_FIELD_ATTR: &str = "data-cse";

/// Kind of secured input hosted inside a sandboxed frame.
///
/// Serialized with the identifiers frames use on the wire (`"encryptedCardNumber"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldType {
	/// Primary account number.
	EncryptedCardNumber,
	/// Combined `MM/YY` expiry date.
	EncryptedExpiryDate,
	/// Expiry month, when the date is split across two frames.
	EncryptedExpiryMonth,
	/// Expiry year, when the date is split across two frames.
	EncryptedExpiryYear,
	/// CVC / CVV.
	EncryptedSecurityCode,
	/// Card password (KCP).
	EncryptedPassword,
	/// Gift card PIN.
	EncryptedPin,
	/// Bank account number.
	EncryptedBankAccountNumber,
	/// Bank routing / location identifier.
	EncryptedBankLocationId,
}

impl FieldType {
	/// Every known field type, in declaration order.
	pub const ALL: [FieldType; 9] = [
		FieldType::EncryptedCardNumber,
		FieldType::EncryptedExpiryDate,
		FieldType::EncryptedExpiryMonth,
		FieldType::EncryptedExpiryYear,
		FieldType::EncryptedSecurityCode,
		FieldType::EncryptedPassword,
		FieldType::EncryptedPin,
		FieldType::EncryptedBankAccountNumber,
		FieldType::EncryptedBankLocationId,
	];

	/// Returns the wire identifier.
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::EncryptedCardNumber => "encryptedCardNumber",
			Self::EncryptedExpiryDate => "encryptedExpiryDate",
			Self::EncryptedExpiryMonth => "encryptedExpiryMonth",
			Self::EncryptedExpiryYear => "encryptedExpiryYear",
			Self::EncryptedSecurityCode => "encryptedSecurityCode",
			Self::EncryptedPassword => "encryptedPassword",
			Self::EncryptedPin => "encryptedPin",
			Self::EncryptedBankAccountNumber => "encryptedBankAccountNumber",
			Self::EncryptedBankLocationId => "encryptedBankLocationId",
		}
	}

	/// Returns `true` for the month/year halves of a split expiry date.
	///
	/// A split date needs one more frame than the combined field it replaces.
	pub fn is_separate_date_field(&self) -> bool {
		matches!(self, Self::EncryptedExpiryMonth | Self::EncryptedExpiryYear)
	}
}

impl fmt::Display for FieldType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Error returned when a string names no known [`FieldType`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFieldTypeError(pub String);

impl fmt::Display for ParseFieldTypeError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "unknown secured field type: {}", self.0)
	}
}

impl std::error::Error for ParseFieldTypeError {}

impl FromStr for FieldType {
	type Err = ParseFieldTypeError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		FieldType::ALL
			.into_iter()
			.find(|field| field.as_str() == s)
			.ok_or_else(|| ParseFieldTypeError(s.to_string()))
	}
}
