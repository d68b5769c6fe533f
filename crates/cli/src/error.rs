use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
	#[error("failed to read transcript {path}")]
	ReadTranscript {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("invalid transcript {path}: {source}")]
	ParseTranscript {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},

	#[error("transcript step {step} has neither a message nor destroy")]
	EmptyStep { step: usize },

	#[error("replay stopped at step {step}: {source}")]
	Fatal {
		step: usize,
		#[source]
		source: csf::Error,
	},

	#[error(transparent)]
	Csf(#[from] csf::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),
}

impl CliError {
	/// Stable machine-readable code for the failure class.
	pub fn code(&self) -> &'static str {
		match self {
			CliError::ReadTranscript { .. } => "IO_ERROR",
			CliError::ParseTranscript { .. } | CliError::EmptyStep { .. } | CliError::Json(_) => "INVALID_TRANSCRIPT",
			CliError::Fatal { source, .. } if matches!(source, csf::Error::ProtocolViolation { .. }) => {
				"PROTOCOL_VIOLATION"
			}
			CliError::Fatal { .. } | CliError::Csf(_) => "FIELD_SET_ERROR",
		}
	}
}
