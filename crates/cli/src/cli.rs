use std::path::PathBuf;

use clap::builder::Styles;
use clap::builder::styling::AnsiColor;
use clap::{Args, Parser, Subcommand};

use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "csf")]
#[command(about = "Secured-field frame orchestration - replay frame transcripts from the command line")]
#[command(version)]
#[command(styles = cli_styles())]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Output format: text (default) or json (one event per line)
	#[arg(short = 'f', long, global = true, value_enum, default_value = "text")]
	pub format: OutputFormat,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Mount a field set and play a transcript of frame messages against it
	Replay(ReplayArgs),

	/// List the secured field identifiers frames may declare
	Fields,
}

#[derive(Args, Debug, Clone)]
pub struct ReplayArgs {
	/// Transcript file (JSON: {config, fields, steps})
	#[arg(value_name = "FILE")]
	pub file: PathBuf,

	/// Override the config handshake timeout
	#[arg(long, value_name = "MS")]
	pub config_timeout_ms: Option<u64>,

	/// Override how many frames must load before the set is ready
	#[arg(long, value_name = "N")]
	pub expected_frames: Option<usize>,

	/// Treat the platform as delivering genuine touch events
	#[arg(long)]
	pub genuine_touch: bool,
}

/// Help styling in cargo's palette: green bold headers, cyan literals.
fn cli_styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Green.on_default().bold())
		.usage(AnsiColor::Green.on_default().bold())
		.literal(AnsiColor::Cyan.on_default())
		.placeholder(AnsiColor::Cyan.on_default())
		.valid(AnsiColor::Cyan.on_default())
}
