use std::process::ExitCode;

use clap::Parser;
use csf_cli::{cli::Cli, commands, logging, output};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	match commands::dispatch(cli).await {
		Ok(()) => ExitCode::SUCCESS,
		Err(err) => {
			output::print_error_stderr(&err);
			ExitCode::FAILURE
		}
	}
}
