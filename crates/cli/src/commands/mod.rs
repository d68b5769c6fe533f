mod fields;
mod replay;

use crate::cli::{Cli, Commands};
use crate::error::Result;
use crate::output::Reporter;

pub async fn dispatch(cli: Cli) -> Result<()> {
	let reporter = Reporter::new(cli.format);

	match cli.command {
		Commands::Replay(args) => replay::execute(args, reporter).await,
		Commands::Fields => fields::execute(cli.format),
	}
}
