use std::io::{self, Write};

use anyhow::Result;
use phpls_lsp::{Completer, Config};

use super::Location;

/// Complete the member or class name ending at a position
#[derive(clap::Args, Debug)]
pub struct Args {
    #[command(flatten)]
    pub location: Location,
}

pub fn run(args: &Args, config: &Config) -> Result<()> {
    let (source, uri) = args.location.read()?;
    let offset = args.location.offset_in(&source)?;
    let completer = Completer::from_config(args.location.registry()?, config);
    let items = completer.complete(&uri, &source, offset);

    let mut stdout = io::stdout();
    serde_json::to_writer_pretty(&stdout, &items)?;
    writeln!(stdout)?;
    Ok(())
}
