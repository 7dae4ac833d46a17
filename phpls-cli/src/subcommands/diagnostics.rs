use std::{
    fs,
    io::{self, Read, Write},
    path::PathBuf,
};

use anyhow::{Context, Result};
use clap::ValueEnum;
use phpls_lsp::{
    Config, SyntaxDocument,
    diagnostics::{DiagnosticSeverity, phpstan},
};

#[derive(Debug, ValueEnum, Clone, Copy)]
pub enum Severity {
    Error,
    Warning,
    Information,
    Hint,
}

impl From<Severity> for DiagnosticSeverity {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Error => Self::ERROR,
            Severity::Warning => Self::WARNING,
            Severity::Information => Self::INFORMATION,
            Severity::Hint => Self::HINT,
        }
    }
}

/// Turn `phpstan analyse --error-format=json` output into diagnostics
#[derive(clap::Args, Debug)]
pub struct Args {
    /// The analysed PHP file
    pub file: PathBuf,

    /// File holding PHPStan's JSON output; read from stdin when omitted
    #[arg(long)]
    pub phpstan: Option<PathBuf>,

    /// Severity given to every diagnostic
    #[arg(long, value_enum, default_value_t = Severity::Error)]
    pub severity: Severity,
}

pub fn run(args: &Args, config: &Config) -> Result<()> {
    let diagnostics = if config.diagnostics.enabled {
        let source = fs::read_to_string(&args.file)
            .with_context(|| format!("unable to read {}", args.file.display()))?;
        let document = SyntaxDocument::parse(super::uri_for(&args.file), &source, 0)?;
        let output = match &args.phpstan {
            Some(path) => fs::read_to_string(path)
                .with_context(|| format!("unable to read {}", path.display()))?,
            None => {
                let mut output = String::new();
                io::stdin().read_to_string(&mut output)?;
                output
            }
        };
        phpstan::gather_diagnostics(&document, &output, args.severity.into())
    } else {
        tracing::info!("diagnostics are disabled");
        Vec::new()
    };

    let mut stdout = io::stdout();
    serde_json::to_writer_pretty(&stdout, &diagnostics)?;
    writeln!(stdout)?;
    Ok(())
}
