//! PHPStan's `--error-format=json` output.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};
use tracing::{error, instrument};

use super::{Diagnostic, DiagnosticSeverity, NumberOrString, Position, Range};
use crate::state::SyntaxDocument;

pub const SOURCE: &str = "PHPStan";
pub const CODE: i32 = 500;

#[derive(Debug, Deserialize)]
struct Report {
    totals: Totals,
    #[serde(default, deserialize_with = "files")]
    files: BTreeMap<String, FileReport>,
}

/// PHPStan writes `"files": []` rather than `{}` when nothing was reported.
fn files<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BTreeMap<String, FileReport>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Files {
        Map(BTreeMap<String, FileReport>),
        List(Vec<serde_json::Value>),
    }
    Ok(match Files::deserialize(deserializer)? {
        Files::Map(files) => files,
        Files::List(_) => BTreeMap::new(),
    })
}

#[derive(Debug, Deserialize)]
struct Totals {
    file_errors: usize,
}

#[derive(Debug, Deserialize)]
struct FileReport {
    #[serde(default)]
    messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    message: String,
    line: usize,
}

/// Diagnostics for `document` from PHPStan's JSON `output`.
///
/// Each message highlights the non-blank part of its line. Output that does
/// not decode is logged and yields nothing.
#[must_use]
#[instrument(level = "debug", skip_all, fields(uri = document.uri()))]
pub fn gather_diagnostics(
    document: &SyntaxDocument,
    output: &str,
    severity: DiagnosticSeverity,
) -> Vec<Diagnostic> {
    let report: Report = match serde_json::from_str(output) {
        Ok(report) => report,
        Err(error) => {
            error!(%error, output, "PHPStan failed unexpectedly");
            return Vec::new();
        }
    };
    if report.totals.file_errors == 0 {
        return Vec::new();
    }

    report
        .files
        .into_values()
        .flat_map(|file| file.messages)
        .map(|message| {
            let line = message.line.saturating_sub(1);
            let (start, end) = document.column_positions(line).unwrap_or_default();
            Diagnostic {
                range: Range::new(
                    Position::new(line as u32, start as u32),
                    Position::new(line as u32, end as u32),
                ),
                severity: Some(severity),
                code: Some(NumberOrString::Number(CODE)),
                source: Some(SOURCE.to_string()),
                message: message.message,
                ..Default::default()
            }
        })
        .collect()
}
