// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Markscan — command-line bubble-sheet scanner
//
// Entry point. Initialises logging, loads the photograph and calibration
// profile, runs the scanner and prints the photograph report as JSON.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use markscan_core::{CalibrationProfile, Result, ScanRequest};
use markscan_omr::SheetScanner;

/// Read answer papers from a photograph.
#[derive(Parser, Debug)]
#[command(name = "markscan")]
#[command(version)]
#[command(about = "Optical mark recognition for photographed bubble-sheet answer papers", long_about = None)]
struct Cli {
    /// Photograph holding one or more answer papers (JPEG, PNG, ...).
    image: PathBuf,

    /// Number of papers in the photograph.
    papers: usize,

    /// Number of questions to read on every paper.
    questions: usize,

    /// Calibration profile (JSON). Defaults to the classic 60-question sheet.
    profile: Option<PathBuf>,

    /// Pretty-print the JSON report.
    #[arg(long)]
    pretty: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "scan failed");
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: &Cli) -> Result<String> {
    let profile = match &cli.profile {
        Some(path) => CalibrationProfile::from_json_file(path)?,
        None => CalibrationProfile::default(),
    };
    tracing::info!(profile = %profile.name, version = profile.version, "Markscan starting");

    let scanner = with_default_decoder(SheetScanner::new(profile)?);
    let bytes = std::fs::read(&cli.image)?;
    let photo = scanner.scan_bytes(&bytes, ScanRequest::new(cli.papers, cli.questions))?;
    let report = photo.report();

    if cli.pretty {
        Ok(serde_json::to_string_pretty(&report)?)
    } else {
        report.to_json()
    }
}

#[cfg(feature = "qr")]
fn with_default_decoder(scanner: SheetScanner) -> SheetScanner {
    scanner.with_decoder(markscan_omr::Deadline::new(markscan_omr::QrDecoder))
}

#[cfg(not(feature = "qr"))]
fn with_default_decoder(scanner: SheetScanner) -> SheetScanner {
    scanner
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn positional_arguments_parse() {
        let cli = Cli::try_parse_from(["markscan", "photo.jpg", "2", "60", "sheet.json"]).unwrap();
        assert_eq!(cli.image, PathBuf::from("photo.jpg"));
        assert_eq!((cli.papers, cli.questions), (2, 60));
        assert_eq!(cli.profile, Some(PathBuf::from("sheet.json")));
        assert!(!cli.pretty);
    }

    #[test]
    fn missing_image_is_an_io_error() {
        let cli = Cli::try_parse_from(["markscan", "/nonexistent/photo.jpg", "1", "10"]).unwrap();
        assert!(matches!(run(&cli), Err(markscan_core::MarkscanError::Io(_))));
    }
}
