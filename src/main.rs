//! veridoc CLI — thin wrapper around the analysis engine
//!
//! Resolves configuration from arguments, runs one analysis, and prints
//! the structured document to stdout. Logs go to stderr so stdout stays
//! machine-readable. A fatal fault prints `{"error": ...}` and exits
//! non-zero.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use veridoc::report::json;
use veridoc::{AnalysisDocument, EngineConfig, ErrorDocument, VeridocEngine};

#[derive(Parser, Debug)]
#[command(name = "veridoc", version, about = "Document authenticity forensics engine")]
struct Args {
    /// Document image to analyze (raster page).
    image: PathBuf,

    /// Root directory for stage artifacts and the audit log.
    #[arg(long, default_value = "outputs")]
    output_root: PathBuf,

    /// Reference watermark template image.
    #[arg(long)]
    watermark_template: Option<PathBuf>,

    /// ONNX classifier model file.
    #[arg(long)]
    classifier_model: Option<PathBuf>,

    /// Directory containing the OCR detection/recognition models.
    #[arg(long)]
    ocr_models: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = EngineConfig {
        output_root: args.output_root,
        watermark_template: args.watermark_template,
        classifier_model: args.classifier_model,
        ocr_model_dir: args.ocr_models,
        ..EngineConfig::default()
    };

    let engine = VeridocEngine::new(config);
    match engine.analyze_file(&args.image) {
        Ok(outcome) => {
            let document = AnalysisDocument::from_outcome(&outcome);
            match json::render(&document) {
                Ok(body) => {
                    println!("{body}");
                    ExitCode::SUCCESS
                }
                Err(e) => fatal(e.to_string()),
            }
        }
        Err(e) => fatal(e.to_string()),
    }
}

fn fatal(message: String) -> ExitCode {
    tracing::error!("fatal: {message}");
    let document = ErrorDocument::new(message);
    match json::render_error(&document) {
        Ok(body) => println!("{body}"),
        Err(_) => println!("{{\"error\": \"unserializable fatal error\"}}"),
    }
    ExitCode::FAILURE
}
