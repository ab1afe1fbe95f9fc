//! VeriStamp CLI - Bridge interface for host services
//!
//! Commands: variants, synthesize, preview, check-record
//! Outputs JSON to stdout
//! Returns non-zero on validation failure

use chrono::{Datelike, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use veristamp_core::render::{
    InstructionListRenderer, PlaceholderSymbolEncoder, SequentialNumberAllocator,
};
use veristamp_core::{
    canonicalize, ApplicantRecord, EngineConfig, InMemoryRecordStore, SynthesisError,
    SynthesisPipeline, SynthesisRequest, VariantCatalog, VerificationRecord,
};

#[derive(Parser)]
#[command(name = "veristamp-cli")]
#[command(about = "VeriStamp CLI - Document Synthesis & Authenticity Engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to variant definition overrides
    #[arg(short, long, default_value = "variants")]
    variants_dir: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// List catalog variants
    Variants,

    /// Synthesize a document and immediately verify it by number
    Synthesize {
        /// Document type label
        #[arg(short = 't', long = "type")]
        document_type: String,

        /// JSON payload (applicant field map)
        #[arg(short, long)]
        payload: String,

        /// Issuance date, YYYY-MM-DD
        #[arg(short, long)]
        issued_at: NaiveDate,
    },

    /// Emit the draw instructions a request would render, without issuing
    Preview {
        /// Document type label
        #[arg(short = 't', long = "type")]
        document_type: String,

        /// JSON payload (applicant field map)
        #[arg(short, long)]
        payload: String,

        /// Issuance date, YYYY-MM-DD
        #[arg(short, long)]
        issued_at: NaiveDate,

        /// Document number to print on the preview
        #[arg(short, long, default_value = "PREVIEW/0000")]
        number: String,
    },

    /// Recompute the signature over an exported record snapshot
    CheckRecord {
        /// JSON payload (VerificationRecord)
        #[arg(short, long)]
        payload: String,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config = match EngineConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!(r#"{{"error": "{}"}}"#, e);
            return ExitCode::FAILURE;
        }
    };

    let mut catalog = VariantCatalog::builtin();
    if let Err(e) = catalog.load_from_dir(&cli.variants_dir) {
        eprintln!(r#"{{"error": "Failed to load variant overrides: {}"}}"#, e);
        return ExitCode::FAILURE;
    }

    let pipeline = SynthesisPipeline::new(
        config.clone(),
        catalog,
        Arc::new(InMemoryRecordStore::new()),
        Arc::new(SequentialNumberAllocator::new(Utc::now().year())),
        Arc::new(PlaceholderSymbolEncoder),
        Arc::new(InstructionListRenderer),
    );

    match cli.command {
        Commands::Variants => {
            let variants: Vec<_> = pipeline
                .catalog()
                .list()
                .iter()
                .map(|v| {
                    serde_json::json!({
                        "documentType": v.document_type,
                        "title": v.title,
                        "requiredFields": v.fields.iter()
                            .filter(|f| f.required)
                            .map(|f| f.name.clone())
                            .collect::<Vec<_>>(),
                    })
                })
                .collect();

            println!("{}", serde_json::to_string_pretty(&variants).unwrap());
            ExitCode::SUCCESS
        }

        Commands::Synthesize {
            document_type,
            payload,
            issued_at,
        } => {
            let applicant: ApplicantRecord = match serde_json::from_str(&payload) {
                Ok(a) => a,
                Err(e) => {
                    println!(r#"{{"success": false, "error": "Invalid payload: {}"}}"#, e);
                    return ExitCode::FAILURE;
                }
            };

            let request = SynthesisRequest {
                document_type,
                applicant,
                issued_at,
            };

            match pipeline.synthesize(&request) {
                Ok(issued) => {
                    let verdict = pipeline.responder().verify_by_number(&issued.document_number);
                    let output = serde_json::json!({
                        "success": true,
                        "document": issued,
                        "verdict": verdict,
                    });
                    println!("{}", serde_json::to_string_pretty(&output).unwrap());
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    let output = serde_json::json!({
                        "success": false,
                        "error": e.to_string(),
                    });
                    println!("{}", serde_json::to_string(&output).unwrap());
                    match e {
                        SynthesisError::Validation(_) => ExitCode::from(2),
                        _ => ExitCode::FAILURE,
                    }
                }
            }
        }

        Commands::Preview {
            document_type,
            payload,
            issued_at,
            number,
        } => {
            let applicant: ApplicantRecord = match serde_json::from_str(&payload) {
                Ok(a) => a,
                Err(e) => {
                    println!(r#"{{"success": false, "error": "Invalid payload: {}"}}"#, e);
                    return ExitCode::FAILURE;
                }
            };

            let request = SynthesisRequest {
                document_type,
                applicant,
                issued_at,
            };

            match pipeline.preview(&request, &number) {
                Ok(instructions) => {
                    println!("{}", serde_json::to_string_pretty(&instructions).unwrap());
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    println!(r#"{{"success": false, "error": "{}"}}"#, e);
                    match e {
                        SynthesisError::Validation(_) => ExitCode::from(2),
                        _ => ExitCode::FAILURE,
                    }
                }
            }
        }

        Commands::CheckRecord { payload } => {
            let record: VerificationRecord = match serde_json::from_str(&payload) {
                Ok(r) => r,
                Err(e) => {
                    println!(r#"{{"valid": false, "error": "Invalid payload: {}"}}"#, e);
                    return ExitCode::FAILURE;
                }
            };

            let verdict = match canonicalize(
                &record.document_number,
                record.document_type,
                &record.applicant,
                record.issued_at,
            ) {
                Ok(p) => config.signing_key.verify(&p, &record.signature),
                Err(_) => false,
            };

            println!(
                "{}",
                serde_json::json!({
                    "valid": verdict,
                    "documentNumber": record.document_number,
                })
            );
            if verdict {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            }
        }
    }
}
