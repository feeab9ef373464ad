use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use paperslice::{
    config, logging,
    extraction::{DEFAULT_SUBJECT, ExtractionKind},
    processing::{
        IngestRequest, PipelineApi, PipelineService, STATUS_SUCCESS, SearchRequest, analyze_local,
        split_local, subjects_report,
    },
};
use serde::Serialize;
use serde_json::{Value, json};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(
    name = "paperslice-cli",
    about = "One-shot jobs for analyzing, splitting, extracting, and indexing exam-paper PDFs"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze a bucket PDF and store `{stem}/analysis.json`.
    Analyze {
        #[arg(long)]
        pdf_path: String,
    },
    /// Split a bucket PDF with a stored analysis.
    Split {
        #[arg(long)]
        pdf_path: String,
        #[arg(long)]
        analysis_path: String,
    },
    /// Analyze and split a bucket PDF.
    Process {
        #[arg(long)]
        pdf_path: String,
    },
    /// Analyze a local PDF, or every PDF under a local directory.
    AnalyzeLocal {
        #[arg(long)]
        input: PathBuf,
        /// JSON file for a single PDF, directory of `{stem}.json` files for a directory input.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Split a local PDF with a local analysis JSON file.
    SplitLocal {
        #[arg(long)]
        pdf: PathBuf,
        #[arg(long)]
        analysis: PathBuf,
        #[arg(long)]
        output_dir: PathBuf,
    },
    /// Extract questions from a question paper.
    ExtractQuestions {
        #[arg(long)]
        pdf_path: String,
        #[arg(long, default_value = DEFAULT_SUBJECT)]
        subject: String,
    },
    /// Extract answers from an answer key.
    ExtractAnswers {
        #[arg(long)]
        pdf_path: String,
        #[arg(long, default_value = DEFAULT_SUBJECT)]
        subject: String,
    },
    /// Extract every question paper and answer key of a split book folder.
    ExtractFolder {
        #[arg(long)]
        folder_path: String,
        #[arg(long, default_value = DEFAULT_SUBJECT)]
        subject: String,
    },
    /// List subjects accepted by the extraction commands.
    Subjects,
    /// Convert, chunk, embed, and index a PDF into its book collection.
    Ingest {
        #[arg(long)]
        pdf_path: String,
        #[arg(long)]
        book_name: String,
        #[arg(long)]
        chapter: Option<u32>,
        #[arg(long)]
        start_page: Option<u32>,
        #[arg(long)]
        end_page: Option<u32>,
        #[arg(long)]
        update_existing: bool,
    },
    /// Similarity search over a book collection.
    Search {
        #[arg(long)]
        book_name: String,
        #[arg(long)]
        query: String,
        #[arg(long)]
        chapter: Option<u32>,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        score_threshold: Option<f32>,
    },
    /// List Qdrant collections with their statistics.
    ListCollections,
}

#[tokio::main]
async fn main() {
    logging::init_tracing(true);
    let cli = Cli::parse();
    match run(cli.command).await {
        Ok(value) => print_json(&value),
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "Command failed");
            print_json(&json!({ "status": "error", "error": format!("{err:#}") }));
            std::process::exit(1);
        }
    }
}

async fn run(command: Command) -> Result<Value> {
    match command {
        Command::AnalyzeLocal { input, output } => analyze_local_input(&input, output.as_deref()),
        Command::SplitLocal {
            pdf,
            analysis,
            output_dir,
        } => {
            let files = split_local(&pdf, &analysis, &output_dir)?;
            Ok(json!({
                "status": STATUS_SUCCESS,
                "total_files": files.len(),
                "split_files": files,
                "pdf_path": pdf.display().to_string(),
            }))
        }
        Command::Subjects => to_value(subjects_report()),
        remote => run_remote(remote).await,
    }
}

async fn run_remote(command: Command) -> Result<Value> {
    config::load_config().context("failed to load configuration")?;
    let service = PipelineService::from_config().context("failed to initialize services")?;

    match command {
        Command::Analyze { pdf_path } => to_value(service.analyze(&pdf_path).await?),
        Command::Split {
            pdf_path,
            analysis_path,
        } => to_value(service.split(&pdf_path, &analysis_path).await?),
        Command::Process { pdf_path } => to_value(service.process(&pdf_path).await?),
        Command::ExtractQuestions { pdf_path, subject } => to_value(
            service
                .extract(&pdf_path, &subject, ExtractionKind::Questions)
                .await?,
        ),
        Command::ExtractAnswers { pdf_path, subject } => to_value(
            service
                .extract(&pdf_path, &subject, ExtractionKind::Answers)
                .await?,
        ),
        Command::ExtractFolder {
            folder_path,
            subject,
        } => to_value(service.extract_book_folder(&folder_path, &subject).await?),
        Command::Ingest {
            pdf_path,
            book_name,
            chapter,
            start_page,
            end_page,
            update_existing,
        } => to_value(
            service
                .ingest(IngestRequest {
                    pdf_path,
                    book_name,
                    chapter,
                    start_page,
                    end_page,
                    update_existing,
                })
                .await?,
        ),
        Command::Search {
            book_name,
            query,
            chapter,
            limit,
            score_threshold,
        } => to_value(
            service
                .search(SearchRequest {
                    query,
                    book_name,
                    chapter,
                    limit,
                    score_threshold,
                })
                .await?,
        ),
        Command::ListCollections => to_value(service.list_collections().await?),
        Command::AnalyzeLocal { .. } | Command::SplitLocal { .. } | Command::Subjects => {
            bail!("command does not use remote services")
        }
    }
}

fn analyze_local_input(input: &Path, output: Option<&Path>) -> Result<Value> {
    if input.is_file() {
        let analysis = analyze_local(input, output)?;
        return Ok(json!({ "status": STATUS_SUCCESS, "analysis_result": analysis }));
    }
    if !input.is_dir() {
        bail!("input path does not exist: {}", input.display());
    }

    if let Some(output) = output {
        std::fs::create_dir_all(output)
            .with_context(|| format!("failed to create {}", output.display()))?;
    }
    let mut results = Vec::new();
    for entry in WalkDir::new(input).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        let is_pdf = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if !entry.file_type().is_file() || !is_pdf {
            continue;
        }
        let target = output.map(|dir| {
            let stem = path.file_stem().map(|stem| stem.to_string_lossy().into_owned());
            dir.join(format!("{}.json", stem.unwrap_or_default()))
        });
        match analyze_local(path, target.as_deref()) {
            Ok(analysis) => results.push(json!({
                "pdf": path.display().to_string(),
                "status": STATUS_SUCCESS,
                "boundaries": analysis.boundaries.len(),
                "confidence": analysis.confidence,
            })),
            Err(err) => {
                tracing::warn!(pdf = %path.display(), error = %err, "Analysis failed");
                results.push(json!({
                    "pdf": path.display().to_string(),
                    "status": "error",
                    "error": err.to_string(),
                }));
            }
        }
    }
    Ok(json!({
        "status": STATUS_SUCCESS,
        "total_files": results.len(),
        "results": results,
    }))
}

fn to_value<T: Serialize>(report: T) -> Result<Value> {
    serde_json::to_value(report).context("failed to serialize result")
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(err) => eprintln!("error: {err}"),
    }
}
