use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use docqa_rag::llama::LlamaServerModel;
use docqa_rag::openai::OpenAiCompatEmbeddingProvider;
use docqa_rag::pipeline::IngestReport;
use docqa_rag::{
    AnswerGenerator, InMemoryVectorStore, QueryOutcome, RagError, RagPipeline, VectorStore,
};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{info, warn};

use crate::cli::{Cli, Command, Settings};

const NO_MATCHES: &str = "No matching content found in the indexed documents.";

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let pipeline = build_pipeline(&cli.settings).await?;
    let out = Output { json: cli.json };

    let indexed = ingest_all(&pipeline, cli.command.files(), &out).await;
    info!(files = cli.command.files().len(), indexed, "indexing finished");

    match cli.command {
        Command::Index { .. } => {}
        Command::Ask { question, .. } => {
            let outcome = pipeline.ask(&question).await?;
            out.outcome(&outcome)?;
        }
        Command::Chat { .. } => chat(&pipeline, &out).await?,
    }
    Ok(())
}

/// Wire the HTTP embedder, llama.cpp model and vector store into a pipeline.
pub async fn build_pipeline(settings: &Settings) -> anyhow::Result<RagPipeline> {
    let config = settings.rag_config().context("invalid settings")?;

    let mut embedder = OpenAiCompatEmbeddingProvider::new(&settings.embed_url)?
        .with_model(&settings.embed_model)
        .with_dimensions(settings.dimensions);
    if let Some(key) = &settings.embed_api_key {
        embedder = embedder.with_api_key(key);
    }
    let model = LlamaServerModel::new(&settings.llm_url)?;

    let pipeline = RagPipeline::builder()
        .config(config)
        .embedding_provider(Arc::new(embedder))
        .vector_store(vector_store(settings)?)
        .generator(AnswerGenerator::new(Arc::new(model)))
        .build()?;

    pipeline
        .init()
        .await
        .with_context(|| format!("could not open collection '{}'", settings.collection))?;
    Ok(pipeline)
}

#[cfg(feature = "qdrant")]
fn vector_store(settings: &Settings) -> anyhow::Result<Arc<dyn VectorStore>> {
    use docqa_rag::qdrant::QdrantVectorStore;

    Ok(match &settings.qdrant_url {
        Some(url) => Arc::new(QdrantVectorStore::new(url)?),
        None => Arc::new(InMemoryVectorStore::new()),
    })
}

#[cfg(not(feature = "qdrant"))]
fn vector_store(_settings: &Settings) -> anyhow::Result<Arc<dyn VectorStore>> {
    Ok(Arc::new(InMemoryVectorStore::new()))
}

/// Ingest every file, reporting each one. Returns how many succeeded.
async fn ingest_all(pipeline: &RagPipeline, files: &[PathBuf], out: &Output) -> usize {
    let mut indexed = 0;
    for path in files {
        match pipeline.ingest_file(path).await {
            Ok(report) => {
                indexed += 1;
                out.indexed(&report);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping file");
                out.failed(path, &e);
            }
        }
    }
    indexed
}

async fn chat(pipeline: &RagPipeline, out: &Output) -> anyhow::Result<()> {
    let mut editor = DefaultEditor::new()?;
    println!("Ask a question about your documents (exit, quit or Ctrl-D to leave).");

    loop {
        let line = match editor.readline("docqa> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if is_exit(question) {
            break;
        }
        editor.add_history_entry(question)?;

        match pipeline.ask(question).await {
            Ok(outcome) => out.outcome(&outcome)?,
            Err(e) => eprintln!("Error: {e}"),
        }
    }
    Ok(())
}

fn is_exit(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}

/// User-facing messages, as plain text or JSON lines.
struct Output {
    json: bool,
}

impl Output {
    fn indexed(&self, report: &IngestReport) {
        if self.json {
            println!("{}", serde_json::json!(report));
        } else {
            println!("Indexed {} chunks from {}.", report.chunk_count, report.filename);
        }
    }

    fn failed(&self, path: &Path, error: &RagError) {
        let message = failure_message(path, error);
        if self.json {
            println!("{}", serde_json::json!({ "path": path.display().to_string(), "error": message }));
        } else {
            eprintln!("{message}");
        }
    }

    fn outcome(&self, outcome: &QueryOutcome) -> anyhow::Result<()> {
        if self.json {
            println!("{}", serde_json::to_string(outcome)?);
            return Ok(());
        }
        match outcome {
            QueryOutcome::NoMatches => println!("{NO_MATCHES}"),
            QueryOutcome::Answered(answer) => {
                println!("{}\n", answer.answer);
                println!("Sources:");
                for source in &answer.sources {
                    println!(
                        "  {} page {} (chunk {}, score {:.3})",
                        source.chunk.filename(),
                        source.chunk.page(),
                        source.chunk.chunk_index(),
                        source.score
                    );
                }
                println!("\nContext:\n{}", answer.context);
            }
        }
        Ok(())
    }
}

fn failure_message(path: &Path, error: &RagError) -> String {
    match error {
        RagError::ExtractionFailed { filename, .. } => {
            format!("Failed to extract any text from {filename}.")
        }
        RagError::UnsupportedFormat { filename } => {
            format!("Unsupported file type: {filename}. Only PDF and DOCX files can be indexed.")
        }
        other => format!("Could not index {}: {other}", path.display()),
    }
}
