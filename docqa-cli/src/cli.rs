use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use docqa_rag::config::{DEFAULT_COLLECTION, DEFAULT_DIMENSIONS};
use docqa_rag::llama::DEFAULT_LLAMA_URL;
use docqa_rag::openai::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use docqa_rag::{RagConfig, Result};

#[derive(Parser, Debug)]
#[command(name = "docqa", about = "Ask questions about PDF and Word documents with a local model", version)]
pub struct Cli {
    #[command(flatten)]
    pub settings: Settings,

    /// Emit logs and results as JSON lines
    #[arg(long, global = true, env = "DOCQA_JSON")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Index the files, then answer one question
    Ask {
        /// PDF or DOCX file to index (repeatable)
        #[arg(short, long = "file", required = true)]
        files: Vec<PathBuf>,
        /// The question to answer
        question: String,
    },

    /// Index the files, then answer questions interactively
    Chat {
        /// PDF or DOCX file to index (repeatable)
        #[arg(short, long = "file", required = true)]
        files: Vec<PathBuf>,
    },

    /// Index the files and report chunk counts
    Index {
        /// PDF or DOCX file to index (repeatable)
        #[arg(short, long = "file", required = true)]
        files: Vec<PathBuf>,
    },
}

impl Command {
    pub fn files(&self) -> &[PathBuf] {
        match self {
            Command::Ask { files, .. } | Command::Chat { files } | Command::Index { files } => files,
        }
    }
}

/// Collection, retrieval and backend settings shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct Settings {
    /// Vector collection name
    #[arg(long, global = true, env = "DOCQA_COLLECTION", default_value = DEFAULT_COLLECTION)]
    pub collection: String,

    /// Embedding dimensionality; must match the embedding model
    #[arg(long, global = true, env = "DOCQA_DIMENSIONS", default_value_t = DEFAULT_DIMENSIONS)]
    pub dimensions: usize,

    /// Words per chunk
    #[arg(long, global = true, env = "DOCQA_CHUNK_SIZE", default_value_t = 300)]
    pub chunk_size: usize,

    /// Words shared by consecutive chunks
    #[arg(long, global = true, env = "DOCQA_OVERLAP", default_value_t = 50)]
    pub overlap: usize,

    /// Chunks retrieved per question
    #[arg(long, global = true, env = "DOCQA_TOP_K", default_value_t = 5)]
    pub top_k: usize,

    /// Token budget for each answer
    #[arg(long, global = true, env = "DOCQA_MAX_TOKENS", default_value_t = 256)]
    pub max_tokens: usize,

    /// Drop retrieved chunks scoring below this value
    #[arg(long, global = true, env = "DOCQA_MIN_SCORE")]
    pub min_score: Option<f32>,

    /// Base URL of an OpenAI-compatible embeddings API
    #[arg(long, global = true, env = "DOCQA_EMBED_URL", default_value = DEFAULT_BASE_URL)]
    pub embed_url: String,

    /// Embedding model name
    #[arg(long, global = true, env = "DOCQA_EMBED_MODEL", default_value = DEFAULT_MODEL)]
    pub embed_model: String,

    /// Bearer token for the embeddings API
    #[arg(long, global = true, env = "DOCQA_EMBED_API_KEY", hide_env_values = true)]
    pub embed_api_key: Option<String>,

    /// Base URL of a llama.cpp server
    #[arg(long, global = true, env = "DOCQA_LLM_URL", default_value = DEFAULT_LLAMA_URL)]
    pub llm_url: String,

    /// Qdrant gRPC URL; the in-memory store is used when unset
    #[cfg(feature = "qdrant")]
    #[arg(long, global = true, env = "DOCQA_QDRANT_URL")]
    pub qdrant_url: Option<String>,
}

impl Settings {
    /// Validate the flags into a [`RagConfig`].
    pub fn rag_config(&self) -> Result<RagConfig> {
        let mut builder = RagConfig::builder()
            .collection(&self.collection)
            .dimensions(self.dimensions)
            .chunk_size(self.chunk_size)
            .chunk_overlap(self.overlap)
            .top_k(self.top_k)
            .max_tokens(self.max_tokens);
        if let Some(min_score) = self.min_score {
            builder = builder.similarity_threshold(min_score);
        }
        builder.build()
    }
}
