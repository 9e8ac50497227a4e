//! End-to-end ingest and ask flows over the in-memory store.

mod common;

use std::sync::Arc;

use docqa_rag::{
    AnswerGenerator, Distance, HashEmbeddingProvider, InMemoryVectorStore, LanguageModel,
    QueryOutcome, RagConfig, RagError, RagPipeline, VectorStore,
};

use common::{
    FailingEmbedder, FailingModel, RecordingModel, docx_bytes, pdf_bytes, pdf_with_pages, words,
};

const DIM: usize = 32;

fn config() -> RagConfig {
    RagConfig::builder().dimensions(DIM).chunk_size(10).chunk_overlap(2).top_k(3).build().unwrap()
}

fn pipeline_with(
    store: Arc<InMemoryVectorStore>,
    model: Arc<dyn LanguageModel>,
) -> RagPipeline {
    RagPipeline::builder()
        .config(config())
        .embedding_provider(Arc::new(HashEmbeddingProvider::new(DIM)))
        .vector_store(store)
        .generator(AnswerGenerator::new(model))
        .build()
        .unwrap()
}

#[tokio::test]
async fn docx_ingest_reports_chunks_and_stores_them() {
    let store = Arc::new(InMemoryVectorStore::new());
    let pipeline = pipeline_with(store.clone(), Arc::new(RecordingModel::new("ok")));

    // 26 words at 10/2: ceil(24 / 8) = 3 chunks.
    let bytes = docx_bytes(&[&words(26)]);
    let report = pipeline.ingest_bytes("guide.docx", &bytes).await.unwrap();

    assert_eq!(report.filename, "guide.docx");
    assert_eq!(report.pages, 1);
    assert_eq!(report.chunk_count, 3);
    assert_eq!(report.point_ids.len(), 3);
    assert_eq!(store.count("rag_docs").await.unwrap(), 3);
}

#[tokio::test]
async fn pdf_chunks_keep_their_page_numbers() {
    let store = Arc::new(InMemoryVectorStore::new());
    let pipeline = pipeline_with(store, Arc::new(RecordingModel::new("ok")));

    let bytes = pdf_bytes(&["alpha one two", "bravo three four"]);
    let report = pipeline.ingest_bytes("two.pdf", &bytes).await.unwrap();
    assert_eq!(report.pages, 2);
    assert_eq!(report.chunk_count, 2);

    let results = pipeline.retrieve("anything").await.unwrap();
    let mut pages: Vec<u32> = results.iter().map(|r| r.chunk.page()).collect();
    pages.sort_unstable();
    assert_eq!(pages, vec![1, 2]);
    assert!(results.iter().all(|r| r.chunk.filename() == "two.pdf"));
}

#[tokio::test]
async fn unreadable_pdf_page_does_not_stop_the_rest() {
    let pipeline =
        pipeline_with(Arc::new(InMemoryVectorStore::new()), Arc::new(RecordingModel::new("ok")));

    let bytes = pdf_with_pages(&[Some("delta echo foxtrot"), None]);
    let report = pipeline.ingest_bytes("partial.pdf", &bytes).await.unwrap();
    assert_eq!(report.pages, 2);
    assert_eq!(report.chunk_count, 1);
    assert_eq!(pipeline.indexed_count().await.unwrap(), 1);

    let results = pipeline.retrieve("delta").await.unwrap();
    assert_eq!(results[0].chunk.page(), 1);
    assert!(results[0].chunk.text().contains("foxtrot"));
}

#[tokio::test]
async fn exact_chunk_text_is_the_top_hit() {
    let store = Arc::new(InMemoryVectorStore::new());
    let model = Arc::new(RecordingModel::new("the answer"));
    let pipeline = pipeline_with(store, model.clone());

    let bytes = docx_bytes(&[&words(40)]);
    pipeline.ingest_bytes("long.docx", &bytes).await.unwrap();

    // Second window of 10 words starts at w8.
    let target = "w8 w9 w10 w11 w12 w13 w14 w15 w16 w17";
    let QueryOutcome::Answered(answer) = pipeline.ask(target).await.unwrap() else {
        panic!("expected an answer");
    };

    assert_eq!(answer.sources[0].chunk.text(), target);
    assert_eq!(answer.answer, "the answer");
    assert!(answer.context.starts_with(target));
    assert_eq!(model.calls(), 1);
}

#[tokio::test]
async fn empty_collection_yields_no_matches_without_calling_the_model() {
    let model = Arc::new(RecordingModel::new("unused"));
    let pipeline = pipeline_with(Arc::new(InMemoryVectorStore::new()), model.clone());

    let outcome = pipeline.ask("What is in the handbook?").await.unwrap();
    assert!(matches!(outcome, QueryOutcome::NoMatches));
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn unsupported_upload_stores_nothing() {
    let pipeline =
        pipeline_with(Arc::new(InMemoryVectorStore::new()), Arc::new(RecordingModel::new("ok")));

    let result = pipeline.ingest_bytes("notes.txt", b"plain words here").await;
    assert!(matches!(result, Err(RagError::UnsupportedFormat { .. })));
    assert_eq!(pipeline.indexed_count().await.unwrap(), 0);
}

#[tokio::test]
async fn blank_document_is_extraction_failure() {
    let pipeline =
        pipeline_with(Arc::new(InMemoryVectorStore::new()), Arc::new(RecordingModel::new("ok")));

    let bytes = docx_bytes(&["   ", ""]);
    let result = pipeline.ingest_bytes("blank.docx", &bytes).await;
    assert!(matches!(result, Err(RagError::ExtractionFailed { filename, .. }) if filename == "blank.docx"));
    assert_eq!(pipeline.indexed_count().await.unwrap(), 0);
}

#[tokio::test]
async fn embedding_failure_leaves_collection_untouched() {
    let store = Arc::new(InMemoryVectorStore::new());
    let pipeline = RagPipeline::builder()
        .config(config())
        .embedding_provider(Arc::new(FailingEmbedder { dimensions: DIM }))
        .vector_store(store.clone())
        .generator(AnswerGenerator::new(Arc::new(RecordingModel::new("ok"))))
        .build()
        .unwrap();

    let result = pipeline.ingest_bytes("guide.docx", &docx_bytes(&[&words(30)])).await;
    assert!(matches!(result, Err(RagError::EmbeddingError { .. })));
    assert_eq!(pipeline.indexed_count().await.unwrap(), 0);
}

#[tokio::test]
async fn model_failure_is_generation_error() {
    let pipeline = pipeline_with(Arc::new(InMemoryVectorStore::new()), Arc::new(FailingModel));
    pipeline.ingest_bytes("guide.docx", &docx_bytes(&[&words(12)])).await.unwrap();

    let result = pipeline.ask("w3").await;
    assert!(matches!(result, Err(RagError::GenerationError { .. })));
}

#[tokio::test]
async fn build_rejects_embedder_dimension_mismatch() {
    let result = RagPipeline::builder()
        .config(config())
        .embedding_provider(Arc::new(HashEmbeddingProvider::new(DIM * 2)))
        .vector_store(Arc::new(InMemoryVectorStore::new()))
        .generator(AnswerGenerator::new(Arc::new(RecordingModel::new("ok"))))
        .build();
    assert!(matches!(result, Err(RagError::ConfigError(_))));
}

#[tokio::test]
async fn build_requires_a_generator() {
    let result = RagPipeline::builder()
        .config(config())
        .embedding_provider(Arc::new(HashEmbeddingProvider::new(DIM)))
        .vector_store(Arc::new(InMemoryVectorStore::new()))
        .build();
    assert!(matches!(result, Err(RagError::ConfigError(_))));
}

#[tokio::test]
async fn existing_collection_with_other_dimensions_is_mismatch() {
    let store = Arc::new(InMemoryVectorStore::new());
    store.ensure_collection("rag_docs", DIM + 1, Distance::Cosine).await.unwrap();
    let pipeline = pipeline_with(store, Arc::new(RecordingModel::new("ok")));

    assert!(matches!(pipeline.init().await, Err(RagError::CollectionConfigMismatch { .. })));
    let result = pipeline.ingest_bytes("guide.docx", &docx_bytes(&[&words(5)])).await;
    assert!(matches!(result, Err(RagError::CollectionConfigMismatch { .. })));
}

#[tokio::test]
async fn uploading_the_same_file_twice_duplicates_points() {
    let pipeline =
        pipeline_with(Arc::new(InMemoryVectorStore::new()), Arc::new(RecordingModel::new("ok")));
    let bytes = docx_bytes(&[&words(18)]);

    let first = pipeline.ingest_bytes("same.docx", &bytes).await.unwrap();
    let second = pipeline.ingest_bytes("same.docx", &bytes).await.unwrap();

    assert_eq!(first.chunk_count, second.chunk_count);
    assert_eq!(pipeline.indexed_count().await.unwrap(), first.chunk_count * 2);
    assert!(first.point_ids.iter().all(|id| !second.point_ids.contains(id)));
}

#[tokio::test]
async fn prompt_carries_context_question_and_token_budget() {
    let model = Arc::new(RecordingModel::new("ok"));
    let config = RagConfig::builder()
        .dimensions(DIM)
        .chunk_size(10)
        .chunk_overlap(2)
        .top_k(2)
        .max_tokens(64)
        .build()
        .unwrap();
    let pipeline = RagPipeline::builder()
        .config(config)
        .embedding_provider(Arc::new(HashEmbeddingProvider::new(DIM)))
        .vector_store(Arc::new(InMemoryVectorStore::new()))
        .generator(AnswerGenerator::new(model.clone()))
        .build()
        .unwrap();
    pipeline.ingest_bytes("guide.docx", &docx_bytes(&[&words(30)])).await.unwrap();

    let QueryOutcome::Answered(answer) = pipeline.ask("Which words come first?").await.unwrap()
    else {
        panic!("expected an answer");
    };
    assert_eq!(answer.sources.len(), 2);
    let expected_context =
        format!("{}\n\n{}", answer.sources[0].chunk.text(), answer.sources[1].chunk.text());
    assert_eq!(answer.context, expected_context);

    let prompts = model.prompts.lock().unwrap();
    let (prompt, max_tokens) = &prompts[0];
    assert_eq!(*max_tokens, 64);
    assert!(prompt.contains(&expected_context));
    assert!(prompt.contains("Which words come first?"));
}

#[tokio::test]
async fn ingest_file_checks_extension_before_reading() {
    let pipeline =
        pipeline_with(Arc::new(InMemoryVectorStore::new()), Arc::new(RecordingModel::new("ok")));

    // The path does not exist; the extension check fires first.
    let result = pipeline.ingest_file("/nonexistent/notes.txt").await;
    assert!(matches!(result, Err(RagError::UnsupportedFormat { .. })));

    let result = pipeline.ingest_file("/nonexistent/notes.pdf").await;
    assert!(matches!(result, Err(RagError::Io(_))));
}

#[tokio::test]
async fn outcome_serializes_with_status_tag() {
    let json = serde_json::to_value(QueryOutcome::NoMatches).unwrap();
    assert_eq!(json["status"], "no_matches");
}
