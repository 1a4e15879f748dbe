//! End-to-end coverage of the memory pipeline: parse raw records, build the
//! vector index, retrieve owner-scoped context, and compose the prompt.

use mnemo_memory::{
    index_memories, retrieve_context, MemoryParser, RetrievalOptions, TextEmbedder, VectorIndex,
    DEFAULT_OWNER_PREFIX,
};
use mnemo_prompt::{compose_personalized_prompt, PromptContext};

fn raw_memories() -> Vec<String> {
    vec![
        "user-1: \"Loves sci-fi movies\"".to_string(),
        "user-2: \"Prefers tea over coffee\"".to_string(),
        "random text".to_string(),
    ]
}

fn build_index(raw: &[String]) -> VectorIndex {
    let parser = MemoryParser::new(DEFAULT_OWNER_PREFIX).expect("parser");
    let parsed = parser.parse_memories(raw);
    let mut index = VectorIndex::new(TextEmbedder::Hash { dimensions: 128 });
    index_memories(&mut index, &parsed).expect("ingest");
    index
}

fn options(threshold: f32) -> RetrievalOptions {
    RetrievalOptions {
        top_k: 3,
        threshold,
        ..RetrievalOptions::default()
    }
}

#[test]
fn integration_unmatched_records_are_dropped_before_indexing() {
    let index = build_index(&raw_memories());
    assert_eq!(index.len(), 2);
}

#[test]
fn integration_pipeline_grounds_answer_in_owned_memories() {
    let index = build_index(&raw_memories());

    let query = "What sci-fi movies would I enjoy?";
    let context = retrieve_context(query, &index, "user-1", &options(0.3)).expect("retrieve");

    assert_eq!(context.len(), 1);
    assert_eq!(context[0].memory, "Loves sci-fi movies");
    assert_eq!(context[0].owner, "user-1");
    assert!(context[0].similarity >= 0.3);

    let prompt = compose_personalized_prompt(query, &PromptContext::Retrieved(context));
    assert!(prompt.contains("- Loves sci-fi movies"));
    assert!(prompt.contains(query));
    assert!(!prompt.contains("Prefers tea over coffee"));
}

#[test]
fn integration_retrieval_never_crosses_owner_boundaries() {
    let index = build_index(&raw_memories());

    let for_tea_owner =
        retrieve_context("tea over coffee", &index, "user-2", &options(0.0)).expect("retrieve");
    assert!(!for_tea_owner.is_empty());
    assert!(for_tea_owner
        .iter()
        .all(|item| item.owner == "user-2" && item.memory != "Loves sci-fi movies"));

    let for_movie_owner =
        retrieve_context("tea over coffee", &index, "user-1", &options(0.0)).expect("retrieve");
    assert!(for_movie_owner
        .iter()
        .all(|item| item.memory != "Prefers tea over coffee"));
}

#[test]
fn integration_empty_retrieval_falls_back_to_ungrounded_prompt() {
    let index = build_index(&raw_memories());

    let query = "completely unrelated zxqv topic";
    let context = retrieve_context(query, &index, "user-1", &options(0.99)).expect("retrieve");
    assert!(context.is_empty());

    let prompt = compose_personalized_prompt(query, &PromptContext::Retrieved(context));
    assert!(prompt.contains(query));
    assert!(!prompt.contains("Relevant Memories:"));
    assert!(prompt.contains("If you don't know the answer, just say you don't know."));
}

#[test]
fn integration_threshold_tightening_only_shrinks_results() {
    let index = build_index(&raw_memories());

    let query = "sci-fi movies";
    let loose = retrieve_context(query, &index, "user-1", &options(0.0)).expect("retrieve");
    let strict = retrieve_context(query, &index, "user-1", &options(0.6)).expect("retrieve");

    assert!(strict.len() <= loose.len());
    for item in &strict {
        assert!(item.similarity >= 0.6);
        assert!(loose.iter().any(|candidate| candidate.memory == item.memory));
    }
}

#[test]
fn integration_result_size_never_exceeds_top_k() {
    let parser = MemoryParser::new(DEFAULT_OWNER_PREFIX).expect("parser");
    let raw = (0..8)
        .map(|position| format!("user-1: \"Enjoys long walks variant {position}\""))
        .collect::<Vec<_>>();
    let parsed = parser.parse_memories(&raw);
    let mut index = VectorIndex::new(TextEmbedder::Hash { dimensions: 128 });
    index_memories(&mut index, &parsed).expect("ingest");

    let retrieved = retrieve_context(
        "long walks",
        &index,
        "user-1",
        &RetrievalOptions {
            top_k: 3,
            threshold: 0.0,
            ..RetrievalOptions::default()
        },
    )
    .expect("retrieve");
    assert!(retrieved.len() <= 3);
}
