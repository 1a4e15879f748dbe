//! Prompt construction for memory-grounded answers.
//!
//! Builds the exact text handed to the generation service: a grounded
//! template when retrieved context exists, an ungrounded one when it does
//! not. Composition is deterministic and calls no external service.

use mnemo_memory::RetrievedMemory;

/// Context handed to the composer: structured retrieval output, or plain
/// fact strings for callers that produced context some other way.
#[derive(Debug, Clone, PartialEq)]
pub enum PromptContext {
    Retrieved(Vec<RetrievedMemory>),
    Facts(Vec<String>),
}

impl PromptContext {
    pub fn is_empty(&self) -> bool {
        match self {
            PromptContext::Retrieved(items) => items.is_empty(),
            PromptContext::Facts(facts) => facts.is_empty(),
        }
    }

    /// Extracts the fact text from each item; similarity and owner metadata
    /// have already served their filtering purpose upstream.
    pub fn fact_texts(&self) -> Vec<&str> {
        match self {
            PromptContext::Retrieved(items) => {
                items.iter().map(|item| item.memory.as_str()).collect()
            }
            PromptContext::Facts(facts) => facts.iter().map(String::as_str).collect(),
        }
    }
}

impl From<Vec<RetrievedMemory>> for PromptContext {
    fn from(items: Vec<RetrievedMemory>) -> Self {
        PromptContext::Retrieved(items)
    }
}

impl From<Vec<String>> for PromptContext {
    fn from(facts: Vec<String>) -> Self {
        PromptContext::Facts(facts)
    }
}

/// Builds the prompt for `query`, grounding it in `context` when present.
///
/// Template text is fixed; only the query and the fact bullet list are
/// interpolated. Identical inputs always produce identical output.
pub fn compose_personalized_prompt(query: &str, context: &PromptContext) -> String {
    if context.is_empty() {
        return format!(
            "You are an assistant. Answer the following user query thoughtfully.\n\
             \n\
             User Query:\n\
             {query}\n\
             \n\
             Instructions:\n\
             - Do not make up information about the user.\n\
             - If you don't know the answer, just say you don't know.\n\
             - Be clear, concise, and helpful.\n"
        );
    }

    let memory_list = context
        .fact_texts()
        .iter()
        .map(|fact| format!("- {fact}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are a personalized assistant. Use the following personal context \
         to tailor your answer to the user. The memories are facts about the \
         user and should be respected when crafting the response.\n\
         \n\
         Relevant Memories:\n\
         {memory_list}\n\
         \n\
         User Query:\n\
         {query}\n\
         \n\
         Instructions:\n\
         - Ground your response in the provided memories.\n\
         - If the context seems relevant, weave it naturally into your answer.\n\
         - If the memories are not relevant, ignore them and answer normally.\n\
         - Do not make up information about the user.\n\
         - If you don't know the answer, just say you don't know.\n\
         - Be clear, concise, and helpful.\n"
    )
}
