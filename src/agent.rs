//! Single-pass retrieve-then-generate agent.
//!
//! Not a planner: the executor always runs exactly one retrieval step
//! followed by one generation step, and records an ordered trace of what
//! it did (`plan`, `tool_call`, `answer`). Tools are capability objects
//! with a name, a description, and a `run` method, registered by name in
//! a [`ToolRegistry`] so new tools can be added without touching the
//! executor.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::llm::GenerationProvider;
use crate::models::{AgentResult, AgentStep, SearchMatch};
use crate::search::SearchEngine;

/// Upper bound on chunks the agent may retrieve in one run.
pub const MAX_CHUNKS_CEILING: usize = 20;

/// A capability the agent can invoke by name.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    /// One-line description used for discovery.
    fn description(&self) -> &str;

    /// Execute the tool with a JSON object input.
    async fn run(&self, input: Value) -> Result<Value>;
}

/// Tools keyed by name.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn find(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Searches stored document chunks for context relevant to a query.
pub struct DocumentSearchTool {
    engine: Arc<SearchEngine>,
}

impl DocumentSearchTool {
    pub const NAME: &'static str = "document_search";

    pub fn new(engine: Arc<SearchEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl Tool for DocumentSearchTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Searches stored document chunks for helpful context. \
         Input: {\"query\": string, \"limit\": int}. \
         Returns: {\"matches\": [{document_id, chunk_index, content}]}."
    }

    async fn run(&self, input: Value) -> Result<Value> {
        let query = input
            .get("query")
            .and_then(Value::as_str)
            .unwrap_or("")
            .trim()
            .to_string();
        if query.is_empty() {
            return Ok(json!({ "matches": [] }));
        }

        let limit = input
            .get("limit")
            .and_then(Value::as_u64)
            .map(|l| l as usize)
            .unwrap_or(5);

        let matches = self.engine.search_by_vector(&query, limit).await?;
        Ok(json!({ "matches": matches }))
    }
}

/// Fixed plan → retrieve → answer executor.
pub struct SimpleAgent {
    llm: Arc<dyn GenerationProvider>,
    tools: ToolRegistry,
}

impl SimpleAgent {
    pub fn new(llm: Arc<dyn GenerationProvider>, tools: ToolRegistry) -> Self {
        Self { llm, tools }
    }

    /// Run the pipeline for `goal`, retrieving at most `max_chunks` chunks
    /// (clamped to `[1, 20]`).
    ///
    /// Fails with a validation error on a blank goal *before* any retrieval
    /// happens. The returned trace is always ordered `plan`, `tool_call`,
    /// `answer`.
    pub async fn execute(&self, goal: &str, max_chunks: usize) -> Result<AgentResult> {
        let goal = goal.trim();
        if goal.is_empty() {
            return Err(Error::validation("goal must not be empty"));
        }
        let max_chunks = max_chunks.clamp(1, MAX_CHUNKS_CEILING);

        let mut steps: Vec<AgentStep> = Vec::with_capacity(3);
        steps.push(AgentStep::note(
            "plan",
            "Analyze goal and decide which tool to call.",
        ));

        let mut matches: Vec<SearchMatch> = Vec::new();
        if let Some(tool) = self.tools.find(DocumentSearchTool::NAME) {
            let tool_input = json!({ "query": goal, "limit": max_chunks });
            let tool_output = tool.run(tool_input.clone()).await?;
            if let Some(found) = tool_output.get("matches") {
                matches = serde_json::from_value(found.clone()).map_err(Error::upstream)?;
            }
            steps.push(AgentStep {
                kind: "tool_call".to_string(),
                message: "Ran document_search to retrieve relevant chunks.".to_string(),
                tool_name: Some(tool.name().to_string()),
                tool_input: Some(tool_input),
                // Match count only; full content would bloat the trace.
                tool_output: Some(json!({ "match_count": matches.len() })),
            });
        }

        let prompt = build_prompt(goal, &matches, max_chunks);
        let response = self.llm.complete(&prompt).await?;
        steps.push(AgentStep::note(
            "answer",
            "Produced a final answer using the language model.",
        ));

        Ok(AgentResult {
            answer: response.text,
            steps,
        })
    }
}

/// Build the generation prompt: context-grounded when matches exist, a
/// "nothing found" instruction otherwise. Each chunk is tagged with its
/// document id and chunk index so the answer can cite them.
fn build_prompt(goal: &str, matches: &[SearchMatch], max_chunks: usize) -> String {
    let context_lines: Vec<String> = matches
        .iter()
        .take(max_chunks)
        .map(|m| format!("[{}#{}] {}", m.document_id, m.chunk_index, m.content))
        .collect();

    if context_lines.is_empty() {
        format!(
            "You are an AI agent, but document search returned no context.\n\
             Explain that no documents match yet and suggest what the user could upload.\n\n\
             Goal: {}",
            goal
        )
    } else {
        format!(
            "You are an AI agent with access to document search results.\n\
             Use ONLY the provided context chunks to answer the user's goal.\n\n\
             Goal: {}\n\n\
             Context:\n{}",
            goal,
            context_lines.join("\n")
        )
    }
}
