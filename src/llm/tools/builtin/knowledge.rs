//! Knowledge-base tools
//!
//! Three capabilities over an injected [`KnowledgeSource`]: semantic search,
//! lookup by id, and listing. Every query is scoped to the caller's tenant and
//! agent as carried by the [`ToolExecutionContext`].

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::llm::tools::declaration::argument_schema;
use crate::llm::tools::error::ToolError;
use crate::llm::tools::tool::Tool;
use crate::llm::tools::types::{
    PermissionLevel, ToolCategory, ToolExecutionContext, ToolResult, ToolResultMetadata,
};

const SOURCE: &str = "knowledge_base";

/// Failure reported by a knowledge collaborator
#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("Knowledge source unavailable: {0}")]
    Unavailable(String),

    #[error("Knowledge query failed: {0}")]
    Query(String),
}

/// Tenant and agent a knowledge query is restricted to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KnowledgeScope {
    pub tenant_id: String,
    pub agent_id: String,
}

impl KnowledgeScope {
    pub fn new(tenant_id: impl Into<String>, agent_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            agent_id: agent_id.into(),
        }
    }
}

impl From<&ToolExecutionContext> for KnowledgeScope {
    fn from(context: &ToolExecutionContext) -> Self {
        Self::new(context.tenant_id.clone(), context.agent_id.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl KnowledgeEntry {
    pub fn new(id: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: content.into(),
            category: None,
            tags: Vec::new(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// A search match with its similarity in `[0, 1]`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KnowledgeHit {
    #[serde(flatten)]
    pub entry: KnowledgeEntry,
    pub similarity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgeQuery {
    pub text: String,
    pub limit: usize,
    /// Minimum similarity; the source's own default when absent
    pub threshold: Option<f64>,
}

/// Storage and retrieval of knowledge entries
///
/// How entries are embedded and stored is up to the implementation.
#[async_trait]
pub trait KnowledgeSource: Send + Sync {
    /// Best matches first, at most `query.limit`
    async fn search(
        &self,
        scope: &KnowledgeScope,
        query: &KnowledgeQuery,
    ) -> Result<Vec<KnowledgeHit>, KnowledgeError>;

    async fn get(
        &self,
        scope: &KnowledgeScope,
        id: &str,
    ) -> Result<Option<KnowledgeEntry>, KnowledgeError>;

    async fn list(
        &self,
        scope: &KnowledgeScope,
        category: Option<&str>,
        limit: usize,
    ) -> Result<Vec<KnowledgeEntry>, KnowledgeError>;
}

/// All knowledge tools, sharing one source
pub fn knowledge_tools(source: Arc<dyn KnowledgeSource>) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(SearchKnowledgeTool::new(Arc::clone(&source))),
        Arc::new(GetKnowledgeItemTool::new(Arc::clone(&source))),
        Arc::new(ListKnowledgeTool::new(source)),
    ]
}

fn parse_args<T: for<'de> Deserialize<'de>>(args: Map<String, Value>) -> Result<T, ToolError> {
    serde_json::from_value(Value::Object(args)).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

fn metadata(start: Instant) -> ToolResultMetadata {
    ToolResultMetadata {
        execution_time: start.elapsed().as_millis() as u64,
        source: SOURCE.to_string(),
        cached: false,
    }
}

fn default_search_limit() -> usize {
    5
}

fn default_list_limit() -> usize {
    20
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchKnowledgeArgs {
    /// What to search for, in natural language
    pub query: String,
    /// Maximum number of results to return
    #[serde(default = "default_search_limit")]
    pub limit: usize,
    /// Minimum similarity between 0 and 1
    pub threshold: Option<f64>,
}

/// Search the knowledge base for entries relevant to a query
pub struct SearchKnowledgeTool {
    source: Arc<dyn KnowledgeSource>,
}

impl SearchKnowledgeTool {
    pub fn new(source: Arc<dyn KnowledgeSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl Tool for SearchKnowledgeTool {
    fn name(&self) -> &str {
        "search_knowledge"
    }

    fn description(&self) -> &str {
        "Search the knowledge base for information relevant to the user's question. \
         Use this before answering questions about products, policies or documentation."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Knowledge
    }

    fn argument_schema(&self) -> Value {
        argument_schema::<SearchKnowledgeArgs>()
    }

    async fn invoke(
        &self,
        args: Map<String, Value>,
        context: &ToolExecutionContext,
    ) -> Result<ToolResult, ToolError> {
        let start = Instant::now();
        let args: SearchKnowledgeArgs = parse_args(args)?;
        if args.query.trim().is_empty() {
            return Err(ToolError::InvalidArguments("query must not be empty".to_string()));
        }

        let query = KnowledgeQuery {
            text: args.query,
            limit: args.limit.max(1),
            threshold: args.threshold,
        };
        let hits = self.source.search(&KnowledgeScope::from(context), &query).await?;

        Ok(ToolResult::ok(json!({ "count": hits.len(), "results": hits })).with_metadata(metadata(start)))
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetKnowledgeItemArgs {
    /// Identifier of the knowledge entry
    pub id: String,
}

/// Fetch a single knowledge entry by id
pub struct GetKnowledgeItemTool {
    source: Arc<dyn KnowledgeSource>,
}

impl GetKnowledgeItemTool {
    pub fn new(source: Arc<dyn KnowledgeSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl Tool for GetKnowledgeItemTool {
    fn name(&self) -> &str {
        "get_knowledge_item"
    }

    fn description(&self) -> &str {
        "Get the full content of a knowledge base entry by its id, \
         for example one returned by search_knowledge."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Knowledge
    }

    fn argument_schema(&self) -> Value {
        argument_schema::<GetKnowledgeItemArgs>()
    }

    async fn invoke(
        &self,
        args: Map<String, Value>,
        context: &ToolExecutionContext,
    ) -> Result<ToolResult, ToolError> {
        let start = Instant::now();
        let args: GetKnowledgeItemArgs = parse_args(args)?;

        let result = match self.source.get(&KnowledgeScope::from(context), &args.id).await? {
            Some(entry) => ToolResult::ok(json!(entry)),
            None => ToolResult::failure(format!("Knowledge item not found: {}", args.id)),
        };
        Ok(result.with_metadata(metadata(start)))
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListKnowledgeArgs {
    /// Only list entries in this category
    pub category: Option<String>,
    /// Maximum number of entries to return
    #[serde(default = "default_list_limit")]
    pub limit: usize,
}

/// List knowledge entries, optionally by category
pub struct ListKnowledgeTool {
    source: Arc<dyn KnowledgeSource>,
}

impl ListKnowledgeTool {
    pub fn new(source: Arc<dyn KnowledgeSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl Tool for ListKnowledgeTool {
    fn name(&self) -> &str {
        "list_knowledge"
    }

    fn description(&self) -> &str {
        "List the entries available in the knowledge base, optionally filtered by category."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Knowledge
    }

    fn permission(&self) -> PermissionLevel {
        PermissionLevel::Authenticated
    }

    fn argument_schema(&self) -> Value {
        argument_schema::<ListKnowledgeArgs>()
    }

    async fn invoke(
        &self,
        args: Map<String, Value>,
        context: &ToolExecutionContext,
    ) -> Result<ToolResult, ToolError> {
        let start = Instant::now();
        let args: ListKnowledgeArgs = parse_args(args)?;

        let items = self
            .source
            .list(&KnowledgeScope::from(context), args.category.as_deref(), args.limit.max(1))
            .await?;

        Ok(ToolResult::ok(json!({ "count": items.len(), "items": items })).with_metadata(metadata(start)))
    }
}

/// Knowledge source held in memory, scored by keyword overlap
///
/// Similarity is the share of distinct query terms found in an entry's title,
/// content or tags.
#[derive(Debug, Default)]
pub struct InMemoryKnowledgeSource {
    entries: Vec<(KnowledgeScope, KnowledgeEntry)>,
}

impl InMemoryKnowledgeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, scope: KnowledgeScope, entry: KnowledgeEntry) {
        self.entries.retain(|(s, e)| !(s == &scope && e.id == entry.id));
        self.entries.push((scope, entry));
    }

    pub fn with_entry(mut self, scope: KnowledgeScope, entry: KnowledgeEntry) -> Self {
        self.insert(scope, entry);
        self
    }

    fn scoped<'a>(&'a self, scope: &'a KnowledgeScope) -> impl Iterator<Item = &'a KnowledgeEntry> + 'a {
        self.entries
            .iter()
            .filter(move |(s, _)| s == scope)
            .map(|(_, entry)| entry)
    }
}

fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|term| !term.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn similarity(query_terms: &HashSet<String>, entry: &KnowledgeEntry) -> f64 {
    if query_terms.is_empty() {
        return 0.0;
    }
    let mut haystack = terms(&entry.title);
    haystack.extend(terms(&entry.content));
    for tag in &entry.tags {
        haystack.extend(terms(tag));
    }

    let matched = query_terms.iter().filter(|term| haystack.contains(*term)).count();
    matched as f64 / query_terms.len() as f64
}

#[async_trait]
impl KnowledgeSource for InMemoryKnowledgeSource {
    async fn search(
        &self,
        scope: &KnowledgeScope,
        query: &KnowledgeQuery,
    ) -> Result<Vec<KnowledgeHit>, KnowledgeError> {
        let query_terms = terms(&query.text);
        let threshold = query.threshold.unwrap_or(0.0);

        let mut hits: Vec<KnowledgeHit> = self
            .scoped(scope)
            .map(|entry| KnowledgeHit {
                similarity: similarity(&query_terms, entry),
                entry: entry.clone(),
            })
            .filter(|hit| hit.similarity > 0.0 && hit.similarity >= threshold)
            .collect();

        hits.sort_by(|a, b| {
            b.similarity
                .total_cmp(&a.similarity)
                .then_with(|| a.entry.id.cmp(&b.entry.id))
        });
        hits.truncate(query.limit);
        Ok(hits)
    }

    async fn get(
        &self,
        scope: &KnowledgeScope,
        id: &str,
    ) -> Result<Option<KnowledgeEntry>, KnowledgeError> {
        Ok(self.scoped(scope).find(|entry| entry.id == id).cloned())
    }

    async fn list(
        &self,
        scope: &KnowledgeScope,
        category: Option<&str>,
        limit: usize,
    ) -> Result<Vec<KnowledgeEntry>, KnowledgeError> {
        Ok(self
            .scoped(scope)
            .filter(|entry| category.map_or(true, |c| entry.category.as_deref() == Some(c)))
            .take(limit)
            .cloned()
            .collect())
    }
}
