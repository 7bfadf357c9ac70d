//! Built-in tools

pub mod knowledge;

pub use knowledge::{
    knowledge_tools, GetKnowledgeItemTool, InMemoryKnowledgeSource, KnowledgeEntry,
    KnowledgeError, KnowledgeHit, KnowledgeQuery, KnowledgeScope, KnowledgeSource,
    ListKnowledgeTool, SearchKnowledgeTool,
};
