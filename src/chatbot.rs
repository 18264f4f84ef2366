//! Memory chat
//!
//! Retrieves relevant memories before each reply and stores the finished
//! turn afterwards. Panels (memories, entities, relationships, audit) are
//! read-only projections shaped for display.

use crate::agent::{new_session_id, preview};
use crate::config::Settings;
use crate::keyoku::{
    CleanupRequest, CleanupResult, CleanupSuggestions, KeyokuClient, PendingJob, RememberRequest,
    SearchRequest, Stats,
};
use crate::llm::{build_messages, LlmClient};
use crate::prompts::{memory_context, turn_transcript, NO_MEMORY_CONTEXT, SYSTEM_PROMPT};
use crate::Result;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// How long a reply waits for its memory job before moving on
pub const REMEMBER_WAIT: Duration = Duration::from_secs(10);
const CONTENT_PREVIEW_CHARS: usize = 100;
const ID_PREVIEW_CHARS: usize = 8;
/// Entities fetched to resolve relationship endpoint names
const ENTITY_LOOKUP_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryRow {
    pub id: String,
    /// Content capped at 100 characters
    pub content: String,
    pub memory_type: String,
    pub importance: f64,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityRow {
    pub id: String,
    pub name: String,
    pub entity_type: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipRow {
    pub source: String,
    pub relationship_type: String,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuditRow {
    pub id: String,
    pub operation: String,
    pub resource_type: String,
    pub resource_id: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportStarted {
    pub job_id: String,
    pub status: String,
}

impl ExportStarted {
    pub fn message(&self) -> String {
        format!("Export job started with ID: {}", self.job_id)
    }
}

/// Chatbot with Keyoku-backed persistent memory
pub struct KeyokuChatbot {
    keyoku: KeyokuClient,
    llm: LlmClient,
    session_id: String,
    agent_id: String,
    search_limit: usize,
    search_mode: String,
}

impl KeyokuChatbot {
    pub fn new(settings: &Settings) -> Result<Self> {
        Ok(Self {
            keyoku: KeyokuClient::new(&settings.keyoku_base_url, &settings.keyoku_api_key)?,
            llm: LlmClient::new(settings)?,
            session_id: settings
                .session_id
                .clone()
                .unwrap_or_else(|| new_session_id("session")),
            agent_id: settings.agent_id.clone(),
            search_limit: settings.search_limit,
            search_mode: settings.search_mode.clone(),
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn client(&self) -> &KeyokuClient {
        &self.keyoku
    }

    /// Start a fresh memory session.
    pub fn new_session(&mut self) -> &str {
        self.session_id = new_session_id("session");
        &self.session_id
    }

    /// Submit content for background extraction in this session.
    pub async fn remember(&self, content: &str) -> Result<PendingJob> {
        let request = RememberRequest::new(content)
            .session(self.session_id.as_str())
            .agent(self.agent_id.as_str());
        self.keyoku.remember(&request).await
    }

    /// Like `remember`, also running the custom extraction schema `schema_id`.
    pub async fn remember_with_schema(&self, content: &str, schema_id: &str) -> Result<PendingJob> {
        let request = RememberRequest::new(content)
            .session(self.session_id.as_str())
            .agent(self.agent_id.as_str())
            .schema(schema_id);
        self.keyoku.remember(&request).await
    }

    /// Build the memory context block for `query`.
    async fn retrieve_relevant_memories(&self, query: &str) -> String {
        let request = SearchRequest {
            query: query.to_string(),
            limit: self.search_limit,
            mode: self.search_mode.clone(),
            agent_id: Some(self.agent_id.clone()),
        };
        match self.keyoku.search(&request).await {
            Ok(results) if results.is_empty() => NO_MEMORY_CONTEXT.to_string(),
            Ok(results) => {
                let lines: Vec<String> = results
                    .iter()
                    .enumerate()
                    .map(|(i, mem)| {
                        format!("{}. {} (importance: {:.2})", i + 1, mem.content, mem.importance)
                    })
                    .collect();
                memory_context(&lines.join("\n"))
            }
            Err(e) => format!("Could not retrieve memories: {e}"),
        }
    }

    /// Reply to `message`, then store the turn as memory.
    ///
    /// Storage failures and slow jobs are logged; the reply is returned either way.
    pub async fn chat(&self, message: &str, history: &[(String, String)]) -> String {
        let context = self.retrieve_relevant_memories(message).await;
        let messages = build_messages(&[SYSTEM_PROMPT, context.as_str()], history, message);

        let reply = match self.llm.complete(&messages).await {
            Ok(reply) => reply,
            Err(e) => return format!("Error generating response: {e}"),
        };

        self.store_turn(message, &reply).await;
        reply
    }

    async fn store_turn(&self, message: &str, reply: &str) {
        let stored = match self.remember(&turn_transcript(message, reply)).await {
            Ok(job) => job.wait(REMEMBER_WAIT).await,
            Err(e) => Err(e),
        };
        match stored {
            Ok(job) => debug!("Stored turn as job {}", job.id),
            Err(e) if e.is_timeout() => warn!("Memory processing timed out, continuing..."),
            Err(e) => warn!("Failed to store memory: {}", e),
        }
    }

    pub async fn stats(&self) -> Result<Stats> {
        self.keyoku.stats().await
    }

    pub async fn memories(&self, limit: usize) -> Result<Vec<MemoryRow>> {
        let list = self
            .keyoku
            .list_memories(limit, Some(&self.agent_id))
            .await?;
        Ok(list
            .memories
            .into_iter()
            .map(|mem| MemoryRow {
                id: mem.id,
                content: preview(&mem.content, CONTENT_PREVIEW_CHARS),
                memory_type: mem.memory_type,
                importance: mem.importance,
                created_at: mem.created_at.unwrap_or_default(),
            })
            .collect())
    }

    pub async fn entities(&self, limit: usize) -> Result<Vec<EntityRow>> {
        let entities = self.keyoku.list_entities(limit).await?;
        Ok(entities
            .into_iter()
            .map(|e| EntityRow {
                id: e.id,
                name: e.canonical_name,
                entity_type: e.entity_type,
            })
            .collect())
    }

    /// Relationships with endpoint ids resolved to entity names where known.
    pub async fn relationships(&self, limit: usize) -> Result<Vec<RelationshipRow>> {
        let entities = self.keyoku.list_entities(ENTITY_LOOKUP_LIMIT).await?;
        let names: HashMap<String, String> = entities
            .into_iter()
            .map(|e| (e.id, e.canonical_name))
            .collect();

        let resolve = |id: &str| {
            names
                .get(id)
                .cloned()
                .unwrap_or_else(|| short_id(id))
        };

        let relationships = self.keyoku.list_relationships(limit).await?;
        Ok(relationships
            .into_iter()
            .map(|r| RelationshipRow {
                source: resolve(&r.source_entity_id),
                relationship_type: r.relationship_type,
                target: resolve(&r.target_entity_id),
            })
            .collect())
    }

    pub async fn cleanup_suggestions(&self) -> Result<CleanupSuggestions> {
        self.keyoku.cleanup_suggestions().await
    }

    pub async fn execute_cleanup(
        &self,
        strategy: &str,
        limit: usize,
        dry_run: bool,
    ) -> Result<CleanupResult> {
        let request = CleanupRequest {
            strategy: strategy.to_string(),
            limit,
            dry_run,
        };
        self.keyoku.execute_cleanup(&request).await
    }

    pub async fn clear_all_memories(&self) -> Result<()> {
        self.keyoku.delete_all_memories().await
    }

    pub async fn export_data(&self) -> Result<ExportStarted> {
        let job = self.keyoku.export_data().await?;
        Ok(ExportStarted {
            job_id: job.job_id,
            status: job.status,
        })
    }

    pub async fn audit_logs(&self, limit: usize) -> Result<Vec<AuditRow>> {
        let logs = self.keyoku.list_audit_logs(limit).await?;
        Ok(logs
            .into_iter()
            .map(|log| AuditRow {
                id: log.id,
                operation: log.operation,
                resource_type: log.resource_type,
                resource_id: log.resource_id.unwrap_or_default(),
                created_at: log.created_at,
            })
            .collect())
    }
}

/// First eight characters of an id, followed by `...`.
pub fn short_id(id: &str) -> String {
    let head: String = id.chars().take(ID_PREVIEW_CHARS).collect();
    format!("{head}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("0123456789abcdef"), "01234567...");
        assert_eq!(short_id("abc"), "abc...");
    }

    #[test]
    fn test_export_message() {
        let started = ExportStarted {
            job_id: "exp-1".to_string(),
            status: "pending".to_string(),
        };
        assert_eq!(started.message(), "Export job started with ID: exp-1");
    }
}
