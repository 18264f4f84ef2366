//! Keyoku wire types.
//!
//! Responses are decoded once here. Fields the service may omit carry an
//! explicit serde default so the rest of the crate never probes for them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

fn default_importance() -> f64 {
    0.5
}

// ─── Memories ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct RememberRequest {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    /// Custom extraction schema to run alongside memory extraction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_id: Option<String>,
}

impl RememberRequest {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            session_id: None,
            agent_id: None,
            schema_id: None,
        }
    }

    pub fn session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn agent(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    pub fn schema(mut self, schema_id: impl Into<String>) -> Self {
        self.schema_id = Some(schema_id.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

/// Background extraction job returned by `remember`.
#[derive(Debug, Clone, Deserialize)]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub memory_ids: Vec<String>,
    #[serde(default)]
    pub custom_extracted_data: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchRequest {
    pub query: String,
    pub limit: usize,
    pub mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Memory {
    pub id: String,
    pub content: String,
    #[serde(rename = "type", default)]
    pub memory_type: String,
    #[serde(default = "default_importance")]
    pub importance: f64,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SearchResponse {
    pub results: Vec<Memory>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MemoryList {
    pub memories: Vec<Memory>,
    pub total: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Stats {
    pub total_memories: u64,
    pub by_type: BTreeMap<String, u64>,
}

// ─── Knowledge graph ────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct Entity {
    pub id: String,
    pub canonical_name: String,
    #[serde(rename = "type", default)]
    pub entity_type: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EntityList {
    pub entities: Vec<Entity>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Relationship {
    #[serde(default)]
    pub id: String,
    pub source_entity_id: String,
    pub target_entity_id: String,
    pub relationship_type: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RelationshipList {
    pub relationships: Vec<Relationship>,
}

// ─── Cleanup, export, audit ─────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct CleanupSuggestion {
    pub strategy: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub count: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CleanupUsage {
    pub memories_stored: u64,
    pub memories_limit: u64,
    pub percentage: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CleanupSuggestions {
    pub suggestions: Vec<CleanupSuggestion>,
    pub usage: CleanupUsage,
}

#[derive(Debug, Clone, Serialize)]
pub struct CleanupRequest {
    pub strategy: String,
    pub limit: usize,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CleanupResult {
    pub deleted_count: u64,
    pub deleted_ids: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportJob {
    pub job_id: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuditLog {
    pub id: String,
    pub operation: String,
    #[serde(default)]
    pub resource_type: String,
    #[serde(default)]
    pub resource_id: Option<String>,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuditLogList {
    pub audit_logs: Vec<AuditLog>,
}

// ─── State schemas ──────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct StateSchema {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sharing_mode: String,
    #[serde(default)]
    pub transition_mode: String,
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub schema_definition: Value,
    #[serde(default)]
    pub transition_rules: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StateSchemaList {
    pub schemas: Vec<StateSchema>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateStateSchema {
    pub name: String,
    pub schema_definition: Value,
    pub description: String,
    pub sharing_mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition_rules: Option<Value>,
    pub transition_mode: String,
}

// ─── Agent state ────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct AgentState {
    pub id: String,
    #[serde(default)]
    pub schema_id: String,
    #[serde(default)]
    pub agent_id: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub current_data: Value,
    #[serde(default)]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StateList {
    pub states: Vec<AgentState>,
}

/// Filters for `GET /state`.
#[derive(Debug, Clone, Default)]
pub struct StateQuery {
    pub schema_id: Option<String>,
    pub session_id: Option<String>,
    pub agent_id: Option<String>,
    pub status: Option<String>,
    pub limit: Option<usize>,
}

impl StateQuery {
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(v) = &self.schema_id {
            query.push(("schema_id", v.clone()));
        }
        if let Some(v) = &self.session_id {
            query.push(("session_id", v.clone()));
        }
        if let Some(v) = &self.agent_id {
            query.push(("agent_id", v.clone()));
        }
        if let Some(v) = &self.status {
            query.push(("status", v.clone()));
        }
        if let Some(v) = self.limit {
            query.push(("limit", v.to_string()));
        }
        query
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractStateRequest {
    pub content: String,
    pub schema_id: String,
    pub session_id: String,
    pub agent_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractStateResponse {
    pub state: AgentState,
    #[serde(default)]
    pub is_new: bool,
    #[serde(default)]
    pub changed_fields: Vec<String>,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub suggested_action: Option<String>,
    #[serde(default)]
    pub validation_error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StateTransition {
    #[serde(default)]
    pub from_version: u32,
    #[serde(default)]
    pub to_version: u32,
    #[serde(default)]
    pub changed_fields: Vec<String>,
    #[serde(default)]
    pub trigger: Option<String>,
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StateHistory {
    pub transitions: Vec<StateTransition>,
}

// ─── Custom extraction schemas ──────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionSchema {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExtractionSchemaList {
    pub schemas: Vec<ExtractionSchema>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateExtractionSchema {
    pub name: String,
    pub schema: Value,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Extraction {
    pub id: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub extracted_data: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExtractionList {
    pub extractions: Vec<Extraction>,
    pub total: u64,
}
