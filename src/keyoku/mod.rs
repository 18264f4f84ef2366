//! Keyoku API client
//!
//! A thin REST client for the Keyoku memory service. Every method maps to a
//! single endpoint under `{base_url}/v1` and is attempted exactly once.

mod job;
pub mod types;

pub use job::{PendingJob, JOB_POLL_INTERVAL};
pub use types::*;

use crate::http::{build_client, check_response_status, map_reqwest_error};
use crate::Result;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

/// Client for the Keyoku REST API. Cheap to clone.
#[derive(Clone)]
pub struct KeyokuClient {
    http: Client,
    api_base: String,
    api_key: String,
}

impl std::fmt::Debug for KeyokuClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyokuClient")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

impl KeyokuClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        Ok(Self {
            http: build_client()?,
            api_base: format!("{}/v1", base_url.trim_end_matches('/')),
            api_key: api_key.trim().to_string(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        debug!("Keyoku {} {}", method, path);
        self.http
            .request(method, format!("{}{}", self.api_base, path))
            .bearer_auth(&self.api_key)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await.map_err(map_reqwest_error)?;
        let response = check_response_status(response).await?;
        response.json::<T>().await.map_err(map_reqwest_error)
    }

    async fn send_empty(&self, request: RequestBuilder) -> Result<()> {
        let response = request.send().await.map_err(map_reqwest_error)?;
        check_response_status(response).await?;
        Ok(())
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        self.send_json(self.request(Method::GET, path).query(query))
            .await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.send_json(self.request(Method::POST, path).json(body))
            .await
    }

    // ─── Memories ───────────────────────────────────────────────────

    /// Submit content for background extraction. Wait on the returned handle.
    pub async fn remember(&self, request: &RememberRequest) -> Result<PendingJob> {
        let job: Job = self.post("/remember", request).await?;
        debug!("Queued memory job {}", job.id);
        Ok(PendingJob::new(self.clone(), job))
    }

    pub async fn get_job(&self, job_id: &str) -> Result<Job> {
        self.get(&format!("/jobs/{job_id}"), &[]).await
    }

    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<Memory>> {
        let response: SearchResponse = self.post("/search", request).await?;
        Ok(response.results)
    }

    pub async fn list_memories(&self, limit: usize, agent_id: Option<&str>) -> Result<MemoryList> {
        let mut query = vec![("limit", limit.to_string())];
        if let Some(agent_id) = agent_id {
            query.push(("agent_id", agent_id.to_string()));
        }
        self.get("/memories", &query).await
    }

    pub async fn delete_all_memories(&self) -> Result<()> {
        self.send_empty(self.request(Method::DELETE, "/memories"))
            .await
    }

    pub async fn stats(&self) -> Result<Stats> {
        self.get("/stats", &[]).await
    }

    // ─── Knowledge graph ────────────────────────────────────────────

    pub async fn list_entities(&self, limit: usize) -> Result<Vec<Entity>> {
        let list: EntityList = self.get("/entities", &[("limit", limit.to_string())]).await?;
        Ok(list.entities)
    }

    pub async fn list_relationships(&self, limit: usize) -> Result<Vec<Relationship>> {
        let list: RelationshipList = self
            .get("/relationships", &[("limit", limit.to_string())])
            .await?;
        Ok(list.relationships)
    }

    // ─── Cleanup, export, audit ─────────────────────────────────────

    pub async fn cleanup_suggestions(&self) -> Result<CleanupSuggestions> {
        self.get("/cleanup/suggestions", &[]).await
    }

    pub async fn execute_cleanup(&self, request: &CleanupRequest) -> Result<CleanupResult> {
        self.post("/cleanup/execute", request).await
    }

    pub async fn export_data(&self) -> Result<ExportJob> {
        self.post("/data/export", &serde_json::json!({})).await
    }

    pub async fn list_audit_logs(&self, limit: usize) -> Result<Vec<AuditLog>> {
        let list: AuditLogList = self.get("/audit", &[("limit", limit.to_string())]).await?;
        Ok(list.audit_logs)
    }

    // ─── State schemas ──────────────────────────────────────────────

    pub async fn list_state_schemas(&self, limit: usize) -> Result<Vec<StateSchema>> {
        let list: StateSchemaList = self
            .get("/state-schemas", &[("limit", limit.to_string())])
            .await?;
        Ok(list.schemas)
    }

    pub async fn create_state_schema(&self, request: &CreateStateSchema) -> Result<StateSchema> {
        self.post("/state-schemas", request).await
    }

    pub async fn get_state_schema(&self, schema_id: &str) -> Result<StateSchema> {
        self.get(&format!("/state-schemas/{schema_id}"), &[]).await
    }

    // ─── State ──────────────────────────────────────────────────────

    pub async fn extract_state(&self, request: &ExtractStateRequest) -> Result<ExtractStateResponse> {
        self.post("/state/extract", request).await
    }

    pub async fn list_states(&self, query: &StateQuery) -> Result<Vec<AgentState>> {
        let list: StateList = self.get("/state", &query.to_query()).await?;
        Ok(list.states)
    }

    pub async fn states_by_session(&self, session_id: &str) -> Result<Vec<AgentState>> {
        let list: StateList = self.get(&format!("/state/session/{session_id}"), &[]).await?;
        Ok(list.states)
    }

    pub async fn state_history(&self, state_id: &str) -> Result<Vec<StateTransition>> {
        let history: StateHistory = self.get(&format!("/state/{state_id}/history"), &[]).await?;
        Ok(history.transitions)
    }

    pub async fn archive_state(&self, state_id: &str) -> Result<()> {
        self.send_empty(self.request(Method::POST, &format!("/state/{state_id}/archive")))
            .await
    }

    // ─── Custom extraction schemas ──────────────────────────────────

    pub async fn list_extraction_schemas(&self) -> Result<Vec<ExtractionSchema>> {
        let list: ExtractionSchemaList = self.get("/schemas", &[]).await?;
        Ok(list.schemas)
    }

    pub async fn create_extraction_schema(
        &self,
        request: &CreateExtractionSchema,
    ) -> Result<ExtractionSchema> {
        self.post("/schemas", request).await
    }

    pub async fn delete_extraction_schema(&self, schema_id: &str) -> Result<()> {
        self.send_empty(self.request(Method::DELETE, &format!("/schemas/{schema_id}")))
            .await
    }

    pub async fn list_extractions(&self, schema_id: &str, limit: usize) -> Result<ExtractionList> {
        self.get(
            "/extractions",
            &[("schema_id", schema_id.to_string()), ("limit", limit.to_string())],
        )
        .await
    }

    pub async fn extractions_by_job(&self, job_id: &str) -> Result<Vec<Extraction>> {
        let list: ExtractionList = self.get(&format!("/extractions/job/{job_id}"), &[]).await?;
        Ok(list.extractions)
    }
}
