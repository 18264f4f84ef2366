//! Stateful agents
//!
//! Each demo agent owns one remote state schema. Replies and state extraction
//! are separate calls so a front end can show the reply before the (slower)
//! extraction finishes. Extraction for a turn must be given exactly the
//! user/assistant text of that turn.

mod catalog;
mod scenarios;

pub use catalog::{AgentId, TransitionTable};
pub use scenarios::{all_scenarios, find_scenario, Scenario, ScenarioStep};

use crate::config::Settings;
use crate::keyoku::{
    AgentState, CreateStateSchema, ExtractStateRequest, ExtractStateResponse, KeyokuClient,
    StateQuery, StateSchema,
};
use crate::llm::{build_messages, LlmClient};
use crate::prompts::turn_transcript;
use crate::{DemoError, Result};
use serde::Deserialize;
use tracing::{debug, info, warn};

/// Page size used when looking up an existing schema by name
const SCHEMA_LOOKUP_LIMIT: usize = 100;
const DEFAULT_SHARING_MODE: &str = "shared";
const TRIGGER_PREVIEW_CHARS: usize = 50;

/// How the service handles extracted transitions that break the rule table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TransitionMode {
    /// Record invalid transitions but accept the new state
    #[default]
    Warn,
    /// Reject invalid transitions
    Strict,
}

impl TransitionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionMode::Warn => "warn",
            TransitionMode::Strict => "strict",
        }
    }
}

/// Outcome of one stateful chat call.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Text produced by the model
    Generated(String),
    /// Why no reply was produced, worded for display
    Failed(String),
}

impl Reply {
    pub fn text(&self) -> &str {
        match self {
            Reply::Generated(text) | Reply::Failed(text) => text,
        }
    }

    pub fn is_generated(&self) -> bool {
        matches!(self, Reply::Generated(_))
    }
}

/// One row of the state transition panel
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionRow {
    pub from_version: u32,
    pub to_version: u32,
    pub changed_fields: Vec<String>,
    pub trigger: Option<String>,
    pub reasoning: Option<String>,
    pub confidence: Option<f64>,
    pub created_at: String,
}

/// Summary of an agent for listings
#[derive(Debug, Clone, PartialEq)]
pub struct AgentInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub schema_name: &'static str,
}

impl From<AgentId> for AgentInfo {
    fn from(id: AgentId) -> Self {
        Self {
            id: id.as_str(),
            name: id.name(),
            description: id.description(),
            schema_name: id.schema_name(),
        }
    }
}

/// Chatbot whose conversation state is tracked by a Keyoku state schema.
pub struct StatefulChatbot {
    keyoku: KeyokuClient,
    llm: LlmClient,
    session_id: String,
    agent: AgentId,
    sharing_mode: String,
    transition_mode: TransitionMode,
    /// Remote schema for `agent`, if lookup-or-create succeeded
    schema_id: Option<String>,
}

impl StatefulChatbot {
    /// Create a chatbot for `agent` and look up or create its schema.
    ///
    /// A schema failure is logged and leaves the chatbot without a schema;
    /// `chat` then reports that instead of replying.
    pub async fn connect(settings: &Settings, agent: AgentId) -> Result<Self> {
        let keyoku = KeyokuClient::new(&settings.keyoku_base_url, &settings.keyoku_api_key)?;
        let llm = LlmClient::new(settings)?;
        let session_id = settings
            .session_id
            .clone()
            .unwrap_or_else(|| new_session_id("stateful"));

        let mut bot = Self {
            keyoku,
            llm,
            session_id,
            agent,
            sharing_mode: DEFAULT_SHARING_MODE.to_string(),
            transition_mode: settings.transition_mode,
            schema_id: None,
        };
        if let Err(e) = bot.ensure_schema().await {
            warn!("Error creating schema for {}: {}", agent, e);
        }
        Ok(bot)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn agent(&self) -> AgentId {
        self.agent
    }

    pub fn schema_id(&self) -> Option<&str> {
        self.schema_id.as_deref()
    }

    pub fn transition_mode(&self) -> TransitionMode {
        self.transition_mode
    }

    /// Find the agent's schema by name, creating it when missing.
    async fn ensure_schema(&mut self) -> Result<()> {
        self.schema_id = None;
        let schema_name = self.agent.schema_name();

        let schemas = self.keyoku.list_state_schemas(SCHEMA_LOOKUP_LIMIT).await?;
        if let Some(schema) = schemas.into_iter().find(|s| s.name == schema_name) {
            debug!("Using existing schema {} ({})", schema_name, schema.id);
            self.schema_id = Some(schema.id);
            return Ok(());
        }

        let request = CreateStateSchema {
            name: schema_name.to_string(),
            schema_definition: self.agent.schema_definition(),
            description: format!("State schema for {}", self.agent.name()),
            sharing_mode: self.sharing_mode.clone(),
            transition_rules: Some(self.agent.transitions().to_json()),
            transition_mode: self.transition_mode.as_str().to_string(),
        };
        let schema = self.keyoku.create_state_schema(&request).await?;
        info!("Created schema: {} (ID: {})", schema_name, schema.id);
        self.schema_id = Some(schema.id);
        Ok(())
    }

    /// Switch to another agent, keeping the session.
    ///
    /// An unknown id fails before any remote call. State is not copied; the
    /// new agent sees whatever the service associates with this session.
    pub async fn switch_agent(&mut self, agent_id: &str) -> Result<()> {
        let agent: AgentId = agent_id.parse()?;
        self.agent = agent;
        self.ensure_schema().await
    }

    /// Generate a reply. Does not extract state.
    pub async fn chat(&self, message: &str, history: &[(String, String)]) -> Reply {
        if self.schema_id.is_none() {
            return Reply::Failed(
                "Error: No state schema configured for this agent.".to_string(),
            );
        }

        let state_context = self.state_context().await;
        let messages = build_messages(
            &[self.agent.system_prompt(), state_context.as_str()],
            history,
            message,
        );

        match self.llm.complete(&messages).await {
            Ok(reply) => Reply::Generated(reply),
            Err(e) => Reply::Failed(format!("Error generating response: {e}")),
        }
    }

    async fn state_context(&self) -> String {
        match self.current_state().await {
            Ok(Some(state)) => format!(
                "\nCurrent workflow state (automatically tracked):\n\
                 - Status: {}\n\
                 - Version: {}\n\
                 - Data: {}\n\n\
                 The state is automatically updated based on our conversation.",
                state.status, state.version, state.current_data
            ),
            Ok(None) => "No state tracked yet for this session.".to_string(),
            Err(_) => "State not available.".to_string(),
        }
    }

    /// Extract state from one conversation turn.
    pub async fn extract_state(
        &self,
        user_message: &str,
        assistant_response: &str,
    ) -> Result<ExtractStateResponse> {
        let schema_id = self.require_schema()?;
        let request = ExtractStateRequest {
            content: turn_transcript(user_message, assistant_response),
            schema_id: schema_id.to_string(),
            session_id: self.session_id.clone(),
            agent_id: self.agent.as_str().to_string(),
        };
        let result = self.keyoku.extract_state(&request).await;
        if let Err(e) = &result {
            warn!("State extraction error: {}", e);
        }
        result
    }

    /// Reply and extract in one blocking call. Extraction only runs for a
    /// generated reply.
    pub async fn chat_with_state_extraction(
        &self,
        message: &str,
        history: &[(String, String)],
    ) -> (Reply, Option<Result<ExtractStateResponse>>) {
        let reply = self.chat(message, history).await;
        let Reply::Generated(text) = &reply else {
            return (reply, None);
        };
        let extraction = self.extract_state(message, text).await;
        (reply, Some(extraction))
    }

    /// The active state for this agent and session, if any.
    pub async fn current_state(&self) -> Result<Option<AgentState>> {
        let Some(schema_id) = self.schema_id.as_deref() else {
            return Ok(None);
        };
        let query = StateQuery {
            schema_id: Some(schema_id.to_string()),
            session_id: Some(self.session_id.clone()),
            agent_id: Some(self.agent.as_str().to_string()),
            status: Some("active".to_string()),
            limit: Some(1),
        };
        Ok(self.keyoku.list_states(&query).await?.into_iter().next())
    }

    /// All states in this session, across agents.
    pub async fn all_session_states(&self) -> Result<Vec<AgentState>> {
        self.keyoku.states_by_session(&self.session_id).await
    }

    /// Transition history of the current agent's state.
    pub async fn state_history(&self) -> Result<Vec<TransitionRow>> {
        let Some(state) = self.current_state().await? else {
            return Ok(Vec::new());
        };
        let transitions = self.keyoku.state_history(&state.id).await?;
        Ok(transitions
            .into_iter()
            .map(|t| TransitionRow {
                from_version: t.from_version,
                to_version: t.to_version,
                changed_fields: t.changed_fields,
                trigger: t.trigger.map(|s| preview(&s, TRIGGER_PREVIEW_CHARS)),
                reasoning: t.reasoning,
                confidence: t.confidence,
                created_at: t.created_at.chars().take(19).collect(),
            })
            .collect())
    }

    pub async fn schema_info(&self) -> Result<Option<StateSchema>> {
        match self.schema_id.as_deref() {
            Some(id) => self.keyoku.get_state_schema(id).await.map(Some),
            None => Ok(None),
        }
    }

    /// Archive every state in the session, then start a new session.
    ///
    /// Archiving is sequential and keeps going past individual failures.
    /// Returns the new session id.
    pub async fn reset_session(&mut self) -> Result<String> {
        let states = self.keyoku.states_by_session(&self.session_id).await?;
        for state in &states {
            if let Err(e) = self.keyoku.archive_state(&state.id).await {
                warn!("Failed to archive state {}: {}", state.id, e);
            }
        }

        let old = std::mem::replace(&mut self.session_id, new_session_id("stateful"));
        info!(
            "Archived {} states from {}, new session {}",
            states.len(),
            old,
            self.session_id
        );
        Ok(self.session_id.clone())
    }

    pub fn agent_info(&self) -> AgentInfo {
        self.agent.into()
    }

    pub fn available_agents() -> Vec<AgentInfo> {
        AgentId::all().iter().copied().map(AgentInfo::from).collect()
    }

    fn require_schema(&self) -> Result<&str> {
        self.schema_id.as_deref().ok_or_else(|| {
            DemoError::Validation(format!("no state schema configured for {}", self.agent))
        })
    }
}

/// `<prefix>-<8 hex chars>`
pub fn new_session_id(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("{prefix}-{}", &id[..8])
}

/// First `max_chars` characters, with `...` when something was cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let head: String = text.chars().take(max_chars).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}
