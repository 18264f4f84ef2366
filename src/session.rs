//! Per-session context.
//!
//! Everything a front end session needs lives here and is passed around
//! explicitly: the chatbots, their histories and the panel cache. The
//! stateful chatbot is only connected for stateful sessions.

use crate::agent::{AgentId, Reply, ScenarioStep, StatefulChatbot};
use crate::chatbot::KeyokuChatbot;
use crate::config::Settings;
use crate::display::format::render_extraction;
use crate::display::{
    fetch_panel, force_refresh, refresh_state_panels, DisplayCache, Panel, StatePanels,
};
use crate::history::{pairs_to_messages, reconcile_history, HistoryMessage};
use crate::{DemoError, Result};
use tracing::{info, warn};

/// Reply plus the outcome of the extraction that followed it
#[derive(Debug, Clone, PartialEq)]
pub struct StatefulTurn {
    pub reply: Reply,
    /// Rendered extraction, `None` when it was skipped or failed
    pub extraction: Option<String>,
}

pub struct DemoSession {
    memory: KeyokuChatbot,
    stateful: Option<StatefulChatbot>,
    cache: DisplayCache,
    memory_history: Vec<HistoryMessage>,
    stateful_history: Vec<HistoryMessage>,
}

impl DemoSession {
    /// Start a session. With `agent`, the stateful chatbot is connected too;
    /// without it no state schema is touched.
    pub async fn start(settings: &Settings, agent: Option<AgentId>) -> Result<Self> {
        let memory = KeyokuChatbot::new(settings)?;
        let stateful = match agent {
            Some(agent) => Some(StatefulChatbot::connect(settings, agent).await?),
            None => None,
        };
        match &stateful {
            Some(bot) => info!(
                "Session started: memory={} stateful={} agent={}",
                memory.session_id(),
                bot.session_id(),
                bot.agent()
            ),
            None => info!("Session started: memory={}", memory.session_id()),
        }
        Ok(Self {
            memory,
            stateful,
            cache: DisplayCache::new(),
            memory_history: Vec::new(),
            stateful_history: Vec::new(),
        })
    }

    pub fn memory(&self) -> &KeyokuChatbot {
        &self.memory
    }

    pub fn stateful(&self) -> Option<&StatefulChatbot> {
        self.stateful.as_ref()
    }

    pub fn cache(&self) -> &DisplayCache {
        &self.cache
    }

    pub fn memory_history(&self) -> &[HistoryMessage] {
        &self.memory_history
    }

    pub fn stateful_history(&self) -> &[HistoryMessage] {
        &self.stateful_history
    }

    fn require_stateful(&self) -> Result<&StatefulChatbot> {
        self.stateful.as_ref().ok_or_else(no_stateful)
    }

    /// One memory-chat turn. Blank input is ignored.
    pub async fn memory_turn(&mut self, message: &str) -> Option<String> {
        let message = message.trim();
        if message.is_empty() {
            return None;
        }
        let pairs = reconcile_history(&self.memory_history);
        let reply = self.memory.chat(message, &pairs).await;
        self.memory_history
            .extend(pairs_to_messages(&[(message.to_string(), reply.clone())]));
        Some(reply)
    }

    /// First phase of a stateful turn: generate and record the reply.
    pub async fn stateful_reply(&mut self, message: &str) -> Result<Option<Reply>> {
        let message = message.trim();
        if message.is_empty() {
            return Ok(None);
        }
        let pairs = reconcile_history(&self.stateful_history);
        let reply = self.require_stateful()?.chat(message, &pairs).await;
        self.stateful_history.extend(pairs_to_messages(&[(
            message.to_string(),
            reply.text().to_string(),
        )]));
        Ok(Some(reply))
    }

    /// Second phase: extract state from exactly this turn's text.
    ///
    /// Only generated replies are extracted. A failure is logged and leaves
    /// the panel cache as it was.
    pub async fn stateful_extract(&mut self, message: &str, reply: &Reply) -> Option<String> {
        let Reply::Generated(text) = reply else {
            return None;
        };
        let bot = self.stateful.as_ref()?;
        match bot.extract_state(message.trim(), text).await {
            Ok(result) => Some(render_extraction(&result)),
            Err(e) => {
                warn!("Background state extraction failed: {}", e);
                None
            }
        }
    }

    /// Reply, then extract, strictly in that order.
    pub async fn stateful_turn(&mut self, message: &str) -> Result<Option<StatefulTurn>> {
        let Some(reply) = self.stateful_reply(message).await? else {
            return Ok(None);
        };
        let extraction = self.stateful_extract(message, &reply).await;
        Ok(Some(StatefulTurn { reply, extraction }))
    }

    /// Run one scripted step, switching agents when the step asks for it.
    pub async fn scenario_step(&mut self, step: &ScenarioStep) -> Result<Option<StatefulTurn>> {
        if self.require_stateful()?.agent() != step.agent {
            self.switch_agent(step.agent.as_str()).await?;
        }
        self.stateful_turn(step.message).await
    }

    pub async fn panels(&mut self) -> Result<StatePanels> {
        let bot = self.stateful.as_ref().ok_or_else(no_stateful)?;
        Ok(refresh_state_panels(&mut self.cache, bot).await)
    }

    pub async fn panel(&mut self, panel: Panel) -> Result<String> {
        let bot = self.stateful.as_ref().ok_or_else(no_stateful)?;
        Ok(fetch_panel(&mut self.cache, bot, panel).await)
    }

    pub async fn force_refresh(&mut self) -> Result<StatePanels> {
        let bot = self.stateful.as_ref().ok_or_else(no_stateful)?;
        Ok(force_refresh(&mut self.cache, bot).await)
    }

    /// Switch agents in the same session. Cached panels belong to the old
    /// agent, so they are dropped.
    pub async fn switch_agent(&mut self, agent_id: &str) -> Result<()> {
        let bot = self.stateful.as_mut().ok_or_else(no_stateful)?;
        let result = bot.switch_agent(agent_id).await;
        if !matches!(result, Err(DemoError::Validation(_))) {
            self.cache.clear();
        }
        result
    }

    /// Start a new session and return its id.
    ///
    /// Stateful sessions archive their states first. Memory-only sessions
    /// just take a new memory session id.
    pub async fn new_session(&mut self) -> Result<String> {
        match self.stateful.as_mut() {
            Some(bot) => {
                let session_id = bot.reset_session().await?;
                self.stateful_history.clear();
                self.cache.clear();
                Ok(session_id)
            }
            None => {
                let session_id = self.memory.new_session().to_string();
                self.memory_history.clear();
                Ok(session_id)
            }
        }
    }

    /// Forget both chat transcripts and return how many records went.
    /// Remote memory and state are untouched.
    pub fn new_chat(&mut self) -> usize {
        let dropped = self.memory_history.len() + self.stateful_history.len();
        self.memory_history.clear();
        self.stateful_history.clear();
        dropped
    }
}

fn no_stateful() -> DemoError {
    DemoError::Validation("no stateful agent in this session".to_string())
}
