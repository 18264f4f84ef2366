//! Display panels
//!
//! Each stateful panel keeps its last good rendering. A failed fetch shows
//! that rendering again instead of an error, until a forced refresh clears it.

pub mod format;

use crate::agent::StatefulChatbot;
use crate::Result;
use serde_json::json;
use std::future::Future;
use tracing::debug;

/// The four stateful display panels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Panel {
    CurrentState,
    StateHistory,
    AllStates,
    SchemaInfo,
}

impl Panel {
    pub fn all() -> &'static [Panel] {
        &[
            Panel::CurrentState,
            Panel::StateHistory,
            Panel::AllStates,
            Panel::SchemaInfo,
        ]
    }

    pub fn key(&self) -> &'static str {
        match self {
            Panel::CurrentState => "current_state",
            Panel::StateHistory => "state_history",
            Panel::AllStates => "all_states",
            Panel::SchemaInfo => "schema_info",
        }
    }

    fn index(&self) -> usize {
        match self {
            Panel::CurrentState => 0,
            Panel::StateHistory => 1,
            Panel::AllStates => 2,
            Panel::SchemaInfo => 3,
        }
    }
}

/// Last successfully rendered value per panel. One per session.
#[derive(Debug, Default, Clone)]
pub struct DisplayCache {
    slots: [Option<String>; 4],
}

impl DisplayCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, panel: Panel) -> Option<&str> {
        self.slots[panel.index()].as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    pub fn clear(&mut self) {
        self.slots = Default::default();
    }

    /// Apply a fetch outcome: store and return a fresh value, or fall back to
    /// the cached one (or `Error: ...` when there is none). Failures never
    /// touch the slot.
    pub fn resolve(&mut self, panel: Panel, fetched: Result<String>) -> String {
        match fetched {
            Ok(value) => {
                self.slots[panel.index()] = Some(value.clone());
                value
            }
            Err(e) => {
                debug!("Panel {} fetch failed: {}", panel.key(), e);
                match self.get(panel) {
                    Some(cached) => cached.to_string(),
                    None => format!("Error: {e}"),
                }
            }
        }
    }

    /// Run `fetch` for `panel` and resolve it against the cache.
    pub async fn fetch<F, Fut>(&mut self, panel: Panel, fetch: F) -> String
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        let fetched = fetch().await;
        self.resolve(panel, fetched)
    }
}

/// Rendered text for every stateful panel
#[derive(Debug, Clone, PartialEq)]
pub struct StatePanels {
    pub current_state: String,
    pub state_history: String,
    pub all_states: String,
    pub schema_info: String,
}

impl StatePanels {
    pub fn get(&self, panel: Panel) -> &str {
        match panel {
            Panel::CurrentState => &self.current_state,
            Panel::StateHistory => &self.state_history,
            Panel::AllStates => &self.all_states,
            Panel::SchemaInfo => &self.schema_info,
        }
    }
}

/// Fetch one panel through the cache.
pub async fn fetch_panel(cache: &mut DisplayCache, bot: &StatefulChatbot, panel: Panel) -> String {
    match panel {
        Panel::CurrentState => cache.fetch(panel, || render_current_state(bot)).await,
        Panel::StateHistory => cache.fetch(panel, || render_state_history(bot)).await,
        Panel::AllStates => cache.fetch(panel, || render_all_states(bot)).await,
        Panel::SchemaInfo => cache.fetch(panel, || render_schema_info(bot)).await,
    }
}

/// Fetch all four panels in order.
pub async fn refresh_state_panels(cache: &mut DisplayCache, bot: &StatefulChatbot) -> StatePanels {
    StatePanels {
        current_state: fetch_panel(cache, bot, Panel::CurrentState).await,
        state_history: fetch_panel(cache, bot, Panel::StateHistory).await,
        all_states: fetch_panel(cache, bot, Panel::AllStates).await,
        schema_info: fetch_panel(cache, bot, Panel::SchemaInfo).await,
    }
}

/// Drop every cached value, then fetch all panels fresh.
pub async fn force_refresh(cache: &mut DisplayCache, bot: &StatefulChatbot) -> StatePanels {
    cache.clear();
    refresh_state_panels(cache, bot).await
}

fn pretty(value: &serde_json::Value) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

pub async fn render_current_state(bot: &StatefulChatbot) -> Result<String> {
    match bot.current_state().await? {
        Some(state) => pretty(&json!({
            "id": state.id,
            "status": state.status,
            "version": state.version,
            "current_data": state.current_data,
        })),
        None => Ok("No state tracked yet for this session.".to_string()),
    }
}

pub async fn render_state_history(bot: &StatefulChatbot) -> Result<String> {
    let rows = bot.state_history().await?;
    if rows.is_empty() {
        return Ok("No transitions yet.".to_string());
    }
    let rows: Vec<serde_json::Value> = rows
        .into_iter()
        .map(|row| {
            json!({
                "from_version": row.from_version,
                "to_version": row.to_version,
                "changed_fields": row.changed_fields,
                "trigger": row.trigger,
                "reasoning": row.reasoning,
                "confidence": row.confidence,
                "created_at": row.created_at,
            })
        })
        .collect();
    pretty(&serde_json::Value::Array(rows))
}

pub async fn render_all_states(bot: &StatefulChatbot) -> Result<String> {
    let states = bot.all_session_states().await?;
    let states: Vec<serde_json::Value> = states
        .into_iter()
        .map(|s| {
            json!({
                "agent_id": s.agent_id,
                "schema_id": s.schema_id,
                "version": s.version,
                "status": s.status,
                "current_data": s.current_data,
                "confidence": s.confidence,
            })
        })
        .collect();
    pretty(&serde_json::Value::Array(states))
}

pub async fn render_schema_info(bot: &StatefulChatbot) -> Result<String> {
    match bot.schema_info().await? {
        Some(schema) => pretty(&json!({
            "id": schema.id,
            "name": schema.name,
            "description": schema.description,
            "sharing_mode": schema.sharing_mode,
            "transition_mode": schema.transition_mode,
            "version": schema.version,
            "schema_definition": schema.schema_definition,
            "transition_rules": schema.transition_rules,
        })),
        None => Ok("No schema configured.".to_string()),
    }
}
