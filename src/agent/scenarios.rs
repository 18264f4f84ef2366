//! Guided demo scenarios for the stateful chat.

use super::AgentId;
use crate::{DemoError, Result};

#[derive(Debug, Clone, Copy)]
pub struct ScenarioStep {
    pub agent: AgentId,
    pub message: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct Scenario {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// Agent selected when the scenario starts
    pub agent: AgentId,
    pub steps: &'static [ScenarioStep],
}

impl Scenario {
    /// True when steps hop between agents.
    pub fn is_multi_agent(&self) -> bool {
        self.steps.iter().any(|step| step.agent != self.agent)
    }
}

const fn step(agent: AgentId, message: &'static str) -> ScenarioStep {
    ScenarioStep { agent, message }
}

const SCENARIOS: &[Scenario] = &[
    Scenario {
        id: "none",
        name: "(Default) Free Chat",
        description: "Free chat mode - type anything to start extracting state",
        agent: AgentId::Sales,
        steps: &[],
    },
    Scenario {
        id: "order_flow",
        name: "Order Processing Flow",
        description: "Track an order from placement to delivery",
        agent: AgentId::Sales,
        steps: &[
            step(AgentId::Sales, "Hi, I'd like to order a laptop and a wireless mouse"),
            step(AgentId::Sales, "Yes, ship it to 123 Main Street, San Francisco, CA 94105"),
            step(AgentId::Sales, "I'll pay with my credit card"),
            step(AgentId::Sales, "Please confirm the order"),
            step(AgentId::Sales, "What's the status of my order?"),
        ],
    },
    Scenario {
        id: "support_ticket",
        name: "Support Ticket Resolution",
        description: "Handle a customer support issue end-to-end",
        agent: AgentId::Support,
        steps: &[
            step(AgentId::Support, "I have a problem with my recent order - it arrived damaged"),
            step(AgentId::Support, "The laptop screen has a crack on the corner"),
            step(AgentId::Support, "I'd like a replacement please"),
            step(AgentId::Support, "Thank you for your help!"),
        ],
    },
    Scenario {
        id: "multi_agent",
        name: "Multi-Agent Collaboration",
        description: "Show state sharing between different agents",
        agent: AgentId::Sales,
        steps: &[
            step(AgentId::Sales, "I want to order a laptop for $1200"),
            step(AgentId::Support, "I have a question about the laptop warranty"),
            step(AgentId::Scheduler, "Schedule a product demo for next Tuesday at 2pm"),
        ],
    },
];

pub fn all_scenarios() -> &'static [Scenario] {
    SCENARIOS
}

pub fn find_scenario(id: &str) -> Result<&'static Scenario> {
    SCENARIOS
        .iter()
        .find(|s| s.id == id.trim())
        .ok_or_else(|| DemoError::Validation(format!("Unknown scenario: {id}")))
}
