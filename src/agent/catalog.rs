//! Built-in demo agents and the state schemas they track.

use crate::{DemoError, Result};
use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;

/// The fixed set of demo agents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentId {
    Sales,
    Support,
    Scheduler,
}

/// Allowed next values for one status field
#[derive(Debug, Clone, Copy)]
pub struct TransitionTable {
    pub field: &'static str,
    pub rules: &'static [(&'static str, &'static [&'static str])],
}

impl TransitionTable {
    /// `{"<field>": {"<from>": ["<to>", ...]}}`, the wire shape for schema creation.
    pub fn to_json(&self) -> Value {
        let table: Map<String, Value> = self
            .rules
            .iter()
            .map(|(from, next)| (from.to_string(), json!(next)))
            .collect();
        let mut root = Map::new();
        root.insert(self.field.to_string(), Value::Object(table));
        Value::Object(root)
    }
}

const ORDER_TRANSITIONS: TransitionTable = TransitionTable {
    field: "status",
    rules: &[
        ("pending", &["confirmed", "cancelled"]),
        ("confirmed", &["processing", "cancelled"]),
        ("processing", &["shipped", "cancelled"]),
        ("shipped", &["delivered"]),
        ("delivered", &[]),
        ("cancelled", &[]),
    ],
};

const SUPPORT_TRANSITIONS: TransitionTable = TransitionTable {
    field: "ticket_status",
    rules: &[
        ("open", &["in_progress", "closed"]),
        ("in_progress", &["waiting_customer", "resolved", "closed"]),
        ("waiting_customer", &["in_progress", "resolved", "closed"]),
        ("resolved", &["closed", "in_progress"]),
        ("closed", &[]),
    ],
};

const SCHEDULING_TRANSITIONS: TransitionTable = TransitionTable {
    field: "appointment_status",
    rules: &[
        ("proposed", &["confirmed", "cancelled"]),
        ("confirmed", &["rescheduled", "cancelled", "completed"]),
        ("rescheduled", &["confirmed", "cancelled"]),
        ("cancelled", &[]),
        ("completed", &[]),
    ],
};

const SALES_PROMPT: &str = "You are a friendly and helpful sales agent. Your job is to:
- Help customers place orders
- Recommend products based on their needs
- Process order confirmations
- Provide order status updates

Always be professional and helpful. When a customer wants to order something,
acknowledge their request and move the order through the appropriate states.
When you discuss order details (items, prices, addresses), the system will
automatically track these in the state.";

const SUPPORT_PROMPT: &str = "You are a knowledgeable customer support agent. Your job is to:
- Help customers resolve issues
- Categorize and prioritize support requests
- Provide clear solutions and workarounds
- Escalate when necessary

Be empathetic and solution-focused. When handling issues, identify the category,
assess priority, and work toward resolution. The system tracks ticket status
automatically based on your conversation.";

const SCHEDULER_PROMPT: &str = "You are an efficient scheduling assistant. Your job is to:
- Help schedule appointments and meetings
- Propose available time slots
- Confirm or reschedule appointments
- Send meeting reminders and details

Be organized and clear about scheduling details. When discussing appointments,
mention specific dates, times, and participants. The system automatically tracks
appointment status based on your conversation.";

impl AgentId {
    pub fn all() -> &'static [AgentId] {
        &[AgentId::Sales, AgentId::Support, AgentId::Scheduler]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentId::Sales => "sales-agent",
            AgentId::Support => "support-agent",
            AgentId::Scheduler => "scheduler-agent",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AgentId::Sales => "Sales Agent",
            AgentId::Support => "Support Agent",
            AgentId::Scheduler => "Scheduler Agent",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            AgentId::Sales => "Handles order processing and sales inquiries",
            AgentId::Support => "Handles customer support tickets and issues",
            AgentId::Scheduler => "Handles appointment scheduling and calendar management",
        }
    }

    /// Name of the remote state schema this agent tracks
    pub fn schema_name(&self) -> &'static str {
        match self {
            AgentId::Sales => "OrderProcessing",
            AgentId::Support => "SupportTicket",
            AgentId::Scheduler => "AppointmentScheduling",
        }
    }

    pub fn system_prompt(&self) -> &'static str {
        match self {
            AgentId::Sales => SALES_PROMPT,
            AgentId::Support => SUPPORT_PROMPT,
            AgentId::Scheduler => SCHEDULER_PROMPT,
        }
    }

    pub fn transitions(&self) -> TransitionTable {
        match self {
            AgentId::Sales => ORDER_TRANSITIONS,
            AgentId::Support => SUPPORT_TRANSITIONS,
            AgentId::Scheduler => SCHEDULING_TRANSITIONS,
        }
    }

    /// JSON-schema field definition sent when the schema is created.
    pub fn schema_definition(&self) -> Value {
        match self {
            AgentId::Sales => json!({
                "type": "object",
                "properties": {
                    "status": {
                        "type": "string",
                        "enum": ["pending", "confirmed", "processing", "shipped", "delivered", "cancelled"],
                        "description": "Current order status in the fulfillment pipeline"
                    },
                    "items": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "List of items in the order"
                    },
                    "total_amount": {
                        "type": "number",
                        "minimum": 0,
                        "description": "Total order amount in USD"
                    },
                    "customer_name": {"type": "string", "description": "Name of the customer"},
                    "shipping_address": {"type": "string", "description": "Delivery address for the order"},
                    "payment_method": {
                        "type": "string",
                        "enum": ["card", "paypal", "bank_transfer"],
                        "description": "Selected payment method"
                    },
                    "notes": {"type": "string", "description": "Special instructions or notes"}
                }
            }),
            AgentId::Support => json!({
                "type": "object",
                "properties": {
                    "ticket_status": {
                        "type": "string",
                        "enum": ["open", "in_progress", "waiting_customer", "resolved", "closed"],
                        "description": "Current ticket status"
                    },
                    "priority": {
                        "type": "string",
                        "enum": ["low", "medium", "high", "urgent"],
                        "description": "Ticket priority level"
                    },
                    "category": {
                        "type": "string",
                        "enum": ["billing", "technical", "shipping", "returns", "general"],
                        "description": "Issue category"
                    },
                    "issue_summary": {"type": "string", "description": "Brief summary of the issue"},
                    "resolution_notes": {"type": "string", "description": "Notes about how the issue was resolved"},
                    "customer_satisfaction": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": 5,
                        "description": "Customer satisfaction rating (1-5)"
                    }
                }
            }),
            AgentId::Scheduler => json!({
                "type": "object",
                "properties": {
                    "appointment_status": {
                        "type": "string",
                        "enum": ["proposed", "confirmed", "rescheduled", "cancelled", "completed"],
                        "description": "Current appointment status"
                    },
                    "appointment_type": {
                        "type": "string",
                        "enum": ["consultation", "follow_up", "demo", "support"],
                        "description": "Type of appointment"
                    },
                    "proposed_date": {"type": "string", "description": "Proposed date and time for the appointment"},
                    "confirmed_date": {"type": "string", "description": "Confirmed date and time"},
                    "duration_minutes": {
                        "type": "integer",
                        "minimum": 15,
                        "maximum": 120,
                        "description": "Duration in minutes"
                    },
                    "attendees": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "List of attendees"
                    },
                    "meeting_link": {"type": "string", "description": "Video meeting link if applicable"}
                }
            }),
        }
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentId {
    type Err = DemoError;

    fn from_str(s: &str) -> Result<Self> {
        AgentId::all()
            .iter()
            .copied()
            .find(|id| id.as_str() == s.trim())
            .ok_or_else(|| DemoError::Validation(format!("Unknown agent: {s}")))
    }
}
