//! Custom extraction schemas
//!
//! Named JSON schemas that run alongside memory extraction. A sample text is
//! remembered with the schema attached; the structured result comes back on
//! the finished job or, failing that, from the job's extraction records.

use crate::chatbot::KeyokuChatbot;
use crate::keyoku::{CreateExtractionSchema, Extraction, KeyokuClient};
use crate::Result;
use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How long a sample waits for its extraction job
pub const EXTRACTION_WAIT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionPreset {
    ProductFeedback,
    MentalHealth,
}

impl ExtractionPreset {
    pub fn all() -> &'static [ExtractionPreset] {
        &[ExtractionPreset::ProductFeedback, ExtractionPreset::MentalHealth]
    }

    pub fn id(&self) -> &'static str {
        match self {
            ExtractionPreset::ProductFeedback => "feedback",
            ExtractionPreset::MentalHealth => "mental-health",
        }
    }

    /// Remote schema name, used to find an existing schema
    pub fn schema_name(&self) -> &'static str {
        match self {
            ExtractionPreset::ProductFeedback => "Product Feedback",
            ExtractionPreset::MentalHealth => "Mental Health Assessment",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ExtractionPreset::ProductFeedback => {
                "Extract product feedback insights from customer conversations"
            }
            ExtractionPreset::MentalHealth => {
                "Extract mental health indicators from patient conversations"
            }
        }
    }

    pub fn schema_definition(&self) -> Value {
        match self {
            ExtractionPreset::ProductFeedback => json!({
                "type": "object",
                "properties": {
                    "sentiment": {
                        "type": "string",
                        "enum": ["positive", "negative", "neutral", "mixed"]
                    },
                    "features_mentioned": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Product features discussed"
                    },
                    "pain_points": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Issues or frustrations mentioned"
                    },
                    "feature_requests": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "New features requested"
                    },
                    "satisfaction_score": {"type": "number", "minimum": 1, "maximum": 10},
                    "would_recommend": {"type": "boolean"}
                },
                "required": ["sentiment"]
            }),
            ExtractionPreset::MentalHealth => json!({
                "type": "object",
                "properties": {
                    "mood_state": {
                        "type": "string",
                        "enum": ["depressed", "anxious", "neutral", "positive", "mixed"],
                        "description": "The overall mood state expressed"
                    },
                    "mood_intensity": {
                        "type": "number",
                        "minimum": 0,
                        "maximum": 1,
                        "description": "Intensity of the mood (0.0 to 1.0)"
                    },
                    "symptoms": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "List of symptoms mentioned"
                    },
                    "triggers": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "What triggered these feelings"
                    },
                    "risk_level": {
                        "type": "string",
                        "enum": ["none", "low", "medium", "high", "crisis"],
                        "description": "Risk assessment level"
                    },
                    "coping_strategies": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Coping strategies mentioned"
                    },
                    "social_support": {
                        "type": "boolean",
                        "description": "Whether social support was mentioned"
                    }
                },
                "required": ["mood_state", "risk_level"]
            }),
        }
    }

    /// Sample inputs used when no text is given
    pub fn samples(&self) -> &'static [&'static str] {
        match self {
            ExtractionPreset::ProductFeedback => &[
                "I've been using your app for about 3 months now. Overall I really like the search \
                 feature, it's super fast and accurate. However, the mobile app crashes sometimes \
                 when I try to export data. It would be great if you could add dark mode and \
                 offline support. Despite these issues, I'd still recommend it to my colleagues. \
                 I'd rate it about 7 out of 10.",
            ],
            ExtractionPreset::MentalHealth => &[
                "I've been feeling really anxious about work lately. I can't sleep well and my mind \
                 keeps racing at night. My boss has been putting a lot of pressure on the team. \
                 I've been trying to exercise more to help.",
                "Today was actually a pretty good day. I met up with my friends for coffee and we \
                 had a great conversation. I've been feeling more positive lately since I started \
                 that new hobby.",
            ],
        }
    }
}

impl fmt::Display for ExtractionPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ExtractionPreset {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|p| p.id() == s)
            .ok_or_else(|| {
                let known: Vec<_> = Self::all().iter().map(|p| p.id()).collect();
                format!("unknown preset '{s}', expected one of: {}", known.join(", "))
            })
    }
}

/// Where a sample's structured result came from
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionOutput {
    /// Data attached to the finished job
    Inline(Map<String, Value>),
    /// Records fetched by job id
    Records(Vec<(String, f64, Map<String, Value>)>),
    Empty,
}

impl ExtractionOutput {
    fn from_records(records: Vec<Extraction>) -> Self {
        if records.is_empty() {
            return ExtractionOutput::Empty;
        }
        ExtractionOutput::Records(
            records
                .into_iter()
                .map(|r| (r.id, r.confidence, r.extracted_data))
                .collect(),
        )
    }

    pub fn render(&self) -> String {
        match self {
            ExtractionOutput::Inline(data) => render_fields(data),
            ExtractionOutput::Records(records) => records
                .iter()
                .map(|(id, confidence, data)| {
                    format!(
                        "Extraction {id} (confidence {confidence:.2})\n{}",
                        render_fields(data)
                    )
                })
                .collect::<Vec<_>>()
                .join("\n"),
            ExtractionOutput::Empty => "No extractions found for this job".to_string(),
        }
    }
}

fn render_fields(data: &Map<String, Value>) -> String {
    data.iter()
        .map(|(key, value)| format!("  - {key}: {value}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Find the preset's schema by name, creating it when missing. Returns its id.
pub async fn ensure_extraction_schema(
    client: &KeyokuClient,
    preset: ExtractionPreset,
) -> Result<String> {
    let existing = client.list_extraction_schemas().await?;
    if let Some(schema) = existing
        .into_iter()
        .find(|s| s.name == preset.schema_name())
    {
        debug!("Found existing extraction schema {}", schema.id);
        return Ok(schema.id);
    }

    let request = CreateExtractionSchema {
        name: preset.schema_name().to_string(),
        schema: preset.schema_definition(),
        description: preset.description().to_string(),
    };
    let schema = client.create_extraction_schema(&request).await?;
    info!("Created extraction schema: {} (ID: {})", schema.name, schema.id);
    Ok(schema.id)
}

/// Remember `content` through `schema_id` and collect the structured result.
pub async fn run_extraction(
    bot: &KeyokuChatbot,
    schema_id: &str,
    content: &str,
    wait: Duration,
) -> Result<ExtractionOutput> {
    let job = bot.remember_with_schema(content, schema_id).await?;
    let job = job.wait(wait).await?;

    match job.custom_extracted_data {
        Some(data) if !data.is_empty() => Ok(ExtractionOutput::Inline(data)),
        _ => {
            debug!("No inline extraction on job {}, checking records", job.id);
            let records = bot.client().extractions_by_job(&job.id).await?;
            Ok(ExtractionOutput::from_records(records))
        }
    }
}

/// Delete every preset schema that exists remotely. Returns how many went.
pub async fn remove_preset_schemas(client: &KeyokuClient) -> Result<usize> {
    let names: Vec<&str> = ExtractionPreset::all()
        .iter()
        .map(|p| p.schema_name())
        .collect();
    let mut removed = 0;
    for schema in client.list_extraction_schemas().await? {
        if !names.contains(&schema.name.as_str()) {
            continue;
        }
        match client.delete_extraction_schema(&schema.id).await {
            Ok(()) => removed += 1,
            Err(e) => warn!("Failed to delete schema {}: {}", schema.id, e),
        }
    }
    Ok(removed)
}
