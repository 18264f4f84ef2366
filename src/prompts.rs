//! Prompts for the memory chat.

pub const SYSTEM_PROMPT: &str = r#"You are a helpful AI assistant with persistent memory powered by Keyoku.

You have access to memories from previous conversations that may be relevant to the current discussion. Use these memories to:
1. Remember user preferences and personalize responses
2. Reference past conversations when relevant
3. Build on previous discussions rather than starting fresh

When you learn something new about the user (their name, preferences, facts about them, their work), acknowledge it naturally in your response.

Be conversational, helpful, and demonstrate that you remember things across sessions. If a user asks what you remember about them, summarize the relevant memories you have.

Important: Always be accurate about what you remember. Don't make up information that isn't in your memory context."#;

pub const NO_MEMORY_CONTEXT: &str = "No relevant memories found for this conversation yet. This appears to be a new topic or the start of our interaction.";

/// Wrap numbered memory lines in the retrieval context block.
pub fn memory_context(memories: &str) -> String {
    format!(
        "Here are relevant memories from previous conversations:\n\n\
         {memories}\n\n\
         Use these memories to provide personalized, context-aware responses. \
         If the memories aren't relevant to the current question, you can acknowledge \
         them briefly or focus on the current topic."
    )
}

/// Transcript of one turn, as stored in memory and sent for extraction.
pub fn turn_transcript(user: &str, assistant: &str) -> String {
    format!("User: {user}\nAssistant: {assistant}")
}
