//! Language-model assistants: a fitness coach, a general Q&A bot and a news
//! summarizer, plus the image classifier stub.
//!
//! Every assistant degrades to an offline answer when the model is not
//! configured or the call fails.

pub mod classifier;
pub mod summarizer;

use crate::api::llm_api::{ChatMessage, LlmClient};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Messages kept per conversation, not counting the system prompt
pub const MAX_HISTORY: usize = 20;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum AssistantError {
    #[error("Message is empty")]
    EmptyMessage,

    #[error("Unknown assistant: {0}")]
    UnknownPersona(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Persona {
    Fitness,
    Qa,
    Summarizer,
}

impl Persona {
    pub fn system_prompt(&self) -> &'static str {
        match self {
            Persona::Fitness => {
                "You are a friendly, practical fitness coach. Give safe, concise advice on \
                 workouts, nutrition, recovery and sleep. Suggest seeing a professional for \
                 injuries or medical conditions."
            }
            Persona::Qa => {
                "You are a helpful assistant. Answer questions accurately and concisely. \
                 Say so when you do not know."
            }
            Persona::Summarizer => {
                "You summarize news articles. Reply with a short neutral summary of the key \
                 facts in three to five sentences."
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Persona::Fitness => "fitness",
            Persona::Qa => "qa",
            Persona::Summarizer => "summarizer",
        }
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Persona {
    type Err = AssistantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fitness" => Ok(Persona::Fitness),
            "qa" | "q&a" | "questions" => Ok(Persona::Qa),
            "summarizer" | "news" => Ok(Persona::Summarizer),
            other => Err(AssistantError::UnknownPersona(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantReply {
    pub persona: Persona,
    pub content: String,
    /// True when the model was unavailable and a canned answer was used
    pub offline: bool,
}

/// Canned answer used when the model cannot be reached
fn offline_reply(persona: Persona, message: &str) -> String {
    match persona {
        Persona::Fitness => {
            let message = message.to_lowercase();
            let tip = if ["protein", "diet", "eat", "food", "calorie"]
                .iter()
                .any(|w| message.contains(w))
            {
                "Aim for a protein source at every meal and mostly whole foods."
            } else if ["sleep", "rest", "recover", "sore"]
                .iter()
                .any(|w| message.contains(w))
            {
                "Most adults recover best with 7-9 hours of sleep and at least one rest day a week."
            } else if ["run", "cardio", "endurance"]
                .iter()
                .any(|w| message.contains(w))
            {
                "Build running volume gradually, roughly 10% per week, with most runs at an easy pace."
            } else {
                "Three full-body strength sessions a week plus daily walking is a solid start."
            };
            format!("The coach is offline right now. General tip: {}", tip)
        }
        Persona::Qa => {
            "The assistant is offline right now, please try again later.".to_string()
        }
        Persona::Summarizer => {
            "The summarizer model is offline right now; try the extractive summary instead."
                .to_string()
        }
    }
}

/// One conversation with an assistant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    persona: Persona,
    history: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new(persona: Persona) -> Self {
        Self {
            persona,
            history: Vec::new(),
        }
    }

    pub fn persona(&self) -> Persona {
        self.persona
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }

    /// System prompt followed by the retained history
    fn prompt(&self) -> Vec<ChatMessage> {
        std::iter::once(ChatMessage::system(self.persona.system_prompt()))
            .chain(self.history.iter().cloned())
            .collect()
    }

    fn push(&mut self, message: ChatMessage) {
        self.history.push(message);
        if self.history.len() > MAX_HISTORY {
            let excess = self.history.len() - MAX_HISTORY;
            self.history.drain(..excess);
        }
    }

    /// Ask the assistant. Without a client, or when the call fails, the reply
    /// is a canned offline answer.
    pub async fn reply(
        &mut self,
        llm: Option<&LlmClient>,
        message: &str,
    ) -> Result<AssistantReply, AssistantError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(AssistantError::EmptyMessage);
        }

        self.push(ChatMessage::user(message));

        let completion = match llm {
            Some(client) => match client.complete(&self.prompt()).await {
                Ok(content) => Some(content),
                Err(e) => {
                    tracing::warn!("{} assistant falling back to offline reply: {:#}", self.persona, e);
                    None
                }
            },
            None => None,
        };

        let offline = completion.is_none();
        let content = completion.unwrap_or_else(|| offline_reply(self.persona, message));
        self.push(ChatMessage::assistant(content.clone()));

        Ok(AssistantReply {
            persona: self.persona,
            content,
            offline,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::llm_api::Role;

    #[test]
    fn test_persona_parsing() {
        assert_eq!("fitness".parse::<Persona>().unwrap(), Persona::Fitness);
        assert_eq!("QA".parse::<Persona>().unwrap(), Persona::Qa);
        assert_eq!(
            "chef".parse::<Persona>().unwrap_err(),
            AssistantError::UnknownPersona("chef".to_string())
        );
        assert_eq!(Persona::Qa.to_string(), "qa");
    }

    #[tokio::test]
    async fn test_offline_reply() {
        let mut session = ChatSession::new(Persona::Fitness);
        let reply = session
            .reply(None, "How much protein should I eat?")
            .await
            .unwrap();
        assert!(reply.offline);
        assert!(reply.content.contains("protein"));
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.history()[0].role, Role::User);
        assert_eq!(session.history()[1].role, Role::Assistant);
    }

    #[tokio::test]
    async fn test_empty_message() {
        let mut session = ChatSession::new(Persona::Qa);
        assert_eq!(
            session.reply(None, "   ").await.unwrap_err(),
            AssistantError::EmptyMessage
        );
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn test_history_is_bounded() {
        let mut session = ChatSession::new(Persona::Qa);
        for i in 0..15 {
            session.reply(None, &format!("question {}", i)).await.unwrap();
        }
        assert_eq!(session.history().len(), MAX_HISTORY);
        // Oldest exchanges were dropped
        assert_eq!(session.history()[0].content, "question 5");

        let prompt = session.prompt();
        assert_eq!(prompt.len(), MAX_HISTORY + 1);
        assert_eq!(prompt[0].role, Role::System);
    }
}
