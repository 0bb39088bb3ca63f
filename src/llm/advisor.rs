use anyhow::Result;
use async_trait::async_trait;

use crate::config::LlmConfig;
use crate::llm::chat::chat_single;

/// Generate a short advisory text from the query and the top passage.
/// Best-effort: callers must tolerate failure and return the base result
/// unchanged.
#[async_trait]
pub trait Advisor: Send + Sync {
    async fn advise(&self, query: &str, passage: &str) -> Result<String>;
}

/// Advisor backed by the configured chat model.
pub struct ChatAdvisor {
    client: reqwest::Client,
    config: LlmConfig,
}

impl ChatAdvisor {
    pub fn new(client: reqwest::Client, config: LlmConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl Advisor for ChatAdvisor {
    async fn advise(&self, query: &str, passage: &str) -> Result<String> {
        let passage = truncate_passage(passage, 1_500);
        let prompt = format!(
            "A reader asked: \"{query}\"\n\n\
             The most relevant Bhagavad Gita passage is:\n{passage}\n\n\
             In 3-4 sentences, offer practical, compassionate advice grounded \
             in this passage. Address the reader directly. Do not quote the \
             passage back or add headers."
        );
        let advice = chat_single(&self.client, &self.config, &prompt).await?;
        Ok(advice.trim().to_string())
    }
}

fn truncate_passage(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{cut}...")
    }
}
