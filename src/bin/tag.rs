//! Derive emotion/problem keywords for every verse with the chat model and
//! write them to emotions.json. Resumable: verses already tagged are
//! skipped, and progress is saved every few verses so an interrupted run
//! loses little work.

use anyhow::{Context, Result};
use std::collections::HashMap;
use tracing_subscriber::EnvFilter;

use verse_search::config::Config;
use verse_search::llm::chat::chat_single;
use verse_search::models::VerseMeta;

const SAVE_EVERY: usize = 10;
const MAX_PURPORT_CHARS: usize = 1_500;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    tracing::info!(
        "Tagging with {} via {}",
        config.llm.chat_model,
        config.llm.base_url
    );

    let data = std::fs::read_to_string(config.corpus_path())
        .with_context(|| format!("Failed to read {}", config.corpus_path().display()))?;
    let verses: Vec<VerseMeta> =
        serde_json::from_str(&data).context("Failed to parse corpus JSON")?;

    let emotions_path = config.emotions_path();
    let mut tags: HashMap<String, String> = if emotions_path.exists() {
        let data = std::fs::read_to_string(&emotions_path)?;
        serde_json::from_str(&data).context("Failed to parse existing emotions file")?
    } else {
        HashMap::new()
    };
    if !tags.is_empty() {
        tracing::info!("Resuming with {} existing tags", tags.len());
    }

    let client = reqwest::Client::builder()
        .connect_timeout(std::time::Duration::from_secs(10))
        .timeout(std::time::Duration::from_secs(120))
        .build()?;

    let total = verses.len();
    let mut done_since_save = 0usize;

    for (i, verse) in verses.iter().enumerate() {
        let verse_id = if verse.verse_id.is_empty() {
            format!("{}.{}", verse.chapter, verse.verse)
        } else {
            verse.verse_id.clone()
        };

        if tags.get(&verse_id).is_some_and(|t| !t.is_empty()) {
            continue;
        }

        let purport: String = verse.purport.chars().take(MAX_PURPORT_CHARS).collect();
        let prompt = format!(
            "Analyze this text from the Bhagavad Gita. Identify 3-5 specific \
             human emotions, mental states, or life problems this verse \
             addresses (e.g. anxiety, grief, duty, confusion, anger, envy, \
             focus). Return ONLY a comma-separated list of lowercase \
             keywords. Do not write a sentence.\n\n\
             Text:\nTranslation: {}\nPurport: {}",
            verse.translation, purport
        );

        let content = chat_single(&client, &config.llm, &prompt)
            .await
            .with_context(|| format!("Tagging {verse_id} failed"))?;
        let keywords = clean_keywords(&content);
        if keywords.is_empty() {
            tracing::warn!("Empty keyword list for {verse_id}, skipping");
            continue;
        }

        tracing::info!("[{}/{total}] {verse_id}: {keywords}", i + 1);
        tags.insert(verse_id, keywords);

        done_since_save += 1;
        if done_since_save >= SAVE_EVERY {
            save_tags(&config, &tags)?;
            done_since_save = 0;
        }
    }

    save_tags(&config, &tags)?;
    tracing::info!("Wrote {} tags to {}", tags.len(), emotions_path.display());
    Ok(())
}

/// Strip chatty prefixes the model sometimes adds despite the prompt.
fn clean_keywords(content: &str) -> String {
    content
        .replace("Here are the keywords:", "")
        .replace("Keywords:", "")
        .trim()
        .to_string()
}

fn save_tags(config: &Config, tags: &HashMap<String, String>) -> Result<()> {
    let data = serde_json::to_string_pretty(tags)?;
    let path = config.emotions_path();
    std::fs::write(&path, data).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
