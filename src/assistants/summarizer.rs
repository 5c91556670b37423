use crate::api::llm_api::{ChatMessage, LlmClient};
use crate::assistants::Persona;
use anyhow::{Context, Result};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Sentences kept by the extractive fallback
pub const DEFAULT_SUMMARY_SENTENCES: usize = 3;
/// Article text sent to the model is capped to keep requests small
const MAX_PROMPT_CHARS: usize = 12_000;

const STOPWORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "but", "if", "of", "to", "in", "on", "at", "for", "with",
    "by", "from", "as", "is", "are", "was", "were", "be", "been", "it", "its", "this", "that",
    "these", "those", "he", "she", "they", "we", "you", "i", "his", "her", "their", "our",
    "has", "have", "had", "not", "will", "would", "can", "could", "said", "says", "also",
    "than", "then", "so", "about", "into", "over", "after", "before", "who", "which", "what",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub summary: String,
    /// True when the extractive fallback produced the summary
    pub offline: bool,
}

/// Fetch a news article and return its paragraph text
pub async fn fetch_article_text(client: &reqwest::Client, url: &str) -> Result<String> {
    let html = client
        .get(url)
        .send()
        .await
        .context("Failed to fetch article")?
        .error_for_status()
        .context("Article request returned an error status")?
        .text()
        .await
        .context("Failed to read article body")?;

    let text = extract_article_text(&html)?;
    if text.is_empty() {
        anyhow::bail!("No article text found at {}", url);
    }
    Ok(text)
}

/// Paragraph text from an HTML page, preferring paragraphs inside `<article>`
pub fn extract_article_text(html: &str) -> Result<String> {
    let document = Html::parse_document(html);
    let article_selector = Selector::parse("article p")
        .ok()
        .context("Invalid article selector")?;
    let paragraph_selector = Selector::parse("p")
        .ok()
        .context("Invalid paragraph selector")?;

    let collect = |selector: &Selector| -> Vec<String> {
        document
            .select(selector)
            .map(|el| {
                el.text()
                    .collect::<String>()
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .filter(|p| !p.is_empty())
            .collect()
    };

    let mut paragraphs = collect(&article_selector);
    if paragraphs.is_empty() {
        paragraphs = collect(&paragraph_selector);
    }

    Ok(paragraphs.join("\n\n"))
}

fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        let at_boundary = matches!(c, '.' | '!' | '?')
            && chars.peek().map_or(true, |next| next.is_whitespace());
        if at_boundary {
            let sentence = current.trim();
            if !sentence.is_empty() {
                sentences.push(sentence.to_string());
            }
            current.clear();
        }
    }

    let rest = current.trim();
    if !rest.is_empty() {
        sentences.push(rest.to_string());
    }
    sentences
}

fn content_words(sentence: &str, stopwords: &HashSet<&str>) -> Vec<String> {
    sentence
        .split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .filter(|w| !w.is_empty() && !stopwords.contains(w.as_str()))
        .collect()
}

/// Pick the `max_sentences` sentences whose words are most frequent across the
/// text, returned in their original order
pub fn extractive_summary(text: &str, max_sentences: usize) -> String {
    let stopwords: HashSet<&str> = STOPWORDS.iter().copied().collect();
    let sentences = split_sentences(text);
    if sentences.len() <= max_sentences {
        return sentences.join(" ");
    }

    let mut frequencies: HashMap<String, usize> = HashMap::new();
    for sentence in &sentences {
        for word in content_words(sentence, &stopwords) {
            *frequencies.entry(word).or_insert(0) += 1;
        }
    }

    let mut scored: Vec<(usize, f64)> = sentences
        .iter()
        .enumerate()
        .map(|(i, sentence)| {
            let words = content_words(sentence, &stopwords);
            let score = if words.is_empty() {
                0.0
            } else {
                words.iter().map(|w| frequencies[w] as f64).sum::<f64>() / words.len() as f64
            };
            (i, score)
        })
        .collect();

    // Highest score first; earlier sentence wins ties
    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });

    let mut keep: Vec<usize> = scored.into_iter().take(max_sentences).map(|(i, _)| i).collect();
    keep.sort_unstable();

    keep.into_iter()
        .map(|i| sentences[i].as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Summarize with the model when available, otherwise extractively
pub async fn summarize(llm: Option<&LlmClient>, text: &str, max_sentences: usize) -> Summary {
    if let Some(client) = llm {
        let excerpt: String = text.chars().take(MAX_PROMPT_CHARS).collect();
        let messages = [
            ChatMessage::system(Persona::Summarizer.system_prompt()),
            ChatMessage::user(excerpt),
        ];
        match client.complete(&messages).await {
            Ok(summary) => {
                return Summary {
                    summary,
                    offline: false,
                }
            }
            Err(e) => tracing::warn!("Summarizer falling back to extractive summary: {:#}", e),
        }
    }

    Summary {
        summary: extractive_summary(text, max_sentences),
        offline: true,
    }
}
