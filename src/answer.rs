//! Answer composition
//!
//! Builds the language-model prompt from retrieved pages and streams the
//! generated answer. The assembled user prompt is capped at a fixed
//! character budget; pages are appended in retrieval-rank order so the
//! cut drops the lowest-ranked content first. The question itself is
//! never truncated.

use crate::error::{Error, Result};
use crate::generate::Generator;
use crate::store::Page;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// Maximum length of the assembled user prompt, in characters
pub const MAX_PROMPT_CHARS: usize = 20_000;

/// System prompt for context-grounded answers
pub const SYSTEM_PROMPT_CONTEXT: &str = "\
You are an assistant with access to relevant pages from a knowledge base. Answer questions based only on the information within these pages. Do not make assumptions or provide information outside of the content provided.

Each page includes:
- Title: The title of the page
- URL: The URL of the page
- Text: The text content of the page

Use the text content of each relevant page to answer the user's question as accurately as possible, referring to specific information only as it appears in the provided text.
Make sure to provide the URL referenced primarily in your response at the end of your answer.

1. The answers you provide should use only simple HTML. Do not use any syntax similar to markdown. Convert it to HTML.
2. Backquotes should use <pre> tags.
3. The reference should be enclosed with an <a href> tag pointing to the correct URL.
4. Separate the reference in a separate <p>paragraph</p>. List all used references in an unordered list.

If the user's question cannot be answered using this information, only respond if the information can be inferred otherwise decline to answer stating that there is not enough information in your knowledge base.";

/// System prompt for answers without retrieved context
pub const SYSTEM_PROMPT_GENERAL: &str = "\
You are an assistant answering questions about a documentation knowledge base from your general training knowledge. Decline to answer anything unrelated.
Provide references if you have them available.

Answer the user's question as accurately as possible.

1. The answers you provide should use only simple HTML. Do not use any syntax similar to markdown. Convert it to HTML.
2. Backquotes should use <pre> tags.
3. The reference should be enclosed with an <a href> tag pointing to the correct URL.
4. Separate the reference in a separate <p>paragraph</p>. List all used references in an unordered list.

If the user's question cannot be answered using this information, respond by indicating that the information is not available in the provided resources.";

/// Composes streamed answers from retrieved pages
#[derive(Clone)]
pub struct AnswerComposer {
    generator: Arc<dyn Generator>,
}

impl AnswerComposer {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }

    /// Stream an answer grounded in the given pages, best-ranked first
    pub async fn compose(
        &self,
        question: &str,
        pages: &[Page],
    ) -> Result<mpsc::Receiver<String>> {
        let user_prompt = build_user_prompt(question, pages)?;
        debug!(
            "Composed prompt of {} chars from {} pages",
            user_prompt.chars().count(),
            pages.len()
        );
        self.generator
            .stream(SYSTEM_PROMPT_CONTEXT, &user_prompt)
            .await
    }

    /// Stream an answer without retrieval context
    pub async fn compose_direct(&self, question: &str) -> Result<mpsc::Receiver<String>> {
        self.generator.stream(SYSTEM_PROMPT_GENERAL, question).await
    }
}

/// Assemble the user prompt: question first, then each page's title, url
/// and text in rank order, truncated to [`MAX_PROMPT_CHARS`] characters
/// from the end.
///
/// A question that alone exceeds the budget is rejected, since truncating
/// it would silently change what is being asked.
pub fn build_user_prompt(question: &str, pages: &[Page]) -> Result<String> {
    let mut prompt = format!("User question: {}\n\nRelevant pages:\n", question);
    if prompt.chars().count() > MAX_PROMPT_CHARS {
        return Err(Error::Validation(format!(
            "question exceeds the {} character prompt budget",
            MAX_PROMPT_CHARS
        )));
    }

    let body = pages
        .iter()
        .map(|page| format!("Title: {}\nURL: {}\nText: {}", page.title, page.url, page.text))
        .collect::<Vec<_>>()
        .join("\n\n");
    prompt.push_str(&body);

    Ok(truncate_chars(prompt, MAX_PROMPT_CHARS))
}

/// Truncate to at most `max` characters (not bytes), keeping the start
fn truncate_chars(mut s: String, max: usize) -> String {
    if let Some((idx, _)) = s.char_indices().nth(max) {
        s.truncate(idx);
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::FakeGenerator;

    fn page(id: i64, title: &str, text: &str) -> Page {
        Page {
            id,
            url: format!("https://x/{}", title.to_lowercase()),
            title: title.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_prompt_contains_question_and_pages_in_rank_order() {
        let pages = vec![page(1, "First", "aaa"), page(2, "Second", "bbb")];
        let prompt = build_user_prompt("how?", &pages).unwrap();

        assert!(prompt.starts_with("User question: how?"));
        let first = prompt.find("Title: First").unwrap();
        let second = prompt.find("Title: Second").unwrap();
        assert!(first < second);
        assert!(prompt.contains("URL: https://x/first"));
    }

    #[test]
    fn test_truncates_to_exact_budget_keeping_question() {
        let big = "x".repeat(15_000);
        let pages = vec![page(1, "A", &big), page(2, "B", &big)];
        let prompt = build_user_prompt("what is it?", &pages).unwrap();

        assert_eq!(prompt.chars().count(), MAX_PROMPT_CHARS);
        assert!(prompt.starts_with("User question: what is it?"));
        // the tail (lowest-ranked page) took the cut
        assert!(prompt.contains("Title: A"));
    }

    #[test]
    fn test_short_prompt_not_padded() {
        let prompt = build_user_prompt("q", &[page(1, "A", "tiny")]).unwrap();
        assert!(prompt.chars().count() < MAX_PROMPT_CHARS);
    }

    #[test]
    fn test_oversized_question_rejected() {
        let question = "q".repeat(MAX_PROMPT_CHARS + 1);
        let err = build_user_prompt(&question, &[]).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        // multi-byte characters must not be split
        let big = "é".repeat(25_000);
        let pages = vec![page(1, "A", &big)];
        let prompt = build_user_prompt("q", &pages).unwrap();
        assert_eq!(prompt.chars().count(), MAX_PROMPT_CHARS);
    }

    #[tokio::test]
    async fn test_compose_streams_generator_output() {
        let composer = AnswerComposer::new(Arc::new(FakeGenerator::new(["an", "swer"])));
        let mut rx = composer.compose("q", &[page(1, "A", "text")]).await.unwrap();

        let mut out = String::new();
        while let Some(fragment) = rx.recv().await {
            out.push_str(&fragment);
        }
        assert_eq!(out, "answer");
    }

    #[tokio::test]
    async fn test_compose_propagates_unavailable_generator() {
        let composer = AnswerComposer::new(Arc::new(FakeGenerator::unavailable()));
        let err = composer.compose("q", &[]).await.unwrap_err();
        assert!(matches!(err, Error::GenerationUnavailable(_)));
    }
}
