//! Token-based full-text matching over published opinions.
//!
//! MongoDB text indexes cannot be scoped per-partition the way we need, so
//! matching and ranking happen in-process over the (already partition-scoped)
//! opinion set. Relevance is the total number of token hits across title and
//! content; callers break ties by recency.

/// A parsed, case-folded search query.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    tokens: Vec<String>,
}

impl SearchQuery {
    /// Parse a raw user query. Splits on anything non-alphanumeric and
    /// lowercases, so matching is case-insensitive.
    pub fn parse(raw: &str) -> Self {
        Self {
            tokens: tokenize(raw),
        }
    }

    /// An empty query matches everything (used for the plain list view).
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Relevance of a document with the given title and content: the summed
    /// occurrence count of every query token. Zero means no match.
    pub fn relevance(&self, title: &str, content: &str) -> usize {
        let title_tokens = tokenize(title);
        let content_tokens = tokenize(content);
        self.tokens
            .iter()
            .map(|needle| {
                title_tokens.iter().filter(|t| *t == needle).count()
                    + content_tokens.iter().filter(|t| *t == needle).count()
            })
            .sum()
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}
