//! File-backed knowledge base.
//!
//! Loads `.txt` and `.md` documents from a directory, splits them into
//! bounded passages, and serves keyword-overlap search for the
//! auto-respond branch. The passage index is built exactly once behind a
//! `tokio::sync::OnceCell`: `main` initializes it during startup, and a
//! concurrent first use from multiple executions still builds it only
//! once. There is no module-level state.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::error::RetrievalError;
use crate::workflow::ports::KnowledgeRetriever;

/// Maximum passage length in characters.
const CHUNK_SIZE: usize = 1000;

/// Number of passages returned per search.
const TOP_K: usize = 4;

/// Minimum term length considered during scoring.
const MIN_TERM_LEN: usize = 3;

/// A single indexed passage.
#[derive(Debug, Clone)]
struct Passage {
    text: String,
}

/// Keyword-searchable knowledge base over a directory of documents.
pub struct KnowledgeBase {
    dir: PathBuf,
    index: OnceCell<Vec<Passage>>,
}

impl KnowledgeBase {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            index: OnceCell::new(),
        }
    }

    /// Build the passage index now instead of on first search.
    ///
    /// Returns the number of indexed passages.
    pub async fn ensure_loaded(&self) -> Result<usize, RetrievalError> {
        let index = self.passages().await?;
        Ok(index.len())
    }

    async fn passages(&self) -> Result<&Vec<Passage>, RetrievalError> {
        self.index
            .get_or_try_init(|| async {
                let passages = load_passages(&self.dir).await?;
                info!(
                    dir = %self.dir.display(),
                    passages = passages.len(),
                    "Knowledge base loaded"
                );
                Ok(passages)
            })
            .await
    }
}

#[async_trait]
impl KnowledgeRetriever for KnowledgeBase {
    async fn search(&self, body: &str) -> Result<Vec<String>, RetrievalError> {
        let terms = tokenize(body);
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let passages = self.passages().await?;

        let mut scored: Vec<(f32, &Passage)> = passages
            .iter()
            .map(|p| (score(&p.text, &terms), p))
            .filter(|(s, _)| *s > 0.0)
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(TOP_K);

        debug!(hits = scored.len(), "Knowledge search complete");
        Ok(scored.into_iter().map(|(_, p)| p.text.clone()).collect())
    }
}

/// Read every `.txt`/`.md` file in `dir` (non-recursive) and chunk it.
async fn load_passages(dir: &Path) -> Result<Vec<Passage>, RetrievalError> {
    let mut passages = Vec::new();
    let mut entries = fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_doc = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("txt" | "md")
        );
        if !is_doc || !entry.metadata().await?.is_file() {
            continue;
        }

        let content = fs::read_to_string(&path).await?;
        let chunks = chunk_document(&content);
        debug!(file = %path.display(), chunks = chunks.len(), "Indexed document");
        for chunk in chunks {
            passages.push(Passage { text: chunk });
        }
    }

    Ok(passages)
}

/// Split a document into passages of at most [`CHUNK_SIZE`] characters,
/// packing whole paragraphs together where they fit.
fn chunk_document(content: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for paragraph in content.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        if paragraph.chars().count() > CHUNK_SIZE {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            // Oversized paragraph: hard-split on character boundaries.
            let chars: Vec<char> = paragraph.chars().collect();
            for piece in chars.chunks(CHUNK_SIZE) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }

        let appended_len = current.chars().count() + paragraph.chars().count() + 2;
        if !current.is_empty() && appended_len > CHUNK_SIZE {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(paragraph);
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Lowercased, deduplicated alphanumeric terms of a query.
fn tokenize(text: &str) -> Vec<String> {
    let mut terms: Vec<String> = text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= MIN_TERM_LEN)
        .map(str::to_string)
        .collect();
    terms.sort();
    terms.dedup();
    terms
}

/// Fraction of query terms present in the passage.
fn score(passage: &str, terms: &[String]) -> f32 {
    let passage_lower = passage.to_lowercase();
    let matched = terms.iter().filter(|t| passage_lower.contains(*t)).count();
    matched as f32 / terms.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn kb_with_files(files: &[(&str, &str)]) -> (KnowledgeBase, TempDir) {
        let dir = TempDir::new().unwrap();
        for (name, content) in files {
            std::fs::write(dir.path().join(name), content).unwrap();
        }
        (KnowledgeBase::new(dir.path()), dir)
    }

    #[tokio::test]
    async fn search_ranks_relevant_passage_first() {
        let (kb, _dir) = kb_with_files(&[
            (
                "shipping.txt",
                "Standard orders ship within 2 business days.\n\n\
                 Expedited shipping is available for a surcharge.",
            ),
            ("returns.txt", "Returns are accepted within 30 days of purchase."),
        ])
        .await;

        let results = kb.search("when does my order ship?").await.unwrap();
        assert!(!results.is_empty());
        assert!(results[0].contains("ship within 2 business days"));
    }

    #[tokio::test]
    async fn no_match_returns_empty() {
        let (kb, _dir) = kb_with_files(&[("faq.txt", "Our store opens at nine.")]).await;
        let results = kb.search("quantum entanglement").await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn empty_query_returns_empty_without_touching_index() {
        let (kb, _dir) = kb_with_files(&[("faq.txt", "content")]).await;
        let results = kb.search("").await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn non_document_files_are_skipped() {
        let (kb, _dir) = kb_with_files(&[
            ("faq.txt", "Warranty lasts two years."),
            ("image.png", "binaryish"),
        ])
        .await;
        assert_eq!(kb.ensure_loaded().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn ensure_loaded_is_idempotent() {
        let (kb, dir) = kb_with_files(&[("faq.txt", "Warranty lasts two years.")]).await;
        let first = kb.ensure_loaded().await.unwrap();

        // Adding a file after the index is built must not change it.
        std::fs::write(dir.path().join("late.txt"), "late content").unwrap();
        let second = kb.ensure_loaded().await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn missing_directory_is_an_error() {
        let kb = KnowledgeBase::new("/nonexistent/knowledge_base");
        assert!(kb.ensure_loaded().await.is_err());
    }

    #[tokio::test]
    async fn results_are_capped_at_top_k() {
        let paragraphs: Vec<String> = (0..10)
            .map(|i| format!("Shipping note number {i}: parcels ship quickly."))
            .collect();
        let content = paragraphs.join("\n\n");
        let dir = TempDir::new().unwrap();
        // One paragraph per file so each becomes its own passage.
        for (i, p) in content.split("\n\n").enumerate() {
            std::fs::write(dir.path().join(format!("doc{i}.txt")), p).unwrap();
        }
        let kb = KnowledgeBase::new(dir.path());

        let results = kb.search("shipping parcels").await.unwrap();
        assert_eq!(results.len(), TOP_K);
    }

    #[test]
    fn chunking_respects_size_bound() {
        let long = "word ".repeat(600); // ~3000 chars, single paragraph
        let chunks = chunk_document(&long);
        assert!(chunks.len() >= 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= CHUNK_SIZE));
    }

    #[test]
    fn chunking_packs_small_paragraphs() {
        let content = "first paragraph\n\nsecond paragraph\n\nthird paragraph";
        let chunks = chunk_document(content);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].contains("first paragraph"));
        assert!(chunks[0].contains("third paragraph"));
    }

    #[test]
    fn tokenize_drops_short_terms_and_dedups() {
        let terms = tokenize("Is my order my ORDER on its way?");
        assert!(terms.contains(&"order".to_string()));
        assert!(!terms.contains(&"is".to_string()));
        assert_eq!(terms.iter().filter(|t| *t == "order").count(), 1);
    }
}
