//! Retrieval quality scoring.
//!
//! Scores how early the expected source document appears in the ranked
//! retrieval order (Recall@K and mean reciprocal rank), plus a coverage
//! check that compares chunked character volume against the extracted text —
//! a cheap tripwire for silent data loss in the ingestion pipeline.

use serde::{Deserialize, Serialize};

use crate::retrieve::Hit;
use crate::service::{RagService, ServiceError};
use crate::store::CorpusStore;

/// One evaluation query with its expected source document.
#[derive(Debug, Deserialize)]
pub struct EvalCase {
    pub question: String,
    pub source_doc: String,
}

#[derive(Debug, Serialize)]
pub struct EvalSummary {
    pub cases: usize,
    pub top_k: usize,
    pub recall_at_k: f64,
    pub mean_reciprocal_rank: f64,
}

/// 1/rank of the first hit whose source matches `expected_doc`
/// (case-insensitive substring, rank 1 first), or 0.0 when it never appears.
pub fn reciprocal_rank(hits: &[Hit], expected_doc: &str) -> f64 {
    let needle = expected_doc.to_lowercase();
    for (i, hit) in hits.iter().enumerate() {
        if hit.record.document_name.to_lowercase().contains(&needle) {
            return 1.0 / (i + 1) as f64;
        }
    }
    0.0
}

/// Runs every case against the service's retriever and aggregates.
pub async fn run(
    service: &RagService,
    cases: &[EvalCase],
    top_k: usize,
) -> Result<EvalSummary, ServiceError> {
    let mut found = 0usize;
    let mut rr_total = 0.0;

    for case in cases {
        let hits = service.search(&case.question, top_k).await?;
        let rr = reciprocal_rank(&hits, &case.source_doc);
        if rr > 0.0 {
            found += 1;
        }
        rr_total += rr;
    }

    let n = cases.len().max(1) as f64;
    Ok(EvalSummary {
        cases: cases.len(),
        top_k,
        recall_at_k: found as f64 / n,
        mean_reciprocal_rank: rr_total / n,
    })
}

#[derive(Debug, Serialize)]
pub struct CoverageReport {
    pub text_chars: usize,
    pub chunk_chars: usize,
    /// chunk_chars / text_chars. Below 1.0 means characters were lost;
    /// well above window/(window-overlap) means something duplicated them.
    pub ratio: f64,
}

/// Compares total extracted-text volume against total chunked volume across
/// the whole store.
pub fn coverage(store: &CorpusStore) -> anyhow::Result<CoverageReport> {
    let mut text_chars = 0usize;
    let mut chunk_chars = 0usize;

    for entry in store.list_documents()? {
        if let Some(text) = store.load_text(&entry.name)? {
            text_chars += text.chars().count();
        }
        if let Some(chunks) = store.load_chunks(&entry.name)? {
            chunk_chars += chunks.iter().map(|c| c.chars().count()).sum::<usize>();
        }
    }

    let ratio = if text_chars == 0 {
        0.0
    } else {
        chunk_chars as f64 / text_chars as f64
    };
    Ok(CoverageReport {
        text_chars,
        chunk_chars,
        ratio,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::metadata::MetadataRecord;
    use tempfile::tempdir;

    fn hit(doc: &str, distance: f32) -> Hit {
        Hit {
            record: MetadataRecord {
                document_name: doc.to_string(),
                chunk_id: format!("{doc}_chunk_0"),
                ordinal: 0,
                text: "body".to_string(),
                length: 4,
            },
            distance,
        }
    }

    #[test]
    fn test_reciprocal_rank_first() {
        let hits = vec![hit("policy.pdf", 0.1), hit("parking.txt", 0.9)];
        assert_eq!(reciprocal_rank(&hits, "policy.pdf"), 1.0);
    }

    #[test]
    fn test_reciprocal_rank_second() {
        let hits = vec![hit("parking.txt", 0.1), hit("policy.pdf", 0.9)];
        assert_eq!(reciprocal_rank(&hits, "policy.pdf"), 0.5);
    }

    #[test]
    fn test_reciprocal_rank_absent() {
        let hits = vec![hit("parking.txt", 0.1)];
        assert_eq!(reciprocal_rank(&hits, "policy.pdf"), 0.0);
    }

    #[test]
    fn test_reciprocal_rank_case_insensitive_substring() {
        let hits = vec![hit("Q3-Policy.PDF", 0.1)];
        assert_eq!(reciprocal_rank(&hits, "policy"), 1.0);
    }

    #[test]
    fn test_coverage_accounts_for_overlap() {
        let temp = tempdir().unwrap();
        let store = CorpusStore::open(temp.path()).unwrap();

        let text = "abcdefghij";
        store.save_text("doc.txt", text).unwrap();
        // Window 6, overlap 2 over 10 chars: "abcdef", "efghij"
        store
            .save_chunks(
                "doc.txt",
                &["abcdef".to_string(), "efghij".to_string()],
            )
            .unwrap();

        let report = coverage(&store).unwrap();
        assert_eq!(report.text_chars, 10);
        assert_eq!(report.chunk_chars, 12);
        assert!(report.ratio > 1.0 && report.ratio < 1.3);
    }

    #[test]
    fn test_coverage_empty_store() {
        let temp = tempdir().unwrap();
        let store = CorpusStore::open(temp.path()).unwrap();
        let report = coverage(&store).unwrap();
        assert_eq!(report.text_chars, 0);
        assert_eq!(report.ratio, 0.0);
    }
}
