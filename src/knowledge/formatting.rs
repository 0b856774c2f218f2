use chrono::{DateTime, Utc};
use colored::Colorize;

use crate::knowledge::types::{KnowledgeManifest, SearchHit};

pub fn format_search_results(results: &[SearchHit]) -> String {
    if results.is_empty() {
        return "No results found".to_string();
    }

    let mut output = String::new();

    for (rank, result) in results.iter().enumerate() {
        output.push_str(&"━".repeat(60));
        output.push('\n');

        output.push_str(
            &format!(
                "#{} {} p.{}",
                rank + 1,
                result.chunk.metadata.source,
                result.chunk.metadata.page
            )
            .blue()
            .bold()
            .to_string(),
        );
        output.push('\n');

        // Content preview (first 300 chars)
        let content = if result.chunk.text.chars().count() > 300 {
            format!("{}...", truncate_chars(&result.chunk.text, 300))
        } else {
            result.chunk.text.clone()
        };
        output.push_str(&content);
        output.push('\n');

        let score_pct = (result.relevance_score * 100.0) as i32;
        output.push_str(&format!("{}% relevant", score_pct).green().to_string());
        output.push_str("\n\n");
    }

    output
}

pub fn format_manifest(manifest: Option<&KnowledgeManifest>) -> String {
    let Some(manifest) = manifest else {
        return "No knowledge base built yet. Run `deckbrain learn` first.".to_string();
    };

    let mut output = String::new();

    output.push_str(&"Knowledge Base".bold().to_string());
    output.push('\n');
    output.push_str(&format!("Source: {}", manifest.source_path.display()));
    output.push('\n');
    output.push_str(&format!(
        "SHA-256: {}",
        manifest.source_sha256.bright_black()
    ));
    output.push('\n');
    output.push_str(&format!("Pages: {}", manifest.page_count));
    output.push('\n');
    output.push_str(&format!("Chunks: {}", manifest.chunk_count));
    output.push('\n');
    output.push_str(&format!(
        "Embedding: {} ({} dims)",
        manifest.embedding_model, manifest.vector_dim
    ));
    output.push('\n');
    output.push_str(&format!("Built: {}", format_relative_time(manifest.built_at)));
    output.push('\n');
    output.push_str(&format!(
        "Generation: {}",
        manifest.generation.bright_black()
    ));
    output.push('\n');

    output
}

fn format_relative_time(dt: DateTime<Utc>) -> String {
    let now = Utc::now();
    let duration = now.signed_duration_since(dt);

    if duration.num_days() > 0 {
        format!("{} days ago", duration.num_days())
    } else if duration.num_hours() > 0 {
        format!("{} hours ago", duration.num_hours())
    } else if duration.num_minutes() > 0 {
        format!("{} minutes ago", duration.num_minutes())
    } else {
        "just now".to_string()
    }
}

fn truncate_chars(input: &str, max_chars: usize) -> String {
    input.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::types::{Chunk, ChunkMetadata};

    #[test]
    fn test_empty_results() {
        assert_eq!(format_search_results(&[]), "No results found");
    }

    #[test]
    fn test_long_content_is_truncated() {
        colored::control::set_override(false);
        let hit = SearchHit {
            chunk: Chunk {
                text: "x".repeat(500),
                metadata: ChunkMetadata {
                    source: "manual_doc.pdf".to_string(),
                    page: 7,
                },
            },
            relevance_score: 0.75,
        };

        let output = format_search_results(&[hit]);
        assert!(output.contains("#1 manual_doc.pdf p.7"));
        assert!(output.contains(&format!("{}...", "x".repeat(300))));
        assert!(!output.contains(&"x".repeat(301)));
        assert!(output.contains("75% relevant"));
    }

    #[test]
    fn test_missing_manifest() {
        assert!(format_manifest(None).contains("deckbrain learn"));
    }
}
