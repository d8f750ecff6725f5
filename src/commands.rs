use anyhow::{Context, Result};
use console::style;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{error, info};

use crate::chunking::DocumentMetadata;
use crate::rag::{EmailRequest, IngestResult, RagPipeline};

/// File extensions accepted for ingestion
pub const SUPPORTED_EXTENSIONS: [&str; 2] = ["txt", "md"];

/// Outcome of indexing a directory of documents
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexSummary {
    pub files_found: usize,
    pub files_indexed: usize,
    pub files_failed: usize,
    pub total_chunks: usize,
    pub duration: Duration,
}

/// A document read from disk, ready for ingestion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFile {
    pub content: String,
    pub metadata: DocumentMetadata,
}

#[inline]
pub fn is_supported_document(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
}

/// Read a `.txt` or `.md` file.
///
/// The title defaults to the file name, the source to the file path, and the
/// type is the lowercase extension with its leading dot.
#[inline]
pub async fn read_document(
    path: &Path,
    title: Option<String>,
    source: Option<String>,
) -> Result<DocumentFile> {
    if !is_supported_document(path) {
        return Err(anyhow::anyhow!(
            "Unsupported file type: {} (expected one of: {})",
            path.display(),
            SUPPORTED_EXTENSIONS.join(", ")
        ));
    }

    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned());
    let content_type = path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()));

    Ok(DocumentFile {
        content,
        metadata: DocumentMetadata {
            title: title.or(file_name),
            source: source.or_else(|| Some(path.display().to_string())),
            content_type,
        },
    })
}

/// Ingest a single document file
#[inline]
pub async fn ingest_file(
    pipeline: &RagPipeline,
    path: &Path,
    title: Option<String>,
    source: Option<String>,
) -> Result<IngestResult> {
    let document = read_document(path, title, source).await?;
    info!(
        "Ingesting {} ({} characters)",
        path.display(),
        document.content.chars().count()
    );

    let result = pipeline
        .ingest(&document.content, document.metadata)
        .await
        .with_context(|| format!("Failed to ingest {}", path.display()))?;

    println!(
        "{} Ingested {} ({} chunks)",
        style("✓").green(),
        path.display(),
        result.chunks_created
    );
    Ok(result)
}

/// Supported files directly inside `dir`, sorted by name
#[inline]
pub async fn list_documents(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("Failed to read directory {}", dir.display()))?;

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if entry.file_type().await?.is_file() && is_supported_document(&path) {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// Ingest every supported file in `dir`, continuing past per-file failures
#[inline]
pub async fn index_directory(pipeline: &RagPipeline, dir: &Path) -> Result<IndexSummary> {
    let start = Instant::now();
    let files = list_documents(dir).await?;

    let mut summary = IndexSummary {
        files_found: files.len(),
        ..IndexSummary::default()
    };

    println!("Found {} document(s) in {}", files.len(), dir.display());
    if files.is_empty() {
        return Ok(summary);
    }

    let bar = if console::user_attended_stderr() {
        ProgressBar::new(files.len() as u64).with_style(
            ProgressStyle::with_template("{spinner} [{pos}/{len}] Indexing {msg}")
                .expect("style template is valid"),
        )
    } else {
        ProgressBar::hidden()
    };

    for path in &files {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        bar.set_message(name.clone());

        let outcome = async {
            let document = read_document(path, None, None).await?;
            Ok::<_, anyhow::Error>(pipeline.ingest(&document.content, document.metadata).await?)
        }
        .await;

        match outcome {
            Ok(result) => {
                summary.files_indexed += 1;
                summary.total_chunks += result.chunks_created;
                bar.println(format!(
                    "  {} {} ({} chunks)",
                    style("✓").green(),
                    name,
                    result.chunks_created
                ));
            }
            Err(e) => {
                summary.files_failed += 1;
                error!("Failed to index {}: {:#}", path.display(), e);
                bar.println(format!("  {} {}: {:#}", style("✗").red(), name, e));
            }
        }
        bar.inc(1);
    }

    bar.finish_and_clear();
    summary.duration = start.elapsed();
    print_index_summary(&summary);

    Ok(summary)
}

fn print_index_summary(summary: &IndexSummary) {
    println!();
    println!("{}", "=".repeat(50));
    println!("Files processed: {}", summary.files_found);
    println!("Indexed:         {}", style(summary.files_indexed).green());
    if summary.files_failed > 0 {
        println!("Failed:          {}", style(summary.files_failed).red());
    }
    println!("Chunks created:  {}", summary.total_chunks);
    println!("Duration:        {:.2}s", summary.duration.as_secs_f64());
    println!("{}", "=".repeat(50));
}

/// Print the stored chunks most similar to `query`
#[inline]
pub async fn search(pipeline: &RagPipeline, query: &str, top_k: usize) -> Result<()> {
    let documents = pipeline.retrieve(query, top_k).await?;

    if documents.is_empty() {
        println!("No matching documents. Use 'mail-rag ingest <file>' to add some.");
        return Ok(());
    }

    println!("{} result(s) for \"{}\":", documents.len(), query);
    println!();
    for (i, doc) in documents.iter().enumerate() {
        println!(
            "{}. {} {}",
            i + 1,
            style(doc.metadata.title().unwrap_or("Document")).bold(),
            style(format!("(score {:.3})", doc.score)).dim()
        );
        println!("   {}", doc.text);
        println!();
    }

    Ok(())
}

/// Draft a reply to an email and print it, as JSON when `json` is set
#[inline]
pub async fn answer(pipeline: &RagPipeline, request: &EmailRequest, json: bool) -> Result<()> {
    let response = pipeline.answer_email(request).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    println!("{}", response.response);
    println!();
    println!("{}", "-".repeat(50));
    println!("Intention:  {}", style(response.intention).cyan());
    println!("Confidence: {}%", response.confidence);
    println!(
        "Documents:  {} found, {} used",
        response.stats.documents_found, response.stats.documents_used
    );
    for source in &response.sources {
        println!("  - {} ({}%)", source.title, source.score);
    }
    println!(
        "Time:       {:.2}s (generation {:.2}s)",
        response.processing_time, response.stats.llm_processing_time
    );

    Ok(())
}

#[inline]
pub async fn show_intention(pipeline: &RagPipeline, subject: &str, body: &str) -> Result<()> {
    if subject.trim().is_empty() || body.trim().is_empty() {
        return Err(anyhow::anyhow!("Both subject and body are required"));
    }

    let intention = pipeline.detect_intention(subject, body).await;
    println!("{intention}");
    Ok(())
}

#[inline]
pub async fn show_stats(pipeline: &RagPipeline) -> Result<()> {
    let stats = pipeline.stats().await?;

    println!("{}", style("📊 Knowledge Base").bold().cyan());
    println!("   Collection: {}", stats.collection_name);
    println!("   Chunks:     {}", stats.total_chunks);
    Ok(())
}

/// Print component health; returns whether everything is healthy
#[inline]
pub async fn show_health(pipeline: &RagPipeline) -> bool {
    let report = pipeline.health_check().await;

    let status = |ok: bool| {
        if ok {
            style("✅ OK").green()
        } else {
            style("❌ Unavailable").red()
        }
    };

    println!("{}", style("🩺 Health Check").bold().cyan());
    println!("   Vector store: {}", status(report.vector_store));
    println!("   Ollama:       {}", status(report.llm));

    report.is_healthy()
}

/// Remove every chunk, asking for confirmation unless `assume_yes`
#[inline]
pub async fn clear_knowledge_base(pipeline: &RagPipeline, assume_yes: bool) -> Result<()> {
    let stats = pipeline.stats().await?;

    if stats.total_chunks == 0 {
        println!("{} The knowledge base is already empty", style("⚠").yellow());
        return Ok(());
    }

    println!(
        "{}",
        style(format!(
            "This will delete {} chunks from {}.",
            stats.total_chunks, stats.collection_name
        ))
        .red()
    );

    if !assume_yes
        && !Confirm::new()
            .with_prompt("Clear the knowledge base? This action cannot be undone.")
            .default(false)
            .interact()?
    {
        println!("Aborted.");
        return Ok(());
    }

    pipeline.clear().await?;
    println!("{} Knowledge base cleared", style("✓").green());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn supported_extensions_ignore_case() {
        assert!(is_supported_document(Path::new("policy.txt")));
        assert!(is_supported_document(Path::new("notes/FAQ.MD")));
        assert!(!is_supported_document(Path::new("report.pdf")));
        assert!(!is_supported_document(Path::new("README")));
    }

    #[tokio::test]
    async fn read_document_derives_metadata_from_path() {
        let temp_dir = TempDir::new().expect("should create temp dir");
        let path = temp_dir.path().join("Returns.MD");
        std::fs::write(&path, "# Returns\nItems can be returned within 30 days.")
            .expect("should write file");

        let document = read_document(&path, None, None)
            .await
            .expect("should read document");

        assert!(document.content.starts_with("# Returns"));
        assert_eq!(document.metadata.title.as_deref(), Some("Returns.MD"));
        assert_eq!(
            document.metadata.source.as_deref(),
            Some(path.display().to_string().as_str())
        );
        assert_eq!(document.metadata.content_type.as_deref(), Some(".md"));
    }

    #[tokio::test]
    async fn read_document_keeps_explicit_metadata() {
        let temp_dir = TempDir::new().expect("should create temp dir");
        let path = temp_dir.path().join("faq.txt");
        std::fs::write(&path, "Question and answer").expect("should write file");

        let document = read_document(&path, Some("FAQ".to_string()), Some("wiki".to_string()))
            .await
            .expect("should read document");

        assert_eq!(document.metadata.title.as_deref(), Some("FAQ"));
        assert_eq!(document.metadata.source.as_deref(), Some("wiki"));
    }

    #[tokio::test]
    async fn read_document_rejects_unsupported_types() {
        let temp_dir = TempDir::new().expect("should create temp dir");
        let path = temp_dir.path().join("scan.pdf");
        std::fs::write(&path, "%PDF-1.4").expect("should write file");

        assert!(read_document(&path, None, None).await.is_err());
    }

    #[tokio::test]
    async fn list_documents_is_sorted_and_filtered() {
        let temp_dir = TempDir::new().expect("should create temp dir");
        for name in ["b.md", "a.txt", "c.pdf", "notes"] {
            std::fs::write(temp_dir.path().join(name), "content").expect("should write file");
        }
        std::fs::create_dir(temp_dir.path().join("nested.txt")).expect("should create dir");

        let files = list_documents(temp_dir.path())
            .await
            .expect("should list documents");
        let names: Vec<String> = files
            .iter()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect();

        assert_eq!(names, vec!["a.txt", "b.md"]);
    }
}
