//! Command bodies that write to an output sink.
//!
//! Kept apart from [`crate::cli`] so they can run against any
//! [`Repository`] and any writer.

use f3cp_core::contract::Repository;
use f3cp_core::metadata::Normalizer;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Outcome of an `item` run.
#[derive(Debug, Default)]
pub struct ItemsReport {
    pub objects: usize,
    pub triples: usize,
    pub diagnostics: usize,
}

/// Writes every pid matching `pattern`, one per line, following session
/// tokens until the store stops returning one. Returns the number written.
pub async fn search_all<R, W>(repo: &R, pattern: &str, out: &mut W) -> anyhow::Result<usize>
where
    R: Repository + ?Sized,
    W: AsyncWrite + Unpin,
{
    let mut token: Option<String> = None;
    let mut written = 0;
    loop {
        let page = repo.search(pattern, token.take()).await?;
        for pid in &page.pids {
            out.write_all(pid.as_bytes()).await?;
            out.write_all(b"\n").await?;
            written += 1;
        }
        match page.next_token {
            Some(next) if !page.pids.is_empty() => token = Some(next),
            _ => break,
        }
    }
    out.flush().await?;
    tracing::info!(pattern, written, "search finished");
    Ok(written)
}

/// Normalizes each pid and writes its triples as tab-separated rows.
/// Extraction problems are logged and counted, never fatal.
pub async fn write_items<W, I>(
    repo: &dyn Repository,
    normalizer: &Normalizer,
    ids: I,
    out: &mut W,
) -> anyhow::Result<ItemsReport>
where
    W: AsyncWrite + Unpin,
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut report = ItemsReport::default();
    for id in ids {
        let pid = id.as_ref();
        let normalized = normalizer.normalize(repo, pid).await;
        for diagnostic in &normalized.diagnostics {
            tracing::warn!(
                pid = %diagnostic.pid,
                stream = diagnostic.stream,
                error = %diagnostic.error,
                "metadata stream skipped"
            );
        }
        for triple in &normalized.item.triples {
            out.write_all(triple.to_tsv_row().as_bytes()).await?;
            out.write_all(b"\n").await?;
        }
        report.objects += 1;
        report.triples += normalized.item.triples.len();
        report.diagnostics += normalized.diagnostics.len();
    }
    out.flush().await?;
    Ok(report)
}
