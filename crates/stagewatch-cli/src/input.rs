//! Line input for the CLI: files or stdin, plain text or JSON records.

use std::path::Path;

use anyhow::{Context, Result};
use stagewatch_core::TransportRecord;
use stagewatch_pipeline::ViewerEvent;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tracing::debug;

/// Interpret one input line.
///
/// Lines that parse as a JSON transport record (`{"output": ..., "timestamp": ...}`)
/// are taken as such; anything else is plain log text.
pub fn parse_line(line: &str) -> TransportRecord {
    let trimmed = line.trim_start();
    if trimmed.starts_with('{') {
        if let Ok(record) = serde_json::from_str::<TransportRecord>(trimmed) {
            return record;
        }
    }
    TransportRecord::new(line.trim_end_matches(['\r', '\n']))
}

/// Read every line from `source` (`-` for stdin).
pub async fn read_all(source: &Path) -> Result<Vec<TransportRecord>> {
    let mut records = Vec::new();
    let reader = open(source).await?;
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await.context("Failed to read log input")? {
        records.push(parse_line(&line));
    }
    Ok(records)
}

/// Stream lines from `source` into `tx` as content events of up to `batch` lines.
///
/// Returns the number of lines read. Stops early if the receiver is gone.
pub async fn feed(source: &Path, batch: usize, tx: mpsc::Sender<ViewerEvent>) -> Result<usize> {
    let batch = batch.max(1);
    let reader = open(source).await?;
    let mut lines = BufReader::new(reader).lines();
    let mut pending = Vec::with_capacity(batch);
    let mut total = 0;

    while let Some(line) = lines.next_line().await.context("Failed to read log input")? {
        pending.push(parse_line(&line));
        total += 1;

        if pending.len() == batch {
            let chunk = std::mem::replace(&mut pending, Vec::with_capacity(batch));
            if tx.send(ViewerEvent::ContentArrived(chunk)).await.is_err() {
                debug!("session closed, stopping input feed");
                return Ok(total);
            }
        }
    }

    if !pending.is_empty() {
        tx.send(ViewerEvent::ContentArrived(pending)).await.ok();
    }
    Ok(total)
}

async fn open(source: &Path) -> Result<Box<dyn AsyncRead + Unpin + Send>> {
    if source == Path::new("-") {
        return Ok(Box::new(tokio::io::stdin()));
    }
    let file = tokio::fs::File::open(source)
        .await
        .context(format!("Failed to open log file {:?}", source))?;
    Ok(Box::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_line() {
        let record = parse_line("Step 1/4 : FROM rust:1.75\r");
        assert_eq!(record.output, "Step 1/4 : FROM rust:1.75");
        assert!(record.timestamp.is_none());
    }

    #[test]
    fn test_parse_json_record() {
        let record = parse_line(r#"{"output":"Cloning repository","timestamp":"2024-03-14T09:26:00Z"}"#);
        assert_eq!(record.output, "Cloning repository");
        assert_eq!(record.timestamp.as_deref(), Some("2024-03-14T09:26:00Z"));
    }

    #[test]
    fn test_parse_braced_text_stays_plain() {
        let record = parse_line("{ build: ok }");
        assert_eq!(record.output, "{ build: ok }");
    }

    #[tokio::test]
    async fn test_feed_batches_lines() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("deploy.log");
        std::fs::write(&path, "a\nb\nc\nd\ne\n").expect("write log");

        let (tx, mut rx) = mpsc::channel(8);
        let total = feed(&path, 2, tx).await.expect("feed");
        assert_eq!(total, 5);

        let mut sizes = Vec::new();
        while let Some(event) = rx.recv().await {
            if let ViewerEvent::ContentArrived(records) = event {
                sizes.push(records.len());
            }
        }
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[tokio::test]
    async fn test_read_all_missing_file() {
        let err = read_all(Path::new("/definitely/not/here.log")).await.unwrap_err();
        assert!(err.to_string().contains("Failed to open log file"));
    }
}
