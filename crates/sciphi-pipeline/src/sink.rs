//! Newline-delimited JSON output, one result per line, flushed as written.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use sciphi_core::types::GenerationResult;

use crate::error::PipelineError;

/// Single-writer JSONL sink.
pub struct JsonlSink<W: Write> {
    writer: W,
    written: usize,
}

impl<W: Write> JsonlSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Append one result and flush, so a crash never loses a written line.
    pub fn write(&mut self, result: &GenerationResult) -> Result<(), PipelineError> {
        let line = serde_json::to_string(result)?;
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.written += 1;
        Ok(())
    }

    /// Number of lines written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl JsonlSink<BufWriter<File>> {
    /// Create (or truncate) `path`, creating parent directories as needed.
    pub fn create(path: &Path) -> Result<Self, PipelineError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sciphi_core::types::{GenerationStatus, ProviderName};

    fn result(id: &str) -> GenerationResult {
        GenerationResult {
            record_id: id.into(),
            status: GenerationStatus::Done,
            output: Some(serde_json::json!("text")),
            error: None,
            failed_at: None,
            attempts: 1,
            provider: ProviderName::OpenAi,
            model: "gpt-4".into(),
            grounded: false,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_one_line_per_result() {
        let mut sink = JsonlSink::new(Vec::new());
        sink.write(&result("a")).unwrap();
        sink.write(&result("b")).unwrap();
        assert_eq!(sink.written(), 2);

        let out = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["record_id"], "a");
    }

    #[test]
    fn test_create_writes_through_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.jsonl");

        let mut sink = JsonlSink::create(&path).unwrap();
        sink.write(&result("1")).unwrap();

        // Flushed before the sink is dropped
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.ends_with('\n'));
    }
}
