//! JSONL record source: one JSON object per line.
//!
//! An `"id"` field (string or number) becomes the record id; otherwise the
//! 1-based line number is used. Every other field becomes a template variable:
//! strings verbatim, numbers and booleans in their JSON spelling, arrays and
//! objects as compact JSON. `null` fields are dropped.

use std::io::BufRead;
use std::path::Path;

use serde_json::Value;

use sciphi_core::types::Record;

use crate::error::LoadError;

/// Read every record from a JSONL file.
pub fn read_records(path: &Path) -> Result<Vec<Record>, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_records(std::io::BufReader::new(file), &path.display().to_string())
}

/// Parse records from any line-oriented reader. Blank lines are skipped.
pub fn parse_records<R: BufRead>(reader: R, source_name: &str) -> Result<Vec<Record>, LoadError> {
    let mut records = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line_no = index + 1;
        let line = line.map_err(|e| record_error(source_name, line_no, e.to_string()))?;
        if line.trim().is_empty() {
            continue;
        }

        let value: Value = serde_json::from_str(&line)
            .map_err(|e| record_error(source_name, line_no, e.to_string()))?;
        let Value::Object(fields) = value else {
            return Err(record_error(source_name, line_no, "expected a JSON object".into()));
        };

        let mut record = Record::new(line_no.to_string());
        for (key, value) in fields {
            if key == "id" {
                match value {
                    Value::String(id) => record.id = id,
                    Value::Number(n) => record.id = n.to_string(),
                    _ => {
                        return Err(record_error(
                            source_name,
                            line_no,
                            "\"id\" must be a string or number".into(),
                        ))
                    }
                }
                continue;
            }
            if let Some(text) = variable_text(value) {
                record.variables.insert(key, text);
            }
        }
        records.push(record);
    }

    Ok(records)
}

fn variable_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

fn record_error(source_name: &str, line: usize, reason: String) -> LoadError {
    LoadError::Record {
        source_name: source_name.to_string(),
        line,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_records_with_and_without_id() {
        let input = r#"{"id": "q-1", "topic": "Fischer esterification"}

{"topic": "entropy", "level": 2, "draft": false, "note": null}
{"id": 7, "tags": ["a", "b"]}
"#;
        let records = parse_records(Cursor::new(input), "test").unwrap();
        assert_eq!(records.len(), 3);

        assert_eq!(records[0].id, "q-1");
        assert_eq!(records[0].variables["topic"], "Fischer esterification");
        assert!(!records[0].variables.contains_key("id"));

        // Line 2 is blank, so the second record sits on line 3
        assert_eq!(records[1].id, "3");
        assert_eq!(records[1].variables["level"], "2");
        assert_eq!(records[1].variables["draft"], "false");
        assert!(!records[1].variables.contains_key("note"));

        assert_eq!(records[2].id, "7");
        assert_eq!(records[2].variables["tags"], r#"["a","b"]"#);
    }

    #[test]
    fn test_non_object_line_is_error() {
        let err = parse_records(Cursor::new("{\"a\": 1}\n[1, 2]\n"), "input.jsonl").unwrap_err();
        assert_eq!(err.to_string(), "input.jsonl line 2: expected a JSON object");
    }

    #[test]
    fn test_invalid_json_is_error() {
        let err = parse_records(Cursor::new("{not json}\n"), "in").unwrap_err();
        assert!(matches!(err, LoadError::Record { line: 1, .. }));
    }

    #[test]
    fn test_bad_id_type() {
        let err = parse_records(Cursor::new("{\"id\": [1]}\n"), "in").unwrap_err();
        assert!(err.to_string().contains("\"id\""));
    }

    #[test]
    fn test_read_records_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.jsonl");
        std::fs::write(&path, "{\"X\": \"Fischer esterification\"}\n").unwrap();

        let records = read_records(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "1");
        assert_eq!(records[0].variables["X"], "Fischer esterification");
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_records(Path::new("/nonexistent/input.jsonl")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }
}
