//! Output parsers: turn raw model text into the value written to the sink.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::ParseError;

/// Expected shape of a model's output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputParser {
    /// The trimmed text, as a JSON string.
    #[default]
    PassThrough,
    /// `{"question": .., "answer": ..}`.
    QuestionAnswer,
    /// The first JSON value found in the output.
    Json,
}

impl OutputParser {
    /// Parse `raw` model output.
    ///
    /// `prompt` is the templated prompt before any grounding; the
    /// question-answer parser uses it when the output carries no question.
    pub fn parse(&self, raw: &str, prompt: &str) -> Result<Value, ParseError> {
        let text = raw.trim();
        if text.is_empty() {
            return Err(ParseError::Empty);
        }
        match self {
            OutputParser::PassThrough => Ok(Value::String(text.to_string())),
            OutputParser::QuestionAnswer => parse_question_answer(text, prompt),
            OutputParser::Json => parse_first_json(text),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputParser::PassThrough => "pass_through",
            OutputParser::QuestionAnswer => "question_answer",
            OutputParser::Json => "json",
        }
    }
}

impl fmt::Display for OutputParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputParser {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "pass_through" | "text" => Ok(OutputParser::PassThrough),
            "question_answer" | "qa" => Ok(OutputParser::QuestionAnswer),
            "json" => Ok(OutputParser::Json),
            other => Err(format!(
                "unknown parser '{}' (expected pass_through, question_answer or json)",
                other
            )),
        }
    }
}

fn parse_question_answer(text: &str, prompt: &str) -> Result<Value, ParseError> {
    let answer_at = find_marker(text, "answer:");
    let question_at = find_marker(text, "question:").filter(|q| answer_at.map_or(true, |a| *q < a));

    let (question, answer) = match (question_at, answer_at) {
        (Some(q), Some(a)) => (
            text[q + "question:".len()..a].trim(),
            text[a + "answer:".len()..].trim(),
        ),
        (None, Some(a)) => (prompt.trim(), text[a + "answer:".len()..].trim()),
        _ => (prompt.trim(), text),
    };

    if answer.is_empty() {
        return Err(ParseError::Empty);
    }
    Ok(json!({ "question": question, "answer": answer }))
}

/// Byte offset of the first ASCII `marker` that opens a line, ignoring case
/// and leading whitespace. A marker in the middle of prose is not a marker.
fn find_marker(text: &str, marker: &str) -> Option<usize> {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let indent = line.len() - line.trim_start().len();
        let head = &line.as_bytes()[indent..];
        if head.len() >= marker.len() && head[..marker.len()].eq_ignore_ascii_case(marker.as_bytes())
        {
            return Some(offset + indent);
        }
        offset += line.len();
    }
    None
}

fn parse_first_json(text: &str) -> Result<Value, ParseError> {
    let body = strip_code_fence(text);
    let start = body
        .find(|c: char| c == '{' || c == '[')
        .ok_or(ParseError::NoJson)?;

    let mut values = serde_json::Deserializer::from_str(&body[start..]).into_iter::<Value>();
    match values.next() {
        Some(Ok(value)) => Ok(value),
        Some(Err(e)) => Err(ParseError::InvalidJson(e.to_string())),
        None => Err(ParseError::NoJson),
    }
}

/// Return the contents of the first fenced block, or `text` if there is none.
fn strip_code_fence(text: &str) -> &str {
    let Some(open) = text.find("```") else {
        return text;
    };
    let after_open = &text[open + 3..];
    // Skip the language tag on the opening line
    let body_start = after_open.find('\n').map_or(after_open.len(), |i| i + 1);
    let body = &after_open[body_start..];
    match body.find("```") {
        Some(close) => &body[..close],
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_output_fails_every_parser() {
        for parser in [
            OutputParser::PassThrough,
            OutputParser::QuestionAnswer,
            OutputParser::Json,
        ] {
            assert_eq!(parser.parse("  \n ", "prompt"), Err(ParseError::Empty));
        }
    }

    #[test]
    fn test_pass_through_trims() {
        let value = OutputParser::PassThrough.parse("  Chapter text.\n", "p").unwrap();
        assert_eq!(value, json!("Chapter text."));
    }

    #[test]
    fn test_question_answer_uses_prompt() {
        let value = OutputParser::QuestionAnswer
            .parse(
                " An acid-catalysed reaction forming an ester. ",
                "What is Fischer esterification?",
            )
            .unwrap();
        assert_eq!(
            value,
            json!({
                "question": "What is Fischer esterification?",
                "answer": "An acid-catalysed reaction forming an ester."
            })
        );
    }

    #[test]
    fn test_question_answer_markers() {
        let raw = "Question: What is entropy?\nAnswer: A measure of disorder.";
        let value = OutputParser::QuestionAnswer.parse(raw, "ignored").unwrap();
        assert_eq!(value["question"], "What is entropy?");
        assert_eq!(value["answer"], "A measure of disorder.");
    }

    #[test]
    fn test_answer_marker_only() {
        let value = OutputParser::QuestionAnswer
            .parse("ANSWER: 42", "What is six times seven?")
            .unwrap();
        assert_eq!(value["question"], "What is six times seven?");
        assert_eq!(value["answer"], "42");
    }

    #[test]
    fn test_markers_inside_prose_are_ignored() {
        let raw = "Esters form when the key question: which catalyst? Answer: sulfuric acid.";
        let value = OutputParser::QuestionAnswer
            .parse(raw, "How are esters formed?")
            .unwrap();
        assert_eq!(value["question"], "How are esters formed?");
        assert_eq!(value["answer"], raw);
    }

    #[test]
    fn test_indented_markers() {
        let raw = "  question: What is pH?\n  answer: Acidity on a log scale.";
        let value = OutputParser::QuestionAnswer.parse(raw, "p").unwrap();
        assert_eq!(value["question"], "What is pH?");
        assert_eq!(value["answer"], "Acidity on a log scale.");
    }

    #[test]
    fn test_empty_answer_fails() {
        let err = OutputParser::QuestionAnswer
            .parse("Question: Why?\nAnswer:", "p")
            .unwrap_err();
        assert_eq!(err, ParseError::Empty);
    }

    #[test]
    fn test_json_first_value_with_prose() {
        let value = OutputParser::Json
            .parse("Sure! {\"term\": \"ester\", \"n\": 2} Hope this helps {\"x\": 1}", "p")
            .unwrap();
        assert_eq!(value, json!({ "term": "ester", "n": 2 }));
    }

    #[test]
    fn test_json_in_code_fence() {
        let raw = "Here you go:\n```json\n[1, 2, 3]\n```\n";
        assert_eq!(OutputParser::Json.parse(raw, "p").unwrap(), json!([1, 2, 3]));
    }

    #[test]
    fn test_json_missing() {
        assert_eq!(
            OutputParser::Json.parse("no structure here", "p"),
            Err(ParseError::NoJson)
        );
    }

    #[test]
    fn test_json_truncated() {
        let err = OutputParser::Json.parse("{\"a\": [1, 2", "p").unwrap_err();
        assert!(matches!(err, ParseError::InvalidJson(_)));
    }

    #[test]
    fn test_parser_from_str() {
        assert_eq!("qa".parse::<OutputParser>().unwrap(), OutputParser::QuestionAnswer);
        assert_eq!(
            "pass-through".parse::<OutputParser>().unwrap(),
            OutputParser::PassThrough
        );
        assert!("xml".parse::<OutputParser>().is_err());
    }

    #[test]
    fn test_parser_serde_names() {
        let p: OutputParser = serde_json::from_str("\"question_answer\"").unwrap();
        assert_eq!(p, OutputParser::QuestionAnswer);
        assert_eq!(OutputParser::Json.to_string(), "json");
    }
}
