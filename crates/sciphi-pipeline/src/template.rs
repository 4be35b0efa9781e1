//! Prompt templates: named text with `{variable}` placeholders.
//!
//! Template files are YAML:
//!
//! ```yaml
//! name: qa
//! template: "What is {topic}? Answer in one paragraph."
//! input_variables: [topic]     # optional, derived from the template if omitted
//! parser: question_answer      # optional: pass_through | question_answer | json
//! ```
//!
//! `{{` and `}}` render as literal braces.

use std::collections::HashMap;
use std::path::Path;

use regex::Regex;
use serde::Deserialize;

use crate::error::{LoadError, TemplateError};
use crate::parser::OutputParser;

/// Matches escaped braces, a placeholder, or a stray brace.
const TOKEN_PATTERN: &str = r"\{\{|\}\}|\{([^{}]*)\}|[{}]";

#[derive(Clone, Debug, PartialEq)]
enum Segment {
    Literal(String),
    Variable(String),
}

#[derive(Deserialize)]
struct TemplateFile {
    name: String,
    template: String,
    #[serde(default)]
    input_variables: Option<Vec<String>>,
    #[serde(default)]
    parser: Option<OutputParser>,
}

/// A compiled prompt template.
#[derive(Clone, Debug)]
pub struct PromptTemplate {
    name: String,
    input_variables: Vec<String>,
    parser: Option<OutputParser>,
    segments: Vec<Segment>,
}

impl PromptTemplate {
    /// Compile `template`; fails on unbalanced braces or malformed placeholders.
    pub fn new(name: impl Into<String>, template: &str) -> Result<Self, TemplateError> {
        let segments = compile(template)?;
        let mut input_variables: Vec<String> = Vec::new();
        for segment in &segments {
            if let Segment::Variable(var) = segment {
                if !input_variables.contains(var) {
                    input_variables.push(var.clone());
                }
            }
        }
        Ok(Self {
            name: name.into(),
            input_variables,
            parser: None,
            segments,
        })
    }

    /// Declare the variables every record must supply, in addition to the placeholders.
    pub fn with_input_variables(mut self, variables: Vec<String>) -> Self {
        for var in variables {
            if !self.input_variables.contains(&var) {
                self.input_variables.push(var);
            }
        }
        self
    }

    pub fn with_parser(mut self, parser: OutputParser) -> Self {
        self.parser = Some(parser);
        self
    }

    /// Parse a YAML template document.
    pub fn from_yaml_str(yaml: &str, path: &Path) -> Result<Self, LoadError> {
        let file: TemplateFile = serde_yaml::from_str(yaml).map_err(|source| LoadError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;

        let mut template =
            PromptTemplate::new(&file.name, &file.template).map_err(|source| {
                LoadError::Template {
                    name: file.name.clone(),
                    source,
                }
            })?;
        if let Some(vars) = file.input_variables {
            template = template.with_input_variables(vars);
        }
        template.parser = file.parser;
        Ok(template)
    }

    /// Load a YAML template file.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content, path)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn input_variables(&self) -> &[String] {
        &self.input_variables
    }

    /// Parser requested by the template file, if any.
    pub fn parser(&self) -> Option<OutputParser> {
        self.parser
    }

    /// Fill every placeholder from `variables`.
    ///
    /// Fails on the first declared or referenced variable that is missing.
    pub fn render(&self, variables: &HashMap<String, String>) -> Result<String, TemplateError> {
        if let Some(missing) = self
            .input_variables
            .iter()
            .find(|v| !variables.contains_key(*v))
        {
            return Err(TemplateError::MissingVariable(missing.clone()));
        }

        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Variable(var) => match variables.get(var) {
                    Some(value) => out.push_str(value),
                    None => return Err(TemplateError::MissingVariable(var.clone())),
                },
            }
        }
        Ok(out)
    }
}

fn compile(template: &str) -> Result<Vec<Segment>, TemplateError> {
    let tokens = Regex::new(TOKEN_PATTERN)
        .map_err(|e| TemplateError::InvalidPlaceholder(e.to_string()))?;

    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut last = 0;

    for caps in tokens.captures_iter(template) {
        let Some(whole) = caps.get(0) else { continue };
        literal.push_str(&template[last..whole.start()]);
        last = whole.end();

        match whole.as_str() {
            "{{" => literal.push('{'),
            "}}" => literal.push('}'),
            "{" | "}" => {
                return Err(TemplateError::UnbalancedBrace {
                    brace: whole.as_str().chars().next().unwrap_or('{'),
                    offset: whole.start(),
                })
            }
            _ => {
                let raw = caps.get(1).map_or("", |m| m.as_str());
                let name = raw.trim();
                if !is_identifier(name) {
                    return Err(TemplateError::InvalidPlaceholder(raw.to_string()));
                }
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Variable(name.to_string()));
            }
        }
    }

    literal.push_str(&template[last..]);
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {
            chars.all(|c| c.is_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_render_substitutes_verbatim() {
        let t = PromptTemplate::new("qa", "What is {X}?").unwrap();
        let prompt = t.render(&vars(&[("X", "Fischer esterification")])).unwrap();
        assert_eq!(prompt, "What is Fischer esterification?");
    }

    #[test]
    fn test_repeated_placeholder() {
        let t = PromptTemplate::new("t", "{a} and {a} again, then {b}").unwrap();
        assert_eq!(t.input_variables(), ["a", "b"]);
        assert_eq!(
            t.render(&vars(&[("a", "x"), ("b", "y")])).unwrap(),
            "x and x again, then y"
        );
    }

    #[test]
    fn test_escaped_braces() {
        let t = PromptTemplate::new("json", r#"Return {{"term": "{term}"}}"#).unwrap();
        assert_eq!(
            t.render(&vars(&[("term", "ester")])).unwrap(),
            r#"Return {"term": "ester"}"#
        );
    }

    #[test]
    fn test_placeholder_whitespace_trimmed() {
        let t = PromptTemplate::new("t", "Hi { name }").unwrap();
        assert_eq!(t.render(&vars(&[("name", "Ada")])).unwrap(), "Hi Ada");
    }

    #[test]
    fn test_missing_variable() {
        let t = PromptTemplate::new("t", "Explain {concept} to a {audience}.").unwrap();
        let err = t.render(&vars(&[("concept", "entropy")])).unwrap_err();
        assert_eq!(err, TemplateError::MissingVariable("audience".into()));
    }

    #[test]
    fn test_declared_variable_must_be_present() {
        let t = PromptTemplate::new("t", "No placeholders here.")
            .unwrap()
            .with_input_variables(vec!["topic".into()]);
        assert!(t.render(&HashMap::new()).is_err());
        assert_eq!(
            t.render(&vars(&[("topic", "unused")])).unwrap(),
            "No placeholders here."
        );
    }

    #[test]
    fn test_unbalanced_braces() {
        assert!(matches!(
            PromptTemplate::new("t", "oops {x"),
            Err(TemplateError::UnbalancedBrace { brace: '{', offset: 5 })
        ));
        assert!(matches!(
            PromptTemplate::new("t", "oops } here"),
            Err(TemplateError::UnbalancedBrace { brace: '}', .. })
        ));
    }

    #[test]
    fn test_invalid_placeholder() {
        assert_eq!(
            PromptTemplate::new("t", "{not valid}").unwrap_err(),
            TemplateError::InvalidPlaceholder("not valid".into())
        );
        assert!(PromptTemplate::new("t", "{}").is_err());
        assert!(PromptTemplate::new("t", "{1x}").is_err());
    }

    #[test]
    fn test_extra_variables_ignored() {
        let t = PromptTemplate::new("t", "{a}").unwrap();
        assert_eq!(t.render(&vars(&[("a", "1"), ("b", "2")])).unwrap(), "1");
    }

    #[test]
    fn test_load_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qa.yaml");
        std::fs::write(
            &path,
            "name: textbook-qa\n\
             template: \"Question about {topic}\"\n\
             input_variables: [topic, level]\n\
             parser: question_answer\n",
        )
        .unwrap();

        let t = PromptTemplate::load(&path).unwrap();
        assert_eq!(t.name(), "textbook-qa");
        assert_eq!(t.input_variables(), ["topic", "level"]);
        assert_eq!(t.parser(), Some(OutputParser::QuestionAnswer));
    }

    #[test]
    fn test_load_yaml_with_bad_template() {
        let err =
            PromptTemplate::from_yaml_str("name: bad\ntemplate: \"{oops\"\n", Path::new("bad.yaml"))
                .unwrap_err();
        assert!(matches!(err, LoadError::Template { ref name, .. } if name == "bad"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = PromptTemplate::load(Path::new("/nonexistent/template.yaml")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn test_load_yaml_missing_template_field() {
        let err = PromptTemplate::from_yaml_str("name: only\n", Path::new("t.yaml")).unwrap_err();
        assert!(matches!(err, LoadError::Yaml { .. }));
    }
}
