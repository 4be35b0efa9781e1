//! Textbook table of contents, expanded into one record per section.
//!
//! ```yaml
//! title: Organic Chemistry
//! description: An introductory undergraduate text.
//! chapters:
//!   - title: Carboxylic Acids
//!     sections:
//!       - title: Esterification
//!         subsections: [Fischer esterification, Steglich esterification]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use sciphi_core::types::Record;

use crate::error::LoadError;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TableOfContents {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub chapters: Vec<Chapter>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub title: String,
    #[serde(default)]
    pub sections: Vec<Section>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    #[serde(default)]
    pub subsections: Vec<String>,
}

impl TableOfContents {
    pub fn from_yaml_str(yaml: &str, path: &Path) -> Result<Self, LoadError> {
        serde_yaml::from_str(yaml).map_err(|source| LoadError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content, path)
    }

    /// One record per section, in document order, with ids like `"2.3"`.
    ///
    /// A chapter without sections becomes a single record whose section is
    /// the chapter itself.
    pub fn records(&self) -> Vec<Record> {
        let mut records = Vec::new();
        for (ch_idx, chapter) in self.chapters.iter().enumerate() {
            let ch_no = ch_idx + 1;
            if chapter.sections.is_empty() {
                records.push(self.record(ch_no.to_string(), chapter, &chapter.title, &[]));
                continue;
            }
            for (sec_idx, section) in chapter.sections.iter().enumerate() {
                records.push(self.record(
                    format!("{}.{}", ch_no, sec_idx + 1),
                    chapter,
                    &section.title,
                    &section.subsections,
                ));
            }
        }
        records
    }

    fn record(&self, id: String, chapter: &Chapter, section: &str, subsections: &[String]) -> Record {
        Record::new(id)
            .with_var("textbook", self.title.as_str())
            .with_var("chapter", chapter.title.as_str())
            .with_var("section", section)
            .with_var("subsections", subsections.join(", "))
            .with_var("description", self.description.as_str())
    }
}
