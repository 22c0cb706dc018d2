//! Prompt Builder
//!
//! Deterministic prompt construction for documentation generation. The same
//! snapshot always yields a byte-identical prompt: sections are emitted in a
//! fixed order, context items keep insertion order and manifest files are
//! sorted by name.
//!
//! Large inputs (README, manifests, file tree) are truncated to bounded sizes
//! to keep token cost predictable.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::constants::prompt as prompt_constants;
use crate::types::{FileEntry, RepositorySnapshot};

/// Sections requested from the model, in order
pub const DOCUMENTATION_SECTIONS: &[&str] = &[
    "Project Overview",
    "Installation Instructions",
    "Usage Guide",
    "API Documentation (if applicable)",
    "Contributing Guidelines",
    "License Information",
];

const TRUNCATION_MARKER: &str = "\n\n*[Content truncated]*";

/// Prompt section types
#[derive(Debug, Clone)]
pub enum PromptSection {
    /// Ordered key/value pairs
    Context(Vec<(String, String)>),
    /// Raw text section with optional header
    Text {
        header: Option<String>,
        content: String,
    },
    /// Code block with language and optional header
    Code {
        header: Option<String>,
        language: String,
        content: String,
    },
    /// Numbered objectives
    Objectives(Vec<String>),
}

/// Prompt builder for consistent prompt construction
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    sections: Vec<PromptSection>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a context item, appending to the last context section if it is the tail
    pub fn context_item(mut self, key: &str, value: &str) -> Self {
        if let Some(PromptSection::Context(items)) = self.sections.last_mut() {
            items.push((key.to_string(), value.to_string()));
        } else {
            self.sections.push(PromptSection::Context(vec![(
                key.to_string(),
                value.to_string(),
            )]));
        }
        self
    }

    pub fn text(mut self, content: &str) -> Self {
        self.sections.push(PromptSection::Text {
            header: None,
            content: content.to_string(),
        });
        self
    }

    /// Add text section with header
    pub fn section(mut self, header: &str, content: &str) -> Self {
        self.sections.push(PromptSection::Text {
            header: Some(header.to_string()),
            content: content.to_string(),
        });
        self
    }

    pub fn code(mut self, header: &str, language: &str, content: &str) -> Self {
        self.sections.push(PromptSection::Code {
            header: Some(header.to_string()),
            language: language.to_string(),
            content: content.to_string(),
        });
        self
    }

    pub fn objectives(mut self, objectives: &[&str]) -> Self {
        self.sections.push(PromptSection::Objectives(
            objectives.iter().map(|s| s.to_string()).collect(),
        ));
        self
    }

    /// Build the final prompt string
    pub fn build(self) -> String {
        let mut prompt = String::new();

        for section in self.sections {
            match section {
                PromptSection::Context(items) => {
                    for (key, value) in items {
                        prompt.push_str(&format!("{}: {}\n", key, value));
                    }
                    prompt.push('\n');
                }
                PromptSection::Text { header, content } => {
                    if let Some(h) = header {
                        prompt.push_str(&format!("{}:\n", h));
                    }
                    prompt.push_str(&content);
                    prompt.push_str("\n\n");
                }
                PromptSection::Code {
                    header,
                    language,
                    content,
                } => {
                    if let Some(h) = header {
                        prompt.push_str(&format!("{}:\n", h));
                    }
                    prompt.push_str(&format!("```{}\n", language));
                    prompt.push_str(&content);
                    prompt.push_str("\n```\n\n");
                }
                PromptSection::Objectives(objectives) => {
                    prompt.push_str("Please generate a comprehensive documentation that includes:\n");
                    for (i, obj) in objectives.iter().enumerate() {
                        prompt.push_str(&format!("{}. {}\n", i + 1, obj));
                    }
                    prompt.push('\n');
                }
            }
        }

        prompt.trim_end().to_string()
    }
}

/// Size limits applied while embedding repository data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptLimits {
    pub readme_max_chars: usize,
    pub manifest_max_chars: usize,
    pub max_tree_entries: usize,
}

impl Default for PromptLimits {
    fn default() -> Self {
        Self {
            readme_max_chars: prompt_constants::README_MAX_CHARS,
            manifest_max_chars: prompt_constants::MANIFEST_MAX_CHARS,
            max_tree_entries: prompt_constants::MAX_TREE_ENTRIES,
        }
    }
}

/// Build the documentation prompt for a repository snapshot
pub fn build_documentation_prompt(snapshot: &RepositorySnapshot, limits: &PromptLimits) -> String {
    let mut builder = PromptBuilder::new()
        .text("Generate comprehensive documentation for the following GitHub repository:")
        .context_item("Repository Name", &snapshot.name)
        .context_item(
            "Description",
            snapshot
                .description
                .as_deref()
                .unwrap_or("No description provided"),
        )
        .context_item("Language", snapshot.language.as_deref().unwrap_or("Unknown"))
        .context_item("Stars", &snapshot.stars.to_string())
        .context_item("Forks", &snapshot.forks.to_string())
        .code(
            "File Structure",
            "json",
            &render_file_tree(&snapshot.file_tree, limits.max_tree_entries),
        );

    for (filename, content) in &snapshot.manifest_files {
        builder = builder.code(
            &format!("Manifest ({})", filename),
            manifest_language(filename),
            &truncate_chars(content, limits.manifest_max_chars),
        );
    }

    let readme = snapshot
        .readme
        .as_deref()
        .map(|r| truncate_chars(r, limits.readme_max_chars))
        .unwrap_or(Cow::Borrowed("No README found"));

    builder
        .section("README Content", &readme)
        .objectives(DOCUMENTATION_SECTIONS)
        .text("Format the response in Markdown.")
        .build()
}

fn render_file_tree(files: &[FileEntry], max_entries: usize) -> String {
    let shown = &files[..files.len().min(max_entries)];
    let mut rendered = serde_json::to_string_pretty(shown).unwrap_or_else(|_| "[]".to_string());
    if files.len() > shown.len() {
        rendered.push_str(&format!(
            "\n// ... {} more entries omitted",
            files.len() - shown.len()
        ));
    }
    rendered
}

fn manifest_language(filename: &str) -> &'static str {
    match filename.rsplit('.').next() {
        Some("json") => "json",
        Some("toml") => "toml",
        Some("xml") => "xml",
        _ => "text",
    }
}

/// Truncate to at most `max_chars` characters, on a char boundary
pub fn truncate_chars(content: &str, max_chars: usize) -> Cow<'_, str> {
    match content.char_indices().nth(max_chars) {
        None => Cow::Borrowed(content),
        Some((byte_idx, _)) => {
            Cow::Owned(format!("{}{}", &content[..byte_idx], TRUNCATION_MARKER))
        }
    }
}
