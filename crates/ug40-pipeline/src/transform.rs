//! Pure text transformations from decoded file content to text units

use once_cell::sync::Lazy;
use pulldown_cmark::{Event, Parser, TagEnd};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

static PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:\r?\n){2,}").unwrap());
static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());

/// Render markdown to plain text
///
/// Markup and HTML tags are dropped. Text (including text inside raw HTML),
/// inline code and code block content are kept, and every block ends with a
/// blank line so paragraph structure survives for [`paragraph_split`].
pub fn strip_markdown(md: &str) -> String {
    let mut out = String::with_capacity(md.len());

    for event in Parser::new(md) {
        match event {
            Event::Text(text) | Event::Code(text) => out.push_str(&text),
            Event::Html(html) | Event::InlineHtml(html) => {
                out.push_str(&HTML_TAG.replace_all(&html, ""))
            }
            Event::SoftBreak | Event::HardBreak => out.push('\n'),
            Event::Rule => end_block(&mut out),
            Event::End(tag) => match tag {
                TagEnd::Paragraph
                | TagEnd::Heading(_)
                | TagEnd::CodeBlock
                | TagEnd::HtmlBlock
                | TagEnd::BlockQuote(_)
                | TagEnd::List(_) => end_block(&mut out),
                TagEnd::Item => out.push('\n'),
                _ => {}
            },
            // Footnote references, task markers
            _ => {}
        }
    }

    out.trim().to_string()
}

/// Close a block with exactly one blank line
fn end_block(out: &mut String) {
    let kept = out.trim_end_matches(['\r', '\n']).len();
    out.truncate(kept);
    out.push_str("\n\n");
}

/// Split on blank lines, trimming pieces and dropping empty ones
pub fn paragraph_split(text: &str) -> Vec<String> {
    PARAGRAPH_BREAK
        .split(text)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Markdown to plain paragraphs
pub fn split_and_clean_general(md: &str) -> Vec<String> {
    paragraph_split(&strip_markdown(md))
}

/// Corpus categories with a known unit extraction rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Running text; one unit per paragraph
    GeneralText,
    /// Reference guides; one unit per document
    LanguageGuides,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::GeneralText, Category::LanguageGuides];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GeneralText => "general_text",
            Self::LanguageGuides => "language_guides",
        }
    }

    /// Turn decoded file content into text units, in document order
    pub fn extract_units(&self, content: &str) -> Vec<String> {
        match self {
            Self::GeneralText => split_and_clean_general(content),
            Self::LanguageGuides => {
                let guide = strip_markdown(content);
                if guide.is_empty() {
                    Vec::new()
                } else {
                    vec![guide]
                }
            }
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown category '{}'", s))
    }
}
