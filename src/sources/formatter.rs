//! Pretty-printing of presented content
//!
//! A formatter returns the reformatted text together with the anchor
//! positions that let [`FormattedMapping`](crate::mapping::FormattedMapping)
//! translate locations between the two texts.

use crate::mapping::PositionMapping;

pub const JAVASCRIPT_MIME: &str = "text/javascript";
pub const HTML_MIME: &str = "text/html";

/// Output of a formatter run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedContent {
    pub text: String,
    pub mapping: PositionMapping,
}

/// Text transform used when reformat mode is on
pub trait ScriptFormatter: Send + Sync {
    fn format(&self, mime_type: &str, text: &str) -> FormattedContent;
}

/// Statement-per-line formatter for JavaScript-like sources
///
/// Breaks lines after `;` (outside parentheses), `{` and `}`, re-indents by
/// brace depth and leaves string literals and line comments untouched.
/// Content of any other mime type is returned unchanged.
#[derive(Debug, Clone)]
pub struct BasicFormatter {
    indent: usize,
}

impl Default for BasicFormatter {
    fn default() -> Self {
        Self::new(4)
    }
}

impl BasicFormatter {
    pub fn new(indent: usize) -> Self {
        Self { indent }
    }

    fn format_script(&self, text: &str) -> FormattedContent {
        let mut out = String::with_capacity(text.len() + text.len() / 4);
        let mut original = vec![0];
        let mut formatted = vec![0];

        let mut depth = 0usize;
        let mut parens = 0usize;
        let mut at_line_start = true;
        let mut quote: Option<char> = None;
        let mut escaped = false;
        let mut line_comment = false;

        for (offset, ch) in text.char_indices() {
            if line_comment {
                if ch == '\n' {
                    line_comment = false;
                    out.push('\n');
                    at_line_start = true;
                } else if ch != '\r' {
                    out.push(ch);
                }
                continue;
            }

            if let Some(q) = quote {
                if ch == '\n' && q != '`' {
                    quote = None;
                    out.push('\n');
                    at_line_start = true;
                    continue;
                }
                out.push(ch);
                if escaped {
                    escaped = false;
                } else if ch == '\\' {
                    escaped = true;
                } else if ch == q {
                    quote = None;
                }
                continue;
            }

            match ch {
                '\n' | '\r' => {
                    if !at_line_start {
                        out.push('\n');
                        at_line_start = true;
                    }
                    continue;
                }
                ' ' | '\t' if at_line_start => continue,
                '}' => {
                    depth = depth.saturating_sub(1);
                    if !at_line_start {
                        out.push('\n');
                        at_line_start = true;
                    }
                }
                _ => {}
            }

            if at_line_start {
                out.extend(std::iter::repeat(' ').take(depth * self.indent));
                if offset > original[original.len() - 1] {
                    original.push(offset);
                    formatted.push(out.len());
                }
                at_line_start = false;
            }
            out.push(ch);

            match ch {
                '"' | '\'' | '`' => quote = Some(ch),
                '/' if text[offset + 1..].starts_with('/') => line_comment = true,
                '(' => parens += 1,
                ')' => parens = parens.saturating_sub(1),
                '{' => {
                    depth += 1;
                    out.push('\n');
                    at_line_start = true;
                }
                '}' => {
                    out.push('\n');
                    at_line_start = true;
                }
                ';' if parens == 0 => {
                    out.push('\n');
                    at_line_start = true;
                }
                _ => {}
            }
        }

        if text.len() > original[original.len() - 1] {
            original.push(text.len());
            formatted.push(out.len());
        }

        FormattedContent {
            text: out,
            mapping: PositionMapping {
                original,
                formatted,
            },
        }
    }
}

impl ScriptFormatter for BasicFormatter {
    fn format(&self, mime_type: &str, text: &str) -> FormattedContent {
        if mime_type == JAVASCRIPT_MIME {
            self.format_script(text)
        } else {
            FormattedContent {
                text: text.to_string(),
                mapping: PositionMapping::identity(text.len()),
            }
        }
    }
}
