//! INI-like scanner for the authorization file format.
//!
//! The format: `#`-prefixed full-line comments, `[section]` headers
//! starting at column 0, `option = value` or `option: value` lines, and
//! continuation lines (leading whitespace, not a comment) appended to
//! the previous value with a single space. Anything outside that is a
//! load-time error; no partial result is returned.
//!
//! This is a pure function over the input text: line numbers are
//! tracked for error reporting, nothing else is stateful.

use crate::error::{AuthzError, AuthzResult};

/// One `option = value` entry, with the line it started on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionEntry {
    pub name: String,
    pub value: String,
    pub line: usize,
}

/// One `[section]` with its entries in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    pub line: usize,
    pub options: Vec<OptionEntry>,
}

/// ## Summary
/// Scans the configuration text into sections.
///
/// ## Errors
/// Returns a line-numbered syntax error for malformed section headers,
/// option lines without a `=`/`:` separator, options before any section
/// header, or continuation lines with nothing to continue.
pub fn parse_ini(text: &str) -> AuthzResult<Vec<Section>> {
    let mut sections: Vec<Section> = Vec::new();

    for (idx, raw_line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = raw_line.trim();

        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        if raw_line.starts_with('[') {
            let header = raw_line.trim_end();
            let Some(name) = header.strip_prefix('[').and_then(|h| h.strip_suffix(']'))
            else {
                return Err(AuthzError::syntax(line_no, "malformed section header"));
            };
            let name = name.trim();
            if name.is_empty() {
                return Err(AuthzError::syntax(line_no, "empty section name"));
            }
            sections.push(Section {
                name: name.to_string(),
                line: line_no,
                options: Vec::new(),
            });
            continue;
        }

        if raw_line.starts_with(char::is_whitespace) {
            // Continuation of the previous option value.
            let Some(entry) = sections.last_mut().and_then(|s| s.options.last_mut())
            else {
                return Err(AuthzError::syntax(
                    line_no,
                    "continuation line without a preceding option",
                ));
            };
            if !entry.value.is_empty() {
                entry.value.push(' ');
            }
            entry.value.push_str(trimmed);
            continue;
        }

        let Some(section) = sections.last_mut() else {
            return Err(AuthzError::syntax(
                line_no,
                "option before any section header",
            ));
        };

        let separator = raw_line.find(['=', ':']);
        let Some(separator) = separator else {
            return Err(AuthzError::syntax(
                line_no,
                "option line without ':' or '=' separator",
            ));
        };
        let name = raw_line[..separator].trim();
        if name.is_empty() {
            return Err(AuthzError::syntax(line_no, "option without a name"));
        }
        section.options.push(OptionEntry {
            name: name.to_string(),
            value: raw_line[separator + 1..].trim().to_string(),
            line: line_no,
        });
    }

    Ok(sections)
}
