//! Include extraction: file text in, raw include occurrences out.
use crate::errors::ReadError;
use std::path::Path;

pub mod rules;

pub use rules::{CompiledRule, IncludeStyle, LanguageRule, PatternRule, RuleSet, SearchPolicy};

/// Bytes inspected for NUL when deciding whether a file is binary.
const BINARY_SNIFF_LEN: usize = 8000;

/// One textual include reference, before resolution.
///
/// Borrows from the file text; the originating file is carried by the
/// `FileTask` being processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncludeOccurrence<'a> {
    pub token: &'a str,
    /// 1-based line number.
    pub line: usize,
    pub style: IncludeStyle,
}

/// Apply every pattern of `rule` to every line of `text`.
///
/// Lazy and stateless: iterating again means calling `extract` again.
/// All matches on a line are yielded, pattern by pattern. A list capture
/// (`import a, b`) yields one occurrence per item.
pub fn extract<'a>(
    text: &'a str,
    rule: &'a CompiledRule,
) -> impl Iterator<Item = IncludeOccurrence<'a>> + 'a {
    text.lines().enumerate().flat_map(move |(idx, line)| {
        rule.patterns().iter().flat_map(move |pat| {
            pat.regex
                .captures_iter(line)
                .filter_map(|cap| cap.name("token").or_else(|| cap.get(1)).map(|m| m.as_str()))
                .flat_map(move |raw| pat.tokens(raw))
                .map(move |token| IncludeOccurrence { token, line: idx + 1, style: pat.style })
        })
    })
}

/// Read a source file as text.
///
/// Files with NUL bytes near the start are rejected as binary. Other invalid
/// UTF-8 (e.g. Latin-1 comments) is decoded lossily so include lines survive.
///
/// # Errors
/// Returns `ReadError::Io` if the file cannot be read and `ReadError::Binary`
/// for binary content.
pub fn read_source(path: &Path) -> Result<String, ReadError> {
    let bytes = std::fs::read(path)?;
    let sniff = &bytes[..bytes.len().min(BINARY_SNIFF_LEN)];
    if sniff.contains(&0) {
        return Err(ReadError::Binary { file: path.to_path_buf() });
    }
    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            tracing::debug!(file = %path.display(), "non UTF-8 content, decoding lossily");
            Ok(String::from_utf8_lossy(e.as_bytes()).into_owned())
        }
    }
}
