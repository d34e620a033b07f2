//! Structured configuration diagnostics.
//!
//! Binding a configuration never fails with a bare error string. Every problem
//! is reported as a [`Diagnostic`] carrying a severity, a short summary, a
//! longer detail and, when known, the source range it refers to. Diagnostics
//! serialise as JSON so that embedding tools can forward them unchanged.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A position in a configuration source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pos {
    /// 1-based line number; `0` when unknown.
    pub line: usize,
    /// 1-based column number; `0` when unknown.
    pub column: usize,
    /// 0-based byte offset into the source.
    pub byte: usize,
}

/// A span of configuration source text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRange {
    /// Name of the source (a file name, or an environment variable name).
    pub filename: String,
    pub start: Pos,
    pub end: Pos,
}

impl SourceRange {
    /// A range that only names its source, with unknown positions.
    pub fn in_source(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            ..Self::default()
        }
    }
}

impl fmt::Display for SourceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start.line == 0 {
            f.write_str(&self.filename)
        } else {
            write!(f, "{}:{},{}", self.filename, self.start.line, self.start.column)
        }
    }
}

/// A single validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// One-line human-readable summary (e.g. `"Unsupported attribute"`).
    pub summary: String,
    /// Longer explanation, safe to show to operators.
    pub detail: String,
    /// Where in the configuration the problem was found.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<SourceRange>,
}

impl Diagnostic {
    /// Construct an error-severity diagnostic.
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            summary: summary.into(),
            detail: detail.into(),
            subject: None,
        }
    }

    /// Construct a warning-severity diagnostic.
    pub fn warning(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            summary: summary.into(),
            detail: detail.into(),
            subject: None,
        }
    }

    /// Attach the source range this diagnostic refers to.
    pub fn with_subject(mut self, range: SourceRange) -> Self {
        self.subject = Some(range);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.subject {
            Some(range) => write!(f, "{}: {}; {}", range, self.summary, self.detail),
            None => write!(f, "{}; {}", self.summary, self.detail),
        }
    }
}

/// An ordered collection of [`Diagnostic`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, diag: Diagnostic) {
        self.0.push(diag);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    /// Returns `true` if any diagnostic has [`Severity::Error`].
    pub fn has_errors(&self) -> bool {
        self.0.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.0.iter()
    }
}

impl From<Diagnostic> for Diagnostics {
    fn from(diag: Diagnostic) -> Self {
        Self(vec![diag])
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for diag in &self.0 {
            if !first {
                f.write_str("\n")?;
            }
            write!(f, "{diag}")?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_alone_are_not_errors() {
        let mut diags = Diagnostics::new();
        diags.push(Diagnostic::warning("Deprecated", "use key_provider instead"));
        assert!(!diags.has_errors());
        diags.push(Diagnostic::error("Missing key", "required"));
        assert!(diags.has_errors());
        assert_eq!(diags.len(), 2);
    }

    #[test]
    fn display_includes_subject() {
        let range = SourceRange {
            filename: "main.tf".into(),
            start: Pos { line: 4, column: 3, byte: 40 },
            end: Pos { line: 4, column: 9, byte: 46 },
        };
        let diag = Diagnostic::error("Unsupported attribute", "no attribute named \"foo\"")
            .with_subject(range);
        assert_eq!(
            diag.to_string(),
            "main.tf:4,3: Unsupported attribute; no attribute named \"foo\""
        );
    }

    #[test]
    fn diagnostics_serde() {
        let diags: Diagnostics = Diagnostic::error("Missing key", "required")
            .with_subject(SourceRange::in_source("ENV"))
            .into();
        let json = serde_json::to_string(&diags).unwrap();
        assert!(json.contains("\"severity\":\"error\""));
        let decoded: Diagnostics = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, diags);
    }
}
