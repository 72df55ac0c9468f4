// Diagnostics for the Acorn compiler
// Locations, error kinds, rendering, and the reporter threaded through every phase

use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Source code location carried by every token and diagnostic.
///
/// Lines and columns are 1-based. The full text of the source line is kept
/// so diagnostics can be rendered without re-reading the file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourceLocation {
    pub filename: String,
    pub line: String,
    pub line_number: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(filename: String, line: String, line_number: usize, column: usize) -> Self {
        Self {
            filename,
            line,
            line_number,
            column,
        }
    }

    pub fn unknown() -> Self {
        Self {
            filename: "<unknown>".to_string(),
            line: String::new(),
            line_number: 0,
            column: 0,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.filename, self.line_number, self.column)
    }
}

/// Diagnostic severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "{}", "error".red().bold()),
            Severity::Warning => write!(f, "{}", "warning".yellow().bold()),
            Severity::Note => write!(f, "{}", "note".cyan().bold()),
        }
    }
}

/// The closed set of user-facing error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticKind {
    FileNotFound,
    Syntax,
    Undefined,
    TooManyDefined,
    Redefined,
    InvalidTypeConstructor,
    InvalidTypeParameters,
    TypeMismatch,
    TypeInference,
    ConstantAssignment,
    Internal,
}

impl DiagnosticKind {
    /// The human-readable prefix of the rendered diagnostic.
    pub fn prefix(&self) -> &'static str {
        match self {
            DiagnosticKind::FileNotFound => "File not found",
            DiagnosticKind::Syntax => "Invalid syntax",
            DiagnosticKind::Undefined => "Undefined error",
            DiagnosticKind::TooManyDefined => "Too many defined error",
            DiagnosticKind::Redefined => "Redefined error",
            DiagnosticKind::InvalidTypeConstructor => "Invalid type",
            DiagnosticKind::InvalidTypeParameters => "Invalid type parameters",
            DiagnosticKind::TypeMismatch => "Invalid types",
            DiagnosticKind::TypeInference => "Type inference error",
            DiagnosticKind::ConstantAssignment => "Assignment to constant",
            DiagnosticKind::Internal => "Internal error",
        }
    }
}

/// A single reported problem: kind, location, and a free-form message body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub location: SourceLocation,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, location: SourceLocation, message: String) -> Self {
        Self {
            kind,
            severity: Severity::Error,
            location,
            message,
        }
    }

    pub fn file_not_found(location: SourceLocation, filename: &str) -> Self {
        Self::new(
            DiagnosticKind::FileNotFound,
            location,
            format!("{} could not be opened.", filename),
        )
    }

    pub fn syntax(location: SourceLocation, got: &str, expected: &str) -> Self {
        Self::new(
            DiagnosticKind::Syntax,
            location,
            format!("Got: {}\nExpected: {}", got, expected),
        )
    }

    pub fn undefined(location: SourceLocation, name: &str) -> Self {
        Self::new(
            DiagnosticKind::Undefined,
            location,
            format!("{} is not defined in this scope.", name),
        )
    }

    /// Undefined-name error with a "did you mean" suggestion picked from the
    /// names visible at the lookup site.
    pub fn undefined_with_candidates(
        location: SourceLocation,
        name: &str,
        candidates: &[String],
    ) -> Self {
        let mut message = format!("{} is not defined in this scope.", name);
        if let Some(suggestion) = closest_candidate(name, candidates) {
            message.push_str(&format!("\nDid you mean '{}'?", suggestion));
        }
        Self::new(DiagnosticKind::Undefined, location, message)
    }

    pub fn undefined_message(location: SourceLocation, message: String) -> Self {
        Self::new(DiagnosticKind::Undefined, location, message)
    }

    pub fn too_many_defined(location: SourceLocation, name: &str) -> Self {
        Self::new(
            DiagnosticKind::TooManyDefined,
            location,
            format!("{} has multiple definitions.", name),
        )
    }

    pub fn redefined(location: SourceLocation, name: &str) -> Self {
        Self::new(
            DiagnosticKind::Redefined,
            location,
            format!("{} is already defined in this scope.", name),
        )
    }

    pub fn invalid_type_constructor(location: SourceLocation) -> Self {
        Self::new(
            DiagnosticKind::InvalidTypeConstructor,
            location,
            "This is not a type constructor.".to_string(),
        )
    }

    pub fn invalid_type_parameters(
        location: SourceLocation,
        given: usize,
        expected: usize,
    ) -> Self {
        Self::new(
            DiagnosticKind::InvalidTypeParameters,
            location,
            format!("Got {} parameters, but expected {}.", given, expected),
        )
    }

    pub fn type_mismatch(location: SourceLocation, got: &str, expected: &str) -> Self {
        Self::new(
            DiagnosticKind::TypeMismatch,
            location,
            format!("Got: {}\nExpected: {}", got, expected),
        )
    }

    pub fn type_inference(location: SourceLocation) -> Self {
        Self::new(
            DiagnosticKind::TypeInference,
            location,
            "Try specifying the type you want.".to_string(),
        )
    }

    pub fn constant_assignment(location: SourceLocation) -> Self {
        Self::new(
            DiagnosticKind::ConstantAssignment,
            location,
            "Variable is not mutable.".to_string(),
        )
    }

    pub fn internal(location: SourceLocation, message: &str) -> Self {
        Self::new(
            DiagnosticKind::Internal,
            location,
            format!(
                "{}\nNote: You have probably encountered a bug in Acorn, not your code.",
                message
            ),
        )
    }

    /// Plain-text rendering:
    ///
    /// ```text
    /// <prefix> in <filename> on line <N> column <M>
    ///
    ///     <source line>
    ///     <spaces>^
    ///
    /// <message>
    /// ```
    pub fn render_plain(&self) -> String {
        let mut output = String::new();
        output.push_str(&format!(
            "{} in {} on line {} column {}\n",
            self.kind.prefix(),
            self.location.filename,
            self.location.line_number,
            self.location.column,
        ));
        output.push('\n');
        output.push_str(&format!("    {}\n", self.location.line));
        output.push_str(&format!(
            "    {}^\n",
            " ".repeat(self.location.column.saturating_sub(1))
        ));
        output.push('\n');
        output.push_str(&self.message);
        output.push('\n');
        output
    }

    /// Terminal rendering with the prefix coloured by severity.
    pub fn render_colored(&self) -> String {
        let prefix = match self.severity {
            Severity::Error => self.kind.prefix().red().bold(),
            Severity::Warning => self.kind.prefix().yellow().bold(),
            Severity::Note => self.kind.prefix().cyan().bold(),
        };
        let mut output = String::new();
        output.push_str(&format!(
            "{} in {} on line {} column {}\n",
            prefix,
            self.location.filename.bold(),
            self.location.line_number,
            self.location.column,
        ));
        output.push('\n');
        output.push_str(&format!("    {}\n", self.location.line));
        output.push_str(&format!(
            "    {}{}\n",
            " ".repeat(self.location.column.saturating_sub(1)),
            "^".red().bold()
        ));
        output.push('\n');
        output.push_str(&self.message);
        output.push('\n');
        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render_plain())
    }
}

/// Pick the closest visible name to `name`, if any is close enough to be a
/// plausible typo.
pub fn closest_candidate(name: &str, candidates: &[String]) -> Option<String> {
    let mut best: Option<(f64, &String)> = None;
    for candidate in candidates {
        let score = strsim::jaro_winkler(name, candidate);
        if score >= 0.85 {
            match best {
                Some((best_score, _)) if best_score >= score => {}
                _ => best = Some((score, candidate)),
            }
        }
    }
    best.map(|(_, candidate)| candidate.clone())
}

/// Collects diagnostics for one compilation phase.
///
/// Every phase owns a reporter; the driver checks `has_errors()` between
/// phases and refuses to run the next one once an error has been recorded.
#[derive(Debug, Default)]
pub struct Reporter {
    diagnostics: Vec<Diagnostic>,
    error_count: usize,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, diagnostic: Diagnostic) {
        if diagnostic.severity == Severity::Error {
            self.error_count += 1;
        }
        self.diagnostics.push(diagnostic);
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take(&mut self) -> Vec<Diagnostic> {
        self.error_count = 0;
        std::mem::take(&mut self.diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location() -> SourceLocation {
        SourceLocation::new("test.acorn".to_string(), "let a = 2".to_string(), 2, 5)
    }

    #[test]
    fn test_plain_rendering_layout() {
        let diagnostic = Diagnostic::redefined(location(), "a");
        let rendered = diagnostic.render_plain();

        assert_eq!(
            rendered,
            "Redefined error in test.acorn on line 2 column 5\n\
             \n    let a = 2\n        ^\n\n\
             a is already defined in this scope.\n"
        );
    }

    #[test]
    fn test_syntax_message_shape() {
        let diagnostic = Diagnostic::syntax(location(), "end", "Name");
        assert!(diagnostic.message.contains("Got: end"));
        assert!(diagnostic.message.contains("Expected: Name"));
    }

    #[test]
    fn test_reporter_counts_errors() {
        let mut reporter = Reporter::new();
        assert!(!reporter.has_errors());

        reporter.report(Diagnostic::type_inference(location()));
        reporter.report(Diagnostic::constant_assignment(location()));

        assert!(reporter.has_errors());
        assert_eq!(reporter.error_count(), 2);
        assert_eq!(reporter.diagnostics().len(), 2);
    }

    #[test]
    fn test_take_resets_the_reporter() {
        let mut reporter = Reporter::new();
        reporter.report(Diagnostic::type_inference(location()));

        let drained = reporter.take();

        assert_eq!(drained.len(), 1);
        assert!(!reporter.has_errors());
        assert!(reporter.diagnostics().is_empty());
    }

    #[test]
    fn test_suggestion_picks_close_name() {
        let candidates = vec!["count".to_string(), "total".to_string()];
        assert_eq!(closest_candidate("cuont", &candidates), Some("count".to_string()));
        assert_eq!(closest_candidate("zzz", &candidates), None);
    }

    #[test]
    fn test_undefined_with_candidates_appends_suggestion() {
        let candidates = vec!["length".to_string()];
        let diagnostic = Diagnostic::undefined_with_candidates(location(), "lenght", &candidates);
        assert!(diagnostic.message.contains("Did you mean 'length'?"));
    }
}
