//! User-friendly diagnostic messages.
//!
//! Fatal configuration errors carry enough context for the user to fix the
//! setup without reading the source: which value was rejected, what was
//! searched, and a concrete next step.

use std::fmt;
use std::path::PathBuf;

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

/// Common suggestion messages for consistent error handling.
pub mod suggestions {
    /// Suggestion when no distro is configured.
    pub const NO_DISTRO: &str =
        "help: Pass `--distro <name>` or set `distro` under [project] in microros.toml";

    /// Suggestion when the build orchestrator is missing.
    pub const NO_COLCON: &str =
        "help: Install colcon (`pip install colcon-common-extensions`) and re-run";

    /// Suggestion when a build stage fails.
    pub const BUILD_FAILED: &str =
        "help: Re-run with `--verbose` for the full orchestrator invocation";
}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Note,
    Help,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
            Severity::Help => write!(f, "help"),
        }
    }
}

/// A diagnostic message with optional suggestions.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Primary message
    pub message: String,
    /// Severity level
    pub severity: Severity,
    /// Additional context lines
    pub context: Vec<String>,
    /// Suggested fixes
    pub suggestions: Vec<String>,
    /// Related location (file path)
    pub location: Option<PathBuf>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            severity: Severity::Error,
            context: Vec::new(),
            suggestions: Vec::new(),
            location: None,
        }
    }

    /// Create a new warning diagnostic.
    pub fn warning(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            severity: Severity::Warning,
            context: Vec::new(),
            suggestions: Vec::new(),
            location: None,
        }
    }

    /// Add context to the diagnostic.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Add a suggestion for fixing the issue.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Add a file location.
    pub fn with_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.location = Some(path.into());
        self
    }

    /// Format the diagnostic for terminal output.
    pub fn format(&self, color: bool) -> String {
        let mut output = String::new();

        let severity_str = if color {
            match self.severity {
                Severity::Error => "\x1b[1;31merror\x1b[0m",
                Severity::Warning => "\x1b[1;33mwarning\x1b[0m",
                Severity::Note => "\x1b[1;36mnote\x1b[0m",
                Severity::Help => "\x1b[1;32mhelp\x1b[0m",
            }
        } else {
            match self.severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
                Severity::Note => "note",
                Severity::Help => "help",
            }
        };

        output.push_str(&format!("{}: {}\n", severity_str, self.message));

        if let Some(ref path) = self.location {
            output.push_str(&format!("  --> {}\n", path.display()));
        }

        for ctx in &self.context {
            output.push_str(&format!("  - {}\n", ctx));
        }

        for suggestion in &self.suggestions {
            output.push_str(&format!("{}\n", suggestion));
        }

        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(false))
    }
}

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.format(color));
}

/// Unknown target distro.
#[derive(Debug, Error, MietteDiagnostic)]
#[error("unknown distro `{distro}`")]
#[diagnostic(
    code(microros_build::catalog::unknown_distro),
    help("supported distros: {supported}")
)]
pub struct UnknownDistroError {
    pub distro: String,
    pub supported: String,
}

/// The platform archiver pair (`ar` + `ranlib`) could not be resolved.
#[derive(Debug, Error, MietteDiagnostic)]
#[error("GNU binutils not found (searched {searched})")]
#[diagnostic(
    code(microros_build::merge::archiver_not_found),
    help("On macOS install binutils with Homebrew: `brew install binutils`")
)]
pub struct ArchiverNotFoundError {
    pub searched: String,
}

/// Two input archives share a filename stem, which would silently collapse
/// renamed members back into a collision.
#[derive(Debug, Error, MietteDiagnostic)]
#[error("duplicate archive stem `{stem}`: {first} and {second}")]
#[diagnostic(
    code(microros_build::merge::duplicate_stem),
    help("Rename one of the colliding packages so their archives differ")
)]
pub struct DuplicateArchiveStemError {
    pub stem: String,
    pub first: String,
    pub second: String,
}
