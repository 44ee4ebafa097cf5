//! Error types for compiling and rendering templates.
//!
//! Compilation failures are structural and abort the compile. Render
//! failures are raised while walking the generator tree, either because a
//! key could not be resolved or because a value could not be formatted.

use std::fmt;
use thiserror::Error;


/// Position of a tag inside the template text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    /// Byte offset of the tag's opening delimiter.
    pub offset: usize,
    /// 1-based line number.
    pub line: usize,
    /// 1-based column, counted in characters.
    pub column: usize,
}

impl Location {
    pub(crate) fn of(text: &str, offset: usize) -> Self {
        let before = &text[..offset];
        let line_start = before.rfind('\n').map_or(0, |p| p + 1);
        Location {
            offset,
            line: before.matches('\n').count() + 1,
            column: before[line_start..].chars().count() + 1,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}


#[derive(Debug, Error)]
pub enum CompileError {
    #[error("unknown tag '{name}' at {location}")]
    UnknownTag { name: String, location: Location },

    #[error("tag '{name}' is not allowed here ({location})")]
    UnexpectedTag { name: String, location: Location },

    #[error("malformed tag '{name}' at {location}")]
    MalformedTag { name: String, location: Location },

    #[error(
        "wrong number of arguments for tag '{name}': expected at most {expected}, found {found} ({location})"
    )]
    WrongArgumentCount {
        name: String,
        expected: usize,
        found: usize,
        location: Location,
    },

    #[error("missing required argument '{parameter}' for tag '{name}' at {location}")]
    MissingArgument {
        name: String,
        parameter: String,
        location: Location,
    },

    #[error("missing closing tag for '{name}' opened at {location}")]
    MissingClosingTag { name: String, location: Location },

    #[error("invalid alignment '{alignment}' at {location}")]
    InvalidAlignment { alignment: String, location: Location },

    #[error("tag '{0}' is already registered")]
    DuplicateTag(String),

    #[error("invalid tag name '{0}'")]
    InvalidTagName(String),

    #[error("failed to build tag matcher: {0}")]
    Pattern(#[from] regex::Error),
}

impl CompileError {
    /// Name of the tag the error is about, when there is one.
    pub fn tag_name(&self) -> Option<&str> {
        match self {
            CompileError::UnknownTag { name, .. }
            | CompileError::UnexpectedTag { name, .. }
            | CompileError::MalformedTag { name, .. }
            | CompileError::WrongArgumentCount { name, .. }
            | CompileError::MissingArgument { name, .. }
            | CompileError::MissingClosingTag { name, .. }
            | CompileError::DuplicateTag(name)
            | CompileError::InvalidTagName(name) => Some(name),
            CompileError::InvalidAlignment { .. } | CompileError::Pattern(_) => None,
        }
    }

    pub fn location(&self) -> Option<Location> {
        match self {
            CompileError::UnknownTag { location, .. }
            | CompileError::UnexpectedTag { location, .. }
            | CompileError::MalformedTag { location, .. }
            | CompileError::WrongArgumentCount { location, .. }
            | CompileError::MissingArgument { location, .. }
            | CompileError::MissingClosingTag { location, .. }
            | CompileError::InvalidAlignment { location, .. } => Some(*location),
            _ => None,
        }
    }
}


#[derive(Debug, Error)]
pub enum RenderError {
    #[error("key not found: '{key}' (missing member '{member}')")]
    KeyNotFound { key: String, member: String },

    #[error("failed to format '{key}': {source}")]
    Format {
        key: String,
        #[source]
        source: FormatError,
    },

    #[error("tag '{name}' failed: {message}")]
    Tag { name: String, message: String },
}


#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("format specifier '{0}' is invalid")]
    InvalidSpecifier(String),

    #[error("format specifier '{specifier}' cannot be applied to {kind}")]
    Unsupported { specifier: String, kind: &'static str },

    #[error("alignment {0} is out of range")]
    AlignmentOutOfRange(i32),

    #[error("precision of format specifier '{0}' is out of range")]
    PrecisionOutOfRange(String),
}
