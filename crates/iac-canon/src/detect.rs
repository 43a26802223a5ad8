//! format detection
//!
//! A [Detector] recognizes one native format. Offered an input it answers with one of three
//! [Detection] outcomes:
//!
//! - [Detection::Decline]: the input is structurally not this format
//! - [Detection::Claim]: the input is this format and was loaded
//! - [Detection::Malformed]: the input carries the format's signature (a marker field, an extension)
//!   but is broken
//!
//! Declining is not an error and never reaches the user. An input that cannot be read at all is
//! neither of the three, the detector hands the I/O error back as [Detection::Unreadable].
use crate::input::{InputDirectory, InputFile};
use crate::loader::ConfigurationUnit;
use std::fmt::Formatter;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Nesting limit applied while rendering a single unit
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Supported formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// Terraform HCL module directory
    Tf,
    /// Terraform plan JSON
    TfPlan,
    /// CloudFormation template
    Cfn,
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Format::Tf => f.write_str("tf"),
            Format::TfPlan => f.write_str("tf-plan"),
            Format::Cfn => f.write_str("cfn"),
        }
    }
}

/// Which detectors run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FormatHint {
    /// all detectors, in priority order
    #[default]
    Auto,
    /// only the given format, anything else is an error
    Force(Format),
}

impl std::fmt::Display for FormatHint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FormatHint::Auto => f.write_str("auto"),
            FormatHint::Force(format) => write!(f, "{format}"),
        }
    }
}

impl FromStr for FormatHint {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(FormatHint::Auto),
            "tf" => Ok(FormatHint::Force(Format::Tf)),
            "tf-plan" => Ok(FormatHint::Force(Format::TfPlan)),
            "cfn" => Ok(FormatHint::Force(Format::Cfn)),
            _ => Err(UnknownFormat(s.to_string())),
        }
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
#[error("unknown input type `{0}` (expected one of: auto, tf, tf-plan, cfn)")]
pub struct UnknownFormat(String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectOptions {
    /// do not decline files based on their extension
    pub ignore_ext: bool,
    /// nesting limit while rendering
    pub max_depth: usize,
}

impl Default for DetectOptions {
    fn default() -> Self {
        Self {
            ignore_ext: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Outcome of offering an input to a detector
#[derive(Debug)]
pub enum Detection {
    Decline,
    Claim(Box<ConfigurationUnit>),
    Malformed(MalformedInput),
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl Detection {
    pub fn unreadable(path: &Path, source: std::io::Error) -> Self {
        Detection::Unreadable {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl From<ConfigurationUnit> for Detection {
    fn from(value: ConfigurationUnit) -> Self {
        Detection::Claim(Box::new(value))
    }
}

impl From<MalformedInput> for Detection {
    fn from(value: MalformedInput) -> Self {
        Detection::Malformed(value)
    }
}

/// Recognizes and loads one format
///
/// Both methods decline by default.
pub trait Detector: Send + Sync + std::fmt::Debug {
    fn format(&self) -> Format;

    fn detect_file(&self, _file: &InputFile, _options: &DetectOptions) -> Detection {
        Detection::Decline
    }

    fn detect_directory(&self, _directory: &InputDirectory, _options: &DetectOptions) -> Detection {
        Detection::Decline
    }
}

/// 1-based line and column
#[derive(derive_new::new, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

/// Input that carries a format's signature but fails to load
#[derive(Debug, Clone, PartialEq)]
pub struct MalformedInput {
    pub path: PathBuf,
    pub position: Option<Position>,
    pub reason: String,
}

impl MalformedInput {
    pub fn new(
        path: impl Into<PathBuf>,
        position: Option<Position>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            position,
            reason: reason.into(),
        }
    }
}

impl std::error::Error for MalformedInput {}

impl std::fmt::Display for MalformedInput {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path.display())?;
        if let Some(position) = self.position {
            write!(f, ":{}:{}", position.line, position.column)?;
        }
        write!(f, ": {}", self.reason)
    }
}
