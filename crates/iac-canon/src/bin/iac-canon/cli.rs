//! iac-canon cli interface

use clap::{Parser, Subcommand, ValueEnum};
use iac_canon::detect::{Format, FormatHint};
use std::fmt::Formatter;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the canonical values of all loaded units
    Show(ShowCommand),

    /// Print the source location of an attribute path
    #[command(alias = "loc")]
    Location(LocationCommand),
}

#[derive(Parser, Debug)]
pub struct ShowCommand {
    #[clap(flatten)]
    pub input: InputArgs,

    #[clap(flatten)]
    pub output: OutputArgs,
}

#[derive(Parser, Debug)]
pub struct LocationCommand {
    #[clap(flatten)]
    pub input: InputArgs,

    /// Unit (file or module directory) to look in
    #[clap(short = 'u', long = "unit")]
    pub unit: PathBuf,

    /// Attribute path, e.g. `aws_instance.web ebs_block_device 0 volume_size`
    #[clap(last = true, required = true)]
    pub attribute_path: Vec<String>,
}

#[derive(Parser, Debug)]
pub struct InputArgs {
    /// Input type
    #[arg(short = 't', long = "input-type", default_value_t)]
    pub input_type: InputType,

    /// Do not skip files based on their extension
    #[clap(long = "ignore-ext")]
    pub ignore_ext: bool,

    /// Resource schema bundle (JSON or YAML)
    #[clap(short = 's', long = "schemas")]
    pub schemas: Option<PathBuf>,

    /// Files or directories to load, `-` reads stdin
    #[clap(required = true)]
    pub paths: Vec<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Default, Debug)]
pub enum InputType {
    #[default]
    Auto,
    Tf,
    TfPlan,
    Cfn,
}

impl From<InputType> for FormatHint {
    fn from(value: InputType) -> Self {
        match value {
            InputType::Auto => FormatHint::Auto,
            InputType::Tf => FormatHint::Force(Format::Tf),
            InputType::TfPlan => FormatHint::Force(Format::TfPlan),
            InputType::Cfn => FormatHint::Force(Format::Cfn),
        }
    }
}

impl std::fmt::Display for InputType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", FormatHint::from(*self))
    }
}

#[derive(Parser, Debug)]
pub struct OutputArgs {
    #[arg(short = 'F', long = "output-format", default_value_t)]
    pub format: OutputFormat,
}

#[derive(ValueEnum, Clone, Default, Debug)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => f.write_str("json"),
            OutputFormat::Yaml => f.write_str("yaml"),
        }
    }
}
