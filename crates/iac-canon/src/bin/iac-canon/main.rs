mod cli;

use iac_canon::loader::{LoadOptions, LoadedUnits, Loader};
use iac_canon::schema::{ResourceSchemas, SchemaProvider};
use std::sync::Arc;

fn main() {
    use clap::Parser;
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("IAC_CANON_LOG"))
        .with_writer(std::io::stderr)
        .init();

    let command_result = match cli.command {
        cli::Command::Show(show_cli) => show(show_cli),
        cli::Command::Location(location_cli) => location(location_cli),
    };

    if let Err(e) = command_result {
        for error in e.chain() {
            eprintln!("{error}")
        }
        std::process::exit(1);
    }
}

pub fn show(cli: cli::ShowCommand) -> anyhow::Result<()> {
    let units = load(&cli.input)?;
    let values = units.canonical_values();

    match cli.output.format {
        cli::OutputFormat::Yaml => serde_yaml::to_writer(std::io::stdout(), &values)?,
        cli::OutputFormat::Json => serde_json::to_writer_pretty(std::io::stdout(), &values)?,
    };

    Ok(())
}

pub fn location(cli: cli::LocationCommand) -> anyhow::Result<()> {
    let units = load(&cli.input)?;
    let attribute_path: Vec<&str> = cli.attribute_path.iter().map(String::as_str).collect();

    match units.location(&cli.unit, &attribute_path) {
        Some(location) => println!("{location}"),
        None => anyhow::bail!(
            "No location for {} in {}",
            attribute_path.join("."),
            cli.unit.display()
        ),
    }

    Ok(())
}

fn load(input: &cli::InputArgs) -> anyhow::Result<LoadedUnits> {
    let schemas: Arc<dyn SchemaProvider> = match &input.schemas {
        Some(path) => Arc::new(ResourceSchemas::from_path(path)?),
        None => Arc::new(ResourceSchemas::default()),
    };

    let mut options = LoadOptions::new(input.paths.clone());
    options.input_type = input.input_type.into();
    options.ignore_ext = input.ignore_ext;

    let units = Loader::new(schemas).load(&options)?;
    anyhow::ensure!(units.count() > 0, "No configuration loaded");
    tracing::info!(units = units.count(), "loaded");

    Ok(units)
}
