//! YesWorkflow CLI Entry Point
//!
//! Builds a workflow model from an extracted annotation listing.
//!
//! # Usage
//!
//! ```bash
//! # Build the model and print a summary
//! yw script.yw
//!
//! # Select the workflow by name and write Prolog facts
//! yw script.yw --workflow main --facts model.P
//!
//! # Print the model as JSON
//! yw script.yaml --json
//!
//! # Override settings from yw.yaml
//! yw script.yw -c model.logic=datalog -c model.factsfile=-
//! ```

use std::env;
use std::process::ExitCode;

use colored::Colorize;
use log::{error, info};

use yesworkflow::config::{ModelConfig, DEFAULT_CONFIG_FILE};
use yesworkflow::model::{AsProgram, Model};
use yesworkflow::{load_annotations, Error, Modeler, APP_NAME, VERSION};

/// Exit code for usage and configuration errors.
const EXIT_USAGE_ERROR: u8 = 2;

/// Exit code for markup errors in the annotations.
const EXIT_MARKUP_ERROR: u8 = 3;

/// Command-line arguments.
#[derive(Debug, Default)]
struct CliArgs {
    listing_path: Option<String>,
    config_path: Option<String>,
    workflow: Option<String>,
    facts_file: Option<String>,
    logic: Option<String>,
    options: Vec<String>,
    json: bool,
    verbose: bool,
}

/// Failure categories mapped to exit codes.
enum Failure {
    Usage(String),
    Run(Error),
}

impl From<Error> for Failure {
    fn from(e: Error) -> Self {
        Self::Run(e)
    }
}

/// Configures the logging system with appropriate formatting.
fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            use std::io::Write;

            match record.level() {
                log::Level::Warn | log::Level::Error => {
                    writeln!(buf, "[{}] {}", record.level(), record.args())
                }
                _ => writeln!(buf, "{}", record.args()),
            }
        })
        .target(env_logger::Target::Stderr)
        .init();
}

/// Prints usage information.
fn print_usage() {
    println!("Usage: yw [OPTIONS] <ANNOTATION_LISTING>");
    println!();
    println!("Arguments:");
    println!("  <ANNOTATION_LISTING>  Extracted annotations (.yaml, .json, or one YW comment per line)");
    println!();
    println!("Options:");
    println!("  --workflow NAME       Name of the top-level workflow");
    println!("  --facts PATH          Write model facts to PATH ('-' for stdout)");
    println!("  --logic LANG          Fact dialect: prolog or datalog");
    println!("  --config FILE         Configuration file (default: {})", DEFAULT_CONFIG_FILE);
    println!("  -c, --config-option NAME=VALUE");
    println!("                        Override a configuration setting");
    println!("  --json                Print the model as JSON");
    println!("  --verbose             Enable debug logging");
    println!("  --help                Show this help message");
    println!("  --version             Show version information");
    println!();
    println!("Examples:");
    println!("  yw script.yw");
    println!("  yw script.yw --workflow main --facts model.P");
    println!("  yw script.yaml -c model.logic=datalog -c model.factsfile=-");
}

/// Takes the value following an option.
fn option_value(args: &[String], i: &mut usize, option: &str) -> Result<String, String> {
    *i += 1;
    args.get(*i)
        .cloned()
        .ok_or_else(|| format!("{} requires a value", option))
}

/// Parses command-line arguments.
fn parse_arguments(args: &[String]) -> Result<CliArgs, String> {
    let mut cli = CliArgs::default();
    let mut i = 1; // Skip program name

    while i < args.len() {
        let arg = &args[i];

        match arg.as_str() {
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("{} {}", APP_NAME, VERSION);
                std::process::exit(0);
            }
            "--json" => cli.json = true,
            "--verbose" | "-v" => cli.verbose = true,
            "--workflow" => cli.workflow = Some(option_value(args, &mut i, arg)?),
            "--facts" => cli.facts_file = Some(option_value(args, &mut i, arg)?),
            "--logic" => cli.logic = Some(option_value(args, &mut i, arg)?),
            "--config" => cli.config_path = Some(option_value(args, &mut i, arg)?),
            "-c" | "--config-option" => cli.options.push(option_value(args, &mut i, arg)?),
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown option: {}", arg));
            }
            _ => {
                if cli.listing_path.is_some() {
                    return Err(format!("Unexpected argument: {}", arg));
                }
                cli.listing_path = Some(arg.clone());
            }
        }
        i += 1;
    }

    Ok(cli)
}

/// Builds the model configuration: file, then `-c` options, then flags.
fn load_config(cli: &CliArgs) -> Result<ModelConfig, Error> {
    let mut config = match &cli.config_path {
        Some(path) => ModelConfig::from_yaml_file(path)?,
        None => ModelConfig::from_optional_file(DEFAULT_CONFIG_FILE)?,
    };

    for option in &cli.options {
        config.apply_option(option)?;
    }

    if let Some(name) = &cli.workflow {
        config.workflow = Some(name.clone());
    }
    if let Some(path) = &cli.facts_file {
        config.facts_file = Some(path.clone());
    }
    if let Some(logic) = &cli.logic {
        config.apply_option(&format!("model.logic={}", logic))?;
    }

    Ok(config)
}

/// Logs a short description of the model.
fn print_summary(model: &Model) {
    match &model.workflow {
        Some(workflow) => {
            let program = workflow.as_program();
            info!(
                "Workflow '{}': {} ports, {} nested programs, {} channels",
                workflow.name(),
                program.in_ports.len() + program.out_ports.len(),
                program.scope_count() - 1,
                program.channels.len()
            );
        }
        None => info!("No workflow selected"),
    }

    for function in &model.functions {
        let returns = function
            .return_port()
            .map(|p| p.binding.as_str())
            .unwrap_or("nothing");
        info!("Function '{}' returns {}", function.name(), returns);
    }
}

const MARKUP_BANNER: &str =
    "******************* YESWORKFLOW MARKUP ERRORS **************************";

/// Prints markup errors inside a banner, one problem per line.
fn print_markup_errors(message: &str) {
    eprintln!("{}", MARKUP_BANNER.red().bold());
    eprintln!("{}", message);
    eprintln!("{}", "-".repeat(MARKUP_BANNER.len()));
}

/// Main application entry point.
fn run(args: &[String]) -> Result<(), Failure> {
    let cli = parse_arguments(args).map_err(Failure::Usage)?;

    setup_logging(cli.verbose);

    let listing_path = cli
        .listing_path
        .clone()
        .ok_or_else(|| Failure::Usage("Missing annotation listing".to_string()))?;

    let config = load_config(&cli)?;
    if let Some(name) = &config.workflow {
        info!("Workflow: {}", name);
    }

    let annotations = load_annotations(&listing_path)?;

    let model = Modeler::new(config).model(&annotations)?;
    print_summary(&model);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&model).map_err(Error::from)?);
    }

    Ok(())
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(Failure::Usage(message)) => {
            eprintln!("Error: {}", message);
            eprintln!();
            print_usage();
            ExitCode::from(EXIT_USAGE_ERROR)
        }
        Err(Failure::Run(Error::Markup(e))) => {
            print_markup_errors(&e.to_string());
            ExitCode::from(EXIT_MARKUP_ERROR)
        }
        Err(Failure::Run(Error::Config(e))) => {
            error!("Configuration error: {}", e);
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_USAGE_ERROR)
        }
        Err(Failure::Run(e)) => {
            eprintln!();
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("yw")
            .chain(list.iter().copied())
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_parse_arguments() {
        let cli = parse_arguments(&args(&[
            "script.yw",
            "--workflow",
            "main",
            "-c",
            "model.logic=datalog",
            "--json",
        ]))
        .unwrap();

        assert_eq!(cli.listing_path.as_deref(), Some("script.yw"));
        assert_eq!(cli.workflow.as_deref(), Some("main"));
        assert_eq!(cli.options, vec!["model.logic=datalog"]);
        assert!(cli.json);
        assert!(!cli.verbose);
    }

    #[test]
    fn test_parse_arguments_missing_value() {
        let result = parse_arguments(&args(&["script.yw", "--facts"]));
        assert_eq!(result.unwrap_err(), "--facts requires a value");
    }

    #[test]
    fn test_parse_arguments_rejects_unknown_option() {
        assert!(parse_arguments(&args(&["--fast"])).is_err());
        assert!(parse_arguments(&args(&["a.yw", "b.yw"])).is_err());
    }

    #[test]
    fn test_load_config_flags_override_options() {
        use tempfile::tempdir;
        use yesworkflow::config::LogicLanguage;

        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("yw.yaml");
        std::fs::write(&path, "model:\n  workflow: filed\n  factsfile: filed.P\n").unwrap();

        let cli = CliArgs {
            config_path: Some(path.to_str().unwrap().to_string()),
            workflow: Some("flagged".to_string()),
            logic: Some("datalog".to_string()),
            options: vec![
                "model.workflow=optioned".to_string(),
                "model.factsfile".to_string(),
            ],
            ..CliArgs::default()
        };

        let config = load_config(&cli).unwrap();
        assert_eq!(config.workflow.as_deref(), Some("flagged"));
        assert_eq!(config.facts_file.as_deref(), Some(""));
        assert_eq!(config.logic, LogicLanguage::Datalog);
    }

    #[test]
    fn test_load_config_missing_file() {
        let cli = CliArgs {
            config_path: Some("/nonexistent/yw.yaml".to_string()),
            ..CliArgs::default()
        };
        assert!(matches!(load_config(&cli), Err(Error::Io { .. })));
    }
}
