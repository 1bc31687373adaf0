//! CLI for AST-based mutation generation and testing

use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use astmut::{
    mutate_source, operators, prepare_mutation, run_mutation_tests, validate_targets, Config,
    Generator, MutationReport, OperatorRegistry,
};

#[derive(Parser)]
#[command(name = "astmut")]
#[command(author, version, about = "AST-based mutation testing for Rust", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Which mutations to generate for a single file
#[derive(clap::Args)]
struct Selection {
    /// Rust source file to mutate
    file: PathBuf,

    /// Only mutate inside this function
    #[arg(short, long)]
    function: Option<String>,

    /// Operators to apply, in order (defaults to every built-in operator)
    #[arg(short, long = "operator")]
    operators: Vec<String>,
}

impl Selection {
    fn registry(&self) -> anyhow::Result<OperatorRegistry> {
        if self.operators.is_empty() {
            Ok(OperatorRegistry::builtin())
        } else {
            Ok(OperatorRegistry::from_names(&self.operators)?)
        }
    }

    fn generator<'r>(&self, registry: &'r OperatorRegistry) -> Generator<'r> {
        match &self.function {
            Some(function) => Generator::new(registry).within_function(function.clone()),
            None => Generator::new(registry),
        }
    }

    fn source(&self) -> anyhow::Result<String> {
        std::fs::read_to_string(&self.file)
            .with_context(|| format!("Failed to read '{}'", self.file.display()))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List the mutations of a file
    List {
        #[command(flatten)]
        selection: Selection,
    },

    /// Print or write the source of one mutant
    Show {
        #[command(flatten)]
        selection: Selection,

        /// Mutation number, as printed by `list`
        #[arg(long)]
        id: usize,

        /// Write the mutant here instead of printing it
        #[arg(short = 'O', long)]
        output: Option<PathBuf>,
    },

    /// Run mutation tests
    Test {
        /// Path to the mutations config file
        #[arg(short, long, default_value = "mutations.yaml")]
        config: PathBuf,

        /// Project directory (defaults to current directory)
        #[arg(short, long)]
        project: Option<PathBuf>,

        /// Enable verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate configuration without running tests
    Validate {
        /// Path to the mutations config file
        #[arg(short, long, default_value = "mutations.yaml")]
        config: PathBuf,

        /// Project directory (defaults to current directory)
        #[arg(short, long)]
        project: Option<PathBuf>,
    },

    /// List the built-in operators
    Operators,

    /// Show example configuration
    Example,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let verbose = matches!(cli.command, Commands::Test { verbose: true, .. });
    init_tracing(verbose);

    let outcome = match cli.command {
        Commands::List { selection } => list_mutations(&selection),
        Commands::Show {
            selection,
            id,
            output,
        } => show_mutant(&selection, id, output.as_deref()),
        Commands::Test {
            config,
            project,
            verbose,
        } => run_tests(&config, project, verbose),
        Commands::Validate { config, project } => validate_config(&config, project),
        Commands::Operators => {
            for name in operators::BUILTIN {
                println!("{}", name);
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Example => {
            print_example();
            Ok(ExitCode::SUCCESS)
        }
    };

    outcome.unwrap_or_else(|e| {
        eprintln!("{}: {:#}", "Error".red().bold(), e);
        ExitCode::FAILURE
    })
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn list_mutations(selection: &Selection) -> anyhow::Result<ExitCode> {
    let registry = selection.registry()?;
    let generator = selection.generator(&registry);
    let source = selection.source()?;

    let summary = mutate_source(&source, &selection.file, &generator, |mutation, _| {
        println!(
            "{} {}:{}:{} {} -> {} {}",
            format!("#{}", mutation.id).bold(),
            selection.file.display(),
            mutation.location.line,
            mutation.location.column,
            mutation.original,
            mutation.replacement_source().green(),
            format!("[{}]", mutation.operator).dimmed()
        );
        Ok(ControlFlow::Continue(()))
    })?;

    println!();
    println!("Found {} mutation(s)", summary.delivered);
    Ok(ExitCode::SUCCESS)
}

fn show_mutant(selection: &Selection, id: usize, output: Option<&Path>) -> anyhow::Result<ExitCode> {
    let registry = selection.registry()?;
    let generator = selection.generator(&registry);
    let source = selection.source()?;

    let Some(prepared) = prepare_mutation(&source, &selection.file, &generator, id)? else {
        anyhow::bail!("{} has no mutation #{}", selection.file.display(), id);
    };

    match output {
        Some(path) => {
            std::fs::write(path, &prepared.mutated_source)
                .with_context(|| format!("Failed to write '{}'", path.display()))?;
            println!(
                "{} wrote mutant #{} ({}) to {}",
                "✓".green(),
                id,
                prepared.mutation.description(),
                path.display()
            );
        }
        None => print!("{}", prepared.mutated_source),
    }
    Ok(ExitCode::SUCCESS)
}

fn run_tests(config_path: &Path, project: Option<PathBuf>, verbose: bool) -> anyhow::Result<ExitCode> {
    let project_dir = project.unwrap_or_else(|| PathBuf::from("."));

    // Load configuration
    println!("{}", "Loading configuration...".dimmed());
    let config = Config::load(config_path)?;
    println!("Found {} target(s) in config", config.targets.len());

    // Validate configuration first
    println!("{}", "Validating targets...".dimmed());
    if let Err(errors) = config.validate(&project_dir) {
        eprintln!("{}", "Configuration errors found:".red().bold());
        for error in &errors {
            eprintln!("  • {}", error);
        }
        return Ok(ExitCode::FAILURE);
    }

    println!("{}", "All targets valid. Running tests...".green());
    println!();

    let results = run_mutation_tests(&config, &project_dir, verbose)?;

    let report = MutationReport::new(results);
    report.print();

    if report.survived() > 0 {
        Ok(ExitCode::from(1)) // Some mutations survived
    } else if report.errors() > 0 {
        Ok(ExitCode::from(2))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn validate_config(config_path: &Path, project: Option<PathBuf>) -> anyhow::Result<ExitCode> {
    let project_dir = project.unwrap_or_else(|| PathBuf::from("."));

    println!("{}", "Loading configuration...".dimmed());
    let config = Config::load(config_path)?;
    println!("Found {} target(s) in config", config.targets.len());
    println!();

    let mut all_valid = true;
    if let Err(e) = config.settings.registry() {
        all_valid = false;
        println!("{} operators", "✗".red());
        println!("  {}: {}", "Error".red(), e);
    }

    let validation_results = validate_targets(&config, &project_dir);
    for (target, result) in config.targets.iter().zip(&validation_results) {
        match result {
            Ok(()) => println!("{} {}", "✓".green(), target.description()),
            Err(e) => {
                all_valid = false;
                println!("{} {}", "✗".red(), target.description());
                println!("  {}: {}", "Error".red(), e);
            }
        }
    }

    println!();
    if all_valid {
        println!(
            "{} All {} targets are valid!",
            "✓".green().bold(),
            config.targets.len()
        );
        Ok(ExitCode::SUCCESS)
    } else {
        let error_count = validation_results.iter().filter(|r| r.is_err()).count();
        println!(
            "{} {} of {} targets have errors",
            "✗".red().bold(),
            error_count,
            config.targets.len()
        );
        Ok(ExitCode::FAILURE)
    }
}

fn print_example() {
    let example = r#"# Example mutations.yaml configuration file
version: "1.0"

settings:
  timeout: 30        # seconds per test run
  fail_fast: false   # stop at the first surviving mutant
  # Operators run in this order; omit to use every built-in operator
  operators:
    - arithmetic
    - relational-boundary
    - logical
    - boolean-literal
    - negate-condition

targets:
  # Every mutation site in the file
  - file: src/calculator.rs

  # Only sites inside one function
  - file: src/validator.rs
    function: is_adult

  - file: src/report.rs
    function: format_date
"#;

    println!("{}", example);
}
