use std::collections::BTreeMap;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use dotrun_lib::consts::DEFAULT_SCRIPT;
use dotrun_lib::project::ProjectError;

mod cmd;
mod output;

use cmd::ProjectOptions;
use output::print_error;

/// dotrun - run package.json scripts with dependencies kept up to date
#[derive(Parser)]
#[command(name = "dotrun")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Project directory
  #[arg(short = 'C', long = "directory", global = true, default_value = ".")]
  directory: PathBuf,

  /// Don't check or install dependencies before running the script
  #[arg(short, long, global = true)]
  skip_install: bool,

  /// Extra environment variable for commands, may be repeated
  #[arg(short, long = "env", value_name = "KEY=VALUE", value_parser = parse_env_pair, global = true)]
  env: Vec<(String, String)>,

  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Print the dotrun version
  Version,

  /// Reinstall all dependencies, even if nothing changed
  Install,

  /// Run a command inside the project environment (default: bash)
  Exec {
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
  },

  /// Remove installed dependencies, the virtualenv and the state file
  Clean,

  /// Run a script from package.json
  #[command(external_subcommand)]
  Script(Vec<String>),
}

/// Parse `KEY=VALUE`. The value may itself contain `=`.
fn parse_env_pair(raw: &str) -> Result<(String, String), String> {
  match raw.split_once('=') {
    Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
    _ => Err(format!("expected KEY=VALUE, got `{raw}`")),
  }
}

fn init_tracing(verbose: bool) {
  let default_level = if verbose { "debug" } else { "info" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(io::stderr)
    .with_ansi(io::stderr().is_terminal())
    .with_target(false)
    .without_time()
    .init();
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  // Later occurrences of the same key win.
  let overrides: BTreeMap<String, String> = cli.env.into_iter().collect();
  let options = ProjectOptions {
    directory: cli.directory,
    overrides,
    skip_install: cli.skip_install,
  };

  let result = match cli.command {
    Some(Commands::Version) => {
      println!("dotrun {}", env!("CARGO_PKG_VERSION"));
      Ok(())
    }
    Some(Commands::Install) => cmd::cmd_install(&options),
    Some(Commands::Exec { command }) => cmd::cmd_exec(&options, &command),
    Some(Commands::Clean) => cmd::cmd_clean(&options),
    Some(Commands::Script(args)) => match args.split_first() {
      Some((script, rest)) => cmd::cmd_run(&options, script, rest),
      None => cmd::cmd_run(&options, DEFAULT_SCRIPT, &[]),
    },
    None => cmd::cmd_run(&options, DEFAULT_SCRIPT, &[]),
  };

  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => report(&err),
  }
}

fn report(err: &anyhow::Error) -> ExitCode {
  let project_error = err.downcast_ref::<ProjectError>();

  match project_error {
    Some(e) if e.is_cancelled() => {}
    Some(ProjectError::ScriptNotFound { .. }) => {
      print_error(&format!("{err:#}"));
      eprintln!("{}", Cli::command().render_usage());
    }
    _ => print_error(&format!("{err:#}")),
  }

  ExitCode::from(project_error.map(ProjectError::exit_code).unwrap_or(1))
}
