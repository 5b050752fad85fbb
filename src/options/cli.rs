//! Default command line grammar, built on clap.

use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::{ArgAction, Args, Parser, Subcommand};

use crate::commands;
use crate::error::{Fault, HandledError};
use crate::logging::{LogHandler, DEFAULT_VERBOSITY};
use crate::options::{
    ArgValue, CommandHandlerTable, OptionParser, Parsed, ParsedOptions, UserDefaults,
};

/// Command run when none is named.
pub const DEFAULT_COMMAND: &str = "run";

/// toxr - run project test and automation environments
#[derive(Parser, Debug)]
#[command(name = "toxr")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file (default: discover toxr.toml upwards from --root)
    #[arg(short = 'c', long = "conf", global = true)]
    conf: Option<PathBuf>,

    /// Directory to start configuration discovery from
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Increase verbosity (repeatable)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Decrease verbosity (repeatable)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    quiet: u8,

    /// Fail instead of re-running in a provisioned runtime
    #[arg(long, global = true)]
    no_provision: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run environments sequentially
    #[command(alias = "r")]
    Run(RunArgs),

    /// Run environments in parallel, one worker per environment
    #[command(name = "run-parallel", alias = "p")]
    RunParallel(RunArgs),

    /// List environments
    #[command(alias = "l")]
    List {
        /// Only show the environments from env_list
        #[arg(short = 'd', long)]
        defaults_only: bool,
    },

    /// Show the configuration of environments
    #[command(alias = "c")]
    Config {
        /// Environments to show (default: all)
        #[arg(short, long, value_delimiter = ',')]
        env: Vec<String>,

        /// Output format
        #[arg(long, default_value = "toml", value_parser = ["toml", "json"])]
        format: String,
    },
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    /// Environments to run (comma separated, ALL for every environment)
    #[arg(short, long, value_delimiter = ',')]
    env: Vec<String>,

    /// Arguments substituted for {posargs}
    #[arg(last = true)]
    posargs: Vec<String>,
}

/// [`OptionParser`] for the toxr command line.
#[derive(Debug, Clone, Default)]
pub struct ClapParser {
    user: Option<UserDefaults>,
}

impl ClapParser {
    /// Parser with fixed user defaults instead of reading the user file.
    pub fn with_user_defaults(user: UserDefaults) -> Self {
        Self { user: Some(user) }
    }

    fn user_defaults(&self) -> Result<UserDefaults, Fault> {
        match &self.user {
            Some(user) => Ok(user.clone()),
            None => Ok(UserDefaults::load()?),
        }
    }
}

impl OptionParser for ClapParser {
    fn parse(&self, args: &[String]) -> Result<Parsed, Fault> {
        let handlers = commands::default_table();
        let argv = std::iter::once("toxr").chain(args.iter().map(String::as_str));

        let cli = match Cli::try_parse_from(argv) {
            Ok(cli) => cli,
            Err(err) => {
                return match err.kind() {
                    ErrorKind::DisplayHelp
                    | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                        Ok(rendered(commands::HELP, &err, handlers))
                    }
                    ErrorKind::DisplayVersion => Ok(rendered(commands::VERSION, &err, handlers)),
                    _ => Err(HandledError::new(usage_message(&err)).into()),
                };
            }
        };

        let user = self.user_defaults()?;
        let verbosity = user
            .verbosity
            .unwrap_or(DEFAULT_VERBOSITY)
            .saturating_add(i32::from(cli.verbose))
            .saturating_sub(i32::from(cli.quiet));

        let default_command = user
            .default_command
            .clone()
            .unwrap_or_else(|| DEFAULT_COMMAND.to_string());
        let (mut options, positional) = match cli.command {
            Some(Command::Run(run)) => run_options(commands::RUN, run),
            Some(Command::RunParallel(run)) => run_options(commands::RUN_PARALLEL, run),
            Some(Command::List { defaults_only }) => (
                ParsedOptions::new(commands::LIST)
                    .with("defaults_only", ArgValue::Flag(defaults_only)),
                Vec::new(),
            ),
            Some(Command::Config { env, format }) => (
                ParsedOptions::new(commands::CONFIG)
                    .with("env", ArgValue::List(env))
                    .with("format", ArgValue::Value(format)),
                Vec::new(),
            ),
            None => {
                if !handlers.contains(&default_command) {
                    return Err(HandledError::new(format!(
                        "default_command '{}' from the user configuration is not a command",
                        default_command
                    ))
                    .into());
                }
                (ParsedOptions::new(default_command), Vec::new())
            }
        };

        if let Some(conf) = cli.conf {
            options.insert("conf", ArgValue::Value(conf.display().to_string()));
        }
        if let Some(root) = cli.root {
            options.insert("root", ArgValue::Value(root.display().to_string()));
        }
        options.insert("verbose", ArgValue::Count(cli.verbose));
        options.insert("quiet", ArgValue::Count(cli.quiet));
        options.insert(
            "no_provision",
            ArgValue::Flag(cli.no_provision || user.no_provision.unwrap_or(false)),
        );

        Ok(Parsed {
            options,
            handlers,
            positional,
            log_handler: LogHandler::new(verbosity),
        })
    }
}

fn run_options(command: &str, run: RunArgs) -> (ParsedOptions, Vec<String>) {
    (
        ParsedOptions::new(command).with("env", ArgValue::List(run.env)),
        run.posargs,
    )
}

/// Options for the built-in help/version commands, carrying clap's text.
fn rendered(command: &str, err: &clap::Error, handlers: CommandHandlerTable) -> Parsed {
    Parsed {
        options: ParsedOptions::new(command)
            .with("text", ArgValue::Value(err.render().to_string())),
        handlers,
        positional: Vec::new(),
        log_handler: LogHandler::default(),
    }
}

/// First line of a clap error without its `error: ` prefix.
fn usage_message(err: &clap::Error) -> String {
    let rendered = err.render().to_string();
    let first = rendered.lines().next().unwrap_or_default();
    first.strip_prefix("error: ").unwrap_or(first).trim().to_string()
}
