mod commands;
mod helpers;

use abundatron_core::domain::InspectError;
use clap::Parser;

pub fn run_from_env() -> i32 {
    let args: Vec<String> = std::env::args().skip(1).collect();

    match run(args) {
        Ok(code) => code,
        Err(error) => {
            let inspect_error = error.as_inspect_error();
            eprintln!("{}", inspect_error.diagnostic_line());
            eprintln!("{}", inspect_error.fatal_exit_line());
            inspect_error.exit_code()
        }
    }
}

pub fn run<I, S>(args: I) -> Result<i32, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let full_args = std::iter::once("abundatron".to_string())
        .chain(args.into_iter().map(Into::into))
        .collect::<Vec<_>>();
    parse_and_dispatch(full_args)
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match commands::BatchArgs::try_parse_from(&args) {
        Ok(parsed) => dispatch_parsed(parsed),
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

fn dispatch_parsed(args: commands::BatchArgs) -> Result<i32, CliError> {
    helpers::init_logging(args.verbosity());
    if args.list_lines {
        commands::run_list_lines_command(args)
    } else {
        commands::run_batch_command(args)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Inspect(InspectError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<InspectError> for CliError {
    fn from(error: InspectError) -> Self {
        Self::Inspect(error)
    }
}

impl CliError {
    fn as_inspect_error(&self) -> InspectError {
        match self {
            Self::Usage(message) => {
                InspectError::input_validation("INPUT.CLI_USAGE", message.trim_end().to_string())
            }
            Self::Inspect(error) => error.clone(),
            Self::Internal(error) => InspectError::io_system("IO.CLI", format!("{error:#}")),
        }
    }
}
