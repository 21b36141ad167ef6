use super::CliError;
use abundatron_core::batch::{BatchObserver, BatchPlan, BatchReport, ItemOutcome};
use abundatron_core::domain::{InspectError, InspectResult};
use abundatron_core::input::ValueSources;
use abundatron_core::report::{plan_summary, progress_line};
use anyhow::Context;
use std::fs::File;
use std::io::{self, BufWriter, IsTerminal, Read, Write};
use std::path::Path;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

impl Verbosity {
    fn default_filter(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "warn",
            Self::Verbose => "abundatron=debug,abundatron_core=debug",
        }
    }
}

/// Installs the stderr subscriber; `RUST_LOG` overrides the verbosity flags.
pub(super) fn init_logging(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.default_filter()));

    // A second initialisation (in-process tests) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(io::stderr().is_terminal())
                .with_writer(io::stderr),
        )
        .try_init();
}

pub(super) fn read_value_sources(
    values: Option<&str>,
    values_file: Option<&Path>,
) -> Result<ValueSources, CliError> {
    let file_text = values_file
        .map(|path| {
            std::fs::read_to_string(path).map_err(|source| {
                InspectError::io_system(
                    "IO.VALUES_FILE",
                    format!("failed to read values file '{}': {}", path.display(), source),
                )
            })
        })
        .transpose()?;

    let stdin_text = if values.is_none() && values_file.is_none() && !io::stdin().is_terminal() {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("failed to read values from stdin")?;
        Some(text)
    } else {
        None
    };

    Ok(ValueSources {
        list: values.map(str::to_string),
        file_text,
        stdin_text,
    })
}

/// Runs `write` against `out`, or stdout when no path is given.
pub(super) fn with_output<T, F>(out: Option<&Path>, write: F) -> Result<T, CliError>
where
    F: FnOnce(&mut dyn Write) -> InspectResult<T>,
{
    match out {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create output file '{}'", path.display()))?;
            let mut writer = BufWriter::new(file);
            let value = write(&mut writer)?;
            writer
                .flush()
                .with_context(|| format!("failed to flush '{}'", path.display()))?;
            Ok(value)
        }
        None => {
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            Ok(write(&mut lock)?)
        }
    }
}

/// Prints the run header and one line per item to stderr.
pub(super) struct ProgressPrinter {
    quiet: bool,
}

impl ProgressPrinter {
    pub(super) fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

impl BatchObserver for ProgressPrinter {
    fn on_plan(&mut self, plan: &BatchPlan) {
        if !self.quiet {
            eprintln!("{}", plan_summary(plan));
        }
    }

    fn on_item(&mut self, outcome: &ItemOutcome, total: usize) {
        if !self.quiet {
            eprintln!("{}", progress_line(outcome, total));
        }
    }
}

pub(super) fn completion_summary(report: &BatchReport) -> String {
    let mut summary = format!(
        "Completed: {} succeeded, {} failed",
        report.succeeded(),
        report.failed()
    );
    if report.not_attempted > 0 {
        summary.push_str(&format!(", {} not attempted", report.not_attempted));
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::{Verbosity, completion_summary, read_value_sources, with_output};
    use crate::cli::CliError;
    use abundatron_core::batch::{BatchPlan, BatchReport, ItemOutcome};
    use abundatron_core::domain::{
        CalculationMode, InspectError, SpectralLine, StellarParameters,
    };
    use std::io::Write;

    fn report(failed: usize, not_attempted: usize) -> BatchReport {
        let outcomes = (1..=failed)
            .map(|position| ItemOutcome {
                position,
                value: 65.0,
                adjustments: Vec::new(),
                result: Err(InspectError::parse("PARSE.RESULT_BLOCK", "missing")),
            })
            .collect();
        BatchReport {
            plan: BatchPlan {
                element: "O".to_string(),
                mode: CalculationMode::Ew,
                parameters: StellarParameters::new(5777.0, 4.44, 0.0, 1.0),
                line: SpectralLine::new(3, Some(7771.957), "7771.957"),
                line_adjustment: None,
                total: failed + not_attempted,
            },
            outcomes,
            not_attempted,
        }
    }

    #[test]
    fn summary_mentions_skipped_items_only_when_present() {
        assert_eq!(
            completion_summary(&report(1, 0)),
            "Completed: 0 succeeded, 1 failed"
        );
        assert_eq!(
            completion_summary(&report(1, 2)),
            "Completed: 0 succeeded, 1 failed, 2 not attempted"
        );
    }

    #[test]
    fn verbose_filter_enables_both_crates() {
        assert_eq!(Verbosity::Quiet.default_filter(), "error");
        assert!(Verbosity::Verbose.default_filter().contains("abundatron_core=debug"));
    }

    #[test]
    fn values_file_is_read_without_touching_stdin() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "ew\n65\n80").expect("write values");

        let sources = read_value_sources(None, Some(file.path())).expect("file is readable");
        assert_eq!(sources.file_text.as_deref(), Some("ew\n65\n80\n"));
        assert_eq!(sources.stdin_text, None);
    }

    #[test]
    fn missing_values_file_is_io_error() {
        let error = read_value_sources(Some("65"), Some(std::path::Path::new("/no/such/values.txt")))
            .expect_err("file does not exist");
        match error {
            CliError::Inspect(error) => {
                assert_eq!(error.code(), "IO.VALUES_FILE");
                assert_eq!(error.exit_code(), 6);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn output_file_receives_written_bytes() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("out.csv");
        let written = with_output(Some(&path), |writer| {
            writer.write_all(b"a,b\n").expect("write");
            Ok(1usize)
        })
        .expect("output file");

        assert_eq!(written, 1);
        assert_eq!(std::fs::read_to_string(path).unwrap(), "a,b\n");
    }
}
