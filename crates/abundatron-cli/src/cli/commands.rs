use super::CliError;
use super::helpers::*;
use abundatron_core::AbundanceService;
use abundatron_core::batch::{BatchConfig, BatchRequest, BatchRunner, FailurePolicy};
use abundatron_core::client::{ClientConfig, DEFAULT_BASE_URL, HttpMethod, InspectClient, RetryPolicy};
use abundatron_core::domain::{CalculationMode, LineSelector, StellarParameters};
use abundatron_core::input::collect_values;
use abundatron_core::report::{CsvOptions, write_csv, write_line_catalog};
use std::path::PathBuf;
use std::time::Duration;

#[derive(clap::Parser)]
#[command(
    name = "abundatron",
    version,
    about = "Batch queries against the INSPECT NLTE abundance calculators"
)]
#[command(group(clap::ArgGroup::new("line").args(["wavelength", "wi"]).multiple(false)))]
pub(super) struct BatchArgs {
    /// Element symbol as used by INSPECT (e.g. O, Li, Na)
    #[arg(long, short = 'e')]
    element: String,

    /// Calculation mode: EW to abundance, or LTE to NLTE abundance
    #[arg(long, value_enum, required_unless_present = "list_lines")]
    mode: Option<ModeArg>,

    /// Effective temperature [K]
    #[arg(long, required_unless_present = "list_lines")]
    teff: Option<f64>,

    /// Surface gravity log g [cgs]
    #[arg(long, allow_negative_numbers = true, required_unless_present = "list_lines")]
    logg: Option<f64>,

    /// Metallicity [Fe/H]
    #[arg(long, allow_negative_numbers = true, required_unless_present = "list_lines")]
    feh: Option<f64>,

    /// Microturbulence [km/s]
    #[arg(long, required_unless_present = "list_lines")]
    vt: Option<f64>,

    /// Line wavelength [Å]; exact match preferred, else nearest
    #[arg(long)]
    wavelength: Option<f64>,

    /// INSPECT line index (alternative to --wavelength)
    #[arg(long)]
    wi: Option<u32>,

    /// Comma-separated values: EW in mÅ for 'ew', A(LTE) for 'lte'
    #[arg(long, allow_hyphen_values = true)]
    values: Option<String>,

    /// Text/CSV file; the first numeric token on each line is used
    #[arg(long)]
    values_file: Option<PathBuf>,

    /// Output CSV path (default: stdout)
    #[arg(long)]
    out: Option<PathBuf>,

    /// Seconds to pause between requests
    #[arg(long, default_value_t = 0.2)]
    sleep: f64,

    /// Suppress the header and per-item progress lines
    #[arg(long)]
    quiet: bool,

    /// Clip out-of-range parameters to the allowed ranges
    #[arg(long)]
    clip: bool,

    /// Stop the batch at the first failed item
    #[arg(long)]
    fail_fast: bool,

    /// Keep failed items in the CSV with an 'error' column
    #[arg(long)]
    include_errors: bool,

    /// Maximum retries per request on transient failures
    #[arg(long, default_value_t = 5)]
    retries: u32,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30.0)]
    timeout: f64,

    /// Form submission method
    #[arg(long, value_enum, default_value_t = MethodArg::Get)]
    method: MethodArg,

    /// Calculator base URL
    #[arg(long, env = "ABUNDATRON_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Print the element's line catalog as CSV and exit
    #[arg(long)]
    pub(super) list_lines: bool,

    /// Enable debug logging
    #[arg(long, short = 'v')]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum ModeArg {
    /// EW (mÅ) to abundance
    Ew,
    /// LTE abundance to NLTE
    Lte,
}

impl From<ModeArg> for CalculationMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Ew => Self::Ew,
            ModeArg::Lte => Self::Lte,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum MethodArg {
    Get,
    Post,
}

impl From<MethodArg> for HttpMethod {
    fn from(method: MethodArg) -> Self {
        match method {
            MethodArg::Get => Self::Get,
            MethodArg::Post => Self::Post,
        }
    }
}

impl BatchArgs {
    pub(super) fn verbosity(&self) -> Verbosity {
        if self.verbose {
            Verbosity::Verbose
        } else if self.quiet {
            Verbosity::Quiet
        } else {
            Verbosity::Normal
        }
    }

    fn client_config(&self) -> Result<ClientConfig, CliError> {
        Ok(ClientConfig {
            base_url: self.base_url.clone(),
            timeout: seconds("--timeout", self.timeout)?,
            method: self.method.into(),
            retry: RetryPolicy {
                max_retries: self.retries,
                ..RetryPolicy::default()
            },
        })
    }

    fn batch_config(&self) -> Result<BatchConfig, CliError> {
        Ok(BatchConfig {
            sleep: seconds("--sleep", self.sleep)?,
            clip: self.clip,
            failure_policy: if self.fail_fast {
                FailurePolicy::Abort
            } else {
                FailurePolicy::Continue
            },
        })
    }

    fn line_selector(&self) -> Result<LineSelector, CliError> {
        match (self.wavelength, self.wi) {
            (Some(wavelength), None) => Ok(LineSelector::Wavelength(wavelength)),
            (None, Some(index)) => Ok(LineSelector::Index(index)),
            _ => Err(CliError::Usage(
                "choose exactly one of --wavelength or --wi".to_string(),
            )),
        }
    }

    fn batch_request(&self, line: LineSelector, values: Vec<f64>) -> Result<BatchRequest, CliError> {
        let (Some(mode), Some(teff), Some(logg), Some(feh), Some(vt)) =
            (self.mode, self.teff, self.logg, self.feh, self.vt)
        else {
            return Err(CliError::Usage(
                "--mode, --teff, --logg, --feh and --vt are required".to_string(),
            ));
        };

        Ok(BatchRequest {
            element: self.element.trim().to_string(),
            mode: mode.into(),
            parameters: StellarParameters::new(teff, logg, feh, vt),
            line,
            values,
        })
    }
}

fn seconds(flag: &str, value: f64) -> Result<Duration, CliError> {
    Duration::try_from_secs_f64(value).map_err(|_| {
        CliError::Usage(format!(
            "invalid value '{value}' for '{flag}': expected a non-negative number of seconds"
        ))
    })
}

pub(super) fn run_batch_command(args: BatchArgs) -> Result<i32, CliError> {
    let line = args.line_selector()?;
    let client_config = args.client_config()?;
    let batch_config = args.batch_config()?;

    let sources = read_value_sources(args.values.as_deref(), args.values_file.as_deref())?;
    let values = collect_values(&sources)?;
    let request = args.batch_request(line, values)?;

    let client = InspectClient::new(client_config)?;
    let runner = BatchRunner::new(client, batch_config);
    let mut observer = ProgressPrinter::new(args.quiet);
    let report = runner.run(&request, &mut observer)?;

    let options = CsvOptions {
        include_errors: args.include_errors,
    };
    let rows = with_output(args.out.as_deref(), |writer| {
        write_csv(&report, options, writer)
    })?;

    if !args.quiet {
        if let Some(path) = &args.out {
            eprintln!("Wrote {} rows to {}", rows, path.display());
        }
        eprintln!("{}", completion_summary(&report));
    }

    Ok(report.exit_code())
}

pub(super) fn run_list_lines_command(args: BatchArgs) -> Result<i32, CliError> {
    let client = InspectClient::new(args.client_config()?)?;
    let element = args.element.trim();
    let lines = client.line_catalog(element)?;
    with_output(args.out.as_deref(), |writer| {
        write_line_catalog(&lines, writer)
    })?;
    if !args.quiet {
        eprintln!("{} lines offered for {}", lines.len(), element);
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::{BatchArgs, seconds};
    use crate::cli::CliError;
    use abundatron_core::batch::FailurePolicy;
    use abundatron_core::client::HttpMethod;
    use abundatron_core::domain::{CalculationMode, LineSelector};
    use clap::Parser;
    use std::time::Duration;

    fn parse(extra: &[&str]) -> BatchArgs {
        let mut args = vec![
            "abundatron", "-e", "O", "--mode", "ew", "--teff", "5777", "--logg", "4.44",
            "--feh", "-0.5", "--vt", "1.0",
        ];
        args.extend_from_slice(extra);
        BatchArgs::try_parse_from(args).expect("arguments should parse")
    }

    #[test]
    fn defaults_match_polite_batch_settings() {
        let args = parse(&["--wavelength", "7771.957"]);
        let batch = args.batch_config().expect("valid batch config");
        assert_eq!(batch.sleep, Duration::from_millis(200));
        assert!(!batch.clip);
        assert_eq!(batch.failure_policy, FailurePolicy::Continue);

        let client = args.client_config().expect("valid client config");
        assert_eq!(client.retry.max_retries, 5);
        assert_eq!(client.timeout, Duration::from_secs(30));
        assert_eq!(client.method, HttpMethod::Get);
    }

    #[test]
    fn request_carries_negative_metallicity_and_mode() {
        let args = parse(&["--wi", "3", "--fail-fast", "--clip", "--method", "post"]);
        let line = args.line_selector().expect("wi was given");
        let request = args.batch_request(line, vec![65.0]).expect("complete request");
        assert_eq!(request.mode, CalculationMode::Ew);
        assert_eq!(request.parameters.feh, -0.5);
        assert_eq!(request.line, LineSelector::Index(3));
        assert_eq!(
            args.batch_config().unwrap().failure_policy,
            FailurePolicy::Abort
        );
        assert_eq!(args.client_config().unwrap().method, HttpMethod::Post);
    }

    #[test]
    fn line_selection_is_required_and_exclusive() {
        let missing = parse(&[]);
        assert!(matches!(missing.line_selector(), Err(CliError::Usage(_))));

        let both = BatchArgs::try_parse_from([
            "abundatron", "-e", "O", "--mode", "ew", "--teff", "5777", "--logg", "4.44",
            "--feh", "0", "--vt", "1", "--wavelength", "7771.957", "--wi", "3",
        ]);
        assert!(both.is_err());
    }

    #[test]
    fn list_lines_needs_only_the_element() {
        let args = BatchArgs::try_parse_from(["abundatron", "-e", "Na", "--list-lines"])
            .expect("catalog listing needs no stellar parameters");
        assert!(args.list_lines);
        assert!(matches!(
            args.batch_request(LineSelector::Index(1), vec![1.0]),
            Err(CliError::Usage(_))
        ));
    }

    #[test]
    fn negative_durations_are_rejected() {
        assert!(seconds("--sleep", 0.0).is_ok());
        assert!(matches!(seconds("--sleep", -1.0), Err(CliError::Usage(_))));
        assert!(matches!(seconds("--timeout", f64::NAN), Err(CliError::Usage(_))));
    }
}
