//! CSV serialization of batch results and the human-readable progress lines.

use crate::batch::{BatchPlan, BatchReport, ItemOutcome};
use crate::domain::{InspectError, InspectResult, SpectralLine, format_number};
use std::io::Write;

pub const RESULT_COLUMNS: [&str; 14] = [
    "mode",
    "element",
    "wi",
    "wavelength_A",
    "Teff",
    "logg",
    "FeH",
    "vt",
    "input_value",
    "EW_mA",
    "A_LTE",
    "A_NLTE",
    "Delta",
    "XFe_NLTE",
];

pub const ERROR_COLUMN: &str = "error";

/// Longest error message kept in the CSV `error` column, in characters.
pub const MAX_ERROR_CHARS: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CsvOptions {
    /// Keep failed items as rows with an `error` column.
    pub include_errors: bool,
}

/// Writes the report as CSV and returns the number of data rows.
pub fn write_csv<W: Write>(report: &BatchReport, options: CsvOptions, writer: W) -> InspectResult<usize> {
    let mut csv_writer = csv::WriterBuilder::new().has_headers(false).from_writer(writer);

    let mut header: Vec<&str> = RESULT_COLUMNS.to_vec();
    if options.include_errors {
        header.push(ERROR_COLUMN);
    }
    csv_writer.write_record(&header).map_err(csv_error)?;

    let mut rows = 0;
    for outcome in &report.outcomes {
        let mut fields = match &outcome.result {
            Ok(record) => {
                let query = &record.query;
                let result = &record.result;
                vec![
                    query.mode.as_str().to_string(),
                    query.element.clone(),
                    query.line.index.to_string(),
                    optional(query.line.wavelength),
                    format_number(query.parameters.teff),
                    format_number(query.parameters.logg),
                    format_number(query.parameters.feh),
                    format_number(query.parameters.vt),
                    format_number(query.value),
                    optional(result.ew_ma),
                    optional(result.a_lte),
                    optional(result.a_nlte),
                    optional(result.delta),
                    optional(result.x_fe_nlte),
                ]
            }
            Err(_) if !options.include_errors => continue,
            Err(_) => failed_row(&report.plan, outcome),
        };

        if options.include_errors {
            let message = outcome.error().map(truncated_message).unwrap_or_default();
            fields.push(message);
        }
        csv_writer.write_record(&fields).map_err(csv_error)?;
        rows += 1;
    }

    csv_writer.flush().map_err(|error| {
        InspectError::io_system("IO.CSV_WRITE", format!("failed to flush CSV output: {error}"))
    })?;
    Ok(rows)
}

/// Writes a line catalog as `wi,wavelength_A,label` CSV.
pub fn write_line_catalog<W: Write>(lines: &[SpectralLine], writer: W) -> InspectResult<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for line in lines {
        csv_writer.serialize(line).map_err(csv_error)?;
    }
    csv_writer.flush().map_err(|error| {
        InspectError::io_system("IO.CSV_WRITE", format!("failed to flush CSV output: {error}"))
    })
}

fn failed_row(plan: &BatchPlan, outcome: &ItemOutcome) -> Vec<String> {
    let mut fields = vec![
        plan.mode.as_str().to_string(),
        plan.element.clone(),
        plan.line.index.to_string(),
        optional(plan.line.wavelength),
        format_number(plan.parameters.teff),
        format_number(plan.parameters.logg),
        format_number(plan.parameters.feh),
        format_number(plan.parameters.vt),
        format_number(outcome.value),
    ];
    fields.resize(RESULT_COLUMNS.len(), String::new());
    fields
}

fn optional(value: Option<f64>) -> String {
    value.map(format_number).unwrap_or_default()
}

fn truncated_message(error: &InspectError) -> String {
    error.message().chars().take(MAX_ERROR_CHARS).collect()
}

fn csv_error(error: csv::Error) -> InspectError {
    InspectError::io_system("IO.CSV_WRITE", format!("failed to write CSV: {error}"))
}

/// Run header shown before the first query.
pub fn plan_summary(plan: &BatchPlan) -> String {
    let wavelength = plan
        .line
        .wavelength
        .map_or_else(|| "?".to_string(), format_number);
    format!(
        "Element={}  mode={}  wi={}  λ≈{} Å\n{}\nTotal inputs: {}",
        plan.element, plan.mode, plan.line.index, wavelength, plan.parameters, plan.total
    )
}

/// One progress line, e.g.
/// `[1/3] mode=ew val=65 A_LTE=8.778 A_NLTE=8.582 Δ=-0.196 [O/Fe]_NLTE=-0.118 ... DONE`.
pub fn progress_line(outcome: &ItemOutcome, total: usize) -> String {
    let prefix = format!("[{}/{}]", outcome.position, total);
    let record = match &outcome.result {
        Ok(record) => record,
        Err(error) => {
            return format!(
                "{prefix} val={} ... ERROR: {}",
                format_number(outcome.value),
                error.message()
            );
        }
    };

    let result = &record.result;
    let mut bits = vec![
        prefix,
        format!("mode={}", record.query.mode),
        format!("val={}", format_number(record.query.value)),
    ];
    if let Some(a_lte) = result.a_lte {
        bits.push(format!("A_LTE={a_lte:.3}"));
    }
    if let Some(a_nlte) = result.a_nlte {
        bits.push(format!("A_NLTE={a_nlte:.3}"));
    }
    if let Some(delta) = result.delta {
        bits.push(format!("Δ={delta:+.3}"));
    }
    if let Some(x_fe) = result.x_fe_nlte {
        bits.push(format!("[{}/Fe]_NLTE={x_fe:+.3}", record.query.element));
    }
    bits.push("... DONE".to_string());
    bits.join(" ")
}
