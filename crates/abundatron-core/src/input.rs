use crate::domain::{InspectError, InspectResult};
use crate::parser::first_number;

/// Raw text gathered from every input source, in precedence order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueSources {
    pub list: Option<String>,
    pub file_text: Option<String>,
    pub stdin_text: Option<String>,
}

/// Parses a comma-separated list; every non-blank entry must be a number.
pub fn parse_value_list(list: &str) -> InspectResult<Vec<f64>> {
    list.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry.parse::<f64>().map_err(|_| {
                InspectError::input_validation(
                    "INPUT.VALUE",
                    format!("'{entry}' in --values is not a number"),
                )
            })
        })
        .collect()
}

/// Takes the first numeric token of each line, so CSV files with a numeric
/// first column work as-is. Lines without a number are skipped.
pub fn parse_value_lines(text: &str) -> Vec<f64> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(first_number)
        .collect()
}

pub fn collect_values(sources: &ValueSources) -> InspectResult<Vec<f64>> {
    let mut values = Vec::new();
    if let Some(list) = &sources.list {
        values.extend(parse_value_list(list)?);
    }
    if let Some(text) = &sources.file_text {
        values.extend(parse_value_lines(text));
    }
    if let Some(text) = &sources.stdin_text {
        values.extend(parse_value_lines(text));
    }

    if values.is_empty() {
        return Err(InspectError::input_validation(
            "INPUT.NO_VALUES",
            "no input values found; use --values, --values-file, or pipe values via stdin",
        ));
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::{ValueSources, collect_values, parse_value_lines, parse_value_list};

    #[test]
    fn comma_list_ignores_blank_entries() {
        assert_eq!(
            parse_value_list(" 65, 80 ,,100,").expect("valid list"),
            vec![65.0, 80.0, 100.0]
        );
    }

    #[test]
    fn comma_list_rejects_non_numbers() {
        let error = parse_value_list("65,abc").expect_err("abc is not a number");
        assert_eq!(error.code(), "INPUT.VALUE");
        assert!(error.message().contains("'abc'"));
    }

    #[test]
    fn lines_take_first_numeric_token() {
        let text = "ew,comment\n65,first\n\n  80.5  \nno number here\n-1.2e1;x\n";
        assert_eq!(parse_value_lines(text), vec![65.0, 80.5, -12.0]);
    }

    #[test]
    fn sources_are_concatenated_in_order() {
        let sources = ValueSources {
            list: Some("1,2".to_string()),
            file_text: Some("3\n4\n".to_string()),
            stdin_text: Some("5\n".to_string()),
        };
        assert_eq!(
            collect_values(&sources).expect("values present"),
            vec![1.0, 2.0, 3.0, 4.0, 5.0]
        );
    }

    #[test]
    fn empty_sources_are_rejected() {
        let error = collect_values(&ValueSources {
            stdin_text: Some("\n\n".to_string()),
            ..ValueSources::default()
        })
        .expect_err("nothing to query");
        assert_eq!(error.code(), "INPUT.NO_VALUES");
        assert_eq!(error.exit_code(), 2);
    }
}
