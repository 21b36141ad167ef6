//! Scrapers for the two HTML shapes the calculator returns: the results page
//! with its `<pre>` block and the form page with the `wi` line dropdown.

use crate::domain::{AbundanceResult, InspectError, InspectResult, SpectralLine};
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use std::sync::LazyLock;

static NUMBER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[-+]?\d+(?:\.\d+)?(?:[eE][-+]?\d+)?").expect("number pattern should compile")
});

/// Numbers found in `text`, left to right.
pub fn extract_numbers(text: &str) -> Vec<f64> {
    NUMBER_PATTERN
        .find_iter(text)
        .filter_map(|found| found.as_str().parse::<f64>().ok())
        .collect()
}

/// First number found in `text`, if any.
pub fn first_number(text: &str) -> Option<f64> {
    NUMBER_PATTERN
        .find(text)
        .and_then(|found| found.as_str().parse::<f64>().ok())
}

/// Parses the results `<pre>` block of either calculator.
///
/// The block holds a header and a value row, e.g.
///
/// ```text
/// EW  A(O) LTE  A(O) NLTE  Delta  [O/Fe] NLTE
/// 65  8.778     8.582      -0.196 -0.118
/// ```
///
/// The LTE calculator omits the EW column.
pub fn parse_result_block(html: &str) -> InspectResult<AbundanceResult> {
    let document = Html::parse_document(html);
    let pre_selector = selector("pre")?;
    let Some(pre) = document.select(&pre_selector).next() else {
        return Err(InspectError::parse(
            "PARSE.RESULT_BLOCK",
            "no results block (<pre>) found; the inputs are most likely outside INSPECT's \
             parameter space (Teff, logg, [Fe/H], vt or the primary value)",
        ));
    };

    let text = block_text(pre);
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    if lines.is_empty() {
        return Err(InspectError::parse(
            "PARSE.EMPTY_BLOCK",
            "results block is empty",
        ));
    }

    let Some(value_line) = lines
        .iter()
        .rev()
        .find(|line| NUMBER_PATTERN.is_match(line))
    else {
        return Err(InspectError::parse(
            "PARSE.NO_VALUES",
            "could not locate a numeric result line",
        ));
    };

    let numbers = extract_numbers(value_line);
    let header = lines
        .iter()
        .take(2)
        .copied()
        .collect::<Vec<_>>()
        .join("\n")
        .to_lowercase();

    let result = match numbers.as_slice() {
        [ew, a_lte, a_nlte, delta, x_fe, ..] if header.contains("ew") || numbers.len() == 5 => {
            AbundanceResult {
                ew_ma: Some(*ew),
                a_lte: Some(*a_lte),
                a_nlte: Some(*a_nlte),
                delta: Some(*delta),
                x_fe_nlte: Some(*x_fe),
            }
        }
        [a_lte, a_nlte, delta, x_fe] => AbundanceResult {
            a_lte: Some(*a_lte),
            a_nlte: Some(*a_nlte),
            delta: Some(*delta),
            x_fe_nlte: Some(*x_fe),
            ..AbundanceResult::default()
        },
        [a_lte, a_nlte, delta] => AbundanceResult {
            a_lte: Some(*a_lte),
            a_nlte: Some(*a_nlte),
            delta: Some(*delta),
            ..AbundanceResult::default()
        },
        _ => {
            return Err(InspectError::parse(
                "PARSE.FORMAT",
                format!("unrecognized numeric format in result line: {value_line}"),
            ));
        }
    };

    Ok(result)
}

/// Parses the `<select name="wi">` options of a calculator form page.
pub fn parse_line_catalog(html: &str, element: &str) -> InspectResult<Vec<SpectralLine>> {
    let document = Html::parse_document(html);
    let select_selector = selector(r#"select[name="wi"]"#)?;
    let option_selector = selector("option")?;

    let Some(select) = document.select(&select_selector).next() else {
        return Err(InspectError::parse(
            "PARSE.LINE_SELECT",
            format!("could not find wavelength selector for element {element}"),
        ));
    };

    let lines: Vec<SpectralLine> = select
        .select(&option_selector)
        .filter_map(|option| {
            let index = option.value().attr("value")?.trim().parse::<u32>().ok()?;
            let label = element_text(option).trim().to_string();
            let wavelength = first_number(&label);
            Some(SpectralLine::new(index, wavelength, label))
        })
        .collect();

    if lines.is_empty() {
        return Err(InspectError::parse(
            "PARSE.LINE_OPTIONS",
            format!("no lines found for element {element}"),
        ));
    }
    Ok(lines)
}

fn selector(css: &str) -> InspectResult<Selector> {
    Selector::parse(css).map_err(|error| {
        InspectError::internal(
            "INTERNAL.SELECTOR",
            format!("invalid selector '{css}': {error}"),
        )
    })
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect()
}

/// Tags that start a new line inside a results block.
const LINE_BREAK_TAGS: [&str; 6] = ["br", "p", "div", "tr", "li", "hr"];

/// Text of `element` with line structure kept: `<br>` and block tags start a
/// new line, inline tags join their text into the surrounding line.
fn block_text(element: ElementRef<'_>) -> String {
    let mut text = String::new();
    for node in element.descendants() {
        match node.value() {
            Node::Text(chunk) => text.push_str(chunk),
            Node::Element(tag) if LINE_BREAK_TAGS.contains(&tag.name()) => text.push('\n'),
            _ => {}
        }
    }
    text
}
