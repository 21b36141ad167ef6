//! Known INSPECT parameter grids and the validator that enforces them.
//!
//! Bounds follow the model-atmosphere grids the calculator interpolates in.
//! Each element carries a default range and optional per-line overrides; a
//! non-empty line table also defines which wavelengths the element accepts.

use crate::domain::{CalculationMode, InspectError, InspectResult, LineSelector, Query};
use std::fmt::{Display, Formatter};
use tracing::warn;

/// Maximum distance between a requested and a tabulated wavelength.
pub const WAVELENGTH_TOLERANCE_A: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

impl Display for Bounds {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterRange {
    pub teff: Bounds,
    pub logg: Bounds,
    pub feh: Bounds,
    pub vt: Bounds,
    pub ew_ma: Bounds,
    pub a_lte: Bounds,
}

impl ParameterRange {
    pub const fn value_bounds(&self, mode: CalculationMode) -> Bounds {
        match mode {
            CalculationMode::Ew => self.ew_ma,
            CalculationMode::Lte => self.a_lte,
        }
    }

    const fn with_ew(self, ew_ma: Bounds) -> Self {
        Self { ew_ma, ..self }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineRange {
    pub wavelength: f64,
    pub range: ParameterRange,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementRanges {
    pub symbol: &'static str,
    pub species: &'static str,
    pub default: ParameterRange,
    pub lines: &'static [LineRange],
}

impl ElementRanges {
    pub fn line_for_wavelength(&self, wavelength: f64) -> Option<&LineRange> {
        self.nearest_line(wavelength)
            .filter(|line| (line.wavelength - wavelength).abs() <= WAVELENGTH_TOLERANCE_A)
    }

    pub fn nearest_line(&self, wavelength: f64) -> Option<&LineRange> {
        self.lines.iter().min_by(|left, right| {
            let left_distance = (left.wavelength - wavelength).abs();
            let right_distance = (right.wavelength - wavelength).abs();
            left_distance.total_cmp(&right_distance)
        })
    }

    pub fn range_for_wavelength(&self, wavelength: Option<f64>) -> &ParameterRange {
        wavelength
            .and_then(|wavelength| self.line_for_wavelength(wavelength))
            .map_or(&self.default, |line| &line.range)
    }
}

const OXYGEN: ParameterRange = ParameterRange {
    teff: Bounds::new(5000.0, 6500.0),
    logg: Bounds::new(3.0, 5.0),
    feh: Bounds::new(-3.0, 0.5),
    vt: Bounds::new(1.0, 2.0),
    ew_ma: Bounds::new(1.0, 250.0),
    a_lte: Bounds::new(6.0, 9.5),
};

const LITHIUM: ParameterRange = ParameterRange {
    teff: Bounds::new(4000.0, 8000.0),
    logg: Bounds::new(1.0, 5.0),
    feh: Bounds::new(-5.0, 0.0),
    vt: Bounds::new(1.0, 5.0),
    ew_ma: Bounds::new(0.1, 300.0),
    a_lte: Bounds::new(-0.5, 4.0),
};

const SODIUM: ParameterRange = ParameterRange {
    teff: Bounds::new(4000.0, 8000.0),
    logg: Bounds::new(1.0, 5.0),
    feh: Bounds::new(-5.0, 0.5),
    vt: Bounds::new(1.0, 5.0),
    ew_ma: Bounds::new(0.1, 400.0),
    a_lte: Bounds::new(2.0, 7.5),
};

const MAGNESIUM: ParameterRange = ParameterRange {
    teff: Bounds::new(4000.0, 6500.0),
    logg: Bounds::new(1.0, 5.0),
    feh: Bounds::new(-4.0, 0.5),
    vt: Bounds::new(1.0, 2.0),
    ew_ma: Bounds::new(0.1, 400.0),
    a_lte: Bounds::new(3.0, 8.5),
};

const IRON: ParameterRange = ParameterRange {
    teff: Bounds::new(4000.0, 7000.0),
    logg: Bounds::new(1.0, 5.0),
    feh: Bounds::new(-5.0, 0.5),
    vt: Bounds::new(1.0, 5.0),
    ew_ma: Bounds::new(0.1, 200.0),
    a_lte: Bounds::new(2.0, 8.5),
};

const OXYGEN_LINES: [LineRange; 3] = [
    LineRange {
        wavelength: 7771.957,
        range: OXYGEN,
    },
    LineRange {
        wavelength: 7774.156,
        range: OXYGEN.with_ew(Bounds::new(1.0, 225.0)),
    },
    LineRange {
        wavelength: 7775.388,
        range: OXYGEN.with_ew(Bounds::new(1.0, 200.0)),
    },
];

const LITHIUM_LINES: [LineRange; 2] = [
    LineRange {
        wavelength: 6707.8,
        range: LITHIUM,
    },
    LineRange {
        wavelength: 6103.6,
        range: LITHIUM.with_ew(Bounds::new(0.1, 100.0)),
    },
];

const SODIUM_LINES: [LineRange; 8] = [
    LineRange {
        wavelength: 5682.6,
        range: SODIUM.with_ew(Bounds::new(0.1, 250.0)),
    },
    LineRange {
        wavelength: 5688.2,
        range: SODIUM.with_ew(Bounds::new(0.1, 250.0)),
    },
    LineRange {
        wavelength: 5889.95,
        range: SODIUM.with_ew(Bounds::new(1.0, 1000.0)),
    },
    LineRange {
        wavelength: 5895.92,
        range: SODIUM.with_ew(Bounds::new(1.0, 1000.0)),
    },
    LineRange {
        wavelength: 6154.2,
        range: SODIUM.with_ew(Bounds::new(0.1, 150.0)),
    },
    LineRange {
        wavelength: 6160.7,
        range: SODIUM.with_ew(Bounds::new(0.1, 150.0)),
    },
    LineRange {
        wavelength: 8183.3,
        range: SODIUM,
    },
    LineRange {
        wavelength: 8194.8,
        range: SODIUM,
    },
];

const MAGNESIUM_LINES: [LineRange; 5] = [
    LineRange {
        wavelength: 4571.1,
        range: MAGNESIUM,
    },
    LineRange {
        wavelength: 4703.0,
        range: MAGNESIUM,
    },
    LineRange {
        wavelength: 5528.4,
        range: MAGNESIUM,
    },
    LineRange {
        wavelength: 5711.1,
        range: MAGNESIUM.with_ew(Bounds::new(0.1, 200.0)),
    },
    LineRange {
        wavelength: 8806.8,
        range: MAGNESIUM,
    },
];

/// Iron has too many lines to tabulate; any wavelength is accepted.
pub static ELEMENT_RANGES: [ElementRanges; 5] = [
    ElementRanges {
        symbol: "O",
        species: "O I",
        default: OXYGEN,
        lines: &OXYGEN_LINES,
    },
    ElementRanges {
        symbol: "Li",
        species: "Li I",
        default: LITHIUM,
        lines: &LITHIUM_LINES,
    },
    ElementRanges {
        symbol: "Na",
        species: "Na I",
        default: SODIUM,
        lines: &SODIUM_LINES,
    },
    ElementRanges {
        symbol: "Mg",
        species: "Mg I",
        default: MAGNESIUM,
        lines: &MAGNESIUM_LINES,
    },
    ElementRanges {
        symbol: "Fe",
        species: "Fe",
        default: IRON,
        lines: &[],
    },
];

pub fn ranges_for_element(symbol: &str) -> Option<&'static ElementRanges> {
    let normalized = symbol.trim();
    ELEMENT_RANGES
        .iter()
        .find(|ranges| ranges.symbol.eq_ignore_ascii_case(normalized))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parameter {
    Teff,
    Logg,
    FeH,
    Vt,
    InputValue(CalculationMode),
    Wavelength,
}

impl Parameter {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Teff => "Teff",
            Self::Logg => "logg",
            Self::FeH => "[Fe/H]",
            Self::Vt => "vt",
            Self::InputValue(mode) => mode.value_label(),
            Self::Wavelength => "wavelength",
        }
    }

    const fn code(self) -> &'static str {
        match self {
            Self::Teff => "RANGE.TEFF",
            Self::Logg => "RANGE.LOGG",
            Self::FeH => "RANGE.FEH",
            Self::Vt => "RANGE.VT",
            Self::InputValue(CalculationMode::Ew) => "RANGE.EW",
            Self::InputValue(CalculationMode::Lte) => "RANGE.A_LTE",
            Self::Wavelength => "RANGE.WAVELENGTH",
        }
    }
}

/// A parameter that was moved onto the nearest allowed value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Adjustment {
    pub parameter: Parameter,
    pub original: f64,
    pub clipped: f64,
}

impl Display for Adjustment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} clipped from {} to {}",
            self.parameter.label(),
            self.original,
            self.clipped
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedLine {
    pub selector: LineSelector,
    pub adjustment: Option<Adjustment>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedQuery {
    pub query: Query,
    pub adjustments: Vec<Adjustment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParameterValidator {
    clip: bool,
}

impl ParameterValidator {
    pub const fn new(clip: bool) -> Self {
        Self { clip }
    }

    /// Checks the requested line against the element's tabulated lines.
    ///
    /// Elements without a local table pass unchecked and are left to the
    /// remote calculator.
    pub fn validate_line(
        &self,
        element: &str,
        selector: LineSelector,
    ) -> InspectResult<ValidatedLine> {
        if let LineSelector::Wavelength(wavelength) = selector {
            if !wavelength.is_finite() {
                return Err(non_finite_error(Parameter::Wavelength, wavelength));
            }
        }

        let Some(ranges) = ranges_for_element(element) else {
            warn!(
                element,
                "no local parameter ranges; values are checked only by the remote calculator"
            );
            return Ok(ValidatedLine {
                selector,
                adjustment: None,
            });
        };

        let LineSelector::Wavelength(wavelength) = selector else {
            return Ok(ValidatedLine {
                selector,
                adjustment: None,
            });
        };

        let Some(nearest) = ranges.nearest_line(wavelength) else {
            return Ok(ValidatedLine {
                selector,
                adjustment: None,
            });
        };

        if (nearest.wavelength - wavelength).abs() <= WAVELENGTH_TOLERANCE_A {
            return Ok(ValidatedLine {
                selector,
                adjustment: None,
            });
        }

        if !self.clip {
            let known = ranges
                .lines
                .iter()
                .map(|line| line.wavelength.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(InspectError::range(
                Parameter::Wavelength.code(),
                format!(
                    "no {} line within {} Å of {} Å; known lines: {}",
                    ranges.species, WAVELENGTH_TOLERANCE_A, wavelength, known
                ),
            ));
        }

        let adjustment = Adjustment {
            parameter: Parameter::Wavelength,
            original: wavelength,
            clipped: nearest.wavelength,
        };
        warn!(element = ranges.symbol, "{}", adjustment);
        Ok(ValidatedLine {
            selector: LineSelector::Wavelength(nearest.wavelength),
            adjustment: Some(adjustment),
        })
    }

    /// Checks stellar parameters and the input value of one query.
    pub fn validate_query(&self, query: &Query) -> InspectResult<ValidatedQuery> {
        let Some(ranges) = ranges_for_element(&query.element) else {
            return unchecked(query);
        };
        let range = ranges.range_for_wavelength(query.line.wavelength);
        let context = match query.line.wavelength {
            Some(wavelength) => format!("{} {} Å", ranges.species, wavelength),
            None => format!("{} wi {}", ranges.species, query.line.index),
        };

        let mut validated = query.clone();
        let mut adjustments = Vec::new();
        let parameters = &mut validated.parameters;
        let checks: [(Parameter, &mut f64, Bounds); 5] = [
            (Parameter::Teff, &mut parameters.teff, range.teff),
            (Parameter::Logg, &mut parameters.logg, range.logg),
            (Parameter::FeH, &mut parameters.feh, range.feh),
            (Parameter::Vt, &mut parameters.vt, range.vt),
            (
                Parameter::InputValue(query.mode),
                &mut validated.value,
                range.value_bounds(query.mode),
            ),
        ];

        for (parameter, value, bounds) in checks {
            if let Some(adjustment) = self.check(parameter, value, bounds, &context)? {
                adjustments.push(adjustment);
            }
        }

        Ok(ValidatedQuery {
            query: validated,
            adjustments,
        })
    }

    fn check(
        &self,
        parameter: Parameter,
        value: &mut f64,
        bounds: Bounds,
        context: &str,
    ) -> InspectResult<Option<Adjustment>> {
        if !value.is_finite() {
            return Err(non_finite_error(parameter, *value));
        }
        if bounds.contains(*value) {
            return Ok(None);
        }
        if !self.clip {
            return Err(InspectError::range(
                parameter.code(),
                format!(
                    "{}={} outside allowed range {} for {}",
                    parameter.label(),
                    value,
                    bounds,
                    context
                ),
            ));
        }

        let adjustment = Adjustment {
            parameter,
            original: *value,
            clipped: bounds.clamp(*value),
        };
        *value = adjustment.clipped;
        warn!(context, "{}", adjustment);
        Ok(Some(adjustment))
    }
}

/// Passes a query for an element without local ranges; only finiteness is
/// enforced.
fn unchecked(query: &Query) -> InspectResult<ValidatedQuery> {
    let parameters = &query.parameters;
    let values = [
        (Parameter::Teff, parameters.teff),
        (Parameter::Logg, parameters.logg),
        (Parameter::FeH, parameters.feh),
        (Parameter::Vt, parameters.vt),
        (Parameter::InputValue(query.mode), query.value),
    ];
    if let Some((parameter, value)) = values.into_iter().find(|(_, value)| !value.is_finite()) {
        return Err(non_finite_error(parameter, value));
    }

    Ok(ValidatedQuery {
        query: query.clone(),
        adjustments: Vec::new(),
    })
}

fn non_finite_error(parameter: Parameter, value: f64) -> InspectError {
    InspectError::range(
        "RANGE.NON_FINITE",
        format!("{}={} is not a finite number", parameter.label(), value),
    )
}
