pub mod errors;

pub use errors::{
    CategoryDescriptor, ITEM_FAILURE_EXIT_CODE, InspectError, InspectErrorCategory, InspectResult,
};

use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalculationMode {
    /// Equivalent width (mÅ) to abundance.
    Ew,
    /// LTE abundance to NLTE abundance.
    Lte,
}

impl CalculationMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ew => "ew",
            Self::Lte => "lte",
        }
    }

    pub const fn endpoint_path(self) -> &'static str {
        match self {
            Self::Ew => "A_from_e",
            Self::Lte => "nonlte_from_lte",
        }
    }

    /// Form field carrying the primary input value.
    pub const fn value_field(self) -> &'static str {
        match self {
            Self::Ew => "e",
            Self::Lte => "A_lte",
        }
    }

    pub const fn value_label(self) -> &'static str {
        match self {
            Self::Ew => "EW",
            Self::Lte => "A(LTE)",
        }
    }
}

impl Display for CalculationMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

impl FromStr for CalculationMode {
    type Err = InspectError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ew" => Ok(Self::Ew),
            "lte" => Ok(Self::Lte),
            other => Err(InspectError::input_validation(
                "INPUT.MODE",
                format!("unknown calculation mode '{other}'; expected 'ew' or 'lte'"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StellarParameters {
    pub teff: f64,
    pub logg: f64,
    pub feh: f64,
    pub vt: f64,
}

impl StellarParameters {
    pub const fn new(teff: f64, logg: f64, feh: f64, vt: f64) -> Self {
        Self { teff, logg, feh, vt }
    }
}

impl Display for StellarParameters {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Teff={}  logg={}  [Fe/H]={}  vt={} km/s",
            self.teff, self.logg, self.feh, self.vt
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineSelector {
    Wavelength(f64),
    Index(u32),
}

impl Display for LineSelector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Wavelength(wavelength) => write!(f, "wavelength {wavelength} Å"),
            Self::Index(index) => write!(f, "wi {index}"),
        }
    }
}

/// One entry of the calculator's wavelength dropdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpectralLine {
    #[serde(rename = "wi")]
    pub index: u32,
    #[serde(rename = "wavelength_A")]
    pub wavelength: Option<f64>,
    pub label: String,
}

impl SpectralLine {
    pub fn new(index: u32, wavelength: Option<f64>, label: impl Into<String>) -> Self {
        Self {
            index,
            wavelength,
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub element: String,
    pub mode: CalculationMode,
    pub value: f64,
    pub parameters: StellarParameters,
    pub line: SpectralLine,
}

impl Query {
    /// Form fields shared by both calculators, in submission order.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("element_name", self.element.clone()),
            (self.mode.value_field(), format_number(self.value)),
            ("t", format_number(self.parameters.teff)),
            ("g", format_number(self.parameters.logg)),
            ("f", format_number(self.parameters.feh)),
            ("x", format_number(self.parameters.vt)),
            ("wi", self.line.index.to_string()),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AbundanceResult {
    pub ew_ma: Option<f64>,
    pub a_lte: Option<f64>,
    pub a_nlte: Option<f64>,
    pub delta: Option<f64>,
    pub x_fe_nlte: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AbundanceRecord {
    pub query: Query,
    pub result: AbundanceResult,
}

/// Shortest decimal form that round-trips, e.g. `65` rather than `65.0`.
pub fn format_number(value: f64) -> String {
    format!("{value}")
}
