//! Sequential batch runner: one validated query in flight at a time, with a
//! fixed pause between queries.

use crate::domain::{
    AbundanceRecord, CalculationMode, ITEM_FAILURE_EXIT_CODE, InspectError, InspectResult,
    LineSelector, Query, SpectralLine, StellarParameters,
};
use crate::ranges::{Adjustment, ParameterValidator};
use crate::traits::AbundanceService;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Distance under which a catalog wavelength counts as an exact match.
const EXACT_WAVELENGTH_EPSILON: f64 = 1e-6;

/// What happens to the rest of the batch after an item fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Report the failure and move on to the next value.
    #[default]
    Continue,
    /// Stop after the first failed item.
    Abort,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchConfig {
    pub sleep: Duration,
    pub clip: bool,
    pub failure_policy: FailurePolicy,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            sleep: Duration::from_millis(200),
            clip: false,
            failure_policy: FailurePolicy::Continue,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchRequest {
    pub element: String,
    pub mode: CalculationMode,
    pub parameters: StellarParameters,
    pub line: LineSelector,
    pub values: Vec<f64>,
}

/// Everything fixed for the batch once the line is resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchPlan {
    pub element: String,
    pub mode: CalculationMode,
    pub parameters: StellarParameters,
    pub line: SpectralLine,
    pub line_adjustment: Option<Adjustment>,
    pub total: usize,
}

impl BatchPlan {
    fn query_for(&self, value: f64) -> Query {
        Query {
            element: self.element.clone(),
            mode: self.mode,
            value,
            parameters: self.parameters,
            line: self.line.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemOutcome {
    /// 1-based position in the input.
    pub position: usize,
    pub value: f64,
    pub adjustments: Vec<Adjustment>,
    pub result: Result<AbundanceRecord, InspectError>,
}

impl ItemOutcome {
    pub fn record(&self) -> Option<&AbundanceRecord> {
        self.result.as_ref().ok()
    }

    pub fn error(&self) -> Option<&InspectError> {
        self.result.as_ref().err()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub plan: BatchPlan,
    pub outcomes: Vec<ItemOutcome>,
    /// Items skipped because the batch aborted early.
    pub not_attempted: usize,
}

impl BatchReport {
    pub fn records(&self) -> impl Iterator<Item = &AbundanceRecord> {
        self.outcomes.iter().filter_map(ItemOutcome::record)
    }

    pub fn failures(&self) -> impl Iterator<Item = &ItemOutcome> {
        self.outcomes.iter().filter(|outcome| outcome.result.is_err())
    }

    pub fn succeeded(&self) -> usize {
        self.records().count()
    }

    pub fn failed(&self) -> usize {
        self.failures().count()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed() == 0 && self.not_attempted == 0
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_complete_success() {
            0
        } else {
            ITEM_FAILURE_EXIT_CODE
        }
    }
}

/// Progress hooks; every method defaults to doing nothing.
pub trait BatchObserver {
    fn on_plan(&mut self, _plan: &BatchPlan) {}

    fn on_item(&mut self, _outcome: &ItemOutcome, _total: usize) {}
}

pub struct SilentObserver;

impl BatchObserver for SilentObserver {}

pub struct BatchRunner<S> {
    service: S,
    validator: ParameterValidator,
    config: BatchConfig,
}

impl<S> BatchRunner<S>
where
    S: AbundanceService,
{
    pub fn new(service: S, config: BatchConfig) -> Self {
        Self {
            service,
            validator: ParameterValidator::new(config.clip),
            config,
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Validates the line selection and resolves it against the remote
    /// catalog. Errors here are fatal for the whole batch.
    pub fn plan(&self, request: &BatchRequest) -> InspectResult<BatchPlan> {
        let validated = self.validator.validate_line(&request.element, request.line)?;
        let catalog = self.service.line_catalog(&request.element)?;
        let line = resolve_line(&catalog, validated.selector, &request.element)?;
        debug!(wi = line.index, wavelength = ?line.wavelength, "resolved line");

        Ok(BatchPlan {
            element: request.element.clone(),
            mode: request.mode,
            parameters: request.parameters,
            line,
            line_adjustment: validated.adjustment,
            total: request.values.len(),
        })
    }

    pub fn run(
        &self,
        request: &BatchRequest,
        observer: &mut dyn BatchObserver,
    ) -> InspectResult<BatchReport> {
        let plan = self.plan(request)?;
        observer.on_plan(&plan);

        let mut outcomes = Vec::with_capacity(plan.total);
        for (offset, value) in request.values.iter().copied().enumerate() {
            if offset > 0 && !self.config.sleep.is_zero() {
                std::thread::sleep(self.config.sleep);
            }

            let outcome = self.run_item(&plan, offset + 1, value);
            observer.on_item(&outcome, plan.total);
            if let Some(error) = outcome
                .error()
                .filter(|error| !error.category().is_item_scoped())
            {
                return Err(error.clone());
            }
            let failed = outcome.result.is_err();
            outcomes.push(outcome);

            if failed && self.config.failure_policy == FailurePolicy::Abort {
                warn!(position = offset + 1, "aborting batch after failed item");
                break;
            }
        }

        let not_attempted = plan.total - outcomes.len();
        let report = BatchReport {
            plan,
            outcomes,
            not_attempted,
        };
        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            not_attempted = report.not_attempted,
            "batch finished"
        );
        Ok(report)
    }

    fn run_item(&self, plan: &BatchPlan, position: usize, value: f64) -> ItemOutcome {
        let validated = match self.validator.validate_query(&plan.query_for(value)) {
            Ok(validated) => validated,
            Err(error) => {
                return ItemOutcome {
                    position,
                    value,
                    adjustments: Vec::new(),
                    result: Err(error),
                };
            }
        };

        let result = self
            .service
            .submit(&validated.query)
            .map(|result| AbundanceRecord {
                query: validated.query,
                result,
            });
        if let Err(error) = &result {
            warn!(position, value, "{error}");
        }

        ItemOutcome {
            position,
            value,
            adjustments: validated.adjustments,
            result,
        }
    }
}

/// Picks the catalog entry for `selector`: an exact wavelength match if one
/// exists, else the nearest wavelength; indices must be offered by the
/// catalog.
pub fn resolve_line(
    catalog: &[SpectralLine],
    selector: LineSelector,
    element: &str,
) -> InspectResult<SpectralLine> {
    match selector {
        LineSelector::Index(index) => catalog
            .iter()
            .find(|line| line.index == index)
            .cloned()
            .ok_or_else(|| {
                InspectError::range(
                    "RANGE.LINE_INDEX",
                    format!("wi {index} is not offered for element {element}"),
                )
            }),
        LineSelector::Wavelength(wavelength) => {
            let with_wavelength = catalog
                .iter()
                .filter_map(|line| line.wavelength.map(|known| (line, (known - wavelength).abs())));

            let nearest = with_wavelength.min_by(|left, right| left.1.total_cmp(&right.1));
            match nearest {
                Some((line, distance)) => {
                    if distance > EXACT_WAVELENGTH_EPSILON {
                        debug!(
                            requested = wavelength,
                            matched = ?line.wavelength,
                            "no exact wavelength match; using nearest line"
                        );
                    }
                    Ok(line.clone())
                }
                None => Err(InspectError::parse(
                    "PARSE.LINE_WAVELENGTHS",
                    format!("no line of element {element} has a readable wavelength"),
                )),
            }
        }
    }
}
