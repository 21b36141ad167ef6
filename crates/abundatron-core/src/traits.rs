use crate::domain::{AbundanceResult, InspectResult, Query, SpectralLine};

/// The remote calculator as seen by the batch runner.
pub trait AbundanceService {
    /// Lines offered for `element`, in dropdown order.
    fn line_catalog(&self, element: &str) -> InspectResult<Vec<SpectralLine>>;

    fn submit(&self, query: &Query) -> InspectResult<AbundanceResult>;
}

impl<T> AbundanceService for &T
where
    T: AbundanceService + ?Sized,
{
    fn line_catalog(&self, element: &str) -> InspectResult<Vec<SpectralLine>> {
        (**self).line_catalog(element)
    }

    fn submit(&self, query: &Query) -> InspectResult<AbundanceResult> {
        (**self).submit(query)
    }
}

#[cfg(test)]
mod tests {
    use super::AbundanceService;
    use crate::domain::{
        AbundanceResult, CalculationMode, InspectError, InspectErrorCategory, InspectResult,
        Query, SpectralLine, StellarParameters,
    };

    struct OfflineService;

    impl AbundanceService for OfflineService {
        fn line_catalog(&self, _element: &str) -> InspectResult<Vec<SpectralLine>> {
            Err(InspectError::network("NET.TRANSPORT", "offline"))
        }

        fn submit(&self, _query: &Query) -> InspectResult<AbundanceResult> {
            Err(InspectError::network("NET.TRANSPORT", "offline"))
        }
    }

    fn submit_through<S: AbundanceService>(service: S, query: &Query) -> InspectResult<AbundanceResult> {
        service.submit(query)
    }

    #[test]
    fn references_delegate_to_the_service() {
        let query = Query {
            element: "O".to_string(),
            mode: CalculationMode::Ew,
            value: 65.0,
            parameters: StellarParameters::new(5777.0, 4.44, 0.0, 1.0),
            line: SpectralLine::new(3, Some(7771.957), "7771.957"),
        };
        let error = submit_through(&OfflineService, &query).expect_err("offline service fails");
        assert_eq!(error.category(), InspectErrorCategory::NetworkError);
        assert!((&OfflineService).line_catalog("O").is_err());
    }
}
