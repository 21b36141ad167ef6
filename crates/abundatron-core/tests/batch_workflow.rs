use abundatron_core::batch::{BatchConfig, BatchRequest, BatchRunner, FailurePolicy, SilentObserver};
use abundatron_core::client::{ClientConfig, HttpMethod, InspectClient, RetryPolicy};
use abundatron_core::domain::{CalculationMode, LineSelector, StellarParameters};
use abundatron_core::report::{CsvOptions, write_csv};
use mockito::{Matcher, Server, ServerGuard};
use std::time::Duration;

const FORM_PAGE: &str = r#"<select name="wi">
  <option value="3">7771.957</option>
  <option value="4">7774.156</option>
</select>"#;

fn result_page(ew: &str, a_lte: f64) -> String {
    format!(
        "<pre>EW  A(O) LTE  A(O) NLTE  Delta  [O/Fe] NLTE\n{ew}  {a_lte:.3}  {:.3}  -0.196  -0.118</pre>",
        a_lte - 0.196
    )
}

fn serve_catalog(server: &mut ServerGuard) -> mockito::Mock {
    server
        .mock("GET", "/nonlte_from_lte")
        .match_query(Matcher::UrlEncoded("element_name".into(), "O".into()))
        .with_status(200)
        .with_body(FORM_PAGE)
        .create()
}

fn serve_ew(server: &mut ServerGuard, ew: &str, status: usize, a_lte: f64) -> mockito::Mock {
    server
        .mock("GET", "/A_from_e")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("e".into(), ew.into()),
            Matcher::UrlEncoded("wi".into(), "3".into()),
        ]))
        .with_status(status)
        .with_body(result_page(ew, a_lte))
        .create()
}

fn runner(server: &ServerGuard, failure_policy: FailurePolicy) -> BatchRunner<InspectClient> {
    let client = InspectClient::new(ClientConfig {
        base_url: server.url(),
        timeout: Duration::from_secs(5),
        method: HttpMethod::Get,
        retry: RetryPolicy::new(1, Duration::from_millis(1), Duration::from_millis(1), 1.0),
    })
    .expect("client should build");

    BatchRunner::new(
        client,
        BatchConfig {
            sleep: Duration::from_millis(1),
            clip: false,
            failure_policy,
        },
    )
}

fn oxygen_request(values: Vec<f64>) -> BatchRequest {
    BatchRequest {
        element: "O".to_string(),
        mode: CalculationMode::Ew,
        parameters: StellarParameters::new(5777.0, 4.44, 0.0, 1.0),
        line: LineSelector::Wavelength(7771.957),
        values,
    }
}

#[test]
fn three_equivalent_widths_yield_three_csv_rows() {
    let mut server = Server::new();
    let catalog = serve_catalog(&mut server);
    let mocks = [
        serve_ew(&mut server, "65", 200, 8.778),
        serve_ew(&mut server, "80", 200, 8.861),
        serve_ew(&mut server, "100", 200, 8.957),
    ];

    let report = runner(&server, FailurePolicy::Continue)
        .run(&oxygen_request(vec![65.0, 80.0, 100.0]), &mut SilentObserver)
        .expect("batch should run");

    catalog.assert();
    for mock in &mocks {
        mock.assert();
    }
    assert_eq!(report.exit_code(), 0);

    let mut buffer = Vec::new();
    let rows = write_csv(&report, CsvOptions::default(), &mut buffer).expect("csv");
    assert_eq!(rows, 3);

    let csv = String::from_utf8(buffer).expect("utf-8");
    let mut lines = csv.lines();
    let header: Vec<&str> = lines.next().expect("header").split(',').collect();
    let a_lte = header.iter().position(|column| *column == "A_LTE").unwrap();
    let a_nlte = header.iter().position(|column| *column == "A_NLTE").unwrap();
    let data: Vec<Vec<&str>> = lines.map(|line| line.split(',').collect()).collect();
    assert_eq!(data.len(), 3);
    for row in &data {
        assert!(!row[a_lte].is_empty(), "A_LTE should be filled: {row:?}");
        assert!(!row[a_nlte].is_empty(), "A_NLTE should be filled: {row:?}");
    }
    assert_eq!(data[1][a_lte], "8.861");
}

#[test]
fn failing_item_is_reported_and_excluded_from_csv() {
    let mut server = Server::new();
    let _catalog = serve_catalog(&mut server);
    let _first = serve_ew(&mut server, "65", 200, 8.778);
    let unavailable = server
        .mock("GET", "/A_from_e")
        .match_query(Matcher::UrlEncoded("e".into(), "80".into()))
        .with_status(503)
        .expect(2)
        .create();
    let _last = serve_ew(&mut server, "100", 200, 8.957);

    let report = runner(&server, FailurePolicy::Continue)
        .run(&oxygen_request(vec![65.0, 80.0, 100.0]), &mut SilentObserver)
        .expect("batch should run");

    unavailable.assert();
    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.exit_code(), 1);

    let mut buffer = Vec::new();
    let rows = write_csv(&report, CsvOptions::default(), &mut buffer).expect("csv");
    assert_eq!(rows, report.plan.total - report.failed());
}

#[test]
fn abort_policy_leaves_remaining_values_unsent() {
    let mut server = Server::new();
    let _catalog = serve_catalog(&mut server);
    let _error_page = server
        .mock("GET", "/A_from_e")
        .match_query(Matcher::UrlEncoded("e".into(), "65".into()))
        .with_status(200)
        .with_body("<p>outside parameter space</p>")
        .create();
    let never = server
        .mock("GET", "/A_from_e")
        .match_query(Matcher::UrlEncoded("e".into(), "80".into()))
        .expect(0)
        .create();

    let report = runner(&server, FailurePolicy::Abort)
        .run(&oxygen_request(vec![65.0, 80.0]), &mut SilentObserver)
        .expect("batch should run");

    never.assert();
    assert_eq!(report.failed(), 1);
    assert_eq!(report.not_attempted, 1);
}

#[test]
fn unavailable_catalog_fails_the_whole_batch() {
    let mut server = Server::new();
    let _catalog = server
        .mock("GET", "/nonlte_from_lte")
        .match_query(Matcher::Any)
        .with_status(502)
        .create();

    let error = runner(&server, FailurePolicy::Continue)
        .run(&oxygen_request(vec![65.0]), &mut SilentObserver)
        .expect_err("no catalog, no batch");
    assert_eq!(error.exit_code(), 4);
}
