use dcfx::core::config::AppConfig;
use dcfx::core::{AssumptionOverrides, Recommendation};
use std::fs;
use std::path::Path;
use tracing::info;

mod test_utils {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub async fn create_mock_server(ticker: &str, mock_response: &str) -> MockServer {
        let mock_server = MockServer::start().await;
        let url_path = format!("/v10/finance/quoteSummary/{ticker}");

        Mock::given(method("GET"))
            .and(path(&url_path))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        mock_server
    }
}

const MSFT_RESPONSE: &str = r#"{
    "quoteSummary": {
        "result": [{
            "price": {
                "regularMarketPrice": {"raw": 150.0},
                "longName": "Microsoft Corporation"
            },
            "summaryDetail": {"marketCap": {"raw": 150000000000.0}},
            "financialData": {
                "totalDebt": {"raw": 5000000000.0},
                "totalCash": {"raw": 2000000000.0}
            },
            "defaultKeyStatistics": {"beta": {"raw": 1.0}},
            "incomeStatementHistory": {
                "incomeStatementHistory": [{
                    "totalRevenue": {"raw": 100000000000.0},
                    "operatingIncome": {"raw": 15000000000.0},
                    "netIncome": {"raw": 11000000000.0}
                }]
            }
        }],
        "error": null
    }
}"#;

fn write_config(dir: &Path, base_url: &str) -> String {
    let config_path = dir.join("config.yaml");
    let config_content = format!(
        r#"
providers:
  yahoo:
    base_url: "{}"
    retries: 0
data_path: "{}"
"#,
        base_url,
        dir.join("data").display()
    );
    fs::write(&config_path, config_content).expect("Failed to write config file");
    config_path.to_string_lossy().into_owned()
}

#[test_log::test(tokio::test)]
async fn test_full_app_flow_with_mock() {
    let mock_server = test_utils::create_mock_server("MSFT", MSFT_RESPONSE).await;
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_path = write_config(temp_dir.path(), &mock_server.uri());

    let result = dcfx::run_command(
        dcfx::AppCommand::Analyze {
            tickers: vec!["msft".to_string()],
            overrides: AssumptionOverrides {
                wacc: Some(0.08),
                ..Default::default()
            },
            json: false,
        },
        Some(&config_path),
    )
    .await;
    assert!(result.is_ok(), "Analyze failed with: {:?}", result.err());

    let result =
        dcfx::run_command(dcfx::AppCommand::History { limit: 10 }, Some(&config_path)).await;
    assert!(result.is_ok(), "History failed with: {:?}", result.err());

    let config = AppConfig::load_from_path(&config_path).unwrap();
    let analyzer = dcfx::build_analyzer(&config).unwrap();
    let history = analyzer.history(10).await.unwrap();
    info!(?history, "Stored analyses");

    assert_eq!(history.len(), 1);
    assert_eq!(history[0].ticker, "MSFT");
    assert_eq!(history[0].company_name, "Microsoft Corporation");
    assert_eq!(history[0].intrinsic_value, 199.01);
    assert_eq!(history[0].recommendation, Recommendation::StrongBuy);
    assert!(!history[0].saved);
}

#[test_log::test(tokio::test)]
async fn test_cached_financials_survive_upstream_outage() {
    let mock_server = test_utils::create_mock_server("MSFT", MSFT_RESPONSE).await;
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_path = write_config(temp_dir.path(), &mock_server.uri());
    let config = AppConfig::load_from_path(&config_path).unwrap();

    {
        let analyzer = dcfx::build_analyzer(&config).unwrap();
        analyzer.analyze("MSFT", None).await.unwrap();
    }

    mock_server.reset().await;

    let analyzer = dcfx::build_analyzer(&config).unwrap();
    let report = analyzer.analyze("MSFT", None).await.unwrap();
    assert_eq!(report.data.company_name, "Microsoft Corporation");
    assert_eq!(analyzer.history(10).await.unwrap().len(), 2);
}

#[test_log::test(tokio::test)]
async fn test_unknown_ticker_fails() {
    let mock_server = wiremock::MockServer::start().await;
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_path = write_config(temp_dir.path(), &mock_server.uri());

    let result = dcfx::run_command(
        dcfx::AppCommand::Analyze {
            tickers: vec!["NOPE".to_string()],
            overrides: AssumptionOverrides::default(),
            json: true,
        },
        Some(&config_path),
    )
    .await;
    assert!(result.is_err());
}

#[test_log::test(tokio::test)]
async fn test_save_unknown_analysis_fails() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_path = write_config(temp_dir.path(), "http://127.0.0.1:9");

    let result = dcfx::run_command(
        dcfx::AppCommand::Save {
            id: "does-not-exist".to_string(),
        },
        Some(&config_path),
    )
    .await;
    assert!(
        result
            .unwrap_err()
            .to_string()
            .contains("Analysis not found")
    );
}
