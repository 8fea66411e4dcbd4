use super::error::ApiError;
use super::handlers;
use crate::core::Analyzer;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::debug;
use warp::filters::body::BodyDeserializeError;
use warp::http::StatusCode;
use warp::reject::{
    LengthRequired, MethodNotAllowed, PayloadTooLarge, Rejection, UnsupportedMediaType,
};
use warp::{Filter, Reply};

const MAX_BODY_BYTES: u64 = 16 * 1024;

async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let code;
    let message;

    if err.is_not_found() {
        code = StatusCode::NOT_FOUND;
        message = "Not Found".to_string();
    } else if let Some(api_error) = err.find::<ApiError>() {
        code = api_error.status;
        message = api_error.message.clone();
    } else if let Some(e) = err.find::<BodyDeserializeError>() {
        code = StatusCode::BAD_REQUEST;
        message = format!("Invalid request body: {e}");
    } else if err.find::<PayloadTooLarge>().is_some() {
        code = StatusCode::PAYLOAD_TOO_LARGE;
        message = format!("Request body exceeds {MAX_BODY_BYTES} bytes");
    } else if err.find::<LengthRequired>().is_some() {
        code = StatusCode::LENGTH_REQUIRED;
        message = "A valid content-length header is required".to_string();
    } else if err.find::<UnsupportedMediaType>().is_some() {
        code = StatusCode::UNSUPPORTED_MEDIA_TYPE;
        message = "Expected an application/json body".to_string();
    } else if err.find::<MethodNotAllowed>().is_some() {
        code = StatusCode::METHOD_NOT_ALLOWED;
        message = "Method not allowed".to_string();
    } else {
        debug!("Unhandled rejection: {:?}", err);
        code = StatusCode::INTERNAL_SERVER_ERROR;
        message = "Internal Server Error".to_string();
    }

    Ok(warp::reply::with_status(
        warp::reply::json(&serde_json::json!({
            "error": message,
        })),
        code,
    ))
}

pub fn routes(
    analyzer: Arc<Analyzer>,
) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    let analyzer_filter = warp::any().map(move || analyzer.clone());

    let analyze_route = warp::path!("api" / "analyze")
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(analyzer_filter.clone())
        .and_then(handlers::analyze);

    let list_route = warp::path!("api" / "analyses")
        .and(warp::get())
        .and(analyzer_filter.clone())
        .and_then(handlers::list_analyses);

    let save_route = warp::path!("api" / "analyses")
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(analyzer_filter.clone())
        .and_then(handlers::save_analysis);

    let delete_route = warp::path!("api" / "analyses" / String)
        .and(warp::delete())
        .and(analyzer_filter)
        .and_then(handlers::delete_analysis);

    analyze_route
        .or(list_route)
        .or(save_route)
        .or(delete_route)
        .recover(handle_rejection)
}

/// [`routes`] with CORS open to any origin.
pub fn api(analyzer: Arc<Analyzer>) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let cors = warp::cors()
        .allow_any_origin()
        .allow_header("content-type")
        .allow_methods(vec!["GET", "POST", "DELETE", "OPTIONS"]);
    routes(analyzer).with(cors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CompanyFinancials, FinancialsProvider};
    use crate::store::memory::MemoryAnalysisStore;
    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use serde_json::{Value, json};

    struct StaticProvider;

    #[async_trait]
    impl FinancialsProvider for StaticProvider {
        async fn fetch_financials(&self, ticker: &str) -> Result<CompanyFinancials> {
            let current_price = match ticker {
                "AAPL" => 150.0,
                "ZERO" => 0.0,
                _ => return Err(anyhow!("No data found for ticker {}", ticker)),
            };
            Ok(CompanyFinancials {
                company_name: "Apple Inc.".to_string(),
                current_price,
                market_cap: 150_000_000_000.0,
                shares_outstanding: 1_000_000_000.0,
                beta: 1.2,
                total_debt: 5_000_000_000.0,
                total_cash: 2_000_000_000.0,
                revenue: 100_000_000_000.0,
                operating_income: 15_000_000_000.0,
                net_income: 11_000_000_000.0,
            })
        }
    }

    fn test_analyzer() -> Arc<Analyzer> {
        Arc::new(Analyzer::new(
            Arc::new(StaticProvider),
            Arc::new(MemoryAnalysisStore::new()),
        ))
    }

    fn body_json(body: &[u8]) -> Value {
        serde_json::from_slice(body).unwrap()
    }

    async fn post_analyze(analyzer: &Arc<Analyzer>, body: Value) -> (StatusCode, Value) {
        let res = warp::test::request()
            .method("POST")
            .path("/api/analyze")
            .json(&body)
            .reply(&routes(analyzer.clone()))
            .await;
        (res.status(), body_json(res.body()))
    }

    #[tokio::test]
    async fn test_analyze_success() {
        let analyzer = test_analyzer();
        let (status, body) = post_analyze(
            &analyzer,
            json!({ "ticker": "aapl", "customAssumptions": { "wacc": 0.08 } }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["ticker"], "AAPL");
        assert_eq!(body["data"]["valuation"]["intrinsicValue"], 199.01);
        assert_eq!(body["data"]["valuation"]["recommendation"], "STRONG_BUY");
        assert_eq!(body["data"]["assumptions"]["wacc"], 0.08);
        assert!(body["analysisId"].as_str().is_some_and(|id| !id.is_empty()));
    }

    #[tokio::test]
    async fn test_analyze_error_statuses() {
        let analyzer = test_analyzer();

        let (status, body) = post_analyze(&analyzer, json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid ticker");

        let (status, _) = post_analyze(&analyzer, json!({ "ticker": "AA PL" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = post_analyze(&analyzer, json!({ "ticker": "ZERO" })).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = post_analyze(
            &analyzer,
            json!({ "ticker": "AAPL", "customAssumptions": { "wacc": 0.02, "terminalGrowth": 0.03 } }),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, body) = post_analyze(&analyzer, json!({ "ticker": "MISSING" })).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].as_str().unwrap().contains("MISSING"));
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let res = warp::test::request()
            .method("POST")
            .path("/api/analyze")
            .header("content-type", "application/json")
            .body("{not json")
            .reply(&routes(test_analyzer()))
            .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_body_rejections_are_client_errors() {
        let filter = routes(test_analyzer());

        let padding = "x".repeat(20 * 1024);
        let res = warp::test::request()
            .method("POST")
            .path("/api/analyze")
            .json(&json!({ "ticker": "AAPL", "padding": padding }))
            .reply(&filter)
            .await;
        assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(body_json(res.body())["error"].as_str().is_some());

        let res = warp::test::request()
            .method("POST")
            .path("/api/analyze")
            .body(r#"{"ticker": "AAPL"}"#)
            .header("content-length", "")
            .reply(&filter)
            .await;
        assert_eq!(res.status(), StatusCode::LENGTH_REQUIRED);

        let res = warp::test::request()
            .method("POST")
            .path("/api/analyze")
            .header("content-type", "text/plain")
            .body(r#"{"ticker": "AAPL"}"#)
            .reply(&filter)
            .await;
        assert_eq!(res.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn test_list_save_and_delete() {
        let analyzer = test_analyzer();
        let (_, created) = post_analyze(&analyzer, json!({ "ticker": "AAPL" })).await;
        let id = created["analysisId"].as_str().unwrap().to_string();
        let filter = routes(analyzer.clone());

        let res = warp::test::request()
            .method("GET")
            .path("/api/analyses")
            .reply(&filter)
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        let listed = body_json(res.body());
        assert_eq!(listed["analyses"].as_array().unwrap().len(), 1);
        assert_eq!(listed["analyses"][0]["id"], id.as_str());

        let res = warp::test::request()
            .method("POST")
            .path("/api/analyses")
            .json(&json!({ "analysisId": id }))
            .reply(&filter)
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        let saved = body_json(res.body());
        assert_eq!(saved["success"], true);
        assert_eq!(saved["analysis"]["saved"], true);

        let res = warp::test::request()
            .method("POST")
            .path("/api/analyses")
            .json(&json!({ "analysisId": "unknown" }))
            .reply(&filter)
            .await;
        assert_eq!(body_json(res.body())["analysis"], Value::Null);

        let res = warp::test::request()
            .method("DELETE")
            .path(&format!("/api/analyses/{id}"))
            .reply(&filter)
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res.body())["success"], true);
        assert!(analyzer.history(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_route_and_wrong_method() {
        let filter = routes(test_analyzer());

        let res = warp::test::request()
            .method("GET")
            .path("/api/nothing")
            .reply(&filter)
            .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(res.body())["error"], "Not Found");

        let res = warp::test::request()
            .method("PUT")
            .path("/api/analyze")
            .reply(&filter)
            .await;
        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body_json(res.body())["error"], "Method not allowed");
    }

    #[tokio::test]
    async fn test_cors_allows_any_origin() {
        let res = warp::test::request()
            .method("GET")
            .path("/api/analyses")
            .header("origin", "https://dashboard.example.com")
            .reply(&api(test_analyzer()))
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().contains_key("access-control-allow-origin"));
    }
}
