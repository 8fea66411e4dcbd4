use super::error::ApiError;
use crate::core::analyzer::DEFAULT_HISTORY_LIMIT;
use crate::core::{Analyzer, AssumptionOverrides};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};
use warp::reply::Json;
use warp::{Rejection, reject};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub ticker: Option<String>,
    pub custom_assumptions: Option<AssumptionOverrides>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    pub analysis_id: String,
}

fn reject_with(e: ApiError) -> Rejection {
    if e.status.is_server_error() {
        error!(status = %e.status, "{}", e.message);
    }
    reject::custom(e)
}

pub async fn analyze(
    request: AnalyzeRequest,
    analyzer: Arc<Analyzer>,
) -> Result<Json, Rejection> {
    let ticker = request
        .ticker
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| reject_with(ApiError::bad_request("Invalid ticker")))?;

    let report = analyzer
        .analyze(&ticker, request.custom_assumptions.as_ref())
        .await
        .map_err(|e| reject_with(e.into()))?;
    info!(ticker = %report.data.ticker, id = %report.analysis_id, "Served analysis");

    Ok(warp::reply::json(&json!({
        "success": true,
        "data": report.data,
        "analysisId": report.analysis_id,
    })))
}

pub async fn list_analyses(analyzer: Arc<Analyzer>) -> Result<Json, Rejection> {
    let analyses = analyzer
        .history(DEFAULT_HISTORY_LIMIT)
        .await
        .map_err(|e| reject_with(e.into()))?;
    Ok(warp::reply::json(&json!({ "analyses": analyses })))
}

pub async fn save_analysis(
    request: SaveRequest,
    analyzer: Arc<Analyzer>,
) -> Result<Json, Rejection> {
    let analysis = analyzer
        .save(&request.analysis_id)
        .await
        .map_err(|e| reject_with(e.into()))?;
    Ok(warp::reply::json(&json!({
        "success": true,
        "analysis": analysis,
    })))
}

pub async fn delete_analysis(id: String, analyzer: Arc<Analyzer>) -> Result<Json, Rejection> {
    let deleted = analyzer
        .delete(&id)
        .await
        .map_err(|e| reject_with(e.into()))?;
    info!(%id, deleted, "Delete requested");
    Ok(warp::reply::json(&json!({ "success": true })))
}
