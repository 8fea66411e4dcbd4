use crate::core::AnalyzeError;
use std::fmt;
use warp::http::StatusCode;
use warp::reject::Reject;

/// A failed request, carried through warp as a custom rejection.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        ApiError {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl From<AnalyzeError> for ApiError {
    fn from(e: AnalyzeError) -> Self {
        let status = match &e {
            AnalyzeError::InvalidTicker(_) => StatusCode::BAD_REQUEST,
            AnalyzeError::Valuation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AnalyzeError::Fetch { .. } => StatusCode::BAD_GATEWAY,
            AnalyzeError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError::new(status, e.to_string())
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}
impl Reject for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ValuationError;
    use anyhow::anyhow;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                AnalyzeError::InvalidTicker("$$".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                AnalyzeError::Valuation(ValuationError::DivisionDegenerate {
                    what: "current_price",
                    value: 0.0,
                }),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                AnalyzeError::Fetch {
                    ticker: "AAPL".to_string(),
                    source: anyhow!("timeout"),
                },
                StatusCode::BAD_GATEWAY,
            ),
            (
                AnalyzeError::Store(anyhow!("disk full")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(ApiError::from(error).status, status);
        }
    }
}
