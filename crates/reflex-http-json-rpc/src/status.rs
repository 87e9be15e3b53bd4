use http::StatusCode;
use reflex_json_rpc_server::error_codes::{
    INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR,
};
use reflex_json_rpc_server::{ClassifiedError, DispatchOutcome};

/// Chooses the HTTP status of a JSON-RPC exchange.
pub trait HttpStatusCodeProvider: Send + Sync {
    /// Status for a single (non-batch) error response.
    fn status_for_error(&self, error: &ClassifiedError) -> StatusCode;

    fn status_for(&self, outcome: &DispatchOutcome) -> StatusCode {
        match outcome {
            DispatchOutcome::Silent => StatusCode::NO_CONTENT,
            DispatchOutcome::Batch(_) => StatusCode::OK,
            DispatchOutcome::Single(_) => outcome
                .top_level_error()
                .map(|error| self.status_for_error(error))
                .unwrap_or(StatusCode::OK),
        }
    }
}

/// Protocol errors map to 4xx, everything else is 200.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultStatusCodeProvider;

impl HttpStatusCodeProvider for DefaultStatusCodeProvider {
    fn status_for_error(&self, error: &ClassifiedError) -> StatusCode {
        if !error.is_protocol_error() {
            return StatusCode::OK;
        }
        match error.code {
            PARSE_ERROR | INVALID_REQUEST | INVALID_PARAMS => StatusCode::BAD_REQUEST,
            METHOD_NOT_FOUND => StatusCode::NOT_FOUND,
            _ => StatusCode::OK,
        }
    }
}
