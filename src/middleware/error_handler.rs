use actix_web::{error, web, HttpRequest};

use crate::core::AppError;

/// Extractor failures (bad JSON body, query or path) rendered like every other
/// `AppError::Validation`
fn rejected(kind: &str, err: impl std::fmt::Display, req: &HttpRequest) -> actix_web::Error {
    tracing::debug!(path = %req.path(), error = %err, "Rejected {}", kind);
    AppError::validation(format!("Invalid {}: {}", kind, err)).into()
}

pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(64 * 1024)
        .error_handler(|err: error::JsonPayloadError, req| rejected("request body", err, req))
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err: error::QueryPayloadError, req| rejected("query string", err, req))
}

pub fn path_config() -> web::PathConfig {
    web::PathConfig::default()
        .error_handler(|err: error::PathError, req| rejected("path", err, req))
}
