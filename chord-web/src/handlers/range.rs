//! Response builders for byte-range audio delivery

use axum::body::Body;
use axum::http::{StatusCode, header};
use axum::response::Response;
use chord_core::streaming::{ByteRange, RangeOutcome};

use crate::error::ApiError;

/// Builds a 200 (whole file) or 206 (`range`) response around `body`.
///
/// `Content-Length` always matches the number of bytes `body` will yield.
///
/// # Errors
/// Returns an internal error if a header value is rejected by the builder.
pub fn build_stream_response(
    media_type: &str,
    range: Option<ByteRange>,
    file_size: u64,
    body: Body,
) -> Result<Response, ApiError> {
    let mut response = Response::builder()
        .header(header::CONTENT_TYPE, media_type)
        .header(header::ACCEPT_RANGES, "bytes");

    let content_length = match range {
        Some(range) => {
            response = response
                .status(StatusCode::PARTIAL_CONTENT)
                .header(header::CONTENT_RANGE, range.content_range(file_size));
            range.length()
        }
        None => {
            response = response.status(StatusCode::OK);
            file_size
        }
    };

    response
        .header(header::CONTENT_LENGTH, content_length)
        .body(body)
        .map_err(|e| ApiError::internal("Failed to stream track", e))
}

/// Builds the bodiless 416 response for a range outside the file.
///
/// # Errors
/// Returns an internal error if a header value is rejected by the builder.
pub fn build_unsatisfiable_response(file_size: u64) -> Result<Response, ApiError> {
    Response::builder()
        .status(StatusCode::RANGE_NOT_SATISFIABLE)
        .header(header::ACCEPT_RANGES, "bytes")
        .header(
            header::CONTENT_RANGE,
            RangeOutcome::unsatisfied_content_range(file_size),
        )
        .body(Body::empty())
        .map_err(|e| ApiError::internal("Failed to stream track", e))
}
