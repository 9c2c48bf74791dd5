use forge::error::{ApiError, INTERNAL_MESSAGE};
use forge::http::parser::ParseError;
use forge::http::response::StatusCode;
use forge::store::StoreError;
use serde_json::Value;

fn body(err: &ApiError, dev_mode: bool) -> Value {
    serde_json::from_slice(&err.to_response(dev_mode).body).unwrap()
}

#[test]
fn test_error_status_mapping() {
    let cases = [
        (ApiError::bad_request("x"), StatusCode::BadRequest),
        (ApiError::unauthorized("x"), StatusCode::Unauthorized),
        (ApiError::forbidden("x"), StatusCode::Forbidden),
        (ApiError::not_found("x"), StatusCode::NotFound),
        (
            ApiError::MethodNotAllowed("x".to_string()),
            StatusCode::MethodNotAllowed,
        ),
        (ApiError::internal("x"), StatusCode::InternalServerError),
        (
            ApiError::NotImplemented("x".to_string()),
            StatusCode::NotImplemented,
        ),
        (
            ApiError::Unavailable("x".to_string()),
            StatusCode::ServiceUnavailable,
        ),
    ];

    for (err, status) in cases {
        assert_eq!(err.status(), status);
        assert_eq!(err.to_response(false).status, status);
    }
}

#[test]
fn test_error_body_shape() {
    let err = ApiError::not_found("repository 'demo'");
    let response = err.to_response(false);

    assert_eq!(response.header("Content-Type"), Some("application/json"));
    let json = body(&err, false);
    assert_eq!(json["error"], "Not Found");
    assert_eq!(json["message"], "repository 'demo'");
    assert!(json.get("details").is_none());
}

#[test]
fn test_internal_error_hides_detail() {
    let err = ApiError::internal("disk on fire at /var/lib/forge");

    let json = body(&err, false);
    assert_eq!(json["error"], "Internal Server Error");
    assert_eq!(json["message"], INTERNAL_MESSAGE);
    assert!(json.get("details").is_none());

    let json = body(&err, true);
    assert_eq!(json["message"], INTERNAL_MESSAGE);
    assert_eq!(json["details"], "disk on fire at /var/lib/forge");
}

#[test]
fn test_dev_mode_does_not_add_details_to_client_errors() {
    let json = body(&ApiError::bad_request("nope"), true);
    assert!(json.get("details").is_none());
}

#[test]
fn test_parse_error_maps_to_bad_request() {
    let err = ApiError::from(ParseError::InvalidMethod);
    assert_eq!(err.status(), StatusCode::BadRequest);
}

#[test]
fn test_store_error_mapping() {
    assert_eq!(
        ApiError::from(StoreError::NotFound("issue #3".to_string())),
        ApiError::NotFound("issue #3 not found".to_string())
    );
    assert_eq!(
        ApiError::from(StoreError::AlreadyExists("repository 'demo'".to_string())),
        ApiError::BadRequest("repository 'demo' already exists".to_string())
    );
    assert_eq!(
        ApiError::from(StoreError::Invalid("bad".to_string())).status(),
        StatusCode::BadRequest
    );
    assert_eq!(
        ApiError::from(StoreError::Backend("lock poisoned".to_string())),
        ApiError::Internal("lock poisoned".to_string())
    );
}
