use forge::http::response::{Response, ResponseBuilder, StatusCode};
use forge::http::writer::{serialize_head_response, serialize_response, write_response};

#[test]
fn test_status_code_as_u16() {
    assert_eq!(StatusCode::Ok.as_u16(), 200);
    assert_eq!(StatusCode::Created.as_u16(), 201);
    assert_eq!(StatusCode::NoContent.as_u16(), 204);
    assert_eq!(StatusCode::BadRequest.as_u16(), 400);
    assert_eq!(StatusCode::Unauthorized.as_u16(), 401);
    assert_eq!(StatusCode::Forbidden.as_u16(), 403);
    assert_eq!(StatusCode::NotFound.as_u16(), 404);
    assert_eq!(StatusCode::MethodNotAllowed.as_u16(), 405);
    assert_eq!(StatusCode::InternalServerError.as_u16(), 500);
    assert_eq!(StatusCode::NotImplemented.as_u16(), 501);
    assert_eq!(StatusCode::ServiceUnavailable.as_u16(), 503);
}

#[test]
fn test_status_code_reason_phrase() {
    assert_eq!(StatusCode::Ok.reason_phrase(), "OK");
    assert_eq!(StatusCode::Unauthorized.reason_phrase(), "Unauthorized");
    assert_eq!(
        StatusCode::MethodNotAllowed.reason_phrase(),
        "Method Not Allowed"
    );
    assert_eq!(
        StatusCode::InternalServerError.reason_phrase(),
        "Internal Server Error"
    );
    assert_eq!(
        StatusCode::ServiceUnavailable.reason_phrase(),
        "Service Unavailable"
    );
}

#[test]
fn test_response_builder_with_headers() {
    let response = ResponseBuilder::new(StatusCode::Ok)
        .header("Content-Type", "text/plain")
        .header("X-Custom", "value")
        .body(b"test".to_vec())
        .build();

    assert_eq!(response.header("content-type"), Some("text/plain"));
    assert_eq!(response.header("X-Custom"), Some("value"));
    assert_eq!(response.content_length(), 4);
}

#[test]
fn test_response_json() {
    let response = Response::json(StatusCode::Created, &serde_json::json!({ "id": 1 })).unwrap();

    assert_eq!(response.status, StatusCode::Created);
    assert_eq!(response.header("Content-Type"), Some("application/json"));
    assert_eq!(response.body, br#"{"id":1}"#.to_vec());
}

#[test]
fn test_serialize_response_framing() {
    let response = Response::ok("hello");
    let bytes = serialize_response(&response);
    let text = String::from_utf8(bytes).unwrap();

    assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(text.contains("Content-Length: 5\r\n"));
    assert!(text.contains("Connection: close\r\n"));
    assert!(text.ends_with("\r\n\r\nhello"));
}

#[test]
fn test_serialize_response_overrides_framing_headers() {
    let response = ResponseBuilder::new(StatusCode::NotFound)
        .header("Content-Length", "999")
        .header("Connection", "keep-alive")
        .body("gone")
        .build();
    let text = String::from_utf8(serialize_response(&response)).unwrap();

    assert!(text.starts_with("HTTP/1.1 404 Not Found\r\n"));
    assert!(!text.contains("999"));
    assert!(!text.contains("keep-alive"));
    assert_eq!(text.matches("Content-Length:").count(), 1);
    assert!(text.contains("Content-Length: 4\r\n"));
}

#[test]
fn test_serialize_empty_body() {
    let response = ResponseBuilder::new(StatusCode::NoContent).build();
    let text = String::from_utf8(serialize_response(&response)).unwrap();

    assert!(text.contains("Content-Length: 0\r\n"));
    assert!(text.ends_with("\r\n\r\n"));
}

#[tokio::test]
async fn test_write_response_to_stream() {
    let (mut client, mut server) = tokio::io::duplex(1024);
    let response = Response::ok("pong");

    write_response(&mut server, &response, false).await.unwrap();
    drop(server);

    let mut received = Vec::new();
    tokio::io::AsyncReadExt::read_to_end(&mut client, &mut received)
        .await
        .unwrap();
    assert_eq!(received, serialize_response(&response));
}

#[test]
fn test_serialize_head_response_keeps_length() {
    let response = ResponseBuilder::new(StatusCode::Ok)
        .header("Content-Type", "text/html; charset=utf-8")
        .body("<html></html>")
        .build();
    let text = String::from_utf8(serialize_head_response(&response)).unwrap();

    assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(text.contains("Content-Length: 13\r\n"));
    assert!(text.ends_with("\r\n\r\n"));
    assert!(!text.contains("<html>"));
}

#[tokio::test]
async fn test_write_head_response_to_stream() {
    let (mut client, mut server) = tokio::io::duplex(1024);
    let response = Response::ok("pong");

    write_response(&mut server, &response, true).await.unwrap();
    drop(server);

    let mut received = Vec::new();
    tokio::io::AsyncReadExt::read_to_end(&mut client, &mut received)
        .await
        .unwrap();
    assert_eq!(received, serialize_head_response(&response));
    assert!(!received.ends_with(b"pong"));
}
