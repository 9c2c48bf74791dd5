use forge::app::App;
use forge::config::Config;
use forge::http::request::Method;
use forge::http::response::Response;
use forge::router::Router;
use forge::server::Server;
use forge::state::AppState;
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

fn test_config() -> Config {
    let mut cfg = Config::default();
    cfg.server.listen_addr = "127.0.0.1:0".to_string();
    cfg.server.read_timeout_ms = 200;
    cfg
}

async fn start(app: App) -> SocketAddr {
    let server = Server::bind(app).await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.run());
    addr
}

async fn start_forge() -> SocketAddr {
    start(App::new(AppState::in_memory(test_config())).unwrap()).await
}

/// Sends raw bytes and reads until the server closes the connection.
async fn roundtrip(addr: SocketAddr, raw: &[u8]) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw).await.unwrap();

    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await.unwrap();
    String::from_utf8(buf).unwrap()
}

fn status_of(response: &str) -> u16 {
    response
        .split(' ')
        .nth(1)
        .and_then(|code| code.parse().ok())
        .unwrap()
}

fn header_of<'a>(response: &'a str, name: &str) -> Option<&'a str> {
    let head = response.split("\r\n\r\n").next()?;
    head.split("\r\n").skip(1).find_map(|line| {
        let (key, value) = line.split_once(": ")?;
        key.eq_ignore_ascii_case(name).then_some(value)
    })
}

fn body_of(response: &str) -> &str {
    response.split_once("\r\n\r\n").map(|(_, body)| body).unwrap_or("")
}

fn request(method: &str, path: &str, cookie: Option<&str>, body: &str) -> Vec<u8> {
    let mut raw = format!("{method} {path} HTTP/1.1\r\nHost: localhost\r\n");
    if let Some(token) = cookie {
        raw.push_str(&format!("Cookie: session={token}\r\n"));
    }
    if !body.is_empty() {
        raw.push_str("Content-Type: application/json\r\n");
        raw.push_str(&format!("Content-Length: {}\r\n", body.len()));
    }
    raw.push_str("\r\n");
    raw.push_str(body);
    raw.into_bytes()
}

#[tokio::test]
async fn test_login_session_logout_roundtrip() {
    let addr = start_forge().await;

    let login = roundtrip(
        addr,
        &request(
            "POST",
            "/api/login",
            None,
            r#"{"username":"admin","password":"password123"}"#,
        ),
    )
    .await;
    assert_eq!(status_of(&login), 200);
    assert_eq!(header_of(&login, "Connection"), Some("close"));
    assert_eq!(body_of(&login), r#"{"status":"success"}"#);

    let cookie = header_of(&login, "Set-Cookie").unwrap();
    let token = cookie
        .strip_prefix("session=")
        .and_then(|rest| rest.split(';').next())
        .unwrap()
        .to_string();

    let repos = roundtrip(addr, &request("GET", "/api/repos", Some(&token), "")).await;
    assert_eq!(status_of(&repos), 200);
    assert_eq!(body_of(&repos), "[]");
    assert_eq!(header_of(&repos, "Content-Length"), Some("2"));

    let logout = roundtrip(addr, &request("POST", "/api/logout", Some(&token), "")).await;
    assert_eq!(status_of(&logout), 200);
    assert!(header_of(&logout, "Set-Cookie").unwrap().contains("Max-Age=0"));

    let after = roundtrip(addr, &request("GET", "/api/repos", Some(&token), "")).await;
    assert_eq!(status_of(&after), 401);
}

#[tokio::test]
async fn test_unauthenticated_request_is_rejected() {
    let addr = start_forge().await;

    let response = roundtrip(addr, &request("GET", "/api/repos", None, "")).await;

    assert_eq!(status_of(&response), 401);
    assert_eq!(header_of(&response, "Content-Type"), Some("application/json"));
    assert!(body_of(&response).contains("\"error\":\"Unauthorized\""));
}

#[tokio::test]
async fn test_malformed_request_gets_400() {
    let addr = start_forge().await;

    let response = roundtrip(addr, b"BREW /pot HTTP/1.1\r\n\r\n").await;
    assert_eq!(status_of(&response), 400);

    let response = roundtrip(addr, b"GET / HTTP/1.1\r\nHost: x\r\n").await;
    assert_eq!(status_of(&response), 400);
}

#[tokio::test]
async fn test_empty_connection_gets_no_response() {
    let addr = start_forge().await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.shutdown().await.unwrap();

    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await.unwrap();
    assert!(buf.is_empty());
}

#[tokio::test]
async fn test_idle_connection_times_out() {
    let addr = start_forge().await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    let mut buf = Vec::new();
    let read = tokio::time::timeout(
        std::time::Duration::from_secs(5),
        stream.read_to_end(&mut buf),
    )
    .await;

    assert!(read.is_ok(), "server kept an idle connection open");
    assert!(buf.is_empty());
}

#[tokio::test]
async fn test_handler_panic_becomes_500() {
    let mut router = Router::new();
    router
        .route(Method::GET, "/panic", false, |_| -> forge::error::ApiResult<Response> {
            panic!("handler blew up")
        })
        .unwrap()
        .route(Method::GET, "/ok", false, |_| Ok(Response::ok("fine")))
        .unwrap();
    let app = App {
        router,
        state: AppState::in_memory(test_config()),
    };
    let addr = start(app).await;

    let response = roundtrip(addr, &request("GET", "/panic", None, "")).await;
    assert_eq!(status_of(&response), 500);
    assert!(!body_of(&response).contains("blew up"));

    // The server keeps serving.
    let response = roundtrip(addr, &request("GET", "/ok", None, "")).await;
    assert_eq!(status_of(&response), 200);
    assert_eq!(body_of(&response), "fine");
}

#[tokio::test]
async fn test_concurrent_clients() {
    let addr = start_forge().await;

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            tokio::spawn(async move {
                let response = roundtrip(addr, &request("GET", "/api/repos", None, "")).await;
                status_of(&response)
            })
        })
        .collect();

    for task in tasks {
        assert_eq!(task.await.unwrap(), 401);
    }
}

#[tokio::test]
async fn test_head_announces_get_length() {
    let root = std::env::temp_dir().join(format!("forge-server-head-{}", std::process::id()));
    std::fs::create_dir_all(&root).unwrap();
    std::fs::write(root.join("index.html"), "<html>forge</html>").unwrap();

    let mut cfg = test_config();
    cfg.static_files = Some(forge::config::StaticFilesConfig {
        root: root.clone(),
        index: "index.html".to_string(),
    });
    let addr = start(App::new(AppState::in_memory(cfg)).unwrap()).await;

    let get = roundtrip(addr, &request("GET", "/", None, "")).await;
    let head = roundtrip(addr, &request("HEAD", "/", None, "")).await;

    assert_eq!(status_of(&head), 200);
    assert_eq!(header_of(&head, "Content-Length"), Some("18"));
    assert_eq!(header_of(&head, "Content-Length"), header_of(&get, "Content-Length"));
    assert_eq!(body_of(&head), "");
    assert_eq!(body_of(&get), "<html>forge</html>");

    std::fs::remove_dir_all(&root).unwrap();
}
