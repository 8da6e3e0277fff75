use tokio::net::TcpListener;

/// Serves the test endpoints on `127.0.0.1:$PORT` (default 3000) for manual
/// runs against the request engine.
#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    println!("mock endpoints on http://{addr} (echo, hello, status/{{code}}, hang, stall-body, bytes/{{len}}, binary, login, protected, basic, digest)");
    mock_server::run(listener).await
}
