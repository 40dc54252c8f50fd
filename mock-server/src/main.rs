use mock_server::Settings;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let defaults = Settings::default();
    let settings = Settings {
        username: std::env::var("APOLEARN_ADMIN_USER").unwrap_or(defaults.username),
        password: std::env::var("APOLEARN_ADMIN_PASSWORD").unwrap_or(defaults.password),
        api_key: match std::env::var("APOLEARN_API_KEY") {
            Ok(key) if key.is_empty() => None,
            Ok(key) => Some(key),
            Err(_) => defaults.api_key,
        },
    };

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "mock apolearn server listening");
    mock_server::run_with(listener, settings).await
}
