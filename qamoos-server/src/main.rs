use anyhow::Result;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let ax = qamoos_server::build()?;

    let host = ax
        .config
        .get_string("http.host")
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let port = ax
        .config
        .get_string("http.port")
        .unwrap_or_else(|| "5000".to_string());

    let addr = format!("{host}:{port}");
    tracing::info!(%addr, "qamoos starting");

    ax.listen(addr).await?;

    Ok(())
}
