use forge::app::App;
use forge::config::Config;
use forge::server::Server;
use forge::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = Config::load()?;
    let level: tracing::Level = cfg.log_level.parse()?;

    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_max_level(level)
        .init();

    let app = App::new(AppState::in_memory(cfg))?;
    let server = Server::bind(app).await?;

    tokio::select! {
        res = server.run() => {
            res?;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
