use dotenvy::dotenv;
use tracing::info;

use subscription_api::infra::{
    app::create_app, expiry::run_expiry_sweep_loop, setup::init_app_state,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let app_state = init_app_state().await?;

    let bind_addr = app_state.config.bind_addr;
    let sweep_secs = app_state.config.expiry_sweep_secs;

    let app = create_app(app_state.clone());

    // Spawn the expiry sweeper (after tracing is initialized)
    let subscription_use_cases = app_state.subscription_use_cases.clone();
    tokio::spawn(async move {
        run_expiry_sweep_loop(subscription_use_cases, sweep_secs).await;
    });

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    info!("Backend listening at {}", &listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
