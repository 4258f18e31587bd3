use anyhow::Result;
use fleet_common::Dashboard;
use tokio::signal;

mod monitor_logic;
use monitor_logic::{config, logger, render};

async fn shutdown_signal() {
    tokio::select! {
        _ = signal::ctrl_c() => {
            log::info!("Ctrl-C received, initiating shutdown.");
        }
        _ = async {
            #[cfg(unix)]
            {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut term_signal) => {
                        term_signal.recv().await;
                        log::info!("SIGTERM received, initiating shutdown.");
                    }
                    Err(e) => {
                        log::warn!("Cannot listen for SIGTERM: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            }
            #[cfg(not(unix))]
            {
                // On non-unix platforms, just wait forever.
                std::future::pending::<()>().await;
            }
        } => {}
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let config = config::load_config()?;
    logger::setup_logging(&config.log_dir(), config.log_level())?;

    let dashboard = Dashboard::new(config.sync_config()?);
    dashboard.set_criteria(config.criteria()?);
    log::info!(
        "Fleet monitor starting: api {} channel {}",
        dashboard.config().endpoints.robots_url(),
        dashboard.config().endpoints.channel_url()
    );

    let mut view = dashboard.view();
    let mounted = dashboard.mount()?;
    let mut connection = mounted.watch_connection();

    render::follow(&mut view, &mut connection, shutdown_signal(), render::print_view).await;

    mounted.unmount().await;

    log::info!("Shutdown complete.");
    Ok(())
}
