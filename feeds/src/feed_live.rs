use anyhow::Result;
use lib_feed::projection::ConsoleSink;
use lib_feed::FeedSession;
use tokio::signal;
use tokio_util::sync::CancellationToken;

mod feed_logic;
use feed_logic::{config, logger};

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
    let (config, notes) = config::load_config();
    logger::setup_logging(&config.log_dir(), config.log_level())?;
    for (level, note) in notes {
        log::log!(level, "{}", note);
    }

    let session_config = config.session_config();
    log::info!("{}", session_config);

    let sink = ConsoleSink::stdout(session_config.base_url.clone());
    let mut session = FeedSession::from_config(&session_config, sink)?;

    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        trigger.cancel();
    });

    session.run(&shutdown).await;

    let stats = session.transport().stats();
    log::info!(
        "Shutdown complete. {} records held, {} received live, {} confirmed, {} messages ignored.",
        session.store().len(),
        stats.records_added,
        stats.confirmations,
        stats.violations
    );
    Ok(())
}
