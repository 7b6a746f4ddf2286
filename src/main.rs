use color_eyre::{eyre::eyre, Result};
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use voicepad::config::AppConfig;
use voicepad::controller::VirtualPad;
use voicepad::persistence::pick_profile;
use voicepad::session::SessionHandle;
use voicepad::speech;

#[tokio::main]
async fn main() -> Result<()> {
    let config = setup().await?;

    let store = config.profile_store();
    if store.ensure_default().await? {
        info!("Created starter profile in {}", store.dir().display());
    }

    let names = store.list_names().await?;
    let name = pick_profile(&names, config.active_profile.as_deref())
        .ok_or_else(|| eyre!("No profile found in {}", store.dir().display()))?;

    let loaded = store.load(name).await?;
    for rejected in &loaded.rejected {
        warn!("Skipping {}", rejected);
    }
    if loaded.profile.is_empty() {
        warn!("Profile '{}' has no usable mappings", name);
    }

    let (mut handle, text_tx, mut events) = SessionHandle::spawn(
        Arc::new(loaded.profile),
        Box::new(VirtualPad::new()),
        config.matching,
        config.session,
    )?;

    let _event_log = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            info!("{}", event);
        }
    });

    speech::spawn_stdin_source(text_tx)?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.map_err(|e| eyre!("Failed to listen for Ctrl-C: {}", e))?;
            info!("Ctrl-C received, stopping");
        }
        _ = handle.stopped() => {
            info!("Input ended, stopping");
        }
    }

    let report = handle.stop().await?;
    info!(
        "Profile '{}': {} received, {} matched, {} unmatched, {} ignored while paused, {} failed, {} timed releases, {} discarded ({:?})",
        report.profile,
        report.received,
        report.matched,
        report.unmatched,
        report.ignored_while_paused,
        report.failed,
        report.timer_releases,
        report.discarded_on_stop,
        report.exit_reason
    );
    Ok(())
}

async fn setup() -> Result<AppConfig> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;

    let config = AppConfig::load_or_default(&AppConfig::default_path()).await?;
    setup_logging_env(config.level());
    info!("Logging at {}", config.level());
    Ok(config)
}

fn setup_logging_env(level: Level) {
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
