use std::os::unix::fs::MetadataExt;
use std::sync::Arc;

use fuser::MountOption;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use photo_fs::{
    config::Config,
    fs::{PhotoFs, PhotoFuse},
    metadata::ExifExtractor,
    service::Service,
    views::ViewRegistry,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    match log_format.to_lowercase().as_str() {
        "gcp" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_stackdriver::layer())
                .init();
        }
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_span_list(false),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    info!(version = env!("CARGO_PKG_VERSION"), "photo-fs starting");

    let config = Config::load()?;
    info!(
        root = %config.root.display(),
        mount = %config.mount.display(),
        "Loaded configuration"
    );

    let service = Service::start(&config, Arc::new(ExifExtractor::new()))?;

    let views = ViewRegistry::new(service.db().clone(), &config.select_tag);
    let fs = Arc::new(PhotoFs::new(service.db().clone(), views)?);

    let owner = std::fs::metadata(&config.root)?;
    let filesystem = PhotoFuse::new(fs, owner.uid(), owner.gid());
    let options = [
        MountOption::FSName("photo-fs".to_string()),
        MountOption::DefaultPermissions,
    ];
    let session = fuser::spawn_mount2(filesystem, &config.mount, &options)?;
    info!(mount = %config.mount.display(), "Mounted");

    shutdown_signal().await;

    // Dropping the session unmounts
    drop(session);
    service.shutdown().await;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, unmounting");
}
