use std::sync::Arc;

use model_file_server::config::{self, AppState, Config};
use model_file_server::storage::FsStore;
use model_file_server::{logger, server};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Optional config file stem as the only argument, e.g. `model-file-server backend`
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config::DEFAULT_CONFIG_PATH.to_string());
    let cfg = Config::load_from(&config_path)?;

    logger::init(&cfg)?;

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;

    let store = FsStore::from_config(&cfg.storage);
    store.ensure_dirs().await?;

    let listener = server::create_listener(addr)?;
    let state = Arc::new(AppState::with_store(&cfg, Arc::new(store)));

    logger::log_server_start(&listener.local_addr()?, &cfg);

    server::run(listener, state, server::shutdown_signal()).await;
    Ok(())
}
