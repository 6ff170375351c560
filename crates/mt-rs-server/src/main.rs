mod auth_store;
mod config;
mod connection;
mod env;
mod modchannel;
mod outbound;
mod permissions;
mod pool;
mod rollback;
mod session;
mod transport;

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use auth_store::{AuthStore, AUTH_FILE};
use config::ServerConfig;
use connection::ConnectionHandler;
use mt_rs_script_api::{HookChain, NoopHooks};
use permissions::BanManager;
use pool::{Job, WorkerPool};
use tracing::{error, info};
use transport::{TransportEvent, UdpTransport};

const CONFIG_FILE: &str = "server.toml";

fn exit_with(message: impl std::fmt::Display) -> ! {
    eprintln!("{message}");
    std::process::exit(1);
}

#[tokio::main]
async fn main() {
    let config = if Path::new(CONFIG_FILE).exists() {
        match ServerConfig::load(CONFIG_FILE) {
            Ok(c) => c,
            Err(e) => exit_with(format!("Failed to load {CONFIG_FILE}: {e}")),
        }
    } else {
        ServerConfig::default()
    };
    let config = Arc::new(config);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let server = &config.server;
    info!(
        "mt-rs server v{} starting on {}:{}",
        env!("CARGO_PKG_VERSION"),
        server.address,
        server.port
    );
    info!(
        "Max users: {}, singleplayer: {}, anti-cheat: {}",
        server.max_users,
        server.singleplayer,
        server.anticheat_enabled()
    );
    info!("Map seed: {}", server.map_seed);

    let auth = match AuthStore::load(
        &server.data_path(AUTH_FILE),
        server.default_privs.clone(),
        &server.name,
    ) {
        Ok(store) => store,
        Err(e) => exit_with(format!("Failed to load auth store: {e}")),
    };
    let bans = BanManager::load(Path::new(&server.data_dir));

    let addr: SocketAddr = match format!("{}:{}", server.address, server.port).parse() {
        Ok(addr) => addr,
        Err(e) => exit_with(format!("Invalid bind address: {e}")),
    };
    let (mut transport, mut events, transport_handle) = match UdpTransport::bind(addr).await {
        Ok(bound) => bound,
        Err(e) => exit_with(format!("Failed to bind {addr}: {e}")),
    };

    let mut hooks = HookChain::new();
    hooks.push(Box::new(NoopHooks));
    let handler = Arc::new(ConnectionHandler::new(
        config.clone(),
        auth,
        bans,
        hooks,
        Arc::new(transport_handle),
    ));
    let pool = WorkerPool::start(server.worker_threads, handler.clone());

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let transport_task = tokio::spawn(async move {
        transport.run(shutdown_rx).await;
    });

    let mut sweep_interval = tokio::time::interval(Duration::from_secs(1));
    let mut step_interval =
        tokio::time::interval(Duration::from_millis(config.timeouts.step_interval_ms.max(1)));
    let mut last_step = Instant::now();

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Some(TransportEvent::Packet { addr, opcode, payload }) => {
                        let handle = handler.peer_seen(addr);
                        pool.submit(Job::Packet { handle, opcode, payload }).await;
                    }
                    Some(TransportEvent::Ping { addr }) => {
                        handler.peer_seen(addr);
                    }
                    Some(TransportEvent::Disconnected { addr }) => {
                        if let Some(handle) = handler.find_session(&addr) {
                            pool.submit(Job::Disconnect { handle, timed_out: false }).await;
                        }
                    }
                    None => {
                        error!("Transport closed");
                        break;
                    }
                }
            }
            _ = sweep_interval.tick() => {
                for job in handler.sweep(Instant::now()) {
                    pool.submit(job).await;
                }
            }
            _ = step_interval.tick() => {
                let now = Instant::now();
                handler.step(now.duration_since(last_step).as_secs_f32());
                last_step = now;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    pool.shutdown().await;
    handler.shutdown();
    let _ = shutdown_tx.send(true);
    let _ = transport_task.await;
    info!("Server shut down.");
}
