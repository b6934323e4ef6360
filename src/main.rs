use axum::Router;
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use keygate::config::Config;
use keygate::db::{create_pool, init_audit_db, init_db, queries, AppState};
use keygate::handlers;
use keygate::models::CreateLicense;

#[derive(Parser, Debug)]
#[command(name = "keygate")]
#[command(about = "Device-binding license gate: one license, one device, one owner")]
struct Cli {
    /// Seed the database with dev licenses (dev mode only)
    #[arg(long)]
    seed: bool,

    /// Delete databases on exit (dev mode only, useful for fresh starts)
    #[arg(long)]
    ephemeral: bool,
}

/// Seeds a handful of dev licenses so the gate can be exercised without a
/// provisioning backend. Only runs in dev mode and when the table is empty.
fn seed_dev_licenses(state: &AppState, prefix: &str) {
    let conn = state.db.get().expect("Failed to get db connection for seeding");

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM licenses", [], |row| row.get(0))
        .expect("Failed to count licenses");
    if count > 0 {
        tracing::info!("Database already has licenses, skipping seed");
        return;
    }

    let timeboxed = format!("{}-30D-DEV001", prefix);
    let perpetual = format!("{}-PERP-DEV002", prefix);

    queries::create_license(&conn, &timeboxed, &CreateLicense::default())
        .expect("Failed to seed time-boxed license");
    queries::create_license(&conn, &perpetual, &CreateLicense::default())
        .expect("Failed to seed perpetual license");

    tracing::info!("============================================");
    tracing::info!("DEV LICENSES SEEDED");
    tracing::info!("  30-day key:    {}", timeboxed);
    tracing::info!("  perpetual key: {}", perpetual);
    tracing::info!("============================================");
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keygate=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    if config.dev_mode {
        tracing::info!("Running in DEVELOPMENT mode");
    }

    let db_pool = create_pool(&config.database_path).expect("Failed to create database pool");
    let audit_pool =
        create_pool(&config.audit_database_path).expect("Failed to create audit database pool");

    {
        let conn = db_pool.get().expect("Failed to get connection");
        init_db(&conn).expect("Failed to initialize database");
    }
    {
        let conn = audit_pool.get().expect("Failed to get audit connection");
        init_audit_db(&conn).expect("Failed to initialize audit database");
    }

    let state = AppState {
        db: db_pool,
        audit: audit_pool,
        license_key_prefix: config.license_key_prefix.clone(),
        access_log_enabled: config.access_log_enabled,
    };

    if cli.seed {
        if !config.dev_mode {
            tracing::warn!("--seed flag ignored: not in dev mode (set KEYGATE_ENV=dev)");
        } else {
            seed_dev_licenses(&state, &config.license_key_prefix);
        }
    }

    let mut app = Router::new().merge(handlers::public::router(config.rate_limit));

    // Dev-only endpoints (only in dev mode)
    if config.dev_mode {
        use axum::routing::post;
        app = app.route("/dev/create-license", post(handlers::dev::create_dev_license));
        tracing::info!("DEV endpoints enabled: POST /dev/create-license");
    }

    let app = app.layer(TraceLayer::new_for_http()).with_state(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    let cleanup_on_exit = cli.ephemeral && config.dev_mode;
    let db_path = config.database_path.clone();
    let audit_path = config.audit_database_path.clone();

    if cleanup_on_exit {
        tracing::info!("EPHEMERAL MODE: databases will be deleted on exit");
    }

    tracing::info!("Keygate server listening on {}", addr);

    // Use into_make_service_with_connect_info to enable IP-based rate limiting
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Failed to start server");

    if cleanup_on_exit {
        tracing::info!("Cleaning up ephemeral databases...");
        for path in [&db_path, &audit_path] {
            if let Err(e) = std::fs::remove_file(path) {
                tracing::warn!("Failed to remove {}: {}", path, e);
            } else {
                tracing::info!("Removed {}", path);
            }
            // Also remove WAL and SHM files if they exist
            let _ = std::fs::remove_file(format!("{}-wal", path));
            let _ = std::fs::remove_file(format!("{}-shm", path));
        }
        tracing::info!("Ephemeral cleanup complete");
    }
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}
