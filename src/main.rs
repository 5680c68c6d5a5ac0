//! gatekeeperd - the gatekeeper HTTP daemon.

use anyhow::Context;
use gatekeeper::clock::{Clock, SystemClock};
use gatekeeper::config::validation::validate;
use gatekeeper::config::{Config, LogFormat};
use gatekeeper::db::Database;
use gatekeeper::http::{self, AppState};
use gatekeeper::identity::{DatabaseVerifier, IdentityVerifier, RootAccount};
use gatekeeper::login::LoginService;
use gatekeeper::metrics;
use gatekeeper::permission::PermissionResolver;
use gatekeeper::store::{MemoryStore, RedbStore, RevocationStore, SqliteStore};
use gatekeeper::telemetry::spans;
use gatekeeper::token::{HmacCodec, TokenAuthority};
use std::sync::Arc;
use std::time::Duration;
use tracing::{Instrument, error, info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

/// Open the configured revocation backend. `None` disables revocation.
fn open_store(
    config: &Config,
    db: &Database,
    clock: Arc<dyn Clock>,
) -> anyhow::Result<Option<Arc<dyn RevocationStore>>> {
    let store: Arc<dyn RevocationStore> = match config.jwt.store.as_str() {
        "memory" => Arc::new(MemoryStore::new(clock)),
        "sqlite" => Arc::new(SqliteStore::new(db.pool().clone(), clock)),
        "redb" => {
            let path = config
                .jwt
                .store_path
                .as_deref()
                .context("jwt.store_path is required for the redb store")?;
            Arc::new(RedbStore::open(path, clock).context("failed to open redb store")?)
        }
        "none" => {
            warn!("Revocation disabled: destroyed tokens stay valid until they expire");
            return Ok(None);
        }
        other => anyhow::bail!("unknown revocation store '{other}'"),
    };
    info!(backend = %config.jwt.store, "Revocation store opened");
    Ok(Some(store))
}

fn spawn_purge_task(tokens: Arc<TokenAuthority>, backend: String, every: Duration) {
    tokio::spawn(
        async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                match tokens.purge_revoked().await {
                    Ok(removed) if removed > 0 => {
                        info!(removed, "Expired revocations purged");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "Failed to purge expired revocations");
                    }
                }
            }
        }
        .instrument(spans::purge(&backend)),
    );
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {config_path}"))?;

    init_tracing(config.server.log_format);
    info!(path = %config_path, listen = %config.server.listen, "Starting gatekeeperd");

    if let Err(errors) = validate(&config) {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        anyhow::bail!("configuration has {} error(s)", errors.len());
    }

    // Refuse the well-known development key.
    if config.jwt.uses_insecure_key() {
        if std::env::var("GATEKEEPER_ALLOW_INSECURE_KEY").is_ok() {
            warn!("INSECURE: running with the default signing key (allowed via GATEKEEPER_ALLOW_INSECURE_KEY)");
        } else {
            error!("FATAL: jwt.signing_key is the well-known default.");
            error!("  Anyone can mint tokens for any subject with it.");
            error!("  Set a strong key in config.toml:");
            error!("    [jwt]");
            error!("    signing_key = \"<random-64-char-string>\"");
            error!("  For testing only, set GATEKEEPER_ALLOW_INSECURE_KEY=1 to bypass this check.");
            anyhow::bail!("refusing to start with the default signing key");
        }
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let db = Arc::new(Database::new(&config.database.path).await?);
    let root = Arc::new(RootAccount::new(
        config.root.user_name.clone(),
        config.root.password.clone(),
        config.root.real_name.clone(),
    ));

    let codec = HmacCodec::from_method(&config.jwt.signing_method, config.jwt.signing_key.as_bytes())
        .context("invalid signing configuration")?;
    let mut authority = TokenAuthority::new(Arc::new(codec), clock.clone())
        .with_expiry(config.jwt.expired)
        .with_token_type(config.jwt.token_type.clone())
        .with_store_timeout(config.timeouts.store());
    if let Some(store) = open_store(&config, &db, clock.clone())? {
        authority = authority.with_store(store);
    }
    let tokens = Arc::new(authority);

    let identity = IdentityVerifier::new(root.clone(), Arc::new(DatabaseVerifier::new(db.clone())))
        .with_timeout(config.timeouts.identity());
    let resolver =
        PermissionResolver::new(db.clone(), root.clone()).with_timeout(config.timeouts.graph());
    let login = LoginService::new(identity, tokens.clone(), resolver, db.clone(), db, root)
        .with_default_view(config.jwt.default_view.clone())
        .with_timeout(config.timeouts.graph());

    if config.server.metrics {
        metrics::init();
    }
    if tokens.has_store() && config.jwt.purge_interval > 0 {
        spawn_purge_task(
            tokens.clone(),
            config.jwt.store.clone(),
            Duration::from_secs(config.jwt.purge_interval),
        );
    }

    let app = http::router(
        AppState {
            login: Arc::new(login),
        },
        config.server.metrics,
    );
    let listener = tokio::net::TcpListener::bind(config.server.listen)
        .await
        .with_context(|| format!("failed to bind {}", config.server.listen))?;

    let served = http::serve(listener, app, shutdown_signal()).await;

    if let Err(e) = tokens.release().await {
        warn!(error = %e, "Failed to release revocation store");
    }
    served?;
    info!("gatekeeperd stopped");
    Ok(())
}
