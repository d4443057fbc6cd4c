use tracing_subscriber::EnvFilter;

use crate::config::Environment;

/// Installs the global subscriber: JSON lines in production, human-readable output
/// otherwise. `RUST_LOG` takes precedence over `level`.
pub fn init(environment: Environment, level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{level},sqlx=warn,hyper=info")));

    let result = match environment {
        Environment::Prod => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .try_init(),
        Environment::Dev => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init(),
    };

    if let Err(err) = result {
        eprintln!("logging already initialised: {err}");
    }
}
