use std::process::ExitCode;
use std::sync::Arc;

use tracing::error;
use tracing_subscriber::EnvFilter;

use tidekv::config::{Role, ServerConfig};
use tidekv::rdb::load_rdb_file;
use tidekv::replication::follower;
use tidekv::server::{self, ServerContext};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match ServerConfig::from_args(std::env::args()) {
        Ok(config) => config,
        Err(error) => {
            error!(%error, "invalid command line arguments");
            return ExitCode::FAILURE;
        }
    };

    let context = ServerContext::new(config);

    {
        let mut strings = context.strings.lock().await;
        if let Err(error) = load_rdb_file(&context.config.rdb_path(), &mut strings).await {
            error!(%error, "failed to load RDB file");
            return ExitCode::FAILURE;
        }
    }

    if let Role::Follower { host, port } = context.config.role.clone() {
        let follower_context = Arc::clone(&context);

        tokio::spawn(async move {
            if let Err(error) = follower::run(follower_context, &host, port).await {
                error!(%error, "replication client terminated");
            }
        });
    }

    if let Err(error) = server::run(context).await {
        error!(%error, "server terminated");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
