//! # Echo Server Entry Point
//!
//! 1. **Initialization**: Resolves the [`config::Config`] and sets up logging.
//! 2. **Schema**: Loads the descriptor set used to transcode echo messages, either from
//!    `--descriptor-set` or the one embedded by `echo-service`.
//! 3. **Serving**: Registers the echo service (and, unless disabled, the reflection service) on a
//!    `tonic` server, with TLS when a certificate and key are configured, until Ctrl-C.
mod config;

use anyhow::Context;
use config::Config;
use echo_core::{DescriptorCodec, Dispatcher};
use echo_server::EchoServer;
use echo_service::FILE_DESCRIPTOR_SET;
use std::process;
use tonic::transport::{Identity, Server, ServerTlsConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = Config::load()?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let descriptor_set = match &config.descriptor_set {
        Some(path) => std::fs::read(path)
            .with_context(|| format!("Failed to read descriptor set '{}'", path.display()))?,
        None => FILE_DESCRIPTOR_SET.to_vec(),
    };

    let codec = DescriptorCodec::from_file_descriptor_set(&descriptor_set)
        .context("Failed to decode descriptor set")?;

    // Fail at startup rather than on the first call if the schemas are missing.
    codec.message_descriptor(&config.echo.request_schema)?;
    codec.message_descriptor(&config.echo.response_schema)?;

    let dispatcher = Dispatcher::new(codec, config.echo.clone());
    let echo = EchoServer::new(dispatcher);

    let reflection = if config.reflection {
        let service = tonic_reflection::server::Builder::configure()
            .register_encoded_file_descriptor_set(&descriptor_set)
            .build_v1()
            .context("Failed to build the reflection service")?;
        Some(service)
    } else {
        None
    };

    let mut builder = Server::builder();

    if let Some(tls) = &config.tls {
        let cert = std::fs::read_to_string(&tls.cert)
            .with_context(|| format!("Failed to read certificate '{}'", tls.cert.display()))?;
        let key = std::fs::read_to_string(&tls.key)
            .with_context(|| format!("Failed to read key '{}'", tls.key.display()))?;

        builder = builder
            .tls_config(ServerTlsConfig::new().identity(Identity::from_pem(cert, key)))
            .context("Invalid TLS configuration")?;
    }

    info!(
        listen = %config.listen,
        tls = config.tls.is_some(),
        reflection = config.reflection,
        unary = %config.echo.unary_path(),
        streaming = %config.echo.streaming_path(),
        version = env!("CARGO_PKG_VERSION"),
        "Server starting"
    );

    builder
        .add_service(echo)
        .add_optional_service(reflection)
        .serve_with_shutdown(config.listen, shutdown_signal())
        .await
        .context("Server failed")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutting down");
    }
}
