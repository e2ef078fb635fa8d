//! xray-mcp server binary
//!
//! Composition root: read credentials from the environment, build one
//! transport / auth manager / GraphQL client / resolver, and run the
//! stdio JSON-RPC loop. stdout is protocol-only; logs go to stderr.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use xray_mcp::{server, HttpTransport, ToolContext, Transport, XrayConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("xray_mcp=info".parse().expect("valid directive")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config = XrayConfig::from_process_env().context("loading Xray credentials")?;
    info!(base_url = %config.base_url, "starting xray-mcp");

    let transport = Arc::new(Transport::Http(
        HttpTransport::new().context("building HTTP client")?,
    ));
    let ctx = ToolContext::new(config, transport);

    server::run(ctx).await.context("stdio loop failed")?;
    Ok(())
}
