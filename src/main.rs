use aes67_ndi_gateway::http::HttpServer;
use aes67_ndi_gateway::ndi::NdiBackend;
use aes67_ndi_gateway::{GatewayEnv, Supervisor};
use log::{error, info};
use std::sync::Arc;

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    env_logger::init();

    let env = Arc::new(GatewayEnv::from_process_env());

    let ndi = match NdiBackend::load(env.ndi_lib.as_deref()) {
        Ok(backend) => Arc::new(backend),
        Err(e) => {
            error!("failed to load NDI SDK: {e}");
            std::process::exit(1);
        }
    };

    let supervisor = Arc::new(Supervisor::new(env.clone(), ndi));

    let mut server = match HttpServer::start(&env.http_addr, supervisor.clone()).await {
        Ok(server) => server,
        Err(e) => {
            error!("failed to start HTTP contract layer: {e}");
            std::process::exit(1);
        }
    };

    info!("aes67-ndi-gateway running, awaiting shutdown signal");
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {e}");
    }

    info!("shutting down");
    supervisor.stop().await;
    server.stop();
}
