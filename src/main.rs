use paperslice::{api, config, logging, processing};
use std::net::Ipv4Addr;
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() {
    config::init_config();
    logging::init_tracing(false);
    let service = processing::PipelineService::from_config()
        .expect("Failed to initialize pipeline services");
    let app = api::create_router(Arc::new(service));

    let port = config::get_config().server_port;
    let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
        .await
        .expect("Failed to bind listener");
    tracing::info!("Listening on http://0.0.0.0:{}", port);
    if let Err(error) = axum::serve(listener, app).await {
        tracing::error!(error = %error, "Server terminated");
    }
}
