//! Entry point: starts the Firestore gRPC server and the Identity
//! Toolkit HTTP server side by side, sharing nothing but their `Config`.

use std::sync::Arc;

use firestore_emulator::auth_emulator::{self, UserStore};
use firestore_emulator::config::Config;
use firestore_emulator::pb::firestore_server::FirestoreServer;
use firestore_emulator::store::Store;
use firestore_emulator::FirestoreService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env();
    Config::init(config.clone());
    let config = Arc::new(config);

    let firestore_addr = config.bind_addr().parse()?;
    let auth_addr = config.auth_bind_addr().parse()?;

    let firestore_service = FirestoreService::new(Arc::new(Store::new()), config.clone());
    let grpc_server = tonic::transport::Server::builder()
        .add_service(FirestoreServer::new(firestore_service))
        .serve(firestore_addr);

    let auth_router = auth_emulator::router(Arc::new(UserStore::new()));
    let auth_listener = tokio::net::TcpListener::bind(auth_addr).await?;
    let auth_server = axum::serve(auth_listener, auth_router);

    tracing::info!(
        firestore = %config.bind_addr(),
        auth = %config.auth_bind_addr(),
        "starting Firestore + Identity Toolkit emulators"
    );

    tokio::try_join!(
        async { grpc_server.await.map_err(Box::<dyn std::error::Error>::from) },
        async { auth_server.await.map_err(Box::<dyn std::error::Error>::from) },
    )?;

    Ok(())
}
