//! Shared utilities for integration testing.

#![allow(dead_code)]

use switchyard::routing::Router;
use switchyard::{Server, ServerConfig};

/// Config bound to an ephemeral port on localhost.
pub fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.listener.port = 0;
    config
}

/// Start a server with routes registered by `routes`.
pub async fn start_server<F>(config: ServerConfig, routes: F) -> Server
where
    F: FnOnce(&mut Router),
{
    let mut server = Server::new(config);
    routes(server.router_mut());
    server.start().await.expect("server should start");
    server
}

/// Client without pooling or proxies, so tests do not interfere.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .expect("client should build")
}
