use crate::api::routes;
use crate::config::Shared;
use crate::visitor_store::DynVisitorStore;
use std::future::Future;
use std::net::SocketAddr;

#[derive(Clone)]
pub(super) struct AppState {
    pub config: Shared,
    pub visitor_store: DynVisitorStore,
}

/// Serve the lookup API on [`Config::api_bind_addr`][`crate::config::Config::api_bind_addr`].
pub fn new(
    config: Shared,
    visitor_store: DynVisitorStore,
) -> impl Future<Output = hyper::Result<()>> {
    axum::Server::bind(&config.api_bind_addr).serve(
        routes::new(AppState {
            config,
            visitor_store,
        })
        .into_make_service_with_connect_info::<SocketAddr>(),
    )
}
