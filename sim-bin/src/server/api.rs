use std::{convert::Infallible, sync::Arc};

use rama::{
    Layer, Service,
    error::{BoxError, ErrorContext},
    graceful::ShutdownGuard,
    http::{
        Body, HeaderValue, Request, Response,
        layer::{
            map_response_body::MapResponseBodyLayer,
            required_header::AddRequiredResponseHeadersLayer, trace::TraceLayer,
        },
        server::HttpServer,
    },
    rt::Executor,
    tcp::server::TcpListener,
    telemetry::tracing,
};

use endpoint_sim_lib::{
    engine::{ProcessRandom, RequestSimulator},
    http::api::{ApiState, api_svc},
    utils::env::server_identifier,
};

use crate::Args;

pub async fn run_api_server(
    args: Args,
    guard: ShutdownGuard,
    simulator: RequestSimulator<ProcessRandom>,
) -> Result<(), BoxError> {
    // pending delays are interrupted as soon as a shutdown is initiated
    let state = ApiState::new(simulator).with_shutdown(guard.downgrade());

    let http_svc = new_api_http_svc(state);

    let exec = Executor::graceful(guard.clone());
    let http_server = HttpServer::auto(exec.clone()).service(Arc::new(http_svc));

    let tcp_listener = TcpListener::bind(args.bind, exec)
        .await
        .context("bind api http server")?;

    let api_addr = tcp_listener
        .local_addr()
        .context("get bound address for api http server")?;

    tracing::info!("api http server bound to: {api_addr}");
    crate::server::write_server_socket_address_as_file(&args.data, "api", api_addr.into())
        .await?;

    // no connection or request deadline: a response takes as long as its simulated delay
    tcp_listener.serve(http_server).await;

    Ok(())
}

fn new_api_http_svc(
    state: ApiState,
) -> impl Service<Request, Output = Response, Error = Infallible> {
    (
        MapResponseBodyLayer::new(Body::new),
        TraceLayer::new_for_http(),
        AddRequiredResponseHeadersLayer::new()
            .with_server_header_value(HeaderValue::from_static(server_identifier())),
    )
        .into_layer(api_svc(state))
}
