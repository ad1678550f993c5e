use std::{
    io::ErrorKind,
    path::PathBuf,
    sync::{Arc, LazyLock, OnceLock},
    time::Duration,
};

use clap::Parser;
use rama::{
    Layer as _, Service,
    error::OpaqueError,
    http::{
        Body, Request, Response,
        client::EasyHttpWebClient,
        layer::{
            map_request_body::MapRequestBodyLayer, map_response_body::MapResponseBodyLayer,
            timeout::TimeoutLayer,
        },
    },
    layer::MapErrLayer,
    net::address::SocketAddress,
};
use tempfile::TempDir;

use crate::Args;

#[derive(Clone)]
pub(super) struct Runtime {
    _app: App,

    api_addr: SocketAddress,
}

impl Runtime {
    #[inline(always)]
    pub fn api_addr(&self) -> SocketAddress {
        self.api_addr
    }

    pub fn api_uri(&self, path: &str) -> String {
        format!("http://{}{path}", self.api_addr)
    }

    pub fn client(&self) -> impl Service<Request, Output = Response, Error = OpaqueError> {
        (
            MapResponseBodyLayer::new(Body::new),
            MapErrLayer::new(OpaqueError::from_std),
            TimeoutLayer::new(Duration::from_secs(30)),
            MapRequestBodyLayer::new(Body::new),
        )
            .into_layer(EasyHttpWebClient::default())
    }
}

#[derive(Clone)]
struct App {
    data_dir: Arc<TempDir>,
}

pub(super) async fn get() -> Runtime {
    static APP: LazyLock<App> = LazyLock::new(App::new);

    let app = APP.clone();

    let api_addr = tokio::time::timeout(
        Duration::from_secs(30),
        read_file_or_wait(app.data_dir.path().join("api.addr.txt")),
    )
    .await
    .unwrap();

    let runtime = Runtime {
        _app: app,
        api_addr,
    };

    assert!(runtime.api_addr().ip_addr.is_loopback());

    runtime
}

async fn read_file_or_wait(path: PathBuf) -> SocketAddress {
    loop {
        match tokio::fs::read_to_string(&path).await {
            Ok(s) => return s.parse().unwrap(),
            Err(err) => {
                if err.kind() == ErrorKind::NotFound {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    continue;
                } else {
                    panic!("unexpected error: {err}");
                }
            }
        }
    }
}

impl App {
    fn new() -> Self {
        let data_dir = Arc::new(spawn_endpoint_sim_app());
        Self { data_dir }
    }
}

fn spawn_endpoint_sim_app() -> TempDir {
    let data_dir = TempDir::with_prefix("endpoint_sim_app_e2e").unwrap();
    eprintln!(
        "endpoint_sim_app_e2e all data stored under: {:?}",
        data_dir.path()
    );

    let data_dir_str = data_dir.path().display().to_string().leak();

    let args = Args::try_parse_from([
        "endpoint-sim",
        "--bind",
        "127.0.0.1:0",
        "--data",
        data_dir_str,
        "--graceful",
        "0.42",
        "--seed",
        "42",
        // keep the e2e suite fast
        "--credit-analysis-latency-min-ms",
        "10",
        "--credit-analysis-latency-max-ms",
        "20",
    ])
    .unwrap();

    let wait_server_ready = Arc::new(OnceLock::new());
    let notify_server_ready = wait_server_ready.clone();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let server_future = crate::run_with_args(std::future::pending::<()>(), args);

        notify_server_ready.set(()).expect("waiter to be nofified");

        rt.block_on(server_future).expect("serve without errors");
    });

    wait_server_ready.wait();

    data_dir
}
