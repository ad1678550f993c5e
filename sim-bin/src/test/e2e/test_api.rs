use rama::http::{
    BodyExtractExt as _, StatusCode, header::SERVER, service::client::HttpClientExt as _,
};
use tokio::task::JoinSet;

use crate::test::e2e;

#[tokio::test]
#[tracing_test::traced_test]
async fn test_endpoint_ping() {
    let runtime = e2e::runtime::get().await;

    let resp = runtime
        .client()
        .get(runtime.api_uri("/ping"))
        .send()
        .await
        .unwrap();

    assert_eq!(StatusCode::OK, resp.status());
    let server = resp.headers().get(SERVER).unwrap().to_str().unwrap();
    assert!(server.starts_with("endpoint-sim/"), "{server}");
    assert_eq!("pong", resp.try_into_string().await.unwrap());
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_endpoint_payments() {
    let runtime = e2e::runtime::get().await;

    let resp = runtime
        .client()
        .get(runtime.api_uri("/api/payments"))
        .send()
        .await
        .unwrap();

    assert_eq!(StatusCode::OK, resp.status());
    assert_eq!(
        "Payment processed successfully.",
        resp.try_into_string().await.unwrap()
    );
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_endpoint_credit_analysis() {
    let runtime = e2e::runtime::get().await;

    let resp = runtime
        .client()
        .get(runtime.api_uri("/api/credit-analysis"))
        .send()
        .await
        .unwrap();

    assert_eq!(StatusCode::OK, resp.status());
    assert_eq!(
        "Credit analysis completed.",
        resp.try_into_string().await.unwrap()
    );
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_endpoint_cashout() {
    let runtime = e2e::runtime::get().await;

    let mut requests = JoinSet::new();
    for _ in 0..20 {
        let client = runtime.client();
        let uri = runtime.api_uri("/api/cashout");
        requests.spawn(async move {
            let resp = client.get(uri).send().await.unwrap();
            let status = resp.status().as_u16();
            (status, resp.try_into_string().await.unwrap())
        });
    }

    while let Some(result) = requests.join_next().await {
        let (status, payload) = result.unwrap();
        match status {
            200 => assert_eq!("Cashout request successful.", payload),
            400 => assert_eq!("Cashout request rejected (simulated error 400).", payload),
            503 => assert_eq!(
                "Cashout service temporarily unavailable (simulated error 503).",
                payload
            ),
            status => panic!("unexpected status {status}: {payload}"),
        }
    }
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_endpoint_loan_request() {
    let runtime = e2e::runtime::get().await;

    let resp = runtime
        .client()
        .get(runtime.api_uri("/api/loan-request"))
        .send()
        .await
        .unwrap();

    assert_eq!(StatusCode::INTERNAL_SERVER_ERROR, resp.status());
    assert_eq!(
        "Failed to process loan request due to an internal error (simulated).",
        resp.try_into_string().await.unwrap()
    );
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_unknown_route() {
    let runtime = e2e::runtime::get().await;

    let resp = runtime
        .client()
        .get(runtime.api_uri("/api/transfers"))
        .send()
        .await
        .unwrap();

    assert_eq!(StatusCode::NOT_FOUND, resp.status());
}
