//! Large and incremental body streaming through the relay.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use futures_util::{stream, StreamExt};
use tokio::sync::Notify;

mod common;

const CHUNK: usize = 64 * 1024;
const CHUNKS: usize = 800;

fn chunk(i: usize) -> Bytes {
    Bytes::from(vec![(i % 251) as u8; CHUNK])
}

/// Check that `data` is exactly the chunk sequence produced by [`chunk`].
fn assert_chunk_sequence(data: &[u8]) {
    assert_eq!(data.len(), CHUNK * CHUNKS);
    for (i, piece) in data.chunks(CHUNK).enumerate() {
        let expected = (i % 251) as u8;
        assert!(
            piece.iter().all(|&b| b == expected),
            "chunk {i} arrived out of order or corrupted"
        );
    }
}

#[tokio::test]
async fn test_large_response_is_relayed_intact() {
    let backend = common::start_backend(Router::new().route(
        "/blob",
        get(|| async {
            let chunks = stream::iter((0..CHUNKS).map(|i| Ok::<_, std::io::Error>(chunk(i))));
            Body::from_stream(chunks)
        }),
    ))
    .await;
    let (relay, shutdown) =
        common::start_relay(common::relay_config(&[("blob", format!("http://{backend}"))])).await;

    let res = common::client().get(format!("http://{relay}/blob/blob")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let mut received = Vec::with_capacity(CHUNK * CHUNKS);
    let mut body = res.bytes_stream();
    while let Some(piece) = body.next().await {
        received.extend_from_slice(&piece.unwrap());
    }
    assert_chunk_sequence(&received);

    shutdown.trigger();
}

#[tokio::test]
async fn test_large_upload_is_relayed_intact() {
    let backend = common::start_backend(Router::new().route(
        "/sink",
        post(|body: Body| async move {
            let mut total = 0usize;
            let mut stream = body.into_data_stream();
            let mut index = 0usize;
            let mut ok = true;
            while let Some(piece) = stream.next().await {
                let piece = piece.unwrap();
                for &b in piece.iter() {
                    ok &= b == (index / CHUNK % 251) as u8;
                    index += 1;
                }
                total += piece.len();
            }
            format!("{total}:{ok}")
        }),
    ))
    .await;
    let (relay, shutdown) =
        common::start_relay(common::relay_config(&[("sink", format!("http://{backend}"))])).await;

    let upload = stream::iter((0..CHUNKS).map(|i| Ok::<_, std::io::Error>(chunk(i))));
    let res = common::client()
        .post(format!("http://{relay}/sink/sink"))
        .body(reqwest::Body::wrap_stream(upload))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), format!("{}:true", CHUNK * CHUNKS));

    shutdown.trigger();
}

#[tokio::test]
async fn test_first_chunk_arrives_before_backend_finishes() {
    let release = Arc::new(Notify::new());
    let gate = release.clone();

    let backend = common::start_backend(Router::new().route(
        "/gated",
        get(move || {
            let gate = gate.clone();
            async move {
                let head = stream::once(async { Ok::<_, std::io::Error>(Bytes::from_static(b"head;")) });
                let tail = stream::once(async move {
                    gate.notified().await;
                    Ok::<_, std::io::Error>(Bytes::from_static(b"tail"))
                });
                Body::from_stream(head.chain(tail))
            }
        }),
    ))
    .await;
    let (relay, shutdown) =
        common::start_relay(common::relay_config(&[("gated", format!("http://{backend}"))])).await;

    let res = common::client().get(format!("http://{relay}/gated/gated")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let mut body = res.bytes_stream();
    let first = tokio::time::timeout(Duration::from_secs(5), body.next())
        .await
        .expect("first chunk should not wait for the rest of the body")
        .unwrap()
        .unwrap();
    assert_eq!(&first[..], b"head;");

    release.notify_one();
    let mut rest = Vec::new();
    while let Some(piece) = body.next().await {
        rest.extend_from_slice(&piece.unwrap());
    }
    assert_eq!(&rest[..], b"tail");

    shutdown.trigger();
}
