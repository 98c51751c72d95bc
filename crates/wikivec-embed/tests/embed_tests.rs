use httpmock::prelude::*;
use wikivec_core::config::EmbeddingConfig;
use wikivec_core::error::Error;
use wikivec_core::traits::Embedder;
use wikivec_core::types::Language;
use wikivec_embed::{HashEmbedder, HttpEmbedder};

fn cfg_for(server: &MockServer, dim: usize) -> EmbeddingConfig {
    EmbeddingConfig {
        endpoint: server.base_url(),
        model: "nomic-embed-text".to_string(),
        dim,
        timeout_secs: 5,
    }
}

#[tokio::test]
async fn http_embedder_normalizes_service_vector() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/embeddings")
            .json_body_partial(r#"{"model": "nomic-embed-text"}"#);
        then.status(200).json_body(serde_json::json!({
            "embedding": [3.0, 0.0, 4.0, 0.0]
        }));
    });

    let embedder = HttpEmbedder::new(&cfg_for(&server, 4)).expect("client");
    let v = embedder.embed("hello", Language::En).await.expect("embed");
    mock.assert();

    assert_eq!(v.len(), 4);
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() < 1e-5, "vector must be unit length");
    assert!((v[0] - 0.6).abs() < 1e-5);
    assert!((v[2] - 0.8).abs() < 1e-5);
}

#[tokio::test]
async fn http_embedder_reports_dimension_mismatch() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/embeddings");
        then.status(200)
            .json_body(serde_json::json!({ "embedding": [1.0, 2.0] }));
    });

    let embedder = HttpEmbedder::new(&cfg_for(&server, 4)).expect("client");
    match embedder.embed("hello", Language::En).await {
        Err(Error::DimensionMismatch { expected, actual }) => {
            assert_eq!(expected, 4);
            assert_eq!(actual, 2);
        }
        other => panic!("expected DimensionMismatch, got {other:?}"),
    }
}

#[tokio::test]
async fn http_embedder_maps_server_errors_to_unavailable() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/embeddings");
        then.status(503);
    });

    let embedder = HttpEmbedder::new(&cfg_for(&server, 4)).expect("client");
    match embedder.embed("hello", Language::En).await {
        Err(Error::EmbeddingUnavailable(_)) => {}
        other => panic!("expected EmbeddingUnavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn hash_embedder_is_deterministic_and_unit_length() {
    let embedder = HashEmbedder::new(64);
    let a = embedder
        .embed("grove vision ai module", Language::En)
        .await
        .expect("embed");
    let b = embedder
        .embed("grove vision ai module", Language::En)
        .await
        .expect("embed");
    let c = embedder
        .embed("completely different page", Language::En)
        .await
        .expect("embed");

    assert_eq!(a, b, "same text must embed identically across calls");
    assert_ne!(a, c);
    let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() < 1e-4);
}
