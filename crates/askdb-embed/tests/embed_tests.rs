use askdb_core::config::Config;
use askdb_embed::{
    default_embedder, EmbeddingProviderConfig, HttpEmbedder, FAKE_EMBEDDING_DIM,
};

#[tokio::test]
async fn env_toggle_selects_the_hash_embedder() {
    // Force the fake embedder so no network, key, or config section is
    // needed.
    std::env::set_var("APP_USE_FAKE_EMBEDDINGS", "1");

    let config = Config::load().expect("config");
    let embedder = default_embedder(&config).expect("embedder");
    assert_eq!(embedder.dim(), FAKE_EMBEDDING_DIM);

    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_batch(&texts).await.expect("embed_batch");
    assert_eq!(embs.len(), 2);
    assert_eq!(embs[0].len(), FAKE_EMBEDDING_DIM);

    let norm: f32 = embs[0].iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");

    for (a, b) in embs[0].iter().zip(embs[1].iter()) {
        assert!((a - b).abs() <= 1e-6, "same input embeds identically");
    }

    std::env::remove_var("APP_USE_FAKE_EMBEDDINGS");

    // Without the toggle the real provider section is required, and
    // this process has none configured.
    assert!(default_embedder(&config).is_err());
}

#[test]
fn provider_config_fills_in_endpoint_defaults() {
    let config: EmbeddingProviderConfig =
        serde_json::from_value(serde_json::json!({ "api_key": "sk-test" })).expect("config");
    assert_eq!(config.base_url, "https://api.openai.com/v1");
    assert_eq!(config.model, "text-embedding-3-large");
    assert_eq!(config.dim, 3072);
}

#[test]
fn provider_config_requires_an_api_key() {
    let parsed =
        serde_json::from_value::<EmbeddingProviderConfig>(serde_json::json!({ "model": "m" }));
    assert!(parsed.is_err(), "api_key has no default");
}

#[test]
fn http_embedder_rejects_an_empty_api_key() {
    let config: EmbeddingProviderConfig =
        serde_json::from_value(serde_json::json!({ "api_key": "" })).expect("config");
    assert!(HttpEmbedder::new(&config).is_err());
}
