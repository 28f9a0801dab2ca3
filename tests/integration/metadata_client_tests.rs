/*!
 * Integration tests for the HTTP metadata client
 */

use anyhow::Result;
use serde_json::json;
use wiremock::matchers::{bearer_token, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use screenwise::errors::PipelineError;
use screenwise::identifier::ImdbId;
use screenwise::metadata::{HttpMetadataClient, MetadataProvider};

use crate::common;

fn tangled_id() -> ImdbId {
    ImdbId::resolve(common::TANGLED_ID).unwrap()
}

#[tokio::test]
async fn test_fetch_withValidBody_shouldParseCamelCaseFields() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/movies/tt0398286"))
        .and(bearer_token("meta-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "title": "Tangled",
            "releaseYear": 2010,
            "runtimeMinutes": 100,
            "genres": ["Animation", "Musical"],
            "overview": "A long-haired princess leaves her tower.",
            "popularity": 87.5
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpMetadataClient::new(format!("{}/api/", server.uri()), Some("meta-key".to_string()), 5)?;
    let metadata = client.fetch(&tangled_id()).await?;

    assert_eq!(metadata.title, "Tangled");
    assert_eq!(metadata.release_year, Some(2010));
    assert_eq!(metadata.runtime_minutes, Some(100));
    assert_eq!(metadata.genres.len(), 2);

    let movie = metadata.to_new_movie(&tangled_id());
    assert_eq!(movie.imdb_id, "tt0398286");
    Ok(())
}

#[tokio::test]
async fn test_fetch_withMinimalBody_shouldDefaultOptionalFields() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/movies/tt0398286"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"title": "Tangled"})))
        .mount(&server)
        .await;

    let client = HttpMetadataClient::new(server.uri(), None, 5)?;
    let metadata = client.fetch(&tangled_id()).await?;
    assert_eq!(metadata.release_year, None);
    assert!(metadata.genres.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_fetch_failures_shouldBeMetadataUnavailable() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/movies/tt0000001"))
        .respond_with(ResponseTemplate::new(404).set_body_string("unknown title"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/movies/tt0000002"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/movies/tt0000003"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"title": "  "})))
        .mount(&server)
        .await;

    let client = HttpMetadataClient::new(server.uri(), None, 5)?;
    for raw in ["tt0000001", "tt0000002", "tt0000003"] {
        let result = client.fetch(&ImdbId::resolve(raw)?).await;
        assert!(
            matches!(result, Err(PipelineError::MetadataUnavailable(_))),
            "{}: {:?}",
            raw,
            result
        );
    }
    Ok(())
}

#[tokio::test]
async fn test_fetch_unreachableService_shouldBeMetadataUnavailable() -> Result<()> {
    let client = HttpMetadataClient::new("http://127.0.0.1:9", None, 2)?;
    let result = client.fetch(&tangled_id()).await;
    assert!(matches!(result, Err(PipelineError::MetadataUnavailable(_))));
    Ok(())
}
