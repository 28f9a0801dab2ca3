/*!
 * Integration tests for the scraping backends against a local HTTP server
 */

use anyhow::Result;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use screenwise::app_config::{BackendConfig, SubtitleConfig};
use screenwise::identifier::ImdbId;
use screenwise::subtitles::backends::{PlainIndexBackend, SubtitleCatBackend, YifySubtitlesBackend};
use screenwise::subtitles::{AcquisitionOutcome, AttemptResult, ScrapeClient, SubtitleAcquirer, SubtitleBackend, SubtitleQuery};

use crate::common;

fn client() -> ScrapeClient {
    ScrapeClient::new("screenwise-tests", 5).unwrap()
}

fn html_with_links(links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!("<li><a href=\"{}\">{}</a></li>", href, href))
        .collect();
    format!("<html><body><ul>{}</ul></body></html>", anchors)
}

async fn serve(server: &MockServer, at: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_subtitlecat_searchAndFetch_shouldFollowDetailPage() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/index.php"))
        .and(query_param("search", "tangled"))
        .respond_with(ResponseTemplate::new(200).set_body_string(html_with_links(&[
            "/about.html",
            "/subs/12/tangled-2018-series.html",
            "/subs/77/tangled-2010.html",
        ])))
        .mount(&server)
        .await;
    serve(
        &server,
        "/subs/77/tangled-2010.html",
        html_with_links(&["tangled-2010-fr.srt", "tangled-2010-en.srt"]),
    )
    .await;
    serve(&server, "/subs/77/tangled-2010-en.srt", common::sample_srt(20)).await;

    let backend = SubtitleCatBackend::new(&server.uri(), client());
    let query = SubtitleQuery::new("Tangled").with_year(2010);

    let url = backend.search(&query).await?.expect("candidate url");
    assert_eq!(url, format!("{}/subs/77/tangled-2010-en.srt", server.uri()));

    let text = backend.fetch(&url).await?.expect("subtitle text");
    assert!(text.contains("-->"));
    Ok(())
}

#[tokio::test]
async fn test_subtitlecat_noDetailLink_shouldBeNoMatch() -> Result<()> {
    let server = MockServer::start().await;
    serve(&server, "/index.php", html_with_links(&["/contact.html"])).await;

    let backend = SubtitleCatBackend::new(&server.uri(), client());
    assert!(backend.search(&SubtitleQuery::new("Tangled")).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_yifysubtitles_withImdbId_shouldHopToDownload() -> Result<()> {
    let server = MockServer::start().await;
    serve(
        &server,
        "/movie-imdb/tt0398286",
        html_with_links(&[
            "/subtitles/tangled-2010-spanish-yify-11",
            "/subtitles/tangled-2010-english-yify-42",
        ]),
    )
    .await;
    serve(
        &server,
        "/subtitles/tangled-2010-english-yify-42",
        html_with_links(&["/movie-imdb/tt0398286", "/download/tangled-2010-english-yify-42.srt"]),
    )
    .await;

    let backend = YifySubtitlesBackend::new(&server.uri(), client());
    let query = SubtitleQuery::new("Tangled").with_imdb_id(ImdbId::resolve(common::TANGLED_ID)?);

    let url = backend.search(&query).await?.expect("download url");
    assert_eq!(url, format!("{}/download/tangled-2010-english-yify-42.srt", server.uri()));
    Ok(())
}

#[tokio::test]
async fn test_plainindex_shouldPreferLinkWithReleaseYear() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "cars"))
        .respond_with(ResponseTemplate::new(200).set_body_string(html_with_links(&[
            "/files/cars-2017-remaster.srt",
            "/files/cars-2006.srt",
            "/files/cars-2006.txt",
        ])))
        .mount(&server)
        .await;

    let backend = PlainIndexBackend::new(&server.uri(), client());
    let url = backend
        .search(&SubtitleQuery::new("Cars (2006)").with_year(2006))
        .await?
        .expect("candidate");
    assert!(url.ends_with("/files/cars-2006.srt"), "{}", url);
    Ok(())
}

#[tokio::test]
async fn test_scrapeClient_statusHandling() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let client = client();
    assert!(client.get_text(&format!("{}/gone", server.uri())).await?.is_none());

    let err = client.get_text(&format!("{}/busy", server.uri())).await.unwrap_err();
    assert!(err.is_transient());
    Ok(())
}

/// Configured backends are tried in order; a captcha page is skipped
#[tokio::test]
async fn test_acquirer_fromConfig_shouldSkipCorruptBackend() -> Result<()> {
    let blocked = MockServer::start().await;
    serve(&blocked, "/index.php", html_with_links(&["/subs/1/cars-2006.html"])).await;
    serve(&blocked, "/subs/1/cars-2006.html", html_with_links(&["cars-2006-en.srt"])).await;
    serve(&blocked, "/subs/1/cars-2006-en.srt", common::captcha_page()).await;

    let index = MockServer::start().await;
    serve(&index, "/search", html_with_links(&["/files/cars-2006.srt"])).await;
    serve(&index, "/files/cars-2006.srt", common::sample_srt(25)).await;

    let config = SubtitleConfig {
        backends: vec![
            BackendConfig {
                name: "subtitlecat".to_string(),
                base_url: blocked.uri(),
                enabled: true,
            },
            BackendConfig {
                name: "yifysubtitles".to_string(),
                base_url: "http://127.0.0.1:9".to_string(),
                enabled: false,
            },
            BackendConfig {
                name: "plainindex".to_string(),
                base_url: index.uri(),
                enabled: true,
            },
        ],
        courtesy_delay_ms: 0,
        ..SubtitleConfig::default()
    };

    let acquirer = SubtitleAcquirer::from_config(&config)?;
    assert_eq!(acquirer.backend_names(), vec!["subtitlecat", "plainindex"]);

    let outcome = acquirer.acquire(&SubtitleQuery::new("Cars").with_year(2006)).await;
    match outcome {
        AcquisitionOutcome::Found { source, subtitle, attempts, .. } => {
            assert_eq!(source, "plainindex");
            assert_eq!(subtitle.cue_count, 25);
            assert!(matches!(attempts[0].result, AttemptResult::Rejected(_)));
            assert_eq!(attempts[1].result, AttemptResult::Accepted);
        }
        other => panic!("expected Found, got {:?}", other),
    }
    Ok(())
}
