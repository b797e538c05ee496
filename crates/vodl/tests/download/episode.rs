use std::time::Duration;

use tokio_util::sync::CancellationToken;
use vodl::{
    cache::memory::MemoryMetadataCache,
    catalog::{CachedCatalog, CatalogClient, EpisodeStream},
    config::HttpConfig,
    hls::BitrateCriterion,
    Downloader, HttpSource, VodlError, VodlResult,
};
use wiremock::MockServer;

use crate::{
    common::{discard, init_test_tracing, media_playlist, options, MockSource},
    hls::HlsMock,
};

const MASTER: &str = "#EXTM3U
#EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=640x360
low/index.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=3000000,RESOLUTION=1920x1080
high/index.m3u8";

struct StaticCatalog;

impl CatalogClient for StaticCatalog {
    async fn resolve(&self, id: &str) -> VodlResult<EpisodeStream> {
        match id {
            "master" => Ok(EpisodeStream {
                playlist_uri: "https://vod.example.com/ep1/master.m3u8".to_string(),
                filename_stem: "Show: Episode 1".to_string(),
            }),
            "media" => Ok(EpisodeStream {
                playlist_uri: "https://vod.example.com/ep1/low/index.m3u8".to_string(),
                filename_stem: " ../Episode 2. ".to_string(),
            }),
            _ => Err(VodlError::NotMediaPlaylist(id.to_string())),
        }
    }
}

fn episode_source() -> MockSource {
    MockSource::new()
        .with("https://vod.example.com/ep1/master.m3u8", MASTER)
        .with("https://vod.example.com/ep1/low/index.m3u8", media_playlist(1))
        .with("https://vod.example.com/ep1/low/0.ts", &b"low!"[..])
        .with("https://vod.example.com/ep1/high/index.m3u8", media_playlist(1))
        .with("https://vod.example.com/ep1/high/0.ts", &b"high"[..])
}

#[tokio::test]
async fn test_download_episode() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let catalog = CachedCatalog::new(
        StaticCatalog,
        MemoryMetadataCache::new(),
        Duration::from_secs(60),
    );

    // master playlists go through the configured selection
    let downloader = Downloader::with_options(episode_source(), options());
    let path = downloader
        .download_episode(&catalog, "master", dir.path(), &mut discard, &CancellationToken::new())
        .await?;
    assert_eq!(path, dir.path().join("Show_ Episode 1.ts"));
    assert_eq!(tokio::fs::read(&path).await?, b"high");

    // media playlists are downloaded as they are
    let path = downloader
        .download_episode(&catalog, "media", dir.path(), &mut discard, &CancellationToken::new())
        .await?;
    assert_eq!(path, dir.path().join("_Episode 2.ts"));
    assert_eq!(tokio::fs::read(&path).await?, b"low!");

    let downloader = Downloader::with_options(
        episode_source(),
        options().with_selection(BitrateCriterion::Min).with_overwrite(true),
    );
    let path = downloader
        .download_episode(&catalog, "master", dir.path(), &mut discard, &CancellationToken::new())
        .await?;
    assert_eq!(tokio::fs::read(&path).await?, b"low!");

    Ok(())
}

#[tokio::test]
async fn test_download_variant() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let output = dir.path().join("show.ts");

    let downloader = Downloader::with_options(episode_source(), options());
    downloader
        .download_variant(
            "https://vod.example.com/ep1/master.m3u8",
            BitrateCriterion::Exact(800000),
            &output,
            &mut discard,
            &CancellationToken::new(),
        )
        .await?;
    assert_eq!(tokio::fs::read(&output).await?, b"low!");
    assert_eq!(
        downloader
            .source()
            .fetch_count("https://vod.example.com/ep1/high/0.ts"),
        0
    );

    let error = downloader
        .download_variant(
            "https://vod.example.com/ep1/master.m3u8",
            BitrateCriterion::Exact(1),
            dir.path().join("other.ts"),
            &mut discard,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(error, VodlError::NoSuchBitrate(1)));

    Ok(())
}

#[tokio::test]
async fn test_download_variant_over_http() -> anyhow::Result<()> {
    init_test_tracing();
    let dir = tempfile::tempdir()?;
    let output = dir.path().join("show.ts");

    let server = MockServer::start().await;
    server
        .mock("/ep1/master.m3u8", MASTER)
        .await
        .mock("/ep1/high/index.m3u8", media_playlist(2))
        .await
        .mock("/ep1/high/0.ts", "abcd")
        .await
        .mock("/ep1/high/1.ts", "efgh")
        .await;

    let source = HttpSource::from_config(&HttpConfig::default())?;
    let downloader = Downloader::with_options(source, options());
    downloader
        .download_variant(
            &format!("{}/ep1/master.m3u8", server.uri()),
            BitrateCriterion::Max,
            &output,
            &mut discard,
            &CancellationToken::new(),
        )
        .await?;
    assert_eq!(tokio::fs::read(&output).await?, b"abcdefgh");

    Ok(())
}
