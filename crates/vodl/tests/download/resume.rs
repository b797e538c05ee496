use tokio_util::sync::CancellationToken;
use vodl::{
    stitch::StagingArea,
    util::{lock::OutputLock, path::VodlPathExt},
    DownloadProgress, Downloader, VodlError,
};

use crate::common::{discard, options, segment_uri, MockSource, PLAYLIST_URI};

const SEGMENTS: [&str; 4] = ["abcd", "efgh", "ijkl", "mnop"];

#[tokio::test]
async fn test_resume_skips_staged_segment() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;

    // uninterrupted run for reference
    let reference = dir.path().join("reference").join("show.ts");
    let downloader = Downloader::with_options(MockSource::with_segments(&SEGMENTS), options());
    downloader
        .download(PLAYLIST_URI, &reference, &mut discard, &CancellationToken::new())
        .await?;

    // a previous run left the staged file of segment 2 behind
    let output = dir.path().join("resumed").join("show.ts");
    let staging = StagingArea::new(&output, None);
    staging.ensure_dir().await?;
    staging.write_segment(2, b"ijkl").await?;

    let downloader = Downloader::with_options(MockSource::with_segments(&SEGMENTS), options());
    let mut snapshots = Vec::new();
    let mut sink = |progress: DownloadProgress| snapshots.push(progress);
    downloader
        .download(PLAYLIST_URI, &output, &mut sink, &CancellationToken::new())
        .await?;

    let source = downloader.source();
    assert_eq!(source.fetch_count(&segment_uri(2)), 0);
    assert_eq!(source.fetch_count(&segment_uri(0)), 1);
    assert_eq!(source.fetch_count(&segment_uri(3)), 1);

    assert_eq!(
        tokio::fs::read(&output).await?,
        tokio::fs::read(&reference).await?
    );
    assert!(!staging.segment_path(2).exists());

    // the resumed segment still counts as completed
    let resumed = snapshots
        .iter()
        .find(|p| p.completed_segments == 3)
        .unwrap();
    assert_eq!(resumed.completed_bytes, 12);
    assert_eq!(resumed.partial_bytes, 0);

    Ok(())
}

#[tokio::test]
async fn test_staging_dir() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let staging_dir = dir.path().join("staging");
    let output = dir.path().join("out").join("show.ts");

    let staging = StagingArea::new(&output, Some(staging_dir.as_path()));
    staging.ensure_dir().await?;
    staging.write_segment(0, b"abcd").await?;

    let downloader = Downloader::with_options(
        MockSource::with_segments(&SEGMENTS),
        options().with_staging_dir(&staging_dir),
    );
    downloader
        .download(PLAYLIST_URI, &output, &mut discard, &CancellationToken::new())
        .await?;

    assert_eq!(downloader.source().fetch_count(&segment_uri(0)), 0);
    assert_eq!(tokio::fs::read(&output).await?, b"abcdefghijklmnop");
    assert_eq!(super::list_files(&staging_dir), Vec::<String>::new());

    Ok(())
}

#[tokio::test]
async fn test_existing_output() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let output = dir.path().join("show.ts");
    tokio::fs::write(&output, b"old").await?;

    let downloader = Downloader::with_options(MockSource::with_segments(&SEGMENTS), options());
    let error = downloader
        .download(PLAYLIST_URI, &output, &mut discard, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(error, VodlError::FileExists(path) if path == output));
    assert_eq!(downloader.source().total_fetches(), 0);
    assert_eq!(tokio::fs::read(&output).await?, b"old");

    let downloader = Downloader::with_options(
        MockSource::with_segments(&SEGMENTS),
        options().with_overwrite(true),
    );
    downloader
        .download(PLAYLIST_URI, &output, &mut discard, &CancellationToken::new())
        .await?;
    assert_eq!(tokio::fs::read(&output).await?, b"abcdefghijklmnop");

    Ok(())
}

#[tokio::test]
async fn test_locked_output() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let output = dir.path().join("show.ts");
    let lock = OutputLock::acquire(&output)?;

    let downloader = Downloader::with_options(MockSource::with_segments(&SEGMENTS), options());
    let error = downloader
        .download(PLAYLIST_URI, &output, &mut discard, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(error, VodlError::OutputLocked(_)));
    assert_eq!(downloader.source().total_fetches(), 0);

    drop(lock);
    assert!(output.lock_path().exists());
    downloader
        .download(PLAYLIST_URI, &output, &mut discard, &CancellationToken::new())
        .await?;
    assert!(output.exists());

    Ok(())
}
