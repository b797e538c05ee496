use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use vodl::{Downloader, VodlError};

use crate::common::{options, segment_uri, MockSource, PLAYLIST_URI};

#[tokio::test]
async fn test_download_stream() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let output = dir.path().join("show.ts");

    let downloader = Arc::new(Downloader::with_options(
        MockSource::with_segments(&["abcd", "efgh"]),
        options().with_chunk_size(4),
    ));
    let mut receiver = downloader
        .clone()
        .download_stream(PLAYLIST_URI, &output, CancellationToken::new());

    let mut snapshots = Vec::new();
    while let Some(progress) = receiver.recv().await {
        snapshots.push(progress?);
    }

    let triples: Vec<_> = snapshots
        .iter()
        .map(|p| (p.completed_segments, p.completed_bytes, p.partial_bytes))
        .collect();
    assert_eq!(triples, [(0, 0, 4), (1, 4, 0), (1, 4, 4), (2, 8, 0)]);
    assert_eq!(tokio::fs::read(&output).await?, b"abcdefgh");
    assert_eq!(downloader.source().fetch_count(&segment_uri(1)), 1);

    Ok(())
}

#[tokio::test]
async fn test_download_stream_error_is_last() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;

    let cancel = CancellationToken::new();
    cancel.cancel();

    let downloader = Arc::new(Downloader::with_options(
        MockSource::with_segments(&["abcd", "efgh"]),
        options(),
    ));
    let mut receiver = downloader.download_stream(PLAYLIST_URI, dir.path().join("show.ts"), cancel);

    let mut items = Vec::new();
    while let Some(item) = receiver.recv().await {
        items.push(item);
    }
    assert_eq!(items.len(), 1);
    assert!(matches!(items[0], Err(VodlError::CancelledByUser)));

    Ok(())
}
