use tokio_util::sync::CancellationToken;
use vodl::{DownloadProgress, Downloader};

use crate::common::{init_test_tracing, options, MockSource, PLAYLIST_URI};

#[tokio::test]
async fn test_progress_sequence() -> anyhow::Result<()> {
    init_test_tracing();
    let dir = tempfile::tempdir()?;
    let output = dir.path().join("show.ts");

    let source = MockSource::with_segments(&["abcd", "efgh", "ijkl", "mnop"]);
    let downloader = Downloader::with_options(source, options());

    let mut snapshots = Vec::new();
    let mut sink = |progress: DownloadProgress| snapshots.push(progress);
    let path = downloader
        .download(PLAYLIST_URI, &output, &mut sink, &CancellationToken::new())
        .await?;
    assert_eq!(path, output);

    let triples: Vec<_> = snapshots
        .iter()
        .map(|p| (p.completed_segments, p.completed_bytes, p.partial_bytes))
        .collect();
    assert_eq!(
        triples,
        [
            (0, 0, 2),
            (0, 0, 4),
            (1, 4, 0),
            (1, 4, 2),
            (1, 4, 4),
            (2, 8, 0),
            (2, 8, 2),
            (2, 8, 4),
            (3, 12, 0),
            (3, 12, 2),
            (3, 12, 4),
            (4, 16, 0),
        ]
    );

    for pair in snapshots.windows(2) {
        assert!(pair[0].completed_segments <= pair[1].completed_segments);
        assert!(pair[0].completed_bytes <= pair[1].completed_bytes);
        assert!(pair[0].downloaded_bytes() <= pair[1].downloaded_bytes());
    }
    assert_eq!(
        triples.iter().filter(|t| **t == (4, 16, 0)).count(),
        1,
        "the final snapshot is reported exactly once"
    );

    let last = snapshots.last().unwrap();
    assert_eq!(last.total_segments, 4);
    assert_eq!(last.downloaded_duration, 8.0);
    assert!(last.is_complete());

    assert_eq!(tokio::fs::read(&output).await?, b"abcdefghijklmnop");
    // staged files are gone, only the released lock file stays
    assert_eq!(super::list_files(dir.path()), ["show.ts", "show.ts.lock"]);

    Ok(())
}

#[tokio::test]
async fn test_progress_with_uneven_chunks() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let output = dir.path().join("show.ts");

    // the source delivers 3 bytes at a time, progress is reported every 2 bytes
    let source = MockSource::with_segments(&["abcde", "fgh"]).with_chunk_size(3);
    let downloader = Downloader::with_options(source, options());

    let mut snapshots = Vec::new();
    let mut sink = |progress: DownloadProgress| snapshots.push(progress);
    downloader
        .download(PLAYLIST_URI, &output, &mut sink, &CancellationToken::new())
        .await?;

    let triples: Vec<_> = snapshots
        .iter()
        .map(|p| (p.completed_segments, p.completed_bytes, p.partial_bytes))
        .collect();
    assert_eq!(
        triples,
        [(0, 0, 2), (0, 0, 4), (1, 5, 0), (1, 5, 2), (2, 8, 0)]
    );
    assert_eq!(tokio::fs::read(&output).await?, b"abcdefgh");

    Ok(())
}

#[tokio::test]
async fn test_empty_playlist() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let output = dir.path().join("empty.ts");

    let downloader = Downloader::with_options(MockSource::with_segments(&[]), options());
    let mut snapshots = Vec::new();
    let mut sink = |progress: DownloadProgress| snapshots.push(progress);
    downloader
        .download(PLAYLIST_URI, &output, &mut sink, &CancellationToken::new())
        .await?;

    assert!(snapshots.is_empty());
    assert_eq!(tokio::fs::metadata(&output).await?.len(), 0);

    Ok(())
}
