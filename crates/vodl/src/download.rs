mod options;
mod progress;

pub use options::DownloadOptions;
pub use progress::{DownloadProgress, ProgressSink};

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::Arc,
};

use bytes::Bytes;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    catalog::CatalogClient,
    error::{VodlError, VodlResult},
    hls::{
        select_variant, utils::base_uri, BitrateCriterion, KeyMethod, MasterPlaylist,
        MediaPlaylist, MediaSegment, Playlist, SegmentKey,
    },
    stitch::{stitch, StagedSegment, StagingArea},
    util::{lock::OutputLock, path::sanitize_file_stem},
    SegmentSource,
};

/// Key bytes of the most recent key URI.
type CachedKey = Option<(String, SegmentKey)>;

/// Downloads HLS media playlists into a single transport stream file.
///
/// Segments are fetched one after another. Every segment is decrypted and staged next to
/// the output (see [StagingArea]) before the next one starts, so an interrupted download
/// can be resumed by calling [Downloader::download] again with the same output path.
pub struct Downloader<S> {
    source: S,
    options: DownloadOptions,
}

impl<S> Downloader<S>
where
    S: SegmentSource,
{
    pub fn new(source: S) -> Self {
        Self::with_options(source, DownloadOptions::default())
    }

    pub fn with_options(source: S, options: DownloadOptions) -> Self {
        Self { source, options }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn options(&self) -> &DownloadOptions {
        &self.options
    }

    /// Fetch a small resource, retrying network failures.
    async fn fetch_with_retry(&self, uri: &str) -> VodlResult<Bytes> {
        let attempts = self.options.max_attempts();
        let mut attempt = 1;
        loop {
            match self.source.fetch(uri).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) if e.is_retryable() && attempt < attempts => {
                    tracing::warn!(
                        "Fetching {uri} failed ({attempt}/{attempts}), retry later. {e}"
                    );
                    tokio::time::sleep(self.options.retry_delay()).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_playlist(&self, uri: &str) -> VodlResult<Playlist> {
        let bytes = self.fetch_with_retry(uri).await?;
        let text = String::from_utf8_lossy(&bytes);
        let playlist = Playlist::parse(&text, base_uri(uri))?;
        tracing::debug!("Fetched playlist {uri}");
        Ok(playlist)
    }

    pub async fn list_variants(&self, uri: &str) -> VodlResult<MasterPlaylist> {
        match self.fetch_playlist(uri).await? {
            Playlist::Master(playlist) => Ok(playlist),
            Playlist::Media(_) => Err(VodlError::NotMasterPlaylist(uri.to_string())),
        }
    }

    pub async fn fetch_media_playlist(&self, uri: &str) -> VodlResult<MediaPlaylist> {
        match self.fetch_playlist(uri).await? {
            Playlist::Media(playlist) => {
                tracing::info!(
                    "Media playlist {uri} has {} segments ({:.2}s).",
                    playlist.segments.len(),
                    playlist.duration()
                );
                Ok(playlist)
            }
            Playlist::Master(_) => Err(VodlError::NotMediaPlaylist(uri.to_string())),
        }
    }

    /// Download the media playlist at `uri` into `output`.
    ///
    /// Fails with [VodlError::FileExists] before any network activity if `output` exists
    /// and overwriting was not requested.
    pub async fn download<P>(
        &self,
        uri: &str,
        output: impl AsRef<Path>,
        sink: &mut P,
        cancel: &CancellationToken,
    ) -> VodlResult<PathBuf>
    where
        P: ProgressSink + ?Sized,
    {
        let output = output.as_ref();
        let _lock = self.prepare_output(output).await?;
        let playlist = self.fetch_media_playlist(uri).await?;
        self.download_playlist(&playlist, output, sink, cancel).await
    }

    /// Pick a variant of the master playlist at `uri` and download it.
    pub async fn download_variant<P>(
        &self,
        uri: &str,
        criterion: BitrateCriterion,
        output: impl AsRef<Path>,
        sink: &mut P,
        cancel: &CancellationToken,
    ) -> VodlResult<PathBuf>
    where
        P: ProgressSink + ?Sized,
    {
        let output = output.as_ref();
        let _lock = self.prepare_output(output).await?;
        let master = self.list_variants(uri).await?;
        let playlist = self.fetch_variant(&master, criterion).await?;
        self.download_playlist(&playlist, output, sink, cancel).await
    }

    /// Resolve an episode through `catalog` and download it to `<output_dir>/<stem>.ts`.
    pub async fn download_episode<C, P>(
        &self,
        catalog: &C,
        id: &str,
        output_dir: impl AsRef<Path>,
        sink: &mut P,
        cancel: &CancellationToken,
    ) -> VodlResult<PathBuf>
    where
        C: CatalogClient,
        P: ProgressSink + ?Sized,
    {
        let episode = catalog.resolve(id).await?;
        let output = output_dir
            .as_ref()
            .join(format!("{}.ts", sanitize_file_stem(&episode.filename_stem)));
        tracing::info!("Episode {id} resolves to {}", output.display());

        let _lock = self.prepare_output(&output).await?;
        let playlist = match self.fetch_playlist(&episode.playlist_uri).await? {
            Playlist::Media(playlist) => playlist,
            Playlist::Master(master) => self.fetch_variant(&master, self.options.selection).await?,
        };
        self.download_playlist(&playlist, &output, sink, cancel).await
    }

    /// Run [Downloader::download] in the background, reporting through a channel.
    ///
    /// The receiver yields every progress snapshot and, if the download fails, the error as
    /// its last item. It closes once the download is over.
    pub fn download_stream(
        self: Arc<Self>,
        uri: impl Into<String>,
        output: impl Into<PathBuf>,
        cancel: CancellationToken,
    ) -> mpsc::UnboundedReceiver<VodlResult<DownloadProgress>>
    where
        S: 'static,
    {
        let (sender, receiver) = mpsc::unbounded_channel();
        let uri = uri.into();
        let output = output.into();

        tokio::spawn(async move {
            let progress_sender = sender.clone();
            let mut sink = move |progress: DownloadProgress| {
                _ = progress_sender.send(Ok(progress));
            };
            if let Err(e) = self.download(&uri, &output, &mut sink, &cancel).await {
                _ = sender.send(Err(e));
            }
        });

        receiver
    }

    async fn fetch_variant(
        &self,
        master: &MasterPlaylist,
        criterion: BitrateCriterion,
    ) -> VodlResult<MediaPlaylist> {
        let variant = select_variant(&master.variants, criterion)?;
        tracing::info!(
            "Selected variant with bandwidth {} ({criterion}): {}",
            variant.bandwidth,
            variant.uri
        );
        self.fetch_media_playlist(&variant.uri).await
    }

    async fn prepare_output(&self, output: &Path) -> VodlResult<Option<OutputLock>> {
        if output.exists() && !self.options.overwrite {
            return Err(VodlError::FileExists(output.to_path_buf()));
        }

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        if self.options.lock_output {
            Ok(Some(OutputLock::acquire(output)?))
        } else {
            Ok(None)
        }
    }

    async fn download_playlist<P>(
        &self,
        playlist: &MediaPlaylist,
        output: &Path,
        sink: &mut P,
        cancel: &CancellationToken,
    ) -> VodlResult<PathBuf>
    where
        P: ProgressSink + ?Sized,
    {
        let mut sequences = HashSet::with_capacity(playlist.segments.len());
        for segment in playlist.segments.iter() {
            if !sequences.insert(segment.media_sequence) {
                return Err(VodlError::DuplicateSequence(segment.media_sequence));
            }
        }

        let staging = StagingArea::new(output, self.options.staging_dir.as_deref());
        staging.ensure_dir().await?;

        let mut key: CachedKey = None;
        if let Some(segment) = playlist.segments.iter().find(|s| s.is_encrypted()) {
            self.segment_key(segment, &mut key).await?;
        }

        let total = playlist.segments.len();
        let mut progress = DownloadProgress::new(total);
        let mut staged = Vec::with_capacity(total);

        for segment in playlist.segments.iter() {
            if cancel.is_cancelled() {
                tracing::info!("Download of {} cancelled.", output.display());
                return Err(VodlError::CancelledByUser);
            }

            let media_sequence = segment.media_sequence;
            if let Some(len) = staging.staged_len(media_sequence).await {
                tracing::info!("Segment {media_sequence} was downloaded before, skipped.");
                progress.complete_segment(len, segment.duration);
            } else {
                let segment_key = self.segment_key(segment, &mut key).await?;
                let data = self
                    .download_segment(segment, &mut progress, sink, cancel)
                    .await?;
                let data = match segment_key {
                    Some(segment_key) => segment_key.decrypt_segment(media_sequence, &data)?,
                    None => data,
                };
                staging.write_segment(media_sequence, &data).await?;
                progress.complete_segment(data.len() as u64, segment.duration);
            }
            sink.on_progress(progress);

            staged.push(StagedSegment {
                media_sequence,
                path: staging.segment_path(media_sequence),
            });
            tracing::info!(
                "Segment {media_sequence} finished. ({} / {total} or {:.2}%)",
                progress.completed_segments,
                progress.percentage()
            );
        }

        tracing::info!("Stitching {total} segments into {}", output.display());
        let size = stitch(staged, output).await?;
        staging.cleanup(sequences).await;
        tracing::info!("Saved {} ({size} bytes).", output.display());

        Ok(output.to_path_buf())
    }

    /// Key of a segment, fetched again only when its URI differs from the cached one.
    async fn segment_key<'a>(
        &self,
        segment: &MediaSegment,
        cached: &'a mut CachedKey,
    ) -> VodlResult<Option<&'a SegmentKey>> {
        let Some(key) = segment.key.as_ref() else {
            return Ok(None);
        };
        match &key.method {
            KeyMethod::None => return Ok(None),
            KeyMethod::Aes128 => {}
            method => return Err(VodlError::UnsupportedKeyMethod(method.clone())),
        }

        let uri = key.uri.as_deref().ok_or(VodlError::MissingKeyUri {
            media_sequence: segment.media_sequence,
        })?;
        let is_cached = cached.as_ref().is_some_and(|(cached_uri, _)| cached_uri == uri);
        if !is_cached {
            let bytes = self.fetch_with_retry(uri).await?;
            tracing::debug!("Fetched key {uri}");
            *cached = Some((uri.to_string(), SegmentKey::new(key.method.clone(), uri, &bytes)?));
        }

        Ok(cached.as_ref().map(|(_, key)| key))
    }

    /// Fetch one segment body, retrying network failures from scratch.
    async fn download_segment<P>(
        &self,
        segment: &MediaSegment,
        progress: &mut DownloadProgress,
        sink: &mut P,
        cancel: &CancellationToken,
    ) -> VodlResult<Vec<u8>>
    where
        P: ProgressSink + ?Sized,
    {
        let attempts = self.options.max_attempts();
        let mut attempt = 1;
        loop {
            let error = match self.fetch_segment(segment, progress, sink, cancel).await {
                Ok(data) => return Ok(data),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => e,
            };

            if attempt >= attempts {
                tracing::error!(
                    "Segment {} failed, max attempts exceeded. {error}",
                    segment.media_sequence
                );
                return Err(VodlError::SegmentDownload {
                    media_sequence: segment.media_sequence,
                    uri: segment.uri.clone(),
                    attempts: attempt,
                    source: Box::new(error),
                });
            }

            tracing::warn!(
                "Segment {} failed ({attempt}/{attempts}), retry later. {error}",
                segment.media_sequence
            );
            progress.partial_bytes = 0;
            tokio::select! {
                _ = cancel.cancelled() => return Err(VodlError::CancelledByUser),
                _ = tokio::time::sleep(self.options.retry_delay()) => {}
            }
            attempt += 1;
        }
    }

    async fn fetch_segment<P>(
        &self,
        segment: &MediaSegment,
        progress: &mut DownloadProgress,
        sink: &mut P,
        cancel: &CancellationToken,
    ) -> VodlResult<Vec<u8>>
    where
        P: ProgressSink + ?Sized,
    {
        progress.partial_bytes = 0;
        let chunk_size = self.options.chunk_len();
        let mut stream = self.source.fetch_streaming(&segment.uri).await?;

        let mut data = Vec::new();
        let mut reported = 0;
        while let Some(chunk) = stream.next().await {
            if cancel.is_cancelled() {
                return Err(VodlError::CancelledByUser);
            }
            data.extend_from_slice(&chunk?);

            // one snapshot per full chunk
            while data.len() - reported >= chunk_size {
                reported += chunk_size;
                progress.partial_bytes = reported as u64;
                sink.on_progress(*progress);
            }
        }

        Ok(data)
    }
}
