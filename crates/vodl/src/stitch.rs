use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
};

use tokio::{
    fs::File,
    io::{AsyncWriteExt, BufWriter},
};

use crate::{
    error::{VodlError, VodlResult},
    util::path::VodlPathExt,
};

/// Directory holding the staged segment files of one output file.
///
/// Staged files are named after the output file and the media sequence, so separate runs
/// targeting the same output share them: `show.ts` -> `show_seg000002.ts`.
#[derive(Debug, Clone)]
pub struct StagingArea {
    dir: PathBuf,
    file_name: PathBuf,
}

impl StagingArea {
    /// Stage next to `output` unless `staging_dir` is given.
    pub fn new(output: &Path, staging_dir: Option<&Path>) -> Self {
        let dir = staging_dir
            .or_else(|| output.parent())
            .unwrap_or(Path::new(""))
            .to_path_buf();
        let file_name = output
            .file_name()
            .unwrap_or(OsStr::new("output"))
            .into();
        Self { dir, file_name }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn segment_path(&self, media_sequence: u64) -> PathBuf {
        self.dir
            .join(&self.file_name)
            .with_suffix(format!("seg{media_sequence:06}"))
    }

    pub async fn ensure_dir(&self) -> VodlResult<()> {
        if !self.dir.as_os_str().is_empty() && !self.dir.exists() {
            tokio::fs::create_dir_all(&self.dir).await?;
        }
        Ok(())
    }

    /// Size of the staged file of a segment, if a previous run completed it.
    pub async fn staged_len(&self, media_sequence: u64) -> Option<u64> {
        let metadata = tokio::fs::metadata(self.segment_path(media_sequence))
            .await
            .ok()?;
        metadata.is_file().then(|| metadata.len())
    }

    /// Write a segment to `<staged>.part` and rename it into place.
    ///
    /// The `.part` file is removed if anything fails.
    pub async fn write_segment(&self, media_sequence: u64, data: &[u8]) -> VodlResult<PathBuf> {
        let path = self.segment_path(media_sequence);
        let part = path.part_path();

        let result = async {
            let mut file = File::create(&part).await?;
            file.write_all(data).await?;
            file.sync_all().await?;
            drop(file);
            tokio::fs::rename(&part, &path).await
        }
        .await;

        if let Err(e) = result {
            if let Err(e) = tokio::fs::remove_file(&part).await {
                tracing::warn!("Failed to remove {}: {e}", part.display());
            }
            return Err(e.into());
        }
        Ok(path)
    }

    /// Delete staged files. Failures are only logged.
    pub async fn cleanup<I>(&self, sequences: I)
    where
        I: IntoIterator<Item = u64>,
    {
        for media_sequence in sequences {
            let path = self.segment_path(media_sequence);
            if let Err(e) = tokio::fs::remove_file(&path).await {
                tracing::warn!("Failed to remove staged file {}: {e}", path.display());
            }
        }
    }
}

/// A staged segment file ready to be stitched.
#[derive(Debug, Clone)]
pub struct StagedSegment {
    pub media_sequence: u64,
    pub path: PathBuf,
}

/// Concatenate staged files in ascending media sequence into `output`.
///
/// The data goes to `<output>.part` first and is renamed when complete.
/// Returns the size of the output file.
pub async fn stitch(mut segments: Vec<StagedSegment>, output: &Path) -> VodlResult<u64> {
    segments.sort_by_key(|segment| segment.media_sequence);

    for segment in segments.iter() {
        if !segment.path.is_file() {
            return Err(VodlError::StitchError {
                media_sequence: segment.media_sequence,
                path: segment.path.clone(),
            });
        }
    }

    let part = output.part_path();
    let result = concat_into(&segments, &part).await;
    let result = match result {
        Ok(size) => tokio::fs::rename(&part, output)
            .await
            .map(|_| size)
            .map_err(VodlError::from),
        Err(e) => Err(e),
    };

    if result.is_err() {
        if let Err(e) = tokio::fs::remove_file(&part).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("Failed to remove {}: {e}", part.display());
            }
        }
    }
    result
}

async fn concat_into(segments: &[StagedSegment], path: &Path) -> VodlResult<u64> {
    let mut output = BufWriter::new(File::create(path).await?);
    let mut size = 0;
    for segment in segments {
        let mut file = match File::open(&segment.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(VodlError::StitchError {
                    media_sequence: segment.media_sequence,
                    path: segment.path.clone(),
                })
            }
            Err(e) => return Err(e.into()),
        };
        size += tokio::io::copy(&mut file, &mut output).await?;
    }
    output.flush().await?;
    output.get_ref().sync_all().await?;
    Ok(size)
}
