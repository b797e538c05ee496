/// Snapshot of a running download.
///
/// Produced after every chunk of the segment in flight and after every completed segment.
/// Both `completed_segments` and [DownloadProgress::downloaded_bytes] never decrease
/// across the snapshots of one download, except that `partial_bytes` restarts from zero
/// when a segment is retried.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DownloadProgress {
    pub completed_segments: usize,
    pub total_segments: usize,
    /// Bytes written for fully completed segments, resumed ones included
    pub completed_bytes: u64,
    /// Bytes received so far for the segment in flight
    pub partial_bytes: u64,
    /// Seconds of media in completed segments
    pub downloaded_duration: f64,
}

impl DownloadProgress {
    pub(crate) fn new(total_segments: usize) -> Self {
        Self {
            total_segments,
            ..Default::default()
        }
    }

    pub fn downloaded_bytes(&self) -> u64 {
        self.completed_bytes + self.partial_bytes
    }

    pub fn is_complete(&self) -> bool {
        self.completed_segments == self.total_segments
    }

    pub fn percentage(&self) -> f32 {
        if self.total_segments == 0 {
            0.
        } else {
            self.completed_segments as f32 / self.total_segments as f32 * 100.
        }
    }

    pub(crate) fn complete_segment(&mut self, bytes: u64, duration: Option<f64>) {
        self.completed_segments += 1;
        self.completed_bytes += bytes;
        self.partial_bytes = 0;
        self.downloaded_duration += duration.unwrap_or_default();
    }
}

/// Receives [DownloadProgress] snapshots, possibly once per chunk.
pub trait ProgressSink: Send {
    fn on_progress(&mut self, progress: DownloadProgress);
}

impl<F> ProgressSink for F
where
    F: FnMut(DownloadProgress) + Send,
{
    fn on_progress(&mut self, progress: DownloadProgress) {
        self(progress)
    }
}
