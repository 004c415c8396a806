//! Artifact streaming
//!
//! On success the rendered file is opened and exposed as a chunked byte
//! stream. The stream owns a cleanup guard: when it is dropped (body fully
//! sent, client gone, or copy failed) the file is deleted exactly once and
//! only then is the path lease released.

use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::{BoxStream, Stream, StreamExt};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::BuildError;
use crate::locks::PathLease;
use crate::runner::RenderOutcome;

/// Content type of rendered artifacts
pub const IMAGE_CONTENT_TYPE: &str = "image/png";

/// Content type of diagnostics
pub const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

const CHUNK_SIZE: usize = 64 * 1024;

/// What the caller receives for a build request
#[derive(Debug)]
pub enum Delivery {
    /// PNG bytes; deleting the file when dropped
    Image(ArtifactStream),
    /// Plain-text diagnostic
    Diagnostic(String),
}

impl Delivery {
    /// Content type for the response
    #[must_use]
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Image(_) => IMAGE_CONTENT_TYPE,
            Self::Diagnostic(_) => TEXT_CONTENT_TYPE,
        }
    }
}

/// Turn a render outcome into a delivery.
///
/// `lease` is released once the delivery no longer needs the file: right
/// away for failures, after deletion for images.
pub async fn deliver(outcome: RenderOutcome, lease: Option<PathLease>) -> Delivery {
    match outcome {
        RenderOutcome::Failure(err) => {
            tracing::warn!("Render failed: {}", err);
            Delivery::Diagnostic(err.diagnostic())
        }
        RenderOutcome::Success(path) => match ArtifactStream::open(path, lease).await {
            Ok(stream) => Delivery::Image(stream),
            Err(err) => {
                tracing::error!("{}", err);
                Delivery::Diagnostic(err.diagnostic())
            }
        },
    }
}

/// Chunked stream over a rendered file that deletes it on drop
pub struct ArtifactStream {
    inner: BoxStream<'static, std::io::Result<Vec<u8>>>,
    cleanup: CleanupGuard,
}

impl std::fmt::Debug for ArtifactStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactStream")
            .field("path", &self.cleanup.path)
            .finish_non_exhaustive()
    }
}

impl ArtifactStream {
    /// Open the artifact at `path`.
    ///
    /// Nothing is deleted if the file cannot be opened.
    ///
    /// # Errors
    /// `StreamingFailure` if the file cannot be opened.
    pub async fn open(path: PathBuf, lease: Option<PathLease>) -> Result<Self, BuildError> {
        let file = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(source) => return Err(BuildError::StreamingFailure { path, source }),
        };
        Ok(Self {
            inner: chunks(file).boxed(),
            cleanup: CleanupGuard {
                path,
                _lease: lease,
            },
        })
    }

    /// Path being streamed
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.cleanup.path
    }

    /// Copy every byte into `sink`, flush it, then delete the file.
    ///
    /// The file is deleted whether or not the copy succeeded.
    ///
    /// # Errors
    /// `StreamingFailure` on a read or write error.
    pub async fn write_to<W>(mut self, sink: &mut W) -> Result<u64, BuildError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let mut written = 0u64;
        let result: std::io::Result<()> = async {
            while let Some(chunk) = self.inner.next().await {
                let chunk = chunk?;
                sink.write_all(&chunk).await?;
                written += chunk.len() as u64;
            }
            sink.flush().await
        }
        .await;

        let path = self.cleanup.path.clone();
        drop(self);
        result
            .map(|()| written)
            .map_err(|source| BuildError::StreamingFailure { path, source })
    }
}

impl Stream for ArtifactStream {
    type Item = std::io::Result<Vec<u8>>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let polled = self.inner.poll_next_unpin(cx);
        if let Poll::Ready(Some(Err(err))) = &polled {
            tracing::error!("Failed to stream {}: {}", self.cleanup.path.display(), err);
        }
        polled
    }
}

fn chunks<R>(reader: R) -> impl Stream<Item = std::io::Result<Vec<u8>>> + Send + 'static
where
    R: AsyncRead + Unpin + Send + 'static,
{
    futures::stream::try_unfold(reader, |mut reader| async move {
        let mut buf = vec![0u8; CHUNK_SIZE];
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        Ok(Some((buf, reader)))
    })
}

struct CleanupGuard {
    path: PathBuf,
    _lease: Option<PathLease>,
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        // single small unlink, inline: the lease must not outlive the file
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!("Removed {}", self.path.display()),
            Err(source) => {
                let err = BuildError::CleanupFailure {
                    path: self.path.clone(),
                    source,
                };
                tracing::warn!("{}", err);
            }
        }
    }
}
