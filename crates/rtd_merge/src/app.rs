use crate::error::{AppError, Result};
use crate::merge::Merger;
use crate::source::Source;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Drives one source → merger → sink pass per [`App::run`].
pub struct App<S, M, W> {
    source: S,
    merger: M,
    output: W,
}

impl<S, M, W> App<S, M, W>
where
    S: Source,
    M: Merger,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(source: S, merger: M, output: W) -> Self {
        Self {
            source,
            merger,
            output,
        }
    }

    pub async fn run(&mut self, cancel: &CancellationToken) -> Result<()> {
        // Owned here and dropped on every return below, exactly once.
        let mut body = self.source.get_stream(cancel).await?;

        let mut data = Vec::new();
        body.read_to_end(&mut data).await.map_err(AppError::Read)?;
        drop(body);
        debug!(bytes = data.len(), "response read");

        let merged = self.merger.get_merged(&data)?;

        self.output.write_all(&merged).await.map_err(AppError::Write)?;
        self.output.flush().await.map_err(AppError::Write)?;
        debug!(bytes = merged.len(), "output written");

        Ok(())
    }

    pub fn into_output(self) -> W {
        self.output
    }
}
