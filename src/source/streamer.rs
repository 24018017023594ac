use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::BoxError;

/// A lazy, forward-only element source.
///
/// Streamers are read exactly once, element by element; they are never
/// restarted and never materialized. `Ok(None)` means the stream ended.
/// A returned error is fatal to the run that consumes the streamer.
#[async_trait]
pub trait Streamer<T>: Send {
    async fn next(&mut self) -> Result<Option<T>, BoxError>;
}

/// Adapts any iterator into a [`Streamer`].
///
/// The iterator is fused: once it returns `None`, so does the streamer.
pub struct IterStreamer<I: Iterator> {
    iter: std::iter::Fuse<I>,
}

impl<I: Iterator> IterStreamer<I> {
    pub fn new<It>(into: It) -> Self
    where
        It: IntoIterator<IntoIter = I, Item = I::Item>,
    {
        IterStreamer {
            iter: into.into_iter().fuse(),
        }
    }
}

#[async_trait]
impl<I> Streamer<I::Item> for IterStreamer<I>
where
    I: Iterator + Send,
    I::Item: Send,
{
    async fn next(&mut self) -> Result<Option<I::Item>, BoxError> {
        Ok(self.iter.next())
    }
}

/// Channels are streamers too: the stream ends when every sender is
/// dropped and the buffer is drained.
#[async_trait]
impl<T: Send> Streamer<T> for mpsc::Receiver<T> {
    async fn next(&mut self) -> Result<Option<T>, BoxError> {
        Ok(self.recv().await)
    }
}
