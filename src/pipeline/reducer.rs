use async_trait::async_trait;

use crate::error::BoxError;

/// The single output step of a pipeline, typically persistence.
///
/// Called once per successfully processed batch, always on the
/// collector's task and never concurrently with itself. An error here
/// aborts the run: if the sink rejects a batch there is nowhere left to
/// send data.
#[async_trait]
pub trait Reducer<T>: Send {
    async fn reduce(&mut self, batch: Vec<T>) -> Result<(), BoxError>;
}

#[async_trait]
impl<T, F, Fut> Reducer<T> for F
where
    F: FnMut(Vec<T>) -> Fut + Send,
    Fut: std::future::Future<Output = Result<(), BoxError>> + Send,
    T: Send + 'static,
{
    async fn reduce(&mut self, batch: Vec<T>) -> Result<(), BoxError> {
        self(batch).await
    }
}

/// Adapts a synchronous closure into a [`Reducer`].
pub fn reducer_fn<T, F>(f: F) -> impl Reducer<T>
where
    F: FnMut(Vec<T>) -> Result<(), BoxError> + Send,
    T: Send + 'static,
{
    SyncReducer { f }
}

struct SyncReducer<F> {
    f: F,
}

#[async_trait]
impl<T, F> Reducer<T> for SyncReducer<F>
where
    F: FnMut(Vec<T>) -> Result<(), BoxError> + Send,
    T: Send + 'static,
{
    async fn reduce(&mut self, batch: Vec<T>) -> Result<(), BoxError> {
        (self.f)(batch)
    }
}
