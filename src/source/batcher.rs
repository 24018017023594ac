use crate::config::BatchPolicy;
use crate::error::PipelineError;

use super::streamer::Streamer;

/// A numbered group of elements, the unit of transfer through the
/// pipeline. `seq` is assigned by the batcher and increases by one per
/// batch, which is what strict ordering resequences on.
#[derive(Debug)]
pub struct Batch<T> {
    pub seq: u64,
    pub elements: Vec<T>,
}

/// Pulls elements out of a set of streamers and groups them into
/// batches of at most `batch_size` elements.
///
/// Round-robin takes one element per live streamer per turn, so no
/// source runs ahead of the others by more than a batch; exhausted
/// streamers drop out of the rotation and only the final batch of the
/// run can be short. Sequential drains one streamer before opening the
/// next and cuts the batch at every streamer boundary.
pub struct Batcher<T> {
    streamers: Vec<Box<dyn Streamer<T>>>,
    live: Vec<bool>,
    policy: BatchPolicy,
    batch_size: usize,
    cursor: usize,
    current: usize,
    next_seq: u64,
}

impl<T: Send> Batcher<T> {
    pub fn new(
        streamers: Vec<Box<dyn Streamer<T>>>,
        policy: BatchPolicy,
        batch_size: usize,
    ) -> Self {
        let live = vec![true; streamers.len()];
        Batcher {
            streamers,
            live,
            policy,
            batch_size,
            cursor: 0,
            current: 0,
            next_seq: 0,
        }
    }

    /// Next batch, or `Ok(None)` once every streamer is exhausted.
    /// A streamer read failure ends the batcher for good.
    pub async fn next_batch(&mut self) -> Result<Option<Batch<T>>, PipelineError> {
        let elements = match self.policy {
            BatchPolicy::RoundRobin => self.fill_round_robin().await?,
            BatchPolicy::Sequential => self.fill_sequential().await?,
        };

        if elements.is_empty() {
            return Ok(None);
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        Ok(Some(Batch { seq, elements }))
    }

    async fn fill_round_robin(&mut self) -> Result<Vec<T>, PipelineError> {
        let mut elements = Vec::with_capacity(self.batch_size);

        while elements.len() < self.batch_size && self.live.iter().any(|live| *live) {
            let index = self.cursor;
            self.advance_cursor();

            if !self.live[index] {
                continue;
            }

            match self.streamers[index].next().await {
                Ok(Some(element)) => elements.push(element),
                Ok(None) => self.live[index] = false,
                Err(source) => return Err(PipelineError::StreamerRead { index, source }),
            }
        }

        Ok(elements)
    }

    async fn fill_sequential(&mut self) -> Result<Vec<T>, PipelineError> {
        let mut elements = Vec::with_capacity(self.batch_size);

        while elements.len() < self.batch_size && self.current < self.streamers.len() {
            let index = self.current;

            match self.streamers[index].next().await {
                Ok(Some(element)) => elements.push(element),
                Ok(None) => {
                    self.current += 1;
                    // cut here so a batch never spans two streamers
                    if !elements.is_empty() {
                        break;
                    }
                }
                Err(source) => return Err(PipelineError::StreamerRead { index, source }),
            }
        }

        Ok(elements)
    }

    fn advance_cursor(&mut self) {
        if !self.streamers.is_empty() {
            self.cursor = (self.cursor + 1) % self.streamers.len();
        }
    }
}
