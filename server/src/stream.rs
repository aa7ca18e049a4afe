//! Lazy generator for large randomized response bodies.
//!
//! A [`ChunkStream`] yields at most `chunk_size` bytes per poll and pauses
//! for `delay` between chunks. Nothing is generated until the writer asks for
//! the next chunk, so memory stays bounded by one chunk and a slow reader
//! slows the generator down with it.

use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll, ready},
    time::Duration,
};

use futures::Stream;
use hyper::body::Bytes;
use smol::Timer;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    #[error("chunk size must be greater than zero")]
    ZeroChunkSize,
}

/// Shape of a generated body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    pub total_size: u64,
    pub chunk_size: usize,
    pub delay: Duration,
}

impl ChunkPlan {
    pub fn new(total_size: u64, chunk_size: usize, delay: Duration) -> Result<Self, StreamError> {
        if chunk_size == 0 {
            return Err(StreamError::ZeroChunkSize);
        }

        Ok(Self {
            total_size,
            chunk_size,
            delay,
        })
    }

    /// Number of chunks the plan produces.
    pub fn chunk_count(&self) -> u64 {
        self.total_size.div_ceil(self.chunk_size as u64)
    }
}

pub struct ChunkStream {
    plan: ChunkPlan,
    emitted: u64,
    rng: fastrand::Rng,
    pause: Option<Timer>,
}

impl ChunkStream {
    pub fn new(plan: ChunkPlan) -> Self {
        Self {
            plan,
            emitted: 0,
            rng: fastrand::Rng::new(),
            pause: None,
        }
    }

    pub fn plan(&self) -> &ChunkPlan {
        &self.plan
    }

    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    pub fn remaining(&self) -> u64 {
        self.plan.total_size - self.emitted
    }

    pub fn is_finished(&self) -> bool {
        self.remaining() == 0
    }
}

impl std::fmt::Debug for ChunkStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkStream")
            .field("plan", &self.plan)
            .field("emitted", &self.emitted)
            .field("paused", &self.pause.is_some())
            .finish()
    }
}

impl Stream for ChunkStream {
    type Item = Bytes;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;

        if let Some(pause) = this.pause.as_mut() {
            ready!(Pin::new(pause).poll(cx));
            this.pause = None;
        }

        let remaining = this.remaining();
        if remaining == 0 {
            return Poll::Ready(None);
        }

        let len = remaining.min(this.plan.chunk_size as u64) as usize;
        let mut chunk = vec![0u8; len];
        this.rng.fill(&mut chunk);
        this.emitted += len as u64;

        // no pause after the final chunk
        if this.emitted < this.plan.total_size && !this.plan.delay.is_zero() {
            this.pause = Some(Timer::after(this.plan.delay));
        }

        Poll::Ready(Some(Bytes::from(chunk)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let chunks = self.remaining().div_ceil(self.plan.chunk_size as u64);
        let chunks = usize::try_from(chunks).unwrap_or(usize::MAX);
        (chunks, Some(chunks))
    }
}
