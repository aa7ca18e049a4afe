use std::{
    convert::Infallible,
    pin::Pin,
    task::{Context, Poll},
};

use futures::StreamExt;
use hyper::body::{Body, Bytes, Frame, SizeHint};

use crate::stream::ChunkStream;

/// Body of an outgoing response: either materialized up front or produced
/// chunk by chunk while it is written.
#[derive(Debug)]
pub enum ResponseBody {
    Full(Option<Bytes>),
    Stream(ChunkStream),
}

impl ResponseBody {
    pub fn empty() -> Self {
        Self::Full(None)
    }

    pub fn full(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        if bytes.is_empty() {
            Self::Full(None)
        } else {
            Self::Full(Some(bytes))
        }
    }

    /// Length of a materialized body; `None` for streams.
    pub fn materialized_len(&self) -> Option<u64> {
        match self {
            Self::Full(bytes) => Some(bytes.as_ref().map_or(0, |b| b.len() as u64)),
            Self::Stream(_) => None,
        }
    }

    pub fn is_stream(&self) -> bool {
        matches!(self, Self::Stream(_))
    }
}

impl From<ChunkStream> for ResponseBody {
    fn from(stream: ChunkStream) -> Self {
        Self::Stream(stream)
    }
}

impl Body for ResponseBody {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match self.get_mut() {
            Self::Full(bytes) => Poll::Ready(bytes.take().map(|b| Ok(Frame::data(b)))),
            Self::Stream(stream) => stream
                .poll_next_unpin(cx)
                .map(|chunk| chunk.map(|c| Ok(Frame::data(c)))),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            Self::Full(bytes) => bytes.is_none(),
            Self::Stream(stream) => stream.is_finished(),
        }
    }

    fn size_hint(&self) -> SizeHint {
        match self {
            Self::Full(bytes) => SizeHint::with_exact(bytes.as_ref().map_or(0, |b| b.len() as u64)),
            Self::Stream(stream) => SizeHint::with_exact(stream.remaining()),
        }
    }
}
