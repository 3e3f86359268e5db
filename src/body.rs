//! Request and response bodies.
//!
//! A [`Body`] is either empty, a fully buffered chunk of [`Bytes`], or a stream of chunks. Retrying
//! a request means sending its body again, so a body also knows whether it can be *rewound*:
//!
//! - empty bodies never need rewinding;
//! - buffered bodies rewind by cloning their bytes (cheap, reference counted);
//! - streamed bodies rewind only through an accessor supplied with [`Body::with_rewind`].
//!
//! Response bodies that get superseded by a retry are discarded with [`Body::drain`] so the
//! underlying connection can be reused.

use crate::error::{BodyError, BoxError};
use bytes::{Bytes, BytesMut};
use futures::stream::{BoxStream, Stream, StreamExt};
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// Caller-supplied accessor regenerating a body.
pub type RewindFn = Arc<dyn Fn() -> Result<Body, BoxError> + Send + Sync>;

/// HTTP body used for both requests and responses.
pub struct Body {
    kind: Kind,
    rewind: Option<RewindFn>,
}

enum Kind {
    Empty,
    Full(Bytes),
    Stream(BoxStream<'static, Result<Bytes, BoxError>>),
}

impl Body {
    /// An empty body.
    pub fn empty() -> Self {
        Self { kind: Kind::Empty, rewind: None }
    }

    /// A body streamed chunk by chunk. It is not rewindable unless an accessor is attached with
    /// [`Body::with_rewind`].
    pub fn from_stream<S, B, E>(stream: S) -> Self
    where
        S: Stream<Item = Result<B, E>> + Send + 'static,
        B: Into<Bytes>,
        E: Into<BoxError>,
    {
        let stream = stream.map(|chunk| chunk.map(Into::into).map_err(Into::into)).boxed();
        Self { kind: Kind::Stream(stream), rewind: None }
    }

    /// Attach an accessor that regenerates this body from scratch for a retry.
    ///
    /// The accessor takes precedence over the implicit rewind of buffered bodies.
    pub fn with_rewind<F, E>(mut self, rewind: F) -> Self
    where
        F: Fn() -> Result<Body, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        self.rewind = Some(Arc::new(move || rewind().map_err(Into::into)));
        self
    }

    /// Whether the body is known to carry no bytes.
    pub fn is_empty(&self) -> bool {
        match &self.kind {
            Kind::Empty => true,
            Kind::Full(bytes) => bytes.is_empty(),
            Kind::Stream(_) => false,
        }
    }

    /// Exact length when known without reading the body.
    pub fn len(&self) -> Option<u64> {
        match &self.kind {
            Kind::Empty => Some(0),
            Kind::Full(bytes) => Some(bytes.len() as u64),
            Kind::Stream(_) => None,
        }
    }

    /// Whether the body can be sent again: empty, buffered, or carrying a rewind accessor.
    pub fn is_rewindable(&self) -> bool {
        self.rewind.is_some() || !matches!(self.kind, Kind::Stream(_))
    }

    /// Capture what is needed to regenerate this body later.
    ///
    /// Returns `None` for empty bodies (nothing to resend) and for streams without an accessor.
    pub fn rewinder(&self) -> Option<Rewinder> {
        if let Some(rewind) = &self.rewind {
            return Some(Rewinder::Accessor(rewind.clone()));
        }
        match &self.kind {
            Kind::Full(bytes) if !bytes.is_empty() => Some(Rewinder::Buffered(bytes.clone())),
            _ => None,
        }
    }

    /// Read the whole body into memory.
    pub async fn to_bytes(mut self) -> Result<Bytes, BodyError> {
        match std::mem::replace(&mut self.kind, Kind::Empty) {
            Kind::Empty => Ok(Bytes::new()),
            Kind::Full(bytes) => Ok(bytes),
            Kind::Stream(mut stream) => {
                let mut buf = BytesMut::new();
                while let Some(chunk) = stream.next().await {
                    buf.extend_from_slice(&chunk.map_err(BodyError::Stream)?);
                }
                Ok(buf.freeze())
            }
        }
    }

    /// Read the body to the end, discarding every byte, then drop it.
    ///
    /// Returns the number of bytes discarded.
    pub async fn drain(mut self) -> Result<u64, BodyError> {
        let mut drained = 0u64;
        while let Some(chunk) = self.next().await {
            drained += chunk?.len() as u64;
        }
        Ok(drained)
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            Kind::Empty => "empty",
            Kind::Full(_) => "full",
            Kind::Stream(_) => "stream",
        };
        f.debug_struct("Body")
            .field("kind", &kind)
            .field("len", &self.len())
            .field("rewind", &self.rewind.as_ref().map(|_| "<accessor>"))
            .finish()
    }
}

impl Stream for Body {
    type Item = Result<Bytes, BodyError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if let Kind::Stream(stream) = &mut this.kind {
            let polled = stream.poll_next_unpin(cx);
            return match polled {
                Poll::Ready(Some(chunk)) => Poll::Ready(Some(chunk.map_err(BodyError::Stream))),
                Poll::Ready(None) => {
                    this.kind = Kind::Empty;
                    Poll::Ready(None)
                }
                Poll::Pending => Poll::Pending,
            };
        }
        match std::mem::replace(&mut this.kind, Kind::Empty) {
            Kind::Full(bytes) if !bytes.is_empty() => Poll::Ready(Some(Ok(bytes))),
            _ => Poll::Ready(None),
        }
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self { kind: Kind::Full(bytes), rewind: None }
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Bytes::from(bytes).into()
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Bytes::from(s).into()
    }
}

impl From<&'static str> for Body {
    fn from(s: &'static str) -> Self {
        Bytes::from_static(s.as_bytes()).into()
    }
}

impl From<&'static [u8]> for Body {
    fn from(bytes: &'static [u8]) -> Self {
        Bytes::from_static(bytes).into()
    }
}

/// Regenerates a request body for a retry.
#[derive(Clone)]
pub enum Rewinder {
    /// Buffered bytes, re-sent as-is.
    Buffered(Bytes),
    /// Caller-supplied accessor.
    Accessor(RewindFn),
}

impl Rewinder {
    /// Produce a fresh body. Accessor failures surface as [`BodyError::Rewind`].
    pub fn rewind(&self) -> Result<Body, BodyError> {
        match self {
            Rewinder::Buffered(bytes) => Ok(Body::from(bytes.clone())),
            Rewinder::Accessor(rewind) => {
                let mut body = rewind().map_err(BodyError::Rewind)?;
                if body.rewind.is_none() {
                    body.rewind = Some(rewind.clone());
                }
                Ok(body)
            }
        }
    }
}

impl fmt::Debug for Rewinder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rewinder::Buffered(bytes) => f.debug_tuple("Buffered").field(&bytes.len()).finish(),
            Rewinder::Accessor(_) => f.debug_tuple("Accessor").field(&"<accessor>").finish(),
        }
    }
}
