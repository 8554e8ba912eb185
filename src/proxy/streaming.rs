//! Streaming response body that keeps a copy of every chunk it forwards

use crate::infrastructure::log_messages::relay as messages;
use bytes::{Bytes, BytesMut};
use futures_util::Stream;
use pin_project_lite::pin_project;
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tracing::warn;

/// Response bytes retained for auditing
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CapturedBody {
    /// The upstream body was read to its end
    Complete(Bytes),
    /// The stream failed or the client went away before the end
    Partial(Bytes),
}

impl CapturedBody {
    pub fn bytes(&self) -> &Bytes {
        match self {
            Self::Complete(bytes) | Self::Partial(bytes) => bytes,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete(_))
    }
}

pin_project! {
    /// Forwards chunks unchanged while accumulating them. The accumulated
    /// bytes are handed off exactly once: at end of stream, on the first
    /// error, or when the stream is dropped early.
    pub struct CapturingStream<S> {
        #[pin]
        inner: S,
        captured: BytesMut,
        handoff: Option<oneshot::Sender<CapturedBody>>,
    }

    impl<S> PinnedDrop for CapturingStream<S> {
        fn drop(this: Pin<&mut Self>) {
            let this = this.project();
            hand_off(this.handoff, this.captured, false);
        }
    }
}

impl<S> CapturingStream<S> {
    pub fn new(inner: S) -> (Self, oneshot::Receiver<CapturedBody>) {
        let (tx, rx) = oneshot::channel();
        let stream = Self {
            inner,
            captured: BytesMut::new(),
            handoff: Some(tx),
        };
        (stream, rx)
    }
}

fn hand_off(
    handoff: &mut Option<oneshot::Sender<CapturedBody>>,
    captured: &mut BytesMut,
    complete: bool,
) {
    if let Some(tx) = handoff.take() {
        let bytes = std::mem::take(captured).freeze();
        let body = if complete {
            CapturedBody::Complete(bytes)
        } else {
            CapturedBody::Partial(bytes)
        };
        // The audit task may already be gone, nothing to do then
        let _ = tx.send(body);
    }
}

impl<S, E> Stream for CapturingStream<S>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: fmt::Display,
{
    type Item = Result<Bytes, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();

        match this.inner.poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                if this.handoff.is_some() {
                    this.captured.extend_from_slice(&chunk);
                }
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(e))) => {
                warn!(error = %e, "{}", messages::RESPONSE_STREAM_FAILED);
                hand_off(this.handoff, this.captured, false);
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                hand_off(this.handoff, this.captured, true);
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::{stream, StreamExt};
    use std::io;

    fn chunks(parts: &[&'static str]) -> Vec<Result<Bytes, io::Error>> {
        parts.iter().map(|p| Ok(Bytes::from_static(p.as_bytes()))).collect()
    }

    #[tokio::test]
    async fn test_forwarded_and_captured_bytes_are_identical() {
        let upstream = stream::iter(chunks(&["{\"id\":", "\"cmpl-1\"", "}"]));
        let (stream, rx) = CapturingStream::new(upstream);

        let forwarded: Vec<Bytes> = stream.map(|chunk| chunk.unwrap()).collect().await;
        let forwarded: Vec<u8> = forwarded.concat();

        let captured = rx.await.unwrap();
        assert!(captured.is_complete());
        assert_eq!(captured.bytes().as_ref(), forwarded.as_slice());
        assert_eq!(captured.bytes().as_ref(), b"{\"id\":\"cmpl-1\"}");
    }

    #[tokio::test]
    async fn test_stream_error_hands_off_partial_body() {
        let items = vec![
            Ok(Bytes::from_static(b"partial")),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
            Ok(Bytes::from_static(b"ignored")),
        ];
        let (stream, rx) = CapturingStream::new(stream::iter(items));

        let results: Vec<_> = stream.collect().await;
        assert_eq!(results.len(), 3);

        assert_eq!(
            rx.await.unwrap(),
            CapturedBody::Partial(Bytes::from_static(b"partial"))
        );
    }

    #[tokio::test]
    async fn test_dropping_early_hands_off_partial_body() {
        let (mut stream, rx) = CapturingStream::new(stream::iter(chunks(&["first", "second"])));

        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first, Bytes::from_static(b"first"));
        drop(stream);

        assert_eq!(
            rx.await.unwrap(),
            CapturedBody::Partial(Bytes::from_static(b"first"))
        );
    }

    #[tokio::test]
    async fn test_empty_body_is_complete() {
        let (stream, rx) = CapturingStream::new(stream::iter(chunks(&[])));
        let forwarded: Vec<_> = stream.collect().await;
        assert!(forwarded.is_empty());
        assert_eq!(rx.await.unwrap(), CapturedBody::Complete(Bytes::new()));
    }
}
