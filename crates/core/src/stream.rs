//! Streamed model replies.
//!
//! Providers push [`StreamChunk`]s into a bounded channel from a background
//! task; the caller pulls text fragments out of a [`ReplyStream`] in order.
//! Closing the stream (explicitly via [`ReplyStream::cancel`] or by dropping
//! it) makes the producer's next send fail, which ends the producer task.

use crate::error::ProviderError;
use crate::provider::StreamChunk;
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc;

/// The producing half handed to provider tasks.
pub type ChunkSender = mpsc::Sender<Result<StreamChunk, ProviderError>>;

/// A cancellable, in-order sequence of reply fragments.
pub struct ReplyStream {
    rx: mpsc::Receiver<Result<StreamChunk, ProviderError>>,
    finished: bool,
}

impl ReplyStream {
    /// Create a connected sender/stream pair.
    pub fn channel(buffer: usize) -> (ChunkSender, Self) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (tx, Self { rx, finished: false })
    }

    /// A stream that yields `text` once and completes.
    pub fn from_text(text: impl Into<String>) -> Self {
        let (tx, stream) = Self::channel(1);
        let _ = tx.try_send(Ok(StreamChunk::last(text)));
        stream
    }

    /// Stop consuming. No further fragments are yielded.
    pub fn cancel(&mut self) {
        if !self.finished {
            tracing::debug!("Reply stream cancelled");
        }
        self.rx.close();
        self.finished = true;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Pull fragments until completion, handing each to `on_fragment`, and
    /// return the concatenated text.
    ///
    /// With a `timeout`, the whole pull is bounded; on expiry the stream is
    /// cancelled and [`ProviderError::Timeout`] returned.
    pub async fn for_each_fragment<F>(
        &mut self,
        timeout: Option<Duration>,
        mut on_fragment: F,
    ) -> Result<String, ProviderError>
    where
        F: FnMut(&str),
    {
        let pull = async {
            let mut text = String::new();
            while let Some(fragment) = self.next().await {
                let fragment = fragment?;
                on_fragment(&fragment);
                text.push_str(&fragment);
            }
            Ok(text)
        };

        let Some(limit) = timeout else {
            return pull.await;
        };

        let outcome = tokio::time::timeout(limit, pull).await;
        match outcome {
            Ok(result) => result,
            Err(_) => {
                self.cancel();
                Err(ProviderError::Timeout(format!(
                    "reply not completed within {}s",
                    limit.as_secs_f32()
                )))
            }
        }
    }

    /// Concatenate every fragment.
    pub async fn collect_text(mut self, timeout: Option<Duration>) -> Result<String, ProviderError> {
        self.for_each_fragment(timeout, |_| {}).await
    }
}

impl Stream for ReplyStream {
    type Item = Result<String, ProviderError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if this.finished {
                return Poll::Ready(None);
            }
            match this.rx.poll_recv(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(None) => {
                    this.finished = true;
                    return Poll::Ready(None);
                }
                Poll::Ready(Some(Err(e))) => {
                    this.finished = true;
                    this.rx.close();
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(Some(Ok(chunk))) => {
                    if chunk.done {
                        this.finished = true;
                        this.rx.close();
                    }
                    match chunk.content {
                        Some(text) if !text.is_empty() => return Poll::Ready(Some(Ok(text))),
                        // Empty deltas (finish markers, usage-only chunks) carry no text.
                        _ => continue,
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn concatenates_fragments_in_order() {
        let (tx, stream) = ReplyStream::channel(8);
        tokio::spawn(async move {
            for part in ["Pana", "dol ", "helps"] {
                tx.send(Ok(StreamChunk::delta(part))).await.unwrap();
            }
            tx.send(Ok(StreamChunk::finished())).await.unwrap();
        });
        assert_eq!(stream.collect_text(None).await.unwrap(), "Panadol helps");
    }

    #[tokio::test]
    async fn from_text_yields_once() {
        let mut stream = ReplyStream::from_text("hello");
        assert_eq!(stream.next().await.unwrap().unwrap(), "hello");
        assert!(stream.next().await.is_none());
        assert!(stream.is_finished());
    }

    #[tokio::test]
    async fn error_ends_the_stream() {
        let (tx, mut stream) = ReplyStream::channel(4);
        tx.send(Ok(StreamChunk::delta("partial"))).await.unwrap();
        tx.send(Err(ProviderError::StreamInterrupted("reset".into())))
            .await
            .unwrap();

        let mut seen = Vec::new();
        let result = stream.for_each_fragment(None, |f| seen.push(f.to_string())).await;
        assert!(matches!(result, Err(ProviderError::StreamInterrupted(_))));
        assert_eq!(seen, vec!["partial"]);
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn cancel_stops_the_producer() {
        let (tx, mut stream) = ReplyStream::channel(1);
        stream.cancel();
        assert!(stream.next().await.is_none());
        assert!(tx.send(Ok(StreamChunk::delta("late"))).await.is_err());
    }

    #[tokio::test]
    async fn sender_drop_without_done_completes() {
        let (tx, stream) = ReplyStream::channel(2);
        tx.send(Ok(StreamChunk::delta("only"))).await.unwrap();
        drop(tx);
        assert_eq!(stream.collect_text(None).await.unwrap(), "only");
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_cancels_a_stalled_stream() {
        let (tx, mut stream) = ReplyStream::channel(2);
        tx.send(Ok(StreamChunk::delta("slow"))).await.unwrap();

        let result = stream
            .for_each_fragment(Some(Duration::from_secs(5)), |_| {})
            .await;
        assert!(matches!(result, Err(ProviderError::Timeout(_))));
        assert!(stream.is_finished());
        assert!(tx.send(Ok(StreamChunk::delta("late"))).await.is_err());
    }
}
