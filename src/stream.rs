//! Drivers that pull text deltas out of a byte source.
//!
//! [`DeltaStream`] is the async form used for HTTP bodies, [`Deltas`] the
//! blocking form for any iterator of chunks. Both own a
//! [`DeltaDecoder`] and only read more input when the buffered frames
//! cannot satisfy the next request.

use std::iter::FusedIterator;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::{self, BoxStream, Stream, StreamExt, TryStreamExt};

use crate::client::ClientError;
use crate::sse::DeltaDecoder;

/// Async sequence of text fragments decoded from a streamed response.
///
/// Ends after the `[DONE]` sentinel or when the body ends. A transport
/// error while reading is yielded once and ends the stream. Dropping the
/// stream drops the underlying body.
pub struct DeltaStream {
    inner: BoxStream<'static, Result<String, ClientError>>,
}

impl DeltaStream {
    /// Decode deltas from any fallible byte stream.
    pub fn new<S, B, E>(bytes: S) -> Self
    where
        S: Stream<Item = Result<B, E>> + Send + 'static,
        B: AsRef<[u8]> + Send + 'static,
        E: Into<ClientError> + Send + 'static,
    {
        let inner = stream::unfold(
            (Box::pin(bytes), DeltaDecoder::new()),
            |(mut bytes, mut decoder)| async move {
                loop {
                    if let Some(delta) = decoder.next_delta() {
                        return Some((Ok(delta), (bytes, decoder)));
                    }
                    if decoder.is_finished() {
                        return None;
                    }

                    match bytes.next().await {
                        Some(Ok(chunk)) => decoder.feed(chunk.as_ref()),
                        Some(Err(e)) => {
                            decoder.finish();
                            return Some((Err(e.into()), (bytes, decoder)));
                        }
                        None => {
                            if !decoder.buffered().is_empty() {
                                tracing::debug!(
                                    remaining = decoder.buffered().len(),
                                    "stream ended inside a frame, dropping remainder"
                                );
                            }
                            decoder.finish();
                            return None;
                        }
                    }
                }
            },
        )
        .boxed();

        Self { inner }
    }

    /// Decode deltas from an HTTP response body.
    ///
    /// The response must already be known to be successful; see
    /// [`SSEResponseExt::delta_stream`] for the checked variant.
    pub fn from_response(response: reqwest::Response) -> Self {
        Self::new(response.bytes_stream())
    }

    /// Concatenate every fragment, the way the UI renders a reply.
    pub async fn collect_text(self) -> Result<String, ClientError> {
        self.try_collect().await
    }
}

impl Stream for DeltaStream {
    type Item = Result<String, ClientError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl std::fmt::Debug for DeltaStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeltaStream").finish_non_exhaustive()
    }
}

/// Extension trait for `reqwest::Response` to open a delta stream.
pub trait SSEResponseExt {
    /// Check that the response can be streamed and wrap its body.
    ///
    /// Fails with [`ClientError::StreamUnavailable`] on a non-success
    /// status or an empty body, before any decoding starts.
    fn delta_stream(
        self,
    ) -> impl std::future::Future<Output = Result<DeltaStream, ClientError>> + Send;
}

impl SSEResponseExt for reqwest::Response {
    async fn delta_stream(self) -> Result<DeltaStream, ClientError> {
        let status = self.status();

        if !status.is_success() {
            let body = match self.text().await {
                Ok(body) => body,
                Err(e) => {
                    tracing::debug!(%status, error = %e, "could not read error response body");
                    String::new()
                }
            };
            return Err(ClientError::StreamUnavailable {
                status: Some(status),
                message: if body.is_empty() {
                    format!("HTTP {}", status)
                } else {
                    format!("HTTP {}: {}", status, body)
                },
            });
        }

        if self.content_length() == Some(0) {
            return Err(ClientError::StreamUnavailable {
                status: Some(status),
                message: "response has no body".to_string(),
            });
        }

        Ok(DeltaStream::from_response(self))
    }
}

/// Blocking sequence of text fragments over an iterator of chunks.
///
/// # Example
/// ```
/// use vibetune::stream::Deltas;
///
/// let chunks = [
///     "data: {\"delta\":\"Hi\"}\n\n",
///     "data: {\"delta\":\" there\"}\n\n",
///     "data: [DONE]\n\n",
/// ];
/// let deltas: Vec<String> = Deltas::new(chunks).collect();
/// assert_eq!(deltas, ["Hi", " there"]);
/// ```
#[derive(Debug)]
pub struct Deltas<I> {
    chunks: I,
    decoder: DeltaDecoder,
}

impl<I> Deltas<I>
where
    I: Iterator,
    I::Item: AsRef<[u8]>,
{
    pub fn new(chunks: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            chunks: chunks.into_iter(),
            decoder: DeltaDecoder::new(),
        }
    }
}

impl<I> Iterator for Deltas<I>
where
    I: Iterator,
    I::Item: AsRef<[u8]>,
{
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            if let Some(delta) = self.decoder.next_delta() {
                return Some(delta);
            }
            if self.decoder.is_finished() {
                return None;
            }
            let Some(chunk) = self.chunks.next() else {
                self.decoder.finish();
                return None;
            };
            self.decoder.feed(chunk.as_ref());
        }
    }
}

impl<I> FusedIterator for Deltas<I>
where
    I: Iterator,
    I::Item: AsRef<[u8]>,
{
}
