use axum::{
    body::{Body, Bytes},
    http::StatusCode,
};
use http_body::{Body as HttpBody, Frame, SizeHint};
use std::pin::Pin;
use std::task::{Context, Poll};

use super::invocation::Invocation;
use super::outcome::Outcome;
use crate::parameters::ResponseInfo;
use crate::timings::DbRuntime;

/// Response body that copies what it hands to the client for the loggers,
/// then reports the request when the body ends.
///
/// Frames pass through unchanged. At most `limit` bytes are copied; the
/// client always gets the full body. Dropped before its end, the body
/// reports what was sent so far under the response status.
pub(crate) struct LoggedBody {
    inner: Body,
    invocation: Option<Invocation>,
    response: ResponseInfo,
    captured: Vec<u8>,
    limit: usize,
    db_runtime: DbRuntime,
}

impl LoggedBody {
    pub(crate) fn new(
        inner: Body,
        invocation: Invocation,
        response: ResponseInfo,
        db_runtime: DbRuntime,
        limit: usize,
    ) -> Self {
        Self {
            inner,
            invocation: Some(invocation),
            response,
            captured: Vec::new(),
            limit,
            db_runtime,
        }
    }

    fn record(&mut self, data: &Bytes) {
        let room = self.limit.saturating_sub(self.captured.len());
        self.captured
            .extend_from_slice(&data[..data.len().min(room)]);
    }

    fn finish(&mut self, outcome: impl FnOnce(ResponseInfo) -> Outcome) {
        if let Some(mut invocation) = self.invocation.take() {
            let captured = std::mem::take(&mut self.captured);
            let response = self.response.clone().with_body(captured);
            invocation.after(&outcome(response));
        }
    }
}

impl HttpBody for LoggedBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = &mut *self;
        let polled = this
            .db_runtime
            .enter(|| Pin::new(&mut this.inner).poll_frame(cx));

        match polled {
            Poll::Ready(Some(Ok(frame))) => {
                if let Some(data) = frame.data_ref() {
                    this.record(data);
                }
                if this.inner.is_end_stream() {
                    this.finish(Outcome::Success);
                }
                Poll::Ready(Some(Ok(frame)))
            }
            Poll::Ready(Some(Err(err))) => {
                let message = err.to_string();
                this.finish(|_| Outcome::failure(StatusCode::INTERNAL_SERVER_ERROR, message));
                Poll::Ready(Some(Err(err)))
            }
            Poll::Ready(None) => {
                this.finish(Outcome::Success);
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl Drop for LoggedBody {
    fn drop(&mut self) {
        self.finish(Outcome::Success);
    }
}
