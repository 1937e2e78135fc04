// crates/dataset-gate-node/src/transport.rs
// ============================================================================
// Module: Connection Transport
// Description: Idle-connection reclamation and HTTP protocol timers.
// Purpose: Bound per-connection resource use on both listeners.
// Dependencies: axum-server, hyper, hyper-util, tokio, tower
// ============================================================================

//! ## Overview
//! [`IdleAcceptor`] wraps every accepted connection twice: the byte stream
//! becomes an [`IdleStream`] that fails its next read once the connection
//! has been idle past the deadline, and the per-connection service becomes a
//! [`TrackedService`] that counts in-flight requests.
//!
//! A connection is idle when no request is in flight and no request has
//! finished within the idle window. HTTP/2 PING traffic does not count as
//! activity, so keepalive probes detect dead peers without keeping a quiet
//! connection open forever.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::future::Future;
use std::future::Ready;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::task::Context;
use std::task::Poll;
use std::time::Duration;

use axum::body::Body;
use axum::http::Response;
use axum_server::accept::Accept;
use bytes::Bytes;
use hyper::body::Body as HttpBody;
use hyper::body::Frame;
use hyper::body::SizeHint;
use hyper_util::rt::TokioExecutor;
use hyper_util::rt::TokioTimer;
use hyper_util::server::conn::auto::Builder;
use tokio::io::AsyncRead;
use tokio::io::AsyncWrite;
use tokio::io::ReadBuf;
use tokio::time::Instant;
use tokio::time::Sleep;
use tower::Service;

// ============================================================================
// SECTION: Transport Settings
// ============================================================================

/// Protocol timers applied to a listener.
#[derive(Debug, Clone, Copy)]
pub struct TransportSettings {
    /// Maximum time to receive HTTP/1 request headers.
    pub header_read_timeout: Option<Duration>,
    /// Idle window after which a quiet connection is torn down.
    pub idle_timeout: Duration,
    /// HTTP/2 keepalive PING interval.
    pub keepalive_interval: Option<Duration>,
    /// Time to wait for a keepalive PING acknowledgement.
    pub keepalive_timeout: Duration,
}

impl TransportSettings {
    /// Applies the protocol timers to a hyper connection builder.
    pub fn apply(&self, builder: &mut Builder<TokioExecutor>) {
        builder.http1().timer(TokioTimer::new()).header_read_timeout(self.header_read_timeout);
        let mut http2 = builder.http2();
        http2.timer(TokioTimer::new());
        if let Some(interval) = self.keepalive_interval {
            http2.keep_alive_interval(interval).keep_alive_timeout(self.keepalive_timeout);
        }
    }

    /// Returns an acceptor enforcing the idle window.
    #[must_use]
    pub const fn idle_acceptor(&self) -> IdleAcceptor {
        IdleAcceptor::new(self.idle_timeout)
    }
}

// ============================================================================
// SECTION: Connection Activity
// ============================================================================

/// Request activity shared between a connection's stream and service.
#[derive(Debug)]
struct ConnectionActivity {
    /// Connection start, the origin for `last_active_ms`.
    started: Instant,
    /// Requests currently being served (including response bodies).
    in_flight: AtomicUsize,
    /// Milliseconds since `started` at which the last request finished.
    last_active_ms: AtomicU64,
}

impl ConnectionActivity {
    /// Creates activity state for a freshly accepted connection.
    fn new() -> Self {
        Self {
            started: Instant::now(),
            in_flight: AtomicUsize::new(0),
            last_active_ms: AtomicU64::new(0),
        }
    }

    /// Marks the start of a request.
    fn begin(self: &Arc<Self>) -> InFlightGuard {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        InFlightGuard {
            activity: Arc::clone(self),
        }
    }

    /// Records "now" as the latest activity.
    fn touch(&self) {
        let elapsed = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.last_active_ms.store(elapsed, Ordering::Release);
    }

    /// Returns the idle deadline, or `None` while requests are in flight.
    fn idle_deadline(&self, idle_timeout: Duration) -> Option<Instant> {
        if self.in_flight.load(Ordering::Acquire) > 0 {
            return None;
        }
        let last = Duration::from_millis(self.last_active_ms.load(Ordering::Acquire));
        Some(self.started + last + idle_timeout)
    }
}

/// Decrements the in-flight count when a request (and its body) completes.
#[derive(Debug)]
struct InFlightGuard {
    /// Activity state for the owning connection.
    activity: Arc<ConnectionActivity>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.activity.touch();
        self.activity.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

// ============================================================================
// SECTION: Idle Acceptor
// ============================================================================

/// Acceptor that attaches idle tracking to every connection.
#[derive(Debug, Clone, Copy)]
pub struct IdleAcceptor {
    /// Idle window applied to accepted connections.
    idle_timeout: Duration,
}

impl IdleAcceptor {
    /// Creates an acceptor with the given idle window.
    #[must_use]
    pub const fn new(idle_timeout: Duration) -> Self {
        Self {
            idle_timeout,
        }
    }
}

impl<I, S> Accept<I, S> for IdleAcceptor {
    type Stream = IdleStream<I>;
    type Service = TrackedService<S>;
    type Future = Ready<io::Result<(Self::Stream, Self::Service)>>;

    fn accept(&self, stream: I, service: S) -> Self::Future {
        let activity = Arc::new(ConnectionActivity::new());
        let stream = IdleStream::new(stream, Arc::clone(&activity), self.idle_timeout);
        let service = TrackedService {
            inner: service,
            activity,
        };
        std::future::ready(Ok((stream, service)))
    }
}

// ============================================================================
// SECTION: Idle Stream
// ============================================================================

/// Byte stream that errors once its connection has been idle too long.
pub struct IdleStream<S> {
    /// Underlying transport stream.
    inner: S,
    /// Activity shared with the connection's service.
    activity: Arc<ConnectionActivity>,
    /// Idle window.
    idle_timeout: Duration,
    /// Timer armed for the next idle check.
    deadline: Pin<Box<Sleep>>,
}

impl<S> IdleStream<S> {
    /// Wraps a stream; the first deadline is one idle window from now.
    fn new(inner: S, activity: Arc<ConnectionActivity>, idle_timeout: Duration) -> Self {
        Self {
            inner,
            activity,
            idle_timeout,
            deadline: Box::pin(tokio::time::sleep(idle_timeout)),
        }
    }

    /// Fails with `TimedOut` once the connection is idle past its window.
    fn poll_idle(&mut self, cx: &mut Context<'_>) -> io::Result<()> {
        loop {
            if self.deadline.as_mut().poll(cx).is_pending() {
                return Ok(());
            }
            match self.activity.idle_deadline(self.idle_timeout) {
                None => self.deadline.as_mut().reset(Instant::now() + self.idle_timeout),
                Some(deadline) if deadline > Instant::now() => {
                    self.deadline.as_mut().reset(deadline);
                }
                Some(_) => {
                    return Err(io::Error::new(io::ErrorKind::TimedOut, "connection idle"));
                }
            }
        }
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for IdleStream<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if let Err(err) = this.poll_idle(cx) {
            tracing::debug!(idle_secs = this.idle_timeout.as_secs(), "closing idle connection");
            return Poll::Ready(Err(err));
        }
        Pin::new(&mut this.inner).poll_read(cx, buf)
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for IdleStream<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().inner).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }

    fn poll_write_vectored(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().inner).poll_write_vectored(cx, bufs)
    }

    fn is_write_vectored(&self) -> bool {
        self.inner.is_write_vectored()
    }
}

// ============================================================================
// SECTION: Tracked Service
// ============================================================================

/// Per-connection service that reports request activity.
#[derive(Clone)]
pub struct TrackedService<S> {
    /// Wrapped service.
    inner: S,
    /// Activity shared with the connection's stream.
    activity: Arc<ConnectionActivity>,
}

impl<S, R> Service<R> for TrackedService<S>
where
    S: Service<R, Response = Response<Body>>,
    S::Future: Send + 'static,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response<Body>, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: R) -> Self::Future {
        let guard = self.activity.begin();
        let future = self.inner.call(request);
        Box::pin(async move {
            let response = future.await?;
            Ok(response.map(|body| {
                Body::new(TrackedBody {
                    inner: body,
                    _guard: guard,
                })
            }))
        })
    }
}

/// Response body that keeps its request in flight until fully sent.
struct TrackedBody {
    /// Wrapped response body.
    inner: Body,
    /// Released when hyper drops the body.
    _guard: InFlightGuard,
}

impl HttpBody for TrackedBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        Pin::new(&mut self.get_mut().inner).poll_frame(cx)
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions use unwrap for clarity."
    )]

    use tokio::io::AsyncReadExt;
    use tokio::io::AsyncWriteExt;

    use super::*;

    /// Idle window used by the stream tests.
    const IDLE: Duration = Duration::from_secs(300);

    #[tokio::test(start_paused = true)]
    async fn quiet_connection_times_out() {
        let (_client, server) = tokio::io::duplex(64);
        let mut stream = IdleStream::new(server, Arc::new(ConnectionActivity::new()), IDLE);
        let started = Instant::now();
        let err = stream.read(&mut [0_u8; 8]).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
        assert!(started.elapsed() >= IDLE);
    }

    #[tokio::test(start_paused = true)]
    async fn bytes_pass_through() {
        let (mut client, server) = tokio::io::duplex(64);
        let mut stream = IdleStream::new(server, Arc::new(ConnectionActivity::new()), IDLE);
        client.write_all(b"ping").await.unwrap();
        let mut buf = [0_u8; 4];
        stream.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");
        stream.write_all(b"pong").await.unwrap();
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"pong");
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_request_holds_the_connection_open() {
        let (_client, server) = tokio::io::duplex(64);
        let activity = Arc::new(ConnectionActivity::new());
        let mut stream = IdleStream::new(server, Arc::clone(&activity), IDLE);
        let guard = activity.begin();

        let mut buf = [0_u8; 8];
        let held = tokio::time::timeout(IDLE * 3, stream.read(&mut buf)).await;
        assert!(held.is_err(), "read must still be pending while a request is in flight");

        drop(guard);
        let released = Instant::now();
        let err = stream.read(&mut buf).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
        // Activity is stored at millisecond resolution.
        assert!(released.elapsed() + Duration::from_millis(1) >= IDLE);
    }

    #[test]
    fn deadline_is_absent_while_busy() {
        let activity = Arc::new(ConnectionActivity::new());
        let guard = activity.begin();
        assert!(activity.idle_deadline(IDLE).is_none());
        drop(guard);
        assert!(activity.idle_deadline(IDLE).is_some());
    }
}
