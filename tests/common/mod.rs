//! In-memory transport used to observe and break the wire in tests

#![allow(dead_code)]

use async_trait::async_trait;
use matrix_link::{Connector, Endpoint};
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// Route library logs to the test harness
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Shared knobs and observations for [`MockConnector`]
#[derive(Debug, Default)]
pub struct MockState {
    /// Number of connect attempts
    pub connects: AtomicUsize,
    /// Number of shutdowns seen
    pub closes: AtomicUsize,
    /// Every byte successfully written, across connections
    pub written: Mutex<Vec<u8>>,
    /// Fail this many upcoming writes with a broken pipe
    pub fail_writes: AtomicUsize,
    /// Refuse this many upcoming connects
    pub refuse_connects: AtomicUsize,
    /// Never complete connects
    pub hang_connects: AtomicBool,
    /// Never complete writes
    pub stall_writes: AtomicBool,
    /// Streams opened by connect number `n <= peer_closed_upto` read EOF
    pub peer_closed_upto: AtomicUsize,
    /// Bytes the matrix has sent and nobody has read yet
    pub inbound: Mutex<Vec<u8>>,
}

impl MockState {
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Hang up every connection opened so far, as the matrix would
    pub fn close_from_peer(&self) {
        self.peer_closed_upto.store(self.connects(), Ordering::SeqCst);
    }

    /// Queue bytes as if the matrix had sent them
    pub fn send_from_peer(&self, bytes: &[u8]) {
        self.inbound.lock().unwrap().extend_from_slice(bytes);
    }

    pub fn unread(&self) -> usize {
        self.inbound.lock().unwrap().len()
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn written(&self) -> String {
        String::from_utf8(self.written.lock().unwrap().clone()).unwrap()
    }

    /// Written text split into terminated lines
    pub fn lines(&self) -> Vec<String> {
        let text = self.written();
        assert!(text.is_empty() || text.ends_with("\r\n"), "{:?}", text);
        text.split_terminator("\r\n").map(str::to_string).collect()
    }
}

fn take_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

/// Connector producing [`MockStream`]s
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    pub state: Arc<MockState>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Connector for MockConnector {
    type Stream = MockStream;

    async fn connect(&self, _endpoint: &Endpoint) -> io::Result<MockStream> {
        let id = self.state.connects.fetch_add(1, Ordering::SeqCst) + 1;

        if self.state.hang_connects.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if take_one(&self.state.refuse_connects) {
            return Err(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"));
        }

        Ok(MockStream {
            id,
            state: Arc::clone(&self.state),
            yield_next: false,
        })
    }
}

/// Stream that writes a few bytes at a time and yields in between, so any
/// missing serialization shows up as interleaved output
#[derive(Debug)]
pub struct MockStream {
    id: usize,
    state: Arc<MockState>,
    yield_next: bool,
}

impl AsyncRead for MockStream {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let mut inbound = self.state.inbound.lock().unwrap();
        if !inbound.is_empty() {
            let n = inbound.len().min(buf.remaining());
            buf.put_slice(&inbound[..n]);
            inbound.drain(..n);
            return Poll::Ready(Ok(()));
        }
        if self.id <= self.state.peer_closed_upto.load(Ordering::SeqCst) {
            // EOF
            return Poll::Ready(Ok(()));
        }
        Poll::Pending
    }
}

impl AsyncWrite for MockStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        if self.state.stall_writes.load(Ordering::SeqCst) {
            return Poll::Pending;
        }
        if take_one(&self.state.fail_writes) {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "broken pipe",
            )));
        }
        if self.yield_next {
            self.yield_next = false;
            cx.waker().wake_by_ref();
            return Poll::Pending;
        }

        self.yield_next = true;
        let n = buf.len().min(4);
        self.state.written.lock().unwrap().extend_from_slice(&buf[..n]);
        Poll::Ready(Ok(n))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
        Poll::Ready(Ok(()))
    }
}
