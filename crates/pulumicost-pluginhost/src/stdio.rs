//! Stdio transport mode (§4.4): frames RPC over a child's piped
//! stdin/stdout instead of a loopback TCP port. Used for plugins that
//! prefer not to open a socket at all.

use std::pin::Pin;
use std::task::{Context, Poll};

use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::process::{ChildStdin, ChildStdout};
use tonic::transport::{Channel, Endpoint, Uri};
use tower::service_fn;

/// Combines a child's stdout (read half) and stdin (write half) into a
/// single duplex stream tonic can dial over, for plugins launched with
/// `PluginTransport::Stdio`.
pub struct ChildStdio {
    stdout: ChildStdout,
    stdin: ChildStdin,
}

impl ChildStdio {
    pub fn new(stdout: ChildStdout, stdin: ChildStdin) -> Self {
        ChildStdio { stdout, stdin }
    }
}

impl AsyncRead for ChildStdio {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<std::io::Result<()>> {
        let this = self.get_mut();
        Pin::new(&mut this.stdout).poll_read(cx, buf)
    }
}

impl AsyncWrite for ChildStdio {
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<std::io::Result<usize>> {
        let this = self.get_mut();
        Pin::new(&mut this.stdin).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        let this = self.get_mut();
        Pin::new(&mut this.stdin).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        let this = self.get_mut();
        Pin::new(&mut this.stdin).poll_shutdown(cx)
    }
}

/// Dial a single stdio-framed connection. The connector hands back the one
/// combined stream it was given and is not reusable — correct for a
/// session that dials exactly once per launched plugin. Wrapped in
/// `TokioIo` since hyper 1.0 (tonic 0.12's transport) reads/writes through
/// `hyper::rt::{Read, Write}`, not tokio's `AsyncRead`/`AsyncWrite`.
pub async fn connect(io: ChildStdio) -> Result<Channel, tonic::transport::Error> {
    let mut io = Some(TokioIo::new(io));
    Endpoint::try_from("http://[::]:0")
        .expect("static placeholder uri always parses")
        .connect_with_connector(service_fn(move |_: Uri| {
            let io = io.take().expect("stdio connector dialed more than once");
            async move { Ok::<_, std::io::Error>(io) }
        }))
        .await
}
