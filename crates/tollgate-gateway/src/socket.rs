//! The Unix domain socket server.
//!
//! Wire format: a 4-byte big-endian length prefix, then one JSON-encoded
//! frame. A peer's first frame must be `register`; everything after that
//! is requests and approval decisions. Each connection gets one reader
//! loop and one writer task pumping the connection's outbound channel, so
//! frames to a peer go out in send order.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tracing::{debug, info, warn};

use tollgate_approval::ApprovalWorkflow;
use tollgate_connections::{Connection, ConnectionRegistry, OutboundReceiver, outbound_channel};
use tollgate_core::{ClientFrame, ConnectionId, ServerFrame};

use crate::dispatcher::RequestDispatcher;
use crate::services::Services;

/// Upper bound on a single frame's payload, in bytes.
const MAX_FRAME_LEN: usize = 10_485_760;

/// How long a fresh connection may take to send its `register` frame.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);

/// Accepts peers, runs their handshakes, and feeds the dispatcher.
pub struct SocketServer {
    registry: Arc<ConnectionRegistry>,
    approval: Arc<ApprovalWorkflow>,
    dispatcher: Arc<RequestDispatcher>,
}

impl SocketServer {
    /// Wire a server over an existing service graph.
    #[must_use]
    pub fn new(services: &Services, dispatcher: Arc<RequestDispatcher>) -> Self {
        Self {
            registry: Arc::clone(&services.registry),
            approval: Arc::clone(&services.approval),
            dispatcher,
        }
    }

    /// Bind the listening socket, clearing any stale file first.
    ///
    /// # Errors
    ///
    /// Fails when the parent directory cannot be created or the socket
    /// cannot be bound.
    pub fn bind(path: &Path) -> io::Result<UnixListener> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let listener = UnixListener::bind(path)?;
        info!(path = %path.display(), "Listening on Unix socket");
        Ok(listener)
    }

    /// Run the accept loop until the task is aborted.
    pub fn spawn(self: Arc<Self>, listener: UnixListener) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, _addr)) => {
                        let server = Arc::clone(&self);
                        tokio::spawn(async move {
                            server.handle_client(stream).await;
                        });
                    },
                    Err(e) => {
                        warn!(error = %e, "Failed to accept socket connection");
                    },
                }
            }
        })
    }

    /// Drive one peer from handshake to disconnect.
    async fn handle_client(&self, stream: UnixStream) {
        let (mut reader, writer) = stream.into_split();

        // First frame must be the registration, within the bound.
        let register = match tokio::time::timeout(HANDSHAKE_TIMEOUT, read_frame(&mut reader)).await
        {
            Ok(Ok(Some(ClientFrame::Register(info)))) => info,
            Ok(Ok(Some(_))) => {
                warn!("Peer sent a frame before registering — dropped");
                return;
            },
            Ok(Ok(None) | Err(_)) => {
                debug!("Peer vanished during handshake");
                return;
            },
            Err(_) => {
                warn!("Handshake timed out");
                return;
            },
        };

        let (outbound, outbound_rx) = outbound_channel();
        let connection = self
            .registry
            .register(Connection::from_register(register, outbound));
        let id = connection.id;

        let writer_task = tokio::spawn(pump_outbound(writer, outbound_rx, id));
        if !self
            .registry
            .send(id, &ServerFrame::Registered { connection_id: id })
        {
            warn!(connection_id = %id, "Registered ack not delivered");
        }

        self.read_loop(&mut reader, id).await;

        self.registry.remove(id);
        writer_task.abort();
        info!(connection = %id, "Peer disconnected");
    }

    /// Read frames until EOF or a fatal framing error.
    async fn read_loop(&self, reader: &mut OwnedReadHalf, id: ConnectionId) {
        loop {
            let frame = match read_frame(reader).await {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) => {
                    warn!(connection = %id, error = %e, "Framing error — closing connection");
                    break;
                },
            };

            match frame {
                ClientFrame::Register(_) => {
                    warn!(connection = %id, "Duplicate register frame ignored");
                },
                ClientFrame::Request(envelope) => {
                    // Per-request task: an approval suspension on one
                    // request must not stall this peer's other frames.
                    let dispatcher = Arc::clone(&self.dispatcher);
                    tokio::spawn(async move {
                        dispatcher.dispatch(id, envelope).await;
                    });
                },
                ClientFrame::Confirmation {
                    message_id,
                    user_message,
                } => {
                    if !self.approval.handle_confirmation(message_id, &user_message) {
                        warn!(connection = %id, %message_id, "Confirmation for unknown approval");
                    }
                },
                ClientFrame::ApprovalState { message_id, state } => {
                    if !self.approval.handle_state(message_id, &state) {
                        warn!(connection = %id, %message_id, "State for unknown approval");
                    }
                },
            }
        }
    }
}

/// Default socket location under the tollgate data directory.
#[must_use]
pub fn default_socket_path(home_root: &Path) -> PathBuf {
    home_root.join("gateway.sock")
}

/// Read one length-prefixed frame. `Ok(None)` is a clean EOF.
async fn read_frame(reader: &mut OwnedReadHalf) -> io::Result<Option<ClientFrame>> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {},
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame of {len} bytes exceeds the {MAX_FRAME_LEN} byte cap"),
        ));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    serde_json::from_slice(&payload)
        .map(Some)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Writer task: drain the outbound channel onto the stream.
async fn pump_outbound(mut writer: OwnedWriteHalf, mut rx: OutboundReceiver, id: ConnectionId) {
    while let Some(bytes) = rx.recv().await {
        let Ok(len) = u32::try_from(bytes.len()) else {
            warn!(connection = %id, "Outbound frame too large — dropped");
            continue;
        };
        if writer.write_all(&len.to_be_bytes()).await.is_err()
            || writer.write_all(&bytes).await.is_err()
        {
            debug!(connection = %id, "Peer transport closed mid-write");
            break;
        }
    }
}
