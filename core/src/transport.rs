/// Push transport collaborator: live events in and out
use crate::error::{Result, SyncError};
use crate::message::{InboundEvent, OutboundEvent};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Push a message to the counterpart
    async fn emit(&self, event: &OutboundEvent) -> Result<()>;

    /// New listener for inbound messages. Dropping the receiver unsubscribes.
    fn subscribe(&self) -> broadcast::Receiver<InboundEvent>;
}

/// In-process transport hub (embedding apps, tests)
#[derive(Clone)]
pub struct LocalTransport {
    inbound: broadcast::Sender<InboundEvent>,
    outbound: broadcast::Sender<OutboundEvent>,
}

impl LocalTransport {
    pub fn new(capacity: usize) -> Self {
        let (inbound, _) = broadcast::channel(capacity.max(1));
        let (outbound, _) = broadcast::channel(capacity.max(1));
        Self { inbound, outbound }
    }

    /// Hand an inbound event to every listener; returns how many got it
    pub fn deliver(&self, event: InboundEvent) -> usize {
        self.inbound.send(event).unwrap_or(0)
    }

    /// Stream of everything emitted through this hub
    pub fn outbound(&self) -> broadcast::Receiver<OutboundEvent> {
        self.outbound.subscribe()
    }

    pub fn listener_count(&self) -> usize {
        self.inbound.receiver_count()
    }
}

#[async_trait]
impl Transport for LocalTransport {
    async fn emit(&self, event: &OutboundEvent) -> Result<()> {
        let _ = self.outbound.send(event.clone());
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<InboundEvent> {
        self.inbound.subscribe()
    }
}

/// Line protocol: one JSON object per line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
enum WireEvent {
    #[serde(rename = "add-user")]
    AddUser { user_id: String },
    #[serde(rename = "send-msg")]
    SendMsg { to: String, msg: String },
    #[serde(rename = "msg-receive")]
    MsgReceive { msg: String, from: String },
}

/// TCP JSON-lines transport
pub struct LineTransport {
    writer: Arc<Mutex<OwnedWriteHalf>>,
    inbound: broadcast::Sender<InboundEvent>,
    reader: JoinHandle<()>,
}

impl LineTransport {
    /// Connect, announce `self_id`, and start reading inbound events
    pub async fn connect(
        addr: &str,
        self_id: &str,
        connect_timeout: Duration,
        capacity: usize,
    ) -> Result<Self> {
        let stream = timeout(connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| SyncError::Timeout(format!("Connecting to {}", addr)))?
            .map_err(SyncError::Io)?;
        info!("Transport connected to {}", addr);

        let (read_half, write_half) = stream.into_split();
        let writer = Arc::new(Mutex::new(write_half));
        let (inbound, _) = broadcast::channel(capacity.max(1));

        write_line(
            &writer,
            &WireEvent::AddUser {
                user_id: self_id.to_string(),
            },
        )
        .await?;

        let reader = {
            let inbound = inbound.clone();
            let addr = addr.to_string();
            tokio::spawn(async move {
                let mut lines = BufReader::new(read_half).lines();
                loop {
                    match lines.next_line().await {
                        Ok(Some(line)) => {
                            let trimmed = line.trim();
                            if trimmed.is_empty() {
                                continue;
                            }
                            match serde_json::from_str::<WireEvent>(trimmed) {
                                Ok(WireEvent::MsgReceive { msg, from }) => {
                                    let _ = inbound.send(InboundEvent { msg, from });
                                }
                                Ok(other) => debug!("Ignoring transport event {:?}", other),
                                Err(e) => warn!("Invalid transport line: {}", e),
                            }
                        }
                        Ok(None) => {
                            info!("Transport {} closed the connection", addr);
                            break;
                        }
                        Err(e) => {
                            warn!("Transport read error: {}", e);
                            break;
                        }
                    }
                }
            })
        };

        Ok(Self {
            writer,
            inbound,
            reader,
        })
    }
}

async fn write_line(writer: &Mutex<OwnedWriteHalf>, event: &WireEvent) -> Result<()> {
    let mut line = serde_json::to_string(event)?;
    line.push('\n');
    let mut writer = writer.lock().await;
    writer
        .write_all(line.as_bytes())
        .await
        .map_err(|e| SyncError::Transport(format!("write failed: {}", e)))
}

#[async_trait]
impl Transport for LineTransport {
    async fn emit(&self, event: &OutboundEvent) -> Result<()> {
        write_line(
            &self.writer,
            &WireEvent::SendMsg {
                to: event.to.clone(),
                msg: event.msg.clone(),
            },
        )
        .await
    }

    fn subscribe(&self) -> broadcast::Receiver<InboundEvent> {
        self.inbound.subscribe()
    }
}

impl Drop for LineTransport {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_local_transport_fans_out() {
        let hub = LocalTransport::new(8);
        let mut a = hub.subscribe();
        let mut b = hub.subscribe();
        assert_eq!(hub.listener_count(), 2);

        assert_eq!(hub.deliver(InboundEvent::new("yo", "u2")), 2);
        assert_eq!(a.recv().await.unwrap().msg, "yo");
        assert_eq!(b.recv().await.unwrap().from, "u2");

        drop(a);
        drop(b);
        assert_eq!(hub.deliver(InboundEvent::new("lost", "u2")), 0);
    }

    #[test]
    fn test_wire_format() {
        let line = serde_json::to_string(&WireEvent::SendMsg {
            to: "u2".to_string(),
            msg: "hello".to_string(),
        })
        .unwrap();
        assert_eq!(line, r#"{"event":"send-msg","to":"u2","msg":"hello"}"#);

        let parsed: WireEvent =
            serde_json::from_str(r#"{"event":"msg-receive","msg":"yo","from":"u2"}"#).unwrap();
        assert_eq!(
            parsed,
            WireEvent::MsgReceive {
                msg: "yo".to_string(),
                from: "u2".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_line_transport_roundtrip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (read_half, mut write_half) = stream.into_split();
            let mut lines = BufReader::new(read_half).lines();

            let hello = lines.next_line().await.unwrap().unwrap();
            let sent = lines.next_line().await.unwrap().unwrap();

            write_half
                .write_all(b"not json\n{\"event\":\"msg-receive\",\"msg\":\"yo\",\"from\":\"u2\"}\n")
                .await
                .unwrap();
            (hello, sent)
        });

        let transport = LineTransport::connect(&addr.to_string(), "u1", Duration::from_secs(2), 8)
            .await
            .unwrap();
        let mut rx = transport.subscribe();
        transport
            .emit(&OutboundEvent {
                to: "u2".to_string(),
                msg: "hello".to_string(),
            })
            .await
            .unwrap();

        let event = timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
        assert_eq!(event, InboundEvent::new("yo", "u2"));

        let (hello, sent) = server.await.unwrap();
        assert_eq!(hello, r#"{"event":"add-user","user_id":"u1"}"#);
        assert_eq!(sent, r#"{"event":"send-msg","to":"u2","msg":"hello"}"#);
    }
}
