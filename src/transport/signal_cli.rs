//! Signal transport over a signal-cli JSON-RPC daemon.
//!
//! Talks newline-delimited JSON-RPC 2.0 to `signal-cli daemon --tcp`.
//! Incoming messages arrive as `receive` notifications on the same socket that
//! carries request/response pairs, so notifications that show up while a
//! `send` waits for its response are queued for the next [`Transport::receive`].

use super::{InboundMessage, Transport};
use crate::error::TransportError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::VecDeque;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

/// Default signal-cli JSON-RPC TCP endpoint.
pub const DEFAULT_ENDPOINT: &str = "127.0.0.1:7583";

/// Per-recipient result type reported for a delivered message.
const SEND_SUCCESS: &str = "SUCCESS";

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'a str,
    method: &'a str,
    params: Value,
    id: &'a str,
}

/// Any frame the daemon may write: a response or a notification.
#[derive(Debug, Deserialize)]
struct RpcFrame {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    params: Option<Value>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ReceiveParams {
    envelope: Envelope,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    source_number: Option<String>,
    #[serde(default)]
    timestamp: u64,
    #[serde(default)]
    data_message: Option<DataMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DataMessage {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    group_info: Option<GroupInfo>,
    #[serde(default)]
    attachments: Vec<Attachment>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroupInfo {
    group_id: String,
}

#[derive(Debug, Deserialize)]
struct Attachment {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    filename: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SendResult {
    #[serde(default)]
    results: Vec<RecipientResult>,
}

#[derive(Debug, Deserialize)]
struct RecipientResult {
    #[serde(rename = "type")]
    kind: String,
}

impl RpcFrame {
    fn answers(&self, request_id: &str) -> bool {
        match &self.id {
            Some(Value::String(s)) => s == request_id,
            Some(Value::Number(n)) => n.to_string() == request_id,
            _ => false,
        }
    }

    fn into_result(self) -> Result<Value, TransportError> {
        match self.error {
            Some(err) => Err(TransportError::Rpc {
                code: err.code,
                message: err.message,
            }),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }

    /// The text message carried by a `receive` notification, if any.
    fn into_inbound(self) -> Option<InboundMessage> {
        if self.method.as_deref() != Some("receive") {
            return None;
        }
        let params: ReceiveParams = serde_json::from_value(self.params?).ok()?;
        params.envelope.into_inbound()
    }
}

impl Envelope {
    /// Receipts, typing indicators and sync messages carry no text and are dropped.
    fn into_inbound(self) -> Option<InboundMessage> {
        let data = self.data_message?;
        let text = data.message.filter(|m| !m.is_empty())?;
        let source = self.source_number.or(self.source)?;

        Some(InboundMessage {
            timestamp: self.timestamp,
            source,
            group_id: data.group_info.map(|g| g.group_id),
            text,
            attachments: data
                .attachments
                .into_iter()
                .filter_map(|a| a.id.or(a.filename))
                .collect(),
        })
    }
}

/// Check the per-recipient outcome of a `send` call.
fn check_send_result(result: Value) -> Result<(), TransportError> {
    if result.is_null() {
        return Ok(());
    }
    let parsed: SendResult = serde_json::from_value(result).map_err(|e| {
        tracing::warn!("Unreadable send result from signal-cli: {}", e);
        TransportError::Delivery(format!("unreadable send result: {}", e))
    })?;
    match parsed.results.into_iter().find(|r| r.kind != SEND_SUCCESS) {
        Some(failed) => Err(TransportError::Delivery(failed.kind.to_lowercase())),
        None => Ok(()),
    }
}

struct Connection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    pending: VecDeque<InboundMessage>,
    next_id: u64,
}

impl Connection {
    async fn read_frame(&mut self) -> Result<RpcFrame, TransportError> {
        loop {
            let mut line = String::new();
            if self.reader.read_line(&mut line).await? == 0 {
                return Err(TransportError::Closed);
            }
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            return Ok(serde_json::from_str(line)?);
        }
    }

    async fn call(&mut self, method: &str, params: Value) -> Result<Value, TransportError> {
        self.next_id += 1;
        let id = self.next_id.to_string();
        let request = RpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: &id,
        };

        let mut line = serde_json::to_string(&request)?;
        line.push('\n');
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await?;

        loop {
            let frame = match self.read_frame().await {
                Ok(frame) => frame,
                Err(TransportError::Json(e)) => {
                    tracing::warn!("Skipping unreadable frame from signal-cli: {}", e);
                    continue;
                }
                Err(e) => return Err(e),
            };
            if frame.answers(&id) {
                return frame.into_result();
            }
            if let Some(message) = frame.into_inbound() {
                self.pending.push_back(message);
            }
        }
    }
}

/// Signal transport backed by signal-cli's JSON-RPC daemon.
pub struct SignalCliTransport {
    /// Account to act as; only needed when the daemon serves several accounts.
    account: Option<String>,
    conn: Mutex<Connection>,
}

impl SignalCliTransport {
    /// Connect to a daemon listening on `endpoint` (`host:port`).
    pub async fn connect(endpoint: &str, account: Option<&str>) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(endpoint).await?;
        let (read_half, write_half) = stream.into_split();

        tracing::info!("Connected to signal-cli at {}", endpoint);

        Ok(Self {
            account: account.map(str::to_string),
            conn: Mutex::new(Connection {
                reader: BufReader::new(read_half),
                writer: write_half,
                pending: VecDeque::new(),
                next_id: 0,
            }),
        })
    }
}

#[async_trait]
impl Transport for SignalCliTransport {
    async fn receive(&self) -> Result<Option<InboundMessage>, TransportError> {
        let mut conn = self.conn.lock().await;
        if let Some(message) = conn.pending.pop_front() {
            return Ok(Some(message));
        }

        loop {
            let frame = match conn.read_frame().await {
                Ok(frame) => frame,
                Err(TransportError::Closed) => return Ok(None),
                Err(TransportError::Json(e)) => {
                    tracing::warn!("Skipping unreadable frame from signal-cli: {}", e);
                    continue;
                }
                Err(e) => return Err(e),
            };
            if let Some(message) = frame.into_inbound() {
                return Ok(Some(message));
            }
        }
    }

    async fn send(&self, recipient: &str, text: &str) -> Result<(), TransportError> {
        let mut params = json!({
            "recipient": [recipient],
            "message": text,
        });
        if let Some(account) = &self.account {
            params["account"] = json!(account);
        }

        let result = self
            .conn
            .lock()
            .await
            .call("send", params)
            .await
            .map_err(|e| match e {
                TransportError::Rpc { code, message } => {
                    TransportError::Delivery(format!("rpc error {}: {}", code, message))
                }
                other => other,
            })?;
        check_send_result(result)
    }

    fn platform_name(&self) -> &'static str {
        "Signal"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    fn receive_frame(source: &str, text: &str) -> String {
        let frame = json!({
            "jsonrpc": "2.0",
            "method": "receive",
            "params": {
                "envelope": {
                    "source": source,
                    "sourceNumber": source,
                    "sourceUuid": "5b2b4c1e-0000-0000-0000-000000000000",
                    "sourceDevice": 1,
                    "timestamp": 1700000000000u64,
                    "dataMessage": {
                        "timestamp": 1700000000000u64,
                        "message": text,
                        "expiresInSeconds": 0,
                        "viewOnce": false
                    }
                },
                "account": "+4917000000"
            }
        });
        format!("{}\n", frame)
    }

    fn parse_frame(raw: &str) -> RpcFrame {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn test_receive_notification_to_inbound() {
        let message = parse_frame(&receive_frame("+49170111", "bot help"))
            .into_inbound()
            .unwrap();
        assert_eq!(message.source, "+49170111");
        assert_eq!(message.text, "bot help");
        assert_eq!(message.timestamp, 1700000000000);
        assert!(message.group_id.is_none());
    }

    #[test]
    fn test_group_and_attachments_extracted() {
        let frame = parse_frame(
            r#"{"jsonrpc":"2.0","method":"receive","params":{"envelope":{
                "source":"+49170111","timestamp":5,
                "dataMessage":{"message":"bot help",
                    "groupInfo":{"groupId":"abc==","type":"DELIVER"},
                    "attachments":[{"id":"att1","contentType":"image/png"},{"filename":"x.txt"}]}}}}"#,
        );
        let message = frame.into_inbound().unwrap();
        assert_eq!(message.group_id.as_deref(), Some("abc=="));
        assert_eq!(message.attachments, vec!["att1", "x.txt"]);
    }

    #[test]
    fn test_source_falls_back_when_number_missing() {
        let frame = parse_frame(
            r#"{"jsonrpc":"2.0","method":"receive","params":{"envelope":{
                "source":"a1b2c3","sourceNumber":null,"timestamp":5,
                "dataMessage":{"message":"bot help"}}}}"#,
        );
        assert_eq!(frame.into_inbound().unwrap().source, "a1b2c3");
    }

    #[test]
    fn test_receipts_and_typing_are_skipped() {
        let receipt = parse_frame(
            r#"{"jsonrpc":"2.0","method":"receive","params":{"envelope":{
                "source":"+49170111","timestamp":5,
                "receiptMessage":{"when":5,"isDelivery":true,"timestamps":[4]}}}}"#,
        );
        assert!(receipt.into_inbound().is_none());

        let empty = parse_frame(
            r#"{"jsonrpc":"2.0","method":"receive","params":{"envelope":{
                "source":"+49170111","timestamp":5,"dataMessage":{"reaction":{}}}}}"#,
        );
        assert!(empty.into_inbound().is_none());
    }

    #[test]
    fn test_response_matching_by_id() {
        let frame = parse_frame(r#"{"jsonrpc":"2.0","id":"7","result":{}}"#);
        assert!(frame.answers("7"));
        assert!(!frame.answers("8"));

        let frame = parse_frame(r#"{"jsonrpc":"2.0","id":7,"result":{}}"#);
        assert!(frame.answers("7"));
    }

    #[test]
    fn test_rpc_error_surfaces() {
        let frame = parse_frame(
            r#"{"jsonrpc":"2.0","id":"1","error":{"code":-32602,"message":"Invalid recipient"}}"#,
        );
        match frame.into_result() {
            Err(TransportError::Rpc { code, message }) => {
                assert_eq!(code, -32602);
                assert_eq!(message, "Invalid recipient");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_send_result_checks_every_recipient() {
        assert!(check_send_result(json!({"timestamp": 1, "results": [{"type": "SUCCESS"}]})).is_ok());
        assert!(check_send_result(json!({"timestamp": 1})).is_ok());
        assert!(check_send_result(Value::Null).is_ok());

        let err = check_send_result(json!({"results": [{"type": "UNREGISTERED_FAILURE"}]}))
            .unwrap_err();
        assert!(matches!(err, TransportError::Delivery(ref m) if m == "unregistered_failure"));

        let err = check_send_result(json!({"results": "nonsense"})).unwrap_err();
        assert!(matches!(err, TransportError::Delivery(_)));
    }

    #[tokio::test]
    async fn test_send_survives_garbage_and_reports_rpc_error_as_delivery() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (read_half, mut write_half) = stream.into_split();
            let mut lines = BufReader::new(read_half).lines();

            for _ in 0..2 {
                let request = lines.next_line().await.unwrap().unwrap();
                let request: Value = serde_json::from_str(&request).unwrap();
                write_half.write_all(b"{not json\n").await.unwrap();

                let response = if request["params"]["recipient"][0] == "+49170111" {
                    json!({"jsonrpc": "2.0", "id": request["id"].clone(),
                           "result": {"results": [{"type": "SUCCESS"}]}})
                } else {
                    json!({"jsonrpc": "2.0", "id": request["id"].clone(),
                           "error": {"code": -1, "message": "Invalid recipient"}})
                };
                write_half
                    .write_all(format!("{}\n", response).as_bytes())
                    .await
                    .unwrap();
            }
        });

        let transport = SignalCliTransport::connect(&addr, None).await.unwrap();

        transport.send("+49170111", "hello").await.unwrap();
        let err = transport.send("+49170222", "hello").await.unwrap_err();
        assert!(
            matches!(err, TransportError::Delivery(ref m) if m.contains("Invalid recipient")),
            "{:?}",
            err
        );

        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_notifications_during_send_are_queued() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (read_half, mut write_half) = stream.into_split();
            let mut lines = BufReader::new(read_half).lines();

            write_half
                .write_all(receive_frame("+49170111", "bot help").as_bytes())
                .await
                .unwrap();

            let request = lines.next_line().await.unwrap().unwrap();
            let request: Value = serde_json::from_str(&request).unwrap();

            write_half
                .write_all(receive_frame("+49170222", "bot listgroups").as_bytes())
                .await
                .unwrap();
            let response = json!({
                "jsonrpc": "2.0",
                "id": request["id"].clone(),
                "result": {"timestamp": 1, "results": [{"type": "SUCCESS"}]}
            });
            write_half
                .write_all(format!("{}\n", response).as_bytes())
                .await
                .unwrap();

            request
        });

        let transport = SignalCliTransport::connect(&addr, Some("+4917000000"))
            .await
            .unwrap();

        let first = transport.receive().await.unwrap().unwrap();
        assert_eq!(first.source, "+49170111");

        transport.send("+49170111", "hello").await.unwrap();

        let request = server.await.unwrap();
        assert_eq!(request["method"], "send");
        assert_eq!(request["params"]["recipient"][0], "+49170111");
        assert_eq!(request["params"]["message"], "hello");
        assert_eq!(request["params"]["account"], "+4917000000");

        let second = transport.receive().await.unwrap().unwrap();
        assert_eq!(second.source, "+49170222");
        assert_eq!(second.text, "bot listgroups");

        assert!(transport.receive().await.unwrap().is_none());
    }
}
