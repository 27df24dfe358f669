//! TCP を使った LineTransport 実装
//!
//! 読み取り側は `FramedRead<_, LinesCodec>` で行単位に分割します。
//! コーデックが受信途中の行をバッファに保持するため、タイムアウトで
//! 読み取りを打ち切っても行の断片は失われません。

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{
    TcpStream,
    tcp::{OwnedReadHalf, OwnedWriteHalf},
};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError};

use crate::domain::{Connector, LineTransport, QueryError};

/// Port of the ClientQuery plug-in. Not configurable on the plug-in side.
pub const CLIENT_QUERY_PORT: u16 = 25639;

/// Longest line accepted from the remote (bytes).
const MAX_LINE_LENGTH: usize = 1024 * 1024;

impl From<LinesCodecError> for QueryError {
    fn from(error: LinesCodecError) -> Self {
        match error {
            LinesCodecError::MaxLineLengthExceeded => {
                QueryError::Malformed("line exceeds maximum length".to_string())
            }
            LinesCodecError::Io(e) => QueryError::Io(e),
        }
    }
}

/// Newline-framed TCP stream.
pub struct TcpTransport {
    reader: FramedRead<OwnedReadHalf, LinesCodec>,
    writer: FramedWrite<OwnedWriteHalf, LinesCodec>,
}

impl TcpTransport {
    /// Wrap an already connected stream.
    pub fn new(stream: TcpStream) -> Self {
        let (read, write) = stream.into_split();
        Self {
            reader: FramedRead::new(read, LinesCodec::new_with_max_length(MAX_LINE_LENGTH)),
            writer: FramedWrite::new(write, LinesCodec::new()),
        }
    }
}

#[async_trait]
impl LineTransport for TcpTransport {
    async fn write_line(&mut self, line: &str) -> Result<(), QueryError> {
        tracing::debug!(">> {}", line);
        self.writer.send(line).await?;
        Ok(())
    }

    async fn read_line(&mut self, timeout: Duration) -> Result<Option<String>, QueryError> {
        match tokio::time::timeout(timeout, self.reader.next()).await {
            Err(_elapsed) => Ok(None),
            Ok(None) => Err(QueryError::ConnectionClosed),
            Ok(Some(line)) => {
                // the plug-in terminates lines with "\n\r"
                let line = line?.trim_matches(['\r', '\n']).to_string();
                tracing::debug!("<< {}", line);
                Ok(Some(line))
            }
        }
    }

    async fn close(&mut self, grace: Duration) {
        tokio::time::sleep(grace).await;
        // FramedWrite<_, LinesCodec> is a Sink for every AsRef<str> item
        if let Err(e) = SinkExt::<&str>::close(&mut self.writer).await {
            tracing::debug!("Ignoring error while closing socket: {}", e);
        }
    }
}

/// Connects to the plug-in on [`CLIENT_QUERY_PORT`] of `host`.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    host: String,
}

impl TcpConnector {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }
}

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self) -> Result<Box<dyn LineTransport>, QueryError> {
        let stream = TcpStream::connect((self.host.as_str(), CLIENT_QUERY_PORT)).await?;
        stream.set_nodelay(true)?;
        Ok(Box::new(TcpTransport::new(stream)))
    }

    fn endpoint(&self) -> String {
        format!("{}:{}", self.host, CLIENT_QUERY_PORT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    async fn connected_pair() -> (TcpTransport, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind listener");
        let addr = listener.local_addr().expect("Failed to get local address");
        let client = TcpStream::connect(addr).await.expect("Failed to connect");
        let (server, _) = listener.accept().await.expect("Failed to accept");
        (TcpTransport::new(client), server)
    }

    #[tokio::test]
    async fn test_read_line_strips_plugin_terminators() {
        // テスト項目: "\n\r" で終端された行から制御文字が取り除かれる
        // given (前提条件):
        let (mut transport, mut server) = connected_pair().await;
        server
            .write_all(b"TS3 Client\n\rerror id=0 msg=ok\n\r")
            .await
            .unwrap();

        // when (操作):
        let first = transport.read_line(Duration::from_secs(1)).await.unwrap();
        let second = transport.read_line(Duration::from_secs(1)).await.unwrap();

        // then (期待する結果):
        assert_eq!(first.as_deref(), Some("TS3 Client"));
        assert_eq!(second.as_deref(), Some("error id=0 msg=ok"));
    }

    #[tokio::test]
    async fn test_read_line_timeout_keeps_partial_line() {
        // テスト項目: タイムアウトしても受信途中の行は次の読み取りで完成する
        // given (前提条件):
        let (mut transport, mut server) = connected_pair().await;
        server.write_all(b"clid=1 client_nick").await.unwrap();

        // when (操作):
        let timed_out = transport.read_line(Duration::from_millis(50)).await.unwrap();
        server.write_all(b"name=Ann\n").await.unwrap();
        let completed = transport.read_line(Duration::from_secs(1)).await.unwrap();

        // then (期待する結果):
        assert!(timed_out.is_none());
        assert_eq!(completed.as_deref(), Some("clid=1 client_nickname=Ann"));
    }

    #[tokio::test]
    async fn test_write_line_appends_single_newline() {
        // テスト項目: 書き込んだ行が改行 1 つで終端される
        // given (前提条件):
        let (mut transport, mut server) = connected_pair().await;

        // when (操作):
        transport.write_line("whoami").await.unwrap();
        let mut buf = [0u8; 7];
        server.read_exact(&mut buf).await.unwrap();

        // then (期待する結果):
        assert_eq!(&buf, b"whoami\n");
    }

    #[tokio::test]
    async fn test_read_line_reports_closed_connection() {
        // テスト項目: 相手が切断すると ConnectionClosed になる
        // given (前提条件):
        let (mut transport, server) = connected_pair().await;
        drop(server);

        // when (操作):
        let result = transport.read_line(Duration::from_secs(1)).await;

        // then (期待する結果):
        assert!(matches!(result, Err(QueryError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_close_flushes_and_shuts_down_write_side() {
        // テスト項目: close() で送信済みの行が届き、その後相手側は EOF を受け取る
        // given (前提条件):
        let (mut transport, mut server) = connected_pair().await;
        transport.write_line("whoami").await.unwrap();

        // when (操作):
        transport.close(Duration::ZERO).await;
        let mut received = Vec::new();
        let read = tokio::time::timeout(Duration::from_secs(1), server.read_to_end(&mut received))
            .await
            .expect("peer should see EOF after close");

        // then (期待する結果):
        assert!(read.is_ok());
        assert_eq!(received, b"whoami\n");
    }
}
