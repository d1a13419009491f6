//! Stdio transport - newline-delimited JSON-RPC on stdin/stdout
//!
//! Each line is handled on its own task so a slow backend call never holds
//! up the next request; responses are written as they complete. A line that
//! is not UTF-8 gets a parse error like any other unreadable message.

use log::{info, warn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use crate::error::{BangumiError, Result};

use super::messages::{JsonRpcError, JsonRpcResponse};
use super::session::McpServer;

/// Serve on the process's stdin/stdout until stdin closes
pub async fn run(server: McpServer) -> Result<()> {
    info!("Serving MCP over stdio");
    serve(server, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await?;
    info!("stdin closed, shutting down");
    Ok(())
}

/// Serve one line-based session over any reader/writer pair
pub async fn serve<R, W>(server: McpServer, mut reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let (tx, mut rx) = mpsc::channel::<JsonRpcResponse>(64);

    // Dropping `tx` at EOF lets the writer drain in-flight responses and stop
    let reading = async move {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }
            let line = match std::str::from_utf8(&buf) {
                Ok(line) => line.trim(),
                Err(e) => {
                    warn!("Undecodable line: {}", e);
                    let error = JsonRpcError::parse_error(format!("Parse error: {}", e));
                    let _ = tx.send(JsonRpcResponse::error(None, error)).await;
                    continue;
                }
            };
            if line.is_empty() {
                continue;
            }

            let line = line.to_string();
            let server = server.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                if let Some(response) = server.handle_message(&line).await {
                    let _ = tx.send(response).await;
                }
            });
        }
        drop(tx);
        Ok::<(), BangumiError>(())
    };

    let writing = async {
        while let Some(response) = rx.recv().await {
            let json = serde_json::to_string(&response)?;
            writer.write_all(json.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
        Ok::<(), BangumiError>(())
    };

    tokio::try_join!(reading, writing)?;
    Ok(())
}
