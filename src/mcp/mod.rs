//! MCP protocol surface: message types, request handling and transports

pub mod http;
pub mod messages;
pub mod session;
pub mod stdio;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use messages::{
    CallToolParams, CallToolResult, Content, ErrorCode, JsonRpcError, JsonRpcRequest, JsonRpcResponse, RequestId,
};
pub use session::McpServer;

use crate::error::Result;

/// Which transport `serve` binds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServeMode {
    #[default]
    Stdio,
    Sse,
    StreamableHttp,
}

impl FromStr for ServeMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "stdio" => Ok(ServeMode::Stdio),
            "sse" => Ok(ServeMode::Sse),
            "streamable-http" | "streamable_http" | "http" => Ok(ServeMode::StreamableHttp),
            other => Err(format!(
                "unknown mode '{}', expected one of: stdio, sse, streamable-http",
                other
            )),
        }
    }
}

impl fmt::Display for ServeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ServeMode::Stdio => "stdio",
            ServeMode::Sse => "sse",
            ServeMode::StreamableHttp => "streamable-http",
        };
        write!(f, "{}", s)
    }
}

/// Run the server on the chosen transport until it shuts down
pub async fn serve(server: McpServer, mode: ServeMode, host: &str, port: u16) -> Result<()> {
    match mode {
        ServeMode::Stdio => stdio::run(server).await,
        ServeMode::Sse => http::run_sse(server, host, port).await,
        ServeMode::StreamableHttp => http::run_streamable_http(server, host, port).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_mode_parse() {
        assert_eq!("stdio".parse::<ServeMode>().unwrap(), ServeMode::Stdio);
        assert_eq!("SSE".parse::<ServeMode>().unwrap(), ServeMode::Sse);
        assert_eq!("streamable-http".parse::<ServeMode>().unwrap(), ServeMode::StreamableHttp);
        assert!("websocket".parse::<ServeMode>().is_err());
    }

    #[test]
    fn test_serve_mode_display_roundtrip() {
        for mode in [ServeMode::Stdio, ServeMode::Sse, ServeMode::StreamableHttp] {
            assert_eq!(mode.to_string().parse::<ServeMode>().unwrap(), mode);
        }
    }

    #[test]
    fn test_serve_mode_serde() {
        let mode: ServeMode = serde_yaml::from_str("streamable-http").unwrap();
        assert_eq!(mode, ServeMode::StreamableHttp);
        assert_eq!(ServeMode::default(), ServeMode::Stdio);
    }
}
