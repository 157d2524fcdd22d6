//! HTTP server for the warehouse agent
//! Simple HTTP server using tokio and basic HTTP handling

use anyhow::{Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use warehouse_agent::agent::ConversationService;
use warehouse_agent::config::{system_prompt, AgentConfig};
use warehouse_agent::db::WarehouseClient;
use warehouse_agent::error::AgentError;
use warehouse_agent::llm::{ChatMessage, OpenAiProvider};
use warehouse_agent::tools::ToolContext;

#[derive(Parser)]
#[command(name = "warehouse-agent-server")]
#[command(about = "Conversational analytics agent over a SQL warehouse")]
#[command(version)]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0:8080")]
    bind: String,
}

#[derive(Deserialize)]
struct ChatRequest {
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ChatResponse {
    messages: Vec<ChatMessage>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = AgentConfig::from_env();

    // All dependencies are built here, before any request is served.
    let warehouse = WarehouseClient::connect(
        config.warehouse_url.clone(),
        config.default_catalog.clone(),
        config.default_schema.clone(),
    )
    .await
    .context("failed to connect to warehouse")?;

    let provider = OpenAiProvider::from_config(&config)
        .context("completion provider is not configured")?;

    let service = Arc::new(ConversationService::new(
        Arc::new(provider),
        ToolContext {
            warehouse: Arc::new(warehouse),
        },
        system_prompt(),
        config.max_rounds,
    ));

    let listener = TcpListener::bind(&args.bind)
        .await
        .with_context(|| format!("failed to bind {}", args.bind))?;
    info!(bind = %args.bind, "server listening");

    loop {
        let (stream, addr) = listener.accept().await?;
        info!(%addr, "new connection");
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, service).await {
                warn!(error = %e, "connection handling failed");
            }
        });
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    service: Arc<ConversationService>,
) -> Result<()> {
    use tokio::time::{timeout, Duration};

    let mut buffer = Vec::new();
    let mut chunk = [0u8; 8192];

    // Read the request with a timeout to prevent hanging connections.
    timeout(Duration::from_secs(10), async {
        loop {
            let n = stream.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            buffer.extend_from_slice(&chunk[..n]);
            if let Ok(text) = std::str::from_utf8(&buffer) {
                if let Some(headers_end) = text.find("\r\n\r\n") {
                    let body_len = extract_content_length(text).unwrap_or(0);
                    if buffer.len() >= headers_end + 4 + body_len {
                        break;
                    }
                }
            }
            if buffer.len() > 1_000_000 {
                break;
            }
        }
        Ok::<(), std::io::Error>(())
    })
    .await
    .context("timed out reading request")??;

    let request = String::from_utf8_lossy(&buffer);
    let (method, path) = parse_request_line(&request);
    let body = request
        .find("\r\n\r\n")
        .map(|i| &request[i + 4..])
        .unwrap_or("");

    let (status, payload) = match (method, path) {
        ("GET", "/health") => ("200 OK", serde_json::json!({"status": "ok"}).to_string()),
        ("POST", "/chat") => handle_chat(&service, body).await,
        _ => (
            "404 Not Found",
            serde_json::json!({"error": "not found"}).to_string(),
        ),
    };

    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nAccess-Control-Allow-Origin: *\r\nConnection: close\r\n\r\n{}",
        status,
        payload.len(),
        payload
    );
    stream.write_all(response.as_bytes()).await?;
    stream.flush().await?;
    Ok(())
}

async fn handle_chat(service: &ConversationService, body: &str) -> (&'static str, String) {
    let request: ChatRequest = match serde_json::from_str(body) {
        Ok(request) => request,
        Err(e) => {
            return (
                "400 Bad Request",
                serde_json::json!({"error": format!("invalid request body: {}", e)}).to_string(),
            );
        }
    };

    match service.handle(request.messages).await {
        Ok(messages) => match serde_json::to_string(&ChatResponse { messages }) {
            Ok(payload) => ("200 OK", payload),
            Err(e) => {
                error!(error = %e, "failed to serialize response");
                (
                    "500 Internal Server Error",
                    serde_json::json!({"error": "serialization failure"}).to_string(),
                )
            }
        },
        Err(e) => {
            let kind = match e {
                AgentError::Configuration(_) => "configuration",
                _ => "execution",
            };
            (
                "500 Internal Server Error",
                serde_json::json!({"error": e.to_string(), "kind": kind}).to_string(),
            )
        }
    }
}

fn parse_request_line(request: &str) -> (&str, &str) {
    let mut parts = request.lines().next().unwrap_or("").split_whitespace();
    let method = parts.next().unwrap_or("");
    let path = parts.next().unwrap_or("");
    (method, path)
}

fn extract_content_length(request: &str) -> Option<usize> {
    request
        .lines()
        .find(|line| line.to_lowercase().starts_with("content-length:"))
        .and_then(|line| line.split(':').nth(1))
        .and_then(|v| v.trim().parse().ok())
}
