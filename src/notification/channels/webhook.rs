//! 聊天 Incoming Webhook 渠道
//!
//! 通过 HTTP POST 把消息发到聊天服务的 incoming webhook。
//! 同步投递，失败只上报，不重试。

use anyhow::{anyhow, Context, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

use crate::notification::channel::{NotificationChannel, NotificationMessage, SendResult};
use crate::notification::config::TransportConfig;

/// Webhook 请求载荷
#[derive(Debug, Serialize)]
pub struct WebhookPayload<'a> {
    /// 消息内容
    pub text: &'a str,
    /// 目标频道
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<&'a str>,
    /// 发送者名称
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<&'a str>,
}

/// Webhook 响应（部分服务只返回纯文本，解析失败时按 HTTP 状态判断）
#[derive(Debug, Deserialize)]
pub struct WebhookResponse {
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

fn default_success() -> bool {
    true
}

/// Incoming webhook 渠道
#[derive(Debug, Clone)]
pub struct WebhookChannel {
    client: Client,
    config: TransportConfig,
}

impl WebhookChannel {
    /// 创建新的 Webhook 渠道
    pub fn new(config: TransportConfig) -> Result<Self> {
        if config.webhook_url.is_empty() {
            return Err(anyhow!("webhook_url is required"));
        }

        let mut builder = Client::builder().timeout(Duration::from_secs(config.timeout_secs));
        if !config.use_system_proxy {
            builder = builder.no_proxy();
        }
        let client = builder.build().context("Failed to create HTTP client")?;

        Ok(Self { client, config })
    }

    fn payload<'a>(&'a self, message: &'a NotificationMessage) -> WebhookPayload<'a> {
        WebhookPayload {
            text: &message.content,
            channel: self.config.channel.as_deref(),
            username: self.config.username.as_deref(),
        }
    }

    fn deliver(&self, payload: &WebhookPayload<'_>) -> Result<SendResult> {
        let response = match self.client.post(&self.config.webhook_url).json(payload).send() {
            Ok(response) => response,
            Err(e) => return Ok(SendResult::Failed(format!("HTTP request failed: {}", e))),
        };

        let status = response.status();
        let body = response.text().unwrap_or_default();

        if !status.is_success() {
            return Ok(SendResult::Failed(format!("HTTP {}: {}", status, body.trim())));
        }

        match serde_json::from_str::<WebhookResponse>(&body) {
            Ok(parsed) if !parsed.success => Ok(SendResult::Failed(
                parsed.error.unwrap_or_else(|| "Unknown error".to_string()),
            )),
            _ => Ok(SendResult::Sent),
        }
    }
}

impl NotificationChannel for WebhookChannel {
    fn name(&self) -> &str {
        "webhook"
    }

    fn should_send(&self, message: &NotificationMessage) -> bool {
        // 空白消息不发，聊天服务会拒绝空 text
        !message.content.trim().is_empty()
    }

    fn send(&self, message: &NotificationMessage) -> Result<SendResult> {
        let result = self.deliver(&self.payload(message))?;
        match &result {
            SendResult::Sent => info!(
                channel = "webhook",
                kind = message.kind.as_str(),
                project = ?message.metadata.project,
                "Message published"
            ),
            SendResult::Failed(reason) => error!(
                channel = "webhook",
                kind = message.kind.as_str(),
                error = %reason,
                "Failed to publish message"
            ),
            SendResult::Skipped(_) => {}
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::channel::MessageKind;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread::JoinHandle;

    /// 单次请求的 HTTP 服务器，返回收到的请求体
    fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/hooks/token", listener.local_addr().unwrap());

        let handle = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            loop {
                let n = stream.read(&mut chunk).unwrap();
                buf.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&buf).to_string();
                if let Some(idx) = text.find("\r\n\r\n") {
                    let length = text[..idx]
                        .lines()
                        .map(|l| l.to_ascii_lowercase())
                        .find_map(|l| l.strip_prefix("content-length:").map(|v| v.trim().parse::<usize>().unwrap()))
                        .unwrap_or(0);
                    if buf.len() >= idx + 4 + length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            let response = format!(
                "{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).unwrap();
            let text = String::from_utf8_lossy(&buf).to_string();
            text.split("\r\n\r\n").nth(1).unwrap_or_default().to_string()
        });

        (url, handle)
    }

    fn config(url: String) -> TransportConfig {
        TransportConfig {
            webhook_url: url,
            channel: Some("#builds".into()),
            username: None,
            timeout_secs: 5,
            use_system_proxy: false,
        }
    }

    #[test]
    fn test_webhook_requires_url() {
        let err = WebhookChannel::new(TransportConfig::default()).unwrap_err();
        assert!(err.to_string().contains("webhook_url"));
    }

    #[test]
    fn test_payload_serialization() {
        let channel = WebhookChannel::new(config("http://localhost/hook".into())).unwrap();
        let message = NotificationMessage::new("app - #1 Success", MessageKind::Status);
        let json = serde_json::to_value(channel.payload(&message)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"text": "app - #1 Success", "channel": "#builds"})
        );
    }

    #[test]
    fn test_send_posts_payload() {
        let (url, server) = serve_once("HTTP/1.1 200 OK", r#"{"success":true}"#);
        let channel = WebhookChannel::new(config(url)).unwrap();
        let message = NotificationMessage::new("hello", MessageKind::Start);

        assert_eq!(channel.send(&message).unwrap(), SendResult::Sent);
        let body: serde_json::Value = serde_json::from_str(&server.join().unwrap()).unwrap();
        assert_eq!(body["text"], "hello");
        assert_eq!(body["channel"], "#builds");
    }

    #[test]
    fn test_send_reports_http_error() {
        let (url, server) = serve_once("HTTP/1.1 500 Internal Server Error", "oops");
        let channel = WebhookChannel::new(config(url)).unwrap();
        let message = NotificationMessage::new("hello", MessageKind::Status);

        let result = channel.send(&message).unwrap();
        server.join().unwrap();
        assert!(matches!(result, SendResult::Failed(ref reason) if reason.contains("500")));
    }

    #[test]
    fn test_send_reports_rejected_message() {
        let (url, server) = serve_once("HTTP/1.1 200 OK", r#"{"success":false,"error":"invalid channel"}"#);
        let channel = WebhookChannel::new(config(url)).unwrap();
        let message = NotificationMessage::new("hello", MessageKind::Status);

        let result = channel.send(&message).unwrap();
        server.join().unwrap();
        assert_eq!(result, SendResult::Failed("invalid channel".to_string()));
    }

    #[test]
    fn test_should_send_skips_blank() {
        let channel = WebhookChannel::new(config("http://localhost/hook".into())).unwrap();
        assert!(!channel.should_send(&NotificationMessage::new("  ", MessageKind::Status)));
        assert!(channel.should_send(&NotificationMessage::new("x", MessageKind::Status)));
    }
}
