//! Chat relay to an external NLU bot server.
//!
//! User messages are forwarded as-is to the bot server's REST webhook and
//! the text fragments it returns are printed in order. Intent handling lives
//! entirely on the bot server; this module only moves text back and forth
//! and keeps the session transcript in memory.
//!
//! # Wire format
//!
//! ```text
//! POST {chat.url}
//! {"sender": "<session id>", "message": "<user text>"}
//!
//! 200 OK
//! [{"text": "first reply"}, {"image": "..."}, {"text": "second reply"}]
//! ```
//!
//! Fragments without a `text` key are skipped.
//!
//! # Failures
//!
//! - Connection refused and timeouts are reported immediately; the session
//!   continues.
//! - HTTP 5xx → retry with exponential backoff (1s, 2s, 4s, …) up to
//!   `chat.max_retries` times.
//! - HTTP 4xx → reported without retry.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::config::ChatConfig;
use crate::models::{ChatMessage, Sender};

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("could not connect to the bot server at {url}; is it running?")]
    Unreachable { url: String },

    #[error("the bot server at {url} did not answer within {secs}s")]
    Timeout { url: String, secs: u64 },

    #[error("bot server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request to bot server failed: {0}")]
    Transport(String),

    #[error("unexpected response from bot server: {0}")]
    Decode(String),
}

#[derive(Debug, Serialize)]
struct OutgoingMessage<'a> {
    sender: &'a str,
    message: &'a str,
}

#[derive(Debug, Deserialize)]
struct BotFragment {
    #[serde(default)]
    text: Option<String>,
}

/// HTTP client for the bot server webhook.
pub struct BotClient {
    client: reqwest::Client,
    url: String,
    timeout_secs: u64,
    max_retries: u32,
}

impl BotClient {
    pub fn new(config: &ChatConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url: config.url.clone(),
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send one message and return the bot's text fragments in order.
    pub async fn send(&self, sender: &str, message: &str) -> Result<Vec<String>, RelayError> {
        let body = OutgoingMessage { sender, message };
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tracing::debug!(attempt, ?delay, "retrying bot server request");
                tokio::time::sleep(delay).await;
            }

            let response = match self.client.post(&self.url).json(&body).send().await {
                Ok(r) => r,
                Err(e) => return Err(self.classify(e)),
            };

            let status = response.status();
            if status.is_success() {
                let fragments: Vec<BotFragment> = response
                    .json()
                    .await
                    .map_err(|e| RelayError::Decode(e.to_string()))?;
                return Ok(fragments.into_iter().filter_map(|f| f.text).collect());
            }

            let body_text = match response.text().await {
                Ok(text) => text,
                Err(e) => format!("<failed to read response body: {}>", e),
            };
            let err = RelayError::Status {
                status: status.as_u16(),
                body: body_text,
            };
            if status.is_server_error() {
                tracing::warn!(status = status.as_u16(), attempt, "bot server error");
                last_err = Some(err);
                continue;
            }
            return Err(err);
        }

        Err(last_err.unwrap_or_else(|| RelayError::Transport("no attempts made".to_string())))
    }

    fn classify(&self, e: reqwest::Error) -> RelayError {
        if e.is_timeout() {
            RelayError::Timeout {
                url: self.url.clone(),
                secs: self.timeout_secs,
            }
        } else if e.is_connect() {
            RelayError::Unreachable {
                url: self.url.clone(),
            }
        } else {
            RelayError::Transport(e.to_string())
        }
    }
}

/// In-memory transcript for one chat session.
#[derive(Debug, Clone)]
pub struct ChatSession {
    sender_id: String,
    transcript: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new(sender_id: impl Into<String>) -> Self {
        Self {
            sender_id: sender_id.into(),
            transcript: Vec::new(),
        }
    }

    /// Session with a random UUID sender id.
    pub fn anonymous() -> Self {
        Self::new(uuid::Uuid::new_v4().to_string())
    }

    pub fn sender_id(&self) -> &str {
        &self.sender_id
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    /// Record the user's message, relay it, and record the replies. The
    /// user message stays in the transcript even when the relay fails.
    pub async fn exchange(
        &mut self,
        client: &BotClient,
        text: &str,
    ) -> Result<Vec<ChatMessage>, RelayError> {
        self.transcript.push(ChatMessage::new(Sender::User, text));
        let replies: Vec<ChatMessage> = client
            .send(&self.sender_id, text)
            .await?
            .into_iter()
            .map(|t| ChatMessage::new(Sender::Bot, t))
            .collect();
        self.transcript.extend(replies.iter().cloned());
        Ok(replies)
    }
}

/// Drive a chat session from line-oriented input until `/quit` or EOF.
///
/// Blank lines are ignored and `/history` prints the transcript. Relay
/// failures are written to `out` as plain text.
pub async fn run_session<R, W>(
    client: &BotClient,
    session: &mut ChatSession,
    input: R,
    out: &mut W,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        let text = line.trim();
        match text {
            "" => continue,
            "/quit" | "/exit" => break,
            "/history" => {
                for msg in session.transcript() {
                    let who = match msg.sender {
                        Sender::User => "you",
                        Sender::Bot => "bot",
                    };
                    writeln!(out, "[{}] {}> {}", msg.timestamp.format("%H:%M:%S"), who, msg.text)?;
                }
                continue;
            }
            _ => {}
        }

        match session.exchange(client, text).await {
            Ok(replies) if replies.is_empty() => writeln!(out, "bot> (no reply)")?,
            Ok(replies) => {
                for reply in replies {
                    writeln!(out, "bot> {}", reply.text)?;
                }
            }
            Err(e) => writeln!(out, "error: {}", e)?,
        }
        out.flush()?;
    }
    Ok(())
}

/// CLI entry point for `books chat`.
pub async fn run_chat(config: &ChatConfig, sender: Option<String>) -> Result<()> {
    let client = BotClient::new(config)?;
    let mut session = match sender {
        Some(id) => ChatSession::new(id),
        None => ChatSession::anonymous(),
    };

    println!(
        "Chatting with {} as {} (/history, /quit)",
        client.url(),
        session.sender_id()
    );

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    run_session(&client, &mut session, stdin, &mut stdout).await?;

    tracing::info!(messages = session.transcript().len(), "chat session ended");
    Ok(())
}
