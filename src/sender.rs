//! Messages the bot originates itself: the initial greeting and lines typed
//! on the console as `IDENTITY||MESSAGE`.
//!
//! Runs on its own task next to the dispatch loop. Both share the contact
//! directory behind its mutex and write to the same outbound sink.
use log::{debug, error, info, warn};
use std::{io::BufRead, sync::Arc};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::contact::ContactDirectory;
use crate::ds::{DeliveryServiceError, OutboundEvent};
use crate::error::{DispatchError, IdentityError};
use crate::identity::Identity;

pub const CONSOLE_SEPARATOR: &str = "||";
const CONSOLE_LINE_BUFFER: usize = 16;

/// Forward stdin lines from a detached OS thread.
///
/// A blocked read must not hold up runtime shutdown, so stdin is not read on
/// tokio's blocking pool. The thread ends at EOF or once the receiver is gone.
pub fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(CONSOLE_LINE_BUFFER);
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    error!("Failed to read console input: {e}");
                    break;
                }
            };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
        debug!("Console reader thread finished");
    });
    rx
}

#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    #[error("Expected IDENTITY||MESSAGE")]
    MissingSeparator,
    #[error("Message is empty")]
    EmptyMessage,
    #[error(transparent)]
    InvalidIdentity(#[from] IdentityError),
}

/// Parse one console line. Blank lines yield `None`.
pub fn parse_console_line(line: &str) -> Result<Option<(Identity, String)>, ConsoleError> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Ok(None);
    }
    let (identity, message) = line
        .split_once(CONSOLE_SEPARATOR)
        .ok_or(ConsoleError::MissingSeparator)?;
    let identity: Identity = identity.trim().parse()?;
    if message.trim().is_empty() {
        return Err(ConsoleError::EmptyMessage);
    }
    Ok(Some((identity, message.to_string())))
}

#[derive(Clone)]
pub struct ProactiveSender {
    contacts: Arc<Mutex<ContactDirectory>>,
    outbound: mpsc::Sender<OutboundEvent>,
}

impl ProactiveSender {
    pub fn new(
        contacts: Arc<Mutex<ContactDirectory>>,
        outbound: mpsc::Sender<OutboundEvent>,
    ) -> Self {
        Self { contacts, outbound }
    }

    /// Resolve `to` (fetching it if unknown) and send `text`.
    pub async fn send_text(&self, to: &Identity, text: &str) -> Result<(), DispatchError> {
        let contact = self.contacts.lock().await.resolve(to).await?;
        info!("Sending message to {} [{to}]", contact.display_name());
        self.outbound
            .send(OutboundEvent::text(*to, text))
            .await
            .map_err(|_| DeliveryServiceError::SinkClosed)?;
        Ok(())
    }

    /// Read `IDENTITY||MESSAGE` lines until EOF or cancellation.
    ///
    /// Bad lines are reported and skipped. Only fatal errors end the loop early.
    pub async fn run_console(
        &self,
        mut lines: mpsc::Receiver<String>,
        cancel: CancellationToken,
    ) -> Result<(), DispatchError> {
        info!("Console ready, send with IDENTITY||MESSAGE");
        loop {
            let line = tokio::select! {
                _ = cancel.cancelled() => break,
                line = lines.recv() => line,
            };
            let Some(line) = line else {
                break;
            };
            let (to, message) = match parse_console_line(&line) {
                Ok(Some(parsed)) => parsed,
                Ok(None) => continue,
                Err(e) => {
                    warn!("Ignoring console input {line:?}: {e}");
                    continue;
                }
            };
            match self.send_text(&to, &message).await {
                Ok(()) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => error!("Failed to send console message to {to}: {e}"),
            }
        }
        info!("Console input closed");
        Ok(())
    }
}
