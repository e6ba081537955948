//! In-process session with no network behind it.
//!
//! The far end of the channels is handed out as a [`LoopbackRemote`]: whoever
//! holds it plays the transport, injecting inbound events and observing what
//! the bot sends.
use async_trait::async_trait;
use log::info;
use std::sync::Mutex;
use tokio::sync::mpsc;

use crate::ds::{DeliveryServiceError, InboundEvent, OutboundEvent, Session, SessionConnector};
use crate::identity::Identity;

pub const DEFAULT_CHANNEL_CAPACITY: usize = 100;

/// Transport side of a loopback session.
pub struct LoopbackRemote {
    pub inject: mpsc::Sender<InboundEvent>,
    pub delivered: mpsc::Receiver<OutboundEvent>,
}

/// Create a connected session / remote pair.
pub fn loopback_session(capacity: usize) -> (Session, LoopbackRemote) {
    let (inject, inbound) = mpsc::channel(capacity);
    let (outbound, delivered) = mpsc::channel(capacity);
    (
        Session { inbound, outbound },
        LoopbackRemote { inject, delivered },
    )
}

/// Connector yielding loopback sessions. The remote of the most recent
/// session can be claimed once through [`LoopbackConnector::take_remote`].
pub struct LoopbackConnector {
    capacity: usize,
    remote: Mutex<Option<LoopbackRemote>>,
}

impl LoopbackConnector {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            remote: Mutex::new(None),
        }
    }

    pub fn take_remote(&self) -> Option<LoopbackRemote> {
        self.remote.lock().ok().and_then(|mut slot| slot.take())
    }
}

impl Default for LoopbackConnector {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

#[async_trait]
impl SessionConnector for LoopbackConnector {
    async fn start(
        &self,
        local: Identity,
        nickname: &str,
    ) -> Result<Session, DeliveryServiceError> {
        let (session, remote) = loopback_session(self.capacity);
        let mut slot = self
            .remote
            .lock()
            .map_err(|e| DeliveryServiceError::SessionStart(e.to_string()))?;
        *slot = Some(remote);
        info!("Loopback session started for ~{nickname} [{local}]");
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ds::TransportEventError;

    #[tokio::test]
    async fn test_loopback_connector_pairs_channels() {
        let connector = LoopbackConnector::new(4);
        let local: Identity = "ECHOECHO".parse().unwrap();
        let mut session = connector.start(local, "parrot").await.expect("start");
        let mut remote = connector.take_remote().expect("remote available");
        assert!(connector.take_remote().is_none());

        remote
            .inject
            .send(InboundEvent::TransportError(TransportEventError::Other(
                "hiccup".to_string(),
            )))
            .await
            .unwrap();
        assert!(matches!(
            session.inbound.recv().await,
            Some(InboundEvent::TransportError(_))
        ));

        let peer: Identity = "8S3HMY9Z".parse().unwrap();
        session
            .outbound
            .send(OutboundEvent::text(peer, "hi"))
            .await
            .unwrap();
        match remote.delivered.recv().await {
            Some(OutboundEvent::Text { to, text, .. }) => {
                assert_eq!(to, peer);
                assert_eq!(text, "hi");
            }
            other => panic!("unexpected {other:?}"),
        }

        drop(remote);
        assert!(session.inbound.recv().await.is_none());
    }
}
