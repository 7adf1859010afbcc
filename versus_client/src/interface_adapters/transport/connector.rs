// Room connector: negotiate, open the relay link, and fall back to the
// in-process bus only on local development hosts.

use crate::domain::{ConnectionError, Connector, Link, PeerMessage, RoomCode};
use crate::interface_adapters::clients::negotiate::NegotiateClient;
use crate::interface_adapters::transport::loopback::LoopbackBus;
use crate::interface_adapters::transport::relay::RelayLink;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};
use url::Url;

/// True for hosts where a silent local fallback is acceptable.
pub fn is_local_host(url: &Url) -> bool {
    match url.host_str() {
        Some(host) => host == "localhost" || host == "127.0.0.1" || host.ends_with(".local"),
        None => false,
    }
}

pub struct RoomConnector {
    negotiate: NegotiateClient,
    loopback: Arc<LoopbackBus>,
    join_timeout: Duration,
}

impl RoomConnector {
    pub fn new(
        negotiate: NegotiateClient,
        loopback: Arc<LoopbackBus>,
        join_timeout: Duration,
    ) -> Self {
        Self {
            negotiate,
            loopback,
            join_timeout,
        }
    }

    fn allows_local_fallback(&self) -> bool {
        is_local_host(self.negotiate.endpoint())
    }

    async fn connect_relay(
        &self,
        room: &RoomCode,
        inbound: mpsc::UnboundedSender<PeerMessage>,
    ) -> Result<RelayLink, ConnectionError> {
        let url = self.negotiate.fetch_url().await?;
        RelayLink::open(&url, room, inbound, self.join_timeout).await
    }
}

#[async_trait]
impl Connector for RoomConnector {
    async fn connect(
        &self,
        room: &RoomCode,
        inbound: mpsc::UnboundedSender<PeerMessage>,
    ) -> Result<Box<dyn Link>, ConnectionError> {
        match self.connect_relay(room, inbound.clone()).await {
            Ok(link) => Ok(Box::new(link)),
            Err(e) if self.allows_local_fallback() => {
                warn!(error = %e, room = %room, "relay unavailable; using local loopback");
                let link = self.loopback.open(room, inbound);
                info!(room = %room, "loopback link opened");
                Ok(Box::new(link))
            }
            Err(e) => Err(e),
        }
    }
}
