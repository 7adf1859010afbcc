// Same-process broadcast transport used as the local-development fallback.

use crate::domain::{Link, PeerMessage, RoomCode, TransportKind};
use crate::interface_adapters::protocol::{decode, encode};
use crate::interface_adapters::utils::rng::rand_id;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const GROUP_CAPACITY: usize = 256;

// Frames carry the sending link id so a link never hears itself.
type Frame = (u64, Arc<str>);

#[derive(Debug)]
struct Group {
    sender: broadcast::Sender<Frame>,
    links: usize,
}

type Groups = Arc<Mutex<HashMap<String, Group>>>;

fn lock(groups: &Groups) -> MutexGuard<'_, HashMap<String, Group>> {
    match groups.lock() {
        Ok(groups) => groups,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// In-process message bus keyed by room group.
#[derive(Debug, Default)]
pub struct LoopbackBus {
    groups: Groups,
}

impl LoopbackBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide bus shared by every connector that does not bring its own.
    pub fn shared() -> Arc<LoopbackBus> {
        static SHARED: OnceLock<Arc<LoopbackBus>> = OnceLock::new();
        SHARED.get_or_init(|| Arc::new(LoopbackBus::new())).clone()
    }

    /// Number of rooms with at least one open link.
    pub fn group_count(&self) -> usize {
        lock(&self.groups).len()
    }

    fn join(&self, group: &str) -> broadcast::Sender<Frame> {
        let mut groups = lock(&self.groups);
        let entry = groups.entry(group.to_string()).or_insert_with(|| Group {
            sender: broadcast::channel(GROUP_CAPACITY).0,
            links: 0,
        });
        entry.links += 1;
        entry.sender.clone()
    }

    /// Opens a link on the room group; the receive loop starts before this returns.
    pub fn open(
        &self,
        room: &RoomCode,
        inbound: mpsc::UnboundedSender<PeerMessage>,
    ) -> LoopbackLink {
        let id = rand_id();
        let group = room.group();
        let sender = self.join(&group);
        let mut receiver = sender.subscribe();

        let forwarder = tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok((from, _)) if from == id => continue,
                    Ok((_, text)) => match decode(&text) {
                        Ok(message) => {
                            if inbound.send(message).is_err() {
                                break;
                            }
                        }
                        Err(e) => debug!(error = %e, "malformed loopback message dropped"),
                    },
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "loopback receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        let (disconnected_tx, _) = broadcast::channel(1);
        LoopbackLink {
            id,
            group,
            groups: self.groups.clone(),
            sender: Some(sender),
            disconnected_tx,
            forwarder,
        }
    }
}

pub struct LoopbackLink {
    id: u64,
    group: String,
    groups: Groups,
    sender: Option<broadcast::Sender<Frame>>,
    // Never fires on its own: an in-process bus does not drop.
    disconnected_tx: broadcast::Sender<()>,
    forwarder: JoinHandle<()>,
}

impl LoopbackLink {
    // Leaves the room group once; the last link out removes it from the bus.
    fn release(&mut self) {
        if self.sender.take().is_none() {
            return;
        }
        let mut groups = lock(&self.groups);
        if let Some(entry) = groups.get_mut(&self.group) {
            entry.links = entry.links.saturating_sub(1);
            if entry.links == 0 {
                groups.remove(&self.group);
            }
        }
    }
}

impl Link for LoopbackLink {
    fn send(&self, message: &PeerMessage) {
        let Some(sender) = self.sender.as_ref() else {
            return;
        };
        match encode(message) {
            Ok(text) => {
                // No receivers is not an error: the other peer may not be here yet.
                let _ = sender.send((self.id, Arc::from(text)));
            }
            Err(e) => warn!(error = %e, kind = message.kind(), "failed to encode peer message"),
        }
    }

    fn disconnected(&self) -> broadcast::Receiver<()> {
        self.disconnected_tx.subscribe()
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Loopback
    }

    fn close(&mut self) {
        self.release();
        self.forwarder.abort();
    }
}

impl Drop for LoopbackLink {
    fn drop(&mut self) {
        self.release();
        self.forwarder.abort();
    }
}
