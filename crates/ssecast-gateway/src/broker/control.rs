//! Broker control loop.
//!
//! One task owns the group registry and is the only writer of the client map.
//! Connection tasks talk to it through an unbounded command queue, so
//! connect/disconnect/membership changes apply in arrival order and never race.

use std::sync::Arc;

use std::panic::{catch_unwind, AssertUnwindSafe};

use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use ssecast_core::error::{Result, SseCastError};

use crate::broker::groups::{GroupRegistry, ALL_CLIENTS};

/// Caller hook invoked inside the control loop. Must not block. A panic is
/// caught and logged; the registry change it reports has already been applied.
pub type Hook = Arc<dyn Fn(&str) + Send + Sync>;

/// Sender half of one client's channel, tagged with its connection sequence
/// and the token that stops its reader.
pub(crate) struct ClientSlot<T> {
    pub(crate) seq: u64,
    pub(crate) tx: mpsc::Sender<T>,
    pub(crate) cancel: CancellationToken,
}

/// Group send target captured by a snapshot.
pub(crate) struct Target<T> {
    pub(crate) client_id: String,
    pub(crate) tx: mpsc::Sender<T>,
    pub(crate) cancel: CancellationToken,
}

pub(crate) type ClientMap<T> = Arc<DashMap<String, ClientSlot<T>>>;

pub(crate) enum Command<T> {
    Connect {
        client_id: String,
        slot: ClientSlot<T>,
        reply: oneshot::Sender<Result<()>>,
    },
    /// `seq: Some(_)` only removes the matching connection; a newer
    /// connection under the same id is left alone.
    Disconnect {
        client_id: String,
        seq: Option<u64>,
        reply: Option<oneshot::Sender<()>>,
    },
    AddToGroup {
        client_id: String,
        group: String,
        reply: oneshot::Sender<Result<()>>,
    },
    RemoveFromGroup {
        client_id: String,
        group: String,
        reply: oneshot::Sender<Result<bool>>,
    },
    Clients {
        reply: oneshot::Sender<Vec<String>>,
    },
    Groups {
        reply: oneshot::Sender<Vec<String>>,
    },
    GroupClients {
        group: String,
        reply: oneshot::Sender<Option<Vec<String>>>,
    },
    /// Point-in-time fan-out targets for a group.
    Snapshot {
        group: String,
        reply: oneshot::Sender<Vec<Target<T>>>,
    },
}

#[derive(Default)]
pub(crate) struct Hooks {
    pub(crate) on_connect: Option<Hook>,
    pub(crate) on_disconnect: Option<Hook>,
}

pub(crate) struct Control<T> {
    clients: ClientMap<T>,
    groups: GroupRegistry,
    hooks: Hooks,
}

impl<T: Send + 'static> Control<T> {
    pub(crate) fn new(clients: ClientMap<T>, hooks: Hooks) -> Self {
        Self {
            clients,
            groups: GroupRegistry::new(),
            hooks,
        }
    }

    /// Spawn the loop. It stops once every command sender (the broker and all
    /// live sessions) is gone.
    pub(crate) fn spawn(self, rx: mpsc::UnboundedReceiver<Command<T>>) {
        tokio::spawn(self.run(rx));
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command<T>>) {
        while let Some(cmd) = rx.recv().await {
            self.apply(cmd);
        }
        tracing::debug!("broker control loop stopped");
    }

    fn apply(&mut self, cmd: Command<T>) {
        match cmd {
            Command::Connect { client_id, slot, reply } => {
                let _ = reply.send(self.connect(client_id, slot));
            }
            Command::Disconnect { client_id, seq, reply } => {
                self.disconnect(&client_id, seq);
                if let Some(reply) = reply {
                    let _ = reply.send(());
                }
            }
            Command::AddToGroup { client_id, group, reply } => {
                let _ = reply.send(self.add_to_group(&client_id, &group));
            }
            Command::RemoveFromGroup { client_id, group, reply } => {
                let res = if group == ALL_CLIENTS {
                    Err(SseCastError::ReservedGroup(group))
                } else {
                    Ok(self.groups.remove(&client_id, &group))
                };
                let _ = reply.send(res);
            }
            Command::Clients { reply } => {
                let mut ids: Vec<String> = self.clients.iter().map(|e| e.key().clone()).collect();
                ids.sort_unstable();
                let _ = reply.send(ids);
            }
            Command::Groups { reply } => {
                let _ = reply.send(self.groups.names());
            }
            Command::GroupClients { group, reply } => {
                let _ = reply.send(self.groups.members(&group).map(<[String]>::to_vec));
            }
            Command::Snapshot { group, reply } => {
                let targets = self
                    .groups
                    .distinct_members(&group)
                    .into_iter()
                    .filter_map(|id| {
                        let slot = self.clients.get(&id)?;
                        let (tx, cancel) = (slot.tx.clone(), slot.cancel.clone());
                        drop(slot);
                        Some(Target { client_id: id, tx, cancel })
                    })
                    .collect();
                let _ = reply.send(targets);
            }
        }
    }

    fn connect(&mut self, client_id: String, slot: ClientSlot<T>) -> Result<()> {
        if self.clients.contains_key(&client_id) {
            return Err(SseCastError::DuplicateClient(client_id));
        }
        self.clients.insert(client_id.clone(), slot);
        self.groups.add(&client_id, ALL_CLIENTS);
        tracing::info!(client = %client_id, clients = self.clients.len(), "client connected");
        run_hook(self.hooks.on_connect.as_ref(), "connect", &client_id);
        Ok(())
    }

    fn disconnect(&mut self, client_id: &str, seq: Option<u64>) {
        let Some((_, slot)) = self
            .clients
            .remove_if(client_id, |_, slot| seq.map_or(true, |s| s == slot.seq))
        else {
            return;
        };
        slot.cancel.cancel();
        self.groups.prune(client_id);
        tracing::info!(client = %client_id, clients = self.clients.len(), "client disconnected");
        run_hook(self.hooks.on_disconnect.as_ref(), "disconnect", client_id);
    }

    fn add_to_group(&mut self, client_id: &str, group: &str) -> Result<()> {
        if group == ALL_CLIENTS {
            return Err(SseCastError::ReservedGroup(group.to_string()));
        }
        if !self.clients.contains_key(client_id) {
            return Err(SseCastError::UnknownRecipient(client_id.to_string()));
        }
        self.groups.add(client_id, group);
        Ok(())
    }
}

fn run_hook(hook: Option<&Hook>, kind: &str, client_id: &str) {
    let Some(hook) = hook else { return; };
    if catch_unwind(AssertUnwindSafe(|| hook(client_id))).is_err() {
        tracing::error!(client = %client_id, hook = kind, "broker hook panicked");
    }
}
