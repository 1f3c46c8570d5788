use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use futures_util::stream::FuturesUnordered;
use futures_util::StreamExt;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use ssecast_core::error::{Result, SseCastError};

use crate::broker::adapter::{DisplayAdapter, MessageAdapter};
use crate::broker::control::{ClientMap, ClientSlot, Command, Control, Hooks, Target};
use crate::broker::groups::ALL_CLIENTS;
use crate::broker::policy::SendPolicy;

pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Outcome of a group send or broadcast.
///
/// Members that disconnected mid-iteration or whose channel stayed full are
/// listed in `failed`; the rest of the group is unaffected.
#[derive(Debug, Default)]
pub struct Fanout {
    pub delivered: usize,
    pub failed: Vec<(String, SseCastError)>,
}

/// Event broker: client registry, group registry and fan-out for one event type.
///
/// Cheap to clone; every clone talks to the same control loop. Must be built
/// inside a tokio runtime.
pub struct Broker<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Broker<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<T> {
    clients: ClientMap<T>,
    control: mpsc::UnboundedSender<Command<T>>,
    adapter: Arc<dyn MessageAdapter<T>>,
    policy: SendPolicy,
    capacity: usize,
    shutdown: CancellationToken,
    seq: AtomicU64,
}

pub struct BrokerBuilder<T> {
    adapter: Arc<dyn MessageAdapter<T>>,
    policy: SendPolicy,
    capacity: usize,
    hooks: Hooks,
}

impl<T: Send + 'static> BrokerBuilder<T> {
    pub fn new(adapter: impl MessageAdapter<T> + 'static) -> Self {
        Self {
            adapter: Arc::new(adapter),
            policy: SendPolicy::default(),
            capacity: DEFAULT_CHANNEL_CAPACITY,
            hooks: Hooks::default(),
        }
    }

    /// Per-client channel capacity (min 1).
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    pub fn send_policy(mut self, policy: SendPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn on_connect(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.hooks.on_connect = Some(Arc::new(hook));
        self
    }

    pub fn on_disconnect(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.hooks.on_disconnect = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> Broker<T> {
        let clients: ClientMap<T> = Arc::new(DashMap::new());
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        Control::new(Arc::clone(&clients), self.hooks).spawn(control_rx);

        Broker {
            inner: Arc::new(Inner {
                clients,
                control: control_tx,
                adapter: self.adapter,
                policy: self.policy,
                capacity: self.capacity,
                shutdown: CancellationToken::new(),
                seq: AtomicU64::new(1),
            }),
        }
    }
}

impl<T: Display + Send + 'static> Broker<T> {
    /// Broker with the `Display` adapter and default channel settings.
    pub fn new() -> Self {
        BrokerBuilder::new(DisplayAdapter).build()
    }
}

impl<T: Display + Send + 'static> Default for Broker<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> Broker<T> {
    pub fn builder(adapter: impl MessageAdapter<T> + 'static) -> BrokerBuilder<T> {
        BrokerBuilder::new(adapter)
    }

    pub fn adapter(&self) -> Arc<dyn MessageAdapter<T>> {
        Arc::clone(&self.inner.adapter)
    }

    pub fn send_policy(&self) -> SendPolicy {
        self.inner.policy
    }

    /// Register `client_id` and hand back the only reader of its channel.
    ///
    /// Fails with `DuplicateClient` if the id is live, or `SetupFailure` after
    /// [`Broker::shutdown`].
    pub async fn connect(&self, client_id: impl Into<String>) -> Result<ClientSession<T>> {
        let client_id = client_id.into();
        if self.inner.shutdown.is_cancelled() {
            return Err(SseCastError::SetupFailure("broker is shutting down".into()));
        }

        let (tx, rx) = mpsc::channel(self.inner.capacity);
        let seq = self.inner.seq.fetch_add(1, Ordering::Relaxed);
        let cancel = self.inner.shutdown.child_token();

        // Armed before the request goes out: if this future is dropped
        // mid-connect the registration is still undone.
        let guard = DisconnectGuard {
            control: self.inner.control.clone(),
            client_id: client_id.clone(),
            seq,
            armed: true,
        };

        self.request(|reply| Command::Connect {
            client_id,
            slot: ClientSlot {
                seq,
                tx,
                cancel: cancel.clone(),
            },
            reply,
        })
        .await??;

        Ok(ClientSession {
            rx,
            cancel,
            shutdown: self.inner.shutdown.clone(),
            guard,
        })
    }

    /// Remove the client and all its group entries. No-op for unknown ids.
    ///
    /// The client's stream loop is cancelled and its channel closed, so
    /// producers blocked on it are released with `UnknownRecipient`.
    pub async fn disconnect(&self, client_id: &str) -> Result<()> {
        self.request(|reply| Command::Disconnect {
            client_id: client_id.to_string(),
            seq: None,
            reply: Some(reply),
        })
        .await
    }

    /// Enqueue one event for one client, applying the broker's [`SendPolicy`].
    pub async fn send_to_client(&self, client_id: &str, event: T) -> Result<()> {
        let (tx, cancel) = self
            .inner
            .clients
            .get(client_id)
            .map(|slot| (slot.tx.clone(), slot.cancel.clone()))
            .ok_or_else(|| SseCastError::UnknownRecipient(client_id.to_string()))?;
        self.inner.policy.deliver(client_id, &tx, &cancel, event).await
    }

    /// Enqueue to every member of `group` as of this call.
    ///
    /// Members are sent to concurrently. An unknown group has no members.
    pub async fn send_to_group(&self, group: &str, event: T) -> Result<Fanout>
    where
        T: Clone,
    {
        let targets = self
            .request(|reply| Command::Snapshot {
                group: group.to_string(),
                reply,
            })
            .await?;

        let policy = self.inner.policy;
        let mut futs = FuturesUnordered::new();
        for Target { client_id, tx, cancel } in targets {
            let event = event.clone();
            futs.push(async move {
                let res = policy.deliver(&client_id, &tx, &cancel, event).await;
                (client_id, res)
            });
        }

        let mut fanout = Fanout::default();
        while let Some((client_id, res)) = futs.next().await {
            match res {
                Ok(()) => fanout.delivered += 1,
                Err(e) => {
                    tracing::debug!(group = %group, client = %client_id, error = %e, "fan-out skipped member");
                    fanout.failed.push((client_id, e));
                }
            }
        }
        Ok(fanout)
    }

    /// Same as `send_to_group("*", event)`.
    pub async fn broadcast(&self, event: T) -> Result<Fanout>
    where
        T: Clone,
    {
        self.send_to_group(ALL_CLIENTS, event).await
    }

    pub async fn add_to_group(&self, client_id: &str, group: &str) -> Result<()> {
        self.request(|reply| Command::AddToGroup {
            client_id: client_id.to_string(),
            group: group.to_string(),
            reply,
        })
        .await?
    }

    /// Drop one membership entry. Returns whether an entry was found.
    pub async fn remove_from_group(&self, client_id: &str, group: &str) -> Result<bool> {
        self.request(|reply| Command::RemoveFromGroup {
            client_id: client_id.to_string(),
            group: group.to_string(),
            reply,
        })
        .await?
    }

    /// Sorted ids of connected clients.
    pub async fn clients(&self) -> Result<Vec<String>> {
        self.request(|reply| Command::Clients { reply }).await
    }

    pub async fn client_count(&self) -> Result<usize> {
        Ok(self.clients().await?.len())
    }

    /// Sorted group names, `"*"` included.
    pub async fn groups(&self) -> Result<Vec<String>> {
        self.request(|reply| Command::Groups { reply }).await
    }

    /// Raw member entries of `group`, or `None` if it was never created.
    pub async fn group_clients(&self, group: &str) -> Result<Option<Vec<String>>> {
        self.request(|reply| Command::GroupClients {
            group: group.to_string(),
            reply,
        })
        .await
    }

    /// Ask every stream loop to exit; new connects are refused.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    /// Token cancelled by [`Broker::shutdown`].
    pub fn shutdown_token(&self) -> CancellationToken {
        self.inner.shutdown.clone()
    }

    async fn request<R>(&self, make: impl FnOnce(oneshot::Sender<R>) -> Command<T>) -> Result<R> {
        let (reply, rx) = oneshot::channel();
        self.inner
            .control
            .send(make(reply))
            .map_err(|_| SseCastError::Internal("broker control loop stopped".into()))?;
        rx.await
            .map_err(|_| SseCastError::Internal("broker control loop dropped reply".into()))
    }
}

/// One registered connection: the exclusive reader of its client channel.
///
/// Dropping a session unregisters the client; [`ClientSession::disconnect`]
/// does the same and waits until the registry reflects it.
pub struct ClientSession<T> {
    rx: mpsc::Receiver<T>,
    cancel: CancellationToken,
    shutdown: CancellationToken,
    guard: DisconnectGuard<T>,
}

impl<T> ClientSession<T> {
    pub fn client_id(&self) -> &str {
        &self.guard.client_id
    }

    /// Next queued event, or `None` once the client was disconnected.
    pub async fn recv(&mut self) -> Option<T> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                self.rx.close();
                None
            }
            ev = self.rx.recv() => ev,
        }
    }

    /// Cancelled when this connection is disconnected or the broker shuts down.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Cancelled by [`Broker::shutdown`].
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    pub(crate) fn parts(&mut self) -> (&str, &mut mpsc::Receiver<T>, &CancellationToken) {
        (&self.guard.client_id, &mut self.rx, &self.cancel)
    }

    /// Unregister and wait for the control loop to apply it.
    pub async fn disconnect(mut self) {
        self.guard.armed = false;
        let (reply, done) = oneshot::channel();
        let sent = self.guard.control.send(Command::Disconnect {
            client_id: self.guard.client_id.clone(),
            seq: Some(self.guard.seq),
            reply: Some(reply),
        });
        if sent.is_ok() {
            let _ = done.await;
        }
    }
}

struct DisconnectGuard<T> {
    control: mpsc::UnboundedSender<Command<T>>,
    client_id: String,
    seq: u64,
    armed: bool,
}

impl<T> Drop for DisconnectGuard<T> {
    fn drop(&mut self) {
        if self.armed {
            let _ = self.control.send(Command::Disconnect {
                client_id: std::mem::take(&mut self.client_id),
                seq: Some(self.seq),
                reply: None,
            });
        }
    }
}
