//! Event routing.
//!
//! The dispatcher owns the inbox. Each user of each chat gets a worker task
//! fed by its own channel, so one conversation is handled strictly in order
//! while others proceed concurrently. Workers hold their session and hand
//! it back when they wind down; the dispatcher parks it until that user
//! writes again.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::engine::{CompletedRecord, DialogueState, Engine, Session};
use crate::transport::{
    ChatId, InboundEvent, Inbox, OutboundMessage, Outbox, TransportError, UserId,
};

/// Per-worker queue depth.
const WORKER_QUEUE: usize = 32;

/// One conversation: a user within a chat.
pub type SessionKey = (ChatId, UserId);

struct Worker {
    tx: mpsc::Sender<InboundEvent>,
    task: JoinHandle<Option<Session>>,
}

pub struct Dispatcher {
    engine: Arc<Engine>,
    outbox: Arc<dyn Outbox>,
    workers: HashMap<SessionKey, Worker>,
    parked: HashMap<SessionKey, Session>,
    idle_timeout: Duration,
    sweep_every: Duration,
}

impl Dispatcher {
    #[must_use]
    pub fn new(engine: Arc<Engine>, outbox: Arc<dyn Outbox>, idle_timeout: Duration) -> Self {
        Self {
            engine,
            outbox,
            workers: HashMap::new(),
            parked: HashMap::new(),
            idle_timeout,
            sweep_every: Duration::from_secs(60),
        }
    }

    #[must_use]
    pub fn with_sweep_interval(mut self, every: Duration) -> Self {
        self.sweep_every = every;
        self
    }

    /// Number of conversations with a live worker.
    #[must_use]
    pub fn active_sessions(&self) -> usize {
        self.workers.values().filter(|w| !w.task.is_finished()).count()
    }

    /// Number of mid-dialogue sessions waiting for their user to return.
    #[must_use]
    pub fn parked_sessions(&self) -> usize {
        self.parked.len()
    }

    /// Pulls events from `inbox` until shutdown is signalled or the inbox fails.
    ///
    /// Workers survive a returned error, so a restarted loop resumes the
    /// same sessions.
    ///
    /// # Errors
    ///
    /// Returns the inbox error that ended the loop.
    pub async fn run(
        &mut self,
        inbox: &mut dyn Inbox,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<(), TransportError> {
        let mut sweep = time::interval(self.sweep_every);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = crate::shutdown::requested(shutdown) => return Ok(()),
                _ = sweep.tick() => self.sweep().await,
                batch = inbox.next_batch() => {
                    for event in batch? {
                        self.route(event).await;
                    }
                }
            }
        }
    }

    /// Hands `event` to its conversation's worker, spawning one if needed.
    ///
    /// Never waits on a worker queue: when one conversation has a full
    /// backlog its event is dropped so other chats keep flowing.
    pub async fn route(&mut self, event: InboundEvent) {
        let key = (event.chat_id, event.from.id);

        let Some(worker) = self.workers.remove(&key) else {
            let session = self.parked.remove(&key);
            self.spawn(key, session, event);
            return;
        };
        match worker.tx.try_send(event) {
            Ok(()) => {
                self.workers.insert(key, worker);
            }
            Err(mpsc::error::TrySendError::Full(dropped)) => {
                tracing::warn!(
                    chat = dropped.chat_id,
                    user = dropped.from.id,
                    "session backlog full, dropping event"
                );
                self.workers.insert(key, worker);
            }
            Err(mpsc::error::TrySendError::Closed(returned)) => {
                // Worker wound down between events; resume its session.
                let session = reap(key, worker.task).await;
                self.spawn(key, session, returned);
            }
        }
    }

    fn spawn(&mut self, key: SessionKey, session: Option<Session>, first: InboundEvent) {
        let (tx, rx) = mpsc::channel(WORKER_QUEUE);
        let session = session.unwrap_or_else(|| Session::new(key.0, key.1));
        if tx.try_send(first).is_err() {
            tracing::warn!(chat = key.0, user = key.1, "fresh session queue refused its first event");
        }
        let task = tokio::spawn(worker_loop(
            Arc::clone(&self.engine),
            Arc::clone(&self.outbox),
            session,
            rx,
            self.idle_timeout,
        ));
        self.workers.insert(key, Worker { tx, task });
    }

    /// Parks the sessions of finished workers and drops expired rate-limit
    /// windows.
    pub async fn sweep(&mut self) {
        let finished: Vec<SessionKey> = self
            .workers
            .iter()
            .filter(|(_, w)| w.task.is_finished())
            .map(|(key, _)| *key)
            .collect();
        for key in &finished {
            if let Some(worker) = self.workers.remove(key) {
                if let Some(session) = reap(*key, worker.task).await {
                    self.parked.insert(*key, session);
                }
            }
        }
        let users = self.engine.limiter().sweep(std::time::Instant::now());
        if !finished.is_empty() || users > 0 {
            tracing::debug!(
                workers = finished.len(),
                parked = self.parked.len(),
                users,
                "sweep evicted idle state"
            );
        }
    }

    /// Closes every worker queue and waits for queued events to be handled.
    pub async fn shutdown(&mut self) {
        let workers: Vec<_> = self.workers.drain().collect();
        tracing::info!(workers = workers.len(), "draining session workers");
        for ((chat, user), Worker { tx, task }) in workers {
            drop(tx);
            if let Err(error) = task.await {
                tracing::error!(chat, user, %error, "session worker failed during drain");
            }
        }
    }
}

/// Collects the session a worker handed back.
async fn reap(key: SessionKey, task: JoinHandle<Option<Session>>) -> Option<Session> {
    match task.await {
        Ok(session) => session,
        Err(error) => {
            tracing::error!(chat = key.0, user = key.1, %error, "session worker failed");
            None
        }
    }
}

async fn worker_loop(
    engine: Arc<Engine>,
    outbox: Arc<dyn Outbox>,
    mut session: Session,
    mut rx: mpsc::Receiver<InboundEvent>,
    idle_timeout: Duration,
) -> Option<Session> {
    loop {
        let event = match time::timeout(idle_timeout, rx.recv()).await {
            Ok(Some(event)) => event,
            Ok(None) => return keep(session),
            Err(_) => {
                // Refuse new events, then finish whatever was already queued.
                rx.close();
                while let Ok(event) = rx.try_recv() {
                    session = process(&engine, outbox.as_ref(), session, &event).await;
                }
                tracing::debug!(chat = session.chat_id, state = %session.state, "session worker idle");
                return keep(session);
            }
        };
        session = process(&engine, outbox.as_ref(), session, &event).await;
    }
}

/// Sessions worth resuming: ones in the middle of a dialogue.
fn keep(session: Session) -> Option<Session> {
    (session.state != DialogueState::Idle && !session.state.is_terminal()).then_some(session)
}

async fn process(
    engine: &Engine,
    outbox: &dyn Outbox,
    session: Session,
    event: &InboundEvent,
) -> Session {
    let now = Instant::now().into_std();
    let handled = panic::catch_unwind(AssertUnwindSafe(|| engine.handle(&session, event, now)));
    let transition = match handled {
        Ok(transition) => transition,
        Err(_) => {
            tracing::error!(chat = event.chat_id, "panic while handling event");
            let apology = OutboundMessage::text(event.chat_id, &engine.flow().texts.apology);
            if let Err(error) = outbox.send(&apology).await {
                tracing::warn!(chat = event.chat_id, %error, "failed to deliver apology");
            }
            return session;
        }
    };

    for reply in &transition.replies {
        if let Err(error) = outbox.send(reply).await {
            tracing::warn!(
                chat = event.chat_id,
                %error,
                "reply delivery failed, keeping previous state"
            );
            return session;
        }
    }

    tracing::debug!(
        chat = event.chat_id,
        from = %session.state,
        to = %transition.session.state,
        outcome = ?transition.outcome,
        "transition"
    );
    if let Some(record) = &transition.record {
        audit(record);
    }
    transition.session
}

fn audit(record: &CompletedRecord) {
    tracing::info!(
        target: "audit",
        flow = %record.flow,
        chat = record.chat_id,
        user = record.user_id,
        username = record.username.as_deref().unwrap_or("-"),
        fields = ?record.fields,
        "dialogue completed"
    );
}
