// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Actor system
//!
//! The `system` module provides the `ActorSystem` type. The `ActorSystem` type is the responsible for
//! creating and managing actors. Every system owns a guardian actor at `/user`; the actors created
//! through the system are its children and the rest of the tree hangs below them.
//!

use crate::{
    Actor, ActorPath, ActorRef, DeadLetter, Error, Message,
    actor::ActorCell,
    runner::{ActorRunner, StartSender},
    sink::{Event, Sink},
};

use serde::{Deserialize, Serialize};

use tokio::{
    sync::{broadcast, mpsc, oneshot, watch},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

use tracing::{debug, error, warn};

use uuid::Uuid;

use std::{
    sync::{Arc, Mutex, PoisonError, RwLock},
    time::Duration,
};

/// Name of the guardian actor, parent of every top level actor.
const GUARDIAN: &str = "user";

/// Actor system configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Name of the system, used in logs.
    pub name: String,
    /// Capacity of the system event stream.
    pub event_capacity: usize,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            name: "theater".to_owned(),
            event_capacity: 1024,
        }
    }
}

/// Actor system.
///
pub struct ActorSystem {}

/// Default implementation for `ActorSystem`.
impl ActorSystem {
    /// Create a new actor system with the default configuration.
    ///
    /// Cancelling `token` has the same effect as [`SystemRef::stop`].
    ///
    /// # Returns
    ///
    /// Returns a tuple with the system reference and the system runner.
    pub fn create(
        name: &str,
        token: CancellationToken,
    ) -> (SystemRef, SystemRunner) {
        let config = SystemConfig {
            name: name.to_owned(),
            ..SystemConfig::default()
        };
        Self::with_config(config, token)
    }

    /// Create a new actor system.
    pub fn with_config(
        config: SystemConfig,
        token: CancellationToken,
    ) -> (SystemRef, SystemRunner) {
        let (event_sender, event_receiver) = mpsc::channel(1);
        let system = SystemRef::new(config, event_sender, token);
        let runner = SystemRunner::new(event_receiver);
        (system, runner)
    }
}

/// System event.
///
#[derive(Debug, Clone)]
pub enum SystemEvent {
    /// An actor finished `pre_start`.
    ActorStarted(ActorPath),
    /// An actor was deregistered.
    ActorStopped(ActorPath),
    /// A message could not be delivered.
    DeadLetter(DeadLetter),
    /// Stop the actor system.
    StopSystem,
}

impl Event for SystemEvent {}

/// The guardian only supervises; it handles no messages of its own.
struct Guardian;

impl Actor for Guardian {}

/// System reference.
///
#[derive(Clone)]
pub struct SystemRef {
    /// The name of the system.
    name: Arc<str>,

    /// The guardian actor, `None` once it stopped.
    guardian: Arc<RwLock<Option<ActorCell>>>,

    /// Event stream.
    events: broadcast::Sender<SystemEvent>,

    /// Number of actor runners still running.
    live: Arc<watch::Sender<usize>>,

    /// Actors forgotten by their parent. They keep running until the system stops.
    orphans: Arc<Mutex<Vec<ActorCell>>>,

    token: CancellationToken,
}

impl SystemRef {
    /// Create system reference.
    pub(crate) fn new(
        config: SystemConfig,
        event_sender: mpsc::Sender<SystemEvent>,
        token: CancellationToken,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let (live, _) = watch::channel(0usize);
        let system = SystemRef {
            name: Arc::from(config.name.as_str()),
            guardian: Arc::new(RwLock::new(None)),
            events,
            live: Arc::new(live),
            orphans: Arc::new(Mutex::new(Vec::new())),
            token,
        };

        let path = ActorPath::from("/") / GUARDIAN;
        let (runner, cell) =
            ActorRunner::create(ActorRef::new(path, system.clone()), Guardian);
        *system
            .guardian
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(cell);
        system.track_runner();
        system.spawn_runner(runner, None);

        let watcher = system.clone();
        tokio::spawn(async move {
            watcher.token.cancelled().await;
            debug!("Stopping actor system {}...", watcher.name);
            if let Some(guardian) = watcher.guardian() {
                guardian.stop();
            }
            let orphans = std::mem::take(
                &mut *watcher
                    .orphans
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner),
            );
            for orphan in orphans {
                orphan.stop();
            }
            watcher.terminated().await;
            watcher.publish(SystemEvent::StopSystem);
            let _ = event_sender.send(SystemEvent::StopSystem).await;
        });

        system
    }

    /// Name of the system.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Launches a new top level actor on this actor system at the '/user'
    /// actor path. If another actor with the same name already exists,
    /// an `Err(Error::Exists(ActorPath))` is returned instead.
    ///
    /// # Arguments
    ///
    /// * `name` - The name of the actor to create.
    /// * `actor` - The type with `Actor` trait to create.
    ///
    /// # Returns
    ///
    /// Returns the actor reference once the actor's `pre_start` has run.
    ///
    pub async fn actor_of<A>(
        &self,
        name: &str,
        actor: A,
    ) -> Result<ActorRef, Error>
    where
        A: Actor,
    {
        let guardian = self.guardian().ok_or(Error::SystemStopped)?;
        self.create_actor(&guardian, name, actor).await
    }

    /// Launches a new top level actor with a fresh unique name.
    pub async fn actor_of_unnamed<A>(&self, actor: A) -> Result<ActorRef, Error>
    where
        A: Actor,
    {
        self.actor_of(&Uuid::new_v4().to_string(), actor).await
    }

    /// Creates `actor` as a child of `parent` and waits for its `pre_start`.
    pub(crate) async fn create_actor<A>(
        &self,
        parent: &ActorCell,
        name: &str,
        actor: A,
    ) -> Result<ActorRef, Error>
    where
        A: Actor,
    {
        if self.token.is_cancelled() {
            return Err(Error::SystemStopped);
        }
        if name.trim().is_empty() || name.contains('/') {
            return Err(Error::InvalidName(name.to_owned()));
        }
        let path = parent.path().clone() / name;
        let (runner, cell) =
            ActorRunner::create(ActorRef::new(path.clone(), self.clone()), actor);

        // Counted before it is visible in the tree, so `terminated` can not resolve while a
        // registered child has yet to be spawned.
        self.track_runner();
        if let Err(err) = parent.reserve_child(cell.clone()) {
            self.runner_finished();
            error!("Can not create actor {}: {}", &path, err);
            return Err(match err {
                Error::NotAlive(_) if parent.path().is_root_level() => {
                    Error::SystemStopped
                }
                other => other,
            });
        }

        let (sender, receiver) = oneshot::channel();
        self.spawn_runner(runner, Some(sender));
        receiver
            .await
            .map_err(|e| Error::Start(e.to_string()))??;
        Ok(cell.myself())
    }

    fn track_runner(&self) {
        self.live.send_modify(|live| *live += 1);
    }

    /// Spawns a runner already counted by `track_runner`.
    fn spawn_runner<A>(&self, runner: ActorRunner<A>, started: Option<StartSender>)
    where
        A: Actor,
    {
        let system = self.clone();
        tokio::spawn(async move {
            runner.init(system, started).await;
        });
    }

    pub(crate) fn runner_finished(&self) {
        self.live.send_modify(|live| *live = live.saturating_sub(1));
    }

    /// Resolves `actor_ref` to the live actor, walking the tree from the guardian. Returns `None`
    /// if any segment of the path is missing, whether it never existed or already stopped.
    pub fn actor_for_ref(&self, actor_ref: &ActorRef) -> Option<ActorCell> {
        if !self.same_system(actor_ref.system()) {
            return None;
        }
        self.resolve(actor_ref.path())
    }

    /// Looks up the actor registered at `path`, e.g. `"/user/gate"`.
    pub fn select_actor(&self, path: &str) -> Option<ActorRef> {
        self.resolve(&ActorPath::from(path)).map(|cell| cell.myself())
    }

    fn resolve(&self, path: &ActorPath) -> Option<ActorCell> {
        let guardian = self.guardian()?;
        if path.is_empty() || path.root() != *guardian.path() {
            return None;
        }
        let mut current = guardian;
        for level in 2..=path.level() {
            current = current.child(&path.at_level(level))?;
        }
        Some(current)
    }

    fn guardian(&self) -> Option<ActorCell> {
        self.guardian
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Removes a stopping actor from the tree. If its parent is already gone there is nothing to
    /// remove it from.
    pub(crate) fn deregister(&self, cell: &ActorCell) {
        let path = cell.path();
        if path.is_root_level() {
            let mut guardian = self
                .guardian
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            if guardian.as_ref().is_some_and(|g| g.path() == path) {
                *guardian = None;
            }
        } else if let Some(parent) = self.resolve(&path.parent()) {
            parent.remove_child_cell(cell);
        }
        self.orphans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|orphan| !orphan.same_cell(cell));
    }

    /// Keeps track of a forgotten child so that stopping the system still reaches it.
    pub(crate) fn adopt(&self, cell: ActorCell) {
        let mut orphans = self
            .orphans
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if self.token.is_cancelled() {
            cell.stop();
        } else {
            orphans.push(cell);
        }
    }

    /// Handles a message that could not be delivered to `target`.
    ///
    /// The dead letter is published on the event stream and returned to the original sender.
    /// Termination directives, `OnEnter` and dead letters themselves are only logged.
    pub(crate) fn dead_letter(&self, target: &ActorRef, message: Message) {
        match &message {
            Message::Harakiri { .. } | Message::PoisonPill { .. } => {
                debug!("Actor {} is already stopped, {} ignored.", target, message);
                return;
            }
            Message::OnEnter => {
                debug!("Actor {} is stopped, OnEnter dropped.", target);
                return;
            }
            Message::DeadLetter(letter) => {
                warn!(
                    "Dead letter for {} could not be returned: {}",
                    letter.dead_actor(),
                    target
                );
                return;
            }
            _ => {}
        }

        let sender = message
            .sender()
            .map(ToString::to_string)
            .unwrap_or_else(|| "No Sender".to_owned());
        warn!("Dead letter from {} to {}: {}", sender, target, message);

        let letter = DeadLetter::new(target.clone(), message);
        self.publish(SystemEvent::DeadLetter(letter.clone()));
        if let Some(sender) = letter.sender().cloned() {
            sender.tell(Message::DeadLetter(letter));
        }
    }

    /// Stops every actor, top down, then the system itself.
    pub fn stop(&self) {
        self.token.cancel();
    }

    /// True once `stop` was called.
    pub fn is_stopping(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Waits until every actor of this system has stopped.
    pub async fn terminated(&self) {
        let mut live = self.live.subscribe();
        let _ = live.wait_for(|live| *live == 0).await;
    }

    /// Subscribes to the system event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<SystemEvent> {
        self.events.subscribe()
    }

    pub(crate) fn publish(&self, event: SystemEvent) {
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }

    /// Runs `block` once after `delay`, unless the system stops first.
    pub fn schedule_once<F>(&self, delay: Duration, block: F) -> JoinHandle<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let token = self.token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => debug!("Scheduled task cancelled."),
                _ = tokio::time::sleep(delay) => block(),
            }
        })
    }

    /// Run a sink. The sink will be run in a separate task.
    ///
    pub async fn run_sink<E>(&self, mut sink: Sink<E>)
    where
        E: Event,
    {
        tokio::spawn(async move {
            sink.run().await;
        });
    }

    pub(crate) fn same_system(&self, other: &SystemRef) -> bool {
        Arc::ptr_eq(&self.guardian, &other.guardian)
    }
}

/// System runner.
pub struct SystemRunner {
    /// The event receiver.
    event_receiver: mpsc::Receiver<SystemEvent>,
}

impl SystemRunner {
    /// Create a new system runner.
    pub(crate) fn new(event_receiver: mpsc::Receiver<SystemEvent>) -> Self {
        Self { event_receiver }
    }

    /// Run the actor system until it is stopped.
    pub async fn run(&mut self) {
        debug!("Running actor system...");
        while let Some(event) = self.event_receiver.recv().await {
            if let SystemEvent::StopSystem = event {
                debug!("Actor system stopped.");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    use async_trait::async_trait;
    use tracing_test::traced_test;

    struct Idle;

    #[async_trait]
    impl Actor for Idle {}

    #[tokio::test]
    #[traced_test]
    async fn test_stop_actor_system() {
        let token = CancellationToken::new();
        let (system, mut runner) = ActorSystem::create("test", token.clone());
        let mut events = system.subscribe();

        let handle = tokio::spawn(async move {
            runner.run().await;
        });
        system.actor_of("a", Idle).await.unwrap();

        token.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();

        assert!(logs_contain("Running actor system..."));
        assert!(logs_contain("Stopping actor system test..."));
        assert!(logs_contain("Actor system stopped."));
        assert!(system.select_actor("/user").is_none());
        assert!(system.select_actor("/user/a").is_none());
        assert_eq!(system.actor_of("b", Idle).await, Err(Error::SystemStopped));

        let mut saw_stop = false;
        while let Ok(event) = events.try_recv() {
            if let SystemEvent::StopSystem = event {
                saw_stop = true;
            }
        }
        assert!(saw_stop);
    }

    #[tokio::test]
    async fn test_select_guardian_and_unknown_paths() {
        let (system, _runner) =
            ActorSystem::create("test", CancellationToken::new());
        assert!(system.select_actor("/user").is_some());
        assert!(system.select_actor("/").is_none());
        assert!(system.select_actor("/system/a").is_none());
        assert!(system.select_actor("/user/missing").is_none());
    }

    #[tokio::test]
    async fn test_invalid_names() {
        let (system, _runner) =
            ActorSystem::create("test", CancellationToken::new());
        assert_eq!(
            system.actor_of("a/b", Idle).await,
            Err(Error::InvalidName("a/b".to_owned()))
        );
        assert_eq!(
            system.actor_of(" ", Idle).await,
            Err(Error::InvalidName(" ".to_owned()))
        );
    }

    #[tokio::test]
    async fn test_unnamed_actors_get_unique_paths() {
        let (system, _runner) =
            ActorSystem::create("test", CancellationToken::new());
        let a = system.actor_of_unnamed(Idle).await.unwrap();
        let b = system.actor_of_unnamed(Idle).await.unwrap();
        assert_ne!(a, b);
        assert!(a.path().is_child_of(&ActorPath::from("/user")));
        assert!(system.actor_for_ref(&a).is_some());
    }

    #[test]
    fn test_config_defaults() {
        let config = SystemConfig::default();
        assert_eq!(config.name, "theater");
        assert_eq!(config.event_capacity, 1024);
    }
}
