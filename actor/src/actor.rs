// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Actor
//!
//! The `actor` module provides the `Actor` trait, the `ActorRef` handle used to send messages,
//! the `ActorCell` the system resolves paths to, and the `ActorContext` handed to every hook and
//! behavior while a message is being handled.
//!

use crate::{
    ActorPath, Error, Message,
    behavior::{Behavior, BehaviorStack, BoxedBehavior},
    mailbox::{Envelope, Mailbox},
    system::SystemRef,
};

use async_trait::async_trait;

use tokio::task::JoinHandle;

use tracing::{debug, trace, warn};

use uuid::Uuid;

use std::{
    collections::BTreeMap,
    fmt,
    hash::{Hash, Hasher},
    sync::{Arc, PoisonError, RwLock},
    time::Duration,
};

/// Lifecycle of an actor.
///
/// `Alive --Harakiri/PoisonPill--> Stopping --deregistered--> Stopped`. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorLifecycle {
    /// Started and processing messages.
    Alive,
    /// Running `will_stop` and tearing down its children.
    Stopping,
    /// Removed from its parent. Messages sent to it become dead letters.
    Stopped,
}

/// The behavioral unit of the runtime.
///
/// Only `receive` is usually overridden. Messages are handled one at a time, so `&mut self` is
/// never shared with another handler invocation of the same actor.
///
/// # Examples
///
/// ```ignore
/// struct Counter {
///     value: u64,
/// }
///
/// struct Increment(u64);
///
/// #[async_trait]
/// impl Actor for Counter {
///     async fn receive(&mut self, msg: Message, ctx: &mut ActorContext<Self>) {
///         match msg.downcast_ref::<Increment>() {
///             Some(Increment(by)) => self.value += by,
///             None => debug!("{} ignores {}", ctx.path(), msg),
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Actor: Send + Sized + 'static {
    /// Called once, before any message is handled. An error aborts the creation of the actor.
    async fn pre_start(
        &mut self,
        _ctx: &mut ActorContext<Self>,
    ) -> Result<(), Error> {
        Ok(())
    }

    /// Default message handler, used while the behavior stack is empty.
    ///
    /// The default implementation only logs the message.
    async fn receive(&mut self, msg: Message, ctx: &mut ActorContext<Self>) {
        match msg {
            Message::OnEnter => {
                trace!("Actor {} entered its default behavior.", ctx.path())
            }
            other => warn!(
                "Message not handled by {}: {}",
                ctx.path(),
                other.type_name()
            ),
        }
    }

    /// Called once when the actor starts stopping, before its children are told to stop.
    async fn will_stop(&mut self, _ctx: &mut ActorContext<Self>) {}
}

/// Handle used to address an actor.
///
/// An `ActorRef` names "the actor currently registered at this path in this system". It never
/// points at an instance directly: every `tell` resolves the path again, so a ref that outlives
/// its actor turns messages into dead letters instead of touching freed state.
#[derive(Clone)]
pub struct ActorRef {
    path: ActorPath,
    system: SystemRef,
}

impl ActorRef {
    pub(crate) fn new(path: ActorPath, system: SystemRef) -> Self {
        Self { path, system }
    }

    /// Sends a message. Never blocks and never runs the handler on the caller's task.
    ///
    /// If the actor is gone the message becomes a dead letter, returned to its sender.
    pub fn tell(&self, message: Message) {
        match self.system.actor_for_ref(self) {
            Some(cell) => cell.tell(message),
            None => self.system.dead_letter(self, message),
        }
    }

    /// Path of the actor this ref addresses.
    pub fn path(&self) -> &ActorPath {
        &self.path
    }

    /// The system this actor belongs to.
    pub fn system(&self) -> &SystemRef {
        &self.system
    }
}

impl PartialEq for ActorRef {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path && self.system.same_system(&other.system)
    }
}

impl Eq for ActorRef {}

impl Hash for ActorRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

impl fmt::Debug for ActorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActorRef({})", self.path)
    }
}

impl fmt::Display for ActorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path)
    }
}

/// Live actor, as registered in the tree of its system.
///
/// A cell owns the sending half of the mailbox, the child map and the lifecycle state. The actor
/// value itself stays inside its runner task; the cell is what other tasks may hold on to.
#[derive(Clone)]
pub struct ActorCell {
    inner: Arc<CellInner>,
}

struct CellInner {
    myself: ActorRef,
    mailbox: Mailbox,
    /// Copy-on-write: readers clone the `Arc`, writers swap in a new map.
    children: RwLock<Arc<BTreeMap<String, ActorCell>>>,
    lifecycle: RwLock<ActorLifecycle>,
}

impl ActorCell {
    pub(crate) fn new(myself: ActorRef, mailbox: Mailbox) -> Self {
        Self {
            inner: Arc::new(CellInner {
                myself,
                mailbox,
                children: RwLock::new(Arc::new(BTreeMap::new())),
                lifecycle: RwLock::new(ActorLifecycle::Alive),
            }),
        }
    }

    /// Path the actor is registered at.
    pub fn path(&self) -> &ActorPath {
        self.inner.myself.path()
    }

    /// Path-based reference to this actor.
    ///
    /// # Returns
    ///
    /// A new `ActorRef`. It stays valid after the actor stops; messages told to it then become
    /// dead letters.
    pub fn myself(&self) -> ActorRef {
        self.inner.myself.clone()
    }

    /// Current lifecycle state.
    pub fn lifecycle(&self) -> ActorLifecycle {
        *self
            .inner
            .lifecycle
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn set_lifecycle(&self, lifecycle: ActorLifecycle) {
        *self
            .inner
            .lifecycle
            .write()
            .unwrap_or_else(PoisonError::into_inner) = lifecycle;
    }

    pub(crate) fn mailbox(&self) -> &Mailbox {
        &self.inner.mailbox
    }

    /// Queues a message on this actor's mailbox.
    pub fn tell(&self, message: Message) {
        if let Err(message) = self.inner.mailbox.tell(message) {
            self.inner
                .myself
                .system()
                .dead_letter(&self.inner.myself, message);
        }
    }

    /// Creates a child actor at `self.path/name`. The child's `pre_start` has run when this
    /// returns `Ok`.
    ///
    /// # Errors
    ///
    /// `Error::Exists` if a child with that name is registered, `Error::InvalidName`,
    /// `Error::NotAlive` if this actor is stopping, `Error::Start` if `pre_start` failed.
    pub async fn actor_of<C>(&self, name: &str, actor: C) -> Result<ActorRef, Error>
    where
        C: Actor,
    {
        self.inner
            .myself
            .system()
            .create_actor(self, name, actor)
            .await
    }

    /// Creates a child actor with a fresh unique name.
    ///
    /// # Arguments
    ///
    /// * `actor` - The actor to run. Its name is a UUID v4.
    ///
    /// # Errors
    ///
    /// Same as [`ActorCell::actor_of`], except that the name never collides.
    pub async fn actor_of_unnamed<C>(&self, actor: C) -> Result<ActorRef, Error>
    where
        C: Actor,
    {
        self.actor_of(&Uuid::new_v4().to_string(), actor).await
    }

    /// Refs to the current children, keyed by path string.
    pub fn get_children_actors(&self) -> BTreeMap<String, ActorRef> {
        self.children_snapshot()
            .iter()
            .map(|(path, cell)| (path.clone(), cell.myself()))
            .collect()
    }

    /// Sends `Harakiri` to this actor.
    pub fn stop(&self) {
        self.tell(Message::harakiri(None));
    }

    /// Forgets `child` without stopping it. Runs on this actor's mailbox, after the messages
    /// already queued.
    pub fn stop_child(&self, child: &ActorRef) {
        self.inner
            .mailbox
            .enqueue(Envelope::ForgetChild(child.path().clone()));
    }

    pub(crate) fn children_snapshot(&self) -> Arc<BTreeMap<String, ActorCell>> {
        self.inner
            .children
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn child(&self, path: &ActorPath) -> Option<ActorCell> {
        self.children_snapshot().get(&path.to_string()).cloned()
    }

    /// Registers `child` unless its name is taken. Check and insert happen under the same
    /// write lock, so concurrent creations of one name have exactly one winner.
    /// The lifecycle is read under that lock too, so a child is either refused or seen by
    /// `seal_children`.
    pub(crate) fn reserve_child(&self, child: ActorCell) -> Result<(), Error> {
        let key = child.path().to_string();
        let mut children = self
            .inner
            .children
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if self.lifecycle() != ActorLifecycle::Alive {
            return Err(Error::NotAlive(self.path().clone()));
        }
        if children.contains_key(&key) {
            return Err(Error::Exists(child.path().clone()));
        }
        let mut next = (**children).clone();
        next.insert(key, child);
        *children = Arc::new(next);
        Ok(())
    }

    /// Marks the actor as `Stopping` and returns the children registered at that instant.
    ///
    /// Lock order is children map, then lifecycle, as in `reserve_child`. No child can be
    /// registered after the snapshot.
    pub(crate) fn seal_children(&self) -> Arc<BTreeMap<String, ActorCell>> {
        let children = self
            .inner
            .children
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        self.set_lifecycle(ActorLifecycle::Stopping);
        children.clone()
    }

    /// Removes whatever child is registered at `path` and returns it.
    pub(crate) fn forget_child(&self, path: &ActorPath) -> Option<ActorCell> {
        let mut forgotten = None;
        self.swap_children(|children| {
            forgotten = children.remove(&path.to_string());
            forgotten.is_some()
        });
        forgotten
    }

    /// Removes `child` only if it is still the cell registered at its path.
    pub(crate) fn remove_child_cell(&self, child: &ActorCell) -> bool {
        let key = child.path().to_string();
        self.swap_children(|children| match children.get(&key) {
            Some(current) if current.same_cell(child) => {
                children.remove(&key);
                true
            }
            _ => false,
        })
    }

    fn swap_children<F>(&self, update: F) -> bool
    where
        F: FnOnce(&mut BTreeMap<String, ActorCell>) -> bool,
    {
        let mut children = self
            .inner
            .children
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let mut next = (**children).clone();
        let changed = update(&mut next);
        if changed {
            *children = Arc::new(next);
        }
        changed
    }

    pub(crate) fn same_cell(&self, other: &ActorCell) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for ActorCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorCell")
            .field("path", self.path())
            .field("lifecycle", &self.lifecycle())
            .finish()
    }
}

/// Execution context of an actor.
///
/// Handed to `pre_start`, `receive`, `will_stop` and to every behavior. Besides the operations of
/// the actor's [`ActorCell`] it owns the behavior stack, which only the actor's own task touches.
pub struct ActorContext<A: Actor> {
    /// The live cell of this actor.
    cell: ActorCell,
    /// Stacked behaviors, head is active.
    behaviors: BehaviorStack<BoxedBehavior<A>>,
    /// Sender of the message being handled.
    sender: Option<ActorRef>,
}

impl<A> ActorContext<A>
where
    A: Actor,
{
    pub(crate) fn new(cell: ActorCell) -> Self {
        Self {
            cell,
            behaviors: BehaviorStack::new(),
            sender: None,
        }
    }

    /// Path of this actor, e.g. `/user/gate/audio`.
    pub fn path(&self) -> &ActorPath {
        self.cell.path()
    }

    /// Ref to this actor, to pass along as a sender.
    pub fn myself(&self) -> ActorRef {
        self.cell.myself()
    }

    /// Live cell of this actor, to hand to code that runs outside the actor.
    pub fn cell(&self) -> &ActorCell {
        &self.cell
    }

    /// The actor system this actor runs in.
    ///
    /// Use it to look up other actors with `select_actor`, to subscribe to system events or to
    /// stop the whole system.
    pub fn system(&self) -> &SystemRef {
        self.cell.inner.myself.system()
    }

    /// Sender of the message currently being handled.
    pub fn sender(&self) -> Option<&ActorRef> {
        self.sender.as_ref()
    }

    pub(crate) fn set_sender(&mut self, sender: Option<ActorRef>) {
        self.sender = sender;
    }

    /// Creates a child actor. See [`ActorCell::actor_of`].
    pub async fn actor_of<C>(&self, name: &str, actor: C) -> Result<ActorRef, Error>
    where
        C: Actor,
    {
        self.cell.actor_of(name, actor).await
    }

    /// Creates a child actor with a fresh unique name. See [`ActorCell::actor_of_unnamed`].
    pub async fn actor_of_unnamed<C>(&self, actor: C) -> Result<ActorRef, Error>
    where
        C: Actor,
    {
        self.cell.actor_of_unnamed(actor).await
    }

    /// Refs to the current children, keyed by path string.
    pub fn children(&self) -> BTreeMap<String, ActorRef> {
        self.cell.get_children_actors()
    }

    /// Reference to the child named `name`.
    ///
    /// # Arguments
    ///
    /// * `name` - Last segment of the child's path.
    ///
    /// # Returns
    ///
    /// `None` if no child with that name is registered, including children forgotten with
    /// `stop_child`.
    pub fn get_child(&self, name: &str) -> Option<ActorRef> {
        self.cell
            .child(&(self.path().clone() / name))
            .map(|cell| cell.myself())
    }

    /// Stops this actor once the messages already queued have been handled.
    pub fn stop(&self) {
        self.cell.stop();
    }

    /// Forgets `child` without stopping it.
    pub fn stop_child(&self, child: &ActorRef) {
        self.cell.stop_child(child);
    }

    /// Seals the child map and tells `Harakiri` to every child in it.
    pub(crate) fn stop_children(&self) {
        let myself = self.myself();
        for child in self.cell.seal_children().values() {
            child.tell(Message::harakiri(Some(myself.clone())));
        }
    }

    /// Pushes `behavior` as the active handler, optionally replacing the current head.
    /// The actor receives `Message::OnEnter` afterwards.
    pub fn r#become<B>(&mut self, name: &str, behavior: B, discard_top: bool)
    where
        B: Behavior<A>,
    {
        debug!("Actor {} becomes {}.", self.path(), name);
        self.behaviors.push(name, Arc::new(behavior), discard_top);
        self.notify_enter();
    }

    /// Returns to the previous behavior, or to `receive` when the stack empties.
    pub fn unbecome(&mut self) {
        if let Some((name, _)) = self.behaviors.pop() {
            debug!("Actor {} leaves {}.", self.path(), name);
            self.notify_enter();
        }
    }

    /// Pops behaviors until `name` is active. Returns `false` if no behavior had that name, in
    /// which case the actor is back to its default `receive`.
    pub fn pop_to_state(&mut self, name: &str) -> bool {
        let before = self.behaviors.len();
        let found = self.behaviors.pop_until(name);
        if !found {
            warn!("Unable to find state with name {}", name);
        }
        if self.behaviors.len() != before {
            self.notify_enter();
        }
        found
    }

    /// Pops every behavior, returning to the default `receive`.
    pub fn pop_to_root(&mut self) {
        if !self.behaviors.is_empty() {
            self.behaviors.pop_to_empty();
            self.notify_enter();
        }
    }

    /// Name of the active behavior, `None` while `receive` is active.
    pub fn current_state(&self) -> Option<&str> {
        self.behaviors.head().map(|(name, _)| name)
    }

    /// Names of the stacked behaviors, head first.
    pub fn states(&self) -> Vec<&str> {
        self.behaviors.names()
    }

    pub(crate) fn active_behavior(&self) -> Option<(String, BoxedBehavior<A>)> {
        self.behaviors
            .head()
            .map(|(name, behavior)| (name.to_owned(), behavior.clone()))
    }

    fn notify_enter(&self) {
        if self.cell.mailbox().tell(Message::OnEnter).is_err() {
            trace!("Actor {} is stopped, OnEnter dropped.", self.path());
        }
    }

    /// Runs `block` once after `delay`, on its own task.
    ///
    /// The block runs outside the mailbox: to touch actor state it must `tell` the actor.
    pub fn schedule_once<F>(&self, delay: Duration, block: F) -> JoinHandle<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.system().schedule_once(delay, block)
    }

    /// Tells `message` to `target` after `delay`.
    pub fn schedule_tell(
        &self,
        delay: Duration,
        target: ActorRef,
        message: Message,
    ) -> JoinHandle<()> {
        self.schedule_once(delay, move || target.tell(message))
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    use crate::ActorSystem;

    use tokio_util::sync::CancellationToken;

    struct Idle;

    #[async_trait]
    impl Actor for Idle {}

    #[tokio::test]
    async fn test_reserve_child_rejects_duplicates() {
        let (system, _runner) =
            ActorSystem::create("test", CancellationToken::new());
        let parent_ref = system.actor_of("parent", Idle).await.unwrap();
        let parent = system.actor_for_ref(&parent_ref).unwrap();

        let path = parent.path().clone() / "child";
        let (mailbox, _receiver) = crate::mailbox::mailbox();
        let first = ActorCell::new(ActorRef::new(path.clone(), system.clone()), mailbox.clone());
        let second = ActorCell::new(ActorRef::new(path.clone(), system.clone()), mailbox);

        parent.reserve_child(first.clone()).unwrap();
        assert_eq!(
            parent.reserve_child(second.clone()),
            Err(Error::Exists(path.clone()))
        );

        // Only the registered cell can deregister itself.
        assert!(!parent.remove_child_cell(&second));
        assert!(parent.remove_child_cell(&first));
        assert!(parent.get_children_actors().is_empty());
    }

    #[tokio::test]
    async fn test_sealed_parent_refuses_children() {
        let (system, _runner) =
            ActorSystem::create("test", CancellationToken::new());
        let parent_ref = system.actor_of("parent", Idle).await.unwrap();
        let parent = system.actor_for_ref(&parent_ref).unwrap();
        parent.actor_of("a", Idle).await.unwrap();

        let sealed = parent.seal_children();
        assert_eq!(parent.lifecycle(), ActorLifecycle::Stopping);
        assert!(sealed.contains_key("/user/parent/a"));

        let path = parent.path().clone() / "late";
        let (mailbox, _receiver) = crate::mailbox::mailbox();
        let late = ActorCell::new(ActorRef::new(path, system.clone()), mailbox);
        assert_eq!(
            parent.reserve_child(late),
            Err(Error::NotAlive(ActorPath::from("/user/parent")))
        );
        assert_eq!(
            parent.actor_of("b", Idle).await,
            Err(Error::NotAlive(ActorPath::from("/user/parent")))
        );
        assert_eq!(parent.get_children_actors().len(), 1);
    }

    #[tokio::test]
    async fn test_children_snapshot_is_stable() {
        let (system, _runner) =
            ActorSystem::create("test", CancellationToken::new());
        let parent_ref = system.actor_of("parent", Idle).await.unwrap();
        let parent = system.actor_for_ref(&parent_ref).unwrap();

        parent.actor_of("a", Idle).await.unwrap();
        let snapshot = parent.children_snapshot();
        parent.actor_of("b", Idle).await.unwrap();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(parent.children_snapshot().len(), 2);
        assert!(parent.get_children_actors().contains_key("/user/parent/b"));
    }

    #[tokio::test]
    async fn test_actor_ref_equality() {
        let (system, _runner) =
            ActorSystem::create("test", CancellationToken::new());
        let (other, _other_runner) =
            ActorSystem::create("other", CancellationToken::new());
        let a = ActorRef::new(ActorPath::from("/user/a"), system.clone());
        let b = ActorRef::new(ActorPath::from("/user/a"), system.clone());
        let c = ActorRef::new(ActorPath::from("/user/a"), other);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.to_string(), "/user/a");
        assert_eq!(format!("{:?}", a), "ActorRef(/user/a)");
    }
}
