// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Theater actor runtime
//!
//! A hierarchical actor runtime. Actors are isolated units of state that communicate only by
//! asynchronous messages; each one processes its mailbox one message at a time on its own task,
//! lives at a path such as `/user/gate/audio`, and stops together with all of its descendants.
//!
//! ## Overview
//!
//! - Actors are created with [`SystemRef::actor_of`] (top level, below `/user`) or with
//!   [`ActorContext::actor_of`] (children). Creation returns once `pre_start` has run.
//! - Messages are sent with [`ActorRef::tell`]. A ref is resolved on every send; messages for an
//!   actor that is gone become [`DeadLetter`]s and are returned to their sender.
//! - An actor can swap its message handler at runtime with `ActorContext::r#become` and friends.
//!   The handlers form a [`BehaviorStack`] whose head is active.
//! - [`Message::Harakiri`] (or [`Message::PoisonPill`]) stops an actor and its subtree.
//! - The system publishes [`SystemEvent`]s; a [`Sink`] feeds them to a [`Subscriber`].
//!
//! ## Getting Started
//!
//! ```ignore
//! use actor::{Actor, ActorContext, ActorSystem, Message};
//! use async_trait::async_trait;
//! use tokio_util::sync::CancellationToken;
//!
//! struct Counter {
//!     value: u64,
//! }
//!
//! struct Increment(u64);
//!
//! #[async_trait]
//! impl Actor for Counter {
//!     async fn receive(&mut self, msg: Message, _ctx: &mut ActorContext<Self>) {
//!         if let Some(Increment(by)) = msg.downcast_ref::<Increment>() {
//!             self.value += by;
//!         }
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), actor::Error> {
//!     let token = CancellationToken::new();
//!     let (system, mut runner) = ActorSystem::create("counter", token.clone());
//!     let task = tokio::spawn(async move { runner.run().await });
//!
//!     let counter = system.actor_of("counter", Counter { value: 0 }).await?;
//!     counter.tell(Message::new(Increment(5), None));
//!
//!     token.cancel();
//!     let _ = task.await;
//!     Ok(())
//! }
//! ```
//!

mod actor;
mod behavior;
mod error;
mod mailbox;
mod message;
mod path;
mod runner;
mod sink;
mod system;

/// The behavioral unit of the runtime, with its `pre_start`, `receive` and `will_stop` hooks.
pub use actor::Actor;

/// Live actor registered in the tree: mailbox, children and lifecycle.
pub use actor::ActorCell;

/// Execution context handed to every hook and behavior of an actor.
pub use actor::ActorContext;

/// Lifecycle state of an actor.
pub use actor::ActorLifecycle;

/// Path-based handle used to send messages to an actor.
pub use actor::ActorRef;

/// Alternate message handler and the stack that holds them.
pub use behavior::{Behavior, BehaviorStack, BoxedBehavior};

/// Error type of the runtime.
pub use error::Error;

/// Messages and the undeliverable message notification.
pub use message::{DeadLetter, Message, Payload};

/// Hierarchical actor identity.
pub use path::ActorPath;

/// Event stream consumers.
pub use sink::{Event, Sink, Subscriber};

/// System management.
pub use system::{ActorSystem, SystemConfig, SystemEvent, SystemRef, SystemRunner};
