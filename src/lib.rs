// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! Facade of the Theater actor runtime.
//! Re-exports the public surface of the `actor` crate: actors and their refs, behaviors,
//! messages and dead letters, the actor system and its event stream.

pub use actor::{
    Actor, ActorCell, ActorContext, ActorLifecycle, ActorPath, ActorRef,
    ActorSystem, Behavior, BehaviorStack, DeadLetter, Error as ActorError,
    Event, Message, Payload, Sink, Subscriber, SystemConfig, SystemEvent,
    SystemRef, SystemRunner,
};
