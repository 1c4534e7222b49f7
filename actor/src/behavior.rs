// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Behaviors
//!
//! An actor can replace the way it handles messages at runtime. Behaviors are kept in a stack of
//! named entries: the head is the active behavior and an empty stack means the actor's own
//! [`Actor::receive`](crate::Actor::receive) handles the message. The names exist for logging and
//! to return to a known state with `pop_to_state`.
//!

use crate::{Actor, ActorContext, Message};

use async_trait::async_trait;

use std::sync::Arc;

/// Alternate message handler an actor can install with `become`.
///
/// Behaviors hold no mutable state of their own. They receive the actor itself, so state lives in
/// the actor and survives transitions. A behavior that does not recognize a message can fall
/// through with `actor.receive(msg, ctx).await`.
///
/// # Examples
///
/// ```ignore
/// struct Locked;
///
/// #[async_trait]
/// impl Behavior<Gate> for Locked {
///     async fn receive(&self, gate: &mut Gate, msg: Message, ctx: &mut ActorContext<Gate>) {
///         if msg.is::<Unlock>() {
///             ctx.r#become("unlocked", Unlocked, true);
///         } else {
///             gate.receive(msg, ctx).await;
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Behavior<A: Actor>: Send + Sync + 'static {
    /// Handles one message while this behavior is at the head of the stack.
    async fn receive(&self, actor: &mut A, msg: Message, ctx: &mut ActorContext<A>);
}

/// Shared handle to a behavior, as stored in the behavior stack of an actor.
pub type BoxedBehavior<A> = Arc<dyn Behavior<A>>;

/// Ordered stack of named handlers. The last pushed entry is the head.
#[derive(Clone, Debug)]
pub struct BehaviorStack<H> {
    entries: Vec<(String, H)>,
}

impl<H> Default for BehaviorStack<H> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<H> BehaviorStack<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes `handler` as the new head, first dropping the current head if `discard_top`.
    pub fn push(&mut self, name: &str, handler: H, discard_top: bool) {
        if discard_top {
            self.entries.pop();
        }
        self.entries.push((name.to_owned(), handler));
    }

    /// Removes the head. Returns the removed entry, if any.
    pub fn pop(&mut self) -> Option<(String, H)> {
        self.entries.pop()
    }

    /// Pops until the head is named `name`.
    ///
    /// Returns `false` if no entry has that name, in which case the stack ends up empty.
    pub fn pop_until(&mut self, name: &str) -> bool {
        loop {
            match self.entries.last() {
                Some((head, _)) if head == name => return true,
                Some(_) => {
                    self.entries.pop();
                }
                None => return false,
            }
        }
    }

    /// Clears the stack, returning to the default handler.
    pub fn pop_to_empty(&mut self) {
        self.entries.clear();
    }

    /// The active entry.
    pub fn head(&self) -> Option<(&str, &H)> {
        self.entries
            .last()
            .map(|(name, handler)| (name.as_str(), handler))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Names of the stacked behaviors, head first.
    pub fn names(&self) -> Vec<&str> {
        self.entries
            .iter()
            .rev()
            .map(|(name, _)| name.as_str())
            .collect()
    }
}
