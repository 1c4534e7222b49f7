// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Messages
//!
//! Every actor receives the same [`Message`] type. The runtime reserves a few variants for its own
//! protocol (termination, behavior transitions, dead letters) and carries application messages as
//! a type-erased [`Payload`] that behaviors downcast to the types they understand.
//!

use crate::ActorRef;

use uuid::Uuid;

use std::{
    any::{Any, type_name},
    fmt,
    sync::Arc,
};

/// Type-erased application message.
///
/// Cloning a payload only clones an `Arc`, so messages stay cheap to copy between mailboxes.
#[derive(Clone)]
pub struct Payload {
    type_name: &'static str,
    value: Arc<dyn Any + Send + Sync>,
}

impl Payload {
    pub fn new<T>(value: T) -> Self
    where
        T: Any + Send + Sync,
    {
        Self {
            type_name: type_name::<T>(),
            value: Arc::new(value),
        }
    }

    /// Rust type name of the wrapped value, used in logs.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.value.is::<T>()
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Payload({})", self.type_name)
    }
}

/// Message delivered to an actor.
///
/// Every variant except [`Message::OnEnter`] and [`Message::DeadLetter`] carries the optional
/// sender used for replies. Replying is a convention: handlers tell the sender back.
#[derive(Clone, Debug)]
pub enum Message {
    /// Stops the receiving actor and, recursively, all of its children.
    Harakiri { sender: Option<ActorRef> },
    /// Same termination protocol as `Harakiri`.
    PoisonPill { sender: Option<ActorRef> },
    /// Sent by an actor to itself after its behavior stack changed.
    OnEnter,
    /// A message addressed to an actor that was gone, returned to its sender.
    DeadLetter(DeadLetter),
    /// Application message tagged with a correlation identifier.
    WithOperationId {
        operation_id: Uuid,
        payload: Payload,
        sender: Option<ActorRef>,
    },
    /// Application message.
    User {
        payload: Payload,
        sender: Option<ActorRef>,
    },
}

impl Message {
    /// Wraps an application value.
    pub fn new<T>(value: T, sender: Option<ActorRef>) -> Self
    where
        T: Any + Send + Sync,
    {
        Message::User {
            payload: Payload::new(value),
            sender,
        }
    }

    /// Wraps an application value tagged with `operation_id`.
    pub fn with_operation_id<T>(
        value: T,
        operation_id: Uuid,
        sender: Option<ActorRef>,
    ) -> Self
    where
        T: Any + Send + Sync,
    {
        Message::WithOperationId {
            operation_id,
            payload: Payload::new(value),
            sender,
        }
    }

    pub fn harakiri(sender: Option<ActorRef>) -> Self {
        Message::Harakiri { sender }
    }

    pub fn poison_pill(sender: Option<ActorRef>) -> Self {
        Message::PoisonPill { sender }
    }

    /// Who sent this message, if anyone.
    pub fn sender(&self) -> Option<&ActorRef> {
        match self {
            Message::Harakiri { sender }
            | Message::PoisonPill { sender }
            | Message::WithOperationId { sender, .. }
            | Message::User { sender, .. } => sender.as_ref(),
            Message::OnEnter | Message::DeadLetter(_) => None,
        }
    }

    /// Application payload, if this is an application message.
    pub fn payload(&self) -> Option<&Payload> {
        match self {
            Message::WithOperationId { payload, .. }
            | Message::User { payload, .. } => Some(payload),
            _ => None,
        }
    }

    /// Downcasts the application payload.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload().and_then(|payload| payload.downcast_ref::<T>())
    }

    pub fn is<T: Any>(&self) -> bool {
        self.payload().is_some_and(|payload| payload.is::<T>())
    }

    pub fn operation_id(&self) -> Option<Uuid> {
        match self {
            Message::WithOperationId { operation_id, .. } => Some(*operation_id),
            _ => None,
        }
    }

    /// True for `Harakiri` and `PoisonPill`.
    pub fn is_termination(&self) -> bool {
        matches!(self, Message::Harakiri { .. } | Message::PoisonPill { .. })
    }

    /// Short name of the message used in logs.
    pub fn type_name(&self) -> &'static str {
        match self {
            Message::Harakiri { .. } => "Harakiri",
            Message::PoisonPill { .. } => "PoisonPill",
            Message::OnEnter => "OnEnter",
            Message::DeadLetter(_) => "DeadLetter",
            Message::WithOperationId { payload, .. }
            | Message::User { payload, .. } => payload.type_name(),
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::DeadLetter(letter) => write!(
                f,
                "DeadLetter({} to {})",
                letter.message.type_name(),
                letter.dead_actor
            ),
            Message::WithOperationId {
                operation_id,
                payload,
                ..
            } => write!(f, "{} [{}]", payload.type_name(), operation_id),
            other => write!(f, "{}", other.type_name()),
        }
    }
}

/// Notification of an undeliverable message.
///
/// Produced by the system when a message is told to an actor that is stopped or never existed.
#[derive(Clone, Debug)]
pub struct DeadLetter {
    dead_actor: ActorRef,
    message: Box<Message>,
    sender: Option<ActorRef>,
}

impl DeadLetter {
    pub(crate) fn new(dead_actor: ActorRef, message: Message) -> Self {
        let sender = message.sender().cloned();
        Self {
            dead_actor,
            message: Box::new(message),
            sender,
        }
    }

    /// The actor the message was addressed to.
    pub fn dead_actor(&self) -> &ActorRef {
        &self.dead_actor
    }

    /// The message that could not be delivered.
    pub fn message(&self) -> &Message {
        &self.message
    }

    /// The original sender of the message.
    pub fn sender(&self) -> Option<&ActorRef> {
        self.sender.as_ref()
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[derive(Debug, PartialEq)]
    struct Push;

    #[derive(Debug, PartialEq)]
    enum Coin {
        Insert(u32),
    }

    #[test]
    fn test_downcast_user_message() {
        let msg = Message::new(Coin::Insert(2), None);
        assert!(msg.is::<Coin>());
        assert!(!msg.is::<Push>());
        assert_eq!(msg.downcast_ref::<Coin>(), Some(&Coin::Insert(2)));
        assert!(msg.downcast_ref::<Push>().is_none());
        assert!(msg.sender().is_none());
        assert!(msg.operation_id().is_none());
    }

    #[test]
    fn test_operation_id() {
        let id = Uuid::new_v4();
        let msg = Message::with_operation_id(Push, id, None);
        assert_eq!(msg.operation_id(), Some(id));
        assert_eq!(msg.downcast_ref::<Push>(), Some(&Push));
        assert!(msg.to_string().contains(&id.to_string()));
    }

    #[test]
    fn test_termination_messages() {
        assert!(Message::harakiri(None).is_termination());
        assert!(Message::poison_pill(None).is_termination());
        assert!(!Message::OnEnter.is_termination());
        assert!(!Message::new(Push, None).is_termination());
        assert!(Message::harakiri(None).payload().is_none());
    }

    #[test]
    fn test_display_uses_type_names() {
        assert_eq!(Message::OnEnter.to_string(), "OnEnter");
        assert_eq!(Message::poison_pill(None).to_string(), "PoisonPill");
        assert!(Message::new(Push, None).to_string().ends_with("Push"));
    }

    #[test]
    fn test_payload_clone_shares_value() {
        let payload = Payload::new(String::from("coin"));
        let copy = payload.clone();
        assert_eq!(copy.downcast_ref::<String>().map(String::as_str), Some("coin"));
        assert!(format!("{:?}", payload).contains("String"));
    }
}
