// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Mailbox
//!
//! Each actor owns one unbounded queue. Senders enqueue without blocking and a single runner task
//! drains the queue, so the items of one mailbox are handled one at a time and in submission
//! order. Once the runner closes the queue, enqueueing hands the item back to the caller, which
//! turns it into a dead letter.
//!

use crate::{ActorPath, Message};

use tokio::sync::mpsc;

use tracing::debug;

/// Work item queued for an actor.
#[derive(Debug)]
pub(crate) enum Envelope {
    /// A message for the actor's current behavior.
    Deliver(Message),
    /// Drop a child from the child map without stopping it.
    ForgetChild(ActorPath),
}

/// Receiving half, owned by the actor runner.
pub(crate) type MailboxReceiver = mpsc::UnboundedReceiver<Envelope>;

/// Sending half of an actor mailbox.
#[derive(Clone, Debug)]
pub(crate) struct Mailbox {
    sender: mpsc::UnboundedSender<Envelope>,
}

/// Mailbox factory.
pub(crate) fn mailbox() -> (Mailbox, MailboxReceiver) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (Mailbox { sender }, receiver)
}

impl Mailbox {
    /// Queues a message. Returns it back if the mailbox is already closed.
    pub(crate) fn tell(&self, message: Message) -> Result<(), Message> {
        if let Err(error) = self.sender.send(Envelope::Deliver(message)) {
            if let Envelope::Deliver(message) = error.0 {
                return Err(message);
            }
        }
        Ok(())
    }

    /// Queues an internal request. Requests on a closed mailbox are dropped.
    pub(crate) fn enqueue(&self, envelope: Envelope) {
        if let Err(error) = self.sender.send(envelope) {
            debug!("Dropping {:?}, mailbox is closed.", error.0);
        }
    }

    #[cfg(test)]
    pub(crate) fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Closes the receiver and returns every message still queued, in order.
pub(crate) fn drain(receiver: &mut MailboxReceiver) -> Vec<Message> {
    receiver.close();
    let mut pending = Vec::new();
    while let Ok(envelope) = receiver.try_recv() {
        if let Envelope::Deliver(message) = envelope {
            pending.push(message);
        }
    }
    pending
}

#[cfg(test)]
mod tests {

    use super::*;

    #[derive(Debug, PartialEq)]
    struct Seq(u32);

    #[tokio::test]
    async fn test_mailbox_is_fifo() {
        let (mailbox, mut receiver) = mailbox();
        for i in 0..10 {
            mailbox.tell(Message::new(Seq(i), None)).unwrap();
        }
        for i in 0..10 {
            match receiver.recv().await {
                Some(Envelope::Deliver(msg)) => {
                    assert_eq!(msg.downcast_ref::<Seq>(), Some(&Seq(i)))
                }
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn test_closed_mailbox_returns_message() {
        let (mailbox, mut receiver) = mailbox();
        assert!(!mailbox.is_closed());
        mailbox.tell(Message::new(Seq(1), None)).unwrap();
        mailbox.enqueue(Envelope::ForgetChild(ActorPath::from("/user/a")));
        mailbox.tell(Message::new(Seq(2), None)).unwrap();

        let pending = drain(&mut receiver);
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].downcast_ref::<Seq>(), Some(&Seq(1)));
        assert_eq!(pending[1].downcast_ref::<Seq>(), Some(&Seq(2)));

        assert!(mailbox.is_closed());
        let rejected = mailbox.tell(Message::new(Seq(3), None)).unwrap_err();
        assert_eq!(rejected.downcast_ref::<Seq>(), Some(&Seq(3)));
        // Internal requests on a closed mailbox are silently dropped.
        mailbox.enqueue(Envelope::ForgetChild(ActorPath::from("/user/a")));
    }
}
