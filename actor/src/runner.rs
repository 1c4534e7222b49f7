// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Actor runner
//!
//! Each actor is driven by one `ActorRunner` spawned on its own task. The runner owns the actor
//! value and the receiving half of the mailbox, so exactly one message is inside the actor at any
//! instant. It also carries out the termination protocol.
//!

use crate::{
    ActorRef, Error, Message,
    actor::{Actor, ActorCell, ActorContext, ActorLifecycle},
    mailbox::{Envelope, MailboxReceiver, drain, mailbox},
    system::{SystemEvent, SystemRef},
};

use tokio::sync::oneshot;

use tracing::{debug, error};

/// Signal sent once `pre_start` has finished.
pub(crate) type StartSender = oneshot::Sender<Result<(), Error>>;

pub(crate) struct ActorRunner<A: Actor> {
    /// The actor.
    actor: A,
    /// The live cell registered in the tree.
    cell: ActorCell,
    /// The mailbox.
    receiver: MailboxReceiver,
}

impl<A> ActorRunner<A>
where
    A: Actor,
{
    /// Creates the runner and the cell of a new actor. Nothing runs until `init`.
    pub(crate) fn create(myself: ActorRef, actor: A) -> (Self, ActorCell) {
        debug!("Creating new actor runner.");
        let (mailbox, receiver) = mailbox();
        let cell = ActorCell::new(myself, mailbox);
        let runner = ActorRunner {
            actor,
            cell: cell.clone(),
            receiver,
        };
        (runner, cell)
    }

    /// Starts the actor and handles messages until it is stopped.
    pub(crate) async fn init(
        mut self,
        system: SystemRef,
        started: Option<StartSender>,
    ) {
        let path = self.cell.path().clone();
        debug!("Initializing actor {} runner.", &path);
        let mut ctx: ActorContext<A> = ActorContext::new(self.cell.clone());

        match self.actor.pre_start(&mut ctx).await {
            Ok(()) => {
                debug!("Actor {} is started.", &path);
                system.publish(SystemEvent::ActorStarted(path.clone()));
                if let Some(sender) = started {
                    if sender.send(Ok(())).is_err() {
                        error!("Failed to send start signal for {}!", &path);
                    }
                }
                self.run(&mut ctx).await;
            }
            Err(err) => {
                error!("Actor {} failed to start: {:?}", &path, err);
                self.cell.set_lifecycle(ActorLifecycle::Stopping);
                ctx.stop_children();
                self.shutdown(&system);
                if let Some(sender) = started {
                    let err = match err {
                        Error::Start(_) => err,
                        other => Error::Start(other.to_string()),
                    };
                    if sender.send(Err(err)).is_err() {
                        error!("Failed to send start error for {}!", &path);
                    }
                }
            }
        }
        system.runner_finished();
    }

    async fn run(&mut self, ctx: &mut ActorContext<A>) {
        debug!("Running actor {}.", self.cell.path());

        while let Some(envelope) = self.receiver.recv().await {
            match envelope {
                Envelope::ForgetChild(path) => {
                    if let Some(child) = self.cell.forget_child(&path) {
                        debug!(
                            "Actor {} forgot child {}.",
                            self.cell.path(),
                            path
                        );
                        ctx.system().adopt(child);
                    }
                }
                Envelope::Deliver(message) => {
                    if message.is_termination() {
                        self.terminate(message, ctx).await;
                        break;
                    }
                    self.dispatch(message, ctx).await;
                }
            }
        }
    }

    /// Routes one message to the active behavior, or to `receive` if the stack is empty.
    async fn dispatch(&mut self, message: Message, ctx: &mut ActorContext<A>) {
        ctx.set_sender(message.sender().cloned());
        debug!(
            "{} told {} to {}",
            sender_name(&message),
            message,
            self.cell.path()
        );
        match ctx.active_behavior() {
            Some((name, behavior)) => {
                debug!("Sending message to state {}", name);
                behavior.receive(&mut self.actor, message, ctx).await;
            }
            None => self.actor.receive(message, ctx).await,
        }
    }

    async fn terminate(&mut self, message: Message, ctx: &mut ActorContext<A>) {
        debug!(
            "{} told {} to {}",
            sender_name(&message),
            message,
            self.cell.path()
        );
        debug!("Actor {} is stopping.", self.cell.path());
        self.cell.set_lifecycle(ActorLifecycle::Stopping);
        ctx.set_sender(message.sender().cloned());
        self.actor.will_stop(ctx).await;
        ctx.stop_children();
        let system = ctx.system().clone();
        self.shutdown(&system);
        debug!("Actor {} is stopped.", self.cell.path());
        system.publish(SystemEvent::ActorStopped(self.cell.path().clone()));
    }

    /// Deregisters the actor and turns whatever is still queued into dead letters.
    fn shutdown(&mut self, system: &SystemRef) {
        system.deregister(&self.cell);
        self.cell.set_lifecycle(ActorLifecycle::Stopped);
        let myself = self.cell.myself();
        for message in drain(&mut self.receiver) {
            system.dead_letter(&myself, message);
        }
    }
}

fn sender_name(message: &Message) -> String {
    message
        .sender()
        .map(ToString::to_string)
        .unwrap_or_else(|| "No Sender".to_owned())
}
