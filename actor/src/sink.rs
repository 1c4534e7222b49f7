// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Event sink
//!
//! Observers of an actor system attach a [`Subscriber`] to its event stream through a [`Sink`].
//! The system publishes actor starts, actor stops, dead letters and its own shutdown; sinks are
//! how tests and monitoring code watch those without touching the actors.
//!

use async_trait::async_trait;
use tokio::sync::broadcast::{Receiver as EventReceiver, error::RecvError};

use tracing::{debug, warn};

use std::fmt::Debug;

/// Marker for values carried on an event stream.
pub trait Event: Debug + Clone + Send + Sync + 'static {}

/// A sink that receives events from a stream and notifies a subscriber.
///
/// # Type Parameters
///
/// * `E` - The event type that this sink will process.
///
pub struct Sink<E: Event> {
    /// The subscriber that will be notified of events.
    subscriber: Box<dyn Subscriber<E>>,
    /// The broadcast receiver.
    event_receiver: EventReceiver<E>,
}

impl<E: Event> Sink<E> {
    /// Creates a new Sink with the given event receiver and subscriber.
    ///
    /// # Arguments
    ///
    /// * `event_receiver` - Receiver obtained with `SystemRef::subscribe`.
    /// * `subscriber` - Implementation of the Subscriber trait that will process events.
    ///
    pub fn new(
        event_receiver: EventReceiver<E>,
        subscriber: impl Subscriber<E>,
    ) -> Self {
        Sink {
            subscriber: Box::new(subscriber),
            event_receiver,
        }
    }

    /// Runs the sink's event processing loop until the stream is closed.
    /// Events missed while lagging are skipped.
    ///
    pub async fn run(&mut self) {
        loop {
            match self.event_receiver.recv().await {
                Ok(event) => {
                    debug!(
                        "Received event: {:?}. Notify to the subscriber.",
                        event
                    );
                    self.subscriber.notify(event).await;
                }
                Err(RecvError::Closed) => break,
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Sink lagged behind, {} events skipped.", skipped);
                }
            }
        }
    }
}

/// Trait for types that process the events of a stream.
///
/// # Type Parameters
///
/// * `E` - The event type this subscriber can process.
///
#[async_trait]
pub trait Subscriber<E: Event>: Send + Sync + 'static {
    /// Called for each event received by the sink.
    async fn notify(&self, event: E);
}
