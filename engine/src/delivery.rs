//! Delivery Channel
//!
//! The engine runs on a worker task; the renderer runs on the UI task. They
//! share nothing but two unbounded channels:
//!
//! ```text
//!  UI task ──String (turn)──▶ dispatcher ──Engine::chat──▶ backend
//!  UI task ◀──Delivery─────── dispatcher
//! ```
//!
//! Turns are handled strictly one at a time. Every turn ends with
//! [`Delivery::TurnEnded`], whether it succeeded or not. When the turn queue
//! closes the dispatcher drops its delivery sender, so the UI sees the
//! channel close.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::engine::Engine;

/// One unit handed from the worker to the renderer
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// The backend request is in flight
    Activity,
    /// Visible text to append to the open assistant message
    Token(String),
    /// The turn failed; the message is for the status line
    Failed(String),
    /// The turn is over, successful or not
    TurnEnded,
}

/// Sender half used by the engine
pub type DeliverySender = mpsc::UnboundedSender<Delivery>;

/// Receiver half owned by the renderer
pub type DeliveryReceiver = mpsc::UnboundedReceiver<Delivery>;

/// Sender half of the inbound turn queue
pub type TurnSender = mpsc::UnboundedSender<String>;

/// Handles to a running dispatcher
pub struct DispatcherHandle {
    /// Submit user turns here
    pub turns: TurnSender,
    /// Deliveries for the renderer
    pub deliveries: DeliveryReceiver,
    /// The dispatcher task
    pub task: JoinHandle<()>,
}

/// Spawn [`run_dispatcher`] on the current runtime with fresh channels
#[must_use]
pub fn spawn_dispatcher(engine: Arc<Engine>) -> DispatcherHandle {
    let (turn_tx, turn_rx) = mpsc::unbounded_channel();
    let (delivery_tx, delivery_rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(run_dispatcher(engine, turn_rx, delivery_tx));
    DispatcherHandle {
        turns: turn_tx,
        deliveries: delivery_rx,
        task,
    }
}

/// Process turns sequentially until the turn queue closes
pub async fn run_dispatcher(
    engine: Arc<Engine>,
    mut turns: mpsc::UnboundedReceiver<String>,
    delivery: DeliverySender,
) {
    tracing::info!(protocol = %engine.config().protocol, "dispatcher started");

    while let Some(turn) = turns.recv().await {
        tracing::debug!(chars = turn.len(), "turn received");

        if let Err(e) = engine.chat(&turn, &delivery).await {
            tracing::error!(error = %e, "turn failed");
            // Receiver gone is caught by the TurnEnded send below
            let _ = delivery.send(Delivery::Failed(e.to_string()));
        }

        if delivery.send(Delivery::TurnEnded).is_err() {
            tracing::debug!("delivery receiver dropped, dispatcher exiting");
            return;
        }
    }

    tracing::info!("turn queue closed, dispatcher exiting");
}
