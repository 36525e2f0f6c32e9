//! Event dispatch loop
//!
//! Serializes the three data-plane inputs (link notifications, received
//! frames and the per-second protocol tick) into the shared tracker so
//! they are processed strictly in arrival order, with the tick interleaved
//! from the same task.
//!
//! The netlink listener and the packet socket live outside this crate; they
//! only need a [`BridgeEvent`] sender.

use crate::tracker::BridgeTracker;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

/// A data-plane event for the tracker
#[derive(Debug, Clone)]
pub enum BridgeEvent {
    /// Kernel link notification, in the tracker's `(br_index, if_index,
    /// newlink, up)` convention
    LinkChanged {
        br_index: i32,
        if_index: i32,
        newlink: bool,
        up: bool,
    },
    /// A raw Ethernet frame captured on the interface
    FrameReceived { if_index: i32, data: Vec<u8> },
}

/// Drives a shared [`BridgeTracker`] from an event channel plus a
/// once-per-second tick.
pub struct EventDispatcher {
    tracker: Arc<RwLock<BridgeTracker>>,
    events: mpsc::UnboundedReceiver<BridgeEvent>,
}

impl EventDispatcher {
    /// Create the event channel for a dispatcher.
    pub fn channel() -> (
        mpsc::UnboundedSender<BridgeEvent>,
        mpsc::UnboundedReceiver<BridgeEvent>,
    ) {
        mpsc::unbounded_channel()
    }

    pub fn new(
        tracker: Arc<RwLock<BridgeTracker>>,
        events: mpsc::UnboundedReceiver<BridgeEvent>,
    ) -> Self {
        Self { tracker, events }
    }

    /// Run until every event sender is dropped. Each event is fully
    /// processed before the next one starts; ticks are serialized with
    /// events on the same task.
    pub async fn run(self) {
        info!("Starting bridge event dispatcher");
        let EventDispatcher { tracker, mut events } = self;
        let mut tick = interval(Duration::from_secs(1));
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => handle(&tracker, event).await,
                    None => {
                        info!("Event channel closed, stopping dispatcher");
                        break;
                    }
                },
                _ = tick.tick() => {
                    tracker.write().await.one_second().await;
                }
            }
        }
    }
}

async fn handle(tracker: &Arc<RwLock<BridgeTracker>>, event: BridgeEvent) {
    match event {
        BridgeEvent::LinkChanged {
            br_index,
            if_index,
            newlink,
            up,
        } => {
            let mut tracker = tracker.write().await;
            if let Err(e) = tracker.link_notify(br_index, if_index, newlink, up).await {
                debug!("Link notification for {} not applied: {}", if_index, e);
            }
        }
        BridgeEvent::FrameReceived { if_index, data } => {
            tracker.write().await.rx_frame(if_index, &data).await;
        }
    }
}
