//! Event relay: fan-out of one run stream to independently-paced taps.
//!
//! Each tap owns a bounded queue and a loss policy. `Lossless` taps apply
//! backpressure: a full queue blocks upstream production rather than drop.
//! `BestEffort` taps drop on a full queue and go quiet on disconnect,
//! without affecting other taps or the run. The pump always drains the
//! upstream to exhaustion, even with zero live taps, because billing sits
//! upstream of the relay and depends on the stream being consumed.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::engine::event::Event;
use crate::engine::port::EventStream;

/// Loss/backpressure policy for one tap.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeliveryPolicy {
    /// Never drop; a full queue blocks the pump.
    Lossless,
    /// Drop on full queue or disconnect.
    BestEffort,
}

struct Tap {
    name: String,
    policy: DeliveryPolicy,
    tx: mpsc::Sender<Event>,
    open: bool,
    dropped: u64,
}

/// One upstream stream republished to N subscriber queues.
pub struct EventRelay {
    upstream: EventStream,
    taps: Vec<Tap>,
}

impl EventRelay {
    pub fn new(upstream: EventStream) -> Self {
        Self {
            upstream,
            taps: Vec::new(),
        }
    }

    /// Register a tap before pumping. Returns the tap's receiving stream.
    pub fn subscribe(
        &mut self,
        name: impl Into<String>,
        policy: DeliveryPolicy,
        capacity: usize,
    ) -> EventStream {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        self.taps.push(Tap {
            name: name.into(),
            policy,
            tx,
            open: true,
            dropped: 0,
        });
        EventStream::new(rx)
    }

    /// Consume the upstream to exhaustion, delivering to every tap per its
    /// policy. Returns the number of events relayed.
    pub async fn pump(mut self) -> u64 {
        let mut relayed: u64 = 0;

        while let Some(event) = self.upstream.next().await {
            relayed += 1;
            for tap in &mut self.taps {
                if !tap.open {
                    continue;
                }
                match tap.policy {
                    DeliveryPolicy::Lossless => {
                        if tap.tx.send(event.clone()).await.is_err() {
                            tap.open = false;
                            tracing::warn!(tap = %tap.name, "lossless tap disconnected");
                        }
                    }
                    DeliveryPolicy::BestEffort => match tap.tx.try_send(event.clone()) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => {
                            tap.dropped += 1;
                        }
                        Err(TrySendError::Closed(_)) => {
                            tap.open = false;
                        }
                    },
                }
            }
        }

        for tap in &self.taps {
            if tap.dropped > 0 {
                tracing::debug!(
                    tap = %tap.name,
                    dropped = tap.dropped,
                    "best-effort tap dropped events under backpressure"
                );
            }
        }
        relayed
    }

    /// Drive the pump server-side, detached from any caller.
    pub fn spawn(self) -> tokio::task::JoinHandle<u64> {
        tokio::spawn(self.pump())
    }
}
