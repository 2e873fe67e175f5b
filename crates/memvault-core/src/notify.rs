//! Plan-change notifications.
//!
//! The store calls its sink synchronously from `set_plan`, after the new plan
//! has been persisted. Fan-out to UI listeners is the sink's business.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use crate::domain::{Plan, UsageStats};

/// Payload delivered on every successful plan change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanChanged {
    pub plan: Plan,
    pub usage: UsageStats,
}

/// Receiver of plan-change notifications.
pub trait PlanChangeSink: Send + Sync {
    fn notify(&self, event: &PlanChanged);
}

impl<F> PlanChangeSink for F
where
    F: Fn(&PlanChanged) + Send + Sync,
{
    fn notify(&self, event: &PlanChanged) {
        self(event)
    }
}

/// Drops every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl PlanChangeSink for NoopSink {
    fn notify(&self, _event: &PlanChanged) {}
}

/// Fans notifications out to any number of tokio subscribers.
///
/// Sending with no live subscribers is not an error; the event is dropped.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    tx: broadcast::Sender<PlanChanged>,
}

impl BroadcastSink {
    /// Create a sink buffering up to `capacity` events per lagging subscriber.
    pub fn new(capacity: usize) -> (Self, broadcast::Receiver<PlanChanged>) {
        let (tx, rx) = broadcast::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlanChanged> {
        self.tx.subscribe()
    }
}

impl PlanChangeSink for BroadcastSink {
    fn notify(&self, event: &PlanChanged) {
        if self.tx.send(event.clone()).is_err() {
            debug!(plan = %event.plan, "plan change dropped, no subscribers");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FREE_LIMIT;
    use std::sync::Mutex;

    fn event(plan: Plan) -> PlanChanged {
        PlanChanged {
            plan,
            usage: UsageStats::compute(plan, 3, FREE_LIMIT),
        }
    }

    #[test]
    fn test_closure_sink_receives_event() {
        let seen = Mutex::new(Vec::new());
        let sink = |e: &PlanChanged| seen.lock().unwrap().push(e.plan);
        sink.notify(&event(Plan::Premium));
        sink.notify(&event(Plan::Free));
        assert_eq!(*seen.lock().unwrap(), vec![Plan::Premium, Plan::Free]);
    }

    #[test]
    fn test_broadcast_sink_fans_out() {
        let (sink, mut first) = BroadcastSink::new(4);
        let mut second = sink.subscribe();
        sink.notify(&event(Plan::Premium));

        assert_eq!(first.try_recv().unwrap().plan, Plan::Premium);
        assert_eq!(second.try_recv().unwrap(), event(Plan::Premium));
    }

    #[test]
    fn test_broadcast_sink_without_subscribers_is_silent() {
        let (sink, rx) = BroadcastSink::new(1);
        drop(rx);
        sink.notify(&event(Plan::Free));
    }

    #[test]
    fn test_payload_shape() {
        let value = serde_json::to_value(event(Plan::Premium)).unwrap();
        assert_eq!(value["plan"], "premium");
        assert_eq!(value["usage"]["limit"], "unlimited");
        assert_eq!(value["usage"]["currentCount"], 3);
    }
}
