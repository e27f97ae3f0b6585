//! Channel-keyed publish/subscribe used to announce grid clicks.
//!
//! The router is an explicit handle passed to whoever publishes; subscribers
//! hold a [`Subscription`] and drain it once per frame.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

/// What happened on a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GridEventKind {
    /// A cell was confirmed with a click.
    GridClicked,
}

/// A confirmed click on a grid cell, `x` is the column and `y` the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridEvent {
    /// Event kind, also part of the subscription key.
    pub kind: GridEventKind,
    /// Column.
    pub x: u32,
    /// Row.
    pub y: u32,
}

impl GridEvent {
    /// Click on cell (`x`, `y`).
    pub fn clicked(x: u32, y: u32) -> Self {
        GridEvent {
            kind: GridEventKind::GridClicked,
            x,
            y,
        }
    }
}

type Queue = Rc<RefCell<VecDeque<GridEvent>>>;

/// Receiving end of one (channel, kind) pair.
#[derive(Debug, Clone)]
pub struct Subscription {
    channel: String,
    queue: Queue,
}

impl Subscription {
    /// Channel this subscription listens on.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Take every event published since the last drain, oldest first.
    pub fn drain(&self) -> Vec<GridEvent> {
        self.queue.borrow_mut().drain(..).collect()
    }

    /// No events waiting.
    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }
}

/// Delivers published events to every live subscription of the same channel and kind.
#[derive(Debug, Default)]
pub struct EventRouter {
    subscribers: HashMap<(String, GridEventKind), Vec<Queue>>,
}

impl EventRouter {
    /// Router without subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start receiving `kind` events published on `channel`.
    pub fn subscribe(&mut self, channel: &str, kind: GridEventKind) -> Subscription {
        let queue: Queue = Rc::new(RefCell::new(VecDeque::new()));
        self.subscribers
            .entry((channel.to_owned(), kind))
            .or_default()
            .push(Rc::clone(&queue));
        Subscription {
            channel: channel.to_owned(),
            queue,
        }
    }

    /// Deliver `event` to every live subscriber of `channel`; returns how many received it.
    pub fn publish(&mut self, channel: &str, event: GridEvent) -> usize {
        let Some(queues) = self.subscribers.get_mut(&(channel.to_owned(), event.kind)) else {
            tracing::debug!(channel, ?event, "no subscribers");
            return 0;
        };
        // drop queues whose Subscription is gone
        queues.retain(|q| Rc::strong_count(q) > 1);
        for q in queues.iter() {
            q.borrow_mut().push_back(event);
        }
        queues.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_reaches_only_matching_channel() {
        let mut router = EventRouter::new();
        let map = router.subscribe("Map", GridEventKind::GridClicked);
        let palette = router.subscribe("Palette", GridEventKind::GridClicked);

        assert_eq!(router.publish("Map", GridEvent::clicked(1, 2)), 1);

        assert_eq!(map.drain(), vec![GridEvent::clicked(1, 2)]);
        assert!(palette.is_empty());
        assert!(map.drain().is_empty());
    }

    #[test]
    fn events_keep_publish_order() {
        let mut router = EventRouter::new();
        let sub = router.subscribe("Map", GridEventKind::GridClicked);
        router.publish("Map", GridEvent::clicked(0, 0));
        router.publish("Map", GridEvent::clicked(3, 1));
        let got: Vec<_> = sub.drain().into_iter().map(|e| (e.x, e.y)).collect();
        assert_eq!(got, vec![(0, 0), (3, 1)]);
    }

    #[test]
    fn dropped_subscription_stops_receiving() {
        let mut router = EventRouter::new();
        let sub = router.subscribe("Map", GridEventKind::GridClicked);
        drop(sub);
        assert_eq!(router.publish("Map", GridEvent::clicked(0, 0)), 0);
    }
}
