//! Crossbeam channel bridge so one consumer can observe every room.
use crossbeam_channel::Sender;

use crate::room::RoomId;
use crate::scene::events::{EventSink, SceneEvent};

/// An event tagged with the room it happened in.
#[derive(Clone, Debug, PartialEq)]
pub struct RoomMessage {
    pub room_id: RoomId,
    pub event: SceneEvent,
}

/// Forwards events of one room into a shared channel.
#[derive(Clone, Debug)]
pub struct ChannelSink {
    pub room_id: RoomId,
    pub tx: Sender<RoomMessage>,
}

impl ChannelSink {
    pub fn new(room_id: impl Into<RoomId>, tx: Sender<RoomMessage>) -> Self {
        Self {
            room_id: room_id.into(),
            tx,
        }
    }
}

impl EventSink for ChannelSink {
    #[inline]
    fn send(&mut self, event: SceneEvent) {
        // A dropped receiver just means nobody listens anymore.
        let _ = self.tx.send(RoomMessage {
            room_id: self.room_id.clone(),
            event,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_room_id() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut sink = ChannelSink::new("lobby", tx);
        sink.send(SceneEvent::Warning {
            context: "test".into(),
            message: "hello".into(),
        });
        let msg = rx.try_recv().unwrap();
        assert_eq!(msg.room_id, "lobby");
        assert!(matches!(msg.event, SceneEvent::Warning { .. }));
    }

    #[test]
    fn disconnected_receiver_is_ignored() {
        let (tx, rx) = crossbeam_channel::unbounded();
        drop(rx);
        let mut sink = ChannelSink::new("lobby", tx);
        sink.send(SceneEvent::Warning {
            context: "test".into(),
            message: "nobody".into(),
        });
    }
}
