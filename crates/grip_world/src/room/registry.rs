//! Explicit registry of live rooms keyed by room id.
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crossbeam_channel::Receiver;
use tracing::info;

use crate::error::{Error, Result};
use crate::room::{ChannelSink, MemberId, Room, RoomId, RoomMessage};
use crate::scene::events::EventSink;
use crate::scene::SceneConfig;

type SinkFactory = Box<dyn Fn(&str) -> Box<dyn EventSink + Send> + Send + Sync>;

struct RoomEntry {
    room: Arc<Room>,
    members: BTreeSet<MemberId>,
}

fn discard_events(_room_id: &str) -> Box<dyn EventSink + Send> {
    Box::new(())
}

/// Creates a room on its first join and destroys it when the last member leaves.
pub struct RoomRegistry {
    config: SceneConfig,
    sink_factory: SinkFactory,
    rooms: HashMap<RoomId, RoomEntry>,
}

impl RoomRegistry {
    /// New rooms start with `config`; their events are discarded until a sink factory
    /// is installed.
    pub fn new(config: SceneConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            sink_factory: Box::new(discard_events),
            rooms: HashMap::new(),
        })
    }

    /// Every room's events are sent to the returned receiver, tagged with the room id.
    pub fn with_channel(config: SceneConfig) -> Result<(Self, Receiver<RoomMessage>)> {
        let (tx, rx) = crossbeam_channel::unbounded();
        let registry = Self::new(config)?
            .with_sink_factory(move |room_id: &str| -> Box<dyn EventSink + Send> {
                Box::new(ChannelSink::new(room_id, tx.clone()))
            });
        Ok((registry, rx))
    }

    pub fn with_sink_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&str) -> Box<dyn EventSink + Send> + Send + Sync + 'static,
    {
        self.sink_factory = Box::new(factory);
        self
    }

    /// Adds `member` to `room_id`, creating the room if needed.
    pub fn join(&mut self, room_id: &str, member: impl Into<MemberId>) -> Result<Arc<Room>> {
        let member = member.into();
        if !self.rooms.contains_key(room_id) {
            let sink = (self.sink_factory)(room_id);
            let room = Room::new(room_id, self.config.clone(), sink)?;
            info!("Room '{}' created.", room_id);
            self.rooms.insert(
                room_id.to_owned(),
                RoomEntry {
                    room: Arc::new(room),
                    members: BTreeSet::new(),
                },
            );
        }
        let entry = self
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| Error::Inconsistent(format!("room '{room_id}' vanished")))?;
        if entry.members.insert(member.clone()) {
            info!("'{}' joined room '{}'.", member, room_id);
        }
        Ok(entry.room.clone())
    }

    /// Removes `member` from `room_id`. Returns whether the room was destroyed.
    pub fn leave(&mut self, room_id: &str, member: &str) -> Result<bool> {
        let Some(entry) = self.rooms.get_mut(room_id) else {
            return Ok(false);
        };
        entry.members.remove(member);
        if !entry.members.is_empty() {
            return Ok(false);
        }
        if let Some(entry) = self.rooms.remove(room_id) {
            entry.room.reset_loops()?;
            info!("Room '{}' destroyed: last member left.", room_id);
        }
        Ok(true)
    }

    pub fn get(&self, room_id: &str) -> Option<Arc<Room>> {
        self.rooms.get(room_id).map(|e| e.room.clone())
    }

    pub fn members(&self, room_id: &str) -> Vec<MemberId> {
        self.rooms
            .get(room_id)
            .map(|e| e.members.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn room_ids(&self) -> impl Iterator<Item = &RoomId> {
        self.rooms.keys()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridConfig;
    use crate::scene::events::SceneEvent;

    #[test]
    fn rejects_invalid_room_config() {
        let config = SceneConfig::new(GridConfig::new(0, 4));
        assert!(matches!(
            RoomRegistry::new(config),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn room_lives_while_members_remain() {
        let mut registry = RoomRegistry::new(SceneConfig::default()).unwrap();
        let a = registry.join("r1", "alice").unwrap();
        let b = registry.join("r1", "bob").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.members("r1"), vec!["alice".to_string(), "bob".to_string()]);

        assert!(!registry.leave("r1", "alice").unwrap());
        assert!(registry.get("r1").is_some());
        assert!(registry.leave("r1", "bob").unwrap());
        assert!(registry.get("r1").is_none());
        assert!(registry.is_empty());
        assert!(!registry.leave("r1", "bob").unwrap());
    }

    #[test]
    fn rooms_are_independent() {
        let mut registry = RoomRegistry::new(SceneConfig::default()).unwrap();
        let r1 = registry.join("r1", "alice").unwrap();
        let r2 = registry.join("r2", "alice").unwrap();
        r1.add_gripper("g", None).unwrap();
        assert!(r2.get_state().unwrap().grippers.is_empty());
        assert_eq!(registry.room_ids().count(), 2);
    }

    #[test]
    fn channel_receives_tagged_events() {
        let (mut registry, rx) = RoomRegistry::with_channel(SceneConfig::default()).unwrap();
        let room = registry.join("lobby", "alice").unwrap();
        room.add_gripper("g", None).unwrap();
        room.reset().unwrap();

        let messages: Vec<RoomMessage> = rx.try_iter().collect();
        assert_eq!(messages.len(), 2);
        assert!(messages.iter().all(|m| m.room_id == "lobby"));
        assert!(matches!(messages[0].event, SceneEvent::StateChanged { .. }));
        assert!(matches!(messages[1].event, SceneEvent::StateReplaced { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn destroying_a_room_stops_its_loops() {
        use crate::scene::mover::{Action, ActionKind};

        let mut registry = RoomRegistry::new(SceneConfig::default()).unwrap();
        let room = registry.join("r", "alice").unwrap();
        room.add_gripper("g", None).unwrap();
        room.start_loop("g", Action::Flip).unwrap();
        assert!(room.is_looping("g", ActionKind::Flip).unwrap());

        registry.leave("r", "alice").unwrap();
        assert!(!room.is_looping("g", ActionKind::Flip).unwrap());
    }
}
