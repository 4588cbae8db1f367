use std::fmt;

use serde::Serialize;

use super::entity::{EntityId, HeroClass};
use super::SimError;
use crate::geometry::Vec2;

pub const PLAYER_SLOTS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PlayerIndex(pub usize);

impl fmt::Display for PlayerIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PlayerIndex {
    pub const PRIMARY: PlayerIndex = PlayerIndex(0);

    pub fn is_primary(self) -> bool {
        self == Self::PRIMARY
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectionFlags {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Forward,
    Back,
    Left,
    Right,
}

/// What a player's input source wants this tick. Written by the host between
/// ticks; the simulation only clears `move_requested` once a target is reached.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayerIntent {
    pub move_direction: Vec2,
    pub flags: DirectionFlags,
    pub fire: bool,
    pub target_location: Option<Vec2>,
    pub move_requested: bool,
}

impl PlayerIntent {
    pub fn set_move_direction(&mut self, raw: Vec2) {
        self.move_direction = raw.normalized_or_zero();
    }

    /// Pointer went down at `location`. Pressing on something hostile fires
    /// instead of walking.
    pub fn press_at(&mut self, location: Vec2, wants_attack: bool) {
        self.target_location = Some(location);
        self.fire = wants_attack;
        self.move_requested = !wants_attack;
    }

    pub fn drag_to(&mut self, location: Vec2) {
        self.target_location = Some(location);
        if !self.fire {
            self.move_requested = true;
        }
    }

    pub fn release(&mut self) {
        self.fire = false;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    /// False once the input source detached. The record and its hero stay.
    pub connected: bool,
    pub hero_class: HeroClass,
    pub hero: Option<EntityId>,
    pub lives_left: u32,
    pub score: u32,
    pub intent: PlayerIntent,
}

impl Player {
    pub fn new(hero_class: HeroClass, lives_left: u32) -> Self {
        Self {
            connected: true,
            hero_class,
            hero: None,
            lives_left,
            score: 0,
            intent: PlayerIntent::default(),
        }
    }
}

/// Fixed set of player slots. Slot 0 is the local player and is always
/// connected. A slot, once taken, keeps its player across disconnects.
#[derive(Debug, Clone)]
pub struct Players {
    primary: Player,
    others: [Option<Player>; PLAYER_SLOTS - 1],
}

impl Players {
    pub fn new(primary_class: HeroClass, start_lives: u32) -> Self {
        Self {
            primary: Player::new(primary_class, start_lives),
            others: Default::default(),
        }
    }

    pub fn primary(&self) -> &Player {
        &self.primary
    }

    pub fn primary_mut(&mut self) -> &mut Player {
        &mut self.primary
    }

    /// Connects a player to `index`. A previously seated player is reattached
    /// with its hero, lives and score intact.
    pub fn connect(
        &mut self,
        index: PlayerIndex,
        hero_class: HeroClass,
        start_lives: u32,
    ) -> Result<&mut Player, SimError> {
        if index.is_primary() {
            return Ok(&mut self.primary);
        }
        let slot = self.slot_mut(index)?;
        let player = slot.get_or_insert_with(|| Player::new(hero_class, start_lives));
        player.connected = true;
        Ok(player)
    }

    /// Detaches the input source of `index`. Pending intent is dropped so the
    /// hero stands still until the player returns.
    pub fn disconnect(&mut self, index: PlayerIndex) -> Result<(), SimError> {
        if index.is_primary() {
            return Err(SimError::PrimaryPlayerRequired);
        }
        if let Some(player) = self.slot_mut(index)?.as_mut() {
            player.connected = false;
            player.intent = PlayerIntent::default();
        }
        Ok(())
    }

    /// Seated player at `index`, connected or not.
    pub fn get(&self, index: PlayerIndex) -> Option<&Player> {
        if index.is_primary() {
            return Some(&self.primary);
        }
        self.others.get(index.0 - 1).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, index: PlayerIndex) -> Option<&mut Player> {
        if index.is_primary() {
            return Some(&mut self.primary);
        }
        self.others.get_mut(index.0 - 1).and_then(Option::as_mut)
    }

    pub fn connected_mut(&mut self, index: PlayerIndex) -> Option<&mut Player> {
        self.get_mut(index).filter(|player| player.connected)
    }

    pub fn connected(&self) -> impl Iterator<Item = (PlayerIndex, &Player)> {
        std::iter::once((PlayerIndex::PRIMARY, &self.primary)).chain(
            self.others
                .iter()
                .enumerate()
                .filter_map(|(offset, slot)| {
                    slot.as_ref()
                        .filter(|player| player.connected)
                        .map(|player| (PlayerIndex(offset + 1), player))
                }),
        )
    }

    pub fn connected_indices(&self) -> Vec<PlayerIndex> {
        self.connected().map(|(index, _)| index).collect()
    }

    fn slot_mut(&mut self, index: PlayerIndex) -> Result<&mut Option<Player>, SimError> {
        self.others
            .get_mut(index.0 - 1)
            .ok_or(SimError::UnknownPlayer(index))
    }
}
