use std::fmt;

use serde::{Deserialize, Serialize};

use super::players::PlayerIndex;
use super::tuning::UnitStats;
use crate::geometry::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Team {
    Hero,
    Enemy,
    Structure,
}

impl Team {
    pub fn is_opposed_to(self, other: Team) -> bool {
        match self {
            Team::Hero => matches!(other, Team::Enemy | Team::Structure),
            Team::Enemy | Team::Structure => other == Team::Hero,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeroClass {
    Warrior,
    Archer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntityKind {
    Hero {
        class: HeroClass,
        player: PlayerIndex,
    },
    Goblin {
        generator: Option<EntityId>,
    },
    Boss,
    Cave,
}

impl EntityKind {
    pub fn team(self) -> Team {
        match self {
            EntityKind::Hero { .. } => Team::Hero,
            EntityKind::Goblin { .. } | EntityKind::Boss => Team::Enemy,
            EntityKind::Cave => Team::Structure,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EntityKind::Hero {
                class: HeroClass::Warrior,
                ..
            } => "warrior",
            EntityKind::Hero {
                class: HeroClass::Archer,
                ..
            } => "archer",
            EntityKind::Goblin { .. } => "goblin",
            EntityKind::Boss => "boss",
            EntityKind::Cave => "cave",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum LifeState {
    #[default]
    Active,
    Dying,
    Removed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Health {
    current: u32,
    max: u32,
}

impl Health {
    pub fn full(max: u32) -> Self {
        Self { current: max, max }
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn is_depleted(&self) -> bool {
        self.current == 0
    }

    /// Returns the amount actually removed.
    pub fn apply_damage(&mut self, amount: u32) -> u32 {
        let before = self.current;
        self.current = self.current.saturating_sub(amount);
        before - self.current
    }
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub position: Vec2,
    pub facing_radians: f32,
    pub life: LifeState,
    pub health: Health,
    pub movement_speed: f32,
    pub attack_damage: u32,
    pub attacking: bool,
}

impl Entity {
    pub fn team(&self) -> Team {
        self.kind.team()
    }

    pub fn is_active(&self) -> bool {
        self.life == LifeState::Active
    }

    pub fn is_dying(&self) -> bool {
        self.life == LifeState::Dying
    }
}

#[derive(Debug, Default)]
pub struct EntityIdAllocator {
    next: u64,
}

impl EntityIdAllocator {
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

/// Live entity storage. Spawns and removals are staged and become visible on
/// `apply_pending`, so iteration order is always spawn order.
#[derive(Debug, Default)]
pub struct EntityTable {
    allocator: EntityIdAllocator,
    entities: Vec<Entity>,
    pending_spawns: Vec<Entity>,
    pending_despawns: Vec<EntityId>,
}

impl EntityTable {
    pub fn spawn(&mut self, kind: EntityKind, position: Vec2, stats: UnitStats) -> EntityId {
        let id = self.allocator.allocate();
        self.pending_spawns.push(Entity {
            id,
            kind,
            position,
            facing_radians: 0.0,
            life: LifeState::Active,
            health: Health::full(stats.max_health),
            movement_speed: stats.movement_speed,
            attack_damage: stats.attack_damage,
            attacking: false,
        });
        id
    }

    pub fn despawn(&mut self, id: EntityId) -> bool {
        let exists_now = self.entities.iter().any(|entity| entity.id == id);
        let pending_spawn = self.pending_spawns.iter().any(|entity| entity.id == id);
        if !exists_now && !pending_spawn {
            return false;
        }
        if let Some(entity) = self.find_mut(id) {
            entity.life = LifeState::Removed;
        }
        self.pending_despawns.push(id);
        true
    }

    pub fn apply_pending(&mut self) {
        if !self.pending_spawns.is_empty() {
            self.entities.append(&mut self.pending_spawns);
        }

        if !self.pending_despawns.is_empty() {
            self.pending_despawns.sort();
            self.pending_despawns.dedup();
            let pending = &self.pending_despawns;
            self.entities
                .retain(|entity| pending.binary_search(&entity.id).is_err());
            self.pending_despawns.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn find(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|entity| entity.id == id)
    }

    pub fn find_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|entity| entity.id == id)
    }

    pub fn find_active(&self, id: EntityId) -> Option<&Entity> {
        self.find(id).filter(|entity| entity.is_active())
    }

    pub fn is_active(&self, id: EntityId) -> bool {
        self.find_active(id).is_some()
    }

    /// Entities of an opposing team that have not been removed, dying ones included.
    pub fn opponents_of(&self, team: Team) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(move |entity| {
            entity.life != LifeState::Removed && team.is_opposed_to(entity.team())
        })
    }
}
