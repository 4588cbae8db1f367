use super::entity::EntityId;
use super::players::PlayerIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimEvent {
    /// Play the attack animation; report back with
    /// `Simulation::notify_attack_animation_completed`.
    AttackRequested {
        attacker: EntityId,
    },
    AttackLanded {
        attacker: EntityId,
        target: EntityId,
    },
    EntityDamaged {
        entity_id: EntityId,
        amount: u32,
    },
    /// Play the death animation; report back with
    /// `Simulation::notify_death_animation_completed`.
    EntityDied {
        entity_id: EntityId,
    },
    EntityRemoved {
        entity_id: EntityId,
    },
    UnitGenerated {
        generator: EntityId,
        unit: EntityId,
    },
    HeroSpawned {
        player: PlayerIndex,
        hero: EntityId,
    },
    ScoreAwarded {
        player: PlayerIndex,
        amount: u32,
    },
    WorldRepositioned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimEventKind {
    AttackRequested,
    AttackLanded,
    EntityDamaged,
    EntityDied,
    EntityRemoved,
    UnitGenerated,
    HeroSpawned,
    ScoreAwarded,
    WorldRepositioned,
}

impl SimEvent {
    pub fn kind(self) -> SimEventKind {
        match self {
            Self::AttackRequested { .. } => SimEventKind::AttackRequested,
            Self::AttackLanded { .. } => SimEventKind::AttackLanded,
            Self::EntityDamaged { .. } => SimEventKind::EntityDamaged,
            Self::EntityDied { .. } => SimEventKind::EntityDied,
            Self::EntityRemoved { .. } => SimEventKind::EntityRemoved,
            Self::UnitGenerated { .. } => SimEventKind::UnitGenerated,
            Self::HeroSpawned { .. } => SimEventKind::HeroSpawned,
            Self::ScoreAwarded { .. } => SimEventKind::ScoreAwarded,
            Self::WorldRepositioned => SimEventKind::WorldRepositioned,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimEventCounts {
    pub total: u32,
    pub attack_requested: u32,
    pub attack_landed: u32,
    pub entity_damaged: u32,
    pub entity_died: u32,
    pub entity_removed: u32,
    pub unit_generated: u32,
    pub hero_spawned: u32,
    pub score_awarded: u32,
    pub world_repositioned: u32,
}

impl SimEventCounts {
    pub fn record(&mut self, kind: SimEventKind) {
        self.total = self.total.saturating_add(1);
        let slot = match kind {
            SimEventKind::AttackRequested => &mut self.attack_requested,
            SimEventKind::AttackLanded => &mut self.attack_landed,
            SimEventKind::EntityDamaged => &mut self.entity_damaged,
            SimEventKind::EntityDied => &mut self.entity_died,
            SimEventKind::EntityRemoved => &mut self.entity_removed,
            SimEventKind::UnitGenerated => &mut self.unit_generated,
            SimEventKind::HeroSpawned => &mut self.hero_spawned,
            SimEventKind::ScoreAwarded => &mut self.score_awarded,
            SimEventKind::WorldRepositioned => &mut self.world_repositioned,
        };
        *slot = slot.saturating_add(1);
    }

    pub fn accumulate(&mut self, other: SimEventCounts) {
        self.total = self.total.saturating_add(other.total);
        self.attack_requested = self.attack_requested.saturating_add(other.attack_requested);
        self.attack_landed = self.attack_landed.saturating_add(other.attack_landed);
        self.entity_damaged = self.entity_damaged.saturating_add(other.entity_damaged);
        self.entity_died = self.entity_died.saturating_add(other.entity_died);
        self.entity_removed = self.entity_removed.saturating_add(other.entity_removed);
        self.unit_generated = self.unit_generated.saturating_add(other.unit_generated);
        self.hero_spawned = self.hero_spawned.saturating_add(other.hero_spawned);
        self.score_awarded = self.score_awarded.saturating_add(other.score_awarded);
        self.world_repositioned = self
            .world_repositioned
            .saturating_add(other.world_repositioned);
    }
}

/// Outbound notifications. Events pile up across ticks and notification calls
/// until the host drains them.
#[derive(Debug, Default)]
pub struct SimEventBus {
    pending: Vec<SimEvent>,
    last_drain_counts: SimEventCounts,
}

impl SimEventBus {
    pub fn emit(&mut self, event: SimEvent) {
        self.pending.push(event);
    }

    pub fn iter_pending(&self) -> impl Iterator<Item = &SimEvent> {
        self.pending.iter()
    }

    pub fn drain(&mut self) -> Vec<SimEvent> {
        let mut counts = SimEventCounts::default();
        for event in &self.pending {
            counts.record(event.kind());
        }
        self.last_drain_counts = counts;
        std::mem::take(&mut self.pending)
    }

    pub fn last_drain_counts(&self) -> SimEventCounts {
        self.last_drain_counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_returns_events_in_emit_order_and_counts_them() {
        let mut bus = SimEventBus::default();
        bus.emit(SimEvent::AttackRequested {
            attacker: EntityId(1),
        });
        bus.emit(SimEvent::EntityDamaged {
            entity_id: EntityId(2),
            amount: 10,
        });
        bus.emit(SimEvent::AttackRequested {
            attacker: EntityId(3),
        });

        let drained = bus.drain();

        assert_eq!(drained.len(), 3);
        assert_eq!(drained[1].kind(), SimEventKind::EntityDamaged);
        assert_eq!(bus.iter_pending().count(), 0);
        let counts = bus.last_drain_counts();
        assert_eq!(counts.total, 3);
        assert_eq!(counts.attack_requested, 2);
        assert_eq!(counts.entity_damaged, 1);
    }

    #[test]
    fn accumulate_sums_every_kind() {
        let mut total = SimEventCounts::default();
        let mut batch = SimEventCounts::default();
        batch.record(SimEventKind::UnitGenerated);
        batch.record(SimEventKind::WorldRepositioned);

        total.accumulate(batch);
        total.accumulate(batch);

        assert_eq!(total.total, 4);
        assert_eq!(total.unit_generated, 2);
        assert_eq!(total.world_repositioned, 2);
    }
}
