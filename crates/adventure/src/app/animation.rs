use sim_core::{EntityId, SimEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CompletionKind {
    Attack,
    Death,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct PendingCompletion {
    pub(crate) entity: EntityId,
    pub(crate) kind: CompletionKind,
    pub(crate) due_at: f64,
}

/// Stands in for the sprite layer: every requested attack or death animation
/// "plays" for a fixed duration and is then reported back to the core.
#[derive(Debug)]
pub(crate) struct AnimationDriver {
    attack_seconds: f64,
    death_seconds: f64,
    pending: Vec<PendingCompletion>,
}

impl AnimationDriver {
    pub(crate) fn new(attack_seconds: f32, death_seconds: f32) -> Self {
        Self {
            attack_seconds: f64::from(attack_seconds.max(0.0)),
            death_seconds: f64::from(death_seconds.max(0.0)),
            pending: Vec::new(),
        }
    }

    pub(crate) fn observe(&mut self, events: &[SimEvent], now: f64) {
        for event in events {
            match *event {
                SimEvent::AttackRequested { attacker } => {
                    self.schedule(attacker, CompletionKind::Attack, now + self.attack_seconds);
                }
                SimEvent::EntityDied { entity_id } => {
                    // A dying entity never finishes its swing.
                    self.cancel(entity_id, CompletionKind::Attack);
                    self.schedule(entity_id, CompletionKind::Death, now + self.death_seconds);
                }
                SimEvent::EntityRemoved { entity_id } => {
                    self.pending.retain(|pending| pending.entity != entity_id);
                }
                _ => {}
            }
        }
    }

    /// Removes and returns every completion due at `now`, earliest first.
    pub(crate) fn take_due(&mut self, now: f64) -> Vec<PendingCompletion> {
        let (mut due, waiting): (Vec<_>, Vec<_>) = self
            .pending
            .iter()
            .copied()
            .partition(|pending| pending.due_at <= now);
        self.pending = waiting;
        due.sort_by(|left, right| {
            left.due_at
                .total_cmp(&right.due_at)
                .then(left.entity.cmp(&right.entity))
        });
        due
    }

    pub(crate) fn pending_count(&self) -> usize {
        self.pending.len()
    }

    fn schedule(&mut self, entity: EntityId, kind: CompletionKind, due_at: f64) {
        let already_playing = self
            .pending
            .iter()
            .any(|pending| pending.entity == entity && pending.kind == kind);
        if already_playing {
            return;
        }
        self.pending.push(PendingCompletion {
            entity,
            kind,
            due_at,
        });
    }

    fn cancel(&mut self, entity: EntityId, kind: CompletionKind) {
        self.pending
            .retain(|pending| !(pending.entity == entity && pending.kind == kind));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attack_completes_after_configured_duration() {
        let mut driver = AnimationDriver::new(0.5, 1.0);
        driver.observe(
            &[SimEvent::AttackRequested {
                attacker: EntityId(4),
            }],
            2.0,
        );

        assert!(driver.take_due(2.25).is_empty());
        let due = driver.take_due(2.5);
        assert_eq!(
            due,
            vec![PendingCompletion {
                entity: EntityId(4),
                kind: CompletionKind::Attack,
                due_at: 2.5,
            }]
        );
        assert_eq!(driver.pending_count(), 0);
    }

    #[test]
    fn death_replaces_pending_attack() {
        let mut driver = AnimationDriver::new(0.5, 1.0);
        driver.observe(
            &[
                SimEvent::AttackRequested {
                    attacker: EntityId(1),
                },
                SimEvent::EntityDied {
                    entity_id: EntityId(1),
                },
            ],
            0.0,
        );

        let due = driver.take_due(5.0);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].kind, CompletionKind::Death);
    }

    #[test]
    fn removal_drops_everything_for_entity() {
        let mut driver = AnimationDriver::new(0.5, 1.0);
        driver.observe(
            &[
                SimEvent::AttackRequested {
                    attacker: EntityId(1),
                },
                SimEvent::AttackRequested {
                    attacker: EntityId(2),
                },
                SimEvent::EntityRemoved {
                    entity_id: EntityId(1),
                },
            ],
            0.0,
        );

        let due = driver.take_due(1.0);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].entity, EntityId(2));
    }

    #[test]
    fn repeated_request_while_playing_is_ignored_and_due_order_is_stable() {
        let mut driver = AnimationDriver::new(0.5, 0.25);
        driver.observe(
            &[SimEvent::AttackRequested {
                attacker: EntityId(9),
            }],
            0.0,
        );
        driver.observe(
            &[
                SimEvent::AttackRequested {
                    attacker: EntityId(9),
                },
                SimEvent::EntityDied {
                    entity_id: EntityId(3),
                },
            ],
            0.1,
        );

        assert_eq!(driver.pending_count(), 2);
        let due = driver
            .take_due(1.0)
            .into_iter()
            .map(|pending| pending.entity)
            .collect::<Vec<_>>();
        assert_eq!(due, vec![EntityId(3), EntityId(9)]);
    }
}
