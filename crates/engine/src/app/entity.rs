use thiserror::Error;
use tracing::debug;

use super::world::Vec2;

/// Opaque handle to a stored entity. Ids are never reused within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Player,
    Enemy,
    Item,
}

/// Sprite selection for the render step. `walk_frames` counts consecutive
/// atlas codes starting at `base_code`; 1 means a static sprite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityVisual {
    pub base_code: u16,
    pub walk_frames: u8,
}

impl EntityVisual {
    pub fn still(base_code: u16) -> Self {
        Self {
            base_code,
            walk_frames: 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    /// Top-left corner of the bounding box, world pixels.
    pub position: Vec2,
    /// Pixels per second.
    pub velocity: Vec2,
    pub size: Vec2,
    /// Set by the physics step on downward solid contact; cleared otherwise.
    pub grounded: bool,
    pub facing_right: bool,
    /// Solid entities are separated from each other by the physics step.
    pub solid: bool,
    pub visual: EntityVisual,
    /// Advances while the entity moves horizontally; drives walk animation.
    pub anim_tick: u32,
    alive: bool,
    spawn_order: u64,
}

impl Entity {
    pub fn alive(&self) -> bool {
        self.alive
    }

    /// Monotonic creation counter, used as the draw-order tie-break.
    pub fn spawn_order(&self) -> u64 {
        self.spawn_order
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(
            self.position.x + self.size.x * 0.5,
            self.position.y + self.size.y * 0.5,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntityStoreError {
    #[error("entity cap of {cap} reached; spawn dropped")]
    CapacityExceeded { cap: usize },
    #[error("entity {} not found or already destroyed", id.0)]
    NotFound { id: EntityId },
    #[error("a player entity already exists in this session")]
    DuplicatePlayer,
}

/// Spawn request passed to [`EntityStore::create`].
#[derive(Debug, Clone, Copy)]
pub struct EntitySpawn {
    pub kind: EntityKind,
    pub position: Vec2,
    pub velocity: Vec2,
    pub size: Vec2,
    pub solid: bool,
    pub visual: EntityVisual,
}

/// Owns every live entity. Structural changes requested mid-step are staged
/// and only take effect at [`EntityStore::apply_pending`], so iteration order
/// and indices stay stable for the whole frame.
#[derive(Debug)]
pub struct EntityStore {
    cap: usize,
    next_id: u64,
    next_spawn_order: u64,
    entities: Vec<Entity>,
    pending_spawns: Vec<Entity>,
    pending_despawns: Vec<EntityId>,
}

impl EntityStore {
    pub fn with_cap(cap: usize) -> Self {
        Self {
            cap,
            next_id: 1,
            next_spawn_order: 0,
            entities: Vec::new(),
            pending_spawns: Vec::new(),
            pending_despawns: Vec::new(),
        }
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Live entities plus staged spawns, minus staged despawns. This is the
    /// count the cap is applied against.
    pub fn effective_count(&self) -> usize {
        self.entities
            .iter()
            .filter(|entity| entity.alive)
            .count()
            .saturating_add(self.pending_spawns.len())
    }

    pub fn create(&mut self, spawn: EntitySpawn) -> Result<EntityId, EntityStoreError> {
        if self.effective_count() >= self.cap {
            return Err(EntityStoreError::CapacityExceeded { cap: self.cap });
        }
        if spawn.kind == EntityKind::Player && self.has_player() {
            return Err(EntityStoreError::DuplicatePlayer);
        }

        let id = EntityId(self.next_id);
        self.next_id += 1;
        let spawn_order = self.next_spawn_order;
        self.next_spawn_order += 1;

        self.pending_spawns.push(Entity {
            id,
            kind: spawn.kind,
            position: spawn.position,
            velocity: spawn.velocity,
            size: spawn.size,
            grounded: false,
            facing_right: true,
            solid: spawn.solid,
            visual: spawn.visual,
            anim_tick: 0,
            alive: true,
            spawn_order,
        });
        Ok(id)
    }

    pub fn get(&self, id: EntityId) -> Result<&Entity, EntityStoreError> {
        self.entities
            .iter()
            .find(|entity| entity.id == id && entity.alive)
            .ok_or(EntityStoreError::NotFound { id })
    }

    pub fn get_mut(&mut self, id: EntityId) -> Result<&mut Entity, EntityStoreError> {
        self.entities
            .iter_mut()
            .find(|entity| entity.id == id && entity.alive)
            .ok_or(EntityStoreError::NotFound { id })
    }

    /// Stages the entity for removal at the end of the frame. Destroying an
    /// unknown or already-destroyed id is a no-op.
    pub fn destroy(&mut self, id: EntityId) {
        let mut found = false;
        if let Some(entity) = self.entities.iter_mut().find(|entity| entity.id == id) {
            entity.alive = false;
            found = true;
        }
        if let Some(index) = self.pending_spawns.iter().position(|entity| entity.id == id) {
            self.pending_spawns.remove(index);
            found = true;
        }
        if found && !self.pending_despawns.contains(&id) {
            self.pending_despawns.push(id);
        }
    }

    pub fn live_count(&self) -> usize {
        self.entities.iter().filter(|entity| entity.alive).count()
    }

    /// Live entities in spawn order. Staged spawns are not visible here
    /// until [`EntityStore::apply_pending`] runs.
    pub fn iter_live(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(|entity| entity.alive)
    }

    pub(crate) fn slots(&self) -> &[Entity] {
        &self.entities
    }

    pub(crate) fn slots_mut(&mut self) -> &mut [Entity] {
        &mut self.entities
    }

    pub fn player_id(&self) -> Option<EntityId> {
        self.iter_live()
            .find(|entity| entity.kind == EntityKind::Player)
            .map(|entity| entity.id)
    }

    fn has_player(&self) -> bool {
        self.player_id().is_some()
            || self
                .pending_spawns
                .iter()
                .any(|entity| entity.kind == EntityKind::Player)
    }

    /// Commits staged spawns and despawns. Called once per frame, after the
    /// scene update, never during iteration.
    pub fn apply_pending(&mut self) {
        if !self.pending_despawns.is_empty() {
            let despawns = std::mem::take(&mut self.pending_despawns);
            self.entities
                .retain(|entity| entity.alive && !despawns.contains(&entity.id));
            debug!(count = despawns.len(), "entities_despawned");
        }
        self.entities.append(&mut self.pending_spawns);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn(kind: EntityKind) -> EntitySpawn {
        EntitySpawn {
            kind,
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            size: Vec2::new(8.0, 8.0),
            solid: false,
            visual: EntityVisual::still(1),
        }
    }

    #[test]
    fn create_is_deferred_until_apply_pending() {
        let mut store = EntityStore::with_cap(8);
        let id = store.create(spawn(EntityKind::Item)).expect("create");
        assert_eq!(store.live_count(), 0);
        assert!(store.get(id).is_err());

        store.apply_pending();
        assert_eq!(store.live_count(), 1);
        assert_eq!(store.get(id).expect("get").id, id);
    }

    #[test]
    fn cap_counts_live_and_staged_entities() {
        let mut store = EntityStore::with_cap(2);
        store.create(spawn(EntityKind::Item)).expect("first");
        store.apply_pending();
        store.create(spawn(EntityKind::Item)).expect("second");

        let result = store.create(spawn(EntityKind::Item));
        assert_eq!(result, Err(EntityStoreError::CapacityExceeded { cap: 2 }));
    }

    #[test]
    fn destroy_frees_a_cap_slot_immediately() {
        let mut store = EntityStore::with_cap(1);
        let id = store.create(spawn(EntityKind::Item)).expect("create");
        store.apply_pending();

        assert!(store.create(spawn(EntityKind::Item)).is_err());
        store.destroy(id);
        assert!(store.create(spawn(EntityKind::Item)).is_ok());
    }

    #[test]
    fn destroy_is_idempotent_and_get_fails_after() {
        let mut store = EntityStore::with_cap(4);
        let id = store.create(spawn(EntityKind::Enemy)).expect("create");
        store.apply_pending();

        store.destroy(id);
        store.destroy(id);
        assert!(matches!(
            store.get(id),
            Err(EntityStoreError::NotFound { id: missing }) if missing == id
        ));

        store.apply_pending();
        assert_eq!(store.live_count(), 0);
        store.destroy(id);
    }

    #[test]
    fn only_one_player_may_exist() {
        let mut store = EntityStore::with_cap(8);
        store.create(spawn(EntityKind::Player)).expect("player");
        assert_eq!(
            store.create(spawn(EntityKind::Player)).map(|_| ()),
            Err(EntityStoreError::DuplicatePlayer)
        );

        store.apply_pending();
        assert_eq!(
            store.create(spawn(EntityKind::Player)).map(|_| ()),
            Err(EntityStoreError::DuplicatePlayer)
        );
    }

    #[test]
    fn ids_are_never_reused() {
        let mut store = EntityStore::with_cap(8);
        let first = store.create(spawn(EntityKind::Item)).expect("first");
        store.apply_pending();
        store.destroy(first);
        store.apply_pending();

        let second = store.create(spawn(EntityKind::Item)).expect("second");
        assert_ne!(first, second);
    }

    #[test]
    fn iteration_order_matches_spawn_order() {
        let mut store = EntityStore::with_cap(8);
        let a = store.create(spawn(EntityKind::Item)).expect("a");
        let b = store.create(spawn(EntityKind::Enemy)).expect("b");
        store.apply_pending();
        let c = store.create(spawn(EntityKind::Item)).expect("c");
        store.apply_pending();

        let ids: Vec<EntityId> = store.iter_live().map(|entity| entity.id).collect();
        assert_eq!(ids, vec![a, b, c]);

        let orders: Vec<u64> = store.iter_live().map(Entity::spawn_order).collect();
        assert!(orders.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn destroying_a_staged_spawn_cancels_it() {
        let mut store = EntityStore::with_cap(8);
        let id = store.create(spawn(EntityKind::Item)).expect("create");
        store.destroy(id);
        store.apply_pending();
        assert_eq!(store.live_count(), 0);
    }
}
