//! Autonomous visitors wandering between artworks.
//!
//! A visitor cycles `Idle -> Moving -> Viewing -> Moving ...` on its own
//! countdown and can be pulled into `InChat` while it stands still in front
//! of an artwork. Motion itself runs on the transition engine; this module
//! only decides where to go and reacts to the engine's events.

pub mod timers;

pub use timers::{TimerHandle, TimerRegistry};

use crate::config::VisitorConfig;
use crate::scene::{
    nearest_angle, yaw_towards, PoiId, PoiRegistry, SceneNode, Transform, VisitorId, VisitorSpec,
};
use glam::{Mat4, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitorState {
    Idle,
    Moving { poi: PoiId },
    Viewing,
    InChat,
}

#[derive(Debug, Clone)]
pub struct Visitor {
    pub id: VisitorId,
    /// Spawn order, used to spread visitors around a shared artwork.
    pub index: usize,
    pub name: String,
    pub transform: Transform,
    /// Height of the feet when standing.
    pub base_y: f32,
    pub state: VisitorState,
    /// Artwork last reached. Kept while walking and while chatting.
    pub current_target: Option<PoiId>,
    pub model: SceneNode,
}

impl Visitor {
    pub fn is_moving(&self) -> bool {
        matches!(self.state, VisitorState::Moving { .. })
    }

    pub fn world_matrix(&self) -> Mat4 {
        self.transform.matrix()
    }

    /// Target artwork when the visitor may be drawn into a chat.
    pub fn chat_ready_target(&self) -> Option<PoiId> {
        match self.state {
            VisitorState::Idle | VisitorState::Viewing => self.current_target,
            VisitorState::Moving { .. } | VisitorState::InChat => None,
        }
    }
}

/// Walk the world should start on the transition engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WalkPlan {
    pub visitor: VisitorId,
    pub poi: PoiId,
    pub destination: Vec3,
    pub duration: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CountdownOutcome {
    /// Unknown visitor or a visitor that is not waiting to move.
    Stale,
    /// The chat session holds this visitor; closing it re-arms the countdown.
    Claimed,
    /// Nothing to walk to yet; the countdown was re-armed.
    NoTarget,
    Walk(WalkPlan),
}

pub struct VisitorController {
    visitors: BTreeMap<VisitorId, Visitor>,
    timers: TimerRegistry,
    rng: StdRng,
    settings: VisitorConfig,
}

impl VisitorController {
    pub fn new(settings: VisitorConfig, seed: u64) -> Self {
        Self {
            visitors: BTreeMap::new(),
            timers: TimerRegistry::new(),
            rng: StdRng::seed_from_u64(seed),
            settings,
        }
    }

    /// Places a loaded visitor in the gallery, idle with a countdown armed.
    pub fn spawn(&mut self, now: Duration, spec: &VisitorSpec, model: SceneNode) -> &Visitor {
        let [x, z] = match spec.spawn {
            Some(point) => point,
            None => {
                let half = self.settings.spawn_spread * 0.5;
                [
                    self.rng.gen_range(-half..=half),
                    self.rng.gen_range(-half..=half),
                ]
            }
        };
        let visitor = Visitor {
            id: spec.id,
            index: self.visitors.len(),
            name: spec.name.clone(),
            transform: Transform::new(Vec3::new(x, spec.floor_offset, z), 0.0),
            base_y: spec.floor_offset,
            state: VisitorState::Idle,
            current_target: None,
            model,
        };
        log::info!("Visitor {} ({}) joined at ({:.1}, {:.1})", spec.id, spec.name, x, z);
        if self.visitors.insert(spec.id, visitor).is_some() {
            log::warn!("Visitor {} spawned twice; replacing", spec.id);
        }
        self.arm_countdown(now, spec.id);
        &self.visitors[&spec.id]
    }

    pub fn get(&self, id: VisitorId) -> Option<&Visitor> {
        self.visitors.get(&id)
    }

    pub fn get_mut(&mut self, id: VisitorId) -> Option<&mut Visitor> {
        self.visitors.get_mut(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Visitor> {
        self.visitors.values()
    }

    pub fn len(&self) -> usize {
        self.visitors.len()
    }

    #[cfg(test)]
    pub fn timers(&self) -> &TimerRegistry {
        &self.timers
    }

    pub fn poll_countdowns(&mut self, now: Duration) -> Vec<TimerHandle> {
        self.timers.poll(now)
    }

    fn arm_countdown(&mut self, now: Duration, id: VisitorId) {
        let min = Duration::from_millis(self.settings.countdown_min_ms);
        let max = Duration::from_millis(self.settings.countdown_max_ms);
        self.timers.schedule(now, id, min, max, &mut self.rng);
    }

    /// Reacts to an expired countdown by choosing the next artwork.
    pub fn on_countdown(
        &mut self,
        now: Duration,
        handle: TimerHandle,
        chat_claimed: bool,
        pois: &PoiRegistry,
    ) -> CountdownOutcome {
        let Some(visitor) = self.visitors.get(&handle.visitor) else {
            return CountdownOutcome::Stale;
        };
        if chat_claimed || visitor.state == VisitorState::InChat {
            log::debug!("Visitor {} countdown ignored while chatting", visitor.id);
            return CountdownOutcome::Claimed;
        }
        if visitor.is_moving() {
            return CountdownOutcome::Stale;
        }
        if pois.is_empty() {
            log::warn!(
                "No artworks loaded yet; visitor {} stays put",
                handle.visitor
            );
            self.arm_countdown(now, handle.visitor);
            return CountdownOutcome::NoTarget;
        }

        let choice = self.rng.gen_range(0..pois.len());
        let Some(poi) = pois.nth(choice) else {
            self.arm_countdown(now, handle.visitor);
            return CountdownOutcome::NoTarget;
        };
        let index = visitor.index;
        let base_y = visitor.base_y;
        let destination = self.stand_point(&poi.transform, index, base_y);
        let poi_id = poi.id;

        if let Some(visitor) = self.visitors.get_mut(&handle.visitor) {
            visitor.state = VisitorState::Moving { poi: poi_id };
        }
        log::debug!("Visitor {} heading to artwork {}", handle.visitor, poi_id);
        CountdownOutcome::Walk(WalkPlan {
            visitor: handle.visitor,
            poi: poi_id,
            destination,
            duration: Duration::from_secs_f32(self.settings.walk_duration_secs),
        })
    }

    /// Spot in front of an artwork, fanned out sideways by spawn order.
    pub fn stand_point(&self, poi: &Transform, index: usize, base_y: f32) -> Vec3 {
        let angle = self.settings.lateral_step_radians * (index as f32 - 1.0);
        let lateral = Vec3::new(angle.sin(), 0.0, angle.cos()) * self.settings.lateral_radius;
        let point = poi.position + poi.facing() * self.settings.stand_distance + lateral;
        Vec3::new(point.x, base_y, point.z)
    }

    /// Vertical hop offset at global animation time `elapsed`.
    pub fn hop_offset(&self, elapsed: Duration) -> f32 {
        let phase = (elapsed.as_secs_f32() * self.settings.hop_rate).rem_euclid(1.0);
        let arc = 2.0 * phase - 1.0;
        self.settings.hop_height * (1.0 - arc.powi(4))
    }

    /// Per-frame walk hook: hop on top of the floor and keep facing the art.
    pub fn update_walk(&mut self, id: VisitorId, elapsed: Duration, poi_position: Vec3) {
        let hop = self.hop_offset(elapsed);
        if let Some(visitor) = self.visitors.get_mut(&id) {
            visitor.transform.position.y = visitor.base_y + hop;
            visitor.transform.yaw = yaw_towards(visitor.transform.position, poi_position);
        }
    }

    /// Walk completed: settle on the floor, remember the artwork, re-arm.
    pub fn finish_walk(&mut self, now: Duration, id: VisitorId, poi: PoiId) -> bool {
        let Some(visitor) = self.visitors.get_mut(&id) else {
            return false;
        };
        if visitor.state != (VisitorState::Moving { poi }) {
            return false;
        }
        visitor.transform.position.y = visitor.base_y;
        visitor.state = VisitorState::Viewing;
        visitor.current_target = Some(poi);
        log::debug!("Visitor {} is viewing artwork {}", id, poi);
        self.arm_countdown(now, id);
        true
    }

    /// Moves a standing visitor into the chat, cancelling its countdown.
    /// Returns the artwork it was looking at.
    pub fn enter_chat(&mut self, id: VisitorId) -> Option<PoiId> {
        let visitor = self.visitors.get_mut(&id)?;
        let Some(target) = visitor.chat_ready_target() else {
            log::debug!("Visitor {} cannot chat while {:?}", id, visitor.state);
            return None;
        };
        visitor.state = VisitorState::InChat;
        self.timers.cancel(id);
        Some(target)
    }

    /// Leaves the chat. Returns the yaw that faces the artwork again.
    pub fn end_chat(&mut self, id: VisitorId, pois: &PoiRegistry) -> Option<f32> {
        let visitor = self.visitors.get_mut(&id)?;
        if visitor.state != VisitorState::InChat {
            return None;
        }
        visitor.state = VisitorState::Viewing;
        let target = visitor.current_target.and_then(|poi| pois.get(poi))?;
        let yaw = yaw_towards(visitor.transform.position, target.transform.position);
        Some(nearest_angle(visitor.transform.yaw, yaw))
    }

    /// Turn-back after a chat finished. Arms a fresh countdown unless the
    /// visitor was claimed again in the meantime.
    pub fn on_settled(&mut self, now: Duration, id: VisitorId, chat_claimed: bool) -> bool {
        let ready = self.visitors.get(&id).is_some_and(|visitor| {
            visitor.state == VisitorState::Viewing && !self.timers.is_armed(id)
        });
        if !ready || chat_claimed {
            return false;
        }
        self.arm_countdown(now, id);
        true
    }

    #[cfg(test)]
    pub(crate) fn rearm_after(&mut self, now: Duration, id: VisitorId, delay: Duration) {
        self.timers.schedule_after(now, id, delay);
    }

    #[cfg(test)]
    pub fn in_chat_count(&self) -> usize {
        self.visitors
            .values()
            .filter(|visitor| visitor.state == VisitorState::InChat)
            .count()
    }
}
