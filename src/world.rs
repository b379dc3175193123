//! The gallery simulation driven by the render loop.
//!
//! `World` wires the camera, the visitors, the focus and chat state machines
//! together. Every input reaches it through a method call on the render
//! thread, and every timed effect comes back as a transition or countdown
//! event consumed in `update`. Nothing here blocks and nothing here touches
//! the window, so the whole interaction core runs headless in tests.

use crate::assets::AssetSource;
use crate::chat::{ChatCoordinator, ChatMessage, ChatRefusal, ChatReply, ChatTransport, ReplyOutcome, Role};
use crate::config::GalleryConfig;
use crate::focus::{FocusAction, FocusController, FocusState};
use crate::render::sketch::outline_node;
use crate::render::{
    pick, AnimTarget, Animatable, CameraController, CameraMovement, Easing, MoveDirection,
    Outline, OutlineKind, PickCandidate, PickTarget, Property, TransitionEngine, TransitionEvent,
    TransitionId,
};
use crate::scene::{
    nearest_angle, yaw_towards, ArtworkSpec, GalleryLayout, PoiId, PoiRegistry, PointOfInterest,
    Transform, VisitorId,
};
use crate::visitors::{CountdownOutcome, TimerHandle, VisitorController, WalkPlan};
use glam::Vec3;
use std::time::Duration;

/// What a finished or progressing transition means to the world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cue {
    VisitorWalk { visitor: VisitorId, poi: PoiId },
    CameraFocus { poi: PoiId },
    ChatApproach { visitor: VisitorId, look_at: Vec3 },
    VisitorTurn { visitor: VisitorId },
    VisitorSettle { visitor: VisitorId },
}

/// Exactly one of these holds at any time. Chat wins over focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionMode {
    FreeRoam,
    FocusedOnPoi(PoiId),
    OverlayOpen(PoiId),
    ChatOpen(VisitorId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickResult {
    /// Clicks are suppressed while an overlay or the chat is open.
    Ignored,
    Nothing,
    ChatStarted(VisitorId),
    /// Hit a visitor that cannot chat right now.
    ChatRejected(VisitorId),
    Focused(PoiId),
    OverlayOpened(PoiId),
}

/// Signals for the overlay layer.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    ChatOpened {
        visitor: VisitorId,
        name: String,
        history: Vec<ChatMessage>,
    },
    ChatMessage {
        visitor: VisitorId,
        role: Role,
        text: String,
    },
    ChatClosed {
        visitor: VisitorId,
    },
    PoiOverlayOpened {
        poi: PoiId,
        image_ref: String,
    },
    PoiOverlayClosed {
        poi: PoiId,
    },
}

/// Transition target view over the camera and the visitors.
struct Stage<'a> {
    camera: &'a mut CameraController,
    visitors: &'a mut VisitorController,
}

impl Animatable for Stage<'_> {
    fn read(&self, target: AnimTarget, property: Property) -> Option<f32> {
        let (position, yaw) = match target {
            AnimTarget::Camera => (self.camera.position, self.camera.yaw),
            AnimTarget::Visitor(id) => {
                let visitor = self.visitors.get(id)?;
                (visitor.transform.position, visitor.transform.yaw)
            }
        };
        Some(match property {
            Property::PositionX => position.x,
            Property::PositionY => position.y,
            Property::PositionZ => position.z,
            Property::Yaw => yaw,
        })
    }

    fn write(&mut self, target: AnimTarget, property: Property, value: f32) {
        let (position, yaw) = match target {
            AnimTarget::Camera => (&mut self.camera.position, &mut self.camera.yaw),
            AnimTarget::Visitor(id) => match self.visitors.get_mut(id) {
                Some(visitor) => (&mut visitor.transform.position, &mut visitor.transform.yaw),
                None => return,
            },
        };
        match property {
            Property::PositionX => position.x = value,
            Property::PositionY => position.y = value,
            Property::PositionZ => position.z = value,
            Property::Yaw => *yaw = value,
        }
    }
}

pub struct World<T: ChatTransport> {
    config: GalleryConfig,
    camera: CameraController,
    movement: CameraMovement,
    pois: PoiRegistry,
    visitors: VisitorController,
    transitions: TransitionEngine<Cue>,
    focus: FocusController,
    focus_transition: Option<TransitionId>,
    approach_transition: Option<TransitionId>,
    chat: ChatCoordinator,
    transport: T,
    events: Vec<UiEvent>,
    last_update: Option<Duration>,
}

impl<T: ChatTransport> World<T> {
    pub fn new(
        config: GalleryConfig,
        layout: &GalleryLayout,
        assets: &dyn AssetSource,
        transport: T,
        seed: u64,
        now: Duration,
    ) -> Self {
        let camera = CameraController::looking_at(
            Vec3::from_array(config.camera.position),
            Vec3::from_array(config.camera.look_at),
        );
        let mut world = Self {
            camera,
            movement: CameraMovement::default(),
            pois: PoiRegistry::new(),
            visitors: VisitorController::new(config.visitors.clone(), seed),
            transitions: TransitionEngine::new(),
            focus: FocusController::new(),
            focus_transition: None,
            approach_transition: None,
            chat: ChatCoordinator::new(config.chat.personalities.clone()),
            transport,
            events: Vec::new(),
            last_update: None,
            config,
        };

        for artwork in &layout.artworks {
            world.add_artwork(artwork, assets);
        }
        for spec in &layout.visitors {
            match assets.load_visitor(spec) {
                Ok(model) => {
                    log::debug!("Loaded {} ({} meshes)", model.name(), model.mesh_count());
                    world.visitors.spawn(now, spec, model);
                }
                Err(err) => log::warn!("Skipping visitor {}: {}", spec.id, err),
            }
        }
        log::info!(
            "Gallery ready: {} artworks, {} visitors",
            world.pois.len(),
            world.visitors.len()
        );
        world
    }

    /// Loads one artwork and makes it available as a walk and focus target.
    pub fn add_artwork(&mut self, spec: &ArtworkSpec, assets: &dyn AssetSource) -> bool {
        match assets.load_artwork(spec) {
            Ok(node) => {
                log::debug!("Loaded {} ({} meshes)", node.name(), node.mesh_count());
                self.pois.insert(PointOfInterest {
                    id: spec.id,
                    transform: Transform::new(Vec3::from_array(spec.position), spec.yaw),
                    image_ref: spec.image_url.clone(),
                    node,
                });
                true
            }
            Err(err) => {
                log::warn!("Skipping artwork {}: {}", spec.id, err);
                false
            }
        }
    }

    #[cfg(test)]
    pub fn camera(&self) -> &CameraController {
        &self.camera
    }

    #[cfg(test)]
    pub fn camera_mut(&mut self) -> &mut CameraController {
        &mut self.camera
    }

    #[cfg(test)]
    pub fn movement(&self) -> &CameraMovement {
        &self.movement
    }

    #[cfg(test)]
    pub fn pois(&self) -> &PoiRegistry {
        &self.pois
    }

    #[cfg(test)]
    pub fn visitors(&self) -> &VisitorController {
        &self.visitors
    }

    #[cfg(test)]
    pub fn chat(&self) -> &ChatCoordinator {
        &self.chat
    }

    #[cfg(test)]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn mode(&self) -> InteractionMode {
        if let Some(visitor) = self.chat.active_visitor() {
            return InteractionMode::ChatOpen(visitor);
        }
        match self.focus.state() {
            FocusState::Free => InteractionMode::FreeRoam,
            FocusState::Focused(poi) => InteractionMode::FocusedOnPoi(poi),
            FocusState::OverlayOpen(poi) => InteractionMode::OverlayOpen(poi),
        }
    }

    pub fn drain_ui_events(&mut self) -> Vec<UiEvent> {
        std::mem::take(&mut self.events)
    }

    /// Wireframe of every artwork and visitor as seen from the camera.
    pub fn scene_outlines(&self, aspect: f32) -> Vec<Outline> {
        let view_projection = self.camera.view_projection(aspect);
        let speaker = self.chat.active_visitor();
        let artworks = self.pois.iter().filter_map(|poi| {
            outline_node(
                view_projection,
                poi.transform.matrix(),
                &poi.node,
                OutlineKind::Artwork,
            )
        });
        let visitors = self.visitors.iter().filter_map(|visitor| {
            let kind = if speaker == Some(visitor.id) {
                OutlineKind::Speaker
            } else {
                OutlineKind::Visitor
            };
            outline_node(view_projection, visitor.world_matrix(), &visitor.model, kind)
        });
        artworks.chain(visitors).collect()
    }

    // ------------------------------------------------------------------
    // Frame
    // ------------------------------------------------------------------

    /// Advances transitions, fires due countdowns and applies held movement.
    pub fn update(&mut self, now: Duration) {
        let dt = self
            .last_update
            .map(|last| now.saturating_sub(last))
            .unwrap_or_default();
        self.last_update = Some(now);

        let events = {
            let mut stage = Stage {
                camera: &mut self.camera,
                visitors: &mut self.visitors,
            };
            self.transitions.tick(now, &mut stage)
        };
        for event in events {
            self.handle_transition(now, event);
        }

        for handle in self.visitors.poll_countdowns(now) {
            self.handle_countdown(now, handle);
        }

        if self.mode() == InteractionMode::FreeRoam && self.movement.any() {
            self.camera.update_movement(
                &self.movement,
                self.config.interaction.move_speed,
                dt.as_secs_f32(),
            );
        }
    }

    fn handle_transition(&mut self, now: Duration, event: TransitionEvent<Cue>) {
        match event {
            TransitionEvent::Updated { cue, .. } => match cue {
                Cue::VisitorWalk { visitor, poi } => {
                    if let Some(poi) = self.pois.get(poi) {
                        self.visitors
                            .update_walk(visitor, now, poi.transform.position);
                    }
                }
                Cue::CameraFocus { poi } => {
                    if let Some(poi) = self.pois.get(poi) {
                        self.camera.look_at(poi.transform.position);
                    }
                }
                Cue::ChatApproach { look_at, .. } => self.camera.look_at(look_at),
                Cue::VisitorTurn { .. } | Cue::VisitorSettle { .. } => {}
            },
            TransitionEvent::Completed { id, cue } => match cue {
                Cue::VisitorWalk { visitor, poi } => {
                    self.visitors.finish_walk(now, visitor, poi);
                }
                Cue::CameraFocus { .. } => {
                    if self.focus_transition == Some(id) {
                        self.focus_transition = None;
                    }
                }
                Cue::ChatApproach { visitor, .. } => {
                    if self.approach_transition == Some(id) {
                        self.approach_transition = None;
                    }
                    log::debug!("Camera reached visitor {}", visitor);
                }
                Cue::VisitorTurn { visitor } => {
                    log::debug!("Chat choreography step done for visitor {}", visitor);
                }
                Cue::VisitorSettle { visitor } => {
                    let claimed = self.chat.claims(visitor);
                    self.visitors.on_settled(now, visitor, claimed);
                }
            },
        }
    }

    fn handle_countdown(&mut self, now: Duration, handle: TimerHandle) {
        let claimed = self.chat.claims(handle.visitor);
        if let CountdownOutcome::Walk(plan) =
            self.visitors.on_countdown(now, handle, claimed, &self.pois)
        {
            self.start_walk(now, plan);
        }
    }

    fn start_walk(&mut self, now: Duration, plan: WalkPlan) {
        self.transitions.animate(
            now,
            AnimTarget::Visitor(plan.visitor),
            &[
                (Property::PositionX, plan.destination.x),
                (Property::PositionZ, plan.destination.z),
            ],
            plan.duration,
            Easing::Power1Out,
            Cue::VisitorWalk {
                visitor: plan.visitor,
                poi: plan.poi,
            },
        );
    }

    // ------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------

    /// Picks along the crosshair ray. Visitors are tested before artworks.
    pub fn click(&mut self, now: Duration) -> ClickResult {
        if matches!(
            self.mode(),
            InteractionMode::OverlayOpen(_) | InteractionMode::ChatOpen(_)
        ) {
            return ClickResult::Ignored;
        }

        let ray = self.camera.center_ray();
        let owner = {
            let visitors: Vec<PickCandidate<'_>> = self
                .visitors
                .iter()
                .map(|visitor| PickCandidate {
                    owner: PickTarget::Visitor(visitor.id),
                    world: visitor.world_matrix(),
                    root: &visitor.model,
                })
                .collect();
            let pois: Vec<PickCandidate<'_>> = self
                .pois
                .iter()
                .map(|poi| PickCandidate {
                    owner: PickTarget::Poi(poi.id),
                    world: poi.transform.matrix(),
                    root: &poi.node,
                })
                .collect();
            pick(
                &ray,
                &[visitors.as_slice(), pois.as_slice()],
                self.config.interaction.max_pick_distance,
            )
            .into_iter()
            .next()
            .map(|hit| {
                log::debug!(
                    "Picked {} at {:.2} ({:.2}, {:.2}, {:.2})",
                    hit.mesh,
                    hit.distance,
                    hit.point.x,
                    hit.point.y,
                    hit.point.z
                );
                hit.owner
            })
        };

        match owner {
            None => ClickResult::Nothing,
            Some(PickTarget::Visitor(visitor)) => self.try_start_chat(now, visitor),
            Some(PickTarget::Poi(poi)) => self.pick_poi(now, poi),
        }
    }

    fn pick_poi(&mut self, now: Duration, poi: PoiId) -> ClickResult {
        match self.focus.pick_poi(poi) {
            FocusAction::Focus(poi) => {
                self.start_focus(now, poi);
                ClickResult::Focused(poi)
            }
            FocusAction::OpenOverlay(poi) => {
                self.movement.clear();
                let image_ref = self
                    .pois
                    .get(poi)
                    .map(|poi| poi.image_ref.clone())
                    .unwrap_or_default();
                self.events.push(UiEvent::PoiOverlayOpened { poi, image_ref });
                log::info!("Opened artwork {}", poi);
                ClickResult::OverlayOpened(poi)
            }
            FocusAction::Ignored => ClickResult::Ignored,
        }
    }

    fn start_focus(&mut self, now: Duration, poi: PoiId) {
        let Some(target) = self.pois.get(poi) else {
            return;
        };
        let position = target.transform.position;
        let destination =
            position + target.transform.facing() * self.config.interaction.focus_distance;
        if let Some(previous) = self.focus_transition.take() {
            self.transitions.cancel(previous);
        }
        self.focus_transition = Some(self.transitions.animate(
            now,
            AnimTarget::Camera,
            &[
                (Property::PositionX, destination.x),
                (Property::PositionZ, destination.z),
            ],
            Duration::from_secs_f32(self.config.interaction.focus_duration_secs),
            Easing::Power2InOut,
            Cue::CameraFocus { poi },
        ));
        self.camera.look_at(position);
    }

    /// Leaves artwork focus without opening anything.
    pub fn unfocus(&mut self) -> bool {
        let focused = self.focus.focused().is_some();
        self.release_focus();
        focused
    }

    fn release_focus(&mut self) {
        if let Some(transition) = self.focus_transition.take() {
            self.transitions.cancel(transition);
        }
        self.focus.release();
    }

    fn try_start_chat(&mut self, now: Duration, visitor_id: VisitorId) -> ClickResult {
        let Some(visitor) = self.visitors.get(visitor_id) else {
            return ClickResult::Nothing;
        };
        let Some(target) = visitor.chat_ready_target() else {
            log::debug!(
                "Visitor {} cannot chat while {:?}",
                visitor_id,
                visitor.state
            );
            return ClickResult::ChatRejected(visitor_id);
        };
        let name = visitor.name.clone();
        let Some(image_ref) = self.pois.get(target).map(|poi| poi.image_ref.clone()) else {
            return ClickResult::ChatRejected(visitor_id);
        };

        let outgoing = match self.chat.open(visitor_id, &image_ref) {
            Ok(outgoing) => outgoing,
            Err(refusal) => {
                log::debug!("Chat with visitor {} refused: {}", visitor_id, refusal);
                return ClickResult::ChatRejected(visitor_id);
            }
        };
        self.visitors.enter_chat(visitor_id);
        self.release_focus();
        self.movement.clear();
        self.start_chat_choreography(now, visitor_id);
        self.transport.submit(outgoing);
        self.events.push(UiEvent::ChatOpened {
            visitor: visitor_id,
            name,
            history: self.chat.history(visitor_id).to_vec(),
        });
        ClickResult::ChatStarted(visitor_id)
    }

    /// Camera walks up to the visitor keeping its height and frames it
    /// slightly left of centre; the visitor turns to meet it.
    fn start_chat_choreography(&mut self, now: Duration, visitor_id: VisitorId) {
        let Some(visitor) = self.visitors.get(visitor_id) else {
            return;
        };
        let settings = &self.config.chat;
        let position = visitor.transform.position;
        let mut destination = position - visitor.transform.facing() * settings.camera_distance;
        destination.y = self.camera.position.y;

        let gaze = Vec3::new(position.x - destination.x, 0.0, position.z - destination.z)
            .normalize_or_zero();
        let right = Vec3::new(-gaze.z, 0.0, gaze.x);
        let look_at = Vec3::new(position.x, destination.y, position.z) + right * settings.pan_offset;
        let turn = nearest_angle(visitor.transform.yaw, yaw_towards(position, destination));

        self.approach_transition = Some(self.transitions.animate(
            now,
            AnimTarget::Camera,
            &[
                (Property::PositionX, destination.x),
                (Property::PositionZ, destination.z),
            ],
            Duration::from_secs_f32(settings.approach_duration_secs),
            Easing::Power2InOut,
            Cue::ChatApproach {
                visitor: visitor_id,
                look_at,
            },
        ));
        self.transitions.animate(
            now,
            AnimTarget::Visitor(visitor_id),
            &[(Property::Yaw, turn)],
            Duration::from_secs_f32(settings.turn_duration_secs),
            Easing::Power2InOut,
            Cue::VisitorTurn {
                visitor: visitor_id,
            },
        );
    }

    /// Held-key change. Presses only count in free roam; a press while
    /// focused on an artwork drops the focus first.
    pub fn set_movement(&mut self, direction: MoveDirection, pressed: bool) {
        if !pressed {
            self.movement.set(direction, false);
            return;
        }
        match self.mode() {
            InteractionMode::FreeRoam => self.movement.set(direction, true),
            InteractionMode::FocusedOnPoi(_) => {
                self.release_focus();
                self.movement.set(direction, true);
            }
            InteractionMode::OverlayOpen(_) | InteractionMode::ChatOpen(_) => {}
        }
    }

    /// Mouse-look by a pointer delta in pixels.
    pub fn look(&mut self, dx: f32, dy: f32) {
        if matches!(
            self.mode(),
            InteractionMode::FreeRoam | InteractionMode::FocusedOnPoi(_)
        ) {
            let sensitivity = self.config.interaction.look_sensitivity;
            self.camera.nudge(dx * sensitivity, -dy * sensitivity);
        }
    }

    // ------------------------------------------------------------------
    // Overlays and chat
    // ------------------------------------------------------------------

    pub fn submit_chat(&mut self, text: &str) -> Result<(), ChatRefusal> {
        let outgoing = self.chat.send_user_message(text)?;
        let visitor = outgoing.ticket.visitor;
        if let Some(line) = self.chat.history(visitor).last() {
            self.events.push(UiEvent::ChatMessage {
                visitor,
                role: Role::User,
                text: line.content.clone(),
            });
        }
        self.transport.submit(outgoing);
        Ok(())
    }

    /// Chat overlay closed. The visitor turns back to its artwork and
    /// re-arms its countdown once the turn completes.
    pub fn close_chat(&mut self, now: Duration) -> bool {
        let Some(visitor) = self.chat.close() else {
            return false;
        };
        if let Some(transition) = self.approach_transition.take() {
            self.transitions.cancel(transition);
        }
        self.events.push(UiEvent::ChatClosed { visitor });
        match self.visitors.end_chat(visitor, &self.pois) {
            Some(yaw) => {
                self.transitions.animate(
                    now,
                    AnimTarget::Visitor(visitor),
                    &[(Property::Yaw, yaw)],
                    Duration::from_secs_f32(self.config.chat.settle_duration_secs),
                    Easing::Power2InOut,
                    Cue::VisitorSettle { visitor },
                );
            }
            None => {
                self.visitors.on_settled(now, visitor, false);
            }
        }
        true
    }

    pub fn close_poi_overlay(&mut self) -> bool {
        let closed = self.focus.close_overlay();
        if let Some(transition) = self.focus_transition.take() {
            self.transitions.cancel(transition);
        }
        match closed {
            Some(poi) => {
                self.events.push(UiEvent::PoiOverlayClosed { poi });
                true
            }
            None => false,
        }
    }

    /// Applies a resolved chat request, or drops it if its session is gone.
    pub fn deliver_reply(&mut self, reply: ChatReply) -> ReplyOutcome {
        let outcome = self.chat.apply_reply(reply);
        if let ReplyOutcome::Applied { visitor, text } = &outcome {
            self.events.push(UiEvent::ChatMessage {
                visitor: *visitor,
                role: Role::Assistant,
                text: text.clone(),
            });
        }
        outcome
    }
}
