//! Time-based interpolation of camera and visitor transform properties.
//!
//! Transitions are advanced by the render loop. Instead of callbacks, every
//! tick returns `TransitionEvent`s carrying the caller-supplied cue, so the
//! owning state machine decides what an update or a completion means.
//!
//! Start values are captured on the first tick after `animate`, which lets a
//! newer transition pick up exactly where a superseded one left off.

use crate::scene::VisitorId;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnimTarget {
    Camera,
    Visitor(VisitorId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    PositionX,
    PositionY,
    PositionZ,
    Yaw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Easing {
    #[default]
    Linear,
    Power1Out,
    Power2InOut,
}

impl Easing {
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::Power1Out => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::Power2InOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    let u = -2.0 * t + 2.0;
                    1.0 - u * u * u / 2.0
                }
            }
        }
    }
}

/// Read/write access to the numeric properties transitions drive.
pub trait Animatable {
    fn read(&self, target: AnimTarget, property: Property) -> Option<f32>;
    fn write(&mut self, target: AnimTarget, property: Property, value: f32);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransitionId(u64);

#[derive(Debug, Clone, PartialEq)]
pub enum TransitionEvent<C> {
    Updated {
        id: TransitionId,
        cue: C,
        progress: f32,
    },
    Completed {
        id: TransitionId,
        cue: C,
    },
}

#[derive(Debug, Clone)]
struct Channel {
    property: Property,
    from: Option<f32>,
    to: f32,
}

#[derive(Debug, Clone)]
struct Transition<C> {
    id: TransitionId,
    target: AnimTarget,
    channels: Vec<Channel>,
    drives_properties: bool,
    start: Duration,
    duration: Duration,
    easing: Easing,
    cue: C,
}

pub struct TransitionEngine<C> {
    next_id: u64,
    active: Vec<Transition<C>>,
}

impl<C: Clone> Default for TransitionEngine<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clone> TransitionEngine<C> {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            active: Vec::new(),
        }
    }

    /// Starts interpolating `properties` of `target` toward the given values.
    ///
    /// Any in-flight transition on the same target loses the properties named
    /// here; one left with nothing to drive is dropped without completing.
    pub fn animate(
        &mut self,
        now: Duration,
        target: AnimTarget,
        properties: &[(Property, f32)],
        duration: Duration,
        easing: Easing,
        cue: C,
    ) -> TransitionId {
        let id = TransitionId(self.next_id);
        self.next_id += 1;

        for existing in self.active.iter_mut().filter(|t| t.target == target) {
            existing
                .channels
                .retain(|channel| !properties.iter().any(|(p, _)| *p == channel.property));
        }
        self.active
            .retain(|t| !t.drives_properties || !t.channels.is_empty());

        self.active.push(Transition {
            id,
            target,
            channels: properties
                .iter()
                .map(|&(property, to)| Channel {
                    property,
                    from: None,
                    to,
                })
                .collect(),
            drives_properties: !properties.is_empty(),
            start: now,
            duration,
            easing,
            cue,
        });
        id
    }

    pub fn cancel(&mut self, id: TransitionId) -> bool {
        let before = self.active.len();
        self.active.retain(|t| t.id != id);
        self.active.len() != before
    }

    #[cfg(test)]
    pub fn is_active(&self, id: TransitionId) -> bool {
        self.active.iter().any(|t| t.id == id)
    }

    #[cfg(test)]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Advances every transition to `now`, writing interpolated values into
    /// `state`. Each live transition yields one `Updated` event; those that
    /// reach full progress also yield `Completed` and are retired.
    pub fn tick<A: Animatable>(&mut self, now: Duration, state: &mut A) -> Vec<TransitionEvent<C>> {
        let mut events = Vec::new();
        let mut finished = Vec::new();

        for transition in &mut self.active {
            let progress = if transition.duration.is_zero() {
                1.0
            } else {
                let elapsed = now.saturating_sub(transition.start);
                (elapsed.as_secs_f32() / transition.duration.as_secs_f32()).min(1.0)
            };
            let eased = transition.easing.apply(progress);

            for channel in &mut transition.channels {
                let from = match channel.from {
                    Some(from) => from,
                    None => {
                        let Some(current) = state.read(transition.target, channel.property) else {
                            continue;
                        };
                        channel.from = Some(current);
                        current
                    }
                };
                let value = if progress >= 1.0 {
                    channel.to
                } else {
                    from + (channel.to - from) * eased
                };
                state.write(transition.target, channel.property, value);
            }

            events.push(TransitionEvent::Updated {
                id: transition.id,
                cue: transition.cue.clone(),
                progress,
            });
            if progress >= 1.0 {
                events.push(TransitionEvent::Completed {
                    id: transition.id,
                    cue: transition.cue.clone(),
                });
                finished.push(transition.id);
            }
        }

        if !finished.is_empty() {
            self.active.retain(|t| !finished.contains(&t.id));
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Values(HashMap<(AnimTarget, Property), f32>);

    impl Animatable for Values {
        fn read(&self, target: AnimTarget, property: Property) -> Option<f32> {
            Some(*self.0.get(&(target, property)).unwrap_or(&0.0))
        }

        fn write(&mut self, target: AnimTarget, property: Property, value: f32) {
            self.0.insert((target, property), value);
        }
    }

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn completions(events: &[TransitionEvent<&'static str>]) -> Vec<&'static str> {
        events
            .iter()
            .filter_map(|event| match event {
                TransitionEvent::Completed { cue, .. } => Some(*cue),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn interpolates_and_completes_once_on_final_frame() {
        let mut engine = TransitionEngine::new();
        let mut values = Values::default();
        engine.animate(
            ms(0),
            AnimTarget::Camera,
            &[(Property::PositionX, 10.0)],
            ms(1000),
            Easing::Linear,
            "slide",
        );

        let events = engine.tick(ms(0), &mut values);
        assert!(completions(&events).is_empty());

        engine.tick(ms(500), &mut values);
        let x = values.0[&(AnimTarget::Camera, Property::PositionX)];
        assert!((x - 5.0).abs() < 1e-4);

        let events = engine.tick(ms(1000), &mut values);
        assert_eq!(completions(&events), vec!["slide"]);
        assert!(matches!(events[0], TransitionEvent::Updated { progress, .. } if progress == 1.0));
        assert_eq!(values.0[&(AnimTarget::Camera, Property::PositionX)], 10.0);

        let events = engine.tick(ms(1500), &mut values);
        assert!(events.is_empty());
        assert_eq!(engine.active_count(), 0);
    }

    #[test]
    fn same_property_supersedes_silently() {
        let mut engine = TransitionEngine::new();
        let mut values = Values::default();
        let first = engine.animate(
            ms(0),
            AnimTarget::Visitor(1),
            &[(Property::Yaw, 1.0)],
            ms(1000),
            Easing::Linear,
            "first",
        );
        engine.tick(ms(100), &mut values);
        let second = engine.animate(
            ms(100),
            AnimTarget::Visitor(1),
            &[(Property::Yaw, -1.0)],
            ms(200),
            Easing::Linear,
            "second",
        );

        assert!(!engine.is_active(first));
        assert!(engine.is_active(second));
        let events = engine.tick(ms(2000), &mut values);
        assert_eq!(completions(&events), vec!["second"]);
        assert_eq!(values.0[&(AnimTarget::Visitor(1), Property::Yaw)], -1.0);
    }

    #[test]
    fn disjoint_properties_run_independently() {
        let mut engine = TransitionEngine::new();
        let mut values = Values::default();
        engine.animate(
            ms(0),
            AnimTarget::Visitor(2),
            &[(Property::PositionX, 4.0), (Property::PositionZ, 4.0)],
            ms(1000),
            Easing::Linear,
            "walk",
        );
        engine.animate(
            ms(0),
            AnimTarget::Visitor(2),
            &[(Property::Yaw, 2.0)],
            ms(500),
            Easing::Linear,
            "turn",
        );

        let events = engine.tick(ms(500), &mut values);
        assert_eq!(completions(&events), vec!["turn"]);
        let events = engine.tick(ms(1000), &mut values);
        assert_eq!(completions(&events), vec!["walk"]);
    }

    #[test]
    fn partially_superseded_transition_keeps_remaining_channels() {
        let mut engine = TransitionEngine::new();
        let mut values = Values::default();
        let walk = engine.animate(
            ms(0),
            AnimTarget::Camera,
            &[(Property::PositionX, 4.0), (Property::PositionZ, 8.0)],
            ms(1000),
            Easing::Linear,
            "walk",
        );
        engine.animate(
            ms(0),
            AnimTarget::Camera,
            &[(Property::PositionX, -4.0)],
            ms(1000),
            Easing::Linear,
            "nudge",
        );
        assert!(engine.is_active(walk));

        engine.tick(ms(1000), &mut values);
        assert_eq!(values.0[&(AnimTarget::Camera, Property::PositionX)], -4.0);
        assert_eq!(values.0[&(AnimTarget::Camera, Property::PositionZ)], 8.0);
    }

    #[test]
    fn property_free_transition_is_a_timed_hook() {
        let mut engine = TransitionEngine::new();
        let mut values = Values::default();
        engine.animate(ms(0), AnimTarget::Camera, &[], ms(300), Easing::Power2InOut, "pan");
        engine.animate(
            ms(0),
            AnimTarget::Camera,
            &[(Property::PositionY, 1.0)],
            ms(300),
            Easing::Linear,
            "lift",
        );
        let events = engine.tick(ms(300), &mut values);
        assert_eq!(completions(&events), vec!["pan", "lift"]);
    }

    #[test]
    fn easing_endpoints_are_fixed() {
        for easing in [Easing::Linear, Easing::Power1Out, Easing::Power2InOut] {
            assert_eq!(easing.apply(0.0), 0.0);
            assert!((easing.apply(1.0) - 1.0).abs() < 1e-6);
        }
        assert!((Easing::Power2InOut.apply(0.5) - 0.5).abs() < 1e-6);
        assert!(Easing::Power1Out.apply(0.25) > 0.25);
    }
}
