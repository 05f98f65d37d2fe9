use box2d_rs::b2_collision::*;
use box2d_rs::b2_contact::*;
use box2d_rs::b2_world_callbacks::*;

use std::collections::VecDeque;

use super::physics::{BodyTag, UserDataTypes};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactPhase {
    Begin,
    End,
}

/// A contact between two tagged bodies starting or ending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactEvent {
    pub phase: ContactPhase,
    pub a: BodyTag,
    pub b: BodyTag,
}

impl ContactEvent {
    pub fn begin(a: BodyTag, b: BodyTag) -> Self {
        Self {
            phase: ContactPhase::Begin,
            a,
            b,
        }
    }

    pub fn end(a: BodyTag, b: BodyTag) -> Self {
        Self {
            phase: ContactPhase::End,
            a,
            b,
        }
    }

    pub fn involves(&self, tag: BodyTag) -> bool {
        self.a == tag || self.b == tag
    }

    fn legs(&self) -> impl Iterator<Item = usize> {
        [self.a, self.b].into_iter().filter_map(|tag| match tag {
            BodyTag::Leg(i) => Some(i),
            _ => None,
        })
    }
}

/// Box2D contact listener that only records events.
///
/// The world calls back into this while it steps; the episode drains the
/// queue afterwards, so no episode state is touched mid-step.
#[derive(Debug, Default)]
pub struct ContactDetector {
    events: VecDeque<ContactEvent>,
}

impl ContactDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&mut self) -> VecDeque<ContactEvent> {
        std::mem::take(&mut self.events)
    }

    fn record(&mut self, phase: ContactPhase, contact: &mut dyn B2contactDynTrait<UserDataTypes>) {
        let fixture_a = contact.get_base().get_fixture_a();
        let fixture_b = contact.get_base().get_fixture_b();
        let body_a = fixture_a.borrow().get_body();
        let body_b = fixture_b.borrow().get_body();

        let body_a_tag = body_a.borrow().get_user_data().unwrap_or_default();
        let body_b_tag = body_b.borrow().get_user_data().unwrap_or_default();

        self.events.push_back(ContactEvent {
            phase,
            a: body_a_tag,
            b: body_b_tag,
        });
    }
}

impl B2contactListener<UserDataTypes> for ContactDetector {
    fn begin_contact(&mut self, contact: &mut dyn B2contactDynTrait<UserDataTypes>) {
        self.record(ContactPhase::Begin, contact);
    }

    fn end_contact(&mut self, contact: &mut dyn B2contactDynTrait<UserDataTypes>) {
        self.record(ContactPhase::End, contact);
    }

    fn pre_solve(
        &mut self,
        _contact: &mut dyn B2contactDynTrait<UserDataTypes>,
        _old_manifold: &B2manifold,
    ) {
    }

    fn post_solve(
        &mut self,
        _contact: &mut dyn B2contactDynTrait<UserDataTypes>,
        _impulse: &B2contactImpulse,
    ) {
    }
}

/// Collision-derived flags of the current episode.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ContactState {
    pub game_over: bool,
    pub legs_ground_contact: [bool; 2],
}

impl ContactState {
    pub fn apply(&mut self, event: &ContactEvent) {
        match event.phase {
            ContactPhase::Begin => {
                if event.involves(BodyTag::Lander) {
                    self.game_over = true;
                }
                for leg in event.legs() {
                    if let Some(flag) = self.legs_ground_contact.get_mut(leg) {
                        *flag = true;
                    }
                }
            }
            ContactPhase::End => {
                for leg in event.legs() {
                    if let Some(flag) = self.legs_ground_contact.get_mut(leg) {
                        *flag = false;
                    }
                }
            }
        }
    }

    pub fn any_leg_contact(&self) -> bool {
        self.legs_ground_contact.iter().any(|&c| c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_clear() {
        let state = ContactState::default();
        assert!(!state.game_over);
        assert_eq!(state.legs_ground_contact, [false, false]);
        assert!(!state.any_leg_contact());
    }

    #[test]
    fn leg_contact_begins_and_ends() {
        let mut state = ContactState::default();
        state.apply(&ContactEvent::begin(BodyTag::Ground, BodyTag::Leg(1)));
        assert_eq!(state.legs_ground_contact, [false, true]);
        assert!(!state.game_over);

        state.apply(&ContactEvent::begin(BodyTag::Leg(0), BodyTag::Ground));
        assert_eq!(state.legs_ground_contact, [true, true]);

        state.apply(&ContactEvent::end(BodyTag::Ground, BodyTag::Leg(1)));
        assert_eq!(state.legs_ground_contact, [true, false]);
        assert!(state.any_leg_contact());
    }

    #[test]
    fn lander_contact_is_game_over() {
        let mut state = ContactState::default();
        state.apply(&ContactEvent::begin(BodyTag::Lander, BodyTag::Ground));
        assert!(state.game_over);

        // ending the contact does not undo a crash
        state.apply(&ContactEvent::end(BodyTag::Lander, BodyTag::Ground));
        assert!(state.game_over);
    }

    #[test]
    fn detector_drains_in_order() {
        let mut detector = ContactDetector::new();
        detector.events.push_back(ContactEvent::begin(BodyTag::Leg(0), BodyTag::Ground));
        detector.events.push_back(ContactEvent::end(BodyTag::Leg(0), BodyTag::Ground));

        let drained: Vec<_> = detector.drain().into_iter().collect();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].phase, ContactPhase::Begin);
        assert_eq!(drained[1].phase, ContactPhase::End);
        assert!(detector.drain().is_empty());
    }
}
