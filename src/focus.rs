use crate::scene::PoiId;

/// User's point-of-interest inspection state, independent of chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusState {
    #[default]
    Free,
    Focused(PoiId),
    OverlayOpen(PoiId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusAction {
    /// Start the camera move toward this artwork.
    Focus(PoiId),
    /// Second pick on the focused artwork.
    OpenOverlay(PoiId),
    Ignored,
}

#[derive(Debug, Default)]
pub struct FocusController {
    state: FocusState,
}

impl FocusController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> FocusState {
        self.state
    }

    pub fn focused(&self) -> Option<PoiId> {
        match self.state {
            FocusState::Focused(poi) => Some(poi),
            _ => None,
        }
    }

    #[cfg(test)]
    pub fn overlay_open(&self) -> bool {
        matches!(self.state, FocusState::OverlayOpen(_))
    }

    /// A pick resolved to `poi`.
    pub fn pick_poi(&mut self, poi: PoiId) -> FocusAction {
        match self.state {
            FocusState::OverlayOpen(_) => FocusAction::Ignored,
            FocusState::Focused(current) if current == poi => {
                self.state = FocusState::OverlayOpen(poi);
                FocusAction::OpenOverlay(poi)
            }
            FocusState::Free | FocusState::Focused(_) => {
                self.state = FocusState::Focused(poi);
                FocusAction::Focus(poi)
            }
        }
    }

    /// Overlay closed by the user. Always lands in free roam.
    pub fn close_overlay(&mut self) -> Option<PoiId> {
        let closed = match self.state {
            FocusState::OverlayOpen(poi) => Some(poi),
            _ => None,
        };
        self.state = FocusState::Free;
        closed
    }

    /// Drops focus without opening anything, e.g. on movement or chat.
    pub fn release(&mut self) -> Option<PoiId> {
        let previous = self.focused();
        if previous.is_some() {
            self.state = FocusState::Free;
        }
        previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_pick_focuses_second_opens() {
        let mut focus = FocusController::new();
        assert_eq!(focus.pick_poi(4), FocusAction::Focus(4));
        assert_eq!(focus.state(), FocusState::Focused(4));
        assert_eq!(focus.pick_poi(4), FocusAction::OpenOverlay(4));
        assert!(focus.overlay_open());
    }

    #[test]
    fn picking_another_artwork_refocuses() {
        let mut focus = FocusController::new();
        focus.pick_poi(1);
        assert_eq!(focus.pick_poi(2), FocusAction::Focus(2));
        assert_eq!(focus.focused(), Some(2));
    }

    #[test]
    fn overlay_suppresses_picks_until_closed() {
        let mut focus = FocusController::new();
        focus.pick_poi(5);
        focus.pick_poi(5);
        assert_eq!(focus.pick_poi(6), FocusAction::Ignored);
        assert_eq!(focus.close_overlay(), Some(5));
        assert_eq!(focus.state(), FocusState::Free);
        // Focus state is gone: one pick focuses again rather than reopening.
        assert_eq!(focus.pick_poi(5), FocusAction::Focus(5));
    }

    #[test]
    fn close_is_unconditional() {
        let mut focus = FocusController::new();
        focus.pick_poi(3);
        assert_eq!(focus.close_overlay(), None);
        assert_eq!(focus.state(), FocusState::Free);
    }

    #[test]
    fn release_keeps_overlay() {
        let mut focus = FocusController::new();
        focus.pick_poi(8);
        assert_eq!(focus.release(), Some(8));
        focus.pick_poi(8);
        focus.pick_poi(8);
        assert_eq!(focus.release(), None);
        assert!(focus.overlay_open());
    }
}
