//! egui on the gallery window: which events reach the scene, and one
//! overlay pass per frame.

use crate::assets::ArtworkImages;
use crate::render::Outline;
use crate::ui::{Overlay, UiAction, UiState};
use winit::event::WindowEvent;
use winit::window::Window;

pub struct OverlayFrame {
    pub primitives: Vec<egui::ClippedPrimitive>,
    pub textures: egui::TexturesDelta,
    pub pixels_per_point: f32,
    pub actions: Vec<UiAction>,
}

pub struct OverlayHost {
    ctx: egui::Context,
    input: egui_winit::State,
}

impl OverlayHost {
    pub fn new(window: &Window) -> Self {
        let ctx = egui::Context::default();
        ctx.set_visuals(egui::Visuals::dark());
        let input = egui_winit::State::new(
            ctx.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        Self { ctx, input }
    }

    /// Feeds `event` to egui and reports whether the scene should still
    /// act on it. With the pointer locked the cursor is parked under the
    /// crosshair, so egui never sees the mouse and clicks always pick.
    pub fn reaches_scene(
        &mut self,
        window: &Window,
        event: &WindowEvent,
        pointer_locked: bool,
    ) -> bool {
        if pointer_locked
            && matches!(
                event,
                WindowEvent::CursorMoved { .. } | WindowEvent::MouseInput { .. }
            )
        {
            return true;
        }
        !self.input.on_window_event(window, event).consumed
    }

    /// Collects finished artwork images, draws the overlays and tessellates
    /// them for the surface.
    pub fn draw(
        &mut self,
        window: &Window,
        ui: &mut UiState,
        outlines: &[Outline],
        images: &mut ArtworkImages,
    ) -> OverlayFrame {
        images.receive(&self.ctx);
        let artwork_image = match ui.overlay() {
            Overlay::Artwork { poi, .. } => images.slot(*poi),
            _ => None,
        };

        let raw_input = self.input.take_egui_input(window);
        let mut actions = Vec::new();
        let output = self.ctx.run(raw_input, |ctx| {
            actions = ui.show(ctx, outlines, artwork_image);
        });
        self.input.handle_platform_output(window, output.platform_output);

        OverlayFrame {
            primitives: self.ctx.tessellate(output.shapes, output.pixels_per_point),
            textures: output.textures_delta,
            pixels_per_point: output.pixels_per_point,
            actions,
        }
    }
}
