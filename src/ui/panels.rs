use super::{Overlay, Speaker, UiAction, UiState};
use crate::assets::ImageSlot;
use crate::render::sketch::ndc_to_viewport;
use crate::render::{Outline, OutlineKind};
use crate::scene::PoiId;
use egui::{Color32, RichText};
use glam::Vec2;

const ARTWORK_COLOR: Color32 = Color32::from_rgb(214, 178, 96);
const VISITOR_COLOR: Color32 = Color32::from_rgb(130, 180, 230);
const SPEAKER_COLOR: Color32 = Color32::from_rgb(120, 230, 160);
const GLOW_COLOR: Color32 = Color32::from_rgb(255, 236, 170);
const USER_COLOR: Color32 = Color32::from_rgb(200, 200, 200);
const CROSSHAIR_COLOR: Color32 = Color32::from_rgb(230, 40, 40);
const CROSSHAIR_RADIUS: f32 = 5.0;
const HINT: &str = "Click to look around, WASD to walk. Click a painting to step up to it \
                    or a standing visitor to talk. Esc to leave.";

impl UiState {
    /// Draws the scene sketch, the crosshair and whichever overlay is open.
    pub fn show(
        &mut self,
        ctx: &egui::Context,
        outlines: &[Outline],
        artwork_image: Option<&ImageSlot>,
    ) -> Vec<UiAction> {
        draw_sketch(ctx, outlines);

        let mut actions = Vec::new();
        match self.overlay.clone() {
            Overlay::Hidden => {
                draw_crosshair(ctx);
                draw_hint(ctx);
            }
            Overlay::Chat { name, .. } => self.chat_window(ctx, &name, &mut actions),
            Overlay::Artwork { poi, image_ref } => {
                artwork_window(ctx, poi, &image_ref, artwork_image, &mut actions)
            }
        }
        actions
    }

    fn chat_window(&mut self, ctx: &egui::Context, name: &str, actions: &mut Vec<UiAction>) {
        let mut open = true;
        egui::Window::new(format!("Talking with {}", name))
            .id(egui::Id::new("chat-window"))
            .open(&mut open)
            .anchor(egui::Align2::RIGHT_BOTTOM, [-16.0, -16.0])
            .default_width(380.0)
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical()
                    .max_height(300.0)
                    .stick_to_bottom(true)
                    .auto_shrink([false, true])
                    .show(ui, |ui| {
                        for line in self.transcript() {
                            let (who, color) = match line.speaker {
                                Speaker::User => ("You", USER_COLOR),
                                Speaker::Visitor => (name, SPEAKER_COLOR),
                            };
                            ui.horizontal_wrapped(|ui| {
                                ui.label(RichText::new(format!("{}:", who)).strong().color(color));
                                ui.label(line.text.as_str());
                            });
                        }
                        if self.awaiting_reply() {
                            ui.horizontal(|ui| {
                                ui.spinner();
                                ui.weak(format!("{} is thinking", name));
                            });
                        }
                    });

                ui.separator();
                let input = ui.add(
                    egui::TextEdit::singleline(&mut self.draft)
                        .id(egui::Id::new("chat-input"))
                        .hint_text("Say something (Enter to send)")
                        .desired_width(f32::INFINITY),
                );
                let submit_by_enter =
                    input.lost_focus() && ui.input(|input| input.key_pressed(egui::Key::Enter));
                let (send, close) = ui
                    .horizontal(|ui| (ui.button("Send").clicked(), ui.button("Close").clicked()))
                    .inner;

                if send || submit_by_enter {
                    if let Some(text) = self.take_draft() {
                        actions.push(UiAction::SendChat(text));
                    }
                }
                if close {
                    actions.push(UiAction::CloseChat);
                } else {
                    input.request_focus();
                }
            });
        if !open {
            actions.push(UiAction::CloseChat);
        }
    }
}

fn artwork_window(
    ctx: &egui::Context,
    poi: PoiId,
    image_ref: &str,
    image: Option<&ImageSlot>,
    actions: &mut Vec<UiAction>,
) {
    let mut open = true;
    egui::Window::new(format!("Artwork {}", poi))
        .id(egui::Id::new("artwork-window"))
        .open(&mut open)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .collapsible(false)
        .resizable(false)
        .show(ctx, |ui| {
            match image {
                Some(ImageSlot::Ready(texture)) => {
                    ui.add(
                        egui::Image::from_texture(egui::load::SizedTexture::from_handle(texture))
                            .max_size(egui::vec2(720.0, 480.0))
                            .maintain_aspect_ratio(true),
                    );
                }
                Some(ImageSlot::Failed(reason)) => {
                    ui.colored_label(
                        ui.visuals().warn_fg_color,
                        format!("Image unavailable: {}", reason),
                    );
                }
                Some(ImageSlot::Loading) | None => {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label("Loading image");
                    });
                }
            }
            ui.add_space(6.0);
            ui.hyperlink(image_ref);
            if ui.button("Close").clicked() {
                actions.push(UiAction::CloseArtwork);
            }
        });
    if !open {
        actions.push(UiAction::CloseArtwork);
    }
}

fn draw_sketch(ctx: &egui::Context, outlines: &[Outline]) {
    let screen = ctx.screen_rect();
    let size = Vec2::new(screen.width(), screen.height());
    let to_screen = |ndc: Vec2| {
        let point = ndc_to_viewport(ndc, size);
        egui::pos2(screen.min.x + point.x, screen.min.y + point.y)
    };
    let painter = ctx.layer_painter(egui::LayerId::background());

    for outline in outlines {
        let color = match outline.kind {
            OutlineKind::Artwork => ARTWORK_COLOR,
            OutlineKind::Visitor => VISITOR_COLOR,
            OutlineKind::Speaker => SPEAKER_COLOR,
        };
        let stroke = egui::Stroke::new(1.5, color);
        for [from, to] in &outline.edges {
            painter.line_segment([to_screen(*from), to_screen(*to)], stroke);
        }
        for glow in &outline.glows {
            painter.circle_filled(
                to_screen(glow.at),
                2.0 + 4.0 * glow.strength,
                GLOW_COLOR.gamma_multiply(0.3 + 0.7 * glow.strength),
            );
        }
    }
}

fn draw_crosshair(ctx: &egui::Context) {
    let painter = ctx.layer_painter(egui::LayerId::new(
        egui::Order::Foreground,
        egui::Id::new("crosshair"),
    ));
    painter.circle_filled(ctx.screen_rect().center(), CROSSHAIR_RADIUS, CROSSHAIR_COLOR);
}

fn draw_hint(ctx: &egui::Context) {
    egui::Area::new(egui::Id::new("hint"))
        .anchor(egui::Align2::LEFT_BOTTOM, [12.0, -12.0])
        .interactable(false)
        .show(ctx, |ui| {
            ui.label(RichText::new(HINT).color(Color32::from_gray(200)));
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::ChatMessage;
    use crate::world::UiEvent;

    fn run_frame(ui: &mut UiState, outlines: &[Outline]) -> (Vec<UiAction>, usize) {
        let ctx = egui::Context::default();
        let mut actions = Vec::new();
        let output = ctx.run(egui::RawInput::default(), |ctx| {
            actions = ui.show(ctx, outlines, None);
        });
        (actions, output.shapes.len())
    }

    fn square() -> Outline {
        Outline {
            kind: OutlineKind::Artwork,
            edges: vec![
                [Vec2::new(-0.5, -0.5), Vec2::new(0.5, -0.5)],
                [Vec2::new(0.5, -0.5), Vec2::new(0.5, 0.5)],
            ],
            glows: Vec::new(),
        }
    }

    #[test]
    fn free_roam_frame_draws_without_actions() {
        let mut ui = UiState::new();
        let (actions, shapes) = run_frame(&mut ui, &[square()]);
        assert!(actions.is_empty());
        // Two edges, the crosshair and the hint at least.
        assert!(shapes >= 4);
    }

    #[test]
    fn open_chat_window_is_quiet_until_used() {
        let mut ui = UiState::new();
        ui.apply(UiEvent::ChatOpened {
            visitor: 1,
            name: "Avery".to_string(),
            history: vec![ChatMessage::assistant("What a sky.")],
        });
        ui.draft.push_str("typed but not sent");
        let (actions, _) = run_frame(&mut ui, &[]);
        assert!(actions.is_empty());
        assert_eq!(ui.draft, "typed but not sent");
    }
}
