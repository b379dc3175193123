mod input;
mod overlay_host;
mod timing;

use crate::assets::{ArtworkImages, AssetError, PlaceholderAssets};
use crate::chat::{ChatDispatcher, ChatError, OpenAiChatClient};
use crate::config::{ConfigError, GalleryConfig};
use crate::render::{GpuSurface, MoveDirection};
use crate::scene::serialization::LayoutError;
use crate::scene::GalleryLayout;
use crate::ui::{UiAction, UiState};
use crate::world::{InteractionMode, UiEvent, World};
use input::direction_for_key;
use overlay_host::OverlayHost;
use timing::FpsCounter;

use std::sync::Arc;
use std::time::{Duration, Instant};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{DeviceEvent, DeviceId, ElementState, KeyEvent, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{CursorGrabMode, Window, WindowAttributes, WindowId};

const TARGET_FRAME: Duration = Duration::from_millis(16);
const WINDOW_TITLE: &str = "Gallery Walk";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("chat runtime error: {0}")]
    Chat(#[from] ChatError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("layout error: {0}")]
    Layout(#[from] LayoutError),
    #[error("asset error: {0}")]
    Assets(#[from] AssetError),
}

pub struct App {
    window: Option<Arc<Window>>,
    gpu: Option<GpuSurface>,
    overlay: Option<OverlayHost>,
    world: World<ChatDispatcher>,
    ui: UiState,
    images: ArtworkImages,
    fps: FpsCounter,
    started: Instant,
    next_frame_time: Instant,
    cursor_locked: bool,
}

impl App {
    fn new(config: GalleryConfig, layout: &GalleryLayout) -> Result<Self, AppError> {
        let service = Arc::new(OpenAiChatClient::from_config(&config.chat)?);
        let dispatcher = ChatDispatcher::new(service)?;
        let images = ArtworkImages::new(dispatcher.handle())?;
        let world = World::new(
            config,
            layout,
            &PlaceholderAssets,
            dispatcher,
            rand::random(),
            Duration::ZERO,
        );
        let now = Instant::now();
        Ok(Self {
            window: None,
            gpu: None,
            overlay: None,
            world,
            ui: UiState::new(),
            images,
            fps: FpsCounter::new(now),
            started: now,
            next_frame_time: now,
            cursor_locked: false,
        })
    }

    fn now(&self) -> Duration {
        self.started.elapsed()
    }

    fn lock_cursor(&mut self) {
        let Some(window) = &self.window else {
            return;
        };
        let grabbed = window
            .set_cursor_grab(CursorGrabMode::Locked)
            .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined));
        match grabbed {
            Ok(()) => {
                window.set_cursor_visible(false);
                self.cursor_locked = true;
            }
            Err(err) => log::warn!("Pointer lock unavailable: {}", err),
        }
    }

    fn unlock_cursor(&mut self) {
        if !self.cursor_locked {
            return;
        }
        if let Some(window) = &self.window {
            if let Err(err) = window.set_cursor_grab(CursorGrabMode::None) {
                log::debug!("Failed to release pointer: {}", err);
            }
            window.set_cursor_visible(true);
        }
        self.cursor_locked = false;
    }

    fn release_movement(&mut self) {
        for direction in [
            MoveDirection::Forward,
            MoveDirection::Backward,
            MoveDirection::Left,
            MoveDirection::Right,
        ] {
            self.world.set_movement(direction, false);
        }
    }

    /// Typing inside the chat window belongs to egui; only Escape is
    /// handled here while an overlay is open.
    fn handle_key(&mut self, event_loop: &ActiveEventLoop, event: KeyEvent) {
        let pressed = event.state == ElementState::Pressed;
        let now = self.now();
        let key = event.physical_key;

        match self.world.mode() {
            InteractionMode::ChatOpen(_) => {
                if pressed && key == PhysicalKey::Code(KeyCode::Escape) {
                    self.world.close_chat(now);
                }
            }
            InteractionMode::OverlayOpen(_) => {
                if pressed && key == PhysicalKey::Code(KeyCode::Escape) {
                    self.world.close_poi_overlay();
                }
            }
            InteractionMode::FocusedOnPoi(_) | InteractionMode::FreeRoam => {
                if pressed && key == PhysicalKey::Code(KeyCode::Escape) {
                    if self.world.unfocus() {
                        return;
                    }
                    log::info!("Escape pressed, shutting down...");
                    event_loop.exit();
                    return;
                }
                if let Some(direction) = direction_for_key(key) {
                    if !(pressed && event.repeat) {
                        self.world.set_movement(direction, pressed);
                    }
                }
            }
        }
    }

    fn handle_click(&mut self) {
        if matches!(
            self.world.mode(),
            InteractionMode::FreeRoam | InteractionMode::FocusedOnPoi(_)
        ) && !self.cursor_locked
        {
            self.lock_cursor();
        }
        let result = self.world.click(self.now());
        log::debug!("Click: {:?}", result);
    }

    fn apply_ui_action(&mut self, now: Duration, action: UiAction) {
        match action {
            UiAction::SendChat(text) => {
                if let Err(refusal) = self.world.submit_chat(&text) {
                    log::debug!("Message not sent: {}", refusal);
                }
            }
            UiAction::CloseChat => {
                self.world.close_chat(now);
            }
            UiAction::CloseArtwork => {
                self.world.close_poi_overlay();
            }
        }
    }

    fn frame(&mut self) {
        let now = self.now();
        for reply in self.world.transport_mut().drain() {
            self.world.deliver_reply(reply);
        }
        self.world.update(now);

        for event in self.world.drain_ui_events() {
            match &event {
                UiEvent::ChatOpened { name, .. } => log::info!("Chatting with {}", name),
                UiEvent::ChatMessage { role, text, .. } => log::info!("[{:?}] {}", role, text),
                UiEvent::PoiOverlayOpened { poi, image_ref } => {
                    log::info!("Artwork {}: {}", poi, image_ref);
                    self.images.request(*poi, image_ref);
                }
                UiEvent::ChatClosed { .. } | UiEvent::PoiOverlayClosed { .. } => {}
            }
            self.ui.apply(event);
        }
        if matches!(
            self.world.mode(),
            InteractionMode::ChatOpen(_) | InteractionMode::OverlayOpen(_)
        ) {
            self.unlock_cursor();
        }

        let (Some(window), Some(overlay), Some(gpu)) =
            (self.window.as_ref(), self.overlay.as_mut(), self.gpu.as_mut())
        else {
            return;
        };

        let size = window.inner_size();
        let aspect = size.width.max(1) as f32 / size.height.max(1) as f32;
        let outlines = self.world.scene_outlines(aspect);
        let drawn = overlay.draw(window, &mut self.ui, &outlines, &mut self.images);
        if let Err(err) = gpu.paint(&drawn.primitives, &drawn.textures, drawn.pixels_per_point) {
            log::error!("Failed to paint frame: {}", err);
        }
        if let Some(fps) = self.fps.tick(Instant::now()) {
            window.set_title(&format!("{} - {:.1} fps", WINDOW_TITLE, fps));
        }

        for action in drawn.actions {
            self.apply_ui_action(now, action);
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attrs = WindowAttributes::default()
            .with_title(WINDOW_TITLE)
            .with_inner_size(PhysicalSize::new(1280u32, 720u32))
            .with_resizable(true);

        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                log::error!("Failed to create window: {}", err);
                event_loop.exit();
                return;
            }
        };
        log::info!(
            "Window created: {}x{}",
            window.inner_size().width,
            window.inner_size().height
        );

        match pollster::block_on(GpuSurface::new(Arc::clone(&window))) {
            Ok(gpu) => self.gpu = Some(gpu),
            Err(err) => {
                log::error!("Failed to initialize graphics: {}", err);
                event_loop.exit();
                return;
            }
        }
        self.overlay = Some(OverlayHost::new(&window));
        self.window = Some(window);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let reaches_scene = match (self.window.as_ref(), self.overlay.as_mut()) {
            (Some(window), Some(overlay)) => {
                overlay.reaches_scene(window, &event, self.cursor_locked)
            }
            _ => true,
        };

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, shutting down...");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(gpu) = self.gpu.as_mut() {
                    gpu.resize(size.width, size.height);
                }
            }
            WindowEvent::Focused(false) => {
                self.release_movement();
                self.unlock_cursor();
            }
            WindowEvent::KeyboardInput { event, .. } => self.handle_key(event_loop, event),
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } if reaches_scene => self.handle_click(),
            WindowEvent::RedrawRequested => self.frame(),
            _ => {}
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            if self.cursor_locked {
                self.world.look(dx as f32, dy as f32);
            }
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        if now >= self.next_frame_time {
            if let Some(window) = &self.window {
                window.request_redraw();
            }
            self.next_frame_time = now + TARGET_FRAME;
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(self.next_frame_time));
    }
}

pub fn run(config: GalleryConfig, layout: &GalleryLayout) -> Result<(), AppError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new(config, layout)?;
    event_loop.run_app(&mut app)?;

    log::info!("Goodbye!");
    Ok(())
}
