use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Instant;

use softbuffer::Surface;
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, MouseButton, MouseScrollDelta, Touch, TouchPhase, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowId};

use ivgal::input::{InputEvent, KeyInput, Point, PointerButton};

use crate::loader::UserEvent;
use crate::ui::state::AppState;

pub mod render;
pub mod state;

pub const INITIAL_SIZE: (u32, u32) = (1280, 720);

// ---------------------------------------------------------------------------
// Application handler (winit 0.30 style)
// ---------------------------------------------------------------------------

pub struct App {
    pub state: AppState,
    pub window: Option<Arc<Window>>,
    pub context: Option<softbuffer::Context<Arc<Window>>>,
    pub surface: Option<Surface<Arc<Window>, Arc<Window>>>,
    pub next_redraw: Option<Instant>,
    mouse_pos: Point,
    /// Fingers currently down, in the order they landed.
    touches: Vec<(u64, Point)>,
    title: String,
}

impl App {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            window: None,
            context: None,
            surface: None,
            next_redraw: None,
            mouse_pos: Point::default(),
            touches: Vec::new(),
            title: String::new(),
        }
    }

    fn request_redraw(&self) {
        if let Some(ref window) = self.window {
            window.request_redraw();
        }
    }

    fn dispatch(&mut self, event_loop: &ActiveEventLoop, event: InputEvent) {
        let redraw = self.state.handle_input(event);
        if self.state.quit {
            event_loop.exit();
        } else if redraw {
            self.request_redraw();
        }
    }

    fn touch_points(&self) -> Vec<Point> {
        self.touches.iter().map(|(_, p)| *p).collect()
    }

    fn touch_event(&mut self, touch: Touch) -> Option<InputEvent> {
        let pos = Point::new(touch.location.x as f32, touch.location.y as f32);
        let time = Instant::now();
        match touch.phase {
            TouchPhase::Started => {
                self.touches.push((touch.id, pos));
                Some(InputEvent::TouchStart {
                    touches: self.touch_points(),
                    target: self.state.hit_target(pos),
                    time,
                })
            }
            TouchPhase::Moved => {
                let slot = self.touches.iter_mut().find(|(id, _)| *id == touch.id)?;
                slot.1 = pos;
                Some(InputEvent::TouchMove { touches: self.touch_points() })
            }
            TouchPhase::Ended | TouchPhase::Cancelled => {
                let i = self.touches.iter().position(|(id, _)| *id == touch.id)?;
                self.touches.remove(i);
                Some(InputEvent::TouchEnd { remaining: self.touch_points(), lifted: pos, time })
            }
        }
    }
}

fn key_input(key: &Key) -> Option<KeyInput> {
    match key {
        Key::Named(NamedKey::Escape) => Some(KeyInput::Escape),
        Key::Named(NamedKey::ArrowLeft) => Some(KeyInput::ArrowLeft),
        Key::Named(NamedKey::ArrowRight) => Some(KeyInput::ArrowRight),
        Key::Character(s) => s.chars().next().map(KeyInput::Char),
        _ => None,
    }
}

fn pointer_button(button: MouseButton) -> Option<PointerButton> {
    match button {
        MouseButton::Left => Some(PointerButton::Primary),
        MouseButton::Right => Some(PointerButton::Secondary),
        MouseButton::Middle => Some(PointerButton::Middle),
        _ => None,
    }
}

impl ApplicationHandler<UserEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let attrs = Window::default_attributes()
            .with_title(self.state.window_title())
            .with_inner_size(LogicalSize::new(INITIAL_SIZE.0, INITIAL_SIZE.1));
        let window = match event_loop.create_window(attrs) {
            Ok(w) => Arc::new(w),
            Err(e) => {
                log::error!("Cannot create window: {}", e);
                event_loop.exit();
                return;
            }
        };
        let context = match softbuffer::Context::new(Arc::clone(&window)) {
            Ok(c) => c,
            Err(e) => {
                log::error!("Cannot create drawing context: {}", e);
                event_loop.exit();
                return;
            }
        };
        let surface = match Surface::new(&context, Arc::clone(&window)) {
            Ok(s) => s,
            Err(e) => {
                log::error!("Cannot create drawing surface: {}", e);
                event_loop.exit();
                return;
            }
        };

        let size = window.inner_size();
        self.state.resize(size.width, size.height);
        window.request_redraw();
        self.window = Some(window);
        self.context = Some(context);
        self.surface = Some(surface);
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: UserEvent) {
        let redraw = match event {
            UserEvent::ImageReady(idx) | UserEvent::ThumbnailReady(idx) | UserEvent::OverlayReady(idx) => {
                self.state.on_decoded(idx)
            }
            UserEvent::DownloadFinished(outcome) => {
                self.state.download_finished(outcome);
                true
            }
        };
        if redraw {
            self.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }

            WindowEvent::Resized(PhysicalSize { width, height }) => {
                let w = width.max(1);
                let h = height.max(1);
                if let (Some(surface), Some(nw), Some(nh)) =
                    (self.surface.as_mut(), NonZeroU32::new(w), NonZeroU32::new(h))
                {
                    if let Err(e) = surface.resize(nw, nh) {
                        log::warn!("Surface resize to {}x{} failed: {}", w, h, e);
                    }
                }
                self.state.resize(w, h);
                self.request_redraw();
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if event.state != ElementState::Pressed {
                    return;
                }
                if let Some(key) = key_input(&event.logical_key) {
                    self.dispatch(event_loop, InputEvent::Key(key));
                }
            }

            WindowEvent::MouseInput { state, button, .. } => {
                let Some(button) = pointer_button(button) else {
                    return;
                };
                let pos = self.mouse_pos;
                let time = Instant::now();
                let event = match state {
                    ElementState::Pressed => InputEvent::PointerDown {
                        pos,
                        button,
                        target: self.state.hit_target(pos),
                        time,
                    },
                    ElementState::Released => InputEvent::PointerUp { pos, button, time },
                };
                self.dispatch(event_loop, event);
            }

            WindowEvent::CursorMoved {
                position: PhysicalPosition { x, y },
                ..
            } => {
                self.mouse_pos = Point::new(x as f32, y as f32);
                let pos = self.mouse_pos;
                self.dispatch(event_loop, InputEvent::PointerMove { pos });
            }

            WindowEvent::CursorEntered { .. } => {
                if self.state.set_hover(true) {
                    self.request_redraw();
                }
            }

            WindowEvent::CursorLeft { .. } => {
                if self.state.set_hover(false) {
                    self.request_redraw();
                }
            }

            WindowEvent::MouseWheel { delta, .. } => {
                let y = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(PhysicalPosition { y, .. }) => y as f32 / 40.0,
                };
                if y != 0.0 {
                    let pos = self.mouse_pos;
                    self.dispatch(event_loop, InputEvent::Wheel { pos, delta_y: -y });
                }
            }

            WindowEvent::Touch(touch) => {
                if let Some(event) = self.touch_event(touch) {
                    self.dispatch(event_loop, event);
                }
            }

            WindowEvent::RedrawRequested => {
                let Some(window) = self.window.clone() else {
                    return;
                };
                let now = Instant::now();
                self.next_redraw = self.state.update(now);

                let title = self.state.window_title();
                if title != self.title {
                    window.set_title(&title);
                    self.title = title;
                }

                if let Some(ref mut surface) = self.surface {
                    let size = window.inner_size();
                    let fb_w = size.width.max(1);
                    let fb_h = size.height.max(1);
                    match surface.buffer_mut() {
                        Ok(mut buffer) => {
                            self.state.render(&mut buffer, fb_w, fb_h, now);
                            if let Err(e) = buffer.present() {
                                log::warn!("Present failed: {}", e);
                            }
                        }
                        Err(e) => log::warn!("No framebuffer: {}", e),
                    }
                }
            }

            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(when) = self.next_redraw {
            if Instant::now() >= when {
                self.next_redraw = None;
                self.request_redraw();
            } else {
                event_loop.set_control_flow(ControlFlow::WaitUntil(when));
            }
        } else {
            event_loop.set_control_flow(ControlFlow::Wait);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_map_to_viewer_input() {
        assert_eq!(key_input(&Key::Named(NamedKey::Escape)), Some(KeyInput::Escape));
        assert_eq!(key_input(&Key::Named(NamedKey::ArrowRight)), Some(KeyInput::ArrowRight));
        assert_eq!(key_input(&Key::Character("R".into())), Some(KeyInput::Char('R')));
        assert_eq!(key_input(&Key::Named(NamedKey::Space)), None);
    }

    #[test]
    fn mouse_buttons_map() {
        assert_eq!(pointer_button(MouseButton::Left), Some(PointerButton::Primary));
        assert_eq!(pointer_button(MouseButton::Back), None);
    }
}
