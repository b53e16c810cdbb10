use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use winit::event_loop::EventLoopProxy;

use ivgal::carousel::{Carousel, CarouselControl, CarouselEvent};
use ivgal::collection::{ImageCollection, ImageRecord, Overlay};
use ivgal::download::{self, CapturedPixels, DownloadOutcome, DownloadRequest, SystemOpener};
use ivgal::gallery::Gallery;
use ivgal::gesture::{GestureInterpreter, GestureOutcome};
use ivgal::input::{HitTarget, InputEvent, KeyInput, NavAction, Point, PointerButton, Rect};
use ivgal::overlay::overlay_rect;
use ivgal::session::{ViewerEvent, ViewerSession};
use ivgal::settings::{CarouselOptions, ViewerSettings};
use ivgal::viewport::{ComposedTransform, Transition};

use crate::cli::{HELP_KEYS, StartMode};
use crate::loader::{DecodedImage, SharedState, UserEvent, ViewMode, WorkType, lock_cache};
use crate::ui::render::{
    BG_COLOR, Placement, Rgba, blit_cover, blit_transformed, draw_label, draw_text, fill, fill_rect,
    fit_scale, rgb,
};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const NAV_BAR_HEIGHT: f32 = 48.0;
const BUTTON_SIZE: f32 = 36.0;
const BUTTON_GAP: f32 = 6.0;
const SIDE_ARROW: f32 = 48.0;
/// Largest share of the container the unzoomed image covers.
const IMAGE_FILL: f32 = 0.8;
const STATUS_DURATION: Duration = Duration::from_secs(3);
const FRAME_INTERVAL: Duration = Duration::from_millis(16);
/// Gallery scroll distance per wheel line.
const WHEEL_LINE: f32 = 60.0;
/// Max finger travel for a gallery tap.
const TAP_SLOP: f32 = 10.0;
const TEXT_SCALE: u32 = 2;

const WHITE: Rgba = (255, 255, 255, 255);
const PLACEHOLDER: Rgba = (224, 224, 224, 255);
const SCRIM: Rgba = (0, 0, 0, 178);
const ERROR_RED: Rgba = (255, 80, 80, 255);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Gallery,
    Viewer,
    Carousel,
}

// ---------------------------------------------------------------------------
// Eased display values
// ---------------------------------------------------------------------------

trait Mix: Copy + PartialEq {
    fn mix(&self, to: &Self, t: f32) -> Self;
}

impl Mix for ComposedTransform {
    fn mix(&self, to: &Self, t: f32) -> Self {
        self.lerp(to, t)
    }
}

impl Mix for f32 {
    fn mix(&self, to: &Self, t: f32) -> Self {
        self + (to - self) * t
    }
}

/// What is on screen, easing towards the model value.
#[derive(Debug, Clone, Copy)]
struct Eased<T> {
    from: T,
    to: T,
    started: Instant,
    duration: Duration,
}

impl<T: Mix> Eased<T> {
    fn new(value: T, now: Instant) -> Self {
        Self { from: value, to: value, started: now, duration: Duration::ZERO }
    }

    fn progress(&self, now: Instant) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(self.started).as_secs_f32();
        (elapsed / self.duration.as_secs_f32()).min(1.0)
    }

    fn value(&self, now: Instant) -> T {
        let t = self.progress(now);
        let eased = 1.0 - (1.0 - t).powi(3);
        self.from.mix(&self.to, eased)
    }

    fn is_settled(&self, now: Instant) -> bool {
        self.progress(now) >= 1.0
    }

    fn snap(&mut self, to: T) {
        self.from = to;
        self.to = to;
        self.duration = Duration::ZERO;
    }

    fn retarget(&mut self, to: T, transition: Transition, now: Instant) {
        match transition {
            Transition::Immediate => self.snap(to),
            Transition::Eased(duration) => {
                if to == self.to {
                    return;
                }
                self.from = self.value(now);
                self.to = to;
                self.started = now;
                self.duration = duration;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

pub struct AppState {
    pub collection: Arc<ImageCollection>,
    pub shared: SharedState,
    proxy: EventLoopProxy<UserEvent>,

    pub session: ViewerSession,
    interpreter: GestureInterpreter,
    gallery: Gallery,
    carousel: Carousel,

    pub screen: Screen,
    /// Where closing the viewer returns to.
    home: Screen,
    last_viewed: Option<usize>,

    download_dir: PathBuf,
    status: Option<(String, Instant)>,
    pub show_help: bool,
    pub quit: bool,

    size: (u32, u32),
    gallery_touch: Option<(Point, Point)>,
    shown_transform: Eased<ComposedTransform>,
    shown_track: Eased<f32>,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        collection: Arc<ImageCollection>,
        shared: SharedState,
        proxy: EventLoopProxy<UserEvent>,
        settings: ViewerSettings,
        carousel_options: CarouselOptions,
        mode: StartMode,
        download_dir: PathBuf,
        size: (u32, u32),
    ) -> Self {
        let now = Instant::now();
        let initial = carousel_options.initial_index;
        let (w, h) = (size.0 as f32, size.1 as f32);
        let mut state = Self {
            session: ViewerSession::new(Arc::clone(&collection), settings),
            interpreter: GestureInterpreter::new(Rect::default()),
            gallery: Gallery::new(collection.len(), w, h),
            carousel: Carousel::new(Arc::clone(&collection), carousel_options, Rect::default()),
            collection,
            shared,
            proxy,
            screen: Screen::Gallery,
            home: Screen::Gallery,
            last_viewed: None,
            download_dir,
            status: None,
            show_help: false,
            quit: false,
            size,
            gallery_touch: None,
            shown_transform: Eased::new(ComposedTransform::IDENTITY, now),
            shown_track: Eased::new(0.0, now),
        };

        match mode {
            StartMode::Gallery => {}
            StartMode::Carousel => {
                state.screen = Screen::Carousel;
                state.home = Screen::Carousel;
            }
            StartMode::Viewer => {
                let index = initial.min(state.collection.len().saturating_sub(1));
                if state.session.open_index(index) {
                    state.last_viewed = Some(index);
                    state.screen = Screen::Viewer;
                }
            }
        }
        state.resize(size.0, size.1);
        state
    }

    // ------------------------------------------------------------------
    // Layout
    // ------------------------------------------------------------------

    fn width(&self) -> f32 {
        self.size.0 as f32
    }

    fn height(&self) -> f32 {
        self.size.1 as f32
    }

    fn nav_bar(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width(), NAV_BAR_HEIGHT)
    }

    fn container(&self) -> Rect {
        Rect::new(0.0, NAV_BAR_HEIGHT, self.width(), (self.height() - NAV_BAR_HEIGHT).max(1.0))
    }

    fn track_rect(&self) -> Rect {
        let th = (self.carousel.options().track_height as f32).min(self.height());
        Rect::new(0.0, (self.height() - th) / 2.0, self.width(), th)
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.size = (width.max(1), height.max(1));
        let (w, h) = (self.width(), self.height());
        self.gallery.resize(w, h);
        let track = self.track_rect();
        self.carousel.set_track(track);
        self.shown_track.snap(self.carousel.track_offset(track.width));
        let container = self.container();
        self.interpreter.set_bounds(container);
        self.sync_cache();
    }

    /// Unzoomed image box, centred on the container origin.
    fn image_box(&self, natural: Option<(u32, u32)>, upscale: bool) -> Rect {
        let c = self.container();
        let (max_w, max_h) = (c.width * IMAGE_FILL, c.height * IMAGE_FILL);
        let (w, h) = match natural {
            Some((w, h)) if w > 0 && h > 0 => {
                let (w, h) = (w as f32, h as f32);
                let mut s = fit_scale(w, h, max_w, max_h);
                if !upscale {
                    s = s.min(1.0);
                }
                (w * s, h * s)
            }
            _ => (max_w, max_h),
        };
        Rect::new(-w / 2.0, -h / 2.0, w, h)
    }

    fn placement(&self, t: &ComposedTransform) -> Placement {
        let center = self.container().center();
        Placement {
            origin: (center.x + t.translate_x, center.y + t.translate_y),
            rotate_deg: t.rotate_deg,
            scale: t.scale,
        }
    }

    fn active_image_data(&self) -> Option<(Arc<DecodedImage>, bool)> {
        let idx = self.session.active_index()?;
        let cache = lock_cache(&self.shared);
        match cache.get(idx) {
            Some(full) => Some((full, true)),
            None => cache.get_thumbnail(idx).map(|t| (t, false)),
        }
    }

    fn active_box(&self) -> Rect {
        match self.active_image_data() {
            Some((img, full)) => self.image_box(Some((img.width, img.height)), !full),
            None => self.image_box(None, false),
        }
    }

    /// Controls on the navigation bar plus the side arrows, in hit-test order.
    fn nav_buttons(&self) -> Vec<(Rect, NavAction, &'static str)> {
        let s = self.session.settings();
        let mut actions: Vec<(NavAction, &'static str)> = Vec::new();
        if self.session.overlay_toggle_available() {
            actions.push((NavAction::ToggleOverlay, "O"));
        }
        if s.allow_download {
            actions.push((NavAction::Download, "D"));
        }
        if self.session.reset_available() {
            actions.push((NavAction::Reset, "0"));
        }
        if s.allow_rotate {
            actions.push((NavAction::RotateLeft, "<R"));
            actions.push((NavAction::RotateRight, "R>"));
        }
        if s.allow_zoom {
            actions.push((NavAction::ZoomOut, "-"));
            actions.push((NavAction::ZoomIn, "+"));
        }
        actions.push((NavAction::Close, "X"));

        let y = (NAV_BAR_HEIGHT - BUTTON_SIZE) / 2.0;
        let mut x = self.width() - BUTTON_GAP - BUTTON_SIZE;
        let mut out = Vec::with_capacity(actions.len() + 2);
        for (action, label) in actions.into_iter().rev() {
            out.push((Rect::new(x, y, BUTTON_SIZE, BUTTON_SIZE), action, label));
            x -= BUTTON_SIZE + BUTTON_GAP;
        }

        if self.session.can_navigate() && self.session.controls_visible() {
            let c = self.container();
            let ay = c.y + (c.height - SIDE_ARROW) / 2.0;
            out.push((Rect::new(c.x + BUTTON_GAP, ay, SIDE_ARROW, SIDE_ARROW), NavAction::Previous, "<"));
            out.push((
                Rect::new(c.x + c.width - BUTTON_GAP - SIDE_ARROW, ay, SIDE_ARROW, SIDE_ARROW),
                NavAction::Next,
                ">",
            ));
        }
        out
    }

    /// What a press at `p` lands on in the viewer.
    pub fn hit_target(&self, p: Point) -> HitTarget {
        if self.screen != Screen::Viewer {
            return HitTarget::Image;
        }
        if let Some((_, action, _)) = self.nav_buttons().into_iter().find(|(r, _, _)| r.contains(p)) {
            return HitTarget::NavAction(action);
        }
        if self.nav_bar().contains(p) {
            return HitTarget::NavigationBar;
        }
        let visible = self.placement(&self.shown_transform.to).bounds(self.active_box());
        if visible.contains(p) {
            HitTarget::Image
        } else {
            HitTarget::Outside
        }
    }

    pub fn window_title(&self) -> String {
        match self.screen {
            Screen::Viewer => format!("ivgal - {}", self.session.title()),
            Screen::Gallery | Screen::Carousel => format!("ivgal - {} images", self.collection.len()),
        }
    }

    pub fn set_hover(&mut self, inside: bool) -> bool {
        let changed = self.session.controls_visible() != inside;
        self.session.set_controls_visible(inside);
        changed && self.screen == Screen::Viewer
    }

    // ------------------------------------------------------------------
    // Decode scheduling
    // ------------------------------------------------------------------

    /// Tell the workers what the current screen needs.
    fn sync_cache(&self) {
        let (mode, current, priority) = match self.screen {
            Screen::Viewer => {
                let Some(i) = self.session.active_index() else {
                    return;
                };
                let mut p = vec![(i, WorkType::Full)];
                if matches!(self.collection.get(i).and_then(|r| r.overlay.as_ref()), Some(Overlay::Url(_))) {
                    p.push((i, WorkType::Overlay));
                }
                p.push((i, WorkType::Thumbnail));
                p.extend(self.session.adjacent_indices().into_iter().map(|j| (j, WorkType::Full)));
                (ViewMode::Viewer, i, p)
            }
            Screen::Gallery => {
                let r = self.gallery.visible_range();
                (ViewMode::Gallery, r.start, r.map(|i| (i, WorkType::Thumbnail)).collect())
            }
            Screen::Carousel => {
                let i = self.carousel.index();
                let mut p = vec![(i, WorkType::Full)];
                p.extend(self.carousel.loaded_indices().filter(|&j| j != i).map(|j| (j, WorkType::Full)));
                (ViewMode::Carousel, i, p)
            }
        };
        let (_, cvar) = &*self.shared;
        {
            let mut cache = lock_cache(&self.shared);
            cache.set_mode(mode);
            cache.set_current_idx(current);
            cache.set_priority(priority);
        }
        cvar.notify_all();
    }

    /// A worker finished `idx`; returns true when it is on screen.
    pub fn on_decoded(&self, idx: usize) -> bool {
        match self.screen {
            Screen::Viewer => self.session.active_index() == Some(idx),
            Screen::Gallery => self.gallery.visible_range().contains(&idx),
            Screen::Carousel => self.carousel.is_loaded(idx),
        }
    }

    // ------------------------------------------------------------------
    // Input routing
    // ------------------------------------------------------------------

    /// Returns true when a redraw is needed.
    pub fn handle_input(&mut self, event: InputEvent) -> bool {
        if event == InputEvent::Key(KeyInput::Char('?')) {
            self.show_help = !self.show_help;
            return true;
        }
        match self.screen {
            Screen::Gallery => self.gallery_input(event),
            Screen::Viewer => self.viewer_input(event),
            Screen::Carousel => self.carousel_input(event),
        }
    }

    fn gallery_input(&mut self, event: InputEvent) -> bool {
        match event {
            InputEvent::PointerDown { pos, button: PointerButton::Primary, .. } => self.open_from_gallery(pos),
            InputEvent::Wheel { delta_y, .. } => self.scroll_gallery(delta_y * WHEEL_LINE),
            InputEvent::TouchStart { touches, .. } => {
                self.gallery_touch = match touches.as_slice() {
                    [p] => Some((*p, *p)),
                    _ => None,
                };
                false
            }
            InputEvent::TouchMove { touches } => match (touches.as_slice(), self.gallery_touch) {
                ([p], Some((start, last))) => {
                    self.gallery_touch = Some((start, *p));
                    self.scroll_gallery(last.y - p.y)
                }
                _ => false,
            },
            InputEvent::TouchEnd { remaining, lifted, .. } if remaining.is_empty() => {
                match self.gallery_touch.take() {
                    Some((start, _)) if start.distance(lifted) < TAP_SLOP => self.open_from_gallery(lifted),
                    _ => false,
                }
            }
            InputEvent::Key(KeyInput::Escape) => {
                self.quit = true;
                false
            }
            _ => false,
        }
    }

    fn scroll_gallery(&mut self, dy: f32) -> bool {
        let before = self.gallery.scroll();
        self.gallery.scroll_by(dy);
        if self.gallery.scroll() == before {
            return false;
        }
        self.sync_cache();
        true
    }

    fn open_from_gallery(&mut self, pos: Point) -> bool {
        if !self.gallery.activate(pos, &mut self.session) {
            return false;
        }
        self.last_viewed = self.session.active_index();
        self.enter_viewer();
        true
    }

    fn enter_viewer(&mut self) {
        self.screen = Screen::Viewer;
        self.interpreter.cancel(&mut self.session);
        self.shown_transform.snap(self.session.viewport().composed_transform());
        self.sync_cache();
    }

    fn leave_viewer(&mut self) {
        self.screen = self.home;
        if self.home == Screen::Carousel {
            if let Some(i) = self.last_viewed {
                self.carousel.go_to(i);
                self.drain_carousel_events();
            }
            self.shown_track.snap(self.carousel.track_offset(self.carousel.track().width));
        }
        self.sync_cache();
    }

    fn viewer_input(&mut self, event: InputEvent) -> bool {
        let before = self.session.active_index();
        let outcome = self.interpreter.handle(&mut self.session, &event);
        if let GestureOutcome::DownloadRequested(request) = &outcome {
            self.start_download(request.clone());
        }

        for ev in self.session.take_events() {
            match ev {
                ViewerEvent::ImageChanged { index, id } => {
                    log::info!("Showing {} ({}/{})", id, index + 1, self.collection.len());
                    self.last_viewed = Some(index);
                }
                ViewerEvent::Closed => log::debug!("[viewer] closed"),
            }
        }

        if !self.session.is_open() {
            self.leave_viewer();
            return true;
        }
        if self.session.active_index() != before {
            self.shown_transform.snap(self.session.viewport().composed_transform());
            self.sync_cache();
        }
        outcome.needs_redraw()
    }

    fn carousel_input(&mut self, event: InputEvent) -> bool {
        if event == InputEvent::Key(KeyInput::Escape) {
            self.quit = true;
            return false;
        }
        let redraw = self.carousel.handle(&event);
        let (changed, clicked) = self.drain_carousel_events();
        if let Some(index) = clicked {
            if self.session.open_index(index) {
                self.last_viewed = Some(index);
                self.enter_viewer();
                return true;
            }
        }
        if changed {
            self.sync_cache();
        }
        redraw || changed
    }

    /// Log slide changes; returns whether the slide changed and any clicked index.
    fn drain_carousel_events(&mut self) -> (bool, Option<usize>) {
        let mut changed = false;
        let mut clicked = None;
        for ev in self.carousel.take_events() {
            match ev {
                CarouselEvent::ImageChanged { index, id } => {
                    log::info!("Carousel at {} ({}/{})", id, index + 1, self.collection.len());
                    changed = true;
                }
                CarouselEvent::ImageClicked { index, .. } => clicked = Some(index),
            }
        }
        (changed, clicked)
    }

    // ------------------------------------------------------------------
    // Downloads
    // ------------------------------------------------------------------

    fn start_download(&mut self, request: DownloadRequest) {
        let image = self
            .session
            .active_index()
            .and_then(|i| lock_cache(&self.shared).get(i));
        let dir = self.download_dir.clone();
        let proxy = self.proxy.clone();
        log::info!("Downloading {} as '{}'", request.source, request.file_name);
        self.status = Some(("Saving...".to_string(), Instant::now()));

        thread::spawn(move || {
            let pixels = image.as_deref().map(|d| CapturedPixels {
                rgba: &d.rgba_bytes,
                width: d.width,
                height: d.height,
            });
            let outcome = download::run(&request, pixels, &dir, &SystemOpener);
            let _ = proxy.send_event(UserEvent::DownloadFinished(outcome));
        });
    }

    pub fn download_finished(&mut self, outcome: DownloadOutcome) {
        let message = match outcome {
            DownloadOutcome::Captured(path) | DownloadOutcome::Fetched(path) => {
                format!("Saved {}", path.display())
            }
            DownloadOutcome::OpenedExternally => "Opened in external viewer".to_string(),
            DownloadOutcome::Failed => "Download failed".to_string(),
        };
        self.status = Some((message, Instant::now()));
    }

    // ------------------------------------------------------------------
    // Per-frame update
    // ------------------------------------------------------------------

    /// Advance animations; returns when the next frame is due, if any.
    pub fn update(&mut self, now: Instant) -> Option<Instant> {
        match self.screen {
            Screen::Viewer => {
                let vp = self.session.viewport();
                self.shown_transform.retarget(vp.composed_transform(), vp.transition(), now);
            }
            Screen::Carousel => {
                let target = self.carousel.track_offset(self.carousel.track().width);
                self.shown_track.retarget(target, self.carousel.transition(), now);
            }
            Screen::Gallery => {}
        }

        if let Some((_, since)) = &self.status {
            if now.saturating_duration_since(*since) >= STATUS_DURATION {
                self.status = None;
            }
        }

        let animating = match self.screen {
            Screen::Viewer => !self.shown_transform.is_settled(now),
            Screen::Carousel => !self.shown_track.is_settled(now),
            Screen::Gallery => false,
        };
        if animating {
            Some(now + FRAME_INTERVAL)
        } else {
            self.status.as_ref().map(|(_, since)| *since + STATUS_DURATION)
        }
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    /// Render into the softbuffer framebuffer (u32 per pixel, 0x00RRGGBB).
    pub fn render(&self, frame: &mut [u32], fb_w: u32, fb_h: u32, now: Instant) {
        frame.fill(rgb(BG_COLOR[0], BG_COLOR[1], BG_COLOR[2]));

        if self.collection.is_empty() {
            draw_text(frame, fb_w, fb_h, "No images", 20, fb_h as i32 / 2, TEXT_SCALE, WHITE);
        } else {
            match self.screen {
                Screen::Gallery => self.render_gallery(frame, fb_w, fb_h),
                Screen::Viewer => self.render_viewer(frame, fb_w, fb_h, now),
                Screen::Carousel => self.render_carousel(frame, fb_w, fb_h, now),
            }
        }

        if let Some((message, _)) = &self.status {
            let y = fb_h as i32 - 40;
            fill_rect(frame, fb_w, fb_h, 0, y - 8, fb_w, 30, SCRIM);
            draw_text(frame, fb_w, fb_h, message, 10, y, TEXT_SCALE, WHITE);
        }

        if self.show_help {
            fill_rect(frame, fb_w, fb_h, 0, 0, fb_w, fb_h, (0, 0, 0, 200));
            let mut y = 20;
            for line in HELP_KEYS.lines() {
                draw_text(frame, fb_w, fb_h, line, 20, y, TEXT_SCALE, WHITE);
                y += 24;
            }
        }
    }

    fn render_gallery(&self, frame: &mut [u32], fb_w: u32, fb_h: u32) {
        let screen = Rect::new(0.0, 0.0, fb_w as f32, fb_h as f32);
        let cells: Vec<(Rect, Option<Arc<DecodedImage>>, bool)> = {
            let cache = lock_cache(&self.shared);
            self.gallery
                .visible_range()
                .filter_map(|i| {
                    let rect = self.gallery.cell_rect(i)?;
                    Some((rect, cache.get_thumbnail(i), cache.thumbnail_errors.contains(&i)))
                })
                .collect()
        };

        for (rect, thumb, failed) in cells {
            fill(frame, fb_w, fb_h, rect, PLACEHOLDER);
            match thumb {
                Some(t) => blit_cover(frame, fb_w, fb_h, screen, &t.rgba_bytes, t.width, t.height, rect),
                None if failed => draw_label(frame, fb_w, fb_h, rect, "?", 4, ERROR_RED),
                None => {}
            }
        }
    }

    fn render_viewer(&self, frame: &mut [u32], fb_w: u32, fb_h: u32, now: Instant) {
        let c = self.container();
        fill(frame, fb_w, fb_h, c, (0, 0, 0, 255));

        let Some(idx) = self.session.active_index() else {
            return;
        };
        let record = self.collection.get(idx);
        let (image, overlay_img, error) = {
            let cache = lock_cache(&self.shared);
            let image = cache
                .get(idx)
                .map(|i| (i, true))
                .or_else(|| cache.get_thumbnail(idx).map(|t| (t, false)));
            (image, cache.get_overlay(idx), cache.errors.get(&idx).cloned())
        };

        let xf = self.placement(&self.shown_transform.value(now));
        if let Some((img, full)) = &image {
            let local = self.image_box(Some((img.width, img.height)), !full);
            blit_transformed(frame, fb_w, fb_h, c, &img.rgba_bytes, img.width, img.height, local, &xf);
            if self.session.overlay_visible() {
                if let Some(record) = record {
                    self.render_overlay(frame, fb_w, fb_h, record, overlay_img.as_deref(), local, &xf);
                }
            }
        }

        if let Some((img, true)) = &image {
            let info = format!(
                "{}x{} | {} | {:.1} KB | zoom {:.0}% | {} deg",
                img.width,
                img.height,
                img.format_name,
                img.file_size as f64 / 1024.0,
                self.session.viewport().zoom() * 100.0,
                self.session.viewport().effective_rotation_deg(),
            );
            draw_text(frame, fb_w, fb_h, &info, 10, fb_h as i32 - 14, 1, (200, 200, 200, 255));
        }

        let mid_y = (c.y + c.height / 2.0) as i32;
        if let Some(err) = error {
            draw_text(frame, fb_w, fb_h, &format!("Could not load: {}", err), 20, mid_y, TEXT_SCALE, ERROR_RED);
        } else if !image.as_ref().is_some_and(|(_, full)| *full) {
            let tx = (fb_w as i32) / 2 - 30;
            fill_rect(frame, fb_w, fb_h, tx - 10, mid_y - 10, 140, 40, (0, 0, 0, 128));
            draw_text(frame, fb_w, fb_h, "Loading...", tx, mid_y, TEXT_SCALE, WHITE);
        }

        fill(frame, fb_w, fb_h, self.nav_bar(), SCRIM);
        let counter = format!("{} [{}/{}]", self.session.title(), idx + 1, self.collection.len());
        let text_y = ((NAV_BAR_HEIGHT - 7.0 * TEXT_SCALE as f32) / 2.0) as i32;
        draw_text(frame, fb_w, fb_h, &counter, 12, text_y, TEXT_SCALE, WHITE);
        for (rect, _, label) in self.nav_buttons() {
            fill(frame, fb_w, fb_h, rect, (255, 255, 255, 40));
            draw_label(frame, fb_w, fb_h, rect, label, TEXT_SCALE, WHITE);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn render_overlay(
        &self,
        frame: &mut [u32],
        fb_w: u32,
        fb_h: u32,
        record: &ImageRecord,
        decoded: Option<&DecodedImage>,
        image_box: Rect,
        xf: &Placement,
    ) {
        let clip = self.container();
        match &record.overlay {
            Some(Overlay::Url(_)) => {
                let Some(o) = decoded else {
                    return;
                };
                let natural = Some((o.width as f32, o.height as f32));
                let r = overlay_rect(image_box, record.overlay_position, &record.overlay_size, natural);
                blit_transformed(frame, fb_w, fb_h, clip, &o.rgba_bytes, o.width, o.height, r, xf);
            }
            Some(Overlay::Node(node)) => {
                let natural = node.natural_size().map(|(w, h)| (w as f32, h as f32));
                let r = overlay_rect(image_box, record.overlay_position, &record.overlay_size, natural);
                let (pw, ph) = (r.width.round().max(1.0) as u32, r.height.round().max(1.0) as u32);
                let pixels = node.paint(pw, ph);
                if pixels.len() == (pw * ph * 4) as usize {
                    blit_transformed(frame, fb_w, fb_h, clip, &pixels, pw, ph, r, xf);
                } else {
                    log::warn!("Overlay for {} painted {} bytes, expected {}x{}", record.id, pixels.len(), pw, ph);
                }
            }
            None => {}
        }
    }

    fn render_carousel(&self, frame: &mut [u32], fb_w: u32, fb_h: u32, now: Instant) {
        let track = self.carousel.track();
        fill(frame, fb_w, fb_h, track, (40, 40, 40, 255));
        let offset = self.shown_track.value(now);

        let slides: Vec<(Rect, Option<Arc<DecodedImage>>)> = {
            let cache = lock_cache(&self.shared);
            (0..self.carousel.len())
                .map(|i| (i, self.carousel.slide_rect(i, offset)))
                .filter(|(_, r)| r.x + r.width > track.x && r.x < track.x + track.width)
                .map(|(i, r)| {
                    let img = if self.carousel.is_loaded(i) { cache.get(i) } else { None };
                    (r, img)
                })
                .collect()
        };

        for (rect, img) in slides {
            match img {
                Some(img) => blit_cover(frame, fb_w, fb_h, track, &img.rgba_bytes, img.width, img.height, rect),
                None => fill(frame, fb_w, fb_h, clip_rect(rect, track), PLACEHOLDER),
            }
        }

        for (control, label) in [(CarouselControl::PreviousArrow, "<"), (CarouselControl::NextArrow, ">")] {
            if let Some(r) = self.carousel.control_rect(control) {
                fill(frame, fb_w, fb_h, r, (0, 0, 0, 128));
                draw_label(frame, fb_w, fb_h, r, label, TEXT_SCALE, WHITE);
            }
        }
        for i in 0..self.carousel.len() {
            if let Some(r) = self.carousel.control_rect(CarouselControl::Indicator(i)) {
                let alpha = if i == self.carousel.index() { 255 } else { 128 };
                fill(frame, fb_w, fb_h, r, (255, 255, 255, alpha));
            }
        }
    }
}

fn clip_rect(r: Rect, clip: Rect) -> Rect {
    let x0 = r.x.max(clip.x);
    let y0 = r.y.max(clip.y);
    let x1 = (r.x + r.width).min(clip.x + clip.width);
    let y1 = (r.y + r.height).min(clip.y + clip.height);
    Rect::new(x0, y0, (x1 - x0).max(0.0), (y1 - y0).max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eased_value_reaches_target() {
        let t0 = Instant::now();
        let mut e = Eased::new(0.0f32, t0);
        e.retarget(10.0, Transition::Eased(Duration::from_millis(200)), t0);
        let mid = e.value(t0 + Duration::from_millis(100));
        assert!(mid > 5.0 && mid < 10.0, "ease-out passes halfway early: {}", mid);
        assert!(!e.is_settled(t0 + Duration::from_millis(100)));
        assert_eq!(e.value(t0 + Duration::from_millis(200)), 10.0);
        assert!(e.is_settled(t0 + Duration::from_millis(250)));
    }

    #[test]
    fn immediate_transition_snaps() {
        let t0 = Instant::now();
        let mut e = Eased::new(0.0f32, t0);
        e.retarget(10.0, Transition::Eased(Duration::from_millis(200)), t0);
        e.retarget(-4.0, Transition::Immediate, t0 + Duration::from_millis(10));
        assert_eq!(e.value(t0 + Duration::from_millis(10)), -4.0);
        assert!(e.is_settled(t0));
    }

    #[test]
    fn retarget_mid_flight_starts_from_shown_value() {
        let t0 = Instant::now();
        let d = Duration::from_millis(200);
        let mut e = Eased::new(0.0f32, t0);
        e.retarget(10.0, Transition::Eased(d), t0);
        let t1 = t0 + Duration::from_millis(100);
        let shown = e.value(t1);
        e.retarget(20.0, Transition::Eased(d), t1);
        assert_eq!(e.value(t1), shown);
    }

    #[test]
    fn clip_rect_intersects() {
        let r = clip_rect(Rect::new(-10.0, 5.0, 50.0, 50.0), Rect::new(0.0, 0.0, 20.0, 20.0));
        assert_eq!(r, Rect::new(0.0, 5.0, 20.0, 15.0));
    }
}
