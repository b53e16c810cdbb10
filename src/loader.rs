use image::GenericImageView;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use winit::event_loop::EventLoopProxy;

use ivgal::collection::{ImageCollection, Overlay, local_path};
use ivgal::download::DownloadOutcome;
use ivgal::error::Result;

/// Longest side of a decoded gallery thumbnail.
pub const THUMBNAIL_SIZE: u32 = 400;

// ---------------------------------------------------------------------------
// Decoded image data
// ---------------------------------------------------------------------------

pub struct DecodedImage {
    pub rgba_bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub file_size: u64,
    pub format_name: String,
}

impl DecodedImage {
    pub fn mem_size(&self) -> u64 {
        self.rgba_bytes.len() as u64
    }
}

pub fn decode_image(source: &str, target_size: Option<(u32, u32)>) -> Result<DecodedImage> {
    let path = local_path(source)?;
    let file_size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
    let img = image::open(&path)?;
    let format_name = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("unknown")
        .to_uppercase();

    let final_img = match target_size {
        Some((w, h)) => img.thumbnail(w, h),
        None => img,
    };
    let (width, height) = final_img.dimensions();
    Ok(DecodedImage {
        rgba_bytes: final_img.to_rgba8().into_raw(),
        width,
        height,
        file_size,
        format_name,
    })
}

// ---------------------------------------------------------------------------
// Cache state (shared between UI and worker threads via Mutex + Condvar)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Gallery,
    Viewer,
    Carousel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkType {
    Full,
    Thumbnail,
    Overlay,
}

pub struct CacheState {
    pub current_idx: usize,
    pub mode: ViewMode,

    pub images: HashMap<usize, Arc<DecodedImage>>,
    pub thumbnails: HashMap<usize, Arc<DecodedImage>>,
    pub overlays: HashMap<usize, Arc<DecodedImage>>,

    /// Work the UI needs right now, in order; checked before background prefetch.
    pub priority: Vec<(usize, WorkType)>,
    pub in_progress: HashSet<(usize, WorkType)>,
    pub errors: HashMap<usize, String>,
    pub thumbnail_errors: HashSet<usize>,
    pub overlay_errors: HashSet<usize>,

    pub used_bytes: u64,
    pub budget: u64,
    pub file_count: usize,

    /// Indices that were decoded but couldn't be kept (cache full, too far).
    pub saturated: HashSet<usize>,
}

pub type SharedState = Arc<(Mutex<CacheState>, Condvar)>;

/// Lock the cache, recovering the data if a worker panicked while holding it.
pub fn lock_cache(shared: &SharedState) -> MutexGuard<'_, CacheState> {
    shared.0.lock().unwrap_or_else(PoisonError::into_inner)
}

fn distance(a: usize, b: usize) -> usize {
    a.abs_diff(b)
}

impl CacheState {
    pub fn new(budget: u64, file_count: usize, mode: ViewMode) -> Self {
        Self {
            current_idx: 0,
            mode,
            images: HashMap::new(),
            thumbnails: HashMap::new(),
            overlays: HashMap::new(),
            priority: Vec::new(),
            in_progress: HashSet::new(),
            errors: HashMap::new(),
            thumbnail_errors: HashSet::new(),
            overlay_errors: HashSet::new(),
            used_bytes: 0,
            budget,
            file_count,
            saturated: HashSet::new(),
        }
    }

    pub fn set_current_idx(&mut self, idx: usize) {
        if idx != self.current_idx {
            self.current_idx = idx;
            self.saturated.clear();
        }
    }

    pub fn set_mode(&mut self, mode: ViewMode) {
        self.mode = mode;
    }

    pub fn set_priority(&mut self, priority: Vec<(usize, WorkType)>) {
        self.priority = priority;
    }

    pub fn get(&self, idx: usize) -> Option<Arc<DecodedImage>> {
        self.images.get(&idx).cloned()
    }

    pub fn get_thumbnail(&self, idx: usize) -> Option<Arc<DecodedImage>> {
        self.thumbnails.get(&idx).cloned()
    }

    pub fn get_overlay(&self, idx: usize) -> Option<Arc<DecodedImage>> {
        self.overlays.get(&idx).cloned()
    }

    /// Average decoded image size in bytes (fallback: ~8 MB).
    fn avg_image_size(&self) -> u64 {
        if self.images.is_empty() {
            8 * 1024 * 1024
        } else {
            self.used_bytes.max(1) / self.images.len().max(1) as u64
        }
    }

    pub fn is_available(&self, idx: usize, wtype: WorkType) -> bool {
        if idx >= self.file_count || self.in_progress.contains(&(idx, wtype)) {
            return false;
        }
        match wtype {
            WorkType::Full => {
                !self.images.contains_key(&idx)
                    && !self.errors.contains_key(&idx)
                    && !self.saturated.contains(&idx)
            }
            WorkType::Thumbnail => {
                !self.thumbnails.contains_key(&idx) && !self.thumbnail_errors.contains(&idx)
            }
            WorkType::Overlay => {
                !self.overlays.contains_key(&idx) && !self.overlay_errors.contains(&idx)
            }
        }
    }

    fn farthest_cached(&self) -> Option<(usize, usize)> {
        self.images
            .keys()
            .filter(|&&i| i != self.current_idx)
            .map(|&i| (i, distance(i, self.current_idx)))
            .max_by_key(|&(_, d)| d)
    }

    /// Next job for a worker: queued priorities first, then background fill.
    pub fn find_work(&self) -> Option<(usize, WorkType)> {
        if let Some(job) = self
            .priority
            .iter()
            .copied()
            .find(|&(idx, wtype)| self.is_available(idx, wtype))
        {
            return Some(job);
        }
        match self.mode {
            ViewMode::Viewer => self.find_prefetch(),
            ViewMode::Gallery => self.find_thumbnail(),
            ViewMode::Carousel => None,
        }
    }

    /// Full images outward from the current one while the budget allows,
    /// two forward for every one backward.
    fn find_prefetch(&self) -> Option<(usize, WorkType)> {
        if self.is_available(self.current_idx, WorkType::Full) {
            return Some((self.current_idx, WorkType::Full));
        }

        let avg = self.avg_image_size();
        let pending_bytes = self
            .in_progress
            .iter()
            .filter(|(_, t)| *t == WorkType::Full)
            .count() as u64
            * avg;
        let over_budget = self.used_bytes + pending_bytes + avg > self.budget;
        let farthest = if over_budget {
            self.farthest_cached().map(|(_, d)| d).unwrap_or(0)
        } else {
            usize::MAX
        };

        const MAX_SCAN: usize = 2000;
        let candidate = |idx: usize| -> bool {
            self.is_available(idx, WorkType::Full) && distance(idx, self.current_idx) < farthest
        };

        let mut fwd = 1;
        let mut bwd = 1;
        let mut fwd_done = false;
        let mut bwd_done = false;
        while !(fwd_done && bwd_done) && (fwd < MAX_SCAN || bwd < MAX_SCAN) {
            for _ in 0..2 {
                let idx = self.current_idx + fwd;
                if fwd_done || idx >= self.file_count || fwd >= MAX_SCAN {
                    fwd_done = true;
                    break;
                }
                if self.saturated.contains(&idx) {
                    fwd_done = true;
                } else if candidate(idx) {
                    return Some((idx, WorkType::Full));
                }
                fwd += 1;
            }
            if !bwd_done {
                match self.current_idx.checked_sub(bwd) {
                    Some(idx) if bwd < MAX_SCAN && !self.saturated.contains(&idx) => {
                        if candidate(idx) {
                            return Some((idx, WorkType::Full));
                        }
                        bwd += 1;
                    }
                    _ => bwd_done = true,
                }
            }
        }
        None
    }

    /// Thumbnails spiralling out from the current index, backward first so
    /// the grid fills top to bottom.
    fn find_thumbnail(&self) -> Option<(usize, WorkType)> {
        for i in 0..self.file_count {
            if i > 0 {
                if let Some(bwd) = self.current_idx.checked_sub(i) {
                    if self.is_available(bwd, WorkType::Thumbnail) {
                        return Some((bwd, WorkType::Thumbnail));
                    }
                }
            }
            let fwd = self.current_idx + i;
            if fwd < self.file_count && self.is_available(fwd, WorkType::Thumbnail) {
                return Some((fwd, WorkType::Thumbnail));
            }
        }
        None
    }

    pub fn insert(&mut self, idx: usize, decoded: DecodedImage, wtype: WorkType) {
        match wtype {
            WorkType::Full => {
                let wanted = self.priority.contains(&(idx, WorkType::Full));
                if idx != self.current_idx
                    && !wanted
                    && self.used_bytes + decoded.mem_size() > self.budget
                {
                    let my_dist = distance(idx, self.current_idx);
                    let farthest = self.farthest_cached().map(|(_, d)| d).unwrap_or(0);
                    if my_dist >= farthest {
                        self.saturated.insert(idx);
                        return;
                    }
                }
                if let Some(old) = self.images.remove(&idx) {
                    self.used_bytes -= old.mem_size();
                }
                self.used_bytes += decoded.mem_size();
                self.images.insert(idx, Arc::new(decoded));
                self.evict_distant();
            }
            WorkType::Thumbnail => {
                self.thumbnails.insert(idx, Arc::new(decoded));
            }
            WorkType::Overlay => {
                self.overlays.insert(idx, Arc::new(decoded));
            }
        }
    }

    pub fn record_error(&mut self, idx: usize, wtype: WorkType, message: String) {
        match wtype {
            WorkType::Full => {
                self.errors.insert(idx, message);
            }
            WorkType::Thumbnail => {
                self.thumbnail_errors.insert(idx);
            }
            WorkType::Overlay => {
                self.overlay_errors.insert(idx);
            }
        }
    }

    fn evict_distant(&mut self) {
        while self.used_bytes > self.budget && self.images.len() > 1 {
            let farthest = self
                .images
                .keys()
                .filter(|&&idx| idx != self.current_idx && !self.priority.contains(&(idx, WorkType::Full)))
                .max_by_key(|&&idx| distance(idx, self.current_idx))
                .copied();
            match farthest {
                Some(evict_idx) => {
                    if let Some(img) = self.images.remove(&evict_idx) {
                        self.used_bytes -= img.mem_size();
                    }
                }
                None => break,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// User event for waking the UI from worker threads
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum UserEvent {
    ImageReady(usize),
    ThumbnailReady(usize),
    OverlayReady(usize),
    DownloadFinished(DownloadOutcome),
}

// ---------------------------------------------------------------------------
// Background decode workers
// ---------------------------------------------------------------------------

/// Source to decode for a job, if the record has one.
fn job_source(collection: &ImageCollection, idx: usize, wtype: WorkType) -> Option<String> {
    let record = collection.get(idx)?;
    match wtype {
        WorkType::Full | WorkType::Thumbnail => Some(record.source.clone()),
        WorkType::Overlay => match &record.overlay {
            Some(Overlay::Url(url)) => Some(url.clone()),
            _ => None,
        },
    }
}

pub fn spawn_decode_workers(
    shared: SharedState,
    collection: Arc<ImageCollection>,
    proxy: EventLoopProxy<UserEvent>,
    num_threads: usize,
) {
    for _ in 0..num_threads {
        let shared = Arc::clone(&shared);
        let collection = Arc::clone(&collection);
        let proxy = proxy.clone();
        thread::spawn(move || loop {
            let (idx, wtype) = {
                let (_, cvar) = &*shared;
                let mut state = lock_cache(&shared);
                loop {
                    if let Some(job) = state.find_work() {
                        state.in_progress.insert(job);
                        break job;
                    }
                    state = cvar.wait(state).unwrap_or_else(PoisonError::into_inner);
                }
            };

            let result = match job_source(&collection, idx, wtype) {
                Some(source) => {
                    let target = match wtype {
                        WorkType::Thumbnail => Some((THUMBNAIL_SIZE, THUMBNAIL_SIZE)),
                        WorkType::Full | WorkType::Overlay => None,
                    };
                    decode_image(&source, target).map_err(|e| format!("{}: {}", source, e))
                }
                None => Err(format!("image {} has no decodable {:?} source", idx, wtype)),
            };

            {
                let (_, cvar) = &*shared;
                let mut state = lock_cache(&shared);
                state.in_progress.remove(&(idx, wtype));
                match result {
                    Ok(decoded) => state.insert(idx, decoded, wtype),
                    Err(e) => {
                        log::warn!("Decode failed: {}", e);
                        state.record_error(idx, wtype, e);
                    }
                }
                cvar.notify_all();
            }

            let event = match wtype {
                WorkType::Full => UserEvent::ImageReady(idx),
                WorkType::Thumbnail => UserEvent::ThumbnailReady(idx),
                WorkType::Overlay => UserEvent::OverlayReady(idx),
            };
            if proxy.send_event(event).is_err() {
                // Event loop is gone; nothing left to decode for.
                return;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decoded(bytes: usize) -> DecodedImage {
        DecodedImage {
            rgba_bytes: vec![0; bytes],
            width: 1,
            height: 1,
            file_size: 0,
            format_name: "PNG".into(),
        }
    }

    #[test]
    fn priority_jobs_come_first() {
        let mut s = CacheState::new(1 << 30, 10, ViewMode::Viewer);
        s.set_current_idx(4);
        s.set_priority(vec![(4, WorkType::Overlay), (4, WorkType::Full)]);
        assert_eq!(s.find_work(), Some((4, WorkType::Overlay)));
        s.in_progress.insert((4, WorkType::Overlay));
        assert_eq!(s.find_work(), Some((4, WorkType::Full)));
        s.insert(4, decoded(16), WorkType::Full);
        assert_eq!(s.find_work(), Some((5, WorkType::Full)));
    }

    #[test]
    fn gallery_fills_thumbnails_and_carousel_waits() {
        let mut s = CacheState::new(1 << 30, 3, ViewMode::Gallery);
        assert_eq!(s.find_work(), Some((0, WorkType::Thumbnail)));
        s.record_error(0, WorkType::Thumbnail, "bad".into());
        assert_eq!(s.find_work(), Some((1, WorkType::Thumbnail)));

        s.set_mode(ViewMode::Carousel);
        assert_eq!(s.find_work(), None);
        s.set_priority(vec![(2, WorkType::Full)]);
        assert_eq!(s.find_work(), Some((2, WorkType::Full)));
    }

    #[test]
    fn budget_evicts_farthest() {
        let mut s = CacheState::new(100, 10, ViewMode::Viewer);
        s.insert(0, decoded(40), WorkType::Full);
        s.insert(5, decoded(40), WorkType::Full);
        s.insert(1, decoded(40), WorkType::Full);
        assert!(s.used_bytes <= 100);
        assert!(s.images.contains_key(&0) && s.images.contains_key(&1));
        assert!(!s.images.contains_key(&5));

        s.insert(8, decoded(40), WorkType::Full);
        assert!(s.saturated.contains(&8));
        assert!(!s.is_available(8, WorkType::Full));
    }

    #[test]
    fn missing_overlay_source_is_an_error() {
        let c = ImageCollection::new(vec![ivgal::collection::ImageRecord::new("a", "a.png")]);
        assert!(job_source(&c, 0, WorkType::Overlay).is_none());
        assert_eq!(job_source(&c, 0, WorkType::Full).as_deref(), Some("a.png"));
        assert!(job_source(&c, 3, WorkType::Full).is_none());
    }
}
