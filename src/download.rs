//! Save the displayed image to disk.
//!
//! Three strategies are tried in order, each falling through to the next on
//! any error:
//!
//! 1. encode the pixels currently on screen to PNG,
//! 2. copy the raw bytes of the source resource,
//! 3. hand the resource to the platform opener so the user can save it.
//!
//! Only the last one is visible to the user, through whatever the opener does.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::collection::{ImageRecord, local_path};
use crate::error::{Error, Result};

const DEFAULT_FILE_NAME: &str = "image";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub source: String,
    /// Base name without extension.
    pub file_name: String,
}

/// Title, else alt text, else `"image"`.
pub fn request_for(record: &ImageRecord) -> DownloadRequest {
    let name = record
        .title
        .as_deref()
        .or(record.alt_text.as_deref())
        .unwrap_or(DEFAULT_FILE_NAME);
    DownloadRequest {
        source: record.source.clone(),
        file_name: sanitize_file_name(name),
    }
}

pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let trimmed = cleaned.trim().trim_matches('.');
    if trimmed.is_empty() {
        DEFAULT_FILE_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// RGBA8 pixels of the image as displayed.
#[derive(Debug, Clone, Copy)]
pub struct CapturedPixels<'a> {
    pub rgba: &'a [u8],
    pub width: u32,
    pub height: u32,
}

pub trait ExternalOpener {
    fn open(&self, uri: &str) -> io::Result<()>;
}

/// Opens resources with the desktop's default handler.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemOpener;

impl ExternalOpener for SystemOpener {
    #[cfg(target_os = "windows")]
    fn open(&self, uri: &str) -> io::Result<()> {
        Command::new("cmd").args(["/C", "start", "", uri]).spawn().map(|_| ())
    }

    #[cfg(target_os = "macos")]
    fn open(&self, uri: &str) -> io::Result<()> {
        Command::new("open").arg(uri).spawn().map(|_| ())
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    fn open(&self, uri: &str) -> io::Result<()> {
        Command::new("xdg-open").arg(uri).spawn().map(|_| ())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Captured(PathBuf),
    Fetched(PathBuf),
    OpenedExternally,
    Failed,
}

pub fn run(
    request: &DownloadRequest,
    pixels: Option<CapturedPixels<'_>>,
    dest_dir: &Path,
    opener: &dyn ExternalOpener,
) -> DownloadOutcome {
    if let Some(pixels) = pixels {
        match capture(request, pixels, dest_dir) {
            Ok(path) => {
                log::info!("Saved {} from displayed pixels", path.display());
                return DownloadOutcome::Captured(path);
            }
            Err(e) => log::warn!("Pixel capture failed, trying source bytes: {}", e),
        }
    }

    match fetch(request, dest_dir) {
        Ok(path) => {
            log::info!("Saved {} from source bytes", path.display());
            return DownloadOutcome::Fetched(path);
        }
        Err(e) => log::warn!("Source fetch failed, opening externally: {}", e),
    }

    match opener.open(&request.source) {
        Ok(()) => DownloadOutcome::OpenedExternally,
        Err(e) => {
            log::warn!("Could not open {}: {}", request.source, e);
            DownloadOutcome::Failed
        }
    }
}

fn capture(request: &DownloadRequest, pixels: CapturedPixels<'_>, dest_dir: &Path) -> Result<PathBuf> {
    let expected = pixels.width as usize * pixels.height as usize * 4;
    if pixels.width == 0 || pixels.height == 0 || pixels.rgba.len() != expected {
        return Err(Error::Download(format!(
            "pixel buffer of {} bytes does not match {}x{}",
            pixels.rgba.len(),
            pixels.width,
            pixels.height
        )));
    }
    fs::create_dir_all(dest_dir)?;
    let path = unique_destination(dest_dir, &request.file_name, Some("png"));
    image::save_buffer_with_format(
        &path,
        pixels.rgba,
        pixels.width,
        pixels.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )?;
    Ok(path)
}

fn fetch(request: &DownloadRequest, dest_dir: &Path) -> Result<PathBuf> {
    let source = local_path(&request.source)?;
    let bytes = fs::read(&source)?;
    let ext = source.extension().and_then(|e| e.to_str());
    fs::create_dir_all(dest_dir)?;
    let path = unique_destination(dest_dir, &request.file_name, ext);
    fs::write(&path, bytes)?;
    Ok(path)
}

/// `dir/stem.ext`, or with a timestamp suffix if that already exists.
fn unique_destination(dir: &Path, stem: &str, ext: Option<&str>) -> PathBuf {
    let with_ext = |base: String| match ext {
        Some(ext) => format!("{}.{}", base, ext),
        None => base,
    };
    let plain = dir.join(with_ext(stem.to_string()));
    if !plain.exists() {
        return plain;
    }
    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    let mut candidate = dir.join(with_ext(format!("{}-{}", stem, stamp)));
    let mut n = 1;
    while candidate.exists() {
        candidate = dir.join(with_ext(format!("{}-{}-{}", stem, stamp, n)));
        n += 1;
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingOpener {
        opened: RefCell<Vec<String>>,
        fail: bool,
    }

    impl ExternalOpener for RecordingOpener {
        fn open(&self, uri: &str) -> io::Result<()> {
            self.opened.borrow_mut().push(uri.to_string());
            if self.fail {
                Err(io::Error::other("no handler"))
            } else {
                Ok(())
            }
        }
    }

    fn request(source: &str) -> DownloadRequest {
        DownloadRequest {
            source: source.to_string(),
            file_name: "shot".to_string(),
        }
    }

    #[test]
    fn file_name_prefers_title_then_alt() {
        let r = ImageRecord::new("a", "a.png").with_alt_text("alt: text");
        assert_eq!(request_for(&r).file_name, "alt_ text");
        let r = r.with_title("Beach / Day 1");
        assert_eq!(request_for(&r).file_name, "Beach _ Day 1");
        assert_eq!(request_for(&ImageRecord::new("b", "b.png")).file_name, "image");
        assert_eq!(sanitize_file_name(" .. "), "image");
    }

    #[test]
    fn capture_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let rgba = vec![255u8; 2 * 2 * 4];
        let pixels = CapturedPixels { rgba: &rgba, width: 2, height: 2 };
        let opener = RecordingOpener::default();

        let outcome = run(&request("missing.png"), Some(pixels), dir.path(), &opener);
        let DownloadOutcome::Captured(path) = outcome else {
            panic!("expected capture, got {:?}", outcome);
        };
        assert_eq!(path, dir.path().join("shot.png"));
        let decoded = image::open(&path).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (2, 2));
        assert!(opener.opened.borrow().is_empty());
    }

    #[test]
    fn bad_pixels_fall_back_to_source_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("orig.jpg");
        fs::write(&src, b"not really a jpeg").unwrap();
        let out_dir = dir.path().join("out");
        let rgba = vec![0u8; 3];
        let pixels = CapturedPixels { rgba: &rgba, width: 2, height: 2 };

        let outcome = run(
            &request(&src.display().to_string()),
            Some(pixels),
            &out_dir,
            &RecordingOpener::default(),
        );
        assert_eq!(outcome, DownloadOutcome::Fetched(out_dir.join("shot.jpg")));
        assert_eq!(fs::read(out_dir.join("shot.jpg")).unwrap(), b"not really a jpeg");
    }

    #[test]
    fn remote_source_opens_externally() {
        let dir = tempfile::tempdir().unwrap();
        let opener = RecordingOpener::default();
        let outcome = run(&request("https://example.com/a.png"), None, dir.path(), &opener);
        assert_eq!(outcome, DownloadOutcome::OpenedExternally);
        assert_eq!(*opener.opened.borrow(), vec!["https://example.com/a.png".to_string()]);
    }

    #[test]
    fn all_tiers_failing_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let opener = RecordingOpener { fail: true, ..Default::default() };
        let outcome = run(&request("https://example.com/a.png"), None, dir.path(), &opener);
        assert_eq!(outcome, DownloadOutcome::Failed);
    }

    #[test]
    fn existing_files_are_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("shot.png"), b"old").unwrap();
        let path = unique_destination(dir.path(), "shot", Some("png"));
        assert_ne!(path, dir.path().join("shot.png"));
        assert!(path.file_name().unwrap().to_str().unwrap().starts_with("shot-"));
    }
}
