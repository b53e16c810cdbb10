//! Building an [`ImageCollection`] from the command line: explicit paths,
//! directory scans, a text file list, or a TOML manifest.

use std::fs;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Deserialize;

use ivgal::collection::{ImageCollection, ImageRecord, Overlay, OverlayPosition, OverlaySize};
use ivgal::error::{Error, Result};

const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "tga", "tiff", "tif", "webp", "ico", "pnm", "pbm",
    "pgm", "ppm", "pam", "dds", "hdr", "exr", "ff", "qoi",
];

pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn is_skipped_link(p: &Path, follow_links: bool) -> bool {
    !follow_links
        && fs::symlink_metadata(p)
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Path scanning
// ---------------------------------------------------------------------------

/// Image files named by `paths` and `file_list`, in command-line order.
///
/// Directories contribute their images sorted by name; with `recursive`
/// subdirectories follow, also sorted.
pub fn collect_images(
    paths: &[PathBuf],
    file_list: Option<&Path>,
    recursive: bool,
    follow_links: bool,
) -> Vec<PathBuf> {
    let start_time = Instant::now();
    let mut out = Vec::new();

    if let Some(list_path) = file_list {
        match fs::File::open(list_path) {
            Ok(file) => read_file_list(io::BufReader::new(file), follow_links, &mut out),
            Err(e) => log::warn!("Cannot read file list {}: {}", list_path.display(), e),
        }
    }

    for path in paths {
        if is_skipped_link(path, follow_links) {
            continue;
        }
        if path.is_dir() {
            scan_dir(path, recursive, follow_links, &mut out);
        } else if path.is_file() && is_image_file(path) {
            out.push(path.clone());
        } else {
            log::warn!("Skipping {}: not an image file or directory", path.display());
        }
    }

    log::info!(
        "Scan complete in {:.2}s. Found {} images.",
        start_time.elapsed().as_secs_f64(),
        out.len()
    );
    out
}

/// One path per line; columns separated by tabs or double spaces are each
/// tried, then whitespace-separated words.
fn read_file_list<R: BufRead>(reader: R, follow_links: bool, out: &mut Vec<PathBuf>) {
    for line in reader.lines().map_while(|l| l.ok()) {
        for tab_part in line.split('\t') {
            for part in tab_part.split("  ") {
                let trimmed = part.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let p = PathBuf::from(trimmed);
                if is_skipped_link(&p, follow_links) {
                    continue;
                }
                if p.is_file() {
                    if is_image_file(&p) {
                        out.push(p);
                    }
                    continue;
                }
                for sub in trimmed.split_whitespace() {
                    let sub_p = PathBuf::from(sub);
                    if !is_skipped_link(&sub_p, follow_links) && sub_p.is_file() && is_image_file(&sub_p) {
                        out.push(sub_p);
                    }
                }
            }
        }
    }
}

fn scan_dir(dir: &Path, recursive: bool, follow_links: bool, out: &mut Vec<PathBuf>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("Cannot read {}: {}", dir.display(), e);
            return;
        }
    };
    let mut files = Vec::new();
    let mut subdirs = Vec::new();

    for entry in entries.filter_map(|e| e.ok()) {
        let Ok(ft) = entry.file_type() else {
            continue;
        };
        if ft.is_symlink() && !follow_links {
            continue;
        }
        let p = entry.path();
        if p.is_file() && is_image_file(&p) {
            files.push(p);
        } else if recursive && p.is_dir() {
            subdirs.push(p);
        }
    }

    files.sort();
    if !files.is_empty() {
        log::debug!("Scanned {:?}: {} images", dir, files.len());
        out.extend(files);
    }

    if recursive {
        subdirs.sort();
        for sub in subdirs {
            scan_dir(&sub, true, follow_links, out);
        }
    }
}

/// Manifest entries first, then scanned files. Fails when nothing is left.
pub fn build_collection(
    manifest: Option<&Path>,
    paths: &[PathBuf],
    file_list: Option<&Path>,
    recursive: bool,
    follow_links: bool,
) -> Result<ImageCollection> {
    let mut records: Vec<ImageRecord> = match manifest {
        Some(m) => load_manifest(m)?.iter().cloned().collect(),
        None => Vec::new(),
    };
    if !paths.is_empty() || file_list.is_some() {
        let files = collect_images(paths, file_list, recursive, follow_links);
        records.extend(files.into_iter().map(ImageRecord::from_path));
    }
    if records.is_empty() {
        return Err(Error::NoImages);
    }
    Ok(records.into())
}

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default)]
    image: Vec<ManifestEntry>,
}

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    id: Option<String>,
    source: String,
    alt_text: Option<String>,
    title: Option<String>,
    overlay_url: Option<String>,
    #[serde(default)]
    overlay_position: OverlayPosition,
    #[serde(default)]
    overlay_size: OverlaySize,
}

impl ManifestEntry {
    fn into_record(self, base: Option<&Path>) -> ImageRecord {
        let source = resolve_source(self.source, base);
        let overlay_url = self.overlay_url.map(|u| resolve_source(u, base));
        ImageRecord {
            id: self.id.unwrap_or_else(|| source.clone()),
            source,
            alt_text: self.alt_text,
            title: self.title,
            overlay: overlay_url.map(Overlay::Url),
            overlay_position: self.overlay_position,
            overlay_size: self.overlay_size,
        }
    }
}

/// Relative local sources are taken relative to the manifest's directory.
fn resolve_source(source: String, base: Option<&Path>) -> String {
    if source.contains("://") {
        return source;
    }
    match base {
        Some(dir) if Path::new(&source).is_relative() => dir.join(&source).display().to_string(),
        _ => source,
    }
}

/// Parse a manifest document. Relative sources resolve against `base`.
pub fn parse_manifest(contents: &str, base: Option<&Path>) -> Result<ImageCollection> {
    let manifest: Manifest = toml::from_str(contents).map_err(|e| Error::Manifest(e.to_string()))?;
    let records: Vec<ImageRecord> = manifest
        .image
        .into_iter()
        .map(|entry| entry.into_record(base))
        .collect();
    Ok(ImageCollection::new(records))
}

pub fn load_manifest(path: &Path) -> Result<ImageCollection> {
    let contents = fs::read_to_string(path)?;
    let collection = parse_manifest(&contents, path.parent())?;
    log::info!("Loaded {} images from manifest {}", collection.len(), path.display());
    Ok(collection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ivgal::collection::Dimension;

    #[test]
    fn manifest_fills_defaults() {
        let doc = r#"
            [[image]]
            source = "a.png"

            [[image]]
            id = "beach"
            source = "https://example.com/beach.jpg"
            title = "Beach"
            alt_text = "sand"
            overlay_url = "marks.png"
            overlay_position = "top-right"
            overlay_size = { width = "40%", max_height = 120 }
        "#;
        let c = parse_manifest(doc, Some(Path::new("/albums"))).unwrap();
        assert_eq!(c.len(), 2);

        let a = c.get(0).unwrap();
        assert_eq!(a.source, Path::new("/albums").join("a.png").display().to_string());
        assert_eq!(a.id, a.source);
        assert!(!a.has_overlay());

        let b = c.get(1).unwrap();
        assert_eq!(b.id, "beach");
        assert_eq!(b.source, "https://example.com/beach.jpg");
        assert_eq!(b.overlay_position, OverlayPosition::TopRight);
        assert_eq!(b.overlay_size.width, Some(Dimension::Percent(40.0)));
        assert_eq!(b.overlay_size.max_height, Some(Dimension::Px(120.0)));
        assert!(matches!(&b.overlay, Some(Overlay::Url(u)) if u.ends_with("marks.png")));
    }

    #[test]
    fn malformed_manifest_is_reported() {
        let err = parse_manifest("[[image]]\ntitle = 3\n", None).unwrap_err();
        assert!(matches!(err, Error::Manifest(_)));
    }

    #[test]
    fn scan_sorts_and_filters() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.png", "a.JPG", "notes.txt"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        fs::write(sub.join("c.webp"), b"x").unwrap();

        let flat = collect_images(&[dir.path().to_path_buf()], None, false, false);
        assert_eq!(flat, vec![dir.path().join("a.JPG"), dir.path().join("b.png")]);

        let deep = collect_images(&[dir.path().to_path_buf()], None, true, false);
        assert_eq!(deep.len(), 3);
        assert_eq!(deep[2], sub.join("c.webp"));
    }

    #[test]
    fn build_collection_merges_manifest_and_paths() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("z.png"), b"x").unwrap();
        let manifest = dir.path().join("album.toml");
        fs::write(&manifest, "[[image]]\nid = \"first\"\nsource = \"remote.png\"\n").unwrap();

        let c = build_collection(Some(&manifest), &[dir.path().join("z.png")], None, false, false).unwrap();
        assert_eq!(c.len(), 2);
        assert_eq!(c.get(0).unwrap().id, "first");
        assert_eq!(c.get(1).unwrap().title.as_deref(), Some("z.png"));
    }

    #[test]
    fn build_collection_without_images_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = build_collection(None, &[dir.path().to_path_buf()], None, false, false).unwrap_err();
        assert!(matches!(err, Error::NoImages));
    }

    #[test]
    fn file_list_accepts_columns() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.png");
        fs::write(&a, b"x").unwrap();
        fs::write(&b, b"x").unwrap();
        let list = dir.path().join("list.txt");
        fs::write(&list, format!("{}\t1234\n\n{}  extra\n", a.display(), b.display())).unwrap();

        let found = collect_images(&[], Some(&list), false, false);
        assert_eq!(found, vec![a, b]);
    }
}
