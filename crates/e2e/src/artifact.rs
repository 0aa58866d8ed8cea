//! Screenshot capture and GIF assembly

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use image::codecs::gif::{GifEncoder, Repeat};
use image::imageops::{self, FilterType};
use image::{Delay, Frame, RgbaImage};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::error::{E2eError, E2eResult};
use crate::session::BrowserSession;

const FRAME_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Largest index a three-digit sequence prefix can hold
pub const MAX_SEQUENCE_FRAMES: u32 = 999;

/// Reduce a label to a filesystem-safe file stem
pub fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' => c,
            _ => '_',
        })
        .collect();
    if cleaned.is_empty() {
        "screenshot".to_string()
    } else {
        cleaned
    }
}

/// `dir/stem.ext`, or `dir/stem_N.ext` for the first N that is not taken
pub fn unique_path(dir: &Path, stem: &str, ext: &str) -> PathBuf {
    let first = dir.join(format!("{}.{}", stem, ext));
    if !first.exists() {
        return first;
    }
    (1u32..)
        .map(|n| dir.join(format!("{}_{}.{}", stem, n, ext)))
        .find(|p| !p.exists())
        .unwrap_or(first)
}

/// Create `parent/stem`, or `parent/stem_N` for the first N that is not taken
pub fn create_unique_dir(parent: &Path, stem: &str) -> E2eResult<PathBuf> {
    std::fs::create_dir_all(parent)?;
    let mut n = 0u32;
    loop {
        let dir = if n == 0 {
            parent.join(stem)
        } else {
            parent.join(format!("{}_{}", stem, n))
        };
        match std::fs::create_dir(&dir) {
            Ok(()) => return Ok(dir),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => n += 1,
            Err(e) => return Err(e.into()),
        }
    }
}

/// Save a screenshot as `dir/<name>.png` without overwriting earlier captures
pub fn save_screenshot(session: &dyn BrowserSession, dir: &Path, name: &str) -> E2eResult<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = unique_path(dir, &sanitize_name(name), "png");
    session.save_screenshot(&path)?;
    debug!("Screenshot saved: {}", path.display());
    Ok(path)
}

/// Best-effort screenshot after a failure. Problems are logged, never raised.
pub fn capture_failure(session: &dyn BrowserSession, dir: &Path, name: &str) -> Option<PathBuf> {
    let stem = format!("failure_{}_{}", name, Utc::now().format("%Y%m%d_%H%M%S"));
    match save_screenshot(session, dir, &stem) {
        Ok(path) => {
            info!("Failure screenshot saved: {}", path.display());
            Some(path)
        }
        Err(e) => {
            error!("Could not capture failure screenshot for {}: {}", name, e);
            None
        }
    }
}

fn hash_file(path: &Path) -> E2eResult<String> {
    let data = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}

/// One captured frame of a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenshotArtifact {
    pub path: PathBuf,
    pub sequence_index: u32,
    pub timestamp: DateTime<Utc>,
    pub sha256: String,
}

/// Numbered captures whose file names sort in capture order.
///
/// Files are named `<NNN>_<label>.png`. Concurrent runs must use distinct
/// directories.
#[derive(Debug)]
pub struct ScreenshotSequence {
    dir: PathBuf,
    next: u32,
    captured: Vec<ScreenshotArtifact>,
}

impl ScreenshotSequence {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            next: 1,
            captured: Vec::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Capture the next frame. Fails once the three-digit prefix is used up.
    pub fn capture(&mut self, session: &dyn BrowserSession, label: &str) -> E2eResult<ScreenshotArtifact> {
        if self.next > MAX_SEQUENCE_FRAMES {
            return Err(E2eError::SequenceFull {
                dir: self.dir.clone(),
                max: MAX_SEQUENCE_FRAMES,
            });
        }
        let name = format!("{:03}_{}", self.next, sanitize_name(label));
        let path = save_screenshot(session, &self.dir, &name)?;
        let artifact = ScreenshotArtifact {
            sha256: hash_file(&path)?,
            path,
            sequence_index: self.next,
            timestamp: Utc::now(),
        };
        self.next += 1;
        self.captured.push(artifact.clone());
        Ok(artifact)
    }

    pub fn artifacts(&self) -> &[ScreenshotArtifact] {
        &self.captured
    }

    pub fn into_artifacts(self) -> Vec<ScreenshotArtifact> {
        self.captured
    }
}

/// An encoded animation. Written once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GifArtifact {
    pub path: PathBuf,
    pub frame_count: usize,
    pub per_frame_duration: Duration,
}

/// Turns a directory of screenshots into a looping GIF
#[derive(Debug, Clone)]
pub struct GifAssembler {
    output_dir: PathBuf,
    frame_duration: Duration,
}

impl GifAssembler {
    pub fn new(output_dir: impl Into<PathBuf>, frame_duration: Duration) -> Self {
        Self {
            output_dir: output_dir.into(),
            frame_duration,
        }
    }

    /// Image files directly inside `dir`, in file name order
    pub fn frame_paths(dir: &Path) -> E2eResult<Vec<PathBuf>> {
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut paths = Vec::new();
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let is_frame = entry
                .path()
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| FRAME_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if is_frame {
                paths.push(entry.into_path());
            }
        }
        Ok(paths)
    }

    /// Encode every frame in `screenshot_dir` into `<output_dir>/<name>.gif`.
    ///
    /// Frames keep file name order; those sized differently from the first
    /// are scaled to match. Source files are only read. Fails with
    /// `NoFrames` before creating any file when nothing decodes.
    pub fn assemble(&self, screenshot_dir: &Path, name: &str) -> E2eResult<GifArtifact> {
        let mut frames: Vec<RgbaImage> = Vec::new();
        for path in Self::frame_paths(screenshot_dir)? {
            match image::open(&path) {
                Ok(img) => frames.push(img.to_rgba8()),
                Err(e) => warn!("Skipping unreadable frame {}: {}", path.display(), e),
            }
        }

        let (width, height) = match frames.first() {
            Some(first) => first.dimensions(),
            None => return Err(E2eError::NoFrames(screenshot_dir.to_path_buf())),
        };

        std::fs::create_dir_all(&self.output_dir)?;
        let path = unique_path(&self.output_dir, &sanitize_name(name), "gif");
        let delay_ms = u32::try_from(self.frame_duration.as_millis()).unwrap_or(u32::MAX);
        let frame_count = frames.len();

        {
            let file = File::create(&path)?;
            let mut encoder = GifEncoder::new(BufWriter::new(file));
            encoder.set_repeat(Repeat::Infinite)?;
            for img in frames {
                let img = if img.dimensions() == (width, height) {
                    img
                } else {
                    imageops::resize(&img, width, height, FilterType::Triangle)
                };
                let frame = Frame::from_parts(img, 0, 0, Delay::from_numer_denom_ms(delay_ms, 1));
                encoder.encode_frame(frame)?;
            }
        }

        info!("GIF created with {} frames: {}", frame_count, path.display());
        Ok(GifArtifact {
            path,
            frame_count,
            per_frame_duration: self.frame_duration,
        })
    }

    /// Like [`assemble`](Self::assemble) but an empty directory only logs a warning
    pub fn assemble_or_warn(&self, screenshot_dir: &Path, name: &str) -> E2eResult<Option<GifArtifact>> {
        match self.assemble(screenshot_dir, name) {
            Ok(gif) => Ok(Some(gif)),
            Err(E2eError::NoFrames(dir)) => {
                warn!("No screenshots found in {}, skipping GIF", dir.display());
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeBrowser;
    use image::{AnimationDecoder, Rgba};
    use image::codecs::gif::GifDecoder;

    fn write_png(dir: &Path, name: &str, w: u32, h: u32, shade: u8) {
        RgbaImage::from_pixel(w, h, Rgba([shade, shade, shade, 255]))
            .save(dir.join(name))
            .unwrap();
    }

    fn decode(path: &Path) -> Vec<image::Frame> {
        let file = File::open(path).unwrap();
        GifDecoder::new(std::io::BufReader::new(file))
            .unwrap()
            .into_frames()
            .collect_frames()
            .unwrap()
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("home page/1"), "home_page_1");
        assert_eq!(sanitize_name("  "), "screenshot");
        assert_eq!(sanitize_name("ok-name_2"), "ok-name_2");
    }

    #[test]
    fn test_unique_path_avoids_collisions() {
        let dir = tempfile::tempdir().unwrap();
        let first = unique_path(dir.path(), "shot", "png");
        std::fs::write(&first, b"x").unwrap();
        let second = unique_path(dir.path(), "shot", "png");
        assert_eq!(second.file_name().unwrap(), "shot_1.png");
    }

    #[test]
    fn test_five_frames_in_name_order() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        // written out of order on purpose
        for name in ["03.png", "01.png", "05.png", "02.png", "04.png"] {
            let shade = name[..2].parse::<u8>().unwrap() * 40;
            write_png(src.path(), name, 8, 8, shade);
        }

        let assembler = GifAssembler::new(out.path(), Duration::from_millis(1000));
        let gif = assembler.assemble(src.path(), "run").unwrap();
        assert_eq!(gif.frame_count, 5);
        assert_eq!(gif.path, out.path().join("run.gif"));

        let frames = decode(&gif.path);
        assert_eq!(frames.len(), 5);
        let shades: Vec<u8> = frames.iter().map(|f| f.buffer().get_pixel(0, 0)[0]).collect();
        assert!(shades.windows(2).all(|w| w[0] < w[1]), "frames out of order: {:?}", shades);
        let (numer, denom) = frames[0].delay().numer_denom_ms();
        assert_eq!(numer / denom, 1000);
    }

    #[test]
    fn test_empty_dir_is_no_frames_and_writes_nothing() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let assembler = GifAssembler::new(out.path().join("gifs"), Duration::from_millis(500));

        let err = assembler.assemble(src.path(), "empty").unwrap_err();
        assert!(matches!(err, E2eError::NoFrames(_)));
        assert!(!out.path().join("gifs").exists());

        assert!(assembler.assemble_or_warn(src.path(), "empty").unwrap().is_none());
    }

    #[test]
    fn test_sources_untouched_and_non_images_ignored() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write_png(src.path(), "001_a.png", 6, 6, 10);
        write_png(src.path(), "002_b.png", 12, 9, 20);
        std::fs::write(src.path().join("notes.txt"), "not a frame").unwrap();
        let before = hash_file(&src.path().join("001_a.png")).unwrap();

        let gif = GifAssembler::new(out.path(), Duration::from_millis(100))
            .assemble(src.path(), "mixed")
            .unwrap();
        assert_eq!(gif.frame_count, 2);
        assert_eq!(hash_file(&src.path().join("001_a.png")).unwrap(), before);
        assert_eq!(std::fs::read_dir(src.path()).unwrap().count(), 3);

        // the odd-sized frame was scaled to the first
        for frame in decode(&gif.path) {
            assert_eq!(frame.buffer().dimensions(), (6, 6));
        }
    }

    #[test]
    fn test_sequence_names_sort_in_capture_order() {
        let dir = tempfile::tempdir().unwrap();
        let browser = FakeBrowser::new();
        let mut seq = ScreenshotSequence::new(dir.path().join("run"));
        for label in ["home page", "search", "results", "streamer"] {
            seq.capture(&browser, label).unwrap();
        }
        let names: Vec<String> = seq
            .artifacts()
            .iter()
            .map(|a| a.path.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names[0], "001_home_page.png");
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert_eq!(seq.artifacts()[3].sequence_index, 4);
        assert_eq!(seq.artifacts()[0].sha256.len(), 64);
    }

    #[test]
    fn test_sequence_refuses_thousandth_frame() {
        let dir = tempfile::tempdir().unwrap();
        let browser = FakeBrowser::new();
        let mut seq = ScreenshotSequence::new(dir.path().join("run"));
        seq.next = MAX_SEQUENCE_FRAMES;

        let last = seq.capture(&browser, "last").unwrap();
        assert_eq!(last.path.file_name().unwrap(), "999_last.png");
        assert!(matches!(
            seq.capture(&browser, "overflow"),
            Err(E2eError::SequenceFull { max: 999, .. })
        ));
        assert_eq!(seq.artifacts().len(), 1);
    }

    #[test]
    fn test_create_unique_dir_never_reuses() {
        let root = tempfile::tempdir().unwrap();
        let first = create_unique_dir(root.path(), "run").unwrap();
        let second = create_unique_dir(root.path(), "run").unwrap();
        assert_eq!(first, root.path().join("run"));
        assert_eq!(second, root.path().join("run_1"));
        assert!(second.is_dir());
    }

    #[test]
    fn test_capture_failure_never_raises() {
        let dir = tempfile::tempdir().unwrap();
        let browser = FakeBrowser::new();
        browser.fail_screenshots();
        assert!(capture_failure(&browser, dir.path(), "broken").is_none());
    }
}
