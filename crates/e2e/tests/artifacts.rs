//! Screenshot and GIF pipeline tests

use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, Rgba, RgbaImage};
use streamprobe_e2e::fake::FakeBrowser;
use streamprobe_e2e::{E2eError, GifAssembler, ScreenshotSequence};
use tempfile::TempDir;

fn write_frame(dir: &Path, name: &str, shade: u8) {
    RgbaImage::from_pixel(16, 24, Rgba([shade, shade, shade, 255]))
        .save(dir.join(name))
        .unwrap();
}

fn decode(path: &Path) -> Vec<image::Frame> {
    let decoder = GifDecoder::new(BufReader::new(File::open(path).unwrap())).unwrap();
    decoder.into_frames().collect_frames().unwrap()
}

#[test]
fn test_gif_from_numbered_screenshots() {
    let tmp = TempDir::new().unwrap();
    let shots = tmp.path().join("shots");
    fs::create_dir_all(&shots).unwrap();
    for i in 1..=5u8 {
        write_frame(&shots, &format!("{:02}.png", i), i * 40);
    }
    fs::write(shots.join("notes.txt"), "not a frame").unwrap();

    let gifs = GifAssembler::new(tmp.path().join("gifs"), Duration::from_millis(1000));
    let gif = gifs.assemble(&shots, "run").unwrap();

    assert_eq!(gif.frame_count, 5);
    assert_eq!(gif.per_frame_duration, Duration::from_millis(1000));
    assert_eq!(gif.path, tmp.path().join("gifs").join("run.gif"));

    let frames = decode(&gif.path);
    assert_eq!(frames.len(), 5);
    for frame in &frames {
        let (numer, denom) = frame.delay().numer_denom_ms();
        assert_eq!(numer / denom, 1000);
    }
    // source frames are left alone
    assert_eq!(fs::read_dir(&shots).unwrap().count(), 6);
}

#[test]
fn test_empty_directory_has_no_frames() {
    let tmp = TempDir::new().unwrap();
    let shots = tmp.path().join("empty");
    fs::create_dir_all(&shots).unwrap();
    let out = tmp.path().join("gifs");

    let gifs = GifAssembler::new(&out, Duration::from_millis(500));
    assert!(matches!(gifs.assemble(&shots, "none"), Err(E2eError::NoFrames(_))));
    assert!(gifs.assemble_or_warn(&shots, "none").unwrap().is_none());
    assert!(!out.join("none.gif").exists());
}

#[test]
fn test_second_gif_does_not_overwrite_first() {
    let tmp = TempDir::new().unwrap();
    let shots = tmp.path().join("shots");
    fs::create_dir_all(&shots).unwrap();
    write_frame(&shots, "01.png", 10);

    let gifs = GifAssembler::new(tmp.path().join("gifs"), Duration::from_millis(200));
    let first = gifs.assemble(&shots, "run").unwrap();
    let second = gifs.assemble(&shots, "run").unwrap();

    assert_ne!(first.path, second.path);
    assert!(first.path.exists());
    assert!(second.path.exists());
}

#[test]
fn test_sequence_feeds_assembler() {
    let tmp = TempDir::new().unwrap();
    let browser = FakeBrowser::new();
    let mut sequence = ScreenshotSequence::new(tmp.path().join("run"));

    for label in ["home page", "search", "results"] {
        sequence.capture(&browser, label).unwrap();
    }
    let names: Vec<String> = sequence
        .artifacts()
        .iter()
        .map(|a| a.path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["001_home_page.png", "002_search.png", "003_results.png"]);

    let gifs = GifAssembler::new(tmp.path().join("gifs"), Duration::from_millis(1000));
    let gif = gifs.assemble(sequence.dir(), "run").unwrap();
    assert_eq!(gif.frame_count, 3);
}
