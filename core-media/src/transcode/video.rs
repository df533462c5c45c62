//! Video transcoding through external `ffprobe` / `ffmpeg` binaries.

use crate::error::{MediaError, Result};
use core_runtime::config::VideoSettings;
use core_runtime::logging::strip_path;
use std::ffi::OsString;
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

/// Floor to an even number, minimum 2 (yuv420p needs even dimensions).
fn even(value: u32) -> u32 {
    (value - value % 2).max(2)
}

/// Target dimensions for a source video.
///
/// Height is capped at `max_height` first, then width at `max_width`, each
/// step preserving aspect ratio. A source shorter than `max_height` keeps
/// its size instead of being stretched up to the cap, so small clips are
/// never upscaled. With `no_resize` the source dimensions are kept (only
/// even-aligned).
pub fn compute_video_dimensions(
    width: u32,
    height: u32,
    max_width: u32,
    max_height: u32,
    no_resize: bool,
) -> (u32, u32) {
    if no_resize || width == 0 || height == 0 {
        return (even(width), even(height));
    }

    let (mut w, mut h) = (width as u64, height as u64);
    if h > max_height as u64 {
        w = w * max_height as u64 / h;
        h = max_height as u64;
    }
    if w > max_width as u64 {
        h = h * max_width as u64 / w;
        w = max_width as u64;
    }

    (even(w as u32), even(h as u32))
}

/// Parse `ffprobe -of csv=s=x:p=0` output such as `1920x1080`.
pub fn parse_probe_output(output: &str) -> Option<(u32, u32)> {
    let line = output.lines().map(str::trim).find(|l| !l.is_empty())?;
    let (width, height) = line.split_once('x')?;
    let width = width.trim().parse().ok()?;
    let height = height.trim().trim_end_matches(',').parse().ok()?;
    Some((width, height))
}

async fn probe_dimensions(source: &Path, settings: &VideoSettings) -> Result<(u32, u32)> {
    let output = Command::new(&settings.ffprobe_path)
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height",
            "-of",
            "csv=s=x:p=0",
        ])
        .arg(source)
        .output()
        .await
        .map_err(|e| MediaError::transcode(source, format!("Failed to run ffprobe: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(MediaError::transcode(
            source,
            format!("ffprobe failed: {}", stderr.trim()),
        ));
    }

    parse_probe_output(&String::from_utf8_lossy(&output.stdout))
        .ok_or_else(|| MediaError::transcode(source, "ffprobe reported no video stream"))
}

pub(crate) fn ffmpeg_args(
    source: &Path,
    output: &Path,
    dimensions: (u32, u32),
    settings: &VideoSettings,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-y".into(), "-v".into(), "error".into(), "-i".into()];
    args.push(source.as_os_str().to_os_string());
    for arg in [
        "-vf".to_string(),
        format!("scale={}:{}", dimensions.0, dimensions.1),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-profile:v".to_string(),
        "high".to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-preset".to_string(),
        settings.preset.clone(),
        "-r".to_string(),
        settings.frame_rate.to_string(),
        "-b:v".to_string(),
        settings.bitrate.clone(),
        "-c:a".to_string(),
        "aac".to_string(),
        "-movflags".to_string(),
        "+faststart".to_string(),
        // The output path may be a staging name without a container extension
        "-f".to_string(),
        "mp4".to_string(),
    ] {
        args.push(arg.into());
    }
    args.push(output.as_os_str().to_os_string());
    args
}

pub(crate) async fn transcode_video(
    source: &Path,
    output: &Path,
    settings: &VideoSettings,
    no_resize: bool,
) -> Result<(u32, u32)> {
    tokio::fs::metadata(source)
        .await
        .map_err(|e| MediaError::source_read(source, e))?;

    let (width, height) = probe_dimensions(source, settings).await?;
    let target = compute_video_dimensions(
        width,
        height,
        settings.max_width,
        settings.max_height,
        no_resize,
    );
    debug!(
        source = %strip_path(source),
        width,
        height,
        target = ?target,
        "Encoding video"
    );

    let result = Command::new(&settings.ffmpeg_path)
        .args(ffmpeg_args(source, output, target, settings))
        .output()
        .await
        .map_err(|e| MediaError::transcode(source, format!("Failed to run ffmpeg: {}", e)))?;

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        return Err(MediaError::transcode(
            source,
            format!("ffmpeg failed: {}", stderr.trim()),
        ));
    }

    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_landscape_1080p_caps_height() {
        assert_eq!(compute_video_dimensions(1920, 1080, 1280, 720, false), (1280, 720));
    }

    #[test]
    fn test_ultrawide_caps_width_after_height() {
        // 2560x800 -> height cap 720 gives 2304x720 -> width cap gives 1280x400
        assert_eq!(compute_video_dimensions(2560, 800, 1280, 720, false), (1280, 400));
    }

    #[test]
    fn test_small_video_is_not_upscaled() {
        assert_eq!(compute_video_dimensions(640, 360, 1280, 720, false), (640, 360));
        assert_eq!(compute_video_dimensions(321, 241, 1280, 720, false), (320, 240));
    }

    #[test]
    fn test_portrait_video() {
        // 1080x1920 -> 405x720 -> even 404x720
        assert_eq!(compute_video_dimensions(1080, 1920, 1280, 720, false), (404, 720));
    }

    #[test]
    fn test_no_resize_only_aligns() {
        assert_eq!(compute_video_dimensions(3841, 2161, 1280, 720, true), (3840, 2160));
        assert_eq!(compute_video_dimensions(1, 1, 1280, 720, true), (2, 2));
    }

    #[test]
    fn test_parse_probe_output() {
        assert_eq!(parse_probe_output("1920x1080\n"), Some((1920, 1080)));
        assert_eq!(parse_probe_output("\n 640x480 \n"), Some((640, 480)));
        assert_eq!(parse_probe_output("640x480,\n"), Some((640, 480)));
        assert_eq!(parse_probe_output(""), None);
        assert_eq!(parse_probe_output("N/A"), None);
    }

    #[test]
    fn test_ffmpeg_args() {
        let args = ffmpeg_args(
            &PathBuf::from("in.gif"),
            &PathBuf::from("out.mp4"),
            (640, 360),
            &VideoSettings::default(),
        );
        let args: Vec<String> = args
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        assert_eq!(args.first().map(String::as_str), Some("-y"));
        assert_eq!(args.last().map(String::as_str), Some("out.mp4"));
        for window in [
            ["-vf", "scale=640:360"],
            ["-c:v", "libx264"],
            ["-profile:v", "high"],
            ["-pix_fmt", "yuv420p"],
            ["-preset", "ultrafast"],
            ["-r", "18"],
            ["-b:v", "4000k"],
            ["-movflags", "+faststart"],
            ["-f", "mp4"],
        ] {
            assert!(
                args.windows(2).any(|w| w[0] == window[0] && w[1] == window[1]),
                "missing {:?}",
                window
            );
        }
    }

    #[tokio::test]
    async fn test_missing_source_is_source_read() {
        let err = transcode_video(
            Path::new("/definitely/missing.mp4"),
            Path::new("/tmp/out.mp4"),
            &VideoSettings::default(),
            false,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, MediaError::SourceRead { .. }));
    }
}
