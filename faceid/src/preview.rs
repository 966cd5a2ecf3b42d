//! Camera preview
//!
//! A [`Preview`] streams frames to a [`PreviewImageReadyCallback`] between
//! `start` and `stop`. Frames are lent to the callback for the duration of the
//! call only.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use faceid_core::PreviewMode;
use faceid_types::{ImageMut, ImageRef};

use crate::error::{Error, Result};

/// Preview configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Camera index (-1 selects the first device found)
    pub camera_number: i32,

    /// Stream format
    pub preview_mode: PreviewMode,
}

/// Receives preview frames, possibly from a capture thread
pub trait PreviewImageReadyCallback: Send + Sync {
    fn on_preview_image_ready(&self, image: ImageRef<'_>);
}

impl<F> PreviewImageReadyCallback for F
where
    F: Fn(ImageRef<'_>) + Send + Sync,
{
    fn on_preview_image_ready(&self, image: ImageRef<'_>) {
        self(image)
    }
}

/// Live camera stream
pub trait Preview: Send {
    /// Start streaming to `callback`, replacing any previous callback
    fn start(&mut self, callback: Arc<dyn PreviewImageReadyCallback>) -> Result<()>;

    /// Suspend delivery without releasing the callback
    fn pause(&mut self) -> Result<()>;

    /// Resume delivery after [`Preview::pause`]
    fn resume(&mut self) -> Result<()>;

    /// Stop streaming and release the callback
    fn stop(&mut self) -> Result<()>;

    /// Convert a RAW10 frame into RGB24 written to `output`
    fn raw_to_rgb(&self, input: &ImageRef<'_>, output: &mut ImageMut<'_>) -> Result<()>;
}

/// Streaming state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewState {
    Stopped,
    Running,
    Paused,
}

impl PreviewState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Running => "running",
            Self::Paused => "paused",
        }
    }
}

impl fmt::Display for PreviewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct FeedState {
    state: PreviewState,
    callback: Option<Arc<dyn PreviewImageReadyCallback>>,
    delivered: u64,
}

/// Preview without a camera; frames are injected through a [`PreviewFeed`]
pub struct SimulatedPreview {
    config: PreviewConfig,
    shared: Arc<Mutex<FeedState>>,
}

/// Frame source of a [`SimulatedPreview`]
#[derive(Clone)]
pub struct PreviewFeed {
    shared: Arc<Mutex<FeedState>>,
}

impl SimulatedPreview {
    pub fn new(config: PreviewConfig) -> Self {
        Self {
            config,
            shared: Arc::new(Mutex::new(FeedState {
                state: PreviewState::Stopped,
                callback: None,
                delivered: 0,
            })),
        }
    }

    pub fn config(&self) -> PreviewConfig {
        self.config
    }

    /// Handle used to push frames into this preview
    pub fn feed(&self) -> PreviewFeed {
        PreviewFeed {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn state(&self) -> PreviewState {
        self.shared.lock().state
    }

    fn transition(&self, from: PreviewState, to: PreviewState) -> Result<()> {
        let mut shared = self.shared.lock();
        if shared.state != from {
            return Err(Error::PreviewState(shared.state.as_str()));
        }
        debug!(camera = self.config.camera_number, "Preview {} -> {}", from, to);
        shared.state = to;
        Ok(())
    }
}

impl Preview for SimulatedPreview {
    fn start(&mut self, callback: Arc<dyn PreviewImageReadyCallback>) -> Result<()> {
        let mut shared = self.shared.lock();
        debug!(
            camera = self.config.camera_number,
            mode = %self.config.preview_mode,
            replaced = shared.callback.is_some(),
            "Preview started"
        );
        shared.callback = Some(callback);
        shared.state = PreviewState::Running;
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        self.transition(PreviewState::Running, PreviewState::Paused)
    }

    fn resume(&mut self) -> Result<()> {
        self.transition(PreviewState::Paused, PreviewState::Running)
    }

    fn stop(&mut self) -> Result<()> {
        let mut shared = self.shared.lock();
        shared.state = PreviewState::Stopped;
        shared.callback = None;
        debug!(
            camera = self.config.camera_number,
            delivered = shared.delivered,
            "Preview stopped"
        );
        Ok(())
    }

    fn raw_to_rgb(&self, input: &ImageRef<'_>, output: &mut ImageMut<'_>) -> Result<()> {
        raw10_to_rgb(input, output)
    }
}

impl PreviewFeed {
    /// Deliver `image` to the current callback.
    ///
    /// Returns `false` when the preview is not running and the frame was dropped.
    pub fn push(&self, image: ImageRef<'_>) -> bool {
        let callback = {
            let mut shared = self.shared.lock();
            if shared.state != PreviewState::Running {
                trace!(frame = image.number, "Dropped frame, preview {}", shared.state);
                return false;
            }
            shared.delivered += 1;
            shared.callback.clone()
        };

        // Invoked outside the lock so the callback may call back into the preview
        match callback {
            Some(callback) => {
                callback.on_preview_image_ready(image);
                true
            }
            None => false,
        }
    }

    /// Frames delivered since creation
    pub fn delivered(&self) -> u64 {
        self.shared.lock().delivered
    }
}

/// Unpack a MIPI RAW10 frame into 8-bit grey RGB24.
///
/// RAW10 stores four pixels in five bytes: the eight most significant bits of
/// each pixel followed by one byte holding the four pairs of low bits. Only
/// the high bytes are kept. `input.width` must be a multiple of 4 and
/// `output.buffer` must hold `width * 3 * height` bytes; on success the output
/// header is rewritten to describe the RGB frame.
pub fn raw10_to_rgb(input: &ImageRef<'_>, output: &mut ImageMut<'_>) -> Result<()> {
    input.validate()?;

    let width = input.width as usize;
    let height = input.height as usize;
    let in_stride = input.stride as usize;

    if width % 4 != 0 {
        return Err(faceid_types::Error::Validation(format!(
            "RAW10 width {} is not a multiple of 4",
            width
        ))
        .into());
    }
    if in_stride < width / 4 * 5 {
        return Err(faceid_types::Error::Validation(format!(
            "RAW10 stride {} is shorter than {} packed bytes",
            in_stride,
            width / 4 * 5
        ))
        .into());
    }

    let out_stride = width * 3;
    let needed = out_stride * height;
    if output.buffer.len() < needed {
        return Err(faceid_types::Error::Validation(format!(
            "RGB output needs {} bytes, buffer has {}",
            needed,
            output.buffer.len()
        ))
        .into());
    }

    let src = input.data();
    for row in 0..height {
        let packed = &src[row * in_stride..row * in_stride + width / 4 * 5];
        let rgb = &mut output.buffer[row * out_stride..(row + 1) * out_stride];

        for (group, out) in packed.chunks_exact(5).zip(rgb.chunks_exact_mut(12)) {
            for (pixel, &value) in out.chunks_exact_mut(3).zip(&group[..4]) {
                pixel.fill(value);
            }
        }
    }

    output.width = input.width;
    output.height = input.height;
    output.stride = out_stride as u32;
    output.size = needed as u32;
    output.number = input.number;
    output.metadata = input.metadata;

    trace!(frame = input.number, width, height, "Converted RAW10 frame");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use faceid_types::{Image, ImageMetadata};
    use pretty_assertions::assert_eq;

    fn raw_frame(width: u32, height: u32) -> Vec<u8> {
        let stride = (width / 4 * 5) as usize;
        let mut data = vec![0u8; stride * height as usize];
        for (i, group) in data.chunks_exact_mut(5).enumerate() {
            for (j, byte) in group[..4].iter_mut().enumerate() {
                *byte = (i * 4 + j) as u8;
            }
            group[4] = 0xFF;
        }
        data
    }

    #[test]
    fn test_raw10_to_rgb() {
        let raw = raw_frame(8, 2);
        let metadata = ImageMetadata {
            led: true,
            sensor_id: 1,
            timestamp: 99,
            ..Default::default()
        };
        let input = Image::new(raw.as_slice(), 8, 2, 10)
            .with_number(5)
            .with_metadata(metadata);

        let mut rgb = vec![0u8; 8 * 3 * 2];
        let mut output = Image::new(rgb.as_mut_slice(), 0, 0, 0);

        raw10_to_rgb(&input, &mut output).unwrap();

        assert_eq!(output.width, 8);
        assert_eq!(output.stride, 24);
        assert_eq!(output.size, 48);
        assert_eq!(output.number, 5);
        assert_eq!(output.metadata, metadata);
        assert_eq!(&output.buffer[..6], &[0, 0, 0, 1, 1, 1]);
        // second row starts at pixel 8
        assert_eq!(&output.buffer[24..27], &[8, 8, 8]);
    }

    #[test]
    fn test_raw10_output_too_small() {
        let raw = raw_frame(4, 1);
        let input = Image::new(raw.as_slice(), 4, 1, 5);
        let mut rgb = vec![0u8; 11];
        let mut output = Image::new(rgb.as_mut_slice(), 0, 0, 0);

        assert!(raw10_to_rgb(&input, &mut output).is_err());
        assert_eq!(output.width, 0);
    }

    #[test]
    fn test_raw10_bad_width() {
        let raw = vec![0u8; 20];
        let input = Image::new(raw.as_slice(), 6, 2, 10);
        let mut rgb = vec![0u8; 64];
        let mut output = Image::new(rgb.as_mut_slice(), 0, 0, 0);

        assert!(raw10_to_rgb(&input, &mut output).is_err());
    }

    #[test]
    fn test_preview_state_machine() {
        let mut preview = SimulatedPreview::new(PreviewConfig::default());
        assert_eq!(preview.state(), PreviewState::Stopped);
        assert!(preview.pause().is_err());
        assert!(preview.resume().is_err());

        preview.start(Arc::new(|_: ImageRef<'_>| {})).unwrap();
        assert_eq!(preview.state(), PreviewState::Running);
        assert!(preview.resume().is_err());

        preview.pause().unwrap();
        assert_eq!(preview.state(), PreviewState::Paused);
        preview.resume().unwrap();
        preview.stop().unwrap();
        assert_eq!(preview.state(), PreviewState::Stopped);
    }

    #[test]
    fn test_feed_delivers_only_while_running() {
        let mut preview = SimulatedPreview::new(PreviewConfig::default());
        let feed = preview.feed();
        let frames = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&frames);
        preview
            .start(Arc::new(move |image: ImageRef<'_>| sink.lock().push(image.number)))
            .unwrap();

        let pixels = [0u8; 4];
        let frame = |n| Image::new(&pixels[..], 2, 2, 1).with_number(n);

        assert!(feed.push(frame(1)));
        preview.pause().unwrap();
        assert!(!feed.push(frame(2)));
        preview.resume().unwrap();
        assert!(feed.push(frame(3)));
        preview.stop().unwrap();
        assert!(!feed.push(frame(4)));

        assert_eq!(*frames.lock(), vec![1, 3]);
        assert_eq!(feed.delivered(), 2);
    }

    #[test]
    fn test_restart_replaces_callback() {
        let mut preview = SimulatedPreview::new(PreviewConfig::default());
        let feed = preview.feed();
        let first = Arc::new(Mutex::new(0));
        let second = Arc::new(Mutex::new(0));

        let sink = Arc::clone(&first);
        preview.start(Arc::new(move |_: ImageRef<'_>| *sink.lock() += 1)).unwrap();
        let sink = Arc::clone(&second);
        preview.start(Arc::new(move |_: ImageRef<'_>| *sink.lock() += 1)).unwrap();

        let pixels = [0u8; 1];
        feed.push(Image::new(&pixels[..], 1, 1, 1));

        assert_eq!(*first.lock(), 0);
        assert_eq!(*second.lock(), 1);
    }
}
