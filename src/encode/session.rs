//! Encoding session: the single writer that turns frames into one GIF89a stream.
//!
//! A session moves `Idle -> Started -> Finished` and may be restarted from `Finished`. Block
//! order per stream is fixed: signature at `start`, screen descriptor + global table + loop
//! extension with the first frame, then control extension + descriptor (+ local table) +
//! image data per frame, and the trailer at `finish`.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use crate::{
    encode::{
        blocks::{self, GraphicControl},
        config::{EncoderConfig, Repeat},
        frame::RawFrame,
        lzw,
    },
    foundation::{
        core::{Canvas, DisposalMethod, Rgb, delay_from_fps, delay_from_millis},
        error::{GifError, GifResult},
    },
    quantize::palette::{Palette, quantize_frame},
};

/// Lifecycle state of a [`GifEncoder`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    /// Never started.
    Idle,
    /// Signature written; frames may be added.
    Started,
    /// Trailer written (or finish attempted); may be started again.
    Finished,
}

/// A frame that has been normalized, quantized and compressed, ready to be written.
///
/// Produced by [`prepare_frame`] without touching any session, so frames can be prepared
/// concurrently and written in order afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreparedFrame {
    canvas: Canvas,
    palette: Palette,
    image_data: Vec<u8>,
    control: GraphicControl,
}

impl PreparedFrame {
    /// Canvas the frame was laid out on.
    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// The frame's color table.
    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Framed LZW image data (min code size, sub-blocks, terminator).
    pub fn image_data(&self) -> &[u8] {
        &self.image_data
    }

    /// Values for the frame's graphic control extension.
    pub fn control(&self) -> GraphicControl {
        self.control
    }
}

/// Normalize `frame` to `canvas`, quantize it and compress its indices.
///
/// Per-frame overrides on `frame` take precedence over `config`.
#[tracing::instrument(skip(frame, config), fields(width = frame.width(), height = frame.height()))]
pub fn prepare_frame(frame: &RawFrame, canvas: Canvas, config: &EncoderConfig) -> PreparedFrame {
    if !canvas.matches(frame.width(), frame.height()) {
        tracing::warn!(
            width = frame.width(),
            height = frame.height(),
            canvas_width = canvas.width,
            canvas_height = canvas.height,
            "frame size differs from canvas; cropping/padding"
        );
    }
    let pixels = frame.normalized(canvas);
    let transparent = frame.transparent.or(config.transparent);
    let (palette, indexed) = quantize_frame(&pixels, canvas, config.sample_factor(), transparent);
    let image_data = lzw::compress(&indexed.indices, palette.color_depth());

    let control = GraphicControl {
        dispose: EncoderConfig::resolve_dispose(
            frame.dispose.or(config.dispose),
            indexed.transparent.is_some(),
        ),
        delay: frame.delay.unwrap_or(config.delay),
        transparent: indexed.transparent,
    };

    PreparedFrame {
        canvas,
        palette,
        image_data,
        control,
    }
}

/// GIF89a encoding session over a byte sink.
///
/// Configuration setters may be called at any time; the repeat setting only has an effect
/// before the first frame of a stream, since the looping extension is written with it.
#[derive(Debug)]
pub struct GifEncoder<W: Write> {
    config: EncoderConfig,
    phase: SessionPhase,
    sink: Option<W>,
    owns_sink: bool,
    canvas: Option<Canvas>,
    first_frame: bool,
    frames_written: u64,
}

impl<W: Write> Default for GifEncoder<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> GifEncoder<W> {
    /// Idle session with the default configuration.
    pub fn new() -> Self {
        Self::with_config(EncoderConfig::default())
    }

    /// Idle session with `config`. A zero quality is raised to 1.
    pub fn with_config(mut config: EncoderConfig) -> Self {
        config.quality = config.sample_factor();
        Self {
            config,
            phase: SessionPhase::Idle,
            sink: None,
            owns_sink: false,
            canvas: None,
            first_frame: true,
            frames_written: 0,
        }
    }

    /// Current configuration.
    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Delay after each frame, in hundredths of a second.
    pub fn set_delay(&mut self, hundredths: u16) {
        self.config.delay = hundredths;
    }

    /// Delay after each frame, in milliseconds (rounded to hundredths).
    pub fn set_delay_ms(&mut self, ms: u32) {
        self.config.delay = delay_from_millis(ms);
    }

    /// Delay derived from a playback rate. Rates that are not positive and finite are ignored.
    pub fn set_frame_rate(&mut self, fps: f32) {
        if let Some(delay) = delay_from_fps(fps) {
            self.config.delay = delay;
        }
    }

    /// Disposal method written for every frame, or `None` to derive it from transparency.
    pub fn set_dispose(&mut self, dispose: Option<DisposalMethod>) {
        self.config.dispose = dispose;
    }

    /// Looping behavior; must be set before the first frame.
    pub fn set_repeat(&mut self, repeat: Repeat) {
        self.config.repeat = repeat;
    }

    /// Color marked transparent in every frame, or `None` for opaque frames.
    pub fn set_transparent(&mut self, color: Option<Rgb>) {
        self.config.transparent = color;
    }

    /// Quantizer sample factor; values below 1 are raised to 1.
    pub fn set_quality(&mut self, quality: u32) {
        self.config.quality = quality.max(1);
    }

    /// Lifecycle state.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Locked canvas, if a frame (or [`GifEncoder::set_size`]) has fixed it.
    pub fn canvas(&self) -> Option<Canvas> {
        self.canvas
    }

    /// Whether the next frame written is the first of the stream.
    pub fn is_first_frame(&self) -> bool {
        self.first_frame
    }

    /// Frames written since the last `start`.
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Attach `sink` and write the signature.
    ///
    /// The sink is handed back from [`GifEncoder::finish`]. Fails without changing state when
    /// the session is already started or the signature cannot be written.
    pub fn start(&mut self, sink: W) -> GifResult<()> {
        self.start_with(sink, false)
    }

    fn start_with(&mut self, mut sink: W, owns_sink: bool) -> GifResult<()> {
        if self.phase == SessionPhase::Started {
            return Err(GifError::state(
                "start called on a session that is already started",
            ));
        }
        blocks::write_signature(&mut sink)?;
        self.reset();
        self.sink = Some(sink);
        self.owns_sink = owns_sink;
        self.phase = SessionPhase::Started;
        tracing::debug!(owns_sink, "gif session started");
        Ok(())
    }

    /// Fix the canvas before the first frame instead of taking it from that frame.
    pub fn set_size(&mut self, width: u32, height: u32) -> GifResult<()> {
        if self.phase != SessionPhase::Started {
            return Err(GifError::state("set_size requires a started session"));
        }
        if !self.first_frame {
            return Err(GifError::state(
                "canvas size cannot change after the first frame",
            ));
        }
        self.canvas = Some(Canvas::for_frame(width, height)?);
        Ok(())
    }

    fn require_started(&self, op: &str) -> GifResult<()> {
        if self.phase != SessionPhase::Started {
            return Err(GifError::state(format!(
                "{op} requires a started session (current phase: {:?})",
                self.phase
            )));
        }
        Ok(())
    }

    /// Canvas for a `width`x`height` frame: the locked one, or a new lock on this size.
    pub fn lock_canvas(&mut self, width: u32, height: u32) -> GifResult<Canvas> {
        self.require_started("lock_canvas")?;
        if let Some(canvas) = self.canvas {
            return Ok(canvas);
        }
        let canvas = Canvas::for_frame(width, height)?;
        self.canvas = Some(canvas);
        tracing::debug!(
            width = canvas.width,
            height = canvas.height,
            "canvas locked"
        );
        Ok(canvas)
    }

    /// Quantize, compress and write one frame.
    ///
    /// On an I/O error the stream is partially written and should be discarded.
    pub fn add_frame(&mut self, frame: &RawFrame) -> GifResult<()> {
        self.require_started("add_frame")?;
        let canvas = self.lock_canvas(frame.width(), frame.height())?;
        let prepared = prepare_frame(frame, canvas, &self.config);
        self.write_prepared(&prepared)
    }

    /// Write a frame produced by [`prepare_frame`] for this session's canvas.
    pub fn write_prepared(&mut self, frame: &PreparedFrame) -> GifResult<()> {
        self.require_started("write_prepared")?;
        match self.canvas {
            Some(c) if c != frame.canvas => {
                return Err(GifError::validation(format!(
                    "frame prepared for a {}x{} canvas, session canvas is {}x{}",
                    frame.canvas.width, frame.canvas.height, c.width, c.height
                )));
            }
            Some(_) => {}
            None => self.canvas = Some(frame.canvas),
        }
        let first = self.first_frame;
        let repeat = self.config.repeat;
        let sink = self
            .sink
            .as_mut()
            .ok_or_else(|| GifError::state("started session has no sink"))?;

        if first {
            blocks::write_screen_descriptor(sink, frame.canvas, Some(&frame.palette))?;
            blocks::write_color_table(sink, &frame.palette)?;
            if let Some(loops) = repeat.loop_count() {
                blocks::write_loop_extension(sink, loops)?;
            }
        }
        blocks::write_graphic_control(sink, &frame.control)?;
        let local = (!first).then_some(&frame.palette);
        blocks::write_image_descriptor(sink, frame.canvas, local)?;
        if let Some(palette) = local {
            blocks::write_color_table(sink, palette)?;
        }
        sink.write_all(&frame.image_data)?;

        self.first_frame = false;
        self.frames_written += 1;
        tracing::debug!(
            frame = self.frames_written - 1,
            delay = frame.control.delay,
            bytes = frame.image_data.len(),
            "frame written"
        );
        Ok(())
    }

    /// Write the trailer, flush, and reset the session.
    ///
    /// Returns the caller-attached sink, or `None` when the session opened (and has now
    /// closed) it. The session is reset and `Finished` even when the final write fails.
    pub fn finish(&mut self) -> GifResult<Option<W>> {
        self.require_started("finish")?;
        let owns_sink = self.owns_sink;
        let frames = self.frames_written;
        let sink = self.sink.take();
        self.reset();
        self.phase = SessionPhase::Finished;

        let mut sink = sink.ok_or_else(|| GifError::state("started session has no sink"))?;
        blocks::write_trailer(&mut sink)?;
        sink.flush()?;
        tracing::debug!(frames, "gif session finished");
        Ok(if owns_sink { None } else { Some(sink) })
    }

    fn reset(&mut self) {
        self.sink = None;
        self.owns_sink = false;
        self.canvas = None;
        self.first_frame = true;
        self.frames_written = 0;
    }
}

impl GifEncoder<BufWriter<File>> {
    /// Create `path` and start a session that owns it; the file is closed by `finish`.
    pub fn start_file(&mut self, path: impl AsRef<Path>) -> GifResult<()> {
        if self.phase == SessionPhase::Started {
            return Err(GifError::state(
                "start called on a session that is already started",
            ));
        }
        let file = File::create(path.as_ref())?;
        self.start_with(BufWriter::new(file), true)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/session.rs"]
mod tests;
