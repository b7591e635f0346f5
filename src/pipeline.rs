use std::{borrow::Cow, fs::File, io::BufWriter, io::Write, path::Path};

use crate::{
    encode::{
        config::EncoderConfig,
        frame::RawFrame,
        session::{GifEncoder, PreparedFrame, prepare_frame},
    },
    foundation::{
        core::{Canvas, FrameIndex},
        error::{GifError, GifResult},
    },
};

/// Ordered supply of frames for a pipeline encode.
///
/// `frame` may be called from several worker threads at once and in any order; the pipeline
/// still writes frames in index order.
pub trait FrameSource: Sync {
    /// Number of frames.
    fn len(&self) -> usize;

    /// Whether the source has no frames.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Produce frame `index` (`0..len()`).
    fn frame(&self, index: FrameIndex) -> GifResult<Cow<'_, RawFrame>>;
}

impl FrameSource for [RawFrame] {
    fn len(&self) -> usize {
        <[RawFrame]>::len(self)
    }

    fn frame(&self, index: FrameIndex) -> GifResult<Cow<'_, RawFrame>> {
        usize::try_from(index.0)
            .ok()
            .and_then(|i| self.get(i))
            .map(Cow::Borrowed)
            .ok_or_else(|| GifError::validation(format!("frame index {} out of range", index.0)))
    }
}

impl FrameSource for Vec<RawFrame> {
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn frame(&self, index: FrameIndex) -> GifResult<Cow<'_, RawFrame>> {
        self.as_slice().frame(index)
    }
}

/// How frame preparation is spread over worker threads.
#[derive(Clone, Debug)]
pub struct EncodeThreading {
    /// Prepare frames on a rayon pool; otherwise on the calling thread.
    pub parallel: bool,
    /// Batches of at most this many frames are prepared by one task; larger ones are halved.
    pub batch_threshold: usize,
    /// Worker count; `None` uses rayon's default.
    pub threads: Option<usize>,
}

impl Default for EncodeThreading {
    fn default() -> Self {
        Self {
            parallel: true,
            batch_threshold: 5,
            threads: None,
        }
    }
}

/// Counters reported by a pipeline encode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EncodeStats {
    /// Frames supplied by the source.
    pub frames_total: u64,
    /// Frames written to the stream.
    pub frames_written: u64,
    /// Bytes of LZW image data written, framing included.
    pub image_data_bytes: u64,
}

/// Prepare every frame of `source` on the canvas of its first frame.
///
/// Preparation errors are reported after all workers have joined, for the lowest failing index.
#[tracing::instrument(skip_all, fields(frames = source.len(), parallel = threading.parallel))]
pub fn prepare_frames<S: FrameSource + ?Sized>(
    source: &S,
    config: &EncoderConfig,
    threading: &EncodeThreading,
) -> GifResult<(Canvas, Vec<PreparedFrame>)> {
    config.validate()?;
    if source.is_empty() {
        return Err(GifError::validation("no frames to encode"));
    }

    let first = source.frame(FrameIndex(0))?;
    let canvas = Canvas::for_frame(first.width(), first.height())?;
    let mut out = Vec::with_capacity(source.len());
    out.push(prepare_frame(&first, canvas, config));
    drop(first);

    if threading.parallel {
        let pool = build_thread_pool(threading.threads)?;
        let threshold = normalized_batch_threshold(threading.batch_threshold);
        let rest =
            pool.install(|| prepare_range(source, 1, source.len(), canvas, config, threshold));
        for item in rest {
            out.push(item?);
        }
    } else {
        for i in 1..source.len() {
            out.push(prepare_one(source, i, canvas, config)?);
        }
    }
    tracing::debug!(
        width = canvas.width,
        height = canvas.height,
        frames = out.len(),
        "frames prepared"
    );
    Ok((canvas, out))
}

/// Encode every frame of `source` into `sink` and hand the sink back.
///
/// All frames are prepared before the first byte is written, so a failing frame leaves `sink`
/// untouched.
#[tracing::instrument(skip_all, fields(frames = source.len()))]
pub fn encode_frames<S: FrameSource + ?Sized, W: Write>(
    source: &S,
    config: &EncoderConfig,
    threading: &EncodeThreading,
    sink: W,
) -> GifResult<(W, EncodeStats)> {
    let (_, frames) = prepare_frames(source, config, threading)?;
    let mut enc = GifEncoder::with_config(config.clone());
    enc.start(sink)?;
    let stats = write_all_prepared(&mut enc, &frames)?;
    let sink = enc
        .finish()?
        .ok_or_else(|| GifError::state("caller-attached sink was not returned by finish"))?;
    Ok((sink, stats))
}

/// Encode every frame of `source` into a new file at `path`.
///
/// The file is only created once every frame has been prepared, and is removed again if
/// writing it fails.
pub fn encode_to_path<S: FrameSource + ?Sized>(
    source: &S,
    config: &EncoderConfig,
    threading: &EncodeThreading,
    path: impl AsRef<Path>,
) -> GifResult<EncodeStats> {
    let path = path.as_ref();
    let (_, frames) = prepare_frames(source, config, threading)?;
    let mut enc = GifEncoder::<BufWriter<File>>::with_config(config.clone());
    enc.start_file(path)?;
    write_or_remove(enc, &frames, path)
}

// Consumes `enc` so the sink is closed before a partial file at `path` is removed.
fn write_or_remove<W: Write>(
    mut enc: GifEncoder<W>,
    frames: &[PreparedFrame],
    path: &Path,
) -> GifResult<EncodeStats> {
    let result = write_all_prepared(&mut enc, frames).and_then(|stats| {
        enc.finish()?;
        Ok(stats)
    });
    drop(enc);
    if let Err(err) = &result {
        tracing::warn!(
            path = %path.display(),
            error = %err,
            "removing partially written gif"
        );
        if let Err(e) = std::fs::remove_file(path) {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "could not remove partial gif"
            );
        }
    }
    result
}

fn write_all_prepared<W: Write>(
    enc: &mut GifEncoder<W>,
    frames: &[PreparedFrame],
) -> GifResult<EncodeStats> {
    let mut stats = EncodeStats {
        frames_total: frames.len() as u64,
        ..EncodeStats::default()
    };
    for frame in frames {
        enc.write_prepared(frame)?;
        stats.frames_written += 1;
        stats.image_data_bytes += frame.image_data().len() as u64;
    }
    Ok(stats)
}

fn prepare_one<S: FrameSource + ?Sized>(
    source: &S,
    index: usize,
    canvas: Canvas,
    config: &EncoderConfig,
) -> GifResult<PreparedFrame> {
    let frame = source.frame(FrameIndex(index as u64))?;
    Ok(prepare_frame(&frame, canvas, config))
}

// Recursive halving keeps results in index order without a shared collection.
fn prepare_range<S: FrameSource + ?Sized>(
    source: &S,
    start: usize,
    end: usize,
    canvas: Canvas,
    config: &EncoderConfig,
    threshold: usize,
) -> Vec<GifResult<PreparedFrame>> {
    if end - start <= threshold {
        return (start..end)
            .map(|i| prepare_one(source, i, canvas, config))
            .collect();
    }
    let mid = start + (end - start) / 2;
    let (mut left, right) = rayon::join(
        || prepare_range(source, start, mid, canvas, config, threshold),
        || prepare_range(source, mid, end, canvas, config, threshold),
    );
    left.extend(right);
    left
}

fn build_thread_pool(threads: Option<usize>) -> GifResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(GifError::validation(
            "encode threading 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| GifError::Other(anyhow::anyhow!("failed to build rayon thread pool: {e}")))
}

fn normalized_batch_threshold(threshold: usize) -> usize {
    threshold.max(1)
}

#[cfg(test)]
#[path = "../tests/unit/pipeline.rs"]
mod tests;
