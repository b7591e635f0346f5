use std::io;

use super::*;

/// Sink that accepts `budget` bytes and then fails every write.
struct FailingSink {
    budget: usize,
    written: Vec<u8>,
}

impl Write for FailingSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written.len() + buf.len() > self.budget {
            return Err(io::Error::other("sink full"));
        }
        self.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn red(width: u32, height: u32) -> RawFrame {
    RawFrame::solid(width, height, Rgb::new(255, 0, 0))
}

#[test]
fn add_frame_before_start_fails_without_side_effects() {
    let mut enc = GifEncoder::<Vec<u8>>::new();
    let err = enc.add_frame(&red(2, 2)).unwrap_err();
    assert!(matches!(err, GifError::State(_)));
    assert_eq!(enc.phase(), SessionPhase::Idle);
    assert_eq!(enc.canvas(), None);
    assert!(enc.is_first_frame());
    assert_eq!(enc.frames_written(), 0);
}

#[test]
fn finish_before_start_and_double_finish_fail() {
    let mut enc = GifEncoder::<Vec<u8>>::new();
    assert!(matches!(enc.finish(), Err(GifError::State(_))));

    enc.start(Vec::new()).unwrap();
    enc.finish().unwrap();
    assert_eq!(enc.phase(), SessionPhase::Finished);
    assert!(matches!(enc.finish(), Err(GifError::State(_))));
}

#[test]
fn start_twice_keeps_the_running_session() {
    let mut enc = GifEncoder::<Vec<u8>>::new();
    enc.start(Vec::new()).unwrap();
    enc.add_frame(&red(2, 2)).unwrap();
    assert!(matches!(enc.start(Vec::new()), Err(GifError::State(_))));
    assert_eq!(enc.frames_written(), 1);
    let out = enc.finish().unwrap().unwrap();
    assert!(out.starts_with(b"GIF89a"));
}

#[test]
fn single_frame_stream_layout() {
    let mut enc = GifEncoder::<Vec<u8>>::new();
    enc.start(Vec::new()).unwrap();
    enc.add_frame(&red(2, 2)).unwrap();
    let out = enc.finish().unwrap().unwrap();

    assert_eq!(&out[..6], b"GIF89a");
    assert_eq!(&out[6..13], &[2, 0, 2, 0, 0xF7, 0, 0]);
    // Global table is 256 entries; no loop extension when repeat is off.
    assert_eq!(&out[781..789], &[0x21, 0xF9, 4, 0, 0, 0, 0, 0]);
    assert_eq!(&out[789..799], &[0x2C, 0, 0, 0, 0, 2, 0, 2, 0, 0]);
    assert_eq!(out[799], 8, "min code size for a 256-entry table");
    assert_eq!(out.last(), Some(&0x3B));
}

#[test]
fn later_frames_carry_a_local_table() {
    let mut enc = GifEncoder::<Vec<u8>>::new();
    enc.set_repeat(Repeat::Infinite);
    enc.start(Vec::new()).unwrap();
    enc.add_frame(&red(2, 2)).unwrap();
    let first_len = {
        let canvas = enc.canvas().unwrap();
        prepare_frame(&red(2, 2), canvas, enc.config())
            .image_data()
            .len()
    };
    enc.add_frame(&RawFrame::solid(2, 2, Rgb::new(0, 0, 255))).unwrap();
    let out = enc.finish().unwrap().unwrap();

    // signature + LSD + global table + loop extension (19) + GCE + descriptor + data
    let second = 6 + 7 + 768 + 19 + 8 + 10 + first_len;
    assert_eq!(&out[781..784], &[0x21, 0xFF, 0x0B]);
    assert_eq!(&out[second..second + 2], &[0x21, 0xF9]);
    assert_eq!(out[second + 8], 0x2C);
    assert_eq!(out[second + 8 + 9], 0x87);
}

#[test]
fn canvas_is_locked_by_the_first_frame() {
    let mut enc = GifEncoder::<Vec<u8>>::new();
    enc.start(Vec::new()).unwrap();
    enc.add_frame(&red(4, 4)).unwrap();
    enc.add_frame(&red(8, 2)).unwrap();
    assert_eq!(
        enc.canvas(),
        Some(Canvas {
            width: 4,
            height: 4
        })
    );
    assert_eq!(enc.frames_written(), 2);
}

#[test]
fn restart_after_finish_resets_the_session() {
    let mut enc = GifEncoder::<Vec<u8>>::new();
    enc.start(Vec::new()).unwrap();
    enc.add_frame(&red(4, 4)).unwrap();
    enc.finish().unwrap();

    enc.start(Vec::new()).unwrap();
    assert_eq!(enc.phase(), SessionPhase::Started);
    assert!(enc.is_first_frame());
    assert_eq!(enc.canvas(), None);
    assert_eq!(enc.frames_written(), 0);
    enc.add_frame(&red(3, 1)).unwrap();
    assert_eq!(
        enc.canvas(),
        Some(Canvas {
            width: 3,
            height: 1
        })
    );
}

#[test]
fn set_size_applies_only_before_the_first_frame() {
    let mut enc = GifEncoder::<Vec<u8>>::new();
    assert!(enc.set_size(5, 5).is_err());
    enc.start(Vec::new()).unwrap();
    enc.set_size(5, 6).unwrap();
    enc.add_frame(&red(2, 2)).unwrap();
    assert_eq!(
        enc.canvas(),
        Some(Canvas {
            width: 5,
            height: 6
        })
    );
    assert!(matches!(enc.set_size(9, 9), Err(GifError::State(_))));
}

#[test]
fn oversized_first_frame_is_rejected_before_locking() {
    let mut enc = GifEncoder::<Vec<u8>>::new();
    enc.start(Vec::new()).unwrap();
    let frame = RawFrame::new(70_000, 1, vec![0; 70_000 * 3]).unwrap();
    assert!(matches!(enc.add_frame(&frame), Err(GifError::Validation(_))));
    assert_eq!(enc.canvas(), None);
    assert!(enc.is_first_frame());
}

#[test]
fn write_prepared_rejects_a_foreign_canvas() {
    let mut enc = GifEncoder::<Vec<u8>>::new();
    enc.start(Vec::new()).unwrap();
    enc.add_frame(&red(4, 4)).unwrap();
    let other = Canvas {
        width: 2,
        height: 2,
    };
    let prepared = prepare_frame(&red(2, 2), other, &EncoderConfig::default());
    assert!(matches!(
        enc.write_prepared(&prepared),
        Err(GifError::Validation(_))
    ));
    assert_eq!(enc.frames_written(), 1);
}

#[test]
fn failing_sink_on_start_leaves_session_idle() {
    let mut enc = GifEncoder::<FailingSink>::new();
    let sink = FailingSink {
        budget: 0,
        written: Vec::new(),
    };
    let err = enc.start(sink).unwrap_err();
    assert!(err.is_io());
    assert_eq!(enc.phase(), SessionPhase::Idle);
}

#[test]
fn failing_sink_mid_frame_reports_io() {
    let mut enc = GifEncoder::<FailingSink>::new();
    let sink = FailingSink {
        budget: 100,
        written: Vec::new(),
    };
    enc.start(sink).unwrap();
    let err = enc.add_frame(&red(2, 2)).unwrap_err();
    assert!(err.is_io());
    assert!(err.to_string().starts_with("io error:"));
}

#[test]
fn transparency_drives_disposal_and_control_flags() {
    let cfg = EncoderConfig {
        transparent: Some(Rgb::new(255, 0, 0)),
        ..EncoderConfig::default()
    };
    let canvas = Canvas {
        width: 4,
        height: 4,
    };
    let prepared = prepare_frame(&red(4, 4), canvas, &cfg);
    let control = prepared.control();
    assert_eq!(control.dispose, DisposalMethod::Background);
    let idx = control.transparent.unwrap();
    assert_eq!(prepared.palette().colors()[usize::from(idx)], Rgb::new(255, 0, 0));

    let opaque = prepare_frame(&red(4, 4), canvas, &EncoderConfig::default()).control();
    assert_eq!(opaque.dispose, DisposalMethod::Unspecified);
    assert_eq!(opaque.transparent, None);
}

#[test]
fn per_frame_overrides_beat_session_config() {
    let cfg = EncoderConfig {
        delay: 10,
        dispose: Some(DisposalMethod::Keep),
        ..EncoderConfig::default()
    };
    let canvas = Canvas {
        width: 2,
        height: 2,
    };
    let frame = red(2, 2)
        .with_delay(33)
        .with_dispose(DisposalMethod::Previous);
    let control = prepare_frame(&frame, canvas, &cfg).control();
    assert_eq!(control.delay, 33);
    assert_eq!(control.dispose, DisposalMethod::Previous);

    let control = prepare_frame(&red(2, 2), canvas, &cfg).control();
    assert_eq!(control.delay, 10);
    assert_eq!(control.dispose, DisposalMethod::Keep);
}

#[test]
fn setters_normalize_their_inputs() {
    let mut enc = GifEncoder::<Vec<u8>>::new();
    enc.set_quality(0);
    assert_eq!(enc.config().quality, 1);
    enc.set_delay_ms(500);
    assert_eq!(enc.config().delay, 50);
    enc.set_frame_rate(25.0);
    assert_eq!(enc.config().delay, 4);
    enc.set_frame_rate(0.0);
    assert_eq!(enc.config().delay, 4);
    enc.set_delay(7);
    assert_eq!(enc.config().delay, 7);

    let enc = GifEncoder::<Vec<u8>>::with_config(EncoderConfig {
        quality: 0,
        ..EncoderConfig::default()
    });
    assert_eq!(enc.config().quality, 1);
}

#[test]
fn start_file_owns_and_closes_the_file() {
    let path = std::env::temp_dir().join(format!("gifloom-session-{}.gif", std::process::id()));
    let mut enc = GifEncoder::<BufWriter<File>>::new();
    enc.start_file(&path).unwrap();
    enc.add_frame(&red(3, 3)).unwrap();
    assert!(enc.finish().unwrap().is_none());

    let bytes = std::fs::read(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert!(bytes.starts_with(b"GIF89a"));
    assert_eq!(bytes.last(), Some(&0x3B));
}

#[test]
fn start_file_on_a_missing_directory_fails_with_io() {
    let mut enc = GifEncoder::<BufWriter<File>>::new();
    let err = enc.start_file("/definitely/not/here/out.gif").unwrap_err();
    assert!(err.is_io());
    assert_eq!(enc.phase(), SessionPhase::Idle);
}
