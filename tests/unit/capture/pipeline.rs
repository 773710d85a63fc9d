use super::*;
use crate::capture::recorder::InMemoryRecorder;
use crate::foundation::error::ErrorKind;

fn cfg() -> RecorderConfig {
    RecorderConfig {
        width: 2,
        height: 2,
        fps: Fps::new(10, 1).unwrap(),
        bitrate: 1_000,
    }
}

fn frame(v: u8) -> FrameRGBA {
    FrameRGBA {
        width: 2,
        height: 2,
        data: vec![v; 16],
        premultiplied: true,
    }
}

#[test]
fn one_frame_per_slot_when_on_time() {
    let rec = InMemoryRecorder::new();
    let probe = rec.probe();
    let mut p = CapturePipeline::start(Box::new(rec), cfg(), None, 2).unwrap();
    for i in 0..10 {
        p.submit(frame(i), f64::from(i) / 10.0).unwrap();
    }
    let out = p.finish(1.0).unwrap();
    assert_eq!(out.frames, 10);
    assert_eq!(out.data.len(), 10 * 16);
    assert!(!out.has_audio);
    assert_eq!((probe.stops(), probe.aborts()), (1, 0));
}

#[test]
fn late_ticks_duplicate_the_previous_frame() {
    let rec = InMemoryRecorder::new().retaining_frames();
    let probe = rec.probe();
    let mut p = CapturePipeline::start(Box::new(rec), cfg(), None, 1).unwrap();
    p.submit(frame(1), 0.0).unwrap();
    p.submit(frame(2), 0.4).unwrap();
    assert_eq!(p.frames_sent(), 5);
    let out = p.finish(0.5).unwrap();
    assert_eq!(out.frames, 5);
    let values = probe
        .retained_frames()
        .iter()
        .map(|f| f.data[0])
        .collect::<Vec<_>>();
    assert_eq!(values, vec![1, 1, 1, 1, 2]);
}

#[test]
fn early_ticks_are_dropped_and_finish_pads() {
    let rec = InMemoryRecorder::new().retaining_frames();
    let probe = rec.probe();
    let mut p = CapturePipeline::start(Box::new(rec), cfg(), None, 4).unwrap();
    p.submit(frame(1), 0.0).unwrap();
    p.submit(frame(2), 0.01).unwrap();
    assert_eq!(p.frames_sent(), 1);
    let out = p.finish(0.3).unwrap();
    assert_eq!(out.frames, 3);
    let values = probe
        .retained_frames()
        .iter()
        .map(|f| f.data[0])
        .collect::<Vec<_>>();
    assert_eq!(values, vec![1, 2, 2]);
}

#[test]
fn encoder_failure_surfaces_from_submit_or_finish() {
    let rec = InMemoryRecorder::new().failing_after(3);
    let probe = rec.probe();
    let mut p = CapturePipeline::start(Box::new(rec), cfg(), None, 1).unwrap();
    let mut result = Ok(());
    for i in 0..20 {
        result = p.submit(frame(0), f64::from(i) / 10.0);
        if result.is_err() {
            break;
        }
    }
    let err = match result {
        Err(e) => e,
        Ok(()) => p.finish(2.0).unwrap_err(),
    };
    assert_eq!(err.kind(), ErrorKind::EncodeError);
    assert_eq!((probe.stops(), probe.aborts()), (0, 1));
}

#[test]
fn drop_aborts_the_recorder_once() {
    let rec = InMemoryRecorder::new();
    let probe = rec.probe();
    let mut p = CapturePipeline::start(Box::new(rec), cfg(), None, 2).unwrap();
    p.submit(frame(0), 0.0).unwrap();
    drop(p);
    assert_eq!((probe.starts(), probe.stops(), probe.aborts()), (1, 0, 1));
}

#[test]
fn audio_failure_is_soft() {
    let rec = InMemoryRecorder::new();
    let route = AudioRoute::new("/no/such/audio.webm");
    let mut p = CapturePipeline::start(Box::new(rec), cfg(), Some(&route), 2).unwrap();
    p.submit(frame(0), 0.0).unwrap();
    let out = p.finish(0.1).unwrap();
    assert!(!out.has_audio);
    assert_eq!(out.frames, 1);
}

#[test]
fn readable_audio_is_attached() {
    let path = std::env::temp_dir().join(format!("repliq_audio_{}.webm", std::process::id()));
    std::fs::write(&path, b"fake").unwrap();
    let rec = InMemoryRecorder::new().accepting_audio();
    let p = CapturePipeline::start(Box::new(rec), cfg(), Some(&AudioRoute::new(&path)), 2).unwrap();
    let out = p.finish(0.0).unwrap();
    assert!(out.has_audio);
    std::fs::remove_file(path).unwrap();
}
