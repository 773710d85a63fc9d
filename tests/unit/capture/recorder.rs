use super::*;

fn cfg(w: u32, h: u32) -> RecorderConfig {
    RecorderConfig {
        width: w,
        height: h,
        fps: Fps::new(30, 1).unwrap(),
        bitrate: 5_000_000,
    }
}

fn frame(w: u32, h: u32, v: u8) -> FrameRGBA {
    FrameRGBA {
        width: w,
        height: h,
        data: vec![v; (w * h * 4) as usize],
        premultiplied: true,
    }
}

#[test]
fn assembler_concatenates_until_stopped() {
    let (tx, rx) = mpsc::channel();
    tx.send(RecorderEvent::Data(vec![1, 2])).unwrap();
    tx.send(RecorderEvent::Data(vec![])).unwrap();
    tx.send(RecorderEvent::Data(vec![3])).unwrap();
    tx.send(RecorderEvent::Stopped).unwrap();
    tx.send(RecorderEvent::Data(vec![9])).unwrap();
    assert_eq!(ChunkAssembler::new().drain(&rx).unwrap(), vec![1, 2, 3]);
}

#[test]
fn assembler_waits_for_late_chunks() {
    let (tx, rx) = mpsc::channel();
    let producer = std::thread::spawn(move || {
        for i in 0..10u8 {
            std::thread::sleep(std::time::Duration::from_millis(1));
            tx.send(RecorderEvent::Data(vec![i])).unwrap();
        }
        tx.send(RecorderEvent::Stopped).unwrap();
    });
    let out = ChunkAssembler::new().drain(&rx).unwrap();
    producer.join().unwrap();
    assert_eq!(out, (0..10).collect::<Vec<u8>>());
}

#[test]
fn assembler_maps_errors_and_disconnects() {
    let (tx, rx) = mpsc::channel();
    tx.send(RecorderEvent::Data(vec![1])).unwrap();
    tx.send(RecorderEvent::Error("muxer exploded".to_owned())).unwrap();
    let err = ChunkAssembler::new().drain(&rx).unwrap_err();
    assert!(err.to_string().contains("muxer exploded"));

    let (tx, rx) = mpsc::channel::<RecorderEvent>();
    tx.send(RecorderEvent::Data(vec![1])).unwrap();
    drop(tx);
    let err = ChunkAssembler::new().drain(&rx).unwrap_err();
    assert_eq!(err.kind(), crate::foundation::error::ErrorKind::EncodeError);
}

#[test]
fn in_memory_recorder_logs_one_record_per_frame() {
    let mut rec = InMemoryRecorder::new().retaining_frames();
    let probe = rec.probe();
    rec.start(cfg(4, 2)).unwrap();
    for v in 0..3 {
        rec.push_frame(&frame(4, 2, v)).unwrap();
    }
    let out = rec.stop().unwrap();
    assert_eq!(out.len(), 3 * 16);
    assert_eq!(&out[16..24], &1u64.to_le_bytes());
    assert_eq!((probe.starts(), probe.stops(), probe.aborts()), (1, 1, 0));
    assert_eq!(probe.frames(), 3);
    assert_eq!(probe.retained_frames().len(), 3);
    assert_eq!(rec.mime_type(), FRAME_LOG_MIME);
}

#[test]
fn in_memory_recorder_rejects_misuse() {
    let mut rec = InMemoryRecorder::new();
    assert!(rec.push_frame(&frame(2, 2, 0)).is_err());
    rec.start(cfg(2, 2)).unwrap();
    assert!(rec.start(cfg(2, 2)).is_err());
    assert!(rec.push_frame(&frame(4, 2, 0)).is_err());
    rec.abort();
    assert_eq!(rec.probe().aborts(), 1);
    assert!(rec.stop().is_err());
}

#[test]
fn injected_failure_is_an_encode_error() {
    let mut rec = InMemoryRecorder::new().failing_after(2);
    rec.start(cfg(2, 2)).unwrap();
    rec.push_frame(&frame(2, 2, 0)).unwrap();
    rec.push_frame(&frame(2, 2, 0)).unwrap();
    let err = rec.push_frame(&frame(2, 2, 0)).unwrap_err();
    assert_eq!(err.kind(), crate::foundation::error::ErrorKind::EncodeError);
}

#[test]
fn audio_is_refused_unless_enabled() {
    let route = AudioRoute::new("/no/such/file.webm");
    let mut rec = InMemoryRecorder::new();
    assert!(rec.attach_audio(&route).unwrap_err().is_soft());
    let mut rec = InMemoryRecorder::new().accepting_audio();
    assert!(rec.attach_audio(&route).unwrap_err().is_soft());
}
