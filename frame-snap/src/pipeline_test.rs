use std::fs;
use std::path::Path;

use image::GenericImageView;

use crate::config::SnapConfig;
use crate::error::{ErrorKind, SnapError};
use crate::native::NativeJpegEngine;
use crate::pipeline::Snapshot;
use crate::testing::{MockEngine, minimal_jpeg, test_picture};

const SAMPLE: &[u8] = &[0, 0, 0, 1, 0x67, 0x42, 0x00, 0x1e, 0, 0, 0, 1, 0x65, 0x88];

fn write_sample(dir: &Path, name: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, SAMPLE).unwrap();
    path
}

#[test]
fn test_convert_file_with_native_encoder() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let input = write_sample(dir.path(), "frame.h264");
    let output = dir.path().join("frame.jpeg");

    let decode = MockEngine::default();
    let snapshot = Snapshot::new(
        decode.clone(),
        NativeJpegEngine::default(),
        SnapConfig::default(),
    );
    let info = snapshot.convert_file(&input, &output)?;
    assert_eq!((info.width, info.height), (64, 64));
    assert_eq!(decode.handles.live(), 0);

    let image = image::open(&output)?;
    assert_eq!(image.dimensions(), (64, 64));
    assert_eq!(info, crate::jpeg::JpegInfo::parse(&fs::read(&output)?)?);
    Ok(())
}

#[test]
fn test_idempotent_output() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let input = write_sample(dir.path(), "frame.H265");
    let first = dir.path().join("a.jpeg");
    let second = dir.path().join("b.jpeg");

    let snapshot = Snapshot::new(
        MockEngine::default(),
        NativeJpegEngine::default(),
        SnapConfig::default(),
    );
    snapshot.convert_file(&input, &first)?;
    snapshot.convert_file(&input, &second)?;
    assert_eq!(fs::read(&first)?, fs::read(&second)?);
    Ok(())
}

#[test]
fn test_extension_rejected_before_any_engine_call() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_sample(dir.path(), "frame.mp4");
    let output = dir.path().join("frame.jpeg");

    let engine = MockEngine::default();
    let snapshot = Snapshot::new(engine.clone(), engine.clone(), SnapConfig::default());
    let err = snapshot.convert_file(&input, &output).unwrap_err();

    assert!(matches!(err, SnapError::UnsupportedExtension(_)));
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(engine.handles.released().is_empty());
    assert!(!output.exists());
}

#[test]
fn test_empty_input_never_reaches_decoder() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("empty.h264");
    fs::write(&input, b"").unwrap();
    let output = dir.path().join("frame.jpeg");

    let engine = MockEngine::default();
    let snapshot = Snapshot::new(engine.clone(), engine.clone(), SnapConfig::default());
    assert!(matches!(
        snapshot.convert_file(&input, &output),
        Err(SnapError::EmptyInput(_))
    ));
    assert!(matches!(
        snapshot.convert_bytes(Vec::new()),
        Err(SnapError::EmptyInput(_))
    ));
    assert!(engine.handles.released().is_empty());
}

#[test]
fn test_failure_keeps_existing_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_sample(dir.path(), "frame.h264");
    let output = dir.path().join("frame.jpeg");
    fs::write(&output, b"previous").unwrap();

    let engine = MockEngine {
        video_stream: None,
        ..Default::default()
    };
    let snapshot = Snapshot::new(engine.clone(), engine.clone(), SnapConfig::default());
    let err = snapshot.convert_file(&input, &output).unwrap_err();

    assert!(matches!(err, SnapError::NoStream));
    assert_eq!(fs::read(&output).unwrap(), b"previous");
    assert_eq!(engine.handles.live(), 0);
}

#[test]
fn test_output_cap_applies() {
    let snapshot = Snapshot::new(
        MockEngine::default(),
        NativeJpegEngine::default(),
        SnapConfig {
            max_output_bytes: 100,
            ..Default::default()
        },
    );
    let err = snapshot.convert_bytes(SAMPLE).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Output);
}

#[test]
fn test_convert_bytes_with_mock_engines() -> anyhow::Result<()> {
    let engine = MockEngine {
        picture: test_picture(32, 16),
        ..Default::default()
    };
    let snapshot = Snapshot::new(engine.clone(), engine.clone(), SnapConfig::default());
    let jpeg = snapshot.convert_bytes(SAMPLE)?;
    assert_eq!(jpeg.as_ref(), minimal_jpeg(32, 16).as_slice());
    assert_eq!(engine.handles.live(), 0);
    assert_eq!(
        engine.handles.released(),
        vec!["decoder", "format", "io", "encoder", "container"]
    );
    Ok(())
}
