use std::{fs, thread::sleep, time::Duration};

use serial_test::serial;
use tempfile::tempdir;

// The subscriber is global, so this binary installs it exactly once.
#[test]
#[serial]
fn writes_log_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("logs").join("stream_graphics.log");

    stream_graphics::logging::init(true, Some(path.clone()));
    tracing::info!("export finished");
    tracing::debug!("debug lines are kept in debug mode");

    sleep(Duration::from_millis(100));

    assert!(path.exists(), "log file was not created");
    let contents = fs::read_to_string(path).unwrap();
    assert!(contents.contains("export finished"));
    assert!(contents.contains("debug lines are kept"));
}
