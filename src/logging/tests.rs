use std::collections::HashSet;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use super::{LogBridge, LogLevel, PipelineLogger};

// Write target shared with the test so output can be inspected
#[derive(Clone)]
struct SharedBuf {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuf {
    fn new() -> Self {
        SharedBuf {
            bytes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn contents(&self) -> String {
        String::from_utf8(self.bytes.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_records_keep_lines_whole() {
    let buf = SharedBuf::new();
    let bridge = LogBridge::new(buf.clone());

    let mut handles = Vec::new();
    for task in 0..8 {
        let logger = bridge.logger();
        handles.push(tokio::spawn(async move {
            for line in 0..50 {
                logger.info(format!("task-{task}"), format!("line {line}"));
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    bridge.flush().await;

    let mut expected = HashSet::new();
    for task in 0..8 {
        for line in 0..50 {
            expected.insert(format!("[INFO] task-{task}: line {line}"));
        }
    }

    let contents = buf.contents();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 400);
    for line in lines {
        assert!(expected.contains(line), "torn or unexpected line: {line:?}");
    }

    bridge.shutdown().await;
}

#[tokio::test]
async fn test_flush_waits_for_prior_records() {
    let buf = SharedBuf::new();
    let bridge = LogBridge::new(buf.clone());
    let logger = bridge.logger();

    for i in 0..100 {
        logger.info("test", format!("record {i}"));
    }
    logger.flush().await;

    assert_eq!(buf.contents().lines().count(), 100);
    bridge.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_writes_pending_records() {
    let buf = SharedBuf::new();
    let bridge = LogBridge::new(buf.clone());
    let logger = bridge.logger();

    for i in 0..25 {
        logger.warn("drain", format!("record {i}"));
    }
    bridge.shutdown().await;

    assert_eq!(buf.contents().lines().count(), 25);
}

#[tokio::test]
async fn test_handles_survive_shutdown() {
    let buf = SharedBuf::new();
    let bridge = LogBridge::new(buf.clone());
    let logger = bridge.logger();

    bridge.shutdown().await;

    // best effort after the sink is gone: discarded, never panics
    logger.info("late", "dropped record");
    logger.flush().await;

    assert_eq!(buf.contents().lines().count(), 0);
}

#[tokio::test]
async fn test_levels_render_in_lines() {
    let buf = SharedBuf::new();
    let bridge = LogBridge::new(buf.clone());
    let logger = bridge.logger();

    logger.debug("ctx", "d");
    logger.info("ctx", "i");
    logger.warn("ctx", "w");
    logger.error("ctx", "e");
    bridge.shutdown().await;

    let contents = buf.contents();
    assert_eq!(
        contents,
        "[DEBUG] ctx: d\n[INFO] ctx: i\n[WARN] ctx: w\n[ERROR] ctx: e\n"
    );
}

#[tokio::test]
async fn test_tracing_backend_is_safe_without_subscriber() {
    let logger = PipelineLogger::to_tracing();

    logger.log(LogLevel::Info, "ctx", "goes nowhere");
    logger.flush().await;
}
