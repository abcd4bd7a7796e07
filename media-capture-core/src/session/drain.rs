//! The drain loop: pull blocks from a source, append them to a sink.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::models::error::CaptureError;
use crate::traits::byte_sink::ByteSink;
use crate::traits::sample_source::SampleSource;

/// Drain `source` into `sink` until `running` is cleared or an error occurs.
///
/// Every non-empty read is appended verbatim and in order; zero-length reads
/// are skipped. `on_block` sees each appended block together with the running
/// byte total. The sink is finalized on every exit path, and `running` is
/// cleared when the loop stops on its own because of an error.
///
/// Returns the total number of bytes in the finalized sink.
pub fn run_drain_loop<S, K, F>(
    source: &mut S,
    sink: &mut K,
    running: &AtomicBool,
    block_size: usize,
    mut on_block: F,
) -> Result<u64, CaptureError>
where
    S: SampleSource + ?Sized,
    K: ByteSink + ?Sized,
    F: FnMut(&[u8], u64),
{
    let mut buf = vec![0u8; block_size.max(1)];

    let outcome = loop {
        if !running.load(Ordering::SeqCst) {
            break Ok(());
        }

        let read = match source.read(&mut buf) {
            Ok(0) => continue,
            Ok(n) => n.min(buf.len()),
            Err(e) => break Err(e),
        };

        let block = &buf[..read];
        if let Err(e) = sink.append(block) {
            break Err(e);
        }
        on_block(block, sink.bytes_written());
    };

    if outcome.is_err() {
        running.store(false, Ordering::SeqCst);
    }

    let finalized = sink.finalize();
    match outcome {
        Ok(()) => finalized,
        Err(e) => {
            if let Err(close_err) = finalized {
                log::warn!("Failed to close output after drain error: {}", close_err);
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingSink, MemorySink, ScriptedSource};

    #[test]
    fn preserves_byte_and_block_order() {
        let mut source = ScriptedSource::new(vec![vec![0x01, 0x02], vec![0x03], vec![0x04, 0x05]]);
        let mut sink = MemorySink::new();
        let running = AtomicBool::new(true);

        let total = run_drain_loop(&mut source, &mut sink, &running, 16, |_, total| {
            if total == 5 {
                running.store(false, Ordering::SeqCst);
            }
        })
        .unwrap();

        assert_eq!(total, 5);
        assert_eq!(sink.contents(), vec![0x01, 0x02, 0x03, 0x04, 0x05]);
        assert!(sink.is_finalized());
    }

    #[test]
    fn splits_blocks_larger_than_buffer() {
        let mut source = ScriptedSource::new(vec![(0u8..10).collect()]);
        let mut sink = MemorySink::new();
        let running = AtomicBool::new(true);
        let mut sizes = Vec::new();

        run_drain_loop(&mut source, &mut sink, &running, 4, |block, total| {
            sizes.push(block.len());
            if total == 10 {
                running.store(false, Ordering::SeqCst);
            }
        })
        .unwrap();

        assert_eq!(sizes, vec![4, 4, 2]);
        assert_eq!(sink.contents(), (0u8..10).collect::<Vec<_>>());
    }

    #[test]
    fn stopped_flag_skips_reading() {
        let mut source = ScriptedSource::new(vec![vec![1, 2, 3]]);
        let mut sink = MemorySink::new();
        let running = AtomicBool::new(false);

        let total = run_drain_loop(&mut source, &mut sink, &running, 8, |_, _| {}).unwrap();

        assert_eq!(total, 0);
        assert_eq!(source.log().reads, 0);
        assert!(sink.is_finalized());
    }

    #[test]
    fn source_fault_aborts_and_closes() {
        let mut source = ScriptedSource::new(vec![vec![7, 7]]);
        source.push_fault("unplugged");
        let mut sink = MemorySink::new();
        let running = AtomicBool::new(true);

        let result = run_drain_loop(&mut source, &mut sink, &running, 8, |_, _| {});

        assert_eq!(result, Err(CaptureError::DeviceFailed("unplugged".into())));
        assert!(!running.load(Ordering::SeqCst));
        assert!(sink.is_finalized());
        assert_eq!(sink.contents(), vec![7, 7]);
    }

    #[test]
    fn write_failure_aborts_loop() {
        let mut source = ScriptedSource::new(vec![vec![1; 4], vec![2; 4], vec![3; 4]]);
        let mut sink = FailingSink::new(6);
        let running = AtomicBool::new(true);
        let mut blocks = 0;

        let result = run_drain_loop(&mut source, &mut sink, &running, 4, |_, _| blocks += 1);

        assert!(matches!(result, Err(CaptureError::StorageError(_))));
        assert_eq!(blocks, 1);
        assert!(!running.load(Ordering::SeqCst));
        assert!(sink.is_finalized());
    }
}
