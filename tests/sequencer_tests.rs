//! # Sequencer Tests
//!
//! End-to-end job runs against [`RecordingTransport`], checking what reached
//! the "device" and in which order.
//!
//! ## Test Coverage
//!
//! - **Row barrier**: no chunk of row N+1 starts before row N has settled
//! - **Failure**: a failed write stops the job in every phase
//! - **Text batches**: concurrent submission, skip rules
//! - **Preconditions**: disconnected transports are rejected up front
//! - **Progress**: one report per scanline, ending at 100
//! - **Cancellation**: a dropped job sends nothing further and reads as failed

use std::time::Duration;

use pretty_assertions::assert_eq;
use thermoline::PrinterConfig;
use thermoline::error::{EncodeError, JobError, Phase, PreconditionError, TransportErrorKind};
use thermoline::protocol::graphics::Raster;
use thermoline::protocol::text::TextRecord;
use thermoline::sequencer::{JobState, PrintJob, PrintSequencer};
use thermoline::transport::{RecordingTransport, WriteEvent};

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

const BITMAP_WRITE: u8 = 0x10;

fn wide_config() -> PrinterConfig {
    PrinterConfig {
        width_dots: 384,
        height_dots: 100,
        ..PrinterConfig::LIFF_THERMAL
    }
}

/// Scanline addressed by a BITMAP_WRITE frame.
fn row_of(frame: &[u8]) -> Option<u16> {
    (frame.first() == Some(&BITMAP_WRITE)).then(|| u16::from_le_bytes([frame[1], frame[2]]))
}

fn opcodes(frames: &[Vec<u8>]) -> Vec<u8> {
    frames.iter().map(|f| f[0]).collect()
}

// ============================================================================
// ROW BARRIER
// ============================================================================

#[tokio::test]
async fn test_rows_never_overlap() {
    let transport = RecordingTransport::new().with_latency(Duration::from_millis(1));
    let mut sequencer = PrintSequencer::with_config(transport, wide_config());
    let raster = Raster::from_fn(384, 12, |x, y| (x / 8 + y) % 3 == 0).unwrap();
    sequencer.run(&PrintJob::Image(raster)).await.unwrap();

    let mut settled = vec![0usize; 12];
    for event in sequencer.transport().events() {
        match event {
            WriteEvent::Started(frame) => {
                if let Some(row) = row_of(&frame).filter(|&row| row > 0) {
                    assert_eq!(
                        settled[row as usize - 1],
                        3,
                        "row {} started before row {} settled",
                        row,
                        row - 1
                    );
                }
            }
            WriteEvent::Settled { frame, .. } => {
                if let Some(row) = row_of(&frame) {
                    settled[row as usize] += 1;
                }
            }
        }
    }
    assert_eq!(settled, vec![3; 12]);
}

#[tokio::test]
async fn test_chunks_of_a_row_are_concurrent() {
    let transport = RecordingTransport::new().with_latency(Duration::from_millis(5));
    let mut sequencer = PrintSequencer::with_config(transport, wide_config());
    let raster = Raster::blank(384, 1).unwrap();
    sequencer.run(&PrintJob::Image(raster)).await.unwrap();

    // WAKE and SET_DEFAULT are serial, then all three chunks start together
    let events = sequencer.transport().events();
    let starts: Vec<bool> = events[4..7]
        .iter()
        .map(|e| matches!(e, WriteEvent::Started(_)))
        .collect();
    assert_eq!(starts, vec![true, true, true]);
}

#[tokio::test]
async fn test_image_job_bracket() {
    let mut sequencer = PrintSequencer::new(RecordingTransport::new());
    let raster = Raster::from_fn(128, 100, |x, _| x % 2 == 0).unwrap();
    let report = sequencer.run(&PrintJob::Image(raster)).await.unwrap();

    let written = sequencer.transport().written();
    assert_eq!(written.len(), 2 + 100 + 3);
    assert_eq!(opcodes(&written[..2]), vec![0x04, 0x03]);
    assert_eq!(&written[written.len() - 3..], &[vec![0x11, 100, 0], vec![0x06, 1], vec![0x05]]);
    assert!(written[2..102].iter().all(|f| f[0] == BITMAP_WRITE && f.len() == 20));
    assert_eq!(report.rows, 100);
    assert_eq!(report.frames_written, 105);
}

// ============================================================================
// FAILURE
// ============================================================================

#[tokio::test]
async fn test_failure_mid_image_stops_job() {
    // Chunk 2 of scanline 5
    let transport = RecordingTransport::new().fail_when(|frame| {
        row_of(frame) == Some(5) && frame[3] == 2
    });
    let mut sequencer = PrintSequencer::with_config(transport, wide_config());
    let raster = Raster::from_fn(384, 100, |_, y| y % 2 == 0).unwrap();

    let err = sequencer.run(&PrintJob::Image(raster)).await.unwrap_err();
    assert_eq!(err.phase(), Some(Phase::Transmitting));
    assert_eq!(sequencer.state(), JobState::Failed);

    let submitted = sequencer.transport().submitted();
    assert!(submitted.iter().all(|f| row_of(f).is_none_or(|row| row <= 5)));
    assert!(!submitted.iter().any(|f| matches!(f[0], 0x11 | 0x06 | 0x05)));

    // The rest of row 5 was allowed to settle
    let row_five: Vec<u8> = submitted
        .iter()
        .filter(|f| row_of(f) == Some(5))
        .map(|f| f[3])
        .collect();
    assert_eq!(row_five.len(), 3);
    assert_eq!(sequencer.transport().written().len(), 2 + 5 * 3 + 2);
}

#[tokio::test]
async fn test_failure_by_write_index() {
    // WAKE, SET_DEFAULT, rows 0..=4, then row 5 fails
    let mut sequencer = PrintSequencer::new(RecordingTransport::new().fail_on_write(7));
    let raster = Raster::blank(128, 100).unwrap();

    let err = sequencer.run(&PrintJob::Image(raster)).await.unwrap_err();
    match err {
        JobError::Transport { phase, source } => {
            assert_eq!(phase, Phase::Transmitting);
            assert_eq!(source.kind, TransportErrorKind::Gatt);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    let submitted = sequencer.transport().submitted();
    assert_eq!(submitted.len(), 8);
    assert_eq!(row_of(&submitted[7]), Some(5));
}

#[tokio::test]
async fn test_failure_while_opening() {
    let transport = RecordingTransport::new().fail_when(|frame| frame == [0x04]);
    let mut sequencer = PrintSequencer::new(transport);

    let err = sequencer
        .run(&PrintJob::Text(vec![TextRecord::new("HI")]))
        .await
        .unwrap_err();
    assert_eq!(err.phase(), Some(Phase::Opening));
    assert_eq!(sequencer.transport().submitted(), vec![vec![0x04]]);
}

#[tokio::test]
async fn test_failure_while_closing() {
    let transport = RecordingTransport::new().fail_when(|frame| frame[0] == 0x06);
    let mut sequencer = PrintSequencer::new(transport);

    let err = sequencer
        .run(&PrintJob::Text(vec![TextRecord::new("HI")]))
        .await
        .unwrap_err();
    assert_eq!(err.phase(), Some(Phase::Closing));
    assert_eq!(sequencer.state(), JobState::Failed);
    // SLEEP never sent
    assert_eq!(opcodes(&sequencer.transport().submitted()), vec![0x04, 0x03, 0x21, 0x06]);
}

#[tokio::test]
async fn test_new_job_after_failure() {
    let transport = RecordingTransport::new().fail_on_write(0);
    let mut sequencer = PrintSequencer::new(transport);
    let job = PrintJob::Text(vec![TextRecord::new("AGAIN")]);

    assert!(sequencer.run(&job).await.is_err());
    sequencer.run(&job).await.unwrap();
    assert_eq!(sequencer.state(), JobState::Done);
}

// ============================================================================
// PRECONDITIONS
// ============================================================================

#[tokio::test]
async fn test_disconnected_job_sends_nothing() {
    let transport = RecordingTransport::new().with_device("printer-1");
    transport.set_connected(false);
    let mut sequencer = PrintSequencer::new(transport);

    let err = sequencer
        .run(&PrintJob::Image(Raster::blank(128, 100).unwrap()))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        JobError::Precondition(PreconditionError::NotConnected {
            device: "printer-1".into()
        })
    );
    assert_eq!(err.phase(), None);
    assert_eq!(sequencer.state(), JobState::Failed);
    assert!(sequencer.transport().events().is_empty());
}

// ============================================================================
// TEXT
// ============================================================================

#[tokio::test]
async fn test_text_skip_rules() {
    let mut sequencer = PrintSequencer::new(RecordingTransport::new());
    let job = PrintJob::Text(vec![
        TextRecord::new("TOP").at(0, 0),
        TextRecord::new("MISALIGNED").at(0, 3),
        TextRecord::new("").at(0, 16),
        TextRecord::new("BOTTOM").at(4, 24),
    ]);
    let report = sequencer.run(&job).await.unwrap();

    let skipped: Vec<(usize, EncodeError)> =
        report.skipped.into_iter().map(|s| (s.index, s.error)).collect();
    assert_eq!(
        skipped,
        vec![(1, EncodeError::InvalidRow(3)), (2, EncodeError::EmptyText)]
    );
    assert_eq!(
        sequencer.transport().submitted(),
        vec![
            vec![0x04],
            vec![0x03],
            b"\x21TOP\x00".to_vec(),
            b"\x21BOTTOM\x00".to_vec(),
            vec![0x06, 0x01],
            vec![0x05],
        ]
    );
}

#[tokio::test]
async fn test_embedded_nul_is_skipped() {
    let mut sequencer = PrintSequencer::new(RecordingTransport::new());
    let job = PrintJob::Text(vec![TextRecord::new("A\0B"), TextRecord::new("OK").at(0, 8)]);
    let report = sequencer.run(&job).await.unwrap();

    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].error, EncodeError::UnsupportedChar('\0'));
    assert_eq!(
        sequencer.transport().written(),
        vec![
            vec![0x04],
            vec![0x03],
            b"\x21OK\x00".to_vec(),
            vec![0x06, 0x01],
            vec![0x05],
        ]
    );
}

#[tokio::test]
async fn test_text_records_are_one_batch() {
    let transport = RecordingTransport::new().with_latency(Duration::from_millis(5));
    let mut sequencer = PrintSequencer::new(transport);
    let records = (0..4u16).map(|i| TextRecord::new(format!("LINE {}", i)).at(0, i * 8)).collect();
    sequencer.run(&PrintJob::Text(records)).await.unwrap();

    let events = sequencer.transport().events();
    assert!(events[4..8].iter().all(|e| matches!(e, WriteEvent::Started(_))));
    assert!(events[8..12].iter().all(|e| matches!(e, WriteEvent::Settled { ok: true, .. })));
}

#[tokio::test]
async fn test_text_job_with_only_skipped_records() {
    let mut sequencer = PrintSequencer::new(RecordingTransport::new());
    let report = sequencer
        .run(&PrintJob::Text(vec![TextRecord::new("").at(0, 0)]))
        .await
        .unwrap();
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(
        sequencer.transport().written(),
        vec![vec![0x04], vec![0x03], vec![0x06, 0x01], vec![0x05]]
    );
}

// ============================================================================
// PROGRESS
// ============================================================================

#[tokio::test]
async fn test_progress_per_scanline() {
    let mut sequencer = PrintSequencer::new(RecordingTransport::new());
    let mut seen = Vec::new();
    let mut progress = |percent: u8| seen.push(percent);
    sequencer
        .run_with(&PrintJob::Image(Raster::blank(128, 100).unwrap()), &mut progress)
        .await
        .unwrap();

    assert_eq!(seen, (1..=100).collect::<Vec<u8>>());
}

#[tokio::test]
async fn test_progress_short_image() {
    let mut sequencer = PrintSequencer::new(RecordingTransport::new());
    let mut seen = Vec::new();
    let mut progress = |percent: u8| seen.push(percent);
    sequencer
        .run_with(&PrintJob::Image(Raster::blank(128, 3).unwrap()), &mut progress)
        .await
        .unwrap();

    assert_eq!(seen, vec![33, 66, 100]);
}

// ============================================================================
// CANCELLATION
// ============================================================================

fn settled_count(events: &[WriteEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, WriteEvent::Settled { .. }))
        .count()
}

#[tokio::test]
async fn test_timed_out_job_stops_and_fails() {
    let transport = RecordingTransport::new().with_latency(Duration::from_millis(50));
    let mut sequencer = PrintSequencer::new(transport);
    let job = PrintJob::Image(Raster::blank(128, 100).unwrap());

    let result = tokio::time::timeout(Duration::from_millis(180), sequencer.run(&job)).await;
    assert!(result.is_err());
    assert_eq!(sequencer.state(), JobState::Failed);

    let started = sequencer.transport().submitted().len();
    let settled = settled_count(&sequencer.transport().events());
    assert!(started > settled, "a write should have been in flight");

    tokio::time::sleep(Duration::from_millis(200)).await;

    // Nothing new started, and the in-flight write was aborted
    let events = sequencer.transport().events();
    assert_eq!(sequencer.transport().submitted().len(), started);
    assert_eq!(settled_count(&events), settled);
    assert!(
        !sequencer
            .transport()
            .submitted()
            .iter()
            .any(|f| matches!(f[0], 0x11 | 0x06 | 0x05))
    );
}

#[tokio::test]
async fn test_sequencer_usable_after_timeout() {
    let transport = RecordingTransport::new().with_latency(Duration::from_millis(20));
    let mut sequencer = PrintSequencer::new(transport);
    let image = PrintJob::Image(Raster::blank(128, 100).unwrap());

    let timed_out = tokio::time::timeout(Duration::from_millis(30), sequencer.run(&image)).await;
    assert!(timed_out.is_err());
    assert_eq!(sequencer.state(), JobState::Failed);

    sequencer
        .run(&PrintJob::Text(vec![TextRecord::new("NEXT")]))
        .await
        .unwrap();
    assert_eq!(sequencer.state(), JobState::Done);
}
