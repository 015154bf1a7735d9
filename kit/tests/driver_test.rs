//! End-to-end behavior of the driver with hand-written and linear sessions.
use bytes::Bytes;
use chunkwise::{
    Collect, Coroutine, Driver, DriverConfig, DriverState, Elements, Emitter, ParseOutcome,
    ParseSession, Parser, Reader, SinkEvent, StreamError,
};
use core::convert::Infallible;
use core::mem;
use test_case::test_case;

type SinkOf<P> = Collect<
    <<P as Parser>::Session as ParseSession>::Output,
    <<P as Parser>::Session as ParseSession>::Error,
>;

fn started<P: Parser>(parser: P) -> Driver<P, SinkOf<P>> {
    let mut driver = Driver::new(parser);
    driver.start(Collect::new());
    driver
}

fn sink<P: Parser>(driver: &Driver<P, SinkOf<P>>) -> &SinkOf<P> {
    driver.sink().unwrap()
}

// =============================================================================
// Sessions
// =============================================================================

/// Reads fixed-size blocks and completes with each one.
#[derive(Debug)]
struct Chunker {
    size: usize,
    trailing: Option<u8>,
}

impl Chunker {
    fn new(size: usize) -> Self {
        Self {
            size,
            trailing: None,
        }
    }

    /// Hands out `value` when flushed mid-request.
    fn with_trailing(size: usize, value: u8) -> Self {
        Self {
            size,
            trailing: Some(value),
        }
    }
}

impl ParseSession for Chunker {
    type View = Bytes;
    type Output = Vec<u8>;
    type Error = Infallible;

    fn step(
        &mut self,
        input: Option<Bytes>,
        _out: &mut Emitter<'_, Vec<u8>>,
    ) -> ParseOutcome<Vec<u8>, Infallible> {
        match input {
            None => ParseOutcome::Suspended(self.size),
            Some(block) => ParseOutcome::Completed(block.to_vec()),
        }
    }

    fn abort(&mut self, _out: &mut Emitter<'_, Vec<u8>>) -> Result<Option<Vec<u8>>, Infallible> {
        Ok(self.trailing.map(|value| vec![value]))
    }
}

/// A chunker whose cleanup path fails, or pushes a value before terminating.
#[derive(Debug)]
enum Flusher {
    Throwing,
    Pushing,
}

impl ParseSession for Flusher {
    type View = Bytes;
    type Output = Vec<u8>;
    type Error = &'static str;

    fn step(
        &mut self,
        input: Option<Bytes>,
        _out: &mut Emitter<'_, Vec<u8>>,
    ) -> ParseOutcome<Vec<u8>, &'static str> {
        match input {
            None => ParseOutcome::Suspended(3),
            Some(block) => ParseOutcome::Completed(block.to_vec()),
        }
    }

    fn abort(
        &mut self,
        out: &mut Emitter<'_, Vec<u8>>,
    ) -> Result<Option<Vec<u8>>, &'static str> {
        match self {
            Flusher::Throwing => {
                out.push(vec![7]);
                Err("cleanup failed")
            }
            Flusher::Pushing => {
                out.push(vec![9, 9]);
                Ok(None)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Packet {
    size: u8,
    data: Bytes,
}

async fn packet(io: Reader<Bytes, Packet>) -> Result<Packet, Infallible> {
    let size = io.read(1).await[0];
    let data = io.read(size as usize).await;
    Ok(Packet { size, data })
}

async fn thrower(io: Reader<Bytes, Vec<u8>>) -> Result<Vec<u8>, String> {
    let head = io.read(3).await;
    Err(format!("rejected {} bytes", head.len()))
}

/// Completes with "normal value" after three bytes, or hands out "value from
/// flush" when the stream ends first.
fn value_flusher() -> impl ParseSession<View = Bytes, Output = &'static str, Error = &'static str> {
    Coroutine::with_cleanup(
        |io: Reader<Bytes, &'static str>| async move {
            let _ = io.read(3).await;
            Ok::<_, &'static str>("normal value")
        },
        |_out: &mut Emitter<'_, &'static str>| Ok(Some("value from flush")),
    )
}

/// Fails with "oops" whenever the stream ends before three bytes arrived.
fn throwing_flusher() -> impl ParseSession<View = Bytes, Output = Vec<u8>, Error = &'static str> {
    Coroutine::with_cleanup(
        |io: Reader<Bytes, Vec<u8>>| async move { Ok::<_, &'static str>(io.read(3).await.to_vec()) },
        |_out: &mut Emitter<'_, Vec<u8>>| Err("oops"),
    )
}

fn packets(driver: &Driver<impl Parser, Collect<Packet, Infallible>>) -> Vec<(u8, Vec<u8>)> {
    driver
        .sink()
        .unwrap()
        .values()
        .map(|packet| (packet.size, packet.data.to_vec()))
        .collect()
}

// =============================================================================
// Chunker
// =============================================================================

#[test]
fn test_single_bytes_complete_one_block() {
    let mut driver = started(|| Chunker::new(3));

    driver.on_chunk(Bytes::from_static(&[1]));
    driver.on_chunk(Bytes::from_static(&[2]));
    assert_eq!(sink(&driver).enqueued(), 0);

    driver.on_chunk(Bytes::from_static(&[3]));
    assert_eq!(sink(&driver).events(), &[SinkEvent::Enqueue(vec![1, 2, 3])]);
}

#[test]
fn test_one_chunk_completes_two_blocks() {
    let mut driver = started(|| Chunker::new(3));
    driver.on_chunk(Bytes::from_static(&[1, 2, 3, 4, 5, 6]));

    assert_eq!(
        sink(&driver).events(),
        &[
            SinkEvent::Enqueue(vec![1, 2, 3]),
            SinkEvent::Enqueue(vec![4, 5, 6])
        ]
    );
}

#[test]
fn test_exact_block_then_flush_terminates() {
    let mut driver = started(|| Chunker::new(3));
    driver.on_chunk(Bytes::from_static(&[1, 2, 3]));
    driver.flush();

    assert_eq!(driver.state(), DriverState::Terminated);
    assert_eq!(
        sink(&driver).events(),
        &[SinkEvent::Enqueue(vec![1, 2, 3]), SinkEvent::Terminate]
    );
}

#[test]
fn test_flush_discards_partial_block() {
    let mut driver = started(|| Chunker::new(3));
    driver.on_chunk(Bytes::from_static(&[1, 2, 3]));
    driver.on_chunk(Bytes::from_static(&[4]));
    driver.flush();

    assert_eq!(
        sink(&driver).events(),
        &[SinkEvent::Enqueue(vec![1, 2, 3]), SinkEvent::Terminate]
    );
}

#[test_case(&[] ; "nothing fed")]
#[test_case(&[&[1, 2, 3]] ; "three bytes")]
#[test_case(&[&[1, 2, 3, 4]] ; "four bytes")]
fn test_abort_without_cleanup_is_silent(chunks: &[&'static [u8]]) {
    let mut driver = started(|| Chunker::new(3));
    for chunk in chunks {
        driver.on_chunk(*chunk);
    }
    driver.flush();

    let sink = sink(&driver);
    assert!(sink.is_terminated());
    assert!(sink.failure().is_none());
    assert!(sink.values().all(|block| block.len() == 3));
}

#[test]
fn test_cleanup_value_precedes_terminate() {
    let mut driver = started(|| Chunker::with_trailing(3, 42));
    driver.on_chunk(Bytes::from_static(&[1, 2]));
    driver.flush();

    assert_eq!(
        sink(&driver).events(),
        &[SinkEvent::Enqueue(vec![42]), SinkEvent::Terminate]
    );
}

#[test_case(&[&[1, 2, 3], &[4, 5, 6]] ; "aligned chunks")]
#[test_case(&[&[1], &[2, 3, 4, 5], &[6]] ; "misaligned chunks")]
#[test_case(&[&[1, 2], &[], &[3, 4, 5, 6]] ; "with empty chunk")]
#[test_case(&[&[1, 2, 3, 4, 5, 6, 7]] ; "with leftover")]
fn test_fragmentation_does_not_change_blocks(chunks: &[&'static [u8]]) {
    let mut driver = started(|| Chunker::new(3));
    for chunk in chunks {
        driver.on_chunk(*chunk);
    }

    let blocks: Vec<_> = sink(&driver).values().cloned().collect();
    assert_eq!(blocks, vec![vec![1, 2, 3], vec![4, 5, 6]]);
}

// =============================================================================
// Cleanup failures
// =============================================================================

#[test]
fn test_failing_cleanup_errors_instead_of_terminate() {
    let mut driver = started(|| Flusher::Throwing);
    driver.on_chunk(Bytes::from_static(&[1]));
    driver.flush();

    assert_eq!(driver.state(), DriverState::Errored);
    assert_eq!(
        sink(&driver).events(),
        &[
            SinkEvent::Enqueue(vec![7]),
            SinkEvent::Error(StreamError::Cleanup("cleanup failed"))
        ]
    );
}

#[test]
fn test_failing_cleanup_flushed_immediately() {
    let mut driver = started(|| Flusher::Throwing);
    driver.flush();

    assert_eq!(
        sink(&driver).events(),
        &[
            SinkEvent::Enqueue(vec![7]),
            SinkEvent::Error(StreamError::Cleanup("cleanup failed"))
        ]
    );
}

#[test]
fn test_cleanup_value_flushed_immediately() {
    let mut driver = started(|| Chunker::with_trailing(3, 42));
    driver.flush();

    assert_eq!(
        sink(&driver).events(),
        &[SinkEvent::Enqueue(vec![42]), SinkEvent::Terminate]
    );
}

#[test]
fn test_pushing_cleanup_then_terminate() {
    let mut driver = started(|| Flusher::Pushing);
    driver.on_chunk(Bytes::from_static(&[1, 2, 3, 4]));
    driver.flush();

    assert_eq!(
        sink(&driver).events(),
        &[
            SinkEvent::Enqueue(vec![1, 2, 3]),
            SinkEvent::Enqueue(vec![9, 9]),
            SinkEvent::Terminate
        ]
    );
}

// =============================================================================
// Linear procedures
// =============================================================================

#[test]
fn test_packets_across_chunks() {
    let mut driver = started(|| Coroutine::new(packet));

    driver.on_chunk(Bytes::from_static(&[1, 42]));
    assert_eq!(packets(&driver), vec![(1, vec![42])]);

    driver.on_chunk(Bytes::from_static(&[3, 101]));
    assert_eq!(packets(&driver).len(), 1);

    driver.on_chunk(Bytes::from_static(&[102, 103]));
    assert_eq!(
        packets(&driver),
        vec![(1, vec![42]), (3, vec![101, 102, 103])]
    );
}

#[test]
fn test_empty_packet() {
    let mut driver = started(|| Coroutine::new(packet));
    driver.on_chunk(Bytes::from_static(&[0]));

    assert_eq!(packets(&driver), vec![(0, vec![])]);
    assert_eq!(driver.state(), DriverState::Running);
}

#[test]
fn test_packet_aliases_input_chunk() {
    let chunk = Bytes::from(vec![3u8, 10, 20, 30, 2, 40, 50]);
    let mut driver = started(|| Coroutine::new(packet));
    driver.on_chunk(chunk.clone());

    let sink = sink(&driver);
    let values: Vec<_> = sink.values().collect();
    assert_eq!(values.len(), 2);
    assert_eq!(values[0].data.as_ptr(), chunk[1..].as_ptr());
    assert_eq!(values[1].data.as_ptr(), chunk[5..].as_ptr());
}

#[test]
fn test_packet_spanning_chunks_is_copied() {
    let first = Bytes::from(vec![3u8, 10]);
    let second = Bytes::from(vec![20u8, 30]);
    let mut driver = started(|| Coroutine::new(packet));
    driver.on_chunk(first.clone());
    driver.on_chunk(second.clone());

    let data = &sink(&driver).values().next().unwrap().data;
    assert_eq!(&data[..], &[10, 20, 30]);
    assert_ne!(data.as_ptr(), first[1..].as_ptr());
    assert_ne!(data.as_ptr(), second.as_ptr());
}

#[test]
fn test_procedure_failure_is_reported_once() {
    let mut driver = started(|| Coroutine::new(thrower));
    driver.on_chunk(Bytes::from_static(&[1, 2, 3, 4]));
    driver.on_chunk(Bytes::from_static(&[5, 6, 7]));
    driver.flush();

    assert_eq!(driver.state(), DriverState::Errored);
    let sink = sink(&driver);
    assert_eq!(sink.enqueued(), 0);
    assert_eq!(sink.terminal_calls(), 1);
    assert_eq!(
        sink.failure(),
        Some(&StreamError::Procedure("rejected 3 bytes".to_string()))
    );
}

#[test]
fn test_pushes_and_completion_keep_order() {
    let mut driver = started(|| {
        Coroutine::new(|io: Reader<Bytes, u8>| async move {
            let count = io.read(1).await[0];
            for byte in io.read(count as usize).await.iter() {
                io.push(*byte).await;
            }
            Ok::<u8, Infallible>(0)
        })
    });
    driver.on_chunk(Bytes::from_static(&[2, 5, 6, 1, 7]));

    let values: Vec<u8> = sink(&driver).values().copied().collect();
    assert_eq!(values, vec![5, 6, 0, 7, 0]);
}

#[test]
fn test_typed_view_counts_elements() {
    let mut driver = started(|| {
        Coroutine::new(|io: Reader<Elements<u16>, Vec<u16>>| async move {
            Ok::<_, Infallible>(io.read(2).await.to_vec())
        })
    });
    driver.on_chunk(Bytes::from_static(&[1, 0, 2]));
    assert_eq!(driver.buffered(), 3);

    driver.on_chunk(Bytes::from_static(&[1]));
    let values: Vec<_> = sink(&driver).values().cloned().collect();
    assert_eq!(values, vec![vec![1, 258]]);
}

#[test_case(&[0, 0], vec![(vec![], vec![])] ; "two empty fields")]
#[test_case(&[1, 0, 7, 0, 0], vec![(vec![7], vec![]), (vec![], vec![])] ; "empty field after value")]
fn test_consecutive_zero_reads(input: &'static [u8], expected: Vec<(Vec<u8>, Vec<u8>)>) {
    let mut driver = started(|| {
        Coroutine::new(|io: Reader<Bytes, (Bytes, Bytes)>| async move {
            let lens = io.read(2).await;
            let first = io.read(lens[0] as usize).await;
            let second = io.read(lens[1] as usize).await;
            Ok::<_, Infallible>((first, second))
        })
    });
    driver.on_chunk(input);

    assert_eq!(driver.state(), DriverState::Running);
    let records: Vec<_> = sink(&driver)
        .values()
        .map(|(first, second)| (first.to_vec(), second.to_vec()))
        .collect();
    assert_eq!(records, expected);
}

#[test]
fn test_header_session_before_blocks() {
    let mut header = true;
    let mut driver = started(move || {
        let first = mem::replace(&mut header, false);
        Coroutine::new(move |io: Reader<Bytes, Bytes>| async move {
            if first {
                return Ok::<_, Infallible>(Bytes::from_static(b"hdr"));
            }
            Ok(io.read(2).await)
        })
    });
    driver.on_chunk(Bytes::from_static(&[1, 2]));

    assert_eq!(driver.state(), DriverState::Running);
    assert_eq!(
        sink(&driver).events(),
        &[
            SinkEvent::Enqueue(Bytes::from_static(b"hdr")),
            SinkEvent::Enqueue(Bytes::from_static(&[1, 2]))
        ]
    );
}

// =============================================================================
// Cleanup in linear procedures
// =============================================================================

#[test]
fn test_value_flusher_completes_normally() {
    let mut driver = started(value_flusher);
    driver.on_chunk(Bytes::from_static(&[1, 2, 3]));

    assert_eq!(sink(&driver).events(), &[SinkEvent::Enqueue("normal value")]);
    assert!(!sink(&driver).is_closed());
}

#[test]
fn test_value_flusher_flushed_immediately() {
    let mut driver = started(value_flusher);
    driver.flush();

    assert_eq!(driver.state(), DriverState::Terminated);
    assert_eq!(
        sink(&driver).events(),
        &[SinkEvent::Enqueue("value from flush"), SinkEvent::Terminate]
    );
}

#[test_case(&[] ; "flushed immediately")]
#[test_case(&[&[1]] ; "flushed after first byte")]
fn test_throwing_flusher(chunks: &[&'static [u8]]) {
    let mut driver = started(throwing_flusher);
    for chunk in chunks {
        driver.on_chunk(*chunk);
    }
    assert!(sink(&driver).events().is_empty());
    driver.flush();

    assert_eq!(driver.state(), DriverState::Errored);
    assert_eq!(
        sink(&driver).events(),
        &[SinkEvent::Error(StreamError::Cleanup("oops"))]
    );
}

// =============================================================================
// Limits and sink failures
// =============================================================================

#[test]
fn test_request_over_limit_errors() {
    let config = DriverConfig::new().with_max_request_bytes(4);
    let mut driver = Driver::with_config(|| Coroutine::new(packet), config);
    driver.start(Collect::new());
    driver.on_chunk(Bytes::from_static(&[3, 1, 2, 3, 9, 0]));

    let sink = driver.sink().unwrap();
    assert_eq!(sink.enqueued(), 1);
    assert_eq!(
        sink.failure(),
        Some(&StreamError::RequestTooLarge {
            requested: 9,
            max: 4
        })
    );
}

#[test]
fn test_sink_rejection_stops_stream() {
    let mut driver = Driver::new(|| Chunker::new(1));
    driver.start(Collect::new().failing_after(2));
    driver.on_chunk(Bytes::from_static(&[1, 2, 3, 4]));
    driver.on_chunk(Bytes::from_static(&[5]));
    driver.flush();

    let sink = driver.into_sink().unwrap();
    assert_eq!(sink.into_values(), vec![vec![1], vec![2]]);
}

#[test]
fn test_nothing_after_terminal_call() {
    let mut driver = started(|| Chunker::new(1));
    driver.flush();
    driver.on_chunk(Bytes::from_static(&[1]));
    driver.flush();

    let sink = sink(&driver);
    assert_eq!(sink.events(), &[SinkEvent::Terminate]);
}
