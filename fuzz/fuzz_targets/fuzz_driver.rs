#![no_main]

use arbitrary::Arbitrary;
use bytes::Bytes;
use chunkwise::{Collect, Coroutine, Driver, DriverConfig, Reader, SinkEvent};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    data: Vec<u8>,
    cuts: Vec<u16>,
    max_request: Option<u8>,
}

async fn record(io: Reader<Bytes, Vec<u8>>) -> Result<Vec<u8>, String> {
    let size = io.read(1).await[0];
    if size == 0xff {
        return Err("reserved size".to_string());
    }
    let body = io.read(size as usize).await;
    if size % 7 == 3 {
        io.push(vec![size]).await;
    }
    Ok(body.to_vec())
}

fn run(config: DriverConfig, chunks: impl IntoIterator<Item = Bytes>) -> Vec<SinkEvent<Vec<u8>, String>> {
    let mut driver = Driver::with_config(|| Coroutine::new(record), config);
    driver.start(Collect::new());
    for chunk in chunks {
        driver.on_chunk(chunk);
    }
    driver.flush();
    driver.into_sink().map(|sink| sink.events().to_vec()).unwrap_or_default()
}

fuzz_target!(|input: Input| {
    let config = match input.max_request {
        Some(max) => DriverConfig::new().with_max_request_bytes(max as usize),
        None => DriverConfig::new(),
    };

    let mut cuts: Vec<usize> = input
        .cuts
        .iter()
        .map(|cut| *cut as usize % (input.data.len() + 1))
        .collect();
    cuts.sort_unstable();

    let data = Bytes::from(input.data);
    let mut chunks = Vec::with_capacity(cuts.len() + 1);
    let mut start = 0;
    for cut in cuts {
        chunks.push(data.slice(start..cut));
        start = cut;
    }
    chunks.push(data.slice(start..));

    let whole = run(config, [data.clone()]);
    let fragmented = run(config, chunks);
    assert_eq!(whole, fragmented);

    let terminal = whole
        .iter()
        .filter(|event| !matches!(event, SinkEvent::Enqueue(_)))
        .count();
    assert_eq!(terminal, 1);
});
