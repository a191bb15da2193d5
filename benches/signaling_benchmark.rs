use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use serde_json::json;

use switchboard::signaling::{ClientMessage, ServerMessage};

/// create a representative offer frame
fn create_offer_frame() -> String {
    serde_json::to_string(&ClientMessage::Offer {
        from: "alice".to_string(),
        to: "bob".to_string(),
        sdp: json!({
            "type": "offer",
            "sdp": "v=0\r\no=- 4611731400430051336 2 IN IP4 127.0.0.1\r\ns=-\r\nt=0 0\r\n"
        }),
    })
    .unwrap()
}

/// inbound frame parsing benchmark
fn bench_parsing(c: &mut Criterion) {
    let frame = create_offer_frame();

    let mut group = c.benchmark_group("Parsing");
    group.throughput(Throughput::Elements(1));

    group.bench_function("ClientMessage", |b| {
        b.iter(|| {
            let msg: ClientMessage = serde_json::from_str(black_box(&frame)).unwrap();
            black_box(msg)
        })
    });

    group.finish();
}

/// outbound frame encoding benchmark
fn bench_encoding(c: &mut Criterion) {
    let roster = ServerMessage::Roster {
        participants: vec!["alice".to_string(), "bob".to_string()],
    };

    let mut group = c.benchmark_group("Encoding");
    group.throughput(Throughput::Elements(1));

    group.bench_function("ServerMessage", |b| {
        b.iter(|| {
            let json = serde_json::to_string(black_box(&roster)).unwrap();
            black_box(json)
        })
    });

    group.finish();
}

/// full parse-and-forward cycle benchmark
fn bench_full_cycle(c: &mut Criterion) {
    let frame = create_offer_frame();

    let mut group = c.benchmark_group("FullCycle");
    group.throughput(Throughput::Elements(1));

    group.bench_function("parse_forward", |b| {
        b.iter(|| {
            let msg: ClientMessage = serde_json::from_str(black_box(&frame)).unwrap();

            let forwarded = match msg {
                ClientMessage::Offer { from, to, sdp } => ServerMessage::Offer { from, to, sdp },
                _ => unreachable!(),
            };

            let json = serde_json::to_string(&forwarded).unwrap();
            black_box(json)
        })
    });

    group.finish();
}

criterion_group!(benches, bench_parsing, bench_encoding, bench_full_cycle);
criterion_main!(benches);
