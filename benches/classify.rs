//! Classification throughput over a fixed set of synthetic observations.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use flowsig::{Direction, FlowObservation, IpProtocol, Registry};

fn observation(proto: IpProtocol, p0: &[u8], p1: &[u8], server_port: u16) -> FlowObservation {
    let mut obs = FlowObservation::new();
    obs.trans_proto = Some(proto);
    obs.server_port = server_port;
    obs.client_port = 49152;
    let d = Direction::ToServer.index();
    obs.payload[d][..p0.len().min(4)].copy_from_slice(&p0[..p0.len().min(4)]);
    obs.payload_len[d] = p0.len() as u32;
    let d = Direction::ToClient.index();
    obs.payload[d][..p1.len().min(4)].copy_from_slice(&p1[..p1.len().min(4)]);
    obs.payload_len[d] = p1.len() as u32;
    obs
}

fn workload() -> Vec<FlowObservation> {
    vec![
        observation(IpProtocol::Tcp, b"GET / HTTP/1.1", b"HTTP/1.1 200", 80),
        observation(IpProtocol::Tcp, b"SSH-2.0-x", b"SSH-2.0-y", 22),
        observation(IpProtocol::Tcp, b"\x13BitTorrent protocol", b"", 6881),
        observation(IpProtocol::Tcp, b"\xde\xad\xbe\xef", b"\xba\xad\xf0\x0d", 31337),
        observation(
            IpProtocol::Udp,
            &[0x1a, 0x2b, 0x01, 0x00, 0, 1, 0, 0, 0, 0, 0, 0, 3],
            &[],
            53,
        ),
        observation(IpProtocol::Udp, b"d1:ad2:id20:aaaa", b"", 6881),
        observation(IpProtocol::Udp, &[], &[], 40000),
    ]
}

fn bench_classify(c: &mut Criterion) {
    let registry = Registry::with_defaults().unwrap();
    let flows = workload();

    c.bench_function("classify_mixed_flows", |b| {
        b.iter(|| {
            for obs in &flows {
                black_box(registry.classify(black_box(obs)));
            }
        })
    });

    c.bench_function("registry_with_defaults", |b| {
        b.iter(|| black_box(Registry::with_defaults().unwrap()))
    });
}

criterion_group!(benches, bench_classify);
criterion_main!(benches);
