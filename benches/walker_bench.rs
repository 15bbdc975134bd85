//! Benchmarks for tree-digest
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use std::io::Cursor;

fn benchmark_queue_operations(c: &mut Criterion) {
    use tree_digest::walker::queue::{FileTask, WorkQueue};

    c.bench_function("queue_submit_recv", |b| {
        let (sender, receiver) = WorkQueue::new(10000).split();

        b.iter(|| {
            sender.submit(FileTask::new("/test/path/file.txt".into())).unwrap();
            let received = receiver.try_recv().unwrap();
            black_box(received);
        })
    });
}

fn benchmark_md5_digest(c: &mut Criterion) {
    use tree_digest::content::{Digester, Md5Digester};

    let data = vec![0xA5u8; 1024 * 1024];
    let mut group = c.benchmark_group("md5_digest");
    group.throughput(Throughput::Bytes(data.len() as u64));

    for chunk_size in [4096usize, 65536] {
        let digester = Md5Digester::new(chunk_size);
        group.bench_function(format!("chunk_{}", chunk_size), |b| {
            b.iter(|| {
                let mut reader = Cursor::new(&data);
                black_box(digester.digest_reader(&mut reader).unwrap())
            })
        });
    }

    group.finish();
}

fn benchmark_record_row(c: &mut Criterion) {
    use std::time::UNIX_EPOCH;
    use tree_digest::content::FileMetadata;
    use tree_digest::record::FileRecord;

    let meta = FileMetadata {
        size: 1024,
        modified: UNIX_EPOCH,
        created: UNIX_EPOCH,
    };
    let record = FileRecord::new(
        "/data/projects/report, final.txt".into(),
        &meta,
        "d41d8cd98f00b204e9800998ecf8427e".into(),
    );

    c.bench_function("record_to_row", |b| b.iter(|| black_box(record.to_row())));
}

criterion_group!(
    benches,
    benchmark_queue_operations,
    benchmark_md5_digest,
    benchmark_record_row
);
criterion_main!(benches);
