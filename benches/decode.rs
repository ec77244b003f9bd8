use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::prelude::*;
use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;

use dictpack::{varint, Fingerprint, MemorySource, Pack};

const NUM_ENTRIES: usize = 256;

fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// A pack with one flat tree over `NUM_ENTRIES` table-referenced
/// fingerprints and one two-parent commit.
fn build_pack() -> (Pack<MemorySource>, u64, usize, u64, usize) {
    let mut rng = thread_rng();
    let fingerprints: Vec<Fingerprint> =
        (0..NUM_ENTRIES).map(|_| rng.gen()).collect();
    let names: Vec<String> = (0..NUM_ENTRIES).map(|i| format!("file-{:03}", i)).collect();

    let mut image = Vec::new();
    image.extend_from_slice(b"PACK");
    image.extend_from_slice(&4u32.to_be_bytes());
    image.extend_from_slice(&(NUM_ENTRIES as u32).to_be_bytes());
    for fp in &fingerprints {
        image.extend_from_slice(fp);
    }

    let mut idents = Vec::new();
    idents.extend_from_slice(&0i16.to_be_bytes());
    idents.extend_from_slice(b"Bench Author <bench@example.com>");
    idents.push(0);
    let mut paths = Vec::new();
    for name in &names {
        paths.extend_from_slice(&0o100644u16.to_be_bytes());
        paths.extend_from_slice(name.as_bytes());
        paths.push(0);
    }
    for dict in &[idents, paths] {
        varint::encode(dict.len() as u64, &mut image);
        image.extend_from_slice(&deflate(dict));
    }

    let tree_offset = image.len() as u64;
    varint::encode(NUM_ENTRIES as u64, &mut image);
    for i in 0..NUM_ENTRIES {
        varint::encode((i as u64) << 1, &mut image);
        varint::encode(i as u64 + 1, &mut image);
    }

    let mut tree_size = 0;
    for (name, _) in names.iter().zip(&fingerprints) {
        tree_size += "100644 ".len() + name.len() + 1 + 20;
    }

    let message =
        "\nSpeed up the directive loop by keeping the window mapped.\n".repeat(8);
    let commit_offset = image.len() as u64;
    image.push(0);
    image.extend_from_slice(&fingerprints[0]); // tree, inline
    varint::encode(2, &mut image);
    varint::encode(1, &mut image); // first parent, table row 0
    varint::encode(2, &mut image); // second parent, table row 1
    varint::encode(1_600_000_000, &mut image);
    varint::encode(0, &mut image); // committer
    varint::encode((90 << 1) | 1, &mut image);
    varint::encode(0, &mut image); // author
    image.extend_from_slice(&deflate(message.as_bytes()));

    let commit_size = format!(
        "tree {}\nparent {}\nparent {}\nauthor Bench Author <bench@example.com> {} +0000\ncommitter Bench Author <bench@example.com> {} +0000\n",
        hex::encode(&fingerprints[0]),
        hex::encode(&fingerprints[0]),
        hex::encode(&fingerprints[1]),
        1_600_000_090u64,
        1_600_000_000u64,
    )
    .len()
        + message.len();

    image.extend_from_slice(&[0u8; 20]);
    let pack = Pack::new(MemorySource::from_bytes(image).unwrap());
    (pack, tree_offset, tree_size, commit_offset, commit_size)
}

fn criterion_benchmark(c: &mut Criterion) {
    let (pack, tree_offset, tree_size, commit_offset, commit_size) = build_pack();
    pack.preload_dictionaries().unwrap();

    c.bench_function("decode flat tree", |b| {
        b.iter(|| {
            pack.decode_tree(black_box(tree_offset), tree_size).unwrap()
        })
    });
    c.bench_function("decode commit", |b| {
        b.iter(|| {
            pack.decode_commit(black_box(commit_offset), commit_size)
                .unwrap()
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
