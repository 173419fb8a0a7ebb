use printmatch::lowlevel::{rotate_bilinear, BruteForce, KdForest, NeighborSearch};
use printmatch::{
    extract_features, ExtractorConfig, ImageView, IndexConfig, MatchConfig, Matcher, MemoryLoader,
    OwnedImage, RankConfig, Ranker,
};
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

/// Ridge-like texture: concentric rings warped by a slow wave.
fn make_image(width: usize, height: usize) -> Vec<u8> {
    let (cx, cy) = (width as f32 * 0.45, height as f32 * 0.55);
    let mut data = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            let r = (dx * dx + dy * dy).sqrt() + 3.0 * (x as f32 * 0.07).sin();
            let value = 128.0 + 90.0 * (r * 0.55).sin() + ((x * 7 + y * 13) % 17) as f32;
            data.push(value.clamp(0.0, 255.0) as u8);
        }
    }
    data
}

fn bench_extract(c: &mut Criterion) {
    let (width, height) = (256, 256);
    let data = make_image(width, height);
    let view = ImageView::from_slice(&data, width, height).unwrap();
    let cfg = ExtractorConfig::default();

    c.bench_function("extract_256", |b| {
        b.iter(|| {
            let set = extract_features(black_box(view), &cfg).unwrap();
            black_box(set.len())
        })
    });
}

fn bench_match(c: &mut Criterion) {
    let (width, height) = (256, 256);
    let data = make_image(width, height);
    let view = ImageView::from_slice(&data, width, height).unwrap();
    let turned = rotate_bilinear(view, 15.0, 128);
    let cfg = ExtractorConfig::default();
    let a = extract_features(view, &cfg).unwrap();
    let b = extract_features(turned.view(), &cfg).unwrap();

    let forest = Matcher::new(MatchConfig::default()).unwrap();
    let indexed = forest.index(b.clone()).unwrap();
    c.bench_function("match_forest", |bch| {
        bch.iter(|| black_box(forest.match_indexed(black_box(&a), &indexed).unwrap().score))
    });

    let exact = Matcher::new(MatchConfig {
        exact: true,
        ..MatchConfig::default()
    })
    .unwrap();
    let indexed_exact = exact.index(b).unwrap();
    c.bench_function("match_exact", |bch| {
        bch.iter(|| black_box(exact.match_indexed(black_box(&a), &indexed_exact).unwrap().score))
    });
}

fn bench_knn(c: &mut Criterion) {
    let (width, height) = (256, 256);
    let data = make_image(width, height);
    let view = ImageView::from_slice(&data, width, height).unwrap();
    let set = extract_features(view, &ExtractorConfig::default()).unwrap();
    let dim = set.dim();

    let forest = KdForest::build(set.descriptors().to_vec(), dim, &IndexConfig::default()).unwrap();
    let brute = BruteForce::new(set.descriptors().to_vec(), dim).unwrap();

    c.bench_function("knn2_forest", |b| {
        b.iter(|| {
            for q in set.descriptors().chunks_exact(dim) {
                black_box(forest.knn(black_box(q), 2));
            }
        })
    });
    c.bench_function("knn2_brute_force", |b| {
        b.iter(|| {
            for q in set.descriptors().chunks_exact(dim) {
                black_box(brute.knn(black_box(q), 2));
            }
        })
    });
}

fn bench_rank(c: &mut Criterion) {
    let (width, height) = (192, 192);
    let data = make_image(width, height);
    let probe = OwnedImage::new(data, width, height).unwrap();
    let mut loader = MemoryLoader::new();
    let ids: Vec<String> = (0..4).map(|i| format!("Suspect{}", i + 1)).collect();
    for (i, id) in ids.iter().enumerate() {
        loader.insert(id.as_str(), rotate_bilinear(probe.view(), 10.0 * i as f32, 128));
    }
    let ranker = Ranker::new(RankConfig::default()).unwrap();
    let gallery = ranker.gallery(&ids, &loader).unwrap();

    c.bench_function("rank_gallery_4", |b| {
        b.iter(|| {
            let report = ranker.rank_gallery(black_box(probe.view()), &gallery).unwrap();
            black_box(report.accepted.len())
        })
    });
}

criterion_group!(benches, bench_extract, bench_match, bench_knn, bench_rank);
criterion_main!(benches);
