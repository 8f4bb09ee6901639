//! Benchmarks for hand classification and count stabilization

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use inmoov_vision::{
    contour::{extract_contour_tree, ContourNode},
    count_stabilizer::{CountStabilizer, Retrigger, StabilizerState},
    hand_classifier::HandClassifier,
};
use opencv::{
    core::{Mat, Point, Rect, Scalar, CV_8UC1},
    imgproc,
    prelude::*,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

fn square() -> Vec<Point> {
    vec![Point::new(0, 0), Point::new(4, 0), Point::new(4, 4), Point::new(0, 4)]
}

/// Random tree with roughly `nodes` contours and nesting up to `depth`
fn random_tree(rng: &mut StdRng, nodes: usize, depth: usize) -> ContourNode {
    if depth == 0 || nodes <= 1 {
        return ContourNode::leaf(square());
    }
    let fan_out = rng.gen_range(1..=6).min(nodes - 1);
    let per_child = (nodes - 1) / fan_out;
    let children = (0..fan_out).map(|_| random_tree(rng, per_child, depth - 1)).collect();
    ContourNode::new(square(), children)
}

fn benchmark_classifier(c: &mut Criterion) {
    let mut group = c.benchmark_group("hand_classifier");
    let classifier = HandClassifier::default();
    let mut rng = StdRng::seed_from_u64(42);

    for nodes in [50, 500, 5000] {
        let tree = ContourNode::frame(640, 480, vec![random_tree(&mut rng, nodes, 8)]);
        group.bench_with_input(BenchmarkId::new("find_hands", nodes), &tree, |b, tree| {
            b.iter(|| black_box(classifier.find_hands(black_box(tree))));
        });
    }

    group.finish();
}

fn benchmark_extraction(c: &mut Criterion) {
    let mut image = Mat::zeros(480, 640, CV_8UC1).unwrap().to_mat().unwrap();
    let mut fill = |rect: Rect, value: f64| {
        imgproc::rectangle(&mut image, rect, Scalar::all(value), imgproc::FILLED, imgproc::LINE_8, 0).unwrap();
    };
    fill(Rect::new(100, 100, 300, 250), 255.0);
    fill(Rect::new(130, 130, 240, 190), 0.0);
    for x in [150, 220, 290] {
        fill(Rect::new(x, 150, 40, 150), 255.0);
    }

    c.bench_function("extract_contour_tree_640x480", |b| {
        b.iter(|| black_box(extract_contour_tree(black_box(&image)).unwrap()));
    });
}

fn benchmark_stabilizer(c: &mut Criterion) {
    let mut group = c.benchmark_group("count_stabilizer");
    let mut rng = StdRng::seed_from_u64(7);

    // Mostly stable readings with occasional flicker and dropouts
    let frames: Vec<Vec<u32>> = (0..1000)
        .map(|_| match rng.gen_range(0..10) {
            0 => Vec::new(),
            1 => vec![rng.gen_range(0..6)],
            2 => vec![2, 3],
            _ => vec![3],
        })
        .collect();

    for (name, retrigger) in [("once_per_run", Retrigger::OncePerRun), ("every_frame", Retrigger::EveryFrame)] {
        let stabilizer = CountStabilizer::new(3, retrigger);
        group.bench_with_input(BenchmarkId::new("sequence_1000", name), &frames, |b, frames| {
            b.iter(|| {
                let mut state = StabilizerState::new();
                for counts in frames {
                    black_box(stabilizer.update(&mut state, black_box(counts)));
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_classifier, benchmark_extraction, benchmark_stabilizer);
criterion_main!(benches);
