mod common;

use common::{blob_image, rotated};
use printmatch::lowlevel::{find_correspondences, ratio_test, BruteForce, KdForest, NeighborSearch};
use printmatch::{
    extract_features, ExtractorConfig, IndexConfig, IndexedKeypointSet, Keypoint, KeypointSet,
    PrintMatchError, SingleNeighborPolicy,
};

fn features(seed: u64, angle: f32) -> KeypointSet {
    let img = blob_image(128, 128, seed);
    let img = if angle == 0.0 { img } else { rotated(&img, angle) };
    extract_features(img.view(), &ExtractorConfig::default()).unwrap()
}

fn one_keypoint_set(descriptor: Vec<f32>) -> KeypointSet {
    let kp = Keypoint {
        x: 5.0,
        y: 5.0,
        size: 3.0,
        angle: 0.0,
        response: 0.05,
        octave: 0,
    };
    let dim = descriptor.len();
    KeypointSet::new(vec![kp], descriptor, dim).unwrap()
}

#[test]
fn pairs_are_ordered_and_in_range() {
    let query = features(21, 15.0);
    let train = IndexedKeypointSet::new(features(21, 0.0), &IndexConfig::default()).unwrap();
    let pairs = find_correspondences(&query, &train).unwrap();

    assert_eq!(pairs.len(), query.len());
    for (i, pair) in pairs.iter().enumerate() {
        assert_eq!(pair.query_idx, i);
        assert!(pair.first.index < train.set().len());
        let second = pair.second.expect("train set has more than one descriptor");
        assert!(second.index < train.set().len());
        assert_ne!(second.index, pair.first.index);
        assert!(pair.first.distance <= second.distance);
    }
}

#[test]
fn exhaustive_forest_search_agrees_with_linear_scan() {
    let query = features(22, 15.0);
    let train = features(22, 0.0);
    let cfg = IndexConfig {
        checks: 1_000_000,
        ..IndexConfig::default()
    };
    let forest = IndexedKeypointSet::new(train.clone(), &cfg).unwrap();
    let exact = IndexedKeypointSet::exact(train).unwrap();

    let approx = find_correspondences(&query, &forest).unwrap();
    let truth = find_correspondences(&query, &exact).unwrap();
    assert_eq!(approx, truth);
    assert_eq!(forest.into_set(), exact.into_set());
}

#[test]
fn forest_finds_identical_descriptors() {
    let set = features(23, 0.0);
    let forest = KdForest::build(
        set.descriptors().to_vec(),
        set.dim(),
        &IndexConfig::default(),
    )
    .unwrap();
    assert_eq!(forest.len(), set.len());
    assert_eq!(forest.num_trees(), 5);
    for (i, (_, desc)) in set.iter().enumerate() {
        let found = forest.knn(desc, 1);
        assert_eq!(found[0].distance, 0.0, "descriptor {i}");
    }
}

#[test]
fn forest_is_reproducible_for_a_seed() {
    let query = features(24, 15.0);
    let train = features(24, 0.0);
    let cfg = IndexConfig::default();
    let a = find_correspondences(&query, &IndexedKeypointSet::new(train.clone(), &cfg).unwrap())
        .unwrap();
    let b = find_correspondences(&query, &IndexedKeypointSet::new(train, &cfg).unwrap()).unwrap();
    assert_eq!(a, b);
}

#[test]
fn default_forest_recall_is_useful() {
    let query = features(25, 15.0);
    let train = features(25, 0.0);
    let forest = KdForest::build(
        train.descriptors().to_vec(),
        train.dim(),
        &IndexConfig::default(),
    )
    .unwrap();
    let exact = BruteForce::new(train.descriptors().to_vec(), train.dim()).unwrap();

    let mut agree = 0;
    for (_, desc) in query.iter() {
        if forest.knn(desc, 1)[0].index == exact.knn(desc, 1)[0].index {
            agree += 1;
        }
    }
    assert!(agree * 4 >= query.len(), "{agree} of {}", query.len());
}

#[test]
fn mismatched_descriptor_lengths_fail() {
    let train = IndexedKeypointSet::exact(one_keypoint_set(vec![1.0; 8])).unwrap();
    let err = find_correspondences(&one_keypoint_set(vec![1.0; 4]), &train).unwrap_err();
    assert_eq!(err, PrintMatchError::DescriptorMismatch { left: 4, right: 8 });
    assert!(err.is_configuration());
}

#[test]
fn empty_sides_give_no_pairs() {
    let train = IndexedKeypointSet::new(one_keypoint_set(vec![1.0; 4]), &IndexConfig::default())
        .unwrap();
    assert!(find_correspondences(&KeypointSet::empty(4), &train)
        .unwrap()
        .is_empty());

    let empty_train = IndexedKeypointSet::new(KeypointSet::empty(4), &IndexConfig::default())
        .unwrap();
    assert!(find_correspondences(&one_keypoint_set(vec![1.0; 4]), &empty_train)
        .unwrap()
        .is_empty());
}

#[test]
fn single_target_descriptor_has_no_second_neighbor() {
    let train = IndexedKeypointSet::new(one_keypoint_set(vec![0.0; 4]), &IndexConfig::default())
        .unwrap();
    let query = one_keypoint_set(vec![1.0; 4]);
    let pairs = find_correspondences(&query, &train).unwrap();
    assert_eq!(pairs.len(), 1);
    assert!(pairs[0].second.is_none());
    assert_eq!(pairs[0].first.distance, 2.0);

    assert!(ratio_test(&pairs, 0.7, SingleNeighborPolicy::Reject).is_empty());
    assert_eq!(ratio_test(&pairs, 0.7, SingleNeighborPolicy::Accept).len(), 1);
    assert!(ratio_test(&pairs, 0.7, SingleNeighborPolicy::AcceptBelow(1.5)).is_empty());
    assert_eq!(
        ratio_test(&pairs, 0.7, SingleNeighborPolicy::AcceptBelow(2.5)).len(),
        1
    );
}
