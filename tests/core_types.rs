use printmatch::{
    ExtractorConfig, ImageView, IndexConfig, Keypoint, KeypointSet, MatchConfig, OwnedImage,
    PrintMatchError, RankConfig,
};

fn keypoint(x: f32, y: f32) -> Keypoint {
    Keypoint {
        x,
        y,
        size: 4.0,
        angle: 0.0,
        response: 0.1,
        octave: 0,
    }
}

#[test]
fn image_view_rejects_invalid_dimensions() {
    let data = [0u8; 4];

    let err = ImageView::from_slice(&data, 0, 1).err().unwrap();
    assert_eq!(
        err,
        PrintMatchError::InvalidDimensions {
            width: 0,
            height: 1,
        }
    );

    let err = ImageView::from_slice(&data, 1, 0).err().unwrap();
    assert_eq!(
        err,
        PrintMatchError::InvalidDimensions {
            width: 1,
            height: 0,
        }
    );
}

#[test]
fn image_view_rejects_invalid_stride() {
    let data = [0u8; 8];

    let err = ImageView::new(&data, 4, 1, 3).err().unwrap();
    assert_eq!(
        err,
        PrintMatchError::InvalidStride {
            width: 4,
            stride: 3,
        }
    );
}

#[test]
fn image_view_rejects_short_buffers() {
    let data = [0u8; 5];
    let err = ImageView::new(&data, 2, 3, 2).err().unwrap();
    assert_eq!(err, PrintMatchError::BufferTooSmall { needed: 6, got: 5 });
}

#[test]
fn image_view_rows_honour_stride() {
    let data: Vec<u8> = (0..12).collect();
    let view = ImageView::new(&data, 3, 3, 4).unwrap();
    assert_eq!(view.row(1).unwrap(), &[4, 5, 6]);
    assert_eq!(view.get(2, 2), Some(&10));
    assert_eq!(view.get(3, 0), None);
    assert!(view.row(3).is_none());
}

#[test]
fn owned_image_requires_exact_buffer() {
    let err = OwnedImage::new(vec![0; 5], 2, 3).err().unwrap();
    assert_eq!(err, PrintMatchError::BufferTooSmall { needed: 6, got: 5 });
    assert!(OwnedImage::new(vec![0; 7], 2, 3).is_err());
    let img = OwnedImage::new(vec![7; 6], 2, 3).unwrap();
    assert_eq!((img.width(), img.height()), (2, 3));
    assert_eq!(img.view().stride(), 2);
}

#[test]
fn interleaved_color_is_reduced_to_luma() {
    let rgb = [255u8, 0, 0, 0, 255, 0, 0, 0, 255, 10, 10, 10];
    let img = OwnedImage::from_interleaved(&rgb, 2, 2, 3).unwrap();
    assert_eq!(img.data(), &[76, 150, 29, 10]);

    let rgba = [100u8, 100, 100, 0];
    let img = OwnedImage::from_interleaved(&rgba, 1, 1, 4).unwrap();
    assert_eq!(img.data(), &[100]);

    let gray_alpha = [42u8, 255];
    let img = OwnedImage::from_interleaved(&gray_alpha, 1, 1, 2).unwrap();
    assert_eq!(img.data(), &[42]);

    assert!(OwnedImage::from_interleaved(&rgb, 2, 2, 5).is_err());
}

#[test]
fn keypoint_set_checks_descriptor_buffer() {
    let err = KeypointSet::new(vec![keypoint(1.0, 1.0)], vec![0.0; 3], 4)
        .err()
        .unwrap();
    assert_eq!(err, PrintMatchError::BufferTooSmall { needed: 4, got: 3 });
    assert!(KeypointSet::new(Vec::new(), Vec::new(), 0).is_err());

    let set = KeypointSet::new(
        vec![keypoint(1.0, 2.0), keypoint(3.0, 4.0)],
        vec![1.0, 2.0, 3.0, 4.0],
        2,
    )
    .unwrap();
    assert_eq!(set.len(), 2);
    assert_eq!(set.descriptor(1).unwrap(), &[3.0, 4.0]);
    assert!(set.descriptor(2).is_err());
    let xs: Vec<f32> = set.iter().map(|(kp, _)| kp.x).collect();
    assert_eq!(xs, vec![1.0, 3.0]);
}

#[test]
fn empty_keypoint_set_keeps_dim() {
    let set = KeypointSet::empty(128);
    assert!(set.is_empty());
    assert_eq!(set.dim(), 128);
    assert!(set.descriptors().is_empty());
}

#[test]
fn default_configs_are_valid() {
    let rank = RankConfig::default();
    assert_eq!(rank.similarity_threshold, 30.0);
    assert!(!rank.visualize);
    assert_eq!(rank.matching.ratio, 0.7);
    assert_eq!(rank.matching.index.trees, 5);
    assert_eq!(rank.matching.index.checks, 50);
    assert!(rank.validate().is_ok());
    assert!(ExtractorConfig::default().validate().is_ok());
    assert!(IndexConfig::default().validate().is_ok());
}

#[test]
fn invalid_configs_name_the_field() {
    let cfg = MatchConfig {
        ratio: 1.5,
        ..MatchConfig::default()
    };
    match cfg.validate() {
        Err(PrintMatchError::InvalidConfig { field, .. }) => assert_eq!(field, "ratio"),
        other => panic!("unexpected {other:?}"),
    }

    let cfg = RankConfig {
        similarity_threshold: -1.0,
        ..RankConfig::default()
    };
    assert!(cfg.validate().unwrap_err().is_configuration());

    let cfg = IndexConfig {
        trees: 0,
        ..IndexConfig::default()
    };
    assert!(cfg.validate().is_err());
}
