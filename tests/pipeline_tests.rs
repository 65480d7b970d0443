// In tests/pipeline_tests.rs

use approx::assert_abs_diff_eq;
use eigenfaces::{
    DatasetMatrix, EigenfaceError, EigenfacePipeline, GrayscaleImageLoader, ImageDimensions,
    ImageVectorAdapter, PipelineConfig, PngDirectorySink, ResizeFilter,
};
use image::{GrayImage, Luma, Rgb, RgbImage};
use std::path::Path;
use tempfile::tempdir;

const FLOAT_TOLERANCE: f64 = 1e-9;

// Writes five 4x4 "faces" whose pixels follow simple, distinct patterns.
fn write_faces(dir: &Path) -> Vec<Vec<u8>> {
    let mut all_pixels = Vec::new();
    for i in 0..5u32 {
        let image = GrayImage::from_fn(4, 4, |x, y| Luma([((x * 37 + y * 11 + i * 53) % 256) as u8]));
        all_pixels.push(image.as_raw().clone());
        image.save(dir.join(format!("face_{}.png", i))).unwrap();
    }
    all_pixels
}

fn config_4x4(parallel_loading: bool) -> PipelineConfig {
    PipelineConfig {
        dimensions: ImageDimensions::new(4, 4).unwrap(),
        extension: "png".to_string(),
        parallel_loading,
        resize_filter: ResizeFilter::Nearest,
    }
}

#[test]
fn pipeline_mean_matches_pixel_average() {
    let dir = tempdir().unwrap();
    let pixels = write_faces(dir.path());

    let model = EigenfacePipeline::new(config_4x4(true)).run(dir.path()).unwrap();
    assert_eq!(model.num_samples(), 5);
    assert_eq!(model.len(), 5);
    assert_eq!(model.dimensions(), Some(ImageDimensions::new(4, 4).unwrap()));

    for j in 0..16 {
        let expected = pixels.iter().map(|p| p[j] as f64 / 255.0).sum::<f64>() / 5.0;
        assert_abs_diff_eq!(model.mean()[j], expected, epsilon = FLOAT_TOLERANCE);
    }
}

#[test]
fn colour_faces_are_averaged_as_rec601_grey() {
    let dir = tempdir().unwrap();
    // Face 0 is uniformly red, face 1 uniformly blue, face 2 uniformly white.
    let colours = [[255u8, 0, 0], [0, 0, 255], [255, 255, 255]];
    for (i, colour) in colours.iter().enumerate() {
        RgbImage::from_pixel(4, 4, Rgb(*colour))
            .save(dir.path().join(format!("face_{}.png", i)))
            .unwrap();
    }

    let model = EigenfacePipeline::new(config_4x4(false)).run(dir.path()).unwrap();
    let expected = (76.0 + 29.0 + 255.0) / 255.0 / 3.0;
    for &m in model.mean().iter() {
        assert_abs_diff_eq!(m, expected, epsilon = FLOAT_TOLERANCE);
    }
}

#[test]
fn parallel_and_sequential_runs_agree() {
    let dir = tempdir().unwrap();
    write_faces(dir.path());

    let parallel = EigenfacePipeline::new(config_4x4(true)).run(dir.path()).unwrap();
    let sequential = EigenfacePipeline::new(config_4x4(false)).run(dir.path()).unwrap();

    assert_eq!(parallel.mean(), sequential.mean());
    for (a, b) in parallel.iter().zip(sequential.iter()) {
        assert_abs_diff_eq!(a.0, b.0, epsilon = 1e-6);
        for (x, y) in a.1.iter().zip(b.1.iter()) {
            assert_abs_diff_eq!(*x, *y, epsilon = 1e-6);
        }
    }
}

#[test]
fn empty_folder_is_empty_dataset() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("readme.txt"), b"no images here").unwrap();

    for parallel in [true, false] {
        let result = EigenfacePipeline::new(config_4x4(parallel)).run(dir.path());
        assert!(
            matches!(result, Err(EigenfaceError::EmptyDataset)),
            "parallel={} gave {:?}",
            parallel,
            result
        );
    }
}

#[test]
fn corrupt_image_aborts_the_run() {
    let dir = tempdir().unwrap();
    write_faces(dir.path());
    std::fs::write(dir.path().join("face_9.png"), b"\x89PNG\r\n\x1a\ntruncated").unwrap();

    let result = EigenfacePipeline::new(config_4x4(false)).run(dir.path());
    match result {
        Err(EigenfaceError::ImageLoad { path, .. }) => assert!(path.ends_with("face_9.png")),
        other => panic!("expected ImageLoad error, got {:?}", other),
    }
}

#[test]
fn mismatched_loader_sizes_are_inconsistent() {
    let dir = tempdir().unwrap();
    let first = dir.path().join("a.png");
    let second = dir.path().join("b.png");
    GrayImage::from_pixel(20, 25, Luma([100])).save(&first).unwrap();
    GrayImage::from_pixel(10, 10, Luma([200])).save(&second).unwrap();

    let large = GrayscaleImageLoader::new(ImageDimensions::new(200, 250).unwrap());
    let small = GrayscaleImageLoader::new(ImageDimensions::new(100, 100).unwrap());
    let vectors = vec![large.produce(&first), small.produce(&second)];

    match DatasetMatrix::try_from_vectors(vectors) {
        Err(EigenfaceError::InconsistentDimension {
            row,
            source_id,
            expected,
            found,
        }) => {
            assert_eq!(row, 1);
            assert!(source_id.unwrap().ends_with("b.png"));
            assert_eq!(expected, 200 * 250);
            assert_eq!(found, 100 * 100);
        }
        other => panic!("expected InconsistentDimension, got {:?}", other),
    }
}

#[test]
fn render_writes_mean_and_top_eigenfaces() {
    let dir = tempdir().unwrap();
    write_faces(dir.path());
    let out = dir.path().join("rendered");

    let pipeline = EigenfacePipeline::new(config_4x4(true));
    let model = pipeline.run(dir.path()).unwrap();
    let mut sink = PngDirectorySink::new(&out).unwrap();
    pipeline.render(&model, &mut sink, 3).unwrap();

    let names: Vec<String> = sink
        .written()
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["mean.png", "eigenface_0.png", "eigenface_1.png", "eigenface_2.png"]);
    for path in sink.written() {
        let image = image::open(path).unwrap();
        assert_eq!((image.width(), image.height()), (4, 4));
    }
}

#[test]
fn saved_model_survives_reload() {
    let dir = tempdir().unwrap();
    write_faces(dir.path());
    let model = EigenfacePipeline::new(config_4x4(true)).run(dir.path()).unwrap();

    let path = dir.path().join("faces.model");
    model.save_model(&path).unwrap();
    let loaded = eigenfaces::EigenfaceModel::load_model(&path).unwrap();
    assert_eq!(loaded, model);
}
