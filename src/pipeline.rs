// src/pipeline.rs

use crate::config::PipelineConfig;
use crate::dataset::DatasetMatrix;
use crate::eigenfaces::{EigenfaceDecomposer, EigenfaceModel};
use crate::error::{EigenfaceError, Result};
use crate::image_adapter::{GrayscaleImageLoader, ImageVectorAdapter};
use crate::visualization::ResultSink;
use log::info;
use std::path::Path;

/// Directory of images in, mean face and eigenfaces out.
#[derive(Debug, Clone)]
pub struct EigenfacePipeline {
    config: PipelineConfig,
    loader: GrayscaleImageLoader,
    decomposer: EigenfaceDecomposer,
}

impl EigenfacePipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let loader = GrayscaleImageLoader::new(config.dimensions).with_filter(config.resize_filter);
        Self {
            config,
            loader,
            decomposer: EigenfaceDecomposer::new(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Loads every `*.extension` image in `directory` (sorted by path) and decomposes them.
    ///
    /// # Errors
    /// Propagates the first adapter, builder or decomposition error; nothing
    /// is returned on failure.
    pub fn run(&self, directory: &Path) -> Result<EigenfaceModel> {
        let run_start_time = std::time::Instant::now();
        let sources = self.loader.enumerate(directory, &self.config.extension)?;

        let dataset = if self.config.parallel_loading {
            DatasetMatrix::from_vectors(self.loader.produce_all(&sources, true)?)?
        } else {
            let mut stream = self.loader.stream_sources(sources);
            DatasetMatrix::from_stream(&mut stream)?
        };

        let model = self.decomposer.decompose_images(dataset, self.config.dimensions)?;
        info!(
            "Eigenface run over {:?} finished in {:?}: {} images, {} eigenfaces",
            directory,
            run_start_time.elapsed(),
            model.num_samples(),
            model.len()
        );
        Ok(model)
    }

    /// Renders the mean face as `"mean"` and the top `count` eigenfaces as `"eigenface_<i>"`.
    pub fn render<S: ResultSink>(&self, model: &EigenfaceModel, sink: &mut S, count: usize) -> Result<()> {
        render_model(model, sink, count)
    }
}

/// Sends the mean face and the top `count` eigenfaces of `model` to `sink`.
///
/// # Errors
/// [`EigenfaceError::ShapeMismatch`] if the model does not record its image
/// dimensions; otherwise the first sink error.
pub fn render_model<S: ResultSink>(model: &EigenfaceModel, sink: &mut S, count: usize) -> Result<()> {
    let dimensions = model.dimensions().ok_or_else(|| {
        EigenfaceError::ShapeMismatch("model does not record image dimensions".to_string())
    })?;
    sink.render("mean", model.mean(), dimensions)?;
    for (index, (_, eigenface)) in model.iter().take(count).enumerate() {
        sink.render(&format!("eigenface_{}", index), eigenface, dimensions)?;
    }
    Ok(())
}
