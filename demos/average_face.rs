use eigenfaces::{EigenfacePipeline, PipelineConfig, PngDirectorySink};
use std::path::PathBuf;

// Usage: average_face <image-dir> [extension] [output-dir] [num-eigenfaces]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let image_dir = PathBuf::from(args.next().ok_or("missing <image-dir> argument")?);
    let extension = args.next().unwrap_or_else(|| "jpg".to_string());
    let output_dir = PathBuf::from(args.next().unwrap_or_else(|| "eigenfaces_out".to_string()));
    let count: usize = match args.next() {
        Some(n) => n.parse()?,
        None => 5,
    };

    let config = PipelineConfig {
        extension,
        ..PipelineConfig::default()
    };
    let pipeline = EigenfacePipeline::new(config);
    let model = pipeline.run(&image_dir)?;

    let mut sink = PngDirectorySink::new(&output_dir)?;
    pipeline.render(&model, &mut sink, count)?;

    println!("Images used: {}", model.num_samples());
    println!(
        "Explained variance ratio (top {}): {:?}",
        count,
        model.explained_variance_ratio().iter().take(count).collect::<Vec<_>>()
    );
    for path in sink.written() {
        println!("Wrote {}", path.display());
    }
    Ok(())
}
