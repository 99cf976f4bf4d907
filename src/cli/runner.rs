use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use rayon::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sprite_pixelizer::naming::PrefixedNamer;
use sprite_pixelizer::{
    process_file, ArtifactNamer, ContentHashNamer, DirectorySink, PipelineReport,
    PipelineSettings, TimestampNamer,
};

use super::args::{CliArgs, Naming};

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Settings file (or defaults) with command line overrides applied
fn build_settings(args: &CliArgs) -> anyhow::Result<PipelineSettings> {
    let mut settings = match &args.settings {
        Some(path) => PipelineSettings::load(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?,
        None => PipelineSettings::default(),
    };

    if let Some(pixel_size) = args.pixel_size {
        settings.pixelizer.pixel_size = pixel_size;
    }
    if let Some(tolerance) = args.tolerance {
        settings.pixelizer.tolerance = tolerance;
    }
    if args.keep_resolution {
        settings.pixelizer.upscale_after = true;
    }
    if args.sequence {
        settings.make_sequence = true;
    }
    if let Some(framerate) = args.framerate {
        settings.assembler.framerate = framerate;
    }
    if let Some(row_threshold) = args.row_threshold {
        settings.sequencer.row_threshold = row_threshold;
    }
    if args.sidecar {
        settings.assembler.export_metadata = true;
    }
    if args.reload {
        settings.reload_artifact = true;
    }

    settings.validate()?;
    Ok(settings)
}

fn make_namer(naming: Naming) -> Box<dyn ArtifactNamer> {
    match naming {
        Naming::Timestamp => Box::new(TimestampNamer::default()),
        Naming::Hash => Box::new(ContentHashNamer),
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image")
        .to_string()
}

/// (input, output, sink prefix) for every input.
///
/// Batch outputs are named after the input stem, so two inputs sharing a
/// stem would overwrite each other and are rejected up front.
fn plan_outputs(args: &CliArgs) -> anyhow::Result<Vec<(PathBuf, PathBuf, Option<String>)>> {
    if args.inputs.len() == 1 {
        return Ok(vec![(args.inputs[0].clone(), args.output.clone(), None)]);
    }

    let mut seen: HashMap<String, &Path> = HashMap::new();
    let mut jobs = Vec::with_capacity(args.inputs.len());
    for input in &args.inputs {
        let stem = file_stem(input);
        if let Some(previous) = seen.insert(stem.clone(), input) {
            bail!(
                "{} and {} would both write {}.png; rename one of them",
                previous.display(),
                input.display(),
                stem
            );
        }
        let output = args.output.join(format!("{}.png", stem));
        jobs.push((input.clone(), output, Some(stem)));
    }
    Ok(jobs)
}

fn artifact_dir(args: &CliArgs) -> PathBuf {
    if let Some(dir) = &args.artifact_dir {
        return dir.clone();
    }
    if args.inputs.len() > 1 {
        return args.output.clone();
    }
    args.output
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn run(args: CliArgs) -> anyhow::Result<()> {
    init_logging(args.verbose);

    let settings = build_settings(&args)?;
    let artifact_dir = artifact_dir(&args);
    let jobs = plan_outputs(&args)?;

    info!("Processing {} input(s)", jobs.len());

    let results: Vec<(PathBuf, sprite_pixelizer::Result<PipelineReport>)> = jobs
        .into_par_iter()
        .map(|(input, output, prefix)| {
            let namer: Box<dyn ArtifactNamer> = match prefix {
                Some(prefix) => Box::new(PrefixedNamer::new(prefix, make_namer(args.naming))),
                None => make_namer(args.naming),
            };
            let sink = DirectorySink::new(&artifact_dir, namer)
                .with_metadata(settings.assembler.export_metadata);
            let result = process_file(&input, &output, &settings, &sink);
            (input, result)
        })
        .collect();

    let mut failed = 0;
    for (input, result) in &results {
        match result {
            Ok(report) => {
                if args.json {
                    println!("{}", serde_json::to_string(report)?);
                }
            }
            Err(e) => {
                warn!("Error processing {}: {}", input.display(), e);
                if args.json {
                    let payload = serde_json::json!({
                        "input": input.display().to_string(),
                        "error": e,
                    });
                    println!("{}", payload);
                }
                failed += 1;
            }
        }
    }

    info!("Processed: {}", results.len() - failed);
    if failed > 0 {
        bail!("{} of {} input(s) failed", failed, results.len());
    }
    Ok(())
}
