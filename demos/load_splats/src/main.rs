use argh::FromArgs;
use std::path::PathBuf;

use splatkit_3d::{
    io::{read_splats_many, LoadOptions, SplatFormat},
    parallel::ExecutionStrategy,
};

/// Load Gaussian splat scenes and print a summary of each
#[derive(Debug, FromArgs)]
struct Args {
    /// paths to .splat or .ply files
    #[argh(positional)]
    paths: Vec<PathBuf>,

    /// translate every scene so that its centroid is at the origin
    #[argh(switch, short = 'c')]
    center: bool,

    /// number of worker threads, defaults to the global rayon pool
    #[argh(option, short = 't')]
    threads: Option<usize>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    if args.paths.is_empty() {
        return Err("at least one .splat or .ply path is required".into());
    }

    // reject unknown extensions before touching any file
    for path in &args.paths {
        SplatFormat::from_path(path)?;
    }

    let strategy = match args.threads {
        Some(n) => ExecutionStrategy::Fixed(n),
        None => ExecutionStrategy::ParallelElements,
    };
    let options = LoadOptions::default()
        .with_center(args.center)
        .with_strategy(strategy);

    let mut failed = 0;
    for (path, result) in args.paths.iter().zip(read_splats_many(&args.paths, &options)) {
        match result {
            Ok(cloud) => {
                println!("{}: #{} splats", path.display(), cloud.len());
                if let (Some(centroid), Some((min, max))) = (cloud.centroid(), cloud.bounds()) {
                    println!("  centroid: {centroid:?}");
                    println!("  bounds: {min:?} .. {max:?}");
                }
            }
            Err(err) => {
                log::error!("{}: {err}", path.display());
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(format!("failed to load {failed} of {} files", args.paths.len()).into());
    }

    Ok(())
}
