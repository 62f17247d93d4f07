//! Build command: point lists to .gam surfaces

use crate::BuildArgs;
use anyhow::{Context, Result, bail};
use gbd::{Expansion, GamutBuilder};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace};

use super::{parse_point, read_points};

/// Per-file tally of expand outcomes
#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    retained: usize,
    interior: usize,
    rejected: usize,
}

pub fn run(args: BuildArgs, verbose: u8) -> Result<()> {
    trace!(inputs = args.input.len(), "build::run");

    let mut files: Vec<PathBuf> = Vec::new();
    for pattern in &args.input {
        let matched: Vec<PathBuf> = glob::glob(pattern)
            .with_context(|| format!("Invalid pattern: {}", pattern))?
            .filter_map(|r| r.ok())
            .collect();
        if matched.is_empty() {
            bail!("No files match pattern: {}", pattern);
        }
        files.extend(matched);
    }
    if args.output.is_some() && files.len() > 1 {
        bail!("--output needs a single input, got {} files", files.len());
    }

    let center = args.center.as_deref().map(parse_point).transpose()?;
    if let Some(dir) = &args.output_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create: {}", dir.display()))?;
    }

    info!(files = files.len(), "Building gamuts");

    // Gamuts are independent; build them in parallel
    let results: Vec<Result<(PathBuf, Tally)>> = files
        .par_iter()
        .map(|input| build_one(input, &args, center))
        .collect();

    let mut failed = 0;
    for (input, r) in files.iter().zip(results) {
        match r {
            Ok((output, tally)) => {
                if verbose > 0 {
                    println!(
                        "{} -> {} ({} retained, {} interior, {} rejected)",
                        input.display(),
                        output.display(),
                        tally.retained,
                        tally.interior,
                        tally.rejected
                    );
                } else {
                    println!("{}", output.display());
                }
            }
            Err(e) => {
                failed += 1;
                eprintln!("Error: {:#}", e);
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} files failed", failed, files.len());
    }
    Ok(())
}

fn build_one(input: &Path, args: &BuildArgs, center: Option<[f64; 3]>) -> Result<(PathBuf, Tally)> {
    let points = read_points(input)?;

    let mut builder = GamutBuilder::new()
        .resolution(args.resolution)
        .jab(args.jab)
        .no_filter(args.no_filter);
    if let Some(c) = center {
        builder = builder.center(c);
    }
    let mut gamut = builder.build();

    let mut tally = Tally::default();
    for p in points {
        match gamut.expand(p) {
            Expansion::Retained => tally.retained += 1,
            Expansion::Interior => tally.interior += 1,
            Expansion::Rejected => tally.rejected += 1,
        }
    }
    debug!(input = %input.display(), ?tally, "points expanded");

    gamut
        .triangulate()
        .with_context(|| format!("Failed to triangulate: {}", input.display()))?;
    if args.cusps {
        gamut
            .compute_cusps()
            .with_context(|| format!("Failed to find cusps: {}", input.display()))?;
    }

    let output = output_path(input, args.output.as_deref(), args.output_dir.as_deref());
    gamut
        .write_gam(&output)
        .with_context(|| format!("Failed to save: {}", output.display()))?;

    if args.vrml {
        let wrl = output.with_extension("wrl");
        gamut
            .write_vrml(&wrl, true, args.cusps)
            .with_context(|| format!("Failed to save: {}", wrl.display()))?;
    }
    Ok((output, tally))
}

/// Explicit output, else `<stem>.gam` in the output directory or next to the input
fn output_path(input: &Path, output: Option<&Path>, dir: Option<&Path>) -> PathBuf {
    if let Some(o) = output {
        return o.to_path_buf();
    }
    let name = input.with_extension("gam");
    match (dir, name.file_name()) {
        (Some(d), Some(f)) => d.join(f),
        _ => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path() {
        let input = Path::new("data/printer.txt");
        assert_eq!(output_path(input, None, None), PathBuf::from("data/printer.gam"));
        assert_eq!(
            output_path(input, None, Some(Path::new("out"))),
            PathBuf::from("out/printer.gam")
        );
        assert_eq!(
            output_path(input, Some(Path::new("x.gam")), None),
            PathBuf::from("x.gam")
        );
    }
}
