//! Info command: gamut summary

use crate::InfoArgs;
use anyhow::{Context, Result};
use gbd::{Gamut, SECTOR_NAMES};
use serde::Serialize;
use std::path::Path;
use tracing::trace;

use super::{format_point, load_gamut};

/// Machine-readable gamut summary
#[derive(Debug, Serialize)]
struct GamutReport {
    file: String,
    color_rep: &'static str,
    resolution: f64,
    center: [f64; 3],
    vertices: usize,
    triangles: usize,
    raw_vertices: usize,
    volume: f64,
    colorspace_white: Option<[f64; 3]>,
    colorspace_black: Option<[f64; 3]>,
    gamut_white: Option<[f64; 3]>,
    gamut_black: Option<[f64; 3]>,
    cusps: Option<Vec<Cusp>>,
}

#[derive(Debug, Serialize)]
struct Cusp {
    hue: &'static str,
    lab: [f64; 3],
}

pub fn run(args: InfoArgs, verbose: u8) -> Result<()> {
    trace!(inputs = args.input.len(), "info::run");

    let mut reports = Vec::with_capacity(args.input.len());
    for path in &args.input {
        let gamut = load_gamut(path)?;
        reports.push(report(path, &gamut)?);
    }

    if args.json {
        let json = if reports.len() == 1 {
            serde_json::to_string_pretty(&reports[0])?
        } else {
            serde_json::to_string_pretty(&reports)?
        };
        println!("{}", json);
        return Ok(());
    }

    for r in &reports {
        print_text(r, verbose);
    }
    Ok(())
}

fn report(path: &Path, gamut: &Gamut) -> Result<GamutReport> {
    let ctx = || format!("Failed to query: {}", path.display());
    let wb = gamut.white_black().ok();
    let cusps = gamut.cusps().ok().map(|c| {
        SECTOR_NAMES
            .iter()
            .zip(c)
            .map(|(&hue, lab)| Cusp { hue, lab })
            .collect()
    });

    Ok(GamutReport {
        file: path.display().to_string(),
        color_rep: gamut.color_rep().tag(),
        resolution: gamut.resolution(),
        center: gamut.center(),
        vertices: gamut.vertex_count().with_context(ctx)?,
        triangles: gamut.triangles().with_context(ctx)?.count(),
        raw_vertices: gamut.raw_vertex_count(),
        volume: gamut.volume().with_context(ctx)?,
        colorspace_white: wb.map(|w| w.cs_white),
        colorspace_black: wb.map(|w| w.cs_black),
        gamut_white: wb.map(|w| w.gamut_white),
        gamut_black: wb.map(|w| w.gamut_black),
        cusps,
    })
}

fn print_text(r: &GamutReport, verbose: u8) {
    println!("{}", r.file);
    println!("  Color rep:  {}", r.color_rep);
    println!("  Resolution: {}", r.resolution);
    println!("  Center:     {}", format_point(r.center));
    println!("  Surface:    {} vertices, {} triangles", r.vertices, r.triangles);
    println!("  Volume:     {:.1}", r.volume);

    let rows = [
        ("CS white", r.colorspace_white),
        ("CS black", r.colorspace_black),
        ("Gamut white", r.gamut_white),
        ("Gamut black", r.gamut_black),
    ];
    for (label, p) in rows {
        match p {
            Some(p) => println!("  {:<11} {}", format!("{}:", label), format_point(p)),
            None => println!("  {:<11} unknown", format!("{}:", label)),
        }
    }

    if let Some(cusps) = &r.cusps {
        println!("  Cusps:");
        for c in cusps {
            println!("    {:<8} {}", c.hue, format_point(c.lab));
        }
    } else if verbose > 0 {
        println!("  Cusps:      none");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gbd::GamutBuilder;

    #[test]
    fn test_report_json() {
        let mut g = GamutBuilder::new().build();
        for p in [
            [95.0, 0.0, 0.0],
            [5.0, 0.0, 0.0],
            [55.0, 60.0, 0.0],
            [55.0, -60.0, 0.0],
            [55.0, 0.0, 60.0],
            [55.0, 0.0, -60.0],
        ] {
            g.expand(p);
        }
        let r = report(Path::new("oct.gam"), &g).unwrap();
        assert_eq!(r.vertices, 6);
        assert_eq!(r.triangles, 8);
        assert!(r.volume > 0.0);
        assert!(r.cusps.is_none());

        let json: serde_json::Value = serde_json::to_value(&r).unwrap();
        assert_eq!(json["color_rep"], "LAB");
        assert_eq!(json["vertices"], 6);
        assert!(json["cusps"].is_null());
        let white = json["gamut_white"][0].as_f64().unwrap();
        assert!((white - 95.0).abs() < 1e-9);
    }
}
