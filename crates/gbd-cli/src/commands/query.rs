//! Query command: radial, nradial, nearest and line intersection

use crate::{QueryArgs, QueryOp};
use anyhow::{Context, Result, bail};
use gbd::Gamut;
use gbd_math::Vec3;
use tracing::trace;

use super::{format_point, load_gamut, parse_point};

pub fn run(args: QueryArgs, verbose: u8) -> Result<()> {
    trace!(input = %args.input.display(), op = ?args.op, "query::run");

    let gamut = load_gamut(&args.input)?;
    let points = args
        .points
        .iter()
        .map(|s| parse_point(s))
        .collect::<Result<Vec<_>>>()?;

    for line in answer(&gamut, args.op, &points, verbose)? {
        println!("{}", line);
    }
    Ok(())
}

fn answer(gamut: &Gamut, op: QueryOp, points: &[[f64; 3]], verbose: u8) -> Result<Vec<String>> {
    let mut out = Vec::new();
    match op {
        QueryOp::Radial => {
            for &p in points {
                let (r, hit) = gamut.radial(p).context("Radial query failed")?;
                out.push(format!("{} -> {} r {:.3}", format_point(p), format_point(hit), r));
            }
        }
        QueryOp::Nradial => {
            for &p in points {
                let (ratio, hit) = gamut.nradial(p).context("Radial query failed")?;
                let side = if ratio <= 1.0 { "in" } else { "out" };
                if verbose > 0 {
                    out.push(format!(
                        "{} -> {:.4} {} ({})",
                        format_point(p),
                        ratio,
                        side,
                        format_point(hit)
                    ));
                } else {
                    out.push(format!("{} -> {:.4} {}", format_point(p), ratio, side));
                }
            }
        }
        QueryOp::Nearest => {
            for &p in points {
                let q = gamut.nearest(p).context("Nearest query failed")?;
                let d = Vec3::from(p).distance(Vec3::from(q));
                out.push(format!("{} -> {} d {:.3}", format_point(p), format_point(q), d));
            }
        }
        QueryOp::Isect => {
            if points.len() % 2 != 0 {
                bail!("isect takes pairs of points, got {}", points.len());
            }
            for pair in points.chunks_exact(2) {
                let hit = gamut
                    .vector_isect(pair[0], pair[1])
                    .context("Intersection query failed")?;
                let head = format!("{} : {}", format_point(pair[0]), format_point(pair[1]));
                match hit {
                    Some(h) => out.push(format!(
                        "{} -> {} (t {:.4}) .. {} (t {:.4})",
                        head,
                        format_point(h.min),
                        h.mint,
                        format_point(h.max),
                        h.maxt
                    )),
                    None => out.push(format!("{} -> miss", head)),
                }
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gbd::GamutBuilder;

    fn octahedron() -> Gamut {
        let mut g = GamutBuilder::new().build();
        for p in [
            [90.0, 0.0, 0.0],
            [10.0, 0.0, 0.0],
            [50.0, 40.0, 0.0],
            [50.0, -40.0, 0.0],
            [50.0, 0.0, 40.0],
            [50.0, 0.0, -40.0],
        ] {
            g.expand(p);
        }
        g
    }

    #[test]
    fn test_radial_answer() {
        let out = answer(&octahedron(), QueryOp::Radial, &[[50.0, 10.0, 0.0]], 0).unwrap();
        assert_eq!(out, vec!["50.000 10.000 0.000 -> 50.000 40.000 0.000 r 40.000"]);
    }

    #[test]
    fn test_nradial_sides() {
        let points = [[50.0, 20.0, 0.0], [50.0, 80.0, 0.0]];
        let out = answer(&octahedron(), QueryOp::Nradial, &points, 0).unwrap();
        assert!(out[0].ends_with("0.5000 in"));
        assert!(out[1].ends_with("2.0000 out"));
    }

    #[test]
    fn test_isect_needs_pairs() {
        assert!(answer(&octahedron(), QueryOp::Isect, &[[0.0, 0.0, 0.0]], 0).is_err());
        let out = answer(
            &octahedron(),
            QueryOp::Isect,
            &[[50.0, 100.0, 100.0], [51.0, 100.0, 100.0]],
            0,
        )
        .unwrap();
        assert!(out[0].ends_with("miss"));
    }
}
