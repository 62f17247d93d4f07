//! CLI command implementations

pub mod build;
pub mod info;
pub mod query;
pub mod vrml;

use anyhow::{Context, Result, bail};
use gbd::Gamut;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Load a gamut from a .gam file
pub fn load_gamut(path: &Path) -> Result<Gamut> {
    Gamut::read_gam(path).with_context(|| format!("Failed to load: {}", path.display()))
}

/// Parse a point given as `L,a,b` or `L a b`
pub fn parse_point(s: &str) -> Result<[f64; 3]> {
    let parts: Vec<&str> = s
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect();
    if parts.len() != 3 {
        bail!("Expected 3 components in '{}', found {}", s, parts.len());
    }
    let mut p = [0.0; 3];
    for (slot, part) in p.iter_mut().zip(&parts) {
        *slot = part
            .parse()
            .with_context(|| format!("Invalid number '{}' in '{}'", part, s))?;
    }
    Ok(p)
}

/// Read a point list, one point per line
pub fn read_points(path: &Path) -> Result<Vec<[f64; 3]>> {
    let file = File::open(path).with_context(|| format!("Failed to open: {}", path.display()))?;
    let mut points = Vec::new();
    for (ix, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read: {}", path.display()))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let p = parse_point(line).with_context(|| format!("{}:{}", path.display(), ix + 1))?;
        points.push(p);
    }
    Ok(points)
}

/// Format an `[L, a, b]` point for display
pub fn format_point(p: [f64; 3]) -> String {
    format!("{:.3} {:.3} {:.3}", p[0], p[1], p[2])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_point() {
        assert_eq!(parse_point("50,10,-20").unwrap(), [50.0, 10.0, -20.0]);
        assert_eq!(parse_point(" 50  10 -20 ").unwrap(), [50.0, 10.0, -20.0]);
        assert_eq!(parse_point("50, 1e1, -2e1").unwrap(), [50.0, 10.0, -20.0]);
        assert!(parse_point("50,10").is_err());
        assert!(parse_point("50,x,0").is_err());
    }

    #[test]
    fn test_read_points() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# L a b").unwrap();
        writeln!(file, "95 0 0").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "55,70,0").unwrap();
        let points = read_points(file.path()).unwrap();
        assert_eq!(points, vec![[95.0, 0.0, 0.0], [55.0, 70.0, 0.0]]);
    }

    #[test]
    fn test_read_points_reports_line() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "95 0 0").unwrap();
        writeln!(file, "95 0").unwrap();
        let err = read_points(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains(":2"));
    }

    #[test]
    fn test_format_point() {
        assert_eq!(format_point([50.0, -1.25, 0.0]), "50.000 -1.250 0.000");
    }
}
