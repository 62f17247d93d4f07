//! `.gam` gamut surface files.
//!
//! A CGATS style text file: a `GAMUT` header line, keyword lines, then two
//! tables, the surface vertices and the triangles that index them.
//!
//! # Format
//!
//! ```text
//! GAMUT
//!
//! DESCRIPTOR "Gamut surface"
//! ORIGINATOR "gbd"
//! KEYWORD "SURF_RES"
//! SURF_RES "10"
//! KEYWORD "GAMUT_CENTER"
//! GAMUT_CENTER "50 0 0"
//! KEYWORD "COLOR_REP"
//! COLOR_REP "LAB"
//! KEYWORD "CUSP_RED"
//! CUSP_RED "54.3 80.8 69.9"
//! ...
//!
//! NUMBER_OF_FIELDS 4
//! BEGIN_DATA_FORMAT
//! VERTEX_NO LAB_L LAB_A LAB_B
//! END_DATA_FORMAT
//!
//! NUMBER_OF_SETS 6
//! BEGIN_DATA
//! 0 51 0 0
//! ...
//! END_DATA
//!
//! NUMBER_OF_FIELDS 3
//! BEGIN_DATA_FORMAT
//! VERTEX_0 VERTEX_1 VERTEX_2
//! END_DATA_FORMAT
//!
//! NUMBER_OF_SETS 8
//! BEGIN_DATA
//! 0 2 4
//! ...
//! END_DATA
//! ```
//!
//! Numbers are written in shortest round-trip form, so a gamut read back
//! answers every query exactly like the one written.
//!
//! # Example
//!
//! ```rust,ignore
//! use gbd::Gamut;
//!
//! gamut.write_gam("device.gam")?;
//! let back = Gamut::read_gam("device.gam")?;
//! ```

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use tracing::debug;

use crate::coords::{self, ColorRep};
use crate::cusp::SECTOR_NAMES;
use crate::error::{GamutError, GamutResult};
use crate::gamut::{DEFAULT_CENTER, Gamut, GamutBuilder, Surface};
use crate::lazy::LazyIndex;
use crate::mesh::Mesh;
use crate::vertex::{Vertex, VertexFlags, VertexId};

const WB_KEYWORDS: [&str; 4] = ["CSWHITE", "CSBLACK", "GAWHITE", "GABLACK"];
const TRI_FIELDS: [&str; 3] = ["VERTEX_0", "VERTEX_1", "VERTEX_2"];

impl Gamut {
    /// Writes the surface to a `.gam` file.
    pub fn write_gam<P: AsRef<Path>>(&self, path: P) -> GamutResult<()> {
        let file = File::create(path.as_ref())?;
        let mut w = BufWriter::new(file);
        self.write_gam_to(&mut w)?;
        w.flush()?;
        Ok(())
    }

    /// Writes the surface in `.gam` form to any writer.
    pub fn write_gam_to<W: Write>(&self, w: &mut W) -> GamutResult<()> {
        let s = self.surface()?;
        let mesh = &s.mesh;

        writeln!(w, "GAMUT")?;
        writeln!(w)?;
        writeln!(w, "DESCRIPTOR \"Gamut surface\"")?;
        writeln!(w, "ORIGINATOR \"gbd\"")?;
        write_keyword(w, "SURF_RES", &self.resolution().to_string())?;
        write_keyword(w, "GAMUT_CENTER", &triple(self.center()))?;
        write_keyword(w, "COLOR_REP", self.color_rep().tag())?;
        for (name, value) in WB_KEYWORDS.iter().zip(self.stored_wb()) {
            if let Some(p) = value {
                write_keyword(w, name, &triple(p))?;
            }
        }
        if let Some(cusps) = self.cusps.cusps() {
            for (name, c) in SECTOR_NAMES.iter().zip(cusps) {
                write_keyword(w, &format!("CUSP_{name}"), &triple(c))?;
            }
        }
        writeln!(w)?;

        let [f0, f1, f2] = self.color_rep().fields();
        writeln!(w, "NUMBER_OF_FIELDS 4")?;
        writeln!(w, "BEGIN_DATA_FORMAT")?;
        writeln!(w, "VERTEX_NO {f0} {f1} {f2}")?;
        writeln!(w, "END_DATA_FORMAT")?;
        writeln!(w)?;
        writeln!(w, "NUMBER_OF_SETS {}", mesh.vertices().len())?;
        writeln!(w, "BEGIN_DATA")?;
        for (i, &id) in mesh.vertices().iter().enumerate() {
            let [l, a, b] = coords::to_external(self.pool.get(id).p);
            writeln!(w, "{i} {l} {a} {b}")?;
        }
        writeln!(w, "END_DATA")?;
        writeln!(w)?;

        writeln!(w, "NUMBER_OF_FIELDS 3")?;
        writeln!(w, "BEGIN_DATA_FORMAT")?;
        writeln!(w, "{}", TRI_FIELDS.join(" "))?;
        writeln!(w, "END_DATA_FORMAT")?;
        writeln!(w)?;
        writeln!(w, "NUMBER_OF_SETS {}", mesh.triangles().len())?;
        writeln!(w, "BEGIN_DATA")?;
        for t in self.triangles()? {
            writeln!(w, "{} {} {}", t[0], t[1], t[2])?;
        }
        writeln!(w, "END_DATA")?;

        debug!(
            vertices = mesh.vertices().len(),
            triangles = mesh.triangles().len(),
            "wrote gamut"
        );
        Ok(())
    }

    /// Reads a gamut from a `.gam` file.
    ///
    /// The stored surface is used as-is until the next [`Gamut::expand`],
    /// after which its vertices take part in normal triangulation.
    pub fn read_gam<P: AsRef<Path>>(path: P) -> GamutResult<Gamut> {
        let file = File::open(path.as_ref())?;
        parse_gam(BufReader::new(file))
    }
}

fn write_keyword<W: Write>(w: &mut W, name: &str, value: &str) -> GamutResult<()> {
    writeln!(w, "KEYWORD \"{name}\"")?;
    writeln!(w, "{name} \"{value}\"")?;
    Ok(())
}

fn triple(p: [f64; 3]) -> String {
    format!("{} {} {}", p[0], p[1], p[2])
}

#[derive(Debug, Default)]
struct Table {
    fields: Vec<String>,
    sets: Option<usize>,
    rows: Vec<(usize, Vec<String>)>,
}

impl Table {
    fn column(&self, name: &str, line: usize) -> GamutResult<usize> {
        self.fields
            .iter()
            .position(|f| f == name)
            .ok_or_else(|| GamutError::parse(line, format!("missing field {name}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Header,
    Format,
    Data,
}

/// Parses a gamut from `.gam` text.
pub fn parse_gam<R: BufRead>(reader: R) -> GamutResult<Gamut> {
    let mut seen_header = false;
    let mut keywords: HashMap<String, (usize, String)> = HashMap::new();
    let mut tables: Vec<Table> = Vec::new();
    let mut state = State::Header;
    let mut last_line = 0;

    for (ix, line) in reader.lines().enumerate() {
        let line_no = ix + 1;
        last_line = line_no;
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if !seen_header {
            if line != "GAMUT" {
                return Err(GamutError::parse(line_no, "expected GAMUT header"));
            }
            seen_header = true;
            continue;
        }

        match state {
            State::Header => {
                if line == "BEGIN_DATA_FORMAT" {
                    tables.push(Table::default());
                    state = State::Format;
                } else if line == "BEGIN_DATA" {
                    let formatted = |t: &Table| !t.fields.is_empty() && t.rows.is_empty();
                    if !tables.last().is_some_and(formatted) {
                        return Err(GamutError::parse(
                            line_no,
                            "BEGIN_DATA without a data format",
                        ));
                    }
                    state = State::Data;
                } else if let Some(n) = line.strip_prefix("NUMBER_OF_SETS") {
                    let n = n
                        .trim()
                        .parse()
                        .map_err(|_| GamutError::parse(line_no, "invalid NUMBER_OF_SETS"))?;
                    match tables.last_mut() {
                        Some(t) => t.sets = Some(n),
                        None => {
                            return Err(GamutError::parse(
                                line_no,
                                "NUMBER_OF_SETS before a data format",
                            ));
                        }
                    }
                } else if line.starts_with("NUMBER_OF_FIELDS") || line.starts_with("KEYWORD") {
                    // Informational
                } else {
                    let (name, value) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
                    let value = value.trim().trim_matches('"').to_string();
                    keywords.insert(name.to_string(), (line_no, value));
                }
            }
            State::Format => {
                if line == "END_DATA_FORMAT" {
                    state = State::Header;
                } else if let Some(t) = tables.last_mut() {
                    t.fields.extend(line.split_whitespace().map(String::from));
                }
            }
            State::Data => {
                if line == "END_DATA" {
                    if let Some(t) = tables.last() {
                        if let Some(sets) = t.sets.filter(|&n| n != t.rows.len()) {
                            return Err(GamutError::parse(
                                line_no,
                                format!("expected {} rows, found {}", sets, t.rows.len()),
                            ));
                        }
                    }
                    state = State::Header;
                } else if let Some(t) = tables.last_mut() {
                    let row: Vec<String> = line.split_whitespace().map(String::from).collect();
                    if row.len() != t.fields.len() {
                        return Err(GamutError::parse(
                            line_no,
                            format!("expected {} values, found {}", t.fields.len(), row.len()),
                        ));
                    }
                    t.rows.push((line_no, row));
                }
            }
        }
    }

    if !seen_header {
        return Err(GamutError::parse(0, "empty file"));
    }
    if state != State::Header {
        return Err(GamutError::parse(0, "unexpected end of file"));
    }
    if tables.len() < 2 {
        return Err(GamutError::parse(0, "missing vertex or triangle table"));
    }

    let keyword = |name: &str| keywords.get(name).map(|(l, v)| (*l, v.as_str()));

    let missing = |name: &str| GamutError::parse(last_line, format!("missing {name}"));
    let (line, res) = keyword("SURF_RES").ok_or_else(|| missing("SURF_RES"))?;
    let resolution: f64 = res
        .parse()
        .map_err(|_| GamutError::parse(line, "invalid SURF_RES"))?;
    let (line, rep) = keyword("COLOR_REP").ok_or_else(|| missing("COLOR_REP"))?;
    let rep = ColorRep::from_tag(rep)
        .ok_or_else(|| GamutError::parse(line, format!("unknown COLOR_REP {rep}")))?;
    let center = match keyword("GAMUT_CENTER") {
        Some((line, v)) => parse_triple(line, v)?,
        None => DEFAULT_CENTER,
    };

    let mut gamut = GamutBuilder::new()
        .resolution(resolution)
        .color_rep(rep)
        .center(center)
        .build();

    let mut wb = [None; 4];
    for (slot, name) in wb.iter_mut().zip(WB_KEYWORDS) {
        if let Some((line, v)) = keyword(name) {
            *slot = Some(parse_triple(line, v)?);
        }
    }
    gamut.set_colorspace_wb(wb[0], wb[1]);
    gamut.set_gamut_wb(wb[2], wb[3]);

    let cusps: Vec<Option<(usize, &str)>> = SECTOR_NAMES
        .iter()
        .map(|n| keyword(&format!("CUSP_{n}")))
        .collect();
    if cusps.iter().all(Option::is_some) {
        let mut out = [[0.0; 3]; 6];
        for (slot, (line, v)) in out.iter_mut().zip(cusps.into_iter().flatten()) {
            *slot = parse_triple(line, v)?;
        }
        gamut.cusps.set(out);
    } else if let Some((line, _)) = cusps.iter().flatten().next() {
        return Err(GamutError::parse(*line, "incomplete set of cusps"));
    }

    let verts = &tables[0];
    let tris = &tables[1];
    let ix_col = verts.column("VERTEX_NO", last_line)?;
    let fields = rep.fields();
    let cols = [
        verts.column(fields[0], last_line)?,
        verts.column(fields[1], last_line)?,
        verts.column(fields[2], last_line)?,
    ];

    // Vertex numbers must cover 0..n exactly
    let n = verts.rows.len();
    let mut by_number: Vec<Option<([f64; 3], usize)>> = vec![None; n];
    for (line, row) in &verts.rows {
        let num: usize = row[ix_col]
            .parse()
            .map_err(|_| GamutError::parse(*line, "invalid vertex number"))?;
        let slot = by_number
            .get_mut(num)
            .ok_or_else(|| GamutError::parse(*line, format!("vertex number {num} out of range")))?;
        if slot.is_some() {
            return Err(GamutError::parse(*line, format!("vertex number {num} repeated")));
        }
        let mut lab = [0.0; 3];
        for (c, &col) in lab.iter_mut().zip(&cols) {
            *c = parse_f64(*line, &row[col])?;
        }
        *slot = Some((lab, *line));
    }

    // Establishment points that reached the surface are stored too; they
    // stay out of the samples
    let center_int = coords::to_internal(center);
    let mut ids: Vec<VertexId> = Vec::with_capacity(n);
    for (lab, line) in by_number.into_iter().flatten() {
        let mut v = Vertex::new(center_int, coords::to_internal(lab))
            .ok_or_else(|| GamutError::parse(line, "vertex at the gamut center"))?;
        let synthetic = gamut.is_establishment_point(v.p);
        if synthetic {
            v.flags.insert(VertexFlags::SYNTHETIC);
        }
        let id = gamut.pool.alloc(v);
        gamut.pool.retain(id);
        gamut.pinned.push(id);
        if !synthetic {
            gamut.tree.adopt(&mut gamut.pool, id);
        }
        ids.push(id);
    }

    let tcols = [
        tris.column(TRI_FIELDS[0], last_line)?,
        tris.column(TRI_FIELDS[1], last_line)?,
        tris.column(TRI_FIELDS[2], last_line)?,
    ];
    let mut faces = Vec::with_capacity(tris.rows.len());
    for (line, row) in &tris.rows {
        let mut f = [VertexId(0); 3];
        for (slot, &col) in f.iter_mut().zip(&tcols) {
            let num: usize = row[col]
                .parse()
                .map_err(|_| GamutError::parse(*line, "invalid vertex index"))?;
            *slot = *ids
                .get(num)
                .ok_or_else(|| GamutError::parse(*line, format!("vertex {num} does not exist")))?;
        }
        faces.push(f);
    }

    let mesh = Mesh::from_faces(&gamut.pool, center_int, &faces, Vec::new())?;
    gamut.surface = LazyIndex::ready(Surface::new(mesh));
    debug!(vertices = n, triangles = faces.len(), "read gamut");
    Ok(gamut)
}

fn parse_f64(line: usize, s: &str) -> GamutResult<f64> {
    let v: f64 = s
        .parse()
        .map_err(|_| GamutError::parse(line, format!("invalid number {s}")))?;
    if v.is_finite() {
        Ok(v)
    } else {
        Err(GamutError::parse(line, format!("non-finite number {s}")))
    }
}

fn parse_triple(line: usize, s: &str) -> GamutResult<[f64; 3]> {
    let parts: Vec<&str> = s.split_whitespace().collect();
    if parts.len() != 3 {
        let message = format!("expected 3 values, found {}", parts.len());
        return Err(GamutError::parse(line, message));
    }
    Ok([
        parse_f64(line, parts[0])?,
        parse_f64(line, parts[1])?,
        parse_f64(line, parts[2])?,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gamut::Expansion;

    fn octahedron_text() -> String {
        let mut g = GamutBuilder::new().center([0.0, 0.0, 0.0]).build();
        for p in [
            [1.0, 0.0, 0.0],
            [-1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, -1.0, 0.0],
            [0.0, 0.0, 1.0],
            [0.0, 0.0, -1.0],
        ] {
            assert_eq!(g.expand(p), Expansion::Retained);
        }
        let mut buf = Vec::new();
        g.write_gam_to(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_write_layout() {
        let text = octahedron_text();
        assert!(text.starts_with("GAMUT\n"));
        assert!(text.contains("SURF_RES \"10\""));
        assert!(text.contains("GAMUT_CENTER \"0 0 0\""));
        assert!(text.contains("COLOR_REP \"LAB\""));
        assert!(text.contains("VERTEX_NO LAB_L LAB_A LAB_B"));
        assert!(text.contains("NUMBER_OF_SETS 6"));
        assert!(text.contains("NUMBER_OF_SETS 8"));
        assert!(!text.contains("CUSP_RED"));
    }

    #[test]
    fn test_parse_roundtrip_volume() {
        let text = octahedron_text();
        let g = parse_gam(text.as_bytes()).unwrap();
        assert_eq!(g.vertex_count().unwrap(), 6);
        assert!((g.volume().unwrap() - 4.0 / 3.0).abs() < 1e-12);
        assert_eq!(g.center(), [0.0, 0.0, 0.0]);
        g.validate_surface().unwrap();
    }

    #[test]
    fn test_parse_errors_carry_line() {
        let err = parse_gam("CGATS.17\n".as_bytes()).unwrap_err();
        assert!(matches!(err, GamutError::Parse { line: 1, .. }));

        let text = octahedron_text().replace("BEGIN_DATA\n0 ", "BEGIN_DATA\nzero ");
        let err = parse_gam(text.as_bytes()).unwrap_err();
        assert!(err.is_parse_error());
    }

    #[test]
    fn test_parse_truncated() {
        let text = octahedron_text();
        let cut = &text[..text.rfind("END_DATA").unwrap()];
        let err = parse_gam(cut.as_bytes()).unwrap_err();
        assert!(matches!(err, GamutError::Parse { line: 0, .. }));
    }

    #[test]
    fn test_parse_open_surface() {
        let text = octahedron_text();
        // Drop the last triangle
        let mut lines: Vec<&str> = text.lines().collect();
        let end = lines.iter().rposition(|l| *l == "END_DATA").unwrap();
        lines.remove(end - 1);
        let text = lines.join("\n").replace("NUMBER_OF_SETS 8", "NUMBER_OF_SETS 7");
        let err = parse_gam(text.as_bytes()).unwrap_err();
        assert!(matches!(err, GamutError::NotClosed(_)));
    }

    #[test]
    fn test_parse_jab_keywords() {
        let text = octahedron_text()
            .replace("\"LAB\"", "\"JAB\"")
            .replace("LAB_L LAB_A LAB_B", "JAB_J JAB_A JAB_B")
            .replace("ORIGINATOR", "KEYWORD \"CSWHITE\"\nCSWHITE \"100 0 0\"\nORIGINATOR");
        let g = parse_gam(text.as_bytes()).unwrap();
        assert!(g.is_jab());
        assert!(g.has_colorspace_white());
        assert!(!g.has_colorspace_black());
    }

    #[test]
    fn test_establishment_points_stay_synthetic() {
        // All samples above the center, so establishment points reach the surface
        let mut g = GamutBuilder::new().build();
        for p in [
            [60.0, 10.0, 0.0],
            [60.0, -10.0, 10.0],
            [60.0, -10.0, -10.0],
            [80.0, 0.0, 0.0],
        ] {
            assert_eq!(g.expand(p), Expansion::Retained);
        }
        assert!(g.vertex_count().unwrap() > 4);
        assert_eq!(g.raw_vertex_count(), 4);

        let mut buf = Vec::new();
        g.write_gam_to(&mut buf).unwrap();
        let mut back = parse_gam(buf.as_slice()).unwrap();
        assert_eq!(back.raw_vertex_count(), 4);
        assert_eq!(back.vertex_count().unwrap(), g.vertex_count().unwrap());
        for i in 0..4 {
            let flags = back.raw_vertex_flags(i).unwrap().unwrap();
            assert!(!flags.contains(VertexFlags::SYNTHETIC));
        }

        // Three samples plus stored establishment points must not triangulate
        let mut sparse = GamutBuilder::new().build();
        for p in [[60.0, 10.0, 0.0], [60.0, -10.0, 10.0], [60.0, -10.0, -10.0]] {
            sparse.expand(p);
        }
        assert!(sparse.volume().unwrap_err().is_not_ready());

        assert_eq!(back.expand([90.0, 0.0, 0.0]), Expansion::Retained);
        assert_eq!(back.raw_vertex_count(), 5);
        back.validate_surface().unwrap();
    }
}
