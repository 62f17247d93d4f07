//! VRML 2.0 export of the gamut surface.
//!
//! The surface is written as a single `IndexedFaceSet` with every vertex
//! painted in its own display color. VRML is Y-up, so points map as
//! `(x, y, z) = (b, L - 50, a)`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use gbd_math::lab_to_display_rgb;
use tracing::debug;

use crate::error::GamutResult;
use crate::gamut::Gamut;

/// Maps an `[L, a, b]` point before it is written.
pub type PointTransform<'a> = &'a dyn Fn([f64; 3]) -> [f64; 3];

const AXIS_LENGTH: f64 = 100.0;
const CUSP_RADIUS: f64 = 2.0;

/// Axis lines: label, Lab end points, color.
const AXES: [(&str, [f64; 3], [f64; 3], [f64; 3]); 4] = [
    ("L", [0.0, 0.0, 0.0], [AXIS_LENGTH, 0.0, 0.0], [1.0, 1.0, 1.0]),
    ("+a", [50.0, 0.0, 0.0], [50.0, AXIS_LENGTH, 0.0], [1.0, 0.0, 0.0]),
    ("-a", [50.0, 0.0, 0.0], [50.0, -AXIS_LENGTH, 0.0], [0.0, 1.0, 0.0]),
    ("b", [50.0, 0.0, -AXIS_LENGTH], [50.0, 0.0, AXIS_LENGTH], [1.0, 1.0, 0.0]),
];

fn to_vrml(lab: [f64; 3]) -> [f64; 3] {
    [lab[2], lab[0] - 50.0, lab[1]]
}

impl Gamut {
    /// Writes the surface as a VRML file, optionally with Lab axes and
    /// cusp markers.
    pub fn write_vrml<P: AsRef<Path>>(&self, path: P, axes: bool, cusps: bool) -> GamutResult<()> {
        self.write_trans_vrml(path, axes, cusps, None)
    }

    /// Like [`Gamut::write_vrml`], passing every point through `transform`.
    pub fn write_trans_vrml<P: AsRef<Path>>(
        &self,
        path: P,
        axes: bool,
        cusps: bool,
        transform: Option<PointTransform<'_>>,
    ) -> GamutResult<()> {
        let file = File::create(path.as_ref())?;
        let mut w = BufWriter::new(file);
        self.write_vrml_to(&mut w, axes, cusps, transform)?;
        w.flush()?;
        Ok(())
    }

    /// Writes VRML to any writer.
    ///
    /// Cusp markers are skipped when the cusps are unknown.
    pub fn write_vrml_to<W: Write>(
        &self,
        w: &mut W,
        axes: bool,
        cusps: bool,
        transform: Option<PointTransform<'_>>,
    ) -> GamutResult<()> {
        let map = |lab: [f64; 3]| to_vrml(transform.map_or(lab, |f| f(lab)));

        let count = self.vertex_count()?;
        let mut points = Vec::with_capacity(count);
        let mut colors = Vec::with_capacity(count);
        for ix in 0..count {
            if let Some((_, lab)) = self.vertex(ix)? {
                points.push(map(lab));
                colors.push(lab_to_display_rgb(lab));
            }
        }

        writeln!(w, "#VRML V2.0 utf8")?;
        writeln!(w)?;
        writeln!(w, "# Gamut surface")?;
        writeln!(w, "Transform {{")?;
        writeln!(w, "  children [")?;

        if axes {
            for (label, from, to, color) in AXES {
                write_line(w, label, map(from), map(to), color)?;
            }
        }

        if cusps {
            if let Ok(list) = self.cusps() {
                for lab in list {
                    write_sphere(w, map(lab), lab_to_display_rgb(lab))?;
                }
            }
        }

        writeln!(w, "    Shape {{")?;
        writeln!(w, "      geometry IndexedFaceSet {{")?;
        writeln!(w, "        ccw FALSE")?;
        writeln!(w, "        convex TRUE")?;
        writeln!(w, "        solid FALSE")?;
        writeln!(w, "        coord Coordinate {{")?;
        writeln!(w, "          point [")?;
        for p in &points {
            writeln!(w, "            {} {} {},", p[0], p[1], p[2])?;
        }
        writeln!(w, "          ]")?;
        writeln!(w, "        }}")?;
        writeln!(w, "        coordIndex [")?;
        let mut tris = 0;
        for t in self.triangles()? {
            writeln!(w, "          {}, {}, {}, -1,", t[0], t[1], t[2])?;
            tris += 1;
        }
        writeln!(w, "        ]")?;
        writeln!(w, "        colorPerVertex TRUE")?;
        writeln!(w, "        color Color {{")?;
        writeln!(w, "          color [")?;
        for c in &colors {
            writeln!(w, "            {:.4} {:.4} {:.4},", c[0], c[1], c[2])?;
        }
        writeln!(w, "          ]")?;
        writeln!(w, "        }}")?;
        writeln!(w, "      }}")?;
        writeln!(w, "    }}")?;

        writeln!(w, "  ]")?;
        writeln!(w, "}}")?;

        debug!(vertices = points.len(), triangles = tris, axes, cusps, "wrote VRML");
        Ok(())
    }
}

fn write_line<W: Write>(
    w: &mut W,
    label: &str,
    from: [f64; 3],
    to: [f64; 3],
    color: [f64; 3],
) -> GamutResult<()> {
    writeln!(w, "    # {label} axis")?;
    writeln!(w, "    Shape {{")?;
    writeln!(w, "      geometry IndexedLineSet {{")?;
    writeln!(
        w,
        "        coord Coordinate {{ point [ {} {} {}, {} {} {} ] }}",
        from[0], from[1], from[2], to[0], to[1], to[2]
    )?;
    writeln!(w, "        coordIndex [ 0, 1, -1 ]")?;
    writeln!(w, "        colorPerVertex FALSE")?;
    writeln!(w, "        color Color {{ color [ {} {} {} ] }}", color[0], color[1], color[2])?;
    writeln!(w, "      }}")?;
    writeln!(w, "    }}")?;
    Ok(())
}

fn write_sphere<W: Write>(w: &mut W, at: [f64; 3], color: [f64; 3]) -> GamutResult<()> {
    writeln!(w, "    Transform {{")?;
    writeln!(w, "      translation {} {} {}", at[0], at[1], at[2])?;
    writeln!(w, "      children [")?;
    writeln!(w, "        Shape {{")?;
    writeln!(
        w,
        "          appearance Appearance {{ material Material {{ diffuseColor {:.4} {:.4} {:.4} }} }}",
        color[0], color[1], color[2]
    )?;
    writeln!(w, "          geometry Sphere {{ radius {CUSP_RADIUS} }}")?;
    writeln!(w, "        }}")?;
    writeln!(w, "      ]")?;
    writeln!(w, "    }}")?;
    Ok(())
}
