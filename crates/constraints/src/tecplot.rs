//! ASCII Tecplot zones for inspecting constraint geometry.

use std::io::Write;

use dvcon_kernel::{IntersectionGrid, Point3d};

pub(crate) fn write_header(out: &mut dyn Write) -> std::io::Result<()> {
    writeln!(out, "TITLE = \"DVConstraints Data\"")?;
    writeln!(out, "VARIABLES = \"CoordinateX\" \"CoordinateY\" \"CoordinateZ\"")
}

fn write_point(out: &mut dyn Write, p: &Point3d) -> std::io::Result<()> {
    writeln!(out, "{:.6} {:.6} {:.6}", p.x, p.y, p.z)
}

/// Consecutive point pairs as a `FELINESEG` zone, one segment per pair.
pub(crate) fn write_segment_zone(
    out: &mut dyn Write,
    name: &str,
    points: &[Point3d],
) -> std::io::Result<()> {
    let segments = points.len() / 2;
    writeln!(out, "Zone T={name}")?;
    writeln!(
        out,
        "Nodes = {}, Elements = {} ZONETYPE=FELINESEG",
        points.len(),
        segments
    )?;
    writeln!(out, "DATAPACKING=POINT")?;
    for p in points {
        write_point(out, p)?;
    }
    for i in 0..segments {
        writeln!(out, "{} {}", 2 * i + 1, 2 * i + 2)?;
    }
    Ok(())
}

/// An up/down grid as a structured `I x J x 2` zone.
pub(crate) fn write_grid_zone(
    out: &mut dyn Write,
    name: &str,
    grid: &IntersectionGrid,
) -> std::io::Result<()> {
    writeln!(
        out,
        "ZONE T=\"{name}\" I={} J={} K=2",
        grid.n_span, grid.n_chord
    )?;
    writeln!(out, "DATAPACKING=POINT")?;
    for k in 0..2 {
        for j in 0..grid.n_chord {
            for i in 0..grid.n_span {
                write_point(out, &grid.coords[grid.index(i, j, k)])?;
            }
        }
    }
    Ok(())
}
