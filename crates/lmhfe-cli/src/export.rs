//! Renders a [`Layers`] dictionary and its mesh to a PyVista-loadable
//! Python script, mirroring the original `vis` driver's emission shape:
//! a `pv.PolyData` surface built from points/cell connectivity, followed
//! by one `np.array([...])` per named layer.

use std::fmt::Write as _;
use std::io::Write as _;
use std::path::Path;

use anyhow::Context;
use lmhfe_core::{Layers, Mesh};

/// Write `mesh` and every layer in `layers` to `path` as a standalone
/// Python script.
pub fn write_pyvista_script(mesh: &Mesh, layers: &Layers, path: &Path) -> anyhow::Result<()> {
    let mut script = String::new();

    writeln!(script, "import numpy as np").unwrap();
    writeln!(script, "import pyvista as pv").unwrap();
    writeln!(script).unwrap();

    write!(script, "points = [").unwrap();
    for p in mesh.points() {
        write!(script, "[{}, {}, 0.0], ", p.x, p.y).unwrap();
    }
    writeln!(script, "]").unwrap();

    write!(script, "cells = [").unwrap();
    for cell in mesh.cells() {
        write!(
            script,
            "[3, {}, {}, {}], ",
            cell.points[0], cell.points[1], cell.points[2]
        )
        .unwrap();
    }
    writeln!(script, "]").unwrap();

    writeln!(script).unwrap();
    writeln!(script, "surf = pv.PolyData(np.array(points), np.array(cells))").unwrap();
    writeln!(script).unwrap();

    for name in layers.names() {
        let values = layers
            .get_real(name)
            .context("export only supports real-valued layers")?;
        write!(script, "{name} = np.array([").unwrap();
        for v in values {
            write!(script, "{v}, ").unwrap();
        }
        writeln!(script, "])").unwrap();
    }

    let mut file = std::fs::File::create(path)
        .with_context(|| format!("could not create {}", path.display()))?;
    file.write_all(script.as_bytes())
        .with_context(|| format!("could not write {}", path.display()))?;
    Ok(())
}
