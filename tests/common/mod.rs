/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

#![allow(dead_code)]

use anyhow::Result;
use bvgraph::prelude::*;
use std::path::PathBuf;

/// Canonical test graph (8 nodes, 11 arcs, one sink, one source, a cycle
/// 2 → 4 → 6 → 2).
pub fn test_graph() -> VecGraph {
    VecGraph::from_arcs([
        (0, 1),
        (0, 2),
        (1, 3),
        (1, 4),
        (1, 5),
        (2, 4),
        (3, 6),
        (4, 6),
        (5, 6),
        (5, 7),
        (6, 2),
    ])
}

/// Returns a basename inside a fresh temporary directory; keep the
/// [`tempfile::TempDir`] alive as long as the files are needed.
pub fn temp_basename() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::TempDir::new()?;
    let basename = dir.path().join("graph");
    Ok((dir, basename))
}

/// Reads the property file of a stored graph into a map.
pub fn read_properties(basename: &std::path::Path) -> Result<std::collections::HashMap<String, String>> {
    let file = std::fs::File::open(basename.with_extension(PROPERTIES_EXTENSION))?;
    Ok(java_properties::read(std::io::BufReader::new(file))?)
}
