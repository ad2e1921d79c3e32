/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use super::CompStats;
use anyhow::{bail, ensure, Context, Result};
use std::collections::HashMap;

/// The format version this crate reads and writes.
pub const FORMAT_VERSION: usize = 0;

/// The graph-class identifier written in the property file, the same the
/// canonical implementations use, so stored graphs interoperate.
pub const GRAPH_CLASS: &str = "it.unimi.dsi.webgraph.BVGraph";

/// The graph classes the loader accepts.
const KNOWN_GRAPH_CLASSES: [&str; 2] = [GRAPH_CLASS, "it.unimi.dsi.big.webgraph.BVGraph"];

/// An instantaneous code choice for a record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Code {
    Unary,
    Gamma,
    Delta,
    Zeta { k: usize },
    Nibble,
    /// Implemented at the bit-stream level, but unusable as a field code:
    /// the property file has no key carrying the modulus.
    Golomb { b: usize },
}

impl Code {
    /// Parses a token of the `compressionflags` property; `k` is the ζ
    /// parameter read from the `zetak` property.
    fn from_str(s: &str, k: usize) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "UNARY" => Some(Code::Unary),
            "GAMMA" => Some(Code::Gamma),
            "DELTA" => Some(Code::Delta),
            "ZETA" => Some(Code::Zeta { k }),
            "NIBBLE" => Some(Code::Nibble),
            "GOLOMB" => Some(Code::Golomb { b: 0 }),
            _ => None,
        }
    }

    fn to_str(self) -> &'static str {
        match self {
            Code::Unary => "UNARY",
            Code::Gamma => "GAMMA",
            Code::Delta => "DELTA",
            Code::Zeta { .. } => "ZETA",
            Code::Nibble => "NIBBLE",
            Code::Golomb { .. } => "GOLOMB",
        }
    }
}

/// The compression parameters of a graph: one code per field class plus the
/// window, reference-chain, and intervalization settings.
///
/// The defaults match the canonical implementations, and a property file
/// listing no `compressionflags` tokens decodes with them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompFlags {
    /// The code for outdegrees.
    pub outdegrees: Code,
    /// The code for reference offsets.
    pub references: Code,
    /// The code for block counts and block lengths.
    pub blocks: Code,
    /// The code for interval counts, left extremes, and lengths.
    pub intervals: Code,
    /// The code for the residuals, first and following.
    pub residuals: Code,
    /// The minimum length of a run of consecutive successors stored as an
    /// interval; zero disables intervalization.
    pub min_interval_length: usize,
    /// The number of previous lists that can be used as a reference.
    pub compression_window: usize,
    /// The maximum length of a chain of references.
    pub max_ref_count: usize,
}

impl core::default::Default for CompFlags {
    fn default() -> Self {
        CompFlags {
            outdegrees: Code::Gamma,
            references: Code::Unary,
            blocks: Code::Gamma,
            intervals: Code::Gamma,
            residuals: Code::Zeta { k: 3 },
            min_interval_length: 4,
            compression_window: 7,
            max_ref_count: 3,
        }
    }
}

impl CompFlags {
    /// Checks that every configured code can actually code record fields.
    ///
    /// Golomb is rejected (no modulus channel in the property file), as is ζ
    /// with a parameter outside 1..=7.
    pub fn check_supported(&self) -> Result<()> {
        for (field, code) in [
            ("outdegrees", self.outdegrees),
            ("references", self.references),
            ("blocks", self.blocks),
            ("intervals", self.intervals),
            ("residuals", self.residuals),
        ] {
            match code {
                Code::Unary | Code::Gamma | Code::Delta | Code::Nibble => {}
                Code::Zeta { k: 1..=7 } => {}
                Code::Zeta { k } => bail!("Unsupported ζ parameter {} for {}", k, field),
                Code::Golomb { .. } => bail!(
                    "The Golomb code cannot be used for {}: the property file has no key carrying its modulus",
                    field
                ),
            }
        }
        Ok(())
    }

    /// Returns the ζ parameter used by the fields, if any.
    ///
    /// A single `zetak` property covers every field coded with ζ, so all ζ
    /// fields must share the parameter.
    fn zeta_k(&self) -> usize {
        [
            self.residuals,
            self.outdegrees,
            self.references,
            self.blocks,
            self.intervals,
        ]
        .iter()
        .find_map(|code| match code {
            Code::Zeta { k } => Some(*k),
            _ => None,
        })
        .unwrap_or(3)
    }

    /// Serializes the flags, the graph sizes, and the optional statistics
    /// into the content of a `.properties` file.
    pub fn to_properties(
        &self,
        num_nodes: usize,
        num_arcs: u64,
        stats: Option<&CompStats>,
    ) -> String {
        let mut s = String::new();
        s.push_str("#BVGraph properties\n");
        s.push_str(&format!("version={}\n", FORMAT_VERSION));
        s.push_str(&format!("graphclass={}\n", GRAPH_CLASS));
        s.push_str(&format!("nodes={}\n", num_nodes));
        s.push_str(&format!("arcs={}\n", num_arcs));
        s.push_str(&format!("windowsize={}\n", self.compression_window));
        s.push_str(&format!("maxrefcount={}\n", self.max_ref_count));
        s.push_str(&format!("minintervallength={}\n", self.min_interval_length));
        s.push_str(&format!("zetak={}\n", self.zeta_k()));
        s.push_str("compressionflags=");
        let mut some_flag = false;
        let default = CompFlags::default();
        for (name, code, default_code) in [
            ("OUTDEGREES", self.outdegrees, default.outdegrees),
            ("REFERENCES", self.references, default.references),
            ("BLOCKS", self.blocks, default.blocks),
            ("INTERVALS", self.intervals, default.intervals),
            ("RESIDUALS", self.residuals, default.residuals),
        ] {
            // ζ parameters are all carried by the zetak property
            if code.to_str() != default_code.to_str() {
                s.push_str(&format!("{}_{}|", name, code.to_str()));
                some_flag = true;
            }
        }
        if some_flag {
            s.pop();
        }
        s.push('\n');
        if let Some(stats) = stats {
            s.push_str(&stats.to_properties(num_nodes, num_arcs));
        }
        s
    }

    /// Builds the flags from a parsed `.properties` map, validating the
    /// format identification keys.
    pub fn from_properties(map: &HashMap<String, String>) -> Result<Self> {
        if let Some(graph_class) = map.get("graphclass") {
            ensure!(
                KNOWN_GRAPH_CLASSES.contains(&graph_class.as_str()),
                "Unknown graph class {}",
                graph_class
            );
        }
        if let Some(version) = map.get("version") {
            let version = version
                .parse::<usize>()
                .with_context(|| format!("Cannot parse version {}", version))?;
            ensure!(
                version <= FORMAT_VERSION,
                "Unsupported format version {} (this implementation supports up to {})",
                version,
                FORMAT_VERSION
            );
        }
        if let Some(endianness) = map.get("endianness") {
            ensure!(
                endianness == "big",
                "Unsupported endianness {} (only big is supported)",
                endianness
            );
        }

        let mut cf = CompFlags::default();
        let mut k = 3;
        if let Some(spec_k) = map.get("zetak") {
            k = spec_k
                .parse::<usize>()
                .with_context(|| format!("Cannot parse zetak {}", spec_k))?;
            ensure!((1..=7).contains(&k), "Only ζ₁-ζ₇ are supported");
        }
        cf.residuals = Code::Zeta { k };

        if let Some(comp_flags) = map.get("compressionflags") {
            if !comp_flags.is_empty() {
                for token in comp_flags.split('|') {
                    let (field, code_name) = token
                        .rsplit_once('_')
                        .with_context(|| format!("Malformed compression flag {}", token))?;
                    let code = Code::from_str(code_name, k)
                        .with_context(|| format!("Unknown code in compression flag {}", token))?;
                    match field {
                        "OUTDEGREES" => cf.outdegrees = code,
                        "REFERENCES" => cf.references = code,
                        "BLOCKS" => cf.blocks = code,
                        "INTERVALS" => cf.intervals = code,
                        "RESIDUALS" => cf.residuals = code,
                        "OFFSETS" => {
                            ensure!(code == Code::Gamma, "Only the ɣ code is supported for offsets")
                        }
                        _ => bail!("Unknown compression flag {}", token),
                    }
                }
            }
        }
        if let Some(compression_window) = map.get("windowsize") {
            cf.compression_window = compression_window
                .parse()
                .with_context(|| format!("Cannot parse windowsize {}", compression_window))?;
        }
        if let Some(max_ref_count) = map.get("maxrefcount") {
            cf.max_ref_count = max_ref_count
                .parse()
                .with_context(|| format!("Cannot parse maxrefcount {}", max_ref_count))?;
        }
        if let Some(min_interval_length) = map.get("minintervallength") {
            cf.min_interval_length = min_interval_length
                .parse()
                .with_context(|| format!("Cannot parse minintervallength {}", min_interval_length))?;
        }
        cf.check_supported()?;
        Ok(cf)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_properties_roundtrip() -> Result<()> {
        let flags = CompFlags {
            outdegrees: Code::Delta,
            references: Code::Unary,
            blocks: Code::Gamma,
            intervals: Code::Nibble,
            residuals: Code::Zeta { k: 5 },
            min_interval_length: 2,
            compression_window: 4,
            max_ref_count: 1,
        };
        let properties = flags.to_properties(42, 1066, None);
        let map = java_properties::read(properties.as_bytes())?;
        assert_eq!(map.get("nodes").unwrap(), "42");
        assert_eq!(map.get("arcs").unwrap(), "1066");
        let parsed = CompFlags::from_properties(&map)?;
        assert_eq!(parsed, flags);
        Ok(())
    }

    #[test]
    fn test_default_flags_empty_token_list() -> Result<()> {
        let properties = CompFlags::default().to_properties(0, 0, None);
        let map = java_properties::read(properties.as_bytes())?;
        assert_eq!(map.get("compressionflags").unwrap(), "");
        assert_eq!(CompFlags::from_properties(&map)?, CompFlags::default());
        Ok(())
    }

    #[test]
    fn test_golomb_rejected() {
        let mut map = HashMap::new();
        map.insert("compressionflags".into(), "RESIDUALS_GOLOMB".into());
        assert!(CompFlags::from_properties(&map).is_err());
    }

    #[test]
    fn test_newer_version_rejected() {
        let mut map = HashMap::new();
        map.insert("version".into(), "1".into());
        assert!(CompFlags::from_properties(&map).is_err());
    }

    #[test]
    fn test_unknown_graphclass_rejected() {
        let mut map = HashMap::new();
        map.insert("graphclass".into(), "some.other.Format".into());
        assert!(CompFlags::from_properties(&map).is_err());
    }
}
