/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

#![doc = include_str!("../README.md")]
#![deny(unstable_features)]
#![deny(trivial_casts)]
#![deny(unconditional_recursion)]
#![deny(unreachable_code)]
#![deny(unreachable_patterns)]
#![allow(clippy::type_complexity)]

pub mod graphs;
pub mod traits;
pub mod utils;

pub mod prelude {
    pub use crate::graphs::bvgraph::*;
    pub use crate::graphs::random::ErdosRenyi;
    pub use crate::graphs::vec_graph::VecGraph;
    pub use crate::traits::*;
    pub use crate::utils::*;
}
