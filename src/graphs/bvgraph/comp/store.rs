/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Drivers compressing a source graph into the on-disk files
//! `basename.graph`, `basename.offsets`, and `basename.properties`.

use super::super::*;
use crate::traits::{SequentialGraph, SplitGraph};
use anyhow::{Context, Result};
use dsi_bitstream::prelude::*;
use dsi_progress_logger::prelude::*;
use lender::prelude::*;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// A per-range compression result, sent by workers to the driver.
#[derive(Debug, Clone, Copy)]
struct Job {
    job_id: usize,
    /// Content bits in the temporary graph stream.
    graph_bits: u64,
    /// Content bits in the temporary offsets stream.
    offsets_bits: u64,
    num_arcs: u64,
    stats: CompStats,
}

/// Reorders jobs arriving out of order from a channel into job-id order,
/// yielding each as soon as all its predecessors have been yielded. This way
/// the driver concatenates finished ranges while later ones are still being
/// compressed.
struct OrderedJobs {
    rx: std::sync::mpsc::Receiver<Job>,
    parked: Vec<Option<Job>>,
    next_id: usize,
}

impl OrderedJobs {
    fn new(rx: std::sync::mpsc::Receiver<Job>) -> Self {
        Self {
            rx,
            parked: vec![],
            next_id: 0,
        }
    }
}

impl Iterator for OrderedJobs {
    type Item = Job;

    fn next(&mut self) -> Option<Job> {
        loop {
            if let Some(Some(job)) = self.parked.get(self.next_id) {
                self.next_id += 1;
                return Some(*job);
            }
            // Blocks until a job arrives; ends when all senders are gone.
            let job = self.rx.iter().next()?;
            if job.job_id >= self.parked.len() {
                self.parked.resize(job.job_id + 1, None);
            }
            self.parked[job.job_id] = Some(job);
        }
    }
}

impl BvComp<()> {
    /// The default number of threads for
    /// [`parallel_store_default`](BvComp::parallel_store_default): one per
    /// available CPU, but no more than one per 100'000 nodes.
    pub fn default_num_threads(num_nodes: usize) -> usize {
        num_cpus::get().min(num_nodes / 100_000).max(1)
    }

    /// Compresses `graph` single-threaded, writing the graph stream, the
    /// offsets stream, and the property file.
    ///
    /// Returns the length in bits of the graph stream.
    pub fn store<G: SequentialGraph>(
        basename: impl AsRef<Path>,
        graph: &G,
        comp_flags: CompFlags,
    ) -> Result<u64> {
        comp_flags.check_supported()?;
        let basename = basename.as_ref();
        let graph_path = basename.with_extension(GRAPH_EXTENSION);
        let offsets_path = basename.with_extension(OFFSETS_EXTENSION);

        let graph_writer = BufBitWriter::<BE, _>::new(WordAdapter::<usize, _>::new(
            BufWriter::new(
                File::create(&graph_path)
                    .with_context(|| format!("Could not create {}", graph_path.display()))?,
            ),
        ));
        let mut bvcomp = BvComp::new(
            DynEncoder::new(graph_writer, &comp_flags),
            comp_flags.compression_window,
            comp_flags.max_ref_count,
            comp_flags.min_interval_length,
            0,
        );

        let mut offsets_writer = BufBitWriter::<BE, _>::new(WordAdapter::<usize, _>::new(
            BufWriter::with_capacity(
                1 << 20,
                File::create(&offsets_path)
                    .with_context(|| format!("Could not create {}", offsets_path.display()))?,
            ),
        ));
        offsets_writer
            .write_gamma(0)
            .context("Could not write the initial offset")?;

        let mut pl = ProgressLogger::default();
        pl.display_memory(true)
            .item_name("node")
            .expected_updates(Some(graph.num_nodes()));
        pl.start("Compressing successors...");

        let mut total_bits: u64 = 0;
        let mut real_num_nodes = 0;
        for_!( (_node, successors) in graph.iter() {
            let bits = bvcomp.push(successors).context("Could not push successors")?;
            total_bits += bits;
            offsets_writer
                .write_gamma(bits)
                .context("Could not write offset gap")?;
            pl.update();
            real_num_nodes += 1;
        });
        pl.done();

        if real_num_nodes != graph.num_nodes() {
            log::warn!(
                "The graph claims {} nodes but its lender returned {}",
                graph.num_nodes(),
                real_num_nodes
            );
        }

        let num_arcs = bvcomp.arcs;
        let stats = *bvcomp.stats();
        bvcomp.flush().context("Could not flush the graph stream")?;
        offsets_writer
            .flush()
            .context("Could not flush the offsets stream")?;

        // The property file is written last, so a graph with properties is a
        // complete graph.
        log::info!("Writing the .properties file");
        let properties = comp_flags.to_properties(real_num_nodes, num_arcs, Some(&stats));
        let properties_path = basename.with_extension(PROPERTIES_EXTENSION);
        std::fs::write(&properties_path, properties)
            .with_context(|| format!("Could not write {}", properties_path.display()))?;

        log::info!(
            "Compressed {} arcs into {} bits ({:.4} bits/arc)",
            num_arcs,
            total_bits,
            total_bits as f64 / num_arcs.max(1) as f64
        );
        Ok(total_bits)
    }

    /// Compresses `graph` with a thread pool sized by
    /// [`default_num_threads`](BvComp::default_num_threads), using the
    /// system temporary directory.
    pub fn parallel_store_default<G: SequentialGraph + SplitGraph>(
        basename: impl AsRef<Path> + Send + Sync,
        graph: &G,
        comp_flags: CompFlags,
    ) -> Result<u64> {
        let thread_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(Self::default_num_threads(graph.num_nodes()))
            .build()
            .context("Could not build thread pool")?;
        Self::parallel_store(basename, graph, comp_flags, &thread_pool, std::env::temp_dir())
    }

    /// Compresses `graph` in parallel, one contiguous node range per thread
    /// of the pool, writing the graph stream, the offsets stream, and the
    /// property file.
    ///
    /// Each worker compresses its range into temporary files inside a
    /// self-deleting directory under `tmp_dir`, with a fresh window: ranges
    /// never reference each other, which costs at most `compression_window`
    /// nodes of referential opportunity per range boundary. The temporary
    /// streams are then concatenated in range order, so the output reads
    /// back exactly as a single-threaded store would.
    ///
    /// Returns the length in bits of the graph stream. A worker panic aborts
    /// the store; the temporary directory cleans up after itself either way.
    pub fn parallel_store<G: SequentialGraph + SplitGraph>(
        basename: impl AsRef<Path> + Send + Sync,
        graph: &G,
        comp_flags: CompFlags,
        thread_pool: &rayon::ThreadPool,
        tmp_dir: impl AsRef<Path>,
    ) -> Result<u64> {
        comp_flags.check_supported()?;
        let basename = basename.as_ref();
        let graph_path = basename.with_extension(GRAPH_EXTENSION);
        let offsets_path = basename.with_extension(OFFSETS_EXTENSION);
        let num_nodes = graph.num_nodes();

        let tmp_dir = tempfile::TempDir::new_in(tmp_dir.as_ref())
            .context("Could not create temporary directory")?;
        let thread_graph_path =
            |thread_id: usize| tmp_dir.path().join(format!("{:016x}.graph", thread_id));
        let thread_offsets_path =
            |thread_id: usize| tmp_dir.path().join(format!("{:016x}.offsets", thread_id));

        let (tx, rx) = std::sync::mpsc::channel();

        thread_pool.in_place_scope(|scope| {
            for (thread_id, mut thread_lender) in graph
                .split_iter(thread_pool.current_num_threads())
                .into_iter()
                .enumerate()
            {
                let tx = tx.clone();
                let graph_tmp = thread_graph_path(thread_id);
                let offsets_tmp = thread_offsets_path(thread_id);
                scope.spawn(move |_| {
                    log::debug!("Compression thread {} started", thread_id);
                    let mut graph_writer = Some(BufBitWriter::<BE, _>::new(
                        WordAdapter::<usize, _>::new(BufWriter::new(
                            File::create(&graph_tmp).unwrap(),
                        )),
                    ));
                    let mut offsets_writer = BufBitWriter::<BE, _>::new(
                        WordAdapter::<usize, _>::new(BufWriter::new(
                            File::create(&offsets_tmp).unwrap(),
                        )),
                    );

                    let mut graph_bits: u64 = 0;
                    let mut offsets_bits: u64 = 0;
                    let mut num_arcs = 0;
                    let mut stats = CompStats::default();

                    // An empty range (more threads than nodes) still sends
                    // its job, so the driver sees every id.
                    let mut bvcomp = None;
                    while let Some((node, successors)) = thread_lender.next() {
                        // References are confined to the range: the window
                        // starts empty at its first node.
                        let bvcomp = bvcomp.get_or_insert_with(|| {
                            BvComp::new(
                                DynEncoder::new(graph_writer.take().unwrap(), &comp_flags),
                                comp_flags.compression_window,
                                comp_flags.max_ref_count,
                                comp_flags.min_interval_length,
                                node,
                            )
                        });
                        let bits = bvcomp.push(successors).unwrap();
                        graph_bits += bits;
                        offsets_bits += offsets_writer.write_gamma(bits).unwrap() as u64;
                    }
                    if let Some(bvcomp) = bvcomp {
                        num_arcs = bvcomp.arcs;
                        stats = *bvcomp.stats();
                        bvcomp.flush().unwrap();
                    }
                    offsets_writer.flush().unwrap();

                    log::debug!(
                        "Compression thread {} wrote {} bits",
                        thread_id,
                        graph_bits
                    );
                    tx.send(Job {
                        job_id: thread_id,
                        graph_bits,
                        offsets_bits,
                        num_arcs,
                        stats,
                    })
                    .unwrap();
                });
            }
            drop(tx);

            let mut graph_writer = BufBitWriter::<BE, _>::new(WordAdapter::<usize, _>::new(
                BufWriter::new(
                    File::create(&graph_path)
                        .with_context(|| format!("Could not create {}", graph_path.display()))?,
                ),
            ));
            let mut offsets_writer = BufBitWriter::<BE, _>::new(WordAdapter::<usize, _>::new(
                BufWriter::new(
                    File::create(&offsets_path)
                        .with_context(|| format!("Could not create {}", offsets_path.display()))?,
                ),
            ));
            // The leading zero offset is written once; the per-range streams
            // carry one gap per node.
            offsets_writer
                .write_gamma(0)
                .context("Could not write the initial offset")?;

            let mut total_bits: u64 = 0;
            let mut total_arcs: u64 = 0;
            let mut stats = CompStats::default();

            for job in OrderedJobs::new(rx) {
                let graph_tmp = thread_graph_path(job.job_id);
                log::debug!(
                    "Copying {} bits [{}..{}) from {}",
                    job.graph_bits,
                    total_bits,
                    total_bits + job.graph_bits,
                    graph_tmp.display(),
                );
                let mut reader = BufBitReader::<BE, _>::new(WordAdapter::<u32, _>::new(
                    BufReader::new(File::open(&graph_tmp).with_context(|| {
                        format!("Could not open {}", graph_tmp.display())
                    })?),
                ));
                graph_writer
                    .copy_from(&mut reader, job.graph_bits)
                    .with_context(|| {
                        format!("Could not copy from {}", graph_tmp.display())
                    })?;

                let offsets_tmp = thread_offsets_path(job.job_id);
                let mut reader = BufBitReader::<BE, _>::new(WordAdapter::<u32, _>::new(
                    BufReader::new(File::open(&offsets_tmp).with_context(|| {
                        format!("Could not open {}", offsets_tmp.display())
                    })?),
                ));
                offsets_writer
                    .copy_from(&mut reader, job.offsets_bits)
                    .with_context(|| {
                        format!("Could not copy from {}", offsets_tmp.display())
                    })?;

                total_bits += job.graph_bits;
                total_arcs += job.num_arcs;
                stats.add(&job.stats);
            }

            graph_writer
                .flush()
                .context("Could not flush the graph stream")?;
            offsets_writer
                .flush()
                .context("Could not flush the offsets stream")?;

            // The property file is written last, after a successful
            // concatenation.
            log::info!("Writing the .properties file");
            let properties = comp_flags.to_properties(num_nodes, total_arcs, Some(&stats));
            let properties_path = basename.with_extension(PROPERTIES_EXTENSION);
            std::fs::write(&properties_path, properties)
                .with_context(|| format!("Could not write {}", properties_path.display()))?;

            log::info!(
                "Compressed {} arcs into {} bits ({:.4} bits/arc)",
                total_arcs,
                total_bits,
                total_bits as f64 / total_arcs.max(1) as f64
            );
            Ok(total_bits)
        })
    }
}
