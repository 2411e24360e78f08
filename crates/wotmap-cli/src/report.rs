//! Report files for an analysis run.
//!
//! # Layout
//!
//! All files live under the output directory:
//!
//! - `status.txt` — import and phase progress lines.
//! - `othersets.txt` — every strongly connected set: one identifier
//!   line per member, then a size trailer.
//! - `msd.txt` — one `identifier  mean` line per analyzed key, written
//!   as workers finish keys.
//! - `other.txt` — the overall average mean.
//! - one report file per analyzed key, named by the low identifier
//!   half, under a two-hex-digit subdirectory unless `--flat`.
//!
//! The msd stream is shared between workers and serialized behind a
//! mutex; per-key files are created by whichever worker owns the key,
//! so they need no locking.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};
use wotmap_core::{KeyGraph, KeyId, KeyRecord, ReportSink, SccForest};

/// Writer for the whole report file set.
pub struct Reporter {
    outdir: PathBuf,
    flat: bool,
    status: BufWriter<File>,
    sets: BufWriter<File>,
    other: BufWriter<File>,
    msd: Mutex<BufWriter<File>>,
}

impl Reporter {
    /// Create the output directory and open the shared report files.
    ///
    /// # Errors
    ///
    /// Fails if the directory or any file cannot be created.
    pub fn create(outdir: &Path, flat: bool) -> Result<Self> {
        fs::create_dir_all(outdir)
            .with_context(|| format!("create output directory {}", outdir.display()))?;
        let open = |name: &str| -> Result<BufWriter<File>> {
            let path = outdir.join(name);
            let file =
                File::create(&path).with_context(|| format!("create {}", path.display()))?;
            Ok(BufWriter::new(file))
        };
        Ok(Self {
            outdir: outdir.to_path_buf(),
            flat,
            status: open("status.txt")?,
            sets: open("othersets.txt")?,
            other: open("other.txt")?,
            msd: Mutex::new(open("msd.txt")?),
        })
    }

    /// Append one line to `status.txt`.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors.
    pub fn status_line(&mut self, line: &str) -> Result<()> {
        writeln!(self.status, "{line}").context("write status.txt")?;
        self.status.flush().context("flush status.txt")
    }

    /// Write every strongly connected set to `othersets.txt`, members
    /// in closure order.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors.
    pub fn write_components(&mut self, graph: &KeyGraph, scc: &SccForest) -> Result<()> {
        for component in &scc.components {
            for &member in &component.members {
                writeln!(self.sets, "{}", graph.key_id(member))
                    .context("write othersets.txt")?;
            }
            writeln!(
                self.sets,
                "*** {} keys in this strongly connected set\n",
                component.len()
            )
            .context("write othersets.txt")?;
        }
        self.sets.flush().context("flush othersets.txt")
    }

    /// Write the overall average to `other.txt`.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors.
    pub fn write_global_mean(&mut self, mean: f64) -> Result<()> {
        writeln!(self.other, "Average mean is {mean:9.4}").context("write other.txt")?;
        self.other.flush().context("flush other.txt")
    }

    /// The per-key sink handed to the analyzer. Borrows the graph for
    /// identifier resolution in the signature lists.
    #[must_use]
    pub const fn key_sink<'a>(&'a self, graph: &'a KeyGraph) -> KeyReportSink<'a> {
        KeyReportSink {
            reporter: self,
            graph,
        }
    }

    /// Path of one key's report file, creating the two-hex-digit
    /// subdirectory when the layout calls for it.
    fn key_report_path(&self, id: KeyId) -> Result<PathBuf> {
        let name = format!("{:08X}", id.lo);
        if self.flat {
            return Ok(self.outdir.join(name));
        }
        let dir = self.outdir.join(&name[..2]);
        fs::create_dir_all(&dir)
            .with_context(|| format!("create report directory {}", dir.display()))?;
        Ok(dir.join(name))
    }
}

/// Per-key report sink backed by a [`Reporter`].
pub struct KeyReportSink<'a> {
    reporter: &'a Reporter,
    graph: &'a KeyGraph,
}

impl KeyReportSink<'_> {
    fn write_key_list(&self, out: &mut impl Write, members: &[usize]) -> Result<usize> {
        for &index in members {
            writeln!(out, "  {}", self.graph.key_id(index))?;
        }
        Ok(members.len())
    }

    fn write_individual(&self, out: &mut impl Write, record: &KeyRecord) -> Result<()> {
        writeln!(out, "KeyID {}\n", record.id)?;
        writeln!(
            out,
            "This individual key report was generated as part of a wotmap keyring\nanalysis run.\n"
        )?;
        writeln!(
            out,
            "Note: Key signature counts and lists are from a pruned list that only\nincludes keys with signatures other than their own.\n"
        )?;

        writeln!(out, "Signatures to this key:")?;
        let to = self.write_key_list(out, self.graph.signed_by(record.index))?;
        writeln!(out, "Total: {to} signatures to this id from this set\n")?;

        writeln!(out, "Signatures from this key:")?;
        let from = self.write_key_list(out, self.graph.signed(record.index))?;
        writeln!(out, "Total: {from} signatures from this id to this set\n")?;

        let membership = if record.in_strong_set { "" } else { "not " };
        writeln!(out, "This key is {membership}in the strong set.")?;
        writeln!(
            out,
            "Mean distance to this key from strong set: {:8.4}\n",
            record.distances.mean
        )?;

        writeln!(out, "Breakout by hop count (only from strong set):")?;
        for (hop, count) in record.distances.histogram() {
            writeln!(out, "{hop:2} hops: {count:5}")?;
        }
        if !record.distances.farthest.is_empty() {
            writeln!(
                out,
                "\nFarthest keys ({} hops):",
                record.distances.display_hop_high()
            )?;
            for &index in &record.distances.farthest {
                writeln!(out, "  {}", self.graph.key_id(index))?;
            }
        }
        Ok(())
    }
}

impl ReportSink for KeyReportSink<'_> {
    fn key_report(&self, record: &KeyRecord) -> Result<()> {
        {
            let mut msd = self
                .reporter
                .msd
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            writeln!(msd, "{} {:8.4}", record.id, record.distances.mean)
                .context("write msd.txt")?;
            msd.flush().context("flush msd.txt")?;
        }

        let path = self.reporter.key_report_path(record.id)?;
        let file =
            File::create(&path).with_context(|| format!("create {}", path.display()))?;
        let mut out = BufWriter::new(file);
        self.write_individual(&mut out, record)
            .with_context(|| format!("write {}", path.display()))?;
        out.flush()
            .with_context(|| format!("flush {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wotmap_core::{KeyDistances, SccForest};

    fn sample_graph() -> KeyGraph {
        let mut g = KeyGraph::with_capacity(4);
        for i in 0..3u32 {
            g.insert_key(KeyId::new(0, 0xA0 + i)).expect("capacity");
        }
        g.add_edge(Some(0), Some(1));
        g.add_edge(Some(1), Some(2));
        g.add_edge(Some(2), Some(0));
        g
    }

    #[test]
    fn individual_report_body() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let graph = sample_graph();
        let scc = SccForest::decompose(&graph);
        let reporter = Reporter::create(tmp.path(), true).expect("reporter");
        let sink = reporter.key_sink(&graph);

        let record = KeyRecord {
            index: 0,
            id: graph.key_id(0),
            in_strong_set: true,
            distances: KeyDistances::measure(&graph, &scc, 0),
        };
        let mut out = Vec::new();
        sink.write_individual(&mut out, &record).expect("report");
        let text = String::from_utf8(out).expect("utf8");

        assert!(text.starts_with("KeyID 00000000 000000A0\n"));
        assert!(text.contains("This key is in the strong set."));
        assert!(text.contains("Mean distance to this key from strong set:   1.0000"));
        assert!(text.contains("Signatures to this key:\n  00000000 000000A2"));
        assert!(text.contains(" 0 hops:     1"));
        assert!(text.contains("Farthest keys (2 hops):"));
    }

    #[test]
    fn not_in_strong_set_wording() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let mut graph = sample_graph();
        graph.insert_key(KeyId::new(0, 0xFF)).expect("capacity");
        graph.add_edge(Some(3), Some(0));
        let scc = SccForest::decompose(&graph);
        let reporter = Reporter::create(tmp.path(), true).expect("reporter");
        let sink = reporter.key_sink(&graph);

        let record = KeyRecord {
            index: 3,
            id: graph.key_id(3),
            in_strong_set: scc.in_strong_set(3),
            distances: KeyDistances::measure(&graph, &scc, 3),
        };
        let mut out = Vec::new();
        sink.write_individual(&mut out, &record).expect("report");
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.contains("This key is not in the strong set."));
    }

    #[test]
    fn subdirectory_layout_uses_first_two_hex_digits() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let reporter = Reporter::create(tmp.path(), false).expect("reporter");
        let path = reporter
            .key_report_path(KeyId::new(0, 0xAB12_3456))
            .expect("path");
        assert_eq!(path, tmp.path().join("AB").join("AB123456"));
        assert!(tmp.path().join("AB").is_dir());
    }

    #[test]
    fn flat_layout_skips_the_subdirectory() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let reporter = Reporter::create(tmp.path(), true).expect("reporter");
        let path = reporter
            .key_report_path(KeyId::new(0, 0xAB12_3456))
            .expect("path");
        assert_eq!(path, tmp.path().join("AB123456"));
    }
}
