//! `EdgeStream`: the append-only, sorted edge container that is the shared
//! I/O substrate of this crate (spec.md §4.1).
//!
//! Internally, edges are not stored as `(head, tail)` pairs directly.
//! Instead, following the same head/tails layout described in spec.md §3,
//! only the tail sequence is kept; the head is reconstructed on read by
//! counting [`INVALID_NODE`] sentinels, one of which is emitted for every
//! head transition (whether the head being entered is empty or not). This
//! keeps the format unambiguous: a sentinel always means "advance the head
//! counter by one and do not emit an edge", and any other value is a tail
//! of the current head.

use crate::error::{Error, Result};
use crate::runtime::Runtime;
use crate::types::{Edge, NodeId, INVALID_NODE};
use std::io::{BufReader, BufWriter, Read, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Write,
    Read,
}

/// Past this many buffered entries, a stream spills to a temp file rather
/// than growing its in-memory buffer further.
const DEFAULT_SPILL_THRESHOLD: usize = 1 << 20;

enum Backing {
    Memory(Vec<NodeId>),
    /// All data has been flushed to the path owned by `spill_writer`. The
    /// path is duplicated here only so the read phase can reopen it; the
    /// `TempPath` guard that keeps the file from being deleted lives in
    /// `EdgeStream::spill_writer`, not here.
    Spilled { path: std::path::PathBuf },
}

/// An active spill-file writer, opened lazily the first time a stream
/// crosses `spill_threshold`. Every later flush appends to the same file.
/// Its `_handle` keeps the underlying temp file alive (and deletes it on
/// drop) for as long as this `EdgeStream` is.
struct SpillWriter {
    writer: BufWriter<std::fs::File>,
    _handle: tempfile::TempPath,
}

/// An append-only, sorted container of normalized edges with a rewindable
/// forward-only read cursor.
pub struct EdgeStream {
    mode: Mode,
    backing: Backing,
    spill_writer: Option<SpillWriter>,
    spill_threshold: usize,
    runtime: Option<Runtime>,
    write_buffer: Vec<NodeId>,
    last_edge: Option<Edge>,
    allow_loops: bool,
    allow_multi: bool,
    size: u64,
    loops: u64,
    multiedges: u64,
    // Read-side cursor state.
    cursor: ReadCursor,
}

#[derive(Default)]
struct ReadCursor {
    reader: Option<BufReader<std::fs::File>>,
    mem_pos: usize,
    head: i64,
    current: Option<Edge>,
    exhausted: bool,
}

impl EdgeStream {
    /// Builds an empty, purely in-memory stream. Loops and multi-edges are
    /// rejected by default, matching the conservative default for a
    /// simple-graph pipeline.
    #[must_use]
    pub fn new() -> Self {
        EdgeStream {
            mode: Mode::Write,
            backing: Backing::Memory(Vec::new()),
            spill_writer: None,
            spill_threshold: DEFAULT_SPILL_THRESHOLD,
            runtime: None,
            write_buffer: Vec::new(),
            last_edge: None,
            allow_loops: false,
            allow_multi: false,
            size: 0,
            loops: 0,
            multiedges: 0,
            cursor: ReadCursor::default(),
        }
    }

    /// Builds an empty stream backed by `runtime`'s temp-directory policy,
    /// spilling to disk once the in-memory buffer grows past a threshold
    /// derived from the runtime's memory budget.
    #[must_use]
    pub fn with_runtime(runtime: Runtime, allow_loops: bool, allow_multi: bool) -> Self {
        let spill_threshold = (runtime.memory_budget() / 4 / std::mem::size_of::<NodeId>())
            .max(1024);
        EdgeStream {
            mode: Mode::Write,
            backing: Backing::Memory(Vec::new()),
            spill_writer: None,
            spill_threshold,
            runtime: Some(runtime),
            write_buffer: Vec::new(),
            last_edge: None,
            allow_loops,
            allow_multi,
            size: 0,
            loops: 0,
            multiedges: 0,
            cursor: ReadCursor::default(),
        }
    }

    /// Builds a stream with explicit loop/multi-edge acceptance flags.
    #[must_use]
    pub fn with_flags(allow_loops: bool, allow_multi: bool) -> Self {
        let mut s = EdgeStream::new();
        s.allow_loops = allow_loops;
        s.allow_multi = allow_multi;
        s
    }

    /// Appends `edge`. Fails with [`Error::OrderViolation`] if `edge` sorts
    /// strictly before the last pushed edge; with [`Error::LoopNotAllowed`]
    /// / [`Error::MultiEdgeNotAllowed`] if the corresponding flag is `false`
    /// and `edge` is a loop or duplicates the previous edge. Loop/multi
    /// counters are incremented regardless of whether the push is rejected.
    pub fn push(&mut self, edge: Edge) -> Result<()> {
        assert_eq!(self.mode, Mode::Write, "EdgeStream::push after rewind()");

        if let Some(prev) = self.last_edge {
            if edge < prev {
                return Err(Error::OrderViolation { prev, next: edge });
            }
        }

        let is_loop = edge.is_loop();
        let is_multi = self.last_edge == Some(edge);
        if is_loop {
            self.loops += 1;
        }
        if is_multi {
            self.multiedges += 1;
        }
        if is_loop && !self.allow_loops {
            return Err(Error::LoopNotAllowed(edge));
        }
        if is_multi && !self.allow_multi {
            return Err(Error::MultiEdgeNotAllowed(edge));
        }

        let prev_head = self.last_edge.map_or(-1_i64, |e| e.first as i64);
        let mut head_cursor = prev_head;
        let target_head = edge.first as i64;
        while head_cursor < target_head {
            self.write_buffer.push(INVALID_NODE);
            head_cursor += 1;
        }
        self.write_buffer.push(edge.second);

        self.last_edge = Some(edge);
        self.size += 1;
        self.maybe_spill()?;
        Ok(())
    }

    /// Once the in-memory write buffer crosses `spill_threshold`, flushes it
    /// to the (lazily opened, then kept open) spill file and switches
    /// `backing` to `Spilled` for the remainder of the write phase.
    fn maybe_spill(&mut self) -> Result<()> {
        if self.write_buffer.len() < self.spill_threshold {
            return Ok(());
        }
        let Some(runtime) = &self.runtime else {
            return Ok(());
        };
        if self.spill_writer.is_none() {
            let file = runtime.spill_file()?;
            let path = file.path().to_path_buf();
            let handle = file.into_temp_path();
            let opened = std::fs::OpenOptions::new().write(true).open(&path)?;
            let mut writer = BufWriter::new(opened);
            if let Backing::Memory(existing) = &self.backing {
                for v in existing {
                    writer.write_all(&v.to_le_bytes())?;
                }
            }
            self.spill_writer = Some(SpillWriter {
                writer,
                _handle: handle,
            });
            self.backing = Backing::Spilled { path };
        }
        let w = &mut self.spill_writer.as_mut().expect("initialized above").writer;
        for v in &self.write_buffer {
            w.write_all(&v.to_le_bytes())?;
        }
        w.flush()?;
        self.write_buffer.clear();
        Ok(())
    }

    /// Switches to the read phase. The current edge becomes the first edge,
    /// or [`Self::empty`] reports `true` if the stream has no edges.
    pub fn rewind(&mut self) -> Result<()> {
        match &mut self.backing {
            Backing::Memory(v) => v.append(&mut self.write_buffer),
            Backing::Spilled { .. } => {
                if !self.write_buffer.is_empty() {
                    self.spill_threshold = 0;
                    self.maybe_spill()?;
                }
                if let Some(w) = &mut self.spill_writer {
                    w.writer.flush()?;
                }
            }
        }
        self.mode = Mode::Read;
        self.cursor = ReadCursor::default();
        match &self.backing {
            Backing::Spilled { path, .. } => {
                self.cursor.reader = Some(BufReader::new(std::fs::File::open(path)?));
            }
            Backing::Memory(_) => {}
        }
        self.cursor.head = -1;
        self.advance()?;
        Ok(())
    }

    fn next_raw(&mut self) -> Result<Option<NodeId>> {
        match &self.backing {
            Backing::Memory(v) => {
                if self.cursor.mem_pos < v.len() {
                    let x = v[self.cursor.mem_pos];
                    self.cursor.mem_pos += 1;
                    Ok(Some(x))
                } else {
                    Ok(None)
                }
            }
            Backing::Spilled { .. } => {
                let reader = self.cursor.reader.as_mut().expect("rewind() opens the spill reader");
                let mut buf = [0u8; std::mem::size_of::<NodeId>()];
                match reader.read_exact(&mut buf) {
                    Ok(()) => Ok(Some(NodeId::from_le_bytes(buf))),
                    Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
                    Err(e) => Err(Error::IoFailure(e)),
                }
            }
        }
    }

    /// Moves to the next edge, transparently skipping sentinel markers for
    /// empty heads. Returns the newly current edge, or `None` past the end.
    pub fn advance(&mut self) -> Result<Option<Edge>> {
        assert_eq!(self.mode, Mode::Read, "EdgeStream::advance before rewind()");
        loop {
            match self.next_raw()? {
                None => {
                    self.cursor.current = None;
                    self.cursor.exhausted = true;
                    return Ok(None);
                }
                Some(INVALID_NODE) => {
                    self.cursor.head += 1;
                }
                Some(tail) => {
                    let edge = Edge::new(self.cursor.head as NodeId, tail);
                    self.cursor.current = Some(edge);
                    return Ok(Some(edge));
                }
            }
        }
    }

    /// The edge the read cursor currently sits on, if any.
    #[must_use]
    pub fn current(&self) -> Option<Edge> {
        self.cursor.current
    }

    /// True if the stream has no edges (regardless of write/read phase).
    #[must_use]
    pub fn empty(&self) -> bool {
        self.size == 0
    }

    /// Total number of edges ever pushed.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    #[must_use]
    pub fn loops(&self) -> u64 {
        self.loops
    }

    #[must_use]
    pub fn multiedges(&self) -> u64 {
        self.multiedges
    }

    /// Resets the stream to a fresh, empty write phase.
    pub fn clear(&mut self) {
        self.mode = Mode::Write;
        self.backing = Backing::Memory(Vec::new());
        self.write_buffer.clear();
        self.last_edge = None;
        self.size = 0;
        self.loops = 0;
        self.multiedges = 0;
        self.cursor = ReadCursor::default();
    }

    /// Drains the stream into a `Vec<Edge>` by rewinding and reading to the
    /// end. Intended for small streams and tests.
    pub fn to_vec(&mut self) -> Result<Vec<Edge>> {
        self.rewind()?;
        let mut out = Vec::new();
        if let Some(e) = self.current() {
            out.push(e);
        } else {
            return Ok(out);
        }
        while let Some(e) = self.advance()? {
            out.push(e);
        }
        Ok(out)
    }

    /// Builds a stream by pushing every edge of `edges` in order. `edges`
    /// must already be sorted; callers that are unsure should sort first.
    pub fn from_sorted(edges: impl IntoIterator<Item = Edge>, allow_loops: bool, allow_multi: bool) -> Result<Self> {
        let mut s = EdgeStream::with_flags(allow_loops, allow_multi);
        for e in edges {
            s.push(e)?;
        }
        Ok(s)
    }
}

impl Default for EdgeStream {
    fn default() -> Self {
        EdgeStream::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn e(u: NodeId, v: NodeId) -> Edge {
        Edge::new(u, v)
    }

    #[test]
    fn round_trip_preserves_order() {
        let input = vec![e(0, 1), e(0, 3), e(1, 2), e(4, 5), e(4, 7)];
        let mut s = EdgeStream::from_sorted(input.clone(), false, false).unwrap();
        let out = s.to_vec().unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn skips_empty_heads() {
        // Heads 1 and 2 have no edges.
        let input = vec![e(0, 5), e(3, 4)];
        let mut s = EdgeStream::from_sorted(input.clone(), false, false).unwrap();
        let out = s.to_vec().unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn rejects_out_of_order_push() {
        let mut s = EdgeStream::with_flags(false, false);
        s.push(e(2, 3)).unwrap();
        let err = s.push(e(1, 0)).unwrap_err();
        assert!(matches!(err, Error::OrderViolation { .. }));
    }

    #[test]
    fn rejects_loops_and_multiedges_by_default() {
        let mut s = EdgeStream::with_flags(false, false);
        assert!(matches!(s.push(e(2, 2)), Err(Error::LoopNotAllowed(_))));

        let mut s2 = EdgeStream::with_flags(false, false);
        s2.push(e(0, 1)).unwrap();
        assert!(matches!(s2.push(e(0, 1)), Err(Error::MultiEdgeNotAllowed(_))));
    }

    #[test]
    fn counts_loops_and_multiedges_even_when_allowed() {
        let mut s = EdgeStream::with_flags(true, true);
        s.push(e(0, 0)).unwrap();
        s.push(e(0, 1)).unwrap();
        s.push(e(0, 1)).unwrap();
        assert_eq!(s.loops(), 1);
        assert_eq!(s.multiedges(), 1);
        assert_eq!(s.size(), 3);
    }

    #[test]
    fn empty_stream_reports_empty() {
        let mut s = EdgeStream::with_flags(false, false);
        assert!(s.empty());
        s.rewind().unwrap();
        assert_eq!(s.current(), None);
    }
}
