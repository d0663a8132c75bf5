//! `SortedRunBuilder`: an external sorter generic over `T: Ord + Copy`
//! (spec.md §2, "reused"; SPEC_FULL.md §4.9).
//!
//! Records are buffered unordered via [`SortedRunBuilder::push`]; once the
//! buffer reaches a run length derived from the runtime's memory budget, it
//! is sorted in place and kept as a "chain" of one run, mirroring
//! `MergeBatcher::chain_push`/`insert_chain`'s geometric chain-balancing
//! merge (`differential-dataflow/src/trace/implementations/merge_batcher.rs`):
//! a freshly sorted run is folded into the previous chain whenever its
//! length is within a factor of two of that chain's length, so the number of
//! live chains stays `O(log(n / run_length))`. [`SortedRunBuilder::finish`]
//! merges every remaining chain into one sorted stream and returns a
//! rewindable cursor over it.

use crate::error::Result;
use crate::runtime::Runtime;
use std::cmp::Ordering;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};

/// A fixed-width record type a [`SortedRunBuilder`] can spill to disk.
///
/// Implemented for every record type the EM-ES/EM-CB pipelines sort
/// (`edge_id`/`swap_id` pairs, existence requests, final edge updates); kept
/// as an explicit trait rather than reaching for raw-byte transmutation so
/// the on-disk format for each record type is spelled out once, in one
/// place, rather than relying on `T`'s memory layout.
pub trait Encode: Sized {
    const WIDTH: usize;
    fn encode(&self, out: &mut Vec<u8>);
    fn decode(bytes: &[u8]) -> Self;
}

macro_rules! impl_encode_int {
    ($t:ty) => {
        impl Encode for $t {
            const WIDTH: usize = std::mem::size_of::<$t>();
            fn encode(&self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }
            fn decode(bytes: &[u8]) -> Self {
                let mut buf = [0u8; std::mem::size_of::<$t>()];
                buf.copy_from_slice(bytes);
                <$t>::from_le_bytes(buf)
            }
        }
    };
}

impl_encode_int!(i32);
impl_encode_int!(i64);
impl_encode_int!(u32);
impl_encode_int!(u64);
impl_encode_int!(u8);

impl<A: Encode, B: Encode> Encode for (A, B) {
    const WIDTH: usize = A::WIDTH + B::WIDTH;
    fn encode(&self, out: &mut Vec<u8>) {
        self.0.encode(out);
        self.1.encode(out);
    }
    fn decode(bytes: &[u8]) -> Self {
        let (a, b) = bytes.split_at(A::WIDTH);
        (A::decode(a), B::decode(b))
    }
}

impl Encode for crate::types::Edge {
    const WIDTH: usize = 2 * std::mem::size_of::<crate::types::NodeId>();
    fn encode(&self, out: &mut Vec<u8>) {
        self.first.encode(out);
        self.second.encode(out);
    }
    fn decode(bytes: &[u8]) -> Self {
        let (a, b) = bytes.split_at(std::mem::size_of::<crate::types::NodeId>());
        crate::types::Edge { first: i32::decode(a), second: i32::decode(b) }
    }
}

impl<A: Encode, B: Encode, C: Encode> Encode for (A, B, C) {
    const WIDTH: usize = A::WIDTH + B::WIDTH + C::WIDTH;
    fn encode(&self, out: &mut Vec<u8>) {
        self.0.encode(out);
        self.1.encode(out);
        self.2.encode(out);
    }
    fn decode(bytes: &[u8]) -> Self {
        let (a, rest) = bytes.split_at(A::WIDTH);
        let (b, c) = rest.split_at(B::WIDTH);
        (A::decode(a), B::decode(b), C::decode(c))
    }
}

/// One sorted chunk of records, either still resident in memory or spilled.
enum Run<T> {
    Memory(Vec<T>),
    Spilled { path: std::path::PathBuf, len: usize, _handle: tempfile::TempPath },
}

impl<T> Run<T> {
    fn len(&self) -> usize {
        match self {
            Run::Memory(v) => v.len(),
            Run::Spilled { len, .. } => *len,
        }
    }
}

/// Push-then-stream external sorter.
pub struct SortedRunBuilder<T> {
    runtime: Runtime,
    run_len: usize,
    buffer: Vec<T>,
    /// Chains of merged runs, oldest first; `chains.last()` is the most
    /// recently formed chain, eligible to be merged with a new run once its
    /// length is within a factor of two.
    chains: Vec<Run<T>>,
}

impl<T: Ord + Copy + Encode> SortedRunBuilder<T> {
    /// Builds a sorter whose in-memory run length is derived from
    /// `runtime.memory_budget()`, with a floor so tiny budgets still make
    /// progress.
    #[must_use]
    pub fn new(runtime: Runtime) -> Self {
        let run_len = (runtime.memory_budget() / 8 / T::WIDTH.max(1)).max(256);
        SortedRunBuilder {
            runtime,
            run_len,
            buffer: Vec::with_capacity(run_len.min(4096)),
            chains: Vec::new(),
        }
    }

    /// Buffers one record, flushing a sorted run once the buffer reaches the
    /// configured run length.
    pub fn push(&mut self, record: T) -> Result<()> {
        self.buffer.push(record);
        if self.buffer.len() >= self.run_len {
            self.flush_run()?;
        }
        Ok(())
    }

    fn flush_run(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        self.buffer.sort_unstable();
        let run = std::mem::take(&mut self.buffer);
        self.insert_chain(Run::Memory(run))?;
        Ok(())
    }

    /// Folds `run` into `chains`, merging with the top of the stack while
    /// the new top is no more than twice the length of its predecessor —
    /// `MergeBatcher::insert_chain`'s geometric balancing rule.
    fn insert_chain(&mut self, mut run: Run<T>) -> Result<()> {
        loop {
            match self.chains.last() {
                Some(top) if top.len() <= run.len() * 2 => {
                    let prev = self.chains.pop().expect("checked by last()");
                    run = self.merge_runs(prev, run)?;
                }
                _ => break,
            }
        }
        self.chains.push(run);
        Ok(())
    }

    fn merge_runs(&mut self, a: Run<T>, b: Run<T>) -> Result<Run<T>> {
        let merged_len = a.len() + b.len();
        let a_items = Self::read_all(a)?;
        let b_items = Self::read_all(b)?;
        let mut merged = Vec::with_capacity(merged_len);
        let (mut i, mut j) = (0, 0);
        while i < a_items.len() && j < b_items.len() {
            match a_items[i].cmp(&b_items[j]) {
                Ordering::Greater => {
                    merged.push(b_items[j]);
                    j += 1;
                }
                _ => {
                    merged.push(a_items[i]);
                    i += 1;
                }
            }
        }
        merged.extend_from_slice(&a_items[i..]);
        merged.extend_from_slice(&b_items[j..]);

        if merged.len() <= self.run_len * 2 {
            Ok(Run::Memory(merged))
        } else {
            self.spill(merged)
        }
    }

    fn read_all(run: Run<T>) -> Result<Vec<T>> {
        match run {
            Run::Memory(v) => Ok(v),
            Run::Spilled { path, len, _handle } => {
                let mut reader = BufReader::new(File::open(&path)?);
                let mut out = Vec::with_capacity(len);
                let mut raw = vec![0u8; len * T::WIDTH];
                reader.read_exact(&mut raw)?;
                drop(_handle);
                for chunk in raw.chunks_exact(T::WIDTH) {
                    out.push(T::decode(chunk));
                }
                Ok(out)
            }
        }
    }

    fn spill(&self, items: Vec<T>) -> Result<Run<T>> {
        let file = self.runtime.spill_file()?;
        let path = file.path().to_path_buf();
        let handle = file.into_temp_path();
        let mut writer = BufWriter::new(std::fs::OpenOptions::new().write(true).open(&path)?);
        let mut raw = Vec::with_capacity(items.len() * T::WIDTH);
        for item in &items {
            item.encode(&mut raw);
        }
        writer.write_all(&raw)?;
        writer.flush()?;
        Ok(Run::Spilled { path, len: items.len(), _handle: handle })
    }

    /// Merges all remaining chains into one sorted sequence and returns a
    /// rewindable cursor over it. Consumes the builder.
    pub fn finish(mut self) -> Result<SortedRunCursor<T>> {
        self.flush_run()?;
        let mut merged = match self.chains.pop() {
            Some(r) => r,
            None => Run::Memory(Vec::new()),
        };
        while let Some(next) = self.chains.pop() {
            merged = self.merge_runs(next, merged)?;
        }
        Ok(SortedRunCursor {
            items: Self::read_all(merged)?,
            pos: 0,
        })
    }
}

/// A rewindable forward cursor over a fully merged, sorted run.
pub struct SortedRunCursor<T> {
    items: Vec<T>,
    pos: usize,
}

impl<T: Copy> SortedRunCursor<T> {
    #[must_use]
    pub fn peek(&self) -> Option<T> {
        self.items.get(self.pos).copied()
    }

    pub fn advance(&mut self) -> Option<T> {
        let item = self.peek()?;
        self.pos += 1;
        Some(item)
    }

    pub fn rewind(&mut self) {
        self.pos = 0;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorts_across_many_small_runs() {
        let runtime = Runtime::for_testing(1);
        let mut builder = SortedRunBuilder::<i64>::new(runtime);
        // Force many tiny runs by pushing enough records to cross `run_len`
        // several times over even with a generous test budget.
        let mut input: Vec<i64> = (0..5000).rev().collect();
        for &v in &input {
            builder.push(v).unwrap();
        }
        let mut cursor = builder.finish().unwrap();
        input.sort_unstable();
        let mut out = Vec::new();
        while let Some(v) = cursor.advance() {
            out.push(v);
        }
        assert_eq!(out, input);
    }

    #[test]
    fn empty_builder_yields_empty_cursor() {
        let runtime = Runtime::for_testing(2);
        let builder = SortedRunBuilder::<i32>::new(runtime);
        let cursor = builder.finish().unwrap();
        assert!(cursor.is_empty());
    }

    #[test]
    fn rewind_replays_the_same_sequence() {
        let runtime = Runtime::for_testing(3);
        let mut builder = SortedRunBuilder::<i32>::new(runtime);
        for v in [5, 1, 4, 2, 3] {
            builder.push(v).unwrap();
        }
        let mut cursor = builder.finish().unwrap();
        let first: Vec<_> = std::iter::from_fn(|| cursor.advance()).collect();
        cursor.rewind();
        let second: Vec<_> = std::iter::from_fn(|| cursor.advance()).collect();
        assert_eq!(first, second);
        assert_eq!(first, vec![1, 2, 3, 4, 5]);
    }
}
