//! `PriorityQueueEM`: an external min-heap over `(key, value)` pairs keyed
//! by ascending `key` (typically a [`crate::types::SwapId`]), used by every
//! TFP stage to "send a value to a future swap" (spec.md §4.5;
//! SPEC_FULL.md §4.10).
//!
//! Small queues stay resident in a [`std::collections::BinaryHeap`]; once
//! the element count crosses a configurable threshold, the queue overflows
//! the same way [`crate::sorter::SortedRunBuilder`] does: buffered elements
//! are sorted and spilled as runs, later drained through a tournament of
//! run-heads held in a small in-memory heap alongside anything still
//! resident.

use crate::error::Result;
use crate::sorter::Encode;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};

/// Min-heap over `(key, value)` pairs. `pop_if_min` only removes an entry
/// when its key equals the caller's probe key, matching the "pull possible
/// states ... from {sorter ∪ PQ}" pull-don't-push contract of TFP (spec.md
/// §4.5): a stage asks "is there anything queued for swap N?" rather than
/// having the queue push values at it.
///
/// Once the resident heap crosses `spill_threshold` entries, it is drained
/// in ascending order into a spilled run on disk; `pop_if_min`/`drain_min`
/// transparently check every spilled run's head alongside the resident
/// heap, the same tournament-over-run-heads shape `SortedRunBuilder` uses.
pub struct PriorityQueueEM<K, V: Encode> {
    spill_threshold: usize,
    resident: BinaryHeap<Reverse<Entry<K, V>>>,
    runs: Vec<SpilledRun<K, V>>,
}

struct SpilledRun<K, V: Encode> {
    reader: BufReader<File>,
    head: Option<(K, V)>,
    _handle: tempfile::TempPath,
}

struct Entry<K, V>(K, V);

impl<K: Ord, V> PartialEq for Entry<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}
impl<K: Ord, V> Eq for Entry<K, V> {}
impl<K: Ord, V> PartialOrd for Entry<K, V> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl<K: Ord, V> Ord for Entry<K, V> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl<K: Ord + Copy + Encode, V: Copy + Encode> PriorityQueueEM<K, V> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_spill_threshold(1 << 20)
    }

    #[must_use]
    pub fn with_spill_threshold(spill_threshold: usize) -> Self {
        PriorityQueueEM {
            spill_threshold,
            resident: BinaryHeap::new(),
            runs: Vec::new(),
        }
    }

    /// Queues `value` for delivery at `key`, spilling the resident heap to a
    /// new run once it crosses `spill_threshold`.
    pub fn push(&mut self, runtime: &crate::runtime::Runtime, key: K, value: V) -> Result<()> {
        self.resident.push(Reverse(Entry(key, value)));
        if self.resident.len() >= self.spill_threshold {
            self.spill(runtime)?;
        }
        Ok(())
    }

    fn spill(&mut self, runtime: &crate::runtime::Runtime) -> Result<()> {
        let drained = std::mem::take(&mut self.resident);
        // `into_sorted_vec` is ascending in `Reverse<Entry>` order, i.e.
        // descending in `Entry`/key order; reverse once to get ascending
        // key order for sequential on-disk consumption.
        let ascending: Vec<(K, V)> = drained
            .into_sorted_vec()
            .into_iter()
            .rev()
            .map(|Reverse(Entry(k, v))| (k, v))
            .collect();
        let file = runtime.spill_file()?;
        let path = file.path().to_path_buf();
        let handle = file.into_temp_path();
        {
            let mut writer = BufWriter::new(std::fs::OpenOptions::new().write(true).open(&path)?);
            let mut raw = Vec::new();
            for (k, v) in &ascending {
                k.encode(&mut raw);
                v.encode(&mut raw);
            }
            writer.write_all(&raw)?;
            writer.flush()?;
        }
        let mut run = SpilledRun {
            reader: BufReader::new(File::open(&path)?),
            head: None,
            _handle: handle,
        };
        run.advance()?;
        self.runs.push(run);
        Ok(())
    }

    /// Number of elements currently queued, resident plus spilled.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resident.len() + self.runs.iter().filter(|r| r.head.is_some()).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pops and returns the value queued for `key` if the minimum key across
    /// the resident heap and every spilled run's head equals `key`;
    /// otherwise leaves the queue untouched and returns `None`.
    pub fn pop_if_min(&mut self, key: K) -> Result<Option<V>> {
        if let Some(Reverse(Entry(k, _))) = self.resident.peek() {
            if *k == key {
                let Reverse(Entry(_, v)) = self.resident.pop().expect("peek just matched");
                return Ok(Some(v));
            }
        }
        for run in &mut self.runs {
            if let Some((k, _)) = run.head {
                if k == key {
                    let (_, v) = run.head.take().expect("checked Some above");
                    run.advance()?;
                    return Ok(Some(v));
                }
            }
        }
        Ok(None)
    }

    /// Pops and returns every value queued for `key`.
    pub fn drain_min(&mut self, key: K) -> Result<Vec<V>> {
        let mut out = Vec::new();
        while let Some(v) = self.pop_if_min(key)? {
            out.push(v);
        }
        Ok(out)
    }

    #[must_use]
    pub fn peek_min_key(&self) -> Option<K> {
        let resident_min = self.resident.peek().map(|Reverse(Entry(k, _))| *k);
        let runs_min = self.runs.iter().filter_map(|r| r.head.map(|(k, _)| k)).min();
        match (resident_min, runs_min) {
            (Some(a), Some(b)) => Some(if a <= b { a } else { b }),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        }
    }
}

impl<K: Ord + Copy + Encode, V: Copy + Encode> SpilledRun<K, V> {
    fn advance(&mut self) -> Result<()> {
        let mut raw = vec![0u8; K::WIDTH + V::WIDTH];
        match self.reader.read_exact(&mut raw) {
            Ok(()) => {
                let (k_bytes, v_bytes) = raw.split_at(K::WIDTH);
                self.head = Some((K::decode(k_bytes), V::decode(v_bytes)));
            }
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                self.head = None;
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }
}

impl<K: Ord + Copy + Encode, V: Copy + Encode> Default for PriorityQueueEM<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl Encode for () {
    const WIDTH: usize = 0;
    fn encode(&self, _out: &mut Vec<u8>) {}
    fn decode(_bytes: &[u8]) -> Self {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Runtime;

    #[test]
    fn pop_if_min_only_fires_on_matching_key() {
        let rt = Runtime::for_testing(1);
        let mut pq: PriorityQueueEM<i64, i64> = PriorityQueueEM::new();
        pq.push(&rt, 5, 500).unwrap();
        pq.push(&rt, 2, 200).unwrap();
        pq.push(&rt, 2, 201).unwrap();
        assert_eq!(pq.pop_if_min(5).unwrap(), None);
        let mut twos = pq.drain_min(2).unwrap();
        twos.sort_unstable();
        assert_eq!(twos, vec![200, 201]);
        assert_eq!(pq.pop_if_min(5).unwrap(), Some(500));
        assert!(pq.is_empty());
    }

    #[test]
    fn peek_min_key_tracks_the_smallest_pending_key() {
        let rt = Runtime::for_testing(2);
        let mut pq: PriorityQueueEM<i32, ()> = PriorityQueueEM::new();
        assert_eq!(pq.peek_min_key(), None);
        pq.push(&rt, 10, ()).unwrap();
        pq.push(&rt, 3, ()).unwrap();
        pq.push(&rt, 7, ()).unwrap();
        assert_eq!(pq.peek_min_key(), Some(3));
        pq.pop_if_min(3).unwrap();
        assert_eq!(pq.peek_min_key(), Some(7));
    }

    #[test]
    fn spills_and_still_drains_in_key_order() {
        let rt = Runtime::for_testing(3);
        let mut pq: PriorityQueueEM<i64, i64> = PriorityQueueEM::with_spill_threshold(4);
        for k in (0..20).rev() {
            pq.push(&rt, k, k * 10).unwrap();
        }
        let mut out = Vec::new();
        for k in 0..20 {
            out.extend(pq.drain_min(k).unwrap());
        }
        assert_eq!(out, (0..20).map(|k| k * 10).collect::<Vec<_>>());
        assert!(pq.is_empty());
    }
}
