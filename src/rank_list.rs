//! Rank-tracking skip list keyed by (score, identity).
//!
//! Entries sort by score descending with ties broken by ascending
//! identity, and every forward link records a span: the number of rank
//! positions it covers. Span bookkeeping is what turns ordinary skip list
//! traversal into rank arithmetic - the descent that finds a (score, id)
//! position also accumulates the exact 1-based rank of that position, so
//! rank lookups, positional lookups, and bounded range scans all run in
//! O(log n) without touching more than one tower per level.
//!
//! # Structure
//!
//! Nodes live in an arena and link to each other by index. Each node owns
//! a tower of 1..=32 levels; level heights are drawn from a geometric
//! distribution with promotion probability 1/4. The head sentinel always
//! has the full 32 levels and its spans encode the rank of the first node
//! reachable at each level. Labels below are `id (score)`:
//!
//! ```text
//! Level 2: HEAD ---------------(3)---------------> 2 (70) ----(2)----> END
//! Level 1: HEAD --(1)--> 4 (95) -------(2)-------> 2 (70) ----(2)----> END
//! Level 0: HEAD -> 4 (95) -> 7 (82) -> 2 (70) -> 9 (70) -> 5 (41) -> END
//! ```
//!
//! A link whose forward index is END still carries a span: the number of
//! nodes after its owner. Keeping that count live is what lets the range
//! queries size their cursors without a second traversal.
//!
//! # Operations
//!
//! - `insert(entry)` / `remove(id)` / `update(entry)`: O(log n)
//! - `get(id)`: O(log n) - identity map gives the score, one descent finds the node
//! - `rank_of(id)` / `get_by_rank(rank)`: O(log n)
//! - `range_by_score(min, max)` / `range_by_rank(b, e)` / `top()`: O(log n)
//!   to position a [`Cursor`], then O(1) per entry yielded
//! - `len()`: O(1)
//!
//! The list is single-threaded by design: no locking, no atomics. Cursors
//! borrow the list, so mutating while a cursor is live does not compile.

use std::fmt;
use std::mem::MaybeUninit;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use smallvec::smallvec;

use crate::entry::Rankable;

/// Maximum tower height. 32 levels covers any node count an `Idx` can address.
const MAX_HEIGHT: usize = 32;

/// Node index type. u32 halves the link footprint vs usize on 64-bit.
type Idx = u32;

/// Index marker for "no node": the end of a chain, or no back link.
const NULL: Idx = Idx::MAX;

/// Default xorshift seed for lists built with [`RankList::new`].
const DEFAULT_SEED: u64 = 0x51ab_95ee_cab1_e540;

/// One forward link in a node's tower.
#[derive(Clone, Copy)]
struct Level {
    /// Next node at this height, or NULL.
    forward: Idx,
    /// Rank positions covered from this node to `forward`: the count of
    /// nodes strictly between the two, plus one. When `forward` is NULL,
    /// the count of nodes after this one.
    span: u32,
}

/// A node in the list: one indexed entry plus its tower of links.
struct Node<T> {
    /// The caller's entry. Uninitialized for the head sentinel and for
    /// free-listed slots.
    entry: MaybeUninit<T>,
    /// Identity snapshotted when the entry was indexed.
    id: i64,
    /// Score snapshotted when the entry was indexed.
    score: u64,
    /// Previous node on the base chain, or NULL for the first entry.
    back: Idx,
    /// Forward links, one per level this node participates in. The vector
    /// length is the tower height; four inline slots cover the expected
    /// height of ~1.33.
    levels: SmallVec<[Level; 4]>,
}

impl<T> Node<T> {
    fn new(height: usize, id: i64, score: u64, entry: T) -> Self {
        Node {
            entry: MaybeUninit::new(entry),
            id,
            score,
            back: NULL,
            levels: smallvec![Level { forward: NULL, span: 0 }; height],
        }
    }

    fn new_head() -> Self {
        Node {
            entry: MaybeUninit::uninit(),
            id: 0,
            score: 0,
            back: NULL,
            levels: smallvec![Level { forward: NULL, span: 0 }; MAX_HEIGHT],
        }
    }
}

/// Error returned when an entry cannot be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertError {
    /// The entry's identity was zero or negative.
    InvalidIdentity(i64),
    /// An entry with the same identity is already indexed.
    DuplicateIdentity(i64),
}

impl fmt::Display for InsertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsertError::InvalidIdentity(id) => {
                write!(f, "identity must be positive, got {id}")
            }
            InsertError::DuplicateIdentity(id) => {
                write!(f, "identity {id} is already indexed")
            }
        }
    }
}

impl std::error::Error for InsertError {}

/// A skip list ordered by score descending, ties by ascending identity,
/// with O(log n) rank queries.
pub struct RankList<T> {
    /// Arena of nodes. Slot 0 is the head sentinel.
    nodes: Vec<Node<T>>,
    /// Index of the head sentinel.
    head: Idx,
    /// Lowest-ranked node, or NULL when empty.
    tail: Idx,
    /// Number of indexed entries (not counting the head).
    len: usize,
    /// Height of the tallest live tower, 1..=MAX_HEIGHT.
    cur_level: usize,
    /// Identity index: id -> snapshotted score. The ordered structure has
    /// no identity-keyed path, so this is what turns an id into the score
    /// needed to navigate to its node.
    id_to_score: FxHashMap<i64, u64>,
    /// Free list for reusing removed node slots.
    free_list: Vec<Idx>,
    /// Xorshift state for tower height draws.
    rand_state: u64,
}

impl<T: Rankable> RankList<T> {
    /// Create an empty list with the default height-draw seed.
    pub fn new() -> RankList<T> {
        Self::with_seed(DEFAULT_SEED)
    }

    /// Create an empty list with a caller-chosen height-draw seed.
    ///
    /// Tower heights - and therefore the exact link structure - follow
    /// deterministically from the seed and the insertion sequence, which
    /// makes level distributions reproducible in tests. A zero seed falls
    /// back to the default, since xorshift sticks at zero.
    pub fn with_seed(seed: u64) -> RankList<T> {
        let mut list = RankList {
            nodes: Vec::new(),
            head: 0,
            tail: NULL,
            len: 0,
            cur_level: 1,
            id_to_score: FxHashMap::default(),
            free_list: Vec::new(),
            rand_state: if seed == 0 { DEFAULT_SEED } else { seed },
        };
        list.nodes.push(Node::new_head());
        list
    }

    /// Number of indexed entries.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    // --- Node access helpers ---

    fn node(&self, idx: Idx) -> &Node<T> {
        &self.nodes[idx as usize]
    }

    fn node_mut(&mut self, idx: Idx) -> &mut Node<T> {
        &mut self.nodes[idx as usize]
    }

    fn alloc_node(&mut self, height: usize, id: i64, score: u64, entry: T) -> Idx {
        if let Some(idx) = self.free_list.pop() {
            // The slot's entry was read out when it was unlinked, so
            // overwriting the whole node drops nothing live.
            self.nodes[idx as usize] = Node::new(height, id, score, entry);
            idx
        } else {
            let idx = self.nodes.len() as Idx;
            self.nodes.push(Node::new(height, id, score, entry));
            idx
        }
    }

    /// Draw a tower height: geometric with promotion probability 1/4,
    /// capped at MAX_HEIGHT. Two trailing zero bits per promotion gives
    /// exactly P(height > h) = 4^-h.
    fn random_height(&mut self) -> usize {
        self.rand_state ^= self.rand_state << 13;
        self.rand_state ^= self.rand_state >> 7;
        self.rand_state ^= self.rand_state << 17;
        let zeros = self.rand_state.trailing_zeros() as usize;
        (zeros / 2 + 1).min(MAX_HEIGHT)
    }

    // --- Locate ---

    /// Descend toward the position where (score, id) sorts, from the top
    /// populated level down to the base chain.
    ///
    /// Returns the exact-match node (the level-0 successor, if it carries
    /// `id`) or NULL, plus per-level predecessors and the rank distance
    /// from the head to each predecessor. Levels above `cur_level` come
    /// back as the head with distance zero, which is exactly what a
    /// top-level extension needs.
    fn locate(&self, score: u64, id: i64) -> (Idx, [Idx; MAX_HEIGHT], [u32; MAX_HEIGHT]) {
        let mut preds = [self.head; MAX_HEIGHT];
        let mut ranks = [0u32; MAX_HEIGHT];

        let mut x = self.head;
        for i in (0..self.cur_level).rev() {
            if i + 1 < self.cur_level {
                ranks[i] = ranks[i + 1];
            }
            loop {
                let Level { forward, span } = self.node(x).levels[i];
                if forward == NULL {
                    break;
                }
                let next = self.node(forward);
                let sorts_before = next.score > score || (next.score == score && next.id < id);
                if !sorts_before {
                    break;
                }
                ranks[i] += span;
                x = forward;
            }
            preds[i] = x;
        }

        let fwd = self.node(x).levels[0].forward;
        let found = if fwd != NULL && self.node(fwd).id == id {
            fwd
        } else {
            NULL
        };
        (found, preds, ranks)
    }

    // --- Mutation ---

    /// Index an entry. Returns a reference to the stored entry, or an
    /// error if the identity is non-positive or already present. The
    /// entry's identity and score are snapshotted here; reordering a
    /// live entry goes through [`update`](Self::update).
    pub fn insert(&mut self, entry: T) -> Result<&T, InsertError> {
        let id = entry.id();
        if id <= 0 {
            return Err(InsertError::InvalidIdentity(id));
        }
        if self.id_to_score.contains_key(&id) {
            return Err(InsertError::DuplicateIdentity(id));
        }

        let score = entry.score();
        let (found, preds, ranks) = self.locate(score, id);
        debug_assert_eq!(found, NULL, "identity index out of sync with ordered structure");

        let height = self.random_height();
        if height > self.cur_level {
            // preds/ranks already hold the head with distance zero for
            // these levels; seed their spans with the pre-insert count so
            // the splice math below sees every existing node as skipped.
            for i in self.cur_level..height {
                self.node_mut(self.head).levels[i].span = self.len as u32;
            }
            self.cur_level = height;
        }

        let new_idx = self.alloc_node(height, id, score, entry);

        for i in 0..height {
            let gap = ranks[0] - ranks[i];
            let pred_level = self.node(preds[i]).levels[i];
            self.node_mut(new_idx).levels[i] = Level {
                forward: pred_level.forward,
                span: pred_level.span - gap,
            };
            self.node_mut(preds[i]).levels[i] = Level {
                forward: new_idx,
                span: gap + 1,
            };
        }

        // The new node is one more rank position skipped by every taller
        // tower on the path.
        for i in height..self.cur_level {
            self.node_mut(preds[i]).levels[i].span += 1;
        }

        self.node_mut(new_idx).back = if preds[0] == self.head { NULL } else { preds[0] };
        let fwd = self.node(new_idx).levels[0].forward;
        if fwd != NULL {
            self.node_mut(fwd).back = new_idx;
        } else {
            self.tail = new_idx;
        }

        self.len += 1;
        self.id_to_score.insert(id, score);
        self.check_invariants();

        Ok(unsafe { self.node(new_idx).entry.assume_init_ref() })
    }

    /// Remove the entry with the given identity, returning it, or None if
    /// absent.
    pub fn remove(&mut self, id: i64) -> Option<T> {
        let &score = self.id_to_score.get(&id)?;
        let (found, preds, _) = self.locate(score, id);
        if found == NULL {
            // The map said present but the ordered structure disagrees.
            // Purge the stale entry so the disagreement cannot persist.
            self.id_to_score.remove(&id);
            return None;
        }

        let entry = self.unlink(found, &preds);
        self.check_invariants();
        Some(entry)
    }

    /// Splice a node out at every level and release its slot.
    fn unlink(&mut self, x: Idx, preds: &[Idx; MAX_HEIGHT]) -> T {
        for i in 0..self.cur_level {
            let x_level = self.node(x).levels.get(i).copied();
            let pred = self.node_mut(preds[i]);
            match x_level {
                Some(l) if pred.levels[i].forward == x => {
                    // Fold the removed node's coverage into its predecessor.
                    pred.levels[i].span = pred.levels[i].span + l.span - 1;
                    pred.levels[i].forward = l.forward;
                }
                _ => {
                    // This level skips over the removed node; one fewer
                    // position to cover.
                    pred.levels[i].span -= 1;
                }
            }
        }

        let fwd = self.node(x).levels[0].forward;
        let back = self.node(x).back;
        if fwd != NULL {
            self.node_mut(fwd).back = back;
        } else {
            self.tail = back;
        }

        while self.cur_level > 1 && self.node(self.head).levels[self.cur_level - 1].forward == NULL
        {
            self.cur_level -= 1;
        }

        self.len -= 1;
        let id = self.node(x).id;
        self.id_to_score.remove(&id);
        self.free_list.push(x);
        unsafe { self.node_mut(x).entry.assume_init_read() }
    }

    /// Reposition an entry under its current score: remove whatever holds
    /// its identity, then insert fresh.
    ///
    /// This is a compound, non-atomic two-step - between the steps the
    /// identity is absent from the list, and if the re-insert fails the
    /// old entry is already gone.
    pub fn update(&mut self, entry: T) -> Result<&T, InsertError> {
        self.remove(entry.id());
        self.insert(entry)
    }

    // --- Queries ---

    /// Look up an entry by identity.
    pub fn get(&self, id: i64) -> Option<&T> {
        let &score = self.id_to_score.get(&id)?;
        let (found, _, _) = self.locate(score, id);
        if found == NULL {
            return None;
        }
        Some(unsafe { self.node(found).entry.assume_init_ref() })
    }

    /// 1-based rank of the entry with the given identity; rank 1 is the
    /// highest score.
    pub fn rank_of(&self, id: i64) -> Option<usize> {
        let &score = self.id_to_score.get(&id)?;
        let (found, _, ranks) = self.locate(score, id);
        if found == NULL {
            return None;
        }
        Some(ranks[0] as usize + 1)
    }

    /// Entry at the given 1-based rank, or None if out of bounds.
    pub fn get_by_rank(&self, rank: usize) -> Option<&T> {
        let idx = self.node_at_rank(rank)?;
        Some(unsafe { self.node(idx).entry.assume_init_ref() })
    }

    /// Walk the spans down to the node whose accumulated rank distance is
    /// exactly `rank`.
    fn node_at_rank(&self, rank: usize) -> Option<Idx> {
        if rank == 0 || rank > self.len {
            return None;
        }
        let rank = rank as u32;

        let mut covered = 0u32;
        let mut x = self.head;
        for i in (0..self.cur_level).rev() {
            loop {
                let Level { forward, span } = self.node(x).levels[i];
                if forward == NULL || covered + span > rank {
                    break;
                }
                covered += span;
                x = forward;
            }
            if covered == rank {
                return Some(x);
            }
        }
        None
    }

    /// Scan entries whose score lies in `[min, max]` inclusive, highest
    /// first. Inverted bounds are swapped. Returns None when the list is
    /// empty or no entry qualifies.
    pub fn range_by_score(&self, min: u64, max: u64) -> Option<Cursor<'_, T>> {
        if self.len == 0 {
            return None;
        }
        let (min, max) = if min > max { (max, min) } else { (min, max) };

        // Identity zero sorts before every real node with the same score,
        // so this descent stops right before the first node scoring <= max
        // and its rank distance counts the nodes scoring above max.
        let (_, preds, ranks) = self.locate(max, 0);
        let first = self.node(preds[0]).levels[0].forward;
        if first == NULL || self.node(first).score < min {
            return None;
        }
        let gt_max = ranks[0];

        // Count the qualifiers the same way: nodes scoring >= min, minus
        // nodes scoring > max.
        let ge_min = if min > 0 {
            let (_, _, min_ranks) = self.locate(min - 1, 0);
            min_ranks[0]
        } else {
            self.len as u32
        };

        Some(Cursor::new(self, first, ge_min - gt_max))
    }

    /// Scan the inclusive 1-based rank window `[b, e]`, highest rank
    /// first. Inverted bounds are swapped and the start is floored to 1.
    /// Returns None when the start falls outside the list.
    pub fn range_by_rank(&self, b: usize, e: usize) -> Option<Cursor<'_, T>> {
        let (b, e) = if b > e { (e, b) } else { (b, e) };
        let b = b.max(1);
        let start = self.node_at_rank(b)?;
        // Clamp the window to the list so the count arithmetic stays in
        // range; the cursor would stop at the chain end regardless.
        let span = if e >= self.len { self.len + 1 - b } else { e + 1 - b };
        Some(Cursor::new(self, start, span as u32))
    }

    /// Scan the whole list from rank 1. Returns None when empty.
    pub fn top(&self) -> Option<Cursor<'_, T>> {
        let first = self.node(self.head).levels[0].forward;
        if first == NULL {
            return None;
        }
        Some(Cursor::new(self, first, self.len as u32))
    }

    // --- Invariant checking ---

    #[cfg(debug_assertions)]
    fn check_invariants(&self) {
        // Base chain: ordered, back-linked, sized like len.
        let mut order: Vec<Idx> = Vec::new();
        let mut prev = NULL;
        let mut idx = self.node(self.head).levels[0].forward;
        while idx != NULL {
            let node = self.node(idx);
            if prev != NULL {
                let p = self.node(prev);
                assert!(
                    p.score > node.score || (p.score == node.score && p.id < node.id),
                    "INVARIANT VIOLATED: base chain out of order at id {}",
                    node.id
                );
            }
            assert_eq!(
                node.back, prev,
                "INVARIANT VIOLATED: back link of id {} does not match the chain",
                node.id
            );
            order.push(idx);
            prev = idx;
            idx = node.levels[0].forward;
        }
        assert_eq!(
            order.len(),
            self.len,
            "INVARIANT VIOLATED: base chain holds {} nodes but len()={}",
            order.len(),
            self.len
        );
        assert_eq!(
            self.tail,
            order.last().copied().unwrap_or(NULL),
            "INVARIANT VIOLATED: tail does not point at the last node"
        );

        // Identity index: one entry per node, scores in agreement.
        assert_eq!(
            self.id_to_score.len(),
            self.len,
            "INVARIANT VIOLATED: identity index size {} != len() {}",
            self.id_to_score.len(),
            self.len
        );
        for &n in &order {
            let node = self.node(n);
            assert_eq!(
                self.id_to_score.get(&node.id),
                Some(&node.score),
                "INVARIANT VIOLATED: identity index disagrees for id {}",
                node.id
            );
        }

        // Spans: every populated level lands on true ranks, and a NULL
        // forward's span counts the nodes after its owner.
        let mut rank_of: FxHashMap<Idx, usize> = FxHashMap::default();
        for (i, &n) in order.iter().enumerate() {
            rank_of.insert(n, i + 1);
        }
        for level in 0..self.cur_level {
            let mut x = self.head;
            let mut pos = 0usize;
            loop {
                let Level { forward, span } = self.node(x).levels[level];
                if forward == NULL {
                    assert_eq!(
                        span as usize,
                        self.len - pos,
                        "INVARIANT VIOLATED: tail span drift at level {level}"
                    );
                    break;
                }
                pos += span as usize;
                assert_eq!(
                    rank_of.get(&forward),
                    Some(&pos),
                    "INVARIANT VIOLATED: span mismatch at level {level}"
                );
                x = forward;
            }
        }

        // cur_level tracks the tallest live tower.
        assert!(
            (1..=MAX_HEIGHT).contains(&self.cur_level),
            "INVARIANT VIOLATED: cur_level {} out of range",
            self.cur_level
        );
        if self.cur_level > 1 {
            assert_ne!(
                self.node(self.head).levels[self.cur_level - 1].forward,
                NULL,
                "INVARIANT VIOLATED: cur_level overshoots the tallest tower"
            );
        }
        for level in self.cur_level..MAX_HEIGHT {
            assert_eq!(
                self.node(self.head).levels[level].forward,
                NULL,
                "INVARIANT VIOLATED: populated level {level} above cur_level"
            );
        }
    }

    #[cfg(not(debug_assertions))]
    #[inline(always)]
    fn check_invariants(&self) {}
}

impl<T: Rankable> Default for RankList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for RankList<T> {
    fn drop(&mut self) {
        // Only the base chain holds live entries; the head and free-listed
        // slots were never initialized or were already read out.
        let mut idx = self.nodes[self.head as usize].levels[0].forward;
        while idx != NULL {
            let next = self.nodes[idx as usize].levels[0].forward;
            unsafe { self.nodes[idx as usize].entry.assume_init_drop() };
            idx = next;
        }
    }
}

/// A single-pass scan over a run of consecutive ranks.
///
/// Produced by [`RankList::range_by_score`], [`RankList::range_by_rank`],
/// and [`RankList::top`]. The cursor is forward-only and bounded: it walks
/// the base chain from its start node and stops after [`limit`] entries or
/// at the end of the chain, whichever comes first.
///
/// Entries are pulled in two steps - [`advance`] stages the next entry and
/// [`take`] hands it out - or in one, through the [`Iterator`] impl.
///
/// [`advance`]: Cursor::advance
/// [`take`]: Cursor::take
/// [`limit`]: Cursor::limit
pub struct Cursor<'a, T> {
    list: &'a RankList<T>,
    /// Next node to stage, or NULL once past the end.
    cur: Idx,
    /// Node staged by the last `advance`, or NULL.
    staged: Idx,
    /// Entries yielded so far.
    yielded: u32,
    /// Upper bound on entries this cursor will yield.
    limit: u32,
}

impl<'a, T: Rankable> Cursor<'a, T> {
    fn new(list: &'a RankList<T>, start: Idx, limit: u32) -> Cursor<'a, T> {
        Cursor {
            list,
            cur: start,
            staged: NULL,
            yielded: 0,
            limit,
        }
    }

    /// Step to the next entry, staging it for [`take`](Cursor::take).
    /// Returns false once the cursor is exhausted.
    pub fn advance(&mut self) -> bool {
        if self.cur == NULL || self.yielded == self.limit {
            return false;
        }
        let node = self.list.node(self.cur);
        if node.levels.is_empty() {
            return false;
        }
        self.staged = self.cur;
        self.cur = node.levels[0].forward;
        self.yielded += 1;
        true
    }

    /// Hand out the entry staged by the last [`advance`](Cursor::advance).
    ///
    /// Staging is cleared on read: a second call without an intervening
    /// `advance` returns None, as does a call before the first `advance`.
    pub fn take(&mut self) -> Option<&'a T> {
        if self.staged == NULL {
            return None;
        }
        let node = self.list.node(self.staged);
        self.staged = NULL;
        Some(unsafe { node.entry.assume_init_ref() })
    }

    /// Upper bound on the number of entries this cursor yields.
    pub fn limit(&self) -> usize {
        self.limit as usize
    }
}

impl<'a, T: Rankable> Iterator for Cursor<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.advance() { self.take() } else { None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Player {
        id: i64,
        points: u64,
    }

    impl Rankable for Player {
        fn id(&self) -> i64 {
            self.id
        }

        fn score(&self) -> u64 {
            self.points
        }
    }

    fn player(id: i64, points: u64) -> Player {
        Player { id, points }
    }

    fn fill(pairs: &[(i64, u64)]) -> RankList<Player> {
        let mut list = RankList::with_seed(0x5eed);
        for &(id, points) in pairs {
            list.insert(player(id, points)).unwrap();
        }
        list
    }

    fn ids(cursor: Option<Cursor<'_, Player>>) -> Vec<i64> {
        cursor.map(|c| c.map(|p| p.id).collect()).unwrap_or_default()
    }

    #[test]
    fn empty_list() {
        let list: RankList<Player> = RankList::new();
        assert_eq!(list.len(), 0);
        assert!(list.is_empty());
        assert_eq!(list.get(1), None);
        assert_eq!(list.rank_of(1), None);
        assert_eq!(list.get_by_rank(1), None);
        assert!(list.top().is_none());
        assert!(list.range_by_score(0, u64::MAX).is_none());
        assert!(list.range_by_rank(1, 10).is_none());
    }

    #[test]
    fn insert_one() {
        let mut list = RankList::new();
        let stored = list.insert(player(7, 120)).unwrap();
        assert_eq!(stored.id, 7);
        assert_eq!(list.len(), 1);
        assert_eq!(list.get(7), Some(&player(7, 120)));
        assert_eq!(list.rank_of(7), Some(1));
        assert_eq!(list.get_by_rank(1), Some(&player(7, 120)));
    }

    #[test]
    fn rejects_nonpositive_identity() {
        let mut list = RankList::new();
        assert_eq!(
            list.insert(player(0, 50)),
            Err(InsertError::InvalidIdentity(0))
        );
        assert_eq!(
            list.insert(player(-3, 50)),
            Err(InsertError::InvalidIdentity(-3))
        );
        assert!(list.is_empty());
    }

    #[test]
    fn rejects_duplicate_identity() {
        let mut list = RankList::new();
        list.insert(player(1, 100)).unwrap();
        assert_eq!(
            list.insert(player(1, 100)),
            Err(InsertError::DuplicateIdentity(1))
        );
        // A different score does not make the identity any less taken.
        assert_eq!(
            list.insert(player(1, 900)),
            Err(InsertError::DuplicateIdentity(1))
        );
        assert_eq!(list.len(), 1);
        assert_eq!(list.get(1), Some(&player(1, 100)));
    }

    #[test]
    fn orders_by_score_then_identity() {
        let list = fill(&[(1, 100), (2, 50), (3, 100)]);
        assert_eq!(ids(list.top()), [1, 3, 2]);
    }

    #[test]
    fn rank_round_trip() {
        let list = fill(&[(1, 100), (2, 50), (3, 100), (4, 70), (5, 30)]);
        for id in 1..=5 {
            let rank = list.rank_of(id).unwrap();
            assert_eq!(list.get_by_rank(rank), list.get(id), "id {id}");
        }
        assert_eq!(list.rank_of(2), Some(4));
    }

    #[test]
    fn get_by_rank_bounds() {
        let list = fill(&[(1, 10), (2, 20), (3, 30)]);
        assert_eq!(list.get_by_rank(0), None);
        assert_eq!(list.get_by_rank(4), None);
        assert_eq!(list.get_by_rank(1), Some(&player(3, 30)));
        assert_eq!(list.get_by_rank(3), Some(&player(1, 10)));
    }

    #[test]
    fn remove_returns_entry() {
        let mut list = fill(&[(1, 10), (2, 20)]);
        assert_eq!(list.remove(1), Some(player(1, 10)));
        assert_eq!(list.len(), 1);
        assert_eq!(list.get(1), None);
        assert_eq!(list.rank_of(1), None);
        assert_eq!(list.remove(1), None);
        assert_eq!(list.remove(99), None);
    }

    #[test]
    fn remove_relinks_chain() {
        let mut list = fill(&[(1, 10), (2, 20), (3, 30), (4, 40), (5, 50)]);
        list.remove(3).unwrap();
        assert_eq!(ids(list.top()), [5, 4, 2, 1]);
        assert_eq!(list.rank_of(2), Some(3));
        list.remove(5).unwrap();
        assert_eq!(ids(list.top()), [4, 2, 1]);
        assert_eq!(list.rank_of(4), Some(1));
        list.remove(1).unwrap();
        assert_eq!(ids(list.top()), [4, 2]);
    }

    #[test]
    fn update_moves_entry() {
        let mut list = fill(&[(1, 100), (2, 95)]);
        list.update(player(1, 90)).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(ids(list.top()), [2, 1]);
        assert_eq!(list.get(1), Some(&player(1, 90)));
        assert_eq!(list.rank_of(1), Some(2));
    }

    #[test]
    fn update_inserts_missing_entry() {
        let mut list = RankList::new();
        list.update(player(1, 10)).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list.rank_of(1), Some(1));
    }

    #[test]
    fn range_by_score_basic() {
        let list = fill(&[(1, 100), (2, 50), (3, 100)]);
        assert_eq!(ids(list.range_by_score(50, 100)), [1, 3, 2]);
        // Inverted bounds normalize.
        assert_eq!(ids(list.range_by_score(100, 50)), [1, 3, 2]);
        assert_eq!(ids(list.range_by_score(100, 100)), [1, 3]);
        assert_eq!(ids(list.range_by_score(50, 50)), [2]);
    }

    #[test]
    fn range_by_score_misses() {
        let list = fill(&[(1, 100), (2, 50), (3, 100)]);
        // Band between the occupied scores.
        assert!(list.range_by_score(60, 99).is_none());
        // Band below everything.
        assert!(list.range_by_score(0, 49).is_none());
        // Band above everything.
        assert!(list.range_by_score(101, 500).is_none());
    }

    #[test]
    fn range_by_score_from_zero() {
        let list = fill(&[(1, 100), (2, 50), (3, 30)]);
        assert_eq!(ids(list.range_by_score(0, 60)), [2, 3]);
        assert_eq!(ids(list.range_by_score(0, u64::MAX)), [1, 2, 3]);
    }

    #[test]
    fn range_by_rank_windows() {
        let list = fill(&[(1, 10), (2, 20), (3, 30), (4, 40), (5, 50)]);
        // Full order is [5, 4, 3, 2, 1].
        assert_eq!(ids(list.range_by_rank(2, 4)), [4, 3, 2]);
        assert_eq!(ids(list.range_by_rank(4, 2)), [4, 3, 2]);
        // Start floored to 1.
        assert_eq!(ids(list.range_by_rank(0, 2)), [5, 4]);
        // End past the list just runs out.
        assert_eq!(ids(list.range_by_rank(4, 99)), [2, 1]);
        // Start past the list finds nothing.
        assert!(list.range_by_rank(6, 9).is_none());
    }

    #[test]
    fn top_yields_everything() {
        let list = fill(&[(1, 10), (2, 20), (3, 20), (4, 5)]);
        assert_eq!(ids(list.top()), [2, 3, 1, 4]);
        assert_eq!(list.top().unwrap().limit(), 4);
    }

    #[test]
    fn cursor_staging_discipline() {
        let list = fill(&[(1, 10), (2, 20)]);
        let mut cursor = list.top().unwrap();

        // Nothing staged before the first advance.
        assert_eq!(cursor.take(), None);

        assert!(cursor.advance());
        assert_eq!(cursor.take(), Some(&player(2, 20)));
        // Staging cleared on read.
        assert_eq!(cursor.take(), None);

        assert!(cursor.advance());
        assert_eq!(cursor.take(), Some(&player(1, 10)));

        assert!(!cursor.advance());
        assert_eq!(cursor.take(), None);
    }

    #[test]
    fn cursor_stops_at_limit() {
        let list = fill(&[(1, 10), (2, 20), (3, 30)]);
        let mut cursor = list.range_by_rank(1, 2).unwrap();
        assert_eq!(cursor.limit(), 2);
        assert!(cursor.advance());
        assert!(cursor.advance());
        assert!(!cursor.advance());
    }

    #[test]
    fn tuple_entries() {
        let mut list: RankList<(i64, u64)> = RankList::new();
        list.insert((1, 300)).unwrap();
        list.insert((2, 200)).unwrap();
        assert_eq!(list.get_by_rank(1), Some(&(1, 300)));
        assert_eq!(
            list.insert((0, 5)),
            Err(InsertError::InvalidIdentity(0))
        );
    }

    #[test]
    fn reinsert_after_remove() {
        let mut list = fill(&[(1, 10), (2, 20), (3, 30)]);
        list.remove(2).unwrap();
        list.insert(player(2, 25)).unwrap();
        assert_eq!(ids(list.top()), [3, 2, 1]);
        list.remove(2).unwrap();
        list.insert(player(2, 5)).unwrap();
        assert_eq!(ids(list.top()), [3, 1, 2]);
    }

    #[test]
    fn churn_against_sorted_model() {
        // Deterministic mixed workload; the debug invariant checker runs
        // after every mutation, so this doubles as a structure test.
        let mut list = RankList::with_seed(0xc0ffee);
        let mut model: Vec<(i64, u64)> = Vec::new();

        let mut state = 0x2545_f491_4f6c_dd1du64;
        let mut next = || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state
        };

        for round in 0..600 {
            let id = (next() % 64) as i64 + 1;
            match round % 3 {
                0 => {
                    let points = next() % 1000;
                    if list.insert(player(id, points)).is_ok() {
                        model.push((id, points));
                    }
                }
                1 => {
                    let points = next() % 1000;
                    list.update(player(id, points)).unwrap();
                    model.retain(|&(mid, _)| mid != id);
                    model.push((id, points));
                }
                _ => {
                    let removed = list.remove(id).is_some();
                    let was_present = model.iter().any(|&(mid, _)| mid == id);
                    assert_eq!(removed, was_present, "round {round}, id {id}");
                    model.retain(|&(mid, _)| mid != id);
                }
            }
        }

        model.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        assert_eq!(list.len(), model.len());
        let got: Vec<(i64, u64)> = list
            .top()
            .map(|c| c.map(|p| (p.id, p.points)).collect())
            .unwrap_or_default();
        assert_eq!(got, model);

        for (i, &(id, _)) in model.iter().enumerate() {
            assert_eq!(list.rank_of(id), Some(i + 1));
        }
    }
}
