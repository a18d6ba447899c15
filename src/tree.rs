//! Point operations over the tree: insert, erase, and both search
//! protocols, plus the minimum/maximum helpers they rely on.

use crate::node::{Child, Inner, NodeKind, Slot, EMPTY, MAX_PREFIX, NODE4_CAP, NODE48_CAP};
use crate::KeyLoader;

/// Population thresholds below which a variant demotes.
const NODE16_SHRINK: usize = NODE4_CAP - 1;
const NODE48_SHRINK: usize = 12;
const NODE256_SHRINK: usize = NODE48_CAP * 3 / 4;

/// Key access for one operation: the caller's loader plus the fixed key
/// width. All key reconstruction for leaf checks goes through here.
pub(crate) struct Keys<'a, L: KeyLoader> {
    pub(crate) loader: &'a L,
    pub(crate) key_len: usize,
}

impl<L: KeyLoader> Keys<'_, L> {
    pub(crate) fn load(&self, tid: u64) -> Vec<u8> {
        let mut buf = vec![0u8; self.key_len];
        self.loader.load_key(tid, &mut buf);
        buf
    }

    /// Does the leaf's key agree with the searched key from `depth` on?
    fn leaf_matches(&self, tid: u64, key: &[u8], depth: usize) -> bool {
        if depth == self.key_len {
            return true;
        }
        let stored = self.load(tid);
        stored[depth..] == key[depth..]
    }
}

fn expect_inner(slot: &Slot) -> &Inner {
    match slot {
        Some(Child::Inner(node)) => node,
        _ => unreachable!("slot must hold an inner node"),
    }
}

fn expect_inner_mut(slot: &mut Slot) -> &mut Inner {
    match slot {
        Some(Child::Inner(node)) => node,
        _ => unreachable!("slot must hold an inner node"),
    }
}

/// Tuple identifier of the smallest leaf below an inner node.
pub(crate) fn minimum_inner(node: &Inner) -> u64 {
    let first = match node {
        Inner::Node4 { children, .. } => children[0].as_ref(),
        Inner::Node16 { children, .. } => children[0].as_ref(),
        Inner::Node48 { child_index, children, .. } => {
            let mut byte = 0usize;
            while child_index[byte] == EMPTY {
                byte += 1;
            }
            children[child_index[byte] as usize].as_ref()
        }
        Inner::Node256 { children, .. } => children.iter().flatten().next(),
        Inner::Linear { children, .. } => children.iter().flatten().next(),
    };
    match first {
        Some(Child::Leaf(tid)) => *tid,
        Some(Child::Inner(child)) => minimum_inner(child),
        None => unreachable!("inner node without children"),
    }
}

/// Tuple identifier of the largest leaf below an inner node.
pub(crate) fn maximum_inner(node: &Inner) -> u64 {
    let last = match node {
        Inner::Node4 { header, children, .. } => children[header.count as usize - 1].as_ref(),
        Inner::Node16 { header, children, .. } => children[header.count as usize - 1].as_ref(),
        Inner::Node48 { child_index, children, .. } => {
            let mut byte = 255usize;
            while child_index[byte] == EMPTY {
                byte -= 1;
            }
            children[child_index[byte] as usize].as_ref()
        }
        Inner::Node256 { children, .. } => children.iter().rev().flatten().next(),
        Inner::Linear { children, .. } => children.iter().rev().flatten().next(),
    };
    match last {
        Some(Child::Leaf(tid)) => *tid,
        Some(Child::Inner(child)) => maximum_inner(child),
        None => unreachable!("inner node without children"),
    }
}

/// First index where the searched key diverges from the node's compressed
/// path, or the full prefix length on agreement. Bytes beyond the stored cap
/// are reconstructed from the smallest leaf below the node.
pub(crate) fn prefix_mismatch<L: KeyLoader>(
    ks: &Keys<L>,
    node: &Inner,
    key: &[u8],
    depth: usize,
) -> usize {
    let header = node.header();
    let prefix_len = header.prefix_len as usize;
    let stored = prefix_len.min(MAX_PREFIX);
    let mut pos = 0;
    while pos < stored {
        if key[depth + pos] != header.prefix[pos] {
            return pos;
        }
        pos += 1;
    }
    if prefix_len > MAX_PREFIX {
        let min_key = ks.load(minimum_inner(node));
        while pos < prefix_len {
            if key[depth + pos] != min_key[depth + pos] {
                return pos;
            }
            pos += 1;
        }
    }
    pos
}

/// Optimistic search: prefixes longer than the stored cap are skipped, and
/// the deferred comparison happens once against the leaf's full key.
pub(crate) fn lookup<L: KeyLoader>(ks: &Keys<L>, root: &Slot, key: &[u8]) -> Option<u64> {
    let mut skipped_prefix = false;
    let mut depth = 0usize;
    let mut slot = root;
    loop {
        let node = match slot.as_ref()? {
            Child::Leaf(tid) => {
                if !skipped_prefix && depth == ks.key_len {
                    return Some(*tid);
                }
                let start = if skipped_prefix { 0 } else { depth };
                let stored = ks.load(*tid);
                return if stored[start..] == key[start..] { Some(*tid) } else { None };
            }
            Child::Inner(node) => node,
        };
        let header = node.header();
        let prefix_len = header.prefix_len as usize;
        if prefix_len > 0 {
            if prefix_len <= MAX_PREFIX {
                for pos in 0..prefix_len {
                    if key[depth + pos] != header.prefix[pos] {
                        return None;
                    }
                }
            } else {
                skipped_prefix = true;
            }
            depth += prefix_len;
        }
        slot = node.find_child(key[depth])?;
        depth += 1;
    }
}

/// Pessimistic search: every compressed path is verified in full on the way
/// down, so the leaf check only covers the remaining suffix.
pub(crate) fn lookup_pessimistic<L: KeyLoader>(
    ks: &Keys<L>,
    root: &Slot,
    key: &[u8],
) -> Option<u64> {
    let mut depth = 0usize;
    let mut slot = root;
    loop {
        let node = match slot.as_ref()? {
            Child::Leaf(tid) => {
                return if ks.leaf_matches(*tid, key, depth) { Some(*tid) } else { None };
            }
            Child::Inner(node) => node,
        };
        let prefix_len = node.header().prefix_len as usize;
        if prefix_mismatch(ks, node, key, depth) != prefix_len {
            return None;
        }
        depth += prefix_len;
        slot = node.find_child(key[depth])?;
        depth += 1;
    }
}

pub(crate) fn insert<L: KeyLoader>(
    ks: &Keys<L>,
    slot: &mut Slot,
    key: &[u8],
    mut depth: usize,
    tid: u64,
) -> Option<u64> {
    match slot {
        None => {
            *slot = Some(Child::Leaf(tid));
            return None;
        }
        Some(Child::Leaf(existing)) => {
            let existing_tid = *existing;
            let existing_key = ks.load(existing_tid);
            if existing_key == key {
                *existing = tid;
                return Some(existing_tid);
            }
            // Two distinct keys now share this position: branch them under a
            // Node4 carrying their common suffix bytes as its prefix.
            let mut lcp = 0;
            while existing_key[depth + lcp] == key[depth + lcp] {
                lcp += 1;
            }
            let mut branch = Inner::new_node4();
            branch.header_mut().set_prefix(&key[depth..], lcp);
            branch.add_child(existing_key[depth + lcp], Child::Leaf(existing_tid));
            branch.add_child(key[depth + lcp], Child::Leaf(tid));
            *slot = Some(Child::Inner(Box::new(branch)));
            return None;
        }
        Some(Child::Inner(_)) => {}
    }

    let (prefix_len, mismatch) = {
        let node = expect_inner(slot);
        let prefix_len = node.header().prefix_len as usize;
        let mismatch = if prefix_len > 0 { prefix_mismatch(ks, node, key, depth) } else { 0 };
        (prefix_len, mismatch)
    };
    if mismatch < prefix_len {
        split_prefix(ks, slot, key, depth, mismatch, tid);
        return None;
    }
    depth += prefix_len;

    let node = expect_inner_mut(slot);
    let byte = key[depth];
    if let Some(child_slot) = node.find_child_mut(byte) {
        if child_slot.is_some() {
            return insert(ks, child_slot, key, depth + 1, tid);
        }
    }
    if node.needs_grow(byte) {
        node.grow();
    }
    node.add_child(byte, Child::Leaf(tid));
    None
}

/// The node's compressed path diverges from the new key at `mismatch`: hoist
/// the agreeing bytes into a fresh Node4 holding the old node and the new
/// leaf as siblings.
fn split_prefix<L: KeyLoader>(
    ks: &Keys<L>,
    slot: &mut Slot,
    key: &[u8],
    depth: usize,
    mismatch: usize,
    tid: u64,
) {
    let Some(Child::Inner(mut node)) = slot.take() else {
        unreachable!("split target must be an inner node")
    };
    let mut branch = Inner::new_node4();
    branch.header_mut().set_prefix(&node.header().prefix, mismatch);

    let old_prefix_len = node.header().prefix_len as usize;
    let remaining = old_prefix_len - mismatch - 1;
    if old_prefix_len <= MAX_PREFIX {
        let branch_byte = node.header().prefix[mismatch];
        let header = node.header_mut();
        header.prefix.copy_within(mismatch + 1.., 0);
        header.prefix_len = remaining as u32;
        branch.add_child(branch_byte, Child::Inner(node));
    } else {
        // The byte and tail live past the stored cap; recover them from a
        // descendant leaf.
        let min_key = ks.load(minimum_inner(&node));
        let branch_byte = min_key[depth + mismatch];
        node.header_mut().set_prefix(&min_key[depth + mismatch + 1..], remaining);
        branch.add_child(branch_byte, Child::Inner(node));
    }
    branch.add_child(key[depth + mismatch], Child::Leaf(tid));
    *slot = Some(Child::Inner(Box::new(branch)));
}

pub(crate) fn erase<L: KeyLoader>(
    ks: &Keys<L>,
    slot: &mut Slot,
    key: &[u8],
    mut depth: usize,
) -> Option<u64> {
    match slot {
        None => return None,
        Some(Child::Leaf(tid)) => {
            // A bare leaf only ever sits in the root slot.
            let tid = *tid;
            if ks.leaf_matches(tid, key, depth) {
                *slot = None;
                return Some(tid);
            }
            return None;
        }
        Some(Child::Inner(_)) => {}
    }

    let byte = {
        let node = expect_inner(slot);
        let prefix_len = node.header().prefix_len as usize;
        if prefix_len > 0 {
            if prefix_mismatch(ks, node, key, depth) != prefix_len {
                return None;
            }
            depth += prefix_len;
        }
        key[depth]
    };

    let removed;
    let child_gone;
    {
        let node = expect_inner_mut(slot);
        let Some(child_slot) = node.find_child_mut(byte) else {
            return None;
        };
        match child_slot {
            None => return None,
            Some(Child::Leaf(tid)) => {
                let tid = *tid;
                if !ks.leaf_matches(tid, key, depth) {
                    return None;
                }
                *child_slot = None;
                removed = Some(tid);
                child_gone = true;
            }
            Some(Child::Inner(_)) => {
                removed = erase(ks, child_slot, key, depth + 1);
                // A linear node that erased its last descendant has already
                // dropped itself from the slot.
                child_gone = removed.is_some() && child_slot.is_none();
            }
        }
    }

    if child_gone {
        expect_inner_mut(slot).remove_child(byte);
        rebalance(slot);
    }
    removed
}

/// Demote or collapse the node in `slot` if the removal just dropped it
/// below its variant's threshold.
fn rebalance(slot: &mut Slot) {
    enum Fix {
        Nothing,
        Collapse,
        Shrink,
        Drop,
    }
    let fix = {
        let node = expect_inner(slot);
        match node.kind() {
            NodeKind::Node4 if node.count() == 1 => Fix::Collapse,
            NodeKind::Node16 if node.count() == NODE16_SHRINK => Fix::Shrink,
            NodeKind::Node48 if node.count() == NODE48_SHRINK => Fix::Shrink,
            NodeKind::Node256 if node.count() == NODE256_SHRINK => Fix::Shrink,
            NodeKind::Linear if node.count() == 0 => Fix::Drop,
            _ => Fix::Nothing,
        }
    };
    match fix {
        Fix::Nothing => {}
        Fix::Shrink => expect_inner_mut(slot).shrink(),
        Fix::Drop => *slot = None,
        Fix::Collapse => collapse(slot),
    }
}

/// Replace a one-way Node4 with its surviving child, splicing the node's
/// prefix and branch byte ahead of the child's own prefix. Leaves carry no
/// prefix, so a leaf survivor moves up unchanged.
fn collapse(slot: &mut Slot) {
    let Some(Child::Inner(node)) = slot.take() else {
        unreachable!("collapse target must be an inner node")
    };
    let Inner::Node4 { header, keys, mut children } = *node else {
        unreachable!("only Node4 collapses")
    };
    let Some(survivor) = children[0].take() else {
        unreachable!("collapsing an empty Node4")
    };
    let survivor = match survivor {
        Child::Leaf(tid) => Child::Leaf(tid),
        Child::Inner(mut child) => {
            let mut merged = [0u8; MAX_PREFIX];
            let stored = (header.prefix_len as usize).min(MAX_PREFIX);
            merged[..stored].copy_from_slice(&header.prefix[..stored]);
            let mut len = header.prefix_len as usize;
            if len < MAX_PREFIX {
                merged[len] = keys[0];
            }
            len += 1;
            if len < MAX_PREFIX {
                let child_header = child.header();
                let take = (child_header.prefix_len as usize).min(MAX_PREFIX - len);
                merged[len..len + take].copy_from_slice(&child_header.prefix[..take]);
            }
            let new_len = header.prefix_len + 1 + child.header().prefix_len;
            let child_header = child.header_mut();
            let stored_total = (new_len as usize).min(MAX_PREFIX);
            child_header.prefix[..stored_total].copy_from_slice(&merged[..stored_total]);
            child_header.prefix_len = new_len;
            Child::Inner(child)
        }
    };
    *slot = Some(survivor);
}
