//! Bulk loading.
//!
//! Instead of repeating the adaptive insert for every element, the loader
//! works top-down: it fits a small linear model per node that maps the next
//! key byte to one of ten buckets, keys each occupied bucket to the byte it
//! received, scatters the dataset, and recurses per bucket one byte deeper.
//! Dispatch through the built node both predicts the bucket and compares
//! the stored byte, so the learned node consumes exactly one key byte past
//! its prefix, like every other inner variant. A fit that cannot give each
//! occurring byte value its own bucket falls back to the adaptive insert
//! path for the whole partition, as do small datasets.

use crate::node::{Child, Inner, LinearModel, Slot, LINEAR_CAP, MAX_PREFIX};
use crate::tree::{insert, Keys};
use crate::KeyLoader;

/// Datasets at or below this size are point-inserted rather than scattered.
const SCATTER_MIN: usize = 8;

pub(crate) fn bulk_load<L: KeyLoader>(ks: &Keys<L>, slot: &mut Slot, tids: &[u64], depth: usize) {
    if tids.len() <= SCATTER_MIN {
        for &tid in tids {
            let key = ks.load(tid);
            insert(ks, slot, &key, depth, tid);
        }
        return;
    }

    let keys: Vec<Vec<u8>> = tids.iter().map(|&tid| ks.load(tid)).collect();

    // Longest run of bytes from `depth` shared by the whole dataset, capped
    // at the stored prefix width. At least one byte must stay for dispatch.
    let mut prefix_len = 0;
    'scan: while prefix_len < MAX_PREFIX && depth + prefix_len < ks.key_len - 1 {
        let expect = keys[0][depth + prefix_len];
        for key in &keys[1..] {
            if key[depth + prefix_len] != expect {
                break 'scan;
            }
        }
        prefix_len += 1;
    }
    let branch_depth = depth + prefix_len;

    let mut counts = [0usize; 256];
    for key in &keys {
        counts[key[branch_depth] as usize] += 1;
    }
    let model = fit(&counts, tids.len());

    // Every bucket discriminates a single byte value. If the fit maps two
    // occurring bytes to the same bucket, the scatter cannot key its
    // buckets; build the partition with point inserts instead.
    let mut bucket_byte: [Option<u8>; LINEAR_CAP] = [None; LINEAR_CAP];
    for byte in 0..=255u8 {
        if counts[byte as usize] == 0 {
            continue;
        }
        let bucket = model.predict(byte);
        if bucket_byte[bucket].is_some() {
            for (key, &tid) in keys.iter().zip(tids) {
                insert(ks, slot, key, depth, tid);
            }
            return;
        }
        bucket_byte[bucket] = Some(byte);
    }

    let mut buckets: [Vec<u64>; LINEAR_CAP] = Default::default();
    for (key, &tid) in keys.iter().zip(tids) {
        buckets[model.predict(key[branch_depth])].push(tid);
    }

    let mut node = Inner::new_linear(model);
    node.header_mut().set_prefix(&keys[0][depth..], prefix_len);
    *slot = Some(Child::Inner(Box::new(node)));

    let Some(Child::Inner(node)) = slot else { unreachable!() };
    let Inner::Linear { header, keys: bucket_keys, children, .. } = &mut **node else {
        unreachable!()
    };
    for (bucket, members) in buckets.iter().enumerate() {
        if members.is_empty() {
            continue;
        }
        let Some(byte) = bucket_byte[bucket] else {
            unreachable!("occupied bucket without a key byte")
        };
        bucket_keys[bucket] = byte;
        bulk_load(ks, &mut children[bucket], members, branch_depth + 1);
        if children[bucket].is_some() {
            header.count += 1;
        }
    }
}

/// Least-squares fit of key byte against its quantile bucket: each byte's
/// occurrences are dealt into consecutive buckets of `n / LINEAR_CAP`
/// elements, and the resulting (byte, bucket) points are regressed.
fn fit(counts: &[usize; 256], n: usize) -> LinearModel {
    let bucket_size = (n / LINEAR_CAP).max(1);
    let (mut s_x, mut s_y, mut s_xy, mut s_x2) = (0f64, 0f64, 0f64, 0f64);
    let mut y = 0usize;
    let mut room = bucket_size;
    for (byte, &count) in counts.iter().enumerate() {
        let x = byte as f64;
        s_x += count as f64 * x;
        s_x2 += count as f64 * x * x;
        let mut left = count;
        while left > 0 {
            let take = left.min(room);
            s_y += (take * y) as f64;
            s_xy += take as f64 * x * y as f64;
            left -= take;
            room -= take;
            if room == 0 {
                y += 1;
                room = bucket_size;
            }
        }
    }
    let n = n as f64;
    let denom = n * s_x2 - s_x * s_x;
    if denom.abs() < 1e-9 {
        // Every key agrees on the dispatch byte; the scatter keys a single
        // bucket and the recursion continues one byte deeper.
        return LinearModel::new(0.0, 0.0);
    }
    LinearModel::new((n * s_xy - s_x * s_y) / denom, (s_y * s_x2 - s_x * s_xy) / denom)
}
