use crate::models::upstream::Target;
use sha2::{Digest, Sha256};
use std::sync::Arc;

const VIRTUAL_NODES_PER_TARGET: u32 = 150;

struct RingNode {
    hash: u32,
    target: Arc<Target>,
}

/// A consistent-hash ring with 150 virtual nodes per target, keyed by a
/// stable digest of `(target-id, vnode-index)`. Selection picks the first
/// ring node whose hash is greater than or equal to the routing key's hash,
/// wrapping to the first node if the key hashes past the end.
///
/// Immutable once built (§5): a target-set change rebuilds a fresh ring and
/// the upstream swaps it under its entity lock, rather than mutating nodes
/// in place.
pub struct ConsistentHashRing {
    nodes: Vec<RingNode>,
}

impl ConsistentHashRing {
    pub fn build(targets: &[Arc<Target>]) -> Self {
        let mut nodes: Vec<RingNode> = Vec::with_capacity(targets.len() * VIRTUAL_NODES_PER_TARGET as usize);
        for target in targets {
            for vnode in 0..VIRTUAL_NODES_PER_TARGET {
                let key = format!("{}#{}", target.id, vnode);
                nodes.push(RingNode {
                    hash: digest32(&key),
                    target: target.clone(),
                });
            }
        }
        nodes.sort_by_key(|n| n.hash);
        ConsistentHashRing { nodes }
    }

    /// First node whose hash is >= hash(routing_key); wraps around.
    pub fn select(&self, routing_key: &str) -> Option<Arc<Target>> {
        if self.nodes.is_empty() {
            return None;
        }
        let key_hash = digest32(routing_key);
        let idx = self
            .nodes
            .partition_point(|n| n.hash < key_hash);
        let idx = if idx == self.nodes.len() { 0 } else { idx };
        Some(self.nodes[idx].target.clone())
    }
}

/// A 32-bit digest prefix of a SHA-256 hash, for ring placement and key
/// lookup. Chosen over the teacher's `DefaultHasher` (not cryptographic)
/// since a stable, well-distributed digest is required across process
/// restarts and architectures.
fn digest32(input: &str) -> u32 {
    let digest = Sha256::digest(input.as_bytes());
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_selection_for_same_key() {
        let targets = vec![
            Target::new("t1", "http://a", 1),
            Target::new("t2", "http://b", 1),
            Target::new("t3", "http://c", 1),
        ];
        let ring = ConsistentHashRing::build(&targets);
        let first = ring.select("/orders/42").unwrap();
        let second = ring.select("/orders/42").unwrap();
        assert_eq!(first.id, second.id);
    }

    #[test]
    fn removing_a_target_does_not_reassign_everything() {
        let targets = vec![
            Target::new("t1", "http://a", 1),
            Target::new("t2", "http://b", 1),
            Target::new("t3", "http://c", 1),
        ];
        let full_ring = ConsistentHashRing::build(&targets);

        let keys: Vec<String> = (0..200).map(|i| format!("/key/{i}")).collect();
        let before: Vec<String> = keys.iter().map(|k| full_ring.select(k).unwrap().id.clone()).collect();

        let remaining = vec![targets[1].clone(), targets[2].clone()];
        let reduced_ring = ConsistentHashRing::build(&remaining);
        let after: Vec<String> = keys.iter().map(|k| reduced_ring.select(k).unwrap().id.clone()).collect();

        let mut reassigned_away_from_survivors = 0;
        for (b, a) in before.iter().zip(after.iter()) {
            if b != "t1" && b != a {
                reassigned_away_from_survivors += 1;
            }
        }
        assert_eq!(reassigned_away_from_survivors, 0);
    }
}
