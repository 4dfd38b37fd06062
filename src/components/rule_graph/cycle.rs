//! Cycle detection for the connection set.
//!
//! Recomputed on every attempt; the connection set changes between calls.

use std::collections::{HashMap, HashSet};

use super::types::{Connection, RuleId};

fn adjacency(connections: &[Connection]) -> HashMap<RuleId, Vec<RuleId>> {
	let mut adj: HashMap<RuleId, Vec<RuleId>> = HashMap::new();
	for conn in connections {
		adj.entry(conn.from).or_default().push(conn.to);
	}
	adj
}

/// Returns true if adding `from -> to` to `connections` would close a directed cycle,
/// i.e. `from` is reachable from `to`.
///
/// Iterative DFS with an explicit visited set, O(V + E).
pub fn would_create_cycle(connections: &[Connection], from: RuleId, to: RuleId) -> bool {
	let mut adj = adjacency(connections);
	adj.entry(from).or_default().push(to);

	let mut stack = vec![to];
	let mut visited = HashSet::new();
	while let Some(node) = stack.pop() {
		if node == from {
			return true;
		}
		if !visited.insert(node) {
			continue;
		}
		if let Some(next) = adj.get(&node) {
			stack.extend(next.iter().copied().filter(|n| !visited.contains(n)));
		}
	}
	false
}

/// Returns true if `connections` contains no directed cycle (Kahn's algorithm).
#[cfg(test)]
pub(crate) fn is_acyclic(connections: &[Connection]) -> bool {
	let adj = adjacency(connections);
	let mut in_degree: HashMap<RuleId, usize> = HashMap::new();
	for conn in connections {
		in_degree.entry(conn.from).or_insert(0);
		*in_degree.entry(conn.to).or_insert(0) += 1;
	}

	let mut ready: Vec<RuleId> = in_degree
		.iter()
		.filter(|&(_, &d)| d == 0)
		.map(|(&id, _)| id)
		.collect();
	let mut seen = 0;
	while let Some(node) = ready.pop() {
		seen += 1;
		for next in adj.get(&node).into_iter().flatten() {
			if let Some(d) = in_degree.get_mut(next) {
				*d -= 1;
				if *d == 0 {
					ready.push(*next);
				}
			}
		}
	}
	seen == in_degree.len()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn edges(pairs: &[(RuleId, RuleId)]) -> Vec<Connection> {
		pairs.iter().map(|&(f, t)| Connection::new(f, t)).collect()
	}

	#[test]
	fn reverse_edge_is_a_cycle() {
		assert!(would_create_cycle(&edges(&[(1, 2)]), 2, 1));
	}

	#[test]
	fn self_loop_is_a_cycle() {
		assert!(would_create_cycle(&[], 4, 4));
	}

	#[test]
	fn transitive_path_closes_cycle() {
		let conns = edges(&[(1, 2), (2, 3), (3, 4)]);
		assert!(would_create_cycle(&conns, 4, 1));
		assert!(!would_create_cycle(&conns, 1, 4));
	}

	#[test]
	fn diamond_is_not_a_cycle() {
		let conns = edges(&[(1, 2), (1, 3), (2, 4)]);
		assert!(!would_create_cycle(&conns, 3, 4));
	}

	#[test]
	fn deep_chain_does_not_overflow() {
		let conns: Vec<_> = (0..100_000).map(|i| Connection::new(i, i + 1)).collect();
		assert!(would_create_cycle(&conns, 100_000, 0));
		assert!(!would_create_cycle(&conns, 0, 100_000));
	}

	#[test]
	fn acyclic_check_matches_structure() {
		assert!(is_acyclic(&edges(&[(1, 2), (2, 3), (1, 3)])));
		assert!(!is_acyclic(&edges(&[(1, 2), (2, 3), (3, 1)])));
		assert!(is_acyclic(&[]));
	}
}
