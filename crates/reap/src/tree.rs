//! Groups related port records so they render as a shallow tree.
//!
//! Classification runs in passes over records indexed by position, in priority
//! order:
//!  1. records sharing a PID form one group headed by the first occurrence;
//!  2. a group whose PPID is another group's PID becomes that group's child;
//!  3. remaining groups sharing a PPID that is absent from the list become
//!     siblings under the first of them;
//!  4. everything else is a root.

use std::collections::HashMap;

use crate::ports::PortInfo;

/// Display metadata for one row, parallel to the displayed records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowMeta {
    pub tree_prefix: String,
    pub is_child: bool,
}

struct Group {
    head: usize,
    extras: Vec<usize>,
}

/// Reorders `items` (already sorted) so that each root is followed by its
/// grouped rows. The output is always a permutation of the input.
pub fn build_tree(items: &[PortInfo]) -> (Vec<PortInfo>, Vec<RowMeta>) {
    let mut groups: Vec<Group> = Vec::new();
    let mut group_of: HashMap<u32, usize> = HashMap::new();
    for (idx, item) in items.iter().enumerate() {
        match group_of.get(&item.pid) {
            Some(&g) => groups[g].extras.push(idx),
            None => {
                group_of.insert(item.pid, groups.len());
                groups.push(Group {
                    head: idx,
                    extras: Vec::new(),
                });
            }
        }
    }

    let known_parent = |g: &Group| -> Option<u32> {
        let head = &items[g.head];
        (head.pid != 0 && head.ppid > 1 && head.ppid != head.pid).then_some(head.ppid)
    };

    let parent_of: Vec<Option<usize>> = groups
        .iter()
        .map(|g| known_parent(g).and_then(|ppid| group_of.get(&ppid).copied()))
        .collect();

    let mut peers: HashMap<u32, Vec<usize>> = HashMap::new();
    for (g, group) in groups.iter().enumerate() {
        if parent_of[g].is_some() {
            continue;
        }
        if let Some(ppid) = known_parent(group).filter(|ppid| !group_of.contains_key(ppid)) {
            peers.entry(ppid).or_default().push(g);
        }
    }

    let mut sibling_of: Vec<Option<usize>> = vec![None; groups.len()];
    for members in peers.values().filter(|members| members.len() >= 2) {
        for &g in &members[1..] {
            sibling_of[g] = Some(members[0]);
        }
    }

    let mut kids: Vec<Vec<usize>> = vec![Vec::new(); groups.len()];
    for g in 0..groups.len() {
        if let Some(owner) = parent_of[g].or(sibling_of[g]) {
            kids[owner].push(g);
        }
    }

    let mut builder = TreeBuilder {
        items,
        groups: &groups,
        kids: &kids,
        claimed: vec![false; groups.len()],
        rows: Vec::with_capacity(items.len()),
        meta: Vec::with_capacity(items.len()),
    };

    let mut branch_stack = Vec::new();
    for g in 0..groups.len() {
        if parent_of[g].is_none() && sibling_of[g].is_none() {
            builder.claimed[g] = true;
            builder.emit(g, &mut branch_stack);
        }
    }
    // groups only reachable through a PPID cycle
    for g in 0..groups.len() {
        if !builder.claimed[g] {
            builder.claimed[g] = true;
            builder.emit(g, &mut branch_stack);
        }
    }

    (builder.rows, builder.meta)
}

struct TreeBuilder<'a> {
    items: &'a [PortInfo],
    groups: &'a [Group],
    kids: &'a [Vec<usize>],
    claimed: Vec<bool>,
    rows: Vec<PortInfo>,
    meta: Vec<RowMeta>,
}

impl TreeBuilder<'_> {
    fn emit(&mut self, g: usize, branch_stack: &mut Vec<bool>) {
        let groups = self.groups;
        let group = &groups[g];
        self.push_row(group.head, branch_stack);

        let kids: Vec<usize> = self.kids[g]
            .iter()
            .copied()
            .filter(|kid| !self.claimed[*kid])
            .collect();
        for kid in &kids {
            self.claimed[*kid] = true;
        }

        let total = group.extras.len() + kids.len();
        for (idx, &extra) in group.extras.iter().enumerate() {
            branch_stack.push(idx + 1 == total);
            self.push_row(extra, branch_stack);
            branch_stack.pop();
        }
        for (idx, &kid) in kids.iter().enumerate() {
            branch_stack.push(group.extras.len() + idx + 1 == total);
            self.emit(kid, branch_stack);
            branch_stack.pop();
        }
    }

    fn push_row(&mut self, idx: usize, branch_stack: &[bool]) {
        self.rows.push(self.items[idx].clone());
        self.meta.push(RowMeta {
            tree_prefix: build_tree_prefix(branch_stack),
            is_child: !branch_stack.is_empty(),
        });
    }
}

fn build_tree_prefix(stack: &[bool]) -> String {
    let mut prefix = String::new();
    for (idx, is_last) in stack.iter().enumerate() {
        if idx + 1 == stack.len() {
            prefix.push_str(if *is_last { "└─ " } else { "├─ " });
        } else {
            prefix.push_str(if *is_last { "   " } else { "│  " });
        }
    }
    prefix
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(port: u16, pid: u32, ppid: u32) -> PortInfo {
        PortInfo {
            port,
            pid,
            ppid,
            process: format!("proc{pid}"),
            ..PortInfo::default()
        }
    }

    fn ports(rows: &[PortInfo]) -> Vec<u16> {
        rows.iter().map(|r| r.port).collect()
    }

    fn prefixes(meta: &[RowMeta]) -> Vec<&str> {
        meta.iter().map(|m| m.tree_prefix.as_str()).collect()
    }

    fn assert_permutation(input: &[PortInfo], output: &[PortInfo]) {
        let mut a: Vec<(u16, u32)> = input.iter().map(|r| (r.port, r.pid)).collect();
        let mut b: Vec<(u16, u32)> = output.iter().map(|r| (r.port, r.pid)).collect();
        a.sort_unstable();
        b.sort_unstable();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_input() {
        let (rows, meta) = build_tree(&[]);
        assert!(rows.is_empty());
        assert!(meta.is_empty());
    }

    #[test]
    fn single_record_is_root() {
        let (rows, meta) = build_tree(&[rec(3000, 100, 50)]);
        assert_eq!(rows.len(), 1);
        assert_eq!(meta[0], RowMeta::default());
    }

    #[test]
    fn same_pid_groups_under_first() {
        let input = vec![rec(3000, 100, 0), rec(5432, 100, 0), rec(6379, 100, 0)];
        let (rows, meta) = build_tree(&input);
        assert_eq!(ports(&rows), vec![3000, 5432, 6379]);
        assert_eq!(prefixes(&meta), vec!["", "├─ ", "└─ "]);
        assert!(!meta[0].is_child);
        assert!(meta[1].is_child && meta[2].is_child);
    }

    #[test]
    fn parent_in_list_owns_children() {
        let input = vec![rec(1, 50, 1), rec(2, 101, 50), rec(3, 102, 50)];
        let (rows, meta) = build_tree(&input);
        assert_eq!(rows.iter().map(|r| r.pid).collect::<Vec<_>>(), vec![50, 101, 102]);
        assert_eq!(prefixes(&meta), vec!["", "├─ ", "└─ "]);
    }

    #[test]
    fn child_follows_parent_even_when_sorted_first() {
        let input = vec![rec(3000, 200, 100), rec(8000, 300, 1), rec(9000, 100, 1)];
        let (rows, meta) = build_tree(&input);
        assert_eq!(rows.iter().map(|r| r.pid).collect::<Vec<_>>(), vec![300, 100, 200]);
        assert_eq!(prefixes(&meta), vec!["", "", "└─ "]);
        assert_permutation(&input, &rows);
    }

    #[test]
    fn shared_missing_parent_makes_siblings() {
        let input = vec![rec(1, 10, 500), rec(2, 20, 600), rec(3, 30, 500)];
        let (rows, meta) = build_tree(&input);
        assert_eq!(rows.iter().map(|r| r.pid).collect::<Vec<_>>(), vec![10, 30, 20]);
        assert_eq!(prefixes(&meta), vec!["", "└─ ", ""]);
        assert!(meta[1].is_child);
        assert!(!meta[2].is_child);
    }

    #[test]
    fn low_ppid_never_groups() {
        let input = vec![rec(1, 10, 1), rec(2, 20, 1), rec(3, 30, 0), rec(4, 40, 0)];
        let (rows, meta) = build_tree(&input);
        assert_eq!(ports(&rows), vec![1, 2, 3, 4]);
        assert!(meta.iter().all(|m| !m.is_child));
    }

    #[test]
    fn pid_zero_is_not_a_parent() {
        let input = vec![rec(1, 0, 0), rec(2, 0, 0), rec(3, 7, 0)];
        let (rows, meta) = build_tree(&input);
        assert_eq!(ports(&rows), vec![1, 2, 3]);
        assert_eq!(prefixes(&meta), vec!["", "└─ ", ""]);
    }

    #[test]
    fn extras_precede_children() {
        let input = vec![rec(1, 50, 1), rec(2, 60, 50), rec(3, 50, 1)];
        let (rows, meta) = build_tree(&input);
        assert_eq!(ports(&rows), vec![1, 3, 2]);
        assert_eq!(prefixes(&meta), vec!["", "├─ ", "└─ "]);
    }

    #[test]
    fn extras_of_child_are_indented() {
        let input = vec![
            rec(1, 50, 1),
            rec(2, 60, 50),
            rec(3, 60, 50),
            rec(4, 70, 50),
        ];
        let (rows, meta) = build_tree(&input);
        assert_eq!(ports(&rows), vec![1, 2, 3, 4]);
        assert_eq!(prefixes(&meta), vec!["", "├─ ", "│  └─ ", "└─ "]);
    }

    #[test]
    fn grandchildren_are_kept() {
        let input = vec![rec(1, 10, 1), rec(2, 20, 10), rec(3, 30, 20)];
        let (rows, meta) = build_tree(&input);
        assert_eq!(ports(&rows), vec![1, 2, 3]);
        assert_eq!(prefixes(&meta), vec!["", "└─ ", "   └─ "]);
    }

    #[test]
    fn parent_rule_wins_over_siblings() {
        let input = vec![rec(1, 10, 500), rec(2, 20, 500), rec(3, 30, 20)];
        let (rows, meta) = build_tree(&input);
        assert_eq!(rows.iter().map(|r| r.pid).collect::<Vec<_>>(), vec![10, 20, 30]);
        assert_eq!(prefixes(&meta), vec!["", "└─ ", "   └─ "]);
    }

    #[test]
    fn ppid_cycle_is_not_dropped() {
        let input = vec![rec(1, 10, 20), rec(2, 20, 10), rec(3, 99, 1)];
        let (rows, meta) = build_tree(&input);
        assert_permutation(&input, &rows);
        assert_eq!(rows.iter().map(|r| r.pid).collect::<Vec<_>>(), vec![99, 10, 20]);
        assert_eq!(prefixes(&meta), vec!["", "", "└─ "]);
    }

    #[test]
    fn same_pid_rows_stay_contiguous() {
        let input = vec![
            rec(1, 10, 1),
            rec(2, 20, 10),
            rec(3, 10, 1),
            rec(4, 30, 700),
            rec(5, 20, 10),
            rec(6, 40, 700),
        ];
        let (rows, meta) = build_tree(&input);
        assert_permutation(&input, &rows);
        for pid in [10, 20] {
            let positions: Vec<usize> = rows
                .iter()
                .enumerate()
                .filter(|(_, r)| r.pid == pid)
                .map(|(i, _)| i)
                .collect();
            assert_eq!(positions[1], positions[0] + 1, "pid {pid}");
            assert!(meta[positions[1]].is_child);
        }
        assert_eq!(ports(&rows), vec![1, 3, 2, 5, 4, 6]);
    }
}
