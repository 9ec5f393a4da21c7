//! Dominator tree and dominance frontiers.
//!
//! Immediate dominators are computed with the iterative algorithm of
//! Cooper, Harvey and Kennedy over reverse postorder; frontiers with the
//! two-finger idom walk from the same paper.

use std::collections::HashMap;

use super::cfg::Cfg;
use crate::ir::BlockId;

pub struct DomTree {
    entry: BlockId,
    blocks: Vec<BlockId>,
    index_map: HashMap<BlockId, usize>,
    reachable: Vec<bool>,
    idom: Vec<Option<BlockId>>,
    level: Vec<u32>,
    children: Vec<Vec<BlockId>>,
    frontier: Vec<Vec<BlockId>>,
}

impl DomTree {
    pub fn new(cfg: &Cfg) -> Self {
        let blocks: Vec<BlockId> = cfg.blocks().to_vec();
        let mut index_map = HashMap::with_capacity(blocks.len());
        for (idx, block) in blocks.iter().enumerate() {
            index_map.insert(*block, idx);
        }

        let rpo = cfg.rpo();
        let mut rpo_pos = HashMap::with_capacity(rpo.len());
        for (pos, block) in rpo.iter().enumerate() {
            rpo_pos.insert(*block, pos);
        }

        let mut reachable = vec![false; blocks.len()];
        for block in &rpo {
            reachable[index_map[block]] = true;
        }

        // Iterate to a fixed point; idom[entry] = entry while solving.
        let mut idom: HashMap<BlockId, BlockId> = HashMap::new();
        idom.insert(cfg.entry(), cfg.entry());
        let mut changed = true;
        while changed {
            changed = false;
            for block in rpo.iter().skip(1) {
                let mut new_idom: Option<BlockId> = None;
                for pred in cfg.preds(*block) {
                    if !idom.contains_key(pred) {
                        continue;
                    }
                    new_idom = Some(match new_idom {
                        None => *pred,
                        Some(current) => intersect(&idom, &rpo_pos, *pred, current),
                    });
                }
                let new_idom =
                    new_idom.unwrap_or_else(|| panic!("block {:?} has no processed pred", block));
                if idom.get(block) != Some(&new_idom) {
                    idom.insert(*block, new_idom);
                    changed = true;
                }
            }
        }

        let mut idom_vec = vec![None; blocks.len()];
        let mut children = vec![Vec::new(); blocks.len()];
        for block in &rpo {
            if *block == cfg.entry() {
                continue;
            }
            let parent = idom[block];
            idom_vec[index_map[block]] = Some(parent);
            children[index_map[&parent]].push(*block);
        }

        let mut level = vec![0u32; blocks.len()];
        for block in &rpo {
            if let Some(parent) = idom_vec[index_map[block]] {
                level[index_map[block]] = level[index_map[&parent]] + 1;
            }
        }

        // Dominance frontiers: for each join point, walk each pred's idom
        // chain up to the join's idom.
        let mut frontier = vec![Vec::new(); blocks.len()];
        for block in &rpo {
            let preds: Vec<BlockId> = cfg
                .preds(*block)
                .iter()
                .copied()
                .filter(|p| reachable[index_map[p]])
                .collect();
            if preds.len() < 2 {
                continue;
            }
            let stop = idom_vec[index_map[block]];
            for pred in preds {
                let mut runner = pred;
                while Some(runner) != stop {
                    let list = &mut frontier[index_map[&runner]];
                    if !list.contains(block) {
                        list.push(*block);
                    }
                    match idom_vec[index_map[&runner]] {
                        Some(next) => runner = next,
                        None => break,
                    }
                }
            }
        }

        Self {
            entry: cfg.entry(),
            blocks,
            index_map,
            reachable,
            idom: idom_vec,
            level,
            children,
            frontier,
        }
    }

    pub fn entry(&self) -> BlockId {
        self.entry
    }

    /// Immediate dominator; `None` for the entry and unreachable blocks.
    pub fn idom(&self, block: BlockId) -> Option<BlockId> {
        self.idom[self.index(block)]
    }

    pub fn is_reachable(&self, block: BlockId) -> bool {
        self.reachable[self.index(block)]
    }

    /// Dominator-tree children of a block.
    pub fn children(&self, block: BlockId) -> &[BlockId] {
        &self.children[self.index(block)]
    }

    /// Blocks in dominator-tree preorder, entry first.
    pub fn preorder(&self) -> Vec<BlockId> {
        let mut order = Vec::with_capacity(self.blocks.len());
        let mut stack = vec![self.entry];
        while let Some(block) = stack.pop() {
            order.push(block);
            for child in self.children(block).iter().rev() {
                stack.push(*child);
            }
        }
        order
    }

    /// Whether `a` dominates `b`. Reflexive. Every block vacuously
    /// dominates an unreachable block.
    pub fn dominates(&self, a: BlockId, b: BlockId) -> bool {
        if a == b {
            return true;
        }
        if !self.is_reachable(b) {
            return true;
        }
        if !self.is_reachable(a) {
            return false;
        }

        let target_level = self.level[self.index(a)];
        let mut runner = b;
        while self.level[self.index(runner)] > target_level {
            match self.idom(runner) {
                Some(next) => runner = next,
                None => return false,
            }
        }
        runner == a
    }

    /// Dominance frontier of a single block.
    pub fn frontier(&self, block: BlockId) -> &[BlockId] {
        &self.frontier[self.index(block)]
    }

    /// Iterated dominance frontier of a block set: the phi placement sites
    /// for definitions made in those blocks.
    pub fn iterated_frontier(&self, blocks: &[BlockId]) -> Vec<BlockId> {
        let mut result = Vec::new();
        let mut worklist: Vec<BlockId> = blocks.to_vec();
        while let Some(block) = worklist.pop() {
            if !self.is_reachable(block) {
                continue;
            }
            for frontier_block in self.frontier(block) {
                if !result.contains(frontier_block) {
                    result.push(*frontier_block);
                    worklist.push(*frontier_block);
                }
            }
        }
        result
    }

    fn index(&self, block: BlockId) -> usize {
        *self
            .index_map
            .get(&block)
            .unwrap_or_else(|| panic!("dom tree missing block {:?}", block))
    }
}

fn intersect(
    idom: &HashMap<BlockId, BlockId>,
    rpo_pos: &HashMap<BlockId, usize>,
    mut a: BlockId,
    mut b: BlockId,
) -> BlockId {
    while a != b {
        while rpo_pos[&a] > rpo_pos[&b] {
            a = idom[&a];
        }
        while rpo_pos[&b] > rpo_pos[&a] {
            b = idom[&b];
        }
    }
    a
}

#[cfg(test)]
#[path = "../tests/analysis/t_domtree.rs"]
mod tests;
