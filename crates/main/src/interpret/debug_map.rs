////////////////////////////////////////////////////////////////////////////////
// This file is part of "Ad Astra", an embeddable scripting programming       //
// language platform.                                                         //
//                                                                            //
// This work is proprietary software with source-available code.              //
//                                                                            //
// To copy, use, distribute, or contribute to this work, you must agree to    //
// the terms of the General License Agreement:                                //
//                                                                            //
// https://github.com/Eliah-Lakhin/ad-astra/blob/master/EULA.md               //
//                                                                            //
// The agreement grants a Basic Commercial License, allowing you to use       //
// this work in non-commercial and limited commercial products with a total   //
// gross revenue cap. To remove this commercial limit for one of your         //
// products, you must acquire a Full Commercial License.                      //
//                                                                            //
// If you contribute to the source code, documentation, or related materials, //
// you must grant me an exclusive license to these contributions.             //
// Contributions are governed by the "Contributions" section of the General   //
// License Agreement.                                                         //
//                                                                            //
// Copying the work in parts is strictly forbidden, except as permitted       //
// under the General License Agreement.                                       //
//                                                                            //
// If you do not or cannot agree to the terms of this Agreement,              //
// do not use this work.                                                      //
//                                                                            //
// This work is provided "as is", without any warranties, express or implied, //
// except where such disclaimers are legally invalid.                         //
//                                                                            //
// Copyright (c) 2024 Ilya Lakhin (Илья Александрович Лахин).                 //
// All rights reserved.                                                       //
////////////////////////////////////////////////////////////////////////////////

use std::collections::BTreeMap;

use crate::{
    graph::GraphNode,
    interpret::{BlockId, Pc},
    syntax::SourceSpan,
};

/// A mapping from program counters to the source code locations of the
/// instructions they address.
///
/// The map is keyed by `(block, pc)` pairs. Recording a location at an
/// existing key replaces the previous location.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DebugMap {
    entries: BTreeMap<(BlockId, Pc), SourceSpan>,
}

impl DebugMap {
    #[inline(always)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the location of the instruction at `pc` of `block`.
    ///
    /// Spans without a valid line and column are ignored.
    pub fn record(&mut self, block: BlockId, pc: Pc, span: SourceSpan) {
        if !span.is_valid() {
            return;
        }

        let _ = self.entries.insert((block, pc), span);
    }

    /// Returns the location recorded exactly at `(block, pc)`.
    #[inline(always)]
    pub fn get(&self, block: BlockId, pc: Pc) -> Option<SourceSpan> {
        self.entries.get(&(block, pc)).copied()
    }

    /// Returns the location of the instruction at `pc` of `block`.
    ///
    /// If the instruction itself has no recorded location, the closest
    /// recorded location before it within the same block is returned.
    pub fn location_by_pc(&self, block: BlockId, pc: Pc) -> Option<SourceSpan> {
        self.entries
            .range((block, 0)..=(block, pc))
            .next_back()
            .map(|(_, span)| *span)
    }

    /// Returns the first recorded location within the instruction range of
    /// the graph node.
    pub fn location_by_graph_node(&self, node: &GraphNode) -> Option<SourceSpan> {
        let range = node.update_block();

        if range.start_pc > range.end_pc {
            return None;
        }

        let block = node.language_block();

        self.entries
            .range((block, range.start_pc)..=(block, range.end_pc))
            .next()
            .map(|(_, span)| *span)
    }

    /// Returns the source location of the currently executing instruction.
    ///
    /// In delta execution mode, the location of the executing graph node is
    /// preferred; the lookup falls back to the program counter otherwise.
    pub fn audit_code_location(
        &self,
        block: BlockId,
        pc: Pc,
        executing: Option<&GraphNode>,
        delta_execution: bool,
    ) -> Option<SourceSpan> {
        if delta_execution {
            if let Some(span) = executing.and_then(|node| self.location_by_graph_node(node)) {
                return Some(span);
            }
        }

        self.location_by_pc(block, pc)
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the recorded entries in `(block, pc)` order.
    #[inline(always)]
    pub fn iter(&self) -> impl Iterator<Item = (BlockId, Pc, SourceSpan)> + '_ {
        self.entries
            .iter()
            .map(|((block, pc), span)| (*block, *pc, *span))
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        graph::GraphNode,
        interpret::DebugMap,
        syntax::SourceSpan,
    };

    #[test]
    fn test_pc_lookup() {
        let mut map = DebugMap::new();

        map.record(0, 2, SourceSpan::point(1, 1));
        map.record(0, 5, SourceSpan::point(2, 1));
        map.record(1, 0, SourceSpan::point(7, 3));
        map.record(0, 9, SourceSpan::nil());

        assert_eq!(map.len(), 3);
        assert_eq!(map.location_by_pc(0, 2), Some(SourceSpan::point(1, 1)));
        assert_eq!(map.location_by_pc(0, 4), Some(SourceSpan::point(1, 1)));
        assert_eq!(map.location_by_pc(0, 100), Some(SourceSpan::point(2, 1)));
        assert_eq!(map.location_by_pc(0, 1), None);
        assert_eq!(map.location_by_pc(1, 0), Some(SourceSpan::point(7, 3)));

        map.record(0, 5, SourceSpan::point(3, 4));

        assert_eq!(map.get(0, 5), Some(SourceSpan::point(3, 4)));
    }

    #[test]
    fn test_graph_node_lookup() {
        let mut map = DebugMap::new();

        map.record(0, 3, SourceSpan::point(4, 1));
        map.record(0, 6, SourceSpan::point(5, 1));

        let mut node = GraphNode::new(0, 0);

        node.set_update_range(4, 7);

        assert_eq!(map.location_by_graph_node(&node), Some(SourceSpan::point(5, 1)));
        assert_eq!(
            map.audit_code_location(0, 4, Some(&node), true),
            Some(SourceSpan::point(5, 1)),
        );
        assert_eq!(
            map.audit_code_location(0, 4, Some(&node), false),
            Some(SourceSpan::point(4, 1)),
        );

        node.set_update_range(0, 2);

        assert_eq!(map.location_by_graph_node(&node), None);
        assert_eq!(
            map.audit_code_location(0, 4, Some(&node), true),
            Some(SourceSpan::point(4, 1)),
        );
    }
}
