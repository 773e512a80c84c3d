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

use std::fmt::{Display, Formatter};

use log::trace;

use crate::{
    graph::{UpdateNode, UpdateNodeRef, GRAPH_LOG},
    interpret::{BlockId, Pc},
    report::system_panic,
    runtime::{ClassIndex, ProcRef},
};

/// An instruction range `[start_pc, end_pc]` replayed when a graph node is
/// re-executed.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UpdateBlock {
    pub start_pc: Pc,
    pub end_pc: Pc,
}

/// A reactively tracked associative statement.
///
/// The node records the instruction range that evaluates the statement and
/// the dependency chains its evaluation reads. When the value behind any of
/// the chains changes, the reactive engine replays the node's instruction
/// range.
///
/// Graph nodes are populated while the statement is being lowered and become
/// immutable once [sealed](GraphNode::is_sealed).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct GraphNode {
    uid: usize,
    language_block: BlockId,
    procedure: Option<ProcRef>,
    class_scope: Option<ClassIndex>,
    update_block: UpdateBlock,
    updated: Option<UpdateNodeRef>,
    dependencies: Vec<UpdateNodeRef>,
    dimension_nodes: Vec<UpdateNode>,
    allow_dependents: bool,
    is_indexing_lhs: bool,
    is_ssa_temp: bool,
    first_proc_ref: Option<usize>,
    sealed: bool,
}

impl Display for GraphNode {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_fmt(format_args!(
            "#{} [{}..{}]",
            self.uid, self.update_block.start_pc, self.update_block.end_pc,
        ))?;

        if let Some(updated) = &self.updated {
            formatter.write_fmt(format_args!(" {updated}"))?;

            for dimension in &self.dimension_nodes {
                formatter.write_fmt(format_args!("[{dimension}]"))?;
            }
        }

        if self.dependencies.is_empty() {
            return Ok(());
        }

        formatter.write_str(" <-")?;

        let mut first = true;

        for dependency in &self.dependencies {
            match first {
                true => formatter.write_str(" ")?,
                false => formatter.write_str(", ")?,
            }

            first = false;

            Display::fmt(dependency, formatter)?;
        }

        Ok(())
    }
}

impl GraphNode {
    pub(crate) fn new(uid: usize, language_block: BlockId) -> Self {
        Self {
            uid,
            language_block,
            procedure: None,
            class_scope: None,
            update_block: UpdateBlock::default(),
            updated: None,
            dependencies: Vec::new(),
            dimension_nodes: Vec::new(),
            allow_dependents: true,
            is_indexing_lhs: false,
            is_ssa_temp: false,
            first_proc_ref: None,
            sealed: false,
        }
    }

    /// A session-wide unique identifier of the node.
    #[inline(always)]
    pub fn uid(&self) -> usize {
        self.uid
    }

    /// The code block whose instruction stream the
    /// [update block](Self::update_block) addresses.
    #[inline(always)]
    pub fn language_block(&self) -> BlockId {
        self.language_block
    }

    /// The procedure whose body contains the statement.
    #[inline(always)]
    pub fn procedure(&self) -> Option<ProcRef> {
        self.procedure
    }

    #[inline(always)]
    pub fn class_scope(&self) -> Option<ClassIndex> {
        self.class_scope
    }

    #[inline(always)]
    pub fn update_block(&self) -> UpdateBlock {
        self.update_block
    }

    /// The chain assigned by the statement.
    #[inline(always)]
    pub fn updated(&self) -> Option<&UpdateNodeRef> {
        self.updated.as_ref()
    }

    /// The chains read by the statement, in the order they were resolved.
    #[inline(always)]
    pub fn dependencies(&self) -> &[UpdateNodeRef] {
        &self.dependencies
    }

    /// Literal subscripts of the assigned chain.
    #[inline(always)]
    pub fn dimension_nodes(&self) -> &[UpdateNode] {
        &self.dimension_nodes
    }

    /// True if the statement assigns an array element (`a[i] = ...`).
    #[inline(always)]
    pub fn is_indexing_lhs(&self) -> bool {
        self.is_indexing_lhs
    }

    /// True if the statement was introduced by splitting a source statement
    /// into single-segment temporaries.
    #[inline(always)]
    pub fn is_ssa_temp(&self) -> bool {
        self.is_ssa_temp
    }

    /// The position of the dependency that refers to the first procedure
    /// called by the statement.
    #[inline(always)]
    pub fn first_proc_ref(&self) -> Option<usize> {
        self.first_proc_ref
    }

    #[inline(always)]
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Returns true if any dependency chain is rooted at a symbol named
    /// `name`.
    pub fn depends_on(&self, name: &str) -> bool {
        self.dependencies
            .iter()
            .any(|dependency| dependency.is_rooted_at(name))
    }

    /// Returns true if any dependency chain starts with the segment names of
    /// `path`.
    pub fn depends_on_path(&self, path: &[&str]) -> bool {
        self.dependencies.iter().any(|dependency| {
            dependency.nodes.len() >= path.len()
                && dependency
                    .nodes
                    .iter()
                    .zip(path.iter())
                    .all(|(node, name)| node.name == *name)
        })
    }

    #[inline(always)]
    pub(crate) fn allow_dependents(&self) -> bool {
        self.allow_dependents
    }

    /// Sets the dependents tracking flag and returns the previous value.
    #[inline(always)]
    pub(crate) fn set_allow_dependents(&mut self, allow: bool) -> bool {
        std::mem::replace(&mut self.allow_dependents, allow)
    }

    #[inline(always)]
    pub(crate) fn set_scope(&mut self, procedure: Option<ProcRef>, class_scope: Option<ClassIndex>) {
        self.procedure = procedure;
        self.class_scope = class_scope;
    }

    #[inline(always)]
    pub(crate) fn set_update_range(&mut self, start_pc: Pc, end_pc: Pc) {
        self.update_block = UpdateBlock { start_pc, end_pc };
    }

    #[inline(always)]
    pub(crate) fn set_updated(&mut self, updated: UpdateNodeRef) {
        self.updated = Some(updated);
    }

    #[inline(always)]
    pub(crate) fn set_indexing_lhs(&mut self, is_indexing_lhs: bool) {
        self.is_indexing_lhs = is_indexing_lhs;
    }

    #[inline(always)]
    pub(crate) fn set_ssa_temp(&mut self, is_ssa_temp: bool) {
        self.is_ssa_temp = is_ssa_temp;
    }

    /// Marks the most recently pushed dependency as the reference to the
    /// first called procedure.
    #[inline(always)]
    pub(crate) fn mark_first_proc_ref(&mut self) {
        self.first_proc_ref = self.dependencies.len().checked_sub(1);
    }

    /// Appends a dependency chain.
    ///
    /// The chain is ignored if dependents tracking is disabled, if the chain
    /// is empty, or if an equal chain has already been recorded. Returns
    /// true if the chain was appended.
    pub(crate) fn push_dependency(&mut self, dependency: UpdateNodeRef) -> bool {
        if self.sealed {
            system_panic!("Graph node #{} is sealed.", self.uid);
        }

        if !self.allow_dependents || dependency.is_empty() {
            return false;
        }

        if self.dependencies.contains(&dependency) {
            return false;
        }

        trace!(target: GRAPH_LOG, "#{} depends on {dependency}", self.uid);

        self.dependencies.push(dependency);

        true
    }

    /// Appends a literal subscript to the node's own dimension list.
    #[inline(always)]
    pub(crate) fn push_dimension(&mut self, node: UpdateNode) {
        self.dimension_nodes.push(node);
    }

    /// Appends a literal subscript to the last segment of the most recently
    /// pushed dependency chain.
    ///
    /// Returns false if there are no dependencies.
    pub(crate) fn push_dependency_dimension(&mut self, node: UpdateNode) -> bool {
        let Some(last) = self
            .dependencies
            .last_mut()
            .and_then(|dependency| dependency.nodes.last_mut())
        else {
            return false;
        };

        last.dimensions.push(node);

        true
    }

    pub(crate) fn seal(&mut self) {
        if self.sealed {
            system_panic!("Graph node #{} sealed twice.", self.uid);
        }

        trace!(target: GRAPH_LOG, "sealed {self}");

        self.sealed = true;
    }
}

#[cfg(test)]
mod tests {
    use crate::graph::{GraphNode, UpdateNode, UpdateNodeRef};

    fn chain(names: &[&str]) -> UpdateNodeRef {
        let mut chain = UpdateNodeRef::new();

        for name in names {
            chain.push(UpdateNode::symbol(*name, None, None));
        }

        chain
    }

    #[test]
    fn test_dependency_dedup() {
        let mut node = GraphNode::new(0, 0);

        assert!(node.push_dependency(chain(&["p", "x"])));
        assert!(!node.push_dependency(chain(&["p", "x"])));
        assert!(!node.push_dependency(UpdateNodeRef::new()));
        assert!(node.push_dependency(chain(&["q"])));

        assert_eq!(node.dependencies().len(), 2);
        assert!(node.depends_on("p"));
        assert!(node.depends_on_path(&["p", "x"]));
        assert!(!node.depends_on_path(&["p", "y"]));
        assert!(!node.depends_on("x"));
    }

    #[test]
    fn test_allow_dependents() {
        let mut node = GraphNode::new(1, 0);

        let previous = node.set_allow_dependents(false);

        assert!(previous);
        assert!(!node.push_dependency(chain(&["a"])));

        let _ = node.set_allow_dependents(previous);

        assert!(node.push_dependency(chain(&["a"])));

        node.mark_first_proc_ref();

        assert_eq!(node.first_proc_ref(), Some(0));
        assert!(node.push_dependency_dimension(UpdateNode::literal("1")));
        assert_eq!(node.dependencies()[0].to_string(), "a[#1]");
    }

    #[test]
    #[should_panic]
    fn test_double_seal() {
        let mut node = GraphNode::new(2, 0);

        node.seal();
        node.seal();
    }
}
