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

use crate::syntax::{AstNode, IdentifierListNode};

/// An accumulator of the chain segments ("pointers") of one source
/// statement that has been split into single-segment temporaries.
///
/// While the statement's temporaries are being lowered, each original
/// segment is pushed here. When the last temporary is reached, the
/// segments are reassembled into the dotted chain the programmer wrote, so
/// the recorded dependencies follow the source rather than the compiler's
/// temporaries. The accumulator is flushed exactly once per source
/// statement.
#[derive(Clone, Debug, Default)]
pub struct SsaPointerList {
    pointers: Vec<AstNode>,
}

impl SsaPointerList {
    #[inline(always)]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn push(&mut self, pointer: AstNode) {
        self.pointers.push(pointer);
    }

    #[inline(always)]
    pub fn clear(&mut self) {
        self.pointers.clear();
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.pointers.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.pointers.is_empty()
    }

    #[inline(always)]
    pub fn pointers(&self) -> &[AstNode] {
        &self.pointers
    }

    /// Reassembles the accumulated segments into a left-recursive dotted
    /// chain.
    ///
    /// Returns None if fewer than two segments have been accumulated: a
    /// single segment is already tracked by the regular dependency pass.
    pub fn reassemble(&self) -> Option<AstNode> {
        if self.pointers.len() < 2 {
            return None;
        }

        let mut pointers = self.pointers.iter().cloned();

        let mut chain = pointers.next()?;

        for pointer in pointers {
            chain = IdentifierListNode::new(chain, pointer).into();
        }

        Some(chain)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        graph::SsaPointerList,
        syntax::{AstNode, FunctionCallNode, IdentifierNode, LiteralNode},
    };

    #[test]
    fn test_reassembly() {
        let mut pointers = SsaPointerList::new();

        pointers.push(IdentifierNode::new("a").into());

        assert!(pointers.reassemble().is_none());

        pointers.push(IdentifierNode::new("b").into());
        pointers.push(FunctionCallNode::new("f", [LiteralNode::int("1")]).into());

        let Some(AstNode::IdentifierList(chain)) = pointers.reassemble() else {
            panic!("Chain expected.");
        };

        assert!(matches!(chain.right.as_ref(), AstNode::FunctionCall(..)));
        assert!(matches!(chain.left.as_ref(), AstNode::IdentifierList(..)));

        pointers.clear();

        assert!(pointers.is_empty());
    }
}
