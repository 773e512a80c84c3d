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

use compact_str::CompactString;

use crate::runtime::{ClassIndex, ProcIndex};

/// A chain segment whose target could not be fixed to a stack slot at
/// compile time.
///
/// The runtime resolves the name against the actual type of the receiver.
/// The segments following a late-bound segment in the same chain are
/// recorded in the [members](Self::members) of the entry, and each of them
/// is resolved against the value of the preceding one.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DynamicVariableNode {
    pub name: CompactString,

    pub members: Vec<CompactString>,

    /// The procedure whose body references the variable.
    pub function: Option<ProcIndex>,

    /// The class in whose scope the variable is referenced.
    pub class_scope: Option<ClassIndex>,
}

/// A call whose target procedure could not be resolved at compile time.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DynamicFunctionNode {
    pub name: CompactString,
    pub arity: usize,

    /// The procedure whose body performs the call.
    pub function: Option<ProcIndex>,

    /// The class in whose scope the call is performed.
    pub class_scope: Option<ClassIndex>,
}

/// An append-only table of late-bound entries.
///
/// An entry's position is the payload of the
/// [Dynamic](crate::interpret::Operand::Dynamic) operand that refers to it.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DynamicTable<T> {
    entries: Vec<T>,
}

impl<T> Default for DynamicTable<T> {
    #[inline(always)]
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> DynamicTable<T> {
    /// Appends an entry and returns its position.
    #[inline(always)]
    pub fn append(&mut self, entry: T) -> usize {
        let index = self.entries.len();

        self.entries.push(entry);

        index
    }

    #[inline(always)]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.entries.get(index)
    }

    #[inline(always)]
    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.entries.get_mut(index)
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline(always)]
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.entries.iter()
    }
}

pub type DynamicVariableTable = DynamicTable<DynamicVariableNode>;

pub type DynamicFunctionTable = DynamicTable<DynamicFunctionNode>;
