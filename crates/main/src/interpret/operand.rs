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

use crate::{
    interpret::{BlockId, Pc},
    runtime::{ClassIndex, ProcIndex, TypeUid},
};

/// A jump target that has not been backpatched yet.
pub const INVALID_LABEL: Pc = Pc::MAX;

/// A virtual machine register.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Register {
    /// The left operand of binary operations.
    AX,
    /// The right operand of binary operations.
    BX,
    CX,
    /// Heap allocation size.
    DX,
    /// The last popped value of the current language block.
    LX,
    /// The function result.
    RX,
}

impl Display for Register {
    #[inline(always)]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(match self {
            Self::AX => "_ax",
            Self::BX => "_bx",
            Self::CX => "_cx",
            Self::DX => "_dx",
            Self::LX => "_lx",
            Self::RX => "_rx",
        })
    }
}

/// An instruction operand.
///
/// The variant fully determines how the payload is interpreted: numeric
/// literals carry their value, addressing variants carry a table index, and
/// jump labels carry a program counter.
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Operand {
    Int(i64),
    Double(f64),
    Bool(bool),
    Char(char),

    /// A string literal pushed as a character array of the specified length.
    StringPointer(usize),

    Null,

    /// A stack slot of a global or local variable.
    VarIndex(usize),

    /// An instance member variable of the class in scope.
    MemVarIndex(usize),

    /// A static member variable mirrored in the global block.
    StaticMemVarIndex(usize),

    /// A class. None denotes the global scope.
    ClassIndex(Option<ClassIndex>),

    /// A procedure. None denotes the global scope.
    FunctionIndex(Option<ProcIndex>),

    BlockIndex(BlockId),

    /// A jump target. [INVALID_LABEL] until backpatched.
    LabelIndex(Pc),

    /// The number of array subscripts preceding the addressed value.
    ArrayDim(usize),

    /// The number of replication guides preceding the addressed value.
    ReplicationGuide(usize),

    Register(Register),

    /// An entry of the session's dynamic variable or dynamic function table.
    Dynamic(usize),

    /// The current class instance.
    ThisPtr,

    /// A heap pointer to a symbol's boxed value.
    Pointer(usize),

    /// A heap pointer to an array element.
    ArrayPointer(usize),

    /// A type descriptor.
    StaticType { uid: TypeUid, rank: isize },

    /// A placeholder for an argument's default value.
    DefaultArg,
}

impl Display for Operand {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(value) => formatter.write_fmt(format_args!("{value}")),
            Self::Double(value) => formatter.write_fmt(format_args!("{value:?}")),
            Self::Bool(value) => formatter.write_fmt(format_args!("{value}")),
            Self::Char(value) => formatter.write_fmt(format_args!("{value:?}")),
            Self::StringPointer(len) => formatter.write_fmt(format_args!("str[{len}]")),
            Self::Null => formatter.write_str("null"),
            Self::VarIndex(index) => formatter.write_fmt(format_args!("var{index}")),
            Self::MemVarIndex(index) => formatter.write_fmt(format_args!("mem{index}")),
            Self::StaticMemVarIndex(index) => formatter.write_fmt(format_args!("static{index}")),
            Self::ClassIndex(None) => formatter.write_str("class_global"),
            Self::ClassIndex(Some(index)) => formatter.write_fmt(format_args!("class{index}")),
            Self::FunctionIndex(None) => formatter.write_str("fn_global"),
            Self::FunctionIndex(Some(index)) => formatter.write_fmt(format_args!("fn{index}")),
            Self::BlockIndex(index) => formatter.write_fmt(format_args!("block{index}")),
            Self::LabelIndex(INVALID_LABEL) => formatter.write_str("L?"),
            Self::LabelIndex(pc) => formatter.write_fmt(format_args!("L{pc}")),
            Self::ArrayDim(dims) => formatter.write_fmt(format_args!("{dims}[dim]")),
            Self::ReplicationGuide(count) => formatter.write_fmt(format_args!("{count}[guide]")),
            Self::Register(register) => Display::fmt(register, formatter),
            Self::Dynamic(index) => formatter.write_fmt(format_args!("dyn{index}")),
            Self::ThisPtr => formatter.write_str("this"),
            Self::Pointer(index) => formatter.write_fmt(format_args!("ptr{index}")),
            Self::ArrayPointer(index) => formatter.write_fmt(format_args!("arrptr{index}")),
            Self::StaticType { uid, rank } => formatter.write_fmt(format_args!("type{uid}[{rank}]")),
            Self::DefaultArg => formatter.write_str("default"),
        }
    }
}

impl Operand {
    /// Returns the integer view of the operand's payload.
    ///
    /// Double literals are truncated. Operands without a numeric payload
    /// return their table index, or zero.
    pub fn payload(&self) -> i64 {
        match self {
            Self::Int(value) => *value,
            Self::Double(value) => cast::i64(value.trunc()).unwrap_or(0),
            Self::Bool(value) => i64::from(*value),
            Self::Char(value) => i64::from(u32::from(*value)),

            Self::StringPointer(index)
            | Self::VarIndex(index)
            | Self::MemVarIndex(index)
            | Self::StaticMemVarIndex(index)
            | Self::BlockIndex(index)
            | Self::ArrayDim(index)
            | Self::ReplicationGuide(index)
            | Self::Dynamic(index)
            | Self::Pointer(index)
            | Self::ArrayPointer(index) => i64::try_from(*index).unwrap_or(i64::MAX),

            Self::ClassIndex(Some(index)) | Self::FunctionIndex(Some(index)) => {
                i64::try_from(*index).unwrap_or(i64::MAX)
            }

            Self::LabelIndex(INVALID_LABEL) => -1,
            Self::LabelIndex(pc) => i64::try_from(*pc).unwrap_or(i64::MAX),
            Self::StaticType { uid, .. } => i64::try_from(*uid).unwrap_or(-1),

            Self::ClassIndex(None) | Self::FunctionIndex(None) => -1,
            Self::Null | Self::Register(..) | Self::ThisPtr | Self::DefaultArg => 0,
        }
    }

    /// Returns the floating-point view of the operand's payload.
    ///
    /// For numeric literals both views denote the same value.
    #[inline]
    pub fn payload_f64(&self) -> f64 {
        match self {
            Self::Double(value) => *value,
            other => cast::f64(other.payload()),
        }
    }

    /// Returns true if the operand is a jump target.
    #[inline(always)]
    pub fn is_label(&self) -> bool {
        matches!(self, Self::LabelIndex(..))
    }

    /// Returns true if the operand is a jump target that still waits for
    /// backpatching.
    #[inline(always)]
    pub fn is_unpatched_label(&self) -> bool {
        matches!(self, Self::LabelIndex(INVALID_LABEL))
    }

    /// Returns true if the operand is a constant value.
    #[inline(always)]
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            Self::Int(..) | Self::Double(..) | Self::Bool(..) | Self::Char(..) | Self::Null
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::interpret::{Operand, INVALID_LABEL};

    #[test]
    fn test_numeric_views() {
        let int = Operand::Int(42);
        let double = Operand::Double(2.5);

        assert_eq!(int.payload(), 42);
        assert_eq!(int.payload_f64(), 42.0);
        assert_eq!(double.payload(), 2);
        assert_eq!(double.payload_f64(), 2.5);
        assert_eq!(Operand::Bool(true).payload(), 1);
        assert_eq!(Operand::Char('a').payload(), 97);
    }

    #[test]
    fn test_labels() {
        let pending = Operand::LabelIndex(INVALID_LABEL);

        assert!(pending.is_label());
        assert!(pending.is_unpatched_label());
        assert!(!Operand::LabelIndex(10).is_unpatched_label());
        assert!(!pending.is_literal());
        assert!(!Operand::Int(1).is_label());
        assert_eq!(pending.to_string(), "L?");
        assert_eq!(Operand::LabelIndex(7).to_string(), "L7");
    }
}
