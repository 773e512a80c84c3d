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
    interpret::{Operand, Pc},
    syntax::{Operator, SourceSpan, UnaryOperator},
};

/// A virtual machine operation code.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum OpCode {
    /// Allocates a heap box of the size stored in the DX register.
    Alloc,
    /// Allocates an array from the specified number of stack values.
    Alloca,
    /// Enters a nested language block.
    Bounce,
    Call,
    /// Calls a procedure resolved at run time.
    CallR,
    /// Conditional jump: `cjmp cond, then, else`.
    CJmp,
    /// Executes the dependents of the last updated symbol.
    DepX,
    Jmp,
    Jz,
    Jgz,
    Jlz,
    JmpLtEq,
    JmpGtEq,
    JmpLt,
    Mov,
    Pop,
    PopB,
    PopG,
    PopList,
    PopM,
    PopW,
    Push,
    PushB,
    PushG,
    PushIndex,
    PushList,
    PushM,
    PushW,
    /// Produces an array from a `from..to..step` range.
    Range,
    Ret,
    RetB,
    RetCn,
    Throw,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Nq,
    Gt,
    Lt,
    Ge,
    Le,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Not,
    Neg,
    BitNot,
}

impl Display for OpCode {
    #[inline(always)]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.mnemonic())
    }
}

impl OpCode {
    /// Returns the assembler listing name of the operation.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::Alloc => "alloc",
            Self::Alloca => "alloca",
            Self::Bounce => "bounce",
            Self::Call => "call",
            Self::CallR => "callr",
            Self::CJmp => "cjmp",
            Self::DepX => "depx",
            Self::Jmp => "jmp",
            Self::Jz => "jz",
            Self::Jgz => "jgz",
            Self::Jlz => "jlz",
            Self::JmpLtEq => "jmp_lteq",
            Self::JmpGtEq => "jmp_gteq",
            Self::JmpLt => "jmp_lt",
            Self::Mov => "mov",
            Self::Pop => "pop",
            Self::PopB => "popb",
            Self::PopG => "popg",
            Self::PopList => "poplist",
            Self::PopM => "popm",
            Self::PopW => "popw",
            Self::Push => "push",
            Self::PushB => "pushb",
            Self::PushG => "pushg",
            Self::PushIndex => "pushindex",
            Self::PushList => "pushlist",
            Self::PushM => "pushm",
            Self::PushW => "pushw",
            Self::Range => "range",
            Self::Ret => "ret",
            Self::RetB => "retb",
            Self::RetCn => "retcn",
            Self::Throw => "throw",
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Div => "div",
            Self::Mod => "mod",
            Self::Eq => "eq",
            Self::Nq => "nq",
            Self::Gt => "gt",
            Self::Lt => "lt",
            Self::Ge => "ge",
            Self::Le => "le",
            Self::And => "and",
            Self::Or => "or",
            Self::BitAnd => "bitand",
            Self::BitOr => "bitor",
            Self::BitXor => "bitxor",
            Self::Not => "not",
            Self::Neg => "neg",
            Self::BitNot => "bitnot",
        }
    }

    /// Returns the binary operation code of the infix operator.
    ///
    /// Returns None for the [dot](Operator::Dot) operator, which is lowered
    /// as an identifier list rather than an arithmetic operation.
    pub fn from_binary(op: Operator) -> Option<Self> {
        Some(match op {
            Operator::Dot => return None,
            Operator::Add => Self::Add,
            Operator::Sub => Self::Sub,
            Operator::Mul => Self::Mul,
            Operator::Div => Self::Div,
            Operator::Mod => Self::Mod,
            Operator::Eq => Self::Eq,
            Operator::Nq => Self::Nq,
            Operator::Gt => Self::Gt,
            Operator::Lt => Self::Lt,
            Operator::Ge => Self::Ge,
            Operator::Le => Self::Le,
            Operator::And => Self::And,
            Operator::Or => Self::Or,
            Operator::BitAnd => Self::BitAnd,
            Operator::BitOr => Self::BitOr,
            Operator::BitXor => Self::BitXor,
        })
    }

    #[inline(always)]
    pub fn from_unary(op: UnaryOperator) -> Self {
        match op {
            UnaryOperator::Neg => Self::Neg,
            UnaryOperator::Not => Self::Not,
            UnaryOperator::BitNot => Self::BitNot,
        }
    }

    /// Returns true for the unconditional and conditional jumps.
    #[inline(always)]
    pub fn is_jump(self) -> bool {
        matches!(
            self,
            Self::Jmp
                | Self::CJmp
                | Self::Jz
                | Self::Jgz
                | Self::Jlz
                | Self::JmpLtEq
                | Self::JmpGtEq
                | Self::JmpLt
        )
    }
}

/// Debug metadata attached to an instruction for the debugger's stepper.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DebugInfo {
    /// The source code range of the statement or expression that produced
    /// the instruction.
    pub span: SourceSpan,

    /// Program counters the stepper may continue from.
    pub next_steps: Vec<Pc>,
}

/// A virtual machine instruction: an operation code with up to three
/// operands.
///
/// The instruction's program counter is its index in the owning stream.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Instruction {
    pub opcode: OpCode,
    pub op1: Option<Operand>,
    pub op2: Option<Operand>,
    pub op3: Option<Operand>,
    pub debug: Option<DebugInfo>,
}

impl Display for Instruction {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.opcode.mnemonic())?;

        let mut first = true;

        for operand in self.operands() {
            match first {
                true => formatter.write_str(" ")?,
                false => formatter.write_str(", ")?,
            }

            first = false;

            Display::fmt(operand, formatter)?;
        }

        Ok(())
    }
}

impl Instruction {
    #[inline(always)]
    pub fn new(opcode: OpCode) -> Self {
        Self {
            opcode,
            op1: None,
            op2: None,
            op3: None,
            debug: None,
        }
    }

    #[inline(always)]
    pub fn unary(opcode: OpCode, op1: Operand) -> Self {
        Self {
            op1: Some(op1),
            ..Self::new(opcode)
        }
    }

    #[inline(always)]
    pub fn binary(opcode: OpCode, op1: Operand, op2: Operand) -> Self {
        Self {
            op1: Some(op1),
            op2: Some(op2),
            ..Self::new(opcode)
        }
    }

    #[inline(always)]
    pub fn ternary(opcode: OpCode, op1: Operand, op2: Operand, op3: Operand) -> Self {
        Self {
            op1: Some(op1),
            op2: Some(op2),
            op3: Some(op3),
            ..Self::new(opcode)
        }
    }

    /// Iterates over the present operands in order.
    #[inline(always)]
    pub fn operands(&self) -> impl Iterator<Item = &Operand> + '_ {
        [&self.op1, &self.op2, &self.op3]
            .into_iter()
            .filter_map(Option::as_ref)
    }

    /// Returns the operand slot that holds the jump target of a jump
    /// instruction.
    ///
    /// Returns None if the instruction is not a jump.
    pub fn jump_target_mut(&mut self) -> Option<&mut Option<Operand>> {
        match self.opcode {
            OpCode::Jmp => Some(&mut self.op1),
            OpCode::Jz | OpCode::Jgz | OpCode::Jlz => Some(&mut self.op2),
            OpCode::CJmp | OpCode::JmpLtEq | OpCode::JmpGtEq | OpCode::JmpLt => {
                Some(&mut self.op3)
            }
            _ => None,
        }
    }

    /// Returns the jump target of a jump instruction.
    pub fn jump_target(&self) -> Option<&Operand> {
        match self.opcode {
            OpCode::Jmp => self.op1.as_ref(),
            OpCode::Jz | OpCode::Jgz | OpCode::Jlz => self.op2.as_ref(),
            OpCode::CJmp | OpCode::JmpLtEq | OpCode::JmpGtEq | OpCode::JmpLt => self.op3.as_ref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        interpret::{Instruction, OpCode, Operand, INVALID_LABEL},
        syntax::Operator,
    };

    #[test]
    fn test_jump_slots() {
        let cjmp = Instruction::ternary(
            OpCode::CJmp,
            Operand::Int(1),
            Operand::LabelIndex(3),
            Operand::LabelIndex(INVALID_LABEL),
        );

        assert_eq!(cjmp.jump_target(), Some(&Operand::LabelIndex(INVALID_LABEL)));

        let jz = Instruction::binary(OpCode::Jz, Operand::Int(0), Operand::LabelIndex(9));

        assert_eq!(jz.jump_target(), Some(&Operand::LabelIndex(9)));
        assert_eq!(Instruction::unary(OpCode::Push, Operand::Null).jump_target(), None);
    }

    #[test]
    fn test_listing() {
        let instruction = Instruction::binary(OpCode::PushM, Operand::VarIndex(2), Operand::ClassIndex(None));

        assert_eq!(instruction.to_string(), "pushm var2, class_global");
        assert_eq!(Instruction::new(OpCode::RetB).to_string(), "retb");
        assert_eq!(OpCode::from_binary(Operator::Dot), None);
        assert_eq!(OpCode::from_binary(Operator::Le), Some(OpCode::Le));
    }
}
