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

//! The output model of the code generator.
//!
//! Compiled code is organized into [CodeBlock]s. Each block owns a linear
//! stream of three-operand [Instruction]s addressed by their program
//! counters ([Pc]). Late-bound symbols are recorded in the
//! [DynamicTable]s, and the [DebugMap] maps program counters back to the
//! source code.

mod block;
mod debug_map;
mod dynamic;
mod executable;
mod instruction;
mod operand;

pub use crate::interpret::{
    block::{BlockId, BlockKind, CodeBlock, Language, Pc},
    debug_map::DebugMap,
    dynamic::{
        DynamicFunctionNode,
        DynamicFunctionTable,
        DynamicTable,
        DynamicVariableNode,
        DynamicVariableTable,
    },
    executable::Executable,
    instruction::{DebugInfo, Instruction, OpCode},
    operand::{Operand, Register, INVALID_LABEL},
};
