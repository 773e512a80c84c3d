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

/// A configuration of the code generator.
///
/// The configuration is fixed for the lifetime of a
/// [CompileSession](crate::semantics::CompileSession).
///
/// The [Default] implementation is [CompileOptions::new], which turns all
/// switches off.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub struct CompileOptions {
    /// If set, every emitted instruction is logged at the debug level in the
    /// `[a.<block>.<pc>] <mnemonic> <operands>` listing format.
    pub dump_byte_code: bool,

    /// If set, instructions carry source location debug records for the
    /// debugger's stepper.
    ///
    /// The records are attached only if one of the
    /// [ide_debug_mode](Self::ide_debug_mode),
    /// [watch_test_mode](Self::watch_test_mode), or
    /// [delta_execution](Self::delta_execution) modes is active as well.
    pub emit_breakpoints: bool,

    pub ide_debug_mode: bool,

    pub watch_test_mode: bool,

    /// The reactive engine replays individual graph nodes rather than whole
    /// blocks.
    pub delta_execution: bool,

    /// If set, associative statements reading multi-segment chains are split
    /// into single-segment temporaries.
    pub full_ssa: bool,

    /// If set, identifier reads and literals push the replication guide
    /// count ahead of the value.
    pub replication_guides: bool,

    /// If set, literal types are inferred only when they rank higher than
    /// the expected type.
    pub enforce_type_check: bool,

    /// If set, conditional jumps do not carry debug records.
    pub emit_inline_conditional_breakpoint: bool,

    /// If set, stores into compiler-introduced temporaries carry debug
    /// records.
    pub emit_pop_for_temp_breakpoint: bool,
}

impl Default for CompileOptions {
    #[inline(always)]
    fn default() -> Self {
        Self::new()
    }
}

impl CompileOptions {
    /// The default constructor for the configuration.
    #[inline(always)]
    pub const fn new() -> Self {
        Self {
            dump_byte_code: false,
            emit_breakpoints: false,
            ide_debug_mode: false,
            watch_test_mode: false,
            delta_execution: false,
            full_ssa: false,
            replication_guides: false,
            enforce_type_check: false,
            emit_inline_conditional_breakpoint: false,
            emit_pop_for_temp_breakpoint: false,
        }
    }

    /// Returns true if instructions should carry debug records.
    #[inline(always)]
    pub const fn debug_records(&self) -> bool {
        self.emit_breakpoints && (self.ide_debug_mode || self.watch_test_mode || self.delta_execution)
    }
}

/// The emission mode of a compilation session.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExecMode {
    /// Instructions are appended to the current code block.
    #[default]
    Normal,

    /// Instructions are appended to the watch stream, and new symbols are
    /// allocated from the watch base offset.
    ExpressionInterpreter,
}

#[cfg(test)]
mod tests {
    use crate::semantics::CompileOptions;

    #[test]
    fn test_debug_records_switch() {
        let mut options = CompileOptions::new();

        assert_eq!(options, CompileOptions::default());
        assert!(!options.debug_records());

        options.emit_breakpoints = true;

        assert!(!options.debug_records());

        options.delta_execution = true;

        assert!(options.debug_records());
    }
}
