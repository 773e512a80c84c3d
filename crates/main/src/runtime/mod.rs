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

//! Static data stores consulted by the code generator.
//!
//! The module describes the type system, the symbol tables owned by code
//! blocks and classes, the class table, and the procedure tables. The code
//! generator only reads and appends to these stores; it never removes
//! entries.

mod classes;
mod procedures;
mod symbols;
mod types;

pub use crate::runtime::{
    classes::{ClassIndex, ClassNode, ClassTable, MemberLookup, MemberRef},
    procedures::{
        getter_name,
        is_getter_setter,
        property_name,
        setter_name,
        ArgumentInfo,
        AttributeEntry,
        ProcIndex,
        ProcRef,
        ProcedureNode,
        ProcedureTable,
        GETTER_PREFIX,
        SETTER_PREFIX,
        STATIC_PROPERTIES_INITIALIZER,
    },
    symbols::{AccessModifier, MemoryRegion, SymbolNode, SymbolTable, POINTER_SIZE},
    types::{
        is_higher_rank,
        PrimitiveType,
        Type,
        TypeUid,
        ARBITRARY_RANK,
        INVALID_TYPE,
        MAX_PRIMITIVES,
    },
};
