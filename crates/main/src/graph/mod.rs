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

//! The associative dependency graph model.
//!
//! Every associative statement is represented by a [GraphNode]. The node
//! records the instruction range that evaluates the statement and a list of
//! dependency chains ([UpdateNodeRef]), each made of [UpdateNode] segments
//! mirroring one identifier, property, or method path read by the
//! statement.

mod node;
mod ssa;
mod update;

pub use crate::graph::{
    node::{GraphNode, UpdateBlock},
    ssa::SsaPointerList,
    update::{SymbolOwner, SymbolRef, UpdateNode, UpdateNodeKind, UpdateNodeRef},
};

pub(crate) static GRAPH_LOG: &'static str = "dualscript::$graph";
