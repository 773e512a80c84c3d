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

use compact_str::{format_compact, CompactString};

use crate::{
    interpret::BlockId,
    runtime::{AccessModifier, ClassIndex, Type},
    syntax::AstNode,
};

/// An index of a procedure within its owner [ProcedureTable].
pub type ProcIndex = usize;

/// The name of the compiler-generated procedure that initializes the static
/// properties of a class.
pub const STATIC_PROPERTIES_INITIALIZER: &str = "%init_static_properties";

/// The name prefix of compiler-generated property getters.
pub const GETTER_PREFIX: &str = "%get_";

/// The name prefix of compiler-generated property setters.
pub const SETTER_PREFIX: &str = "%set_";

/// Returns true if the procedure name denotes a compiler-generated property
/// getter or setter.
#[inline(always)]
pub fn is_getter_setter(name: &str) -> bool {
    name.starts_with(GETTER_PREFIX) || name.starts_with(SETTER_PREFIX)
}

/// Returns the bare property name of a getter or setter name.
pub fn property_name(name: &str) -> Option<&str> {
    name.strip_prefix(GETTER_PREFIX)
        .or_else(|| name.strip_prefix(SETTER_PREFIX))
        .filter(|property| !property.is_empty())
}

/// Returns the getter name of a property.
#[inline(always)]
pub fn getter_name(property: &str) -> CompactString {
    format_compact!("{GETTER_PREFIX}{property}")
}

/// Returns the setter name of a property.
#[inline(always)]
pub fn setter_name(property: &str) -> CompactString {
    format_compact!("{SETTER_PREFIX}{property}")
}

/// A reference to a procedure: either a global one, or a method of a class.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProcRef {
    /// The class that owns the procedure table. None for the global table.
    pub class_scope: Option<ClassIndex>,

    /// The index of the procedure within the owner table.
    pub index: ProcIndex,
}

/// A formal parameter of a procedure.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ArgumentInfo {
    pub name: CompactString,
    pub ty: Type,
    pub has_default: bool,
}

/// An attribute attached to a class or a procedure declaration.
///
/// Attributes are instances of classes named `<Name>Attribute`, constructed
/// from constant arguments at compile time.
#[derive(Clone, Debug, PartialEq)]
pub struct AttributeEntry {
    /// The attribute class.
    pub class_index: ClassIndex,

    /// The constant constructor arguments.
    pub args: Vec<AstNode>,
}

/// A declared function, method, constructor, or compiler-generated property
/// accessor.
#[derive(Clone, Debug, PartialEq)]
pub struct ProcedureNode {
    pub name: CompactString,
    pub index: ProcIndex,
    pub class_scope: Option<ClassIndex>,
    pub return_type: Type,
    pub args: Vec<ArgumentInfo>,
    pub is_constructor: bool,
    pub is_static: bool,

    /// True if the procedure was introduced by the compiler (property
    /// accessors, static initializers).
    pub is_auto_generated: bool,

    pub access: AccessModifier,

    /// The code block of the procedure's body.
    pub block: Option<BlockId>,

    /// The program counter of the body's first instruction.
    pub entry: Option<usize>,

    /// The number of stack slots occupied by the procedure's locals.
    pub locals: usize,

    pub attributes: Vec<AttributeEntry>,
}

impl ProcedureNode {
    pub fn new(name: impl Into<CompactString>) -> Self {
        Self {
            name: name.into(),
            index: 0,
            class_scope: None,
            return_type: Type::default(),
            args: Vec::new(),
            is_constructor: false,
            is_static: false,
            is_auto_generated: false,
            access: AccessModifier::Public,
            block: None,
            entry: None,
            locals: 0,
            attributes: Vec::new(),
        }
    }

    /// Appends a parameter of the specified type.
    pub fn with_arg(mut self, name: impl Into<CompactString>, ty: Type) -> Self {
        self.args.push(ArgumentInfo {
            name: name.into(),
            ty,
            has_default: false,
        });

        self
    }

    #[inline(always)]
    pub fn returns(mut self, ty: Type) -> Self {
        self.return_type = ty;
        self
    }

    #[inline(always)]
    pub fn constructor(mut self) -> Self {
        self.is_constructor = true;
        self
    }

    #[inline(always)]
    pub fn with_static(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }

    #[inline(always)]
    pub fn auto_generated(mut self) -> Self {
        self.is_auto_generated = true;
        self
    }

    #[inline(always)]
    pub fn with_access(mut self, access: AccessModifier) -> Self {
        self.access = access;
        self
    }

    /// Returns true if a call with `arity` actual arguments matches this
    /// procedure's parameters, taking defaults into account.
    pub fn accepts_arity(&self, arity: usize) -> bool {
        let required = self.args.iter().filter(|arg| !arg.has_default).count();

        arity >= required && arity <= self.args.len()
    }

    #[inline(always)]
    pub fn is_getter_setter(&self) -> bool {
        is_getter_setter(&self.name)
    }

    #[inline(always)]
    pub fn is_static_initializer(&self) -> bool {
        self.name == STATIC_PROPERTIES_INITIALIZER
    }
}

/// An append-only collection of procedures owned by the global scope or by a
/// class.
#[derive(Clone, Debug, Default)]
pub struct ProcedureTable {
    procedures: Vec<ProcedureNode>,
}

impl ProcedureTable {
    #[inline(always)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a procedure and returns its index.
    ///
    /// The procedure's [index](ProcedureNode::index) is updated accordingly.
    pub fn append(&mut self, mut procedure: ProcedureNode) -> ProcIndex {
        let index = self.procedures.len();

        procedure.index = index;

        self.procedures.push(procedure);

        index
    }

    /// Looks up a procedure by name whose parameters accept `arity`
    /// arguments.
    ///
    /// Among several candidates, the one with the exact parameter count is
    /// preferred.
    pub fn find(&self, name: &str, arity: usize) -> Option<ProcIndex> {
        let mut candidate = None;

        for procedure in &self.procedures {
            if procedure.name != name || !procedure.accepts_arity(arity) {
                continue;
            }

            if procedure.args.len() == arity {
                return Some(procedure.index);
            }

            if candidate.is_none() {
                candidate = Some(procedure.index);
            }
        }

        candidate
    }

    /// Looks up the first procedure with the specified name regardless of
    /// its parameters.
    pub fn find_by_name(&self, name: &str) -> Option<ProcIndex> {
        self.procedures
            .iter()
            .find(|procedure| procedure.name == name)
            .map(|procedure| procedure.index)
    }

    /// Looks up the first constructor with the specified name accepting
    /// `arity` arguments.
    pub fn find_constructor(&self, name: &str, arity: usize) -> Option<ProcIndex> {
        self.procedures
            .iter()
            .find(|procedure| {
                procedure.is_constructor && procedure.name == name && procedure.accepts_arity(arity)
            })
            .map(|procedure| procedure.index)
    }

    #[inline(always)]
    pub fn get(&self, index: ProcIndex) -> Option<&ProcedureNode> {
        self.procedures.get(index)
    }

    #[inline(always)]
    pub fn get_mut(&mut self, index: ProcIndex) -> Option<&mut ProcedureNode> {
        self.procedures.get_mut(index)
    }

    #[inline(always)]
    pub fn iter(&self) -> impl Iterator<Item = &ProcedureNode> + '_ {
        self.procedures.iter()
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.procedures.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.procedures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use crate::runtime::{
        getter_name,
        is_getter_setter,
        property_name,
        setter_name,
        ProcedureNode,
        ProcedureTable,
        Type,
    };

    #[test]
    fn test_accessor_names() {
        assert_eq!(getter_name("x"), "%get_x");
        assert_eq!(setter_name("x"), "%set_x");
        assert!(is_getter_setter("%get_x"));
        assert!(!is_getter_setter("get_x"));
        assert_eq!(property_name("%set_radius"), Some("radius"));
        assert_eq!(property_name("%get_"), None);
        assert_eq!(property_name("foo"), None);
    }

    #[test]
    fn test_arity_lookup() {
        let mut table = ProcedureTable::new();

        let mut with_default = ProcedureNode::new("foo")
            .with_arg("a", Type::default())
            .with_arg("b", Type::default());

        with_default.args[1].has_default = true;

        let first = table.append(with_default);
        let second = table.append(ProcedureNode::new("foo").with_arg("a", Type::default()));

        assert_eq!(table.find("foo", 1), Some(second));
        assert_eq!(table.find("foo", 2), Some(first));
        assert_eq!(table.find("foo", 0), None);
        assert_eq!(table.find("foo", 3), None);
        assert_eq!(table.find_by_name("foo"), Some(first));
        assert_eq!(table.get(second).unwrap().index, second);
    }
}
