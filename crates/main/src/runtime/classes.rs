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

use ahash::AHashMap;
use compact_str::CompactString;

use crate::runtime::{
    AccessModifier,
    AttributeEntry,
    PrimitiveType,
    ProcIndex,
    ProcRef,
    ProcedureNode,
    ProcedureTable,
    SymbolTable,
    TypeUid,
};

/// An index of a class within the [ClassTable].
///
/// Class indices and [type identifiers](TypeUid) share the same space.
pub type ClassIndex = TypeUid;

/// A class declaration: member variables and methods, with an optional base
/// class.
#[derive(Clone, Debug, Default)]
pub struct ClassNode {
    pub name: CompactString,
    pub base: Option<ClassIndex>,
    pub symbols: SymbolTable,
    pub procedures: ProcedureTable,

    /// True for the built-in primitive types.
    pub is_primitive: bool,

    pub attributes: Vec<AttributeEntry>,
}

impl ClassNode {
    pub fn new(name: impl Into<CompactString>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// A reference to a class member found by a [ClassTable] lookup.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct MemberRef {
    /// The class that declares the member. May be a base class of the
    /// queried class.
    pub owner: ClassIndex,

    /// The member's index within the owner's symbol or procedure table.
    pub index: usize,
}

/// A result of a class member lookup.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum MemberLookup {
    /// No class in the inheritance chain declares the member.
    Missing,

    /// The member is declared and visible from the lookup context.
    Found(MemberRef),

    /// The member is declared but its access modifier hides it from the
    /// lookup context.
    Inaccessible(MemberRef),
}

impl MemberLookup {
    /// Returns true if the member is declared, accessible or not.
    #[inline(always)]
    pub fn exists(&self) -> bool {
        !matches!(self, Self::Missing)
    }

    #[inline(always)]
    pub fn found(&self) -> Option<MemberRef> {
        match self {
            Self::Found(member) => Some(*member),
            _ => None,
        }
    }
}

/// A registry of all classes known to the compilation session.
///
/// The table is created with the [primitive types](PrimitiveType)
/// pre-registered under their identifiers.
#[derive(Clone, Debug)]
pub struct ClassTable {
    classes: Vec<ClassNode>,
    by_name: AHashMap<CompactString, ClassIndex>,
}

impl Default for ClassTable {
    #[inline(always)]
    fn default() -> Self {
        Self::new()
    }
}

impl ClassTable {
    pub fn new() -> Self {
        let mut table = Self {
            classes: Vec::new(),
            by_name: AHashMap::new(),
        };

        for primitive in PrimitiveType::ALL {
            let mut class = ClassNode::new(primitive.name());

            class.is_primitive = true;

            let _ = table.append(class);
        }

        table
    }

    /// Registers a class and returns its index.
    ///
    /// Returns None if a class with the same name already exists.
    pub fn append(&mut self, class: ClassNode) -> Option<ClassIndex> {
        if self.by_name.contains_key(&class.name) {
            return None;
        }

        let index = self.classes.len();

        let _ = self.by_name.insert(class.name.clone(), index);
        self.classes.push(class);

        Some(index)
    }

    #[inline(always)]
    pub fn index_of(&self, name: &str) -> Option<ClassIndex> {
        self.by_name.get(name).copied()
    }

    #[inline(always)]
    pub fn get(&self, index: ClassIndex) -> Option<&ClassNode> {
        self.classes.get(index)
    }

    #[inline(always)]
    pub fn get_mut(&mut self, index: ClassIndex) -> Option<&mut ClassNode> {
        self.classes.get_mut(index)
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    #[inline(always)]
    pub fn iter(&self) -> impl Iterator<Item = &ClassNode> + '_ {
        self.classes.iter()
    }

    /// Returns the procedure referred to by `proc_ref`, if the reference
    /// points to a class method.
    pub fn procedure(&self, proc_ref: ProcRef) -> Option<&ProcedureNode> {
        self.get(proc_ref.class_scope?)?.procedures.get(proc_ref.index)
    }

    /// Returns true if `derived` is `base` or inherits from it.
    pub fn is_derived(&self, derived: ClassIndex, base: ClassIndex) -> bool {
        let mut current = Some(derived);

        while let Some(index) = current {
            if index == base {
                return true;
            }

            current = self.get(index).and_then(|class| class.base);
        }

        false
    }

    /// Returns true if a value of type `from` can be assigned to a target of
    /// type `to` without an explicit conversion.
    pub fn convertible_to(&self, from: TypeUid, to: TypeUid) -> bool {
        if from == to || to == PrimitiveType::Var.uid() || from == PrimitiveType::Null.uid() {
            return true;
        }

        let numeric = [
            PrimitiveType::Int.uid(),
            PrimitiveType::Double.uid(),
            PrimitiveType::Bool.uid(),
        ];

        if numeric.contains(&from) && numeric.contains(&to) {
            return true;
        }

        self.is_derived(from, to)
    }

    /// Looks up a member variable by name in `class` and its base classes.
    ///
    /// The `context` is the class from whose methods the lookup is
    /// performed. Private members are visible only from their own class,
    /// protected members from the derived classes as well.
    pub fn lookup_member(
        &self,
        class: ClassIndex,
        name: &str,
        context: Option<ClassIndex>,
    ) -> MemberLookup {
        let mut hidden = None;
        let mut current = Some(class);

        while let Some(owner) = current {
            let Some(class_node) = self.get(owner) else {
                break;
            };

            if let Some(index) = class_node.symbols.index_of_in_function(name, None) {
                let member = MemberRef { owner, index };

                let access = class_node
                    .symbols
                    .get(index)
                    .map(|symbol| symbol.access)
                    .unwrap_or_default();

                if self.is_accessible(owner, access, context) {
                    return MemberLookup::Found(member);
                }

                if hidden.is_none() {
                    hidden = Some(member);
                }
            }

            current = class_node.base;
        }

        match hidden {
            Some(member) => MemberLookup::Inaccessible(member),
            None => MemberLookup::Missing,
        }
    }

    /// Looks up a member variable by name in `class` and its base classes
    /// ignoring access modifiers.
    pub fn first_visible_symbol_no_access_check(
        &self,
        class: ClassIndex,
        name: &str,
    ) -> Option<MemberRef> {
        let mut current = Some(class);

        while let Some(owner) = current {
            let class_node = self.get(owner)?;

            if let Some(index) = class_node.symbols.index_of_in_function(name, None) {
                return Some(MemberRef { owner, index });
            }

            current = class_node.base;
        }

        None
    }

    /// Looks up a method by name and call arity in `class` and its base
    /// classes.
    pub fn lookup_procedure(
        &self,
        class: ClassIndex,
        name: &str,
        arity: usize,
        context: Option<ClassIndex>,
    ) -> MemberLookup {
        let mut hidden = None;
        let mut current = Some(class);

        while let Some(owner) = current {
            let Some(class_node) = self.get(owner) else {
                break;
            };

            if let Some(index) = class_node.procedures.find(name, arity) {
                let member = MemberRef { owner, index };

                let access = class_node
                    .procedures
                    .get(index)
                    .map(|procedure| procedure.access)
                    .unwrap_or_default();

                if self.is_accessible(owner, access, context) {
                    return MemberLookup::Found(member);
                }

                if hidden.is_none() {
                    hidden = Some(member);
                }
            }

            current = class_node.base;
        }

        match hidden {
            Some(member) => MemberLookup::Inaccessible(member),
            None => MemberLookup::Missing,
        }
    }

    /// Returns the first static method named `name` declared in `class` or
    /// its base classes.
    pub fn first_static_member_function(&self, class: ClassIndex, name: &str) -> Option<ProcRef> {
        let mut current = Some(class);

        while let Some(owner) = current {
            let class_node = self.get(owner)?;

            let found = class_node
                .procedures
                .iter()
                .find(|procedure| procedure.is_static && procedure.name == name);

            if let Some(procedure) = found {
                return Some(ProcRef {
                    class_scope: Some(owner),
                    index: procedure.index,
                });
            }

            current = class_node.base;
        }

        None
    }

    /// Appends a method to the class and returns its index.
    pub fn append_procedure(
        &mut self,
        class: ClassIndex,
        mut procedure: ProcedureNode,
    ) -> Option<ProcIndex> {
        procedure.class_scope = Some(class);

        Some(self.get_mut(class)?.procedures.append(procedure))
    }

    fn is_accessible(
        &self,
        owner: ClassIndex,
        access: AccessModifier,
        context: Option<ClassIndex>,
    ) -> bool {
        match access {
            AccessModifier::Public => true,
            AccessModifier::Private => context == Some(owner),
            AccessModifier::Protected => match context {
                Some(context) => self.is_derived(context, owner),
                None => false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::runtime::{
        AccessModifier,
        ClassNode,
        ClassTable,
        MemberLookup,
        PrimitiveType,
        ProcedureNode,
        SymbolNode,
        Type,
        MAX_PRIMITIVES,
    };

    fn shapes() -> (ClassTable, usize, usize) {
        let mut table = ClassTable::new();

        let mut base = ClassNode::new("Shape");

        let _ = base.symbols.append(SymbolNode::new("area", Type::default()));
        let _ = base.symbols.append(
            SymbolNode::new("secret", Type::default()).with_access(AccessModifier::Private),
        );
        let _ = base.symbols.append(
            SymbolNode::new("shared", Type::default()).with_access(AccessModifier::Protected),
        );

        let base = table.append(base).unwrap();

        let mut derived = ClassNode::new("Circle");

        derived.base = Some(base);

        let derived = table.append(derived).unwrap();

        (table, base, derived)
    }

    #[test]
    fn test_primitive_registration() {
        let table = ClassTable::new();

        assert_eq!(table.len(), MAX_PRIMITIVES);
        assert_eq!(table.index_of("int"), Some(PrimitiveType::Int.uid()));
        assert!(table.get(PrimitiveType::Var.uid()).unwrap().is_primitive);
    }

    #[test]
    fn test_member_visibility() {
        let (mut table, base, derived) = shapes();

        assert_eq!(table.append(ClassNode::new("Shape")), None);
        assert!(table.is_derived(derived, base));
        assert!(!table.is_derived(base, derived));

        let MemberLookup::Found(area) = table.lookup_member(derived, "area", None) else {
            panic!("Public member expected.");
        };

        assert_eq!(area.owner, base);

        assert!(matches!(
            table.lookup_member(derived, "secret", Some(derived)),
            MemberLookup::Inaccessible(..),
        ));
        assert!(table.lookup_member(derived, "secret", Some(base)).found().is_some());
        assert!(table.lookup_member(derived, "shared", Some(derived)).found().is_some());
        assert!(matches!(
            table.lookup_member(derived, "shared", None),
            MemberLookup::Inaccessible(..),
        ));
        assert_eq!(table.lookup_member(derived, "radius", None), MemberLookup::Missing);
        assert!(table
            .first_visible_symbol_no_access_check(derived, "secret")
            .is_some());
    }

    #[test]
    fn test_static_functions() {
        let (mut table, base, derived) = shapes();

        let _ = table
            .append_procedure(base, ProcedureNode::new("make").with_static(true))
            .unwrap();
        let _ = table
            .append_procedure(derived, ProcedureNode::new("draw"))
            .unwrap();

        let make = table.first_static_member_function(derived, "make").unwrap();

        assert_eq!(make.class_scope, Some(base));
        assert!(table.first_static_member_function(derived, "draw").is_none());
        assert!(table.lookup_procedure(derived, "draw", 0, None).found().is_some());
        assert_eq!(table.procedure(make).unwrap().name, "make");
        assert!(table.convertible_to(derived, base));
        assert!(table.convertible_to(PrimitiveType::Int.uid(), PrimitiveType::Var.uid()));
        assert!(!table.convertible_to(base, derived));
    }
}
