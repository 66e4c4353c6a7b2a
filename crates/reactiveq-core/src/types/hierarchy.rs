//! The declared subtype graph.
//!
//! Rust has no runtime inheritance, so every nominal relationship the router
//! relies on is declared up front as a [`TypeDecl`] and stored in a
//! [`TypeHierarchy`]. Supertype descriptors may refer to the declaring type's
//! own parameters as [`TypeDescriptor::Variable`] nodes; the
//! [`TypeResolver`](super::TypeResolver) substitutes them later.
//!
//! ```rust
//! use reactiveq_core::types::{TypeDecl, TypeDescriptor, TypeHierarchy, TypeKey};
//!
//! let hierarchy = TypeHierarchy::with_builtins();
//! let list = TypeDecl::class("ArrayList").param("E");
//! let e = list.variable("E");
//! hierarchy.declare(list.implements(TypeDescriptor::parameterized("List", [e])));
//!
//! assert!(hierarchy.is_subtype(&TypeKey::new("ArrayList"), &TypeKey::new("Iterable")));
//! ```

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::debug;

use super::descriptor::{TypeDescriptor, TypeKey, TypeVariable};
use crate::error::{TypeError, TypeResult};

/// Built-in type names declared by [`TypeHierarchy::with_builtins`].
pub mod builtin {
    pub const OBJECT: &str = super::super::descriptor::OBJECT;
    pub const CHAR_SEQUENCE: &str = "CharSequence";
    pub const COMPARABLE: &str = "Comparable";
    pub const STRING: &str = "String";
    pub const NUMBER: &str = "Number";
    pub const INT: &str = "Int";
    pub const LONG: &str = "Long";
    pub const SHORT: &str = "Short";
    pub const BYTE: &str = "Byte";
    pub const FLOAT: &str = "Float";
    pub const DOUBLE: &str = "Double";
    pub const BOOLEAN: &str = "Boolean";
    pub const CHAR: &str = "Char";
    pub const ITERABLE: &str = "Iterable";
    pub const COLLECTION: &str = "Collection";
    pub const LIST: &str = "List";
    /// Marker interface: values of its subtypes are left out of reactor-count
    /// notifications.
    pub const UNREPORTED: &str = "Unreported";
}

// ============================================================================
// Declarations
// ============================================================================

/// Whether a declared type is a class or an interface.
///
/// Only interfaces are searched among a type's declared interfaces when
/// resolving a generic supertype.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Class,
    Interface,
}

/// A declared type and its direct supertypes.
#[derive(Debug, Clone)]
pub struct TypeDecl {
    key: TypeKey,
    kind: TypeKind,
    params: Vec<Arc<str>>,
    superclass: Option<TypeDescriptor>,
    interfaces: Vec<TypeDescriptor>,
}

impl TypeDecl {
    /// Starts a class declaration.
    pub fn class(key: impl Into<TypeKey>) -> Self {
        Self::new(key.into(), TypeKind::Class)
    }

    /// Starts an interface declaration.
    pub fn interface(key: impl Into<TypeKey>) -> Self {
        Self::new(key.into(), TypeKind::Interface)
    }

    fn new(key: TypeKey, kind: TypeKind) -> Self {
        Self {
            key,
            kind,
            params: Vec::new(),
            superclass: None,
            interfaces: Vec::new(),
        }
    }

    /// Appends a type parameter.
    pub fn param(mut self, name: impl Into<Arc<str>>) -> Self {
        self.params.push(name.into());
        self
    }

    /// Sets the superclass.
    pub fn extends(mut self, superclass: TypeDescriptor) -> Self {
        self.superclass = Some(superclass);
        self
    }

    /// Appends a directly implemented interface.
    pub fn implements(mut self, interface: TypeDescriptor) -> Self {
        self.interfaces.push(interface);
        self
    }

    /// A descriptor for one of this declaration's own type parameters.
    pub fn variable(&self, name: &str) -> TypeDescriptor {
        TypeDescriptor::Variable(TypeVariable::new(name, self.key.clone()))
    }

    pub fn key(&self) -> &TypeKey {
        &self.key
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn params(&self) -> &[Arc<str>] {
        &self.params
    }

    /// Position of a named parameter in the declaration.
    pub fn param_index(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| &**p == name)
    }

    pub fn superclass(&self) -> Option<&TypeDescriptor> {
        self.superclass.as_ref()
    }

    pub fn interfaces(&self) -> &[TypeDescriptor] {
        &self.interfaces
    }

    fn direct_supertypes(&self) -> impl Iterator<Item = &TypeKey> {
        self.interfaces
            .iter()
            .chain(self.superclass.iter())
            .filter_map(TypeDescriptor::raw_key)
    }
}

// ============================================================================
// Hierarchy
// ============================================================================

/// Thread-safe store of type declarations.
///
/// Readers never block each other; declarations are expected to be made up
/// front but may be added at any time.
#[derive(Debug, Default)]
pub struct TypeHierarchy {
    decls: RwLock<HashMap<TypeKey, Arc<TypeDecl>>>,
    revision: AtomicU64,
}

impl TypeHierarchy {
    /// Creates a hierarchy that only knows the universal top type.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a hierarchy with the built-in types declared.
    pub fn with_builtins() -> Self {
        let hierarchy = Self::new();
        declare_builtins(&hierarchy);
        hierarchy
    }

    /// Adds or replaces a declaration, returning the previous one.
    pub fn declare(&self, decl: TypeDecl) -> Option<Arc<TypeDecl>> {
        debug!(
            key = %decl.key,
            kind = ?decl.kind,
            params = decl.params.len(),
            "Declared type"
        );
        let mut decls = self.decls.write();
        let previous = decls.insert(decl.key.clone(), Arc::new(decl));
        self.revision.fetch_add(1, Ordering::Release);
        previous
    }

    /// Incremented by every [`declare`](Self::declare); lets callers that
    /// cache subtype answers notice changes.
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }

    pub fn get(&self, key: &TypeKey) -> Option<Arc<TypeDecl>> {
        self.decls.read().get(key).cloned()
    }

    pub fn contains(&self, key: &TypeKey) -> bool {
        self.decls.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.decls.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.read().is_empty()
    }

    /// Returns `true` if `key` is declared as an interface.
    pub fn is_interface(&self, key: &TypeKey) -> bool {
        self.decls
            .read()
            .get(key)
            .is_some_and(|decl| decl.kind == TypeKind::Interface)
    }

    /// Returns `true` if `candidate` is `required` or transitively extends or
    /// implements it.
    ///
    /// Every type is a subtype of `Object`. Undeclared types have no other
    /// supertypes.
    pub fn is_subtype(&self, candidate: &TypeKey, required: &TypeKey) -> bool {
        if candidate == required || required.is_object() {
            return true;
        }

        let decls = self.decls.read();
        let mut visited: HashSet<&TypeKey> = HashSet::new();
        let mut queue: VecDeque<&TypeKey> = VecDeque::from([candidate]);

        while let Some(current) = queue.pop_front() {
            if !visited.insert(current) {
                continue;
            }
            let Some(decl) = decls.get(current) else {
                continue;
            };
            for supertype in decl.direct_supertypes() {
                if supertype == required {
                    return true;
                }
                queue.push_back(supertype);
            }
        }
        false
    }

    /// Checks that every parameterized node applies a declared generic type
    /// to the declared number of arguments.
    ///
    /// Undeclared raw types are not checked.
    pub fn validate(&self, descriptor: &TypeDescriptor) -> TypeResult<()> {
        match descriptor {
            TypeDescriptor::Plain(_) | TypeDescriptor::Variable(_) => Ok(()),
            TypeDescriptor::ArrayOf(component) => self.validate(component),
            TypeDescriptor::Wildcard(w) => {
                self.validate(w.upper())?;
                w.lower().map_or(Ok(()), |lower| self.validate(lower))
            }
            TypeDescriptor::Parameterized(p) => {
                if let Some(decl) = self.get(p.raw()) {
                    if decl.params.len() != p.args().len() {
                        return Err(TypeError::ArityMismatch {
                            raw: p.raw().to_string(),
                            expected: decl.params.len(),
                            found: p.args().len(),
                        });
                    }
                }
                if let Some(owner) = p.owner() {
                    self.validate(owner)?;
                }
                p.args().iter().try_for_each(|arg| self.validate(arg))
            }
        }
    }
}

fn declare_builtins(hierarchy: &TypeHierarchy) {
    use builtin::*;

    let plain = |key: &str| TypeDescriptor::plain(key);
    let comparable_of = |key: &str| TypeDescriptor::parameterized(COMPARABLE, [plain(key)]);

    hierarchy.declare(TypeDecl::class(OBJECT));
    hierarchy.declare(TypeDecl::interface(UNREPORTED));
    hierarchy.declare(TypeDecl::interface(CHAR_SEQUENCE));
    hierarchy.declare(TypeDecl::interface(COMPARABLE).param("T"));

    hierarchy.declare(
        TypeDecl::class(STRING)
            .implements(plain(CHAR_SEQUENCE))
            .implements(comparable_of(STRING)),
    );
    hierarchy.declare(TypeDecl::class(NUMBER));
    for key in [INT, LONG, SHORT, BYTE, FLOAT, DOUBLE] {
        hierarchy.declare(
            TypeDecl::class(key)
                .extends(plain(NUMBER))
                .implements(comparable_of(key)),
        );
    }
    for key in [BOOLEAN, CHAR] {
        hierarchy.declare(TypeDecl::class(key).implements(comparable_of(key)));
    }

    let iterable = TypeDecl::interface(ITERABLE).param("T");
    hierarchy.declare(iterable);

    let collection = TypeDecl::interface(COLLECTION).param("E");
    let e = collection.variable("E");
    hierarchy.declare(collection.implements(TypeDescriptor::parameterized(ITERABLE, [e])));

    let list = TypeDecl::interface(LIST).param("E");
    let e = list.variable("E");
    hierarchy.declare(list.implements(TypeDescriptor::parameterized(COLLECTION, [e])));
}
