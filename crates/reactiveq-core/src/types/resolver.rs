//! Type-variable resolution against a declaring context.
//!
//! Given a concrete context such as `ArrayList<String>`, the resolver answers
//! questions like "what is `ArrayList<String>` as an `Iterable`?" by walking
//! the declared supertypes and substituting each declared parameter with the
//! argument found at the same position in the context.

use std::collections::HashSet;

use tracing::trace;

use super::descriptor::{TypeDescriptor, TypeKey, TypeVariable};
use super::hierarchy::{TypeHierarchy, TypeKind};

/// Resolves type variables using a [`TypeHierarchy`].
#[derive(Debug, Clone, Copy)]
pub struct TypeResolver<'h> {
    hierarchy: &'h TypeHierarchy,
}

impl<'h> TypeResolver<'h> {
    pub fn new(hierarchy: &'h TypeHierarchy) -> Self {
        Self { hierarchy }
    }

    /// Views `context` (whose raw type is `declaring`) as its supertype
    /// `target`, with every resolvable variable substituted.
    ///
    /// If `target` is not a declared supertype, the plain `target` is returned.
    pub fn resolve_supertype(
        &self,
        context: &TypeDescriptor,
        declaring: &TypeKey,
        target: &TypeKey,
    ) -> TypeDescriptor {
        let generic = self.generic_supertype(context, declaring, target, &mut HashSet::new());
        self.resolve(context, declaring, &generic)
    }

    /// Substitutes a single variable.
    ///
    /// Returns the variable unchanged when its declaring type is unknown or is
    /// not a supertype of `declaring`.
    pub fn resolve_variable(
        &self,
        context: &TypeDescriptor,
        declaring: &TypeKey,
        variable: &TypeVariable,
    ) -> TypeDescriptor {
        let unresolved = || TypeDescriptor::Variable(variable.clone());

        let Some(declared_by) = variable.declared_by() else {
            return unresolved();
        };
        let Some(index) = self
            .hierarchy
            .get(declared_by)
            .and_then(|decl| decl.param_index(variable.name()))
        else {
            return unresolved();
        };

        match self.generic_supertype(context, declaring, declared_by, &mut HashSet::new()) {
            TypeDescriptor::Parameterized(p) => {
                p.args().get(index).cloned().unwrap_or_else(unresolved)
            }
            _ => unresolved(),
        }
    }

    /// Substitutes every resolvable variable in `to_resolve`.
    pub fn resolve(
        &self,
        context: &TypeDescriptor,
        declaring: &TypeKey,
        to_resolve: &TypeDescriptor,
    ) -> TypeDescriptor {
        self.resolve_guarded(context, declaring, to_resolve, &mut HashSet::new())
    }

    /// Like [`resolve`](Self::resolve), using the raw type of `context` as the
    /// declaring type. Contexts without a raw type leave `to_resolve` as is.
    pub fn resolve_in(&self, context: &TypeDescriptor, to_resolve: &TypeDescriptor) -> TypeDescriptor {
        match context.raw_key() {
            Some(declaring) => self.resolve(context, declaring, to_resolve),
            None => to_resolve.clone(),
        }
    }

    fn resolve_guarded(
        &self,
        context: &TypeDescriptor,
        declaring: &TypeKey,
        to_resolve: &TypeDescriptor,
        visiting: &mut HashSet<TypeVariable>,
    ) -> TypeDescriptor {
        match to_resolve {
            TypeDescriptor::Plain(_) => to_resolve.clone(),
            TypeDescriptor::Variable(variable) => {
                if visiting.contains(variable) {
                    trace!(variable = %variable, "Variable revisited during resolution");
                    return to_resolve.clone();
                }
                let substituted = self.resolve_variable(context, declaring, variable);
                if &substituted == to_resolve {
                    return substituted;
                }
                visiting.insert(variable.clone());
                let resolved = self.resolve_guarded(context, declaring, &substituted, visiting);
                visiting.remove(variable);
                resolved
            }
            TypeDescriptor::ArrayOf(component) => TypeDescriptor::array_of(self.resolve_guarded(
                context, declaring, component, visiting,
            )),
            TypeDescriptor::Parameterized(p) => {
                let owner = p
                    .owner()
                    .map(|owner| self.resolve_guarded(context, declaring, owner, visiting));
                let args: Vec<_> = p
                    .args()
                    .iter()
                    .map(|arg| self.resolve_guarded(context, declaring, arg, visiting))
                    .collect();
                TypeDescriptor::parameterized_with_owner(owner, p.raw().clone(), args)
            }
            TypeDescriptor::Wildcard(w) => match w.lower() {
                Some(lower) => TypeDescriptor::supertype_of(
                    self.resolve_guarded(context, declaring, lower, visiting),
                ),
                None => TypeDescriptor::subtype_of(
                    self.resolve_guarded(context, declaring, w.upper(), visiting),
                ),
            },
        }
    }

    /// The declared supertype of `raw` whose raw type is `target`, still
    /// expressed in the variables of whichever type declared it.
    ///
    /// Interfaces are searched first (exact match before indirect), then the
    /// superclass chain.
    fn generic_supertype(
        &self,
        context: &TypeDescriptor,
        raw: &TypeKey,
        target: &TypeKey,
        seen: &mut HashSet<TypeKey>,
    ) -> TypeDescriptor {
        if raw == target {
            return context.clone();
        }
        let fallback = || TypeDescriptor::Plain(target.clone());

        if !seen.insert(raw.clone()) {
            return fallback();
        }
        let Some(decl) = self.hierarchy.get(raw) else {
            return fallback();
        };

        // Any `implements` entry counts, declared as an interface or not.
        if let Some(exact) = decl
            .interfaces()
            .iter()
            .find(|iface| iface.raw_key() == Some(target))
        {
            return exact.clone();
        }
        for iface in decl.interfaces() {
            if let Some(key) = iface.raw_key() {
                if self.hierarchy.is_subtype(key, target) {
                    return self.generic_supertype(iface, key, target, seen);
                }
            }
        }

        if decl.kind() == TypeKind::Class {
            if let Some(superclass) = decl.superclass() {
                if let Some(key) = superclass.raw_key() {
                    if key == target {
                        return superclass.clone();
                    }
                    if self.hierarchy.is_subtype(key, target) {
                        return self.generic_supertype(superclass, key, target, seen);
                    }
                }
            }
        }

        fallback()
    }
}
