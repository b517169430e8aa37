use std::cmp::Ordering;
use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::rc::Rc;

/// The name of the root type every other type derives from.
pub const ROOT_TYPE_NAME: &str = "object";

#[derive(Debug, PartialEq, Eq, Hash)]
struct TypeData {
    name: String,
    supertype: Option<Type>,
}

/// A node in the single-rooted subtype hierarchy.
///
/// Types are cheap to clone (the underlying data is shared) and compare by
/// structure, so two independently built hierarchies with the same names are
/// equal. The root type is [`Type::root`]; every other type is created with
/// [`Type::new_subtype`] and keeps a handle on its immediate supertype.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Type(Rc<TypeData>);

impl Type {
    /// Returns the root of the type hierarchy.
    pub fn root() -> Self {
        Type(Rc::new(TypeData {
            name: ROOT_TYPE_NAME.to_string(),
            supertype: None,
        }))
    }

    /// Builds a new type under the given supertype.
    pub fn new_subtype(name: &str, supertype: &Type) -> Self {
        Type(Rc::new(TypeData {
            name: name.to_string(),
            supertype: Some(supertype.clone()),
        }))
    }

    /// Returns the name of the type.
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Returns the immediate supertype, or `None` for the root type.
    pub fn supertype(&self) -> Option<&Type> {
        self.0.supertype.as_ref()
    }

    /// Returns `true` iff `other` is equal to this type or derives from it.
    pub fn has_subtype(&self, other: &Type) -> bool {
        let mut candidate = Some(other);
        while let Some(t) = candidate {
            if t == self {
                return true;
            }
            candidate = t.supertype();
        }
        false
    }

    /// Iterates over this type and all its ancestors, root last.
    pub fn iter_with_ancestors(&self) -> impl Iterator<Item = &Type> {
        std::iter::successors(Some(self), |t| t.supertype())
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The trait shared by the two kinds of typed symbols literals range over.
///
/// A term has a name, a type, and the value semantics (equality, hashing,
/// ordering) that allow it to be used as a map key throughout the encoder.
pub trait Term: Clone + Debug + Display + Eq + Hash + Ord {
    /// Returns the name of the term.
    fn name(&self) -> &str;

    /// Returns the type of the term.
    fn term_type(&self) -> &Type;
}

macro_rules! impl_symbol {
    ($t: ident, $doc: expr) => {
        #[doc = $doc]
        #[derive(Clone, Debug, PartialEq, Eq, Hash)]
        pub struct $t {
            name: String,
            tp: Type,
        }

        impl $t {
            /// Builds a new symbol given its name and type.
            pub fn new(name: &str, tp: Type) -> Self {
                Self {
                    name: name.to_string(),
                    tp,
                }
            }
        }

        impl Term for $t {
            fn name(&self) -> &str {
                &self.name
            }

            fn term_type(&self) -> &Type {
                &self.tp
            }
        }

        impl Display for $t {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.name)
            }
        }

        impl PartialOrd for $t {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        impl Ord for $t {
            fn cmp(&self, other: &Self) -> Ordering {
                self.name
                    .cmp(&other.name)
                    .then_with(|| self.tp.name().cmp(other.tp.name()))
            }
        }
    };
}

impl_symbol!(
    Variable,
    "A typed plan variable, ranging over the constants of its type."
);
impl_symbol!(Constant, "A typed ground value.");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_has_subtype_of_chain() {
        let root = Type::root();
        let vehicle = Type::new_subtype("vehicle", &root);
        let truck = Type::new_subtype("truck", &vehicle);
        assert!(root.has_subtype(&truck));
        assert!(vehicle.has_subtype(&truck));
        assert!(truck.has_subtype(&truck));
        assert!(!truck.has_subtype(&vehicle));
    }

    #[test]
    fn test_unrelated_types() {
        let root = Type::root();
        let vehicle = Type::new_subtype("vehicle", &root);
        let place = Type::new_subtype("place", &root);
        assert!(!vehicle.has_subtype(&place));
        assert!(!place.has_subtype(&vehicle));
    }

    #[test]
    fn test_structural_equality() {
        let root = Type::root();
        let t1 = Type::new_subtype("vehicle", &root);
        let t2 = Type::new_subtype("vehicle", &Type::root());
        assert_eq!(t1, t2);
    }

    #[test]
    fn test_ancestors() {
        let root = Type::root();
        let vehicle = Type::new_subtype("vehicle", &root);
        let truck = Type::new_subtype("truck", &vehicle);
        let names: Vec<&str> = truck.iter_with_ancestors().map(Type::name).collect();
        assert_eq!(vec!["truck", "vehicle", "object"], names);
    }

    #[test]
    fn test_variable_ordering_by_name() {
        let root = Type::root();
        let v1 = Variable::new("a", root.clone());
        let v2 = Variable::new("b", root);
        assert!(v1 < v2);
    }

    #[test]
    fn test_symbol_display() {
        let c = Constant::new("truck1", Type::root());
        assert_eq!("truck1", c.to_string());
        assert_eq!("object", c.term_type().to_string());
    }
}
