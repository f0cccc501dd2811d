use stash_types::Value;

/// Outcome of resolving a stored value against a requested type `T`.
///
/// `Raw` carries the stored structure untouched: a primitive, or a mapping
/// or sequence for which no constructor was registered. Callers match on
/// the variant instead of relying on an unchecked cast.
#[derive(Clone, Debug, PartialEq)]
pub enum Resolved<T> {
    /// A mapping reconstructed by the constructor registered for `T`.
    Typed(T),
    /// A sequence reconstructed element-wise by the constructor for `T`.
    TypedSequence(Vec<T>),
    /// The stored value, not reconstructed.
    Raw(Value),
}

impl<T> Resolved<T> {
    pub fn typed(self) -> Option<T> {
        match self {
            Self::Typed(value) => Some(value),
            _ => None,
        }
    }

    pub fn sequence(self) -> Option<Vec<T>> {
        match self {
            Self::TypedSequence(values) => Some(values),
            _ => None,
        }
    }

    pub fn raw(self) -> Option<Value> {
        match self {
            Self::Raw(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, Self::Raw(_))
    }
}
