use std::any::TypeId;

/// The tag a constructor is stored under.
///
/// Registering a constructor for `T` fills both `Single(T)` and
/// `SequenceOf(T)`; the sequence entry is a table row of its own, not a
/// generic instantiation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeKey {
    Single(TypeId),
    SequenceOf(TypeId),
}

impl TypeKey {
    pub fn of<T: 'static>() -> Self {
        Self::Single(TypeId::of::<T>())
    }

    pub fn sequence_of<T: 'static>() -> Self {
        Self::SequenceOf(TypeId::of::<T>())
    }
}
