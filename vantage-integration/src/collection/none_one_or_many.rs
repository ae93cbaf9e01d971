use serde::{Deserialize, Serialize};

/// Like [`super::one_or_many::OneOrMany`], but also representable as empty.
///
/// Used where a collection may legitimately be absent (e.g. a gateway
/// response with no open orders) rather than forcing callers to unwrap an
/// `Option<OneOrMany<T>>`.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
pub enum NoneOneOrMany<T> {
    None,
    One(T),
    Many(Vec<T>),
}

impl<T> Default for NoneOneOrMany<T> {
    fn default() -> Self {
        Self::None
    }
}

impl<T> NoneOneOrMany<T> {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::None)
    }

    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::None => Vec::new(),
            Self::One(item) => vec![item],
            Self::Many(items) => items,
        }
    }
}

impl<T> FromIterator<T> for NoneOneOrMany<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut collection = iter.into_iter().collect::<Vec<_>>();
        match collection.len() {
            0 => Self::None,
            1 => Self::One(collection.swap_remove(0)),
            _ => Self::Many(collection),
        }
    }
}
