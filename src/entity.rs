//! Arena storage for IR entities.
//!
//! Functions, globals, blocks and instructions live in `EntityVec`s
//! and are referred to by small copyable handles (`Func`, `Inst`, ...)
//! declared with `declare_entity!`. Arenas only grow, so a handle is
//! never invalidated by inserting other entities, including
//! instructions inserted ahead of it in a block.

use std::fmt::Debug;
use std::hash::Hash;
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

/// A typed index into an `EntityVec`.
pub trait EntityRef: Copy + Eq + Ord + Hash + Debug {
    fn new(index: usize) -> Self;
    fn index(self) -> usize;
}

/// Declare a `u32` handle type. `$prefix` is used when printing it,
/// e.g. `func3`.
#[macro_export]
macro_rules! declare_entity {
    ($name:ident, $prefix:literal) => {
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u32);

        impl $crate::entity::EntityRef for $name {
            fn new(index: usize) -> Self {
                assert!(index < u32::MAX as usize, "too many {}s", $prefix);
                $name(index as u32)
            }
            fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "{}{}", $prefix, self.0)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                std::fmt::Debug::fmt(self, f)
            }
        }
    };
}

#[derive(Clone, Debug)]
pub struct EntityVec<Idx: EntityRef, T> {
    items: Vec<T>,
    _idx: PhantomData<Idx>,
}

impl<Idx: EntityRef, T> Default for EntityVec<Idx, T> {
    fn default() -> Self {
        EntityVec {
            items: vec![],
            _idx: PhantomData,
        }
    }
}

impl<Idx: EntityRef, T> EntityVec<Idx, T> {
    /// Store `item`, returning its handle.
    pub fn push(&mut self, item: T) -> Idx {
        let idx = Idx::new(self.items.len());
        self.items.push(item);
        idx
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Handles in creation order.
    pub fn iter(&self) -> impl Iterator<Item = Idx> {
        (0..self.items.len()).map(Idx::new)
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn entries(&self) -> impl Iterator<Item = (Idx, &T)> {
        self.items
            .iter()
            .enumerate()
            .map(|(i, item)| (Idx::new(i), item))
    }
}

impl<Idx: EntityRef, T> Index<Idx> for EntityVec<Idx, T> {
    type Output = T;
    fn index(&self, idx: Idx) -> &T {
        &self.items[idx.index()]
    }
}

impl<Idx: EntityRef, T> IndexMut<Idx> for EntityVec<Idx, T> {
    fn index_mut(&mut self, idx: Idx) -> &mut T {
        &mut self.items[idx.index()]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    declare_entity!(Thing, "thing");

    #[test]
    fn handles_are_stable() {
        let mut things: EntityVec<Thing, &str> = EntityVec::default();
        let a = things.push("a");
        let b = things.push("b");
        assert_eq!(things[a], "a");
        things[b] = "c";
        assert_eq!(things.values().copied().collect::<Vec<_>>(), vec!["a", "c"]);
        assert_eq!(things.iter().collect::<Vec<_>>(), vec![a, b]);
        assert_eq!(format!("{} {:?}", a, b), "thing0 thing1");
    }
}
