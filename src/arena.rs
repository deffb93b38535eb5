//! Generational arenas. Handles stay valid across insertions and removals of
//! other entries; a handle to a removed entry goes stale instead of dangling.

use std::{fmt, marker::PhantomData};

#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct RawId {
    index: u32,
    version: u32,
}

impl fmt::Display for RawId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.version)
    }
}

pub trait ArenaId: Copy + Eq {
    fn from_raw(raw: RawId) -> Self;
    fn raw(self) -> RawId;
}

struct Slot<T> {
    version: u32,
    value: Option<T>,
}

pub struct Arena<H, T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
    _phantom: PhantomData<H>,
}

impl<H, T> Default for Arena<H, T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
            _phantom: PhantomData,
        }
    }
}

impl<H: ArenaId, T> Arena<H, T> {
    pub fn insert(&mut self, value: T) -> H {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            H::from_raw(RawId {
                index,
                version: slot.version,
            })
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                version: 0,
                value: Some(value),
            });
            H::from_raw(RawId { index, version: 0 })
        }
    }

    pub fn remove(&mut self, id: H) -> Option<T> {
        let raw = id.raw();
        let slot = self.slots.get_mut(raw.index as usize)?;
        if slot.version != raw.version || slot.value.is_none() {
            return None;
        }
        let value = slot.value.take();
        slot.version = slot.version.wrapping_add(1);
        self.free.push(raw.index);
        self.len -= 1;
        value
    }

    pub fn get(&self, id: H) -> Option<&T> {
        let raw = id.raw();
        let slot = self.slots.get(raw.index as usize)?;
        if slot.version != raw.version {
            return None;
        }
        slot.value.as_ref()
    }

    pub fn get_mut(&mut self, id: H) -> Option<&mut T> {
        let raw = id.raw();
        let slot = self.slots.get_mut(raw.index as usize)?;
        if slot.version != raw.version {
            return None;
        }
        slot.value.as_mut()
    }

    pub fn contains(&self, id: H) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (H, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value.as_ref().map(|v| {
                (
                    H::from_raw(RawId {
                        index: index as u32,
                        version: slot.version,
                    }),
                    v,
                )
            })
        })
    }

    /// Snapshot of all live handles. Used where the caller mutates the arena
    /// while walking it.
    pub fn ids(&self) -> Vec<H> {
        self.iter().map(|(id, _)| id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    arena_ids!(TestId);

    #[test]
    fn stale_handle_after_remove() {
        let mut arena: Arena<TestId, u32> = Default::default();
        let a = arena.insert(1);
        let b = arena.insert(2);
        assert_eq!(arena.remove(a), Some(1));
        assert!(!arena.contains(a));
        assert_eq!(arena.get(a), None);
        assert_eq!(arena.remove(a), None);
        assert_eq!(arena.get(b), Some(&2));
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn slot_reuse_bumps_version() {
        let mut arena: Arena<TestId, u32> = Default::default();
        let a = arena.insert(1);
        arena.remove(a);
        let b = arena.insert(3);
        assert_eq!(a.raw().index, b.raw().index);
        assert_ne!(a, b);
        assert_eq!(arena.get(a), None);
        assert_eq!(arena.get(b), Some(&3));
    }

    #[test]
    fn ids_snapshot() {
        let mut arena: Arena<TestId, u32> = Default::default();
        let a = arena.insert(1);
        let b = arena.insert(2);
        let ids = arena.ids();
        assert_eq!(ids, vec![a, b]);
    }
}
