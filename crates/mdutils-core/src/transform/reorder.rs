use super::dictionary::RenumberDict;
use crate::error::InvalidDataError;

/// A permutation of `1..=n` positions built from a partial mapping.
///
/// Every dictionary key moves to the position it maps to. The remaining
/// items keep their relative order and fill the positions nobody claimed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reorder {
    /// `new_to_old[new] = old`, both zero-based.
    new_to_old: Vec<usize>,
    old_to_new: Vec<usize>,
}

impl Reorder {
    pub fn identity(n: usize) -> Self {
        Self {
            new_to_old: (0..n).collect(),
            old_to_new: (0..n).collect(),
        }
    }

    pub fn from_dict(dict: &RenumberDict, n: usize) -> Result<Self, InvalidDataError> {
        let in_range = |id: i64| id >= 1 && (id as usize) <= n;
        let mut slots: Vec<Option<usize>> = vec![None; n];
        let mut moved = vec![false; n];

        for (old, new) in dict.iter() {
            if !in_range(old) || !in_range(new) {
                return Err(InvalidDataError::new(format!(
                    "reorder pair {} -> {} is outside the range 1..={}",
                    old, new, n
                )));
            }
            let slot = &mut slots[new as usize - 1];
            if let Some(other) = slot {
                return Err(InvalidDataError::new(format!(
                    "both {} and {} are moved to position {}",
                    *other + 1,
                    old,
                    new
                )));
            }
            *slot = Some(old as usize - 1);
            moved[old as usize - 1] = true;
        }

        let mut remaining = (0..n).filter(|&old| !moved[old]);
        let new_to_old: Vec<usize> = slots
            .into_iter()
            .map(|slot| slot.or_else(|| remaining.next()))
            .collect::<Option<_>>()
            .ok_or_else(|| InvalidDataError::new("reorder left a position unfilled"))?;

        let mut old_to_new = vec![0; n];
        for (new, &old) in new_to_old.iter().enumerate() {
            old_to_new[old] = new;
        }
        Ok(Self {
            new_to_old,
            old_to_new,
        })
    }

    pub fn len(&self) -> usize {
        self.new_to_old.len()
    }

    pub fn is_empty(&self) -> bool {
        self.new_to_old.is_empty()
    }

    /// The one-based position that one-based `old` moves to.
    pub fn new_id(&self, old: i64) -> Option<i64> {
        let idx = usize::try_from(old).ok()?.checked_sub(1)?;
        self.old_to_new.get(idx).map(|&new| new as i64 + 1)
    }

    /// Rearranges `items` so that `result[new] == items[old]`.
    pub fn apply<T: Clone>(&self, items: &[T]) -> Vec<T> {
        self.new_to_old.iter().map(|&old| items[old].clone()).collect()
    }

    /// The complete old-id to new-id mapping, for renumbering references.
    pub fn id_map(&self) -> RenumberDict {
        self.old_to_new
            .iter()
            .enumerate()
            .map(|(old, &new)| (old as i64 + 1, new as i64 + 1))
            .collect()
    }
}
