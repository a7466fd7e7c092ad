use core::fmt;
use core::num::NonZeroU32;

/// Identifier of a feature within its layer, or of a derived object
/// (simplification group) within one run.
///
/// Stored as `index + 1` so `Option<Id>` costs nothing extra. Ids order
/// by index; every deterministic tie-break on features relies on that.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Id(NonZeroU32);

impl Id {
    /// Id for the 0-based slot `index`. `u32::MAX` saturates onto the
    /// last representable id.
    pub fn from_index(index: u32) -> Self {
        Self(NonZeroU32::MIN.saturating_add(index))
    }

    pub fn index(self) -> u32 {
        self.0.get() - 1
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index())
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

pub type FeatureId = Id;
pub type GroupId = Id;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_survives_storage_offset() {
        for i in [0_u32, 3, 999, u32::MAX - 1] {
            assert_eq!(Id::from_index(i).index(), i);
        }
    }

    #[test]
    fn ordering_follows_index() {
        let mut ids = vec![Id::from_index(9), Id::from_index(0), Id::from_index(4)];
        ids.sort();
        let idx: Vec<u32> = ids.into_iter().map(Id::index).collect();
        assert_eq!(idx, vec![0, 4, 9]);
    }

    #[test]
    fn optional_feature_id_has_no_overhead() {
        assert_eq!(
            core::mem::size_of::<FeatureId>(),
            core::mem::size_of::<Option<FeatureId>>()
        );
    }

    #[test]
    fn formatting() {
        let id = Id::from_index(12);
        assert_eq!(format!("{id}"), "12");
        assert_eq!(format!("{id:?}"), "#12");
    }
}
