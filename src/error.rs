//! Recoverable errors. Not-found results are `None`/`false`, never errors.

use hashbrown::TryReserveError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScoreMapError {
    #[error("capacity overflow while reserving {requested} additional entries")]
    CapacityOverflow { requested: usize },

    #[error("allocation of {layout_size} bytes failed while reserving {requested} additional entries")]
    AllocFailed { requested: usize, layout_size: usize },
}

impl ScoreMapError {
    pub(crate) fn from_reserve(requested: usize, err: TryReserveError) -> Self {
        match err {
            TryReserveError::CapacityOverflow => ScoreMapError::CapacityOverflow { requested },
            TryReserveError::AllocError { layout } => ScoreMapError::AllocFailed {
                requested,
                layout_size: layout.size(),
            },
        }
    }
}

pub type Result<T, E = ScoreMapError> = core::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_maps_and_displays() {
        let e = ScoreMapError::from_reserve(usize::MAX, TryReserveError::CapacityOverflow);
        assert_eq!(e, ScoreMapError::CapacityOverflow { requested: usize::MAX });
        assert!(e.to_string().contains("capacity overflow"));
    }
}
