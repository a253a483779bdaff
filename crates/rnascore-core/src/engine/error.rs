use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScoreError {
    #[error(
        "Point set dimension mismatch: predicted has {predicted} point(s), reference has {reference}"
    )]
    DimensionMismatch { predicted: usize, reference: usize },

    #[error("Invalid normalization length: {0} (must be a positive, finite number)")]
    InvalidLength(f64),

    #[error("Invalid d0 floor: {0} (must be a positive, finite number)")]
    InvalidD0Floor(f64),

    #[error(
        "No valid chain assignment: none of the {predicted_chains} predicted and {reference_chains} reference chain(s) have matching lengths"
    )]
    NoValidAssignment {
        predicted_chains: usize,
        reference_chains: usize,
    },

    #[error("Cannot evaluate an empty ensemble")]
    EmptyEnsemble,
}

impl ScoreError {
    pub(crate) fn check_lengths(predicted: usize, reference: usize) -> Result<(), ScoreError> {
        if predicted != reference || predicted == 0 {
            return Err(ScoreError::DimensionMismatch {
                predicted,
                reference,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_lengths_accepts_equal_non_empty_sets() {
        assert!(ScoreError::check_lengths(10, 10).is_ok());
        assert!(ScoreError::check_lengths(1, 1).is_ok());
    }

    #[test]
    fn check_lengths_rejects_unequal_sets() {
        assert_eq!(
            ScoreError::check_lengths(50, 51),
            Err(ScoreError::DimensionMismatch {
                predicted: 50,
                reference: 51
            })
        );
    }

    #[test]
    fn check_lengths_rejects_empty_sets() {
        assert!(matches!(
            ScoreError::check_lengths(0, 0),
            Err(ScoreError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn display_messages_name_the_offending_sizes() {
        let err = ScoreError::DimensionMismatch {
            predicted: 3,
            reference: 4,
        };
        let msg = err.to_string();
        assert!(msg.contains('3') && msg.contains('4'));
    }
}
