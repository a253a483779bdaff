//! Coordinate containers consumed by the superposition and scoring code.
//!
//! A point set is an ordered slice of C1' coordinates, one per residue, in Ångströms.
//! Two point sets are compared position by position; nothing here ever reorders them.

pub mod chain_set;

use nalgebra::Point3;

/// One representative atom per residue, in sequence order.
pub type PointSet = Vec<Point3<f64>>;

/// Element-wise mean of several equally sized point sets.
///
/// Returns `None` when `sets` is empty or the sets disagree in length.
pub fn average_point_set(sets: &[PointSet]) -> Option<PointSet> {
    let first = sets.first()?;
    let len = first.len();
    if sets.iter().any(|s| s.len() != len) {
        return None;
    }

    let n = sets.len() as f64;
    let averaged = (0..len)
        .map(|i| {
            let sum = sets
                .iter()
                .fold(nalgebra::Vector3::zeros(), |acc, s| acc + s[i].coords);
            Point3::from(sum / n)
        })
        .collect();
    Some(averaged)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_of_two_sets_is_midpoint() {
        let a = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 2.0, 2.0)];
        let b = vec![Point3::new(2.0, 0.0, 0.0), Point3::new(4.0, 2.0, 0.0)];

        let avg = average_point_set(&[a, b]).unwrap();

        assert_eq!(avg[0], Point3::new(1.0, 0.0, 0.0));
        assert_eq!(avg[1], Point3::new(3.0, 2.0, 1.0));
    }

    #[test]
    fn average_of_empty_collection_is_none() {
        assert!(average_point_set(&[]).is_none());
    }

    #[test]
    fn average_of_ragged_sets_is_none() {
        let a = vec![Point3::origin(); 3];
        let b = vec![Point3::origin(); 4];
        assert!(average_point_set(&[a, b]).is_none());
    }
}
