use super::models::PointSet;
use crate::engine::error::ScoreError;
use nalgebra::{Matrix3, Point3, Rotation3, Vector3};

const SVD_EPSILON: f64 = 1e-12;
const SVD_MAX_ITERATIONS: usize = 1000;
const DEGENERATE_SPREAD: f64 = 1e-12;

/// Rigid transform mapping a predicted point set onto its reference, plus the
/// transformed prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct Alignment {
    pub rotation: Rotation3<f64>,
    pub translation: Vector3<f64>,
    pub aligned: PointSet,
}

impl Alignment {
    #[inline]
    pub fn transform_point(&self, point: &Point3<f64>) -> Point3<f64> {
        self.rotation * point + self.translation
    }

    /// Applies the fitted rotation and translation to an arbitrary point set.
    pub fn apply(&self, points: &[Point3<f64>]) -> PointSet {
        points.iter().map(|p| self.transform_point(p)).collect()
    }

    /// Per-index Euclidean distances between the aligned prediction and `reference`.
    pub fn distances_to(&self, reference: &[Point3<f64>]) -> Vec<f64> {
        self.aligned
            .iter()
            .zip(reference.iter())
            .map(|(a, r)| (a - r).norm())
            .collect()
    }
}

pub fn centroid(points: &[Point3<f64>]) -> Option<Point3<f64>> {
    if points.is_empty() {
        return None;
    }
    let sum: Vector3<f64> = points.iter().map(|p| p.coords).sum();
    Some(Point3::from(sum / points.len() as f64))
}

/// Least-squares rigid superposition (Kabsch) of `predicted` onto `reference`.
///
/// The rotation is always proper: when the best orthogonal map is a reflection the
/// column of `V` paired with the smallest singular value is negated. Single points,
/// coincident points or a non-converging SVD fall back to the identity rotation with a
/// centroid-to-centroid translation.
///
/// # Errors
///
/// Returns [`ScoreError::DimensionMismatch`] if the sets differ in length or are empty.
pub fn align(predicted: &[Point3<f64>], reference: &[Point3<f64>]) -> Result<Alignment, ScoreError> {
    let (rotation, translation) = calculate_transformation(predicted, reference)?;
    let aligned = predicted
        .iter()
        .map(|p| rotation * p + translation)
        .collect();

    Ok(Alignment {
        rotation,
        translation,
        aligned,
    })
}

pub fn calculate_transformation(
    predicted: &[Point3<f64>],
    reference: &[Point3<f64>],
) -> Result<(Rotation3<f64>, Vector3<f64>), ScoreError> {
    ScoreError::check_lengths(predicted.len(), reference.len())?;

    // Both are Some: the sets are non-empty after the length check.
    let (Some(pred_centroid), Some(ref_centroid)) = (centroid(predicted), centroid(reference))
    else {
        return Err(ScoreError::DimensionMismatch {
            predicted: predicted.len(),
            reference: reference.len(),
        });
    };

    let centered_pred: Vec<_> = predicted.iter().map(|p| p - pred_centroid).collect();
    let centered_ref: Vec<_> = reference.iter().map(|q| q - ref_centroid).collect();

    let spread: f64 = centered_pred
        .iter()
        .chain(centered_ref.iter())
        .map(|v| v.norm_squared())
        .sum();

    let rotation = if spread <= DEGENERATE_SPREAD {
        Rotation3::identity()
    } else {
        let h = centered_pred
            .iter()
            .zip(centered_ref.iter())
            .fold(Matrix3::zeros(), |acc, (p, q)| acc + p * q.transpose());
        optimal_rotation(h).unwrap_or_else(Rotation3::identity)
    };

    let translation = ref_centroid.coords - rotation * pred_centroid.coords;
    Ok((rotation, translation))
}

/// Proper rotation `R = V Uᵀ` maximizing `trace(R H)` for `H = U Σ Vᵀ`.
fn optimal_rotation(h: Matrix3<f64>) -> Option<Rotation3<f64>> {
    let svd = h.try_svd(true, true, SVD_EPSILON, SVD_MAX_ITERATIONS)?;
    let u = svd.u?;
    let mut v = svd.v_t?.transpose();

    let mut r = v * u.transpose();
    if r.determinant() < 0.0 {
        let smallest = svd.singular_values.imin();
        v.column_mut(smallest).neg_mut();
        r = v * u.transpose();
    }

    Some(Rotation3::from_matrix_unchecked(r))
}
