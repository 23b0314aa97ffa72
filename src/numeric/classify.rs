//! Classification of a located zero from its interpolated 2x2 Jacobian.

use crate::data::feature::FeatureType;

/// Classify from a Jacobian `j` (row-major).
///
/// With `symmetric` the matrix is read as a Hessian: the feature is a
/// critical point of a scalar field (min, max, saddle). Otherwise it is a
/// fixed point of a vector field, classified by trace, determinant and
/// discriminant.
pub fn classify_jacobian(j: [[f64; 2]; 2], symmetric: bool) -> FeatureType {
    if j.iter().flatten().any(|v| !v.is_finite()) {
        return FeatureType::Degenerate;
    }
    let det = j[0][0] * j[1][1] - j[0][1] * j[1][0];
    let tr = j[0][0] + j[1][1];

    if symmetric {
        return if det < 0.0 {
            FeatureType::Saddle
        } else if det > 0.0 && tr > 0.0 {
            FeatureType::Minimum
        } else if det > 0.0 && tr < 0.0 {
            FeatureType::Maximum
        } else {
            FeatureType::Degenerate
        };
    }

    if det < 0.0 {
        return FeatureType::Saddle;
    }
    if det == 0.0 {
        return FeatureType::Degenerate;
    }
    let disc = tr * tr - 4.0 * det;
    if disc >= 0.0 {
        if tr > 0.0 {
            FeatureType::Repelling
        } else if tr < 0.0 {
            FeatureType::Attracting
        } else {
            FeatureType::Degenerate
        }
    } else if tr > 0.0 {
        FeatureType::RepellingFocus
    } else if tr < 0.0 {
        FeatureType::AttractingFocus
    } else {
        FeatureType::Center
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hessians() {
        assert_eq!(classify_jacobian([[2.0, 0.0], [0.0, 1.0]], true), FeatureType::Minimum);
        assert_eq!(classify_jacobian([[-2.0, 0.0], [0.0, -1.0]], true), FeatureType::Maximum);
        assert_eq!(classify_jacobian([[1.0, 0.0], [0.0, -1.0]], true), FeatureType::Saddle);
        assert_eq!(classify_jacobian([[1.0, 1.0], [1.0, 1.0]], true), FeatureType::Degenerate);
    }

    #[test]
    fn vector_fields() {
        assert_eq!(classify_jacobian([[1.0, 0.0], [0.0, 2.0]], false), FeatureType::Repelling);
        assert_eq!(classify_jacobian([[-1.0, 0.0], [0.0, -2.0]], false), FeatureType::Attracting);
        assert_eq!(classify_jacobian([[0.0, -1.0], [1.0, 0.0]], false), FeatureType::Center);
        assert_eq!(
            classify_jacobian([[0.1, -1.0], [1.0, 0.1]], false),
            FeatureType::RepellingFocus
        );
        assert_eq!(
            classify_jacobian([[-0.1, -1.0], [1.0, -0.1]], false),
            FeatureType::AttractingFocus
        );
        assert_eq!(classify_jacobian([[1.0, 0.0], [0.0, -1.0]], false), FeatureType::Saddle);
        assert_eq!(classify_jacobian([[f64::NAN, 0.0], [0.0, 1.0]], false), FeatureType::Degenerate);
    }
}
