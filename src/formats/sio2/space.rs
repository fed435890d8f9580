use glam::Vec3A;

/// Remaps a position or normal vector from the source package's right-handed
/// Y-up space into the engine's coordinate system.
///
/// Every vector-valued output of the exporter goes through this mapping (or
/// [`to_target_direction`] for axis directions); skipping it at a single
/// call site would produce a scene with mixed handedness.
pub fn to_target_point(v: Vec3A) -> Vec3A {
    Vec3A::new(v.x, -v.z, v.y)
}

/// Remaps an axis direction. Directions take an extra negation on X to
/// preserve handedness across the axis permutation.
pub fn to_target_direction(v: Vec3A) -> Vec3A {
    Vec3A::new(-v.x, v.z, -v.y)
}

/// The inverse of [`to_target_point`].
pub fn from_target_point(v: Vec3A) -> Vec3A {
    Vec3A::new(v.x, v.z, -v.y)
}

pub fn to_degrees(angle: f32) -> f32 {
    180. * (angle / std::f32::consts::PI)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn point_mapping_inverts() {
        let v = Vec3A::new(1.5, -2., 0.25);

        assert_eq!(v, from_target_point(to_target_point(v)));
        assert_eq!(v, to_target_point(from_target_point(v)));
    }

    #[test]
    fn direction_mapping_negates_x() {
        let v = Vec3A::new(1., 2., 3.);

        assert_eq!(Vec3A::new(-1., 3., -2.), to_target_direction(v));
    }

    #[test]
    fn radians_to_degrees() {
        assert_eq!(180., to_degrees(std::f32::consts::PI));
        assert_eq!(90., to_degrees(std::f32::consts::FRAC_PI_2));
    }
}
