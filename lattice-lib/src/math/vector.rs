use glam::{DVec3, IVec3};

/// Extensions for [`IVec3`] that compute lengths and distances in `f64`.
///
/// The squared length of an [`IVec3`] can easily exceed [`i32::MAX`], so unlike
/// [`IVec3::length_squared`] these never overflow.
pub trait Vec3IExt {
    fn length_squared_f64(self) -> f64;

    fn length_f64(self) -> f64;

    /// The squared euclidean distance between `self` and `other`.
    fn distance_squared_to(self, other: IVec3) -> f64;

    /// The euclidean distance between `self` and `other`.
    fn distance_to(self, other: IVec3) -> f64;
}

impl Vec3IExt for IVec3 {
    fn length_squared_f64(self) -> f64 {
        self.as_dvec3().length_squared()
    }

    fn length_f64(self) -> f64 {
        self.length_squared_f64().sqrt()
    }

    fn distance_squared_to(self, other: IVec3) -> f64 {
        (other.as_dvec3() - self.as_dvec3()).length_squared()
    }

    fn distance_to(self, other: IVec3) -> f64 {
        self.distance_squared_to(other).sqrt()
    }
}

/// Converts `vec` to an [`IVec3`] by rounding each component towards negative infinity.
///
/// Components outside the range of [`i32`] saturate and `NaN` becomes `0`.
pub fn floored(vec: DVec3) -> IVec3 {
    vec.floor().as_ivec3()
}
