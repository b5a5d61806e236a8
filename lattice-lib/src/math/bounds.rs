use std::ops::{Add, AddAssign, Sub, SubAssign};

use glam::{DVec3, IVec3};
use itertools::iproduct;

use super::axis::Axis3;

/// Integer axis-aligned bounds in 3D-space.
///
/// Covers every point `p` with `origin <= p < origin + lengths` on all axes. The upper corner is
/// computed with 64-bit arithmetic, so bounds reaching past [`i32::MAX`] behave as expected, they
/// simply cover fewer representable points.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub struct IBounds3 {
    /// The inclusive lower corner of the bounds.
    origin: IVec3,
    /// The side lengths of the bounds; never negative.
    lengths: IVec3,
}

impl IBounds3 {
    /// Constructs [`IBounds3`] from the given `origin` and `lengths`.
    ///
    /// # Panics
    ///
    /// Panics if any of the `lengths` is negative.
    pub const fn new(origin: IVec3, lengths: IVec3) -> Self {
        if let Some(bounds) = Self::checked_new(origin, lengths) {
            bounds
        } else {
            panic!("lengths must not be negative");
        }
    }

    /// Constructs [`IBounds3`] from the given `origin` and `lengths`.
    ///
    /// Returns [`None`] if any of the `lengths` is negative.
    pub const fn checked_new(origin: IVec3, lengths: IVec3) -> Option<Self> {
        if lengths.x >= 0 && lengths.y >= 0 && lengths.z >= 0 {
            Some(Self { origin, lengths })
        } else {
            None
        }
    }

    /// Constructs the [`IBounds3`] spanned between two opposite corners.
    ///
    /// The corners may be given in any order. The greater corner is exclusive.
    ///
    /// Returns [`None`] if the distance between the corners does not fit in an [`i32`].
    pub fn from_corners(a: IVec3, b: IVec3) -> Option<Self> {
        let origin = a.min(b);
        Self::checked_new(origin, a.max(b).wrapping_sub(origin))
    }

    /// Constructs new [`IBounds3`] covering the single given `point`.
    ///
    /// Note, that this does not return empty bounds at the given `point` but instead bounds with a
    /// size of `1x1x1`.
    pub const fn point(point: IVec3) -> Self {
        Self {
            origin: point,
            lengths: IVec3::ONE,
        }
    }

    /// The inclusive lower corner of the bounds.
    pub const fn origin(self) -> IVec3 {
        self.origin
    }

    pub const fn lengths(self) -> IVec3 {
        self.lengths
    }

    /// The exclusive upper corner of the bounds.
    ///
    /// Wraps around on axes where the bounds reach past [`i32::MAX`].
    pub fn max(self) -> IVec3 {
        self.origin.wrapping_add(self.lengths)
    }

    /// The number of points covered by the bounds.
    pub fn volume(self) -> u128 {
        let lengths = self.lengths.as_uvec3();
        u128::from(lengths.x) * u128::from(lengths.y) * u128::from(lengths.z)
    }

    pub fn center(self) -> DVec3 {
        self.origin.as_dvec3() + self.lengths.as_dvec3() / 2.0
    }

    /// Whether the [`IBounds3`] are empty along _any_ axis.
    ///
    /// I.e., not only `0x0x0` but also e.g. `0x1x2` is considered "empty".
    pub fn is_empty(self) -> bool {
        self.lengths.cmpeq(IVec3::ZERO).any()
    }

    pub fn contains(self, point: IVec3) -> bool {
        Axis3::ALL.into_iter().all(|axis| {
            let (lower, upper) = self.range(axis);
            let value = i64::from(point[axis]);
            lower <= value && value < upper
        })
    }

    /// Whether `self` and `other` have at least one point in common.
    pub fn overlaps(self, other: Self) -> bool {
        Axis3::ALL.into_iter().all(|axis| {
            let (lower, upper) = self.range(axis);
            let (other_lower, other_upper) = other.range(axis);
            lower < other_upper && other_lower < upper
        })
    }

    pub fn is_disjoint(self, other: Self) -> bool {
        !self.overlaps(other)
    }

    pub fn encloses(self, other: Self) -> bool {
        Axis3::ALL.into_iter().all(|axis| {
            let (lower, upper) = self.range(axis);
            let (other_lower, other_upper) = other.range(axis);
            lower <= other_lower && other_upper <= upper
        })
    }

    /// Moves the bounds by `delta` without changing their lengths.
    pub fn shift(self, delta: IVec3) -> Self {
        Self {
            origin: self.origin.wrapping_add(delta),
            lengths: self.lengths,
        }
    }

    /// Grows the bounds by `amount` in every direction.
    ///
    /// A negative `amount` shrinks the bounds instead. Returns [`None`] if that would make any of
    /// the lengths negative or if the lengths overflow.
    pub fn expand(self, amount: i32) -> Option<Self> {
        let twice = amount.checked_mul(2)?;
        let lengths = IVec3::new(
            self.lengths.x.checked_add(twice)?,
            self.lengths.y.checked_add(twice)?,
            self.lengths.z.checked_add(twice)?,
        );
        Self::checked_new(self.origin.wrapping_sub(IVec3::splat(amount)), lengths)
    }

    /// Grows the bounds in the direction of `delta`.
    ///
    /// Negative components move the origin, positive components extend past the upper corner.
    pub fn expand_directional(self, delta: IVec3) -> Self {
        Self {
            origin: self.origin.wrapping_add(delta.min(IVec3::ZERO)),
            lengths: self.lengths.saturating_add(saturating_abs(delta)),
        }
    }

    /// Shrinks the bounds from the direction of `delta`.
    ///
    /// The inverse of [`Self::expand_directional`]: negative components pull the origin up,
    /// positive components pull the upper corner down. Lengths stop at zero.
    pub fn shrink_directional(self, delta: IVec3) -> Self {
        let lengths = self.lengths.saturating_sub(saturating_abs(delta)).max(IVec3::ZERO);
        let removed = self.lengths - lengths;
        Self {
            origin: self
                .origin
                .wrapping_add(IVec3::select(delta.cmplt(IVec3::ZERO), removed, IVec3::ZERO)),
            lengths,
        }
    }

    /// Returns the smallest [`IBounds3`] enclosing all given `bounds`.
    ///
    /// Returns [`None`] if `bounds` is empty or the result would be too large.
    pub fn enclosing(bounds: impl IntoIterator<Item = Self>) -> Option<Self> {
        let mut bounds = bounds.into_iter();
        let first = bounds.next()?;
        let (lower, upper) = bounds.fold(
            (first.origin, first.max()),
            |(lower, upper), next| (lower.min(next.origin), upper.max(next.max())),
        );
        Self::from_corners(lower, upper)
    }

    /// Iterates over every point covered by the bounds.
    ///
    /// Points are ordered lexicographically by their X, Y and finally Z coordinate.
    pub fn iter(self) -> impl Iterator<Item = IVec3> {
        let origin = self.origin;
        iproduct!(0..self.lengths.x, 0..self.lengths.y, 0..self.lengths.z)
            .map(move |(x, y, z)| origin.wrapping_add(IVec3::new(x, y, z)))
    }

    pub fn as_dbounds3(self) -> DBounds3 {
        DBounds3 {
            origin: self.origin.as_dvec3(),
            lengths: self.lengths.as_dvec3(),
        }
    }

    /// The inclusive lower and exclusive upper limit along `axis`.
    fn range(self, axis: Axis3) -> (i64, i64) {
        let lower = i64::from(self.origin[axis]);
        (lower, lower + i64::from(self.lengths[axis]))
    }
}

impl AddAssign<IVec3> for IBounds3 {
    fn add_assign(&mut self, rhs: IVec3) {
        *self = self.shift(rhs);
    }
}

impl Add<IVec3> for IBounds3 {
    type Output = Self;

    fn add(mut self, rhs: IVec3) -> Self {
        self += rhs;
        self
    }
}

impl SubAssign<IVec3> for IBounds3 {
    fn sub_assign(&mut self, rhs: IVec3) {
        *self = self.shift(IVec3::ZERO.wrapping_sub(rhs));
    }
}

impl Sub<IVec3> for IBounds3 {
    type Output = Self;

    fn sub(mut self, rhs: IVec3) -> Self {
        self -= rhs;
        self
    }
}

/// Floating point axis-aligned bounds in 3D-space.
///
/// Same layout as [`IBounds3`], an origin and non-negative side lengths.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DBounds3 {
    origin: DVec3,
    lengths: DVec3,
}

impl DBounds3 {
    /// Constructs [`DBounds3`] from the given `origin` and `lengths`.
    ///
    /// # Panics
    ///
    /// Panics if any of the `lengths` is negative or `NaN`.
    pub fn new(origin: DVec3, lengths: DVec3) -> Self {
        Self::checked_new(origin, lengths).expect("lengths must not be negative or NaN")
    }

    /// Constructs [`DBounds3`] from the given `origin` and `lengths`.
    ///
    /// Returns [`None`] if any of the `lengths` is negative or `NaN`.
    pub fn checked_new(origin: DVec3, lengths: DVec3) -> Option<Self> {
        lengths
            .cmpge(DVec3::ZERO)
            .all()
            .then_some(Self { origin, lengths })
    }

    /// Constructs the [`DBounds3`] spanned between two opposite corners, given in any order.
    pub fn from_corners(a: DVec3, b: DVec3) -> Self {
        let origin = a.min(b);
        Self {
            origin,
            lengths: a.max(b) - origin,
        }
    }

    pub fn origin(self) -> DVec3 {
        self.origin
    }

    pub fn lengths(self) -> DVec3 {
        self.lengths
    }

    /// The upper corner of the bounds.
    pub fn max(self) -> DVec3 {
        self.origin + self.lengths
    }

    pub fn volume(self) -> f64 {
        self.lengths.x * self.lengths.y * self.lengths.z
    }

    pub fn center(self) -> DVec3 {
        self.origin + self.lengths / 2.0
    }

    /// Whether the [`DBounds3`] have zero length along _any_ axis.
    pub fn is_empty(self) -> bool {
        self.lengths.cmpeq(DVec3::ZERO).any()
    }

    /// Whether `point` lies within the bounds; the upper corner is exclusive.
    pub fn contains(self, point: DVec3) -> bool {
        point.cmpge(self.origin).all() && point.cmplt(self.max()).all()
    }

    pub fn overlaps(self, other: Self) -> bool {
        self.origin.cmplt(other.max()).all() && other.origin.cmplt(self.max()).all()
    }

    pub fn encloses(self, other: Self) -> bool {
        self.origin.cmple(other.origin).all() && other.max().cmple(self.max()).all()
    }

    pub fn shift(self, delta: DVec3) -> Self {
        Self {
            origin: self.origin + delta,
            lengths: self.lengths,
        }
    }

    /// Grows the bounds by `amount` in every direction, or shrinks them if it is negative.
    ///
    /// Returns [`None`] if any length would become negative.
    pub fn expand(self, amount: f64) -> Option<Self> {
        Self::checked_new(
            self.origin - amount,
            self.lengths + DVec3::splat(amount * 2.0),
        )
    }

    /// See [`IBounds3::expand_directional`].
    pub fn expand_directional(self, delta: DVec3) -> Self {
        Self {
            origin: self.origin + delta.min(DVec3::ZERO),
            lengths: self.lengths + delta.abs(),
        }
    }

    /// See [`IBounds3::shrink_directional`].
    pub fn shrink_directional(self, delta: DVec3) -> Self {
        let lengths = (self.lengths - delta.abs()).max(DVec3::ZERO);
        let removed = self.lengths - lengths;
        Self {
            origin: self.origin + DVec3::select(delta.cmplt(DVec3::ZERO), removed, DVec3::ZERO),
            lengths,
        }
    }

    /// Returns the smallest [`DBounds3`] enclosing all given `bounds`, or [`None`] if there are
    /// none.
    pub fn enclosing(bounds: impl IntoIterator<Item = Self>) -> Option<Self> {
        let mut bounds = bounds.into_iter();
        let first = bounds.next()?;
        let (lower, upper) = bounds.fold(
            (first.origin, first.max()),
            |(lower, upper), next| (lower.min(next.origin), upper.max(next.max())),
        );
        Some(Self::from_corners(lower, upper))
    }

    /// Returns the smallest [`IBounds3`] that encloses these bounds.
    ///
    /// Returns [`None`] if the result does not fit into [`IBounds3`].
    pub fn floor(self) -> Option<IBounds3> {
        IBounds3::from_corners(
            checked_ivec3(self.origin.floor())?,
            checked_ivec3(self.max().ceil())?,
        )
    }
}

/// Like [`IVec3::abs`], but `i32::MIN` becomes `i32::MAX` instead of overflowing.
fn saturating_abs(vec: IVec3) -> IVec3 {
    IVec3::new(
        vec.x.saturating_abs(),
        vec.y.saturating_abs(),
        vec.z.saturating_abs(),
    )
}

/// Converts an integral `vec` to [`IVec3`] if every component is in range of [`i32`].
fn checked_ivec3(vec: DVec3) -> Option<IVec3> {
    let range = f64::from(i32::MIN)..=f64::from(i32::MAX);
    vec.to_array()
        .iter()
        .all(|component| range.contains(component))
        .then(|| vec.as_ivec3())
}

impl Add<DVec3> for DBounds3 {
    type Output = Self;

    fn add(self, rhs: DVec3) -> Self {
        self.shift(rhs)
    }
}

impl Sub<DVec3> for DBounds3 {
    type Output = Self;

    fn sub(self, rhs: DVec3) -> Self {
        self.shift(-rhs)
    }
}

#[cfg(test)]
mod tests {
    use glam::{dvec3, ivec3};

    use super::*;

    #[test]
    fn single_iteration() {
        let bounds = IBounds3::new(IVec3::ZERO, IVec3::ONE);
        assert_eq!(bounds.iter().collect::<Vec<_>>(), [IVec3::ZERO]);
    }

    #[test]
    fn iteration_order() {
        let bounds = IBounds3::new(ivec3(-1, 5, 0), ivec3(2, 1, 2));
        assert_eq!(
            bounds.iter().collect::<Vec<_>>(),
            [
                ivec3(-1, 5, 0),
                ivec3(-1, 5, 1),
                ivec3(0, 5, 0),
                ivec3(0, 5, 1),
            ]
        );
        assert_eq!(bounds.iter().count() as u128, bounds.volume());
    }

    #[test]
    fn empty_iteration() {
        let bounds = IBounds3::new(IVec3::ZERO, ivec3(3, 0, 3));
        assert!(bounds.is_empty());
        assert_eq!(bounds.iter().next(), None);
    }

    #[test]
    fn negative_lengths() {
        assert_eq!(IBounds3::checked_new(IVec3::ZERO, ivec3(1, -1, 1)), None);
        assert_eq!(DBounds3::checked_new(DVec3::ZERO, dvec3(1.0, 1.0, -0.5)), None);
        assert_eq!(DBounds3::checked_new(DVec3::ZERO, dvec3(f64::NAN, 1.0, 1.0)), None);
    }

    #[test]
    fn expand() {
        let bounds = IBounds3::new(IVec3::ZERO, IVec3::ONE).expand(1).unwrap();
        assert_eq!(bounds.origin(), IVec3::splat(-1));
        assert_eq!(bounds.max(), IVec3::splat(2));

        assert_eq!(bounds.expand(-2), None);
        assert_eq!(
            bounds.expand(-1),
            Some(IBounds3::new(IVec3::ZERO, IVec3::ONE))
        );
    }

    #[test]
    fn expand_and_shrink_directional() {
        let bounds = IBounds3::new(IVec3::ZERO, IVec3::splat(4));

        let expanded = bounds.expand_directional(ivec3(0, -1, 2));
        assert_eq!(expanded.origin(), ivec3(0, -1, 0));
        assert_eq!(expanded.lengths(), ivec3(4, 5, 6));
        assert_eq!(expanded.shrink_directional(ivec3(0, -1, 2)), bounds);

        let shrunk = bounds.shrink_directional(ivec3(-10, 1, 0));
        assert_eq!(shrunk.origin(), ivec3(4, 0, 0));
        assert_eq!(shrunk.lengths(), ivec3(0, 3, 4));
    }

    #[test]
    fn directional_at_extremes() {
        let bounds = IBounds3::new(IVec3::splat(i32::MIN), IVec3::ONE);
        let expanded = bounds.expand_directional(ivec3(-1, i32::MIN, 0));
        assert_eq!(expanded.origin(), ivec3(i32::MAX, 0, i32::MIN));
        assert_eq!(expanded.lengths(), ivec3(2, i32::MAX, 1));

        let bounds = IBounds3::new(IVec3::splat(i32::MAX), IVec3::splat(3));
        let shrunk = bounds.shrink_directional(ivec3(i32::MIN, i32::MAX, 0));
        assert_eq!(shrunk.origin(), ivec3(i32::MIN + 2, i32::MAX, i32::MAX));
        assert_eq!(shrunk.lengths(), ivec3(0, 0, 3));
    }

    #[test]
    fn contains_and_overlaps() {
        let bounds = IBounds3::new(ivec3(-2, -2, -2), IVec3::splat(4));
        assert!(bounds.contains(ivec3(-2, 1, 0)));
        assert!(!bounds.contains(ivec3(2, 0, 0)));

        assert!(bounds.overlaps(IBounds3::point(ivec3(1, 1, 1))));
        assert!(bounds.is_disjoint(IBounds3::point(ivec3(2, 1, 1))));
        assert!(bounds.encloses(IBounds3::new(ivec3(-1, -1, -1), IVec3::splat(3))));
        assert!(!bounds.encloses(IBounds3::new(ivec3(-1, -1, -1), IVec3::splat(4))));
    }

    #[test]
    fn contains_past_i32_max() {
        let bounds = IBounds3::new(IVec3::splat(i32::MAX - 1), IVec3::splat(10));
        assert!(bounds.contains(IVec3::splat(i32::MAX)));
        assert!(!bounds.contains(IVec3::splat(i32::MIN)));
    }

    #[test]
    fn enclosing() {
        let a = IBounds3::new(IVec3::ZERO, IVec3::ONE);
        let b = IBounds3::new(ivec3(4, -3, 1), ivec3(1, 1, 1));
        let enclosing = IBounds3::enclosing([a, b]).unwrap();
        assert_eq!(enclosing.origin(), ivec3(0, -3, 0));
        assert_eq!(enclosing.max(), ivec3(5, 1, 2));
        assert!(enclosing.encloses(a) && enclosing.encloses(b));

        assert_eq!(IBounds3::enclosing([]), None);
    }

    #[test]
    fn shift_operators() {
        let bounds = IBounds3::new(IVec3::ZERO, IVec3::ONE);
        assert_eq!((bounds + IVec3::ONE).origin(), IVec3::ONE);
        assert_eq!((bounds - IVec3::ONE).origin(), IVec3::NEG_ONE);
    }

    #[test]
    fn center() {
        let bounds = IBounds3::new(IVec3::ZERO, ivec3(1, 2, 3));
        assert_eq!(bounds.center(), dvec3(0.5, 1.0, 1.5));
        assert_eq!(bounds.as_dbounds3().center(), bounds.center());
    }

    #[test]
    fn dbounds_floor() {
        let bounds = DBounds3::new(dvec3(-0.5, 0.0, 1.25), dvec3(1.0, 2.0, 0.5));
        let floored = bounds.floor().unwrap();
        assert_eq!(floored.origin(), ivec3(-1, 0, 1));
        assert_eq!(floored.max(), ivec3(1, 2, 2));
        assert!(floored.as_dbounds3().encloses(bounds));
    }

    #[test]
    fn dbounds_floor_out_of_range() {
        assert_eq!(DBounds3::new(DVec3::ZERO, dvec3(3.0e9, 1.0, 1.0)).floor(), None);
        assert_eq!(DBounds3::new(dvec3(0.0, -3.0e9, 0.0), DVec3::ONE).floor(), None);
        // representable corners, but too far apart for an `i32` length
        assert_eq!(
            DBounds3::new(dvec3(0.0, 0.0, -2.0e9), dvec3(1.0, 1.0, 4.0e9)).floor(),
            None
        );

        let bounds = DBounds3::new(DVec3::splat(-2147483648.5), DVec3::ONE).floor();
        assert_eq!(bounds, None);
        let bounds = DBounds3::new(DVec3::splat(-2147483648.0), DVec3::splat(0.5)).floor();
        assert_eq!(bounds, Some(IBounds3::new(IVec3::splat(i32::MIN), IVec3::ONE)));
    }

    #[test]
    fn dbounds_contains() {
        let bounds = DBounds3::from_corners(dvec3(1.0, 1.0, 1.0), dvec3(-1.0, -1.0, -1.0));
        assert_eq!(bounds.origin(), DVec3::NEG_ONE);
        assert!(bounds.contains(DVec3::ZERO));
        assert!(!bounds.contains(DVec3::ONE));
        assert_eq!(bounds.volume(), 8.0);
    }
}
