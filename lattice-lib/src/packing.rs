use enum_map::EnumMap;
use glam::IVec3;
use tracing::debug;

use crate::{
    error::MapError,
    math::{
        axis::{Axes3, Axis3},
        bounds::IBounds3,
    },
};

/// The number of bits available in a packed key.
pub const KEY_BITS: u32 = u64::BITS;

/// Packs integer coordinates into a single [`u64`] relative to an origin.
///
/// Each axis is given a field of bits in the key that is just large enough to address the span that
/// was requested for it, rounded up to a power of two. This rounded up span is called the _actual
/// width_ of the axis and is never smaller than `2`:
///
/// | span       | actual width |
/// |------------|--------------|
/// | `1`        | `2`          |
/// | `4`        | `4`          |
/// | `5`        | `8`          |
/// | `16`       | `16`         |
/// | `i32::MAX` | `2^31`       |
///
/// Coordinates outside of `origin..origin + actual_width` wrap around, i.e. they are reduced modulo
/// the actual width of their axis. Every coordinate therefore maps to _some_ key, but coordinates
/// that differ by a multiple of the actual width on every axis share the same key.
///
/// `X` occupies the most significant bits of the key, followed by `Y` and `Z`.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct CoordPacker {
    /// The coordinate that is packed into the key `0`.
    origin: IVec3,
    fields: EnumMap<Axis3, Field>,
}

/// The location of a single axis within a packed key.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
struct Field {
    bits: u32,
    /// `(1 << bits) - 1`; at most 31 bits wide.
    mask: u64,
    shift: u32,
}

impl Field {
    fn for_span(axis: Axis3, span: i32) -> Result<Self, MapError> {
        if span <= 0 {
            return Err(MapError::InvalidSpan { axis, span });
        }

        // rounding `span - 1` keeps powers of two from growing by another bit
        let bits = (span - 1).max(1).ilog2() + 1;
        Ok(Self {
            bits,
            mask: (1 << bits) - 1,
            shift: 0,
        })
    }
}

impl CoordPacker {
    /// Creates a [`CoordPacker`] for keys relative to `origin` with room for at least `span`
    /// distinct coordinates along each axis.
    ///
    /// Fails with [`MapError::InvalidSpan`] if any span is not positive and with
    /// [`MapError::CapacityExceeded`] if more than [`KEY_BITS`] bits are needed in total.
    pub fn new(origin: IVec3, span: IVec3) -> Result<Self, MapError> {
        Self::layout(origin, span).inspect_err(|error| {
            debug!(?origin, ?span, %error, "rejected coordinate layout");
        })
    }

    /// Creates a [`CoordPacker`] with the origin and lengths of `bounds`.
    ///
    /// Empty bounds fail with [`MapError::InvalidSpan`].
    pub fn from_bounds(bounds: IBounds3) -> Result<Self, MapError> {
        Self::new(bounds.origin(), bounds.lengths())
    }

    fn layout(origin: IVec3, span: IVec3) -> Result<Self, MapError> {
        let mut fields = EnumMap::<Axis3, Field>::default();
        for axis in Axis3::ALL {
            fields[axis] = Field::for_span(axis, span[axis])?;
        }

        let bits = fields.values().map(|field| field.bits).sum();
        if bits > KEY_BITS {
            return Err(MapError::CapacityExceeded { bits });
        }

        fields[Axis3::Y].shift = fields[Axis3::Z].bits;
        fields[Axis3::X].shift = fields[Axis3::Y].bits + fields[Axis3::Z].bits;

        debug!(
            ?origin,
            ?span,
            x_bits = fields[Axis3::X].bits,
            y_bits = fields[Axis3::Y].bits,
            z_bits = fields[Axis3::Z].bits,
            "created coordinate layout"
        );

        Ok(Self { origin, fields })
    }

    /// Packs the given coordinate into a key.
    ///
    /// Never fails; coordinates outside of the addressable space wrap around.
    #[inline]
    pub fn pack(&self, x: i32, y: i32, z: i32) -> u64 {
        self.pack_axis(Axis3::X, x) | self.pack_axis(Axis3::Y, y) | self.pack_axis(Axis3::Z, z)
    }

    #[inline]
    pub fn pack_vec(&self, pos: IVec3) -> u64 {
        self.pack(pos.x, pos.y, pos.z)
    }

    #[inline]
    fn pack_axis(&self, axis: Axis3, value: i32) -> u64 {
        let field = self.fields[axis];
        // masking the two's complement offset is a modulo by the width, even for negative offsets
        let offset = (i64::from(value) - i64::from(self.origin[axis])) as u64;
        (offset & field.mask) << field.shift
    }

    /// Unpacks a key that was produced by [`Self::pack`].
    ///
    /// Returns the original coordinate if it was within the addressable space. Otherwise the
    /// coordinate within the addressable space that shares its key is returned.
    #[inline]
    pub fn unpack(&self, key: u64) -> IVec3 {
        IVec3::new(self.unpack_x(key), self.unpack_y(key), self.unpack_z(key))
    }

    #[inline]
    pub fn unpack_x(&self, key: u64) -> i32 {
        self.unpack_axis(Axis3::X, key)
    }

    #[inline]
    pub fn unpack_y(&self, key: u64) -> i32 {
        self.unpack_axis(Axis3::Y, key)
    }

    #[inline]
    pub fn unpack_z(&self, key: u64) -> i32 {
        self.unpack_axis(Axis3::Z, key)
    }

    #[inline]
    fn unpack_axis(&self, axis: Axis3, key: u64) -> i32 {
        let field = self.fields[axis];
        // fits, since masks are at most 31 bits wide
        let offset = ((key >> field.shift) & field.mask) as i32;
        self.origin[axis].wrapping_add(offset)
    }

    /// Returns the coordinate within the addressable space that shares its key with the given one.
    pub fn wrap(&self, x: i32, y: i32, z: i32) -> IVec3 {
        self.unpack(self.pack(x, y, z))
    }

    /// Whether the coordinate lies within the addressable space, i.e. does not wrap around.
    ///
    /// The addressable space itself may wrap past [`i32::MAX`] if the origin is large enough.
    pub fn contains(&self, x: i32, y: i32, z: i32) -> bool {
        self.wrapped_axes(IVec3::new(x, y, z)).is_empty()
    }

    /// Returns the axes along which `pos` lies outside of the addressable space.
    pub fn wrapped_axes(&self, pos: IVec3) -> Axes3 {
        Axis3::ALL
            .into_iter()
            .filter(|&axis| {
                // same wrapping offset that `unpack_axis` adds back onto the origin
                let offset = pos[axis].wrapping_sub(self.origin[axis]) as u32;
                u64::from(offset) > self.fields[axis].mask
            })
            .collect()
    }

    /// The coordinate that packs into the key `0`.
    pub fn origin(&self) -> IVec3 {
        self.origin
    }

    /// The number of bits used by the given axis.
    pub fn bits(&self, axis: Axis3) -> u32 {
        self.fields[axis].bits
    }

    /// The number of bits used by all axes combined; at most [`KEY_BITS`].
    pub fn total_bits(&self) -> u32 {
        self.fields.values().map(|field| field.bits).sum()
    }

    /// The bitmask that is applied to offsets along the given axis.
    pub fn mask(&self, axis: Axis3) -> u64 {
        self.fields[axis].mask
    }

    /// The actual width of the given axis.
    ///
    /// The largest coordinate that does not wrap around is `origin + size - 1`.
    pub fn size(&self, axis: Axis3) -> u64 {
        self.fields[axis].mask + 1
    }

    pub fn width(&self) -> u64 {
        self.size(Axis3::X)
    }

    pub fn height(&self) -> u64 {
        self.size(Axis3::Y)
    }

    pub fn depth(&self) -> u64 {
        self.size(Axis3::Z)
    }

    /// The number of distinct keys, i.e. `width * height * depth`.
    ///
    /// Can be as large as `2^64`, which does not quite fit a [`u64`].
    pub fn addressable_size(&self) -> u128 {
        1 << self.total_bits()
    }

    /// The addressable space as [`IBounds3`].
    ///
    /// Returns [`None`] if the actual width along any axis is `2^31`, which is too large for
    /// [`IBounds3`].
    pub fn addressable_bounds(&self) -> Option<IBounds3> {
        let size = |axis| i32::try_from(self.size(axis)).ok();
        IBounds3::checked_new(
            self.origin,
            IVec3::new(size(Axis3::X)?, size(Axis3::Y)?, size(Axis3::Z)?),
        )
    }
}
