/// The ReprU32Enum trait is for fieldless enums that are carried as u32 on the wire.
pub trait ReprU32Enum: Copy + Sized {
    const MAX: u32;
}

/// Macro to implement the trait and do the compile-time size check
#[macro_export]
macro_rules! impl_repr_u32_enum {
    ($ty:ty, $max:expr) => {
        // Compile-time size check for this concrete type.
        const _: [(); size_of::<$ty>()] = [(); size_of::<u32>()];

        impl ReprU32Enum for $ty {
            const MAX: u32 = $max;
        }
    };
}

/// Read a little-endian u16 at `off`. Caller guarantees the bounds.
#[macro_export]
macro_rules! le_u16_at {
    ($buf:expr, $off:expr) => {
        u16::from_le_bytes([$buf[$off], $buf[$off + 1]])
    };
}

/// Read a little-endian u32 at `off`. Caller guarantees the bounds.
#[macro_export]
macro_rules! le_u32_at {
    ($buf:expr, $off:expr) => {
        u32::from_le_bytes([$buf[$off], $buf[$off + 1], $buf[$off + 2], $buf[$off + 3]])
    };
}
