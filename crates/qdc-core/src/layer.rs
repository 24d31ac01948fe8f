//! Layer geometry table.
//!
//! A QDC dataset stores the same survey at six precision levels. Layer 0 is the
//! raw user data, layer 1 the recommended level, and layers 2-5 progressively
//! coarser resolutions. Every tile file on disk has one of four fixed sizes;
//! the size tells where the depth records of a given layer start.
//!
//! | Layer | Cell (deg)   | Sectors | Grid span | Origin span |
//! |-------|--------------|---------|-----------|-------------|
//! | 0     | 90 / 2^22    | 8 x 8   | 256       | 256         |
//! | 1     | 90 / 2^21    | 4 x 4   | 128       | 128         |
//! | 2     | 90 / 2^20    | 2 x 2   | 64        | 64          |
//! | 3     | 90 / 2^19    | 1 x 1   | 32        | 32          |
//! | 4     | 90 / 2^18    | 2 x 2   | 64        | 16          |
//! | 5     | 90 / 2^17    | 1 x 1   | 32        | 8           |

use crate::{QdcError, Result};

/// Number of layers in a QDC dataset.
pub const LAYER_COUNT: u8 = 6;

/// Width and height of one sector in pixels.
pub const SECTOR_PIXELS: usize = 32;

/// Size in bytes of one depth/validity record.
pub const RECORD_STRIDE: usize = 4;

/// File sizes shared by every layer, in table order.
const SIZE_A: u64 = 372_736;
const SIZE_B: u64 = 352_256;
const SIZE_C: u64 = 110_592;
const SIZE_D: u64 = 90_112;

/// One on-disk tile layout: a file size and where the layer's records begin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeVariant {
    /// Exact tile file size in bytes.
    pub file_size: u64,
    /// Byte offset of the first record for this layer.
    pub record_offset: usize,
}

const fn variant(file_size: u64, record_offset: usize) -> Option<SizeVariant> {
    Some(SizeVariant {
        file_size,
        record_offset,
    })
}

/// Immutable geometry of one layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerProfile {
    layer: u8,
    sector_count: usize,
    variants: [Option<SizeVariant>; 4],
    grid_span: i32,
    origin_span: i32,
}

static LAYER_PROFILES: [LayerProfile; LAYER_COUNT as usize] = [
    LayerProfile {
        layer: 0,
        sector_count: 7,
        variants: [variant(SIZE_A, 4097), variant(SIZE_B, 4097), None, None],
        grid_span: 256,
        origin_span: 256,
    },
    LayerProfile {
        layer: 1,
        sector_count: 3,
        variants: [
            variant(SIZE_A, 266_241),
            variant(SIZE_B, 266_241),
            variant(SIZE_C, 4097),
            variant(SIZE_D, 4097),
        ],
        grid_span: 128,
        origin_span: 128,
    },
    LayerProfile {
        layer: 2,
        sector_count: 1,
        variants: [
            variant(SIZE_A, 331_777),
            variant(SIZE_B, 331_777),
            variant(SIZE_C, 69_633),
            variant(SIZE_D, 69_633),
        ],
        grid_span: 64,
        origin_span: 64,
    },
    LayerProfile {
        layer: 3,
        sector_count: 0,
        variants: [
            variant(SIZE_A, 348_161),
            variant(SIZE_B, 348_161),
            variant(SIZE_C, 86_017),
            variant(SIZE_D, 86_017),
        ],
        grid_span: 32,
        origin_span: 32,
    },
    LayerProfile {
        layer: 4,
        sector_count: 1,
        variants: [variant(SIZE_A, 352_257), None, variant(SIZE_C, 90_113), None],
        grid_span: 64,
        origin_span: 16,
    },
    LayerProfile {
        layer: 5,
        sector_count: 0,
        variants: [variant(SIZE_A, 368_641), None, variant(SIZE_C, 106_497), None],
        grid_span: 32,
        origin_span: 8,
    },
];

impl LayerProfile {
    /// Look up the profile of a layer.
    pub fn for_layer(layer: u8) -> Result<&'static LayerProfile> {
        LAYER_PROFILES
            .get(usize::from(layer))
            .ok_or(QdcError::InvalidLayer(layer))
    }

    /// All six profiles in layer order.
    pub fn all() -> &'static [LayerProfile] {
        &LAYER_PROFILES
    }

    /// Layer index (0-5).
    pub fn layer(&self) -> u8 {
        self.layer
    }

    /// Degrees covered by one grid cell: `90 / 2^(22 - layer)`.
    pub fn angular_step(&self) -> f64 {
        90.0 / f64::from(1u32 << (22 - u32::from(self.layer)))
    }

    /// Highest sector index; a tile holds `(sector_count + 1)^2` sectors.
    pub fn sector_count(&self) -> usize {
        self.sector_count
    }

    /// Sectors along one tile edge.
    pub fn sectors_per_side(&self) -> usize {
        self.sector_count + 1
    }

    /// Pixels along one tile edge.
    pub fn tile_pixels(&self) -> usize {
        self.sectors_per_side() * SECTOR_PIXELS
    }

    /// Records stored in one tile.
    pub fn record_count(&self) -> usize {
        self.tile_pixels() * self.tile_pixels()
    }

    /// Grid cells spanned by one origin-code unit when sizing the grid.
    pub fn grid_span(&self) -> i32 {
        self.grid_span
    }

    /// Pixels per origin-code unit when placing a tile inside the grid.
    ///
    /// Equal to [`grid_span`](Self::grid_span) for layers 0-3 but not for 4 and 5.
    pub fn origin_span(&self) -> i32 {
        self.origin_span
    }

    /// Size variants present for this layer.
    pub fn variants(&self) -> impl Iterator<Item = &SizeVariant> {
        self.variants.iter().flatten()
    }

    /// Find the layout variant for a file of the given size.
    pub fn match_size(&self, file_size: u64) -> Option<SizeVariant> {
        self.variants().find(|v| v.file_size == file_size).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_total_for_known_layers() {
        for layer in 0..LAYER_COUNT {
            let profile = LayerProfile::for_layer(layer).expect("known layer");
            assert_eq!(profile.layer(), layer);
        }
    }

    #[test]
    fn test_invalid_layer() {
        assert!(matches!(
            LayerProfile::for_layer(6),
            Err(QdcError::InvalidLayer(6))
        ));
    }

    #[test]
    fn test_variant_sizes_are_distinct() {
        for profile in LayerProfile::all() {
            let sizes: Vec<u64> = profile.variants().map(|v| v.file_size).collect();
            for (i, a) in sizes.iter().enumerate() {
                for b in &sizes[i + 1..] {
                    assert_ne!(a, b, "layer {} repeats size {}", profile.layer(), a);
                }
            }
        }
    }

    #[test]
    fn test_records_fit_inside_every_variant() {
        for profile in LayerProfile::all() {
            for v in profile.variants() {
                // The depth of record i lives at offset - 1 + 4i, the code at offset + 1 + 4i.
                let last = v.record_offset + 1 + RECORD_STRIDE * (profile.record_count() - 1) + 2;
                assert!(
                    last as u64 <= v.file_size,
                    "layer {} variant {} overruns the file",
                    profile.layer(),
                    v.file_size
                );
            }
        }
    }

    #[test]
    fn test_tile_fits_in_grid_span() {
        for profile in LayerProfile::all() {
            assert!(profile.tile_pixels() as i32 <= profile.grid_span());
            assert!(profile.origin_span() <= profile.grid_span());
        }
    }

    #[test]
    fn test_angular_step() {
        let l0 = LayerProfile::for_layer(0).unwrap();
        let l5 = LayerProfile::for_layer(5).unwrap();
        assert_eq!(l0.angular_step(), 90.0 / 4_194_304.0);
        assert_eq!(l5.angular_step(), 90.0 / 131_072.0);
    }

    #[test]
    fn test_match_size() {
        let l5 = LayerProfile::for_layer(5).unwrap();
        assert_eq!(
            l5.match_size(110_592),
            Some(SizeVariant {
                file_size: 110_592,
                record_offset: 106_497
            })
        );
        assert_eq!(l5.match_size(352_256), None);
        assert_eq!(l5.match_size(0), None);
    }

    #[test]
    fn test_layer4_and_5_spans_differ() {
        let l4 = LayerProfile::for_layer(4).unwrap();
        let l5 = LayerProfile::for_layer(5).unwrap();
        assert_eq!((l4.grid_span(), l4.origin_span()), (64, 16));
        assert_eq!((l5.grid_span(), l5.origin_span()), (32, 8));
    }
}
