//! Grid cell value decoding.

/// How raw grid cells are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueMode {
    /// Cells hold depth in centimeters.
    #[default]
    Depth,
    /// Cells hold validity codes packed as `t * 4096 + r`.
    ValidityCode,
}

impl ValueMode {
    /// Pick the mode from the validity-codes flag.
    pub fn from_flag(validity_codes: bool) -> Self {
        if validity_codes {
            ValueMode::ValidityCode
        } else {
            ValueMode::Depth
        }
    }

    /// Decode a raw cell.
    pub fn decode(self, raw: i16) -> f64 {
        match self {
            ValueMode::Depth => decode_depth(raw),
            ValueMode::ValidityCode => decode_validity(raw),
        }
    }

    /// CSV column title of the value.
    pub fn column_name(self) -> &'static str {
        match self {
            ValueMode::Depth => "Depth(m)",
            ValueMode::ValidityCode => "ValCode",
        }
    }
}

/// Centimeters to meters.
pub fn decode_depth(raw: i16) -> f64 {
    f64::from(raw) / 100.0
}

/// Unpack `t * 4096 + r` into `t * 10 + r / 256`.
///
/// `t` is truncated toward zero, so `r` carries the sign of `raw`.
pub fn decode_validity(raw: i16) -> f64 {
    let v = f64::from(raw);
    let t = (v / 4096.0).trunc();
    t * 10.0 + (v - t * 4096.0) / 256.0
}
