//! Quantization of normalized samples to device sample widths.
//!
//! The render loop produces `f64` samples in `[-1, 1]`. A [`PcmSample`]
//! type turns each one into the value written into a device block. The
//! conversion is pure: scale by the type's positive full-scale value and
//! truncate toward zero, so `0.0` always maps to exact silence.
//!
//! | Type | Bits | Full scale |
//! |------|------|------------|
//! | `i8` | 8 | 127 |
//! | `i16` | 16 | 32767 |
//! | `i32` | 32 | 2147483647 |
//! | `f32` | 32 | 1.0 (float) |

use core::fmt;

/// A sample width the output device can consume.
pub trait PcmSample: Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Format descriptor for device negotiation.
    const FORMAT: SampleFormat;

    /// The value written for silence.
    const SILENCE: Self;

    /// Quantize a normalized sample. Input is expected in `[-1, 1]`; values
    /// outside saturate at the type's range.
    fn from_normalized(sample: f64) -> Self;

    /// Convert back to a normalized sample.
    fn to_normalized(self) -> f64;
}

macro_rules! impl_int_pcm {
    ($t:ty, $format:expr) => {
        impl PcmSample for $t {
            const FORMAT: SampleFormat = $format;
            const SILENCE: Self = 0;

            #[inline]
            fn from_normalized(sample: f64) -> Self {
                // `as` saturates on overflow and maps NaN to 0.
                (sample * <$t>::MAX as f64) as $t
            }

            #[inline]
            fn to_normalized(self) -> f64 {
                self as f64 / <$t>::MAX as f64
            }
        }
    };
}

impl_int_pcm!(i8, SampleFormat::I8);
impl_int_pcm!(i16, SampleFormat::I16);
impl_int_pcm!(i32, SampleFormat::I32);

impl PcmSample for f32 {
    const FORMAT: SampleFormat = SampleFormat::F32;
    const SILENCE: Self = 0.0;

    #[inline]
    fn from_normalized(sample: f64) -> Self {
        sample as f32
    }

    #[inline]
    fn to_normalized(self) -> f64 {
        f64::from(self)
    }
}

/// Output sample formats.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SampleFormat {
    /// Signed 8-bit integer.
    I8,
    /// Signed 16-bit integer (the default, CD-style PCM).
    #[default]
    I16,
    /// Signed 32-bit integer.
    I32,
    /// 32-bit float.
    F32,
}

impl SampleFormat {
    /// Bits per sample.
    pub fn bits(self) -> u16 {
        match self {
            SampleFormat::I8 => 8,
            SampleFormat::I16 => 16,
            SampleFormat::I32 | SampleFormat::F32 => 32,
        }
    }

    /// Short lowercase name (`"i16"`).
    pub fn name(self) -> &'static str {
        match self {
            SampleFormat::I8 => "i8",
            SampleFormat::I16 => "i16",
            SampleFormat::I32 => "i32",
            SampleFormat::F32 => "f32",
        }
    }

    /// Parse a name produced by [`name`](Self::name), case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        [
            SampleFormat::I8,
            SampleFormat::I16,
            SampleFormat::I32,
            SampleFormat::F32,
        ]
        .into_iter()
        .find(|f| f.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
