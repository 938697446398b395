use serde::Serialize;

use crate::{FilError, FilResult};

/// Числовое представление одной выборки (один канал, один спектр).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SampleEncoding {
    /// 1-битные беззнаковые
    UInt1,
    /// 2-битные беззнаковые
    UInt2,
    /// 4-битные беззнаковые
    UInt4,
    /// 8-битные беззнаковые
    UInt8,
    /// 16-битные беззнаковые
    UInt16,
    /// 32-битные беззнаковые
    UInt32,
    /// 32-битные IEEE-754
    Float32,
}

impl SampleEncoding {
    /// Целочисленная кодировка по разрядности.
    ///
    /// 32 бита трактуются как `Float32`, как это принято в SIGPROC.
    pub fn from_nbits(nbits: u32) -> FilResult<Self> {
        match nbits {
            1 => Ok(SampleEncoding::UInt1),
            2 => Ok(SampleEncoding::UInt2),
            4 => Ok(SampleEncoding::UInt4),
            8 => Ok(SampleEncoding::UInt8),
            16 => Ok(SampleEncoding::UInt16),
            32 => Ok(SampleEncoding::Float32),
            _ => Err(FilError::UnsupportedNbits(nbits)),
        }
    }

    pub fn nbits(&self) -> u32 {
        match self {
            SampleEncoding::UInt1 => 1,
            SampleEncoding::UInt2 => 2,
            SampleEncoding::UInt4 => 4,
            SampleEncoding::UInt8 => 8,
            SampleEncoding::UInt16 => 16,
            SampleEncoding::UInt32 | SampleEncoding::Float32 => 32,
        }
    }

    /// Максимальное значение для целочисленных кодировок.
    pub fn max_value(&self) -> Option<u32> {
        match self {
            SampleEncoding::Float32 => None,
            SampleEncoding::UInt32 => Some(u32::MAX),
            other => Some((1u32 << other.nbits()) - 1),
        }
    }

    /// Число байт, которое занимает спектр из `nchans` каналов.
    ///
    /// `None`, если спектр не укладывается в целое число байт.
    pub fn spectrum_bytes(
        &self,
        nchans: usize,
    ) -> Option<usize> {
        let bits = nchans.checked_mul(self.nbits() as usize)?;

        if bits % 8 != 0 {
            return None;
        }

        Some(bits / 8)
    }
}

impl std::fmt::Display for SampleEncoding {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            SampleEncoding::UInt1 => write!(f, "uint1"),
            SampleEncoding::UInt2 => write!(f, "uint2"),
            SampleEncoding::UInt4 => write!(f, "uint4"),
            SampleEncoding::UInt8 => write!(f, "uint8"),
            SampleEncoding::UInt16 => write!(f, "uint16"),
            SampleEncoding::UInt32 => write!(f, "uint32"),
            SampleEncoding::Float32 => write!(f, "float32"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_nbits() {
        assert_eq!(SampleEncoding::from_nbits(4).unwrap(), SampleEncoding::UInt4);
        assert_eq!(SampleEncoding::from_nbits(32).unwrap(), SampleEncoding::Float32);
        assert!(matches!(
            SampleEncoding::from_nbits(12),
            Err(FilError::UnsupportedNbits(12))
        ));
    }

    #[test]
    fn test_spectrum_bytes() {
        assert_eq!(SampleEncoding::UInt8.spectrum_bytes(4096), Some(4096));
        assert_eq!(SampleEncoding::UInt2.spectrum_bytes(4096), Some(1024));
        assert_eq!(SampleEncoding::Float32.spectrum_bytes(3), Some(12));
        assert_eq!(SampleEncoding::UInt4.spectrum_bytes(3), None);
    }

    #[test]
    fn test_max_value() {
        assert_eq!(SampleEncoding::UInt2.max_value(), Some(3));
        assert_eq!(SampleEncoding::UInt8.max_value(), Some(255));
        assert_eq!(SampleEncoding::Float32.max_value(), None);
    }
}
