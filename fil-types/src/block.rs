use crate::{FilError, FilResult, SampleEncoding};

/// Распакованные значения выборок. Суб-байтовые выборки хранятся по одной
/// на `u8`.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleData {
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    F32(Vec<f32>),
}

/// Блок спектров формы `[nspectra, nchans]` (одна интенсивность на канал).
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBlock {
    /// Количество спектров в блоке
    pub nspectra: usize,
    /// Количество каналов в спектре
    pub nchans: usize,
    /// Значения в порядке времени, затем каналов
    pub data: SampleData,
}

impl SampleData {
    pub fn len(&self) -> usize {
        match self {
            SampleData::U8(v) => v.len(),
            SampleData::U16(v) => v.len(),
            SampleData::U32(v) => v.len(),
            SampleData::F32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Пустой буфер, подходящий для кодировки.
    pub fn with_capacity(
        encoding: SampleEncoding,
        capacity: usize,
    ) -> Self {
        match encoding {
            SampleEncoding::UInt16 => SampleData::U16(Vec::with_capacity(capacity)),
            SampleEncoding::UInt32 => SampleData::U32(Vec::with_capacity(capacity)),
            SampleEncoding::Float32 => SampleData::F32(Vec::with_capacity(capacity)),
            _ => SampleData::U8(Vec::with_capacity(capacity)),
        }
    }

    /// Дописывает значения другого буфера того же типа.
    pub fn extend(
        &mut self,
        other: SampleData,
    ) -> FilResult<()> {
        match (self, other) {
            (SampleData::U8(a), SampleData::U8(b)) => a.extend(b),
            (SampleData::U16(a), SampleData::U16(b)) => a.extend(b),
            (SampleData::U32(a), SampleData::U32(b)) => a.extend(b),
            (SampleData::F32(a), SampleData::F32(b)) => a.extend(b),
            _ => {
                return Err(FilError::format_violation(
                    "cannot concatenate sample buffers of different types",
                ))
            }
        }

        Ok(())
    }

    /// Приводит значения к кодировке `encoding`.
    ///
    /// Целочисленные значения насыщаются на границах диапазона, дробная часть
    /// отбрасывается.
    pub fn cast(
        self,
        encoding: SampleEncoding,
    ) -> SampleData {
        let max = encoding.max_value();

        match (encoding, self) {
            (SampleEncoding::Float32, SampleData::F32(v)) => SampleData::F32(v),
            (SampleEncoding::Float32, other) => {
                SampleData::F32(other.iter_f64().map(|x| x as f32).collect())
            }
            (SampleEncoding::UInt16, SampleData::U16(v)) => SampleData::U16(v),
            (SampleEncoding::UInt16, other) => SampleData::U16(
                other
                    .iter_f64()
                    .map(|x| saturate(x, u16::MAX as f64) as u16)
                    .collect(),
            ),
            (SampleEncoding::UInt32, SampleData::U32(v)) => SampleData::U32(v),
            (SampleEncoding::UInt32, other) => SampleData::U32(
                other
                    .iter_f64()
                    .map(|x| saturate(x, u32::MAX as f64) as u32)
                    .collect(),
            ),
            (_, other) => {
                let limit = max.unwrap_or(u8::MAX as u32) as f64;
                match other {
                    SampleData::U8(v) if v.iter().all(|&x| x as f64 <= limit) => SampleData::U8(v),
                    other => SampleData::U8(
                        other
                            .iter_f64()
                            .map(|x| saturate(x, limit) as u8)
                            .collect(),
                    ),
                }
            }
        }
    }

    fn iter_f64(&self) -> Box<dyn Iterator<Item = f64> + '_> {
        match self {
            SampleData::U8(v) => Box::new(v.iter().map(|&x| x as f64)),
            SampleData::U16(v) => Box::new(v.iter().map(|&x| x as f64)),
            SampleData::U32(v) => Box::new(v.iter().map(|&x| x as f64)),
            SampleData::F32(v) => Box::new(v.iter().map(|&x| x as f64)),
        }
    }
}

fn saturate(
    x: f64,
    max: f64,
) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, max).trunc()
    }
}

impl SampleBlock {
    pub fn new(
        nspectra: usize,
        nchans: usize,
        data: SampleData,
    ) -> Self {
        Self {
            nspectra,
            nchans,
            data,
        }
    }

    /// Проверяет соответствие `nspectra * nchans == data.len()`.
    pub fn validate_shape(&self) -> FilResult<()> {
        let expected = self.nspectra * self.nchans;

        if self.data.len() != expected {
            return Err(FilError::FormatViolation(format!(
                "nspectra={} × nchans={} = {} ≠ data.len()={}",
                self.nspectra,
                self.nchans,
                expected,
                self.data.len(),
            )));
        }

        Ok(())
    }

    /// Приводит блок к кодировке заголовка.
    pub fn cast(
        self,
        encoding: SampleEncoding,
    ) -> Self {
        Self {
            nspectra: self.nspectra,
            nchans: self.nchans,
            data: self.data.cast(encoding),
        }
    }
}
