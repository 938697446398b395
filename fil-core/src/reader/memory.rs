use fil_types::{FilError, FilResult, LogicalHeader, SampleBlock, SampleData, SampleEncoding};

use crate::reader::{SourceReader, SpanTable};

/// Источник в памяти: заголовок и все спектры сразу. Для тестов и примеров.
pub struct MemoryReader {
    header: LogicalHeader,
    data: SampleData,
    spans: SpanTable,
}

impl MemoryReader {
    /// `data` содержит `header.nspectra × header.nchans` значений.
    pub fn new(
        header: LogicalHeader,
        data: SampleData,
    ) -> FilResult<Self> {
        header.validate()?;

        let expected = header.nspectra as usize * header.nchans;
        if data.len() != expected {
            return Err(FilError::format_violation(format!(
                "memory source holds {} values, header needs {expected}",
                data.len()
            )));
        }

        let spans = SpanTable::new([header.nspectra])?;

        Ok(Self {
            header,
            data,
            spans,
        })
    }

    /// Детерминированная «пила» по спектрам и каналам в диапазоне кодировки.
    pub fn ramp(header: LogicalHeader) -> FilResult<Self> {
        let n = header.nspectra as usize * header.nchans;
        let nchans = header.nchans;
        let value = |i: usize| (i / nchans) * 7 + (i % nchans) * 3;

        let data = match header.encoding {
            SampleEncoding::Float32 => SampleData::F32((0..n).map(|i| value(i) as f32 * 0.5).collect()),
            SampleEncoding::UInt16 => SampleData::U16((0..n).map(|i| (value(i) % 65_536) as u16).collect()),
            SampleEncoding::UInt32 => SampleData::U32((0..n).map(|i| value(i) as u32).collect()),
            enc => {
                let modulo = enc.max_value().unwrap_or(255) as usize + 1;
                SampleData::U8((0..n).map(|i| (value(i) % modulo) as u8).collect())
            }
        };

        Self::new(header, data)
    }

    /// Все спектры источника одним буфером.
    pub fn data(&self) -> &SampleData {
        &self.data
    }
}

impl SourceReader for MemoryReader {
    fn header(&self) -> &LogicalHeader {
        &self.header
    }

    fn read_block(
        &mut self,
        start: u64,
        nspectra: u64,
    ) -> FilResult<SampleBlock> {
        // Проверка границ
        self.spans.locate(start, nspectra)?;

        let nchans = self.header.nchans;
        let from = start as usize * nchans;
        let to = from + nspectra as usize * nchans;

        let data = match &self.data {
            SampleData::U8(v) => SampleData::U8(v[from..to].to_vec()),
            SampleData::U16(v) => SampleData::U16(v[from..to].to_vec()),
            SampleData::U32(v) => SampleData::U32(v[from..to].to_vec()),
            SampleData::F32(v) => SampleData::F32(v[from..to].to_vec()),
        };

        Ok(SampleBlock::new(nspectra as usize, nchans, data))
    }
}
