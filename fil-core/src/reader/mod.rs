//! Читатели источников.
//!
//! Конвертер зависит только от трейта [`SourceReader`]; для каждого формата
//! есть своя реализация: [`PsrfitsReader`], [`FilterbankReader`] и
//! [`MemoryReader`] для тестов.

pub mod filterbank;
pub mod fits;
pub mod memory;
pub mod psrfits;

use std::path::{Path, PathBuf};

pub use filterbank::*;
use fil_types::{ChunkWindow, FilError, FilResult, LogicalHeader, SampleBlock};
pub use memory::*;
pub use psrfits::*;

/// Источник спектров, собранный из одного или нескольких файлов.
pub trait SourceReader: Send {
    /// Логический заголовок, общий для всех файлов.
    fn header(&self) -> &LogicalHeader;

    /// Читает спектры `[start, start + nspectra)` одной интенсивностью на
    /// канал.
    fn read_block(
        &mut self,
        start: u64,
        nspectra: u64,
    ) -> FilResult<SampleBlock>;

    /// То же, что [`SourceReader::read_block`], для окна.
    fn read_window(
        &mut self,
        window: ChunkWindow,
    ) -> FilResult<SampleBlock> {
        self.read_block(window.start, window.len)
    }

    /// Файлы, из которых читает источник. Пусто для источников в памяти.
    fn source_paths(&self) -> Vec<&Path> {
        Vec::new()
    }
}

/// Формат источника, определяемый по расширению файла.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Psrfits,
    Filterbank,
}

impl SourceKind {
    pub fn from_path(path: &Path) -> FilResult<Self> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "fits" | "fit" | "sf" => Ok(SourceKind::Psrfits),
            "fil" => Ok(SourceKind::Filterbank),
            _ => Err(FilError::format_violation(format!(
                "Cannot tell the format of {path:?}: expected .fits, .sf or .fil"
            ))),
        }
    }
}

/// Открывает источник подходящим читателем.
///
/// Все файлы должны быть одного формата.
pub fn open_source(paths: &[PathBuf]) -> FilResult<Box<dyn SourceReader>> {
    let first = paths
        .first()
        .ok_or_else(|| FilError::format_violation("no source files given"))?;
    let kind = SourceKind::from_path(first)?;

    for p in &paths[1..] {
        if SourceKind::from_path(p)? != kind {
            return Err(FilError::format_violation(format!(
                "{p:?} is not a {kind:?} file like {first:?}"
            )));
        }
    }

    match kind {
        SourceKind::Psrfits => Ok(Box::new(PsrfitsReader::open(paths)?)),
        SourceKind::Filterbank => Ok(Box::new(FilterbankReader::open(paths)?)),
    }
}

/// Часть запроса, приходящаяся на один файл.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    /// Индекс файла
    pub file: usize,
    /// Номер первого спектра внутри файла
    pub offset: u64,
    /// Количество спектров
    pub len: u64,
}

/// Таблица диапазонов спектров по файлам: файл `i` содержит спектры
/// `[first[i], first[i] + count[i])` логического потока.
#[derive(Debug, Clone, Default)]
pub struct SpanTable {
    firsts: Vec<u64>,
    counts: Vec<u64>,
    total: u64,
}

impl SpanTable {
    pub fn new<I: IntoIterator<Item = u64>>(counts: I) -> FilResult<Self> {
        let counts: Vec<u64> = counts.into_iter().collect();
        let mut firsts = Vec::with_capacity(counts.len());
        let mut total = 0u64;

        for &c in &counts {
            firsts.push(total);
            total = total
                .checked_add(c)
                .ok_or_else(|| FilError::header("total spectrum count overflows u64"))?;
        }

        Ok(Self {
            firsts,
            counts,
            total,
        })
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Разбивает `[start, start + len)` на куски по файлам.
    pub fn locate(
        &self,
        start: u64,
        len: u64,
    ) -> FilResult<Vec<Segment>> {
        let end = start.checked_add(len).filter(|&e| e <= self.total);

        let end = match end {
            Some(e) if len > 0 => e,
            _ => {
                return Err(FilError::OutOfRange {
                    start,
                    len,
                    total: self.total,
                })
            }
        };

        let mut segments = Vec::new();

        for (file, (&first, &count)) in self.firsts.iter().zip(&self.counts).enumerate() {
            let file_end = first + count;

            if file_end <= start || first >= end || count == 0 {
                continue;
            }

            let seg_start = start.max(first);
            let seg_end = end.min(file_end);

            segments.push(Segment {
                file,
                offset: seg_start - first,
                len: seg_end - seg_start,
            });
        }

        Ok(segments)
    }
}

/// Относительное сравнение вещественных параметров разных файлов.
pub(crate) fn nearly_equal(
    a: f64,
    b: f64,
) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1e-12)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_across_files() {
        let table = SpanTable::new([100, 50, 200]).unwrap();
        assert_eq!(table.total(), 350);

        let segs = table.locate(90, 100).unwrap();
        assert_eq!(
            segs,
            vec![
                Segment { file: 0, offset: 90, len: 10 },
                Segment { file: 1, offset: 0, len: 50 },
                Segment { file: 2, offset: 0, len: 40 },
            ]
        );
    }

    #[test]
    fn test_locate_inside_one_file() {
        let table = SpanTable::new([100, 50]).unwrap();
        let segs = table.locate(110, 20).unwrap();
        assert_eq!(segs, vec![Segment { file: 1, offset: 10, len: 20 }]);
    }

    #[test]
    fn test_span_total_overflow() {
        assert!(SpanTable::new([u64::MAX, 1]).is_err());
        assert_eq!(SpanTable::new([u64::MAX]).unwrap().total(), u64::MAX);
    }

    #[test]
    fn test_locate_out_of_range() {
        let table = SpanTable::new([10]).unwrap();
        assert!(table.locate(5, 6).is_err());
        assert!(table.locate(0, 0).is_err());
        assert!(table.locate(u64::MAX, 2).is_err());
    }

    #[test]
    fn test_source_kind() {
        assert_eq!(SourceKind::from_path(Path::new("a_0001.fits")).unwrap(), SourceKind::Psrfits);
        assert_eq!(SourceKind::from_path(Path::new("A.SF")).unwrap(), SourceKind::Psrfits);
        assert_eq!(SourceKind::from_path(Path::new("b.fil")).unwrap(), SourceKind::Filterbank);
        assert!(SourceKind::from_path(Path::new("c.dat")).is_err());
    }

    #[test]
    fn test_open_source_rejects_mixed_and_empty() {
        assert!(open_source(&[]).is_err());
        let mixed = vec![PathBuf::from("a.fits"), PathBuf::from("b.fil")];
        assert!(open_source(&mixed).is_err());
    }
}
