/// Окно чтения/записи: непрерывный диапазон спектров `[start, start + len)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkWindow {
    /// Номер первого спектра
    pub start: u64,
    /// Количество спектров (> 0)
    pub len: u64,
}

impl ChunkWindow {
    pub fn new(
        start: u64,
        len: u64,
    ) -> Self {
        Self { start, len }
    }

    /// Номер спектра сразу за окном.
    pub fn end(&self) -> u64 {
        self.start + self.len
    }
}

impl std::fmt::Display for ChunkWindow {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end())
    }
}

/// Состояние выходного файла относительно заголовка и данных.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputState {
    /// Файла нет
    Absent,
    /// Файл есть, но пуст
    Empty,
    /// Записан только заголовок
    HeaderOnly,
    /// Заголовок и `spectra` полных спектров
    HasData { spectra: u64 },
}

impl OutputState {
    /// Нужно ли (ещё) записать заголовок перед данными.
    pub fn needs_header(&self) -> bool {
        matches!(self, OutputState::Absent | OutputState::Empty)
    }

    /// Сколько спектров уже лежит в файле.
    pub fn spectra_written(&self) -> u64 {
        match self {
            OutputState::HasData { spectra } => *spectra,
            _ => 0,
        }
    }
}
