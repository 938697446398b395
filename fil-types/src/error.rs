use thiserror::Error;

/// Результат для операций формата и чтения/записи.
pub type FilResult<T> = std::result::Result<T, FilError>;

/// Типы ошибок уровня формата (FITS, SIGPROC) и файлового ввода/вывода.
#[derive(Debug, Error)]
pub enum FilError {
    /// Метаданные источника не позволяют построить заголовок
    #[error("Header derivation failed: {0}")]
    HeaderDerivation(String),

    /// Неподдерживаемая разрядность выборок
    #[error("Unsupported sample width: {0} bits")]
    UnsupportedNbits(u32),

    /// Ошибка разбора FITS/PSRFITS
    #[error("FITS error: {0}")]
    Fits(String),

    /// Выходной файл существует, но его размер/содержимое не соответствует
    /// ни одному из допустимых состояний
    #[error("Ambiguous output state: {reason} (size={size}, header={header_len})")]
    ResumeAmbiguity {
        size: u64,
        header_len: u64,
        reason: String,
    },

    /// Запрошенный диапазон выходит за пределы данных источника
    #[error("Range out of bounds: start={start}, len={len}, total={total}")]
    OutOfRange { start: u64, len: u64, total: u64 },

    /// Повреждённые или некорректные данные
    #[error("Corrupted data: {0}")]
    Corrupted(String),

    /// Ошибки ввода/вывода (автоконвертируются из std::io::Error)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Нарушение правил формата
    #[error("Format violation: {0}")]
    FormatViolation(String),
}

impl FilError {
    /// Удобные конструкторы
    pub fn header<S: Into<String>>(s: S) -> Self {
        Self::HeaderDerivation(s.into())
    }

    pub fn fits<S: Into<String>>(s: S) -> Self {
        Self::Fits(s.into())
    }

    pub fn corrupted<S: Into<String>>(s: S) -> Self {
        Self::Corrupted(s.into())
    }

    pub fn format_violation<S: Into<String>>(s: S) -> Self {
        Self::FormatViolation(s.into())
    }

    pub fn ambiguity<S: Into<String>>(
        size: u64,
        header_len: u64,
        reason: S,
    ) -> Self {
        Self::ResumeAmbiguity {
            size,
            header_len,
            reason: reason.into(),
        }
    }
}
