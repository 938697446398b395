use std::path::PathBuf;

use fil_types::{ChunkWindow, FilError};
use thiserror::Error;

pub type ConvertResult<T> = std::result::Result<T, ConvertError>;

/// Ошибки запуска конвертации. Все фатальны: запуск прерывается сразу,
/// повторов нет. Ранее дописанные окна остаются в файле.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Заголовок источника не переводится в SIGPROC (до любой записи)
    #[error("Cannot derive output header: {0}")]
    HeaderDerivation(#[source] FilError),

    /// Источник не открылся
    #[error("Cannot open source: {0}")]
    SourceOpen(#[source] FilError),

    /// Ошибка чтения окна; в выходной файл это окно не попало
    #[error("Failed to read spectra {window}: {source}")]
    SourceRead {
        window: ChunkWindow,
        #[source]
        source: FilError,
    },

    /// Ошибка записи в выходной файл
    #[error("Failed to write {path:?}{}: {source}", fmt_window(.window))]
    OutputWrite {
        path: PathBuf,
        window: Option<ChunkWindow>,
        #[source]
        source: FilError,
    },

    /// Выходной файл в состоянии, которое нельзя однозначно продолжить
    #[error(
        "Refusing to resume {path:?}: {reason} (size={size} B, header={header_len} B). \
         Remove or move the file to start over"
    )]
    ResumeAmbiguity {
        path: PathBuf,
        size: u64,
        header_len: u64,
        reason: String,
    },

    /// Некорректная конфигурация
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Ошибка потока предварительного чтения
    #[error("Pipeline error: {0}")]
    Pipeline(String),
}

fn fmt_window(window: &Option<ChunkWindow>) -> String {
    match window {
        Some(w) => format!(" at spectra {w}"),
        None => String::new(),
    }
}

impl ConvertError {
    /// Ошибка писателя с контекстом. [`FilError::ResumeAmbiguity`]
    /// поднимается в [`ConvertError::ResumeAmbiguity`].
    pub fn output(
        path: PathBuf,
        window: Option<ChunkWindow>,
        source: FilError,
    ) -> Self {
        match source {
            FilError::ResumeAmbiguity {
                size,
                header_len,
                reason,
            } => ConvertError::ResumeAmbiguity {
                path,
                size,
                header_len,
                reason,
            },
            source => ConvertError::OutputWrite {
                path,
                window,
                source,
            },
        }
    }

    /// Окно, на котором произошла ошибка, если известно.
    pub fn window(&self) -> Option<ChunkWindow> {
        match self {
            ConvertError::SourceRead { window, .. } => Some(*window),
            ConvertError::OutputWrite { window, .. } => *window,
            _ => None,
        }
    }
}
