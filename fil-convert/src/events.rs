//! События хода конвертации.
//!
//! Драйвер не пишет в лог напрямую о прогрессе: он отдаёт события в
//! [`EventSink`]. Бинарник подключает [`LogSink`], тесты свой приёмник.

use std::{path::PathBuf, sync::Mutex};

use fil_types::ChunkWindow;
use log::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum ConversionEvent {
    Started {
        output: PathBuf,
        total_spectra: u64,
        windows: u64,
    },
    /// В файле уже есть `spectra` спектров, чтение продолжается с них
    Resumed { spectra: u64 },
    HeaderWritten { bytes: u64 },
    WindowWritten {
        index: u64,
        window: ChunkWindow,
        bytes: u64,
        /// Доля готового файла после записи окна, %
        progress_pct: f64,
    },
    Finished { spectra: u64, bytes: u64 },
    /// Остановлено по флагу; файл пригоден для продолжения
    Interrupted { next_spectrum: u64 },
}

/// Приёмник событий.
pub trait EventSink: Send + Sync {
    fn emit(
        &self,
        event: &ConversionEvent,
    );
}

/// Пишет события через `log`.
#[derive(Debug, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(
        &self,
        event: &ConversionEvent,
    ) {
        match event {
            ConversionEvent::Started {
                output,
                total_spectra,
                windows,
            } => info!("Converting {total_spectra} spectra in {windows} window(s) to {output:?}"),
            ConversionEvent::Resumed { spectra } => {
                info!("Output already holds {spectra} spectra, resuming after them")
            }
            ConversionEvent::HeaderWritten { bytes } => info!("Header written ({bytes} bytes)"),
            ConversionEvent::WindowWritten {
                index,
                window,
                bytes,
                progress_pct,
            } => info!(
                "Window #{index}: spectra {window} written ({bytes} bytes, {progress_pct:.1}%)"
            ),
            ConversionEvent::Finished { spectra, bytes } => {
                info!("Done: {spectra} spectra, {bytes} bytes appended")
            }
            ConversionEvent::Interrupted { next_spectrum } => {
                warn!("Stopped before spectrum {next_spectrum}; run again to resume")
            }
        }
    }
}

/// Приёмник, который ничего не делает.
#[derive(Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(
        &self,
        _event: &ConversionEvent,
    ) {
    }
}

/// Накапливает события в памяти.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<ConversionEvent>>,
}

impl CollectingSink {
    pub fn events(&self) -> Vec<ConversionEvent> {
        match self.events.lock() {
            Ok(v) => v.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl EventSink for CollectingSink {
    fn emit(
        &self,
        event: &ConversionEvent,
    ) {
        match self.events.lock() {
            Ok(mut v) => v.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
    }
}
