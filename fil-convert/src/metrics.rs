use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Instant,
};

/// Счётчики конвертации, доступные из других потоков во время работы.
#[derive(Debug, Default)]
pub struct ConversionMetrics {
    pub windows_written: AtomicU64,
    pub spectra_written: AtomicU64,
    pub bytes_written: AtomicU64,
    /// Спектров, уже бывших в файле до запуска
    pub resumed_from: AtomicU64,
}

/// Итог запуска.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionSummary {
    pub duration_secs: f64,
    pub windows_written: u64,
    pub spectra_written: u64,
    pub bytes_written: u64,
    pub resumed_from: u64,
    pub total_spectra: u64,
    pub write_speed_mbps: f64,
    pub interrupted: bool,
}

impl ConversionMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Скорость записи в МБ/с.
    pub fn write_speed_mbps(
        &self,
        elapsed: &Instant,
    ) -> f64 {
        let secs = elapsed.elapsed().as_secs_f64();

        if secs < 1e-9 {
            return 0.0;
        }

        self.bytes_written.load(Ordering::Relaxed) as f64 / secs / 1_000_000.0
    }

    /// Доля готового файла (0.0-100.0).
    pub fn progress_pct(
        &self,
        total_spectra: u64,
    ) -> f64 {
        if total_spectra == 0 {
            return 100.0;
        }

        let done = self.resumed_from.load(Ordering::Relaxed)
            + self.spectra_written.load(Ordering::Relaxed);
        done as f64 / total_spectra as f64 * 100.0
    }

    pub fn summary(
        &self,
        elapsed: &Instant,
        total_spectra: u64,
        interrupted: bool,
    ) -> ConversionSummary {
        ConversionSummary {
            duration_secs: elapsed.elapsed().as_secs_f64(),
            windows_written: self.windows_written.load(Ordering::Relaxed),
            spectra_written: self.spectra_written.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            resumed_from: self.resumed_from.load(Ordering::Relaxed),
            total_spectra,
            write_speed_mbps: self.write_speed_mbps(elapsed),
            interrupted,
        }
    }
}

impl ConversionSummary {
    /// Все спектры источника уже в файле.
    pub fn is_complete(&self) -> bool {
        self.resumed_from + self.spectra_written == self.total_spectra
    }
}

impl std::fmt::Display for ConversionSummary {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        writeln!(f, "  Duration      : {:.1}s", self.duration_secs)?;
        writeln!(f, "  Windows       : {}", self.windows_written)?;
        writeln!(
            f,
            "  Spectra       : {} of {} (resumed after {})",
            self.spectra_written, self.total_spectra, self.resumed_from
        )?;
        writeln!(
            f,
            "  Bytes written : {:.1} MB",
            self.bytes_written as f64 / 1e6
        )?;
        writeln!(f, "  Write speed   : {:.1} MB/s", self.write_speed_mbps)?;
        writeln!(
            f,
            "  Status        : {}",
            if self.interrupted { "interrupted" } else { "complete" }
        )?;
        write!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")
    }
}
