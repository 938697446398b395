use std::path::PathBuf;

use serde::Serialize;

use crate::{DataType, FilError, FilResult, Machine, SampleEncoding, Telescope};

/// Логический заголовок наблюдения, собранный читателем источника по всем
/// файлам. Неизменяем после открытия источника.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogicalHeader {
    /// Путь к первому файлу источника
    pub filename: PathBuf,
    /// Имя источника (пульсара / поля)
    pub source_name: String,
    /// Прямое восхождение, градусы
    pub ra_deg: f64,
    /// Склонение, градусы
    pub dec_deg: f64,
    /// Число частотных каналов
    pub nchans: usize,
    /// Частота первого канала, МГц
    pub fch1: f64,
    /// Шаг по частоте между каналами, МГц (отрицателен при убывании)
    pub foff: f64,
    /// Разрядность выборки
    pub nbits: u32,
    /// Интервал дискретизации, секунды
    pub tsamp: f64,
    /// Время начала (MJD)
    pub tstart: f64,
    /// Общее число спектров во всех файлах
    pub nspectra: u64,
    /// Представление выборок
    pub encoding: SampleEncoding,
}

/// Заголовок выходного SIGPROC файла.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetHeader {
    pub telescope: Telescope,
    pub machine: Machine,
    pub data_type: DataType,
    /// Имя исходного файла
    pub rawdatafile: String,
    pub source_name: String,
    /// Барицентрическая коррекция (всегда false: коррекция не выполняется)
    pub barycentric: bool,
    /// Пульсароцентрическая коррекция (всегда false)
    pub pulsarcentric: bool,
    /// Азимут на начало, градусы (-1 = неизвестно)
    pub az_start: f64,
    /// Зенитный угол на начало, градусы (-1 = неизвестно)
    pub za_start: f64,
    /// RA в упакованном виде `HHMMSS.ssss`
    pub src_raj: f64,
    /// Dec в упакованном виде `±DDMMSS.ssss`
    pub src_dej: f64,
    pub tstart: f64,
    pub tsamp: f64,
    pub nbits: u32,
    pub fch1: f64,
    pub foff: f64,
    pub nchans: usize,
    /// Число IF (1: только интенсивность)
    pub nifs: u32,
    pub nbeams: u32,
    pub ibeam: u32,
    pub encoding: SampleEncoding,
}

impl LogicalHeader {
    /// Проверяет инварианты заголовка.
    pub fn validate(&self) -> FilResult<()> {
        if self.nchans == 0 {
            return Err(FilError::header("nchans must be > 0"));
        }

        if !self.tsamp.is_finite() || self.tsamp <= 0.0 {
            return Err(FilError::header(format!(
                "tsamp must be a positive finite value, got {}",
                self.tsamp
            )));
        }

        if !self.ra_deg.is_finite() || !self.dec_deg.is_finite() {
            return Err(FilError::header(format!(
                "sky position is not finite: ra={}, dec={}",
                self.ra_deg, self.dec_deg
            )));
        }

        if !self.fch1.is_finite() || !self.foff.is_finite() {
            return Err(FilError::header(format!(
                "frequency layout is not finite: fch1={}, foff={}",
                self.fch1, self.foff
            )));
        }

        if self.encoding.nbits() != self.nbits {
            return Err(FilError::header(format!(
                "nbits={} disagrees with encoding {}",
                self.nbits, self.encoding
            )));
        }

        if self.encoding.spectrum_bytes(self.nchans).is_none() {
            return Err(FilError::header(format!(
                "{} channels of {} bits do not fill whole bytes",
                self.nchans, self.nbits
            )));
        }

        Ok(())
    }

    /// Размер одного спектра в байтах.
    pub fn spectrum_bytes(&self) -> usize {
        self.encoding.spectrum_bytes(self.nchans).unwrap_or(0)
    }

    /// Длительность наблюдения в секундах.
    pub fn duration_secs(&self) -> f64 {
        self.nspectra as f64 * self.tsamp
    }
}

impl TargetHeader {
    /// Размер одного спектра в байтах.
    pub fn spectrum_bytes(&self) -> usize {
        self.encoding.spectrum_bytes(self.nchans).unwrap_or(0)
    }
}
