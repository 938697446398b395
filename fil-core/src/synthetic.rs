//! Синтетические наблюдения PSRFITS с предсказуемыми значениями выборок.
//!
//! Используется в тестах и для проверки конвейера без реальных данных.

use std::{
    fs,
    path::{Path, PathBuf},
};

use byteorder::{BigEndian, WriteBytesExt};
use fil_types::{FilResult, SampleData};

use crate::reader::{
    fits::{padded_len, CardValue, FitsHeader},
    psrfits::SUBINT_EXTNAME,
};

/// Параметры синтетического наблюдения, разложенного по нескольким файлам.
#[derive(Debug, Clone)]
pub struct SyntheticObservation {
    pub source_name: String,
    /// `hh:mm:ss.s`
    pub ra: String,
    /// `±dd:mm:ss.s`
    pub dec: String,
    pub nchans: usize,
    pub nbits: u32,
    pub npol: usize,
    pub nsblk: u64,
    /// Строк SUBINT в каждом файле
    pub rows_per_file: Vec<u64>,
    pub tbin: f64,
    pub fch1: f64,
    pub chan_bw: f64,
    pub stt_imjd: i64,
    pub stt_smjd: i64,
    pub stt_offs: f64,
}

impl Default for SyntheticObservation {
    fn default() -> Self {
        Self {
            source_name: "J0042-4515".to_string(),
            ra: "00:42:00.0".to_string(),
            dec: "-45:15:00.0".to_string(),
            nchans: 16,
            nbits: 8,
            npol: 1,
            nsblk: 8,
            rows_per_file: vec![5, 4, 3],
            tbin: 6.4e-5,
            fch1: 1500.0,
            chan_bw: -0.5,
            stt_imjd: 60_000,
            stt_smjd: 3_600,
            stt_offs: 0.25,
        }
    }
}

impl SyntheticObservation {
    pub fn spectra_per_file(
        &self,
        file: usize,
    ) -> u64 {
        self.rows_per_file.get(file).copied().unwrap_or(0) * self.nsblk
    }

    pub fn total_spectra(&self) -> u64 {
        self.rows_per_file.iter().sum::<u64>() * self.nsblk
    }

    // Целое значение выборки до приведения к разрядности.
    fn raw_value(
        &self,
        spectrum: u64,
        chan: usize,
        pol: usize,
    ) -> u64 {
        spectrum * 7 + chan as u64 * 3 + pol as u64 * 11
    }

    fn int_value(
        &self,
        spectrum: u64,
        chan: usize,
        pol: usize,
    ) -> u64 {
        self.raw_value(spectrum, chan, pol) % (1u64 << self.nbits.min(32))
    }

    fn float_value(
        &self,
        spectrum: u64,
        chan: usize,
        pol: usize,
    ) -> f32 {
        self.raw_value(spectrum, chan, pol) as f32 * 0.25
    }

    /// Ожидаемая интенсивность (поляризация 0) спектров
    /// `[start, start + len)` в кодировке заголовка.
    pub fn expected(
        &self,
        start: u64,
        len: u64,
    ) -> SampleData {
        let points = (start..start + len).flat_map(|s| (0..self.nchans).map(move |c| (s, c)));

        match self.nbits {
            32 => SampleData::F32(points.map(|(s, c)| self.float_value(s, c, 0)).collect()),
            16 => SampleData::U16(points.map(|(s, c)| self.int_value(s, c, 0) as u16).collect()),
            _ => SampleData::U8(points.map(|(s, c)| self.int_value(s, c, 0) as u8).collect()),
        }
    }

    /// Пишет файлы `{stem}_0001.fits`, `{stem}_0002.fits`, ... в `dir`.
    pub fn write_psrfits(
        &self,
        dir: &Path,
        stem: &str,
    ) -> FilResult<Vec<PathBuf>> {
        let mut paths = Vec::with_capacity(self.rows_per_file.len());
        let mut nsuboffs = 0u64;

        for (i, &rows) in self.rows_per_file.iter().enumerate() {
            let path = dir.join(format!("{stem}_{:04}.fits", i + 1));
            fs::write(&path, self.encode_file(nsuboffs, rows)?)?;
            paths.push(path);
            nsuboffs += rows;
        }

        Ok(paths)
    }

    fn data_bytes(&self) -> usize {
        self.nsblk as usize * self.npol * self.nchans * self.nbits as usize / 8
    }

    fn encode_file(
        &self,
        nsuboffs: u64,
        rows: u64,
    ) -> FilResult<Vec<u8>> {
        let data_bytes = self.data_bytes();
        let row_bytes = 8 + 8 + 8 * self.nchans + data_bytes;

        let mut primary = FitsHeader::new();
        primary
            .push("SIMPLE", CardValue::Bool(true))
            .push("BITPIX", CardValue::Int(8))
            .push("NAXIS", CardValue::Int(0))
            .push("EXTEND", CardValue::Bool(true))
            .push("TELESCOP", CardValue::Str("GBT".into()))
            .push("SRC_NAME", CardValue::Str(self.source_name.clone()))
            .push("RA", CardValue::Str(self.ra.clone()))
            .push("DEC", CardValue::Str(self.dec.clone()))
            .push("STT_IMJD", CardValue::Int(self.stt_imjd))
            .push("STT_SMJD", CardValue::Int(self.stt_smjd))
            .push("STT_OFFS", CardValue::Float(self.stt_offs))
            .push(
                "OBSFREQ",
                CardValue::Float(self.fch1 + (self.nchans as f64 / 2.0 - 0.5) * self.chan_bw),
            )
            .push("OBSBW", CardValue::Float(self.chan_bw * self.nchans as f64))
            .push("OBSNCHAN", CardValue::Int(self.nchans as i64));

        let mut subint = FitsHeader::new();
        subint
            .push("XTENSION", CardValue::Str("BINTABLE".into()))
            .push("BITPIX", CardValue::Int(8))
            .push("NAXIS", CardValue::Int(2))
            .push("NAXIS1", CardValue::Int(row_bytes as i64))
            .push("NAXIS2", CardValue::Int(rows as i64))
            .push("PCOUNT", CardValue::Int(0))
            .push("GCOUNT", CardValue::Int(1))
            .push("TFIELDS", CardValue::Int(4))
            .push("TTYPE1", CardValue::Str("TSUBINT".into()))
            .push("TFORM1", CardValue::Str("1D".into()))
            .push("TTYPE2", CardValue::Str("OFFS_SUB".into()))
            .push("TFORM2", CardValue::Str("1D".into()))
            .push("TTYPE3", CardValue::Str("DAT_FREQ".into()))
            .push("TFORM3", CardValue::Str(format!("{}D", self.nchans)))
            .push("TTYPE4", CardValue::Str("DATA".into()))
            .push("TFORM4", CardValue::Str(format!("{data_bytes}B")))
            .push("EXTNAME", CardValue::Str(SUBINT_EXTNAME.into()))
            .push("NPOL", CardValue::Int(self.npol as i64))
            .push("NBITS", CardValue::Int(self.nbits as i64))
            .push("NCHAN", CardValue::Int(self.nchans as i64))
            .push("NSBLK", CardValue::Int(self.nsblk as i64))
            .push("TBIN", CardValue::Float(self.tbin))
            .push("CHAN_BW", CardValue::Float(self.chan_bw))
            .push("NSUBOFFS", CardValue::Int(nsuboffs as i64));

        let mut out = primary.encode();
        out.extend(subint.encode());

        let table_start = out.len();
        let sub_len = self.nsblk as f64 * self.tbin;

        for r in 0..rows {
            let row = nsuboffs + r;
            out.write_f64::<BigEndian>(sub_len)?;
            out.write_f64::<BigEndian>((row as f64 + 0.5) * sub_len)?;

            for c in 0..self.nchans {
                out.write_f64::<BigEndian>(self.fch1 + c as f64 * self.chan_bw)?;
            }

            self.encode_row(row, &mut out)?;
        }

        let table_len = (out.len() - table_start) as u64;
        out.resize(table_start + padded_len(table_len) as usize, 0);

        Ok(out)
    }

    fn encode_row(
        &self,
        row: u64,
        out: &mut Vec<u8>,
    ) -> FilResult<()> {
        let mut packed = 0u8;
        let mut filled = 0u32;

        for s in 0..self.nsblk {
            let spectrum = row * self.nsblk + s;

            for pol in 0..self.npol {
                for c in 0..self.nchans {
                    match self.nbits {
                        32 => out.write_f32::<BigEndian>(self.float_value(spectrum, c, pol))?,
                        16 => out.write_u16::<BigEndian>(self.int_value(spectrum, c, pol) as u16)?,
                        8 => out.push(self.int_value(spectrum, c, pol) as u8),
                        n => {
                            // Старшие биты первыми
                            filled += n;
                            packed |= (self.int_value(spectrum, c, pol) as u8) << (8 - filled);
                            if filled == 8 {
                                out.push(packed);
                                packed = 0;
                                filled = 0;
                            }
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_files_are_block_aligned() {
        let dir = TempDir::new().unwrap();
        let obs = SyntheticObservation::default();
        let paths = obs.write_psrfits(dir.path(), "x").unwrap();

        assert_eq!(paths.len(), 3);
        for p in &paths {
            assert_eq!(fs::metadata(p).unwrap().len() % 2880, 0);
        }
        assert!(paths[0].ends_with("x_0001.fits"));
    }

    #[test]
    fn test_expected_shape() {
        let obs = SyntheticObservation::default();
        assert_eq!(obs.total_spectra(), 96);
        assert_eq!(obs.expected(0, 3).len(), 3 * obs.nchans);
    }
}
