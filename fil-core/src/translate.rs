//! Построение заголовка SIGPROC из логического заголовка источника.

use fil_types::{DataType, LogicalHeader, Machine, TargetHeader, Telescope};

use crate::{
    sexagesimal::{pack_dec, pack_ra},
    FilResult,
};

/// Фиксированные идентификаторы площадки/бэкенда, которые не выводятся из
/// данных.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiteProfile {
    pub telescope: Telescope,
    pub machine: Machine,
    pub data_type: DataType,
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self {
            telescope: Telescope::Gbt,
            machine: Machine::Fake,
            data_type: DataType::Raw,
        }
    }
}

/// [`translate_with`] с профилем по умолчанию.
pub fn translate(header: &LogicalHeader) -> FilResult<TargetHeader> {
    translate_with(header, &SiteProfile::default())
}

/// Строит [`TargetHeader`]. Чистая функция: без ввода/вывода.
///
/// Координаты упаковываются в шестидесятеричный вид, флаги коррекций
/// выставляются в `false`, число лучей и IF в 1. Знак `foff` сохраняется.
pub fn translate_with(
    header: &LogicalHeader,
    profile: &SiteProfile,
) -> FilResult<TargetHeader> {
    header.validate()?;

    let src_raj = pack_ra(header.ra_deg)?;
    let src_dej = pack_dec(header.dec_deg)?;

    Ok(TargetHeader {
        telescope: profile.telescope,
        machine: profile.machine,
        data_type: profile.data_type,
        rawdatafile: header
            .filename
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        source_name: header.source_name.clone(),
        barycentric: false,
        pulsarcentric: false,
        az_start: -1.0,
        za_start: -1.0,
        src_raj,
        src_dej,
        tstart: header.tstart,
        tsamp: header.tsamp,
        nbits: header.nbits,
        fch1: header.fch1,
        foff: header.foff,
        nchans: header.nchans,
        nifs: 1,
        nbeams: 1,
        ibeam: 0,
        encoding: header.encoding,
    })
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use fil_types::{FilError, SampleEncoding};

    use super::*;

    fn logical() -> LogicalHeader {
        LogicalHeader {
            filename: PathBuf::from("/data/obs_0001.fits"),
            source_name: "J0534+2200".to_string(),
            ra_deg: 10.5,
            dec_deg: -45.25,
            nchans: 4096,
            fch1: 1500.0,
            foff: -0.5,
            nbits: 8,
            tsamp: 0.000256,
            tstart: 59_000.5,
            nspectra: 100_000,
            encoding: SampleEncoding::UInt8,
        }
    }

    #[test]
    fn test_fixed_fields_and_copied_values() {
        let t = translate(&logical()).unwrap();

        assert_eq!(t.nbeams, 1);
        assert_eq!(t.nifs, 1);
        assert_eq!(t.ibeam, 0);
        assert!(!t.barycentric);
        assert!(!t.pulsarcentric);

        assert_eq!(t.nchans, 4096);
        assert_eq!(t.foff, -0.5);
        assert_eq!(t.fch1, 1500.0);
        assert_eq!(t.tsamp, 0.000256);
        assert_eq!(t.tstart, 59_000.5);
        assert_eq!(t.nbits, 8);
        assert_eq!(t.rawdatafile, "obs_0001.fits");
        assert_eq!(t.source_name, "J0534+2200");
    }

    #[test]
    fn test_coordinates_packed() {
        let t = translate(&logical()).unwrap();
        assert_eq!(t.src_raj, 4200.0);
        assert_eq!(t.src_dej, -451500.0);
    }

    #[test]
    fn test_profile_is_applied() {
        let profile = SiteProfile {
            telescope: Telescope::Parkes,
            machine: Machine::Wapp,
            data_type: DataType::Filterbank,
        };
        let t = translate_with(&logical(), &profile).unwrap();
        assert_eq!(t.telescope, Telescope::Parkes);
        assert_eq!(t.machine, Machine::Wapp);
        assert_eq!(t.data_type, DataType::Filterbank);

        let d = translate(&logical()).unwrap();
        assert_eq!(d.telescope.as_i32(), 6);
        assert_eq!(d.machine.as_i32(), 0);
    }

    #[test]
    fn test_rejects_malformed_input() {
        let mut h = logical();
        h.tsamp = 0.0;
        assert!(matches!(translate(&h), Err(FilError::HeaderDerivation(_))));

        let mut h = logical();
        h.ra_deg = f64::NAN;
        assert!(matches!(translate(&h), Err(FilError::HeaderDerivation(_))));

        let mut h = logical();
        h.nchans = 0;
        assert!(matches!(translate(&h), Err(FilError::HeaderDerivation(_))));
    }

    #[test]
    fn test_ascending_foff_preserved() {
        let mut h = logical();
        h.foff = 0.25;
        h.fch1 = 1100.0;
        let t = translate(&h).unwrap();
        assert_eq!(t.foff, 0.25);
        assert_eq!(t.fch1, 1100.0);
    }
}
