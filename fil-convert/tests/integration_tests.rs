use std::{fs, path::PathBuf};

use fil_convert::{convert, ConvertConfig, ConvertError};
use fil_core::{synthetic::SyntheticObservation, FilterbankReader, SourceReader, TargetHeaderExt};
use fil_types::{SampleData, TargetHeader, Telescope};
use tempfile::TempDir;

// ===========================================================================
// Helpers
// ===========================================================================

fn observation(dir: &TempDir) -> (SyntheticObservation, Vec<PathBuf>) {
    let obs = SyntheticObservation::default();
    let paths = obs.write_psrfits(dir.path(), "psr_B0329").unwrap();
    (obs, paths)
}

fn config(
    dir: &TempDir,
    chunk: u64,
) -> ConvertConfig {
    ConvertConfig {
        output_dir: Some(dir.path().to_path_buf()),
        chunk_spectra: chunk,
        ..ConvertConfig::default()
    }
}

// ===========================================================================
// Сценарии
// ===========================================================================

#[test]
fn test_convert_multi_file_observation() {
    let dir = TempDir::new().unwrap();
    let (obs, paths) = observation(&dir);

    let summary = convert(&paths, &config(&dir, 30)).unwrap();
    assert_eq!(summary.windows_written, 4);
    assert_eq!(summary.spectra_written, obs.total_spectra());
    assert!(summary.is_complete());

    let out = dir.path().join("psr_B0329.fil");
    let mut back = FilterbankReader::open(&[out]).unwrap();
    assert_eq!(back.header().nspectra, obs.total_spectra());
    assert_eq!(back.target_header().telescope, Telescope::Gbt);

    let all = back.read_block(0, obs.total_spectra()).unwrap();
    assert_eq!(all.data, obs.expected(0, obs.total_spectra()));
}

#[test]
fn test_header_written_once_and_rerun_is_noop() {
    let dir = TempDir::new().unwrap();
    let (_, paths) = observation(&dir);
    let out = dir.path().join("psr_B0329.fil");

    convert(&paths, &config(&dir, 1_000)).unwrap();
    let first = fs::read(&out).unwrap();

    let summary = convert(&paths, &config(&dir, 1_000)).unwrap();
    assert_eq!(summary.windows_written, 0);
    assert_eq!(fs::read(&out).unwrap(), first);

    // Второго заголовка после данных нет
    let (_, header_len) = TargetHeader::deserialize(&mut first.as_slice()).unwrap();
    let marker = b"HEADER_START";
    let count = first[header_len..]
        .windows(marker.len())
        .filter(|w| *w == marker)
        .count();
    assert_eq!(count, 0);
}

#[test]
fn test_resume_after_truncation_at_spectrum_boundary() {
    let dir = TempDir::new().unwrap();
    let (obs, paths) = observation(&dir);
    let out = dir.path().join("psr_B0329.fil");

    convert(&paths, &config(&dir, 16)).unwrap();
    let full = fs::read(&out).unwrap();

    // Обрываем после 40 спектров, как будто запуск был прерван
    let (_, header_len) = TargetHeader::deserialize(&mut full.as_slice()).unwrap();
    let cut = header_len + 40 * obs.nchans;
    fs::write(&out, &full[..cut]).unwrap();

    let summary = convert(&paths, &config(&dir, 16)).unwrap();
    assert_eq!(summary.resumed_from, 40);
    assert_eq!(summary.spectra_written, obs.total_spectra() - 40);
    assert_eq!(fs::read(&out).unwrap(), full);
}

#[test]
fn test_partial_spectrum_is_refused() {
    let dir = TempDir::new().unwrap();
    let (obs, paths) = observation(&dir);
    let out = dir.path().join("psr_B0329.fil");

    convert(&paths, &config(&dir, 16)).unwrap();
    let full = fs::read(&out).unwrap();
    let (_, header_len) = TargetHeader::deserialize(&mut full.as_slice()).unwrap();
    fs::write(&out, &full[..header_len + 3 * obs.nchans + 5]).unwrap();

    let err = convert(&paths, &config(&dir, 16)).unwrap_err();
    assert!(matches!(err, ConvertError::ResumeAmbiguity { .. }), "{err}");

    // Файл не тронут
    assert_eq!(fs::read(&out).unwrap().len(), header_len + 3 * obs.nchans + 5);
}

#[test]
fn test_truncated_source_is_reported() {
    let dir = TempDir::new().unwrap();
    let (_, paths) = observation(&dir);

    // Второй файл теряет хвост таблицы
    let damaged = fs::read(&paths[1]).unwrap();
    fs::write(&paths[1], &damaged[..damaged.len() - 2880]).unwrap();

    let err = convert(&paths, &config(&dir, 16)).unwrap_err();
    match err {
        ConvertError::SourceOpen(_) | ConvertError::SourceRead { .. } => {}
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_filterbank_source_round_trips() {
    let dir = TempDir::new().unwrap();
    let (obs, paths) = observation(&dir);
    convert(&paths, &config(&dir, 50)).unwrap();

    let copy_dir = TempDir::new().unwrap();
    let fil = vec![dir.path().join("psr_B0329.fil")];
    let cfg = ConvertConfig {
        fil_name: Some("copy.fil".into()),
        ..config(&copy_dir, 7)
    };
    convert(&fil, &cfg).unwrap();

    let mut copy = FilterbankReader::open(&[copy_dir.path().join("copy.fil")]).unwrap();
    let n = copy.header().nspectra;
    assert_eq!(n, obs.total_spectra());
    assert_eq!(
        copy.read_block(0, n).unwrap().data,
        obs.expected(0, n)
    );
}

#[test]
fn test_sixteen_bit_samples() {
    let dir = TempDir::new().unwrap();
    let obs = SyntheticObservation {
        nbits: 16,
        ..SyntheticObservation::default()
    };
    let paths = obs.write_psrfits(dir.path(), "wide").unwrap();

    convert(&paths, &config(&dir, 25)).unwrap();

    let mut back = FilterbankReader::open(&[dir.path().join("wide.fil")]).unwrap();
    let block = back.read_block(10, 20).unwrap();
    assert!(matches!(block.data, SampleData::U16(_)));
    assert_eq!(block.data, obs.expected(10, 20));
}

#[test]
fn test_output_cannot_be_a_source_file() {
    let dir = TempDir::new().unwrap();
    let (_, paths) = observation(&dir);

    for name in ["a.fil", "b.fil"] {
        let cfg = ConvertConfig {
            fil_name: Some(name.into()),
            ..config(&dir, 50)
        };
        convert(&paths, &cfg).unwrap();
    }

    let a = dir.path().join("a.fil");
    let before = fs::read(&a).unwrap();

    let sources = vec![a.clone(), dir.path().join("b.fil")];
    let cfg = ConvertConfig {
        fil_name: Some("a.fil".into()),
        ..config(&dir, 50)
    };
    let err = convert(&sources, &cfg).unwrap_err();
    assert!(matches!(err, ConvertError::Config(_)), "{err}");
    assert_eq!(fs::read(&a).unwrap(), before);

    // Тот же файл через другой путь
    let nested = dir.path().join("sub");
    fs::create_dir(&nested).unwrap();
    let cfg = ConvertConfig {
        output_dir: Some(nested.join("..")),
        fil_name: Some("b.fil".into()),
        ..config(&dir, 50)
    };
    assert!(matches!(convert(&sources, &cfg), Err(ConvertError::Config(_))));
}
