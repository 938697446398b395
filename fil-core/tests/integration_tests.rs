use std::fs;

use fil_core::{
    open_source, synthetic::SyntheticObservation, translate, ChunkPlan, FilterbankReader,
    FilterbankWriter, SourceReader, TargetHeaderExt,
};
use fil_types::{ChunkWindow, OutputState, SampleData, SampleEncoding, TargetHeader};
use tempfile::TempDir;

// ===========================================================================
// Helpers
// ===========================================================================

/// Конвертирует источник в `out` окнами по `chunk` спектров, начиная с
/// состояния, найденного в файле.
fn convert_all(
    source: &mut dyn SourceReader,
    out: &std::path::Path,
    chunk: u64,
) -> u64 {
    let target = translate(source.header()).unwrap();
    let mut writer = FilterbankWriter::new(out, &target).unwrap();
    let state = writer.probe().unwrap();
    let state = writer.ensure_header(state).unwrap();

    let plan = ChunkPlan::new(source.header().nspectra, chunk)
        .unwrap()
        .resume_from(state.spectra_written())
        .unwrap();

    for window in &plan {
        let block = source.read_window(window).unwrap().cast(target.encoding);
        writer.append_block(&block).unwrap();
    }

    writer.finish().unwrap()
}

fn read_target(path: &std::path::Path) -> (TargetHeader, usize) {
    let bytes = fs::read(path).unwrap();
    TargetHeader::deserialize(&mut bytes.as_slice()).unwrap()
}

// ===========================================================================
// PSRFITS → filterbank
// ===========================================================================

#[test]
fn test_psrfits_to_filterbank() {
    let dir = TempDir::new().unwrap();
    let obs = SyntheticObservation::default();
    let paths = obs.write_psrfits(dir.path(), "obs").unwrap();
    let out = dir.path().join("obs.fil");

    let mut source = open_source(&paths).unwrap();
    let written = convert_all(source.as_mut(), &out, 20);
    assert_eq!(written, obs.total_spectra());

    let (target, header_len) = read_target(&out);
    assert_eq!(target.nchans, obs.nchans);
    assert_eq!(target.nifs, 1);
    assert_eq!(target.src_raj, 4200.0);
    assert_eq!(target.src_dej, -451500.0);
    assert_eq!(target.rawdatafile, "obs_0001.fits");

    let bytes = fs::read(&out).unwrap();
    let data = &bytes[header_len..];
    assert_eq!(data.len() as u64, obs.total_spectra() * obs.nchans as u64);
    assert_eq!(SampleData::U8(data.to_vec()), obs.expected(0, obs.total_spectra()));
}

#[test]
fn test_sub_byte_source_is_repacked_lsb_first() {
    let dir = TempDir::new().unwrap();
    let obs = SyntheticObservation {
        nbits: 4,
        ..SyntheticObservation::default()
    };
    let paths = obs.write_psrfits(dir.path(), "nib").unwrap();
    let out = dir.path().join("nib.fil");

    let mut source = open_source(&paths).unwrap();
    convert_all(source.as_mut(), &out, 1000);

    let mut back = FilterbankReader::open(&[out]).unwrap();
    assert_eq!(back.header().encoding, SampleEncoding::UInt4);
    let n = back.header().nspectra;
    assert_eq!(back.read_block(0, n).unwrap().data, obs.expected(0, n));
}

// ===========================================================================
// Докачка
// ===========================================================================

#[test]
fn test_resume_is_byte_identical() {
    let dir = TempDir::new().unwrap();
    let obs = SyntheticObservation::default();
    let paths = obs.write_psrfits(dir.path(), "obs").unwrap();

    let full = dir.path().join("full.fil");
    let mut source = open_source(&paths).unwrap();
    convert_all(source.as_mut(), &full, 16);

    // Прерванный запуск: только два первых окна
    let partial = dir.path().join("partial.fil");
    {
        let target = translate(source.header()).unwrap();
        let mut writer = FilterbankWriter::new(&partial, &target).unwrap();
        let state = writer.probe().unwrap();
        writer.ensure_header(state).unwrap();

        let plan = ChunkPlan::new(source.header().nspectra, 16).unwrap();
        for window in plan.windows().take(2) {
            let block = source.read_window(window).unwrap();
            writer.append_block(&block).unwrap();
        }
        writer.finish().unwrap();
    }

    let mut probe = FilterbankWriter::new(&partial, &translate(source.header()).unwrap()).unwrap();
    assert_eq!(probe.probe().unwrap(), OutputState::HasData { spectra: 32 });

    let appended = convert_all(source.as_mut(), &partial, 16);
    assert_eq!(appended, obs.total_spectra() - 32);
    assert_eq!(fs::read(&full).unwrap(), fs::read(&partial).unwrap());

    // Повторный запуск на полном файле ничего не дописывает
    assert_eq!(convert_all(source.as_mut(), &full, 16), 0);
    assert_eq!(fs::read(&full).unwrap(), fs::read(&partial).unwrap());
}

// ===========================================================================
// Filterbank → filterbank
// ===========================================================================

#[test]
fn test_filterbank_files_concatenate() {
    let dir = TempDir::new().unwrap();
    let obs = SyntheticObservation::default();
    let paths = obs.write_psrfits(dir.path(), "obs").unwrap();

    // Каждый PSRFITS файл в свой .fil
    let mut parts = Vec::new();
    for (i, p) in paths.iter().enumerate() {
        let out = dir.path().join(format!("part_{i}.fil"));
        let mut source = open_source(std::slice::from_ref(p)).unwrap();
        convert_all(source.as_mut(), &out, 1000);
        parts.push(out);
    }

    let mut merged = open_source(&parts).unwrap();
    assert_eq!(merged.header().nspectra, obs.total_spectra());

    let window = ChunkWindow::new(30, 20);
    assert_eq!(merged.read_window(window).unwrap().data, obs.expected(30, 20));
}

#[test]
fn test_filterbank_layout_mismatch_is_rejected() {
    let dir = TempDir::new().unwrap();
    let a = SyntheticObservation::default();
    let b = SyntheticObservation {
        nchans: 32,
        ..SyntheticObservation::default()
    };

    let mut fils = Vec::new();
    for (name, obs) in [("a", &a), ("b", &b)] {
        let paths = obs.write_psrfits(dir.path(), name).unwrap();
        let out = dir.path().join(format!("{name}.fil"));
        let mut source = open_source(&paths).unwrap();
        convert_all(source.as_mut(), &out, 1000);
        fils.push(out);
    }

    assert!(FilterbankReader::open(&fils).is_err());
}
