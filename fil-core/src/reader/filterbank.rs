use std::{
    fs::File,
    io::{BufReader, Read, Seek, SeekFrom},
    path::{Path, PathBuf},
};

use fil_types::{FilError, FilResult, LogicalHeader, SampleBlock, SampleData, TargetHeader};
use log::{debug, warn};

use crate::{
    format::{decode_samples, TargetHeaderExt},
    reader::{nearly_equal, SourceReader, SpanTable},
};

struct FilFile {
    path: PathBuf,
    file: File,
    header_len: u64,
}

/// Читатель одного или нескольких SIGPROC файлов, склеенных по времени.
pub struct FilterbankReader {
    header: LogicalHeader,
    target: TargetHeader,
    files: Vec<FilFile>,
    spans: SpanTable,
    spectrum_bytes: usize,
}

impl FilterbankReader {
    /// Открывает файлы в заданном порядке. Раскладка каналов, разрядность и
    /// `tsamp` должны совпадать.
    pub fn open(paths: &[PathBuf]) -> FilResult<Self> {
        let first_path = paths
            .first()
            .ok_or_else(|| FilError::format_violation("no filterbank files given"))?;

        let mut files = Vec::with_capacity(paths.len());
        let mut counts = Vec::with_capacity(paths.len());
        let mut first: Option<TargetHeader> = None;

        for path in paths {
            let mut reader = BufReader::new(File::open(path)?);
            let (target, header_len) = TargetHeader::deserialize(&mut reader)?;
            let file = reader.into_inner();
            let size = file.metadata()?.len();

            let spectrum_bytes = target.spectrum_bytes() as u64;
            if spectrum_bytes == 0 {
                return Err(FilError::corrupted(format!(
                    "{path:?}: {} channels of {} bits do not fill whole bytes",
                    target.nchans, target.nbits
                )));
            }

            let data_len = size.saturating_sub(header_len as u64);
            if data_len % spectrum_bytes != 0 {
                warn!(
                    "{path:?}: ignoring {} trailing bytes of an incomplete spectrum",
                    data_len % spectrum_bytes
                );
            }

            if let Some(reference) = &first {
                check_compatible(reference, &target, path)?;
            } else {
                first = Some(target.clone());
            }

            debug!(
                "Opened {path:?}: header={header_len} B, spectra={}",
                data_len / spectrum_bytes
            );

            counts.push(data_len / spectrum_bytes);
            files.push(FilFile {
                path: path.clone(),
                file,
                header_len: header_len as u64,
            });
        }

        let target = first.ok_or_else(|| FilError::format_violation("no filterbank files given"))?;
        let spans = SpanTable::new(counts)?;
        let header = target.to_logical(first_path.clone(), spans.total())?;

        Ok(Self {
            spectrum_bytes: header.spectrum_bytes(),
            header,
            target,
            files,
            spans,
        })
    }

    /// SIGPROC заголовок первого файла.
    pub fn target_header(&self) -> &TargetHeader {
        &self.target
    }
}

fn check_compatible(
    a: &TargetHeader,
    b: &TargetHeader,
    path: &PathBuf,
) -> FilResult<()> {
    if a.nchans != b.nchans
        || a.nbits != b.nbits
        || !nearly_equal(a.tsamp, b.tsamp)
        || !nearly_equal(a.fch1, b.fch1)
        || !nearly_equal(a.foff, b.foff)
    {
        return Err(FilError::format_violation(format!(
            "{path:?} does not match the layout of the first file"
        )));
    }

    Ok(())
}

impl SourceReader for FilterbankReader {
    fn header(&self) -> &LogicalHeader {
        &self.header
    }

    fn source_paths(&self) -> Vec<&Path> {
        self.files.iter().map(|f| f.path.as_path()).collect()
    }

    fn read_block(
        &mut self,
        start: u64,
        nspectra: u64,
    ) -> FilResult<SampleBlock> {
        let segments = self.spans.locate(start, nspectra)?;
        let total_values = nspectra as usize * self.header.nchans;
        let mut data = SampleData::with_capacity(self.header.encoding, total_values);

        for seg in segments {
            let f = &mut self.files[seg.file];
            let pos = f.header_len + seg.offset * self.spectrum_bytes as u64;
            let mut buf = vec![0u8; seg.len as usize * self.spectrum_bytes];

            f.file.seek(SeekFrom::Start(pos))?;
            f.file.read_exact(&mut buf).map_err(|e| {
                FilError::corrupted(format!("{:?}: short read at byte {pos}: {e}", f.path))
            })?;

            data.extend(decode_samples(&buf, self.header.encoding)?)?;
        }

        let block = SampleBlock::new(nspectra as usize, self.header.nchans, data);
        block.validate_shape()?;

        Ok(block)
    }
}
