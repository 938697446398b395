use std::{
    fs::File,
    io::{BufReader, Read, Seek, SeekFrom},
    path::{Path, PathBuf},
};

use byteorder::{BigEndian, ByteOrder};
use fil_types::{FilError, FilResult, LogicalHeader, SampleBlock, SampleData, SampleEncoding};
use log::{debug, warn};

use crate::{
    format::unpack_sub_byte_msb,
    reader::{
        fits::{bintable_columns, read_hdus, Column, FitsHeader, Hdu},
        nearly_equal, SourceReader, SpanTable,
    },
    sexagesimal::parse_sexagesimal,
};

/// Секунд в сутках.
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Имя расширения с данными поиска.
pub const SUBINT_EXTNAME: &str = "SUBINT";

/// Параметры одного PSRFITS файла, нужные для чтения строк `SUBINT`.
struct SubintFile {
    path: PathBuf,
    file: File,
    /// Начало таблицы SUBINT
    data_offset: u64,
    /// NAXIS1
    row_bytes: u64,
    nrows: u64,
    /// Колонка DATA
    data: Column,
    nsuboffs: Option<i64>,
    source_name: String,
    ra_deg: f64,
    dec_deg: f64,
    tstart: f64,
    fch1: f64,
    nchans: usize,
    nbits: u32,
    npol: usize,
    nsblk: u64,
    tbin: f64,
    foff: f64,
}

/// Читатель наблюдения PSRFITS (search mode), разбитого на несколько файлов.
///
/// Из каждой строки `SUBINT` берётся колонка `DATA` (`NSBLK × NPOL × NCHAN`
/// выборок). Интенсивностью считается поляризация 0.
pub struct PsrfitsReader {
    header: LogicalHeader,
    files: Vec<SubintFile>,
    spans: SpanTable,
    /// Последняя прочитанная строка: (файл, строка, байты DATA)
    cache: Option<(usize, u64, Vec<u8>)>,
}

impl PsrfitsReader {
    /// Открывает файлы наблюдения. Если у всех файлов есть `NSUBOFFS`, они
    /// упорядочиваются по нему, иначе сохраняется порядок аргументов.
    pub fn open(paths: &[PathBuf]) -> FilResult<Self> {
        if paths.is_empty() {
            return Err(FilError::format_violation("no PSRFITS files given"));
        }

        let mut files = paths
            .iter()
            .map(|p| open_file(p.clone()))
            .collect::<FilResult<Vec<_>>>()?;

        if files.iter().all(|f| f.nsuboffs.is_some()) {
            files.sort_by_key(|f| f.nsuboffs);
        }

        let first = &files[0];
        for f in &files[1..] {
            if f.nchans != first.nchans
                || f.nbits != first.nbits
                || f.npol != first.npol
                || !nearly_equal(f.tbin, first.tbin)
                || !nearly_equal(f.foff, first.foff)
                || !nearly_equal(f.fch1, first.fch1)
            {
                return Err(FilError::fits(format!(
                    "{:?} does not match the layout of {:?}",
                    f.path, first.path
                )));
            }
        }

        let counts = files
            .iter()
            .map(|f| {
                f.nrows.checked_mul(f.nsblk).ok_or_else(|| {
                    FilError::header(format!("{:?}: NAXIS2×NSBLK overflows", f.path))
                })
            })
            .collect::<FilResult<Vec<u64>>>()?;
        let spans = SpanTable::new(counts)?;
        let encoding = SampleEncoding::from_nbits(first.nbits)?;

        let header = LogicalHeader {
            filename: first.path.clone(),
            source_name: first.source_name.clone(),
            ra_deg: first.ra_deg,
            dec_deg: first.dec_deg,
            nchans: first.nchans,
            fch1: first.fch1,
            foff: first.foff,
            nbits: first.nbits,
            tsamp: first.tbin,
            tstart: first.tstart,
            nspectra: spans.total(),
            encoding,
        };
        header.validate()?;

        debug!(
            "PSRFITS source: {} file(s), {} spectra, {} channels, {} bits",
            files.len(),
            header.nspectra,
            header.nchans,
            header.nbits
        );

        Ok(Self {
            header,
            files,
            spans,
            cache: None,
        })
    }

    /// Байты одного спектра в колонке DATA (все поляризации).
    fn spectrum_stride(&self) -> usize {
        self.header.spectrum_bytes() * self.files[0].npol
    }

    fn load_row(
        &mut self,
        file: usize,
        row: u64,
    ) -> FilResult<&[u8]> {
        let hit = matches!(&self.cache, Some((f, r, _)) if *f == file && *r == row);

        if !hit {
            let f = &mut self.files[file];
            let pos = f.data_offset + row * f.row_bytes + f.data.offset as u64;
            let mut buf = vec![0u8; f.data.bytes];

            f.file.seek(SeekFrom::Start(pos))?;
            f.file.read_exact(&mut buf).map_err(|e| {
                FilError::fits(format!("{:?}: cannot read SUBINT row {row}: {e}", f.path))
            })?;

            self.cache = Some((file, row, buf));
        }

        match &self.cache {
            Some((_, _, bytes)) => Ok(bytes),
            None => Err(FilError::corrupted("row cache is empty")),
        }
    }
}

impl SourceReader for PsrfitsReader {
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
        let pol0 = self.header.spectrum_bytes();
        let stride = self.spectrum_stride();
        let mut raw = Vec::with_capacity(nspectra as usize * pol0);

        for seg in segments {
            let nsblk = self.files[seg.file].nsblk;
            let mut spectrum = seg.offset;
            let end = seg.offset + seg.len;

            while spectrum < end {
                let row = spectrum / nsblk;
                let first = spectrum % nsblk;
                let count = (nsblk - first).min(end - spectrum);
                let bytes = self.load_row(seg.file, row)?;

                for s in first..first + count {
                    let from = s as usize * stride;
                    raw.extend_from_slice(&bytes[from..from + pol0]);
                }

                spectrum += count;
            }
        }

        let data = decode_big_endian(&raw, self.header.encoding)?;
        let block = SampleBlock::new(nspectra as usize, self.header.nchans, data);
        block.validate_shape()?;

        Ok(block)
    }
}

fn open_file(path: PathBuf) -> FilResult<SubintFile> {
    let mut reader = BufReader::new(File::open(&path)?);
    let hdus = read_hdus(&mut reader)?;
    let file = reader.into_inner();

    let subint = find_subint(&hdus).ok_or_else(|| {
        FilError::fits(format!("{path:?} has no {SUBINT_EXTNAME} extension"))
    })?;
    let primary = &hdus[0].header;
    let h = &subint.header;

    let nchans = positive(h, "NCHAN")? as usize;
    let nbits = positive(h, "NBITS")? as u32;
    let npol = h.int("NPOL").unwrap_or(1).max(1) as usize;
    let nsblk = positive(h, "NSBLK")? as u64;
    let nrows = h.require_int("NAXIS2")?.max(0) as u64;
    let row_bytes = positive(h, "NAXIS1")? as u64;
    let tbin = h.require_float("TBIN")?;
    let nsuboffs = h.int("NSUBOFFS");

    let foff = match h.float("CHAN_BW") {
        Some(bw) => bw,
        None => primary.require_float("OBSBW")? / nchans as f64,
    };

    let columns = bintable_columns(h)?;
    let data = columns
        .iter()
        .find(|c| c.name == "DATA")
        .cloned()
        .ok_or_else(|| FilError::fits(format!("{path:?}: SUBINT has no DATA column")))?;

    let expected = (nsblk as usize)
        .checked_mul(npol)
        .and_then(|n| n.checked_mul(nchans))
        .and_then(|n| n.checked_mul(nbits as usize))
        .map(|bits| bits / 8)
        .ok_or_else(|| FilError::fits(format!("{path:?}: NSBLK×NPOL×NCHAN overflows")))?;
    if data.bytes < expected {
        return Err(FilError::fits(format!(
            "{path:?}: DATA column holds {} bytes, NSBLK×NPOL×NCHAN needs {expected}",
            data.bytes
        )));
    }

    let mut file = file;
    let fch1 = match columns.iter().find(|c| c.name == "DAT_FREQ") {
        Some(col) if nrows > 0 => read_first_freq(&mut file, subint.data_offset, col)?,
        _ => {
            let obsfreq = primary.require_float("OBSFREQ")?;
            obsfreq - (nchans as f64 / 2.0 - 0.5) * foff
        }
    };

    let imjd = primary.require_float("STT_IMJD")?;
    let smjd = primary.require_float("STT_SMJD")?;
    let offs = primary.float("STT_OFFS").unwrap_or(0.0);
    let skipped = nsuboffs.unwrap_or(0).max(0) as f64 * nsblk as f64 * tbin;
    let tstart = imjd + (smjd + offs + skipped) / SECONDS_PER_DAY;

    let ra_deg = parse_sexagesimal(primary.require_str("RA")?)? * 15.0;
    let dec_deg = parse_sexagesimal(primary.require_str("DEC")?)?;
    let source_name = primary.str("SRC_NAME").unwrap_or_default().to_string();

    if npol > 1 {
        warn!("{path:?}: {npol} polarisations, using polarisation 0 only");
    }

    Ok(SubintFile {
        path,
        file,
        data_offset: subint.data_offset,
        row_bytes,
        nrows,
        data,
        nsuboffs,
        source_name,
        ra_deg,
        dec_deg,
        tstart,
        fch1,
        nchans,
        nbits,
        npol,
        nsblk,
        tbin,
        foff,
    })
}

fn find_subint(hdus: &[Hdu]) -> Option<&Hdu> {
    hdus.iter().find(|h| h.header.extname() == Some(SUBINT_EXTNAME))
}

fn positive(
    h: &FitsHeader,
    key: &str,
) -> FilResult<i64> {
    let v = h.require_int(key)?;
    if v <= 0 {
        return Err(FilError::header(format!("{key} must be positive, got {v}")));
    }
    Ok(v)
}

fn read_first_freq(
    file: &mut File,
    table_offset: u64,
    col: &Column,
) -> FilResult<f64> {
    let mut buf = [0u8; 8];

    file.seek(SeekFrom::Start(table_offset + col.offset as u64))?;

    match col.code {
        'D' => {
            file.read_exact(&mut buf)?;
            Ok(BigEndian::read_f64(&buf))
        }
        'E' => {
            file.read_exact(&mut buf[..4])?;
            Ok(BigEndian::read_f32(&buf[..4]) as f64)
        }
        c => Err(FilError::fits(format!("DAT_FREQ has unsupported type '{c}'"))),
    }
}

/// Байты PSRFITS (big-endian, суб-байтовые старшими битами вперёд) в значения.
pub fn decode_big_endian(
    bytes: &[u8],
    encoding: SampleEncoding,
) -> FilResult<SampleData> {
    let width = match encoding {
        SampleEncoding::UInt16 => 2,
        SampleEncoding::UInt32 | SampleEncoding::Float32 => 4,
        _ => 1,
    };

    if bytes.len() % width != 0 {
        return Err(FilError::corrupted(format!(
            "{} bytes is not a multiple of sample width {width}",
            bytes.len()
        )));
    }

    Ok(match encoding {
        SampleEncoding::UInt8 => SampleData::U8(bytes.to_vec()),
        SampleEncoding::UInt1 | SampleEncoding::UInt2 | SampleEncoding::UInt4 => {
            SampleData::U8(unpack_sub_byte_msb(bytes, encoding.nbits()))
        }
        SampleEncoding::UInt16 => {
            let mut v = vec![0u16; bytes.len() / 2];
            BigEndian::read_u16_into(bytes, &mut v);
            SampleData::U16(v)
        }
        SampleEncoding::UInt32 => {
            let mut v = vec![0u32; bytes.len() / 4];
            BigEndian::read_u32_into(bytes, &mut v);
            SampleData::U32(v)
        }
        SampleEncoding::Float32 => {
            let mut v = vec![0f32; bytes.len() / 4];
            BigEndian::read_f32_into(bytes, &mut v);
            SampleData::F32(v)
        }
    })
}
