//! Формат SIGPROC filterbank.
//!
//! Файл состоит из ключевого заголовка и сырых выборок:
//!
//! ```text
//! HEADER_START
//!   <key> <value>      ключ: строка (i32 длина + байты),
//!   ...                значение: i32, f64 или строка
//! HEADER_END
//! <spectrum 0><spectrum 1>...   nchans выборок на спектр, без разделителей
//! ```
//!
//! Все числа хранятся в порядке little-endian. Суб-байтовые выборки
//! упаковываются начиная с младших битов.

use std::io::Read;

use byteorder::{ByteOrder, LittleEndian};
use fil_types::{
    DataType, FilError, FilResult, LogicalHeader, Machine, SampleData, SampleEncoding,
    TargetHeader, Telescope,
};
use log::warn;

use crate::{
    binary::{
        read_byte, read_double, read_int, read_key, read_string, string_len, write_double, write_int,
        write_keyed_string, write_string,
    },
    sexagesimal::Sexagesimal,
};

/// Маркер начала заголовка.
pub const HEADER_START: &str = "HEADER_START";

/// Маркер конца заголовка.
pub const HEADER_END: &str = "HEADER_END";

/// Расширение выходных файлов.
pub const FIL_EXTENSION: &str = "fil";

const INT_KEYS: &[&str] = &[
    "telescope_id",
    "machine_id",
    "data_type",
    "barycentric",
    "pulsarcentric",
    "nbits",
    "nsamples",
    "nchans",
    "nifs",
    "nbeams",
    "ibeam",
];

const DOUBLE_KEYS: &[&str] = &[
    "az_start",
    "za_start",
    "src_raj",
    "src_dej",
    "tstart",
    "tsamp",
    "fch1",
    "foff",
    "refdm",
    "period",
    "gal_l",
    "gal_b",
    "header_tobs",
    "fchannel",
];

const STRING_KEYS: &[&str] = &["rawdatafile", "source_name"];

/// Ключи с однобайтовым значением.
const BYTE_KEYS: &[&str] = &["signed"];

/// Сериализация/десериализация [`TargetHeader`] в формате SIGPROC.
pub trait TargetHeaderExt: Sized {
    /// Байты заголовка от `HEADER_START` до `HEADER_END` включительно.
    fn serialize(&self) -> FilResult<Vec<u8>>;

    /// Длина заголовка без сериализации. Зависит только от полей заголовка.
    fn encoded_len(&self) -> usize;

    /// Читает заголовок, возвращая его и число прочитанных байт.
    fn deserialize<R: Read>(r: &mut R) -> FilResult<(Self, usize)>;

    /// Логический заголовок для файла, содержащего `nspectra` спектров.
    fn to_logical(
        &self,
        filename: std::path::PathBuf,
        nspectra: u64,
    ) -> FilResult<LogicalHeader>;
}

impl TargetHeaderExt for TargetHeader {
    fn serialize(&self) -> FilResult<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.encoded_len());

        write_string(&mut buf, HEADER_START)?;
        write_int(&mut buf, "telescope_id", self.telescope.as_i32())?;
        write_int(&mut buf, "machine_id", self.machine.as_i32())?;
        write_int(&mut buf, "data_type", self.data_type.as_i32())?;
        write_keyed_string(&mut buf, "rawdatafile", &self.rawdatafile)?;
        write_keyed_string(&mut buf, "source_name", &self.source_name)?;
        write_int(&mut buf, "barycentric", self.barycentric as i32)?;
        write_int(&mut buf, "pulsarcentric", self.pulsarcentric as i32)?;
        write_double(&mut buf, "az_start", self.az_start)?;
        write_double(&mut buf, "za_start", self.za_start)?;
        write_double(&mut buf, "src_raj", self.src_raj)?;
        write_double(&mut buf, "src_dej", self.src_dej)?;
        write_double(&mut buf, "tstart", self.tstart)?;
        write_double(&mut buf, "tsamp", self.tsamp)?;
        write_int(&mut buf, "nbits", self.nbits as i32)?;
        write_double(&mut buf, "fch1", self.fch1)?;
        write_double(&mut buf, "foff", self.foff)?;
        write_int(&mut buf, "nchans", self.nchans as i32)?;
        write_int(&mut buf, "nifs", self.nifs as i32)?;
        write_int(&mut buf, "ibeam", self.ibeam as i32)?;
        write_int(&mut buf, "nbeams", self.nbeams as i32)?;
        write_string(&mut buf, HEADER_END)?;

        Ok(buf)
    }

    fn encoded_len(&self) -> usize {
        let int = |key: &str| string_len(key) + 4;
        let double = |key: &str| string_len(key) + 8;

        string_len(HEADER_START)
            + int("telescope_id")
            + int("machine_id")
            + int("data_type")
            + string_len("rawdatafile")
            + string_len(&self.rawdatafile)
            + string_len("source_name")
            + string_len(&self.source_name)
            + int("barycentric")
            + int("pulsarcentric")
            + double("az_start")
            + double("za_start")
            + double("src_raj")
            + double("src_dej")
            + double("tstart")
            + double("tsamp")
            + int("nbits")
            + double("fch1")
            + double("foff")
            + int("nchans")
            + int("nifs")
            + int("ibeam")
            + int("nbeams")
            + string_len(HEADER_END)
    }

    fn deserialize<R: Read>(r: &mut R) -> FilResult<(Self, usize)> {
        let mut r = CountingReader::new(r);

        let start = read_key(&mut r)?;
        if start != HEADER_START {
            return Err(FilError::corrupted(format!(
                "Not a SIGPROC header: expected {HEADER_START}, found {start:?}"
            )));
        }

        let mut ints = std::collections::HashMap::new();
        let mut doubles = std::collections::HashMap::new();
        let mut strings = std::collections::HashMap::new();

        loop {
            let key = read_key(&mut r)?;

            if key == HEADER_END {
                break;
            }

            let key_ref = key.as_str();
            if INT_KEYS.contains(&key_ref) {
                ints.insert(key, read_int(&mut r)?);
            } else if DOUBLE_KEYS.contains(&key_ref) {
                doubles.insert(key, read_double(&mut r)?);
            } else if STRING_KEYS.contains(&key_ref) {
                strings.insert(key, read_string(&mut r)?);
            } else if BYTE_KEYS.contains(&key_ref) {
                if read_byte(&mut r)? != 0 {
                    warn!("Header marks samples as {key}; they are read as unsigned");
                }
            } else {
                return Err(FilError::corrupted(format!("Unknown header key {key:?}")));
            }
        }

        let require_int = |k: &str| {
            ints.get(k)
                .copied()
                .ok_or_else(|| FilError::corrupted(format!("Missing header key {k}")))
        };
        let require_double = |k: &str| {
            doubles
                .get(k)
                .copied()
                .ok_or_else(|| FilError::corrupted(format!("Missing header key {k}")))
        };

        let nbits = require_int("nbits")?;
        let nchans = require_int("nchans")?;

        if nbits <= 0 || nchans <= 0 {
            return Err(FilError::corrupted(format!(
                "Invalid layout: nbits={nbits}, nchans={nchans}"
            )));
        }

        let encoding = SampleEncoding::from_nbits(nbits as u32)?;
        let data_type = ints.get("data_type").copied().unwrap_or(1);

        let header = TargetHeader {
            telescope: Telescope::from_i32(ints.get("telescope_id").copied().unwrap_or(0)),
            machine: Machine::from_i32(ints.get("machine_id").copied().unwrap_or(0)),
            data_type: DataType::from_i32(data_type).ok_or_else(|| {
                FilError::corrupted(format!("Unknown data_type {data_type}"))
            })?,
            rawdatafile: strings.remove("rawdatafile").unwrap_or_default(),
            source_name: strings.remove("source_name").unwrap_or_default(),
            barycentric: ints.get("barycentric").copied().unwrap_or(0) != 0,
            pulsarcentric: ints.get("pulsarcentric").copied().unwrap_or(0) != 0,
            az_start: doubles.get("az_start").copied().unwrap_or(-1.0),
            za_start: doubles.get("za_start").copied().unwrap_or(-1.0),
            src_raj: doubles.get("src_raj").copied().unwrap_or(0.0),
            src_dej: doubles.get("src_dej").copied().unwrap_or(0.0),
            tstart: doubles.get("tstart").copied().unwrap_or(0.0),
            tsamp: require_double("tsamp")?,
            nbits: nbits as u32,
            fch1: require_double("fch1")?,
            foff: require_double("foff")?,
            nchans: nchans as usize,
            nifs: ints.get("nifs").copied().unwrap_or(1) as u32,
            nbeams: ints.get("nbeams").copied().unwrap_or(1) as u32,
            ibeam: ints.get("ibeam").copied().unwrap_or(0) as u32,
            encoding,
        };

        Ok((header, r.count))
    }

    fn to_logical(
        &self,
        filename: std::path::PathBuf,
        nspectra: u64,
    ) -> FilResult<LogicalHeader> {
        let ra = Sexagesimal::unpack(self.src_raj)?;
        let dec = Sexagesimal::unpack(self.src_dej)?;

        let header = LogicalHeader {
            filename,
            source_name: self.source_name.clone(),
            ra_deg: ra.ra_degrees(),
            dec_deg: dec.dec_degrees(),
            nchans: self.nchans,
            fch1: self.fch1,
            foff: self.foff,
            nbits: self.nbits,
            tsamp: self.tsamp,
            tstart: self.tstart,
            nspectra,
            encoding: self.encoding,
        };

        header.validate()?;
        Ok(header)
    }
}

/// Кодирует значения в байты кодировки `encoding`.
///
/// Тип буфера должен соответствовать кодировке (см. [`SampleData::cast`]).
pub fn encode_samples(
    data: &SampleData,
    encoding: SampleEncoding,
) -> FilResult<Vec<u8>> {
    match (encoding, data) {
        (SampleEncoding::UInt8, SampleData::U8(v)) => Ok(v.clone()),
        (SampleEncoding::UInt1 | SampleEncoding::UInt2 | SampleEncoding::UInt4, SampleData::U8(v)) => {
            pack_sub_byte(v, encoding.nbits())
        }
        (SampleEncoding::UInt16, SampleData::U16(v)) => {
            let mut buf = vec![0u8; v.len() * 2];
            LittleEndian::write_u16_into(v, &mut buf);
            Ok(buf)
        }
        (SampleEncoding::UInt32, SampleData::U32(v)) => {
            let mut buf = vec![0u8; v.len() * 4];
            LittleEndian::write_u32_into(v, &mut buf);
            Ok(buf)
        }
        (SampleEncoding::Float32, SampleData::F32(v)) => {
            let mut buf = vec![0u8; v.len() * 4];
            LittleEndian::write_f32_into(v, &mut buf);
            Ok(buf)
        }
        _ => Err(FilError::format_violation(format!(
            "sample buffer type does not match encoding {encoding}"
        ))),
    }
}

/// Обратное к [`encode_samples`].
pub fn decode_samples(
    bytes: &[u8],
    encoding: SampleEncoding,
) -> FilResult<SampleData> {
    match encoding {
        SampleEncoding::UInt8 => Ok(SampleData::U8(bytes.to_vec())),
        SampleEncoding::UInt1 | SampleEncoding::UInt2 | SampleEncoding::UInt4 => {
            Ok(SampleData::U8(unpack_sub_byte_lsb(bytes, encoding.nbits())))
        }
        SampleEncoding::UInt16 => {
            check_multiple(bytes.len(), 2)?;
            let mut v = vec![0u16; bytes.len() / 2];
            LittleEndian::read_u16_into(bytes, &mut v);
            Ok(SampleData::U16(v))
        }
        SampleEncoding::UInt32 => {
            check_multiple(bytes.len(), 4)?;
            let mut v = vec![0u32; bytes.len() / 4];
            LittleEndian::read_u32_into(bytes, &mut v);
            Ok(SampleData::U32(v))
        }
        SampleEncoding::Float32 => {
            check_multiple(bytes.len(), 4)?;
            let mut v = vec![0f32; bytes.len() / 4];
            LittleEndian::read_f32_into(bytes, &mut v);
            Ok(SampleData::F32(v))
        }
    }
}

fn check_multiple(
    len: usize,
    width: usize,
) -> FilResult<()> {
    if len % width != 0 {
        return Err(FilError::corrupted(format!(
            "{len} bytes is not a multiple of sample width {width}"
        )));
    }
    Ok(())
}

// Первая выборка в младших битах байта.
fn pack_sub_byte(
    samples: &[u8],
    nbits: u32,
) -> FilResult<Vec<u8>> {
    let per_byte = (8 / nbits) as usize;

    if samples.len() % per_byte != 0 {
        return Err(FilError::format_violation(format!(
            "{} samples of {nbits} bits do not fill whole bytes",
            samples.len()
        )));
    }

    let mask = ((1u16 << nbits) - 1) as u8;

    Ok(samples
        .chunks_exact(per_byte)
        .map(|group| {
            group
                .iter()
                .enumerate()
                .fold(0u8, |acc, (j, &s)| acc | ((s & mask) << (j as u32 * nbits)))
        })
        .collect())
}

/// Распаковка суб-байтовых выборок SIGPROC (младшие биты первыми).
pub fn unpack_sub_byte_lsb(
    bytes: &[u8],
    nbits: u32,
) -> Vec<u8> {
    let per_byte = (8 / nbits) as usize;
    let mask = ((1u16 << nbits) - 1) as u8;
    let mut out = Vec::with_capacity(bytes.len() * per_byte);

    for &b in bytes {
        for j in 0..per_byte {
            out.push((b >> (j as u32 * nbits)) & mask);
        }
    }

    out
}

/// Распаковка суб-байтовых выборок PSRFITS (старшие биты первыми).
pub fn unpack_sub_byte_msb(
    bytes: &[u8],
    nbits: u32,
) -> Vec<u8> {
    let per_byte = (8 / nbits) as usize;
    let mask = ((1u16 << nbits) - 1) as u8;
    let mut out = Vec::with_capacity(bytes.len() * per_byte);

    for &b in bytes {
        for j in 0..per_byte {
            let shift = 8 - nbits * (j as u32 + 1);
            out.push((b >> shift) & mask);
        }
    }

    out
}

struct CountingReader<'a, R: Read> {
    inner: &'a mut R,
    count: usize,
}

impl<'a, R: Read> CountingReader<'a, R> {
    fn new(inner: &'a mut R) -> Self {
        Self { inner, count: 0 }
    }
}

impl<R: Read> Read for CountingReader<'_, R> {
    fn read(
        &mut self,
        buf: &mut [u8],
    ) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count += n;
        Ok(n)
    }
}
