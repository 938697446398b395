//! Минимальный разбор FITS: заголовки HDU из 80-символьных карточек и
//! раскладка колонок BINTABLE.
//!
//! Пишет тоже только заголовки ([`FitsHeader::encode`]), данные HDU
//! вызывающий код готовит сам.

use std::{
    fmt,
    io::{ErrorKind, Read, Seek, SeekFrom},
};

use fil_types::{FilError, FilResult};

/// Размер FITS блока в байтах.
pub const FITS_BLOCK: usize = 2880;

/// Длина одной карточки заголовка.
pub const CARD_LEN: usize = 80;

/// Значение карточки.
#[derive(Debug, Clone, PartialEq)]
pub enum CardValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    None,
}

impl CardValue {
    fn parse(raw: &str) -> FilResult<Self> {
        let raw = raw.trim_start();

        if let Some(rest) = raw.strip_prefix('\'') {
            return parse_quoted(rest).map(CardValue::Str);
        }

        let value = match raw.find('/') {
            Some(i) => raw[..i].trim(),
            None => raw.trim(),
        };

        Ok(match value {
            "" => CardValue::None,
            "T" => CardValue::Bool(true),
            "F" => CardValue::Bool(false),
            v => {
                if let Ok(i) = v.parse::<i64>() {
                    CardValue::Int(i)
                } else {
                    let normalized = v.replace(['D', 'd'], "E");
                    normalized
                        .parse::<f64>()
                        .map(CardValue::Float)
                        .map_err(|_| FilError::fits(format!("Cannot parse card value '{v}'")))?
                }
            }
        })
    }
}

// Строка до закрывающей кавычки; `''` внутри означает одну кавычку.
fn parse_quoted(rest: &str) -> FilResult<String> {
    let mut out = String::new();
    let mut chars = rest.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\'' {
            if chars.peek() == Some(&'\'') {
                out.push('\'');
                chars.next();
            } else {
                return Ok(out.trim_end().to_string());
            }
        } else {
            out.push(c);
        }
    }

    Err(FilError::fits(format!("Unterminated string value '{rest}'")))
}

impl fmt::Display for CardValue {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            CardValue::Str(s) => write!(f, "'{:<8}'", s.replace('\'', "''")),
            CardValue::Int(i) => write!(f, "{i:>20}"),
            CardValue::Float(v) => write!(f, "{:>20}", format!("{v:E}")),
            CardValue::Bool(b) => write!(f, "{:>20}", if *b { "T" } else { "F" }),
            CardValue::None => Ok(()),
        }
    }
}

/// Заголовок одного HDU: карточки в порядке появления.
#[derive(Debug, Clone, Default)]
pub struct FitsHeader {
    cards: Vec<(String, CardValue)>,
}

impl FitsHeader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Добавляет карточку (для построения заголовков).
    pub fn push<K: Into<String>>(
        &mut self,
        key: K,
        value: CardValue,
    ) -> &mut Self {
        self.cards.push((key.into(), value));
        self
    }

    pub fn get(
        &self,
        key: &str,
    ) -> Option<&CardValue> {
        self.cards.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains(
        &self,
        key: &str,
    ) -> bool {
        self.get(key).is_some()
    }

    pub fn str(
        &self,
        key: &str,
    ) -> Option<&str> {
        match self.get(key) {
            Some(CardValue::Str(s)) => Some(s),
            _ => None,
        }
    }

    pub fn int(
        &self,
        key: &str,
    ) -> Option<i64> {
        match self.get(key) {
            Some(CardValue::Int(i)) => Some(*i),
            _ => None,
        }
    }

    /// Целые значения тоже возвращаются как `f64`.
    pub fn float(
        &self,
        key: &str,
    ) -> Option<f64> {
        match self.get(key) {
            Some(CardValue::Float(v)) => Some(*v),
            Some(CardValue::Int(i)) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn require_str(
        &self,
        key: &str,
    ) -> FilResult<&str> {
        self.str(key)
            .ok_or_else(|| FilError::fits(format!("Missing string keyword {key}")))
    }

    pub fn require_int(
        &self,
        key: &str,
    ) -> FilResult<i64> {
        self.int(key)
            .ok_or_else(|| FilError::fits(format!("Missing integer keyword {key}")))
    }

    pub fn require_float(
        &self,
        key: &str,
    ) -> FilResult<f64> {
        self.float(key)
            .ok_or_else(|| FilError::fits(format!("Missing numeric keyword {key}")))
    }

    /// Значение `EXTNAME`, если есть.
    pub fn extname(&self) -> Option<&str> {
        self.str("EXTNAME")
    }

    /// Размер области данных без выравнивания.
    pub fn data_len(&self) -> FilResult<u64> {
        let naxis = self.int("NAXIS").unwrap_or(0);
        if naxis <= 0 {
            return Ok(0);
        }

        let bitpix = self.require_int("BITPIX")?;
        let gcount = self.int("GCOUNT").unwrap_or(1);
        let pcount = self.int("PCOUNT").unwrap_or(0);

        let mut product: i64 = 1;
        for i in 1..=naxis {
            let n = self.require_int(&format!("NAXIS{i}"))?;
            if n < 0 {
                return Err(FilError::fits(format!("NAXIS{i} is negative: {n}")));
            }
            product = product
                .checked_mul(n)
                .ok_or_else(|| FilError::fits("HDU data size overflows"))?;
        }

        let overflow = || FilError::fits("HDU data size overflows");
        let elements = pcount
            .max(0)
            .checked_add(product)
            .ok_or_else(overflow)? as u64;

        (bitpix.unsigned_abs() / 8)
            .checked_mul(gcount.max(0) as u64)
            .and_then(|n| n.checked_mul(elements))
            .ok_or_else(overflow)
    }

    /// Кодирует заголовок в целое число FITS блоков, завершая карточкой `END`.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(FITS_BLOCK);

        for (key, value) in &self.cards {
            let card = match value {
                CardValue::None => format!("{key:<8}"),
                v => format!("{key:<8}= {v}"),
            };
            push_card(&mut out, &card);
        }
        push_card(&mut out, "END");

        out.resize(padded_len(out.len() as u64) as usize, b' ');
        out
    }

    fn parse_card(card: &[u8]) -> FilResult<Option<(String, CardValue)>> {
        let text = String::from_utf8_lossy(card);
        let key = text.get(..8).unwrap_or(&text[..]).trim_end().to_string();

        if key.is_empty() || key == "COMMENT" || key == "HISTORY" {
            return Ok(None);
        }

        match text.get(8..10) {
            Some("= ") => Ok(Some((key, CardValue::parse(text.get(10..).unwrap_or(""))?))),
            _ => Ok(Some((key, CardValue::None))),
        }
    }
}

fn push_card(
    out: &mut Vec<u8>,
    card: &str,
) {
    let mut bytes: Vec<u8> = card.bytes().take(CARD_LEN).collect();
    bytes.resize(CARD_LEN, b' ');
    out.extend_from_slice(&bytes);
}

/// Длина, округлённая вверх до целого числа блоков.
pub fn padded_len(len: u64) -> u64 {
    len.div_ceil(FITS_BLOCK as u64)
        .saturating_mul(FITS_BLOCK as u64)
}

/// HDU: заголовок и положение данных в файле.
#[derive(Debug, Clone)]
pub struct Hdu {
    pub header: FitsHeader,
    /// Смещение начала данных от начала файла
    pub data_offset: u64,
    /// Длина данных без выравнивания
    pub data_len: u64,
}

/// Читает заголовки всех HDU файла, пропуская области данных.
pub fn read_hdus<R: Read + Seek>(reader: &mut R) -> FilResult<Vec<Hdu>> {
    let mut hdus = Vec::new();
    let mut offset = 0u64;
    let mut block = [0u8; FITS_BLOCK];

    loop {
        if !read_block_or_eof(reader, &mut block)? {
            break;
        }
        offset += FITS_BLOCK as u64;

        let mut header = FitsHeader::new();
        let mut ended = false;

        loop {
            for card in block.chunks_exact(CARD_LEN) {
                if let Some((key, value)) = FitsHeader::parse_card(card)? {
                    if key == "END" {
                        ended = true;
                        break;
                    }
                    header.cards.push((key, value));
                }
            }

            if ended {
                break;
            }

            if !read_block_or_eof(reader, &mut block)? {
                return Err(FilError::fits("Header is missing the END card"));
            }
            offset += FITS_BLOCK as u64;
        }

        if hdus.is_empty() && header.get("SIMPLE") != Some(&CardValue::Bool(true)) {
            return Err(FilError::fits("Not a FITS file: SIMPLE = T expected"));
        }

        let data_len = header.data_len()?;
        let data_offset = offset;
        offset = offset
            .checked_add(padded_len(data_len))
            .ok_or_else(|| FilError::fits("HDU data extends past any file size"))?;
        reader.seek(SeekFrom::Start(offset))?;

        hdus.push(Hdu {
            header,
            data_offset,
            data_len,
        });
    }

    if hdus.is_empty() {
        return Err(FilError::fits("Empty file"));
    }

    Ok(hdus)
}

// `false` на чистом конце файла, ошибка на неполном блоке.
fn read_block_or_eof<R: Read>(
    reader: &mut R,
    buf: &mut [u8; FITS_BLOCK],
) -> FilResult<bool> {
    let mut filled = 0;

    while filled < FITS_BLOCK {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(FilError::Io(e)),
        }
    }

    match filled {
        0 => Ok(false),
        FITS_BLOCK => Ok(true),
        n => Err(FilError::fits(format!("Truncated FITS block: {n} of {FITS_BLOCK} bytes"))),
    }
}

/// Колонка BINTABLE.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    /// Смещение внутри строки таблицы
    pub offset: usize,
    pub repeat: usize,
    /// Код типа из `TFORMn` (`B`, `I`, `E`, ...)
    pub code: char,
    /// Ширина колонки в байтах
    pub bytes: usize,
}

/// Раскладка колонок по `TFIELDS`/`TTYPEn`/`TFORMn`.
pub fn bintable_columns(header: &FitsHeader) -> FilResult<Vec<Column>> {
    let tfields = header.require_int("TFIELDS")?;
    let mut columns = Vec::with_capacity(tfields.max(0) as usize);
    let mut offset = 0usize;

    for i in 1..=tfields {
        let name = header.str(&format!("TTYPE{i}")).unwrap_or_default().to_string();
        let tform = header.require_str(&format!("TFORM{i}"))?;
        let (repeat, code) = parse_tform(tform)?;

        let bytes = match code {
            'X' => repeat.div_ceil(8),
            c => repeat
                .checked_mul(type_width(c)?)
                .ok_or_else(|| FilError::fits(format!("TFORM{i} '{tform}' is too wide")))?,
        };

        columns.push(Column {
            name,
            offset,
            repeat,
            code,
            bytes,
        });
        offset = offset
            .checked_add(bytes)
            .ok_or_else(|| FilError::fits("Row width overflows"))?;
    }

    if let Some(naxis1) = header.int("NAXIS1") {
        if naxis1 as usize != offset {
            return Err(FilError::fits(format!(
                "Columns span {offset} bytes, NAXIS1 is {naxis1}"
            )));
        }
    }

    Ok(columns)
}

fn parse_tform(tform: &str) -> FilResult<(usize, char)> {
    let tform = tform.trim();
    let digits = tform.chars().take_while(|c| c.is_ascii_digit()).count();
    let repeat = if digits == 0 {
        1
    } else {
        tform[..digits]
            .parse()
            .map_err(|_| FilError::fits(format!("Bad TFORM '{tform}'")))?
    };

    let code = tform[digits..]
        .chars()
        .next()
        .ok_or_else(|| FilError::fits(format!("Bad TFORM '{tform}'")))?;

    Ok((repeat, code.to_ascii_uppercase()))
}

fn type_width(code: char) -> FilResult<usize> {
    Ok(match code {
        'L' | 'B' | 'A' => 1,
        'I' => 2,
        'J' | 'E' => 4,
        'K' | 'D' | 'C' | 'P' => 8,
        'M' | 'Q' => 16,
        c => return Err(FilError::fits(format!("Unknown TFORM type code '{c}'"))),
    })
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn card(text: &str) -> Vec<u8> {
        let mut v = text.as_bytes().to_vec();
        v.resize(CARD_LEN, b' ');
        v
    }

    #[test]
    fn test_parse_card_values() {
        let (_, v) = FitsHeader::parse_card(&card("SRC_NAME= 'B1937+21'           / source")).unwrap().unwrap();
        assert_eq!(v, CardValue::Str("B1937+21".into()));

        let (_, v) = FitsHeader::parse_card(&card("OBSERVER= 'O''Neil  '")).unwrap().unwrap();
        assert_eq!(v, CardValue::Str("O'Neil".into()));

        let (_, v) = FitsHeader::parse_card(&card("NAXIS2  =                  128")).unwrap().unwrap();
        assert_eq!(v, CardValue::Int(128));

        let (_, v) = FitsHeader::parse_card(&card("TBIN    =        6.4000000D-05 / s")).unwrap().unwrap();
        assert_eq!(v, CardValue::Float(6.4e-5));

        let (_, v) = FitsHeader::parse_card(&card("SIMPLE  =                    T")).unwrap().unwrap();
        assert_eq!(v, CardValue::Bool(true));

        assert!(FitsHeader::parse_card(&card("COMMENT anything")).unwrap().is_none());
    }

    #[test]
    fn test_encode_then_read_hdus() {
        let mut primary = FitsHeader::new();
        primary
            .push("SIMPLE", CardValue::Bool(true))
            .push("BITPIX", CardValue::Int(8))
            .push("NAXIS", CardValue::Int(0))
            .push("OBSFREQ", CardValue::Float(1400.5));

        let mut table = FitsHeader::new();
        table
            .push("XTENSION", CardValue::Str("BINTABLE".into()))
            .push("BITPIX", CardValue::Int(8))
            .push("NAXIS", CardValue::Int(2))
            .push("NAXIS1", CardValue::Int(10))
            .push("NAXIS2", CardValue::Int(3))
            .push("PCOUNT", CardValue::Int(0))
            .push("GCOUNT", CardValue::Int(1))
            .push("EXTNAME", CardValue::Str("SUBINT".into()));

        let mut bytes = primary.encode();
        bytes.extend(table.encode());
        bytes.extend(vec![7u8; 30]);
        bytes.resize(padded_len(bytes.len() as u64) as usize, 0);

        let hdus = read_hdus(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(hdus.len(), 2);
        assert_eq!(hdus[0].data_len, 0);
        assert_eq!(hdus[0].header.float("OBSFREQ"), Some(1400.5));
        assert_eq!(hdus[1].header.extname(), Some("SUBINT"));
        assert_eq!(hdus[1].data_offset, 2 * FITS_BLOCK as u64);
        assert_eq!(hdus[1].data_len, 30);
    }

    #[test]
    fn test_read_hdus_rejects_garbage() {
        assert!(read_hdus(&mut Cursor::new(vec![b' '; 100])).is_err());
        assert!(read_hdus(&mut Cursor::new(Vec::new())).is_err());

        let mut h = FitsHeader::new();
        h.push("SIMPLE", CardValue::Bool(false));
        assert!(read_hdus(&mut Cursor::new(h.encode())).is_err());
    }

    #[test]
    fn test_huge_pcount_is_an_error() {
        let mut h = FitsHeader::new();
        h.push("SIMPLE", CardValue::Bool(true))
            .push("BITPIX", CardValue::Int(8))
            .push("NAXIS", CardValue::Int(1))
            .push("NAXIS1", CardValue::Int(1))
            .push("PCOUNT", CardValue::Int(i64::MAX));

        assert!(h.data_len().is_err());
        assert!(read_hdus(&mut Cursor::new(h.encode())).is_err());

        let mut wide = FitsHeader::new();
        wide.push("SIMPLE", CardValue::Bool(true))
            .push("BITPIX", CardValue::Int(-64))
            .push("NAXIS", CardValue::Int(1))
            .push("NAXIS1", CardValue::Int(i64::MAX / 2))
            .push("GCOUNT", CardValue::Int(4));
        assert!(wide.data_len().is_err());
    }

    #[test]
    fn test_bintable_columns() {
        let mut h = FitsHeader::new();
        h.push("NAXIS1", CardValue::Int(8 + 16 + 2 + 64))
            .push("TFIELDS", CardValue::Int(4))
            .push("TTYPE1", CardValue::Str("TSUBINT".into()))
            .push("TFORM1", CardValue::Str("1D".into()))
            .push("TTYPE2", CardValue::Str("DAT_FREQ".into()))
            .push("TFORM2", CardValue::Str("4E".into()))
            .push("TTYPE3", CardValue::Str("FLAGS".into()))
            .push("TFORM3", CardValue::Str("13X".into()))
            .push("TTYPE4", CardValue::Str("DATA".into()))
            .push("TFORM4", CardValue::Str("64B".into()));

        let cols = bintable_columns(&h).unwrap();
        assert_eq!(cols.len(), 4);
        assert_eq!(cols[1].offset, 8);
        assert_eq!(cols[2].bytes, 2);
        assert_eq!(cols[3].offset, 26);
        assert_eq!(cols[3].code, 'B');
        assert_eq!(cols[3].repeat, 64);
    }

    #[test]
    fn test_bintable_width_mismatch() {
        let mut h = FitsHeader::new();
        h.push("NAXIS1", CardValue::Int(5))
            .push("TFIELDS", CardValue::Int(1))
            .push("TFORM1", CardValue::Str("1J".into()));

        assert!(bintable_columns(&h).is_err());
    }
}
