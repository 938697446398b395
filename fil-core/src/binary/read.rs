use std::io::Read;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::{FilError, FilResult};

/// Ключи SIGPROC не бывают длиннее этого значения; большее число означает,
/// что мы читаем не заголовок.
pub const MAX_KEY_LEN: i32 = 80;

/// Читает строку SIGPROC (`i32` длина + байты).
pub fn read_string<R: Read>(r: &mut R) -> FilResult<String> {
    let len = r.read_i32::<LittleEndian>()?;

    if !(0..=4096).contains(&len) {
        return Err(FilError::corrupted(format!("Invalid string length {len}")));
    }

    let mut buf = vec![0u8; len as usize];
    r.read_exact(&mut buf)?;

    String::from_utf8(buf).map_err(|e| FilError::corrupted(format!("Invalid UTF-8 in header: {e}")))
}

/// Читает ключ: строка ограниченной длины.
pub fn read_key<R: Read>(r: &mut R) -> FilResult<String> {
    let len = r.read_i32::<LittleEndian>()?;

    if !(1..=MAX_KEY_LEN).contains(&len) {
        return Err(FilError::corrupted(format!("Invalid key length {len}")));
    }

    let mut buf = vec![0u8; len as usize];
    r.read_exact(&mut buf)?;

    String::from_utf8(buf).map_err(|e| FilError::corrupted(format!("Invalid UTF-8 in key: {e}")))
}

/// Однобайтовое значение (ключ `signed`).
pub fn read_byte<R: Read>(r: &mut R) -> FilResult<u8> {
    Ok(r.read_u8()?)
}

pub fn read_int<R: Read>(r: &mut R) -> FilResult<i32> {
    Ok(r.read_i32::<LittleEndian>()?)
}

pub fn read_double<R: Read>(r: &mut R) -> FilResult<f64> {
    Ok(r.read_f64::<LittleEndian>()?)
}
