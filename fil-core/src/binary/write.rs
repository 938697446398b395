use std::io::Write;

use byteorder::{LittleEndian, WriteBytesExt};

use crate::FilResult;

/// Строка SIGPROC: `i32` длина + байты без завершающего нуля.
pub fn write_string<W: Write>(
    w: &mut W,
    s: &str,
) -> FilResult<()> {
    w.write_i32::<LittleEndian>(s.len() as i32)?;
    w.write_all(s.as_bytes())?;
    Ok(())
}

/// Ключ с целочисленным значением.
pub fn write_int<W: Write>(
    w: &mut W,
    key: &str,
    val: i32,
) -> FilResult<()> {
    write_string(w, key)?;
    w.write_i32::<LittleEndian>(val)?;
    Ok(())
}

/// Ключ со значением двойной точности.
pub fn write_double<W: Write>(
    w: &mut W,
    key: &str,
    val: f64,
) -> FilResult<()> {
    write_string(w, key)?;
    w.write_f64::<LittleEndian>(val)?;
    Ok(())
}

/// Ключ со строковым значением.
pub fn write_keyed_string<W: Write>(
    w: &mut W,
    key: &str,
    val: &str,
) -> FilResult<()> {
    write_string(w, key)?;
    write_string(w, val)
}

/// Размер строки SIGPROC в байтах.
pub fn string_len(s: &str) -> usize {
    4 + s.len()
}
