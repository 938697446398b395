//! Примитивы ключевого заголовка SIGPROC (little-endian).

pub mod read;
pub mod write;

pub use read::*;
pub use write::*;

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn test_keyed_values_round_trip() {
        let mut buf = Vec::new();
        write_int(&mut buf, "nchans", 4096).unwrap();
        write_double(&mut buf, "foff", -0.5).unwrap();
        write_keyed_string(&mut buf, "source_name", "B0531+21").unwrap();

        assert_eq!(
            buf.len(),
            string_len("nchans") + 4 + string_len("foff") + 8 + string_len("source_name")
                + string_len("B0531+21")
        );

        let mut r = Cursor::new(buf);
        assert_eq!(read_key(&mut r).unwrap(), "nchans");
        assert_eq!(read_int(&mut r).unwrap(), 4096);
        assert_eq!(read_key(&mut r).unwrap(), "foff");
        assert_eq!(read_double(&mut r).unwrap(), -0.5);
        assert_eq!(read_key(&mut r).unwrap(), "source_name");
        assert_eq!(read_string(&mut r).unwrap(), "B0531+21");
    }

    #[test]
    fn test_read_key_rejects_garbage_length() {
        let buf = 10_000i32.to_le_bytes().to_vec();
        assert!(read_key(&mut Cursor::new(buf)).is_err());
    }

    #[test]
    fn test_string_layout() {
        let mut buf = Vec::new();
        write_string(&mut buf, "HEADER_START").unwrap();
        assert_eq!(&buf[0..4], &[12, 0, 0, 0]);
        assert_eq!(&buf[4..], b"HEADER_START");
    }
}
