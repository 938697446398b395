use std::{
    fs::{self, File, OpenOptions},
    io::{BufWriter, ErrorKind, Read, Write},
    path::{Path, PathBuf},
};

use fil_types::{FilError, FilResult, OutputState, SampleBlock, SampleEncoding, TargetHeader};
use log::debug;

use crate::format::{encode_samples, TargetHeaderExt};

/// Писатель выходного filterbank файла.
///
/// Заголовок пишется один раз, данные только дописываются в конец: файл
/// никогда не обрезается и ранее записанные байты не переписываются.
/// Какие окна уже записаны, писатель не отслеживает, это забота
/// вызывающего кода (см. [`OutputState::spectra_written`]).
pub struct FilterbankWriter {
    path: PathBuf,
    header_bytes: Vec<u8>,
    encoding: SampleEncoding,
    nchans: usize,
    spectrum_bytes: usize,
    state: OutputState,
    file: Option<BufWriter<File>>,
    spectra_appended: u64,
}

impl FilterbankWriter {
    /// Готовит писатель для `path`. Файл не открывается.
    pub fn new<P: Into<PathBuf>>(
        path: P,
        header: &TargetHeader,
    ) -> FilResult<Self> {
        let spectrum_bytes = header.encoding.spectrum_bytes(header.nchans).ok_or_else(|| {
            FilError::header(format!(
                "{} channels of {} bits do not fill whole bytes",
                header.nchans, header.nbits
            ))
        })?;

        Ok(Self {
            path: path.into(),
            header_bytes: header.serialize()?,
            encoding: header.encoding,
            nchans: header.nchans,
            spectrum_bytes,
            state: OutputState::Absent,
            file: None,
            spectra_appended: 0,
        })
    }

    /// Определяет состояние выходного файла по его размеру и содержимому
    /// заголовка.
    ///
    /// Отсутствие файла даёт [`OutputState::Absent`], а не ошибка. Файл,
    /// который не соответствует ни одному из состояний (обрезанный заголовок,
    /// чужой заголовок, неполный спектр), даёт [`FilError::ResumeAmbiguity`].
    pub fn probe(&mut self) -> FilResult<OutputState> {
        let meta = match fs::metadata(&self.path) {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.state = OutputState::Absent;
                return Ok(self.state);
            }
            Err(e) => return Err(FilError::Io(e)),
        };

        if !meta.is_file() {
            return Err(FilError::format_violation(format!(
                "{:?} is not a regular file",
                self.path
            )));
        }

        let size = meta.len();
        let header_len = self.header_len();

        if size == 0 {
            self.state = OutputState::Empty;
            return Ok(self.state);
        }

        if size < header_len {
            return Err(FilError::ambiguity(
                size,
                header_len,
                "file is shorter than the header (truncated header?)",
            ));
        }

        let mut existing = vec![0u8; self.header_bytes.len()];
        File::open(&self.path)?.read_exact(&mut existing)?;

        if existing != self.header_bytes {
            return Err(FilError::ambiguity(
                size,
                header_len,
                "existing header does not match this conversion",
            ));
        }

        let data_len = size - header_len;

        self.state = if data_len == 0 {
            OutputState::HeaderOnly
        } else if data_len % self.spectrum_bytes as u64 != 0 {
            return Err(FilError::ambiguity(
                size,
                header_len,
                format!(
                    "data region of {data_len} bytes ends inside a spectrum of {} bytes",
                    self.spectrum_bytes
                ),
            ));
        } else {
            OutputState::HasData {
                spectra: data_len / self.spectrum_bytes as u64,
            }
        };

        debug!("Output {:?} probed as {:?}", self.path, self.state);
        Ok(self.state)
    }

    /// Записывает заголовок, если его ещё нет. Повторный вызов ничего не
    /// меняет.
    pub fn ensure_header(
        &mut self,
        state: OutputState,
    ) -> FilResult<OutputState> {
        if !state.needs_header() {
            self.state = state;
            return Ok(state);
        }

        // Переданное состояние могло устареть: проверяем файл ещё раз.
        let current = self.probe()?;
        if !current.needs_header() {
            return Ok(current);
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(&self.header_bytes)?;
        file.flush()?;

        debug!(
            "Wrote {} byte header to {:?}",
            self.header_bytes.len(),
            self.path
        );

        self.state = OutputState::HeaderOnly;
        Ok(self.state)
    }

    /// Дописывает блок спектров в конец файла. Возвращает число записанных
    /// байт.
    pub fn append_block(
        &mut self,
        block: &SampleBlock,
    ) -> FilResult<u64> {
        if self.state.needs_header() {
            return Err(FilError::format_violation(
                "cannot append samples before the header is written",
            ));
        }

        if block.nchans != self.nchans {
            return Err(FilError::format_violation(format!(
                "block has {} channels, header declares {}",
                block.nchans, self.nchans
            )));
        }

        block.validate_shape()?;

        let bytes = encode_samples(&block.data, self.encoding)?;

        let file = match self.file.take() {
            Some(f) => f,
            None => BufWriter::new(OpenOptions::new().append(true).open(&self.path)?),
        };
        let file = self.file.insert(file);

        file.write_all(&bytes)?;
        file.flush()?;

        self.spectra_appended += block.nspectra as u64;
        self.state = OutputState::HasData {
            spectra: self.state.spectra_written() + block.nspectra as u64,
        };

        Ok(bytes.len() as u64)
    }

    /// Сбрасывает буферы и возвращает число спектров, дописанных этим
    /// писателем.
    pub fn finish(mut self) -> FilResult<u64> {
        if let Some(mut f) = self.file.take() {
            f.flush()?;
            f.get_ref().sync_data()?;
        }

        Ok(self.spectra_appended)
    }

    /// Длина заголовка в байтах.
    pub fn header_len(&self) -> u64 {
        self.header_bytes.len() as u64
    }

    /// Размер одного спектра в байтах.
    pub fn spectrum_bytes(&self) -> usize {
        self.spectrum_bytes
    }

    /// Последнее известное состояние файла.
    pub fn state(&self) -> OutputState {
        self.state
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
