use std::{
    fs,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Instant,
};

use fil_core::{open_source, translate_with, ChunkPlan, FilterbankWriter, SourceReader};
use fil_types::{ChunkWindow, FilError, FilResult, LogicalHeader, SampleBlock, SampleEncoding};
use log::debug;

use crate::{
    events::{ConversionEvent, EventSink, LogSink, NullSink},
    metrics::{ConversionMetrics, ConversionSummary},
    ConvertConfig, ConvertError, ConvertResult,
};

/// Один запуск конвертации источника в filterbank файл.
///
/// Окна пишутся строго по порядку. Если выходной файл уже содержит часть
/// данных, чтение продолжается сразу за ними.
pub struct Conversion {
    config: ConvertConfig,
    metrics: Arc<ConversionMetrics>,
    stop_flag: Arc<AtomicBool>,
    sink: Arc<dyn EventSink>,
}

impl Conversion {
    /// Создаёт запуск. Возвращает также shared-ссылку на метрики.
    pub fn new(config: ConvertConfig) -> (Self, Arc<ConversionMetrics>) {
        let metrics = ConversionMetrics::new();
        let c = Self {
            config,
            metrics: metrics.clone(),
            stop_flag: Arc::new(AtomicBool::new(false)),
            sink: Arc::new(NullSink),
        };

        (c, metrics)
    }

    pub fn with_sink(
        mut self,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        self.sink = sink;
        self
    }

    /// Флаг остановки. `true` завершает запуск после текущего окна.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop_flag.clone()
    }

    /// Куда будет записан результат для источника с заголовком `header`.
    pub fn output_path(
        &self,
        header: &LogicalHeader,
    ) -> PathBuf {
        self.config.output_path(&header.filename)
    }

    /// Выполняет конвертацию. Блокируется до завершения.
    pub fn run(
        self,
        source: Box<dyn SourceReader>,
    ) -> ConvertResult<ConversionSummary> {
        let started = Instant::now();
        self.config.validate()?;

        let header = source.header().clone();
        let target =
            translate_with(&header, &self.config.profile).map_err(ConvertError::HeaderDerivation)?;

        let path = self.output_path(&header);
        reject_source_as_output(source.as_ref(), &path)?;

        let mut writer =
            FilterbankWriter::new(&path, &target).map_err(ConvertError::HeaderDerivation)?;

        let state = writer
            .probe()
            .map_err(|e| ConvertError::output(path.clone(), None, e))?;
        let done = state.spectra_written();

        if done > header.nspectra {
            return Err(ConvertError::ResumeAmbiguity {
                path,
                size: writer.header_len() + done * writer.spectrum_bytes() as u64,
                header_len: writer.header_len(),
                reason: format!(
                    "output holds {done} spectra but the source has only {}",
                    header.nspectra
                ),
            });
        }

        let plan = ChunkPlan::new(header.nspectra, self.config.chunk_spectra)
            .and_then(|p| p.resume_from(done))
            .map_err(|e| ConvertError::Config(e.to_string()))?;

        self.metrics.resumed_from.store(done, Ordering::Relaxed);
        self.sink.emit(&ConversionEvent::Started {
            output: path.clone(),
            total_spectra: header.nspectra,
            windows: plan.window_count(),
        });

        if done > 0 {
            self.sink.emit(&ConversionEvent::Resumed { spectra: done });
        }

        if state.needs_header() {
            writer
                .ensure_header(state)
                .map_err(|e| ConvertError::output(path.clone(), None, e))?;
            self.sink.emit(&ConversionEvent::HeaderWritten {
                bytes: writer.header_len(),
            });
        }

        let mut out = Output {
            writer: &mut writer,
            path: &path,
            encoding: target.encoding,
            total_spectra: header.nspectra,
        };

        let next = if self.config.read_ahead {
            self.pump_read_ahead(source, &plan, &mut out)?
        } else {
            self.pump_sequential(source, &plan, &mut out)?
        };

        writer
            .finish()
            .map_err(|e| ConvertError::output(path.clone(), None, e))?;

        let interrupted = next < header.nspectra;
        let summary = self.metrics.summary(&started, header.nspectra, interrupted);

        if interrupted {
            self.sink.emit(&ConversionEvent::Interrupted { next_spectrum: next });
        } else {
            self.sink.emit(&ConversionEvent::Finished {
                spectra: summary.spectra_written,
                bytes: summary.bytes_written,
            });
        }

        Ok(summary)
    }

    fn stop_requested(&self) -> bool {
        self.stop_flag.load(Ordering::Relaxed)
    }

    // Возвращает номер первого незаписанного спектра.
    fn pump_sequential(
        &self,
        mut source: Box<dyn SourceReader>,
        plan: &ChunkPlan,
        out: &mut Output<'_>,
    ) -> ConvertResult<u64> {
        let mut next = plan.start();

        for window in plan.windows() {
            if self.stop_requested() {
                break;
            }

            let block = source
                .read_window(window)
                .map_err(|e| ConvertError::SourceRead { window, source: e })?;

            self.write_window(out, window, block)?;
            next = window.end();
        }

        Ok(next)
    }

    // Чтение в отдельном потоке, очередь глубиной 1: следующее окно читается,
    // пока пишется текущее.
    fn pump_read_ahead(
        &self,
        source: Box<dyn SourceReader>,
        plan: &ChunkPlan,
        out: &mut Output<'_>,
    ) -> ConvertResult<u64> {
        let (tx, rx) = crossbeam_channel::bounded::<(ChunkWindow, FilResult<SampleBlock>)>(1);
        let stop = self.stop_flag.clone();
        let windows = plan.windows();

        let reader = std::thread::spawn(move || {
            let mut source = source;

            for window in windows {
                if stop.load(Ordering::Relaxed) {
                    break;
                }

                let result = source.read_window(window);
                let failed = result.is_err();

                if tx.send((window, result)).is_err() || failed {
                    break;
                }
            }
        });

        let mut next = plan.start();
        let mut outcome = Ok(());

        for (window, result) in rx.iter() {
            if self.stop_requested() {
                break;
            }

            let step = result
                .map_err(|e| ConvertError::SourceRead { window, source: e })
                .and_then(|block| self.write_window(out, window, block));

            if let Err(e) = step {
                outcome = Err(e);
                break;
            }

            next = window.end();
        }

        // Читатель увидит закрытый канал и выйдет
        drop(rx);

        if reader.join().is_err() {
            return Err(ConvertError::Pipeline("read-ahead thread panicked".into()));
        }

        outcome.map(|()| next)
    }

    fn write_window(
        &self,
        out: &mut Output<'_>,
        window: ChunkWindow,
        block: SampleBlock,
    ) -> ConvertResult<()> {
        if block.nspectra as u64 != window.len {
            return Err(ConvertError::SourceRead {
                window,
                source: FilError::corrupted(format!(
                    "reader returned {} spectra for a window of {}",
                    block.nspectra, window.len
                )),
            });
        }

        let block = block.cast(out.encoding);
        let bytes = out
            .writer
            .append_block(&block)
            .map_err(|e| ConvertError::output(out.path.to_path_buf(), Some(window), e))?;

        self.metrics.windows_written.fetch_add(1, Ordering::Relaxed);
        self.metrics
            .spectra_written
            .fetch_add(window.len, Ordering::Relaxed);
        self.metrics.bytes_written.fetch_add(bytes, Ordering::Relaxed);

        debug!("Appended {window} to {:?}", out.path);
        // Номер окна в сетке полного запуска, в том числе после продолжения
        self.sink.emit(&ConversionEvent::WindowWritten {
            index: window.start / self.config.chunk_spectra,
            window,
            bytes,
            progress_pct: self.metrics.progress_pct(out.total_spectra),
        });

        Ok(())
    }
}

struct Output<'a> {
    writer: &'a mut FilterbankWriter,
    path: &'a Path,
    encoding: SampleEncoding,
    total_spectra: u64,
}

// Исходные файлы только читаются: выход не может совпадать ни с одним из них.
fn reject_source_as_output(
    source: &dyn SourceReader,
    output: &Path,
) -> ConvertResult<()> {
    // Несуществующий выход не может быть исходным файлом
    let Ok(output) = fs::canonicalize(output) else {
        return Ok(());
    };

    for src in source.source_paths() {
        if fs::canonicalize(src).is_ok_and(|s| s == output) {
            return Err(ConvertError::Config(format!(
                "output {output:?} is one of the source files"
            )));
        }
    }

    Ok(())
}

/// Открывает источник и конвертирует его с событиями в `log`.
pub fn convert(
    paths: &[PathBuf],
    config: &ConvertConfig,
) -> ConvertResult<ConversionSummary> {
    let source = open_source(paths).map_err(|e| match e {
        FilError::HeaderDerivation(_) => ConvertError::HeaderDerivation(e),
        other => ConvertError::SourceOpen(other),
    })?;

    let (conversion, _metrics) = Conversion::new(config.clone());
    conversion.with_sink(Arc::new(LogSink)).run(source)
}
