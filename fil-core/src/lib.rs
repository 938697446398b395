//! Ядро конвертера PSRFITS → SIGPROC filterbank
//!
//! Формат SIGPROC (заголовок и выборки), трансляция заголовка, планирование
//! окон чтения, писатель выходного файла с докачкой и читатели источников.
//!
//! # Быстрый старт
//!
//! ```no_run
//! use fil_core::{open_source, translate, ChunkPlan, FilterbankWriter, DEFAULT_CHUNK_SPECTRA};
//! use std::path::PathBuf;
//!
//! let mut source = open_source(&[PathBuf::from("obs_0001.fits")])?;
//! let target = translate(source.header())?;
//!
//! let mut writer = FilterbankWriter::new("obs.fil", &target)?;
//! let state = writer.probe()?;
//! writer.ensure_header(state)?;
//!
//! let plan = ChunkPlan::new(source.header().nspectra, DEFAULT_CHUNK_SPECTRA)?;
//! for window in &plan {
//!     let block = source.read_window(window)?.cast(target.encoding);
//!     writer.append_block(&block)?;
//! }
//! writer.finish()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod binary;
pub mod format;
pub mod planner;
pub mod reader;
pub mod sexagesimal;
pub mod synthetic;
pub mod translate;
pub mod writer;

pub use binary::*;
pub use fil_types::{FilError, FilResult};
pub use format::*;
pub use planner::*;
pub use reader::{open_source, FilterbankReader, MemoryReader, PsrfitsReader, SourceKind, SourceReader};
pub use sexagesimal::*;
pub use translate::*;
pub use writer::*;

/// Версия библиотеки.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        assert_eq!(HEADER_START, "HEADER_START");
        assert_eq!(DEFAULT_CHUNK_SPECTRA, 98_304);
        assert!(!VERSION.is_empty());
    }
}
