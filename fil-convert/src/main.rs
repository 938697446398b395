use std::{
    fs::File,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use chrono::Utc;
use clap::Parser;
use fil_convert::{expand_file_args, Conversion, ConvertConfig, ConvertError, LogSink};
use fil_core::{open_source, SiteProfile, DEFAULT_CHUNK_SPECTRA};
use fil_types::{FilError, Machine, Telescope};
use log::{error, info, warn, LevelFilter};

#[derive(Parser, Debug)]
#[command(
    name = "fits2fil",
    version = env!("CARGO_PKG_VERSION"),
    about = "Convert PSRFITS files into a single SIGPROC filterbank file",
    long_about = None,
)]
struct Cli {
    /// Файлы источника (.fits/.sf или .fil). Значение с пробелами разбивается
    /// на несколько файлов
    #[arg(short, long = "files", required = true, num_args = 1..)]
    files: Vec<String>,
    /// Каталог для выходного файла
    #[arg(short, long, default_value = ".")]
    outdir: PathBuf,
    /// Имя выходного файла (по умолчанию из имени первого файла)
    #[arg(long = "fil-name", alias = "fil_name")]
    fil_name: Option<String>,
    /// Спектров в одном окне чтения
    #[arg(long, default_value_t = DEFAULT_CHUNK_SPECTRA)]
    chunk_size: u64,
    /// telescope_id: имя (gbt, parkes, ...) или число
    #[arg(long, default_value = "gbt")]
    telescope: Telescope,
    /// machine_id: имя (fake, wapp, ...) или число
    #[arg(long, default_value = "fake")]
    machine: Machine,
    /// Читать следующее окно, пока пишется текущее
    #[arg(long)]
    read_ahead: bool,
    /// Писать лог в OUTDIR/fits2fil_<время>.log вместо stderr
    #[arg(long)]
    log_file: bool,
    /// Подробный вывод
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,
    /// Тихий режим (только ошибки)
    #[arg(short, long)]
    quiet: bool,
}

fn init_logging(cli: &Cli) -> Result<Option<PathBuf>, std::io::Error> {
    let level = if cli.quiet {
        LevelFilter::Error
    } else if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(level)
        .format_target(false)
        .format_timestamp_secs();

    let log_path = if cli.log_file {
        let name = Utc::now()
            .format("fits2fil_%Y_%m_%d_%H_%M_%S_%6f.log")
            .to_string();
        let path = cli.outdir.join(name);
        let file = File::create(&path)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
        Some(path)
    } else {
        None
    };

    builder.init();
    Ok(log_path)
}

fn exit_with(e: ConvertError) -> ! {
    error!("Conversion failed: {e}");
    if let ConvertError::ResumeAmbiguity { path, .. } = &e {
        error!("Inspect {path:?} with fil-header before removing it");
    }
    std::process::exit(1);
}

fn main() {
    let cli = Cli::parse();

    let log_path = match init_logging(&cli) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Cannot create log file in {:?}: {e}", cli.outdir);
            std::process::exit(1);
        }
    };

    info!("Input arguments:");
    info!("  files      : {:?}", cli.files);
    info!("  outdir     : {:?}", cli.outdir);
    info!("  fil_name   : {:?}", cli.fil_name);
    info!("  chunk_size : {}", cli.chunk_size);
    info!("  telescope  : {}", cli.telescope);
    info!("  machine    : {}", cli.machine);
    info!("  read_ahead : {}", cli.read_ahead);
    if let Some(p) = &log_path {
        info!("  log_file   : {p:?}");
    }

    let files = match expand_file_args(&cli.files) {
        Ok(f) => f,
        Err(e) => exit_with(e),
    };
    if let Some(missing) = files.iter().find(|p| !p.exists()) {
        error!("Source file {missing:?} does not exist");
        std::process::exit(1);
    }

    let config = ConvertConfig {
        output_dir: Some(cli.outdir.clone()),
        fil_name: cli.fil_name.clone(),
        chunk_spectra: cli.chunk_size,
        profile: SiteProfile {
            telescope: cli.telescope,
            machine: cli.machine,
            ..SiteProfile::default()
        },
        read_ahead: cli.read_ahead,
    };

    let source = match open_source(&files) {
        Ok(s) => s,
        Err(e @ FilError::HeaderDerivation(_)) => exit_with(ConvertError::HeaderDerivation(e)),
        Err(e) => exit_with(ConvertError::SourceOpen(e)),
    };

    let (conversion, _metrics) = Conversion::new(config);
    let conversion = conversion.with_sink(Arc::new(LogSink));
    let stop_flag: Arc<AtomicBool> = conversion.stop_flag();
    let stop_ctrlc = stop_flag.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        if stop_ctrlc.swap(true, Ordering::SeqCst) {
            // Повторный Ctrl+C: выход без ожидания окна
            warn!("Force exit");
            std::process::exit(130);
        }
        warn!("Ctrl+C received, finishing the current window...");
    }) {
        warn!("Failed to set Ctrl+C handler: {e}");
    }

    match conversion.run(source) {
        Ok(summary) => {
            info!("\n{summary}");
            if summary.interrupted {
                warn!("Output is incomplete; run the same command again to resume");
            }
        }
        Err(e) => exit_with(e),
    }
}
