use clap::Parser;
use fil_convert::expand_file_args;
use fil_core::{open_source, FilterbankReader, SourceKind, SourceReader};
use fil_types::{FilError, FilResult, LogicalHeader, TargetHeader};
use log::error;

#[derive(Parser, Debug)]
#[command(
    name = "fil-header",
    version = env!("CARGO_PKG_VERSION"),
    about = "Print the header of PSRFITS or filterbank files",
    long_about = None,
)]
struct Cli {
    /// Файлы одного наблюдения (.fits/.sf или .fil)
    #[arg(short, long = "files", required = true, num_args = 1..)]
    files: Vec<String>,
    /// Вывод в JSON
    #[arg(long)]
    json: bool,
}

fn logical_fields(h: &LogicalHeader) -> Vec<(&'static str, String)> {
    vec![
        ("filename", h.filename.display().to_string()),
        ("source_name", h.source_name.clone()),
        ("ra_deg", h.ra_deg.to_string()),
        ("dec_deg", h.dec_deg.to_string()),
        ("nchans", h.nchans.to_string()),
        ("fch1", h.fch1.to_string()),
        ("foff", h.foff.to_string()),
        ("nbits", h.nbits.to_string()),
        ("encoding", h.encoding.to_string()),
        ("tsamp", h.tsamp.to_string()),
        ("tstart", h.tstart.to_string()),
        ("nspectra", h.nspectra.to_string()),
        ("duration_secs", h.duration_secs().to_string()),
    ]
}

fn sigproc_fields(t: &TargetHeader) -> Vec<(&'static str, String)> {
    vec![
        ("telescope_id", format!("{} ({})", t.telescope.as_i32(), t.telescope)),
        ("machine_id", format!("{} ({})", t.machine.as_i32(), t.machine)),
        ("data_type", t.data_type.as_i32().to_string()),
        ("rawdatafile", t.rawdatafile.clone()),
        ("src_raj", format!("{:.4}", t.src_raj)),
        ("src_dej", format!("{:.4}", t.src_dej)),
        ("az_start", t.az_start.to_string()),
        ("za_start", t.za_start.to_string()),
        ("nifs", t.nifs.to_string()),
        ("nbeams", t.nbeams.to_string()),
        ("ibeam", t.ibeam.to_string()),
    ]
}

fn run(cli: &Cli) -> FilResult<()> {
    let files = expand_file_args(&cli.files).map_err(|e| FilError::format_violation(e.to_string()))?;
    let kind = match files.first() {
        Some(f) => SourceKind::from_path(f)?,
        None => return Ok(()),
    };

    let (logical, target) = match kind {
        SourceKind::Filterbank => {
            let r = FilterbankReader::open(&files)?;
            (r.header().clone(), Some(r.target_header().clone()))
        }
        SourceKind::Psrfits => (open_source(&files)?.header().clone(), None),
    };

    if cli.json {
        let json = serde_json::to_string_pretty(&logical)
            .map_err(|e| FilError::format_violation(e.to_string()))?;
        println!("{json}");
        return Ok(());
    }

    let mut fields = logical_fields(&logical);
    if let Some(t) = &target {
        fields.extend(sigproc_fields(t));
    }

    for (key, value) in fields {
        println!("{key:>27}:\t{value}");
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Warn)
        .format_target(false)
        .format_timestamp_secs()
        .init();

    if let Err(e) = run(&cli) {
        error!("{e}");
        std::process::exit(1);
    }
}
