use std::path::{Path, PathBuf};

use fil_core::{SiteProfile, DEFAULT_CHUNK_SPECTRA, FIL_EXTENSION};

use crate::{ConvertError, ConvertResult};

/// Настройки одного запуска конвертации.
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    /// Каталог для выходного файла (None = каталог первого файла источника)
    pub output_dir: Option<PathBuf>,
    /// Имя выходного файла (None = выводится из имени первого файла)
    pub fil_name: Option<String>,
    /// Спектров в одном окне чтения
    pub chunk_spectra: u64,
    /// Идентификаторы телескопа/бэкенда для заголовка
    pub profile: SiteProfile,
    /// Читать следующее окно в отдельном потоке, пока пишется текущее
    pub read_ahead: bool,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl ConvertConfig {
    pub fn validate(&self) -> ConvertResult<()> {
        if self.chunk_spectra == 0 {
            return Err(ConvertError::Config("chunk size must be > 0".into()));
        }

        if let Some(name) = &self.fil_name {
            if name.is_empty() || name.contains(['/', '\\']) {
                return Err(ConvertError::Config(format!(
                    "output name '{name}' must be a plain file name"
                )));
            }
        }

        Ok(())
    }

    /// Полный путь выходного файла для источника, начинающегося с `first`.
    pub fn output_path(
        &self,
        first: &Path,
    ) -> PathBuf {
        let name = self
            .fil_name
            .clone()
            .unwrap_or_else(|| default_fil_name(first));

        let dir = match &self.output_dir {
            Some(d) => d.clone(),
            None => first
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        };

        dir.join(name)
    }
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            fil_name: None,
            chunk_spectra: DEFAULT_CHUNK_SPECTRA,
            profile: SiteProfile::default(),
            read_ahead: false,
        }
    }
}

/// Имя выходного файла по умолчанию.
///
/// Имя файла обрезается по первой точке, от частей через `_` отбрасывается
/// последняя (обычно номер файла):
///
/// ```
/// use fil_convert::config::default_fil_name;
/// use std::path::Path;
///
/// assert_eq!(default_fil_name(Path::new("/data/obs_B0329_0001.fits")), "obs_B0329.fil");
/// assert_eq!(default_fil_name(Path::new("single.fits")), "single.fil");
/// ```
pub fn default_fil_name(first: &Path) -> String {
    let base = first
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let cut = base.split('.').next().unwrap_or_default();

    let parts: Vec<&str> = cut.split('_').collect();
    let stem = parts[..parts.len().saturating_sub(1)].join("_");
    let stem = if stem.is_empty() { cut } else { stem.as_str() };

    format!("{stem}.{FIL_EXTENSION}")
}

/// Раскрывает аргументы `-f`.
///
/// Значение с пробелами задаёт несколько путей. Путь с `*`, `?` или `[`
/// считается шаблоном и заменяется отсортированным списком совпадений.
pub fn expand_file_args<S: AsRef<str>>(values: &[S]) -> ConvertResult<Vec<PathBuf>> {
    let mut files = Vec::new();

    for token in values.iter().flat_map(|v| v.as_ref().split_whitespace()) {
        if !token.contains(['*', '?', '[']) {
            files.push(PathBuf::from(token));
            continue;
        }

        let entries = glob::glob(token)
            .map_err(|e| ConvertError::Config(format!("bad file pattern '{token}': {e}")))?;
        let mut matched = entries
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ConvertError::Config(format!("cannot expand '{token}': {e}")))?;

        if matched.is_empty() {
            return Err(ConvertError::Config(format!(
                "pattern '{token}' matched no files"
            )));
        }

        matched.sort();
        files.append(&mut matched);
    }

    Ok(files)
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_fil_name() {
        assert_eq!(default_fil_name(Path::new("obs_0001.fits")), "obs.fil");
        assert_eq!(default_fil_name(Path::new("a_b_c_0003.sf")), "a_b_c.fil");
        assert_eq!(default_fil_name(Path::new("x.y.fits")), "x.fil");
        assert_eq!(default_fil_name(Path::new("plain.fits")), "plain.fil");
    }

    #[test]
    fn test_output_path() {
        let mut cfg = ConvertConfig::default();
        let first = Path::new("/data/run/obs_0001.fits");

        assert_eq!(cfg.output_path(first), PathBuf::from("/data/run/obs.fil"));

        cfg.output_dir = Some(PathBuf::from("/out"));
        assert_eq!(cfg.output_path(first), PathBuf::from("/out/obs.fil"));

        cfg.fil_name = Some("merged.fil".into());
        assert_eq!(cfg.output_path(first), PathBuf::from("/out/merged.fil"));

        let bare = ConvertConfig::default();
        assert_eq!(bare.output_path(Path::new("obs_0001.fits")), PathBuf::from("obs.fil"));
    }

    #[test]
    fn test_validate() {
        assert!(ConvertConfig::default().validate().is_ok());

        let zero = ConvertConfig {
            chunk_spectra: 0,
            ..ConvertConfig::default()
        };
        assert!(matches!(zero.validate(), Err(ConvertError::Config(_))));

        let nested = ConvertConfig {
            fil_name: Some("a/b.fil".into()),
            ..ConvertConfig::default()
        };
        assert!(nested.validate().is_err());
    }

    #[test]
    fn test_expand_file_args() {
        let files = expand_file_args(&["a_0001.fits a_0002.fits", "b_0001.fits"]).unwrap();
        assert_eq!(
            files,
            vec![
                PathBuf::from("a_0001.fits"),
                PathBuf::from("a_0002.fits"),
                PathBuf::from("b_0001.fits"),
            ]
        );
    }

    #[test]
    fn test_expand_file_pattern() {
        let dir = tempfile::TempDir::new().unwrap();
        for name in ["obs_0002.fits", "obs_0001.fits", "obs_0010.fits", "cal_0001.fits"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }

        let pattern = dir.path().join("obs_*.fits");
        let files = expand_file_args(&[pattern.to_string_lossy()]).unwrap();
        assert_eq!(
            files,
            vec![
                dir.path().join("obs_0001.fits"),
                dir.path().join("obs_0002.fits"),
                dir.path().join("obs_0010.fits"),
            ]
        );

        let none = dir.path().join("psr_*.fits");
        assert!(matches!(
            expand_file_args(&[none.to_string_lossy()]),
            Err(ConvertError::Config(_))
        ));
    }
}
