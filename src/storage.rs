use std::path::{Path, PathBuf};

use crate::model::Country;

/// Fixed layout under the service data directory: spreadsheets in `source/`,
/// fastText artifacts in `models/`.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    pub source_dir: PathBuf,
    pub model_dir: PathBuf,
    pub meta_path: PathBuf,
}

impl StoragePaths {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir: PathBuf = data_dir.into();
        let source_dir = data_dir.join("source");
        let model_dir = data_dir.join("models");
        let meta_path = data_dir.join("meta.json");

        Self {
            source_dir,
            model_dir,
            meta_path,
        }
    }

    pub fn data_sheet(&self) -> PathBuf {
        self.source_dir.join("data.xlsx")
    }

    pub fn provision_sheet(&self) -> PathBuf {
        self.source_dir.join("provision.xlsx")
    }

    /// Single-model artifact used by the legacy `/predict` route.
    pub fn default_model(&self) -> PathBuf {
        self.model_dir.join("fasttext_ext.bin")
    }

    pub fn country_model(&self, country: Country) -> PathBuf {
        self.model_dir
            .join(format!("fasttext_{}.bin", country.code().to_ascii_lowercase()))
    }
}

pub fn file_present_nonempty(path: &Path) -> bool {
    match std::fs::metadata(path) {
        Ok(m) => m.is_file() && m.len() > 0,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lays_out_fixed_relative_paths() {
        let paths = StoragePaths::new("/srv/coder");
        assert_eq!(paths.data_sheet(), Path::new("/srv/coder/source/data.xlsx"));
        assert_eq!(
            paths.provision_sheet(),
            Path::new("/srv/coder/source/provision.xlsx")
        );
        assert_eq!(
            paths.default_model(),
            Path::new("/srv/coder/models/fasttext_ext.bin")
        );
        assert_eq!(
            paths.country_model(Country::Colombia),
            Path::new("/srv/coder/models/fasttext_col.bin")
        );
    }
}
