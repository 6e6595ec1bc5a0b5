use common::{Config, LinkSource, PipelineError, PipelineResult};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Links read from a plain text file, one URL per line.
pub struct FileLinkStore {
    path: PathBuf,
}

impl FileLinkStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.links_file)
    }
}

pub fn read_links(path: &Path) -> PipelineResult<Vec<String>> {
    let content = fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => PipelineError::LinkStoreMissing(path.to_path_buf()),
        _ => PipelineError::Io(e),
    })?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}

impl LinkSource for FileLinkStore {
    fn links(&self) -> PipelineResult<Vec<String>> {
        match read_links(&self.path) {
            Ok(links) => {
                info!("Loaded {} links from {}", links.len(), self.path.display());
                Ok(links)
            }
            Err(e) => {
                error!("{}", e);
                Err(e)
            }
        }
    }

    fn origin(&self) -> PathBuf {
        self.path.clone()
    }
}
