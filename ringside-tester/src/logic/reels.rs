use ringside_game::{ConfigError, PoolSource, Symbol, SymbolPool};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReelError {
    #[error("failed to read reel file {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}:{line}: {source}", path.display())]
    Symbol {
        path: PathBuf,
        line: usize,
        #[source]
        source: ConfigError,
    },
    #[error("reel file {} has no symbols", path.display())]
    Empty { path: PathBuf },
}

/// Loads `<mode>.csv` strips from a directory, one symbol per line.
#[derive(Debug, Clone)]
pub struct CsvReelSource {
    dir: PathBuf,
}

impl CsvReelSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, mode: &str) -> PathBuf {
        self.dir.join(format!("{mode}.csv"))
    }
}

impl PoolSource for CsvReelSource {
    type Error = ReelError;

    fn load_pool(&self, mode: &str) -> Result<Option<SymbolPool>, Self::Error> {
        let path = self.path_for(mode);
        if !path.exists() {
            log::debug!("no reel file for {mode} at {}", path.display());
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&path).map_err(|source| ReelError::Io {
            path: path.clone(),
            source,
        })?;
        parse_reel(&path, mode, &raw).map(Some)
    }
}

/// Parse a reel listing. The first column of each row is the symbol; a
/// `symbol` header and blank rows are skipped.
pub fn parse_reel(path: &Path, mode: &str, raw: &str) -> Result<SymbolPool, ReelError> {
    let mut symbols: Vec<Symbol> = Vec::new();
    for (index, line) in raw.lines().enumerate() {
        let token = line.split(',').next().unwrap_or("").trim();
        if token.is_empty() || token.eq_ignore_ascii_case("symbol") {
            continue;
        }
        let symbol = token.parse::<Symbol>().map_err(|source| ReelError::Symbol {
            path: path.to_path_buf(),
            line: index + 1,
            source,
        })?;
        symbols.push(symbol);
    }
    if symbols.is_empty() {
        return Err(ReelError::Empty {
            path: path.to_path_buf(),
        });
    }
    SymbolPool::new(mode, symbols).map_err(|source| ReelError::Symbol {
        path: path.to_path_buf(),
        line: 0,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(label: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "ringside-reels-{label}-{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn parses_header_blank_lines_and_case() {
        let pool = parse_reel(Path::new("x.csv"), "x", "symbol\nPUN\n\nduk\nKO,extra\n").unwrap();
        assert_eq!(
            pool.symbols(),
            &[Symbol::Punch, Symbol::Duck, Symbol::Knockout]
        );
    }

    #[test]
    fn unknown_symbol_names_file_and_line() {
        let err = parse_reel(Path::new("bad.csv"), "bad", "symbol\nPUN\nJAB\n").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("bad.csv:3"), "{message}");
        assert!(matches!(err, ReelError::Symbol { line: 3, .. }));
    }

    #[test]
    fn empty_file_is_rejected() {
        let err = parse_reel(Path::new("empty.csv"), "empty", "symbol\n\n").unwrap_err();
        assert!(matches!(err, ReelError::Empty { .. }));
    }

    #[test]
    fn source_loads_present_files_only() {
        let dir = temp_dir("source");
        std::fs::write(dir.join("balanced.csv"), "symbol\nUPP\nUPP\n").unwrap();
        let source = CsvReelSource::new(&dir);
        let pool = source.load_pool("balanced").unwrap().unwrap();
        assert_eq!(pool.len(), 2);
        assert!(source.load_pool("defensive").unwrap().is_none());
    }
}
