use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub storage_path: PathBuf,
    pub document_extension: String,     // Extension of persisted units, without the dot
    pub pretty_print: bool,             // Indented JSON on disk

    // Provisions <root>/indexes for layout compatibility. Nothing reads it.
    pub reserve_index_dir: bool,
}

impl Config {
    pub fn new(storage_path: impl Into<PathBuf>) -> Self {
        Config {
            storage_path: storage_path.into(),
            ..Config::default()
        }
    }

    pub fn with_document_extension(mut self, extension: impl Into<String>) -> Self {
        self.document_extension = extension.into();
        self
    }

    pub fn with_pretty_print(mut self, pretty: bool) -> Self {
        self.pretty_print = pretty;
        self
    }

    pub fn with_reserved_index_dir(mut self, reserve: bool) -> Self {
        self.reserve_index_dir = reserve;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            storage_path: PathBuf::from("./db"),
            document_extension: "json".to_string(),
            pretty_print: false,
            reserve_index_dir: false,
        }
    }
}
