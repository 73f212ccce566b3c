use std::path::PathBuf;

pub trait Configuration: Clone + Send + Sync + 'static {
    fn port(&self) -> u16;
    fn database_url(&self) -> Option<String>;
    fn database_pool_size(&self) -> u32;
    fn data_file(&self) -> Option<PathBuf>;
    fn public_dir(&self) -> Option<PathBuf>;
}
