use ee_lib::error::EeError;
use thiserror::Error;

pub type Result<T> = ::std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Emulation core error: {0}")]
    Core(#[from] EeError),
    #[error("Couldn't load the configuration: {0}")]
    Config(#[from] ini::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unusable RAM size: {0} MB")]
    BadRamSize(usize),
    #[error("No guest image configured ([Image] Path)")]
    MissingImage,
}
