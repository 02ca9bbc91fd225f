use thiserror::Error;

pub type EeResult<T> = ::std::result::Result<T, EeError>;

#[derive(Error, Debug)]
pub enum EeError {
    #[error("Invalid state error: {0}")]
    InvalidState(String),
    #[error("Couldn't serialize save state: {0}")]
    Serialize(#[from] flexbuffers::SerializationError),
    #[error("Couldn't deserialize save state: {0}")]
    Deserialize(#[from] flexbuffers::DeserializationError),
    #[error("Unsupported save state version {got} (newest known is {newest})")]
    UnsupportedStateVersion { got: u32, newest: u32 },
    #[error("Guest image of {size} bytes doesn't fit at 0x{addr:08x}")]
    ImageTooLarge { addr: u32, size: usize },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
