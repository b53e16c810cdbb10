use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid settings file: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Invalid manifest: {0}")]
    Manifest(String),

    #[error("Unsupported URI scheme: {0}")]
    UnsupportedScheme(String),

    #[error("No images to show")]
    NoImages,

    #[error("Download failed: {0}")]
    Download(String),
}

pub type Result<T> = std::result::Result<T, Error>;
