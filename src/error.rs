use thiserror::Error;

#[derive(Error, Debug)]
pub enum PixelsError {
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Image {width}x{height} is too small for pixel size {pixel_size}")]
    ImageTooSmallForPixelSize {
        width: u32,
        height: u32,
        pixel_size: u32,
    },

    #[error("No sprites found in image")]
    NoSpritesFound,

    #[error("Encoding error: {0}")]
    Encoding(String),
}

pub type Result<T> = std::result::Result<T, PixelsError>;

impl From<gif::EncodingError> for PixelsError {
    fn from(e: gif::EncodingError) -> Self {
        PixelsError::Encoding(e.to_string())
    }
}

// Hosts report failures as plain strings inside their metadata payloads
impl serde::Serialize for PixelsError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
