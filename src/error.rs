use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    #[error("texture load error: {0}")]
    TextureLoad(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("texture not loaded yet")]
    NotReady,

    #[error("scene file {path}: {source}")]
    SceneFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("scene parse error: {0}")]
    SceneParse(#[from] serde_json::Error),

    #[error("image encode error: {0}")]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RasterError>;
