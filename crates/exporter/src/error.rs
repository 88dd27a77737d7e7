use thiserror::Error;

use crate::settings::OutputFormat;

pub type ExportResult<T> = Result<T, ExportError>;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),

    #[error("{format} export requires `{field}` in its codec settings")]
    MissingCodecSettings {
        format: OutputFormat,
        field: &'static str,
    },

    #[error("codec setting `{field}` does not apply to {format} exports")]
    MismatchedSettings {
        format: OutputFormat,
        field: &'static str,
    },

    #[error("invalid crop `{0}`, expected WIDTH:HEIGHT:X:Y")]
    InvalidCrop(String),

    #[error("invalid trim `{0}`, expected START:END in seconds")]
    InvalidTrim(String),

    #[error("invalid stream name `{0}`: must be a plain file name")]
    InvalidStreamName(String),

    #[error("a stream named `{0}` is already staged")]
    DuplicateStream(String),

    #[error("encoder `{encoder}` required for {format} output is not available in this ffmpeg build")]
    EncoderUnavailable {
        format: OutputFormat,
        encoder: &'static str,
    },

    #[error("image input `{0}` has no audio track or trim range to end the export")]
    UnboundedImage(String),

    #[error("ffmpeg failed with exit code {code:?}\nStderr:\n{stderr}")]
    TranscodeFailed { code: Option<i32>, stderr: String },
}
