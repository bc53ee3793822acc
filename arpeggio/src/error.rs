//! 错误类型
//!
//! 这里没有任何错误会终止进程：最坏的结果是丢一个音符或拒绝一次加载。

use std::path::PathBuf;
use thiserror::Error;

/// MIDI 文件加载失败；之前加载的曲目保持可用。
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid MIDI file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: midly::Error,
    },
}

/// 所有声道都在忙，音符被丢弃。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Error)]
#[error("all mixer channels are busy, note dropped")]
pub struct VoiceExhausted;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("audio output unavailable: {0}")]
    Stream(#[from] rodio::StreamError),
    #[error("failed to open mixer channel: {0}")]
    Play(#[from] rodio::PlayError),
    #[error("failed to open sample {path}: {source}")]
    SampleIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode sample {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: rodio::decoder::DecoderError,
    },
}
