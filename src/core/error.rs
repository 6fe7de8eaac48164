// バッチ変換のエラー型定義
// 設定エラー・リソースエラーはバッチ単位、コーデックエラーはジョブ単位で扱う

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// 変換ユニット（デコード・変換・エンコード）のエラー
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("I/Oエラー: {path} - {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("PNGシグネチャが一致しません: {path}")]
    NotAnImage { path: PathBuf },

    #[error("RGB 8bit画像ではありません: {path} ({color_type})")]
    UnsupportedLayout { path: PathBuf, color_type: String },

    #[error("デコードエラー: {path} - {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("エンコードエラー: {path} - {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

impl CodecError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn not_an_image(path: impl AsRef<Path>) -> Self {
        Self::NotAnImage {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn unsupported_layout(path: impl AsRef<Path>, color_type: impl Into<String>) -> Self {
        Self::UnsupportedLayout {
            path: path.as_ref().to_path_buf(),
            color_type: color_type.into(),
        }
    }

    /// プロセス境界を越えて伝達できるエラー種別を取得
    pub fn kind(&self) -> CodecErrorKind {
        match self {
            Self::Io { .. } => CodecErrorKind::Io,
            Self::NotAnImage { .. } => CodecErrorKind::NotAnImage,
            Self::UnsupportedLayout { .. } => CodecErrorKind::UnsupportedLayout,
            Self::Decode { .. } => CodecErrorKind::Decode,
            Self::Encode { .. } => CodecErrorKind::Encode,
        }
    }
}

/// コーデックエラーの種別
///
/// 子プロセスの終了コードとしても使われるため、値は固定。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodecErrorKind {
    Io,
    NotAnImage,
    UnsupportedLayout,
    Decode,
    Encode,
}

impl CodecErrorKind {
    const ALL: [Self; 5] = [
        Self::Io,
        Self::NotAnImage,
        Self::UnsupportedLayout,
        Self::Decode,
        Self::Encode,
    ];

    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Io => 10,
            Self::NotAnImage => 11,
            Self::UnsupportedLayout => 12,
            Self::Decode => 13,
            Self::Encode => 14,
        }
    }

    pub fn from_exit_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.exit_code() == code)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Io => "io",
            Self::NotAnImage => "not_an_image",
            Self::UnsupportedLayout => "unsupported_layout",
            Self::Decode => "decode",
            Self::Encode => "encode",
        }
    }
}

/// バッチ全体に関わるエラー
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("設定エラー: {message}")]
    Configuration { message: String },

    #[error("ディレクトリを開けません: {path} - {source}")]
    DirectoryUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("リソースエラー: {resource} - {details}")]
    Resource { resource: String, details: String },

    #[error("レポート出力エラー: {source}")]
    Report {
        #[source]
        source: anyhow::Error,
    },
}

impl BatchError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn directory_unreadable(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::DirectoryUnreadable {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn resource(resource: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Resource {
            resource: resource.into(),
            details: details.into(),
        }
    }

    pub fn report(source: anyhow::Error) -> Self {
        Self::Report { source }
    }

    /// ディスパッチ開始前に検出されるエラーかどうか
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Configuration { .. } | Self::DirectoryUnreadable { .. }
        )
    }
}

/// バッチ処理の結果型
pub type BatchResult<T> = std::result::Result<T, BatchError>;
