use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::media::MediaError;
use crate::preprocess::PreprocessError;

/// Every failure the user can end up looking at.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    PermissionDenied,
    DeviceUnavailable,
    MissingCredential,
    ServiceUnavailable,
    RateLimited,
    EmptyResult,
    UnknownFailure,
}

/// What the user can do after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum NextStep {
    Retry,
    Retake,
    Upload,
}

impl ErrorKind {
    /// Only an overloaded service is worth asking again automatically.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::ServiceUnavailable)
    }

    /// Camera failures keep the session alive and fall back to file upload.
    pub fn is_device_failure(self) -> bool {
        matches!(self, ErrorKind::PermissionDenied | ErrorKind::DeviceUnavailable)
    }

    pub fn message(self) -> &'static str {
        match self {
            ErrorKind::PermissionDenied => {
                "Não foi possível acessar a câmera. Verifique as permissões do seu navegador ou envie uma foto."
            }
            ErrorKind::DeviceUnavailable => {
                "Nenhuma câmera disponível neste dispositivo. Envie uma foto do seu sorriso."
            }
            ErrorKind::MissingCredential => {
                "O simulador ainda não está configurado. Tente novamente mais tarde."
            }
            ErrorKind::ServiceUnavailable => {
                "O serviço de IA está sobrecarregado no momento. Tente novamente em instantes."
            }
            ErrorKind::RateLimited => {
                "Muitas simulações em pouco tempo. Aguarde um pouco e tente novamente."
            }
            ErrorKind::EmptyResult => {
                "Falha ao gerar a imagem. Tente tirar uma foto mais clara do seu rosto."
            }
            ErrorKind::UnknownFailure => {
                "Erro ao processar a imagem com a IA. Tente novamente."
            }
        }
    }

    pub fn next_steps(self) -> &'static [NextStep] {
        match self {
            ErrorKind::PermissionDenied | ErrorKind::DeviceUnavailable => {
                &[NextStep::Upload, NextStep::Retake]
            }
            ErrorKind::EmptyResult => &[NextStep::Retake, NextStep::Upload, NextStep::Retry],
            ErrorKind::MissingCredential => &[NextStep::Retry, NextStep::Retake],
            ErrorKind::ServiceUnavailable | ErrorKind::RateLimited | ErrorKind::UnknownFailure => {
                &[NextStep::Retry, NextStep::Retake]
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("not a base64 data URL")]
    NotADataUrl,
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("unreadable image: {0}")]
    Image(#[from] image::ImageError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("cannot {action} while {state}")]
    InvalidTransition {
        state: &'static str,
        action: &'static str,
    },
    #[error("a generation is already in flight")]
    AlreadyGenerating,
    #[error(transparent)]
    Media(#[from] MediaError),
    #[error(transparent)]
    Preprocess(#[from] PreprocessError),
}

impl CaptureError {
    /// Folds the error into the user-facing taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CaptureError::Media(err) => err.kind(),
            _ => ErrorKind::UnknownFailure,
        }
    }
}
