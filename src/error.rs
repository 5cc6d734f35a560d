//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Errors raised while declaring or registering a model.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("model name must not be empty")]
    EmptyModelName,
    #[error("duplicate field '{field}' in model {model}")]
    DuplicateField { model: String, field: String },
    #[error("invalid tag '{tag}' on {model}.{field}: {reason}")]
    InvalidTag {
        model: String,
        field: String,
        tag: String,
        reason: String,
    },
    #[error("model {0} is already registered")]
    AlreadyRegistered(String),
    #[error("config load: {0}")]
    Load(String),
}

/// Execution stage at which a statement failed. Doubles as the fine-grained reason code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Count,
    Find,
    Get,
    Insert,
    Update,
    Delete,
    UpdateShowIndex,
    Begin,
    Commit,
}

impl Stage {
    pub fn reason(&self) -> &'static str {
        match self {
            Stage::Count => "CountFailed",
            Stage::Find => "FindFailed",
            Stage::Get => "GetFailed",
            Stage::Insert => "InsertFailed",
            Stage::Update => "UpdateFailed",
            Stage::Delete => "DeleteFailed",
            Stage::UpdateShowIndex => "UpdateShowIndexFailed",
            Stage::Begin => "BeginFailed",
            Stage::Commit => "SessionCommitFailed",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.reason())
    }
}

/// Errors returned by every dbop operation.
#[derive(Error, Debug)]
pub enum DbopError {
    #[error("model {0} not registered")]
    ModelNotRegistered(String),
    #[error("wrong param type: {0}")]
    WrongParamType(String),
    #[error("primary key is undefined for {0}")]
    UndefinedPk(String),
    #[error("no primary key defined for {0}")]
    NoPrimaryKey(String),
    #[error("primary key value is incomplete")]
    IncompletePkValue,
    #[error("join cond format must be: {{join_operator, tablename, condition}}")]
    WrongJoinCond,
    #[error("no show index field in {0}")]
    NoShowIndexField(String),
    #[error("no object moved")]
    NoObjectMoved,
    #[error("one of the objects does not exist")]
    ObjectNotExists,
    #[error("{0} does not exist")]
    ObjectNotExist(String),
    #[error("{stage}: {source}")]
    Execution {
        stage: Stage,
        model: Option<String>,
        #[source]
        source: sqlx::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl DbopError {
    pub fn execution(stage: Stage, model: Option<&str>, source: sqlx::Error) -> Self {
        DbopError::Execution {
            stage,
            model: model.map(str::to_string),
            source,
        }
    }

    /// Error class: `ObjectNotExist` for a missing detail row, `InternalError` otherwise.
    pub fn code(&self) -> &'static str {
        match self {
            DbopError::ObjectNotExist(_) => "ObjectNotExist",
            _ => "InternalError",
        }
    }

    /// Fine-grained machine-readable reason.
    pub fn reason(&self) -> &'static str {
        match self {
            DbopError::ModelNotRegistered(_) => "ModelNotRegistered",
            DbopError::WrongParamType(_) => "WrongParamType",
            DbopError::UndefinedPk(_) => "UndefinedPk",
            DbopError::NoPrimaryKey(_) => "NoPrimaryKey",
            DbopError::IncompletePkValue => "IncompletePkValue",
            DbopError::WrongJoinCond => "WrongJoinCond",
            DbopError::NoShowIndexField(_) => "NoShowIndexField",
            DbopError::NoObjectMoved => "NoObjectMoved",
            DbopError::ObjectNotExists => "ObjectNotExists",
            DbopError::ObjectNotExist(_) => "ObjectNotExist",
            DbopError::Execution { stage, .. } => stage.reason(),
            DbopError::Config(_) => "ConfigError",
        }
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for DbopError {
    fn into_response(self) -> Response {
        let status = match &self {
            DbopError::ObjectNotExist(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code().to_string(),
                message: self.to_string(),
                details: Some(serde_json::json!({ "reason": self.reason() })),
            },
        };
        (status, Json(body)).into_response()
    }
}
