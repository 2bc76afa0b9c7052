use serde::{Deserialize, Serialize};

/// An exon block as returned by a range data source.
///
/// Coordinates are 1-based and inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub start_index: i64,
    pub end_index: i64,
}

impl Block {
    pub fn new(start_index: i64, end_index: i64) -> Self {
        Self {
            start_index,
            end_index,
        }
    }

    pub fn len(&self) -> i64 {
        self.end_index - self.start_index + 1
    }

    pub fn is_empty(&self) -> bool {
        self.end_index < self.start_index
    }

    pub fn overlaps(&self, start: i64, end: i64) -> bool {
        self.start_index <= end && self.end_index >= start
    }
}

/// Identifies the annotation track that drives intron compression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackConfig {
    pub id: i64,
    pub chromosome_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id_number: Option<i64>,
}

impl TrackConfig {
    pub fn new(id: i64, chromosome_id: i64) -> Self {
        Self {
            id,
            chromosome_id,
            project_id_number: None,
        }
    }

    pub fn with_project(mut self, project_id: i64) -> Self {
        self.project_id_number = Some(project_id);
        self
    }

    /// Same track on the same chromosome.
    pub fn same_target(&self, other: &TrackConfig) -> bool {
        self.id == other.id && self.chromosome_id == other.chromosome_id
    }
}

/// Body of `POST gene/exons/viewport`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportQuery {
    pub center_position: i64,
    pub chromosome_id: i64,
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<i64>,
    pub intron_length: i64,
    pub view_port_size: i64,
}

/// Body of `POST gene/exons/range`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeQuery {
    pub chromosome_id: i64,
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<i64>,
    pub intron_length: i64,
    pub start_index: i64,
    pub end_index: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResultStatus {
    Ok,
    Info,
    Warn,
    Error,
}

/// Response envelope used by the genome browser REST API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: ResultStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub payload: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(payload: T) -> Self {
        Self {
            status: ResultStatus::Ok,
            message: None,
            payload: Some(payload),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ResultStatus::Error,
            message: Some(message.into()),
            payload: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        !matches!(self.status, ResultStatus::Error)
    }
}
