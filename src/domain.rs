use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::id::{ChatId, Cursor};

/// Review state of a single homework submission
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HomeworkStatus {
    Rejected,
    Approved,
    Reviewing,
    Unknown(CompactString),
}

/// A homework whose name and status were both present in the API answer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Review {
    pub name: CompactString,
    pub status: HomeworkStatus,
}

/// Why a homework record could not be turned into a verdict
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("field \"{0}\" is missing from the homework record")]
    MissingField(&'static str),
    #[error("status \"{0}\" is unknown")]
    UnknownStatus(CompactString),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HomeworkStatusesDto {
    pub homeworks: Vec<HomeworkDto>,
    /// Server time to use as `from_date` on the next poll
    #[serde(default)]
    pub current_date: Option<Cursor>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HomeworkDto {
    #[serde(default)]
    pub homework_name: Option<CompactString>,
    #[serde(default)]
    pub status: Option<CompactString>,
}

/// Error payload returned by the review API on non-2xx responses
#[derive(Debug, Deserialize)]
pub struct ReviewApiErrorDto {
    #[serde(default)]
    pub code: Option<CompactString>,
    #[serde(default)]
    pub message: Option<CompactString>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendMessageDto<'a> {
    pub chat_id: &'a ChatId,
    pub text: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramResponseDto {
    pub ok: bool,
    #[serde(default)]
    pub description: Option<CompactString>,
    #[serde(default)]
    pub error_code: Option<u16>,
    #[serde(default)]
    pub result: Option<TelegramMessageDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramMessageDto {
    pub message_id: i64,
}

impl HomeworkStatus {
    pub fn parse(value: &str) -> Self {
        match value {
            "rejected" => Self::Rejected,
            "approved" => Self::Approved,
            "reviewing" => Self::Reviewing,
            other => Self::Unknown(other.into()),
        }
    }

    /// Human-readable review outcome, absent for unknown statuses
    pub fn verdict(&self) -> Option<&'static str> {
        match self {
            Self::Rejected => Some("Unfortunately, the reviewer found mistakes in your work."),
            Self::Approved => Some("The reviewer liked everything, the work is accepted!"),
            Self::Reviewing => {
                Some("Your work has been taken for review, the verdict will follow soon.")
            },
            Self::Unknown(_) => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Rejected => "rejected",
            Self::Approved => "approved",
            Self::Reviewing => "reviewing",
            Self::Unknown(raw) => raw,
        }
    }
}

impl std::fmt::Display for HomeworkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl HomeworkDto {
    pub fn new(name: impl Into<CompactString>, status: impl Into<CompactString>) -> Self {
        Self {
            homework_name: Some(name.into()),
            status: Some(status.into()),
        }
    }
}

impl TryFrom<&HomeworkDto> for Review {
    type Error = RecordError;

    fn try_from(dto: &HomeworkDto) -> Result<Self, Self::Error> {
        let name = dto
            .homework_name
            .clone()
            .ok_or(RecordError::MissingField("homework_name"))?;
        let status = dto
            .status
            .as_deref()
            .map(HomeworkStatus::parse)
            .ok_or(RecordError::MissingField("status"))?;

        if let HomeworkStatus::Unknown(raw) = status {
            return Err(RecordError::UnknownStatus(raw));
        }

        Ok(Self { name, status })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_statuses_have_verdicts() {
        for raw in ["rejected", "approved", "reviewing"] {
            let status = HomeworkStatus::parse(raw);
            assert_eq!(status.as_str(), raw);
            assert!(status.verdict().is_some(), "{raw} should map to a verdict");
        }

        assert_eq!(HomeworkStatus::parse("unknown_xyz").verdict(), None);
    }

    #[test]
    fn statuses_response_tolerates_missing_fields() {
        let body = r#"{
            "homeworks": [
                {"homework_name": "Task1", "status": "approved", "id": 7},
                {"status": "reviewing"}
            ],
            "current_date": 2000
        }"#;

        let dto: HomeworkStatusesDto = serde_json::from_str(body).unwrap();

        assert_eq!(dto.current_date, Some(Cursor::new(2000)));
        assert_eq!(dto.homeworks[0], HomeworkDto::new("Task1", "approved"));
        assert_eq!(dto.homeworks[1].homework_name, None);
    }

    #[test]
    fn statuses_response_requires_homeworks() {
        let result = serde_json::from_str::<HomeworkStatusesDto>(r#"{"current_date": 5}"#);
        assert!(result.is_err());
    }

    #[test]
    fn review_from_record() {
        let review = Review::try_from(&HomeworkDto::new("Task1", "rejected")).unwrap();
        assert_eq!(review.name, "Task1");
        assert_eq!(review.status, HomeworkStatus::Rejected);

        let missing = HomeworkDto { homework_name: Some("Task1".into()), status: None };
        assert_eq!(
            Review::try_from(&missing),
            Err(RecordError::MissingField("status"))
        );

        assert_eq!(
            Review::try_from(&HomeworkDto::new("Task1", "lost")),
            Err(RecordError::UnknownStatus("lost".into()))
        );
    }
}
