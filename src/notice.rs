//! Turns homework records into the text sent to the chat

use compact_str::{CompactString, format_compact};
use tracing::error;

use crate::domain::{HomeworkDto, RecordError, Review};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: NoticeMessage,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoticeMessage {
    Reviewed {
        name: CompactString,
        verdict: &'static str,
    },
    MissingField(&'static str),
    UnknownStatus(CompactString),
}

impl Notice {
    /// Derive the notice for a homework record.
    ///
    /// Records without a name or status, and records with a status outside the
    /// known set, are logged as errors and produce a diagnostic notice instead
    /// of a verdict.
    pub fn from_homework(homework: &HomeworkDto) -> Self {
        match Review::try_from(homework) {
            Ok(review) => match review.status.verdict() {
                Some(verdict) => Self {
                    level: NoticeLevel::Info,
                    message: NoticeMessage::Reviewed { name: review.name, verdict },
                },
                None => Self::from_error(RecordError::UnknownStatus(
                    review.status.as_str().into(),
                )),
            },
            Err(e) => Self::from_error(e),
        }
    }

    fn from_error(e: RecordError) -> Self {
        error!(error = %e, "Homework record can't be reported");

        let message = match e {
            RecordError::MissingField(field) => NoticeMessage::MissingField(field),
            RecordError::UnknownStatus(status) => NoticeMessage::UnknownStatus(status),
        };

        Self { level: NoticeLevel::Error, message }
    }

    pub fn text(&self) -> CompactString {
        match &self.message {
            NoticeMessage::Reviewed { name, verdict } => {
                format_compact!("Work \"{name}\" was reviewed!\n\n{verdict}")
            },
            NoticeMessage::MissingField(field) => format_compact!(
                "Field \"{field}\" is missing from the homework record, the review status can't be reported."
            ),
            NoticeMessage::UnknownStatus(status) => {
                format_compact!("Status \"{status}\" is unknown.")
            },
        }
    }
}
