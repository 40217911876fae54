//! One poll-parse-notify pass over the review API

use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use super::{api::HomeworkSource, error::ErrorKind};
use crate::{dispatcher::Dispatcher, id::Cursor, notice::Notice};

/// Fetches status changes and relays the first one to the chat
///
/// The source and dispatcher are injected so the loop can run against stubs.
#[derive(Clone)]
pub struct HomeworkService {
    source: Arc<dyn HomeworkSource>,
    dispatcher: Arc<dyn Dispatcher>,
}

/// Result of a single pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Iteration {
    /// Cursor to use for the next poll
    pub cursor: Cursor,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The API reported no status changes
    NoChanges,
    /// A notice was delivered
    Notified(Notice),
    /// A notice was derived but could not be delivered
    NotifyFailed(Notice, ErrorKind),
    /// The API could not be queried, the cursor was kept
    FetchFailed(ErrorKind),
}

impl Outcome {
    /// Kind of the failure that kept the iteration from completing, if any
    pub fn failure(&self) -> Option<ErrorKind> {
        match self {
            Self::FetchFailed(kind) | Self::NotifyFailed(_, kind) => Some(*kind),
            Self::NoChanges | Self::Notified(_) => None,
        }
    }
}

impl HomeworkService {
    pub fn new(source: Arc<dyn HomeworkSource>, dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self { source, dispatcher }
    }

    /// Poll once from `cursor` and send at most one notice.
    ///
    /// Failures never escape: they are logged and reported through
    /// [`Outcome`]. Only the first changed homework is reported, in the order
    /// the API returns them.
    #[instrument(skip(self), fields(cursor = %cursor))]
    pub async fn run_iteration(&self, cursor: Cursor) -> Iteration {
        let statuses = match self.source.homework_statuses(cursor).await {
            Ok(statuses) => statuses,
            Err(e) => {
                error!(kind = %e.kind(), error = %e, "Failed to fetch homework statuses");
                return Iteration { cursor, outcome: Outcome::FetchFailed(e.kind()) };
            },
        };

        let next = match statuses.current_date {
            Some(next) if next < cursor => {
                warn!(next = %next, "Review API moved the cursor backwards");
                next
            },
            Some(next) => next,
            None => {
                warn!("Review API answer has no current_date, keeping cursor");
                cursor
            },
        };

        let Some(homework) = statuses.homeworks.first() else {
            debug!(next = %next, "No homework status changes");
            return Iteration { cursor: next, outcome: Outcome::NoChanges };
        };

        if statuses.homeworks.len() > 1 {
            debug!(
                skipped = statuses.homeworks.len() - 1,
                "Several homeworks changed, reporting the first one"
            );
        }

        let notice = Notice::from_homework(homework);
        let outcome = match self.dispatcher.dispatch(&notice.text()).await {
            Ok(()) => {
                info!(level = ?notice.level, "Message has been sent");
                Outcome::Notified(notice)
            },
            Err(e) => {
                error!(kind = %e.kind(), error = %e, "Failed to send message");
                let kind = e.kind();
                Outcome::NotifyFailed(notice, kind)
            },
        };

        Iteration { cursor: next, outcome }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{
        collections::VecDeque,
        sync::{Arc, Mutex},
    };

    use async_trait::async_trait;
    use compact_str::CompactString;

    use super::*;
    use crate::{
        client::{ClientError, Result},
        domain::{HomeworkDto, HomeworkStatus, HomeworkStatusesDto},
        logging::capture_errors,
        notice::NoticeLevel,
    };

    /// Source replaying queued answers, repeating the last one when drained
    #[derive(Default)]
    pub(crate) struct StubSource {
        answers: Mutex<VecDeque<Result<HomeworkStatusesDto>>>,
        pub(crate) cursors: Mutex<Vec<Cursor>>,
    }

    impl StubSource {
        pub(crate) fn answering(answers: Vec<Result<HomeworkStatusesDto>>) -> Arc<Self> {
            Arc::new(Self { answers: Mutex::new(answers.into()), ..Self::default() })
        }
    }

    #[async_trait]
    impl HomeworkSource for StubSource {
        async fn homework_statuses(&self, from: Cursor) -> Result<HomeworkStatusesDto> {
            self.cursors.lock().unwrap().push(from);
            let mut answers = self.answers.lock().unwrap();
            match answers.len() {
                0 => Ok(HomeworkStatusesDto::default()),
                1 => match answers.front().unwrap() {
                    Ok(statuses) => Ok(statuses.clone()),
                    Err(_) => answers.pop_front().unwrap(),
                },
                _ => answers.pop_front().unwrap(),
            }
        }
    }

    #[derive(Default)]
    pub(crate) struct RecordingDispatcher {
        pub(crate) sent: Mutex<Vec<CompactString>>,
        fail: bool,
    }

    impl RecordingDispatcher {
        pub(crate) fn failing() -> Arc<Self> {
            Arc::new(Self { fail: true, ..Self::default() })
        }
    }

    #[async_trait]
    impl Dispatcher for RecordingDispatcher {
        async fn dispatch(&self, text: &str) -> Result<()> {
            self.sent.lock().unwrap().push(text.into());
            if self.fail {
                return Err(ClientError::delivery(400, "Bad Request: chat not found"));
            }
            Ok(())
        }
    }

    pub(crate) fn statuses(homeworks: Vec<HomeworkDto>, current_date: i64) -> HomeworkStatusesDto {
        HomeworkStatusesDto { homeworks, current_date: Some(Cursor::new(current_date)) }
    }

    fn service(
        source: &Arc<StubSource>,
        dispatcher: &Arc<RecordingDispatcher>,
    ) -> HomeworkService {
        HomeworkService::new(source.clone(), dispatcher.clone())
    }

    #[tokio::test]
    async fn end_to_end_approved_homework() {
        let source = StubSource::answering(vec![Ok(statuses(
            vec![HomeworkDto::new("Task1", "approved")],
            2000,
        ))]);
        let dispatcher = Arc::new(RecordingDispatcher::default());

        let iteration = service(&source, &dispatcher).run_iteration(Cursor::new(1000)).await;

        assert_eq!(iteration.cursor, Cursor::new(2000));
        assert!(matches!(iteration.outcome, Outcome::Notified(_)));
        assert_eq!(*source.cursors.lock().unwrap(), vec![Cursor::new(1000)]);

        let sent = dispatcher.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("Task1"));
        assert!(sent[0].contains(HomeworkStatus::Approved.verdict().unwrap()));
    }

    #[tokio::test]
    async fn empty_answer_moves_cursor_without_notifying() {
        let source = StubSource::answering(vec![Ok(statuses(vec![], 1500))]);
        let dispatcher = Arc::new(RecordingDispatcher::default());

        let iteration = service(&source, &dispatcher).run_iteration(Cursor::new(1000)).await;

        assert_eq!(iteration, Iteration { cursor: Cursor::new(1500), outcome: Outcome::NoChanges });
        assert_eq!(iteration.outcome.failure(), None);
        assert!(dispatcher.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn only_the_first_homework_is_reported() {
        let source = StubSource::answering(vec![Ok(statuses(
            vec![
                HomeworkDto::new("Newest", "rejected"),
                HomeworkDto::new("Older", "approved"),
            ],
            2000,
        ))]);
        let dispatcher = Arc::new(RecordingDispatcher::default());

        service(&source, &dispatcher).run_iteration(Cursor::new(1000)).await;

        let sent = dispatcher.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("Newest"));
        assert!(!sent[0].contains("Older"));
    }

    #[tokio::test]
    async fn fetch_failure_keeps_cursor_and_logs() {
        let (subscriber, mut errors) = capture_errors();
        let _guard = tracing::subscriber::set_default(subscriber);
        let source = StubSource::answering(vec![Err(ClientError::api(502, "Bad Gateway"))]);
        let dispatcher = Arc::new(RecordingDispatcher::default());

        let iteration = service(&source, &dispatcher).run_iteration(Cursor::new(1000)).await;

        assert_eq!(iteration.cursor, Cursor::new(1000));
        assert_eq!(iteration.outcome, Outcome::FetchFailed(ErrorKind::Http));
        assert_eq!(iteration.outcome.failure(), Some(ErrorKind::Http));
        assert!(dispatcher.sent.lock().unwrap().is_empty());

        let logged = errors.try_recv().expect("fetch failure should be logged");
        assert!(logged.contains("Failed to fetch homework statuses"));
        assert!(logged.contains("Bad Gateway"));
    }

    #[tokio::test]
    async fn notify_failure_still_advances_cursor() {
        let source = StubSource::answering(vec![Ok(statuses(
            vec![HomeworkDto::new("Task1", "reviewing")],
            2000,
        ))]);
        let dispatcher = RecordingDispatcher::failing();

        let iteration = service(&source, &dispatcher).run_iteration(Cursor::new(1000)).await;

        assert_eq!(iteration.cursor, Cursor::new(2000));
        assert!(matches!(
            iteration.outcome,
            Outcome::NotifyFailed(_, ErrorKind::Delivery)
        ));
        assert_eq!(iteration.outcome.failure(), Some(ErrorKind::Delivery));
    }

    #[tokio::test]
    async fn unknown_status_sends_diagnostic_instead_of_verdict() {
        let source = StubSource::answering(vec![Ok(statuses(
            vec![HomeworkDto::new("Task1", "unknown_xyz")],
            2000,
        ))]);
        let dispatcher = Arc::new(RecordingDispatcher::default());

        let iteration = service(&source, &dispatcher).run_iteration(Cursor::new(1000)).await;

        match iteration.outcome {
            Outcome::Notified(notice) => assert_eq!(notice.level, NoticeLevel::Error),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(
            *dispatcher.sent.lock().unwrap(),
            vec![CompactString::from("Status \"unknown_xyz\" is unknown.")]
        );
    }

    #[tokio::test]
    async fn missing_current_date_keeps_cursor() {
        let answer = HomeworkStatusesDto {
            homeworks: vec![HomeworkDto::new("Task1", "approved")],
            current_date: None,
        };
        let source = StubSource::answering(vec![Ok(answer)]);
        let dispatcher = Arc::new(RecordingDispatcher::default());

        let iteration = service(&source, &dispatcher).run_iteration(Cursor::new(1000)).await;

        assert_eq!(iteration.cursor, Cursor::new(1000));
        assert_eq!(dispatcher.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn repeated_iterations_are_not_deduplicated() {
        let source = StubSource::answering(vec![Ok(statuses(
            vec![HomeworkDto::new("Task1", "approved")],
            2000,
        ))]);
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let service = service(&source, &dispatcher);

        let first = service.run_iteration(Cursor::new(1000)).await;
        let second = service.run_iteration(Cursor::new(1000)).await;

        assert_eq!(first, second);
        let sent = dispatcher.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0], sent[1]);
    }
}
