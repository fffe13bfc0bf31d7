// src/collab/mod.rs
// Cross-agent collaboration mailbox

mod store;
mod types;

pub use store::{
    DEFAULT_WAIT_TIMEOUT_SECS, MAX_WAIT_TIMEOUT_SECS, Mailbox, normalize_participant,
    resolve_participant,
};
pub use types::{
    MAX_CONTENT_LEN, MAX_PARTICIPANT_LEN, MAX_SUMMARY_LEN, MAX_TOPIC_LEN, Message, MessageType,
    Participant, Session, SessionStatus, SessionSummary, WaitOutcome, WaitStatus,
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    fn mailbox() -> (tempfile::TempDir, Mailbox) {
        let dir = tempfile::tempdir().unwrap();
        let mailbox = Mailbox::new(dir.path().to_path_buf());
        (dir, mailbox)
    }

    #[tokio::test]
    async fn test_s2_end_to_end() {
        let (_dir, mailbox) = mailbox();

        // (a) create
        let session = mailbox.create_session("Add streaming", "alpha").await.unwrap();
        assert_eq!(session.status, SessionStatus::Active);
        assert!(session.is_participant("alpha"));
        let id = session.id.clone();

        // (b) join
        let (session, messages) = mailbox.join_session(&id, "beta").await.unwrap();
        assert!(session.is_participant("alpha") && session.is_participant("beta"));
        assert_eq!(session.message_count, 0);
        assert!(messages.is_empty());

        // (c) post
        let message = mailbox
            .post(&id, "beta", MessageType::Question, "hi")
            .await
            .unwrap();
        assert_eq!(message.id, 1);

        // (d) check advances the cursor
        let new = mailbox.check(&id, "alpha").await.unwrap();
        assert_eq!(new.len(), 1);
        assert_eq!(new[0].id, 1);
        assert_eq!(new[0].content, "hi");
        let again = mailbox.check(&id, "alpha").await.unwrap();
        assert!(again.is_empty(), "second check must be empty");

        // (e) close rejects further posts
        let closed = mailbox.close(&id, Some("done")).await.unwrap();
        assert_eq!(closed.status, SessionStatus::Closed);
        assert_eq!(closed.summary.as_deref(), Some("done"));
        assert!(
            mailbox
                .post(&id, "beta", MessageType::General, "late")
                .await
                .is_err()
        );
        assert!(mailbox.join_session(&id, "gamma").await.is_err());
    }

    #[tokio::test]
    async fn test_message_count_matches_files_on_disk() {
        let (dir, mailbox) = mailbox();
        let session = mailbox.create_session("t", "alpha").await.unwrap();
        for i in 0..3 {
            mailbox
                .post(&session.id, "alpha", MessageType::General, &format!("m{i}"))
                .await
                .unwrap();
        }

        let (session, messages) = mailbox.read_all(&session.id).await.unwrap();
        assert_eq!(session.message_count, 3);
        let ids: Vec<u64> = messages.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 2, 3], "ids contiguous from 1");

        let msg_files = std::fs::read_dir(dir.path().join("sessions").join(&session.id))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("msg-"))
            .count();
        assert_eq!(msg_files as u64, session.message_count);
    }

    #[tokio::test]
    async fn test_post_requires_joining_first() {
        let (_dir, mailbox) = mailbox();
        let session = mailbox.create_session("t", "alpha").await.unwrap();
        let err = mailbox
            .post(&session.id, "stranger", MessageType::General, "hi")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("has not joined"));
    }

    #[tokio::test]
    async fn test_participant_normalisation_shares_cursor() {
        // A name differing only in case/whitespace is the same participant.
        let (_dir, mailbox) = mailbox();
        let session = mailbox.create_session("t", "Alpha ").await.unwrap();
        assert!(session.is_participant("alpha"));

        mailbox
            .post(&session.id, "ALPHA", MessageType::General, "one")
            .await
            .unwrap();
        let new = mailbox.check(&session.id, " alpha").await.unwrap();
        assert_eq!(new.len(), 1);
        let again = mailbox.check(&session.id, "ALPHA").await.unwrap();
        assert!(again.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_participant_rejected() {
        let (_dir, mailbox) = mailbox();
        assert!(mailbox.create_session("t", "Bad Name!").await.is_err());
        assert!(mailbox.create_session("t", "-leading").await.is_err());
        assert!(mailbox.create_session("t", &"x".repeat(200)).await.is_err());
    }

    #[tokio::test]
    async fn test_session_id_must_be_uuid() {
        let (_dir, mailbox) = mailbox();
        let err = mailbox
            .join_session("../../etc/passwd", "alpha")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid session id"));
    }

    #[tokio::test]
    async fn test_length_caps() {
        let (_dir, mailbox) = mailbox();
        assert!(
            mailbox
                .create_session(&"t".repeat(MAX_TOPIC_LEN + 1), "alpha")
                .await
                .is_err()
        );
        let session = mailbox.create_session("t", "alpha").await.unwrap();
        assert!(
            mailbox
                .post(
                    &session.id,
                    "alpha",
                    MessageType::General,
                    &"c".repeat(MAX_CONTENT_LEN + 1)
                )
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_list_sessions_sorted_and_filtered() {
        let (_dir, mailbox) = mailbox();
        let first = mailbox.create_session("first", "alpha").await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let second = mailbox.create_session("second", "alpha").await.unwrap();
        mailbox.close(&first.id, None).await.unwrap();

        let all = mailbox.list_sessions(None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, first.id, "most recently updated first");

        let active = mailbox
            .list_sessions(Some(SessionStatus::Active))
            .await
            .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, second.id);
    }

    #[tokio::test]
    async fn test_wait_returns_immediately_on_unread() {
        let (_dir, mailbox) = mailbox();
        let session = mailbox.create_session("t", "alpha").await.unwrap();
        mailbox.join_session(&session.id, "beta").await.unwrap();
        mailbox
            .post(&session.id, "beta", MessageType::General, "ping")
            .await
            .unwrap();

        let outcome = mailbox
            .wait(
                &session.id,
                Some(30),
                Duration::from_secs(5),
                Some("alpha"),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(outcome.status, WaitStatus::NewMessages);
        assert_eq!(outcome.new_count, 1);
    }

    #[tokio::test]
    async fn test_wait_timeout() {
        let (_dir, mailbox) = mailbox();
        let session = mailbox.create_session("t", "alpha").await.unwrap();
        let outcome = mailbox
            .wait(
                &session.id,
                Some(0),
                Duration::from_secs(5),
                None,
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(outcome.status, WaitStatus::Timeout);
        assert_eq!(outcome.new_count, 0);
    }

    #[tokio::test]
    async fn test_wait_honours_cancellation() {
        let (_dir, mailbox) = mailbox();
        let session = mailbox.create_session("t", "alpha").await.unwrap();
        let ct = CancellationToken::new();
        ct.cancel();
        let err = mailbox
            .wait(&session.id, Some(60), Duration::from_secs(5), None, &ct)
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::DevToolsError::Cancelled));
    }

    #[tokio::test]
    async fn test_concurrent_posts_get_distinct_contiguous_ids() {
        let (_dir, mailbox) = mailbox();
        let mailbox = std::sync::Arc::new(mailbox);
        let session = mailbox.create_session("t", "alpha").await.unwrap();

        let mut handles = Vec::new();
        for i in 0..8 {
            let mailbox = mailbox.clone();
            let id = session.id.clone();
            handles.push(tokio::spawn(async move {
                mailbox
                    .post(&id, "alpha", MessageType::General, &format!("m{i}"))
                    .await
            }));
        }
        let mut ids: Vec<u64> = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap().id);
        }
        ids.sort_unstable();
        assert_eq!(ids, (1..=8).collect::<Vec<u64>>());
    }

    #[test]
    fn test_resolve_participant() {
        assert_eq!(
            resolve_participant(Some("Alpha"), None).unwrap(),
            "alpha"
        );
        assert!(resolve_participant(Some("bad name"), None).is_err());
        assert_eq!(
            resolve_participant(None, Some("file:///home/u/My Project")).unwrap(),
            "my-project"
        );
        assert_eq!(resolve_participant(None, None).unwrap(), "agent");
        assert_eq!(
            resolve_participant(None, Some("/w/repo_x")).unwrap(),
            "repo_x"
        );
    }
}
