mod common;

use std::sync::Arc;

use common::{
    FailingNotifier, RecordingNotifier, open_db, remark, scored, seed_assessment, submission,
};
use rust_evalbook::entity::evaluations::{ActiveModel as EvaluationActiveModel, Entity as Evaluations};
use rust_evalbook::models::assessments::responses::AssessmentCreationStatus;
use rust_evalbook::models::assessments::entities::{NewAssessment, NewCategory};
use rust_evalbook::models::evaluations::entities::{HistoryRole, ReportTarget, SessionKey};
use rust_evalbook::models::evaluations::responses::{ReportValue, SubmitStatus};
use rust_evalbook::services::assessments::sessions::build_assessment_sessions;
use rust_evalbook::services::evaluations::SessionPolicy;
use rust_evalbook::services::evaluations::history::build_history;
use rust_evalbook::services::evaluations::report::build_report;
use rust_evalbook::services::evaluations::submit::submit_batch;
use rust_evalbook::services::notifications::{
    NotificationDispatcher, NotificationEvent, NotificationTarget, run_worker, run_worker_until,
};
use rust_evalbook::storage::Storage;
use sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, Set};

const T1: &str = "2025-03-01 10:15:00";
const T2: &str = "2025-03-02 09:00:00";

async fn row_count(db: &common::TestDb) -> u64 {
    Evaluations::find()
        .count(db.storage.connection())
        .await
        .expect("count rows")
}

#[tokio::test]
async fn resubmitting_the_same_session_is_replayed() {
    let db = open_db().await;
    let (assessment_id, categories) = seed_assessment(&db.storage, "MID", "T-9").await;
    let dispatcher = NotificationDispatcher::disabled();
    let policy = SessionPolicy::default();

    let req = submission(
        assessment_id,
        "42",
        "9",
        T1,
        vec![
            scored(categories[0].id, 7.0),
            scored(categories[1].id, 3.0),
            remark(categories[2].id, "Good"),
        ],
    );

    let first = submit_batch(&db.storage, &dispatcher, &policy, &req)
        .await
        .expect("first submit");
    assert_eq!(first.status, SubmitStatus::Committed);
    assert_eq!(first.session_ref.row_count, 3);

    let second = submit_batch(&db.storage, &dispatcher, &policy, &req)
        .await
        .expect("retry submit");
    assert_eq!(second.status, SubmitStatus::Replayed);
    assert_eq!(second.session_ref.first_row_id, first.session_ref.first_row_id);
    assert_eq!(second.session_ref.row_count, 3);

    assert_eq!(row_count(&db).await, 3);

    let existing = db
        .storage
        .find_existing_session(&first.session_ref.key())
        .await
        .expect("guard lookup");
    assert_eq!(existing, Some(first.session_ref));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_duplicates_commit_once_and_replay_the_rest() {
    let db = open_db().await;
    let (assessment_id, categories) = seed_assessment(&db.storage, "MID", "T-9").await;
    let storage = db.shared();
    let req = submission(
        assessment_id,
        "42",
        "9",
        T1,
        vec![scored(categories[0].id, 7.0), scored(categories[1].id, 3.0)],
    );

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let storage = storage.clone();
            let req = req.clone();
            tokio::spawn(async move {
                submit_batch(
                    storage.as_ref(),
                    &NotificationDispatcher::disabled(),
                    &SessionPolicy::default(),
                    &req,
                )
                .await
            })
        })
        .collect();

    let mut committed = 0;
    let mut replayed = 0;
    for handle in handles {
        let resp = handle
            .await
            .expect("task joins")
            .expect("duplicate submission never fails");
        assert_eq!(resp.session_ref.row_count, 2);
        match resp.status {
            SubmitStatus::Committed => committed += 1,
            SubmitStatus::Replayed => replayed += 1,
        }
    }

    assert_eq!(committed, 1);
    assert_eq!(replayed, 7);
    assert_eq!(row_count(&db).await, 2);
}

#[tokio::test]
async fn unknown_category_rolls_back_the_whole_batch() {
    let db = open_db().await;
    let (assessment_id, categories) = seed_assessment(&db.storage, "MID", "T-9").await;

    // 无效分类放在最后，前两行已经插入后才失败
    let req = submission(
        assessment_id,
        "42",
        "9",
        T1,
        vec![
            scored(categories[0].id, 7.0),
            scored(categories[1].id, 3.0),
            scored(999_999, 1.0),
        ],
    );

    let err = submit_batch(
        &db.storage,
        &NotificationDispatcher::disabled(),
        &SessionPolicy::default(),
        &req,
    )
    .await
    .expect_err("batch must fail");
    assert_eq!(err.code(), "E004");
    assert_eq!(row_count(&db).await, 0);
}

#[tokio::test]
async fn category_of_another_assessment_is_rejected() {
    let db = open_db().await;
    let (assessment_id, _) = seed_assessment(&db.storage, "MID", "T-9").await;
    let (_, other_categories) = seed_assessment(&db.storage, "FINAL", "T-9").await;

    let req = submission(
        assessment_id,
        "42",
        "9",
        T1,
        vec![scored(other_categories[0].id, 4.0)],
    );

    let err = submit_batch(
        &db.storage,
        &NotificationDispatcher::disabled(),
        &SessionPolicy::default(),
        &req,
    )
    .await
    .expect_err("foreign category must fail");
    assert_eq!(err.code(), "E004");
    assert_eq!(row_count(&db).await, 0);
}

#[tokio::test]
async fn report_sums_scores_and_keeps_comment_text() {
    let db = open_db().await;
    let (assessment_id, categories) = seed_assessment(&db.storage, "MID", "T-9").await;

    submit_batch(
        &db.storage,
        &NotificationDispatcher::disabled(),
        &SessionPolicy::default(),
        &submission(
            assessment_id,
            "42",
            "9",
            T1,
            vec![
                scored(categories[0].id, 7.0),
                scored(categories[1].id, 3.0),
                remark(categories[2].id, "Good"),
            ],
        ),
    )
    .await
    .expect("submit");

    let report = build_report(
        &db.storage,
        &ReportTarget::Latest {
            assessment_id,
            student_id: "42".into(),
        },
    )
    .await
    .expect("report");

    assert_eq!(report.total_marks, 15.0);
    assert_eq!(report.obtained_marks, 10.0);
    assert_eq!(report.assessment_name.as_deref(), Some("Assessment MID"));
    assert_eq!(report.evaluator_id, "9");
    assert_eq!(report.categories.len(), 3);

    let remarks = report
        .categories
        .iter()
        .find(|c| c.is_comment)
        .expect("comment category");
    assert_eq!(remarks.value, ReportValue::Text("Good".into()));
    assert_eq!(remarks.category.as_deref(), Some("Remarks"));
}

#[tokio::test]
async fn history_has_one_entry_per_session() {
    let db = open_db().await;
    let (assessment_id, categories) = seed_assessment(&db.storage, "MID", "T-9").await;
    let dispatcher = NotificationDispatcher::disabled();
    let policy = SessionPolicy::default();

    submit_batch(
        &db.storage,
        &dispatcher,
        &policy,
        &submission(
            assessment_id,
            "42",
            "9",
            T1,
            vec![scored(categories[0].id, 7.0), scored(categories[1].id, 3.0)],
        ),
    )
    .await
    .expect("first session");
    submit_batch(
        &db.storage,
        &dispatcher,
        &policy,
        &submission(
            assessment_id,
            "42",
            "9",
            T2,
            vec![scored(categories[0].id, 9.0)],
        ),
    )
    .await
    .expect("second session");

    let student = build_history(&db.storage, "42", HistoryRole::Student)
        .await
        .expect("student history");
    assert_eq!(student.len(), 2);
    assert_eq!(student[0].row_count, 1);
    assert_eq!(student[1].row_count, 2);
    assert_eq!(student[0].assessment_title.as_deref(), Some("Assessment MID"));

    let teacher = build_history(&db.storage, "9", HistoryRole::Teacher)
        .await
        .expect("teacher history");
    assert_eq!(teacher.len(), 2);
    assert!(teacher[0].session_timestamp > teacher[1].session_timestamp);
}

#[tokio::test]
async fn teacher_history_tolerates_whitespace_and_includes_owned_assessments() {
    let db = open_db().await;
    let (assessment_id, categories) = seed_assessment(&db.storage, "MID", "T-9").await;
    let conn = db.storage.connection();

    // 旧数据中评价人带有首尾空白，评价人也不是测评所有者
    for (evaluator, category) in [(" T-9 ", &categories[0]), ("T-3", &categories[1])] {
        EvaluationActiveModel {
            assessment_id: Set(assessment_id),
            category_id: Set(category.id),
            marks: Set(4.0),
            comment: Set(None),
            evaluated_by: Set(evaluator.to_string()),
            evaluation_of: Set("42".to_string()),
            created_at: Set(1_740_824_100_000),
            ..Default::default()
        }
        .insert(conn)
        .await
        .expect("insert legacy row");
    }

    let owner = build_history(&db.storage, "T-9", HistoryRole::Teacher)
        .await
        .expect("owner history");
    // 两个评价人各自构成一个会话
    assert_eq!(owner.len(), 2);
    assert!(owner.iter().any(|s| s.evaluator_id == "T-9"));
    assert!(owner.iter().any(|s| s.evaluator_id == "T-3"));

    let other = build_history(&db.storage, "T-3", HistoryRole::Teacher)
        .await
        .expect("other history");
    assert_eq!(other.len(), 1);
}

#[tokio::test]
async fn latest_report_picks_the_most_recent_session() {
    let db = open_db().await;
    let (assessment_id, categories) = seed_assessment(&db.storage, "MID", "T-9").await;
    let dispatcher = NotificationDispatcher::disabled();
    let policy = SessionPolicy::default();

    // 较新的会话先到达，行 ID 反而更小
    submit_batch(
        &db.storage,
        &dispatcher,
        &policy,
        &submission(assessment_id, "42", "9", T2, vec![scored(categories[0].id, 9.0)]),
    )
    .await
    .expect("newer session");
    let older = submit_batch(
        &db.storage,
        &dispatcher,
        &policy,
        &submission(assessment_id, "42", "9", T1, vec![scored(categories[0].id, 2.0)]),
    )
    .await
    .expect("older session");

    let latest = build_report(
        &db.storage,
        &ReportTarget::Latest {
            assessment_id,
            student_id: "42".into(),
        },
    )
    .await
    .expect("latest report");
    assert_eq!(latest.obtained_marks, 9.0);

    // 显式行 ID 直接定位所属会话
    let row_id = older.session_ref.first_row_id.expect("row id");
    let by_row = build_report(&db.storage, &ReportTarget::Row(row_id))
        .await
        .expect("report by row");
    assert_eq!(by_row.obtained_marks, 2.0);
    assert_eq!(by_row.evaluation_row_id, row_id);

    let exact = build_report(
        &db.storage,
        &ReportTarget::Session(SessionKey::new(
            assessment_id,
            "42",
            older.session_ref.session_timestamp,
        )),
    )
    .await
    .expect("report by session");
    assert_eq!(exact.obtained_marks, 2.0);
}

#[tokio::test]
async fn missing_evaluator_is_rejected_before_any_write() {
    let db = open_db().await;
    let (assessment_id, categories) = seed_assessment(&db.storage, "MID", "T-9").await;

    let mut req = submission(assessment_id, "42", "9", T1, vec![scored(categories[0].id, 7.0)]);
    req.evaluator_id = None;

    let err = submit_batch(
        &db.storage,
        &NotificationDispatcher::disabled(),
        &SessionPolicy::default(),
        &req,
    )
    .await
    .expect_err("must be rejected");
    assert_eq!(err.code(), "E005");
    assert_eq!(row_count(&db).await, 0);
}

#[tokio::test]
async fn report_for_unknown_student_is_not_found() {
    let db = open_db().await;
    let (assessment_id, _) = seed_assessment(&db.storage, "MID", "T-9").await;

    let err = build_report(
        &db.storage,
        &ReportTarget::Latest {
            assessment_id,
            student_id: "nobody".into(),
        },
    )
    .await
    .expect_err("no rows");
    assert_eq!(err.code(), "E006");
    assert_eq!(err.message(), "No report found");

    let err = build_report(&db.storage, &ReportTarget::Row(12345))
        .await
        .expect_err("no row");
    assert_eq!(err.code(), "E006");
}

#[tokio::test]
async fn empty_batch_commits_zero_rows_without_notification() {
    let db = open_db().await;
    let (assessment_id, _) = seed_assessment(&db.storage, "MID", "T-9").await;
    let (dispatcher, mut receiver) = NotificationDispatcher::channel(8);

    let resp = submit_batch(
        &db.storage,
        &dispatcher,
        &SessionPolicy::default(),
        &submission(assessment_id, "42", "9", T1, Vec::new()),
    )
    .await
    .expect("empty batch");

    assert_eq!(resp.status, SubmitStatus::Committed);
    assert_eq!(resp.session_ref.row_count, 0);
    assert_eq!(resp.session_ref.first_row_id, None);
    assert!(receiver.try_recv().is_err());
}

#[tokio::test]
async fn only_new_sessions_emit_notifications() {
    let db = open_db().await;
    let (assessment_id, categories) = seed_assessment(&db.storage, "MID", "T-9").await;
    let (dispatcher, mut receiver) = NotificationDispatcher::channel(8);
    let req = submission(assessment_id, "42", "9", T1, vec![scored(categories[0].id, 7.0)]);

    for _ in 0..2 {
        submit_batch(&db.storage, &dispatcher, &SessionPolicy::default(), &req)
            .await
            .expect("submit");
    }

    assert_eq!(
        receiver.try_recv().ok(),
        Some(NotificationEvent::EvaluationSubmitted {
            assessment_id,
            student_id: "42".into(),
        })
    );
    assert!(receiver.try_recv().is_err());
}

#[tokio::test]
async fn worker_notifies_the_owning_teacher() {
    let db = open_db().await;
    let (assessment_id, _) = seed_assessment(&db.storage, "MID", " T-9 ").await;
    let notifier = Arc::new(RecordingNotifier::default());
    let (dispatcher, receiver) = NotificationDispatcher::channel(8);
    let worker = tokio::spawn(run_worker(receiver, db.shared(), notifier.clone()));

    dispatcher.emit(NotificationEvent::EvaluationSubmitted {
        assessment_id,
        student_id: "BSCS-42".into(),
    });
    dispatcher.emit(NotificationEvent::AssessmentCreated {
        title: "Quiz 1".into(),
    });
    drop(dispatcher);
    worker.await.expect("worker exits");

    let sent = notifier.sent.lock().expect("lock");
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].heading, "New Evaluation Submitted");
    assert_eq!(
        sent[0].body,
        "BSCS-42 submitted evaluation for: Assessment MID"
    );
    assert_eq!(
        sent[0].target,
        NotificationTarget::ExternalIds(vec!["T-9".into()])
    );
    assert_eq!(
        sent[0].data.as_ref().map(|d| d["type"].clone()),
        Some(serde_json::json!("evaluation_submitted"))
    );
    assert_eq!(sent[1].heading, "New Assessment Available!");
    assert!(matches!(
        &sent[1].target,
        NotificationTarget::Tag { key, value, .. } if key == "role" && value == "student"
    ));
}

#[tokio::test]
async fn worker_shutdown_drains_queue_while_senders_are_alive() {
    let db = open_db().await;
    let notifier = Arc::new(RecordingNotifier::default());
    let (dispatcher, receiver) = NotificationDispatcher::channel(8);
    let (stop, stopped) = tokio::sync::oneshot::channel::<()>();

    // 模拟 HTTP worker 仍持有的投递端
    let held_by_server = dispatcher.clone();
    dispatcher.emit(NotificationEvent::AssessmentCreated {
        title: "Quiz 1".into(),
    });

    let worker = tokio::spawn(run_worker_until(
        receiver,
        db.shared(),
        notifier.clone(),
        async move {
            let _ = stopped.await;
        },
    ));
    stop.send(()).expect("worker is listening");

    tokio::time::timeout(std::time::Duration::from_secs(5), worker)
        .await
        .expect("worker stops without waiting for senders")
        .expect("worker exits cleanly");

    let sent = notifier.sent.lock().expect("lock");
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].body, "Assessment: Quiz 1");

    // 队列关闭后的事件直接丢弃
    held_by_server.emit(NotificationEvent::AssessmentCreated {
        title: "Quiz 2".into(),
    });
    assert_eq!(sent.len(), 1);
}

#[tokio::test]
async fn notification_failures_stay_inside_the_worker() {
    let db = open_db().await;
    let (assessment_id, categories) = seed_assessment(&db.storage, "MID", "T-9").await;
    let notifier = Arc::new(FailingNotifier::default());
    let (dispatcher, receiver) = NotificationDispatcher::channel(8);
    let worker = tokio::spawn(run_worker(receiver, db.shared(), notifier.clone()));

    for (student, ts) in [("42", T1), ("43", T2)] {
        let resp = submit_batch(
            &db.storage,
            &dispatcher,
            &SessionPolicy::default(),
            &submission(assessment_id, student, "9", ts, vec![scored(categories[0].id, 5.0)]),
        )
        .await
        .expect("submission succeeds regardless of notifier");
        assert_eq!(resp.status, SubmitStatus::Committed);
    }

    drop(dispatcher);
    worker.await.expect("worker exits cleanly");
    assert_eq!(*notifier.attempts.lock().expect("lock"), 2);
    assert_eq!(row_count(&db).await, 2);
}

#[tokio::test]
async fn creating_the_same_assessment_twice_recovers_it() {
    let db = open_db().await;
    let new = NewAssessment {
        title: "Lab".into(),
        description: Some("Week 3".into()),
        code: "LAB-3".into(),
        created_by: "T-9".into(),
        categories: vec![NewCategory {
            name: "Output".into(),
            max_marks: 10.0,
            is_comment: false,
        }],
    };

    let first = db
        .storage
        .create_assessment(new.clone())
        .await
        .expect("create");
    let second = db
        .storage
        .create_assessment(new)
        .await
        .expect("recover");

    assert_eq!(first.status, AssessmentCreationStatus::Created);
    assert_eq!(second.status, AssessmentCreationStatus::Recovered);
    assert_eq!(first.assessment.id, second.assessment.id);
    assert_eq!(second.categories, first.categories);

    let listed = db.storage.list_assessments(Some(" T-9 ")).await.expect("list");
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn assessment_sessions_are_grouped_with_details() {
    let db = open_db().await;
    let (assessment_id, categories) = seed_assessment(&db.storage, "MID", "T-9").await;
    let dispatcher = NotificationDispatcher::disabled();
    let policy = SessionPolicy::default();

    for (student, ts) in [("42", T1), ("43", T2)] {
        submit_batch(
            &db.storage,
            &dispatcher,
            &policy,
            &submission(
                assessment_id,
                student,
                "9",
                ts,
                vec![scored(categories[0].id, 6.0), remark(categories[2].id, "Ok")],
            ),
        )
        .await
        .expect("submit");
    }

    let resp = build_assessment_sessions(&db.storage, assessment_id)
        .await
        .expect("sessions");
    assert_eq!(resp.categories.len(), 3);
    assert_eq!(resp.sessions.len(), 2);
    assert_eq!(resp.sessions[0].summary.student_id, "43");
    assert_eq!(resp.sessions[0].details.len(), 2);
    assert_eq!(resp.sessions[0].details[0].value, ReportValue::Marks(6.0));
    assert_eq!(resp.sessions[0].details[1].value, ReportValue::Text("Ok".into()));

    let err = build_assessment_sessions(&db.storage, assessment_id + 100)
        .await
        .expect_err("unknown assessment");
    assert_eq!(err.code(), "E006");
}
