use anyhow::Result;
use build_notifier::notification::{
    MessageKind, NotificationChannel, NotificationDispatcher, NotificationMessage,
};
use build_notifier::{
    BuildHistory, BuildNotifier, BuildOutcome, BuildRecord, CauseInfo, ChangeSetEntry, CommitInfoChoice,
    InMemoryHistory, NotifyConfig, SendResult, TestSummary,
};
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};

/// 记录所有收到消息的渠道
#[derive(Default)]
struct RecordingChannel {
    sent: Mutex<Vec<(MessageKind, String)>>,
}

impl RecordingChannel {
    fn messages(&self) -> Vec<(MessageKind, String)> {
        self.sent.lock().unwrap().clone()
    }
}

impl NotificationChannel for RecordingChannel {
    fn name(&self) -> &str {
        "recording"
    }

    fn should_send(&self, _message: &NotificationMessage) -> bool {
        true
    }

    fn send(&self, message: &NotificationMessage) -> Result<SendResult> {
        self.sent
            .lock()
            .unwrap()
            .push((message.kind, message.content.clone()));
        Ok(SendResult::Sent)
    }
}

fn at(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap()
}

fn notifier(config: NotifyConfig) -> (BuildNotifier, Arc<RecordingChannel>) {
    let channel = Arc::new(RecordingChannel::default());
    let mut dispatcher = NotificationDispatcher::new();
    dispatcher.register_channel(channel.clone());
    (BuildNotifier::new(config, dispatcher), channel)
}

fn base_config() -> NotifyConfig {
    NotifyConfig {
        build_server_url: "https://ci.example.com/".into(),
        ..Default::default()
    }
}

#[test]
fn test_first_failure_end_to_end() {
    let history = InMemoryHistory::new()
        .with_build(BuildRecord::new("api", 1, BuildOutcome::Success, at(0), 1_000))
        .with_build(
            BuildRecord::new("api", 2, BuildOutcome::Failure, at(60_000), 45_000)
                .with_test_summary(TestSummary::new(20, 3, 2)),
        );
    let build = history.build("api", 2).unwrap();

    let config = NotifyConfig {
        include_test_summary: true,
        ..base_config()
    };
    let (notifier, channel) = notifier(config);
    let deliveries = notifier.completed(build, &history).unwrap();

    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].results, vec![("recording".to_string(), SendResult::Sent)]);
    assert_eq!(
        channel.messages(),
        vec![(
            MessageKind::Status,
            "api - #2 Failure after 45 sec (<https://ci.example.com/job/api/2/|Open>)\
             \nTest Status:\n\tPassed: 15, Failed: 3, Skipped: 2"
                .to_string()
        )]
    );
}

#[test]
fn test_back_to_normal_end_to_end() {
    let history = InMemoryHistory::new()
        .with_build(BuildRecord::new("api", 1, BuildOutcome::Success, at(0), 400))
        .with_build(BuildRecord::new("api", 2, BuildOutcome::Failure, at(600), 100))
        .with_build(BuildRecord::new("api", 3, BuildOutcome::Aborted, at(800), 50))
        .with_build(BuildRecord::new("api", 4, BuildOutcome::Success, at(1_000), 500));
    let build = history.last_build("api").unwrap();

    let (notifier, channel) = notifier(base_config());
    notifier.completed(build, &history).unwrap();

    // 耗时从上一次成功构建结束算起：1500 - 400
    assert_eq!(
        channel.messages(),
        vec![(
            MessageKind::Status,
            "api - #4 Back to normal after 1.1 sec (<https://ci.example.com/job/api/4/|Open>)".to_string()
        )]
    );
}

#[test]
fn test_completion_sends_commit_list() {
    let history = InMemoryHistory::new().with_build(
        BuildRecord::new("api", 1, BuildOutcome::Failure, at(0), 2_000).with_change_set(vec![
            ChangeSetEntry::new("erin", "break <everything>").with_files(["a.rs"]),
            ChangeSetEntry::new("frank", "oops").with_files(["b.rs"]),
        ]),
    );
    let build = history.last_build("api").unwrap();

    let config = NotifyConfig {
        commit_info_choice: CommitInfoChoice::Both,
        ..base_config()
    };
    let (notifier, channel) = notifier(config);
    let deliveries = notifier.completed(build, &history).unwrap();

    assert_eq!(deliveries.len(), 2);
    let messages = channel.messages();
    assert_eq!(messages[1].0, MessageKind::CommitList);
    assert_eq!(
        messages[1].1,
        "api - #1 Changes:\n- break &lt;everything&gt; [erin]\n- oops [frank]"
    );
}

#[test]
fn test_started_by_scm_uses_change_summary() {
    let history = InMemoryHistory::new().with_build(
        BuildRecord::new("web", 8, BuildOutcome::Building, at(0), 0)
            .with_cause(CauseInfo::ScmTrigger)
            .with_change_set(vec![
                ChangeSetEntry::new("gina", "one").with_files(["x", "y"]),
                ChangeSetEntry::new("gina", "two").with_files(["y"]),
            ]),
    );
    let build = history.last_build("web").unwrap();

    let (notifier, channel) = notifier(base_config());
    notifier.started(build, &history).unwrap();

    assert_eq!(
        channel.messages(),
        vec![(
            MessageKind::Start,
            "web - #8 Started by changes from gina (2 file(s) changed) (<https://ci.example.com/job/web/8/|Open>)"
                .to_string()
        )]
    );
}

#[test]
fn test_started_without_changes_falls_back_to_status() {
    let history = InMemoryHistory::new().with_build(
        BuildRecord::new("web", 9, BuildOutcome::Building, at(0), 0)
            .with_cause(CauseInfo::ScmTrigger)
            .with_env("GIT_BRANCH", "main"),
    );
    let build = history.last_build("web").unwrap();

    let config = NotifyConfig {
        include_custom_message: true,
        custom_message: "on $GIT_BRANCH".into(),
        ..base_config()
    };
    let (notifier, channel) = notifier(config);
    notifier.started(build, &history).unwrap();

    assert_eq!(
        channel.messages(),
        vec![(
            MessageKind::Start,
            "web - #9 Starting... after 0 ms (<https://ci.example.com/job/web/9/|Open>)\non main".to_string()
        )]
    );
}

#[test]
fn test_started_by_upstream_uses_cause_description() {
    let history = InMemoryHistory::new().with_build(
        BuildRecord::new("deploy", 3, BuildOutcome::Building, at(0), 0)
            .with_cause(CauseInfo::Upstream { project: "api".into(), build: 2 }),
    );
    let build = history.last_build("deploy").unwrap();

    let (notifier, channel) = notifier(base_config());
    notifier.started(build, &history).unwrap();

    assert_eq!(
        channel.messages()[0].1,
        "deploy - #3 Started by upstream project \"api\" build number 2 (<https://ci.example.com/job/deploy/3/|Open>)"
    );
}

#[test]
fn test_downstream_commit_list_from_upstream() {
    let history = InMemoryHistory::new()
        .with_build(
            BuildRecord::new("P", 5, BuildOutcome::Success, at(0), 10)
                .with_change_set(vec![ChangeSetEntry::new("hank", "feature")]),
        )
        .with_build(
            BuildRecord::new("deploy", 1, BuildOutcome::Failure, at(100), 10)
                .with_cause(CauseInfo::Upstream { project: "P".into(), build: 5 }),
        );
    let build = history.last_build("deploy").unwrap();

    let config = NotifyConfig {
        commit_info_choice: CommitInfoChoice::Title,
        ..base_config()
    };
    let (notifier, channel) = notifier(config);
    notifier.completed(build, &history).unwrap();

    assert_eq!(channel.messages()[1].1, "P - #5 Changes:\n- feature");
}

#[test]
fn test_repeated_failure_stays_silent_by_default() {
    let history = InMemoryHistory::new()
        .with_build(BuildRecord::new("api", 1, BuildOutcome::Failure, at(0), 10))
        .with_build(BuildRecord::new("api", 2, BuildOutcome::Failure, at(100), 10));
    let build = history.last_build("api").unwrap();

    let (notifier, channel) = notifier(base_config());
    assert!(notifier.completed(build, &history).unwrap().is_empty());
    assert!(channel.messages().is_empty());

    let config = NotifyConfig {
        notify_repeated_failure: true,
        ..base_config()
    };
    let (notifier, channel) = self::notifier(config);
    notifier.completed(build, &history).unwrap();
    assert!(channel.messages()[0].1.contains("Still Failing"));
}
