use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::time_format::{format_wire_time, parse_wire_time};
use crate::domain::{Task, TaskError, TaskId, TaskName};

/// 送信用の wire 表現（Task を借用する）
///
/// 空・ゼロ・未設定のフィールドは `null` や空文字にせず、キーごと省略する。
#[derive(Serialize)]
struct OutgoingMessage<'a> {
    task: &'a str,
    id: &'a str,
    #[serde(skip_serializing_if = "is_empty")]
    args: &'a [String],
    #[serde(skip_serializing_if = "Map::is_empty")]
    kwargs: &'a Map<String, Value>,
    #[serde(skip_serializing_if = "is_zero")]
    retries: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    eta: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires: Option<String>,
}

/// 受信用の wire 表現
///
/// 未知のキー（`utc`, `callbacks` など）は無視する。
#[derive(Deserialize)]
struct IncomingMessage {
    task: String,
    id: String,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    kwargs: Map<String, Value>,
    #[serde(default)]
    retries: u32,
    #[serde(default)]
    eta: Option<String>,
    #[serde(default)]
    expires: Option<String>,
}

fn is_empty(args: &&[String]) -> bool {
    args.is_empty()
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

/// Task → JSON bytes
///
/// `eta` / `expires` の年が 0..=9999 に収まらなければ `TimeFormat`（何も出力しない）
pub fn encode(task: &Task) -> Result<Vec<u8>, TaskError> {
    let out = OutgoingMessage {
        task: task.name().as_str(),
        id: task.id().as_str(),
        args: task.args(),
        kwargs: task.kwargs(),
        retries: task.retries(),
        eta: task
            .eta()
            .map(|at| format_wire_time("eta", &at))
            .transpose()?,
        expires: task
            .expires()
            .map(|at| format_wire_time("expires", &at))
            .transpose()?,
    };

    serde_json::to_vec(&out).map_err(TaskError::Encoding)
}

/// JSON bytes → Task
///
/// - JSON として不正、または必須キー欠落・型違い → `MalformedMessage`
/// - `eta` / `expires` は省略可。あるのに正規形式でなければ → `TimeFormat`
pub fn decode(bytes: &[u8]) -> Result<Task, TaskError> {
    let msg: IncomingMessage =
        serde_json::from_slice(bytes).map_err(TaskError::MalformedMessage)?;

    let eta = msg
        .eta
        .as_deref()
        .map(|v| parse_wire_time("eta", v))
        .transpose()?;
    let expires = msg
        .expires
        .as_deref()
        .map(|v| parse_wire_time("expires", v))
        .transpose()?;

    Ok(Task::from_parts(
        TaskName::new(msg.task),
        TaskId::new(msg.id),
        msg.args,
        msg.kwargs,
        msg.retries,
        eta,
        expires,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::SequentialIdGenerator;
    use chrono::{DateTime, NaiveDate, SubsecRound, TimeZone, Utc};
    use rstest::rstest;
    use serde_json::json;

    fn at(micros: u32) -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(2023, 5, 1)
            .unwrap()
            .and_hms_micro_opt(12, 0, 0, micros)
            .unwrap()
            .and_utc()
    }

    fn plain_task() -> Task {
        Task::new_with(
            &SequentialIdGenerator::new("t"),
            "tasks.add",
            vec![],
            Map::new(),
        )
        .unwrap()
    }

    fn as_json(bytes: &[u8]) -> Map<String, Value> {
        match serde_json::from_slice(bytes).unwrap() {
            Value::Object(map) => map,
            other => panic!("expected an object, got {other}"),
        }
    }

    #[test]
    fn full_task_round_trips() {
        let now = Utc::now().trunc_subsecs(6);
        let task = Task::new("tasks.send_email", vec!["a@example.com".into()], Map::new())
            .unwrap()
            .with_arg("hello")
            .with_kwarg("priority", 5)
            .unwrap()
            .with_kwarg("tags", json!(["x", {"nested": true}]))
            .unwrap()
            .with_retries(3)
            .with_eta(now)
            .with_expires(now + chrono::Duration::hours(1));

        let decoded = decode(&encode(&task).unwrap()).unwrap();
        assert_eq!(decoded, task);
    }

    #[test]
    fn minimal_task_round_trips_with_times_unset() {
        let task = plain_task();
        let decoded = decode(&encode(&task).unwrap()).unwrap();

        assert_eq!(decoded, task);
        assert_eq!(decoded.eta(), None);
        assert_eq!(decoded.expires(), None);
    }

    #[test]
    fn unset_optional_fields_are_omitted() {
        let obj = as_json(&encode(&plain_task()).unwrap());

        let mut keys: Vec<_> = obj.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, ["id", "task"]);
        assert_eq!(obj["task"], "tasks.add");
        assert_eq!(obj["id"], "t-1");
    }

    #[test]
    fn populated_fields_are_emitted() {
        let task = plain_task()
            .with_arg("1")
            .with_kwarg("k", "v")
            .unwrap()
            .with_retries(2)
            .with_eta(at(123_456))
            .with_expires(at(654_321));

        let obj = as_json(&encode(&task).unwrap());
        assert_eq!(obj["args"], json!(["1"]));
        assert_eq!(obj["kwargs"], json!({"k": "v"}));
        assert_eq!(obj["retries"], 2);
        assert_eq!(obj["eta"], "2023-05-01T12:00:00.123456");
        assert_eq!(obj["expires"], "2023-05-01T12:00:00.654321");
        assert_eq!(obj.len(), 7);
    }

    #[test]
    fn eta_is_rendered_with_microsecond_precision() {
        let eta: DateTime<Utc> = "2023-05-01T12:00:00.123456Z".parse().unwrap();
        let obj = as_json(&encode(&plain_task().with_eta(eta)).unwrap());
        assert_eq!(obj["eta"], "2023-05-01T12:00:00.123456");
    }

    #[test]
    fn eta_beyond_year_9999_is_not_encoded() {
        let far = Utc.with_ymd_and_hms(10000, 1, 1, 0, 0, 0).unwrap();

        let err = encode(&plain_task().with_eta(far)).unwrap_err();
        assert!(
            matches!(err, TaskError::TimeFormat { field: "eta", .. }),
            "got {err:?}"
        );

        let err = encode(&plain_task().with_expires(far)).unwrap_err();
        assert!(
            matches!(err, TaskError::TimeFormat { field: "expires", .. }),
            "got {err:?}"
        );
    }

    #[test]
    fn decodes_a_celery_v1_message_with_extra_keys() {
        let body = br#"{
            "task": "tasks.add",
            "id": "4cc7438e-afd4-4f8f-a2f3-f46567e7ca77",
            "args": ["4", "4"],
            "kwargs": {},
            "retries": 0,
            "eta": null,
            "expires": null,
            "utc": true,
            "callbacks": null,
            "errbacks": null,
            "taskset": null,
            "chord": null
        }"#;

        let task = decode(body).unwrap();
        assert_eq!(task.name().as_str(), "tasks.add");
        assert_eq!(task.id().as_str(), "4cc7438e-afd4-4f8f-a2f3-f46567e7ca77");
        assert_eq!(task.args(), ["4", "4"]);
        assert!(task.kwargs().is_empty());
        assert_eq!(task.eta(), None);
    }

    #[rstest]
    #[case::truncated(b"{not json".as_slice())]
    #[case::empty(b"".as_slice())]
    #[case::not_an_object(b"[1, 2, 3]".as_slice())]
    #[case::missing_id(br#"{"task": "tasks.add"}"#.as_slice())]
    #[case::args_not_strings(br#"{"task": "t", "id": "1", "args": [1, 2]}"#.as_slice())]
    #[case::negative_retries(br#"{"task": "t", "id": "1", "retries": -1}"#.as_slice())]
    fn malformed_input_is_rejected(#[case] body: &[u8]) {
        let err = decode(body).unwrap_err();
        assert!(matches!(err, TaskError::MalformedMessage(_)), "got {err:?}");
    }

    #[rstest]
    #[case::eta("eta")]
    #[case::expires("expires")]
    fn bad_time_field_is_a_time_format_error(#[case] key: &str) {
        let mut body = Map::new();
        body.insert("task".into(), json!("tasks.add"));
        body.insert("id".into(), json!("1"));
        body.insert(key.into(), json!("2023-05-01T12:00:00Z"));

        let err = decode(&serde_json::to_vec(&body).unwrap()).unwrap_err();
        match err {
            TaskError::TimeFormat { field, .. } => assert_eq!(field, key),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
