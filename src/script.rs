use std::collections::BTreeMap;
use std::fmt;

use crate::store::{Store, StoreResult};

/// Upper bound of a list trim. `FromLength(n)` is resolved against the live
/// list length when the step runs, giving `len - n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stop {
    Index(i64),
    FromLength(i64),
}

/// A single store command with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Ping,
    Set { key: String, value: String },
    Get { key: String },
    MultiGet { keys: Vec<String> },
    Delete { keys: Vec<String> },
    ListPush { key: String, values: Vec<String> },
    ListRange { key: String, start: i64, stop: i64 },
    ListLength { key: String },
    ListTrim { key: String, start: i64, stop: Stop },
    HashSet { key: String, fields: Vec<(String, String)> },
    HashGet { key: String, field: String },
    HashGetAll { key: String },
    HashExists { key: String, field: String },
    HashLength { key: String },
    HashDelete { key: String, fields: Vec<String> },
}

/// What a command returned, ready to be printed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Status(String),
    Value(Option<String>),
    Count(i64),
    Flag(bool),
    List(Vec<String>),
    Entries(Vec<(String, Option<String>)>),
    Fields(BTreeMap<String, String>),
}

fn nil_or(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("(nil)")
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Status(status) => write!(f, "{}", status),
            Outcome::Value(value) => write!(f, "{}", nil_or(value)),
            Outcome::Count(count) => write!(f, "{}", count),
            Outcome::Flag(flag) => write!(f, "{}", flag),
            Outcome::List(values) => write!(f, "[{}]", values.join(" ")),
            Outcome::Entries(entries) => {
                write!(f, "{} keys", entries.len())?;
                for (key, value) in entries {
                    write!(f, "\n  Key: {}, Value: {}", key, nil_or(value))?;
                }
                Ok(())
            }
            Outcome::Fields(fields) => {
                let rendered: Vec<String> = fields
                    .iter()
                    .map(|(field, value)| format!("{}:{}", field, value))
                    .collect();
                write!(f, "map[{}]", rendered.join(" "))
            }
        }
    }
}

impl Op {
    /// Issues the command against `store`.
    pub async fn apply<S: Store>(&self, store: &mut S) -> StoreResult<Outcome> {
        let outcome = match self {
            Op::Ping => Outcome::Status(store.ping().await?),
            Op::Set { key, value } => Outcome::Status(store.set(key, value).await?),
            Op::Get { key } => Outcome::Value(store.get(key).await?),
            Op::MultiGet { keys } => {
                let values = store.mget(keys).await?;
                Outcome::Entries(keys.iter().cloned().zip(values).collect())
            }
            Op::Delete { keys } => Outcome::Count(store.del(keys).await?),
            Op::ListPush { key, values } => Outcome::Count(store.rpush(key, values).await?),
            Op::ListRange { key, start, stop } => {
                Outcome::List(store.lrange(key, *start, *stop).await?)
            }
            Op::ListLength { key } => Outcome::Count(store.llen(key).await?),
            Op::ListTrim { key, start, stop } => {
                let stop = match stop {
                    Stop::Index(index) => *index,
                    Stop::FromLength(offset) => store.llen(key).await? - offset,
                };
                Outcome::Status(store.ltrim(key, *start, stop).await?)
            }
            Op::HashSet { key, fields } => Outcome::Count(store.hset(key, fields).await?),
            Op::HashGet { key, field } => Outcome::Value(store.hget(key, field).await?),
            Op::HashGetAll { key } => Outcome::Fields(store.hgetall(key).await?),
            Op::HashExists { key, field } => Outcome::Flag(store.hexists(key, field).await?),
            Op::HashLength { key } => Outcome::Count(store.hlen(key).await?),
            Op::HashDelete { key, fields } => Outcome::Count(store.hdel(key, fields).await?),
        };
        Ok(outcome)
    }
}

/// One entry of a script: the command, the caption printed before its
/// outcome, and the action named when it fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub caption: String,
    pub action: String,
    pub op: Op,
}

impl Step {
    pub fn new(caption: impl Into<String>, action: impl Into<String>, op: Op) -> Self {
        Self {
            caption: caption.into(),
            action: action.into(),
            op,
        }
    }
}

fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn fields(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(field, value)| (field.to_string(), value.to_string()))
        .collect()
}

fn full_range(key: &str) -> Op {
    Op::ListRange {
        key: key.to_string(),
        start: 0,
        stop: -1,
    }
}

/// The walkthrough of strings, lists and hashes run by the binary.
pub fn demo() -> Vec<Step> {
    let mut steps = vec![
        Step::new("Ping response", "pinging server", Op::Ping),
        Step::new(
            "Set response",
            "setting test-key",
            Op::Set {
                key: "test-key".to_string(),
                value: "hello world".to_string(),
            },
        ),
        Step::new(
            "Retrieved value",
            "getting test-key",
            Op::Get {
                key: "test-key".to_string(),
            },
        ),
        Step::new(
            "Delete response",
            "deleting test-key",
            Op::Delete {
                keys: owned(&["test-key"]),
            },
        ),
    ];

    let keys = owned(&["key1", "key2", "key3"]);
    for (i, key) in keys.iter().enumerate() {
        steps.push(Step::new(
            format!("Set {}", key),
            format!("setting {}", key),
            Op::Set {
                key: key.clone(),
                value: format!("value{}", i + 1),
            },
        ));
    }
    steps.push(Step::new("Batch get", "batch getting keys", Op::MultiGet { keys }));

    let list = "mylist";
    steps.extend([
        Step::new(
            "RPush result (list length)",
            "appending to list",
            Op::ListPush {
                key: list.to_string(),
                values: owned(&["value1"]),
            },
        ),
        Step::new(
            "RPush multiple result (list length)",
            "appending multiple values",
            Op::ListPush {
                key: list.to_string(),
                values: owned(&["value2", "value3"]),
            },
        ),
        Step::new("List values", "getting list values", full_range(list)),
        Step::new(
            "List length",
            "getting list length",
            Op::ListLength {
                key: list.to_string(),
            },
        ),
        Step::new(
            "List deleted",
            "deleting list",
            Op::Delete {
                keys: owned(&[list]),
            },
        ),
    ]);

    let trim = "trimlist";
    let seed: Vec<String> = (1..=10).map(|i| format!("v{}", i)).collect();
    steps.extend([
        Step::new(
            "Added values",
            "adding values",
            Op::ListPush {
                key: trim.to_string(),
                values: seed,
            },
        ),
        Step::new("Initial list", "getting initial list", full_range(trim)),
    ]);

    let trims = [
        (2, Stop::Index(-1), "trimming first elements", "After removing first 2"),
        (0, Stop::FromLength(3), "trimming last elements", "After removing last 2"),
        (1, Stop::Index(3), "trimming to middle section", "After keeping only middle section"),
        (-2, Stop::Index(-1), "trimming to last elements", "After keeping only last 2"),
    ];
    for (n, (start, stop, action, after)) in trims.into_iter().enumerate() {
        steps.push(Step::new(
            format!("Trim result {}", n + 1),
            action,
            Op::ListTrim {
                key: trim.to_string(),
                start,
                stop,
            },
        ));
        steps.push(Step::new(
            after,
            format!("getting list after trim {}", n + 1),
            full_range(trim),
        ));
    }

    let hash = "user:123";
    steps.extend([
        Step::new(
            "Single field set result",
            "setting single field",
            Op::HashSet {
                key: hash.to_string(),
                fields: fields(&[("name", "John")]),
            },
        ),
        Step::new(
            "Multiple fields set result",
            "setting multiple fields",
            Op::HashSet {
                key: hash.to_string(),
                fields: fields(&[
                    ("age", "30"),
                    ("city", "New York"),
                    ("email", "john@example.com"),
                ]),
            },
        ),
        Step::new(
            "All hash fields",
            "getting all fields",
            Op::HashGetAll {
                key: hash.to_string(),
            },
        ),
        Step::new(
            "Name",
            "getting name",
            Op::HashGet {
                key: hash.to_string(),
                field: "name".to_string(),
            },
        ),
        Step::new(
            "Age field exists",
            "checking field existence",
            Op::HashExists {
                key: hash.to_string(),
                field: "age".to_string(),
            },
        ),
        Step::new(
            "Number of fields",
            "getting hash length",
            Op::HashLength {
                key: hash.to_string(),
            },
        ),
        Step::new(
            "Delete result",
            "deleting field",
            Op::HashDelete {
                key: hash.to_string(),
                fields: owned(&["email"]),
            },
        ),
        Step::new(
            "Hash fields after deletion",
            "getting final fields",
            Op::HashGetAll {
                key: hash.to_string(),
            },
        ),
    ]);

    steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn outcomes_render_for_console() {
        assert_eq!(Outcome::Value(None).to_string(), "(nil)");
        assert_eq!(
            Outcome::List(owned(&["v1", "v2"])).to_string(),
            "[v1 v2]"
        );

        let mut map = BTreeMap::new();
        map.insert("name".to_string(), "John".to_string());
        map.insert("age".to_string(), "30".to_string());
        assert_eq!(Outcome::Fields(map).to_string(), "map[age:30 name:John]");

        let entries = Outcome::Entries(vec![
            ("a".to_string(), Some("1".to_string())),
            ("b".to_string(), None),
        ]);
        assert_eq!(
            entries.to_string(),
            "2 keys\n  Key: a, Value: 1\n  Key: b, Value: (nil)"
        );
    }

    #[test]
    fn demo_covers_every_command_in_order() {
        let steps = demo();
        let ops: Vec<&str> = steps
            .iter()
            .map(|step| match step.op {
                Op::Ping => "ping",
                Op::Set { .. } => "set",
                Op::Get { .. } => "get",
                Op::MultiGet { .. } => "mget",
                Op::Delete { .. } => "del",
                Op::ListPush { .. } => "rpush",
                Op::ListRange { .. } => "lrange",
                Op::ListLength { .. } => "llen",
                Op::ListTrim { .. } => "ltrim",
                Op::HashSet { .. } => "hset",
                Op::HashGet { .. } => "hget",
                Op::HashGetAll { .. } => "hgetall",
                Op::HashExists { .. } => "hexists",
                Op::HashLength { .. } => "hlen",
                Op::HashDelete { .. } => "hdel",
            })
            .collect();

        assert_eq!(
            ops,
            vec![
                "ping", "set", "get", "del", "set", "set", "set", "mget", "rpush", "rpush",
                "lrange", "llen", "del", "rpush", "lrange", "ltrim", "lrange", "ltrim", "lrange",
                "ltrim", "lrange", "ltrim", "lrange", "hset", "hset", "hgetall", "hget",
                "hexists", "hlen", "hdel", "hgetall",
            ]
        );
    }

    #[tokio::test]
    async fn trim_from_length_uses_live_length() {
        let mut store = MemoryStore::new();
        store.rpush("l", &owned(&["a", "b", "c", "d", "e"])).await.unwrap();

        let op = Op::ListTrim {
            key: "l".to_string(),
            start: 0,
            stop: Stop::FromLength(3),
        };
        assert_eq!(
            op.apply(&mut store).await.unwrap(),
            Outcome::Status("OK".to_string())
        );
        assert_eq!(
            store.lrange("l", 0, -1).await.unwrap(),
            owned(&["a", "b", "c"])
        );
    }

    #[tokio::test]
    async fn multi_get_pairs_keys_with_values() {
        let mut store = MemoryStore::new();
        store.set("b", "2").await.unwrap();

        let op = Op::MultiGet {
            keys: owned(&["a", "b"]),
        };
        assert_eq!(
            op.apply(&mut store).await.unwrap(),
            Outcome::Entries(vec![
                ("a".to_string(), None),
                ("b".to_string(), Some("2".to_string())),
            ])
        );
    }
}
