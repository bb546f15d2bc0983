//! End-to-end conversion of a Nomad-style job through its derived schema

#![allow(clippy::disallowed_methods)] // Allow unwrap() in tests for clarity

use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tfconv::{
    AttributeType, ConversionError, Converter, Dynamic, DynamicValue, Fields, GatewayBindAddress,
    JobType, NestingMode, ObjectBuilder, Record, VolumeRequest,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .try_init();
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Job {
    id: String,
    job_type: JobType,
    datacenters: Vec<String>,
    priority: Option<i8>,
    meta: HashMap<String, String>,
    groups: Vec<TaskGroup>,
    update: Option<UpdateStrategy>,
    revision: u64,
}

impl Record for Job {
    fn fields() -> Fields<Self> {
        Fields::<Self>::new()
            .field("ID", "id,attr", |j| &j.id, |j| &mut j.id)
            .field("Type", "type,attr", |j| &j.job_type, |j| &mut j.job_type)
            .field(
                "Datacenters",
                "datacenters,attr",
                |j| &j.datacenters,
                |j| &mut j.datacenters,
            )
            .field(
                "Priority",
                "priority,attr",
                |j| &j.priority,
                |j| &mut j.priority,
            )
            .field("Meta", "meta,attr", |j| &j.meta, |j| &mut j.meta)
            .block(
                "TaskGroups",
                "group,block",
                |j| &j.groups,
                |j| &mut j.groups,
            )
            .block("Update", "update,block", |j| &j.update, |j| &mut j.update)
            .untagged("Revision", |j| &j.revision, |j| &mut j.revision)
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct TaskGroup {
    name: Option<String>,
    count: Option<i64>,
    volumes: HashMap<String, VolumeRequest>,
    tasks: Vec<Task>,
    network: Option<Network>,
}

impl Record for TaskGroup {
    fn fields() -> Fields<Self> {
        Fields::<Self>::new()
            .field("Name", "name,label", |g| &g.name, |g| &mut g.name)
            .field("Count", "count,attr", |g| &g.count, |g| &mut g.count)
            .field(
                "Volumes",
                "volume,block",
                |g| &g.volumes,
                |g| &mut g.volumes,
            )
            .block("Tasks", "task,block", |g| &g.tasks, |g| &mut g.tasks)
            .block(
                "Network",
                "network,block",
                |g| &g.network,
                |g| &mut g.network,
            )
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Task {
    name: String,
    driver: String,
    user: Option<String>,
    args: Option<Vec<String>>,
    config: HashMap<String, serde_json::Value>,
    env: HashMap<String, String>,
    kill_timeout: Option<Duration>,
    resources: Option<Resources>,
}

impl Record for Task {
    fn fields() -> Fields<Self> {
        Fields::<Self>::new()
            .field("Name", "name,attr", |t| &t.name, |t| &mut t.name)
            .field("Driver", "driver,attr", |t| &t.driver, |t| &mut t.driver)
            .field("User", "user,attr", |t| &t.user, |t| &mut t.user)
            .field("Args", "args,attr", |t| &t.args, |t| &mut t.args)
            .field("Config", "config,attr", |t| &t.config, |t| &mut t.config)
            .field("Env", "env,attr", |t| &t.env, |t| &mut t.env)
            .field(
                "KillTimeout",
                "kill_timeout,attr",
                |t| &t.kill_timeout,
                |t| &mut t.kill_timeout,
            )
            .block(
                "Resources",
                "resources,block",
                |t| &t.resources,
                |t| &mut t.resources,
            )
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Resources {
    cpu: Option<i32>,
    memory_mb: Option<u32>,
    cores: u16,
    devices: HashMap<String, Vec<String>>,
}

impl Record for Resources {
    fn fields() -> Fields<Self> {
        Fields::<Self>::new()
            .field("CPU", "cpu,attr", |r| &r.cpu, |r| &mut r.cpu)
            .field(
                "MemoryMB",
                "memory,attr",
                |r| &r.memory_mb,
                |r| &mut r.memory_mb,
            )
            .field("Cores", "cores,attr", |r| &r.cores, |r| &mut r.cores)
            .field(
                "Devices",
                "devices,attr",
                |r| &r.devices,
                |r| &mut r.devices,
            )
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Network {
    mode: String,
    mbits: Option<u16>,
    gateways: HashMap<String, GatewayBindAddress>,
}

impl Record for Network {
    fn fields() -> Fields<Self> {
        Fields::<Self>::new()
            .field("Mode", "mode,attr", |n| &n.mode, |n| &mut n.mode)
            .field("MBits", "mbits,attr", |n| &n.mbits, |n| &mut n.mbits)
            .field(
                "Gateways",
                "gateway,attr",
                |n| &n.gateways,
                |n| &mut n.gateways,
            )
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct UpdateStrategy {
    max_parallel: u8,
    stagger: Duration,
    auto_revert: Option<bool>,
    canary: bool,
    progress_deadline: Option<u64>,
}

impl Record for UpdateStrategy {
    fn fields() -> Fields<Self> {
        Fields::<Self>::new()
            .field(
                "MaxParallel",
                "max_parallel,attr",
                |u| &u.max_parallel,
                |u| &mut u.max_parallel,
            )
            .field(
                "Stagger",
                "stagger,attr",
                |u| &u.stagger,
                |u| &mut u.stagger,
            )
            .field(
                "AutoRevert",
                "auto_revert,attr",
                |u| &u.auto_revert,
                |u| &mut u.auto_revert,
            )
            .field("Canary", "canary,attr", |u| &u.canary, |u| &mut u.canary)
            .field(
                "ProgressDeadline",
                "progress_deadline,attr",
                |u| &u.progress_deadline,
                |u| &mut u.progress_deadline,
            )
    }
}

fn task(name: &str) -> Task {
    Task {
        name: name.to_string(),
        driver: "docker".to_string(),
        user: Some("nobody".to_string()),
        args: Some(vec!["--port".to_string(), "8080".to_string()]),
        config: HashMap::from([
            ("image".to_string(), json!("nginx:1.27")),
            ("ports".to_string(), json!(["http"])),
        ]),
        env: HashMap::from([("LOG_LEVEL".to_string(), "debug".to_string())]),
        kill_timeout: Some(Duration::from_secs(90)),
        resources: Some(Resources {
            cpu: Some(500),
            memory_mb: Some(256),
            cores: 2,
            devices: HashMap::from([("nvidia/gpu".to_string(), vec!["uuid-1".to_string()])]),
        }),
    }
}

fn group(name: &str, count: i64) -> TaskGroup {
    TaskGroup {
        name: Some(name.to_string()),
        count: Some(count),
        volumes: HashMap::from([(
            "data".to_string(),
            VolumeRequest {
                name: "data".to_string(),
                type_: "host".to_string(),
                source: "shared-data".to_string(),
                read_only: true,
                ..Default::default()
            },
        )]),
        tasks: vec![task("server"), task("sidecar")],
        network: Some(Network {
            mode: "bridge".to_string(),
            mbits: Some(10),
            gateways: HashMap::from([(
                "ingress".to_string(),
                GatewayBindAddress {
                    name: "ingress".to_string(),
                    address: "0.0.0.0".to_string(),
                    port: 8443,
                },
            )]),
        }),
    }
}

// Groups listed in label order, which is the order they decode in.
fn sample_job() -> Job {
    Job {
        id: "example".to_string(),
        job_type: JobType::Service,
        datacenters: vec!["dc1".to_string(), "dc2".to_string()],
        priority: Some(50),
        meta: HashMap::from([("team".to_string(), "platform".to_string())]),
        groups: vec![group("cache", 1), group("web", 3)],
        update: Some(UpdateStrategy {
            max_parallel: 2,
            stagger: Duration::from_millis(1500),
            auto_revert: Some(true),
            canary: false,
            progress_deadline: Some(600),
        }),
        revision: 0,
    }
}

#[test]
fn schema_reflects_record_hierarchy() {
    init_tracing();
    let converter = Converter::<Job>::build().unwrap();
    let block = &converter.schema().block;

    let names: Vec<_> = block.attributes.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, ["datacenters", "id", "meta", "priority", "type"]);

    let group = block.block_type("group").unwrap();
    assert_eq!(group.nesting, NestingMode::Map);
    assert!(group.block.attribute("name").is_none());
    assert_eq!(
        group.block.attribute("volume").unwrap().r#type.to_string(),
        "map(object({access_mode=string, attachment_mode=string, per_alloc=bool, read_only=bool, source=string, type=string}))"
    );

    let task = group.block.block_type("task").unwrap();
    assert_eq!(task.nesting, NestingMode::List);
    assert_eq!(task.block.attribute("config").unwrap().r#type, AttributeType::String);
    assert_eq!(
        task.block.block_type("resources").unwrap().nesting,
        NestingMode::Single
    );
    assert_eq!(block.block_type("update").unwrap().nesting, NestingMode::Single);
}

#[test]
fn schema_json_uses_terraform_layout() {
    let converter = Converter::<Job>::build().unwrap();
    let json = converter.schema().to_json();

    assert_eq!(json["version"], 0);
    assert_eq!(
        json["block"]["attributes"]["datacenters"],
        json!({"type": ["list", "string"], "optional": true})
    );
    assert_eq!(json["block"]["block_types"]["group"]["nesting_mode"], "map");
    assert_eq!(
        json["block"]["block_types"]["group"]["block"]["block_types"]["network"]["block"]
            ["attributes"]["gateway"]["type"],
        json!(["map", ["object", {"address": "string", "port": "number"}]])
    );
}

#[test]
fn job_round_trips_through_msgpack() {
    init_tracing();
    let converter = Converter::<Job>::build().unwrap();
    let job = sample_job();

    let wire = converter.to_wire(&job).unwrap();
    let bytes = wire.encode_msgpack().unwrap();
    let received = DynamicValue::decode_msgpack(converter.object_type().clone(), &bytes).unwrap();
    let decoded = converter.decode(&received).unwrap();

    assert_eq!(decoded, job);
}

#[test]
fn strings_spelled_like_unknown_survive_encoding() {
    let converter = Converter::<Job>::build().unwrap();
    let job = Job {
        id: "__unknown__".to_string(),
        ..sample_job()
    };
    let wire = converter.to_wire(&job).unwrap();
    let ty = converter.object_type().clone();

    let bytes = wire.encode_msgpack().unwrap();
    let from_msgpack = DynamicValue::decode_msgpack(ty.clone(), &bytes).unwrap();
    assert_eq!(converter.decode(&from_msgpack).unwrap(), job);

    let bytes = wire.encode_json().unwrap();
    let from_json = DynamicValue::decode_json(ty, &bytes).unwrap();
    assert_eq!(converter.decode(&from_json).unwrap(), job);
}

#[test]
fn groups_are_keyed_by_label() {
    let converter = Converter::<Job>::build().unwrap();

    let wire = converter.to_wire(&sample_job()).unwrap();
    let groups = wire.value.get("group").unwrap().as_map().unwrap();

    assert_eq!(groups.keys().collect::<Vec<_>>(), ["cache", "web"]);
    assert_eq!(groups["web"].get("count"), Some(&Dynamic::from(3_i64)));
    assert!(groups["web"].get("name").is_none());
}

#[test]
fn decoded_groups_carry_their_map_key() {
    let converter = Converter::<Job>::build().unwrap();
    let group_converter = Converter::<TaskGroup>::build().unwrap();

    let mut web = group_converter.to_wire(&group("ignored", 2)).unwrap().value;
    let mut cache = web.clone();
    if let Dynamic::Map(map) = &mut cache {
        map.insert("count".to_string(), Dynamic::from(1_i64));
    }
    if let Dynamic::Map(map) = &mut web {
        map.insert("count".to_string(), Dynamic::from(4_i64));
    }

    let mut wire = converter.to_wire(&Job::default()).unwrap();
    if let Dynamic::Map(map) = &mut wire.value {
        map.insert(
            "group".to_string(),
            Dynamic::object([("web", web), ("cache", cache)]),
        );
    }

    let job = converter.decode(&wire).unwrap();
    let labels: Vec<_> = job.groups.iter().map(|g| g.name.as_deref().unwrap()).collect();
    assert_eq!(labels, ["cache", "web"]);
    assert_eq!(job.groups[1].count, Some(4));
}

#[test]
fn tags_and_unset_port_example() {
    #[derive(Debug, Default, PartialEq)]
    struct Service {
        tags: Vec<String>,
        port: Option<i32>,
    }

    impl Record for Service {
        fn fields() -> Fields<Self> {
            Fields::<Self>::new()
                .field("Tags", "tags,attr", |s| &s.tags, |s| &mut s.tags)
                .field("Port", "port,attr", |s| &s.port, |s| &mut s.port)
        }
    }

    let converter = Converter::<Service>::build().unwrap();
    let service = Service {
        tags: vec!["a".to_string(), "b".to_string()],
        port: None,
    };

    let wire = converter.to_wire(&service).unwrap();
    assert_eq!(wire.encode_json().unwrap(), br#"{"port":null,"tags":["a","b"]}"#);

    let decoded = converter.decode(&wire).unwrap();
    assert_eq!(decoded, service);
}

#[test]
fn absent_update_block_is_written_as_nulls() {
    let converter = Converter::<Job>::build().unwrap();
    let job = Job {
        update: None,
        ..sample_job()
    };

    let wire = converter.to_wire(&job).unwrap();

    assert_eq!(
        wire.value.get("update"),
        Some(
            &ObjectBuilder::new()
                .null("auto_revert")
                .null("canary")
                .null("max_parallel")
                .null("progress_deadline")
                .null("stagger")
                .build()
        )
    );
}

#[test]
fn absent_update_block_reads_back_as_defaults() {
    let converter = Converter::<Job>::build().unwrap();
    let job = Job {
        update: None,
        ..sample_job()
    };

    let decoded = converter.decode(&converter.to_wire(&job).unwrap()).unwrap();

    assert_eq!(decoded.update, Some(UpdateStrategy::default()));
}

#[test]
fn null_blocks_and_attributes_leave_defaults() {
    let converter = Converter::<Job>::build().unwrap();
    let mut wire = converter.to_wire(&sample_job()).unwrap();
    if let Dynamic::Map(map) = &mut wire.value {
        for value in map.values_mut() {
            *value = Dynamic::Null;
        }
    }

    let job = converter.decode(&wire).unwrap();

    assert_eq!(job, Job::default());
    assert!(job.update.is_none());
}

#[test]
fn group_without_label_cannot_be_written() {
    let converter = Converter::<Job>::build().unwrap();
    let mut job = sample_job();
    job.groups[0].name = None;

    let err = converter.to_wire(&job).unwrap_err();

    assert_eq!(err.path(), Some("group"));
    assert!(matches!(err.root_cause(), ConversionError::MissingLabel));
}

#[test]
fn nested_errors_report_the_wire_path() {
    let converter = Converter::<Job>::build().unwrap();
    let mut wire = converter.to_wire(&sample_job()).unwrap();
    if let Dynamic::Map(job) = &mut wire.value {
        if let Some(Dynamic::Map(groups)) = job.get_mut("group") {
            if let Some(Dynamic::Map(web)) = groups.get_mut("web") {
                web.insert("count".to_string(), Dynamic::from("three"));
            }
        }
    }

    let err = converter.decode(&wire).unwrap_err();

    assert_eq!(err.path(), Some("group.web.count"));
    assert!(matches!(err.root_cause(), ConversionError::TypeMismatch { .. }));
}

#[test]
fn unknown_values_are_rejected_on_read() {
    let converter = Converter::<Job>::build().unwrap();
    let mut wire = converter.to_wire(&sample_job()).unwrap();
    if let Dynamic::Map(map) = &mut wire.value {
        map.insert("id".to_string(), Dynamic::Unknown);
    }

    let err = converter.decode(&wire).unwrap_err();

    assert_eq!(err.path(), Some("id"));
    assert!(matches!(err.root_cause(), ConversionError::UnknownValue));
}

#[test]
fn invalid_job_type_is_a_conversion_error() {
    let converter = Converter::<Job>::build().unwrap();
    let mut wire = converter.to_wire(&sample_job()).unwrap();
    if let Dynamic::Map(map) = &mut wire.value {
        map.insert("type".to_string(), Dynamic::from("cron"));
    }

    let err = converter.decode(&wire).unwrap_err();
    assert!(matches!(
        err.root_cause(),
        ConversionError::InvalidEnum { kind: "job type", .. }
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn converter_is_shared_across_tasks() {
    init_tracing();
    let converter = Arc::new(Converter::<Job>::build().unwrap());

    let handles: Vec<_> = (0..16_i64)
        .map(|count| {
            let converter = Arc::clone(&converter);
            tokio::spawn(async move {
                let mut job = sample_job();
                job.groups[1].count = Some(count);
                let wire = converter.to_wire(&job).unwrap();
                (job, converter.decode(&wire).unwrap())
            })
        })
        .collect();

    for handle in handles {
        let (sent, received) = handle.await.unwrap();
        assert_eq!(sent, received);
    }
}
