use border_recording::{
    dummy::{CountingEnv, CountingEnvConfig},
    record::RecordKind,
    ChannelPhase, LogReader, Recording, RecordingConfig, RecordingPolicy, WriteMode,
};
use serde_json::json;
use std::{fs, path::Path};
use tempdir::TempDir;
use test_log::test;

fn recording_files(dir: &Path) -> Vec<String> {
    fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .filter(|name| name.starts_with("border.recording."))
        .collect()
}

#[test]
fn test_disabled_recording_writes_nothing() {
    let cwd = std::env::current_dir().unwrap();
    let before = recording_files(&cwd);

    let env = CountingEnv::build(&CountingEnvConfig::default());
    let mut env = Recording::build(env, &RecordingConfig::default().policy("always")).unwrap();
    assert!(matches!(env.controller().policy(), RecordingPolicy::Never));
    assert_eq!(env.controller().recording_dir(), None);

    for _ in 0..10 {
        env.reset().unwrap();
        for channel in 0..2 {
            assert_eq!(env.controller().phase(channel).unwrap(), ChannelPhase::Inactive);
        }
        for _ in 0..5 {
            env.step(&[0, 1]).unwrap();
        }
    }
    env.flush().unwrap();
    env.close().unwrap();

    for channel in 0..2 {
        assert_eq!(env.controller().log_path(channel), None);
    }
    assert_eq!(env.controller().recording_dir(), None);
    assert_eq!(recording_files(&cwd), before);
}

#[test]
fn test_record_counting_env() {
    let dir = TempDir::new("recording_env").unwrap();
    let env_config = CountingEnvConfig {
        n_channels: 3,
        episode_len: 4,
        obs_dim: 512,
        ..Default::default()
    };
    let config = RecordingConfig::default()
        .recording_dir(dir.path())
        .note("agent", "random");
    let mut env = Recording::build(CountingEnv::build(&env_config), &config).unwrap();
    assert_eq!(env.controller().write_mode(), WriteMode::Sync);

    // Capped cubic: episodes 0, 1 and 8 of each channel are recorded.
    for _ in 0..10 {
        let obs = env.reset().unwrap();
        assert_eq!(obs.len(), 3);
        loop {
            let step = env.step(&[1, 2, 3]).unwrap();
            if step.is_done.iter().all(|&d| d == 1) {
                break;
            }
        }
    }
    env.close().unwrap();

    let mut files = recording_files(dir.path());
    files.sort();
    assert_eq!(files.len(), 6);

    for channel in 0..3 {
        let reader = LogReader::open(dir.path(), env.controller().instance_id(), channel);
        let records = reader.records().unwrap();
        assert_eq!(records.len(), 1 + 3 * (1 + 4));

        let notes = &records[0];
        assert_eq!(notes.kind, RecordKind::Notes);
        assert_eq!(notes.payload["env_id"], json!("Counting-v0"));
        assert_eq!(notes.payload["agent"], json!("random"));
        assert_eq!(notes.payload["env_spec_tags"]["episode_len"], json!(4));

        let episodes: Vec<_> = records
            .iter()
            .filter(|r| r.kind == RecordKind::Reset)
            .map(|r| r.episode_id.unwrap())
            .collect();
        assert_eq!(episodes, vec![0, 1, 8]);

        for r in records.iter().filter(|r| r.kind == RecordKind::Step) {
            let t = r.step_id.unwrap() + 1;
            assert_eq!(r.payload["action"], json!(channel + 1));
            assert_eq!(r.payload["reward"], json!((channel + 1) as f64));
            assert_eq!(r.payload["info"]["t"], json!(t));
            assert_eq!(r.payload["done"], json!(t == 4));
            let obs = reader.read_f32(&r.binary_refs["observation"]).unwrap();
            assert_eq!(obs, vec![t as f32; 512]);
        }
    }
}

#[test]
fn test_record_autoreset_async_env() {
    let dir = TempDir::new("recording_env").unwrap();
    let env_config = CountingEnvConfig {
        n_channels: 1,
        episode_len: 3,
        autoreset: true,
        asynchronous: true,
        ..Default::default()
    };
    let config = RecordingConfig::default().recording_dir(dir.path());
    let mut env = Recording::build_with_policy(
        CountingEnv::build(&env_config),
        &config,
        RecordingPolicy::custom(|e| e != 1),
    )
    .unwrap();
    assert_eq!(env.controller().write_mode(), WriteMode::Async);

    env.reset().unwrap();
    for _ in 0..9 {
        env.step(&[0]).unwrap();
    }
    env.flush().unwrap();

    let reader = LogReader::open(dir.path(), env.controller().instance_id(), 0);
    let records = reader.records().unwrap();
    let ids: Vec<_> = records
        .iter()
        .map(|r| (r.kind, r.episode_id, r.step_id))
        .collect();
    let mut expected = vec![(RecordKind::Notes, None, None)];
    for e in &[0, 2] {
        expected.push((RecordKind::Reset, Some(*e), None));
        for s in 0..3 {
            expected.push((RecordKind::Step, Some(*e), Some(s)));
        }
    }
    expected.push((RecordKind::Reset, Some(3), None));
    assert_eq!(ids, expected);
    assert_eq!(records[0].payload["env_semantics_autoreset"], json!(true));
    assert_eq!(records[0].payload["env_semantics_async"], json!(true));

    env.close().unwrap();
}
