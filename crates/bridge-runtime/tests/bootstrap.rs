//! End-to-end bootstrap test: proves the full `Orchestrator::start` path
//! (Engine, Watchers, Desktop/Mobile Client init, service-stats polling,
//! graceful shutdown) against real files on disk and real sockets, with no
//! avatar app or mobile source actually running on the other end — the
//! degraded-mode path spec §4.E/§7 calls out as normal, not fatal.

use std::io::Write;
use std::time::Duration;

use bridge_runtime::Orchestrator;

fn write_file(path: &std::path::Path, content: &str) {
    let mut f = std::fs::File::create(path).unwrap();
    f.write_all(content.as_bytes()).unwrap();
}

#[tokio::test]
async fn bootstraps_and_shuts_down_cleanly_with_no_live_peers() {
    let dir = tempfile::tempdir().unwrap();
    let rules_path = dir.path().join("rules.json");
    write_file(
        &rules_path,
        r#"[{"name":"FaceAngleX","func":"HeadRotX","min":-30,"max":30,"defaultValue":0}]"#,
    );

    let config_path = dir.path().join("config.json");
    write_file(
        &config_path,
        &format!(
            r#"{{
                "GeneralSettings": {{ "recovery_tick_hz": 10.0 }},
                "PhoneClient": {{ "listen_port": 0, "iphone_ip": "127.0.0.1", "iphone_port": 1 }},
                "PCClient": {{ "discovery_enabled": false, "port": 1, "token_file_path": "{}" }},
                "TransformationEngine": {{ "config_path": "{}" }}
            }}"#,
            dir.path().join("token.txt").display().to_string().replace('\\', "\\\\"),
            rules_path.display().to_string().replace('\\', "\\\\"),
        ),
    );

    let orchestrator = Orchestrator::start(&config_path)
        .await
        .expect("bootstrap should succeed even with no live desktop/mobile peers");

    // Engine loaded the ruleset even though neither transport connected.
    let progress = orchestrator.init_progress();
    assert_eq!(progress.step_infos.len(), 7);

    let [engine_stats, desktop_stats, mobile_stats] = orchestrator.service_stats().await;
    assert_eq!(engine_stats.name, "TransformationEngine");
    assert_eq!(engine_stats.status, "Ready");
    assert_eq!(desktop_stats.name, "DesktopClient");
    assert!(!desktop_stats.is_healthy, "no avatar app listening on port 1");
    assert_eq!(mobile_stats.name, "MobileClient");

    let pipeline = orchestrator.pipeline_stats();
    assert_eq!(pipeline.frames_routed, 0);

    tokio::time::sleep(Duration::from_millis(50)).await;

    orchestrator.shutdown();
    tokio::time::timeout(Duration::from_secs(5), orchestrator.wait())
        .await
        .expect("orchestrator should shut down within the timeout");
}
