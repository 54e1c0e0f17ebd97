use std::path::PathBuf;

fn exe() -> PathBuf {
    std::env::var_os("CARGO_BIN_EXE_simviz")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let mut p = PathBuf::from("target").join("debug");
            p.push(if cfg!(windows) { "simviz.exe" } else { "simviz" });
            p
        })
}

fn fixture_paths() -> (PathBuf, PathBuf) {
    let dir = PathBuf::from("tests").join("data");
    (dir.join("payload.json"), dir.join("document.json"))
}

#[test]
fn cli_validate_accepts_the_fixture() {
    let (payload, doc) = fixture_paths();
    let status = std::process::Command::new(exe())
        .args(["validate", "--payload"])
        .arg(&payload)
        .arg("--doc")
        .arg(&doc)
        .status()
        .unwrap();
    assert!(status.success());
}

#[test]
fn cli_frame_dumps_a_json_snapshot() {
    let (payload, doc) = fixture_paths();
    let output = std::process::Command::new(exe())
        .args(["frame", "--x", "1", "--payload"])
        .arg(&payload)
        .arg("--doc")
        .arg(&doc)
        .output()
        .unwrap();
    assert!(output.status.success());

    let snapshot: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(snapshot["x"], 1);
    assert_eq!(snapshot["label"], "60.00");
    assert!(snapshot["document"]["nodes"]["vessel"].is_object());
    assert!(snapshot["elements"].is_array());
}

#[test]
fn cli_frame_rejects_a_malformed_payload() {
    let dir = PathBuf::from("target").join("cli_smoke");
    std::fs::create_dir_all(&dir).unwrap();

    // Length mismatch between data and x_series: fatal at construction.
    let payload_path = dir.join("bad_payload.json");
    std::fs::write(
        &payload_path,
        r##"{
            "x_series": [0.0, 1.0],
            "element_data": {
                "cell": [{
                    "ids": ["tank"],
                    "conditions": [{
                        "type": "level_static",
                        "data": [0.0],
                        "color": "#fff",
                        "min_height": 0.0,
                        "max_height": 1.0
                    }]
                }]
            }
        }"##,
    )
    .unwrap();

    let doc_path = dir.join("doc.json");
    std::fs::write(
        &doc_path,
        r#"{"nodes": {"tank": {"bbox": {"x0": 0.0, "y0": 0.0, "x1": 1.0, "y1": 1.0}}}}"#,
    )
    .unwrap();

    let status = std::process::Command::new(exe())
        .args(["frame", "--x", "0", "--payload"])
        .arg(&payload_path)
        .arg("--doc")
        .arg(&doc_path)
        .status()
        .unwrap();
    assert!(!status.success());
}
