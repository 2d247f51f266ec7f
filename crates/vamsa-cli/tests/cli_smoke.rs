use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};

fn repo_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("expected crates/<name> layout")
        .to_path_buf()
}

fn fixture(name: &str) -> PathBuf {
    let path = repo_root().join("fixtures").join("family").join(name);
    assert!(path.exists(), "fixture missing: {}", path.display());
    path
}

fn cli() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo_bin!("vamsa-cli"));
    cmd.current_dir(repo_root());
    cmd
}

fn stdout_json(cmd: &mut Command) -> serde_json::Value {
    let out = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&out).expect("stdout is JSON")
}

#[test]
fn cli_build_prints_tree_rows() {
    let path = fixture("basic.json");
    let json = stdout_json(cli().args(["build", "--expand-all", path.to_string_lossy().as_ref()]));

    assert_eq!(json["root"], "1");
    assert_eq!(json["nodes"], 8);
    assert_eq!(json["maxDepth"], 2);
    assert_eq!(json["tree"].as_array().map(Vec::len), Some(8));
    assert_eq!(json["tree"][0]["name"], "Venkata Rao");
    assert_eq!(json["tree"][0]["children"].as_array().map(Vec::len), Some(2));
    assert_eq!(json["tree"][1]["parent"], "1");
    assert_eq!(json["skipped"][0]["to"], "ghost");
    assert_eq!(json["skipped"][0]["reason"], "danglingTarget");
}

#[test]
fn cli_build_honours_root_override() {
    let path = fixture("basic.json");
    let json = stdout_json(cli().args([
        "build",
        "--root",
        "3",
        "--expand",
        "3",
        path.to_string_lossy().as_ref(),
    ]));
    assert_eq!(json["root"], "3");
    assert_eq!(json["nodes"], 3);
}

#[test]
fn cli_build_handles_deep_chains() {
    let n = 50_000;
    let members: Vec<String> = (0..n)
        .map(|i| format!(r#"{{"id":"p{i}","firstName":"P{i}","lastName":"Rao"}}"#))
        .collect();
    let relationships: Vec<String> = (1..n)
        .map(|i| {
            format!(
                r#"{{"id":"r{i}","fromMemberId":"p{}","toMemberId":"p{i}","relationshipType":"PARENT"}}"#,
                i - 1
            )
        })
        .collect();
    let dataset = format!(
        r#"{{"members":[{}],"relationships":[{}]}}"#,
        members.join(","),
        relationships.join(",")
    );

    let out = cli()
        .args(["build", "-"])
        .write_stdin(dataset)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: serde_json::Value = serde_json::from_slice(&out).expect("build JSON");
    assert_eq!(json["nodes"], n);
    assert_eq!(json["maxDepth"], n - 1);
    assert_eq!(json["tree"][n - 1]["parent"], format!("p{}", n - 2));
}

#[test]
fn cli_layout_reads_yaml_from_stdin() {
    let text = fs::read_to_string(fixture("cousins.yaml")).expect("read fixture");
    let out = cli()
        .args(["layout", "--format", "yaml", "--expand", "g,x", "-"])
        .write_stdin(text)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: serde_json::Value = serde_json::from_slice(&out).expect("layout JSON");
    assert_eq!(json["root"], "g");
    // g and x expanded: g, x, x1, y.
    assert_eq!(json["nodes"].as_array().map(Vec::len), Some(4));
    assert_eq!(json["edges"].as_array().map(Vec::len), Some(3));
}

#[test]
fn cli_layout_of_empty_dataset_is_null() {
    let out = cli()
        .args(["layout", "-"])
        .write_stdin(r#"{"members": [], "relationships": []}"#)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert_eq!(String::from_utf8_lossy(&out).trim(), "null");
}

#[test]
fn cli_validate_reports_problems() {
    let clean = fixture("cousins.yaml");
    cli()
        .args(["validate", clean.to_string_lossy().as_ref()])
        .assert()
        .success();

    let dirty = fixture("basic.json");
    let out = cli()
        .args(["validate", dirty.to_string_lossy().as_ref()])
        .assert()
        .code(1)
        .get_output()
        .stdout
        .clone();
    let report: serde_json::Value = serde_json::from_slice(&out).expect("report JSON");
    assert_eq!(report["danglingReferences"][0]["memberId"], "ghost");
}

#[test]
fn cli_renders_svg_file() {
    let path = fixture("basic.json");
    let tmp = tempfile::tempdir().expect("tempdir");
    let out = tmp.path().join("tree.svg");

    cli()
        .args([
            "render",
            "--expand-all",
            "--select",
            "4",
            "--overlay",
            "--width",
            "900",
            "--height",
            "600",
            "--out",
            out.to_string_lossy().as_ref(),
            path.to_string_lossy().as_ref(),
        ])
        .assert()
        .success();

    let svg = fs::read_to_string(&out).expect("read svg");
    let doc = roxmltree::Document::parse(&svg).expect("svg parses");
    let root = doc.root_element();
    assert_eq!(root.attribute("width"), Some("900"));
    let nodes = doc
        .descendants()
        .filter(|n| {
            n.has_tag_name("g")
                && n.attribute("class")
                    .is_some_and(|c| c.split_whitespace().any(|c| c == "node"))
        })
        .count();
    assert_eq!(nodes, 8);
    assert!(svg.contains("class=\"selection\""));
    assert!(svg.contains("class=\"overlay\""));
}

#[test]
fn cli_render_uses_diagram_id() {
    let path = fixture("cousins.yaml");
    let out = cli()
        .args(["render", "--id", "rao family", path.to_string_lossy().as_ref()])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let svg = String::from_utf8(out).expect("utf-8 svg");
    let doc = roxmltree::Document::parse(&svg).expect("svg parses");
    assert_eq!(doc.root_element().attribute("id"), Some("rao-family"));
    assert!(svg.contains(r#"id="rao-family-node-g""#));
}

#[test]
fn cli_rejects_unknown_flags() {
    cli().args(["render", "--bogus"]).assert().code(2);
    cli().args(["build", "--root-policy", "eldest"]).assert().code(2);
    cli().args(["render", "--id"]).assert().code(2);
}

#[test]
fn cli_reports_missing_input_file() {
    cli()
        .args(["build", "fixtures/family/does-not-exist.json"])
        .assert()
        .code(1);
}
