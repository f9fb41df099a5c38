use std::path::Path;
use std::process::{Command, Output};

fn refweave_cmd(fixture: &str) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_refweave"));
    cmd.current_dir(Path::new("tests/fixtures").join(fixture));
    cmd.env_remove("REFWEAVE_LOG");
    cmd
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn parse_prints_components_as_json() {
    let out = refweave_cmd("basic").args(["parse", "--json", "java.base/java.util.List#add(int, E...)"]).output().unwrap();
    assert!(out.status.success(), "{}", stderr(&out));
    let value = json(&out);
    assert_eq!(value["module"], "java.base");
    assert_eq!(value["package_or_class"], "java.util.List");
    assert_eq!(value["member"], "add");
    assert_eq!(value["parameters"][0]["erased_type"], "int");
    assert_eq!(value["parameters"][1]["is_varargs"], true);
}

#[test]
fn parse_rejects_malformed_text() {
    let out = refweave_cmd("basic").args(["parse", "a..b"]).output().unwrap();
    assert!(!out.status.success());
    assert!(stderr(&out).contains("Malformed Signature"), "{}", stderr(&out));
}

#[test]
fn resolve_is_relative_to_the_referencing_page() {
    let out = refweave_cmd("basic")
        .args(["resolve", "--json", "--from", "shapes.geom.Shape", "Circle#radius"])
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", stderr(&out));
    let value = json(&out);
    assert_eq!(value["kind"], "field");
    assert_eq!(value["qualified_name"], "shapes.geom.Circle#radius");
    assert_eq!(value["location"], "Circle.html#radius");
}

#[test]
fn resolve_external_class_through_imports() {
    let out = refweave_cmd("basic")
        .args(["resolve", "--json", "--from", "shapes.geom.Circle", "String"])
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", stderr(&out));
    let value = json(&out);
    assert_eq!(value["kind"], "external");
    assert!(value["qualified_name"].is_null());
    assert_eq!(value["location"], "https://docs.oracle.com/javase/8/docs/api/java/lang/String.html");
}

#[test]
fn resolve_failure_exits_2() {
    let out = refweave_cmd("basic").args(["resolve", "shapes.geom.Nope"]).output().unwrap();
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr(&out).contains("Unresolved Reference"), "{}", stderr(&out));
}

#[test]
fn resolve_from_unknown_symbol_fails() {
    let out = refweave_cmd("basic").args(["resolve", "--from", "shapes.Nope", "Circle"]).output().unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("Symbol Not Found"));
}

#[test]
fn check_passes_on_clean_documentation() {
    let out = refweave_cmd("basic").arg("check").output().unwrap();
    assert!(out.status.success(), "{}{}", stdout(&out), stderr(&out));
    assert!(stdout(&out).contains("All references in"));
}

#[test]
fn check_reports_broken_references() {
    let out = refweave_cmd("broken").arg("check").output().unwrap();
    assert_eq!(out.status.code(), Some(2), "{}", stdout(&out));
    let text = stdout(&out);
    let broken: Vec<&str> = text.lines().filter(|l| l.starts_with("BROKEN")).collect();
    assert_eq!(broken.len(), 3, "{text}");
    assert!(text.contains("`Missing`"));
    assert!(text.contains("2 overloads"));
    assert!(text.contains("{@inheritDoc} cannot be used"));
}

#[test]
fn render_writes_every_slice() {
    let dir = tempfile::tempdir().unwrap();
    let out = refweave_cmd("basic").args(["render", "--out"]).arg(dir.path()).output().unwrap();
    assert!(out.status.success(), "{}", stderr(&out));

    let circle = std::fs::read_to_string(dir.path().join("shapes/geom/Circle.html")).unwrap();
    assert!(circle.starts_with("<meta charset=\"UTF-8\">"));
    assert!(circle.contains("href=\"Shape.html#area()\""), "{circle}");
    assert!(circle.contains("href=\"https://docs.oracle.com/javase/8/docs/api/java/lang/String.html\""));
    assert!(circle.contains("The enclosed area."));
    assert!(circle.contains("area in square units"));
    assert!(circle.contains("href=\"#radius\""), "{circle}");

    let ascii = std::fs::read(dir.path().join("shapes/geom/Circle.html.ascii")).unwrap();
    assert!(ascii.is_ascii());

    let index = std::fs::read_to_string(dir.path().join("index.html")).unwrap();
    assert!(index.contains("href=\"shapes/geom/package-summary.html\""), "{index}");
    assert!(index.contains("href=\"shapes-module.html\""));
    assert!(dir.path().join("index.html.ascii").exists());
}

#[test]
fn render_filters_slices_by_locale() {
    let dir = tempfile::tempdir().unwrap();
    let out = refweave_cmd("basic").args(["render", "--locale", "en-GB", "--out"]).arg(dir.path()).output().unwrap();
    assert!(out.status.success(), "{}", stderr(&out));
    assert!(dir.path().join("shapes/geom/Shape.html").exists());
    assert!(!dir.path().join("shapes/geom/Shape.html.ascii").exists());

    let none = refweave_cmd("basic").args(["render", "--locale", "fr", "--out"]).arg(dir.path()).output().unwrap();
    assert_eq!(none.status.code(), Some(1));
    assert!(stderr(&none).contains("No Matching Slice"));
}

#[test]
fn missing_graph_is_reported() {
    let out = refweave_cmd("basic").args(["check", "--graph", "nope.json"]).output().unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("File Not Found"));
}
