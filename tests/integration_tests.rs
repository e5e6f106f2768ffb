//! Integration tests for TFM CLI
//!
//! These tests exercise the CLI commands end-to-end using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const PRESS_RELEASE_XSD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" elementFormDefault="qualified">
  <xs:element name="press_release">
    <xs:complexType>
      <xs:sequence>
        <xs:element name="title" type="xs:string"/>
        <xs:element name="body" type="xs:string"/>
      </xs:sequence>
    </xs:complexType>
  </xs:element>
  <xs:element name="contact" type="xs:string"/>
</xs:schema>
"#;

/// Helper to get a tfm command isolated from the user's global config
fn tfm(tmp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tfm").unwrap();
    cmd.current_dir(tmp.path())
        .env("XDG_CONFIG_HOME", tmp.path().join(".xdg"))
        .env("TFM_AUTHOR", "test-author")
        .env_remove("TFM_FORMS_CONTAINER")
        .env_remove("TFM_LOG");
    cmd
}

/// Helper to create a test project with a schema and two templates on disk
fn setup_test_project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    tfm(&tmp).arg("init").assert().success();

    fs::write(tmp.path().join("press-release.xsd"), PRESS_RELEASE_XSD).unwrap();
    fs::write(tmp.path().join("page.xsl"), "<xsl:stylesheet/>").unwrap();
    fs::write(tmp.path().join("print.ftl"), "<#-- print -->").unwrap();
    tmp
}

fn show_json(tmp: &TempDir, name: &str) -> serde_json::Value {
    let output = tfm(tmp)
        .args(["form", "show", name, "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    serde_json::from_slice(&output.stdout).unwrap()
}

// ============================================================================
// CLI Basic Tests
// ============================================================================

#[test]
fn test_help_displays() {
    let tmp = TempDir::new().unwrap();
    tfm(&tmp)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("XML forms"));
}

#[test]
fn test_version_displays() {
    let tmp = TempDir::new().unwrap();
    tfm(&tmp)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("tfm"));
}

#[test]
fn test_unknown_command_fails() {
    let tmp = TempDir::new().unwrap();
    tfm(&tmp)
        .arg("unknown-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

// ============================================================================
// Init Command Tests
// ============================================================================

#[test]
fn test_init_creates_project_structure() {
    let tmp = TempDir::new().unwrap();

    tfm(&tmp)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized"));

    assert!(tmp.path().join(".tfm").is_dir());
    assert!(tmp.path().join(".tfm/config.yaml").is_file());
    assert!(tmp.path().join("forms").is_dir());
}

#[test]
fn test_init_warns_if_project_exists() {
    let tmp = setup_test_project();

    tfm(&tmp)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn test_init_force_keeps_registered_forms() {
    let tmp = setup_test_project();
    tfm(&tmp)
        .args(["form", "new", "--schema", "press-release.xsd"])
        .assert()
        .success();

    tfm(&tmp).args(["init", "--force"]).assert().success();

    tfm(&tmp)
        .args(["form", "list", "--format", "id"])
        .assert()
        .success()
        .stdout(predicate::str::contains("press-release"));
}

#[test]
fn test_commands_outside_project_fail() {
    let tmp = TempDir::new().unwrap();
    tfm(&tmp)
        .args(["form", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a TFM project"));
}

// ============================================================================
// Form Command Tests
// ============================================================================

#[test]
fn test_form_new_with_defaults() {
    let tmp = setup_test_project();

    tfm(&tmp)
        .args(["form", "new", "--schema", "press-release.xsd"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created form"))
        .stdout(predicate::str::contains("press-release"));

    assert!(tmp.path().join("forms/press-release").is_dir());
    assert_eq!(
        fs::read_to_string(tmp.path().join("forms/press-release/press-release.xsd")).unwrap(),
        PRESS_RELEASE_XSD
    );
    assert!(tmp.path().join(".tfm/repository.yaml").is_file());

    let form = show_json(&tmp, "press-release");
    assert_eq!(form["title"], "press-release");
    assert_eq!(form["schema"], "press-release.xsd");
    assert_eq!(form["schema_root_element_name"], "press_release");
    assert_eq!(form["output_path_pattern_for_form_instance_data"], "${name}.xml");
    assert_eq!(form["creator"], "test-author");
    assert!(form.get("default_workflow_name").is_none());
    assert_eq!(form["rendering_engine_templates"].as_array().unwrap().len(), 0);
}

#[test]
fn test_form_new_with_templates_and_workflow() {
    let tmp = setup_test_project();

    tfm(&tmp)
        .args([
            "form",
            "new",
            "--schema",
            "press-release.xsd",
            "--name",
            "news",
            "--title",
            "News",
            "--description",
            "Company news",
            "--root-element",
            "contact",
            "--output-path",
            "${name}-data.xml",
            "--workflow",
            "wcmwf:submit",
            "--template",
            "page.xsl:${name}.html",
            "--template",
            "page.xsl:${name}.txt",
            "--template",
            "print.ftl",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("additional rendition"));

    assert!(tmp.path().join("forms/news/page.xsl").is_file());
    assert!(tmp.path().join("forms/news/print.ftl").is_file());

    let form = show_json(&tmp, "news");
    assert_eq!(form["title"], "News");
    assert_eq!(form["description"], "Company news");
    assert_eq!(form["schema_root_element_name"], "contact");
    assert_eq!(form["output_path_pattern_for_form_instance_data"], "${name}-data.xml");
    assert_eq!(form["default_workflow_name"], "wcmwf:submit");

    let templates = form["rendering_engine_templates"].as_array().unwrap();
    assert_eq!(templates.len(), 2);

    let page = &templates[0];
    assert_eq!(page["file_name"], "page.xsl");
    assert_eq!(page["rendering_engine"], "XSLT");
    let renditions = page["renditions"].as_array().unwrap();
    assert_eq!(renditions.len(), 2);
    assert_eq!(renditions[0]["output_path_pattern"], "${name}.html");
    assert_eq!(renditions[0]["mimetype"], "text/html");
    assert_eq!(renditions[1]["output_path_pattern"], "${name}.txt");
    assert_eq!(renditions[1]["mimetype"], "text/plain");

    let print = &templates[1];
    assert_eq!(print["rendering_engine"], "FreeMarker");
    assert_eq!(print["renditions"][0]["output_path_pattern"], "${name}.${extension}");
    assert!(print["renditions"][0]["mimetype"].is_null());
}

#[test]
fn test_form_new_template_options() {
    let tmp = setup_test_project();
    fs::write(tmp.path().join("notes.txt"), "plain").unwrap();

    tfm(&tmp)
        .args([
            "form",
            "new",
            "--schema",
            "press-release.xsd",
            "--template",
            "notes.txt:${name}.out,title=Plain notes,description=Text output,engine=xslt,mimetype=text/plain",
        ])
        .assert()
        .success();

    let form = show_json(&tmp, "press-release");
    let template = &form["rendering_engine_templates"][0];
    assert_eq!(template["file_name"], "notes.txt");
    assert_eq!(template["title"], "Plain notes");
    assert_eq!(template["rendering_engine"], "XSLT");
    assert_eq!(template["renditions"][0]["output_path_pattern"], "${name}.out");
    assert_eq!(template["renditions"][0]["mimetype"], "text/plain");
}

#[test]
fn test_form_new_root_element_from_included_schema() {
    let tmp = setup_test_project();
    fs::create_dir(tmp.path().join("schemas")).unwrap();
    fs::write(
        tmp.path().join("schemas/article.xsd"),
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:include schemaLocation="common.xsd"/>
  <xs:element name="article" type="xs:string"/>
</xs:schema>"#,
    )
    .unwrap();
    fs::write(
        tmp.path().join("schemas/common.xsd"),
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="byline" type="xs:string"/>
</xs:schema>"#,
    )
    .unwrap();

    tfm(&tmp)
        .args(["schema", "roots", "schemas/article.xsd"])
        .assert()
        .success()
        .stdout(predicate::str::contains("article\nbyline"));

    tfm(&tmp)
        .args([
            "form",
            "new",
            "--schema",
            "schemas/article.xsd",
            "--root-element",
            "byline",
        ])
        .assert()
        .success();

    let form = show_json(&tmp, "article");
    assert_eq!(form["schema_root_element_name"], "byline");
}

#[test]
fn test_form_new_existing_name_fails_without_leftovers() {
    let tmp = setup_test_project();
    tfm(&tmp)
        .args(["form", "new", "--schema", "press-release.xsd"])
        .assert()
        .success();

    tfm(&tmp)
        .args([
            "form",
            "new",
            "--schema",
            "press-release.xsd",
            "--template",
            "page.xsl",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    assert!(!tmp.path().join("forms/press-release/page.xsl").exists());
    let form = show_json(&tmp, "press-release");
    assert_eq!(form["rendering_engine_templates"].as_array().unwrap().len(), 0);
}

#[test]
fn test_form_new_requires_schema() {
    let tmp = setup_test_project();
    tfm(&tmp)
        .args(["form", "new", "--name", "orphan"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--schema"));
}

#[test]
fn test_form_new_rejects_invalid_schema() {
    let tmp = setup_test_project();
    fs::write(tmp.path().join("broken.xsd"), "<xs:schema").unwrap();

    tfm(&tmp)
        .args(["form", "new", "--schema", "broken.xsd"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unable to parse broken.xsd"));

    assert!(!tmp.path().join("forms/broken").exists());
}

#[test]
fn test_form_new_rejects_unknown_root_element() {
    let tmp = setup_test_project();
    tfm(&tmp)
        .args([
            "form",
            "new",
            "--schema",
            "press-release.xsd",
            "--root-element",
            "article",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no element named 'article'"));
}

#[test]
fn test_form_new_rejects_template_without_engine() {
    let tmp = setup_test_project();
    fs::write(tmp.path().join("notes.txt"), "notes").unwrap();

    tfm(&tmp)
        .args([
            "form",
            "new",
            "--schema",
            "press-release.xsd",
            "--template",
            "notes.txt",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no rendering engine handles notes.txt"));

    assert!(!tmp.path().join("forms/press-release").exists());
}

#[test]
fn test_form_new_rejects_unknown_workflow() {
    let tmp = setup_test_project();
    tfm(&tmp)
        .args([
            "form",
            "new",
            "--schema",
            "press-release.xsd",
            "--workflow",
            "wcmwf:missing",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown workflow"));
}

#[test]
fn test_form_list() {
    let tmp = setup_test_project();
    tfm(&tmp)
        .args(["form", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No forms found"));

    tfm(&tmp)
        .args(["form", "new", "--schema", "press-release.xsd", "--name", "zeta"])
        .assert()
        .success();
    tfm(&tmp)
        .args(["form", "new", "--schema", "press-release.xsd", "--name", "alpha"])
        .assert()
        .success();

    tfm(&tmp)
        .args(["form", "list", "--format", "id"])
        .assert()
        .success()
        .stdout("alpha\nzeta\n");

    tfm(&tmp)
        .args(["form", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 form(s) found"));
}

#[test]
fn test_form_show_missing() {
    let tmp = setup_test_project();
    tfm(&tmp)
        .args(["form", "show", "missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No form named 'missing'"));
}

#[test]
fn test_form_show_yaml_by_default() {
    let tmp = setup_test_project();
    tfm(&tmp)
        .args(["form", "new", "--schema", "press-release.xsd"])
        .assert()
        .success();

    tfm(&tmp)
        .args(["form", "show", "press-release"])
        .assert()
        .success()
        .stdout(predicate::str::contains("name: press-release"))
        .stdout(predicate::str::contains("schema: press-release.xsd"));
}

#[test]
fn test_custom_forms_container_from_env() {
    let tmp = setup_test_project();
    tfm(&tmp)
        .env("TFM_FORMS_CONTAINER", "templates")
        .args(["form", "new", "--schema", "press-release.xsd"])
        .assert()
        .success();

    assert!(tmp.path().join("templates/press-release/press-release.xsd").is_file());
    assert!(!tmp.path().join("forms/press-release").exists());
}

// ============================================================================
// Schema, Workflow and Engine Command Tests
// ============================================================================

#[test]
fn test_schema_roots() {
    let tmp = setup_test_project();
    tfm(&tmp)
        .args(["schema", "roots", "press-release.xsd"])
        .assert()
        .success()
        .stdout("press_release\ncontact\n");
}

#[test]
fn test_schema_roots_invalid() {
    let tmp = setup_test_project();
    fs::write(tmp.path().join("page.html"), "<html><body/></html>").unwrap();

    tfm(&tmp)
        .args(["schema", "roots", "page.html"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not an xs:schema"));
}

#[test]
fn test_workflow_list_builtins() {
    let tmp = TempDir::new().unwrap();
    tfm(&tmp)
        .args(["workflow", "list", "--format", "id"])
        .assert()
        .success()
        .stdout("wcmwf:submit\nwcmwf:changerequest\n");
}

#[test]
fn test_workflow_list_from_project_config() {
    let tmp = setup_test_project();
    fs::write(
        tmp.path().join(".tfm/config.yaml"),
        "workflows:\n  - name: review\n    title: Editorial Review\n",
    )
    .unwrap();

    tfm(&tmp)
        .args(["workflow", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Editorial Review"))
        .stdout(predicate::str::contains("wcmwf:submit").not());

    tfm(&tmp)
        .args([
            "form",
            "new",
            "--schema",
            "press-release.xsd",
            "--workflow",
            "review",
        ])
        .assert()
        .success();
    let form = show_json(&tmp, "press-release");
    assert_eq!(form["default_workflow_name"], "review");
}

#[test]
fn test_engine_list() {
    let tmp = TempDir::new().unwrap();
    tfm(&tmp)
        .args(["engine", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("FreeMarker"))
        .stdout(predicate::str::contains(".xslt"))
        .stdout(predicate::str::contains("XSL-FO"));
}

#[test]
fn test_completions_bash() {
    let tmp = TempDir::new().unwrap();
    tfm(&tmp)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("tfm"));
}
