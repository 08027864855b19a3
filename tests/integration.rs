use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn mmqa_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("mmqa");
    path
}

const QUESTIONS: &str = r#"{"qid": "C_1_1", "question": "Who directed the film?", "answer": [{"answer": "Ann Lee", "modality": "text", "text_instances": [{"doc_id": "p1", "start_byte": 0, "text": "Ann Lee"}]}]}
{"qid": "C_1_2", "question": "What year was it released?", "table_id": "t1", "answer": [{"answer": 2020, "modality": "table", "table_indices": [[0, 1]]}]}

{"qid": "C_2_1", "question": "What animal is on the poster?", "answer": [{"answer": "parrot", "modality": "image", "image_instances": [{"doc_id": "img1"}, {"doc_id": "img404"}]}]}
"#;

const IMAGES: &str = r#"{"id": "img1", "title": "Poster", "path": "img1.jpg"}
"#;

const TABLES: &str = r#"{"id": "t1", "title": "Filmography", "table": {"header": [{"column_name": "Film"}, {"column_name": "Year"}], "table_rows": [[{"text": "Skyline"}, {"text": "2020"}], [{"text": "Harbor"}, {"text": "2018"}]]}}
{"id": "t2", "title": "Awards", "table": {"header": [{"column_name": "Award"}, {"column_name": "Year"}], "table_rows": [[{"text": "Gold"}, {"text": "2021"}]]}}
"#;

const TEXTS: &str = r#"{"id": "p1", "title": "Ann Lee", "text": "Ann Lee is a director."}
"#;

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    let data_dir = root.join("data");
    fs::create_dir_all(data_dir.join("images")).unwrap();

    fs::write(data_dir.join("questions.jsonl"), QUESTIONS).unwrap();
    fs::write(data_dir.join("images.jsonl"), IMAGES).unwrap();
    fs::write(data_dir.join("tables.jsonl"), TABLES).unwrap();
    fs::write(data_dir.join("texts.jsonl"), TEXTS).unwrap();

    let config_path = config_dir.join("mmqa.toml");
    write_config(&config_path, &root, "");
    (tmp, config_path)
}

fn write_config(config_path: &Path, root: &Path, extra: &str) {
    let content = format!(
        r#"[data]
questions = "{root}/data/questions.jsonl"
images = "{root}/data/images.jsonl"
tables = "{root}/data/tables.jsonl"
texts = "{root}/data/texts.jsonl"
image_dir = "{root}/data/images"

[server]
bind = "127.0.0.1:8501"
{extra}"#,
        root = root.display(),
        extra = extra,
    );
    fs::write(config_path, content).unwrap();
}

fn run_mmqa(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = mmqa_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run mmqa binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_summary_counts() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_mmqa(&config_path, &["summary"]);
    assert!(success, "summary failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Questions:      3"), "got: {}", stdout);
    assert!(stdout.contains("Conversations:  2"));
    assert!(stdout.contains("Image records:  1"));
    assert!(stdout.contains("Table records:  2"));
    assert!(stdout.contains("Text records:   1"));
}

#[test]
fn test_conversations_sorted_with_limit() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_mmqa(&config_path, &["conversations"]);
    assert!(success);
    let c1 = stdout.find("C_1").unwrap();
    let c2 = stdout.find("C_2").unwrap();
    assert!(c1 < c2);

    let (stdout, _, success) = run_mmqa(&config_path, &["conversations", "--limit", "1"]);
    assert!(success);
    assert!(!stdout.contains("C_2 "));
    assert!(stdout.contains("... 1 more"));
}

#[test]
fn test_show_conversation_in_file_order() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_mmqa(&config_path, &["show", "C_1"]);
    assert!(success, "show failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Conversation C_1 (2 turns)"));
    let first = stdout.find("--- C_1_1 ---").unwrap();
    let second = stdout.find("--- C_1_2 ---").unwrap();
    assert!(first < second);
    assert!(stdout.contains("text p1: Ann Lee"));
    // Numeric answers are rendered as text.
    assert!(stdout.contains("A1: 2020 [table]"));
    assert!(stdout.contains("table t1: Filmography"));
}

#[test]
fn test_show_reports_missing_evidence_inline() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_mmqa(&config_path, &["show", "C_2"]);
    assert!(success);
    assert!(stdout.contains("image img1: Poster"));
    assert!(stdout.contains("! image evidence not found: img404"));
}

#[test]
fn test_show_unknown_conversation_fails() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_mmqa(&config_path, &["show", "C_9"]);
    assert!(!success);
    assert!(stderr.contains("conversation not found: C_9"));
}

#[test]
fn test_evidence_lookup_and_miss() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_mmqa(&config_path, &["evidence", "text", "p1"]);
    assert!(success);
    let record: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(record["text"], "Ann Lee is a director.");

    // Ids are only looked up in the requested corpus.
    let (_, stderr, success) = run_mmqa(&config_path, &["evidence", "image", "p1"]);
    assert!(!success);
    assert!(stderr.contains("image evidence not found: p1"));
}

#[test]
fn test_table_highlight_from_turn() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) =
        run_mmqa(&config_path, &["table", "t1", "--qid", "C_1_2"]);
    assert!(success, "table failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.starts_with("Filmography [t1]"));
    assert!(stdout.contains("*2020*"));
    assert!(!stdout.contains("*2018*"));
}

#[test]
fn test_table_qid_must_reference_table() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) =
        run_mmqa(&config_path, &["table", "t2", "--qid", "C_1_2"]);
    assert!(!success, "expected failure, got stdout={}", stdout);
    assert!(stderr.contains("turn C_1_2 references table t1, not t2"));
    assert!(!stdout.contains('*'));
}

#[test]
fn test_table_json_with_explicit_highlight() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_mmqa(
        &config_path,
        &["table", "t1", "--highlight", "1,0", "--highlight", "7,7", "--json"],
    );
    assert!(success);
    let view: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(view["table"]["columns"], serde_json::json!(["Film", "Year"]));
    assert_eq!(
        view["highlight"]["cells"],
        serde_json::json!([[false, false], [true, false]])
    );
}

#[test]
fn test_missing_corpus_files_degrade_to_empty() {
    let (tmp, config_path) = setup_test_env();
    fs::remove_file(tmp.path().join("data/images.jsonl")).unwrap();
    fs::remove_file(tmp.path().join("data/texts.jsonl")).unwrap();

    let (stdout, stderr, success) = run_mmqa(&config_path, &["summary"]);
    assert!(success, "summary failed: stderr={}", stderr);
    assert!(stdout.contains("Questions:      3"));
    assert!(stdout.contains("Image records:  0"));
    assert!(stdout.contains("Text records:   0"));
}

#[test]
fn test_strict_mode_rejects_malformed_line() {
    let (tmp, config_path) = setup_test_env();
    fs::write(
        tmp.path().join("data/texts.jsonl"),
        format!("{}{{not json\n", TEXTS),
    )
    .unwrap();

    let (_, _, success) = run_mmqa(&config_path, &["summary"]);
    assert!(!success);

    write_config(&config_path, tmp.path(), "\n[loading]\nmode = \"lenient\"\n");
    let (stdout, stderr, success) = run_mmqa(&config_path, &["summary"]);
    assert!(success, "lenient summary failed: stderr={}", stderr);
    assert!(stdout.contains("Text records:   1"));
}

#[test]
fn test_invalid_highlight_argument() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_mmqa(&config_path, &["table", "t1", "--highlight", "12"]);
    assert!(!success);
    assert!(stderr.contains("ROW,COL"));
}

#[cfg(not(feature = "clip-fastembed"))]
#[test]
fn test_score_images_requires_feature() {
    let (tmp, config_path) = setup_test_env();
    fs::write(tmp.path().join("data/images/img1.jpg"), b"not really a jpeg").unwrap();

    let (_, stderr, success) = run_mmqa(&config_path, &["score-images", "--progress", "off"]);
    assert!(!success);
    assert!(stderr.contains("clip-fastembed"));
}
