use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::TempDir;

fn books_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("books");
    path
}

const BASE_ROWS: &str = "\
title,author,genre,publisher,published_date,pages,average_rating,description,thumbnail
Dune,Frank Herbert,Science Fiction,Chilton,1965,412,4.25,Spice and sand.,https://img.example/dune.png
Dune Messiah,Frank Herbert,Science Fiction,Putnam,1969,256,3.88,,
Emma,Jane Austen,\"Romance, Classic\",John Murray,1815,474,4.01,A matchmaker meddles.,cover.png
The Hobbit,J.R.R. Tolkien,\"Fantasy, Adventure\",Allen & Unwin,1937,310,not rated,There and back again.,
";

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    let data_dir = root.join("data");
    fs::create_dir_all(&data_dir).unwrap();

    let mut csv = String::from(BASE_ROWS);
    for i in 1..=15 {
        csv.push_str(&format!(
            "King Novel {},Stephen King,Horror,Scribner,{},300,{}.{},,\n",
            i,
            1970 + i,
            3,
            i % 10
        ));
    }
    fs::write(data_dir.join("Books.csv"), csv).unwrap();

    let config_content = format!(
        r#"[dataset]
path = "{}/data/Books.csv"

[matching]
cutoff = 75

[selection]
list_limit = 10
top_limit = 5

[chat]
url = "http://127.0.0.1:9/webhooks/rest/webhook"
timeout_secs = 2
max_retries = 0
"#,
        root.display()
    );

    let config_path = config_dir.join("books.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_books(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = books_binary();
    let output = Command::new(&binary)
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run books binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

fn run_json(config_path: &Path, args: &[&str]) -> serde_json::Value {
    let mut full = vec!["--format", "json"];
    full.extend_from_slice(args);
    let (stdout, stderr, success) = run_books(config_path, &full);
    assert!(success, "command failed: stdout={}, stderr={}", stdout, stderr);
    serde_json::from_str(&stdout)
        .unwrap_or_else(|e| panic!("invalid JSON ({}): {}", e, stdout))
}

#[test]
fn test_title_fuzzy_match() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_books(&config_path, &["title", "dun", "--cutoff", "60"]);
    assert!(success, "title failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Matched title: Dune (score:"), "got: {}", stdout);
    assert!(stdout.contains("Frank Herbert"));
    assert!(stdout.contains("Spice and sand."));
    assert!(stdout.contains("https://img.example/dune.png"));
}

#[test]
fn test_title_no_match_is_not_an_error() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_books(&config_path, &["title", "qwxzv"]);
    assert!(success);
    assert!(stdout.contains("warning: no close title match"));
    assert!(!stdout.contains("random suggestion"));
}

#[test]
fn test_title_suggest_shows_random_book() {
    let (_tmp, config_path) = setup_test_env();

    let json = run_json(&config_path, &["title", "qwxzv", "--suggest"]);
    assert_eq!(json["error"]["code"], "no_match");
    assert!(json["error"]["suggestion"]["title"].is_string());
}

#[test]
fn test_empty_query() {
    let (_tmp, config_path) = setup_test_env();

    let json = run_json(&config_path, &["author", ""]);
    assert_eq!(json["error"]["code"], "empty_query");
}

#[test]
fn test_author_limited_to_ten_in_order() {
    let (_tmp, config_path) = setup_test_env();

    let json = run_json(&config_path, &["author", "stephen king"]);
    assert_eq!(json["matched"]["candidate"], "Stephen King");
    assert_eq!(json["total"], 15);
    let books = json["books"].as_array().unwrap();
    assert_eq!(books.len(), 10);
    for (i, book) in books.iter().enumerate() {
        assert_eq!(book["title"], format!("King Novel {}", i + 1));
    }
}

#[test]
fn test_genre_exact_and_fallback() {
    let (_tmp, config_path) = setup_test_env();

    let json = run_json(&config_path, &["genre", "horror"]);
    assert_eq!(json["tier"], "exact");
    assert_eq!(json["total"], 15);

    let json = run_json(&config_path, &["genre", "fantasy, adventure"]);
    assert_eq!(json["tier"], "exact");
    assert_eq!(json["books"][0]["title"], "The Hobbit");
}

#[test]
fn test_genre_without_column_is_no_match() {
    let (tmp, config_path) = setup_test_env();
    let csv = tmp.path().join("data/no_genre.csv");
    fs::write(&csv, "title,author\nDune,Frank Herbert\n").unwrap();

    let json = run_json(
        &config_path,
        &["--data", csv.to_str().unwrap(), "genre", "fantasy"],
    );
    assert_eq!(json["error"]["code"], "no_match");
}

#[test]
fn test_top_rated_sorted_and_excludes_unrated() {
    let (_tmp, config_path) = setup_test_env();

    let json = run_json(&config_path, &["top-rated"]);
    let top = json.as_array().unwrap();
    assert_eq!(top.len(), 5);

    let ratings: Vec<f64> = top.iter().map(|b| b["rating"].as_f64().unwrap()).collect();
    assert!(ratings.windows(2).all(|w| w[0] >= w[1]), "{:?}", ratings);
    assert_eq!(top[0]["book"]["title"], "Dune");
    assert!(top.iter().all(|b| b["book"]["title"] != "The Hobbit"));
}

#[test]
fn test_top_rated_without_rating_column() {
    let (tmp, config_path) = setup_test_env();
    let csv = tmp.path().join("data/no_rating.csv");
    fs::write(&csv, "title,author\nDune,Frank Herbert\n").unwrap();

    let (stdout, _, success) =
        run_books(&config_path, &["--data", csv.to_str().unwrap(), "top-rated"]);
    assert!(success);
    assert!(stdout.contains("no 'average_rating' column"));
}

#[test]
fn test_field_lookups() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, _) = run_books(&config_path, &["pages", "the hobit"]);
    assert!(stdout.contains("The Hobbit: 310 pages"), "got: {}", stdout);

    let (stdout, _, _) = run_books(&config_path, &["publisher", "emma"]);
    assert!(stdout.contains("Publisher for Emma: John Murray"));

    let json = run_json(&config_path, &["description", "dune messiah"]);
    assert_eq!(json["value"], "N/A");

    let json = run_json(&config_path, &["thumbnail", "emma"]);
    assert_eq!(json["error"]["code"], "no_thumbnail");
}

#[test]
fn test_random_returns_a_row() {
    let (_tmp, config_path) = setup_test_env();

    let json = run_json(&config_path, &["random"]);
    let row = json["row"].as_u64().unwrap();
    assert!(row < 19);
}

#[test]
fn test_corrupt_index_falls_back() {
    let (tmp, config_path) = setup_test_env();
    let index = tmp.path().join("data/index.json");
    fs::write(&index, "{ not valid json").unwrap();

    let (stdout, stderr, success) = run_books(
        &config_path,
        &["--index", index.to_str().unwrap(), "title", "dune"],
    );
    assert!(success);
    assert!(stdout.contains("Matched title: Dune"));
    assert!(
        stderr.contains("failed to load precomputed index"),
        "stderr: {}",
        stderr
    );
}

#[test]
fn test_stale_index_is_surfaced() {
    let (tmp, config_path) = setup_test_env();
    let index = tmp.path().join("data/index.json");
    fs::write(&index, r#"{"titles": ["Dune Chronicles"]}"#).unwrap();

    let json = run_json(
        &config_path,
        &["--index", index.to_str().unwrap(), "title", "dune chronicles"],
    );
    assert_eq!(json["error"]["code"], "stale_index");
}

#[test]
fn test_index_build_and_reuse() {
    let (tmp, config_path) = setup_test_env();
    let out = tmp.path().join("data/built.json");

    let (stdout, stderr, success) =
        run_books(&config_path, &["index", "build", "--output", out.to_str().unwrap()]);
    assert!(success, "build failed: {} {}", stdout, stderr);
    assert!(stdout.contains("titles:  19"));

    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(written["dataset"]["rows"], 19);

    let (stdout, _, success) = run_books(
        &config_path,
        &["--index", out.to_str().unwrap(), "stats"],
    );
    assert!(success);
    assert!(stdout.contains("Index:       cache"));
    assert!(stdout.contains("matches dataset"));
}

#[test]
fn test_index_build_refuses_configured_path() {
    let (tmp, config_path) = setup_test_env();
    let index = tmp.path().join("data/index.json");

    let (_, stderr, success) = run_books(
        &config_path,
        &[
            "--index",
            index.to_str().unwrap(),
            "index",
            "build",
            "--output",
            index.to_str().unwrap(),
        ],
    );
    assert!(!success);
    assert!(stderr.contains("refusing to overwrite"));
    assert!(!index.exists());
}

#[test]
fn test_missing_dataset_fails() {
    let (tmp, config_path) = setup_test_env();
    let missing = tmp.path().join("data/missing.csv");

    let (_, stderr, success) =
        run_books(&config_path, &["--data", missing.to_str().unwrap(), "random"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read dataset"));
}

#[test]
fn test_stats() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_books(&config_path, &["stats"]);
    assert!(success);
    assert!(stdout.contains("Rows:        19"));
    assert!(stdout.contains("Authors:     4"));
    assert!(stdout.contains("Index:       built"));
}

#[test]
fn test_chat_unreachable_server_is_reported() {
    let (_tmp, config_path) = setup_test_env();

    // Reserve a port and release it so nothing is listening.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/webhooks/rest/webhook", listener.local_addr().unwrap());
    drop(listener);

    let mut child = Command::new(books_binary())
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(["chat", "--sender", "tester", "--url", &url])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"recommend something\n/quit\n")
        .unwrap();
    let output = child.wait_with_output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("as tester"));
    assert!(stdout.contains("error: could not connect"), "got: {}", stdout);
}
