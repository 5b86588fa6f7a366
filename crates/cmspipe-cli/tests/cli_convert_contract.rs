use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::path::Path;
use std::process::Command;

const ARTICLE: &str = r#"<html><head><style>.c9{font-weight:700}</style></head><body>
<h1>Test Artikel Titel</h1>
<h4>Intro.</h4>
<p>Body <span class="c9">bold</span>.</p>
<hr>
<p>Bron: <a href="https://x.com">X</a></p>
</body></html>"#;

/// A `cmspipe` invocation that cannot see a real AI backend or a stray env file.
fn cmspipe(store_dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_cmspipe"));
    for k in [
        "CMSPIPE_ENV_FILE",
        "CMSPIPE_OPENAI_COMPAT_BASE_URL",
        "CMSPIPE_OPENAI_COMPAT_API_KEY",
        "CMSPIPE_OPENAI_COMPAT_MODEL",
        "CMSPIPE_VISION_MODEL",
        "CMSPIPE_PUBLIC_BASE_URL",
        "CMSPIPE_BOLD_CLASSES",
        "CMSPIPE_ITALIC_CLASSES",
    ] {
        cmd.env_remove(k);
    }
    cmd.env("CMSPIPE_STORE_DIR", store_dir);
    cmd
}

fn read_single_row(path: &Path) -> (Vec<String>, Vec<String>) {
    let mut rdr = csv::Reader::from_path(path).expect("open csv");
    let headers = rdr.headers().unwrap().iter().map(str::to_string).collect();
    let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 1);
    (headers, rows[0].iter().map(str::to_string).collect())
}

#[test]
fn convert_without_ai_writes_slug_named_csv() {
    let tmp = tempfile::tempdir().unwrap();
    let html = tmp.path().join("artikel.html");
    std::fs::write(&html, ARTICLE).unwrap();
    let out_dir = tmp.path().join("out");

    let out = cmspipe(&tmp.path().join("store"))
        .args([
            "convert",
            "--html",
            html.to_str().unwrap(),
            "--image-url",
            "https://cdn.example/uploads/1-a.png",
            "--no-ai",
            "--date",
            "2024-05-01",
            "--out-dir",
            out_dir.to_str().unwrap(),
        ])
        .output()
        .expect("run cmspipe convert");
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("summary json");
    assert_eq!(v["success"], true);
    assert_eq!(v["file_name"], "test-artikel-titel.csv");
    assert_eq!(v["preview"]["title"], "Test Artikel Titel");
    assert_eq!(v["preview"]["category"], "Founders & Startups");
    assert_eq!(v["preview"]["reading_time"], "1 min");
    assert_eq!(v["field_sources"]["date"], "override");
    assert_eq!(v["field_sources"]["slug"], "fallback");

    let csv_path = out_dir.join("test-artikel-titel.csv");
    let raw = std::fs::read_to_string(&csv_path).unwrap();
    assert!(raw.starts_with("\"Title\",\"Slug\","));

    let (headers, row) = read_single_row(&csv_path);
    assert_eq!(headers.len(), 14);
    assert_eq!(headers[10], "Image:alt");
    assert_eq!(row[0], "Test Artikel Titel");
    assert_eq!(row[1], "test-artikel-titel");
    assert_eq!(row[7], "2024-05-01");
    assert_eq!(row[9], "https://cdn.example/uploads/1-a.png");
    assert!(row[12].contains("<strong>bold</strong>"));
    assert!(row[13].starts_with("<h2>Referenties</h2>"));
}

#[test]
fn metadata_json_and_flags_override_generated_fields() {
    let tmp = tempfile::tempdir().unwrap();
    let html = tmp.path().join("a.html");
    std::fs::write(&html, ARTICLE).unwrap();
    let meta = tmp.path().join("meta.json");
    std::fs::write(
        &meta,
        r#"{"metaTitle": "Uit JSON", "slug": "uit-json", "category": "Investeren in Nederlandse AI"}"#,
    )
    .unwrap();

    let out = cmspipe(&tmp.path().join("store"))
        .args([
            "convert",
            "--html",
            html.to_str().unwrap(),
            "--image-url",
            "https://cdn.example/a.png",
            "--no-ai",
            "--metadata-json",
            meta.to_str().unwrap(),
            "--slug",
            "van-de-vlag",
            "--out-dir",
            tmp.path().to_str().unwrap(),
        ])
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let (_, row) = read_single_row(&tmp.path().join("van-de-vlag.csv"));
    assert_eq!(row[1], "van-de-vlag");
    assert_eq!(row[2], "Uit JSON");
    assert_eq!(row[6], "Investeren in Nederlandse AI");
}

#[test]
fn slug_override_cannot_escape_out_dir() {
    let tmp = tempfile::tempdir().unwrap();
    let html = tmp.path().join("a.html");
    std::fs::write(&html, ARTICLE).unwrap();
    let out_dir = tmp.path().join("diep").join("out");

    let out = cmspipe(&tmp.path().join("store"))
        .args([
            "convert",
            "--html",
            html.to_str().unwrap(),
            "--image-url",
            "https://cdn.example/a.png",
            "--no-ai",
            "--slug",
            "../../Ontsnapt",
            "--out-dir",
            out_dir.to_str().unwrap(),
        ])
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["file_name"], "ontsnapt.csv");
    assert!(!tmp.path().join("Ontsnapt.csv").exists());
    let (_, row) = read_single_row(&out_dir.join("ontsnapt.csv"));
    assert_eq!(row[1], "ontsnapt");
}

#[test]
fn convert_with_image_file_uploads_first() {
    let tmp = tempfile::tempdir().unwrap();
    let html = tmp.path().join("a.html");
    std::fs::write(&html, ARTICLE).unwrap();
    let img = tmp.path().join("cover.png");
    std::fs::write(&img, b"\x89PNG\r\n\x1a\nrest").unwrap();
    let store = tmp.path().join("store");

    let out = cmspipe(&store)
        .env("CMSPIPE_PUBLIC_BASE_URL", "https://cdn.example")
        .args([
            "convert",
            "--html",
            html.to_str().unwrap(),
            "--image-file",
            img.to_str().unwrap(),
            "--no-ai",
            "--out-dir",
            tmp.path().to_str().unwrap(),
        ])
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let (_, row) = read_single_row(&tmp.path().join("test-artikel-titel.csv"));
    assert!(row[9].starts_with("https://cdn.example/uploads/"), "{}", row[9]);
    assert!(row[9].ends_with("-cover.png"));
    let stored: Vec<_> = std::fs::read_dir(store.join("uploads")).unwrap().collect();
    assert_eq!(stored.len(), 1);
}

#[test]
fn convert_requires_an_image_reference() {
    let tmp = tempfile::tempdir().unwrap();
    let html = tmp.path().join("a.html");
    std::fs::write(&html, ARTICLE).unwrap();
    cmspipe(&tmp.path().join("store"))
        .args(["convert", "--html", html.to_str().unwrap(), "--no-ai"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--image-url"));
}

#[test]
fn non_utf8_html_is_a_conversion_failure() {
    let tmp = tempfile::tempdir().unwrap();
    let html = tmp.path().join("a.html");
    std::fs::write(&html, b"<h1>\xff\xfe</h1>").unwrap();
    cmspipe(&tmp.path().join("store"))
        .args([
            "convert",
            "--html",
            html.to_str().unwrap(),
            "--image-url",
            "https://cdn.example/a.png",
            "--no-ai",
            "--out-dir",
            tmp.path().to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("conversion failed"));
}

#[test]
fn unknown_category_flag_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let html = tmp.path().join("a.html");
    std::fs::write(&html, ARTICLE).unwrap();
    cmspipe(&tmp.path().join("store"))
        .args([
            "convert",
            "--html",
            html.to_str().unwrap(),
            "--image-url",
            "u",
            "--category",
            "Sport",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown category"));
}

#[test]
fn upload_rejects_empty_file() {
    let tmp = tempfile::tempdir().unwrap();
    let empty = tmp.path().join("leeg.png");
    std::fs::write(&empty, b"").unwrap();
    cmspipe(&tmp.path().join("store"))
        .args(["upload", "--file", empty.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("upload failed"));
}

#[test]
fn upload_prints_public_address() {
    let tmp = tempfile::tempdir().unwrap();
    let img = tmp.path().join("foto.jpg");
    std::fs::write(&img, b"\xff\xd8\xff\xe0jpeg").unwrap();
    let out = cmspipe(&tmp.path().join("store"))
        .args(["upload", "--file", img.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let url = v["url"].as_str().unwrap();
    assert!(url.starts_with("file:///"), "{url}");
    assert!(url.ends_with("-foto.jpg"));
    assert_eq!(v["file_name"], "foto.jpg");
    assert_eq!(v["content_type"], "image/jpeg");
}
