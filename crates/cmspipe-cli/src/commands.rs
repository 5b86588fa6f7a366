use anyhow::{Context, Result};
use cmspipe_local::{csv_file_name, to_csv, upload_image, ConvertRequest, Converter, FsImageStore};
use std::path::Path;
use std::time::Duration;

use crate::ConvertCmd;

fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("cmspipe/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("build http client")
}

async fn store_image(path: &Path) -> Result<cmspipe_local::UploadedImage> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("read {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("image");
    let store = FsImageStore::from_env().context("upload failed")?;
    let up = upload_image(&store, file_name, &bytes)
        .await
        .inspect_err(|e| tracing::warn!(error = %e, file = %path.display(), "upload rejected"))
        .context("upload failed")?;
    tracing::info!(url = %up.url, "uploaded image");
    Ok(up)
}

pub async fn upload(path: &Path) -> Result<serde_json::Value> {
    let up = store_image(path).await?;
    Ok(serde_json::json!({
        "url": up.url,
        "file_name": up.file_name,
        "content_type": up.content_type,
    }))
}

pub async fn convert(args: ConvertCmd) -> Result<serde_json::Value> {
    let metadata = args.metadata()?;
    let html = tokio::fs::read(&args.html)
        .await
        .with_context(|| format!("read {}", args.html.display()))?;

    // No conversion without a resolved image address.
    let (image_url, uploaded_at) = match (&args.image_url, &args.image_file) {
        (Some(url), _) => (url.clone(), None),
        (None, Some(path)) => (store_image(path).await?.url, Some(chrono::Utc::now())),
        (None, None) => anyhow::bail!("one of --image-url or --image-file is required"),
    };

    let mut req = ConvertRequest::from_bytes(&html, image_url)
        .context("conversion failed")?
        .with_use_ai(!args.no_ai)
        .with_use_vision(!args.no_vision)
        .with_metadata(metadata);
    if let Some(at) = uploaded_at {
        req = req.with_uploaded_at(at);
    }

    let converter = Converter::from_env(http_client()?).context("conversion failed")?;
    let run = converter.convert_with_provenance(req);
    let (result, provenance) = match args.timeout_ms {
        Some(ms) => tokio::time::timeout(Duration::from_millis(ms), run)
            .await
            .map_err(|_| {
                tracing::warn!(timeout_ms = ms, "conversion timed out");
                anyhow::anyhow!("conversion timed out after {ms} ms")
            })?,
        None => run.await,
    }
    .context("conversion failed")?;

    let csv = to_csv(&result).context("conversion failed")?;
    tokio::fs::create_dir_all(&args.out_dir)
        .await
        .with_context(|| format!("create {}", args.out_dir.display()))?;
    let file_name = csv_file_name(&result);
    let csv_path = args.out_dir.join(&file_name);
    tokio::fs::write(&csv_path, csv)
        .await
        .with_context(|| format!("write {}", csv_path.display()))?;
    tracing::info!(path = %csv_path.display(), slug = %result.slug, "wrote csv");

    Ok(serde_json::json!({
        "success": true,
        "file_name": file_name,
        "csv_path": csv_path.display().to_string(),
        "preview": {
            "title": result.title,
            "category": result.category,
            "reading_time": result.reading_time,
        },
        "field_sources": provenance,
    }))
}

pub fn doctor() -> serde_json::Value {
    serde_json::json!({
        "schema_version": 1,
        "kind": "doctor",
        "ok": true,
        "name": "cmspipe",
        "version": env!("CARGO_PKG_VERSION"),
        "configured": cmspipe_local::config::report(),
    })
}

pub fn doctor_text(v: &serde_json::Value) -> String {
    let c = &v["configured"];
    let yes_no = |b: bool| if b { "yes" } else { "no" };
    [
        format!("cmspipe {}", v["version"].as_str().unwrap_or("")),
        format!(
            "ai: {} (model: {}, vision: {})",
            yes_no(c["ai_configured"].as_bool().unwrap_or(false)),
            c["llm_model"].as_str().unwrap_or("-"),
            c["vision_model"].as_str().unwrap_or("-"),
        ),
        format!("api key set: {}", yes_no(c["llm_api_key_set"].as_bool().unwrap_or(false))),
        format!("store dir: {}", c["store_dir"].as_str().unwrap_or("")),
    ]
    .join("\n")
}
