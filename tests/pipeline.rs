//! End-to-end saves and deletes against real files and the pure-Rust backend.

use image::{ImageEncoder, RgbImage};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use upload_pipeline::config::UploadConfig;
use upload_pipeline::handler::ImagePolicy;
use upload_pipeline::imaging::Size;
use upload_pipeline::pipeline::UploadPipeline;
use upload_pipeline::record::{Attributes, MemoryRecord};
use upload_pipeline::steps::{CleanupAction, Step};
use upload_pipeline::upload::UploadedFile;

fn create_jpeg(path: &Path, width: u32, height: u32) {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 200])
    });
    let file = std::fs::File::create(path).unwrap();
    image::codecs::jpeg::JpegEncoder::new(std::io::BufWriter::new(file))
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
}

fn stage(tmp: &TempDir, client_name: &str, size: u32) -> UploadedFile {
    let staged = tmp.path().join("staging").join("upload.tmp");
    std::fs::create_dir_all(staged.parent().unwrap()).unwrap();
    create_jpeg(&staged, size, size);
    UploadedFile::new(staged, client_name)
}

fn sorted_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Everything under `root` except the staging directory.
fn written_paths(root: &Path) -> Vec<PathBuf> {
    fn walk(dir: &Path, out: &mut Vec<PathBuf>) {
        for entry in std::fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.ends_with("staging") {
                continue;
            }
            out.push(path.clone());
            if path.is_dir() {
                walk(&path, out);
            }
        }
    }
    let mut out = Vec::new();
    walk(root, &mut out);
    out
}

/// Copy step plus the 400x400 / 100x100 thumbnail / original image step.
fn two_step_config(tmp: &TempDir) -> UploadConfig {
    let toml = format!(
        r#"
[aliases]
webroot = "{root}"

[[steps]]
path = "@webroot/uploads/{{id}}"

[[steps]]
path = "@webroot/images/{{id}}//"
[steps.policy]
size = [400, 400]
quality = 80
thumbnail_size = [100, 100]
thumbnail_quality = 70
save_original = true
"#,
        root = tmp.path().display()
    );
    toml::from_str(&toml).unwrap()
}

fn insert(pipeline: &UploadPipeline, upload: &UploadedFile, id: &str) -> MemoryRecord {
    let mut record = MemoryRecord::new("insert");
    let prepared = pipeline.before_save(&mut record, Some(upload));
    record.attributes.insert("id".to_string(), id.to_string());
    pipeline.after_insert(&record, prepared.as_ref()).unwrap();
    record.is_new = false;
    record
}

#[test]
fn no_upload_writes_nothing_and_keeps_storage_attribute() {
    let tmp = TempDir::new().unwrap();
    let pipeline = UploadPipeline::new(two_step_config(&tmp)).unwrap();
    let mut record = MemoryRecord::new("insert")
        .with_attribute("id", "1")
        .with_attribute("filename", "kept.jpg");

    let prepared = pipeline.before_save(&mut record, None);
    let report = pipeline.after_insert(&record, prepared.as_ref()).unwrap();

    assert!(!report.processed());
    assert_eq!(record.get("filename"), Some("kept.jpg"));
    assert!(written_paths(tmp.path()).is_empty());
}

#[test]
fn scenario_outside_allowed_set_writes_nothing() {
    let tmp = TempDir::new().unwrap();
    let pipeline = UploadPipeline::new(two_step_config(&tmp)).unwrap();
    let upload = stage(&tmp, "photo.jpg", 50);
    let mut record = MemoryRecord::new("search").with_attribute("id", "1");

    let prepared = pipeline.before_save(&mut record, Some(&upload));
    let report = pipeline.after_insert(&record, prepared.as_ref()).unwrap();

    assert!(prepared.is_none());
    assert!(!report.processed());
    assert!(written_paths(tmp.path()).is_empty());
}

#[test]
fn copy_resize_thumbnail_and_original() {
    let tmp = TempDir::new().unwrap();
    let pipeline = UploadPipeline::new(two_step_config(&tmp)).unwrap();
    let upload = stage(&tmp, "photo.jpg", 500);

    let record = insert(&pipeline, &upload, "42");
    let name = record.get("filename").unwrap().to_string();
    assert!(name.starts_with("photo_") && name.ends_with(".jpg"), "{name}");

    let uploads = tmp.path().join("uploads/42");
    assert_eq!(sorted_entries(&uploads), vec![name.clone()]);
    assert_eq!(
        std::fs::read(uploads.join(&name)).unwrap(),
        std::fs::read(upload.temp_path()).unwrap()
    );

    let images = tmp.path().join("images/42");
    assert_eq!(
        sorted_entries(&images),
        vec![
            format!("original_{name}"),
            name.clone(),
            format!("thumb_{name}"),
        ]
    );
    assert_eq!(image::image_dimensions(images.join(&name)).unwrap(), (400, 400));
    assert_eq!(
        image::image_dimensions(images.join(format!("thumb_{name}"))).unwrap(),
        (100, 100)
    );
    assert_eq!(
        std::fs::read(images.join(format!("original_{name}"))).unwrap(),
        std::fs::read(upload.temp_path()).unwrap()
    );
}

#[test]
fn delete_removes_every_step_directory() {
    let tmp = TempDir::new().unwrap();
    let pipeline = UploadPipeline::new(two_step_config(&tmp)).unwrap();
    let upload = stage(&tmp, "photo.jpg", 120);
    let record = insert(&pipeline, &upload, "7");
    assert!(tmp.path().join("uploads/7").is_dir());

    let report = pipeline.after_delete(&record).unwrap();

    assert!(
        report
            .directories
            .iter()
            .all(|d| d.action == CleanupAction::Removed)
    );
    assert!(!tmp.path().join("uploads/7").exists());
    assert!(!tmp.path().join("images/7").exists());
}

#[test]
fn delete_never_removes_the_filesystem_root() {
    let tmp = TempDir::new().unwrap();
    let kept = tmp.path().join("kept");
    std::fs::create_dir_all(&kept).unwrap();
    let steps = vec![
        Step::copy("/"),
        Step::copy(upload_pipeline::paths::PathExpr::dynamic(|_: &Attributes| {
            "/".to_string()
        })),
        Step::copy(kept.to_string_lossy().into_owned()),
    ];
    let pipeline = UploadPipeline::with_steps(UploadConfig::default(), steps).unwrap();

    let report = pipeline
        .after_delete(&MemoryRecord::existing("delete"))
        .unwrap();

    let actions: Vec<CleanupAction> = report.directories.iter().map(|d| d.action).collect();
    assert_eq!(
        actions,
        vec![
            CleanupAction::RefusedRoot,
            CleanupAction::RefusedRoot,
            CleanupAction::Removed,
        ]
    );
    assert!(Path::new("/").is_dir());
    assert!(!kept.exists());
}

#[test]
fn clean_on_update_leaves_no_previous_files() {
    let tmp = TempDir::new().unwrap();
    let config = UploadConfig {
        clean_on_update: true,
        ..two_step_config(&tmp)
    };
    let pipeline = UploadPipeline::new(config).unwrap();

    let first = stage(&tmp, "first.jpg", 300);
    let mut record = insert(&pipeline, &first, "9");
    let old_name = record.get("filename").unwrap().to_string();

    let second = stage(&tmp, "second.jpg", 300);
    record.scenario = "update".to_string();
    let prepared = pipeline.before_save(&mut record, Some(&second));
    let report = pipeline.after_update(&record, prepared.as_ref()).unwrap();
    let new_name = record.get("filename").unwrap().to_string();

    assert_ne!(old_name, new_name);
    assert!(report.steps.iter().all(|s| s.cleaned));
    assert_eq!(
        sorted_entries(&tmp.path().join("uploads/9")),
        vec![new_name.clone()]
    );
    assert!(
        sorted_entries(&tmp.path().join("images/9"))
            .iter()
            .all(|f| f.ends_with(&new_name))
    );
}

#[test]
fn repeated_updates_with_fixed_name_are_idempotent() {
    let tmp = TempDir::new().unwrap();
    let config = UploadConfig {
        clean_on_update: true,
        fixed_name: Some("cover".to_string()),
        ..two_step_config(&tmp)
    };
    let pipeline = UploadPipeline::new(config).unwrap();
    let upload = stage(&tmp, "photo.jpg", 200);

    let mut record = MemoryRecord::existing("update").with_attribute("id", "3");
    let mut snapshots = Vec::new();
    for _ in 0..2 {
        let prepared = pipeline.before_save(&mut record, Some(&upload));
        pipeline.after_update(&record, prepared.as_ref()).unwrap();
        snapshots.push((
            sorted_entries(&tmp.path().join("uploads/3")),
            sorted_entries(&tmp.path().join("images/3")),
        ));
    }

    assert_eq!(snapshots[0], snapshots[1]);
    assert_eq!(snapshots[0].0, vec!["cover.jpg"]);
    assert_eq!(
        snapshots[0].1,
        vec!["cover.jpg", "original_cover.jpg", "thumb_cover.jpg"]
    );
}

#[test]
fn unencodable_extension_fails_before_writing_the_step() {
    let tmp = TempDir::new().unwrap();
    let steps = vec![Step::with_policy(
        format!("{}/img", tmp.path().display()),
        ImagePolicy::new(Size::new(10, 10), 80),
    )];
    let pipeline = UploadPipeline::with_steps(UploadConfig::default(), steps).unwrap();
    let upload = stage(&tmp, "scan.bmp", 20);

    let mut record = MemoryRecord::new("insert");
    let prepared = pipeline.before_save(&mut record, Some(&upload));
    let err = pipeline
        .after_insert(&record, prepared.as_ref())
        .unwrap_err();

    assert!(err.to_string().contains("image support unavailable"), "{err}");
    assert!(sorted_entries(&tmp.path().join("img")).is_empty());
}
