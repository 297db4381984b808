//! End-to-end runs of the pipeline against the real `image` backend and
//! local disk.
//!
//! Run with: cargo test --test pipeline

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use image::{ImageFormat, Rgb, RgbImage};
use media_pipeline::cdn::{FlushStatus, Server};
use media_pipeline::config::{AdapterConfig, MediaConfig};
use media_pipeline::filesystem::{Filesystem, LocalAdapter};
use media_pipeline::format::FormatSettings;
use media_pipeline::generator::IdGenerator;
use media_pipeline::imaging::{Mode, RustBackend};
use media_pipeline::media::{InMemoryMediaManager, Media, ProviderStatus};
use media_pipeline::metadata::NoopMetadataBuilder;
use media_pipeline::pool::{Pool, PoolError};
use media_pipeline::provider::{DEFAULT_IMAGE_EXTENSIONS, ImageProvider, MediaProvider};
use media_pipeline::resizer::SimpleResizer;
use media_pipeline::thumbnail::{
    ChannelBus, FormatThumbnail, GenerateThumbnailsHandler, MessengerThumbnail, Thumbnail,
    WorkerStats, run_worker,
};
use tempfile::TempDir;

fn encoded(width: u32, height: u32, shade: u8, format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, shade])
    });
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, format).unwrap();
    buffer.into_inner()
}

fn png(width: u32, height: u32, shade: u8) -> Vec<u8> {
    encoded(width, height, shade, ImageFormat::Png)
}

fn dimensions_of(path: &Path) -> (u32, u32) {
    let img = image::load_from_memory(&std::fs::read(path).unwrap()).unwrap();
    (img.width(), img.height())
}

fn local_config(root: &Path) -> MediaConfig {
    let mut config = MediaConfig::default();
    config.filesystem.primary = AdapterConfig {
        directory: Some(root.to_path_buf()),
        ..AdapterConfig::default()
    };
    config
}

fn ingest(provider: &dyn MediaProvider, id: &str, bytes: Vec<u8>) -> Media {
    let mut media = Media::new(id, "default", "image").with_upload("photo.png", bytes);
    provider.transform(&mut media).unwrap();
    provider.post_persist(&mut media).unwrap();
    media
}

#[test]
fn ingest_writes_original_and_resized_formats() {
    let tmp = TempDir::new().unwrap();
    let pool = local_config(tmp.path())
        .build_pool(Arc::new(RustBackend::new()))
        .unwrap();
    let provider = pool.get_provider("image").unwrap();

    let media = ingest(provider.as_ref(), "1", png(800, 600, 10));

    assert_eq!(media.provider_status, ProviderStatus::Ok);
    assert_eq!(media.content_type.as_deref(), Some("image/png"));
    let dir = tmp.path().join("default/0001/01");
    assert!(dir.join(media.provider_reference.as_deref().unwrap()).is_file());
    assert_eq!(dimensions_of(&dir.join("thumb_1_default_small.png")), (100, 75));
    assert_eq!(dimensions_of(&dir.join("thumb_1_default_big.png")), (500, 375));
    assert_eq!(dimensions_of(&dir.join("thumb_1_admin.png")), (200, 150));

    assert_eq!(
        provider.generate_public_url(&media, "default_small").unwrap(),
        "/uploads/media/default/0001/01/thumb_1_default_small.png"
    );
}

#[test]
fn every_default_extension_is_ingested() {
    for extension in DEFAULT_IMAGE_EXTENSIONS {
        let tmp = TempDir::new().unwrap();
        let pool = local_config(tmp.path())
            .build_pool(Arc::new(RustBackend::new()))
            .unwrap();
        let provider = pool.get_provider("image").unwrap();
        let format = ImageFormat::from_extension(extension).unwrap();

        let mut media = Media::new("8", "default", "image")
            .with_upload(format!("photo.{extension}"), encoded(300, 200, 90, format));
        provider.transform(&mut media).unwrap();
        provider.post_persist(&mut media).unwrap();

        assert_eq!(media.provider_status, ProviderStatus::Ok, "{extension}");
        assert_eq!(provider.filesystem().keys().unwrap().len(), 4, "{extension}");
    }
}

#[test]
fn crop_format_produces_exact_box() {
    let tmp = TempDir::new().unwrap();
    let mut config = local_config(tmp.path());
    config.contexts.get_mut("default").unwrap().formats.insert(
        "wide".into(),
        FormatSettings {
            resizer: Some("crop".into()),
            ..FormatSettings::with_size(Some(300), Some(100))
        },
    );
    let pool = config.build_pool(Arc::new(RustBackend::new())).unwrap();
    let provider = pool.get_provider("image").unwrap();

    ingest(provider.as_ref(), "7", png(800, 600, 20));

    let wide = tmp.path().join("default/0001/01/thumb_7_default_wide.png");
    assert_eq!(dimensions_of(&wide), (300, 100));
}

#[test]
fn update_replaces_original_and_requests_flush() {
    let tmp = TempDir::new().unwrap();
    let pool = local_config(tmp.path())
        .build_pool(Arc::new(RustBackend::new()))
        .unwrap();
    let provider = pool.get_provider("image").unwrap();
    let mut media = ingest(provider.as_ref(), "2", png(800, 600, 30));
    let old = tmp
        .path()
        .join("default/0001/01")
        .join(media.provider_reference.clone().unwrap());

    media.binary_content = Some(png(400, 400, 40));
    provider.post_update(&mut media).unwrap();

    assert!(!old.exists());
    assert!(media.cdn_is_flushable);
    assert_eq!(media.cdn_status, Some(FlushStatus::ToFlush));
    let small = tmp.path().join("default/0001/01/thumb_2_default_small.png");
    assert_eq!(dimensions_of(&small), (100, 100));

    provider.remove(&media).unwrap();
    assert!(!small.exists());
    assert!(provider.filesystem().keys().unwrap().is_empty());
}

#[test]
fn secondary_filesystem_receives_every_file() {
    let primary = TempDir::new().unwrap();
    let secondary = TempDir::new().unwrap();
    let mut config = local_config(primary.path());
    config.filesystem.secondary = Some(AdapterConfig {
        directory: Some(secondary.path().to_path_buf()),
        ..AdapterConfig::default()
    });
    let pool = config.build_pool(Arc::new(RustBackend::new())).unwrap();
    let provider = pool.get_provider("image").unwrap();

    ingest(provider.as_ref(), "3", png(640, 480, 50));

    let small = secondary.path().join("default/0001/01/thumb_3_default_small.png");
    assert_eq!(dimensions_of(&small), (100, 75));
    assert_eq!(
        walkdir::WalkDir::new(secondary.path())
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .count(),
        4
    );
}

#[test]
fn small_uploads_are_rejected() {
    let tmp = TempDir::new().unwrap();
    let pool = local_config(tmp.path())
        .build_pool(Arc::new(RustBackend::new()))
        .unwrap();
    let provider = pool.get_provider("image").unwrap();

    let mut media = Media::new("4", "default", "image").with_upload("tiny.png", png(50, 50, 60));
    provider.transform(&mut media).unwrap();
    assert!(matches!(
        pool.validate_upload_dimensions(&media),
        Err(PoolError::UploadTooSmall { .. })
    ));
}

fn local_provider(root: &Path, thumbnail: Arc<dyn Thumbnail>) -> ImageProvider {
    let backend = Arc::new(RustBackend::new());
    let filesystem = Arc::new(Filesystem::new(Arc::new(LocalAdapter::new(root, true).unwrap())));
    let mut provider = ImageProvider::new(
        "image",
        filesystem,
        Arc::new(Server::new("/uploads/media")),
        Arc::new(IdGenerator::default()),
        thumbnail,
        backend.clone(),
    )
    .with_resizer(Arc::new(SimpleResizer::new(
        backend,
        Arc::new(NoopMetadataBuilder),
        Mode::Inset,
    )));
    provider
        .add_format("default_small", FormatSettings::with_size(Some(120), None))
        .unwrap();
    provider
}

#[test]
fn queued_generation_runs_in_worker() {
    let tmp = TempDir::new().unwrap();
    let (bus, receiver) = ChannelBus::new();
    let synchronous = Arc::new(FormatThumbnail::default());

    let web = local_provider(
        tmp.path(),
        Arc::new(MessengerThumbnail::new(synchronous.clone(), Arc::new(bus))),
    );
    let media = ingest(&web, "5", png(600, 300, 70));
    let small = tmp.path().join("default/0001/01/thumb_5_default_small.png");
    assert!(!small.exists());

    let mut pool = Pool::new("default");
    pool.add_provider("image", Arc::new(local_provider(tmp.path(), synchronous.clone())));
    let manager = Arc::new(InMemoryMediaManager::new());
    manager.save(&media);
    let handler = GenerateThumbnailsHandler::new(synchronous, manager, Arc::new(pool));

    // The web provider owns the only sender.
    drop(web);
    let stats = run_worker(receiver, &handler);

    assert_eq!(stats, WorkerStats { handled: 1, failed: 0 });
    assert_eq!(dimensions_of(&small), (120, 60));
}
