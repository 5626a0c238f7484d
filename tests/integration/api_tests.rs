//! HTTP API integration tests.
//!
//! These drive the full router over real PNG files and mock `.mock` images.

use axum::http::{header, StatusCode};

use pyramid_tiles::{DimensionExtents, FrameAddress};

use super::test_utils::{
    deep_pixel, is_valid_jpeg, mock_pixel, png_pixel, touch, write_png, write_png16, MockDecoder,
    TestServer, ASSOCIATED_PIXEL,
};

const FILL: u8 = 255;

/// A directory with one 300x200 PNG, a nested PNG and a file that must not be served.
fn png_server() -> TestServer {
    let dir = tempfile::tempdir().unwrap();
    write_png(dir.path(), "photo.png", 300, 200);
    write_png(dir.path(), "case1/scan.png", 64, 32);
    touch(dir.path(), "notes.txt");
    TestServer::new(dir, MockDecoder::new(1, 1), 4)
}

/// A directory with a large mock image: 50000x40000, 10 native levels, 256 tiles.
fn mock_server() -> TestServer {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "big.mock");
    let mock = MockDecoder::new(50000, 40000)
        .with_levels(10)
        .with_tile_hint(256);
    TestServer::new(dir, mock, 4)
}

// =============================================================================
// Health and Listing
// =============================================================================

#[tokio::test]
async fn test_health() {
    let server = png_server();
    let (status, json) = server.get_json("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_images_listing() {
    let server = png_server();
    let (status, json) = server.get_json("/images").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json["images"],
        serde_json::json!(["case1/scan.png", "photo.png"])
    );
}

// =============================================================================
// Metadata
// =============================================================================

#[tokio::test]
async fn test_png_metadata() {
    let server = png_server();
    let (status, json) = server.get_json("/images/photo.png/metadata").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["sizeX"], 300);
    assert_eq!(json["sizeY"], 200);
    assert_eq!(json["tileWidth"], 300);
    assert_eq!(json["tileHeight"], 200);
    assert_eq!(json["levels"], 1);
    assert_eq!(json["nativeResolutionCount"], 1);
    assert_eq!(json["externalMaxLevel"], 9);
    assert_eq!(json["bandCount"], 3);
    assert_eq!(json["dtype"], "uint8");
}

#[tokio::test]
async fn test_metadata_without_extension() {
    let server = png_server();
    let (status, json) = server.get_json("/images/photo/metadata").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["sizeX"], 300);
}

#[tokio::test]
async fn test_nested_image_id() {
    let server = png_server();
    let (status, json) = server.get_json("/images/case1%2Fscan.png/metadata").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["sizeX"], 64);
    assert_eq!(json["sizeY"], 32);
}

#[tokio::test]
async fn test_large_mock_metadata() {
    let server = mock_server();
    let (status, json) = server.get_json("/images/big.mock/metadata").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["sizeX"], 50000);
    assert_eq!(json["sizeY"], 40000);
    assert_eq!(json["tileWidth"], 256);
    assert_eq!(json["tileHeight"], 256);
    assert_eq!(json["levels"], 9);
    assert_eq!(json["nativeResolutionCount"], 10);
    assert_eq!(json["externalMaxLevel"], 16);
    assert_eq!(json["bandCount"], 1);
}

#[tokio::test]
async fn test_multi_frame_metadata() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "stack.mock");
    let mock = MockDecoder::new(600, 400).with_extents(DimensionExtents::new(3, 1, 1));
    let server = TestServer::new(dir, mock, 4);

    let (status, json) = server.get_json("/images/stack.mock/metadata").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["sizeC"], 3);
    assert_eq!(json["frames"].as_array().unwrap().len(), 3);
    assert_eq!(json["frames"][2]["IndexC"], 2);
}

// =============================================================================
// Tiles
// =============================================================================

#[tokio::test]
async fn test_png_tile_is_lossless() {
    let server = png_server();
    let (status, headers, body) = server.get("/tiles/photo.png/0/0/0.png").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "image/png");
    assert_eq!(headers[header::CACHE_CONTROL], "public, max-age=3600");

    let tile = image::load_from_memory(&body).unwrap().to_rgb8();
    assert_eq!(tile.dimensions(), (300, 200));
    for (x, y) in [(0, 0), (17, 3), (150, 100), (299, 199)] {
        assert_eq!(*tile.get_pixel(x, y), png_pixel(x, y), "pixel ({x}, {y})");
    }
}

#[tokio::test]
async fn test_jpeg_tile_default_quality() {
    let server = png_server();
    let (status, headers, body) = server.get("/tiles/photo.png/0/0/0").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "image/jpeg");
    assert_eq!(headers["x-tile-quality"], "85");
    assert!(is_valid_jpeg(&body));
}

#[tokio::test]
async fn test_jpeg_tile_custom_quality() {
    let server = png_server();
    let (status, headers, body) = server.get("/tiles/photo.png/0/0/0.jpg?quality=50").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["x-tile-quality"], "50");
    assert!(is_valid_jpeg(&body));
}

#[tokio::test]
async fn test_invalid_quality() {
    let server = png_server();
    let (status, _, body) = server.get("/tiles/photo.png/0/0/0.jpg?quality=0").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "invalid_quality");
}

#[tokio::test]
async fn test_missing_image() {
    let server = png_server();
    let (status, _, body) = server.get("/tiles/missing.png/0/0/0.jpg").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "not_found");
    assert_eq!(json["status"], 404);
}

#[tokio::test]
async fn test_tile_outside_grid() {
    let server = png_server();

    let (status, _, body) = server.get("/tiles/photo.png/0/1/0.jpg").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "address_out_of_range");

    let (status, _, _) = server.get("/tiles/photo.png/1/0/0.jpg").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_disallowed_extension() {
    let server = png_server();
    let (status, _, body) = server.get("/tiles/notes.txt/0/0/0.jpg").await;

    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "unsupported_resource");
}

#[tokio::test]
async fn test_unknown_tile_format() {
    let server = png_server();
    let (status, _, _) = server.get("/tiles/photo.png/0/0/0.gif").await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn test_invalid_style() {
    let server = png_server();
    let (status, _, body) = server.get("/tiles/photo.png/0/0/0.png?style=nope").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "invalid_style");
}

#[tokio::test]
async fn test_path_traversal_is_not_found() {
    let server = png_server();
    let (status, _, _) = server.get("/images/..%2Fphoto.png/metadata").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_full_resolution_raw_tile() {
    let server = mock_server();
    let (status, headers, body) = server.get("/tiles/big.mock/8/0/0.raw").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "application/octet-stream");
    assert_eq!(body.len(), 256 * 256);

    let plane = FrameAddress::default();
    for (x, y) in [(0u64, 0u64), (255, 0), (13, 200), (255, 255)] {
        assert_eq!(body[(y * 256 + x) as usize], mock_pixel(x, y, plane));
    }
}

#[tokio::test]
async fn test_edge_tile_is_padded() {
    let server = mock_server();
    // Last column of tiles starts at 49920, leaving 80 image columns.
    let (status, _, body) = server.get("/tiles/big.mock/8/195/0.raw").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.len(), 256 * 256);

    let plane = FrameAddress::default();
    assert_eq!(body[0], mock_pixel(49920, 0, plane));
    assert_eq!(body[79], mock_pixel(49999, 0, plane));
    assert_eq!(body[80], FILL);
    assert_eq!(body[255], FILL);

    let (status, _, _) = server.get("/tiles/big.mock/8/196/0.raw").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_coarsest_tile_reads_native_level() {
    let server = mock_server();
    let (status, _, body) = server.get("/tiles/big.mock/0/0/0.raw").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.len(), 256 * 256);

    // Native level 8 is 195x156; each of its pixels covers 256x256 source pixels.
    let plane = FrameAddress::default();
    assert_eq!(body[1], mock_pixel(256, 0, plane));
    assert_eq!(body[194], mock_pixel(194 * 256, 0, plane));
    assert_eq!(body[195], FILL);
    assert_eq!(body[155 * 256], mock_pixel(0, 155 * 256, plane));
    assert_eq!(body[156 * 256], FILL);
}

#[tokio::test]
async fn test_frame_selects_plane() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "stack.mock");
    let mock = MockDecoder::new(600, 400).with_extents(DimensionExtents::new(3, 1, 1));
    let server = TestServer::new(dir, mock, 4);

    let (_, _, first) = server.get("/tiles/stack.mock/0/0/0.raw").await;
    let (_, _, second) = server.get("/tiles/stack.mock/0/0/0.raw?frame=1").await;
    let (_, _, wrapped) = server.get("/tiles/stack.mock/0/0/0.raw?frame=4").await;

    assert_eq!(first[0], mock_pixel(0, 0, FrameAddress::new(0, 0, 0)));
    assert_eq!(second[0], mock_pixel(0, 0, FrameAddress::new(1, 0, 0)));
    assert_ne!(first, second);
    assert_eq!(second, wrapped);
}

// =============================================================================
// Deep Zoom
// =============================================================================

#[tokio::test]
async fn test_dzi_descriptor() {
    let server = png_server();
    let (status, headers, body) = server.get("/deepzoom/photo.png.dzi").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "application/xml");

    let xml = String::from_utf8(body.to_vec()).unwrap();
    assert!(xml.contains(r#"TileSize="300""#));
    assert!(xml.contains(r#"Overlap="0""#));
    assert!(xml.contains(r#"Format="jpg""#));
    assert!(xml.contains(r#"<Size Width="300" Height="200" />"#));
}

#[tokio::test]
async fn test_dzi_descriptor_missing_image() {
    let server = png_server();
    let (status, _, _) = server.get("/deepzoom/missing.png.dzi").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_dzi_info() {
    let server = png_server();
    let (status, json) = server.get_json("/deepzoom/photo.png/info").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["width"], 300);
    assert_eq!(json["tileSize"], 300);
    assert_eq!(json["maxLevel"], 9);
    assert_eq!(json["levelOffset"], 9);
    assert_eq!(json["levels"], 1);
}

#[tokio::test]
async fn test_dzi_levels_clamp_to_pyramid() {
    let server = png_server();

    let (status, _, full) = server.get("/deepzoom/photo.png_files/9/0_0.png").await;
    assert_eq!(status, StatusCode::OK);

    // Levels coarser than the single canonical tile are served from it.
    let (status, _, coarse) = server.get("/deepzoom/photo.png_files/3/0_0.png").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(full, coarse);

    // So are levels past full resolution.
    let (status, _, fine) = server.get("/deepzoom/photo.png_files/12/0_0.png").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(full, fine);
}

#[tokio::test]
async fn test_dzi_tile_outside_grid() {
    let server = png_server();
    let (status, _, _) = server.get("/deepzoom/photo.png_files/9/1_0.png").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = server.get("/deepzoom/photo.png_files/9/bad.png").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_dzi_tile_maps_to_canonical_level() {
    let server = mock_server();

    // levelOffset is 16 - 8 = 8, so DZI level 8 is canonical level 0.
    let (_, _, dzi) = server.get("/deepzoom/big.mock_files/8/0_0.raw").await;
    let (_, _, canonical) = server.get("/tiles/big.mock/0/0/0.raw").await;
    assert_eq!(dzi, canonical);

    let (_, _, dzi) = server.get("/deepzoom/big.mock_files/16/3_2.raw").await;
    let (_, _, canonical) = server.get("/tiles/big.mock/8/3/2.raw").await;
    assert_eq!(dzi, canonical);
}

#[tokio::test]
async fn test_dzi_format_parameter() {
    let server = png_server();

    let (status, _, body) = server.get("/deepzoom/photo.png.dzi?format=png").await;
    assert_eq!(status, StatusCode::OK);
    let xml = String::from_utf8(body.to_vec()).unwrap();
    assert!(xml.contains(r#"Format="png""#));

    let (status, json) = server.get_json("/deepzoom/photo.png/info?format=png").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["format"], "png");

    let (status, _, _) = server.get("/deepzoom/photo.png.dzi?format=gif").await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn test_dzi_tiles_are_square_for_rectangular_tiles() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "wide.mock");
    let mock = MockDecoder::new(5000, 3000).with_rect_tile_hint(512, 256);
    let server = TestServer::new(dir, mock, 4);

    let (_, json) = server.get_json("/deepzoom/wide.mock/info").await;
    assert_eq!(json["tileSize"], 512);
    assert_eq!(json["maxLevel"], 13);

    // Row 1 of 512 pixel viewer tiles spans rows 2 and 3 of the 256 pixel tiles
    let (status, _, body) = server.get("/deepzoom/wide.mock_files/13/0_1.raw").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.len(), 512 * 512);
    let plane = FrameAddress::default();
    assert_eq!(body[0], mock_pixel(0, 512, plane));
    assert_eq!(body[511 * 512 + 511], mock_pixel(511, 1023, plane));

    let (status, _, _) = server.get("/deepzoom/wide.mock_files/13/0_5.raw").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _, _) = server.get("/deepzoom/wide.mock_files/13/0_6.raw").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Sample Conversion
// =============================================================================

/// A directory with a 300x200 single channel 16-bit PNG.
fn deep_server() -> TestServer {
    let dir = tempfile::tempdir().unwrap();
    write_png16(dir.path(), "deep.png", 300, 200);
    TestServer::new(dir, MockDecoder::new(1, 1), 4)
}

#[tokio::test]
async fn test_16_bit_image_as_jpeg() {
    let server = deep_server();

    for uri in ["/tiles/deep.png/0/0/0", "/deepzoom/deep.png_files/9/0_0.jpg"] {
        let (status, headers, body) = server.get(uri).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(headers[header::CONTENT_TYPE], "image/jpeg");
        assert!(is_valid_jpeg(&body));

        let tile = image::load_from_memory(&body).unwrap().to_luma8();
        assert_eq!(tile.width(), 300);
        for x in [20, 150, 280] {
            let expected = (deep_pixel(x) >> 8) as i32;
            let actual = tile.get_pixel(x, 100)[0] as i32;
            assert!((actual - expected).abs() <= 6, "{uri} x={x}: {actual} vs {expected}");
        }
    }
}

#[tokio::test]
async fn test_16_bit_image_as_png_keeps_depth() {
    let server = deep_server();
    let (status, _, body) = server.get("/tiles/deep.png/0/0/0.png").await;
    assert_eq!(status, StatusCode::OK);

    let tile = image::load_from_memory(&body).unwrap();
    let tile = tile.as_luma16().unwrap();
    assert_eq!(tile.get_pixel(123, 45)[0], deep_pixel(123));
}

// =============================================================================
// Thumbnails and Regions
// =============================================================================

#[tokio::test]
async fn test_thumbnail_keeps_aspect_ratio() {
    let server = png_server();

    let (status, headers, body) = server.get("/thumbnail/photo.png?width=100&encoding=PNG").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "image/png");
    let thumbnail = image::load_from_memory(&body).unwrap().to_rgb8();
    assert_eq!(thumbnail.dimensions(), (100, 67));
    // Nearest neighbor: x * 300 / 100, y * 200 / 67
    assert_eq!(*thumbnail.get_pixel(10, 10), png_pixel(30, 29));

    let (status, _, body) = server.get("/thumbnail/photo.png").await;
    assert_eq!(status, StatusCode::OK);
    assert!(is_valid_jpeg(&body));
    let thumbnail = image::load_from_memory(&body).unwrap();
    assert_eq!((thumbnail.width(), thumbnail.height()), (256, 171));
}

#[tokio::test]
async fn test_thumbnail_never_enlarges() {
    let server = png_server();
    let (status, _, body) = server.get("/thumbnail/case1%2Fscan.png?encoding=png").await;
    assert_eq!(status, StatusCode::OK);
    let thumbnail = image::load_from_memory(&body).unwrap();
    assert_eq!((thumbnail.width(), thumbnail.height()), (64, 32));
}

#[tokio::test]
async fn test_thumbnail_of_large_image() {
    let server = mock_server();
    let (status, _, body) = server.get("/thumbnail/big.mock?encoding=raw").await;
    assert_eq!(status, StatusCode::OK);
    // 50000x40000 fitted in 256x256
    assert_eq!(body.len(), 256 * 205);
}

#[tokio::test]
async fn test_thumbnail_bounds_validated() {
    let server = png_server();
    for uri in [
        "/thumbnail/photo.png?width=0",
        "/thumbnail/photo.png?height=5000",
    ] {
        let (status, json) = server.get_json(uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(json["error"], "invalid_region");
    }

    let (status, _, _) = server.get("/thumbnail/photo.png?encoding=TIFF").await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn test_region_is_exact_crop() {
    let server = png_server();
    let (status, _, body) = server
        .get("/region/photo.png?left=10&top=20&width=30&height=40&encoding=PNG")
        .await;
    assert_eq!(status, StatusCode::OK);

    let region = image::load_from_memory(&body).unwrap().to_rgb8();
    assert_eq!(region.dimensions(), (30, 40));
    for (x, y) in [(0, 0), (29, 0), (5, 17), (29, 39)] {
        assert_eq!(*region.get_pixel(x, y), png_pixel(10 + x, 20 + y), "pixel ({x}, {y})");
    }
}

#[tokio::test]
async fn test_region_edges_clip_to_image() {
    let server = png_server();
    let (status, _, body) = server
        .get("/region/photo.png?left=290&top=190&right=400&bottom=400&encoding=png")
        .await;
    assert_eq!(status, StatusCode::OK);
    let region = image::load_from_memory(&body).unwrap().to_rgb8();
    assert_eq!(region.dimensions(), (10, 10));
    assert_eq!(*region.get_pixel(9, 9), png_pixel(299, 199));
}

#[tokio::test]
async fn test_region_scaled_to_max_width() {
    let server = png_server();
    let (status, _, body) = server
        .get("/region/photo.png?left=0&top=0&width=300&height=200&maxWidth=150&encoding=png")
        .await;
    assert_eq!(status, StatusCode::OK);
    let region = image::load_from_memory(&body).unwrap().to_rgb8();
    assert_eq!(region.dimensions(), (150, 100));
    assert_eq!(*region.get_pixel(40, 30), png_pixel(80, 60));
}

#[tokio::test]
async fn test_region_fraction_units() {
    let server = png_server();
    let (status, _, body) = server
        .get("/region/photo.png?left=0.5&top=0&width=0.5&height=0.5&units=fraction&encoding=png")
        .await;
    assert_eq!(status, StatusCode::OK);
    let region = image::load_from_memory(&body).unwrap().to_rgb8();
    assert_eq!(region.dimensions(), (150, 100));
    assert_eq!(*region.get_pixel(0, 0), png_pixel(150, 0));
}

#[tokio::test]
async fn test_region_requires_edges() {
    let server = png_server();
    for uri in [
        "/region/photo.png?left=0&top=0&width=10",
        "/region/photo.png?left=0&top=0&height=10",
        "/region/photo.png?top=0&width=10&height=10",
        "/region/photo.png?left=500&top=0&width=10&height=10",
        "/region/photo.png?left=0&top=0&width=10&height=10&units=furlongs",
    ] {
        let (status, json) = server.get_json(uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(json["error"], "invalid_region", "{uri}");
    }
}

#[tokio::test]
async fn test_region_of_missing_image() {
    let server = png_server();
    let (status, _, _) = server
        .get("/region/missing.png?left=0&top=0&width=10&height=10")
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Internal Metadata and Associated Images
// =============================================================================

#[tokio::test]
async fn test_internal_metadata() {
    let server = png_server();
    let (status, json) = server.get_json("/images/photo.png/metadata/internal").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["format"], "png");
    assert_eq!(json["colorType"], "Rgb8");

    let server = mock_server();
    let (status, json) = server.get_json("/images/big.mock/metadata/internal").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::json!({}));
}

#[tokio::test]
async fn test_associated_images() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "slide.mock");
    let mock = MockDecoder::new(5000, 3000).with_associated("label", 40, 20);
    let server = TestServer::new(dir, mock, 4);

    let (status, json) = server.get_json("/images/slide.mock/associated").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::json!(["label"]));

    let (status, headers, body) = server
        .get("/images/slide.mock/associated/label?encoding=PNG")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "image/png");
    assert_eq!(headers[header::CACHE_CONTROL], "public, max-age=86400");
    let label = image::load_from_memory(&body).unwrap().to_luma8();
    assert_eq!(label.dimensions(), (40, 20));
    assert_eq!(label.get_pixel(3, 4)[0], ASSOCIATED_PIXEL);

    let (status, json) = server.get_json("/images/slide.mock/associated/macro").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "not_found");
}

#[tokio::test]
async fn test_plain_raster_has_no_associated_images() {
    let server = png_server();
    let (status, json) = server.get_json("/images/photo.png/associated").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::json!([]));
}
