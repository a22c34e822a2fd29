//! Integration tests for climap
//!
//! These tests run the offline commands on synthetic inputs, load the
//! resulting store and query every endpoint over HTTP.

mod common;

use arrow::array::Float32Array;
use arrow_ipc::reader::StreamReader;
use common::{assertions, http_client, image_utils, test_data};
use once_cell::sync::OnceCell;
use std::io::Cursor;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use climap::config::{CityConfig, PipelineConfig};
use climap::data_loader::load_store;
use climap::pipeline::{extract_boundaries, preprocess_rasters, select_cities};
use climap::store::{BOUNDARIES_FILE, CITIES_FILE, MANIFEST_FILE};
use climap::{Config, PipelineVariant};

static TEST_DIR: OnceCell<tempfile::TempDir> = OnceCell::new();

/// Build the store once: rasters, boundaries and cities
fn store_dir() -> PathBuf {
    let dir = TEST_DIR.get_or_init(|| {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("raw");
        let store = dir.path().join("store");

        test_data::write_raw_rasters(&raw, PipelineVariant::Consolidated).unwrap();
        let config = PipelineConfig {
            input_dir: Some(raw),
            output_dir: Some(store.clone()),
            variant: PipelineVariant::Consolidated,
            grid: test_data::test_grid(),
            ..PipelineConfig::default()
        };
        preprocess_rasters(&config).expect("Failed to preprocess rasters");

        let states = dir.path().join("states.geojson");
        test_data::write_states_geojson(&states).unwrap();
        extract_boundaries(&states, &store).expect("Failed to extract boundaries");

        let cities = dir.path().join("uscities.csv");
        test_data::write_city_csv(&cities).unwrap();
        select_cities(&cities, &store, &CityConfig::default()).expect("Failed to select cities");

        dir
    });
    dir.path().join("store")
}

/// Start a test server on an ephemeral port
async fn start_test_server() -> SocketAddr {
    let state = load_store(&store_dir(), Config::default()).expect("Failed to load test store");

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("No local address");

    tokio::spawn(async move {
        axum::serve(listener, climap::server::app(Arc::new(state)))
            .await
            .expect("Server error");
    });

    println!("Test server ready on {}", addr);
    addr
}

#[test]
fn test_pipeline_outputs() {
    let store = store_dir();
    for file in [MANIFEST_FILE, BOUNDARIES_FILE, CITIES_FILE] {
        assert!(store.join(file).exists(), "{} missing", file);
    }

    let cities: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(store.join(CITIES_FILE)).unwrap()).unwrap();
    let features = cities["features"].as_array().unwrap();
    assert_eq!(features.len(), test_data::SELECTED_CITIES);
    assert!(features
        .iter()
        .all(|f| f["properties"]["state"] != "Alaska"));
}

#[tokio::test]
async fn test_heartbeat_endpoint() {
    let addr = start_test_server().await;

    let json: serde_json::Value = http_client::get_json(&addr, "/heartbeat")
        .await
        .expect("Failed to get heartbeat");

    assert_eq!(json["status"], "healthy");
    assert_eq!(json["store"]["variant"], "consolidated");
    assert_eq!(json["store"]["grid_shape"], serde_json::json!([6, 8]));
    assert_eq!(json["store"]["has_boundaries"], true);
}

#[tokio::test]
async fn test_metadata_endpoint() {
    let addr = start_test_server().await;

    let json: serde_json::Value = http_client::get_json(&addr, "/metadata")
        .await
        .expect("Failed to get metadata");

    assert_eq!(json["variant"], "consolidated");
    assert_eq!(json["grid"]["nrow"], 6);
    assert_eq!(json["grid"]["ncol"], 8);
    assert_eq!(json["bounds"]["west"], -105.0);
    assert_eq!(json["bounds"]["east"], -101.0);
    assert_eq!(json["bounds"]["north"], 42.0);
    assert_eq!(json["bounds"]["south"], 39.0);
    assert_eq!(json["overlays"]["boundaries"], true);
    assert_eq!(json["overlays"]["cities"], true);
    assert_eq!(json["periods"].as_array().unwrap().len(), 13);

    let keys: Vec<&str> = json["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["key"].as_str().unwrap())
        .collect();
    assert_eq!(keys, vec!["ppt", "tmin", "tmean", "tmax", "dem"]);

    // coldest tmin: January, bottom row, (1 - 10) C
    let tmin = &json["fields"][1];
    assertions::assert_json_approx(&tmin["range"]["min"], 15.8);
    assertions::assert_json_approx(&tmin["range"]["max"], 53.6);
}

#[tokio::test]
async fn test_field_endpoint() {
    let addr = start_test_server().await;

    let json: serde_json::Value = http_client::get_json(&addr, "/field?field=tmin&period=annual")
        .await
        .expect("Failed to get field");

    assert_eq!(json["rows"], 6);
    assert_eq!(json["cols"], 8);
    assert_eq!(json["title"], "Annual Mean Low Temperature (°F)");
    // mean month 6.5 C at row 0, 4.5 C at row 1
    assertions::assert_json_approx(&json["values"][0][0], 43.7);
    assertions::assert_json_approx(&json["values"][1][3], 40.1);
    assert!(json["values"][5][7].is_null());
    assert_eq!(json["lat"][0], 41.75);

    let july: serde_json::Value = http_client::get_json(&addr, "/field?field=tmax&period=july")
        .await
        .expect("Failed to get field");
    assertions::assert_json_approx(&july["values"][0][0], 62.6);

    let ppt: serde_json::Value = http_client::get_json(&addr, "/field?field=ppt&period=3")
        .await
        .expect("Failed to get field");
    assertions::assert_json_approx(&ppt["values"][2][0], 1.0);
    assertions::assert_json_approx(&ppt["values"][2][7], 8.0);
    assert_eq!(ppt["palette"], "blues");
}

#[tokio::test]
async fn test_field_filters() {
    let addr = start_test_server().await;

    // monthly tmin minimum drops below 20 F from row 4 on
    let json: serde_json::Value =
        http_client::get_json(&addr, "/field?field=tmean&tmin=20,100")
            .await
            .expect("Failed to get filtered field");
    assertions::assert_row_mask(&json["values"][3], &[false; 8]);
    assertions::assert_row_mask(&json["values"][4], &[true; 8]);

    // precipitation above 3.5 in from column 3 on
    let json: serde_json::Value =
        http_client::get_json(&addr, "/field?field=tmean&tmin=20,100&ppt=0,3.5")
            .await
            .expect("Failed to get filtered field");
    let mask = [false, false, false, true, true, true, true, true];
    assertions::assert_row_mask(&json["values"][0], &mask);
    assertions::assert_row_mask(&json["values"][4], &[true; 8]);

    // an empty filter value is ignored
    let json: serde_json::Value = http_client::get_json(&addr, "/field?field=tmean&ppt=")
        .await
        .expect("Failed to get field");
    assertions::assert_row_mask(&json["values"][0], &[false; 8]);
}

#[tokio::test]
async fn test_field_arrow_format() {
    let addr = start_test_server().await;

    let (content_type, bytes) =
        http_client::get_bytes(&addr, "/field?field=tmax&period=7&format=arrow")
            .await
            .expect("Failed to get arrow field");
    assert_eq!(content_type, "application/vnd.apache.arrow.stream");

    let reader = StreamReader::try_new(Cursor::new(bytes), None).unwrap();
    let schema = reader.schema();
    let field = schema.field_with_name("value").unwrap();
    assert_eq!(field.metadata()["shape"], "[6,8]");
    assert_eq!(field.metadata()["field"], "tmax");

    let batches: Vec<_> = reader.map(|b| b.unwrap()).collect();
    let values = batches[0]
        .column(0)
        .as_any()
        .downcast_ref::<Float32Array>()
        .unwrap();
    assert_eq!(values.len(), 48);
    assertions::assert_approx_eq(values.value(0) as f64, 62.6, None);
    assert!(values.value(47).is_nan());
}

#[tokio::test]
async fn test_image_endpoint() {
    let addr = start_test_server().await;

    // default width, height from the 6 x 8 aspect ratio
    let (content_type, bytes) = http_client::get_bytes(&addr, "/image?field=tmean&period=january")
        .await
        .expect("Failed to get image");
    assert_eq!(content_type, "image/png");
    assert!(image_utils::assert_image_format(&bytes, image::ImageFormat::Png).is_ok());
    let img = image_utils::load_image_from_bytes(&bytes).unwrap();
    assert!(image_utils::assert_image_dimensions(&img, 1200, 900).is_ok());
    // only the fill cell is transparent
    let transparent = image_utils::transparent_fraction(&img);
    assert!(transparent > 0.0 && transparent < 0.05);

    let (_, bytes) = http_client::get_bytes(&addr, "/image?field=ppt&ppt=0,3.5&width=80&height=60")
        .await
        .expect("Failed to get filtered image");
    let img = image_utils::load_image_from_bytes(&bytes).unwrap();
    assertions::assert_approx_eq(image_utils::transparent_fraction(&img), 0.625, Some(0.01));

    let (content_type, bytes) = http_client::get_bytes(
        &addr,
        "/image?field=dem&format=jpeg&palette=viridis&width=64&height=48&resampling=bilinear",
    )
    .await
    .expect("Failed to get jpeg image");
    assert_eq!(content_type, "image/jpeg");
    assert_eq!(
        image_utils::detect_image_format(&bytes),
        Some(image::ImageFormat::Jpeg)
    );
    let img = image_utils::load_image_from_bytes(&bytes).unwrap();
    assert!(image_utils::assert_image_dimensions(&img, 64, 48).is_ok());
}

#[tokio::test]
async fn test_overlay_endpoints() {
    let addr = start_test_server().await;

    let json: serde_json::Value = http_client::get_json(&addr, "/boundaries")
        .await
        .expect("Failed to get boundaries");
    let x = json["x"].as_array().unwrap();
    assert_eq!(x.len(), test_data::STATES_BUNDLE_POINTS);
    assert_eq!(json["y"].as_array().unwrap().len(), x.len());
    assert!(x[5].is_null());
    assert_eq!(x[0], -105.0);

    let (content_type, bytes) = http_client::get_bytes(&addr, "/cities")
        .await
        .expect("Failed to get cities");
    assert_eq!(content_type, "application/geo+json");
    let cities: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(cities["type"], "FeatureCollection");
    let denver = cities["features"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|f| f["properties"]["city"] == "Denver")
        .count();
    assert_eq!(denver, 1);
}

#[tokio::test]
async fn test_error_responses() {
    let addr = start_test_server().await;

    for path in [
        "/field?field=humidity",
        "/field?field=ppt&period=13",
        "/field?field=ppt&tmax=90,10",
        "/field?field=ppt&format=csv",
        "/image?field=ppt&width=0",
        "/image?field=ppt&palette=jet",
        "/image?field=ppt&resampling=bicubic",
    ] {
        let (status, body) = http_client::get_error(&addr, path)
            .await
            .expect("Failed to make request");
        assert_eq!(status, 400, "{}", path);
        assert!(body["error"].is_string());
        assert!(body["request_id"].is_string());
    }
}
