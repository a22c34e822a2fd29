//! Heartbeat endpoint handler.
//!
//! Returns server status information, including uptime, memory usage and a
//! summary of the loaded store.

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use uuid::Uuid;

use crate::state::AppState;

/// Server ID, generated once per process
static SERVER_ID: once_cell::sync::Lazy<String> = once_cell::sync::Lazy::new(|| {
    Uuid::new_v4().to_string()
});

/// Server start time
static START_TIME: once_cell::sync::Lazy<SystemTime> = once_cell::sync::Lazy::new(|| {
    SystemTime::now()
});

/// Heartbeat response structure
#[derive(Serialize)]
pub struct HeartbeatResponse {
    /// Server ID (unique per instance)
    pub server_id: String,
    /// Current timestamp (ISO 8601 format)
    pub timestamp: String,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// Process memory usage in bytes
    pub memory_usage_bytes: Option<u64>,
    /// Available system memory in bytes
    pub available_memory_bytes: Option<u64>,
    /// Store information
    pub store: StoreInfo,
    /// Server status
    pub status: String,
}

/// Store information structure
#[derive(Serialize)]
pub struct StoreInfo {
    /// Store directory, when known
    pub store_dir: Option<String>,
    /// Pipeline variant the store was built with
    pub variant: String,
    /// Field keys held by the store
    pub fields: Vec<String>,
    /// Grid shape as (rows, columns)
    pub grid_shape: (usize, usize),
    /// Whether state outlines are loaded
    pub has_boundaries: bool,
    /// Whether city markers are loaded
    pub has_cities: bool,
    /// Approximate memory held by the climate arrays in bytes
    pub data_memory_bytes: usize,
}

/// Describe the loaded store
fn store_info(state: &AppState) -> StoreInfo {
    StoreInfo {
        store_dir: state
            .config
            .server
            .store_dir
            .as_ref()
            .map(|dir| dir.display().to_string()),
        variant: state.manifest.variant.to_string(),
        fields: state
            .fields()
            .into_iter()
            .map(|field| field.key().to_string())
            .collect(),
        grid_shape: state.normals.grid.shape(),
        has_boundaries: state.boundaries.is_some(),
        has_cities: state.cities.is_some(),
        data_memory_bytes: state.normals.memory_bytes(),
    }
}

/// Handle GET /heartbeat requests
pub async fn heartbeat_handler(State(state): State<Arc<AppState>>) -> Json<HeartbeatResponse> {
    let now = SystemTime::now();
    let timestamp = chrono::DateTime::<chrono::Utc>::from(now)
        .to_rfc3339_opts(chrono::SecondsFormat::Millis, true);

    let uptime = now
        .duration_since(*START_TIME)
        .unwrap_or(Duration::from_secs(0));

    let response = HeartbeatResponse {
        server_id: SERVER_ID.clone(),
        timestamp,
        uptime_seconds: uptime.as_secs(),
        memory_usage_bytes: get_memory_usage(),
        available_memory_bytes: get_available_memory(),
        store: store_info(&state),
        status: "healthy".to_string(),
    };

    Json(response)
}

/// Get current process memory usage (platform-dependent)
fn get_memory_usage() -> Option<u64> {
    #[cfg(target_os = "linux")]
    {
        use std::fs::File;
        use std::io::Read;
        
        // Read from /proc/self/statm on Linux
        let mut statm = String::new();
        if let Ok(mut file) = File::open("/proc/self/statm") {
            if file.read_to_string(&mut statm).is_ok() {
                let parts: Vec<&str> = statm.split_whitespace().collect();
                if parts.len() >= 2 {
                    // RSS (Resident Set Size) is the second value, in pages
                    if let Ok(pages) = parts[1].parse::<u64>() {
                        // Convert pages to bytes (usually 4KB per page)
                        return Some(pages * 4096);
                    }
                }
            }
        }
        None
    }
    
    #[cfg(target_os = "macos")]
    {
        use std::process::Command;
        
        // Use `ps` command on macOS
        let output = Command::new("ps")
            .args(&["-o", "rss=", "-p", &std::process::id().to_string()])
            .output();
            
        if let Ok(output) = output {
            let rss = String::from_utf8_lossy(&output.stdout).trim().parse::<u64>();
            if let Ok(rss_kb) = rss {
                // Convert KB to bytes
                return Some(rss_kb * 1024);
            }
        }
        None
    }
    
    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

/// Get available system memory (platform-dependent)
fn get_available_memory() -> Option<u64> {
    #[cfg(target_os = "linux")]
    {
        use std::fs::File;
        use std::io::{BufRead, BufReader};
        
        // Read from /proc/meminfo on Linux
        if let Ok(file) = File::open("/proc/meminfo") {
            let reader = BufReader::new(file);
            for line in reader.lines().map_while(Result::ok) {
                if line.starts_with("MemAvailable:") {
                    let parts: Vec<&str> = line.split_whitespace().collect();
                    if parts.len() >= 2 {
                        if let Ok(kb) = parts[1].parse::<u64>() {
                            // Convert KB to bytes
                            return Some(kb * 1024);
                        }
                    }
                }
            }
        }
        None
    }
    
    #[cfg(target_os = "macos")]
    {
        use std::process::Command;
        
        // Use `vm_stat` command on macOS
        let output = Command::new("vm_stat")
            .output();
            
        if let Ok(output) = output {
            let vm_stat = String::from_utf8_lossy(&output.stdout);
            
            // Parse page size
            let page_size = if let Some(line) = vm_stat.lines().find(|l| l.contains("page size of")) {
                if let Some(size_str) = line.split("page size of ").nth(1) {
                    size_str.trim().parse::<u64>().unwrap_or(4096)
                } else {
                    4096 // Default page size (4KB)
                }
            } else {
                4096
            };
            
            // Find free pages
            if let Some(line) = vm_stat.lines().find(|l| l.starts_with("Pages free:")) {
                if let Some(count_str) = line.split(':').nth(1) {
                    if let Ok(count) = count_str.trim().replace(".", "").parse::<u64>() {
                        return Some(count * page_size);
                    }
                }
            }
        }
        None
    }
    
    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::tests::sample_state;

    #[test]
    fn test_store_info() {
        let state = sample_state();
        let info = store_info(&state);

        assert_eq!(info.variant, "consolidated");
        assert_eq!(info.grid_shape, (2, 2));
        assert_eq!(info.fields, vec!["ppt", "tmin", "tmean", "tmax", "dem"]);
        assert!(!info.has_boundaries);
        assert_eq!(info.data_memory_bytes, state.normals.memory_bytes());
    }

    #[tokio::test]
    async fn test_heartbeat_reports_healthy() {
        let state = Arc::new(sample_state());
        let Json(response) = heartbeat_handler(State(state)).await;
        assert_eq!(response.status, "healthy");
        assert_eq!(response.server_id, *SERVER_ID);
    }
}
