use std::path::PathBuf;

pub const DEFAULT_LOG_FILE: &str = "tsheet-debug.log";

#[cfg(not(test))]
pub fn log_file_path() -> PathBuf {
    std::env::var("TSHEET_LOG_FILE")
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE))
}

// Test runs log to the temp dir, never the working directory.
#[cfg(test)]
pub fn log_file_path() -> PathBuf {
    std::env::temp_dir().join("tsheet-test.log")
}

#[macro_export]
macro_rules! log {
    ($($arg:tt)*) => ({
        use std::io::Write;
        let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        let path = $crate::utils::logging::log_file_path();
        if let Ok(mut file) = std::fs::OpenOptions::new().create(true).append(true).open(path) {
            let _ = writeln!(file, "[{}] {}", now, format!($($arg)*));
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builds_log_outside_the_working_directory() {
        let path = log_file_path();
        assert!(path.starts_with(std::env::temp_dir()));
        assert_ne!(path, PathBuf::from(DEFAULT_LOG_FILE));

        crate::log!("logging check");
        assert!(path.exists());
    }
}
