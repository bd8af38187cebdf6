use std::path::PathBuf;

use crate::config::Config;

/// Look up an API key from the environment, falling back to `.env` files.
///
/// Searches `./.env` and then the `.env` next to the user config file.
pub fn lookup_api_key(env_var: &str) -> Option<String> {
    if let Some(key) = non_empty_env(env_var) {
        return Some(key);
    }

    for env_path in env_file_candidates() {
        if !env_path.exists() {
            continue;
        }
        match dotenvy::from_path_iter(&env_path) {
            Ok(entries) => {
                for (key, value) in entries.flatten() {
                    if key == env_var && !value.trim().is_empty() {
                        tracing::debug!("Loaded {} from {}", env_var, env_path.display());
                        return Some(value.trim().to_string());
                    }
                }
            }
            Err(e) => {
                tracing::debug!("Ignoring unreadable env file {}: {}", env_path.display(), e);
            }
        }
    }

    None
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn env_file_candidates() -> Vec<PathBuf> {
    let mut candidates = vec![PathBuf::from(".env")];
    if let Ok(dir) = Config::config_dir() {
        candidates.push(dir.join(".env"));
    }
    candidates
}

/// Replace every occurrence of `secret` in `message` with `***`
pub fn redact_secret(message: &str, secret: Option<&str>) -> String {
    match secret {
        Some(secret) if !secret.is_empty() => message.replace(secret, "***"),
        _ => message.to_string(),
    }
}

/// Format file size in human-readable format
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: f64 = 1024.0;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let bytes_f = bytes as f64;
    let unit_index = (bytes_f.log10() / THRESHOLD.log10()).floor() as usize;
    let unit_index = unit_index.min(UNITS.len() - 1);

    let size = bytes_f / THRESHOLD.powi(unit_index as i32);

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

/// Format duration in human-readable format
pub fn format_duration(seconds: f64) -> String {
    let total_seconds = seconds.max(0.0) as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Report which external tools and credentials are missing
pub async fn check_dependencies(config: &Config) -> Vec<String> {
    let mut missing = Vec::new();

    if !check_command_available(&config.subtitles.yt_dlp_path).await {
        missing.push("yt-dlp - required for subtitle downloads".to_string());
    }

    if !check_command_available(&config.media.ffmpeg_path).await {
        missing.push("ffmpeg - required to transcribe from a video file".to_string());
    }

    if lookup_api_key(&config.deepgram.api_key_env).is_none() {
        missing.push(format!(
            "{} - required for Deepgram speech recognition",
            config.deepgram.api_key_env
        ));
    }

    missing
}

/// Check if a command is available in PATH
pub async fn check_command_available(command: &str) -> bool {
    use tokio::process::Command;

    Command::new(command)
        .arg("--version")
        .output()
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Write an executable shell script standing in for an external tool
#[cfg(all(test, unix))]
pub(crate) fn write_fake_tool(dir: &std::path::Path, name: &str, body: &str) -> String {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    fs_err::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    fs_err::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(1048576), "1.0 MB");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(30.0), "30s");
        assert_eq!(format_duration(90.0), "1m 30s");
        assert_eq!(format_duration(3661.0), "1h 1m 1s");
        assert_eq!(format_duration(-4.0), "0s");
    }

    #[test]
    fn test_redact_secret() {
        assert_eq!(
            redact_secret("Token abc123 rejected (abc123)", Some("abc123")),
            "Token *** rejected (***)"
        );
        assert_eq!(redact_secret("nothing here", Some("abc123")), "nothing here");
        assert_eq!(redact_secret("keep", Some("")), "keep");
        assert_eq!(redact_secret("keep", None), "keep");
    }

    #[test]
    fn test_lookup_prefers_environment() {
        let var = "TRANSCRIPT_RESOLVER_TEST_KEY_ENV";
        std::env::set_var(var, "  from-env  ");
        assert_eq!(lookup_api_key(var), Some("from-env".to_string()));
        std::env::remove_var(var);
    }

    #[test]
    fn test_lookup_missing_key_is_none() {
        assert_eq!(lookup_api_key("TRANSCRIPT_RESOLVER_TEST_KEY_UNSET"), None);
    }

    #[tokio::test]
    async fn test_missing_command_is_unavailable() {
        assert!(!check_command_available("definitely-not-a-real-binary-7f3a").await);
    }
}
