use crate::fingerprint::throttle::{CollectionError, FingerprintCollector};
use std::path::PathBuf;
use xxhash_rust::xxh3::xxh3_128;

/// Derives a stable visitor id from host attributes.
pub struct MachineCollector {
    machine_id_paths: Vec<PathBuf>,
}

impl Default for MachineCollector {
    fn default() -> Self {
        Self {
            machine_id_paths: vec![
                PathBuf::from("/etc/machine-id"),
                PathBuf::from("/var/lib/dbus/machine-id"),
            ],
        }
    }
}

impl MachineCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_machine_id_paths(paths: Vec<PathBuf>) -> Self {
        Self {
            machine_id_paths: paths,
        }
    }

    async fn machine_id(&self) -> Option<String> {
        for path in &self.machine_id_paths {
            if let Ok(contents) = tokio::fs::read_to_string(path).await {
                let id = contents.trim();
                if !id.is_empty() {
                    return Some(id.to_string());
                }
            }
        }
        None
    }
}

fn hostname() -> Option<String> {
    ["HOSTNAME", "COMPUTERNAME"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .map(|h| h.trim().to_lowercase())
        .find(|h| !h.is_empty())
}

/// 32 lowercase hex chars, the same width as browser visitor ids.
pub fn visitor_id_from(machine_id: &str, hostname: &str) -> String {
    let input = format!(
        "{machine_id}:{hostname}:{}:{}",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
    format!("{:032x}", xxh3_128(input.as_bytes()))
}

#[async_trait::async_trait]
impl FingerprintCollector for MachineCollector {
    async fn collect(&self) -> Result<String, CollectionError> {
        let machine_id = self.machine_id().await;
        let hostname = hostname();
        if machine_id.is_none() && hostname.is_none() {
            return Err(CollectionError::Unavailable(
                "no machine id or hostname available".to_string(),
            ));
        }
        Ok(visitor_id_from(
            machine_id.as_deref().unwrap_or(""),
            hostname.as_deref().unwrap_or(""),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visitor_id_is_deterministic() {
        let a = visitor_id_from("4c4c4544", "build-01");
        let b = visitor_id_from("4c4c4544", "build-01");
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_visitor_id_varies_by_host() {
        assert_ne!(
            visitor_id_from("4c4c4544", "build-01"),
            visitor_id_from("4c4c4544", "build-02")
        );
    }

    #[tokio::test]
    async fn test_collect_reads_machine_id_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("machine-id");
        std::fs::write(&path, "0123456789abcdef\n").unwrap();

        let collector = MachineCollector::with_machine_id_paths(vec![path]);
        let first = collector.collect().await.unwrap();
        let second = collector.collect().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 32);
    }
}
