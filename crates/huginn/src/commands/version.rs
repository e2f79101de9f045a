//! Version command

use crate::cli::VersionArgs;
use crate::version::VersionInfo;
use anyhow::Result;

pub fn run(args: VersionArgs) -> Result<()> {
    let info = VersionInfo::current();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!("{}", info);
        println!("Rust:       {}+", info.rust_version);
        println!("Sources:    {}", info.sources.join(", "));
        if !info.repository.is_empty() {
            println!("Repository: {}", info.repository);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_info_matches_package() {
        let info = VersionInfo::current();
        assert_eq!(info.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(info.to_string(), format!("huginn {}", info.version));
        assert!(info.sources.contains(&"aws-secrets".to_string()));
    }

    #[test]
    fn test_version_info_serializes() {
        let json = serde_json::to_value(VersionInfo::current()).unwrap();
        assert!(json["version"].is_string());
        assert!(json["sources"].is_array());
    }
}
