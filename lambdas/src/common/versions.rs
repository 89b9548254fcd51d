use tracing::warn;

use crate::common::esper::models::AppVersion;

#[derive(Debug, Clone)]
pub struct LatestVersion {
    pub build_number: u64,
    pub version: AppVersion,
}

/// Picks the version with the highest integer build number. Versions whose
/// build number is not a positive integer are skipped.
pub fn latest_version(versions: Vec<AppVersion>) -> Option<LatestVersion> {
    let mut candidates: Vec<LatestVersion> = versions
        .into_iter()
        .filter_map(|version| {
            let parsed = version
                .build_number
                .as_deref()
                .and_then(|build| build.trim().parse::<u64>().ok());
            match parsed {
                Some(build_number) if build_number > 0 => Some(LatestVersion {
                    build_number,
                    version,
                }),
                _ => {
                    warn!(
                        "Skipping version {} with unusable build number {:?}",
                        version.id, version.build_number
                    );
                    None
                }
            }
        })
        .collect();

    candidates.sort_by(|a, b| b.build_number.cmp(&a.build_number));
    candidates.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn version(n: u128, build_number: &str) -> AppVersion {
        AppVersion {
            id: Uuid::from_u128(n),
            build_number: Some(build_number.into()),
            version_code: None,
            created_on: None,
            release_comments: None,
        }
    }

    #[test]
    fn picks_highest_build() {
        let latest = latest_version(vec![version(1, "5"), version(2, "7")]).unwrap();
        assert_eq!(latest.build_number, 7);
        assert_eq!(latest.version.id, Uuid::from_u128(2));
    }

    #[test]
    fn compares_as_integers() {
        let versions = vec![version(1, "9"), version(2, "10"), version(3, "100")];
        let latest = latest_version(versions).unwrap();
        assert_eq!(latest.build_number, 100);

        let latest = latest_version(vec![version(1, "10"), version(2, "9")]).unwrap();
        assert_eq!(latest.version.id, Uuid::from_u128(1));
    }

    #[test]
    fn skips_unusable_build_numbers() {
        let versions = vec![
            version(1, "3"),
            version(2, "beta"),
            version(3, ""),
            version(4, "0"),
        ];
        let latest = latest_version(versions).unwrap();
        assert_eq!(latest.version.id, Uuid::from_u128(1));

        assert!(latest_version(vec![version(1, "beta")]).is_none());

        let mut missing = version(5, "9");
        missing.build_number = None;
        let latest = latest_version(vec![missing, version(6, "2")]).unwrap();
        assert_eq!(latest.version.id, Uuid::from_u128(6));
    }

    #[test]
    fn empty_list_has_no_latest() {
        assert!(latest_version(Vec::new()).is_none());
    }
}
