use std::fmt;
use std::str::FromStr;

/// Dotted numeric version; missing components count as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    major: u64,
    minor: u64,
    patch: u64,
}

impl Version {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Version of the running binary.
    pub fn current() -> Self {
        Self::new(
            env!("CARGO_PKG_VERSION_MAJOR").parse().unwrap_or(0),
            env!("CARGO_PKG_VERSION_MINOR").parse().unwrap_or(0),
            env!("CARGO_PKG_VERSION_PATCH").parse().unwrap_or(0),
        )
    }
}

impl FromStr for Version {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err("empty version".to_string());
        }

        let mut parts = [0u64; 3];
        let mut count = 0;
        for piece in trimmed.split('.') {
            if count == parts.len() {
                return Err(format!("'{raw}' has more than three components"));
            }
            parts[count] = piece
                .parse()
                .map_err(|_| format!("'{raw}' is not a dotted numeric version"))?;
            count += 1;
        }
        Ok(Self::new(parts[0], parts[1], parts[2]))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_components_are_zero() {
        assert_eq!("1".parse::<Version>().unwrap(), Version::new(1, 0, 0));
        assert_eq!("1.4".parse::<Version>().unwrap(), Version::new(1, 4, 0));
    }

    #[test]
    fn ordering_is_numeric() {
        let low: Version = "0.9.12".parse().unwrap();
        let high: Version = "0.10".parse().unwrap();
        assert!(low < high);
    }

    #[test]
    fn rejects_garbage() {
        assert!("".parse::<Version>().is_err());
        assert!("1.x".parse::<Version>().is_err());
        assert!("1.2.3.4".parse::<Version>().is_err());
    }

    #[test]
    fn current_matches_package_version() {
        assert_eq!(Version::current().to_string(), env!("CARGO_PKG_VERSION"));
    }
}
