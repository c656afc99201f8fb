/// The server version, parsed from the full version string of the
/// connect-options reply (e.g. `2.00.048.00.1592305219`).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct HanaVersion {
    major: u32,
    minor: u32,
    sps: u32,
    revision: u32,
    build_id: u64,
    full: String,
}

impl HanaVersion {
    // Parsing is forgiving: missing or non-numeric components become 0,
    // the original string is retained.
    pub(crate) fn parse(full_version: &str) -> Self {
        let mut components = full_version.split('.');
        let mut next_u32 = || {
            components
                .next()
                .and_then(|c| c.trim().parse::<u32>().ok())
                .unwrap_or(0)
        };
        let major = next_u32();
        let minor = next_u32();
        let sps = next_u32();
        let revision = next_u32();
        let build_id = components
            .next()
            .and_then(|c| c.trim().parse::<u64>().ok())
            .unwrap_or(0);
        Self {
            major,
            minor,
            sps,
            revision,
            build_id,
            full: full_version.to_string(),
        }
    }

    /// Major version.
    #[must_use]
    pub fn major(&self) -> u32 {
        self.major
    }
    /// Minor version.
    #[must_use]
    pub fn minor(&self) -> u32 {
        self.minor
    }
    /// Support package stack.
    #[must_use]
    pub fn sps(&self) -> u32 {
        self.sps
    }
    /// Revision within the SPS.
    #[must_use]
    pub fn revision(&self) -> u32 {
        self.revision
    }
    /// Build id.
    #[must_use]
    pub fn build_id(&self) -> u64 {
        self.build_id
    }
    /// The unparsed version string.
    #[must_use]
    pub fn full(&self) -> &str {
        &self.full
    }

    // Sending ClientInfo along with statements is only accepted from
    // 2.00.042 on; older servers reject it mid-session.
    pub(crate) fn supports_client_info(&self) -> bool {
        (self.major, self.minor, self.sps) >= (2, 0, 42)
    }
}

impl std::fmt::Display for HanaVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.full)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_usual_format() {
        let v = HanaVersion::parse("2.00.048.00.1592305219");
        assert_eq!(v.major(), 2);
        assert_eq!(v.minor(), 0);
        assert_eq!(v.sps(), 48);
        assert_eq!(v.revision(), 0);
        assert_eq!(v.build_id(), 1_592_305_219);
        assert!(v.supports_client_info());
    }

    #[test]
    fn tolerates_short_and_garbled_strings() {
        let v = HanaVersion::parse("1.00");
        assert_eq!((v.major(), v.minor(), v.sps()), (1, 0, 0));
        assert!(!v.supports_client_info());
        let v = HanaVersion::parse("junk");
        assert_eq!(v.major(), 0);
        assert_eq!(v.full(), "junk");
    }
}
