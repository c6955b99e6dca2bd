//! Serde adapters for configuration values.

pub use self::glob::GlobPattern;

pub mod glob {
    use std::ops::Deref;

    use ::glob::PatternError;
    use serde::{Deserialize, Serialize};

    /// A [`glob::Pattern`](::glob::Pattern) that (de)serializes as its source string.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(try_from = "String", into = "String")]
    pub struct GlobPattern(::glob::Pattern);

    impl GlobPattern {
        pub fn parse(pattern: &str) -> Result<Self, PatternError> {
            ::glob::Pattern::new(pattern).map(Self)
        }

        pub fn into_inner(self) -> ::glob::Pattern {
            self.0
        }
    }

    impl Deref for GlobPattern {
        type Target = ::glob::Pattern;

        fn deref(&self) -> &Self::Target {
            &self.0
        }
    }

    impl From<::glob::Pattern> for GlobPattern {
        fn from(p: ::glob::Pattern) -> Self {
            Self(p)
        }
    }

    impl TryFrom<String> for GlobPattern {
        type Error = PatternError;

        fn try_from(s: String) -> Result<Self, Self::Error> {
            Self::parse(&s)
        }
    }

    impl From<GlobPattern> for String {
        fn from(p: GlobPattern) -> Self {
            p.0.as_str().to_owned()
        }
    }

    #[cfg(test)]
    mod test {
        use super::*;

        #[test]
        fn glob_pattern_as_string() {
            let pat = GlobPattern::parse("tc*.txt").unwrap();
            assert_eq!(serde_json::to_string(&pat).unwrap(), r#""tc*.txt""#);

            let pat: GlobPattern = serde_json::from_str(r#""*.jar""#).unwrap();
            assert!(pat.matches("q1-dist.jar"));
            assert!(!pat.matches("q1.jar.bak"));
        }

        #[test]
        fn invalid_glob_pattern_ng() {
            let res: Result<GlobPattern, _> = serde_json::from_str(r#""tc[0-9.txt""#);
            assert!(res.is_err());
        }
    }
}

/// `Duration` as a number of seconds. Fractions are allowed; the value must be positive.
pub mod duration_secs {
    use std::time::Duration;

    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        if !secs.is_finite() || secs <= 0.0 {
            return Err(de::Error::custom(format!(
                "expected a positive number of seconds, found {}",
                secs
            )));
        }
        Duration::try_from_secs_f64(secs).map_err(|e| {
            de::Error::custom(format!("timeout of {} seconds is out of range: {}", secs, e))
        })
    }

}
