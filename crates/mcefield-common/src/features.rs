//! Editor feature flags.
//!
//! Features steer both server-side resolution (menubar, statusbar, toolbar
//! blanking) and client wiring (upload handler, resize listener). They travel
//! as lists of names in field configuration and as a comma-joined string in
//! the wrapper's `data-features` attribute.

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FeatureSet: u16 {
        const TOOLBAR = 1 << 0;
        const MENUBAR = 1 << 1;
        const STATUSBAR = 1 << 2;
        const STICKYBARS = 1 << 3;
        const SPELLCHECK = 1 << 4;
        const PURIFIER = 1 << 5;
        const IMG_UPLOAD = 1 << 6;
        const IMG_RESIZE = 1 << 7;
        const INLINE = 1 << 8;
    }
}

const NAMES: &[(&str, FeatureSet)] = &[
    ("toolbar", FeatureSet::TOOLBAR),
    ("menubar", FeatureSet::MENUBAR),
    ("statusbar", FeatureSet::STATUSBAR),
    ("stickybars", FeatureSet::STICKYBARS),
    ("spellcheck", FeatureSet::SPELLCHECK),
    ("purifier", FeatureSet::PURIFIER),
    ("imgUpload", FeatureSet::IMG_UPLOAD),
    ("imgResize", FeatureSet::IMG_RESIZE),
    ("inline", FeatureSet::INLINE),
];

impl FeatureSet {
    /// Features enabled on a freshly created field: everything but inline.
    pub fn field_default() -> Self {
        Self::all().difference(Self::INLINE)
    }

    /// Look up a single feature by its configuration name.
    pub fn from_config_name(name: &str) -> Option<Self> {
        NAMES
            .iter()
            .find(|(n, _)| *n == name.trim())
            .map(|(_, flag)| *flag)
    }

    /// Build from a list of names, ignoring unknown ones.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names.into_iter().fold(Self::empty(), |acc, name| {
            match Self::from_config_name(name.as_ref()) {
                Some(flag) => acc | flag,
                None => {
                    tracing::debug!(name = name.as_ref(), "unknown editor feature");
                    acc
                }
            }
        })
    }

    /// Parse a comma-joined list, as found in `data-features`.
    pub fn parse_list(list: &str) -> Self {
        Self::from_names(list.split(',').filter(|s| !s.trim().is_empty()))
    }

    /// Names of the active features, in declaration order.
    pub fn names(self) -> impl Iterator<Item = &'static str> {
        NAMES
            .iter()
            .filter(move |(_, flag)| self.contains(*flag))
            .map(|(name, _)| *name)
    }

    /// Value for the `data-features` wrapper attribute.
    ///
    /// Only the client-relevant features are exported.
    pub fn to_attr(self) -> String {
        (self & (Self::IMG_UPLOAD | Self::IMG_RESIZE))
            .names()
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl Serialize for FeatureSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.names())
    }
}

impl<'de> Deserialize<'de> for FeatureSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let names = Vec::<String>::deserialize(deserializer)?;
        Ok(Self::from_names(names))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attr_only_carries_client_features() {
        let set = FeatureSet::field_default();
        assert_eq!(set.to_attr(), "imgUpload,imgResize");
        assert_eq!(FeatureSet::TOOLBAR.to_attr(), "");
    }

    #[test]
    fn parse_and_serialize_names() {
        let set = FeatureSet::parse_list("imgResize, toolbar,bogus,");
        assert_eq!(set, FeatureSet::TOOLBAR | FeatureSet::IMG_RESIZE);

        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["toolbar","imgResize"]"#);
        let back: FeatureSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn default_excludes_inline() {
        let set = FeatureSet::field_default();
        assert!(!set.contains(FeatureSet::INLINE));
        assert!(set.contains(FeatureSet::PURIFIER | FeatureSet::STICKYBARS));
    }
}
