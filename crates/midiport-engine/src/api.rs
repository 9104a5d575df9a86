//! Backend identifiers and compile-time capability queries.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A native MIDI subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Api {
    /// Search the compiled backends for a working one.
    #[default]
    #[serde(rename = "unspecified")]
    Unspecified,
    #[serde(rename = "core")]
    MacOsxCore,
    #[serde(rename = "alsa")]
    LinuxAlsa,
    #[serde(rename = "jack")]
    UnixJack,
    #[serde(rename = "winmm")]
    WindowsMm,
    #[serde(rename = "web")]
    WebMidi,
    /// In-process software bus, always compiled.
    #[serde(rename = "dummy")]
    Dummy,
}

impl Api {
    pub const ALL: [Api; 7] = [
        Api::Unspecified,
        Api::MacOsxCore,
        Api::LinuxAlsa,
        Api::UnixJack,
        Api::WindowsMm,
        Api::WebMidi,
        Api::Dummy,
    ];

    /// Short identifier, stable across releases.
    pub fn name(self) -> &'static str {
        match self {
            Api::Unspecified => "unspecified",
            Api::MacOsxCore => "core",
            Api::LinuxAlsa => "alsa",
            Api::UnixJack => "jack",
            Api::WindowsMm => "winmm",
            Api::WebMidi => "web",
            Api::Dummy => "dummy",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Api::Unspecified => "Unknown",
            Api::MacOsxCore => "CoreMidi",
            Api::LinuxAlsa => "ALSA",
            Api::UnixJack => "Jack",
            Api::WindowsMm => "Windows MultiMedia",
            Api::WebMidi => "Web MIDI API",
            Api::Dummy => "Dummy",
        }
    }

    pub fn is_compiled(self) -> bool {
        compiled_apis().contains(&self)
    }
}

impl fmt::Display for Api {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The OS backend midir was built against for this target.
#[cfg(all(feature = "midir", feature = "jack"))]
pub(crate) const NATIVE_API: Option<Api> = Some(Api::UnixJack);
#[cfg(all(feature = "midir", not(feature = "jack"), target_os = "linux"))]
pub(crate) const NATIVE_API: Option<Api> = Some(Api::LinuxAlsa);
#[cfg(all(
    feature = "midir",
    not(feature = "jack"),
    any(target_os = "macos", target_os = "ios")
))]
pub(crate) const NATIVE_API: Option<Api> = Some(Api::MacOsxCore);
#[cfg(all(feature = "midir", not(feature = "jack"), target_os = "windows"))]
pub(crate) const NATIVE_API: Option<Api> = Some(Api::WindowsMm);
#[cfg(all(feature = "midir", not(feature = "jack"), target_arch = "wasm32"))]
pub(crate) const NATIVE_API: Option<Api> = Some(Api::WebMidi);
#[cfg(not(all(
    feature = "midir",
    any(
        feature = "jack",
        target_os = "linux",
        target_os = "macos",
        target_os = "ios",
        target_os = "windows",
        target_arch = "wasm32"
    )
)))]
pub(crate) const NATIVE_API: Option<Api> = None;

/// Compiled backends in search priority order. `Dummy` is always last.
pub fn compiled_apis() -> Vec<Api> {
    let mut apis = Vec::with_capacity(2);
    if let Some(api) = NATIVE_API {
        apis.push(api);
    }
    apis.push(Api::Dummy);
    apis
}

/// Compiled backend with the given short name, or `Unspecified`.
pub fn compiled_api_by_name(name: &str) -> Api {
    compiled_apis()
        .into_iter()
        .find(|api| api.name() == name)
        .unwrap_or(Api::Unspecified)
}

/// Version of this engine.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_unique() {
        for (i, a) in Api::ALL.iter().enumerate() {
            for b in &Api::ALL[i + 1..] {
                assert_ne!(a.name(), b.name());
                assert_ne!(a.display_name(), b.display_name());
            }
        }
    }

    #[test]
    fn test_dummy_always_compiled_last() {
        let apis = compiled_apis();
        assert_eq!(apis.last(), Some(&Api::Dummy));
        assert!(!apis.contains(&Api::Unspecified));
    }

    #[test]
    fn test_lookup_by_name() {
        assert_eq!(compiled_api_by_name("dummy"), Api::Dummy);
        assert_eq!(compiled_api_by_name("no-such-backend"), Api::Unspecified);
        if let Some(native) = NATIVE_API {
            assert_eq!(compiled_api_by_name(native.name()), native);
        }
    }

    #[test]
    fn test_version_not_empty() {
        assert!(!version().is_empty());
    }
}
