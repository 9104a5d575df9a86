//! Which backends this build can open.

use midiport_engine::Api;

/// Compiled backends, highest native priority first. The dummy backend is
/// always present and always last.
pub fn compiled_apis() -> Vec<Api> {
    midiport_engine::compiled_apis()
}

pub fn compiled_api_by_name(name: &str) -> Api {
    midiport_engine::compiled_api_by_name(name)
}

/// Version string of the underlying engine.
pub fn version() -> &'static str {
    midiport_engine::version()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compiled_apis_have_known_names() {
        let apis = compiled_apis();
        assert!(!apis.is_empty());
        for api in apis {
            assert_eq!(compiled_api_by_name(api.name()), api);
        }
    }

    #[test]
    fn test_version_matches_engine() {
        assert_eq!(version(), midiport_engine::version());
    }
}
