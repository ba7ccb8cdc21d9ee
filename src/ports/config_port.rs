//! Configuration access port trait.
//!
//! Keys are addressed as `[section] key`, the same way for INI files and
//! for environment variables mapped onto sections.

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.get_string(section, key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }
}

