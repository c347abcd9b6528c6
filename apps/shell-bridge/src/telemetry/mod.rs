pub mod logging;

pub(crate) fn env_flag(var: &str) -> Option<bool> {
    std::env::var(var).ok().map(|value| {
        let value = value.trim().to_ascii_lowercase();
        !(value.is_empty() || value == "0" || value == "false" || value == "no" || value == "off")
    })
}
