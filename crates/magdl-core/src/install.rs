//! Installation hints for missing external tools

/// Platform-specific instructions for installing `tool`.
///
/// Only `aria2c` has tailored package names; anything else gets a generic hint.
pub fn install_guidance(tool: &str) -> String {
    if tool != "aria2c" {
        return format!("Install {} and make sure it is on your PATH.", tool);
    }

    if cfg!(target_os = "macos") {
        "Install aria2 with Homebrew:\n  brew install aria2".to_string()
    } else if cfg!(target_os = "windows") {
        "Install aria2 with one of:\n  winget install aria2.aria2\n  choco install aria2\n\
         or download a release from https://github.com/aria2/aria2/releases and add it to PATH."
            .to_string()
    } else if cfg!(target_os = "linux") {
        "Install aria2 with your package manager:\n  \
         Debian/Ubuntu: sudo apt install aria2\n  \
         Fedora:        sudo dnf install aria2\n  \
         Arch:          sudo pacman -S aria2"
            .to_string()
    } else if cfg!(target_os = "freebsd") {
        "Install aria2 with:\n  pkg install aria2".to_string()
    } else {
        "Install aria2 from https://aria2.github.io/ and make sure aria2c is on your PATH."
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guidance_mentions_aria2() {
        assert!(install_guidance("aria2c").contains("aria2"));
    }

    #[test]
    fn test_guidance_for_unknown_tool() {
        assert_eq!(
            install_guidance("mytool"),
            "Install mytool and make sure it is on your PATH."
        );
    }
}
