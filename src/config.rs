//! Well-known constants and the explicit configuration handed to extraction.
//!
//! Nothing here reads the environment; the binary resolves CLI flags and the
//! config file, then builds an [`ExtractConfig`].

use std::path::PathBuf;

use crate::model::Browser;

/// OneTab as published on the Chrome Web Store (Chrome, Brave, Chromium).
pub const ONETAB_CHROME_ID: &str = "chphlpgkkbolifaimnlloiipkdnihall";
/// OneTab as published on Microsoft Edge Add-ons.
pub const ONETAB_EDGE_ID: &str = "hoimpamkkoehapgenciaoajfkfkpgfop";

/// Keys probed first, in order.
pub const DEFAULT_CANDIDATE_KEYS: &[&str] = &["state", "tabGroups", "onetab_state"];
/// Case-insensitive substrings that mark a key worth parsing during a full scan.
pub const DEFAULT_KEY_HINTS: &[&str] = &["state", "tabgroup"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractConfig {
    pub browser: Browser,
    pub extension_id: String,
    pub candidate_keys: Vec<String>,
    pub key_hints: Vec<String>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self::for_browser(Browser::Chrome)
    }
}

impl ExtractConfig {
    pub fn for_browser(browser: Browser) -> Self {
        Self {
            browser,
            extension_id: default_extension_id(browser).to_string(),
            candidate_keys: DEFAULT_CANDIDATE_KEYS.iter().map(|s| s.to_string()).collect(),
            key_hints: DEFAULT_KEY_HINTS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_extension_id(mut self, id: impl Into<String>) -> Self {
        self.extension_id = id.into();
        self
    }

    /// `<profile>/Local Extension Settings/<extension id>` for the default profile.
    pub fn default_leveldb_path(&self) -> Option<PathBuf> {
        profile_dir(self.browser).map(|p| {
            p.join("Local Extension Settings")
                .join(&self.extension_id)
        })
    }
}

pub fn default_extension_id(browser: Browser) -> &'static str {
    match browser {
        Browser::Edge => ONETAB_EDGE_ID,
        _ => ONETAB_CHROME_ID,
    }
}

/// Default profile directory of a Chromium-family browser on this OS.
pub fn profile_dir(browser: Browser) -> Option<PathBuf> {
    let vendor: &[&str] = if cfg!(target_os = "linux") {
        match browser {
            Browser::Chrome => &["google-chrome"],
            Browser::Edge => &["microsoft-edge"],
            Browser::Brave => &["BraveSoftware", "Brave-Browser"],
            Browser::Chromium => &["chromium"],
            Browser::Unknown => return None,
        }
    } else {
        match browser {
            Browser::Chrome => &["Google", "Chrome"],
            Browser::Edge => &["Microsoft", "Edge"],
            Browser::Brave => &["BraveSoftware", "Brave-Browser"],
            Browser::Chromium => &["Chromium"],
            Browser::Unknown => return None,
        }
    };

    // Linux keeps profiles under ~/.config, macOS under Application Support,
    // Windows under %LOCALAPPDATA%\<vendor>\User Data.
    let base = if cfg!(target_os = "windows") {
        dirs::data_local_dir()
    } else {
        dirs::config_dir()
    }?;

    let mut dir = vendor.iter().fold(base, |acc, part| acc.join(part));
    if cfg!(target_os = "windows") {
        dir = dir.join("User Data");
    }
    Some(dir.join("Default"))
}
