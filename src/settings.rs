// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Process-level configuration: the system config file and environment
//! overrides.
//!
//! A setting can come from the optional system-wide config file (one
//! `key = value` per line) or from an environment variable of the same name;
//! the file wins when both are present. None of the overrides are honored
//! in a set-uid/set-gid process: a privileged process loading an arbitrary
//! library named by its caller would be an escalation path, so every lookup
//! is gated, from either source.

use std::collections::HashMap;
use std::fs;

use nix::unistd::getegid;
use nix::unistd::geteuid;
use nix::unistd::getgid;
use nix::unistd::getuid;

/// Environment/config key forcing a specific driver name.
pub const DRIVER_NAME_KEY: &str = "LIBVA_DRIVER_NAME";
/// Environment/config key replacing the compiled-in driver search path.
pub const DRIVERS_PATH_KEY: &str = "LIBVA_DRIVERS_PATH";
/// Environment/config key setting the default messaging level (0..=2).
pub const MESSAGING_LEVEL_KEY: &str = "LIBVA_MESSAGING_LEVEL";

const CONFIG_PATH: &str = "/etc/libva.conf";

/// Snapshot of the configuration sources, taken once per `initialize`.
pub struct Settings {
    privileged: bool,
    file: HashMap<String, String>,
    env: HashMap<String, String>,
}

impl Settings {
    /// Reads the config file and environment of the running process.
    pub fn from_system() -> Settings {
        let file = fs::read_to_string(CONFIG_PATH)
            .map(|s| parse_config(&s))
            .unwrap_or_default();

        Settings {
            privileged: getuid() != geteuid() || getgid() != getegid(),
            file,
            env: std::env::vars().collect(),
        }
    }

    /// Builds a snapshot from explicit parts. Tests use this to simulate
    /// privileged processes and config files without touching the system.
    pub fn from_parts(
        privileged: bool,
        file: HashMap<String, String>,
        env: HashMap<String, String>,
    ) -> Settings {
        Settings {
            privileged,
            file,
            env,
        }
    }

    /// Looks up `key`, config file first, then environment. Always `None` in
    /// a privileged process.
    pub fn get(&self, key: &str) -> Option<&str> {
        if self.privileged {
            return None;
        }
        self.file
            .get(key)
            .or_else(|| self.env.get(key))
            .map(String::as_str)
    }

    /// The configured messaging level: 0 silences everything, 1 keeps
    /// errors, 2 (the default) keeps errors and info.
    pub fn messaging_level(&self) -> u8 {
        match self.get(MESSAGING_LEVEL_KEY).map(|v| v.parse::<u8>()) {
            Some(Ok(level @ 0..=2)) => level,
            _ => 2,
        }
    }
}

/// Parses config-file text: one `key = value` per line, malformed lines
/// skipped.
pub fn parse_config(contents: &str) -> HashMap<String, String> {
    contents
        .lines()
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            let (key, value) = (key.trim(), value.trim());
            if key.is_empty() || value.is_empty() {
                None
            } else {
                Some((key.to_owned(), value.to_owned()))
            }
        })
        .collect()
}
