// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Per-display diagnostic messaging.
//!
//! Every display carries two independently replaceable hooks, one for errors
//! and one for informational messages. The defaults route to the `log` crate
//! and honor the configured messaging level; either hook can be swapped for a
//! caller-supplied closure or disabled outright. Messages are advisory
//! only; the status code returned by an entry point is always the
//! authoritative error channel.

/// A caller-supplied message sink.
pub type MessageCallback = Box<dyn Fn(&str) + Send + Sync>;

enum Hook {
    Default,
    Disabled,
    Custom(MessageCallback),
}

/// The pair of diagnostic hooks owned by one display.
pub struct Messenger {
    level: u8,
    error: Hook,
    info: Hook,
}

impl Default for Messenger {
    fn default() -> Self {
        Messenger {
            level: 2,
            error: Hook::Default,
            info: Hook::Default,
        }
    }
}

impl Messenger {
    /// Applies the configured messaging level to the default hooks. Custom
    /// hooks are never filtered.
    pub fn set_level(&mut self, level: u8) {
        self.level = level;
    }

    pub fn error(&self, msg: &str) {
        match &self.error {
            Hook::Default if self.level >= 1 => log::error!("{}", msg),
            Hook::Default | Hook::Disabled => (),
            Hook::Custom(cb) => cb(msg),
        }
    }

    pub fn info(&self, msg: &str) {
        match &self.info {
            Hook::Default if self.level >= 2 => log::info!("{}", msg),
            Hook::Default | Hook::Disabled => (),
            Hook::Custom(cb) => cb(msg),
        }
    }

    /// Replaces the error hook. `None` disables error messages. Returns the
    /// previous custom hook, if one was installed.
    pub fn set_error_hook(&mut self, cb: Option<MessageCallback>) -> Option<MessageCallback> {
        let old = std::mem::replace(
            &mut self.error,
            cb.map(Hook::Custom).unwrap_or(Hook::Disabled),
        );
        match old {
            Hook::Custom(cb) => Some(cb),
            _ => None,
        }
    }

    /// Replaces the info hook. `None` disables info messages. Returns the
    /// previous custom hook, if one was installed.
    pub fn set_info_hook(&mut self, cb: Option<MessageCallback>) -> Option<MessageCallback> {
        let old = std::mem::replace(
            &mut self.info,
            cb.map(Hook::Custom).unwrap_or(Hook::Disabled),
        );
        match old {
            Hook::Custom(cb) => Some(cb),
            _ => None,
        }
    }
}
