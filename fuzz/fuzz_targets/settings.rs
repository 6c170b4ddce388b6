// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

#![no_main]

use libfuzzer_sys::fuzz_target;
use va_dispatch::resolver;
use va_dispatch::settings::parse_config;
use va_dispatch::settings::Settings;

// The config file and the driver-name override are the two places arbitrary
// caller-controlled text enters the library.
fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let file = parse_config(text);
        let settings = Settings::from_parts(false, file, Default::default());
        let _ = settings.messaging_level();

        let _ = resolver::validate_override(text);
    }
});
