#![no_main]

use libfuzzer_sys::fuzz_target;
use secure_dsn::connection::{SecurityConfig, SecurityMode, TlsProfile};

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);

    // Arbitrary PEM-ish input must fail cleanly, never panic.
    for mode in [SecurityMode::VerifyCa, SecurityMode::VerifyFull] {
        let config = SecurityConfig::new(mode)
            .server_ca(text.as_ref())
            .client_cert(text.as_ref())
            .client_key(text.as_ref());
        if config.validate().is_ok() {
            let _ = TlsProfile::builder().build(&config);
        }
    }
});
