#![no_main]

use libfuzzer_sys::fuzz_target;
use secure_dsn::client::DsnInfo;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };

    // Anything that parses must survive a format/parse cycle unchanged.
    if let Ok(info) = DsnInfo::parse(s) {
        let formatted = info.to_string();
        if let Ok(reparsed) = DsnInfo::parse(&formatted) {
            assert_eq!(reparsed.params, info.params);
            assert_eq!(reparsed.tls(), info.tls());
        }
    }
});
