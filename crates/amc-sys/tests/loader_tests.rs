//! Integration tests for library loading.

use amc_sys::{AmcLibrary, SYMBOLS, SysError};

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[test]
fn test_symbol_table_matches_header() -> TestResult {
    assert_eq!(SYMBOLS.len(), 20);
    assert_eq!(SYMBOLS.first(), Some(&"openUSB"));
    assert_eq!(SYMBOLS.last(), Some(&"Read_Encorder"));
    Ok(())
}

#[test]
fn test_load_error_mentions_path() -> TestResult {
    let err = match AmcLibrary::load("/definitely/not/here/Usb_AMC1XE.dll") {
        Err(err) => err,
        Ok(_) => return Err("expected load failure".into()),
    };
    assert!(err.to_string().contains("/definitely/not/here/Usb_AMC1XE.dll"));
    assert_eq!(err.symbol(), None);
    Ok(())
}

/// A real shared library that is not the motion library must be rejected on
/// the first symbol lookup.
#[cfg(target_os = "linux")]
#[test]
fn test_foreign_library_reports_first_missing_symbol() -> TestResult {
    let err = match AmcLibrary::load("libc.so.6") {
        Err(err) => err,
        Ok(_) => return Err("libc must not look like the motion library".into()),
    };
    assert!(matches!(
        err,
        SysError::MissingSymbol {
            symbol: "openUSB",
            ..
        }
    ));
    assert_eq!(err.symbol(), Some("openUSB"));
    Ok(())
}
