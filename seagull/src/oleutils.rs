//! COM identifier helpers.

use uuid::Uuid;

/// Format a CLSID the way `StringFromCLSID` does: braced, upper-case hex,
/// e.g. `{0002DF01-0000-0000-C000-000000000046}`.
pub fn clsid_to_string(clsid: &Uuid) -> String {
    format!("{:X}", clsid.braced())
}

/// Build a CLSID from the fields of a native `GUID` (`Data1`..`Data4`)
pub fn clsid_from_fields(data1: u32, data2: u16, data3: u16, data4: [u8; 8]) -> Uuid {
    Uuid::from_fields(data1, data2, data3, &data4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clsid_text_is_braced_upper_case() {
        // CLSID_InternetExplorer
        let clsid = clsid_from_fields(
            0x0002_DF01,
            0x0000,
            0x0000,
            [0xC0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x46],
        );
        assert_eq!(clsid_to_string(&clsid), "{0002DF01-0000-0000-C000-000000000046}");
    }

    #[test]
    fn test_parsed_lower_case_is_normalized() {
        let clsid = Uuid::parse_str("e6fb5e20-de35-11cf-9c87-00aa005127ed").unwrap();
        assert_eq!(clsid_to_string(&clsid), "{E6FB5E20-DE35-11CF-9C87-00AA005127ED}");
        assert_eq!(clsid_to_string(&Uuid::nil()).len(), 38);
    }
}
