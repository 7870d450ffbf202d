//! Process exit codes. These are a stable contract with whatever launches
//! hostprep; never renumber them.

pub const SUCCESS: u8 = 0;
pub const INTERNAL: u8 = 1;
pub const RESOLVE_ENVIRONMENT: u8 = 10;
pub const DETECT_PREREQS: u8 = 11;
pub const CHECK_CONNECTIVITY: u8 = 12;
pub const INSTALL_PACKAGES: u8 = 13;
pub const ACQUIRE_PACKAGE_INSTALLER: u8 = 14;
pub const CHECKOUT_SOURCE: u8 = 15;
pub const EXPORT_ENVIRONMENT: u8 = 16;
pub const INVOKE_INSTALLER: u8 = 17;

/// Codes the runner itself reports. No stage may use them.
pub const RUNNER_CODES: [u8; 3] = [SUCCESS, INTERNAL, RESOLVE_ENVIRONMENT];

/// Short description of a reserved code.
pub fn describe(code: u8) -> Option<&'static str> {
    Some(match code {
        SUCCESS => "success",
        INTERNAL => "unexpected internal error",
        RESOLVE_ENVIRONMENT => "environment could not be resolved",
        DETECT_PREREQS => "interpreter missing or not runnable",
        CHECK_CONNECTIVITY => "source host could not be resolved",
        INSTALL_PACKAGES => "system packages could not be installed",
        ACQUIRE_PACKAGE_INSTALLER => "package installer could not be acquired",
        CHECKOUT_SOURCE => "source checkout failed",
        EXPORT_ENVIRONMENT => "environment file could not be written",
        INVOKE_INSTALLER => "installer failed",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_codes_described() {
        for code in [0, 1, 10, 11, 12, 13, 14, 15, 16, 17] {
            assert!(describe(code).is_some(), "code {} undescribed", code);
        }
        assert_eq!(describe(5), None);
    }
}
