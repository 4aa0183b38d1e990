use thiserror::Error;

/// Flat status taxonomy shared by every fallible operation in this crate.
///
/// Containers return `Result<T, Status>` (or bare `Status` where there is
/// no value to report); `Status::Success` is never constructed as an
/// `Err` — a successful operation returns `Ok(_)` directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Status {
    /// The operation completed successfully.
    #[error("success")]
    Success,
    /// Unknown or unclassified error.
    #[error("unknown error")]
    GenericError,
    /// Allocation failed.
    #[error("out of memory")]
    OutOfMemory,
    /// The requested key or element was not present.
    #[error("not found")]
    NotFound,
    /// An equal element already exists and duplicates are not permitted.
    #[error("already exists")]
    Exists,
    /// An argument was invalid for this operation.
    #[error("bad argument")]
    BadArgument,
    /// The caller lacks permission to perform the operation.
    #[error("bad permissions")]
    BadPermissions,
    /// An iterator walked past the last element.
    #[error("reached end")]
    ReachedEnd,
    /// The operation timed out.
    #[error("timeout")]
    Timeout,
    /// A capacity or arithmetic limit was exceeded.
    #[error("overflow")]
    Overflow,
    /// The requested capability is not supported on this platform.
    #[error("not supported")]
    NotSupported,
    /// The resource is temporarily unavailable.
    #[error("unavailable")]
    Unavailable,
    /// There is not enough space to complete a ring write.
    #[error("no space")]
    NoSpace,
    /// A link/probe-chain limit was exceeded.
    #[error("too many links")]
    MaxLinks,
}

impl Status {
    /// Returns `true` for [`Status::Success`].
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Status::Success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_is_recognized() {
        assert!(Status::Success.is_success());
        assert!(!Status::NotFound.is_success());
    }

    #[test]
    fn every_variant_has_a_message() {
        let variants = [
            Status::Success,
            Status::GenericError,
            Status::OutOfMemory,
            Status::NotFound,
            Status::Exists,
            Status::BadArgument,
            Status::BadPermissions,
            Status::ReachedEnd,
            Status::Timeout,
            Status::Overflow,
            Status::NotSupported,
            Status::Unavailable,
            Status::NoSpace,
            Status::MaxLinks,
        ];
        for v in variants {
            assert!(!v.to_string().is_empty());
        }
    }
}
