use clap::ValueEnum;
use std::fmt;
use std::path::Path;

/// Sanitizers understood by `swift build --sanitize=<name>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Sanitizer {
    Address,
    Thread,
    Undefined,
}

impl Sanitizer {
    /// Sanitizers exercised by `--sanitize-all`, in order.
    ///
    /// `undefined` is left out: on Linux it is broken upstream, and on macOS a
    /// freshly built clang with ubsan against the current Xcode SDK makes C++
    /// exceptions uncatchable, which indexstore-db relies on.
    pub const SWEEP: [Sanitizer; 2] = [Sanitizer::Address, Sanitizer::Thread];

    /// Value passed to `--sanitize=`
    pub fn name(self) -> &'static str {
        match self {
            Sanitizer::Address => "address",
            Sanitizer::Thread => "thread",
            Sanitizer::Undefined => "undefined",
        }
    }

    pub fn short_name(self) -> &'static str {
        match self {
            Sanitizer::Address => "asan",
            Sanitizer::Thread => "tsan",
            Sanitizer::Undefined => "ubsan",
        }
    }

    /// Sub-directory of the build path used for this sanitizer's sweep pass
    pub fn build_subdir(self) -> String {
        format!("test-{}", self.short_name())
    }

    /// Environment variable the sanitized binaries need at runtime.
    pub fn environment(self, package_path: &Path) -> (&'static str, String) {
        match self {
            // Foundation reports leaks we can't do anything about (SR-12551)
            Sanitizer::Address => ("ASAN_OPTIONS", "detect_leaks=false".to_owned()),
            Sanitizer::Undefined => {
                let suppressions = package_path
                    .join("Utilities")
                    .join("ubsan_supressions.supp");
                (
                    "UBSAN_OPTIONS",
                    format!("halt_on_error=true,suppressions={}", suppressions.display()),
                )
            }
            Sanitizer::Thread => ("INDEXSTOREDB_ENABLED_THREAD_SANITIZER", "1".to_owned()),
        }
    }
}

impl fmt::Display for Sanitizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
