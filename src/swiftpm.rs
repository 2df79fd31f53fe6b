//! Translation of an [`InvocationConfig`] into SwiftPM command lines.

use crate::config::InvocationConfig;
use crate::process::{EnvOverlay, Invocation};
use std::path::Path;

/// Product holding every indexstore-db test target.
pub const TEST_PRODUCT: &str = "IndexStoreDBPackageTests";

/// Test artifacts removed from the bin path before every `swift test`.
pub const STALE_TESTS_DIR: &str = "isdb-tests";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostOs {
    MacOs,
    Other,
}

impl HostOs {
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            HostOs::MacOs
        } else {
            HostOs::Other
        }
    }
}

/// Arguments shared by every `swift build` and `swift test` call.
pub fn swiftpm_args(config: &InvocationConfig, host: HostOs) -> Vec<String> {
    let mut args = vec![
        "--package-path".to_owned(),
        path_arg(&config.package_path),
        "--scratch-path".to_owned(),
        path_arg(&config.build_path),
        "--configuration".to_owned(),
        config.configuration.to_string(),
    ];

    if let Some(file) = &config.multiroot_data_file {
        args.extend(["--multiroot-data-file".to_owned(), path_arg(file)]);
    }

    if config.verbose {
        args.push("--verbose".to_owned());
    }

    args.extend(
        config
            .sanitizers
            .iter()
            .map(|sanitizer| format!("--sanitize={sanitizer}")),
    );

    if host != HostOs::MacOs {
        let swift_lib = config.toolchain.join("lib").join("swift");
        // dispatch headers, then <Block.h>
        for include in [swift_lib.clone(), swift_lib.join("Block")] {
            args.extend(["-Xcxx", "-I", "-Xcxx"].map(str::to_owned));
            args.push(path_arg(&include));
        }
    }

    args
}

/// Environment shared by every `swift build` and `swift test` call.
pub fn swiftpm_env(config: &InvocationConfig) -> EnvOverlay {
    let mut env = EnvOverlay::new();

    // Tests look the toolchain up at runtime
    env.insert(
        "INDEXSTOREDB_TOOLCHAIN_BIN_PATH".to_owned(),
        path_arg(&config.toolchain),
    );
    env.insert("SWIFTCI_USE_LOCAL_DEPS".to_owned(), "1".to_owned());

    if let Some(ninja) = &config.ninja_bin {
        env.insert("NINJA_BIN".to_owned(), path_arg(ninja));
    }

    for sanitizer in &config.sanitizers {
        let (key, value) = sanitizer.environment(&config.package_path);
        env.insert(key.to_owned(), value);
    }

    env
}

/// `swift build --product IndexStoreDBPackageTests ...`
pub fn build_invocation(config: &InvocationConfig, host: HostOs) -> Invocation {
    Invocation::new(config.swift_exec())
        .args(["build", "--product", TEST_PRODUCT])
        .args(swiftpm_args(config, host))
        .envs(swiftpm_env(config))
}

/// `swift build --show-bin-path ...`
pub fn bin_path_invocation(config: &InvocationConfig, host: HostOs) -> Invocation {
    Invocation::new(config.swift_exec())
        .args(["build", "--show-bin-path"])
        .args(swiftpm_args(config, host))
        .envs(swiftpm_env(config))
}

/// `swift test --parallel --test-product IndexStoreDBPackageTests ...`
pub fn test_invocation(config: &InvocationConfig, host: HostOs) -> Invocation {
    Invocation::new(config.swift_exec())
        .args(["test", "--parallel", "--test-product", TEST_PRODUCT])
        .args(swiftpm_args(config, host))
        .envs(swiftpm_env(config))
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
